use std::sync::Arc;

use tracing::{info, instrument};
use validator::Validate;

use crate::clock::Clock;
use crate::engine::SalesPerformanceEngine;
use crate::error::{AppError, AppResult};
use crate::models::{PerformanceQuery, PerformanceReport};
use crate::repositories::SalesDataRepository;

#[derive(Clone)]
pub struct SalesPerformanceService {
    repository: Arc<dyn SalesDataRepository>,
    clock: Arc<dyn Clock>,
    engine: SalesPerformanceEngine,
}

impl SalesPerformanceService {
    pub fn new(
        repository: Arc<dyn SalesDataRepository>,
        clock: Arc<dyn Clock>,
        engine: SalesPerformanceEngine,
    ) -> Self {
        Self {
            repository,
            clock,
            engine,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_performance(&self, query: PerformanceQuery) -> AppResult<PerformanceReport> {
        query.validate()?;

        let window = query.window();
        if let (Some(start), Some(end)) = (window.start, window.end) {
            if window.is_inverted() {
                return Err(AppError::InvalidDateRange { start, end });
            }
        }

        let filter = query.filter();

        let transactions = self
            .repository
            .find_transactions(&window)
            .await
            .map_err(|e| e.with_context("loading transactions"))?;
        let products = self
            .repository
            .find_products()
            .await
            .map_err(|e| e.with_context("loading product catalog"))?;

        let report = self
            .engine
            .compute(&transactions, &products, &filter, self.clock.now());

        info!(
            transactions = transactions.len(),
            record_count = report.records.len(),
            skipped_line_items = report.diagnostics.len(),
            active_days = report.distinct_active_days,
            "Sales performance report ready"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{SkipReason, StockStatus};
    use crate::repositories::{InMemorySalesRepository, SalesDataset};
    use crate::test_utils::*;

    fn service(dataset: SalesDataset) -> SalesPerformanceService {
        SalesPerformanceService::new(
            Arc::new(InMemorySalesRepository::new(dataset)),
            Arc::new(FixedClock(at(2024, 5, 31, 0))),
            SalesPerformanceEngine::default(),
        )
    }

    fn dataset() -> SalesDataset {
        SalesDataset {
            products: vec![
                product("P1", "600", 10),
                product("P2", "50", 200),
                product("P3", "20", 0),
            ],
            transactions: vec![
                transaction("T1", at(2024, 4, 20, 9), vec![line("P3", 4, "30")]),
                transaction(
                    "T2",
                    at(2024, 5, 1, 9),
                    vec![line("P1", 3, "1000"), line("P2", 1, "80")],
                ),
                transaction(
                    "T3",
                    at(2024, 5, 1, 18),
                    vec![line("P1", 2, "1000"), line("MISSING", 1, "10")],
                ),
                transaction("T4", at(2024, 5, 10, 9), vec![line("P2", 1, "80")]),
            ],
        }
    }

    #[tokio::test]
    async fn test_window_restricts_transactions() {
        let query = PerformanceQuery {
            start_date: Some(at(2024, 5, 1, 0)),
            end_date: Some(at(2024, 5, 31, 0)),
            ..Default::default()
        };

        let report = service(dataset()).get_performance(query).await.unwrap();

        let ids: Vec<&str> = report.records.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2"]);
        assert_eq!(report.distinct_active_days, 2);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].reason, SkipReason::UnknownProduct);
        assert_eq!(report.generated_at, at(2024, 5, 31, 0));

        let p2 = &report.records[1];
        assert_eq!(p2.days_without_sale, Some(20));
        assert_eq!(p2.stock_status, StockStatus::Overstock);
        assert_close(p2.sales_frequency, 1.0);
    }

    #[tokio::test]
    async fn test_unknown_sort_falls_back_to_lens() {
        let query = PerformanceQuery {
            performance_type: Some("slow_moving".into()),
            sort_by: Some("popularity".into()),
            ..Default::default()
        };

        let report = service(dataset()).get_performance(query).await.unwrap();

        let quantities: Vec<u64> = report
            .records
            .iter()
            .map(|r| r.total_quantity_sold)
            .collect();
        assert_eq!(quantities, vec![2, 4, 5]);
    }

    #[tokio::test]
    async fn test_inverted_window_is_rejected() {
        let query = PerformanceQuery {
            start_date: Some(at(2024, 6, 1, 0)),
            end_date: Some(at(2024, 5, 1, 0)),
            ..Default::default()
        };

        let err = service(dataset()).get_performance(query).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidDateRange { .. }));
    }

    #[tokio::test]
    async fn test_invalid_query_is_rejected() {
        let query = PerformanceQuery {
            category_id: Some(String::new()),
            ..Default::default()
        };

        let err = service(dataset()).get_performance(query).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_summary_reflects_filtered_set() {
        let query = PerformanceQuery {
            min_quantity: Some(3),
            ..Default::default()
        };

        let report = service(dataset()).get_performance(query).await.unwrap();

        assert_eq!(report.summary.total_items, 2);
        assert_eq!(report.summary.total_quantity_sold, 9);
        assert_eq!(report.summary.total_revenue, money("5120"));
    }
}
