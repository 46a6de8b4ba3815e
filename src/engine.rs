use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::derivation::derive_performance;
use crate::grouping::group_sales;
use crate::models::{
    PerformanceFilter, PerformanceReport, PerformanceThresholds, Product, ProductId,
    ProductPerformance, Transaction,
};
use crate::observability::stage_span;
use crate::ranking::{apply_filters, rank, summarize};

/// Computes a report with the default summary thresholds.
///
/// `transactions` must already be restricted to the requested date window.
pub fn compute_sales_performance(
    transactions: &[Transaction],
    products: &HashMap<ProductId, Product>,
    filter: &PerformanceFilter,
    now: DateTime<Utc>,
) -> PerformanceReport {
    SalesPerformanceEngine::default().compute(transactions, products, filter, now)
}

/// Stateless aggregation engine. Each call builds its figures from scratch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SalesPerformanceEngine {
    thresholds: PerformanceThresholds,
}

impl SalesPerformanceEngine {
    pub fn new(thresholds: PerformanceThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &PerformanceThresholds {
        &self.thresholds
    }

    pub fn compute(
        &self,
        transactions: &[Transaction],
        products: &HashMap<ProductId, Product>,
        filter: &PerformanceFilter,
        now: DateTime<Utc>,
    ) -> PerformanceReport {
        let grouped = stage_span("grouping").in_scope(|| group_sales(transactions, products));

        let records: Vec<ProductPerformance> = stage_span("derivation").in_scope(|| {
            grouped
                .accumulators
                .into_iter()
                .map(|acc| derive_performance(acc, grouped.distinct_active_days, now))
                .collect()
        });
        let grouped_count = records.len();

        let (records, summary) = stage_span("ranking").in_scope(|| {
            let mut records = apply_filters(records, filter);
            rank(&mut records, filter);
            let summary = summarize(&records, &self.thresholds);
            (records, summary)
        });

        debug!(
            transactions = transactions.len(),
            grouped_products = grouped_count,
            returned_products = records.len(),
            skipped_line_items = grouped.skipped.len(),
            active_days = grouped.distinct_active_days,
            performance_type = filter.performance_type.as_str(),
            "Sales performance computed"
        );

        PerformanceReport {
            records,
            summary,
            distinct_active_days: grouped.distinct_active_days,
            diagnostics: grouped.skipped,
            generated_at: now,
        }
    }
}
