use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::{AppError, AppResult};
use crate::models::{DateWindow, Product, ProductId, Transaction};

#[async_trait]
pub trait SalesDataRepository: Send + Sync {
    /// Transactions purchased inside `window`. Undated transactions are always
    /// returned so the engine can report them.
    async fn find_transactions(&self, window: &DateWindow) -> AppResult<Vec<Transaction>>;
    async fn find_products(&self) -> AppResult<HashMap<ProductId, Product>>;
}

/// Catalog plus transaction log, as exchanged with report screens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesDataset {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl SalesDataset {
    /// Keyed catalog. The first entry wins when an id is listed twice.
    pub fn product_catalog(&self) -> HashMap<ProductId, Product> {
        let mut catalog = HashMap::with_capacity(self.products.len());
        for product in &self.products {
            if catalog.contains_key(&product.product_id) {
                warn!(product_id = %product.product_id, "Duplicate product in catalog ignored");
                continue;
            }
            catalog.insert(product.product_id.clone(), product.clone());
        }
        catalog
    }

    pub fn transactions_within(&self, window: &DateWindow) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.purchased_at.is_none_or(|at| window.contains(&at)))
            .cloned()
            .collect()
    }
}

pub struct InMemorySalesRepository {
    dataset: SalesDataset,
}

impl InMemorySalesRepository {
    pub fn new(dataset: SalesDataset) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl SalesDataRepository for InMemorySalesRepository {
    async fn find_transactions(&self, window: &DateWindow) -> AppResult<Vec<Transaction>> {
        Ok(self.dataset.transactions_within(window))
    }

    async fn find_products(&self) -> AppResult<HashMap<ProductId, Product>> {
        Ok(self.dataset.product_catalog())
    }
}

/// Reads a JSON `SalesDataset` from disk on every call.
pub struct JsonFileSalesRepository {
    path: PathBuf,
}

impl JsonFileSalesRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> AppResult<SalesDataset> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            error!(path = %self.path.display(), "Error reading sales dataset: {:?}", e);
            AppError::from(e).with_context(format!("reading {}", self.path.display()))
        })?;

        let dataset: SalesDataset = serde_json::from_str(&contents).map_err(|e| {
            error!(path = %self.path.display(), "Error parsing sales dataset: {:?}", e);
            AppError::from(e).with_context(format!("parsing {}", self.path.display()))
        })?;

        // Without a catalog every line item would be skipped as unknown.
        if dataset.products.is_empty() && !dataset.transactions.is_empty() {
            error!(path = %self.path.display(), "Sales dataset has no product catalog");
            return Err(AppError::DataSource(format!(
                "{} has {} transactions but no products",
                self.path.display(),
                dataset.transactions.len()
            )));
        }

        Ok(dataset)
    }
}

#[async_trait]
impl SalesDataRepository for JsonFileSalesRepository {
    async fn find_transactions(&self, window: &DateWindow) -> AppResult<Vec<Transaction>> {
        Ok(self.load().await?.transactions_within(window))
    }

    async fn find_products(&self) -> AppResult<HashMap<ProductId, Product>> {
        Ok(self.load().await?.product_catalog())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn dataset() -> SalesDataset {
        let mut undated = transaction("T0", at(2024, 1, 1, 0), vec![line("P1", 1, "5")]);
        undated.purchased_at = None;

        SalesDataset {
            products: vec![product("P1", "3", 10), product("P1", "99", 10)],
            transactions: vec![
                undated,
                transaction("T1", at(2024, 5, 1, 0), vec![line("P1", 1, "5")]),
                transaction("T2", at(2024, 5, 15, 12), vec![line("P1", 1, "5")]),
                transaction("T3", at(2024, 6, 1, 0), vec![line("P1", 1, "5")]),
            ],
        }
    }

    fn transaction_ids(transactions: &[Transaction]) -> Vec<&str> {
        transactions
            .iter()
            .map(|t| t.transaction_id.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_window_bounds_are_inclusive() {
        let repo = InMemorySalesRepository::new(dataset());
        let window = DateWindow::new(Some(at(2024, 5, 1, 0)), Some(at(2024, 5, 15, 12)));

        let found = repo.find_transactions(&window).await.unwrap();

        assert_eq!(transaction_ids(&found), vec!["T0", "T1", "T2"]);
    }

    #[tokio::test]
    async fn test_open_window_returns_everything() {
        let repo = InMemorySalesRepository::new(dataset());
        let found = repo.find_transactions(&DateWindow::default()).await.unwrap();
        assert_eq!(found.len(), 4);
    }

    #[tokio::test]
    async fn test_duplicate_catalog_entry_keeps_first() {
        let repo = InMemorySalesRepository::new(dataset());
        let catalog = repo.find_products().await.unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[&ProductId::from("P1")].purchase_cost, money("3"));
    }

    #[tokio::test]
    async fn test_json_file_round_trip() {
        let path = std::env::temp_dir().join(format!("sales-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, serde_json::to_string(&dataset()).unwrap())
            .await
            .unwrap();

        let repo = JsonFileSalesRepository::new(&path);
        let window = DateWindow::new(Some(at(2024, 5, 2, 0)), None);
        let found = repo.find_transactions(&window).await.unwrap();
        let catalog = repo.find_products().await.unwrap();

        assert_eq!(transaction_ids(&found), vec!["T0", "T2", "T3"]);
        assert!(catalog.contains_key(&ProductId::from("P1")));

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_reports_io_error() {
        let repo = JsonFileSalesRepository::new("/nonexistent/sales.json");
        let err = repo.find_products().await.unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_file_reports_json_error() {
        let path = std::env::temp_dir().join(format!("sales-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = JsonFileSalesRepository::new(&path)
            .find_products()
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_DATASET");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_dataset_without_catalog_is_a_data_source_error() {
        let path = std::env::temp_dir().join(format!("sales-{}.json", uuid::Uuid::new_v4()));
        let orphaned = SalesDataset {
            products: vec![],
            transactions: dataset().transactions,
        };
        tokio::fs::write(&path, serde_json::to_string(&orphaned).unwrap())
            .await
            .unwrap();

        let err = JsonFileSalesRepository::new(&path)
            .find_transactions(&DateWindow::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DataSource(_)));
        assert!(!err.is_client_error());

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_dataset_file_is_accepted() {
        let path = std::env::temp_dir().join(format!("sales-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "{}").await.unwrap();

        let repo = JsonFileSalesRepository::new(&path);
        assert!(repo.find_products().await.unwrap().is_empty());
        assert!(repo
            .find_transactions(&DateWindow::default())
            .await
            .unwrap()
            .is_empty());

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
