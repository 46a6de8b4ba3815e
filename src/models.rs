use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Catalog identifier of a product.
    ProductId
);
string_id!(CategoryId);
string_id!(SupplierId);
string_id!(TransactionId);

/// One entry of a transaction. `line_total` is taken as supplied since
/// discounts may make it differ from `quantity * unit_price`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: BigDecimal,
    pub line_total: BigDecimal,

    /// Cost snapshot taken at sale time. Falls back to the catalog cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_cost: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,

    #[serde(default)]
    pub purchased_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    #[serde(default)]
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    pub purchase_cost: BigDecimal,
    pub current_stock: i32,
    pub min_stock: i32,
    pub max_stock: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StockStatus {
    LowStock,
    Normal,
    Overstock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowStock => "LowStock",
            Self::Normal => "Normal",
            Self::Overstock => "Overstock",
        }
    }
}

/// Aggregated and derived sales figures for one product over the queried window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductPerformance {
    pub product_id: ProductId,
    pub barcode: String,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: Option<String>,

    pub total_quantity_sold: u64,
    pub total_revenue: BigDecimal,
    pub total_profit: BigDecimal,

    pub average_selling_price: BigDecimal,
    /// Percentage, 0 when nothing was earned.
    pub profit_margin: f64,
    /// Units per active sales day.
    pub sales_frequency: f64,
    pub stock_turnover: f64,
    pub days_without_sale: Option<i64>,
    pub last_sale_date: Option<DateTime<Utc>>,
    pub stock_status: StockStatus,

    pub purchase_cost: BigDecimal,
    pub current_stock: i32,
    pub min_stock: i32,
    pub max_stock: i32,
}

impl ProductPerformance {
    /// On-hand stock valued at purchase cost. Negative stock counts as empty.
    pub fn stock_value(&self) -> BigDecimal {
        BigDecimal::from(self.current_stock.max(0)) * &self.purchase_cost
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceType {
    BestSelling,
    SlowMoving,
    #[default]
    All,
}

impl PerformanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestSelling => "best-selling",
            Self::SlowMoving => "slow-moving",
            Self::All => "all",
        }
    }

    /// Ordering implied by the lens when no explicit sort is requested.
    pub fn default_ordering(&self) -> Option<(SortKey, SortOrder)> {
        match self {
            Self::BestSelling => Some((SortKey::Quantity, SortOrder::Desc)),
            Self::SlowMoving => Some((SortKey::Quantity, SortOrder::Asc)),
            Self::All => None,
        }
    }
}

impl FromStr for PerformanceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "best-selling" => Ok(Self::BestSelling),
            "slow-moving" => Ok(Self::SlowMoving),
            "all" => Ok(Self::All),
            _ => Err(AppError::InvalidParameter {
                name: "performance_type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Quantity,
    Revenue,
    Profit,
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quantity" => Ok(Self::Quantity),
            "revenue" => Ok(Self::Revenue),
            "profit" => Ok(Self::Profit),
            _ => Err(AppError::InvalidParameter {
                name: "sort_by",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(AppError::InvalidParameter {
                name: "sort_order",
                value: s.to_string(),
            }),
        }
    }
}

/// Parsed filter and ordering request understood by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceFilter {
    pub performance_type: PerformanceType,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
    pub min_quantity: Option<u64>,
    pub sort_by: Option<SortKey>,
    pub sort_order: SortOrder,
}

/// Inclusive purchase-date window. An open bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| *at >= start) && self.end.is_none_or(|end| *at <= end)
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }
}

/// Loose request as received from a report screen. Enumerated fields stay
/// strings so unknown values can fall back instead of being rejected.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct PerformanceQuery {
    pub performance_type: Option<String>,

    #[validate(length(min = 1, max = 64))]
    pub category_id: Option<String>,

    #[validate(length(min = 1, max = 64))]
    pub supplier_id: Option<String>,

    #[validate(range(max = 1_000_000, message = "min_quantity is too large"))]
    pub min_quantity: Option<u64>,

    pub sort_by: Option<String>,
    pub sort_order: Option<String>,

    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl PerformanceQuery {
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start_date, self.end_date)
    }

    pub fn filter(&self) -> PerformanceFilter {
        let performance_type = self
            .performance_type
            .as_deref()
            .map(|raw| {
                raw.parse::<PerformanceType>().unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Falling back to the 'all' performance lens");
                    PerformanceType::All
                })
            })
            .unwrap_or_default();

        let sort_by = self.sort_by.as_deref().and_then(|raw| {
            raw.parse::<SortKey>()
                .map_err(|e| {
                    tracing::warn!(error = %e, "Ignoring sort key, using lens ordering");
                })
                .ok()
        });

        let sort_order = self
            .sort_order
            .as_deref()
            .map(|raw| {
                raw.parse::<SortOrder>().unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Falling back to descending order");
                    SortOrder::Desc
                })
            })
            .unwrap_or_default();

        PerformanceFilter {
            performance_type,
            category_id: self.category_id.clone().map(CategoryId::from),
            supplier_id: self.supplier_id.clone().map(SupplierId::from),
            min_quantity: self.min_quantity,
            sort_by,
            sort_order,
        }
    }
}

/// Cut-offs used when counting best-selling, slow-moving and dead stock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceThresholds {
    pub best_selling_min_frequency: f64,
    pub slow_moving_max_frequency: f64,
    pub dead_stock_days: i64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            best_selling_min_frequency: 1.0,
            slow_moving_max_frequency: 0.5,
            dead_stock_days: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SkipReason {
    UnknownProduct,
    MissingDate,
    ZeroQuantity,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownProduct => "unknown_product",
            Self::MissingDate => "missing_date",
            Self::ZeroQuantity => "zero_quantity",
        }
    }
}

/// A line item left out of the aggregation, kept so data problems stay visible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedLineItem {
    pub transaction_id: TransactionId,
    pub line_index: usize,
    pub product_id: ProductId,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceSummary {
    pub total_items: usize,
    pub total_quantity_sold: u64,
    pub total_revenue: BigDecimal,
    pub total_profit: BigDecimal,
    pub average_profit_margin: f64,
    pub best_selling_count: usize,
    pub slow_moving_count: usize,
    pub stock_value: BigDecimal,
    pub dead_stock_value: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceReport {
    pub records: Vec<ProductPerformance>,
    pub summary: PerformanceSummary,
    pub distinct_active_days: u32,
    pub diagnostics: Vec<SkippedLineItem>,
    pub generated_at: DateTime<Utc>,
}
