//! Folds a transaction log into one running total per product.
//!
//! Grouping order follows the first appearance of each product in the log, which
//! later serves as the tie-break of the ranking stage.

use std::collections::{HashMap, HashSet};

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use crate::models::{
    CategoryId, LineItem, Product, ProductId, SkipReason, SkippedLineItem, SupplierId, Transaction,
};

/// Per-product totals before any ratio is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceAccumulator {
    pub product_id: ProductId,
    pub barcode: String,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: Option<String>,
    pub purchase_cost: BigDecimal,
    pub current_stock: i32,
    pub min_stock: i32,
    pub max_stock: i32,

    pub total_quantity_sold: u64,
    pub total_revenue: BigDecimal,
    pub total_profit: BigDecimal,
    pub last_sale_date: Option<DateTime<Utc>>,
}

impl PerformanceAccumulator {
    pub fn new(product: &Product) -> Self {
        Self {
            product_id: product.product_id.clone(),
            barcode: product.barcode.clone(),
            name: product.name.clone(),
            category_id: product.category_id.clone(),
            category_name: product.category_name.clone(),
            supplier_id: product.supplier_id.clone(),
            supplier_name: product.supplier_name.clone(),
            purchase_cost: product.purchase_cost.clone(),
            current_stock: product.current_stock,
            min_stock: product.min_stock,
            max_stock: product.max_stock,
            total_quantity_sold: 0,
            total_revenue: BigDecimal::zero(),
            total_profit: BigDecimal::zero(),
            last_sale_date: None,
        }
    }

    pub fn record_sale(&mut self, item: &LineItem, sold_at: DateTime<Utc>) {
        let cost = item.purchase_cost.as_ref().unwrap_or(&self.purchase_cost);
        let quantity = BigDecimal::from(item.quantity);

        self.total_quantity_sold += u64::from(item.quantity);
        self.total_revenue += &item.line_total;
        self.total_profit += (&item.unit_price - cost) * quantity;

        if self.last_sale_date.is_none_or(|last| sold_at > last) {
            self.last_sale_date = Some(sold_at);
        }
    }
}

/// Result of checking a single line item before it is folded in.
#[derive(Debug, Clone, Copy)]
pub enum LineItemOutcome<'a> {
    Accepted {
        product: &'a Product,
        sold_at: DateTime<Utc>,
    },
    Skipped(SkipReason),
}

pub fn resolve_line_item<'a>(
    transaction: &Transaction,
    item: &LineItem,
    products: &'a HashMap<ProductId, Product>,
) -> LineItemOutcome<'a> {
    let Some(sold_at) = transaction.purchased_at else {
        return LineItemOutcome::Skipped(SkipReason::MissingDate);
    };

    let Some(product) = products.get(&item.product_id) else {
        return LineItemOutcome::Skipped(SkipReason::UnknownProduct);
    };

    if item.quantity == 0 {
        return LineItemOutcome::Skipped(SkipReason::ZeroQuantity);
    }

    LineItemOutcome::Accepted { product, sold_at }
}

#[derive(Debug, Clone, Default)]
pub struct GroupedSales {
    pub accumulators: Vec<PerformanceAccumulator>,
    /// Number of calendar days (UTC) with at least one dated transaction, never below 1.
    pub distinct_active_days: u32,
    pub skipped: Vec<SkippedLineItem>,
}

pub fn group_sales(
    transactions: &[Transaction],
    products: &HashMap<ProductId, Product>,
) -> GroupedSales {
    let mut accumulators: Vec<PerformanceAccumulator> = Vec::new();
    let mut positions: HashMap<ProductId, usize> = HashMap::new();
    let mut active_days: HashSet<NaiveDate> = HashSet::new();
    let mut skipped = Vec::new();

    for transaction in transactions {
        if let Some(purchased_at) = transaction.purchased_at {
            active_days.insert(purchased_at.date_naive());
        }

        for (line_index, item) in transaction.items.iter().enumerate() {
            match resolve_line_item(transaction, item, products) {
                LineItemOutcome::Accepted { product, sold_at } => {
                    let position = *positions
                        .entry(product.product_id.clone())
                        .or_insert_with(|| {
                            accumulators.push(PerformanceAccumulator::new(product));
                            accumulators.len() - 1
                        });
                    accumulators[position].record_sale(item, sold_at);
                }
                LineItemOutcome::Skipped(reason) => {
                    warn!(
                        transaction_id = %transaction.transaction_id,
                        line_index,
                        product_id = %item.product_id,
                        reason = reason.as_str(),
                        "Skipping line item"
                    );
                    metrics::counter!(
                        "sales_performance_skipped_line_items_total",
                        "reason" => reason.as_str()
                    )
                    .increment(1);

                    skipped.push(SkippedLineItem {
                        transaction_id: transaction.transaction_id.clone(),
                        line_index,
                        product_id: item.product_id.clone(),
                        reason,
                    });
                }
            }
        }
    }

    let distinct_active_days = u32::try_from(active_days.len()).unwrap_or(u32::MAX).max(1);

    GroupedSales {
        accumulators,
        distinct_active_days,
        skipped,
    }
}
