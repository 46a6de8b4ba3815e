//! Ratios and classifications computed from the accumulated totals.
//!
//! Every ratio saturates to zero when its denominator is zero so the output never
//! carries NaN or infinity.

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use chrono::{DateTime, Utc};

use crate::grouping::PerformanceAccumulator;
use crate::models::{ProductPerformance, StockStatus};

const MILLIS_PER_DAY: i64 = 86_400_000;
const PRICE_SCALE: i64 = 4;

pub fn derive_performance(
    acc: PerformanceAccumulator,
    distinct_active_days: u32,
    now: DateTime<Utc>,
) -> ProductPerformance {
    let average_selling_price = average_selling_price(&acc.total_revenue, acc.total_quantity_sold);
    let profit_margin = profit_margin(&acc.total_profit, &acc.total_revenue);
    let sales_frequency = sales_frequency(acc.total_quantity_sold, distinct_active_days);
    let stock_turnover = stock_turnover(acc.total_quantity_sold, acc.current_stock);
    let days_without_sale = days_without_sale(acc.last_sale_date, now);
    let stock_status = classify_stock(acc.current_stock, acc.min_stock, acc.max_stock);

    ProductPerformance {
        product_id: acc.product_id,
        barcode: acc.barcode,
        name: acc.name,
        category_id: acc.category_id,
        category_name: acc.category_name,
        supplier_id: acc.supplier_id,
        supplier_name: acc.supplier_name,
        total_quantity_sold: acc.total_quantity_sold,
        total_revenue: acc.total_revenue,
        total_profit: acc.total_profit,
        average_selling_price,
        profit_margin,
        sales_frequency,
        stock_turnover,
        days_without_sale,
        last_sale_date: acc.last_sale_date,
        stock_status,
        purchase_cost: acc.purchase_cost,
        current_stock: acc.current_stock,
        min_stock: acc.min_stock,
        max_stock: acc.max_stock,
    }
}

pub fn average_selling_price(total_revenue: &BigDecimal, total_quantity_sold: u64) -> BigDecimal {
    if total_quantity_sold == 0 {
        return BigDecimal::zero();
    }

    (total_revenue / BigDecimal::from(total_quantity_sold)).round(PRICE_SCALE)
}

/// Profit as a percentage of revenue.
pub fn profit_margin(total_profit: &BigDecimal, total_revenue: &BigDecimal) -> f64 {
    if total_revenue.is_zero() {
        return 0.0;
    }

    finite_or_zero((total_profit * BigDecimal::from(100) / total_revenue).to_f64())
}

pub fn sales_frequency(total_quantity_sold: u64, distinct_active_days: u32) -> f64 {
    if distinct_active_days == 0 {
        return 0.0;
    }

    total_quantity_sold as f64 / f64::from(distinct_active_days)
}

/// Units sold per unit on hand. Empty or negative stock yields 0.
pub fn stock_turnover(total_quantity_sold: u64, current_stock: i32) -> f64 {
    if current_stock <= 0 {
        return 0.0;
    }

    total_quantity_sold as f64 / f64::from(current_stock)
}

/// Whole days elapsed since the last sale, rounded down.
pub fn days_without_sale(last_sale_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    last_sale_date.map(|last| (now - last).num_milliseconds().div_euclid(MILLIS_PER_DAY))
}

/// Overstock wins over low stock when thresholds are misconfigured (`max < min`).
pub fn classify_stock(current_stock: i32, min_stock: i32, max_stock: i32) -> StockStatus {
    if current_stock > max_stock {
        StockStatus::Overstock
    } else if current_stock < min_stock {
        StockStatus::LowStock
    } else {
        StockStatus::Normal
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}
