use std::cmp::Ordering;

use bigdecimal::{BigDecimal, Zero};

use crate::models::{
    PerformanceFilter, PerformanceSummary, PerformanceThresholds, ProductPerformance, SortKey,
    SortOrder,
};

pub fn matches_filter(record: &ProductPerformance, filter: &PerformanceFilter) -> bool {
    if let Some(category_id) = &filter.category_id {
        if record.category_id.as_ref() != Some(category_id) {
            return false;
        }
    }

    if let Some(supplier_id) = &filter.supplier_id {
        if record.supplier_id.as_ref() != Some(supplier_id) {
            return false;
        }
    }

    if let Some(min_quantity) = filter.min_quantity {
        if record.total_quantity_sold < min_quantity {
            return false;
        }
    }

    true
}

pub fn apply_filters(
    records: Vec<ProductPerformance>,
    filter: &PerformanceFilter,
) -> Vec<ProductPerformance> {
    records
        .into_iter()
        .filter(|record| matches_filter(record, filter))
        .collect()
}

pub fn compare_by(
    a: &ProductPerformance,
    b: &ProductPerformance,
    key: SortKey,
    order: SortOrder,
) -> Ordering {
    let ascending = match key {
        SortKey::Quantity => a.total_quantity_sold.cmp(&b.total_quantity_sold),
        SortKey::Revenue => a.total_revenue.cmp(&b.total_revenue),
        SortKey::Profit => a.total_profit.cmp(&b.total_profit),
    };

    match order {
        SortOrder::Asc => ascending,
        SortOrder::Desc => ascending.reverse(),
    }
}

/// Orders records in place.
///
/// An explicit `sort_by` always decides first; the performance lens only breaks
/// its ties, and remaining ties keep grouping order. This matches sorting by the
/// lens and then stably re-sorting by `sort_by`.
pub fn rank(records: &mut [ProductPerformance], filter: &PerformanceFilter) {
    let explicit = filter.sort_by.map(|key| (key, filter.sort_order));
    let lens = filter.performance_type.default_ordering();

    if explicit.is_none() && lens.is_none() {
        return;
    }

    records.sort_by(|a, b| {
        let primary = explicit.map_or(Ordering::Equal, |(key, order)| compare_by(a, b, key, order));
        primary.then_with(|| {
            lens.map_or(Ordering::Equal, |(key, order)| compare_by(a, b, key, order))
        })
    });
}

/// Totals over the records that survived filtering.
pub fn summarize(
    records: &[ProductPerformance],
    thresholds: &PerformanceThresholds,
) -> PerformanceSummary {
    let mut total_quantity_sold = 0u64;
    let mut total_revenue = BigDecimal::zero();
    let mut total_profit = BigDecimal::zero();
    let mut margin_sum = 0.0;
    let mut best_selling_count = 0;
    let mut slow_moving_count = 0;
    let mut stock_value = BigDecimal::zero();
    let mut dead_stock_value = BigDecimal::zero();

    for record in records {
        total_quantity_sold += record.total_quantity_sold;
        total_revenue += &record.total_revenue;
        total_profit += &record.total_profit;
        margin_sum += record.profit_margin;

        if record.sales_frequency >= thresholds.best_selling_min_frequency {
            best_selling_count += 1;
        }
        if record.sales_frequency < thresholds.slow_moving_max_frequency {
            slow_moving_count += 1;
        }

        let value = record.stock_value();
        if is_dead_stock(record, thresholds) {
            dead_stock_value += &value;
        }
        stock_value += value;
    }

    let average_profit_margin = if records.is_empty() {
        0.0
    } else {
        margin_sum / records.len() as f64
    };

    PerformanceSummary {
        total_items: records.len(),
        total_quantity_sold,
        total_revenue,
        total_profit,
        average_profit_margin,
        best_selling_count,
        slow_moving_count,
        stock_value,
        dead_stock_value,
    }
}

/// Stock still on hand with no sale for at least `dead_stock_days`.
pub fn is_dead_stock(record: &ProductPerformance, thresholds: &PerformanceThresholds) -> bool {
    record.current_stock > 0
        && record
            .days_without_sale
            .is_some_and(|days| days >= thresholds.dead_stock_days)
}
