//! Shared fixtures for unit tests.
//!
//! Builders use whole-unit prices expressed as strings so decimal values stay exact.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, TimeZone, Utc};

use crate::models::{CategoryId, LineItem, Product, ProductId, SupplierId, Transaction};

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn money(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

/// Creates a product with sensible defaults.
///
/// # Defaults
/// * category `C1`, supplier `S1`
/// * `min_stock`: 5, `max_stock`: 100
pub fn product(id: &str, purchase_cost: &str, current_stock: i32) -> Product {
    Product {
        product_id: ProductId::from(id),
        barcode: format!("899{}", id),
        name: format!("Product {}", id),
        category_id: Some(CategoryId::from("C1")),
        category_name: Some("Beverages".to_string()),
        supplier_id: Some(SupplierId::from("S1")),
        supplier_name: Some("Default Supplier".to_string()),
        purchase_cost: money(purchase_cost),
        current_stock,
        min_stock: 5,
        max_stock: 100,
    }
}

pub fn product_in(id: &str, category: &str, supplier: &str) -> Product {
    Product {
        category_id: Some(CategoryId::from(category)),
        supplier_id: Some(SupplierId::from(supplier)),
        ..product(id, "10", 20)
    }
}

/// A line item whose total is exactly `quantity * unit_price`.
pub fn line(product_id: &str, quantity: u32, unit_price: &str) -> LineItem {
    let price = money(unit_price);
    LineItem {
        product_id: ProductId::from(product_id),
        quantity,
        line_total: &price * BigDecimal::from(quantity),
        unit_price: price,
        purchase_cost: None,
    }
}

pub fn transaction(id: &str, purchased_at: DateTime<Utc>, items: Vec<LineItem>) -> Transaction {
    Transaction {
        transaction_id: id.into(),
        purchased_at: Some(purchased_at),
        items,
    }
}

pub fn catalog(products: Vec<Product>) -> HashMap<ProductId, Product> {
    products
        .into_iter()
        .map(|p| (p.product_id.clone(), p))
        .collect()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
