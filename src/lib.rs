//! Sales performance aggregation.
//!
//! Turns a transaction log and a product catalog into per-product performance
//! records (quantity, revenue, profit, margin, turnover, staleness, stock health),
//! then filters and ranks them and reduces the survivors to summary totals.
//!
//! The pipeline runs in three stages: [`grouping`], [`derivation`] and [`ranking`],
//! wired together by [`engine::compute_sales_performance`].

pub mod clock;
pub mod config;
pub mod derivation;
pub mod engine;
pub mod error;
pub mod grouping;
pub mod models;
pub mod observability;
pub mod ranking;
pub mod repositories;
pub mod services;

pub use engine::{SalesPerformanceEngine, compute_sales_performance};

#[cfg(test)]
pub mod test_utils;
