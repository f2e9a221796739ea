//! Product models and stock status rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derived stock status relative to the reorder level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Ok,
    Low,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Ok => "ok",
            StockStatus::Low => "low",
        }
    }
}

/// Compute the derived status of a product from its stock and reorder level.
/// A product sitting exactly at its reorder level is already low.
pub fn stock_status(stock_qty: Decimal, reorder_level: Decimal) -> StockStatus {
    if stock_qty > reorder_level {
        StockStatus::Ok
    } else {
        StockStatus::Low
    }
}

/// A stocked product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub uom: String,
    pub stock_qty: Decimal,
    pub reorder_level: Decimal,
    pub status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
