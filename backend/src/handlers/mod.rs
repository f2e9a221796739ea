//! HTTP handlers for the Warehouse Inventory Tracker

pub mod document;
pub mod health;
pub mod product;

pub use document::*;
pub use health::*;
pub use product::*;
