//! Domain models for the Warehouse Inventory Tracker

pub mod document;
pub mod product;

pub use document::*;
pub use product::*;
