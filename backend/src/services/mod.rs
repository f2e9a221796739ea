//! Business logic services for the Warehouse Inventory Tracker

pub mod document;
pub mod product;

pub use document::DocumentService;
pub use product::ProductService;
