//! Shared types and models for the Warehouse Inventory Tracker
//!
//! This crate contains the domain model (products, stock documents, line
//! items) and the pure stock-ledger rules shared between the backend and
//! other components of the system.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
