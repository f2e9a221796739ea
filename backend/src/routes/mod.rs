//! Route definitions for the Warehouse Inventory Tracker

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Product catalog and stock ledger
        .nest("/products", product_routes())
        // Stock documents
        .route(
            "/receipts",
            get(handlers::list_receipts).post(handlers::create_receipt),
        )
        .route(
            "/deliveries",
            get(handlers::list_deliveries).post(handlers::create_delivery),
        )
        .nest("/documents", document_routes())
}

/// Product management routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/:product_id/stock-adjustments",
            post(handlers::adjust_stock),
        )
        .route("/:product_id/availability", get(handlers::get_availability))
}

/// Document routes shared by receipts and deliveries
fn document_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:document_id",
            get(handlers::get_document)
                .put(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route("/:document_id/validate", post(handlers::validate_document))
}
