//! HTTP handlers for product and stock endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::product::{
    AdjustStockInput, CreateProductInput, ProductAvailability, ProductService, UpdateProductInput,
};
use crate::AppState;
use shared::models::Product;
use shared::types::{PaginatedResponse, Pagination};

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    let service = ProductService::new(state.db);
    let products = service.list_products(pagination).await?;
    Ok(Json(products))
}

/// Get a product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.create_product(input).await?;
    Ok(Json(product))
}

/// Update a product's catalog fields
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.update_product(product_id, input).await?;
    Ok(Json(product))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ProductService::new(state.db);
    service.delete_product(product_id).await?;
    Ok(Json(()))
}

/// Apply a direct stock adjustment
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<AdjustStockInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.adjust_stock(product_id, input.delta).await?;
    Ok(Json(product))
}

/// Query parameters for the availability check
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Quantity already reserved within the document being composed
    #[serde(default)]
    pub reserved: Decimal,
}

/// Check how much stock a product can still supply
pub async fn get_availability(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<ProductAvailability>> {
    let service = ProductService::new(state.db);
    let availability = service.availability(product_id, query.reserved).await?;
    Ok(Json(availability))
}
