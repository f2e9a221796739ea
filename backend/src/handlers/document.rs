//! HTTP handlers for receipt and delivery endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::document::{CreateDocumentInput, DocumentService, UpdateDocumentInput};
use crate::AppState;
use shared::models::{Document, DocumentType};
use shared::types::{PaginatedResponse, Pagination};

/// List receipts
pub async fn list_receipts(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<Document>>> {
    let service = DocumentService::new(state.db);
    let documents = service
        .list_documents(DocumentType::Receipt, pagination)
        .await?;
    Ok(Json(documents))
}

/// Create a receipt
pub async fn create_receipt(
    State(state): State<AppState>,
    Json(input): Json<CreateDocumentInput>,
) -> AppResult<Json<Document>> {
    let service = DocumentService::new(state.db);
    let document = service
        .create_document(DocumentType::Receipt, input)
        .await?;
    Ok(Json(document))
}

/// List deliveries
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<Document>>> {
    let service = DocumentService::new(state.db);
    let documents = service
        .list_documents(DocumentType::Delivery, pagination)
        .await?;
    Ok(Json(documents))
}

/// Create a delivery
pub async fn create_delivery(
    State(state): State<AppState>,
    Json(input): Json<CreateDocumentInput>,
) -> AppResult<Json<Document>> {
    let service = DocumentService::new(state.db);
    let document = service
        .create_document(DocumentType::Delivery, input)
        .await?;
    Ok(Json(document))
}

/// Get a document with its lines
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<Document>> {
    let service = DocumentService::new(state.db);
    let document = service.get_document(document_id).await?;
    Ok(Json(document))
}

/// Update a document's header and/or replace its line set
pub async fn update_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(input): Json<UpdateDocumentInput>,
) -> AppResult<Json<Document>> {
    let service = DocumentService::new(state.db);
    let document = service.update_document(document_id, input).await?;
    Ok(Json(document))
}

/// Delete a document
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = DocumentService::new(state.db);
    service.delete_document(document_id).await?;
    Ok(Json(()))
}

/// Validate a document, committing its stock effect
pub async fn validate_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<Document>> {
    let service = DocumentService::new(state.db);
    let document = service.validate_document(document_id).await?;
    Ok(Json(document))
}
