//! Document service: receipts, deliveries and the stock-ledger state machine
//!
//! A document is composed and edited while its status is mutable; validation
//! is the only path by which its lines produce a durable stock effect, and it
//! runs as one all-or-nothing transaction.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{Document, DocumentLine, DocumentStatus, DocumentType};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{check_delivery_lines, total_quantity, validate_counterparty, validate_quantity};

/// Document service for composing and validating stock documents
#[derive(Clone)]
pub struct DocumentService {
    db: PgPool,
}

/// Database row for a document header
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    doc_type: String,
    code: String,
    counterparty: String,
    doc_date: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A (product, quantity) line as submitted by the caller
#[derive(Debug, Clone, Deserialize)]
pub struct LineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

/// Input for creating a document
#[derive(Debug, Deserialize)]
pub struct CreateDocumentInput {
    pub counterparty: String,
    pub doc_date: Option<NaiveDate>,
    #[serde(default)]
    pub lines: Vec<LineInput>,
}

/// Input for updating a document. When `lines` is present the whole line set
/// is replaced; there is no per-line patching.
#[derive(Debug, Deserialize)]
pub struct UpdateDocumentInput {
    pub counterparty: Option<String>,
    pub doc_date: Option<NaiveDate>,
    pub status: Option<DocumentStatus>,
    pub lines: Option<Vec<LineInput>>,
}

impl DocumentService {
    /// Create a new DocumentService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a document with its initial (possibly empty) line set.
    ///
    /// The sequential code comes from a per-type atomic counter incremented
    /// inside the same transaction as the insert, so two concurrent creates
    /// cannot observe the same sequence value.
    pub async fn create_document(
        &self,
        doc_type: DocumentType,
        input: CreateDocumentInput,
    ) -> AppResult<Document> {
        validate_counterparty(&input.counterparty).map_err(|message| AppError::Validation {
            field: "counterparty".to_string(),
            message: message.to_string(),
        })?;
        let lines = self.check_lines(doc_type, &input.lines).await?;
        let doc_date = input.doc_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let sequence = next_sequence(&mut tx, doc_type).await?;
        let code = doc_type.format_code(sequence);

        let document_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO documents (doc_type, code, counterparty, doc_date, status)
            VALUES ($1, $2, $3, $4, 'draft')
            RETURNING id
            "#,
        )
        .bind(doc_type.as_str())
        .bind(&code)
        .bind(input.counterparty.trim())
        .bind(doc_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db)
                if db.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                AppError::Conflict(format!("Document code {} already exists", code))
            }
            other => other.into(),
        })?;

        insert_lines(&mut tx, document_id, &lines).await?;

        tx.commit().await?;

        tracing::info!(code = %code, doc_type = doc_type.as_str(), "document created");
        self.get_document(document_id).await
    }

    /// Get a document with its ordered lines and total quantity
    pub async fn get_document(&self, document_id: Uuid) -> AppResult<Document> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, doc_type, code, counterparty, doc_date, status, created_at, updated_at
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Document".to_string()))?;

        let items = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT product_id, quantity
            FROM document_lines
            WHERE document_id = $1
            ORDER BY position
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(product_id, quantity)| DocumentLine {
            product_id,
            quantity,
        })
        .collect();

        assemble_document(row, items)
    }

    /// List documents of one type, newest first
    pub async fn list_documents(
        &self,
        doc_type: DocumentType,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Document>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE doc_type = $1")
            .bind(doc_type.as_str())
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, doc_type, code, counterparty, doc_date, status, created_at, updated_at
            FROM documents
            WHERE doc_type = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(doc_type.as_str())
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        // Fetch lines only for the documents on this page
        let document_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let line_rows = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
            r#"
            SELECT document_id, product_id, quantity
            FROM document_lines
            WHERE document_id = ANY($1)
            ORDER BY document_id, position
            "#,
        )
        .bind(&document_ids)
        .fetch_all(&self.db)
        .await?;

        let mut lines_by_document: HashMap<Uuid, Vec<DocumentLine>> = HashMap::new();
        for (document_id, product_id, quantity) in line_rows {
            lines_by_document
                .entry(document_id)
                .or_default()
                .push(DocumentLine {
                    product_id,
                    quantity,
                });
        }

        let data = rows
            .into_iter()
            .map(|row| {
                let items = lines_by_document.remove(&row.id).unwrap_or_default();
                assemble_document(row, items)
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Update a document's header and, when `lines` is present, replace its
    /// line set wholesale (delete-then-reinsert). Editing never touches stock.
    pub async fn update_document(
        &self,
        document_id: Uuid,
        input: UpdateDocumentInput,
    ) -> AppResult<Document> {
        if let Some(ref counterparty) = input.counterparty {
            validate_counterparty(counterparty).map_err(|message| AppError::Validation {
                field: "counterparty".to_string(),
                message: message.to_string(),
            })?;
        }

        // Done is reserved for the validation engine
        if input.status == Some(DocumentStatus::Done) {
            return Err(AppError::InvalidStateTransition(
                "Status done can only be reached through validation".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        // Lock the header: the terminal check and the write below must see
        // the same status, or a concurrent validation committing in between
        // would be silently overwritten.
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, doc_type, code, counterparty, doc_date, status, created_at, updated_at
            FROM documents
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Document".to_string()))?;

        let doc_type = parse_doc_type(&row.doc_type)?;
        let current = parse_status(&row.status)?;
        if current.is_terminal() {
            return Err(terminal_error(current, &row.code));
        }

        let lines = match input.lines {
            Some(ref line_inputs) => Some(self.check_lines(doc_type, line_inputs).await?),
            None => None,
        };

        let counterparty = input
            .counterparty
            .map(|c| c.trim().to_string())
            .unwrap_or(row.counterparty);
        let doc_date = input.doc_date.unwrap_or(row.doc_date);
        let status = input.status.unwrap_or(current);

        sqlx::query(
            r#"
            UPDATE documents
            SET counterparty = $1, doc_date = $2, status = $3
            WHERE id = $4
            "#,
        )
        .bind(&counterparty)
        .bind(doc_date)
        .bind(status.as_str())
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

        if let Some(ref lines) = lines {
            sqlx::query("DELETE FROM document_lines WHERE document_id = $1")
                .bind(document_id)
                .execute(&mut *tx)
                .await?;
            insert_lines(&mut tx, document_id, lines).await?;
        }

        tx.commit().await?;

        self.get_document(document_id).await
    }

    /// Delete a document and, via cascade, its lines.
    ///
    /// Validated documents are an immutable ledger: deleting one is rejected
    /// rather than silently leaving its stock effect in place.
    pub async fn delete_document(&self, document_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        // Lock the header; a document a concurrent transaction is busy
        // validating must surface as terminal here, not be deleted.
        let (code, status) = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT code, status
            FROM documents
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Document".to_string()))?;

        if parse_status(&status)? == DocumentStatus::Done {
            return Err(AppError::InvalidStateTransition(format!(
                "Document {} is validated and cannot be deleted",
                code
            )));
        }

        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Validate a document: apply every line's stock delta and flip the
    /// status to done, as one atomic unit.
    ///
    /// The header row is locked for the duration so a concurrent validation
    /// of the same document waits and then fails on the terminal status
    /// instead of double-counting stock.
    pub async fn validate_document(&self, document_id: Uuid) -> AppResult<Document> {
        let mut tx = self.db.begin().await?;

        let (doc_type, code, status) = sqlx::query_as::<_, (String, String, String)>(
            r#"
            SELECT doc_type, code, status
            FROM documents
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Document".to_string()))?;

        let doc_type = parse_doc_type(&doc_type)?;
        let status = parse_status(&status)?;
        if status.is_terminal() {
            return Err(terminal_error(status, &code));
        }

        let lines = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT product_id, quantity
            FROM document_lines
            WHERE document_id = $1
            ORDER BY position
            "#,
        )
        .bind(document_id)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "Document has no lines to validate".to_string(),
            });
        }

        // Apply line deltas one by one; any failure drops the transaction
        // and rolls back every prior application.
        for (product_id, quantity) in lines {
            match doc_type {
                DocumentType::Receipt => {
                    let result = sqlx::query(
                        "UPDATE products SET stock_qty = stock_qty + $1 WHERE id = $2",
                    )
                    .bind(quantity)
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        return Err(AppError::NotFound(format!("Product {}", product_id)));
                    }
                }
                DocumentType::Delivery => {
                    // Check and decrement in one statement; under row locking
                    // two racing deliveries cannot both pass on the same stock.
                    let result = sqlx::query(
                        r#"
                        UPDATE products
                        SET stock_qty = stock_qty - $1
                        WHERE id = $2 AND stock_qty >= $1
                        "#,
                    )
                    .bind(quantity)
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        let available = sqlx::query_scalar::<_, Decimal>(
                            "SELECT stock_qty FROM products WHERE id = $1",
                        )
                        .bind(product_id)
                        .fetch_optional(&mut *tx)
                        .await?
                        .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;

                        return Err(AppError::InsufficientStock {
                            product_id,
                            available,
                        });
                    }
                }
            }
        }

        sqlx::query("UPDATE documents SET status = 'done' WHERE id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(code = %code, "document validated");
        self.get_document(document_id).await
    }

    /// Validate a submitted line set: every product must exist, every
    /// quantity must be positive, and for deliveries the cumulative quantity
    /// per product must not exceed current stock.
    ///
    /// The availability part is advisory: stock may change between
    /// composition and validation, and only the validation engine's
    /// in-transaction check is authoritative.
    async fn check_lines(
        &self,
        doc_type: DocumentType,
        inputs: &[LineInput],
    ) -> AppResult<Vec<DocumentLine>> {
        for input in inputs {
            validate_quantity(input.quantity).map_err(|message| AppError::Validation {
                field: "lines".to_string(),
                message: message.to_string(),
            })?;
        }

        let lines: Vec<DocumentLine> = inputs
            .iter()
            .map(|l| DocumentLine {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect();

        if lines.is_empty() {
            return Ok(lines);
        }

        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let stocks: HashMap<Uuid, Decimal> = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT id, stock_qty FROM products WHERE id = ANY($1)",
        )
        .bind(&product_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();

        for line in &lines {
            if !stocks.contains_key(&line.product_id) {
                return Err(AppError::NotFound(format!("Product {}", line.product_id)));
            }
        }

        if doc_type == DocumentType::Delivery {
            check_delivery_lines(&lines, |id| stocks.get(&id).copied().unwrap_or(Decimal::ZERO))
                .map_err(|shortfall| AppError::InsufficientStock {
                    product_id: shortfall.product_id,
                    available: shortfall.available,
                })?;
        }

        Ok(lines)
    }
}

/// Increment the per-type document counter and return its new value.
/// Runs inside the caller's transaction.
async fn next_sequence(
    tx: &mut Transaction<'_, Postgres>,
    doc_type: DocumentType,
) -> AppResult<i64> {
    let sequence = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO document_counters (doc_type, value)
        VALUES ($1, 1)
        ON CONFLICT (doc_type)
        DO UPDATE SET value = document_counters.value + 1
        RETURNING value
        "#,
    )
    .bind(doc_type.as_str())
    .fetch_one(&mut **tx)
    .await?;

    Ok(sequence)
}

/// Insert a line set preserving submission order
async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    lines: &[DocumentLine],
) -> AppResult<()> {
    for (position, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO document_lines (document_id, position, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(document_id)
        .bind(position as i32)
        .bind(line.product_id)
        .bind(line.quantity)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Error for a mutation attempted on a terminal document: done means the
/// stock effect is committed, canceled means the document was abandoned.
fn terminal_error(status: DocumentStatus, code: &str) -> AppError {
    match status {
        DocumentStatus::Done => AppError::AlreadyValidated(code.to_string()),
        _ => AppError::InvalidStateTransition(format!(
            "Document {} is canceled and accepts no further changes",
            code
        )),
    }
}

fn parse_doc_type(s: &str) -> AppResult<DocumentType> {
    DocumentType::from_str(s)
        .ok_or_else(|| AppError::Internal(format!("Unknown document type: {}", s)))
}

fn parse_status(s: &str) -> AppResult<DocumentStatus> {
    DocumentStatus::from_str(s)
        .ok_or_else(|| AppError::Internal(format!("Unknown document status: {}", s)))
}

fn assemble_document(row: DocumentRow, items: Vec<DocumentLine>) -> AppResult<Document> {
    let doc_type = parse_doc_type(&row.doc_type)?;
    let status = parse_status(&row.status)?;
    let total = total_quantity(&items);

    Ok(Document {
        id: row.id,
        doc_type,
        code: row.code,
        counterparty: row.counterparty,
        doc_date: row.doc_date,
        status,
        items,
        total_quantity: total,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
