//! Product service: catalog CRUD plus the stock-ledger primitives
//!
//! `adjust_stock` is the only direct-edit path to a product's stock; document
//! validation applies its deltas through the same conditional-update shape so
//! the non-negative invariant holds on every mutation path.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{stock_status, Product};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{available_quantity, validate_sku};

/// Product service for catalog and stock management
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Database row for a product
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    sku: String,
    category: Option<String>,
    uom: String,
    stock_qty: Decimal,
    reorder_level: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let status = stock_status(row.stock_qty, row.reorder_level);
        Product {
            id: row.id,
            name: row.name,
            sku: row.sku,
            category: row.category,
            uom: row.uom,
            stock_qty: row.stock_qty,
            reorder_level: row.reorder_level,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub uom: Option<String>,
    pub stock_qty: Option<Decimal>,
    pub reorder_level: Option<Decimal>,
}

/// Input for updating a product (stock is adjusted separately)
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub uom: Option<String>,
    pub reorder_level: Option<Decimal>,
}

/// Input for a direct stock adjustment
#[derive(Debug, Deserialize)]
pub struct AdjustStockInput {
    /// Signed delta: positive adds stock, negative removes it
    pub delta: Decimal,
}

/// Availability of a product for a proposed delivery line
#[derive(Debug, Clone, Serialize)]
pub struct ProductAvailability {
    pub product_id: Uuid,
    pub stock_qty: Decimal,
    pub reserved: Decimal,
    pub available: Decimal,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List products, newest first
    pub async fn list_products(
        &self,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Product>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, sku, category, uom, stock_qty, reorder_level, created_at, updated_at
            FROM products
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Into::into).collect(),
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Get a product by ID
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, sku, category, uom, stock_qty, reorder_level, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into())
    }

    /// Create a new product
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Product name cannot be empty".to_string(),
            });
        }
        validate_sku(&input.sku).map_err(|message| AppError::Validation {
            field: "sku".to_string(),
            message: message.to_string(),
        })?;

        let stock_qty = input.stock_qty.unwrap_or(Decimal::ZERO);
        if stock_qty < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "stock_qty".to_string(),
                message: "Stock quantity cannot be negative".to_string(),
            });
        }

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (name, sku, category, uom, stock_qty, reorder_level)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, sku, category, uom, stock_qty, reorder_level, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.sku)
        .bind(&input.category)
        .bind(input.uom.as_deref().unwrap_or("unit"))
        .bind(stock_qty)
        .bind(input.reorder_level.unwrap_or(Decimal::ZERO))
        .fetch_one(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "A product with this SKU already exists"))?;

        Ok(row.into())
    }

    /// Update a product's catalog fields
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        let existing = self.get_product(product_id).await?;

        if let Some(ref sku) = input.sku {
            validate_sku(sku).map_err(|message| AppError::Validation {
                field: "sku".to_string(),
                message: message.to_string(),
            })?;
        }

        let name = input.name.unwrap_or(existing.name);
        if name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Product name cannot be empty".to_string(),
            });
        }
        let sku = input.sku.unwrap_or(existing.sku);
        let category = input.category.or(existing.category);
        let uom = input.uom.unwrap_or(existing.uom);
        let reorder_level = input.reorder_level.unwrap_or(existing.reorder_level);

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET name = $1, sku = $2, category = $3, uom = $4, reorder_level = $5
            WHERE id = $6
            RETURNING id, name, sku, category, uom, stock_qty, reorder_level, created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(&sku)
        .bind(&category)
        .bind(&uom)
        .bind(reorder_level)
        .bind(product_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "A product with this SKU already exists"))?;

        Ok(row.into())
    }

    /// Delete a product. Rejected while any document line references it.
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db)
                    if db.kind() == sqlx::error::ErrorKind::ForeignKeyViolation =>
                {
                    AppError::Conflict("Product is referenced by document lines".to_string())
                }
                other => other.into(),
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        Ok(())
    }

    /// Apply a signed stock delta, rejecting any result below zero.
    ///
    /// The check and the write are one conditional statement so two
    /// concurrent decrements of the same product cannot both pass.
    pub async fn adjust_stock(&self, product_id: Uuid, delta: Decimal) -> AppResult<Product> {
        if delta.is_zero() {
            return Err(AppError::Validation {
                field: "delta".to_string(),
                message: "Stock delta cannot be zero".to_string(),
            });
        }

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET stock_qty = stock_qty + $1
            WHERE id = $2 AND stock_qty + $1 >= 0
            RETURNING id, name, sku, category, uom, stock_qty, reorder_level, created_at, updated_at
            "#,
        )
        .bind(delta)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                // Either the product is missing or the delta would go negative
                let available =
                    sqlx::query_scalar::<_, Decimal>("SELECT stock_qty FROM products WHERE id = $1")
                        .bind(product_id)
                        .fetch_optional(&self.db)
                        .await?
                        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

                Err(AppError::InsufficientStock {
                    product_id,
                    available,
                })
            }
        }
    }

    /// Stock still available for a product once in-document reservations are
    /// deducted. Recomputed from live stock on every call; advisory only.
    pub async fn availability(
        &self,
        product_id: Uuid,
        reserved: Decimal,
    ) -> AppResult<ProductAvailability> {
        let stock_qty =
            sqlx::query_scalar::<_, Decimal>("SELECT stock_qty FROM products WHERE id = $1")
                .bind(product_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(ProductAvailability {
            product_id,
            stock_qty,
            reserved,
            available: available_quantity(stock_qty, reserved),
        })
    }
}

/// Map a unique-constraint violation to a Conflict, pass everything else on
fn conflict_on_unique(e: sqlx::Error, message: &str) -> AppError {
    match e {
        sqlx::Error::Database(ref db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation => {
            AppError::Conflict(message.to_string())
        }
        other => other.into(),
    }
}
