//! Stock document models: receipts, deliveries and their line items

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of stock document, determining the polarity of its stock effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Inbound supplier intake, increases stock on validation
    Receipt,
    /// Outbound customer dispatch, decreases stock on validation
    Delivery,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Receipt => "receipt",
            DocumentType::Delivery => "delivery",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "receipt" => Some(DocumentType::Receipt),
            "delivery" => Some(DocumentType::Delivery),
            _ => None,
        }
    }

    /// Prefix of the human-readable sequential code
    pub fn code_prefix(&self) -> &'static str {
        match self {
            DocumentType::Receipt => "RCP",
            DocumentType::Delivery => "DEL",
        }
    }

    /// Format a sequential code, e.g. `RCP-003`
    pub fn format_code(&self, sequence: i64) -> String {
        format!("{}-{:03}", self.code_prefix(), sequence)
    }
}

/// Document workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Waiting,
    Ready,
    Done,
    Canceled,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Waiting => "waiting",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Done => "done",
            DocumentStatus::Canceled => "canceled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(DocumentStatus::Draft),
            "waiting" => Some(DocumentStatus::Waiting),
            "ready" => Some(DocumentStatus::Ready),
            "done" => Some(DocumentStatus::Done),
            "canceled" => Some(DocumentStatus::Canceled),
            _ => None,
        }
    }

    /// Terminal statuses accept no further edits or validation.
    /// `done` marks a committed stock effect; `canceled` an abandoned one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Done | DocumentStatus::Canceled)
    }
}

/// A (product, quantity) line item owned by its document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

/// A stock document with its line items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub doc_type: DocumentType,
    pub code: String,
    pub counterparty: String,
    pub doc_date: NaiveDate,
    pub status: DocumentStatus,
    pub items: Vec<DocumentLine>,
    pub total_quantity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
