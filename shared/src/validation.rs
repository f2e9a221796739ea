//! Pure stock-ledger rules for the Warehouse Inventory Tracker
//!
//! Everything here is side-effect free: line-set aggregation, availability
//! arithmetic and field validations that the backend services translate into
//! typed API errors.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::DocumentLine;

// ============================================================================
// Field Validations
// ============================================================================

/// Validate a line quantity: strictly positive
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a counterparty (supplier or customer) name
pub fn validate_counterparty(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Counterparty name cannot be empty");
    }
    Ok(())
}

/// Validate SKU format (3-10 uppercase alphanumeric)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.len() < 3 {
        return Err("SKU must be at least 3 characters");
    }
    if sku.len() > 10 {
        return Err("SKU must be at most 10 characters");
    }
    if !sku.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err("SKU must be uppercase alphanumeric only");
    }
    Ok(())
}

// ============================================================================
// Line Set Aggregation
// ============================================================================

/// Total quantity across all lines. The same product may appear on several
/// lines; totals are computed by summation, never by product count.
pub fn total_quantity(lines: &[DocumentLine]) -> Decimal {
    lines.iter().map(|l| l.quantity).sum()
}

/// Quantity already reserved for one product within a line set
pub fn reserved_for(lines: &[DocumentLine], product_id: Uuid) -> Decimal {
    lines
        .iter()
        .filter(|l| l.product_id == product_id)
        .map(|l| l.quantity)
        .sum()
}

/// Stock still available for a product once in-document reservations are
/// deducted. Negative results are clamped to zero.
pub fn available_quantity(stock_qty: Decimal, reserved: Decimal) -> Decimal {
    (stock_qty - reserved).max(Decimal::ZERO)
}

/// Outcome of checking a delivery line set against current stock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityShortfall {
    pub product_id: Uuid,
    /// Maximum quantity the product could still satisfy
    pub available: Decimal,
}

/// Check a delivery line set against a stock lookup: the cumulative quantity
/// requested for each product must not exceed its current stock. Returns the
/// first offending product with the maximum satisfiable quantity.
///
/// Advisory at composition time; the validation engine re-derives the same
/// comparison under a transaction at commit time.
pub fn check_delivery_lines<F>(
    lines: &[DocumentLine],
    stock_of: F,
) -> Result<(), AvailabilityShortfall>
where
    F: Fn(Uuid) -> Decimal,
{
    for (idx, line) in lines.iter().enumerate() {
        let reserved_before = reserved_for(&lines[..idx], line.product_id);
        let stock = stock_of(line.product_id);
        if reserved_before + line.quantity > stock {
            return Err(AvailabilityShortfall {
                product_id: line.product_id,
                available: available_quantity(stock, reserved_before),
            });
        }
    }
    Ok(())
}
