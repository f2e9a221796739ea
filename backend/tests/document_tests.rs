//! Stock document state-machine tests
//!
//! Covers the core ledger properties:
//! - Non-negativity: no validation sequence drives stock below zero
//! - Atomicity: a failed validation leaves every product untouched
//! - Idempotent terminality: a document's stock effect commits exactly once,
//!   and a done document rejects edits and deletion
//! - Totals correctness and sequential code generation

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{DocumentLine, DocumentStatus, DocumentType};
use shared::validation::total_quantity;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn line(product_id: Uuid, quantity: Decimal) -> DocumentLine {
    DocumentLine {
        product_id,
        quantity,
    }
}

// ============================================================================
// Validation Engine Simulation
// ============================================================================

/// In-memory stand-in for the product stock store plus the validation
/// engine's all-or-nothing delta application.
mod engine {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ValidateError {
        AlreadyValidated,
        Canceled,
        EmptyLines,
        InsufficientStock { product_id: Uuid, available: Decimal },
    }

    #[derive(Debug, Clone)]
    pub struct Doc {
        pub doc_type: DocumentType,
        pub status: DocumentStatus,
        pub lines: Vec<DocumentLine>,
    }

    impl Doc {
        pub fn new(doc_type: DocumentType, lines: Vec<DocumentLine>) -> Self {
            Self {
                doc_type,
                status: DocumentStatus::Draft,
                lines,
            }
        }
    }

    /// Apply a document's stock effect exactly once: every line succeeds or
    /// none do, and a terminal status rejects re-validation.
    pub fn validate(
        stocks: &mut HashMap<Uuid, Decimal>,
        doc: &mut Doc,
    ) -> Result<(), ValidateError> {
        match doc.status {
            DocumentStatus::Done => return Err(ValidateError::AlreadyValidated),
            DocumentStatus::Canceled => return Err(ValidateError::Canceled),
            _ => {}
        }
        if doc.lines.is_empty() {
            return Err(ValidateError::EmptyLines);
        }

        // Work on a scratch copy; commit only when every line applied
        let mut scratch = stocks.clone();
        for l in &doc.lines {
            let stock = scratch.entry(l.product_id).or_insert(Decimal::ZERO);
            match doc.doc_type {
                DocumentType::Receipt => *stock += l.quantity,
                DocumentType::Delivery => {
                    if *stock < l.quantity {
                        return Err(ValidateError::InsufficientStock {
                            product_id: l.product_id,
                            available: *stock,
                        });
                    }
                    *stock -= l.quantity;
                }
            }
        }

        *stocks = scratch;
        doc.status = DocumentStatus::Done;
        Ok(())
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum EditError {
        NotFound,
        AlreadyValidated,
        Canceled,
    }

    /// Replace the line set, as the update path does. The terminal check
    /// runs against the same state the write sees, so a document validated
    /// a moment earlier is rejected rather than overwritten.
    pub fn replace_lines(doc: &mut Doc, lines: Vec<DocumentLine>) -> Result<(), EditError> {
        if doc.status.is_terminal() {
            return Err(match doc.status {
                DocumentStatus::Done => EditError::AlreadyValidated,
                _ => EditError::Canceled,
            });
        }
        doc.lines = lines;
        Ok(())
    }

    /// Delete a document. Validated documents are an immutable ledger and
    /// stay in place; deletion never touches stock either way.
    pub fn delete(docs: &mut HashMap<Uuid, Doc>, id: Uuid) -> Result<(), EditError> {
        match docs.get(&id) {
            None => Err(EditError::NotFound),
            Some(doc) if doc.status == DocumentStatus::Done => {
                Err(EditError::AlreadyValidated)
            }
            Some(_) => {
                docs.remove(&id);
                Ok(())
            }
        }
    }
}

use engine::{delete, replace_lines, validate, Doc, EditError, ValidateError};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Sequential creation in isolation yields RCP-001, RCP-002, RCP-003
    #[test]
    fn test_sequential_codes() {
        let codes: Vec<String> = (1..=3)
            .map(|n| DocumentType::Receipt.format_code(n))
            .collect();
        assert_eq!(codes, vec!["RCP-001", "RCP-002", "RCP-003"]);
    }

    /// Two lines for the same product total by summation, not deduplication
    #[test]
    fn test_total_quantity_duplicate_product() {
        let p = Uuid::new_v4();
        let lines = vec![line(p, dec("2")), line(p, dec("3"))];
        assert_eq!(total_quantity(&lines), dec("5"));
    }

    /// Receipt validation adds every line's quantity to stock
    #[test]
    fn test_receipt_validation_increases_stock() {
        let p = Uuid::new_v4();
        let mut stocks = HashMap::from([(p, dec("10"))]);
        let mut doc = Doc::new(
            DocumentType::Receipt,
            vec![line(p, dec("4")), line(p, dec("1.5"))],
        );

        validate(&mut stocks, &mut doc).unwrap();

        assert_eq!(stocks[&p], dec("15.5"));
        assert_eq!(doc.status, DocumentStatus::Done);
    }

    /// The concrete ledger scenario: deliver 4 of 10, re-validate, deliver 20
    #[test]
    fn test_delivery_scenario() {
        let p = Uuid::new_v4();
        let mut stocks = HashMap::from([(p, dec("10"))]);

        // Validate a delivery of 4
        let mut first = Doc::new(DocumentType::Delivery, vec![line(p, dec("4"))]);
        validate(&mut stocks, &mut first).unwrap();
        assert_eq!(stocks[&p], dec("6"));
        assert_eq!(first.status, DocumentStatus::Done);

        // A second validation of the same document is a no-op failure
        let err = validate(&mut stocks, &mut first).unwrap_err();
        assert_eq!(err, ValidateError::AlreadyValidated);
        assert_eq!(stocks[&p], dec("6"));

        // A delivery of 20 fails naming the product and the satisfiable max
        let mut second = Doc::new(DocumentType::Delivery, vec![line(p, dec("20"))]);
        let err = validate(&mut stocks, &mut second).unwrap_err();
        assert_eq!(
            err,
            ValidateError::InsufficientStock {
                product_id: p,
                available: dec("6"),
            }
        );
        assert_eq!(stocks[&p], dec("6"));
        assert_ne!(second.status, DocumentStatus::Done);
    }

    /// Failure on line k leaves products from lines 1..k-1 unchanged
    #[test]
    fn test_atomicity_on_partial_failure() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut stocks = HashMap::from([(a, dec("10")), (b, dec("1"))]);
        let mut doc = Doc::new(
            DocumentType::Delivery,
            vec![line(a, dec("5")), line(b, dec("2"))],
        );

        let err = validate(&mut stocks, &mut doc).unwrap_err();

        assert!(matches!(
            err,
            ValidateError::InsufficientStock { product_id, .. } if product_id == b
        ));
        // Line 1 must show no effect despite being applicable on its own
        assert_eq!(stocks[&a], dec("10"));
        assert_eq!(stocks[&b], dec("1"));
    }

    /// Repeated lines for the same product accumulate across applications
    #[test]
    fn test_repeated_delivery_lines_accumulate() {
        let p = Uuid::new_v4();
        let mut stocks = HashMap::from([(p, dec("10"))]);
        let mut doc = Doc::new(
            DocumentType::Delivery,
            vec![line(p, dec("6")), line(p, dec("5"))],
        );

        // 6 succeeds on its own but 6 + 5 exceeds stock
        let err = validate(&mut stocks, &mut doc).unwrap_err();
        assert_eq!(
            err,
            ValidateError::InsufficientStock {
                product_id: p,
                available: dec("4"),
            }
        );
        assert_eq!(stocks[&p], dec("10"));
    }

    /// A canceled document can no longer be validated
    #[test]
    fn test_canceled_document_rejected() {
        let p = Uuid::new_v4();
        let mut stocks = HashMap::from([(p, dec("10"))]);
        let mut doc = Doc::new(DocumentType::Delivery, vec![line(p, dec("1"))]);
        doc.status = DocumentStatus::Canceled;

        assert_eq!(
            validate(&mut stocks, &mut doc).unwrap_err(),
            ValidateError::Canceled
        );
        assert_eq!(stocks[&p], dec("10"));
    }

    /// An empty line set cannot be validated
    #[test]
    fn test_empty_lines_rejected() {
        let mut stocks = HashMap::new();
        let mut doc = Doc::new(DocumentType::Receipt, vec![]);
        assert_eq!(
            validate(&mut stocks, &mut doc).unwrap_err(),
            ValidateError::EmptyLines
        );
    }

    /// Editing replaces the line set wholesale and never touches stock
    #[test]
    fn test_edit_replaces_lines_wholesale() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let stocks = HashMap::from([(a, dec("10")), (b, dec("10"))]);
        let mut doc = Doc::new(
            DocumentType::Delivery,
            vec![line(a, dec("5")), line(b, dec("2"))],
        );

        // Full replacement, as the update path does: old lines discarded
        doc.lines = vec![line(a, dec("3"))];

        assert_eq!(doc.lines.len(), 1);
        assert_eq!(total_quantity(&doc.lines), dec("3"));
        // No validation has run, so stock is untouched
        assert_eq!(stocks[&a], dec("10"));
        assert_eq!(stocks[&b], dec("10"));
    }

    /// An edit arriving after validation committed is rejected, leaving the
    /// validated lines in place; re-validating afterwards still counts the
    /// stock effect exactly once.
    #[test]
    fn test_edit_after_validation_rejected() {
        let p = Uuid::new_v4();
        let mut stocks = HashMap::from([(p, dec("10"))]);
        let mut doc = Doc::new(DocumentType::Delivery, vec![line(p, dec("4"))]);

        validate(&mut stocks, &mut doc).unwrap();
        assert_eq!(stocks[&p], dec("6"));

        let err = replace_lines(&mut doc, vec![line(p, dec("1"))]).unwrap_err();
        assert_eq!(err, EditError::AlreadyValidated);
        assert_eq!(doc.status, DocumentStatus::Done);
        assert_eq!(total_quantity(&doc.lines), dec("4"));

        // The document stayed terminal, so its effect cannot apply twice
        assert_eq!(
            validate(&mut stocks, &mut doc).unwrap_err(),
            ValidateError::AlreadyValidated
        );
        assert_eq!(stocks[&p], dec("6"));
    }

    /// Canceled documents reject edits too
    #[test]
    fn test_edit_canceled_rejected() {
        let p = Uuid::new_v4();
        let mut doc = Doc::new(DocumentType::Receipt, vec![line(p, dec("2"))]);
        doc.status = DocumentStatus::Canceled;

        assert_eq!(
            replace_lines(&mut doc, vec![]).unwrap_err(),
            EditError::Canceled
        );
        assert_eq!(total_quantity(&doc.lines), dec("2"));
    }

    /// Deleting a validated document is rejected and its stock effect
    /// stands; a draft deletes cleanly without touching stock.
    #[test]
    fn test_delete_after_validation_rejected() {
        let p = Uuid::new_v4();
        let mut stocks = HashMap::from([(p, dec("10"))]);

        let mut validated = Doc::new(DocumentType::Delivery, vec![line(p, dec("4"))]);
        validate(&mut stocks, &mut validated).unwrap();

        let validated_id = Uuid::new_v4();
        let draft_id = Uuid::new_v4();
        let mut docs = HashMap::from([
            (validated_id, validated),
            (
                draft_id,
                Doc::new(DocumentType::Delivery, vec![line(p, dec("1"))]),
            ),
        ]);

        assert_eq!(
            delete(&mut docs, validated_id).unwrap_err(),
            EditError::AlreadyValidated
        );
        assert!(docs.contains_key(&validated_id));

        delete(&mut docs, draft_id).unwrap();
        assert!(!docs.contains_key(&draft_id));
        assert_eq!(
            delete(&mut docs, draft_id).unwrap_err(),
            EditError::NotFound
        );

        // Only the validation moved stock
        assert_eq!(stocks[&p], dec("6"));
    }

    /// Waiting and ready documents are still validatable
    #[test]
    fn test_non_terminal_statuses_are_mutable() {
        for status in [
            DocumentStatus::Draft,
            DocumentStatus::Waiting,
            DocumentStatus::Ready,
        ] {
            let p = Uuid::new_v4();
            let mut stocks = HashMap::from([(p, dec("5"))]);
            let mut doc = Doc::new(DocumentType::Delivery, vec![line(p, dec("5"))]);
            doc.status = status;

            validate(&mut stocks, &mut doc).unwrap();
            assert_eq!(stocks[&p], Decimal::ZERO);
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating valid quantities (positive decimals)
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    fn doc_type_strategy() -> impl Strategy<Value = DocumentType> {
        prop_oneof![Just(DocumentType::Receipt), Just(DocumentType::Delivery)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Non-negativity: after any sequence of validations, every stock
        /// figure stays >= 0 and failed validations change nothing.
        #[test]
        fn prop_stock_never_negative(
            docs in prop::collection::vec(
                (doc_type_strategy(), prop::collection::vec(quantity_strategy(), 1..5)),
                1..20
            ),
            initial in quantity_strategy()
        ) {
            let p = Uuid::new_v4();
            let mut stocks = HashMap::from([(p, initial)]);

            for (doc_type, quantities) in docs {
                let lines = quantities.into_iter().map(|q| line(p, q)).collect();
                let mut doc = Doc::new(doc_type, lines);
                let before = stocks[&p];

                match validate(&mut stocks, &mut doc) {
                    Ok(()) => prop_assert!(stocks[&p] >= Decimal::ZERO),
                    Err(_) => prop_assert_eq!(stocks[&p], before),
                }
            }
        }

        /// Idempotent terminality: validating twice adjusts stock once.
        #[test]
        fn prop_double_validation_counts_once(
            quantities in prop::collection::vec(quantity_strategy(), 1..5)
        ) {
            let p = Uuid::new_v4();
            let mut stocks = HashMap::from([(p, Decimal::ZERO)]);
            let lines: Vec<DocumentLine> = quantities.iter().map(|&q| line(p, q)).collect();
            let expected: Decimal = quantities.iter().sum();

            let mut doc = Doc::new(DocumentType::Receipt, lines);
            validate(&mut stocks, &mut doc).unwrap();
            prop_assert_eq!(stocks[&p], expected);

            prop_assert_eq!(
                validate(&mut stocks, &mut doc).unwrap_err(),
                ValidateError::AlreadyValidated
            );
            prop_assert_eq!(stocks[&p], expected);
            prop_assert_eq!(doc.status, DocumentStatus::Done);
        }

        /// A receipt followed by an equal delivery always nets to the
        /// starting stock.
        #[test]
        fn prop_receipt_then_delivery_round_trips(
            quantities in prop::collection::vec(quantity_strategy(), 1..5),
            initial in quantity_strategy()
        ) {
            let p = Uuid::new_v4();
            let mut stocks = HashMap::from([(p, initial)]);
            let lines: Vec<DocumentLine> = quantities.iter().map(|&q| line(p, q)).collect();

            let mut receipt = Doc::new(DocumentType::Receipt, lines.clone());
            validate(&mut stocks, &mut receipt).unwrap();

            let mut delivery = Doc::new(DocumentType::Delivery, lines);
            validate(&mut stocks, &mut delivery).unwrap();

            prop_assert_eq!(stocks[&p], initial);
        }

        /// Totals sum quantities, never line counts
        #[test]
        fn prop_total_is_sum_of_quantities(
            quantities in prop::collection::vec(quantity_strategy(), 0..10)
        ) {
            let lines: Vec<DocumentLine> = quantities
                .iter()
                .map(|&q| line(Uuid::new_v4(), q))
                .collect();
            let expected: Decimal = quantities.iter().sum();
            prop_assert_eq!(total_quantity(&lines), expected);
        }

        /// Codes are unique and ordered for a strictly increasing sequence
        #[test]
        fn prop_codes_follow_sequence(start in 1i64..5000, count in 1usize..20) {
            let codes: Vec<String> = (0..count as i64)
                .map(|offset| DocumentType::Delivery.format_code(start + offset))
                .collect();

            for window in codes.windows(2) {
                prop_assert_ne!(&window[0], &window[1]);
            }
            for code in &codes {
                prop_assert!(code.starts_with("DEL-"));
            }
        }
    }
}
