//! # Error Types
//!
//! Domain-specific error types for comanda-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  comanda-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  comanda-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  comanda-reconcile errors                                              │
//! │  └── ServiceError     - Lookup failures + wrapped core/db errors       │
//! │                                                                         │
//! │  Every error exposes an ErrorKind so an HTTP layer can map:            │
//! │    InvalidArgument → 400, NotFound → 404, LimitExceeded → 422          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::types::PaymentStatus;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification shared by every error type in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Store, shift, invoice or item absent.
    NotFound,
    /// Negative tip, bad split group, unknown item id, duplicate item.
    InvalidArgument,
    /// Business ceiling exceeded (tip over 10% at construction).
    LimitExceeded,
    /// Arithmetic invariant violated.
    Inconsistent,
    /// Concurrent modification detected by the storage layer.
    Conflict,
    /// Storage or infrastructure failure.
    Internal,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invoice cannot be found.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// A split group references an item that is not on the invoice.
    #[error("Item {item_id} does not belong to invoice {invoice_id}")]
    ItemNotInInvoice { invoice_id: String, item_id: String },

    /// A split group has no items.
    #[error("Split group {index} is empty")]
    EmptyGroup { index: usize },

    /// A split request carried no groups at all.
    #[error("Split of invoice {invoice_id} requires at least one group")]
    NoSplitGroups { invoice_id: String },

    /// The same item id appears in more than one split group.
    #[error("Item {item_id} appears in more than one split group")]
    DuplicateSplitItem { item_id: String },

    /// Payments are recorded against the whole invoice, so it can no
    /// longer be divided.
    #[error("Invoice {invoice_id} has {count} payment(s) and cannot be split")]
    InvoiceHasPayments { invoice_id: String, count: usize },

    /// Requested tip is negative.
    #[error("Tip cannot be negative: {requested}")]
    NegativeTip { requested: f64 },

    /// Requested tip is NaN or infinite.
    #[error("Tip must be a finite number")]
    NonFiniteTip,

    /// Tip percentage outside the accepted set.
    #[error("Tip percentage of {bps} bps is not accepted")]
    UnsupportedTipPercentage { bps: u32 },

    /// Order already has a live invoice.
    #[error("Order {order_id} already has an invoice")]
    InvoiceAlreadyIssued { order_id: String },

    /// Order has nothing to bill.
    #[error("Order {order_id} has no items to invoice")]
    EmptyOrder { order_id: String },

    /// Detaching a client that is not the attached one.
    #[error("Client {client_id} is not attached to invoice {invoice_id}")]
    WrongClient { invoice_id: String, client_id: String },

    /// The totals invariant does not hold.
    #[error("Invoice {invoice_id} is inconsistent: expected total {expected}, found {actual}")]
    Inconsistent {
        invoice_id: String,
        expected: Money,
        actual: Money,
    },

    /// Payment status may only leave `pending`.
    #[error("Payment {payment_id} cannot move from {from:?} to {to:?}")]
    InvalidPaymentTransition {
        payment_id: String,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Invoice construction failed; every failure is listed.
    #[error("Invalid invoice: {}", join_errors(.0))]
    InvalidInvoice(Vec<ValidationError>),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvoiceNotFound(_) => ErrorKind::NotFound,
            CoreError::Inconsistent { .. } => ErrorKind::Inconsistent,
            CoreError::InvalidInvoice(errors) => {
                if errors
                    .iter()
                    .any(|e| matches!(e, ValidationError::TipExceedsLimit { .. }))
                {
                    ErrorKind::LimitExceeded
                } else {
                    ErrorKind::InvalidArgument
                }
            }
            CoreError::Validation(ValidationError::TipExceedsLimit { .. }) => {
                ErrorKind::LimitExceeded
            }
            _ => ErrorKind::InvalidArgument,
        }
    }
}

impl From<Vec<ValidationError>> for CoreError {
    fn from(errors: Vec<ValidationError>) -> Self {
        CoreError::InvalidInvoice(errors)
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },

    /// Tip above the construction-time ceiling.
    #[error("tips cannot exceed 10% of the subtotal: tip {tip}, limit {limit}")]
    TipExceedsLimit { tip: Money, limit: Money },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::ItemNotInInvoice {
            invoice_id: "inv-1".to_string(),
            item_id: "item-9".to_string(),
        };
        assert_eq!(err.to_string(), "Item item-9 does not belong to invoice inv-1");
    }

    #[test]
    fn test_invalid_invoice_lists_every_failure() {
        let err: CoreError = vec![
            ValidationError::Required {
                field: "store_id".to_string(),
            },
            ValidationError::Negative {
                field: "item price".to_string(),
            },
        ]
        .into();
        assert_eq!(
            err.to_string(),
            "Invalid invoice: store_id is required; item price cannot be negative"
        );
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CoreError::InvoiceNotFound("x".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::ItemNotInInvoice {
                invoice_id: "a".to_string(),
                item_id: "b".to_string()
            }
            .kind(),
            ErrorKind::InvalidArgument
        );

        let limit: CoreError = vec![ValidationError::TipExceedsLimit {
            tip: Money::from_units(2000),
            limit: Money::from_units(1080),
        }]
        .into();
        assert_eq!(limit.kind(), ErrorKind::LimitExceeded);
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "store_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
