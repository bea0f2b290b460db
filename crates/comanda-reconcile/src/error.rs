//! # Service Error Types
//!
//! Error types for the reconciliation services.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Service Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Lookups      │  │   Not Found     │  │     Lifecycle           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  StoreLookup    │  │  Store          │  │  ShiftAlreadyOpen       │ │
//! │  │  ShiftLookup    │  │  Shift          │  │  NoOpenShift            │ │
//! │  │  OrdersLookup   │  │  Invoice, Order │  │  Conflict (version)     │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Core (CoreError / ValidationError) → kind() decides the bucket │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use comanda_core::{CoreError, ErrorKind, ValidationError};
use comanda_db::DbError;
use thiserror::Error;

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for port operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Port Errors
// =============================================================================

/// Failure reported by a storage port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The record changed since it was read.
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: String, id: String },

    /// The record to update does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// Anything else the backend reports.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict { entity, id, .. } => StoreError::Conflict { entity, id },
            DbError::NotFound { entity, id } => StoreError::NotFound { entity, id },
            other => StoreError::Backend(other.to_string()),
        }
    }
}

// =============================================================================
// Service Errors
// =============================================================================

/// Service error type covering every operation in this crate.
#[derive(Debug, Error)]
pub enum ServiceError {
    // =========================================================================
    // Lookup Failures
    // =========================================================================
    /// The store lookup itself failed.
    #[error("Store lookup failed: {0}")]
    StoreLookupFailed(#[source] StoreError),

    /// The shift lookup itself failed.
    #[error("Shift lookup failed: {0}")]
    ShiftLookupFailed(#[source] StoreError),

    /// Loading the shift's orders failed.
    #[error("Orders lookup failed: {0}")]
    OrdersLookupFailed(#[source] StoreError),

    // =========================================================================
    // Not Found
    // =========================================================================
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("No shift found for store {store_id}")]
    ShiftNotFound { store_id: String },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Cash audit not found: {0}")]
    CashAuditNotFound(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    // =========================================================================
    // Shift Lifecycle
    // =========================================================================
    /// A store may only have one open shift.
    #[error("Store {store_id} already has open shift {shift_id}")]
    ShiftAlreadyOpen { store_id: String, shift_id: String },

    /// Closing requires an open shift.
    #[error("Store {store_id} has no open shift")]
    NoOpenShift { store_id: String },

    // =========================================================================
    // Storage
    // =========================================================================
    /// Optimistic concurrency check failed; reload and retry.
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: String, id: String },

    /// Persisting a result failed.
    #[error("Storage error: {0}")]
    Storage(StoreError),

    // =========================================================================
    // Domain
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { entity, id } => ServiceError::Conflict { entity, id },
            other => ServiceError::Storage(other),
        }
    }
}

impl From<Vec<ValidationError>> for ServiceError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ServiceError::Core(CoreError::from(errors))
    }
}

impl ServiceError {
    /// Returns the taxonomy bucket for this error.
    ///
    /// ## Mapping
    /// - lookups that failed, storage failures → `Internal`
    /// - absent store/shift/order/invoice/audit/payment, no open shift → `NotFound`
    /// - version conflicts, second open shift → `Conflict`
    /// - core errors → their own `kind()`
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::StoreLookupFailed(_)
            | ServiceError::ShiftLookupFailed(_)
            | ServiceError::OrdersLookupFailed(_)
            | ServiceError::Storage(_) => ErrorKind::Internal,

            ServiceError::StoreNotFound(_)
            | ServiceError::ShiftNotFound { .. }
            | ServiceError::OrderNotFound(_)
            | ServiceError::InvoiceNotFound(_)
            | ServiceError::CashAuditNotFound(_)
            | ServiceError::PaymentNotFound(_)
            | ServiceError::NoOpenShift { .. } => ErrorKind::NotFound,

            ServiceError::Conflict { .. } | ServiceError::ShiftAlreadyOpen { .. } => {
                ErrorKind::Conflict
            }

            ServiceError::Core(err) => err.kind(),
            ServiceError::Validation(ValidationError::TipExceedsLimit { .. }) => {
                ErrorKind::LimitExceeded
            }
            ServiceError::Validation(_) => ErrorKind::InvalidArgument,
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Failure while loading or validating [`crate::config::ReconcileConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse payment table: {0}")]
    PaymentTable(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_conflict_becomes_service_conflict() {
        let db = DbError::conflict("Invoice", "inv-1", 3);
        let err = ServiceError::from(StoreError::from(db));

        assert!(matches!(err, ServiceError::Conflict { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("inv-1"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ServiceError::StoreNotFound("s-1".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ServiceError::StoreLookupFailed(StoreError::Backend("io".into())).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            ServiceError::from(CoreError::EmptyGroup { index: 1 }).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            ServiceError::from(CoreError::InvoiceNotFound("x".into())).kind(),
            ErrorKind::NotFound
        );
    }
}
