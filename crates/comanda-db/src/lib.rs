//! # comanda-db: Database Layer for Comanda
//!
//! This crate provides database access for the Comanda reconciliation
//! services. It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comanda Data Flow                                │
//! │                                                                         │
//! │  Service (CashAuditService::create)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     comanda-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ StoreRepo      │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ShiftRepo      │   │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │ OrderRepo      │   │              │  │   │
//! │  │   │ Management    │    │ InvoiceRepo    │   │              │  │   │
//! │  │   │               │    │ CashAuditRepo  │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - `Database` and `DbConfig`
//! - [`migrations`] - Embedded schema, `migrate` and `verify_schema`
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use comanda_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/comanda.db")).await?;
//!
//! let shift = db.shifts().get_last("store-1").await?;
//! let orders = db.orders().find_by_shift(&shift.unwrap().id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CashAuditRepository, InvoiceRepository, OrderRepository, ShiftRepository, StoreRepository,
};
