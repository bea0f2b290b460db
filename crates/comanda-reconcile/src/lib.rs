//! # comanda-reconcile: Reconciliation Services for Comanda
//!
//! Async services that load data through storage ports, run the pure
//! `comanda_core` computations, and persist the results.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Service Architecture                             │
//! │                                                                         │
//! │   ┌────────────────┐   ┌────────────────┐   ┌──────────────────────┐   │
//! │   │ InvoiceService │   │ ShiftService   │   │ CashAuditService     │   │
//! │   │                │   │                │   │                      │   │
//! │   │ tip, split,    │   │ open, close    │   │ get, create,         │   │
//! │   │ client,        │   │                │   │ confirm, summary     │   │
//! │   │ checkout       │   │                │   │                      │   │
//! │   └───────┬────────┘   └───────┬────────┘   └──────────┬───────────┘   │
//! │           │                    │                       │               │
//! │           ▼                    ▼                       ▼               │
//! │   ┌─────────────────────────────────────────────────────────────────┐  │
//! │   │  Ports (store.rs)                                               │  │
//! │   │  StoreLookup · ShiftStore · OrderLookup · InvoiceStore ·        │  │
//! │   │  CashAuditStore                                                 │  │
//! │   └───────────────────────────────┬─────────────────────────────────┘  │
//! │                                   │ implemented by                      │
//! │                                   ▼                                     │
//! │                        comanda_db::Database (SQLite)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`cash_audit`] - Shift reconciliation
//! - [`config`] - `ReconcileConfig` (defaults → TOML → environment)
//! - [`error`] - `ServiceError`, `StoreError`, `ConfigError`
//! - [`invoice_service`] - Tips, split, client attachment, checkout
//! - [`shift_service`] - Shift open/close
//! - [`store`] - Storage ports
//!
//! ## Usage
//! ```rust,ignore
//! use comanda_db::{Database, DbConfig};
//! use comanda_reconcile::{AuditSettings, CashAuditService, ReconcileConfig};
//!
//! let config = ReconcileConfig::load(None)?;
//! let db = Database::new(DbConfig::new(&config.database.path)).await?;
//!
//! let audits = CashAuditService::new(db, AuditSettings::from_config(&config)?);
//! let audit = audits.get("store-1", reported).await?;
//! ```

pub mod cash_audit;
pub mod config;
pub mod error;
pub mod invoice_service;
pub mod shift_service;
pub mod store;

pub use cash_audit::{AuditSettings, CashAuditService};
pub use config::ReconcileConfig;
pub use error::{ConfigError, ServiceError, ServiceResult, StoreError, StoreResult};
pub use invoice_service::{CheckoutRequest, InvoiceService};
pub use shift_service::ShiftService;
pub use store::{CashAuditStore, InvoiceStore, OrderLookup, ShiftStore, StoreLookup};
