//! # Repository Module
//!
//! Database repository implementations for Comanda.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Service (comanda-reconcile)                                           │
//! │       │                                                                 │
//! │       │  db.orders().find_by_shift("shift-1")                          │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── find_by_shift(&self, shift_id)                                    │
//! │  ├── get_by_id(&self, id)                                              │
//! │  └── insert(&self, order)                                              │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries are built at runtime with `sqlx::query` / `sqlx::query_as`.
//! Rows are decoded into `*Row` structs and converted into
//! `comanda_core` types, so money stays [`comanda_core::Money`] outside
//! this crate.
//!
//! ## Available Repositories
//!
//! - [`StoreRepository`] - Store lookup
//! - [`ShiftRepository`] - Shift lifecycle
//! - [`OrderRepository`] - Orders with their invoices and payments
//! - [`InvoiceRepository`] - Invoices, versioned updates, atomic splits
//! - [`CashAuditRepository`] - Persisted cash audits

pub mod cash_audit;
pub mod invoice;
pub mod order;
pub mod shift;
pub mod store;

pub use cash_audit::CashAuditRepository;
pub use invoice::InvoiceRepository;
pub use order::OrderRepository;
pub use shift::ShiftRepository;
pub use store::StoreRepository;
