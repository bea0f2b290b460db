//! # comanda-core: Pure Reconciliation Logic for Comanda
//!
//! This crate is the **heart** of Comanda's financial reconciliation. It
//! contains all money math as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comanda Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              comanda-reconcile (Service Layer)                  │   │
//! │  │    InvoiceService ── ShiftService ── CashAuditService           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ storage ports                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ comanda-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐           │   │
//! │  │   │  money  │  │ invoice │  │  split  │  │ income  │  audit    │   │
//! │  │   │ rounding│  │ totals  │  │ planner │  │ buckets │  report   │   │
//! │  │   └─────────┘  └─────────┘  └─────────┘  └─────────┘           │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  comanda-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type and round-half-away-from-zero policy
//! - [`types`] - Domain types (Invoice, Payment, Order, Shift, ...)
//! - [`invoice`] - Totals calculator and invoice construction
//! - [`split`] - Bill splitting plans
//! - [`income`] - Payment classification into income buckets
//! - [`audit`] - Cash audit assembly and discrepancy reporting
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use comanda_core::invoice::{build_invoice, set_tip_percentage, InvoiceParams};
//! use comanda_core::{Item, Money, TaxRate};
//!
//! let mut invoice = build_invoice(InvoiceParams {
//!     store_id: "store-1".into(),
//!     brand_id: "brand-1".into(),
//!     channel_id: "dine-in".into(),
//!     items: vec![Item {
//!         id: "item-1".into(),
//!         product_id: None,
//!         name: "Bandeja".into(),
//!         sku: "BND".into(),
//!         price: Money::from_units(10_800),
//!         description: None,
//!         comments: None,
//!     }],
//!     ..InvoiceParams::default()
//! })
//! .unwrap();
//!
//! set_tip_percentage(&mut invoice, 1000, TaxRate::default()).unwrap();
//! assert_eq!(invoice.base_tax.units(), 10_000);
//! assert_eq!(invoice.tip_amount.units(), 1000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod error;
pub mod income;
pub mod invoice;
pub mod money;
pub mod split;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use audit::{CashAudit, CashAuditSummary, CashReport, Discrepancy, DiscrepancyKind};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use income::{Income, IncomeType, PaymentCategoryTable, TipBucketing};
pub use money::Money;
pub use split::{OriginalFate, SplitPlan};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Restaurant consumption tax included in item prices (8%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 800;

/// Construction-time ceiling on tips, as a share of the subtotal (10%).
pub const TIP_CEILING_BPS: u32 = 1000;

/// Percentage tip applied when callers ask for "the" service charge (10%).
pub const DEFAULT_TIP_PERCENTAGE_BPS: u32 = 1000;

/// Percentage tips a caller may request.
pub const ACCEPTED_TIP_PERCENTAGES_BPS: [u32; 2] = [500, 1000];
