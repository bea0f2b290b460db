//! # Domain Types
//!
//! Core domain types used throughout Comanda.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────┐      ┌─────────────────┐      ┌─────────────────┐     │
//! │  │   Shift     │ 1..* │     Order       │ 0..* │    Invoice      │     │
//! │  │  ─────────  │─────►│  ─────────────  │─────►│  ─────────────  │     │
//! │  │  store_id   │      │  seats          │      │  items          │     │
//! │  │  balances   │      │  current_status │      │  discounts      │     │
//! │  └─────────────┘      └─────────────────┘      │  surcharges     │     │
//! │                                                │  base_tax/total │     │
//! │                                                └────────┬────────┘     │
//! │                                                         │ 0..*         │
//! │                                                ┌────────▼────────┐     │
//! │                                                │    Payment      │     │
//! │                                                │  method (open)  │     │
//! │                                                │  quantity + tip │     │
//! │                                                └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All amounts are [`Money`] in whole currency units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 800 bps = 8% (the restaurant consumption tax)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Store
// =============================================================================

/// A restaurant location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    /// Operations center code used by the back-office ERP.
    pub operations_center_code: Option<String>,
    /// Warehouse code used by the back-office ERP.
    pub warehouse_code: Option<String>,
}

// =============================================================================
// Shift
// =============================================================================

/// A cashier session, the aggregation window for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub store_id: String,
    /// Cashier account that opened the shift.
    pub account_id: Option<String>,
    pub start_time: DateTime<Utc>,
    /// `None` while the shift is open.
    pub end_time: Option<DateTime<Utc>>,
    pub start_balance: Money,
    pub end_balance: Money,
}

impl Shift {
    /// Returns true while the shift has not been closed.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

// =============================================================================
// Order
// =============================================================================

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Created,
    Preparing,
    Ready,
    Delivered,
    Invoiced,
    Closed,
    Canceled,
}

/// A priced add-on attached to an order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemModifier {
    pub product_id: Option<String>,
    pub name: String,
    pub sku: String,
    pub price: Money,
    pub comments: Option<String>,
}

/// A product line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub product_id: Option<String>,
    pub name: String,
    pub sku: String,
    pub price: Money,
    pub description: Option<String>,
    pub comments: Option<String>,
    #[serde(default)]
    pub modifiers: Vec<OrderItemModifier>,
}

/// A table or counter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub store_id: String,
    pub brand_id: String,
    pub channel_id: String,
    pub table_id: Option<String>,
    pub shift_id: Option<String>,
    /// Number of guests seated (eaters).
    pub seats: u32,
    pub current_status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Returns true when the order already has an invoice that was not retired.
    pub fn has_live_invoice(&self) -> bool {
        self.invoices.iter().any(Invoice::is_live)
    }
}

// =============================================================================
// Invoice Adjustments
// =============================================================================

/// How a discount or surcharge is valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AdjustmentValue {
    /// Percentage of the invoice subtotal, in basis points.
    Percentage(u32),
    /// Fixed amount in whole units.
    Fixed(Money),
}

/// A discount or surcharge as applied to one invoice.
///
/// `amount` is what this adjustment contributes on this invoice. It is
/// derived from `value` at application time and apportioned on split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAdjustment {
    pub id: String,
    /// The configured discount/surcharge this was applied from.
    pub source_id: Option<String>,
    pub name: String,
    pub value: AdjustmentValue,
    pub amount: Money,
}

impl AppliedAdjustment {
    /// Creates an adjustment and evaluates it against `subtotal`.
    pub fn apply(
        source_id: Option<String>,
        name: impl Into<String>,
        value: AdjustmentValue,
        subtotal: Money,
    ) -> Self {
        let mut adjustment = AppliedAdjustment {
            id: uuid::Uuid::new_v4().to_string(),
            source_id,
            name: name.into(),
            value,
            amount: Money::zero(),
        };
        adjustment.amount = adjustment.evaluate(subtotal);
        adjustment
    }

    /// Returns the amount this adjustment is worth on `subtotal`.
    pub fn evaluate(&self, subtotal: Money) -> Money {
        match self.value {
            AdjustmentValue::Percentage(bps) => subtotal.percentage(bps),
            AdjustmentValue::Fixed(amount) => amount,
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// How the tip on an invoice was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TipKind {
    Percentage,
    Amount,
}

/// A priced line on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub product_id: Option<String>,
    pub name: String,
    pub sku: String,
    pub price: Money,
    pub description: Option<String>,
    pub comments: Option<String>,
}

/// A bill derived from an order.
///
/// Invariant after every totals computation:
/// `total == base_tax + taxes + total_surcharges - total_discounts + tip_amount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub order_id: Option<String>,
    pub store_id: String,
    pub brand_id: String,
    pub channel_id: String,
    pub table_id: Option<String>,
    pub client_id: Option<String>,
    pub shift_id: Option<String>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub discounts: Vec<AppliedAdjustment>,
    #[serde(default)]
    pub surcharges: Vec<AppliedAdjustment>,
    pub subtotal: Money,
    pub total_discounts: Money,
    pub total_surcharges: Money,
    pub tip_kind: Option<TipKind>,
    pub tip_amount: Money,
    pub base_tax: Money,
    pub taxes: Money,
    pub total: Money,
    #[serde(default)]
    pub payments: Vec<Payment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; set when the invoice is retired or voided.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter, bumped by every persisted update.
    pub version: i64,
}

impl Invoice {
    /// Returns true if the invoice has not been retired.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Looks up an item by id.
    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Sum of item prices.
    pub fn items_subtotal(&self) -> Money {
        self.items.iter().map(|item| item.price).sum()
    }

    /// Recomputes `total_discounts` and `total_surcharges` from the
    /// applied adjustment amounts.
    pub fn refresh_adjustment_totals(&mut self) {
        self.total_discounts = self.discounts.iter().map(|d| d.amount).sum();
        self.total_surcharges = self.surcharges.iter().map(|s| s.amount).sum();
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Settlement status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Canceled,
}

/// One payment transaction against an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    /// Open enumeration: `cash`, `card_visa`, `yuno`, `bono`, ...
    pub method: String,
    /// Amount excluding tip.
    pub quantity: Money,
    pub tip: Money,
    /// `quantity + tip`.
    pub total_value: Money,
    pub status: PaymentStatus,
    /// External reference (gateway code, voucher number).
    pub code: Option<String>,
    pub checkout_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a pending payment; `total_value` is derived.
    pub fn new(
        invoice_id: impl Into<String>,
        method: impl Into<String>,
        quantity: Money,
        tip: Money,
    ) -> Self {
        Payment {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_id: invoice_id.into(),
            method: method.into(),
            quantity,
            tip,
            total_value: quantity + tip,
            status: PaymentStatus::Pending,
            code: None,
            checkout_url: None,
            created_at: Utc::now(),
        }
    }

    /// Moves a pending payment to paid.
    pub fn mark_paid(&mut self) -> CoreResult<()> {
        self.transition(PaymentStatus::Paid)
    }

    /// Moves a pending payment to canceled.
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.transition(PaymentStatus::Canceled)
    }

    fn transition(&mut self, to: PaymentStatus) -> CoreResult<()> {
        if self.status != PaymentStatus::Pending {
            return Err(CoreError::InvalidPaymentTransition {
                payment_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_default_is_eight_percent() {
        let rate = TaxRate::default();
        assert_eq!(rate.bps(), 800);
        assert!((rate.percentage() - 8.0).abs() < 0.001);
    }

    #[test]
    fn test_payment_total_value_includes_tip() {
        let payment = Payment::new("inv-1", "cash", Money::from_units(90), Money::from_units(10));
        assert_eq!(payment.total_value.units(), 100);
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_payment_transitions_only_from_pending() {
        let mut payment = Payment::new("inv-1", "card_visa", Money::from_units(50), Money::zero());
        assert!(payment.mark_paid().is_ok());
        assert_eq!(payment.status, PaymentStatus::Paid);

        let err = payment.cancel().unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentTransition { .. }));

        let mut pending = Payment::new("inv-1", "yuno", Money::from_units(50), Money::zero());
        assert!(pending.cancel().is_ok());
        assert_eq!(pending.status, PaymentStatus::Canceled);
    }

    #[test]
    fn test_adjustment_evaluation() {
        let pct = AppliedAdjustment::apply(
            None,
            "Happy hour",
            AdjustmentValue::Percentage(1500),
            Money::from_units(20_000),
        );
        assert_eq!(pct.amount.units(), 3000);

        let fixed = AppliedAdjustment::apply(
            Some("srv".to_string()),
            "Service",
            AdjustmentValue::Fixed(Money::from_units(2500)),
            Money::from_units(20_000),
        );
        assert_eq!(fixed.amount.units(), 2500);
    }

    #[test]
    fn test_order_status_serde() {
        let json = serde_json::to_string(&OrderStatus::Closed).unwrap();
        assert_eq!(json, "\"closed\"");
        assert_eq!(OrderStatus::default(), OrderStatus::Created);
    }
}
