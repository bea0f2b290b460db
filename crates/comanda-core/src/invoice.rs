//! # Invoice Totals Calculator
//!
//! Derives base tax, tip and total for an invoice, and builds new invoices
//! from plain parameters.
//!
//! ## Totals Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal (tax included)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  base_tax = round(subtotal / (1 + tax_rate))                            │
//! │       │                                                                 │
//! │       ├── percentage tip → tip = round(base_tax × pct)                  │
//! │       ├── fixed tip      → tip = round(requested)                       │
//! │       └── otherwise      → tip = 0                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  total = base_tax + taxes + surcharges − discounts + tip                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `taxes` is never touched by tip recalculation.
//!
//! ## Two Tip Ceilings
//! - [`build_invoice`] rejects a tip above 10% of the subtotal.
//! - [`set_tip_fixed_amount`] and [`recalculate_tip`] do not.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{AdjustmentValue, AppliedAdjustment, Invoice, Item, Order, TaxRate, TipKind};
use crate::validation::{validate_id, validate_non_negative, validate_tip_ceiling};
use crate::{ACCEPTED_TIP_PERCENTAGES_BPS, DEFAULT_TIP_PERCENTAGE_BPS};

/// Raw tip value that older callers send to request the default percentage.
pub const LEGACY_PERCENTAGE_SENTINEL: f64 = 0.10;

// =============================================================================
// Tip Directive
// =============================================================================

/// What the caller asked for when updating a tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipDirective {
    /// Percentage of the base tax, in basis points.
    Percentage(u32),
    /// A fixed amount in whole units.
    Fixed(Money),
    /// No tip.
    None,
}

impl TipDirective {
    /// Interprets a raw numeric tip the way legacy callers encode it.
    ///
    /// - exactly `0.10` → default percentage (10%)
    /// - greater than `1` → fixed amount, rounded half away from zero
    /// - anything else → no tip
    ///
    /// ## Example
    /// ```rust
    /// use comanda_core::invoice::TipDirective;
    /// use comanda_core::money::Money;
    ///
    /// assert_eq!(TipDirective::from_raw(0.10), TipDirective::Percentage(1000));
    /// assert_eq!(TipDirective::from_raw(1500.4), TipDirective::Fixed(Money::from_units(1500)));
    /// assert_eq!(TipDirective::from_raw(0.5), TipDirective::None);
    /// ```
    pub fn from_raw(requested: f64) -> Self {
        if (requested - LEGACY_PERCENTAGE_SENTINEL).abs() < f64::EPSILON {
            return TipDirective::Percentage(DEFAULT_TIP_PERCENTAGE_BPS);
        }
        if requested > 1.0 {
            if let Some(amount) = Money::round_f64(requested) {
                return TipDirective::Fixed(amount);
            }
        }
        TipDirective::None
    }
}

// =============================================================================
// Tip Recalculation
// =============================================================================

/// Sets a percentage tip on the base tax.
///
/// Accepted percentages are 5% and 10% (500 and 1000 bps).
pub fn set_tip_percentage(invoice: &mut Invoice, bps: u32, rate: TaxRate) -> CoreResult<()> {
    if !ACCEPTED_TIP_PERCENTAGES_BPS.contains(&bps) {
        return Err(CoreError::UnsupportedTipPercentage { bps });
    }
    apply_tip(invoice, TipDirective::Percentage(bps), rate);
    Ok(())
}

/// Sets a fixed tip amount. Negative amounts are rejected.
pub fn set_tip_fixed_amount(invoice: &mut Invoice, amount: Money, rate: TaxRate) -> CoreResult<()> {
    if amount.is_negative() {
        return Err(CoreError::NegativeTip {
            requested: amount.units() as f64,
        });
    }
    apply_tip(invoice, TipDirective::Fixed(amount), rate);
    Ok(())
}

/// Compatibility entry point taking the raw numeric tip of older callers.
///
/// See [`TipDirective::from_raw`] for how the value is interpreted.
pub fn recalculate_tip(invoice: &mut Invoice, requested: f64, rate: TaxRate) -> CoreResult<()> {
    if !requested.is_finite() {
        return Err(CoreError::NonFiniteTip);
    }
    if requested < 0.0 {
        return Err(CoreError::NegativeTip { requested });
    }
    apply_tip(invoice, TipDirective::from_raw(requested), rate);
    Ok(())
}

/// Recomputes base tax, tip and total in place.
///
/// ## User Workflow
/// ```text
/// Waiter asks for the check with 10% service
///      │
///      ▼
/// apply_tip(Percentage(1000)) ← THIS FUNCTION
///      │
///      ▼
/// base_tax, tip_amount, total updated; taxes untouched
/// ```
pub fn apply_tip(invoice: &mut Invoice, directive: TipDirective, rate: TaxRate) {
    invoice.base_tax = invoice.subtotal.base_from_inclusive(rate);

    let (kind, tip) = match directive {
        TipDirective::Percentage(bps) => (Some(TipKind::Percentage), invoice.base_tax.percentage(bps)),
        TipDirective::Fixed(amount) => (Some(TipKind::Amount), amount),
        TipDirective::None => (None, Money::zero()),
    };

    invoice.tip_kind = kind;
    invoice.tip_amount = tip;
    invoice.total = expected_total(invoice);
}

/// `base_tax + taxes + surcharges − discounts + tip`.
pub fn expected_total(invoice: &Invoice) -> Money {
    invoice.base_tax + invoice.taxes + invoice.total_surcharges - invoice.total_discounts
        + invoice.tip_amount
}

/// Checks the totals invariant.
pub fn verify_totals(invoice: &Invoice) -> CoreResult<()> {
    let expected = expected_total(invoice);
    if expected != invoice.total {
        return Err(CoreError::Inconsistent {
            invoice_id: invoice.id.clone(),
            expected,
            actual: invoice.total,
        });
    }
    Ok(())
}

// =============================================================================
// Invoice Construction
// =============================================================================

/// A discount or surcharge to apply at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentParams {
    pub source_id: Option<String>,
    pub name: String,
    pub value: AdjustmentValue,
}

/// Plain parameters for [`build_invoice`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceParams {
    pub order_id: Option<String>,
    pub store_id: String,
    pub brand_id: String,
    pub channel_id: String,
    pub table_id: Option<String>,
    pub client_id: Option<String>,
    pub shift_id: Option<String>,
    pub items: Vec<Item>,
    #[serde(default)]
    pub discounts: Vec<AdjustmentParams>,
    #[serde(default)]
    pub surcharges: Vec<AdjustmentParams>,
    #[serde(default)]
    pub tip: Money,
    #[serde(default)]
    pub tax_rate: TaxRate,
}

/// Builds a new invoice, collecting every validation failure.
///
/// ## Rules
/// - store, brand and channel ids are required
/// - at least one item, each with a unique id and a non-negative price
/// - fixed adjustments and the tip must not be negative
/// - the tip must not exceed 10% of the subtotal
///
/// On success `base_tax` is derived from the subtotal and
/// `taxes = subtotal − base_tax`.
///
/// ## Example
/// ```rust
/// use comanda_core::invoice::{build_invoice, InvoiceParams};
///
/// let errors = build_invoice(InvoiceParams::default()).unwrap_err();
/// assert!(errors.len() >= 4); // store, brand, channel, items
/// ```
pub fn build_invoice(params: InvoiceParams) -> Result<Invoice, Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("store_id", &params.store_id),
        ("brand_id", &params.brand_id),
        ("channel_id", &params.channel_id),
    ] {
        if let Err(e) = validate_id(field, value) {
            errors.push(e);
        }
    }

    if params.items.is_empty() {
        errors.push(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    let mut seen = std::collections::HashSet::new();
    for item in &params.items {
        if let Err(e) = validate_id("item id", &item.id) {
            errors.push(e);
        } else if !seen.insert(item.id.as_str()) {
            errors.push(ValidationError::Duplicate {
                field: "item id".to_string(),
                value: item.id.clone(),
            });
        }
        if let Err(e) = validate_non_negative("item price", item.price) {
            errors.push(e);
        }
    }

    for adjustment in params.discounts.iter().chain(&params.surcharges) {
        if let AdjustmentValue::Fixed(amount) = adjustment.value {
            if let Err(e) = validate_non_negative("adjustment amount", amount) {
                errors.push(e);
            }
        }
    }

    let subtotal: Money = params.items.iter().map(|item| item.price).sum();

    if let Err(e) = validate_non_negative("tip", params.tip) {
        errors.push(e);
    } else if let Err(e) = validate_tip_ceiling(params.tip, subtotal) {
        errors.push(e);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let apply = |adjustments: Vec<AdjustmentParams>| -> Vec<AppliedAdjustment> {
        adjustments
            .into_iter()
            .map(|a| AppliedAdjustment::apply(a.source_id, a.name, a.value, subtotal))
            .collect()
    };

    let now = Utc::now();
    let base_tax = subtotal.base_from_inclusive(params.tax_rate);

    let mut invoice = Invoice {
        id: Uuid::new_v4().to_string(),
        order_id: params.order_id,
        store_id: params.store_id,
        brand_id: params.brand_id,
        channel_id: params.channel_id,
        table_id: params.table_id,
        client_id: params.client_id,
        shift_id: params.shift_id,
        items: params.items,
        discounts: apply(params.discounts),
        surcharges: apply(params.surcharges),
        subtotal,
        total_discounts: Money::zero(),
        total_surcharges: Money::zero(),
        tip_kind: params.tip.is_positive().then_some(TipKind::Amount),
        tip_amount: params.tip,
        base_tax,
        taxes: subtotal - base_tax,
        total: Money::zero(),
        payments: Vec::new(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        version: 0,
    };
    invoice.refresh_adjustment_totals();
    invoice.total = expected_total(&invoice);

    Ok(invoice)
}

/// Builds invoice parameters for checking out an order.
///
/// Every order item becomes an invoice item; modifiers are billed as their
/// own items when they carry a price.
pub fn invoice_from_order(order: &Order, rate: TaxRate) -> CoreResult<InvoiceParams> {
    if order.has_live_invoice() {
        return Err(CoreError::InvoiceAlreadyIssued {
            order_id: order.id.clone(),
        });
    }

    let mut items = Vec::new();
    for order_item in &order.items {
        items.push(Item {
            id: Uuid::new_v4().to_string(),
            product_id: order_item.product_id.clone(),
            name: order_item.name.clone(),
            sku: order_item.sku.clone(),
            price: order_item.price,
            description: order_item.description.clone(),
            comments: order_item.comments.clone(),
        });

        for modifier in order_item.modifiers.iter().filter(|m| !m.price.is_zero()) {
            items.push(Item {
                id: Uuid::new_v4().to_string(),
                product_id: modifier.product_id.clone(),
                name: modifier.name.clone(),
                sku: modifier.sku.clone(),
                price: modifier.price,
                description: None,
                comments: modifier.comments.clone(),
            });
        }
    }

    if items.is_empty() {
        return Err(CoreError::EmptyOrder {
            order_id: order.id.clone(),
        });
    }

    Ok(InvoiceParams {
        order_id: Some(order.id.clone()),
        store_id: order.store_id.clone(),
        brand_id: order.brand_id.clone(),
        channel_id: order.channel_id.clone(),
        table_id: order.table_id.clone(),
        client_id: None,
        shift_id: order.shift_id.clone(),
        items,
        discounts: Vec::new(),
        surcharges: Vec::new(),
        tip: Money::zero(),
        tax_rate: rate,
    })
}

// =============================================================================
// Client Attachment
// =============================================================================

/// Attaches a client (billing identity) to the invoice.
pub fn attach_client(invoice: &mut Invoice, client_id: &str) -> CoreResult<()> {
    validate_id("client_id", client_id)?;
    invoice.client_id = Some(client_id.to_string());
    Ok(())
}

/// Detaches `client_id`; fails if a different client is attached.
pub fn detach_client(invoice: &mut Invoice, client_id: &str) -> CoreResult<()> {
    if invoice.client_id.as_deref() != Some(client_id) {
        return Err(CoreError::WrongClient {
            invoice_id: invoice.id.clone(),
            client_id: client_id.to_string(),
        });
    }
    invoice.client_id = None;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
