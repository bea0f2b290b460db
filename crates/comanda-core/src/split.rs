//! # Invoice Splitter
//!
//! Plans the division of one invoice into several, one per caller-supplied
//! group of item ids. Planning is pure; committing a plan is the storage
//! layer's job and must happen in a single transaction.
//!
//! ## Split Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Invoice #1: items a, b, c, d    discount 1000                          │
//! │                                                                         │
//! │  groups = [[a, b], [c]]                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan_split() ← THIS MODULE                                             │
//! │       │                                                                 │
//! │       ├── part 0: items a, b    discount share by subtotal              │
//! │       ├── part 1: item c        discount share by subtotal              │
//! │       └── original: item d      kept with the remaining share           │
//! │                                                                         │
//! │  With groups covering every item the original is retired instead.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Adjustment amounts are apportioned with the largest-remainder method, so
//! the parts always add back up to the original amount. Every invoice the
//! split touches carries zero tip afterwards. Payments cover the whole
//! invoice, so an invoice that already has one is never split.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::invoice::{apply_tip, TipDirective};
use crate::money::Money;
use crate::types::{AppliedAdjustment, Invoice, Item, TaxRate};

// =============================================================================
// Split Plan
// =============================================================================

/// What happens to the source invoice once the parts are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginalFate {
    /// Some items were not assigned; the original keeps them.
    Keep,
    /// Every item moved; the original is soft-deleted.
    Retire,
}

/// The full outcome of a split, ready to be committed atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    /// The source invoice in its post-split state. `version` is still the
    /// version that was read, for the storage layer's concurrency check.
    pub original: Invoice,
    pub fate: OriginalFate,
    /// New invoices, in group order.
    pub parts: Vec<Invoice>,
}

impl SplitPlan {
    /// Ids of items that move to a new invoice, with the part they move to.
    pub fn moved_items(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parts.iter().flat_map(|part| {
            part.items
                .iter()
                .map(move |item| (item.id.as_str(), part.id.as_str()))
        })
    }
}

// =============================================================================
// Planning
// =============================================================================

/// Validates `groups` against `invoice` and computes the split.
///
/// ## Errors
/// - [`CoreError::InvoiceNotFound`] when the invoice was already retired
/// - [`CoreError::InvoiceHasPayments`] once any payment is recorded
/// - [`CoreError::NoSplitGroups`] when `groups` is empty
/// - [`CoreError::EmptyGroup`] when a group has no ids
/// - [`CoreError::ItemNotInInvoice`] for an id not on the invoice
/// - [`CoreError::DuplicateSplitItem`] for an id named twice
pub fn plan_split(invoice: &Invoice, groups: &[Vec<String>], rate: TaxRate) -> CoreResult<SplitPlan> {
    if !invoice.is_live() {
        return Err(CoreError::InvoiceNotFound(invoice.id.clone()));
    }
    if !invoice.payments.is_empty() {
        return Err(CoreError::InvoiceHasPayments {
            invoice_id: invoice.id.clone(),
            count: invoice.payments.len(),
        });
    }
    if groups.is_empty() {
        return Err(CoreError::NoSplitGroups {
            invoice_id: invoice.id.clone(),
        });
    }

    let mut assigned: HashSet<&str> = HashSet::new();
    for (index, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(CoreError::EmptyGroup { index });
        }
        for item_id in group {
            if invoice.item(item_id).is_none() {
                return Err(CoreError::ItemNotInInvoice {
                    invoice_id: invoice.id.clone(),
                    item_id: item_id.clone(),
                });
            }
            if !assigned.insert(item_id.as_str()) {
                return Err(CoreError::DuplicateSplitItem {
                    item_id: item_id.clone(),
                });
            }
        }
    }

    let by_id: HashMap<&str, &Item> = invoice
        .items
        .iter()
        .map(|item| (item.id.as_str(), item))
        .collect();

    let mut buckets: Vec<Vec<Item>> = groups
        .iter()
        .map(|group| {
            group
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).map(|item| (*item).clone()))
                .collect()
        })
        .collect();

    let leftover: Vec<Item> = invoice
        .items
        .iter()
        .filter(|item| !assigned.contains(item.id.as_str()))
        .cloned()
        .collect();
    let fate = if leftover.is_empty() {
        OriginalFate::Retire
    } else {
        OriginalFate::Keep
    };
    if fate == OriginalFate::Keep {
        buckets.push(leftover);
    }

    let weights: Vec<Money> = buckets
        .iter()
        .map(|items| items.iter().map(|item| item.price).sum())
        .collect();
    let keeps_original = fate == OriginalFate::Keep;
    let discount_shares = share_adjustments(&invoice.discounts, &weights, keeps_original);
    let surcharge_shares = share_adjustments(&invoice.surcharges, &weights, keeps_original);

    let now = Utc::now();
    let mut parts = Vec::with_capacity(groups.len());
    let mut original = invoice.clone();

    for (idx, items) in buckets.into_iter().enumerate() {
        let discounts = discount_shares.iter().map(|s| s[idx].clone()).collect();
        let surcharges = surcharge_shares.iter().map(|s| s[idx].clone()).collect();

        if idx < groups.len() {
            let mut part = Invoice {
                id: Uuid::new_v4().to_string(),
                items,
                discounts,
                surcharges,
                payments: Vec::new(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
                version: 0,
                ..invoice.clone()
            };
            settle(&mut part, rate);
            parts.push(part);
        } else {
            original.items = items;
            original.discounts = discounts;
            original.surcharges = surcharges;
            original.updated_at = now;
            settle(&mut original, rate);
        }
    }

    if fate == OriginalFate::Retire {
        original.items.clear();
        original.updated_at = now;
        original.deleted_at = Some(now);
    }

    Ok(SplitPlan {
        original,
        fate,
        parts,
    })
}

/// One row per adjustment, one column per bucket. When the original survives
/// it is the last bucket and keeps its adjustment ids.
fn share_adjustments(
    adjustments: &[AppliedAdjustment],
    weights: &[Money],
    keeps_original: bool,
) -> Vec<Vec<AppliedAdjustment>> {
    adjustments
        .iter()
        .map(|adjustment| {
            adjustment
                .amount
                .apportion(weights)
                .into_iter()
                .enumerate()
                .map(|(idx, amount)| AppliedAdjustment {
                    id: if keeps_original && idx + 1 == weights.len() {
                        adjustment.id.clone()
                    } else {
                        Uuid::new_v4().to_string()
                    },
                    amount,
                    ..adjustment.clone()
                })
                .collect()
        })
        .collect()
}

/// Recomputes subtotal, taxes and totals for an invoice with new items.
fn settle(invoice: &mut Invoice, rate: TaxRate) {
    invoice.subtotal = invoice.items_subtotal();
    invoice.refresh_adjustment_totals();
    invoice.taxes = invoice.subtotal - invoice.subtotal.base_from_inclusive(rate);
    apply_tip(invoice, TipDirective::None, rate);
}

// =============================================================================
// Unit Tests
// =============================================================================
