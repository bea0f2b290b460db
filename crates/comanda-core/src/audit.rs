//! # Cash Audit
//!
//! Assembles the end-of-shift reconciliation report and compares the
//! system's figures with what the cashier counted.
//!
//! ## Reconciliation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Store + last Shift + Orders (with invoices and payments)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  live invoices ──► totals (sell, brute sell, discounts, surcharges)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  payments ──► classify_incomes() ──► incomes, tips                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  calculated vs CashReport ──► discrepancies ──► "differences" text      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Calculated cash, card and online figures exclude tip incomes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::income::{classify_incomes, total_of, Income, IncomeType, PaymentCategoryTable, TipBucketing};
use crate::money::Money;
use crate::types::{Invoice, Order, OrderStatus, Shift, Store};

// =============================================================================
// Cash Report
// =============================================================================

/// The five reconciled figures, either counted by the cashier or calculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CashReport {
    pub tips: Money,
    pub total_sell: Money,
    pub cash: Money,
    pub online: Money,
    pub card: Money,
}

impl CashReport {
    /// Value of one figure.
    pub fn figure(&self, kind: DiscrepancyKind) -> Money {
        match kind {
            DiscrepancyKind::Tips => self.tips,
            DiscrepancyKind::TotalSell => self.total_sell,
            DiscrepancyKind::Cash => self.cash,
            DiscrepancyKind::Online => self.online,
            DiscrepancyKind::Card => self.card,
        }
    }
}

// =============================================================================
// Discrepancies
// =============================================================================

/// Reconciled category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    Tips,
    TotalSell,
    Cash,
    Online,
    Card,
}

impl DiscrepancyKind {
    /// Check order of the categories.
    pub const ALL: [DiscrepancyKind; 5] = [
        DiscrepancyKind::Tips,
        DiscrepancyKind::TotalSell,
        DiscrepancyKind::Cash,
        DiscrepancyKind::Online,
        DiscrepancyKind::Card,
    ];

    /// Fixed label used in the differences text.
    pub fn label(&self) -> &'static str {
        match self {
            DiscrepancyKind::Tips => "IncomeDiscrepancyTips",
            DiscrepancyKind::TotalSell => "IncomeDiscrepancyTotalSell",
            DiscrepancyKind::Cash => "IncomeDiscrepancyCash",
            DiscrepancyKind::Online => "IncomeDiscrepancyOnline",
            DiscrepancyKind::Card => "IncomeDiscrepancyCard",
        }
    }
}

/// A mismatch between a reported and a calculated figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub reported: Money,
    pub calculated: Money,
}

impl Discrepancy {
    /// `reported − calculated`; negative means the drawer is short.
    pub fn difference(&self) -> Money {
        self.reported - self.calculated
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let difference = self.difference();
        let direction = if difference.is_negative() {
            "shortfall"
        } else {
            "surplus"
        };
        write!(
            f,
            "{}: reported {}, calculated {} ({} of {})",
            self.kind.label(),
            self.reported.units(),
            self.calculated.units(),
            direction,
            difference.abs().units()
        )
    }
}

/// Compares every category, in [`DiscrepancyKind::ALL`] order.
pub fn compute_discrepancies(calculated: &CashReport, reported: &CashReport) -> Vec<Discrepancy> {
    DiscrepancyKind::ALL
        .into_iter()
        .map(|kind| Discrepancy {
            kind,
            reported: reported.figure(kind),
            calculated: calculated.figure(kind),
        })
        .filter(|d| !d.difference().is_zero())
        .collect()
}

/// Joins discrepancies into the free-text summary.
pub fn describe_differences(discrepancies: &[Discrepancy]) -> String {
    discrepancies
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Cash Audit
// =============================================================================

/// Point-in-time reconciliation report for one shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashAudit {
    /// Set once persisted.
    pub id: Option<String>,
    pub store_id: String,
    pub store_name: String,
    pub operations_center_code: Option<String>,
    pub warehouse_code: Option<String>,
    pub shift_id: String,
    pub shift_open: DateTime<Utc>,
    pub shift_close: Option<DateTime<Utc>>,
    pub shift_start_balance: Money,
    pub shift_end_balance: Money,
    pub orders: u32,
    pub eaters: u32,
    pub orders_closed: u32,
    pub total_sell: Money,
    pub brute_sell: Money,
    pub total_discounts: Money,
    pub total_surcharges: Money,
    pub total_tips: Money,
    pub incomes: Vec<Income>,
    pub calculated: CashReport,
    pub reported: CashReport,
    pub discrepancies: Vec<Discrepancy>,
    pub differences: String,
    #[serde(default)]
    pub confirmed: bool,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CashAudit {
    /// Returns true when every reconciled figure matched.
    pub fn is_balanced(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Builds the audit for `shift` from its orders and the cashier's report.
///
/// Only live invoices count. Payments are counted whatever their status.
pub fn assemble_cash_audit(
    store: &Store,
    shift: &Shift,
    orders: &[Order],
    reported: CashReport,
    table: &PaymentCategoryTable,
    bucketing: TipBucketing,
) -> CashAudit {
    let invoices: Vec<&Invoice> = orders
        .iter()
        .flat_map(|order| order.invoices.iter())
        .filter(|invoice| invoice.is_live())
        .collect();
    let payments = invoices.iter().flat_map(|invoice| invoice.payments.iter());

    let incomes = classify_incomes(payments.clone(), table, bucketing);

    let total_sell: Money = invoices.iter().map(|i| i.subtotal).sum();
    let total_tips: Money = payments.map(|p| p.tip).sum();

    let calculated = CashReport {
        tips: total_tips,
        total_sell,
        cash: total_of(&incomes, IncomeType::Cash),
        online: total_of(&incomes, IncomeType::Online),
        card: total_of(&incomes, IncomeType::Card),
    };
    let discrepancies = compute_discrepancies(&calculated, &reported);
    let differences = describe_differences(&discrepancies);

    CashAudit {
        id: None,
        store_id: store.id.clone(),
        store_name: store.name.clone(),
        operations_center_code: store.operations_center_code.clone(),
        warehouse_code: store.warehouse_code.clone(),
        shift_id: shift.id.clone(),
        shift_open: shift.start_time,
        shift_close: shift.end_time,
        shift_start_balance: shift.start_balance,
        shift_end_balance: shift.end_balance,
        orders: orders.len() as u32,
        eaters: orders.iter().map(|o| o.seats).sum(),
        orders_closed: orders
            .iter()
            .filter(|o| o.current_status == OrderStatus::Closed)
            .count() as u32,
        total_sell,
        brute_sell: invoices.iter().map(|i| i.total).sum(),
        total_discounts: invoices.iter().map(|i| i.total_discounts).sum(),
        total_surcharges: invoices.iter().map(|i| i.total_surcharges).sum(),
        total_tips,
        incomes,
        calculated,
        reported,
        discrepancies,
        differences,
        confirmed: false,
        observations: None,
        created_at: Utc::now(),
    }
}

// =============================================================================
// Summary View
// =============================================================================

/// Income total for one origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginTotal {
    pub origin: String,
    pub total: Money,
}

/// Categorised view of an audit for the back office.
///
/// Cash is a single figure; cards and every other type are listed per
/// origin. Tip incomes are left out, tips appear once as `tips`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashAuditSummary {
    pub total_sell: Money,
    pub brute_sell: Money,
    pub orders: u32,
    pub seats: u32,
    pub discounts: Money,
    pub tips: Money,
    pub cash: Money,
    pub cards: Vec<OriginTotal>,
    pub others: Vec<OriginTotal>,
}

impl From<&CashAudit> for CashAuditSummary {
    fn from(audit: &CashAudit) -> Self {
        let mut cash = Money::zero();
        let mut cards = Vec::new();
        let mut others = Vec::new();

        for income in &audit.incomes {
            let entry = OriginTotal {
                origin: income.origin.clone(),
                total: income.income,
            };
            match income.kind {
                IncomeType::Tip => {}
                IncomeType::Cash => cash += income.income,
                IncomeType::Card => cards.push(entry),
                IncomeType::Online | IncomeType::Other => others.push(entry),
            }
        }

        CashAuditSummary {
            total_sell: audit.total_sell,
            brute_sell: audit.brute_sell,
            orders: audit.orders,
            seats: audit.eaters,
            discounts: audit.total_discounts,
            tips: audit.total_tips,
            cash,
            cards,
            others,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::build_invoice;
    use crate::invoice::tests::{item, params};
    use crate::types::Payment;

    fn store() -> Store {
        Store {
            id: "store-1".to_string(),
            name: "Centro".to_string(),
            operations_center_code: Some("OC-01".to_string()),
            warehouse_code: Some("WH-01".to_string()),
        }
    }

    fn shift() -> Shift {
        Shift {
            id: "shift-1".to_string(),
            store_id: "store-1".to_string(),
            account_id: Some("cashier-1".to_string()),
            start_time: Utc::now(),
            end_time: None,
            start_balance: Money::from_units(50_000),
            end_balance: Money::zero(),
        }
    }

    fn order(id: &str, seats: u32, status: OrderStatus, invoices: Vec<Invoice>) -> Order {
        Order {
            id: id.to_string(),
            store_id: "store-1".to_string(),
            brand_id: "brand-1".to_string(),
            channel_id: "channel-1".to_string(),
            table_id: None,
            shift_id: Some("shift-1".to_string()),
            seats,
            current_status: status,
            items: Vec::new(),
            invoices,
            created_at: Utc::now(),
        }
    }

    fn paid_invoice(price: i64, payments: &[(&str, i64, i64)]) -> Invoice {
        let mut invoice = build_invoice(params(vec![item("x", price)])).unwrap();
        invoice.payments = payments
            .iter()
            .map(|(method, quantity, tip)| {
                Payment::new(
                    invoice.id.clone(),
                    *method,
                    Money::from_units(*quantity),
                    Money::from_units(*tip),
                )
            })
            .collect();
        invoice
    }

    fn audit(orders: &[Order], reported: CashReport) -> CashAudit {
        assemble_cash_audit(
            &store(),
            &shift(),
            orders,
            reported,
            &PaymentCategoryTable::default(),
            TipBucketing::default(),
        )
    }

    #[test]
    fn test_cash_shortfall_is_reported() {
        let orders = vec![order(
            "o-1",
            2,
            OrderStatus::Closed,
            vec![paid_invoice(500, &[("cash", 500, 0)])],
        )];
        let reported = CashReport {
            total_sell: Money::from_units(500),
            cash: Money::from_units(480),
            ..CashReport::default()
        };
        let audit = audit(&orders, reported);

        assert_eq!(audit.calculated.cash.units(), 500);
        assert_eq!(audit.discrepancies.len(), 1);
        assert_eq!(audit.discrepancies[0].kind, DiscrepancyKind::Cash);
        assert_eq!(audit.discrepancies[0].difference().units(), -20);
        assert_eq!(
            audit.differences,
            "IncomeDiscrepancyCash: reported 480, calculated 500 (shortfall of 20)"
        );
    }

    #[test]
    fn test_matching_figures_have_no_entry() {
        let orders = vec![order(
            "o-1",
            2,
            OrderStatus::Closed,
            vec![paid_invoice(500, &[("cash", 500, 0)])],
        )];
        let reported = CashReport {
            total_sell: Money::from_units(500),
            cash: Money::from_units(500),
            ..CashReport::default()
        };
        let audit = audit(&orders, reported);

        assert!(audit.is_balanced());
        assert!(audit.differences.is_empty());
        assert!(!audit.differences.contains("IncomeDiscrepancyCash"));
    }

    #[test]
    fn test_totals_and_counts() {
        let mut voided = paid_invoice(9_999, &[("cash", 9_999, 0)]);
        voided.deleted_at = Some(Utc::now());

        let orders = vec![
            order(
                "o-1",
                4,
                OrderStatus::Closed,
                vec![paid_invoice(10_800, &[("card_visa", 10_000, 1000), ("cash", 800, 0)])],
            ),
            order(
                "o-2",
                2,
                OrderStatus::Delivered,
                vec![paid_invoice(5_400, &[("yuno", 5_400, 0)]), voided],
            ),
            order("o-3", 1, OrderStatus::Canceled, vec![]),
        ];
        let audit = audit(&orders, CashReport::default());

        assert_eq!(audit.orders, 3);
        assert_eq!(audit.eaters, 7);
        assert_eq!(audit.orders_closed, 1);
        assert_eq!(audit.total_sell.units(), 16_200);
        assert_eq!(audit.brute_sell.units(), 16_200);
        assert_eq!(audit.total_tips.units(), 1000);
        assert_eq!(audit.calculated.card.units(), 11_000);
        assert_eq!(audit.calculated.cash.units(), 800);
        assert_eq!(audit.calculated.online.units(), 5_400);
        assert_eq!(audit.store_name, "Centro");
        assert_eq!(audit.shift_start_balance.units(), 50_000);

        // every figure differs from an all-zero report
        let labels: Vec<&str> = audit.discrepancies.iter().map(|d| d.kind.label()).collect();
        assert_eq!(
            labels,
            vec![
                "IncomeDiscrepancyTips",
                "IncomeDiscrepancyTotalSell",
                "IncomeDiscrepancyCash",
                "IncomeDiscrepancyOnline",
                "IncomeDiscrepancyCard",
            ]
        );
        assert_eq!(audit.differences.matches("; ").count(), 4);
    }

    #[test]
    fn test_surplus_wording() {
        let d = Discrepancy {
            kind: DiscrepancyKind::Tips,
            reported: Money::from_units(1200),
            calculated: Money::from_units(1000),
        };
        assert_eq!(
            d.to_string(),
            "IncomeDiscrepancyTips: reported 1200, calculated 1000 (surplus of 200)"
        );
    }

    #[test]
    fn test_summary_skips_tip_incomes() {
        let orders = vec![order(
            "o-1",
            2,
            OrderStatus::Closed,
            vec![paid_invoice(
                20_000,
                &[("cash", 5_000, 500), ("card_amex", 10_000, 0), ("bono", 5_000, 0)],
            )],
        )];
        let audit = audit(&orders, CashReport::default());
        let summary = CashAuditSummary::from(&audit);

        assert_eq!(summary.cash.units(), 5_500);
        assert_eq!(summary.tips.units(), 500);
        assert_eq!(
            summary.cards,
            vec![OriginTotal {
                origin: "card_amex".to_string(),
                total: Money::from_units(10_000),
            }]
        );
        assert_eq!(summary.others.len(), 1);
        assert_eq!(summary.seats, 2);
    }
}
