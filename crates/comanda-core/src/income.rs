//! # Income Classifier
//!
//! Maps payments to coarse income categories and sums them per bucket.
//!
//! ## Bucketing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Payment {method: "cash", quantity: 90, tip: 10, total_value: 100}      │
//! │       │                                                                 │
//! │       ├── bucket "cash"  (type cash)  += total_value   → 100            │
//! │       └── bucket "cash"  (type tip)   += tip           → 10             │
//! │                                                                         │
//! │  Sum of incomes = 110. Tips are counted twice: once inside the          │
//! │  payment's total value and once in the tip bucket.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tips land under the `cash` origin whatever the payment method, unless
//! [`TipBucketing::ByPaymentMethod`] is selected.
//!
//! Methods missing from the [`PaymentCategoryTable`] are summed into a
//! single `untracked` bucket of type `other`, with a warning so operators
//! can extend the table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Payment;

/// Origin of the bucket collecting methods missing from the table.
pub const UNTRACKED_ORIGIN: &str = "untracked";

/// Origin tips are filed under by default.
pub const TIP_ORIGIN: &str = "cash";

// =============================================================================
// Income Type
// =============================================================================

/// Coarse income category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeType {
    Tip,
    Cash,
    Online,
    Card,
    Other,
}

impl IncomeType {
    pub const ALL: [IncomeType; 5] = [
        IncomeType::Tip,
        IncomeType::Cash,
        IncomeType::Online,
        IncomeType::Card,
        IncomeType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeType::Tip => "tip",
            IncomeType::Cash => "cash",
            IncomeType::Online => "online",
            IncomeType::Card => "card",
            IncomeType::Other => "other",
        }
    }
}

impl fmt::Display for IncomeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncomeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncomeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "income type".to_string(),
                allowed: IncomeType::ALL.iter().map(|t| t.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Income
// =============================================================================

/// A summed income bucket. Recomputed on every reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Income {
    /// Payment method string the bucket is keyed on.
    pub origin: String,
    #[serde(rename = "type")]
    pub kind: IncomeType,
    pub income: Money,
}

// =============================================================================
// Payment Category Table
// =============================================================================

/// Injected `method → category` mapping.
///
/// Serialized as a flat JSON object:
/// ```json
/// { "cash": "cash", "card_visa": "card", "yuno": "online" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentCategoryTable(BTreeMap<String, IncomeType>);

impl Default for PaymentCategoryTable {
    /// The restaurant's standard payment methods.
    fn default() -> Self {
        let mut table = PaymentCategoryTable::empty();
        table.insert("cash", IncomeType::Cash);
        for card in ["card_visa", "card_master", "card_amex", "card_dinners"] {
            table.insert(card, IncomeType::Card);
        }
        table.insert("yuno", IncomeType::Online);
        table.insert("bold", IncomeType::Other);
        table.insert("bono", IncomeType::Other);
        table
    }
}

impl PaymentCategoryTable {
    /// A table with no methods.
    pub fn empty() -> Self {
        PaymentCategoryTable(BTreeMap::new())
    }

    /// Parses a table from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Adds or replaces a method's category.
    pub fn insert(&mut self, method: impl Into<String>, kind: IncomeType) {
        self.0.insert(method.into(), kind);
    }

    /// Returns the category of `method`, if the table knows it.
    pub fn classify(&self, method: &str) -> Option<IncomeType> {
        self.0.get(method).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Tip Bucketing
// =============================================================================

/// Where tip incomes are filed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipBucketing {
    /// Every tip goes to one bucket with origin `cash`, whatever the method.
    #[default]
    CashOrigin,
    /// Each tip goes to a bucket with the payment's own method as origin.
    ByPaymentMethod,
}

impl FromStr for TipBucketing {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash_origin" => Ok(TipBucketing::CashOrigin),
            "by_payment_method" => Ok(TipBucketing::ByPaymentMethod),
            _ => Err(ValidationError::NotAllowed {
                field: "tip bucketing".to_string(),
                allowed: vec!["cash_origin".to_string(), "by_payment_method".to_string()],
            }),
        }
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Classifies `payments` into income buckets.
///
/// Output is sorted by `(type, origin)`.
///
/// ## Example
/// ```rust
/// use comanda_core::income::{classify_incomes, IncomeType, PaymentCategoryTable, TipBucketing};
/// use comanda_core::{Money, Payment};
///
/// let payment = Payment::new("inv-1", "cash", Money::from_units(90), Money::from_units(10));
/// let incomes = classify_incomes(
///     [&payment],
///     &PaymentCategoryTable::default(),
///     TipBucketing::default(),
/// );
///
/// let total: Money = incomes.iter().map(|i| i.income).sum();
/// assert_eq!(total.units(), 110);
/// assert_eq!(incomes[0].kind, IncomeType::Tip);
/// ```
pub fn classify_incomes<'a>(
    payments: impl IntoIterator<Item = &'a Payment>,
    table: &PaymentCategoryTable,
    bucketing: TipBucketing,
) -> Vec<Income> {
    let mut buckets: BTreeMap<(IncomeType, String), Money> = BTreeMap::new();

    for payment in payments {
        let (kind, origin) = match table.classify(&payment.method) {
            Some(kind) => (kind, payment.method.as_str()),
            None => {
                warn!(
                    method = %payment.method,
                    payment_id = %payment.id,
                    "Unknown payment method, counting as untracked income"
                );
                (IncomeType::Other, UNTRACKED_ORIGIN)
            }
        };
        *buckets.entry((kind, origin.to_string())).or_default() += payment.total_value;

        if payment.tip.is_positive() {
            let tip_origin = match bucketing {
                TipBucketing::CashOrigin => TIP_ORIGIN,
                TipBucketing::ByPaymentMethod => payment.method.as_str(),
            };
            *buckets
                .entry((IncomeType::Tip, tip_origin.to_string()))
                .or_default() += payment.tip;
        }
    }

    buckets
        .into_iter()
        .map(|((kind, origin), income)| Income {
            origin,
            kind,
            income,
        })
        .collect()
}

/// Sum of incomes of one type.
pub fn total_of(incomes: &[Income], kind: IncomeType) -> Money {
    incomes
        .iter()
        .filter(|income| income.kind == kind)
        .map(|income| income.income)
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================
