//! # Invoice Service
//!
//! Loads invoices through [`InvoiceStore`], runs the `comanda_core`
//! computation and persists the result.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  set_tip_percentage("inv-1", 1000)                                      │
//! │       │                                                                 │
//! │       ├── store.get_invoice()      → InvoiceNotFound if absent/retired  │
//! │       ├── invoice::set_tip_*()     → pure recomputation                 │
//! │       └── store.update_invoice()   → versioned; Conflict if stale       │
//! │                                                                         │
//! │  split("inv-1", groups)                                                 │
//! │       ├── split::plan_split()      → every new invoice computed first   │
//! │       └── store.apply_split()      → one transaction                    │
//! │                                                                         │
//! │  mark_payment_paid("pay-1") / cancel_payment("pay-1")                   │
//! │       ├── Payment::mark_paid/cancel → only from pending                 │
//! │       └── store.update_payment_status() → Conflict if already settled   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{InvoiceStore, OrderLookup};
use comanda_core::invoice::{self, AdjustmentParams};
use comanda_core::split::plan_split;
use comanda_core::validation::{validate_non_negative, validate_payment_method};
use comanda_core::{CoreResult, Invoice, Money, Payment, TaxRate};

/// Optional extras applied when an order is checked out.
#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub client_id: Option<String>,
    pub discounts: Vec<AdjustmentParams>,
    pub surcharges: Vec<AdjustmentParams>,
    pub tip: Money,
}

/// Invoice operations over an [`InvoiceStore`].
#[derive(Debug, Clone)]
pub struct InvoiceService<S> {
    store: S,
    tax_rate: TaxRate,
}

impl<S> InvoiceService<S>
where
    S: InvoiceStore + OrderLookup,
{
    pub fn new(store: S, tax_rate: TaxRate) -> Self {
        InvoiceService { store, tax_rate }
    }

    /// Gets a live invoice.
    pub async fn get(&self, invoice_id: &str) -> ServiceResult<Invoice> {
        match self.store.get_invoice(invoice_id).await? {
            Some(invoice) if invoice.is_live() => Ok(invoice),
            _ => Err(ServiceError::InvoiceNotFound(invoice_id.to_string())),
        }
    }

    // =========================================================================
    // Tips
    // =========================================================================

    /// Sets a 5% or 10% tip on the base tax.
    pub async fn set_tip_percentage(&self, invoice_id: &str, bps: u32) -> ServiceResult<Invoice> {
        let mut invoice = self.get(invoice_id).await?;
        invoice::set_tip_percentage(&mut invoice, bps, self.tax_rate)?;
        debug!(invoice_id, bps, tip = %invoice.tip_amount, "Tip percentage set");
        self.save(&invoice).await
    }

    /// Sets a fixed tip.
    pub async fn set_tip_fixed_amount(
        &self,
        invoice_id: &str,
        amount: Money,
    ) -> ServiceResult<Invoice> {
        let mut invoice = self.get(invoice_id).await?;
        invoice::set_tip_fixed_amount(&mut invoice, amount, self.tax_rate)?;
        debug!(invoice_id, tip = %invoice.tip_amount, "Fixed tip set");
        self.save(&invoice).await
    }

    /// Recalculates the tip from a raw requested value (`0.10` means 10%).
    pub async fn recalculate_tip(&self, invoice_id: &str, requested: f64) -> ServiceResult<Invoice> {
        let mut invoice = self.get(invoice_id).await?;
        invoice::recalculate_tip(&mut invoice, requested, self.tax_rate)?;
        debug!(
            invoice_id,
            requested,
            kind = ?invoice.tip_kind,
            tip = %invoice.tip_amount,
            "Tip recalculated"
        );
        self.save(&invoice).await
    }

    // =========================================================================
    // Split
    // =========================================================================

    /// Splits the invoice's items into new invoices, one per group.
    ///
    /// Returns the new invoices in group order.
    pub async fn split(&self, invoice_id: &str, groups: &[Vec<String>]) -> ServiceResult<Vec<Invoice>> {
        let invoice = self.get(invoice_id).await?;
        let plan = plan_split(&invoice, groups, self.tax_rate)?;

        let parts = self.store.apply_split(&plan).await?;
        info!(
            invoice_id,
            parts = parts.len(),
            fate = ?plan.fate,
            "Invoice split"
        );

        Ok(parts)
    }

    // =========================================================================
    // Client
    // =========================================================================

    pub async fn attach_client(&self, invoice_id: &str, client_id: &str) -> ServiceResult<Invoice> {
        let mut invoice = self.get(invoice_id).await?;
        invoice::attach_client(&mut invoice, client_id)?;
        self.save(&invoice).await
    }

    pub async fn detach_client(&self, invoice_id: &str, client_id: &str) -> ServiceResult<Invoice> {
        let mut invoice = self.get(invoice_id).await?;
        invoice::detach_client(&mut invoice, client_id)?;
        self.save(&invoice).await
    }

    // =========================================================================
    // Checkout & Payments
    // =========================================================================

    /// Issues the invoice for an order.
    pub async fn checkout(&self, order_id: &str, request: CheckoutRequest) -> ServiceResult<Invoice> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(order_id.to_string()))?;

        let mut params = invoice::invoice_from_order(&order, self.tax_rate)?;
        params.client_id = request.client_id;
        params.discounts = request.discounts;
        params.surcharges = request.surcharges;
        params.tip = request.tip;

        let invoice = invoice::build_invoice(params)?;
        self.store.create_invoice(&invoice).await?;

        info!(
            order_id,
            invoice_id = %invoice.id,
            total = %invoice.total,
            "Order checked out"
        );

        Ok(invoice)
    }

    /// Records a pending payment against a live invoice.
    pub async fn record_payment(
        &self,
        invoice_id: &str,
        method: &str,
        quantity: Money,
        tip: Money,
    ) -> ServiceResult<Payment> {
        validate_payment_method(method)?;
        validate_non_negative("payment quantity", quantity)?;
        validate_non_negative("payment tip", tip)?;

        let invoice = self.get(invoice_id).await?;
        let payment = Payment::new(&invoice.id, method, quantity, tip);
        self.store.add_payment(&payment).await?;

        debug!(
            invoice_id,
            method,
            total = %payment.total_value,
            "Payment recorded"
        );

        Ok(payment)
    }

    /// Settles a pending payment as paid.
    pub async fn mark_payment_paid(&self, payment_id: &str) -> ServiceResult<Payment> {
        self.settle_payment(payment_id, Payment::mark_paid).await
    }

    /// Cancels a pending payment.
    pub async fn cancel_payment(&self, payment_id: &str) -> ServiceResult<Payment> {
        self.settle_payment(payment_id, Payment::cancel).await
    }

    async fn settle_payment(
        &self,
        payment_id: &str,
        transition: fn(&mut Payment) -> CoreResult<()>,
    ) -> ServiceResult<Payment> {
        let mut payment = self
            .store
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| ServiceError::PaymentNotFound(payment_id.to_string()))?;

        transition(&mut payment)?;
        self.store.update_payment_status(&payment).await?;

        info!(
            payment_id,
            invoice_id = %payment.invoice_id,
            status = ?payment.status,
            "Payment settled"
        );
        Ok(payment)
    }

    async fn save(&self, invoice: &Invoice) -> ServiceResult<Invoice> {
        Ok(self.store.update_invoice(invoice).await?)
    }
}
