//! # Shift Service
//!
//! Opening and closing cashier shifts. A store has at most one open shift.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::store::{ShiftStore, StoreLookup};
use comanda_core::validation::validate_balance;
use comanda_core::{Money, Shift};

/// Shift lifecycle operations.
#[derive(Debug, Clone)]
pub struct ShiftService<S> {
    store: S,
}

impl<S> ShiftService<S>
where
    S: StoreLookup + ShiftStore,
{
    pub fn new(store: S) -> Self {
        ShiftService { store }
    }

    /// Opens a shift for the store.
    ///
    /// ## Errors
    /// - `StoreNotFound` for an unknown store
    /// - `ShiftAlreadyOpen` when the previous shift was never closed
    /// - `Validation` for a negative opening balance
    pub async fn open(
        &self,
        store_id: &str,
        account_id: Option<&str>,
        start_balance: Money,
    ) -> ServiceResult<Shift> {
        validate_balance("start balance", start_balance)?;

        self.store
            .get_store(store_id)
            .await
            .map_err(ServiceError::StoreLookupFailed)?
            .ok_or_else(|| ServiceError::StoreNotFound(store_id.to_string()))?;

        if let Some(open) = self
            .store
            .get_open_shift(store_id)
            .await
            .map_err(ServiceError::ShiftLookupFailed)?
        {
            return Err(ServiceError::ShiftAlreadyOpen {
                store_id: store_id.to_string(),
                shift_id: open.id,
            });
        }

        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            account_id: account_id.map(str::to_string),
            start_time: Utc::now(),
            end_time: None,
            start_balance,
            end_balance: Money::zero(),
        };
        self.store.create_shift(&shift).await?;

        info!(store_id, shift_id = %shift.id, balance = %start_balance, "Shift opened");
        Ok(shift)
    }

    /// Closes the store's open shift with the counted end balance.
    pub async fn close(&self, store_id: &str, end_balance: Money) -> ServiceResult<Shift> {
        validate_balance("end balance", end_balance)?;

        let mut shift = self
            .store
            .get_open_shift(store_id)
            .await
            .map_err(ServiceError::ShiftLookupFailed)?
            .ok_or_else(|| ServiceError::NoOpenShift {
                store_id: store_id.to_string(),
            })?;

        shift.end_time = Some(Utc::now());
        shift.end_balance = end_balance;
        self.store.update_shift(&shift).await?;

        info!(store_id, shift_id = %shift.id, balance = %end_balance, "Shift closed");
        Ok(shift)
    }
}
