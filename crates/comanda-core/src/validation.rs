//! # Validation Module
//!
//! Input validation utilities for Comanda.
//!
//! Validators return the first problem they find for a single value.
//! Callers that need every failure at once (invoice construction) collect
//! the results themselves, see [`crate::invoice::build_invoice`].
//!
//! ## Usage
//! ```rust
//! use comanda_core::money::Money;
//! use comanda_core::validation::{validate_tip_ceiling, validate_required};
//!
//! validate_required("store_id", "store-1").unwrap();
//! assert!(validate_tip_ceiling(Money::from_units(2000), Money::from_units(10_000)).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::TIP_CEILING_BPS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest identifier accepted from callers.
pub const MAX_ID_LENGTH: usize = 64;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a field is present and not blank.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an entity identifier.
///
/// ## Rules
/// - Must not be blank
/// - At most 64 characters
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    validate_required(field, id)?;

    if id.len() > MAX_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LENGTH,
        });
    }

    Ok(())
}

/// Validates a payment method key.
///
/// ## Rules
/// - Must not be blank
/// - Lowercase letters, digits and underscores only (`card_visa`)
///
/// ## Example
/// ```rust
/// use comanda_core::validation::validate_payment_method;
///
/// assert!(validate_payment_method("card_visa").is_ok());
/// assert!(validate_payment_method("Card Visa").is_err());
/// ```
pub fn validate_payment_method(method: &str) -> ValidationResult<()> {
    validate_required("payment method", method)?;

    if !method
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "payment method".to_string(),
            reason: "must contain only lowercase letters, digits, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates that an amount is zero or positive.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates the construction-time tip ceiling: `tip <= 10% of subtotal`.
///
/// Only invoice construction enforces this rule. Tip recalculation on an
/// existing invoice does not.
///
/// ## Example
/// ```rust
/// use comanda_core::money::Money;
/// use comanda_core::validation::validate_tip_ceiling;
///
/// let subtotal = Money::from_units(10_000);
/// assert!(validate_tip_ceiling(Money::from_units(1000), subtotal).is_ok());
/// assert!(validate_tip_ceiling(Money::from_units(1001), subtotal).is_err());
/// ```
pub fn validate_tip_ceiling(tip: Money, subtotal: Money) -> ValidationResult<()> {
    // tip > subtotal * 10%, compared without rounding the limit
    let scaled_tip = tip.units() as i128 * crate::money::BPS_SCALE;
    let scaled_limit = subtotal.units() as i128 * TIP_CEILING_BPS as i128;

    if scaled_tip > scaled_limit {
        return Err(ValidationError::TipExceedsLimit {
            tip,
            limit: subtotal.percentage(TIP_CEILING_BPS),
        });
    }

    Ok(())
}

/// Validates a cash drawer balance.
pub fn validate_balance(field: &str, balance: Money) -> ValidationResult<()> {
    validate_non_negative(field, balance)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("store_id", "store-1").is_ok());
        assert!(validate_id("store_id", "").is_err());
        assert!(validate_id("store_id", "   ").is_err());
        assert!(validate_id("store_id", &"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_payment_method() {
        assert!(validate_payment_method("cash").is_ok());
        assert!(validate_payment_method("card_master").is_ok());
        assert!(validate_payment_method("").is_err());
        assert!(validate_payment_method("CASH").is_err());
        assert!(validate_payment_method("card-visa").is_err());
    }

    #[test]
    fn test_validate_tip_ceiling() {
        let subtotal = Money::from_units(10_800);
        assert!(validate_tip_ceiling(Money::zero(), subtotal).is_ok());
        assert!(validate_tip_ceiling(Money::from_units(1080), subtotal).is_ok());

        let err = validate_tip_ceiling(Money::from_units(1081), subtotal).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TipExceedsLimit {
                tip: Money::from_units(1081),
                limit: Money::from_units(1080),
            }
        );
    }

    #[test]
    fn test_validate_tip_ceiling_fractional_limit() {
        // 10% of 15 is 1.5: a tip of 2 exceeds it even though the
        // rounded limit would be 2
        let subtotal = Money::from_units(15);
        assert!(validate_tip_ceiling(Money::from_units(1), subtotal).is_ok());
        assert!(validate_tip_ceiling(Money::from_units(2), subtotal).is_err());
    }

    #[test]
    fn test_validate_balance() {
        assert!(validate_balance("start_balance", Money::zero()).is_ok());
        assert!(validate_balance("start_balance", Money::from_units(-1)).is_err());
    }
}
