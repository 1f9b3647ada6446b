//! # Validation Module
//!
//! Input validation for register operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Register screen                                               │
//! │  └── Disables the button while an action is in flight                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (field rules)                                     │
//! │  └── quantity, money, percentage, code, ids                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── Partial UNIQUE index: one open session                             │
//! │  ├── CHECK constraints: non-negative counters                           │
//! │  └── Guarded UPDATEs: ticket capacity, coupon max uses                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_quantity, validate_coupon_code};
//!
//! validate_quantity(5).unwrap();
//! assert_eq!(validate_coupon_code("  promo10 ").unwrap(), "PROMO10");
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Percentage;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates and normalizes a coupon code.
///
/// ## Rules
/// - Trimmed, uppercased
/// - Must not be empty
/// - At most 50 characters
///
/// ## Returns
/// The normalized code.
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "coupon code".to_string(),
        });
    }

    if code.chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "coupon code".to_string(),
            max: 50,
        });
    }

    Ok(code.to_uppercase())
}

/// Validates an operator id.
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
pub fn validate_operator_id(operator_id: &str) -> ValidationResult<()> {
    let operator_id = operator_id.trim();

    if operator_id.is_empty() {
        return Err(ValidationError::Required {
            field: "operator_id".to_string(),
        });
    }

    if operator_id.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "operator_id".to_string(),
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a money amount that may be zero but not negative.
///
/// Used for the initial fund, counted cash, manual fixed discounts and
/// cash tendered.
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative(Money::from_cents(0), "initial fund").is_ok());
/// assert!(validate_non_negative(Money::from_cents(-1), "initial fund").is_err());
/// ```
pub fn validate_non_negative(amount: Money, field: &str) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a percentage.
///
/// ## Rules
/// - Between 0% and 100% (0 to 10000 bps)
pub fn validate_percentage(rate: Percentage) -> ValidationResult<()> {
    if rate.bps() > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "percentage".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coupon_code() {
        assert_eq!(validate_coupon_code("promo10").unwrap(), "PROMO10");
        assert_eq!(validate_coupon_code("  Natal ").unwrap(), "NATAL");

        assert!(validate_coupon_code("").is_err());
        assert!(validate_coupon_code("   ").is_err());
        assert!(validate_coupon_code(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_operator_id() {
        assert!(validate_operator_id("op-1").is_ok());
        assert!(validate_operator_id(" ").is_err());
        assert!(validate_operator_id(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative(Money::zero(), "x").is_ok());
        assert!(validate_non_negative(Money::from_cents(20000), "x").is_ok());
        assert_eq!(
            validate_non_negative(Money::from_cents(-1), "initial fund"),
            Err(ValidationError::Negative {
                field: "initial fund".to_string()
            })
        );
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage(Percentage::zero()).is_ok());
        assert!(validate_percentage(Percentage::from_whole(100)).is_ok());
        assert!(validate_percentage(Percentage::from_bps(10001)).is_err());
    }
}
