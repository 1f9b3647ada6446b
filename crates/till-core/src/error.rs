//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                           │
//! │  ├── CoreError        - Register rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  till-db errors (separate crate)                                        │
//! │  ├── DbError          - Database operation failures                     │
//! │  └── EngineError      - CoreError | DbError for register operations     │
//! │                                                                         │
//! │  Not errors at all:                                                     │
//! │  ├── CouponRejection  - typed result of a coupon check                  │
//! │  └── Reconciliation   - a non-zero difference is a reported fact        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is recoverable: the operator corrects the input and
//! retries. Nothing is raised after persistence has started.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Register rule violations.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// Checkout attempted with no lines in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Checkout attempted before choosing cash, card or PIX.
    #[error("Payment method is required")]
    PaymentMethodRequired,

    /// Cash tendered does not cover the total.
    #[error("Insufficient cash tendered: total {total}, paid {paid}")]
    InsufficientTender { total: Money, paid: Money },

    /// A sale or close was attempted while no session is open.
    #[error("No register session is open")]
    NoOpenSession,

    /// A second session was opened while one is still open.
    ///
    /// ## User Workflow
    /// ```text
    /// Terminal A: open_session ──► OK
    /// Terminal B: open_session ──► SessionAlreadyOpen
    ///      │
    ///      ▼
    /// UI shows: "A register session is already open"
    /// ```
    #[error("A register session is already open")]
    SessionAlreadyOpen,

    /// Requested tickets exceed what is left for the ticket type.
    ///
    /// `requested` is the cumulative quantity (already in cart + increment).
    #[error("Only {available} tickets left for {ticket_type_id}, requested {requested}")]
    TicketCapacityExceeded {
        ticket_type_id: String,
        available: i64,
        requested: i64,
    },

    /// Ticket type is inactive or unknown.
    #[error("Ticket type not available: {0}")]
    TicketUnavailable(String),

    /// Product is inactive or unknown.
    #[error("Product not available: {0}")]
    ProductUnavailable(String),

    /// Coupon hit its usage cap between validation and commit.
    #[error("Coupon {0} has no uses left")]
    CouponUsesExhausted(String),

    /// A cart operation referenced a line that is not in the cart.
    #[error("Line not in cart: {0}")]
    LineNotInCart(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business logic runs.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid coupon code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::TicketCapacityExceeded {
            ticket_type_id: "vip".to_string(),
            available: 2,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Only 2 tickets left for vip, requested 3"
        );

        let err = CoreError::InsufficientTender {
            total: Money::from_cents(4500),
            paid: Money::from_cents(4000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient cash tendered: total 45.00, paid 40.00"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "operator_id".to_string(),
        };
        assert_eq!(err.to_string(), "operator_id is required");

        let err = ValidationError::Negative {
            field: "initial fund".to_string(),
        };
        assert_eq!(err.to_string(), "initial fund cannot be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
