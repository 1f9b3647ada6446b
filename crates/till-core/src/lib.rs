//! # till-core: Pure Settlement Logic for the Register
//!
//! This crate is the **heart** of the in-venue register. It contains the
//! business rules of a sale as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Storefront (register screen)                   │   │
//! │  │    Open Session ──► Cart ──► Discount ──► Tender ──► Close      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ library calls                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 till-db (Register / Terminal)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐  │   │
//! │  │   │  money  │ │  cart   │ │ discount │ │ coupon  │ │session │  │   │
//! │  │   │  Money  │ │ CartLine│ │ resolve  │ │evaluate │ │reconc. │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (RegisterSession, Coupon, Transaction, catalog refs)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`coupon`] - Coupon evaluation (read-only check, typed rejections)
//! - [`discount`] - Discount selection and resolution
//! - [`cart`] - Cart lines and cart pricing
//! - [`checkout`] - Checkout preconditions and the sale draft
//! - [`session`] - Session state rules and cash reconciliation
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::discount::{resolve, DiscountSelection};
//! use till_core::money::Money;
//! use till_core::types::Percentage;
//!
//! let subtotal = Money::from_cents(10_000); // 100.00
//! let selection = DiscountSelection::ManualPercent(Percentage::from_whole(10));
//!
//! let pricing = resolve(subtotal, &selection);
//! assert_eq!(pricing.discount.cents(), 1_000);
//! assert_eq!(pricing.total.cents(), 9_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod coupon;
pub mod discount;
pub mod error;
pub mod money;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{change_due, Cart, CartLine, CartTotals, ProductLine, TicketLine};
pub use checkout::{prepare_checkout, CheckoutDraft, DraftLine};
pub use coupon::{evaluate_coupon, normalize_code, AppliedCoupon, CouponRejection};
pub use discount::{resolve, DiscountSelection, PricedTotal};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use session::{reconcile, MethodTotals, Reconciliation, ReconciliationOutcome, SessionClosure};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Guards against typing 1000 instead of 10 at the register.
pub const MAX_ITEM_QUANTITY: i64 = 999;
