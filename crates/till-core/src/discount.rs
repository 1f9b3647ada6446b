//! # Discount Resolution
//!
//! Turns a subtotal and the single active discount source into a total.
//!
//! ## One Source at a Time
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DiscountSelection                                                      │
//! │  ├── None                       discount = 0                            │
//! │  ├── ManualPercent(rate)        discount = min(S, S × rate)             │
//! │  ├── ManualFixed(amount)        discount = min(S, amount)               │
//! │  └── Coupon(applied)            percentage or fixed rule, same clamps   │
//! │                                                                         │
//! │  total = max(0, S − discount)                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The selection is an enum, so choosing a coupon drops any manual value and
//! vice versa. Nothing is cached: callers resolve against the live subtotal
//! every time the cart changes.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::coupon::AppliedCoupon;
use crate::money::Money;
use crate::types::{CouponRule, DiscountKind, Percentage, RecordedDiscount};

// =============================================================================
// Discount Selection
// =============================================================================

/// The discount source currently chosen for the cart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountSelection {
    #[default]
    None,
    ManualPercent(Percentage),
    ManualFixed(Money),
    Coupon(AppliedCoupon),
}

impl DiscountSelection {
    /// Returns the applied coupon, if the selection is a coupon.
    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        match self {
            DiscountSelection::Coupon(applied) => Some(applied),
            _ => None,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, DiscountSelection::None)
    }

    /// Snapshots the selection into the triple stored on a transaction.
    ///
    /// Coupon rules are recorded as `coupon_percent` / `coupon_fixed`.
    /// Returns `None` when no discount source is selected.
    pub fn record(&self, subtotal: Money) -> Option<RecordedDiscount> {
        let (kind, value) = match self {
            DiscountSelection::None => return None,
            DiscountSelection::ManualPercent(rate) => {
                (DiscountKind::ManualPercent, rate.bps() as i64)
            }
            DiscountSelection::ManualFixed(amount) => (DiscountKind::ManualFixed, amount.cents()),
            DiscountSelection::Coupon(applied) => match applied.coupon.rule {
                CouponRule::Percentage(rate) => (DiscountKind::CouponPercent, rate.bps() as i64),
                CouponRule::Fixed(amount) => (DiscountKind::CouponFixed, amount.cents()),
            },
        };

        Some(RecordedDiscount {
            kind,
            value,
            amount: resolve(subtotal, self).discount,
        })
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Subtotal, discount and total after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedTotal {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

fn percent_discount(subtotal: Money, rate: Percentage) -> Money {
    subtotal.percentage_of(rate).non_negative().min(subtotal)
}

fn fixed_discount(subtotal: Money, amount: Money) -> Money {
    amount.non_negative().min(subtotal)
}

/// Discount a coupon rule gives on `subtotal`, clamped to `[0, subtotal]`.
pub fn coupon_discount(subtotal: Money, rule: &CouponRule) -> Money {
    let subtotal = subtotal.non_negative();
    match *rule {
        CouponRule::Percentage(rate) => percent_discount(subtotal, rate),
        CouponRule::Fixed(amount) => fixed_discount(subtotal, amount),
    }
}

/// Resolves the selection against `subtotal`.
///
/// ## Guarantees
/// - `0 ≤ discount ≤ subtotal`
/// - `total = subtotal − discount ≥ 0`
///
/// ## Example
/// ```rust
/// use till_core::discount::{resolve, DiscountSelection};
/// use till_core::money::Money;
///
/// // Fixed discount larger than the cart
/// let priced = resolve(
///     Money::from_cents(4000),
///     &DiscountSelection::ManualFixed(Money::from_cents(5000)),
/// );
/// assert_eq!(priced.discount.cents(), 4000);
/// assert!(priced.total.is_zero());
/// ```
pub fn resolve(subtotal: Money, selection: &DiscountSelection) -> PricedTotal {
    let subtotal = subtotal.non_negative();

    let discount = match selection {
        DiscountSelection::None => Money::zero(),
        DiscountSelection::ManualPercent(rate) => percent_discount(subtotal, *rate),
        DiscountSelection::ManualFixed(amount) => fixed_discount(subtotal, *amount),
        DiscountSelection::Coupon(applied) => coupon_discount(subtotal, &applied.coupon.rule),
    };

    PricedTotal {
        subtotal,
        discount,
        total: (subtotal - discount).non_negative(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
