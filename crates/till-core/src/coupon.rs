//! # Coupon Evaluation
//!
//! Read-only check of a coupon code against the current cart.
//!
//! ## Evaluation Order (first failure wins)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  raw code ──► normalize (trim, uppercase) ──► lookup active coupon      │
//! │                                                   │                     │
//! │                     miss ─────────────────────────┼──► NOT_FOUND        │
//! │                                                   ▼                     │
//! │  today > valid_until (end of that local day) ─────────► EXPIRED         │
//! │  today < valid_from  (start of that local day) ───────► NOT_YET_VALID   │
//! │  current_uses >= max_uses ────────────────────────────► USES_EXHAUSTED  │
//! │  subtotal < minimum_order ────────────────────────────► BELOW_MINIMUM   │
//! │                                                   │                     │
//! │                                                   ▼                     │
//! │                                   AppliedCoupon { preview_discount }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here reserves a use. `current_uses` grows only when a sale that
//! carries the coupon is committed, so validating twice is harmless.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::discount::coupon_discount;
use crate::money::Money;
use crate::types::Coupon;

/// Why a coupon code was refused.
///
/// Not an error: the register shows the reason and lets the operator try
/// another code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponRejection {
    NotFound,
    Expired,
    NotYetValid,
    UsesExhausted,
    BelowMinimum { minimum: Money },
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouponRejection::NotFound => write!(f, "Coupon not found"),
            CouponRejection::Expired => write!(f, "Coupon has expired"),
            CouponRejection::NotYetValid => write!(f, "Coupon is not valid yet"),
            CouponRejection::UsesExhausted => write!(f, "Coupon has no uses left"),
            CouponRejection::BelowMinimum { minimum } => {
                write!(f, "Order must be at least {} to use this coupon", minimum)
            }
        }
    }
}

/// A coupon that passed evaluation, with the discount it gave at that moment.
///
/// `preview_discount` is for display only. The cart re-resolves the
/// discount against the live subtotal every time totals are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppliedCoupon {
    pub coupon: Coupon,
    pub preview_discount: Money,
}

/// Normalizes a typed code for lookup: trimmed and uppercased.
///
/// ## Example
/// ```rust
/// use till_core::coupon::normalize_code;
///
/// assert_eq!(normalize_code("  promo10 "), "PROMO10");
/// ```
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Evaluates a looked-up coupon against the subtotal at local time `now`.
///
/// ## Arguments
/// * `coupon` - Result of the lookup by normalized code (`None` on a miss)
/// * `subtotal` - Current cart subtotal
/// * `now` - Local wall-clock time of the register
///
/// ## Date Bounds
/// `valid_until` holds through 23:59:59.999 of that day and `valid_from`
/// starts at 00:00:00.000, so both compare on the local calendar date.
pub fn evaluate_coupon(
    coupon: Option<&Coupon>,
    subtotal: Money,
    now: NaiveDateTime,
) -> Result<AppliedCoupon, CouponRejection> {
    let coupon = match coupon {
        Some(c) if c.is_active => c,
        _ => return Err(CouponRejection::NotFound),
    };

    let today = now.date();

    if let Some(valid_until) = coupon.valid_until {
        if today > valid_until {
            return Err(CouponRejection::Expired);
        }
    }

    if let Some(valid_from) = coupon.valid_from {
        if today < valid_from {
            return Err(CouponRejection::NotYetValid);
        }
    }

    if let Some(max_uses) = coupon.max_uses {
        if coupon.current_uses >= max_uses {
            return Err(CouponRejection::UsesExhausted);
        }
    }

    if let Some(minimum) = coupon.minimum_order {
        if subtotal < minimum {
            return Err(CouponRejection::BelowMinimum { minimum });
        }
    }

    Ok(AppliedCoupon {
        preview_discount: coupon_discount(subtotal, &coupon.rule),
        coupon: coupon.clone(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CouponRule, Percentage};
    use chrono::{Duration, NaiveDate};

    fn at(date: NaiveDate, h: u32, m: u32, s: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, s).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn coupon() -> Coupon {
        Coupon {
            id: "c1".to_string(),
            code: "PROMO10".to_string(),
            rule: CouponRule::Percentage(Percentage::from_whole(10)),
            minimum_order: None,
            max_uses: None,
            current_uses: 0,
            valid_from: None,
            valid_until: None,
            is_active: true,
        }
    }

    #[test]
    fn test_missing_or_inactive_is_not_found() {
        let now = at(today(), 12, 0, 0);
        assert_eq!(
            evaluate_coupon(None, Money::from_cents(100), now),
            Err(CouponRejection::NotFound)
        );

        let mut inactive = coupon();
        inactive.is_active = false;
        assert_eq!(
            evaluate_coupon(Some(&inactive), Money::from_cents(100), now),
            Err(CouponRejection::NotFound)
        );
    }

    #[test]
    fn test_percentage_coupon_preview() {
        let c = coupon();
        let applied = evaluate_coupon(Some(&c), Money::from_cents(10000), at(today(), 9, 0, 0))
            .unwrap();
        assert_eq!(applied.preview_discount.cents(), 1000);
        assert_eq!(applied.coupon.code, "PROMO10");
    }

    #[test]
    fn test_expired_yesterday_regardless_of_time() {
        let mut c = coupon();
        c.valid_until = Some(today() - Duration::days(1));

        for (h, m, s) in [(0, 0, 0), (0, 0, 1), (12, 0, 0), (23, 59, 59)] {
            assert_eq!(
                evaluate_coupon(Some(&c), Money::from_cents(100), at(today(), h, m, s)),
                Err(CouponRejection::Expired)
            );
        }
    }

    #[test]
    fn test_valid_until_includes_whole_last_day() {
        let mut c = coupon();
        c.valid_until = Some(today());

        let late = today()
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap();
        assert!(evaluate_coupon(Some(&c), Money::from_cents(100), late).is_ok());
    }

    #[test]
    fn test_valid_from_starts_at_midnight() {
        let mut c = coupon();
        c.valid_from = Some(today());

        assert!(evaluate_coupon(Some(&c), Money::from_cents(100), at(today(), 0, 0, 0)).is_ok());

        let just_before = at(today() - Duration::days(1), 23, 59, 59);
        assert_eq!(
            evaluate_coupon(Some(&c), Money::from_cents(100), just_before),
            Err(CouponRejection::NotYetValid)
        );
    }

    #[test]
    fn test_uses_exhausted() {
        let mut c = coupon();
        c.max_uses = Some(5);
        c.current_uses = 5;
        assert_eq!(
            evaluate_coupon(Some(&c), Money::from_cents(100), at(today(), 10, 0, 0)),
            Err(CouponRejection::UsesExhausted)
        );

        c.current_uses = 4;
        assert!(evaluate_coupon(Some(&c), Money::from_cents(100), at(today(), 10, 0, 0)).is_ok());
    }

    #[test]
    fn test_below_minimum() {
        let mut c = coupon();
        c.minimum_order = Some(Money::from_cents(5000));

        assert_eq!(
            evaluate_coupon(Some(&c), Money::from_cents(4999), at(today(), 10, 0, 0)),
            Err(CouponRejection::BelowMinimum {
                minimum: Money::from_cents(5000)
            })
        );
        assert!(evaluate_coupon(Some(&c), Money::from_cents(5000), at(today(), 10, 0, 0)).is_ok());
    }

    #[test]
    fn test_first_failure_wins() {
        // Expired, exhausted and below minimum all at once: expiry is reported.
        let mut c = coupon();
        c.valid_until = Some(today() - Duration::days(3));
        c.max_uses = Some(1);
        c.current_uses = 1;
        c.minimum_order = Some(Money::from_cents(100_000));

        assert_eq!(
            evaluate_coupon(Some(&c), Money::from_cents(100), at(today(), 10, 0, 0)),
            Err(CouponRejection::Expired)
        );

        c.valid_until = None;
        assert_eq!(
            evaluate_coupon(Some(&c), Money::from_cents(100), at(today(), 10, 0, 0)),
            Err(CouponRejection::UsesExhausted)
        );
    }

    #[test]
    fn test_evaluation_does_not_touch_uses() {
        let mut c = coupon();
        c.max_uses = Some(1);

        let now = at(today(), 10, 0, 0);
        assert!(evaluate_coupon(Some(&c), Money::from_cents(100), now).is_ok());
        assert!(evaluate_coupon(Some(&c), Money::from_cents(100), now).is_ok());
        assert_eq!(c.current_uses, 0);
    }

    #[test]
    fn test_rejection_serializes_with_reason_tag() {
        let json = serde_json::to_string(&CouponRejection::NotYetValid).unwrap();
        assert_eq!(json, r#"{"reason":"NOT_YET_VALID"}"#);
    }
}
