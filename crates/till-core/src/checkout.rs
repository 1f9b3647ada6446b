//! # Checkout Preparation
//!
//! Checks the preconditions of a sale and freezes the cart into a draft
//! that storage can persist in one unit of work.
//!
//! ## Where This Sits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart + payment inputs                                                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  prepare_checkout()  (THIS MODULE, pure)                                │
//! │  ├── cart non-empty ─────────────────────────► else EmptyCart           │
//! │  ├── payment method chosen ──────────────────► else PaymentMethodRequired│
//! │  ├── cash: amount_paid ≥ total ──────────────► else InsufficientTender  │
//! │  └── snapshot lines, discount triple, change                            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  CheckoutDraft ──► till-db commit (session guard, insert, counters)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The open-session precondition is checked by storage, inside the same
//! database transaction that inserts the sale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{change_due, Cart};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{LineKind, PaymentMethod, RecordedDiscount, Transaction, TransactionLine};
use crate::validation::validate_non_negative;

/// A frozen cart line: what the receipt will say forever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftLine {
    pub position: i64,
    pub kind: LineKind,
    pub item_id: String,
    pub name_snapshot: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

/// Everything a committed sale records, minus storage-assigned ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutDraft {
    pub lines: Vec<DraftLine>,
    pub subtotal: Money,
    pub discount: Option<RecordedDiscount>,
    pub coupon_id: Option<String>,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub amount_paid: Option<Money>,
    pub change: Money,
}

impl CheckoutDraft {
    /// Product lines, for the stock decrement.
    pub fn product_lines(&self) -> impl Iterator<Item = &DraftLine> {
        self.lines.iter().filter(|l| l.kind == LineKind::Product)
    }

    /// Ticket lines, for the guarded sold-count increment.
    pub fn ticket_lines(&self) -> impl Iterator<Item = &DraftLine> {
        self.lines.iter().filter(|l| l.kind == LineKind::Ticket)
    }

    /// Builds the persisted record once storage has assigned ids.
    ///
    /// `line_id` is called once per line, in receipt order.
    pub fn into_transaction(
        self,
        id: String,
        session_id: String,
        created_at: DateTime<Utc>,
        mut line_id: impl FnMut() -> String,
    ) -> Transaction {
        let lines = self
            .lines
            .into_iter()
            .map(|line| TransactionLine {
                id: line_id(),
                transaction_id: id.clone(),
                position: line.position,
                kind: line.kind,
                item_id: line.item_id,
                name_snapshot: line.name_snapshot,
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total: line.line_total,
            })
            .collect();

        Transaction {
            id,
            session_id,
            lines,
            subtotal: self.subtotal,
            discount: self.discount,
            coupon_id: self.coupon_id,
            total: self.total,
            payment_method: self.payment_method,
            amount_paid: self.amount_paid,
            change: self.change,
            created_at,
        }
    }
}

/// Validates the sale preconditions and freezes the cart.
///
/// ## Arguments
/// * `cart` - The operator's cart
/// * `method` - Selected payment method, if any
/// * `amount_paid` - Cash tendered; ignored for card and PIX
///
/// ## Errors
/// - `EmptyCart`
/// - `PaymentMethodRequired`
/// - `Validation` for a negative tender
/// - `InsufficientTender` for cash below the total (a missing tender counts as zero)
pub fn prepare_checkout(
    cart: &Cart,
    method: Option<PaymentMethod>,
    amount_paid: Option<Money>,
) -> CoreResult<CheckoutDraft> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let payment_method = method.ok_or(CoreError::PaymentMethodRequired)?;
    let pricing = cart.pricing();

    let amount_paid = match payment_method {
        PaymentMethod::Cash => {
            let paid = amount_paid.unwrap_or_default();
            validate_non_negative(paid, "amount paid")?;
            if paid < pricing.total {
                return Err(CoreError::InsufficientTender {
                    total: pricing.total,
                    paid,
                });
            }
            Some(paid)
        }
        PaymentMethod::Card | PaymentMethod::Pix => None,
    };

    let lines = cart
        .lines()
        .iter()
        .enumerate()
        .map(|(position, line)| DraftLine {
            position: position as i64,
            kind: line.kind(),
            item_id: line.item_id().to_string(),
            name_snapshot: line.name().to_string(),
            unit_price: line.unit_price(),
            quantity: line.quantity(),
            line_total: line.line_total(),
        })
        .collect();

    Ok(CheckoutDraft {
        lines,
        subtotal: pricing.subtotal,
        discount: cart.discount().record(pricing.subtotal),
        coupon_id: cart.discount().coupon().map(|a| a.coupon.id.clone()),
        total: pricing.total,
        payment_method,
        amount_paid,
        change: change_due(pricing.total, Some(payment_method), amount_paid),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::AppliedCoupon;
    use crate::discount::DiscountSelection;
    use crate::types::{Coupon, CouponRule, DiscountKind, Event, Percentage, Product, TicketType};
    use chrono::NaiveDate;

    fn cart_of_45() -> Cart {
        let mut cart = Cart::new();
        let product = Product {
            id: "p1".to_string(),
            name: "Cerveja".to_string(),
            price: Money::from_cents(1500),
            sale_price: None,
            is_on_sale: false,
            stock: 10,
            is_active: true,
        };
        cart.add_product(&product, 3).unwrap();
        cart
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(
            prepare_checkout(&Cart::new(), Some(PaymentMethod::Card), None),
            Err(CoreError::EmptyCart)
        );
    }

    #[test]
    fn test_payment_method_required() {
        assert_eq!(
            prepare_checkout(&cart_of_45(), None, None),
            Err(CoreError::PaymentMethodRequired)
        );
    }

    #[test]
    fn test_insufficient_cash() {
        assert_eq!(
            prepare_checkout(
                &cart_of_45(),
                Some(PaymentMethod::Cash),
                Some(Money::from_cents(4000))
            ),
            Err(CoreError::InsufficientTender {
                total: Money::from_cents(4500),
                paid: Money::from_cents(4000),
            })
        );

        assert!(matches!(
            prepare_checkout(&cart_of_45(), Some(PaymentMethod::Cash), None),
            Err(CoreError::InsufficientTender { .. })
        ));
    }

    #[test]
    fn test_cash_change() {
        let draft = prepare_checkout(
            &cart_of_45(),
            Some(PaymentMethod::Cash),
            Some(Money::from_cents(5000)),
        )
        .unwrap();

        assert_eq!(draft.total.cents(), 4500);
        assert_eq!(draft.amount_paid, Some(Money::from_cents(5000)));
        assert_eq!(draft.change.cents(), 500);
    }

    #[test]
    fn test_card_ignores_tender() {
        let draft = prepare_checkout(
            &cart_of_45(),
            Some(PaymentMethod::Card),
            Some(Money::from_cents(9999)),
        )
        .unwrap();

        assert_eq!(draft.amount_paid, None);
        assert!(draft.change.is_zero());
        assert!(draft.discount.is_none());
        assert!(draft.coupon_id.is_none());
    }

    #[test]
    fn test_zero_total_cash_sale_needs_no_tender() {
        let mut cart = cart_of_45();
        cart.set_discount(DiscountSelection::ManualFixed(Money::from_cents(10000)));

        let draft = prepare_checkout(&cart, Some(PaymentMethod::Cash), None).unwrap();
        assert!(draft.total.is_zero());
        assert_eq!(draft.discount.unwrap().amount.cents(), 4500);
    }

    #[test]
    fn test_draft_snapshots_lines_and_coupon() {
        let mut cart = cart_of_45();
        let event = Event {
            id: "e1".to_string(),
            name: "Show".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            time: None,
        };
        let ticket = TicketType {
            id: "t1".to_string(),
            event_id: "e1".to_string(),
            name: "VIP".to_string(),
            price: Money::from_cents(5500),
            quantity_available: 100,
            quantity_sold: 0,
            is_active: true,
        };
        cart.add_ticket(&ticket, &event, 1).unwrap();
        cart.set_discount(DiscountSelection::Coupon(AppliedCoupon {
            coupon: Coupon {
                id: "c1".to_string(),
                code: "PROMO10".to_string(),
                rule: CouponRule::Percentage(Percentage::from_whole(10)),
                minimum_order: None,
                max_uses: Some(10),
                current_uses: 0,
                valid_from: None,
                valid_until: None,
                is_active: true,
            },
            preview_discount: Money::from_cents(1000),
        }));

        let draft = prepare_checkout(&cart, Some(PaymentMethod::Pix), None).unwrap();

        assert_eq!(draft.subtotal.cents(), 10000);
        assert_eq!(draft.total.cents(), 9000);
        assert_eq!(draft.coupon_id.as_deref(), Some("c1"));

        let discount = draft.discount.unwrap();
        assert_eq!(discount.kind, DiscountKind::CouponPercent);
        assert_eq!(discount.value, 1000);
        assert_eq!(discount.amount.cents(), 1000);

        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.lines[1].position, 1);
        assert_eq!(draft.lines[1].name_snapshot, "Show - VIP");
        assert_eq!(draft.product_lines().count(), 1);
        assert_eq!(draft.ticket_lines().count(), 1);
    }

    #[test]
    fn test_into_transaction_assigns_ids() {
        let draft = prepare_checkout(&cart_of_45(), Some(PaymentMethod::Card), None).unwrap();

        let mut n = 0;
        let tx = draft.into_transaction("tx1".to_string(), "s1".to_string(), Utc::now(), || {
            n += 1;
            format!("line{}", n)
        });

        assert_eq!(tx.id, "tx1");
        assert_eq!(tx.session_id, "s1");
        assert_eq!(tx.lines[0].id, "line1");
        assert_eq!(tx.lines[0].transaction_id, "tx1");
        assert_eq!(tx.lines[0].line_total.cents(), 4500);
    }
}
