//! # Terminal
//!
//! One operator's working state: the cart, the selected discount and the
//! payment inputs. Catalog reads and the final commit go through the
//! [`Register`].
//!
//! ## Operator Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  add_product / add_ticket ──► Cart (lines, quantities)                  │
//! │                                  │                                      │
//! │  apply_coupon / set_manual_* ──► DiscountSelection (exactly one)        │
//! │                                  │                                      │
//! │  select_payment / set_amount_paid                                       │
//! │                                  │                                      │
//! │  checkout() ──► prepare_checkout ──► Register::commit_sale              │
//! │                                  │                                      │
//! │        Ok  ──► cart, discount and payment inputs cleared                │
//! │        Err ──► everything left as it was, ready to retry                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `Terminal` has a single writer: every mutation takes `&mut self`.

use tracing::debug;

use crate::error::EngineResult;
use crate::register::Register;
use till_core::validation::{validate_non_negative, validate_percentage};
use till_core::{
    change_due, prepare_checkout, AppliedCoupon, Cart, CartTotals, CoreError, CouponRejection,
    DiscountSelection, LineKind, Money, PaymentMethod, Percentage, Transaction,
};

/// Per-operator sale in progress.
#[derive(Debug)]
pub struct Terminal {
    register: Register,
    cart: Cart,
    payment_method: Option<PaymentMethod>,
    amount_paid: Option<Money>,
}

impl Terminal {
    pub fn new(register: Register) -> Self {
        Terminal {
            register,
            cart: Cart::new(),
            payment_method: None,
            amount_paid: None,
        }
    }

    pub fn register(&self) -> &Register {
        &self.register
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn amount_paid(&self) -> Option<Money> {
        self.amount_paid
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    /// Adds a product at its current effective price.
    pub async fn add_product(&mut self, product_id: &str, quantity: i64) -> EngineResult<()> {
        let product = self
            .register
            .database()
            .catalog()
            .get_product(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductUnavailable(product_id.to_string()))?;

        self.cart.add_product(&product, quantity)?;
        debug!(product_id = %product_id, quantity, "Product added to cart");
        Ok(())
    }

    /// Adds tickets, checked against freshly read availability.
    pub async fn add_ticket(&mut self, ticket_type_id: &str, quantity: i64) -> EngineResult<()> {
        let catalog = self.register.database().catalog();

        let ticket_type = catalog
            .get_ticket_type(ticket_type_id)
            .await?
            .ok_or_else(|| CoreError::TicketUnavailable(ticket_type_id.to_string()))?;
        let event = catalog
            .get_event(&ticket_type.event_id)
            .await?
            .ok_or_else(|| CoreError::TicketUnavailable(ticket_type_id.to_string()))?;

        self.cart.add_ticket(&ticket_type, &event, quantity)?;
        debug!(ticket_type_id = %ticket_type_id, quantity, "Tickets added to cart");
        Ok(())
    }

    /// Sets a line's quantity; zero removes the line.
    ///
    /// Ticket lines are re-read first, so the ceiling reflects sales made by
    /// other terminals since the line was added.
    pub async fn set_quantity(
        &mut self,
        kind: LineKind,
        item_id: &str,
        quantity: i64,
    ) -> EngineResult<()> {
        if kind == LineKind::Ticket && quantity > 0 && self.cart.quantity_of(kind, item_id) > 0 {
            let ticket_type = self
                .register
                .database()
                .catalog()
                .get_ticket_type(item_id)
                .await?
                .ok_or_else(|| CoreError::TicketUnavailable(item_id.to_string()))?;
            self.cart.refresh_ticket_availability(&ticket_type);
        }

        self.cart.set_quantity(kind, item_id, quantity)?;
        debug!(kind = ?kind, item_id = %item_id, quantity, "Line quantity set");
        Ok(())
    }

    pub fn remove(&mut self, kind: LineKind, item_id: &str) -> EngineResult<()> {
        Ok(self.cart.remove(kind, item_id)?)
    }

    /// Empties the cart and drops the discount and payment inputs.
    pub fn clear(&mut self) {
        self.cart.clear();
        self.payment_method = None;
        self.amount_paid = None;
    }

    // -------------------------------------------------------------------------
    // Discounts
    // -------------------------------------------------------------------------

    /// Validates a coupon against the current subtotal and, when accepted,
    /// makes it the active discount.
    ///
    /// A rejected code leaves the current selection untouched.
    pub async fn apply_coupon(
        &mut self,
        code: &str,
    ) -> EngineResult<Result<AppliedCoupon, CouponRejection>> {
        let outcome = self.register.check_coupon(code, self.cart.subtotal()).await?;

        if let Ok(applied) = &outcome {
            self.cart.set_discount(DiscountSelection::Coupon(applied.clone()));
        }

        Ok(outcome)
    }

    pub fn set_manual_percent(&mut self, rate: Percentage) -> EngineResult<()> {
        validate_percentage(rate)?;
        self.cart.set_discount(DiscountSelection::ManualPercent(rate));
        Ok(())
    }

    pub fn set_manual_fixed(&mut self, amount: Money) -> EngineResult<()> {
        validate_non_negative(amount, "discount")?;
        self.cart.set_discount(DiscountSelection::ManualFixed(amount));
        Ok(())
    }

    pub fn clear_discount(&mut self) {
        self.cart.clear_discount();
    }

    pub fn discount(&self) -> &DiscountSelection {
        self.cart.discount()
    }

    // -------------------------------------------------------------------------
    // Payment
    // -------------------------------------------------------------------------

    pub fn select_payment(&mut self, method: PaymentMethod) {
        self.payment_method = Some(method);
    }

    /// Cash tendered. Ignored for card and PIX.
    pub fn set_amount_paid(&mut self, amount: Option<Money>) {
        self.amount_paid = amount;
    }

    pub fn totals(&self) -> CartTotals {
        self.cart.totals()
    }

    /// Change owed for the current inputs; zero unless paying cash.
    pub fn change(&self) -> Money {
        change_due(self.cart.pricing().total, self.payment_method, self.amount_paid)
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Commits the sale. On success the terminal is reset for the next
    /// customer; on failure nothing changes.
    pub async fn checkout(&mut self) -> EngineResult<Transaction> {
        let draft = prepare_checkout(&self.cart, self.payment_method, self.amount_paid)?;
        let txn = self.register.commit_sale(draft).await?;

        self.clear();
        Ok(txn)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::fixtures::{self, BEER, PROMO, PROMO_ID, VIP, WATER};
    use till_core::{DiscountKind, ReconciliationOutcome};

    async fn terminal() -> Terminal {
        Terminal::new(Register::new(fixtures::seeded().await))
    }

    async fn open_terminal(fund_cents: i64) -> Terminal {
        let terminal = terminal().await;
        terminal
            .register()
            .open_session("op-1", Money::from_cents(fund_cents))
            .await
            .unwrap();
        terminal
    }

    fn core(err: &EngineError) -> &CoreError {
        err.as_core().expect("expected a domain error")
    }

    #[tokio::test]
    async fn test_coupon_scenario() {
        let mut t = open_terminal(0).await;
        t.add_ticket(VIP, 2).await.unwrap();

        let applied = t.apply_coupon("promo10").await.unwrap().unwrap();
        assert_eq!(applied.preview_discount, Money::from_cents(1000));

        let totals = t.totals();
        assert_eq!(totals.subtotal, Money::from_cents(10000));
        assert_eq!(totals.discount, Money::from_cents(1000));
        assert_eq!(totals.total, Money::from_cents(9000));

        t.select_payment(PaymentMethod::Pix);
        let txn = t.checkout().await.unwrap();

        assert_eq!(txn.total, Money::from_cents(9000));
        let recorded = txn.discount.unwrap();
        assert_eq!(recorded.kind, DiscountKind::CouponPercent);
        assert_eq!(recorded.value, 1000);
        assert_eq!(txn.coupon_id.as_deref(), Some(PROMO_ID));

        // Shape handed to the storefront
        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["payment_method"], "pix");
        assert_eq!(json["discount"]["kind"], "coupon_percent");
        assert_eq!(json["lines"][0]["name_snapshot"], "Show - VIP");

        let db = t.register().database();
        assert_eq!(fixtures::uses_of(db, PROMO_ID).await, 1);
        assert_eq!(fixtures::sold_of(db, VIP).await, 10);
    }

    #[tokio::test]
    async fn test_manual_fixed_clamped_to_subtotal() {
        let mut t = open_terminal(0).await;
        t.add_product(BEER, 2).await.unwrap();
        t.add_product(WATER, 2).await.unwrap();

        t.set_manual_fixed(Money::from_cents(5000)).unwrap();
        let totals = t.totals();
        assert_eq!(totals.subtotal, Money::from_cents(4000));
        assert_eq!(totals.discount, Money::from_cents(4000));
        assert_eq!(totals.total, Money::zero());

        // Nothing to tender on a zero total
        t.select_payment(PaymentMethod::Cash);
        let txn = t.checkout().await.unwrap();
        assert_eq!(txn.total, Money::zero());
        assert_eq!(txn.change, Money::zero());
        assert_eq!(txn.discount.unwrap().amount, Money::from_cents(4000));
    }

    #[tokio::test]
    async fn test_ticket_ceiling_is_cumulative() {
        let mut t = terminal().await;

        t.add_ticket(VIP, 2).await.unwrap();
        let err = t.add_ticket(VIP, 1).await.unwrap_err();

        match core(&err) {
            CoreError::TicketCapacityExceeded { available, requested, .. } => {
                assert_eq!(*available, 2);
                assert_eq!(*requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(t.cart().quantity_of(LineKind::Ticket, VIP), 2);

        let err = t.set_quantity(LineKind::Ticket, VIP, 3).await.unwrap_err();
        assert!(matches!(core(&err), CoreError::TicketCapacityExceeded { .. }));
    }

    #[tokio::test]
    async fn test_set_quantity_sees_other_terminal_sales() {
        let mut first = open_terminal(0).await;
        let mut second = Terminal::new(first.register().clone());

        // Both see 2 VIP left; the second terminal sells one
        first.add_ticket(VIP, 1).await.unwrap();
        second.add_ticket(VIP, 1).await.unwrap();
        second.select_payment(PaymentMethod::Card);
        second.checkout().await.unwrap();

        let err = first.set_quantity(LineKind::Ticket, VIP, 2).await.unwrap_err();
        match core(&err) {
            CoreError::TicketCapacityExceeded { available, requested, .. } => {
                assert_eq!(*available, 1);
                assert_eq!(*requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(first.cart().quantity_of(LineKind::Ticket, VIP), 1);

        first.set_quantity(LineKind::Ticket, VIP, 1).await.unwrap();
        first.set_quantity(LineKind::Ticket, VIP, 0).await.unwrap();
        assert!(first.cart().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_items() {
        let mut t = terminal().await;

        let err = t.add_product("nope", 1).await.unwrap_err();
        assert!(matches!(core(&err), CoreError::ProductUnavailable(id) if id == "nope"));

        let err = t.add_ticket("nope", 1).await.unwrap_err();
        assert!(matches!(core(&err), CoreError::TicketUnavailable(_)));

        assert!(t.cart().is_empty());
    }

    #[tokio::test]
    async fn test_discount_selection_is_exclusive() {
        let mut t = terminal().await;
        t.add_product(BEER, 1).await.unwrap();

        t.apply_coupon(PROMO).await.unwrap().unwrap();
        assert!(t.discount().coupon().is_some());

        t.set_manual_fixed(Money::from_cents(100)).unwrap();
        assert_eq!(t.discount(), &DiscountSelection::ManualFixed(Money::from_cents(100)));
        assert!(t.discount().coupon().is_none());

        // A rejected code keeps the manual discount
        let outcome = t.apply_coupon("NOPE").await.unwrap();
        assert_eq!(outcome.unwrap_err(), CouponRejection::NotFound);
        assert_eq!(t.discount(), &DiscountSelection::ManualFixed(Money::from_cents(100)));

        t.set_manual_percent(Percentage::from_whole(5)).unwrap();
        assert_eq!(t.totals().discount, Money::from_cents(75));

        t.clear_discount();
        assert!(t.discount().is_none());
    }

    #[tokio::test]
    async fn test_invalid_manual_discounts() {
        let mut t = terminal().await;

        assert!(t.set_manual_percent(Percentage::from_whole(101)).is_err());
        assert!(t.set_manual_fixed(Money::from_cents(-1)).is_err());
        assert!(t.discount().is_none());
    }

    #[tokio::test]
    async fn test_checkout_preconditions() {
        let mut t = open_terminal(0).await;

        let err = t.checkout().await.unwrap_err();
        assert!(matches!(core(&err), CoreError::EmptyCart));

        t.add_product(BEER, 2).await.unwrap();
        let err = t.checkout().await.unwrap_err();
        assert!(matches!(core(&err), CoreError::PaymentMethodRequired));

        t.select_payment(PaymentMethod::Cash);
        t.set_amount_paid(Some(Money::from_cents(2000)));
        let err = t.checkout().await.unwrap_err();
        assert!(matches!(core(&err), CoreError::InsufficientTender { .. }));

        // Inputs survive the failures
        assert_eq!(t.cart().total_quantity(), 2);
        assert_eq!(t.payment_method(), Some(PaymentMethod::Cash));

        t.set_amount_paid(Some(Money::from_cents(5000)));
        assert_eq!(t.change(), Money::from_cents(2000));
        let txn = t.checkout().await.unwrap();
        assert_eq!(txn.change, Money::from_cents(2000));

        assert!(t.cart().is_empty());
        assert_eq!(t.payment_method(), None);
        assert_eq!(t.amount_paid(), None);
        assert!(t.discount().is_none());
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_cart() {
        let mut t = terminal().await;
        t.add_product(BEER, 1).await.unwrap();
        t.apply_coupon(PROMO).await.unwrap().unwrap();
        t.select_payment(PaymentMethod::Card);

        let err = t.checkout().await.unwrap_err();
        assert!(matches!(core(&err), CoreError::NoOpenSession));

        assert_eq!(t.cart().line_count(), 1);
        assert!(t.discount().coupon().is_some());
        assert_eq!(fixtures::uses_of(t.register().database(), PROMO_ID).await, 0);
        assert_eq!(fixtures::stock_of(t.register().database(), BEER).await, 10);
    }

    #[tokio::test]
    async fn test_full_day() {
        let mut t = open_terminal(20000).await;

        t.add_product(BEER, 2).await.unwrap();
        t.select_payment(PaymentMethod::Cash);
        t.set_amount_paid(Some(Money::from_cents(3000)));
        t.checkout().await.unwrap();

        t.add_product(BEER, 3).await.unwrap();
        t.select_payment(PaymentMethod::Cash);
        t.set_amount_paid(Some(Money::from_cents(4500)));
        t.checkout().await.unwrap();

        t.add_product(WATER, 1).await.unwrap();
        t.select_payment(PaymentMethod::Card);
        t.checkout().await.unwrap();

        let closure = t
            .register()
            .close_session(Money::from_cents(28000))
            .await
            .unwrap();

        assert_eq!(closure.reconciliation.expected, Money::from_cents(27500));
        assert_eq!(closure.reconciliation.difference, Money::from_cents(500));
        assert_eq!(closure.reconciliation.outcome, ReconciliationOutcome::Overage);
        assert_eq!(closure.totals.gross(), Money::from_cents(8000));

        // Selling after close fails and leaves the cart alone
        t.add_product(BEER, 1).await.unwrap();
        t.select_payment(PaymentMethod::Pix);
        let err = t.checkout().await.unwrap_err();
        assert!(matches!(core(&err), CoreError::NoOpenSession));
        assert_eq!(t.cart().line_count(), 1);
    }
}
