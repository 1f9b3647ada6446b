//! # Cart Pricing
//!
//! The working cart of one register operator: product and ticket lines, the
//! selected discount source, and the totals derived from them.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operator Action          Cart Method              Effect               │
//! │  ───────────────          ───────────              ──────               │
//! │                                                                         │
//! │  Tap Product ────────────► add_product() ────────► merge or push line   │
//! │                                                                         │
//! │  Tap Ticket ─────────────► add_ticket() ─────────► cumulative ceiling   │
//! │                                                    check, then merge    │
//! │                                                                         │
//! │  Change Quantity ────────► set_quantity() ───────► 0 removes the line   │
//! │                                                                         │
//! │  Click Remove ───────────► remove() ─────────────► line dropped         │
//! │                                                                         │
//! │  Pick Discount ──────────► set_discount() ───────► replaces any source  │
//! │                                                                         │
//! │  View Totals ────────────► totals() ─────────────► resolved live        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - One line per `(kind, item id)`; adding an item already present
//!   increases its quantity
//! - Every line has `1 ≤ quantity ≤ MAX_ITEM_QUANTITY`
//! - A ticket line never exceeds the ticket's availability ceiling
//! - At most `MAX_CART_LINES` lines
//! - Unit prices are frozen when a line is first added

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::discount::{resolve, DiscountSelection, PricedTotal};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Event, LineKind, PaymentMethod, Product, TicketType};
use crate::validation::validate_quantity;
use crate::{MAX_CART_LINES, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Lines
// =============================================================================

/// A product in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductLine {
    pub product_id: String,
    /// Name at time of adding (frozen).
    pub name: String,
    /// Effective price at time of adding (frozen).
    pub unit_price: Money,
    pub quantity: i64,
    /// Stock on hand when last touched. Shown to the operator, not enforced.
    pub stock_ceiling: i64,
}

/// Tickets of one ticket type in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TicketLine {
    pub ticket_type_id: String,
    pub event_id: String,
    /// `"{event name} - {ticket type name}"` at time of adding.
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    /// `quantity_available − quantity_sold` when last touched.
    pub available_ceiling: i64,
}

/// One cart line, keyed by `(kind, item id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartLine {
    Product(ProductLine),
    Ticket(TicketLine),
}

impl CartLine {
    pub fn kind(&self) -> LineKind {
        match self {
            CartLine::Product(_) => LineKind::Product,
            CartLine::Ticket(_) => LineKind::Ticket,
        }
    }

    /// Product id or ticket type id.
    pub fn item_id(&self) -> &str {
        match self {
            CartLine::Product(line) => &line.product_id,
            CartLine::Ticket(line) => &line.ticket_type_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CartLine::Product(line) => &line.name,
            CartLine::Ticket(line) => &line.name,
        }
    }

    pub fn unit_price(&self) -> Money {
        match self {
            CartLine::Product(line) => line.unit_price,
            CartLine::Ticket(line) => line.unit_price,
        }
    }

    pub fn quantity(&self) -> i64 {
        match self {
            CartLine::Product(line) => line.quantity,
            CartLine::Ticket(line) => line.quantity,
        }
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity())
    }

    fn matches(&self, kind: LineKind, item_id: &str) -> bool {
        self.kind() == kind && self.item_id() == item_id
    }

    fn set_quantity_unchecked(&mut self, quantity: i64) {
        match self {
            CartLine::Product(line) => line.quantity = quantity,
            CartLine::Ticket(line) => line.quantity = quantity,
        }
    }
}

/// Snapshot name of a ticket line.
///
/// ## Example
/// ```rust
/// use till_core::cart::ticket_line_name;
///
/// assert_eq!(ticket_line_name("Festival", "VIP"), "Festival - VIP");
/// ```
pub fn ticket_line_name(event_name: &str, ticket_type_name: &str) -> String {
    format!("{} - {}", event_name, ticket_type_name)
}

// =============================================================================
// Cart
// =============================================================================

/// Cart totals summary for the register screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    /// Distinct lines.
    pub line_count: usize,
    /// Sum of quantities.
    pub item_count: i64,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

/// The register's working cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    lines: Vec<CartLine>,
    discount: DiscountSelection,
}

impl Cart {
    /// Creates a new empty cart with no discount.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds a product or increases its quantity if already present.
    ///
    /// ## Errors
    /// - `ProductUnavailable` if the product is inactive
    /// - `Validation` if `quantity` is not in `1..=999`
    /// - `QuantityTooLarge` if the merged quantity passes the maximum
    /// - `CartTooLarge` if a new line would pass `MAX_CART_LINES`
    ///
    /// Stock is not enforced here; commit floors it at zero.
    pub fn add_product(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if !product.is_active {
            return Err(CoreError::ProductUnavailable(product.id.clone()));
        }

        if let Some(CartLine::Product(line)) = self.find_mut(LineKind::Product, &product.id) {
            let merged = line.quantity + quantity;
            if merged > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.quantity = merged;
            line.stock_ceiling = product.stock;
            return Ok(());
        }

        self.ensure_room()?;
        self.lines.push(CartLine::Product(ProductLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.effective_price(),
            quantity,
            stock_ceiling: product.stock,
        }));
        Ok(())
    }

    /// Adds tickets of one type, checking availability cumulatively.
    ///
    /// ## Capacity Check
    /// ```text
    /// requested = quantity already in cart + quantity
    /// requested > quantity_available − quantity_sold  ──► rejected, cart unchanged
    /// ```
    ///
    /// ## Errors
    /// - `TicketUnavailable` if the ticket type is inactive or not of `event`
    /// - `TicketCapacityExceeded` if the cumulative quantity passes the ceiling
    /// - `Validation`, `QuantityTooLarge`, `CartTooLarge` as for products
    pub fn add_ticket(
        &mut self,
        ticket_type: &TicketType,
        event: &Event,
        quantity: i64,
    ) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if !ticket_type.is_active || ticket_type.event_id != event.id {
            return Err(CoreError::TicketUnavailable(ticket_type.id.clone()));
        }

        let in_cart = self.quantity_of(LineKind::Ticket, &ticket_type.id);
        let requested = in_cart + quantity;
        let available = ticket_type.available();

        if requested > available {
            return Err(CoreError::TicketCapacityExceeded {
                ticket_type_id: ticket_type.id.clone(),
                available,
                requested,
            });
        }

        if requested > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if let Some(CartLine::Ticket(line)) = self.find_mut(LineKind::Ticket, &ticket_type.id) {
            line.quantity = requested;
            line.available_ceiling = available;
            return Ok(());
        }

        self.ensure_room()?;
        self.lines.push(CartLine::Ticket(TicketLine {
            ticket_type_id: ticket_type.id.clone(),
            event_id: event.id.clone(),
            name: ticket_line_name(&event.name, &ticket_type.name),
            unit_price: ticket_type.price,
            quantity,
            available_ceiling: available,
        }));
        Ok(())
    }

    /// Sets the quantity of a line already in the cart.
    ///
    /// ## Behavior
    /// - Quantity 0 removes the line
    /// - Ticket lines are checked against their last known ceiling
    pub fn set_quantity(&mut self, kind: LineKind, item_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove(kind, item_id);
        }

        validate_quantity(quantity)?;

        let line = self
            .find_mut(kind, item_id)
            .ok_or_else(|| CoreError::LineNotInCart(item_id.to_string()))?;

        if let CartLine::Ticket(ticket) = &*line {
            if quantity > ticket.available_ceiling {
                return Err(CoreError::TicketCapacityExceeded {
                    ticket_type_id: ticket.ticket_type_id.clone(),
                    available: ticket.available_ceiling,
                    requested: quantity,
                });
            }
        }

        line.set_quantity_unchecked(quantity);
        Ok(())
    }

    /// Updates a ticket line's ceiling from a fresh read of its ticket type.
    ///
    /// A no-op when the ticket type is not in the cart.
    pub fn refresh_ticket_availability(&mut self, ticket_type: &TicketType) {
        if let Some(CartLine::Ticket(line)) = self.find_mut(LineKind::Ticket, &ticket_type.id) {
            line.available_ceiling = if ticket_type.is_active {
                ticket_type.available()
            } else {
                0
            };
        }
    }

    /// Removes a line from the cart.
    pub fn remove(&mut self, kind: LineKind, item_id: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|line| !line.matches(kind, item_id));

        if self.lines.len() == initial_len {
            Err(CoreError::LineNotInCart(item_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Empties the cart and drops the discount selection.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount = DiscountSelection::None;
    }

    // -------------------------------------------------------------------------
    // Discount
    // -------------------------------------------------------------------------

    /// Replaces the discount source. Any previous source is dropped.
    pub fn set_discount(&mut self, selection: DiscountSelection) {
        self.discount = selection;
    }

    pub fn clear_discount(&mut self) {
        self.discount = DiscountSelection::None;
    }

    pub fn discount(&self) -> &DiscountSelection {
        &self.discount
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Sum of line quantities.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(CartLine::quantity).sum()
    }

    /// Quantity already in the cart for an item, 0 when absent.
    pub fn quantity_of(&self, kind: LineKind, item_id: &str) -> i64 {
        self.lines
            .iter()
            .find(|line| line.matches(kind, item_id))
            .map(CartLine::quantity)
            .unwrap_or(0)
    }

    /// `Σ unit_price × quantity` over product and ticket lines together.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Resolves the current discount against the current subtotal.
    pub fn pricing(&self) -> PricedTotal {
        resolve(self.subtotal(), &self.discount)
    }

    pub fn totals(&self) -> CartTotals {
        let pricing = self.pricing();
        CartTotals {
            line_count: self.line_count(),
            item_count: self.total_quantity(),
            subtotal: pricing.subtotal,
            discount: pricing.discount,
            total: pricing.total,
        }
    }

    fn find_mut(&mut self, kind: LineKind, item_id: &str) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.matches(kind, item_id))
    }

    fn ensure_room(&self) -> CoreResult<()> {
        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }
        Ok(())
    }
}

/// Change owed to the customer.
///
/// `max(0, amount_paid − total)` for cash, zero for card and PIX or when
/// nothing was tendered yet.
pub fn change_due(total: Money, method: Option<PaymentMethod>, amount_paid: Option<Money>) -> Money {
    match (method, amount_paid) {
        (Some(PaymentMethod::Cash), Some(paid)) => (paid - total).non_negative(),
        _ => Money::zero(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
