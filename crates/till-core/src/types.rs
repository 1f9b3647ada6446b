//! # Domain Types
//!
//! Records shared by the register engine and the storefront around it.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog Reference (read, counters only)                                │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   TicketType    │   │     Event       │       │
//! │  │  price          │   │  price          │   │  name           │       │
//! │  │  sale_price     │   │  qty_available  │   │  date / time    │       │
//! │  │  stock          │   │  qty_sold       │   │  (display only) │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Register Records                                                       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ RegisterSession │   │   Transaction   │   │     Coupon      │       │
//! │  │  initial_fund   │◄──│  session_id     │   │  code (NOCASE)  │       │
//! │  │  status         │   │  lines[]        │   │  rule           │       │
//! │  │  balances       │   │  discount?      │   │  current_uses   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Percentage
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10%, 1250 bps = 12.5%
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from whole percent (10 → 10%).
    ///
    /// Saturates at `u32::MAX` bps; range checks belong to validation.
    #[inline]
    pub const fn from_whole(pct: u32) -> Self {
        Percentage(pct.saturating_mul(100))
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn as_percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }
}

// =============================================================================
// Catalog Reference
// =============================================================================

/// A sellable product, as the register reads it from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Display name, snapshotted onto receipts.
    pub name: String,
    /// Regular price.
    pub price: Money,
    /// Promotional price, used only while `is_on_sale`.
    pub sale_price: Option<Money>,
    pub is_on_sale: bool,
    /// Units on hand. Never negative in storage (commit floors at zero).
    pub stock: i64,
    pub is_active: bool,
}

impl Product {
    /// Returns the price a customer pays right now.
    ///
    /// ## Rules
    /// - On sale with a sale price: the sale price
    /// - Otherwise: the regular price
    pub fn effective_price(&self) -> Money {
        match (self.is_on_sale, self.sale_price) {
            (true, Some(sale_price)) => sale_price,
            _ => self.price,
        }
    }
}

/// An event that ticket types belong to. Display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Event {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub time: Option<NaiveTime>,
}

/// A sellable ticket type with a capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TicketType {
    pub id: String,
    pub event_id: String,
    /// e.g. "VIP", "Pista", "Meia-entrada".
    pub name: String,
    pub price: Money,
    /// Total capacity.
    pub quantity_available: i64,
    /// Units sold so far.
    pub quantity_sold: i64,
    pub is_active: bool,
}

impl TicketType {
    /// Ticket availability ceiling: `quantity_available − quantity_sold`.
    ///
    /// Floored at zero so a data-entry mistake (capacity lowered below
    /// sold) reads as sold out rather than as negative stock.
    pub fn available(&self) -> i64 {
        (self.quantity_available - self.quantity_sold).max(0)
    }
}

// =============================================================================
// Register Session
// =============================================================================

/// Lifecycle state of a register session.
///
/// ```text
/// NO_SESSION ──open──► Open ──close──► Closed
///     ▲                                   │
///     └───────── next session ◄───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    /// Storage/text form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
        }
    }
}

/// One open/close cycle of the cash drawer.
///
/// Created open, mutated exactly once at close, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegisterSession {
    pub id: String,
    pub operator_id: String,
    /// Cash placed in the drawer at open.
    pub initial_fund: Money,
    pub status: SessionStatus,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    /// `initial_fund + Σ cash totals`, set at close.
    pub expected_balance: Option<Money>,
    /// Counted cash, set at close.
    pub actual_balance: Option<Money>,
    /// `actual − expected`, set at close.
    pub difference: Option<Money>,
}

impl RegisterSession {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid. A bookkeeping label, not a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; the only method that affects the drawer balance.
    Cash,
    /// Card on an external terminal.
    Card,
    /// PIX instant transfer.
    Pix,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Pix => "pix",
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// Discount type column of a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CouponDiscountType {
    Percentage,
    Fixed,
}

/// What a coupon takes off the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CouponRule {
    Percentage(Percentage),
    Fixed(Money),
}

impl CouponRule {
    /// Builds the rule from its stored `(discount_type, discount_value)` pair.
    ///
    /// `value` is basis points for percentages and cents for fixed amounts.
    pub fn from_parts(discount_type: CouponDiscountType, value: i64) -> Self {
        match discount_type {
            CouponDiscountType::Percentage => {
                CouponRule::Percentage(Percentage::from_bps(value.clamp(0, u32::MAX as i64) as u32))
            }
            CouponDiscountType::Fixed => CouponRule::Fixed(Money::from_cents(value)),
        }
    }

    pub fn discount_type(&self) -> CouponDiscountType {
        match self {
            CouponRule::Percentage(_) => CouponDiscountType::Percentage,
            CouponRule::Fixed(_) => CouponDiscountType::Fixed,
        }
    }

    /// Stored value: basis points or cents.
    pub fn raw_value(&self) -> i64 {
        match self {
            CouponRule::Percentage(p) => p.bps() as i64,
            CouponRule::Fixed(m) => m.cents(),
        }
    }
}

/// A discount code.
///
/// `current_uses` only ever grows, and only at commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Coupon {
    pub id: String,
    /// Stored uppercase; matched case-insensitively.
    pub code: String,
    pub rule: CouponRule,
    pub minimum_order: Option<Money>,
    /// `None` = unlimited.
    pub max_uses: Option<i64>,
    pub current_uses: i64,
    /// Inclusive; valid from the start of this local day.
    #[ts(as = "Option<String>")]
    pub valid_from: Option<NaiveDate>,
    /// Inclusive; valid until the end of this local day.
    #[ts(as = "Option<String>")]
    pub valid_until: Option<NaiveDate>,
    pub is_active: bool,
}

// =============================================================================
// Transaction
// =============================================================================

/// Kind of a sold line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Product,
    Ticket,
}

/// Discount type recorded on a transaction.
///
/// A coupon's type is recorded as `coupon_*` so history shows which
/// source produced the discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    ManualPercent,
    ManualFixed,
    CouponPercent,
    CouponFixed,
}

/// The all-or-nothing discount triple of a transaction.
///
/// `value` is basis points for percent kinds and cents for fixed kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecordedDiscount {
    pub kind: DiscountKind,
    pub value: i64,
    pub amount: Money,
}

/// A sold line, frozen at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionLine {
    pub id: String,
    pub transaction_id: String,
    /// Zero-based order within the receipt.
    pub position: i64,
    pub kind: LineKind,
    /// Product id or ticket type id.
    pub item_id: String,
    /// Name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price at time of sale (frozen).
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

/// A committed sale. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub session_id: String,
    pub lines: Vec<TransactionLine>,
    pub subtotal: Money,
    pub discount: Option<RecordedDiscount>,
    /// Set when the discount came from a coupon.
    pub coupon_id: Option<String>,
    pub total: Money,
    pub payment_method: PaymentMethod,
    /// Cash only.
    pub amount_paid: Option<Money>,
    /// Cash only, zero otherwise.
    pub change: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Discount amount, zero when no discount was applied.
    pub fn discount_amount(&self) -> Money {
        self.discount.map(|d| d.amount).unwrap_or_default()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(is_on_sale: bool, sale_price: Option<i64>) -> Product {
        Product {
            id: "p1".to_string(),
            name: "Cerveja".to_string(),
            price: Money::from_cents(1200),
            sale_price: sale_price.map(Money::from_cents),
            is_on_sale,
            stock: 10,
            is_active: true,
        }
    }

    #[test]
    fn test_percentage_constructors() {
        assert_eq!(Percentage::from_whole(10).bps(), 1000);
        assert_eq!(Percentage::from_bps(1250).bps(), 1250);
        assert!((Percentage::from_bps(1250).as_percent() - 12.5).abs() < 0.001);
    }

    #[test]
    fn test_percentage_from_whole_saturates() {
        assert_eq!(Percentage::from_whole(50_000_000).bps(), u32::MAX);
        assert_eq!(Percentage::from_whole(u32::MAX).bps(), u32::MAX);
        assert!(crate::validation::validate_percentage(Percentage::from_whole(50_000_000)).is_err());
    }

    #[test]
    fn test_effective_price() {
        assert_eq!(product(false, None).effective_price().cents(), 1200);
        assert_eq!(product(false, Some(900)).effective_price().cents(), 1200);
        assert_eq!(product(true, Some(900)).effective_price().cents(), 900);
        assert_eq!(product(true, None).effective_price().cents(), 1200);
    }

    #[test]
    fn test_ticket_availability() {
        let mut ticket = TicketType {
            id: "t1".to_string(),
            event_id: "e1".to_string(),
            name: "Pista".to_string(),
            price: Money::from_cents(8000),
            quantity_available: 10,
            quantity_sold: 8,
            is_active: true,
        };
        assert_eq!(ticket.available(), 2);

        ticket.quantity_sold = 12;
        assert_eq!(ticket.available(), 0);
    }

    #[test]
    fn test_coupon_rule_parts() {
        let rule = CouponRule::from_parts(CouponDiscountType::Percentage, 1000);
        assert_eq!(rule, CouponRule::Percentage(Percentage::from_whole(10)));
        assert_eq!(rule.raw_value(), 1000);
        assert_eq!(rule.discount_type(), CouponDiscountType::Percentage);

        let rule = CouponRule::from_parts(CouponDiscountType::Fixed, 500);
        assert_eq!(rule, CouponRule::Fixed(Money::from_cents(500)));
        assert_eq!(rule.raw_value(), 500);
    }

    #[test]
    fn test_payment_method_serde() {
        let json = serde_json::to_string(&PaymentMethod::Pix).unwrap();
        assert_eq!(json, "\"pix\"");
        assert_eq!(PaymentMethod::Cash.as_str(), "cash");
    }
}
