//! # Register Session Rules
//!
//! State transitions of the cash drawer and close-of-day reconciliation.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   NO_SESSION ──open_session(operator, fund ≥ 0)──► OPEN                 │
//! │       ▲                                              │                  │
//! │       │                                  sales (any number)             │
//! │       │                                              │                  │
//! │       │                                              ▼                  │
//! │       └────────── next session ◄──── CLOSED ◄──close_session(counted)   │
//! │                                                                         │
//! │   open while OPEN    ──► SessionAlreadyOpen                             │
//! │   close while closed ──► NoOpenSession                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reconciliation
//! ```text
//! cash_total = Σ total of this session's cash transactions
//! expected   = initial_fund + cash_total
//! difference = actual − expected        (0 exact, > 0 overage, < 0 shortage)
//! ```
//! A non-zero difference is reported, never refused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentMethod, RegisterSession, SessionStatus, Transaction};
use crate::validation::{validate_non_negative, validate_operator_id};

// =============================================================================
// Transitions
// =============================================================================

/// Builds a freshly opened session.
///
/// Fails with `SessionAlreadyOpen` when `current` is an open session.
/// Storage enforces the same rule with a partial unique index, which is
/// what actually wins a race between two terminals.
pub fn open_session(
    current: Option<&RegisterSession>,
    id: String,
    operator_id: &str,
    initial_fund: Money,
    opened_at: DateTime<Utc>,
) -> CoreResult<RegisterSession> {
    validate_operator_id(operator_id)?;
    validate_non_negative(initial_fund, "initial fund")?;

    if current.map_or(false, RegisterSession::is_open) {
        return Err(CoreError::SessionAlreadyOpen);
    }

    Ok(RegisterSession {
        id,
        operator_id: operator_id.trim().to_string(),
        initial_fund,
        status: SessionStatus::Open,
        opened_at,
        closed_at: None,
        expected_balance: None,
        actual_balance: None,
        difference: None,
    })
}

/// Applies a reconciliation to an open session, producing the closed record.
pub fn close_session(
    session: &RegisterSession,
    reconciliation: &Reconciliation,
    closed_at: DateTime<Utc>,
) -> CoreResult<RegisterSession> {
    if !session.is_open() {
        return Err(CoreError::NoOpenSession);
    }

    Ok(RegisterSession {
        status: SessionStatus::Closed,
        closed_at: Some(closed_at),
        expected_balance: Some(reconciliation.expected),
        actual_balance: Some(reconciliation.actual),
        difference: Some(reconciliation.difference),
        ..session.clone()
    })
}

// =============================================================================
// Reconciliation
// =============================================================================

/// How the counted drawer compares to the expected balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    Exact,
    Overage,
    Shortage,
}

/// Close-of-day cash count against the expected balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    pub initial_fund: Money,
    pub cash_total: Money,
    pub expected: Money,
    pub actual: Money,
    pub difference: Money,
    pub outcome: ReconciliationOutcome,
}

/// Reconciles counted cash against the fund plus cash sales.
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::session::{reconcile, ReconciliationOutcome};
///
/// let cash_sales = [Money::from_cents(3000), Money::from_cents(4500)];
/// let rec = reconcile(Money::from_cents(20000), cash_sales, Money::from_cents(28000));
///
/// assert_eq!(rec.expected.cents(), 27500);
/// assert_eq!(rec.difference.cents(), 500);
/// assert_eq!(rec.outcome, ReconciliationOutcome::Overage);
/// ```
pub fn reconcile(
    initial_fund: Money,
    cash_totals: impl IntoIterator<Item = Money>,
    actual: Money,
) -> Reconciliation {
    let cash_total: Money = cash_totals.into_iter().sum();
    let expected = initial_fund + cash_total;
    let difference = actual - expected;

    let outcome = if difference.is_zero() {
        ReconciliationOutcome::Exact
    } else if difference.is_positive() {
        ReconciliationOutcome::Overage
    } else {
        ReconciliationOutcome::Shortage
    };

    Reconciliation {
        initial_fund,
        cash_total,
        expected,
        actual,
        difference,
        outcome,
    }
}

// =============================================================================
// Close Report
// =============================================================================

/// Sales of a session broken down by payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodTotals {
    pub cash: Money,
    pub card: Money,
    pub pix: Money,
    pub transaction_count: i64,
}

impl MethodTotals {
    /// Adds one sale to the breakdown.
    pub fn record(&mut self, method: PaymentMethod, total: Money) {
        match method {
            PaymentMethod::Cash => self.cash += total,
            PaymentMethod::Card => self.card += total,
            PaymentMethod::Pix => self.pix += total,
        }
        self.transaction_count += 1;
    }

    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut totals = MethodTotals::default();
        for tx in transactions {
            totals.record(tx.payment_method, tx.total);
        }
        totals
    }

    /// Cash + card + PIX.
    pub fn gross(&self) -> Money {
        self.cash + self.card + self.pix
    }
}

/// What the operator sees after closing the drawer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionClosure {
    pub session: RegisterSession,
    pub reconciliation: Reconciliation,
    pub totals: MethodTotals,
}

// =============================================================================
// Unit Tests
// =============================================================================
