//! # Register
//!
//! Session lifecycle and the checkout commit, on top of the repositories.
//!
//! ## Session State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   NO_SESSION ──open_session()──► OPEN ──close_session()──► CLOSED       │
//! │       ▲                           │                          │          │
//! │       │                      commit_sale() × N               │          │
//! │       └──────────────────────────────────────────────────────┘          │
//! │                    (next session starts from NO_SESSION)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Commit Unit
//! ```text
//! BEGIN IMMEDIATE  (write lock up front; other terminals wait their turn)
//!   1. INSERT transaction (guarded on the session still being open)
//!   2. INSERT transaction_lines
//!   3. UPDATE products     stock = MAX(stock - qty, 0)          per product line
//!   4. UPDATE ticket_types sold += qty  WHERE sold + qty <= available
//!   5. UPDATE coupons      uses += 1    WHERE uses < max_uses
//! COMMIT            (any guard miss or storage error: ROLLBACK, nothing written)
//! ```

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult, EngineError, EngineResult};
use crate::pool::Database;
use crate::repository::catalog::CatalogRepository;
use crate::repository::coupon::CouponRepository;
use crate::repository::session::{SessionRepository, OPEN_SESSION_INDEX_COLUMN};
use crate::repository::transaction::TransactionRepository;
use till_core::session::{close_session, open_session};
use till_core::validation::{validate_coupon_code, validate_non_negative};
use till_core::{
    evaluate_coupon, reconcile, AppliedCoupon, CheckoutDraft, CoreError, CouponRejection, LineKind,
    MethodTotals, Money, RegisterSession, SessionClosure, SessionStatus, Transaction,
};

/// Why a commit unit was rolled back without a storage error.
#[derive(Debug)]
enum CommitConflict {
    SessionNotOpen,
    TicketSoldOut { ticket_type_id: String, requested: i64 },
    CouponExhausted(String),
}

/// The register service: opens and closes sessions and commits sales.
///
/// Cheap to clone; all state lives in the database.
#[derive(Debug, Clone)]
pub struct Register {
    db: Database,
}

impl Register {
    pub fn new(db: Database) -> Self {
        Register { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Opens a session with the counted starting fund.
    ///
    /// ## Errors
    /// - `SessionAlreadyOpen` when another session is open (also when another
    ///   terminal wins the race between the check and the insert)
    /// - `Validation` for an empty operator id or a negative fund
    pub async fn open_session(
        &self,
        operator_id: &str,
        initial_fund: Money,
    ) -> EngineResult<RegisterSession> {
        let current = self.db.sessions().find_open().await?;
        let session = open_session(
            current.as_ref(),
            Uuid::new_v4().to_string(),
            operator_id,
            initial_fund,
            Utc::now(),
        )
        .map_err(|e| {
            warn!(operator_id = %operator_id, error = %e, "Session open rejected");
            e
        })?;

        if let Err(e) = self.db.sessions().insert(&session).await {
            if e.is_unique_violation_on(OPEN_SESSION_INDEX_COLUMN) {
                warn!(operator_id = %operator_id, "Session opened concurrently by another terminal");
                return Err(CoreError::SessionAlreadyOpen.into());
            }
            return Err(e.into());
        }

        info!(
            session_id = %session.id,
            operator_id = %session.operator_id,
            initial_fund = %session.initial_fund,
            "Register session opened"
        );

        Ok(session)
    }

    /// The open session, if any.
    pub async fn current_session(&self) -> EngineResult<Option<RegisterSession>> {
        Ok(self.db.sessions().find_open().await?)
    }

    /// Closes the open session against the counted drawer.
    ///
    /// A mismatch is reported in the returned reconciliation; the close
    /// still succeeds.
    ///
    /// ## Errors
    /// - `NoOpenSession`
    /// - `Validation` for a negative count
    pub async fn close_session(&self, actual_balance: Money) -> EngineResult<SessionClosure> {
        validate_non_negative(actual_balance, "actual balance")?;

        let mut tx = self.db.begin_write().await?;

        let session = SessionRepository::find_open_in(&mut *tx)
            .await?
            .ok_or(CoreError::NoOpenSession)?;
        let totals = SessionRepository::method_totals(&mut *tx, &session.id).await?;
        let reconciliation = reconcile(session.initial_fund, [totals.cash], actual_balance);
        let closed = close_session(&session, &reconciliation, Utc::now())?;

        if !SessionRepository::close(&mut *tx, &closed).await? {
            tx.rollback().await?;
            return Err(CoreError::NoOpenSession.into());
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            session_id = %closed.id,
            expected = %reconciliation.expected,
            actual = %reconciliation.actual,
            difference = %reconciliation.difference,
            outcome = ?reconciliation.outcome,
            transactions = totals.transaction_count,
            "Register session closed"
        );

        Ok(SessionClosure {
            session: closed,
            reconciliation,
            totals,
        })
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Looks up and evaluates a coupon code against the local calendar date.
    ///
    /// Never changes `current_uses`; only a committed sale does.
    pub async fn check_coupon(
        &self,
        raw_code: &str,
        subtotal: Money,
    ) -> EngineResult<Result<AppliedCoupon, CouponRejection>> {
        self.check_coupon_at(raw_code, subtotal, Local::now().naive_local())
            .await
    }

    /// [`Register::check_coupon`] with an explicit local time.
    pub async fn check_coupon_at(
        &self,
        raw_code: &str,
        subtotal: Money,
        now: NaiveDateTime,
    ) -> EngineResult<Result<AppliedCoupon, CouponRejection>> {
        let code = validate_coupon_code(raw_code)?;
        let coupon = self.db.coupons().find_by_code(&code).await?;
        let outcome = evaluate_coupon(coupon.as_ref(), subtotal, now);

        match &outcome {
            Ok(applied) => debug!(
                code = %code,
                discount = %applied.preview_discount,
                "Coupon accepted"
            ),
            Err(reason) => debug!(code = %code, reason = %reason, "Coupon rejected"),
        }

        Ok(outcome)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Commits a prepared sale and its side effects as one unit.
    ///
    /// ## Errors
    /// - `NoOpenSession` when no session is open (or it closed mid-commit)
    /// - `TicketCapacityExceeded` when another terminal sold the last tickets
    /// - `CouponUsesExhausted` when another sale used up the coupon
    /// - `Db` for storage failures
    ///
    /// On any error nothing is written.
    pub async fn commit_sale(&self, draft: CheckoutDraft) -> EngineResult<Transaction> {
        let mut tx = self.db.begin_write().await?;

        let session = match SessionRepository::find_open_in(&mut *tx).await? {
            Some(session) => session,
            None => {
                tx.rollback().await?;
                warn!("Sale rejected: no open session");
                return Err(CoreError::NoOpenSession.into());
            }
        };

        let txn = draft.into_transaction(
            Uuid::new_v4().to_string(),
            session.id,
            Utc::now(),
            || Uuid::new_v4().to_string(),
        );

        let outcome = match Self::apply_sale(&mut *tx, &txn).await {
            Ok(Ok(())) => tx
                .commit()
                .await
                .map_err(|e| EngineError::from(DbError::transaction(e))),
            Ok(Err(conflict)) => {
                tx.rollback().await?;
                return Err(self.conflict_error(conflict).await);
            }
            Err(e) => Err(e.into()),
        };

        if let Err(e) = outcome {
            error!(
                transaction_id = %txn.id,
                session_id = %txn.session_id,
                total = %txn.total,
                error = %e,
                "Sale commit failed, rolled back"
            );
            return Err(e);
        }

        info!(
            transaction_id = %txn.id,
            session_id = %txn.session_id,
            total = %txn.total,
            method = txn.payment_method.as_str(),
            lines = txn.lines.len(),
            "Sale committed"
        );

        Ok(txn)
    }

    /// Steps 1-5 of the commit unit. A guard miss is returned as a conflict
    /// so the caller rolls back.
    async fn apply_sale(
        conn: &mut SqliteConnection,
        txn: &Transaction,
    ) -> DbResult<Result<(), CommitConflict>> {
        if !TransactionRepository::insert_guarded(conn, txn).await? {
            return Ok(Err(CommitConflict::SessionNotOpen));
        }

        for line in &txn.lines {
            match line.kind {
                LineKind::Product => {
                    CatalogRepository::decrement_stock(conn, &line.item_id, line.quantity).await?;
                }
                LineKind::Ticket => {
                    if !CatalogRepository::increment_sold(conn, &line.item_id, line.quantity)
                        .await?
                    {
                        return Ok(Err(CommitConflict::TicketSoldOut {
                            ticket_type_id: line.item_id.clone(),
                            requested: line.quantity,
                        }));
                    }
                }
            }
        }

        if let Some(coupon_id) = &txn.coupon_id {
            if !CouponRepository::increment_uses(conn, coupon_id).await? {
                return Ok(Err(CommitConflict::CouponExhausted(coupon_id.clone())));
            }
        }

        Ok(Ok(()))
    }

    /// Builds the error for a rolled-back conflict. Runs after the rollback
    /// so it may read through the pool.
    async fn conflict_error(&self, conflict: CommitConflict) -> EngineError {
        match conflict {
            CommitConflict::SessionNotOpen => {
                warn!("Sale rejected: session closed during commit");
                CoreError::NoOpenSession.into()
            }
            CommitConflict::TicketSoldOut {
                ticket_type_id,
                requested,
            } => {
                let available = match self.db.catalog().get_ticket_type(&ticket_type_id).await {
                    Ok(Some(t)) => t.available(),
                    Ok(None) => 0,
                    Err(e) => return e.into(),
                };
                warn!(
                    ticket_type_id = %ticket_type_id,
                    available,
                    requested,
                    "Sale rejected: tickets sold out"
                );
                CoreError::TicketCapacityExceeded {
                    ticket_type_id,
                    available,
                    requested,
                }
                .into()
            }
            CommitConflict::CouponExhausted(coupon_id) => {
                warn!(coupon_id = %coupon_id, "Sale rejected: coupon has no uses left");
                CoreError::CouponUsesExhausted(coupon_id).into()
            }
        }
    }

    // =========================================================================
    // History
    // =========================================================================

    pub async fn session(&self, id: &str) -> EngineResult<Option<RegisterSession>> {
        Ok(self.db.sessions().get_by_id(id).await?)
    }

    pub async fn sessions_by_status(&self, status: SessionStatus) -> EngineResult<Vec<RegisterSession>> {
        Ok(self.db.sessions().list_by_status(status).await?)
    }

    pub async fn sessions_opened_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<RegisterSession>> {
        Ok(self.db.sessions().list_opened_between(from, to).await?)
    }

    pub async fn transaction(&self, id: &str) -> EngineResult<Option<Transaction>> {
        Ok(self.db.transactions().get_by_id(id).await?)
    }

    pub async fn session_transactions(&self, session_id: &str) -> EngineResult<Vec<Transaction>> {
        Ok(self.db.transactions().list_by_session(session_id).await?)
    }

    pub async fn transactions_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<Transaction>> {
        Ok(self.db.transactions().list_created_between(from, to).await?)
    }

    /// Running per-method totals of a session.
    pub async fn session_totals(&self, session_id: &str) -> EngineResult<MethodTotals> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(SessionRepository::method_totals(&mut conn, session_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
