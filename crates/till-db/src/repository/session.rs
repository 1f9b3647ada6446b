//! # Register Session Repository
//!
//! Storage for register sessions.
//!
//! ## One Open Session
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CREATE UNIQUE INDEX idx_register_sessions_one_open                     │
//! │      ON register_sessions(status) WHERE status = 'open';                │
//! │                                                                         │
//! │  Terminal A: INSERT (status='open') ──► OK                              │
//! │  Terminal B: INSERT (status='open') ──► UNIQUE constraint failed        │
//! │                                         register_sessions.status        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A session row changes exactly once: the guarded close update.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use till_core::{MethodTotals, Money, PaymentMethod, RegisterSession, SessionStatus};

/// `table.column` reported by SQLite when a second session is opened.
pub const OPEN_SESSION_INDEX_COLUMN: &str = "register_sessions.status";

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    operator_id: String,
    initial_fund_cents: i64,
    status: SessionStatus,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    expected_balance_cents: Option<i64>,
    actual_balance_cents: Option<i64>,
    difference_cents: Option<i64>,
}

impl From<SessionRow> for RegisterSession {
    fn from(row: SessionRow) -> Self {
        RegisterSession {
            id: row.id,
            operator_id: row.operator_id,
            initial_fund: Money::from_cents(row.initial_fund_cents),
            status: row.status,
            opened_at: row.opened_at,
            closed_at: row.closed_at,
            expected_balance: row.expected_balance_cents.map(Money::from_cents),
            actual_balance: row.actual_balance_cents.map(Money::from_cents),
            difference: row.difference_cents.map(Money::from_cents),
        }
    }
}

const SESSION_COLUMNS: &str = "id, operator_id, initial_fund_cents, status, opened_at, closed_at, \
     expected_balance_cents, actual_balance_cents, difference_cents";

/// Repository for register session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Inserts a newly opened session.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` on `register_sessions.status` when another
    /// session is already open.
    pub async fn insert(&self, session: &RegisterSession) -> DbResult<()> {
        debug!(id = %session.id, operator_id = %session.operator_id, "Inserting session");

        sqlx::query(
            r#"
            INSERT INTO register_sessions (
                id, operator_id, initial_fund_cents, status, opened_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&session.id)
        .bind(&session.operator_id)
        .bind(session.initial_fund.cents())
        .bind(session.status)
        .bind(session.opened_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a session by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RegisterSession>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM register_sessions WHERE id = ?1",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RegisterSession::from))
    }

    /// Returns the open session, if any.
    pub async fn find_open(&self) -> DbResult<Option<RegisterSession>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_open_in(&mut conn).await
    }

    /// Returns the open session, read on the caller's connection.
    pub async fn find_open_in(conn: &mut SqliteConnection) -> DbResult<Option<RegisterSession>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM register_sessions WHERE status = 'open'",
            SESSION_COLUMNS
        ))
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(RegisterSession::from))
    }

    /// Lists sessions with the given status, newest first.
    pub async fn list_by_status(&self, status: SessionStatus) -> DbResult<Vec<RegisterSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM register_sessions WHERE status = ?1 ORDER BY opened_at DESC",
            SESSION_COLUMNS
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RegisterSession::from).collect())
    }

    /// Lists sessions opened in `[from, to)`, oldest first.
    pub async fn list_opened_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<RegisterSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM register_sessions \
             WHERE opened_at >= ?1 AND opened_at < ?2 ORDER BY opened_at",
            SESSION_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RegisterSession::from).collect())
    }

    /// Writes the close fields of a session that is still open.
    ///
    /// ## Returns
    /// * `Ok(true)` - Session closed
    /// * `Ok(false)` - Session was not open (closed concurrently); nothing changed
    pub async fn close(conn: &mut SqliteConnection, closed: &RegisterSession) -> DbResult<bool> {
        debug!(id = %closed.id, "Closing session");

        let result = sqlx::query(
            r#"
            UPDATE register_sessions SET
                status = ?2,
                closed_at = ?3,
                expected_balance_cents = ?4,
                actual_balance_cents = ?5,
                difference_cents = ?6
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(&closed.id)
        .bind(closed.status)
        .bind(closed.closed_at)
        .bind(closed.expected_balance.map(|m| m.cents()))
        .bind(closed.actual_balance.map(|m| m.cents()))
        .bind(closed.difference.map(|m| m.cents()))
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Totals of a session's sales per payment method.
    pub async fn method_totals(conn: &mut SqliteConnection, session_id: &str) -> DbResult<MethodTotals> {
        let rows: Vec<(PaymentMethod, i64, i64)> = sqlx::query_as(
            r#"
            SELECT payment_method, COALESCE(SUM(total_cents), 0), COUNT(*)
            FROM transactions
            WHERE session_id = ?1
            GROUP BY payment_method
            "#,
        )
        .bind(session_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut totals = MethodTotals::default();
        for (method, total_cents, count) in rows {
            let total = Money::from_cents(total_cents);
            match method {
                PaymentMethod::Cash => totals.cash = total,
                PaymentMethod::Card => totals.card = total,
                PaymentMethod::Pix => totals.pix = total,
            }
            totals.transaction_count += count;
        }

        Ok(totals)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    fn open_session(id: &str, opened_at: DateTime<Utc>) -> RegisterSession {
        RegisterSession {
            id: id.to_string(),
            operator_id: "op-1".to_string(),
            initial_fund: Money::from_cents(20000),
            status: SessionStatus::Open,
            opened_at,
            closed_at: None,
            expected_balance: None,
            actual_balance: None,
            difference: None,
        }
    }

    fn closed(session: &RegisterSession) -> RegisterSession {
        RegisterSession {
            status: SessionStatus::Closed,
            closed_at: Some(Utc::now()),
            expected_balance: Some(Money::from_cents(20000)),
            actual_balance: Some(Money::from_cents(19900)),
            difference: Some(Money::from_cents(-100)),
            ..session.clone()
        }
    }

    #[tokio::test]
    async fn test_second_open_session_violates_index() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sessions = db.sessions();

        sessions.insert(&open_session("s1", Utc::now())).await.unwrap();
        let err = sessions
            .insert(&open_session("s2", Utc::now()))
            .await
            .unwrap_err();

        assert!(err.is_unique_violation_on(OPEN_SESSION_INDEX_COLUMN));
    }

    #[tokio::test]
    async fn test_close_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = open_session("s1", Utc::now());
        db.sessions().insert(&session).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(SessionRepository::close(&mut conn, &closed(&session)).await.unwrap());
        assert!(!SessionRepository::close(&mut conn, &closed(&session)).await.unwrap());
        drop(conn);

        let loaded = db.sessions().get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Closed);
        assert_eq!(loaded.difference, Some(Money::from_cents(-100)));
        assert!(db.sessions().find_open().await.unwrap().is_none());

        // A new session may open once the previous one is closed
        db.sessions().insert(&open_session("s2", Utc::now())).await.unwrap();
        assert_eq!(db.sessions().find_open().await.unwrap().unwrap().id, "s2");
    }

    #[tokio::test]
    async fn test_queries_by_status_and_time() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let base = Utc::now() - Duration::days(2);

        let s1 = open_session("s1", base);
        db.sessions().insert(&s1).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        SessionRepository::close(&mut conn, &closed(&s1)).await.unwrap();
        drop(conn);

        db.sessions()
            .insert(&open_session("s2", base + Duration::days(1)))
            .await
            .unwrap();

        let closed_list = db.sessions().list_by_status(SessionStatus::Closed).await.unwrap();
        assert_eq!(closed_list.len(), 1);
        assert_eq!(closed_list[0].id, "s1");

        let window = db
            .sessions()
            .list_opened_between(base + Duration::hours(12), base + Duration::days(3))
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, "s2");
    }

    #[tokio::test]
    async fn test_method_totals_empty_session() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let totals = SessionRepository::method_totals(&mut conn, "none").await.unwrap();
        assert_eq!(totals, MethodTotals::default());
    }
}
