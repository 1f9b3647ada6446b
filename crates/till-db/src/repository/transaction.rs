//! # Transaction Repository
//!
//! Persistence for committed sales and their line snapshots.
//!
//! ## Guarded Insert
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT INTO transactions (...)                                         │
//! │  SELECT ... FROM register_sessions                                      │
//! │  WHERE id = :session_id AND status = 'open'                             │
//! │                                                                         │
//! │  session open    ──► 1 row  ──► insert lines                            │
//! │  session closed  ──► 0 rows ──► caller rolls back (no open session)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never updated or deleted once written.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use till_core::{
    DiscountKind, LineKind, Money, PaymentMethod, RecordedDiscount, Transaction, TransactionLine,
};

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    session_id: String,
    subtotal_cents: i64,
    discount_type: Option<DiscountKind>,
    discount_value: Option<i64>,
    discount_cents: Option<i64>,
    coupon_id: Option<String>,
    total_cents: i64,
    payment_method: PaymentMethod,
    amount_paid_cents: Option<i64>,
    change_cents: i64,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self, lines: Vec<TransactionLine>) -> Transaction {
        let discount = match (self.discount_type, self.discount_value, self.discount_cents) {
            (Some(kind), Some(value), Some(cents)) => Some(RecordedDiscount {
                kind,
                value,
                amount: Money::from_cents(cents),
            }),
            _ => None,
        };

        Transaction {
            id: self.id,
            session_id: self.session_id,
            lines,
            subtotal: Money::from_cents(self.subtotal_cents),
            discount,
            coupon_id: self.coupon_id,
            total: Money::from_cents(self.total_cents),
            payment_method: self.payment_method,
            amount_paid: self.amount_paid_cents.map(Money::from_cents),
            change: Money::from_cents(self.change_cents),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: String,
    transaction_id: String,
    position: i64,
    kind: LineKind,
    item_id: String,
    name_snapshot: String,
    unit_price_cents: i64,
    quantity: i64,
    line_total_cents: i64,
}

impl From<LineRow> for TransactionLine {
    fn from(row: LineRow) -> Self {
        TransactionLine {
            id: row.id,
            transaction_id: row.transaction_id,
            position: row.position,
            kind: row.kind,
            item_id: row.item_id,
            name_snapshot: row.name_snapshot,
            unit_price: Money::from_cents(row.unit_price_cents),
            quantity: row.quantity,
            line_total: Money::from_cents(row.line_total_cents),
        }
    }
}

const TRANSACTION_COLUMNS: &str = "id, session_id, subtotal_cents, discount_type, discount_value, \
     discount_cents, coupon_id, total_cents, payment_method, amount_paid_cents, change_cents, \
     created_at";

const LINE_COLUMNS: &str = "id, transaction_id, position, kind, item_id, name_snapshot, \
     unit_price_cents, quantity, line_total_cents";

/// Repository for committed sales.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Writes a transaction and its lines, provided its session is still open.
    ///
    /// Runs on the caller's connection (the commit transaction).
    ///
    /// ## Returns
    /// * `Ok(true)` - Header and lines written
    /// * `Ok(false)` - Session missing or closed; nothing written
    pub async fn insert_guarded(conn: &mut SqliteConnection, txn: &Transaction) -> DbResult<bool> {
        debug!(
            id = %txn.id,
            session_id = %txn.session_id,
            total = txn.total.cents(),
            lines = txn.lines.len(),
            "Inserting transaction"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO transactions (
                id, session_id, subtotal_cents, discount_type, discount_value,
                discount_cents, coupon_id, total_cents, payment_method,
                amount_paid_cents, change_cents, created_at
            )
            SELECT ?1, id, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12
            FROM register_sessions
            WHERE id = ?2 AND status = 'open'
            "#,
        )
        .bind(&txn.id)
        .bind(&txn.session_id)
        .bind(txn.subtotal.cents())
        .bind(txn.discount.as_ref().map(|d| d.kind))
        .bind(txn.discount.as_ref().map(|d| d.value))
        .bind(txn.discount.as_ref().map(|d| d.amount.cents()))
        .bind(&txn.coupon_id)
        .bind(txn.total.cents())
        .bind(txn.payment_method)
        .bind(txn.amount_paid.map(|m| m.cents()))
        .bind(txn.change.cents())
        .bind(txn.created_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        for line in &txn.lines {
            sqlx::query(
                r#"
                INSERT INTO transaction_lines (
                    id, transaction_id, position, kind, item_id, name_snapshot,
                    unit_price_cents, quantity, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&line.id)
            .bind(&line.transaction_id)
            .bind(line.position)
            .bind(line.kind)
            .bind(&line.item_id)
            .bind(&line.name_snapshot)
            .bind(line.unit_price.cents())
            .bind(line.quantity)
            .bind(line.line_total.cents())
            .execute(&mut *conn)
            .await?;
        }

        Ok(true)
    }

    /// Gets a transaction with its lines in cart order.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE id = ?1",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.get_lines(&row.id).await?;
                Ok(Some(row.into_transaction(lines)))
            }
            None => Ok(None),
        }
    }

    /// Lines of a transaction ordered by position.
    pub async fn get_lines(&self, transaction_id: &str) -> DbResult<Vec<TransactionLine>> {
        let rows: Vec<LineRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transaction_lines WHERE transaction_id = ?1 ORDER BY position",
            LINE_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TransactionLine::from).collect())
    }

    /// Transactions of a session, oldest first, with lines.
    pub async fn list_by_session(&self, session_id: &str) -> DbResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE session_id = ?1 ORDER BY created_at, id",
            TRANSACTION_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_lines(rows).await
    }

    /// Transactions created in `[from, to)`, oldest first, with lines.
    pub async fn list_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions \
             WHERE created_at >= ?1 AND created_at < ?2 ORDER BY created_at, id",
            TRANSACTION_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        self.attach_lines(rows).await
    }

    async fn attach_lines(&self, rows: Vec<TransactionRow>) -> DbResult<Vec<Transaction>> {
        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.get_lines(&row.id).await?;
            transactions.push(row.into_transaction(lines));
        }
        Ok(transactions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
