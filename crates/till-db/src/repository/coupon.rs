//! # Coupon Repository
//!
//! Lookup by code and the guarded usage increment.
//!
//! Codes are matched case-insensitively (`COLLATE NOCASE` on the column).
//! `current_uses` is only ever incremented, and only by a committed sale.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use till_core::{Coupon, CouponDiscountType, CouponRule, Money};

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: String,
    code: String,
    discount_type: CouponDiscountType,
    discount_value: i64,
    minimum_order_cents: Option<i64>,
    max_uses: Option<i64>,
    current_uses: i64,
    valid_from: Option<chrono::NaiveDate>,
    valid_until: Option<chrono::NaiveDate>,
    is_active: bool,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Coupon {
            id: row.id,
            code: row.code,
            rule: CouponRule::from_parts(row.discount_type, row.discount_value),
            minimum_order: row.minimum_order_cents.map(Money::from_cents),
            max_uses: row.max_uses,
            current_uses: row.current_uses,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            is_active: row.is_active,
        }
    }
}

const COUPON_COLUMNS: &str = "id, code, discount_type, discount_value, minimum_order_cents, \
     max_uses, current_uses, valid_from, valid_until, is_active";

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Finds a coupon by code, ignoring case.
    ///
    /// Inactive coupons are returned too; evaluation reports them as not found.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        debug!(code = %code, "Looking up coupon");

        let row: Option<CouponRow> = sqlx::query_as(&format!(
            "SELECT {} FROM coupons WHERE code = ?1",
            COUPON_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Coupon::from))
    }

    /// Gets a coupon by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let row: Option<CouponRow> = sqlx::query_as(&format!(
            "SELECT {} FROM coupons WHERE id = ?1",
            COUPON_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Coupon::from))
    }

    /// Inserts a coupon (seeding and tests). The code is stored uppercase.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(id = %coupon.id, code = %coupon.code, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, discount_type, discount_value, minimum_order_cents,
                max_uses, current_uses, valid_from, valid_until, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&coupon.id)
        .bind(coupon.code.to_uppercase())
        .bind(coupon.rule.discount_type())
        .bind(coupon.rule.raw_value())
        .bind(coupon.minimum_order.map(|m| m.cents()))
        .bind(coupon.max_uses)
        .bind(coupon.current_uses)
        .bind(coupon.valid_from)
        .bind(coupon.valid_until)
        .bind(coupon.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Adds one use unless the cap is already reached.
    ///
    /// ## Returns
    /// * `Ok(true)` - Use recorded
    /// * `Ok(false)` - `current_uses` already at `max_uses`; nothing changed
    pub async fn increment_uses(conn: &mut SqliteConnection, coupon_id: &str) -> DbResult<bool> {
        debug!(coupon_id = %coupon_id, "Incrementing coupon uses");

        let result = sqlx::query(
            r#"
            UPDATE coupons SET
                current_uses = current_uses + 1
            WHERE id = ?1
              AND (max_uses IS NULL OR current_uses < max_uses)
            "#,
        )
        .bind(coupon_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
