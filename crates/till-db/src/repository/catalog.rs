//! # Catalog Repository
//!
//! Read access to products, events and ticket types, plus the two counters
//! a sale is allowed to touch.
//!
//! ## What the Register May Change
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock            stock = MAX(stock − qty, 0)                  │
//! │  ticket_types.quantity_sold                                             │
//! │                            sold = sold + qty                            │
//! │                            WHERE sold + qty ≤ quantity_available        │
//! │                                                                         │
//! │  Everything else (names, prices, capacity) belongs to the back office.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both counter updates take a `&mut SqliteConnection` so they run inside
//! the commit transaction.

use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{Event, Money, Product, TicketType};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    price_cents: i64,
    sale_price_cents: Option<i64>,
    is_on_sale: bool,
    stock: i64,
    is_active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price: Money::from_cents(row.price_cents),
            sale_price: row.sale_price_cents.map(Money::from_cents),
            is_on_sale: row.is_on_sale,
            stock: row.stock,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: String,
    name: String,
    event_date: NaiveDate,
    event_time: Option<NaiveTime>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
            date: row.event_date,
            time: row.event_time,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TicketTypeRow {
    id: String,
    event_id: String,
    name: String,
    price_cents: i64,
    quantity_available: i64,
    quantity_sold: i64,
    is_active: bool,
}

impl From<TicketTypeRow> for TicketType {
    fn from(row: TicketTypeRow) -> Self {
        TicketType {
            id: row.id,
            event_id: row.event_id,
            name: row.name,
            price: Money::from_cents(row.price_cents),
            quantity_available: row.quantity_available,
            quantity_sold: row.quantity_sold,
            is_active: row.is_active,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, price_cents, sale_price_cents, is_on_sale, stock, is_active";

const TICKET_TYPE_COLUMNS: &str =
    "id, event_id, name, price_cents, quantity_available, quantity_sold, is_active";

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads and sale counters.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    /// Gets a product by ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        debug!(id = %id, "Getting product");

        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE id = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Lists active products ordered by name.
    pub async fn list_active_products(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE is_active = 1 ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Inserts a product (seeding and tests; the back office owns the catalog).
    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price_cents, sale_price_cents, is_on_sale,
                stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(product.sale_price.map(|m| m.cents()))
        .bind(product.is_on_sale)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Decrements stock, flooring at zero.
    ///
    /// Runs on the caller's connection (the commit transaction).
    pub async fn decrement_stock(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, quantity, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                stock = MAX(stock - ?2, 0),
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Events and Ticket Types
    // -------------------------------------------------------------------------

    /// Gets an event by ID.
    pub async fn get_event(&self, id: &str) -> DbResult<Option<Event>> {
        let row: Option<EventRow> = sqlx::query_as(
            "SELECT id, name, event_date, event_time FROM events WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Event::from))
    }

    /// Inserts an event (seeding and tests).
    pub async fn insert_event(&self, event: &Event) -> DbResult<()> {
        debug!(id = %event.id, name = %event.name, "Inserting event");

        sqlx::query(
            "INSERT INTO events (id, name, event_date, event_time) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(event.date)
        .bind(event.time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a ticket type by ID.
    pub async fn get_ticket_type(&self, id: &str) -> DbResult<Option<TicketType>> {
        debug!(id = %id, "Getting ticket type");

        let row: Option<TicketTypeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM ticket_types WHERE id = ?1",
            TICKET_TYPE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(TicketType::from))
    }

    /// Lists the ticket types of an event.
    pub async fn list_ticket_types(&self, event_id: &str) -> DbResult<Vec<TicketType>> {
        let rows: Vec<TicketTypeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM ticket_types WHERE event_id = ?1 ORDER BY price_cents DESC, name",
            TICKET_TYPE_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TicketType::from).collect())
    }

    /// Inserts a ticket type (seeding and tests).
    pub async fn insert_ticket_type(&self, ticket_type: &TicketType) -> DbResult<()> {
        debug!(id = %ticket_type.id, event_id = %ticket_type.event_id, "Inserting ticket type");

        sqlx::query(
            r#"
            INSERT INTO ticket_types (
                id, event_id, name, price_cents,
                quantity_available, quantity_sold, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&ticket_type.id)
        .bind(&ticket_type.event_id)
        .bind(&ticket_type.name)
        .bind(ticket_type.price.cents())
        .bind(ticket_type.quantity_available)
        .bind(ticket_type.quantity_sold)
        .bind(ticket_type.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Adds `quantity` to the sold count unless that would pass capacity.
    ///
    /// ## Returns
    /// * `Ok(true)` - Counter incremented
    /// * `Ok(false)` - Not enough capacity left (or unknown ticket type);
    ///   nothing changed
    pub async fn increment_sold(
        conn: &mut SqliteConnection,
        ticket_type_id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        debug!(ticket_type_id = %ticket_type_id, quantity, "Incrementing tickets sold");

        let result = sqlx::query(
            r#"
            UPDATE ticket_types SET
                quantity_sold = quantity_sold + ?2
            WHERE id = ?1
              AND quantity_sold + ?2 <= quantity_available
            "#,
        )
        .bind(ticket_type_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
