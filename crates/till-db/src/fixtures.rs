//! Shared test data for the register and terminal tests.

use std::path::Path;

use chrono::{NaiveDate, NaiveTime};

use crate::pool::{Database, DbConfig};
use till_core::{Coupon, CouponRule, Event, Money, Percentage, Product, TicketType};

pub const BEER: &str = "p-beer";
pub const WATER: &str = "p-water";
pub const EVENT: &str = "e-show";
pub const VIP: &str = "t-vip";
pub const PROMO: &str = "PROMO10";
pub const PROMO_ID: &str = "c-promo";

pub async fn database() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A WAL database file with a multi-connection pool, seeded like [`seeded`].
pub async fn seeded_file(dir: &Path, connections: u32) -> Database {
    let db = Database::new(DbConfig::new(dir.join("till.db")).max_connections(connections))
        .await
        .unwrap();
    seed(&db).await;
    db
}

pub fn product(id: &str, name: &str, price_cents: i64, stock: i64) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        price: Money::from_cents(price_cents),
        sale_price: None,
        is_on_sale: false,
        stock,
        is_active: true,
    }
}

/// Beer 15.00 (stock 10), water 5.00 (stock 1), a VIP ticket at 50.00 with
/// 2 of 10 left, and PROMO10 (10%, single use).
pub async fn seeded() -> Database {
    let db = database().await;
    seed(&db).await;
    db
}

pub async fn seed(db: &Database) {
    let catalog = db.catalog();

    catalog.insert_product(&product(BEER, "Cerveja", 1500, 10)).await.unwrap();
    catalog.insert_product(&product(WATER, "Agua", 500, 1)).await.unwrap();

    catalog
        .insert_event(&Event {
            id: EVENT.to_string(),
            name: "Show".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            time: NaiveTime::from_hms_opt(21, 0, 0),
        })
        .await
        .unwrap();
    catalog
        .insert_ticket_type(&TicketType {
            id: VIP.to_string(),
            event_id: EVENT.to_string(),
            name: "VIP".to_string(),
            price: Money::from_cents(5000),
            quantity_available: 10,
            quantity_sold: 8,
            is_active: true,
        })
        .await
        .unwrap();

    db.coupons()
        .insert(&Coupon {
            id: PROMO_ID.to_string(),
            code: PROMO.to_string(),
            rule: CouponRule::Percentage(Percentage::from_whole(10)),
            minimum_order: None,
            max_uses: Some(1),
            current_uses: 0,
            valid_from: None,
            valid_until: None,
            is_active: true,
        })
        .await
        .unwrap();
}

pub async fn stock_of(db: &Database, id: &str) -> i64 {
    db.catalog().get_product(id).await.unwrap().unwrap().stock
}

pub async fn sold_of(db: &Database, id: &str) -> i64 {
    db.catalog().get_ticket_type(id).await.unwrap().unwrap().quantity_sold
}

pub async fn uses_of(db: &Database, id: &str) -> i64 {
    db.coupons().get_by_id(id).await.unwrap().unwrap().current_uses
}
