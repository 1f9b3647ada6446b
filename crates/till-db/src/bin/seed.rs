//! # Seed Data Generator
//!
//! Populates a development database with a bar menu, a couple of events
//! with ticket tiers, and a few coupons.
//!
//! ## Usage
//! ```bash
//! # Seed ./till.db (or whatever till.toml / TILL_DB_PATH say)
//! cargo run -p till-db --bin seed
//!
//! # Explicit config file and database path
//! cargo run -p till-db --bin seed -- --config ./till.toml --db ./data/till.db
//! ```
//!
//! ## Generated Data
//! - Products: drinks and snacks, one size variant each, some on sale
//! - Events: two shows 7 and 14 days out, each with Pista / VIP tiers
//! - Coupons: `BEMVINDO10` (10%), `DESCONTO5` (R$5.00 off R$30.00+),
//!   `ESGOTADO` (already at its cap), `VENCIDO` (expired yesterday)

use std::env;
use std::path::PathBuf;

use chrono::{Duration, Local, NaiveTime};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use till_core::{Coupon, CouponRule, Event, Money, Percentage, Product, TicketType};
use till_db::migrations::migration_status;
use till_db::{Database, RegisterConfig};

/// (name, price in cents, stock, sale price in cents)
const PRODUCTS: &[(&str, i64, i64, Option<i64>)] = &[
    ("Cerveja Long Neck", 1200, 240, None),
    ("Cerveja Lata", 800, 480, Some(700)),
    ("Chopp 500ml", 1500, 200, None),
    ("Caipirinha", 2200, 120, None),
    ("Gin Tonica", 2800, 90, Some(2500)),
    ("Refrigerante Lata", 600, 300, None),
    ("Agua Mineral", 400, 500, None),
    ("Agua com Gas", 500, 200, None),
    ("Energetico", 1400, 150, None),
    ("Suco Natural", 900, 80, None),
    ("Porcao de Batata", 3200, 60, None),
    ("Pastel", 1000, 100, Some(800)),
    ("Amendoim", 500, 150, None),
    ("Pipoca", 700, 120, None),
];

/// (name, days from today, start time, [(tier, price in cents, capacity)])
const EVENTS: &[(&str, i64, (u32, u32), &[(&str, i64, i64)])] = &[
    ("Samba de Sexta", 7, (21, 0), &[("Pista", 4000, 300), ("VIP", 9000, 40)]),
    ("Noite do Rock", 14, (22, 30), &[("Pista", 5000, 250), ("VIP", 12000, 30)]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = Some(PathBuf::from("till.toml"));
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: ./till.toml)");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = RegisterConfig::load(config_path.as_deref())?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    info!(
        database = %config.database.path.display(),
        store = %config.register.store_name,
        "Seeding register database"
    );

    let db = Database::new(config.db_config()).await?;
    if !db.health_check().await {
        return Err("database health check failed".into());
    }
    info!("Database connection healthy");

    let (total, applied) = migration_status(db.pool()).await?;
    info!(total, applied, "Schema ready");

    let existing = db.catalog().list_active_products().await?;
    if !existing.is_empty() {
        warn!(
            products = existing.len(),
            "Database already has products, skipping seed (delete the file to regenerate)"
        );
        return Ok(());
    }

    let start = std::time::Instant::now();

    for (name, price, stock, sale_price) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            price: Money::from_cents(*price),
            sale_price: sale_price.map(Money::from_cents),
            is_on_sale: sale_price.is_some(),
            stock: *stock,
            is_active: true,
        };
        db.catalog().insert_product(&product).await?;
    }
    info!(count = PRODUCTS.len(), "Products created");

    let today = Local::now().date_naive();
    let mut tiers = 0;

    for (name, days_out, (hour, minute), ticket_tiers) in EVENTS {
        let event = Event {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            date: today + Duration::days(*days_out),
            time: NaiveTime::from_hms_opt(*hour, *minute, 0),
        };
        db.catalog().insert_event(&event).await?;

        for (tier, price, capacity) in *ticket_tiers {
            db.catalog()
                .insert_ticket_type(&TicketType {
                    id: Uuid::new_v4().to_string(),
                    event_id: event.id.clone(),
                    name: tier.to_string(),
                    price: Money::from_cents(*price),
                    quantity_available: *capacity,
                    quantity_sold: 0,
                    is_active: true,
                })
                .await?;
            tiers += 1;
        }
    }
    info!(events = EVENTS.len(), ticket_types = tiers, "Events created");

    let coupons = [
        coupon("BEMVINDO10", CouponRule::Percentage(Percentage::from_whole(10)), None, None, 0, None),
        coupon(
            "DESCONTO5",
            CouponRule::Fixed(Money::from_cents(500)),
            Some(Money::from_cents(3000)),
            Some(100),
            0,
            None,
        ),
        coupon("ESGOTADO", CouponRule::Percentage(Percentage::from_whole(50)), None, Some(3), 3, None),
        coupon(
            "VENCIDO",
            CouponRule::Percentage(Percentage::from_whole(20)),
            None,
            None,
            0,
            Some(today - Duration::days(1)),
        ),
    ];
    for c in &coupons {
        db.coupons().insert(c).await?;
    }
    info!(count = coupons.len(), "Coupons created");

    info!(elapsed = ?start.elapsed(), "Seed complete");
    db.close().await;

    Ok(())
}

fn coupon(
    code: &str,
    rule: CouponRule,
    minimum_order: Option<Money>,
    max_uses: Option<i64>,
    current_uses: i64,
    valid_until: Option<chrono::NaiveDate>,
) -> Coupon {
    Coupon {
        id: Uuid::new_v4().to_string(),
        code: code.to_string(),
        rule,
        minimum_order,
        max_uses,
        current_uses,
        valid_from: None,
        valid_until,
        is_active: true,
    }
}
