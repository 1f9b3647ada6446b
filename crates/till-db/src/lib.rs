//! # till-db: Storage and Services for the Till Register
//!
//! SQLite storage for the register, plus the two services that drive it:
//! [`Register`] (sessions and the checkout commit) and [`Terminal`]
//! (one operator's cart and payment inputs).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Terminal (cart, discount, payment inputs)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Register (open/close session, check coupon, commit sale)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │ catalog,coupon │    │  (embedded)  │   │   │
//! │  │   │  SqlitePool   │◄───│ session,       │    │ 001_init.sql │   │   │
//! │  │   │               │    │ transaction    │    │              │   │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (till.db)                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_core::{Money, PaymentMethod};
//! use till_db::{Database, Register, Terminal};
//!
//! let db = Database::new(config.db_config()).await?;
//! let register = Register::new(db);
//! register.open_session("op-1", Money::from_cents(20000)).await?;
//!
//! let mut terminal = Terminal::new(register.clone());
//! terminal.add_product("p-beer", 2).await?;
//! terminal.select_payment(PaymentMethod::Pix);
//! let sale = terminal.checkout().await?;
//!
//! let closure = register.close_session(Money::from_cents(20000)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod register;
pub mod repository;
pub mod terminal;

#[cfg(test)]
mod fixtures;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::RegisterConfig;
pub use error::{DbError, DbResult, EngineError, EngineResult};
pub use pool::{Database, DbConfig};
pub use register::Register;
pub use terminal::Terminal;

pub use repository::catalog::CatalogRepository;
pub use repository::coupon::CouponRepository;
pub use repository::session::SessionRepository;
pub use repository::transaction::TransactionRepository;
