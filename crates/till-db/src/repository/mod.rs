//! # Repository Module
//!
//! SQL for each table group, behind one struct per group.
//!
//! ## Pool vs. Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  db.catalog().get_product(id)           &self  → runs on the pool       │
//! │                                                                         │
//! │  CatalogRepository::decrement_stock(    associated fn → runs on the     │
//! │      &mut *tx, id, qty)                 caller's connection, so it      │
//! │                                         joins the commit transaction    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Products, events, ticket types
//! - [`coupon::CouponRepository`] - Coupon lookup and usage counter
//! - [`session::SessionRepository`] - Register sessions and close totals
//! - [`transaction::TransactionRepository`] - Committed sales and lines

pub mod catalog;
pub mod coupon;
pub mod session;
pub mod transaction;
