//! # Repository Module
//!
//! SQL for every table Till owns.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Plain reads                         Inside a service transaction      │
//! │  ───────────                         ────────────────────────────      │
//! │  db.orders().get_by_id(7)            tx = db.begin_write().await?;     │
//! │       │                              order::lock_order(&mut tx, 7)     │
//! │       ▼                              inventory::debit_snapshot(...)    │
//! │  XRepository { pool }                ledger::append(...)               │
//! │  acquires a connection and           tx.commit().await?;               │
//! │  calls the free function                                               │
//! │       │                                     │                           │
//! │       └──────────────┬──────────────────────┘                           │
//! │                      ▼                                                  │
//! │     pub async fn f(conn: &mut SqliteConnection, ...) -> DbResult<T>    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Modules
//!
//! - [`order`] - Orders, lines, status history, listing
//! - [`catalog`] - Categories and products
//! - [`inventory`] - Snapshots and manual adjustments
//! - [`ledger`] - Append-only stock ledger
//! - [`discount`] - Discounts, scope links, coupons
//! - [`redemption`] - Coupon redemptions
//! - [`audit`] - Best-effort audit log

pub mod audit;
pub mod catalog;
pub mod discount;
pub mod inventory;
pub mod ledger;
pub mod order;
pub mod redemption;
