//! # Service Layer
//!
//! The externally observable operations. Each call owns exactly one
//! `sqlx::Transaction`: it commits at the end or rolls back when dropped on
//! the error path.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  let mut tx = db.begin_write().await?;                                 │
//! │                                                                         │
//! │  order::lock_order(&mut tx, id)      ← bumps row_version               │
//! │  order::fetch_order(&mut tx, id)                                       │
//! │  till_core::ensure_mutable(&order)   ← business rule, may return Err   │
//! │  ... repository calls on &mut tx ...                                   │
//! │  reprice(&mut tx, &mut order, now)   ← till_core::recalculate + save   │
//! │                                                                         │
//! │  tx.commit().await?;                 ← `?` before this = rollback      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Services
//!
//! - [`orders::OrderService`] - Order lines, coupons, reads (plus pay/void in [`fulfillment`])
//! - [`inventory::InventoryService`] - Manual stock adjustments and stock reads
//! - [`catalog::CatalogService`] - Categories and products
//! - [`discounts::DiscountService`] - Discounts, links, coupons

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::ServiceResult;
use crate::repository::{discount, order, redemption};
use till_core::{recalculate, Order, OrderLine, PricingSummary};

pub mod catalog;
pub mod discounts;
pub mod fulfillment;
pub mod inventory;
pub mod orders;

#[cfg(test)]
pub(crate) mod testing;

/// Re-prices every line of `order` and persists lines and totals.
///
/// Reads lines, products, the discount catalog and the coupon flag through
/// `conn`, so it sees the caller's uncommitted writes.
pub(crate) async fn reprice(
    conn: &mut SqliteConnection,
    order: &mut Order,
    now: DateTime<Utc>,
) -> ServiceResult<(Vec<OrderLine>, PricingSummary)> {
    let mut lines = order::lines_for_order(conn, order.id).await?;

    let product_ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
    let products = crate::repository::catalog::products_by_ids(conn, &product_ids).await?;
    let promotions = discount::load_catalog(conn).await?;
    let has_coupon = redemption::order_has_coupon(conn, order.id).await?;

    let summary = recalculate(order, &mut lines, &products, &promotions, has_coupon, now)?;
    order::save_pricing(conn, order, &lines).await?;

    debug!(
        order_id = order.id,
        lines = summary.line_count,
        subtotal = %summary.subtotal,
        discount = %summary.discount_total,
        grand_total = %summary.grand_total,
        "Order repriced"
    );

    Ok((lines, summary))
}
