//! # Order Repository
//!
//! Database operations for orders, order lines and status history.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── insert_order() → Order { status: Unpaid, totals: 0 }           │
//! │                                                                         │
//! │  2. EDIT (each call in its own transaction)                            │
//! │     └── lock_order()         bump row_version, NotFound if missing     │
//! │     └── insert_line() / update_line_quantity() / delete_line()         │
//! │     └── save_pricing()       lines + totals, WHERE status = 'unpaid'   │
//! │                                                                         │
//! │  3. PAY or VOID                                                        │
//! │     └── set_status()         WHERE status = 'unpaid'                   │
//! │     └── insert_status_history()                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions taking `&mut SqliteConnection` run inside the caller's
//! transaction. [`OrderRepository`] wraps the read paths for pool access.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{
    Order, OrderFilter, OrderLine, OrderStatus, OrderStatusHistoryEntry, OrderSummary, Page,
    Product,
};

const ORDER_COLUMNS: &str = "id, order_number, customer_id, status, subtotal_cents, \
     discount_total_cents, tax_total_cents, grand_total_cents, is_active, row_version, \
     created_at, updated_at";

const LINE_COLUMNS: &str = "id, order_id, product_id, product_name, unit_price_cents, quantity, \
     line_discount_cents, line_total_cents, discount_id";

// =============================================================================
// Repository (pool reads)
// =============================================================================

/// Repository for order reads outside a transaction.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        find_order(&mut conn, id).await
    }

    /// Gets all lines of an order in insertion order.
    pub async fn get_lines(&self, order_id: i64) -> DbResult<Vec<OrderLine>> {
        let mut conn = self.pool.acquire().await?;
        lines_for_order(&mut conn, order_id).await
    }

    /// Gets the status history of an order, oldest first.
    pub async fn get_history(&self, order_id: i64) -> DbResult<Vec<OrderStatusHistoryEntry>> {
        let mut conn = self.pool.acquire().await?;
        history_for_order(&mut conn, order_id).await
    }

    /// Lists orders matching `filter`, newest first.
    pub async fn list(&self, filter: &OrderFilter) -> DbResult<Page<OrderSummary>> {
        let mut conn = self.pool.acquire().await?;
        list_orders(&mut conn, filter).await
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Inserts a new Unpaid order with zero totals.
///
/// ## Errors
/// `UniqueViolation` when `order_number` is taken.
pub async fn insert_order(
    conn: &mut SqliteConnection,
    order_number: &str,
    customer_id: Option<i64>,
    now: DateTime<Utc>,
) -> DbResult<Order> {
    debug!(order_number = %order_number, ?customer_id, "Creating order");

    let id = sqlx::query(
        r#"
        INSERT INTO orders (order_number, customer_id, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
    )
    .bind(order_number)
    .bind(customer_id)
    .bind(OrderStatus::Unpaid)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    fetch_order(conn, id).await
}

/// Bumps `row_version`.
///
/// Every mutating order transaction starts here, right after
/// `BEGIN IMMEDIATE`, so the version counts committed edits.
pub async fn lock_order(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    let result = sqlx::query("UPDATE orders SET row_version = row_version + 1 WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", id));
    }

    Ok(())
}

pub async fn find_order(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(order)
}

/// Like [`find_order`] but missing orders are `NotFound`.
pub async fn fetch_order(conn: &mut SqliteConnection, id: i64) -> DbResult<Order> {
    find_order(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Order", id))
}

/// Writes recalculated line amounts and order totals.
///
/// Guarded on `status = 'unpaid'`: totals of a terminal order never change.
pub async fn save_pricing(
    conn: &mut SqliteConnection,
    order: &Order,
    lines: &[OrderLine],
) -> DbResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            UPDATE order_lines SET
                line_discount_cents = ?2,
                line_total_cents = ?3,
                discount_id = ?4
            WHERE id = ?1
            "#,
        )
        .bind(line.id)
        .bind(line.line_discount_cents)
        .bind(line.line_total_cents)
        .bind(line.discount_id)
        .execute(&mut *conn)
        .await?;
    }

    let result = sqlx::query(
        r#"
        UPDATE orders SET
            subtotal_cents = ?2,
            discount_total_cents = ?3,
            tax_total_cents = ?4,
            grand_total_cents = ?5,
            updated_at = ?6
        WHERE id = ?1 AND status = 'unpaid'
        "#,
    )
    .bind(order.id)
    .bind(order.subtotal_cents)
    .bind(order.discount_total_cents)
    .bind(order.tax_total_cents)
    .bind(order.grand_total_cents)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order (unpaid)", order.id));
    }

    debug!(
        order_id = order.id,
        subtotal = order.subtotal_cents,
        discount = order.discount_total_cents,
        grand_total = order.grand_total_cents,
        "Saved order pricing"
    );

    Ok(())
}

/// Moves an order from `from` to `to`.
///
/// ## Returns
/// `false` when the order was no longer in `from` (nothing written).
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders SET status = ?3, updated_at = ?4
        WHERE id = ?1 AND status = ?2
        "#,
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Lines
// =============================================================================

pub async fn lines_for_order(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Vec<OrderLine>> {
    let lines = sqlx::query_as::<_, OrderLine>(&format!(
        "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = ?1 ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

/// Finds a line only if it belongs to `order_id`.
pub async fn find_line(
    conn: &mut SqliteConnection,
    order_id: i64,
    line_id: i64,
) -> DbResult<Option<OrderLine>> {
    let line = sqlx::query_as::<_, OrderLine>(&format!(
        "SELECT {LINE_COLUMNS} FROM order_lines WHERE id = ?1 AND order_id = ?2"
    ))
    .bind(line_id)
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(line)
}

/// Adds a line to an order.
///
/// ## Snapshot Pattern
/// Product name and price are copied onto the line. Later catalog edits
/// do not reprice existing lines.
pub async fn insert_line(
    conn: &mut SqliteConnection,
    order_id: i64,
    product: &Product,
    quantity: i64,
) -> DbResult<i64> {
    debug!(order_id, product_id = product.id, quantity, "Adding order line");

    let base = product.unit_price().multiply_quantity(quantity);

    let id = sqlx::query(
        r#"
        INSERT INTO order_lines (
            order_id, product_id, product_name, unit_price_cents,
            quantity, line_discount_cents, line_total_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
        "#,
    )
    .bind(order_id)
    .bind(product.id)
    .bind(&product.name)
    .bind(product.unit_price_cents)
    .bind(quantity)
    .bind(base.cents())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn update_line_quantity(
    conn: &mut SqliteConnection,
    line_id: i64,
    quantity: i64,
) -> DbResult<()> {
    debug!(line_id, quantity, "Updating line quantity");

    let result = sqlx::query("UPDATE order_lines SET quantity = ?2 WHERE id = ?1")
        .bind(line_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order line", line_id));
    }

    Ok(())
}

/// Deletes a line of `order_id`.
///
/// ## Returns
/// `false` when no such line exists on that order.
pub async fn delete_line(conn: &mut SqliteConnection, order_id: i64, line_id: i64) -> DbResult<bool> {
    debug!(order_id, line_id, "Removing order line");

    let result = sqlx::query("DELETE FROM order_lines WHERE id = ?1 AND order_id = ?2")
        .bind(line_id)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Status History
// =============================================================================

pub async fn insert_status_history(
    conn: &mut SqliteConnection,
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
    changed_by: i64,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO order_status_history (order_id, from_status, to_status, changed_by, changed_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(order_id)
    .bind(from)
    .bind(to)
    .bind(changed_by)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn history_for_order(
    conn: &mut SqliteConnection,
    order_id: i64,
) -> DbResult<Vec<OrderStatusHistoryEntry>> {
    let history = sqlx::query_as::<_, OrderStatusHistoryEntry>(
        r#"
        SELECT id, order_id, from_status, to_status, changed_by, changed_at
        FROM order_status_history
        WHERE order_id = ?1
        ORDER BY id
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(history)
}

// =============================================================================
// Listing
// =============================================================================

/// Appends the WHERE clause shared by the count and page queries.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &OrderFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        qb.push(" AND o.status = ").push_bind(status);
    }

    if let Some(q) = &filter.q {
        qb.push(" AND (o.order_number LIKE ")
            .push_bind(format!("%{q}%"));
        if let Ok(id) = q.parse::<i64>() {
            qb.push(" OR o.id = ").push_bind(id);
        }
        qb.push(")");
    }

    if let Some(from) = filter.from {
        qb.push(" AND o.created_at >= ").push_bind(from);
    }

    if let Some(to) = filter.to {
        qb.push(" AND o.created_at < ").push_bind(to);
    }
}

/// Lists orders matching `filter`, newest first.
///
/// The filter is normalized here, so out-of-range pages are clamped.
pub async fn list_orders(conn: &mut SqliteConnection, filter: &OrderFilter) -> DbResult<Page<OrderSummary>> {
    let filter = filter.clone().normalized();

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM orders o");
    push_filter(&mut count, &filter);
    let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut page = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT
            o.id, o.order_number, o.status, o.customer_id,
            o.subtotal_cents, o.discount_total_cents, o.tax_total_cents, o.grand_total_cents,
            (SELECT COUNT(*) FROM order_lines l WHERE l.order_id = o.id) AS line_count,
            o.created_at, o.updated_at
        FROM orders o
        "#,
    );
    push_filter(&mut page, &filter);
    page.push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ")
        .push_bind(filter.page_size)
        .push(" OFFSET ")
        .push_bind(filter.offset());

    let items = page
        .build_query_as::<OrderSummary>()
        .fetch_all(&mut *conn)
        .await?;

    debug!(total, returned = items.len(), page = filter.page, "Listed orders");

    Ok(Page {
        items,
        page: filter.page,
        page_size: filter.page_size,
        total,
    })
}
