//! # Inventory Repository
//!
//! On-hand snapshots and manual stock adjustments.
//!
//! ## Snapshot vs Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  inventory_items (one row per product)     stock_ledger (append-only)  │
//! │  ───────────────────────────────────       ──────────────────────────  │
//! │  quantity_on_hand = current truth          every movement, forever     │
//! │                                                                         │
//! │  Both are written in the same transaction, so the snapshot always      │
//! │  equals its starting quantity plus the sum of its ledger deltas.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::ledger;
use till_core::{InventorySnapshot, StockAdjustment, StockLedgerEntry};

/// Repository for inventory reads outside a transaction.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets the snapshot of one product.
    pub async fn get_snapshot(&self, product_id: i64) -> DbResult<Option<InventorySnapshot>> {
        let mut conn = self.pool.acquire().await?;
        find_snapshot(&mut conn, product_id).await
    }

    /// Lists every snapshot ordered by product.
    pub async fn list_snapshots(&self) -> DbResult<Vec<InventorySnapshot>> {
        let snapshots = sqlx::query_as::<_, InventorySnapshot>(
            "SELECT id, product_id, quantity_on_hand, updated_at FROM inventory_items ORDER BY product_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(snapshots)
    }

    /// Gets the ledger of one product, oldest first.
    pub async fn ledger_for_product(&self, product_id: i64) -> DbResult<Vec<StockLedgerEntry>> {
        let mut conn = self.pool.acquire().await?;
        ledger::entries_for_product(&mut conn, product_id).await
    }

    /// Gets the manual adjustments of one product, oldest first.
    pub async fn adjustments_for_product(&self, product_id: i64) -> DbResult<Vec<StockAdjustment>> {
        let adjustments = sqlx::query_as::<_, StockAdjustment>(
            r#"
            SELECT id, product_id, delta, note, created_by, created_at
            FROM stock_adjustments
            WHERE product_id = ?1
            ORDER BY id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(adjustments)
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Creates the snapshot row of a new product.
pub async fn insert_snapshot(
    conn: &mut SqliteConnection,
    product_id: i64,
    quantity_on_hand: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO inventory_items (product_id, quantity_on_hand, updated_at) VALUES (?1, ?2, ?3)",
    )
    .bind(product_id)
    .bind(quantity_on_hand)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn find_snapshot(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DbResult<Option<InventorySnapshot>> {
    let snapshot = sqlx::query_as::<_, InventorySnapshot>(
        "SELECT id, product_id, quantity_on_hand, updated_at FROM inventory_items WHERE product_id = ?1",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(snapshot)
}

/// On-hand quantity per product for the given ids. Products without a
/// snapshot are absent from the map.
pub async fn on_hand_for(
    conn: &mut SqliteConnection,
    product_ids: &[i64],
) -> DbResult<HashMap<i64, i64>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT product_id, quantity_on_hand FROM inventory_items WHERE product_id IN (",
    );
    let mut separated = qb.separated(", ");
    for id in product_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let rows: Vec<(i64, i64)> = qb.build_query_as().fetch_all(&mut *conn).await?;

    Ok(rows.into_iter().collect())
}

/// Removes `quantity` units only if that many are on hand.
///
/// ## Returns
/// `false` when stock was short (nothing written).
pub async fn debit_snapshot(
    conn: &mut SqliteConnection,
    product_id: i64,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_items SET
            quantity_on_hand = quantity_on_hand - ?2,
            updated_at = ?3
        WHERE product_id = ?1 AND quantity_on_hand >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(product_id, quantity, debited = result.rows_affected() == 1, "Debit snapshot");

    Ok(result.rows_affected() == 1)
}

/// Applies a signed delta without any sufficiency check.
pub async fn apply_delta(
    conn: &mut SqliteConnection,
    product_id: i64,
    delta: i64,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_items SET
            quantity_on_hand = quantity_on_hand + ?2,
            updated_at = ?3
        WHERE product_id = ?1
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Inventory", product_id));
    }

    let on_hand: i64 =
        sqlx::query_scalar("SELECT quantity_on_hand FROM inventory_items WHERE product_id = ?1")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(on_hand)
}

// =============================================================================
// Adjustments
// =============================================================================

pub async fn insert_adjustment(
    conn: &mut SqliteConnection,
    product_id: i64,
    delta: i64,
    note: Option<&str>,
    created_by: i64,
    now: DateTime<Utc>,
) -> DbResult<StockAdjustment> {
    let id = sqlx::query(
        r#"
        INSERT INTO stock_adjustments (product_id, delta, note, created_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(note)
    .bind(created_by)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(StockAdjustment {
        id,
        product_id,
        delta,
        note: note.map(str::to_string),
        created_by,
        created_at: now,
    })
}
