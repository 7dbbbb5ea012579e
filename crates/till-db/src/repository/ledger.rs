//! # Stock Ledger Store
//!
//! Append-only record of every inventory-affecting event.
//!
//! Only `append` exists. The schema backs this up: triggers abort any
//! UPDATE or DELETE on `stock_ledger`.
//!
//! ```text
//! ref_type     ref_id                  delta      reason
//! ──────────   ─────────────────────   ────────   ───────────────────
//! ORDER        orders.id               -qty       "Order paid"
//! ADJUSTMENT   stock_adjustments.id    ±delta     adjustment note
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use till_core::{LedgerRefType, StockLedgerEntry};

/// One movement to record.
#[derive(Debug, Clone, Copy)]
pub struct LedgerAppend<'a> {
    pub product_id: i64,
    pub ref_type: LedgerRefType,
    pub ref_id: i64,
    pub delta: i64,
    pub reason: Option<&'a str>,
}

/// Appends one entry and returns its id.
pub async fn append(
    conn: &mut SqliteConnection,
    entry: LedgerAppend<'_>,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    debug!(
        product_id = entry.product_id,
        ref_type = ?entry.ref_type,
        ref_id = entry.ref_id,
        delta = entry.delta,
        "Appending ledger entry"
    );

    let id = sqlx::query(
        r#"
        INSERT INTO stock_ledger (product_id, ref_type, ref_id, delta, reason, occurred_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(entry.product_id)
    .bind(entry.ref_type)
    .bind(entry.ref_id)
    .bind(entry.delta)
    .bind(entry.reason)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn entries_for_product(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DbResult<Vec<StockLedgerEntry>> {
    let entries = sqlx::query_as::<_, StockLedgerEntry>(
        r#"
        SELECT id, product_id, ref_type, ref_id, delta, reason, occurred_at
        FROM stock_ledger
        WHERE product_id = ?1
        ORDER BY id
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(entries)
}

pub async fn entries_for_ref(
    conn: &mut SqliteConnection,
    ref_type: LedgerRefType,
    ref_id: i64,
) -> DbResult<Vec<StockLedgerEntry>> {
    let entries = sqlx::query_as::<_, StockLedgerEntry>(
        r#"
        SELECT id, product_id, ref_type, ref_id, delta, reason, occurred_at
        FROM stock_ledger
        WHERE ref_type = ?1 AND ref_id = ?2
        ORDER BY id
        "#,
    )
    .bind(ref_type)
    .bind(ref_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(entries)
}
