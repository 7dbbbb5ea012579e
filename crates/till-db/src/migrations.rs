//! # Database Migrations
//!
//! The Till schema, embedded from `migrations/sqlite/` and applied by
//! [`crate::Database::new`].
//!
//! ## Schema (001_initial_schema.sql)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  catalog     categories ◄── products                                   │
//! │                                │                                        │
//! │  stock       inventory_items (1 per product, UNIQUE product_id)        │
//! │              stock_adjustments                                          │
//! │              stock_ledger            ref_type IN ('ADJUSTMENT','ORDER')│
//! │                                                                         │
//! │  promotions  discounts ◄── discount_categories / discount_products     │
//! │                  ▲                                                      │
//! │              coupons (UNIQUE code) ◄── coupon_redemptions              │
//! │                                        (UNIQUE order_id)               │
//! │                                                                         │
//! │  orders      orders (UNIQUE order_number, row_version)                 │
//! │              order_lines, order_status_history                         │
//! │                                                                         │
//! │  audit       audit_logs                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status, type and scope columns carry CHECK constraints spelled the way
//! the sqlx enum derives in till-core write them. `stock_ledger` and
//! `order_status_history` reject UPDATE and DELETE through triggers.
//!
//! New changes go in a new `NNN_description.sql` file; applied files are
//! never edited.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded at compile time; nothing is read from disk at runtime.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations in filename order. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)` for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
