//! # Coupon Redemption Tracker
//!
//! Which coupon was used on which order, and by whom.
//!
//! `coupon_redemptions.order_id` is UNIQUE, so an order carries at most one
//! coupon even if two requests race past the service-level check.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::CouponRedemption;

pub async fn find_for_order(
    conn: &mut SqliteConnection,
    order_id: i64,
) -> DbResult<Option<CouponRedemption>> {
    let redemption = sqlx::query_as::<_, CouponRedemption>(
        r#"
        SELECT id, coupon_id, order_id, customer_id, redeemed_at
        FROM coupon_redemptions
        WHERE order_id = ?1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(redemption)
}

/// Whether the order carries any coupon.
pub async fn order_has_coupon(conn: &mut SqliteConnection, order_id: i64) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupon_redemptions WHERE order_id = ?1")
        .bind(order_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count > 0)
}

/// Code of the coupon redeemed on the order, if any.
pub async fn coupon_code_for_order(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Option<String>> {
    let code: Option<String> = sqlx::query_scalar(
        r#"
        SELECT c.code
        FROM coupon_redemptions r
        JOIN coupons c ON c.id = r.coupon_id
        WHERE r.order_id = ?1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(code)
}

pub async fn count_for_coupon(conn: &mut SqliteConnection, coupon_id: i64) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupon_redemptions WHERE coupon_id = ?1")
        .bind(coupon_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count)
}

pub async fn count_for_customer(
    conn: &mut SqliteConnection,
    coupon_id: i64,
    customer_id: i64,
) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM coupon_redemptions WHERE coupon_id = ?1 AND customer_id = ?2",
    )
    .bind(coupon_id)
    .bind(customer_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

/// Records a redemption.
///
/// ## Errors
/// `UniqueViolation` when the order already has one.
pub async fn insert_redemption(
    conn: &mut SqliteConnection,
    coupon_id: i64,
    order_id: i64,
    customer_id: Option<i64>,
    now: DateTime<Utc>,
) -> DbResult<CouponRedemption> {
    debug!(coupon_id, order_id, ?customer_id, "Recording coupon redemption");

    let id = sqlx::query(
        r#"
        INSERT INTO coupon_redemptions (coupon_id, order_id, customer_id, redeemed_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(coupon_id)
    .bind(order_id)
    .bind(customer_id)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, order_id.to_string()),
        other => other,
    })?
    .last_insert_rowid();

    Ok(CouponRedemption {
        id,
        coupon_id,
        order_id,
        customer_id,
        redeemed_at: now,
    })
}

/// Deletes the redemption of an order.
///
/// ## Returns
/// `false` when the order had none.
pub async fn delete_for_order(conn: &mut SqliteConnection, order_id: i64) -> DbResult<bool> {
    debug!(order_id, "Removing coupon redemption");

    let result = sqlx::query("DELETE FROM coupon_redemptions WHERE order_id = ?1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
