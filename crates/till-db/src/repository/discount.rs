//! # Discount Catalog
//!
//! Promotion definitions, their category/product links, and coupon codes.
//!
//! ## Loading for Pricing
//! ```text
//! discounts (is_active = 1, ORDER BY id)
//!      │
//!      ├── discount_categories ──► DiscountRule.category_ids
//!      └── discount_products   ──► DiscountRule.product_ids
//!      │
//!      ▼
//! DiscountCatalog  (window filtering happens in till-core against the clock)
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{Coupon, CouponUsage, Discount, DiscountCatalog, DiscountRule, NewCoupon, NewDiscount};

const DISCOUNT_COLUMNS: &str = "id, name, discount_type, value, scope, is_stackable, priority, \
     starts_at, ends_at, min_basket_subtotal_cents, max_total_discount_cents, is_active, created_at";

const COUPON_COLUMNS: &str =
    "id, discount_id, code, usage_limit_total, usage_limit_per_customer, is_active, created_at";

/// Repository for discount reads outside a transaction.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Gets a discount by ID.
    pub async fn get_discount(&self, id: i64) -> DbResult<Option<Discount>> {
        let mut conn = self.pool.acquire().await?;
        find_discount(&mut conn, id).await
    }

    /// Loads the active promotions with their links.
    pub async fn load_catalog(&self) -> DbResult<DiscountCatalog> {
        let mut conn = self.pool.acquire().await?;
        load_catalog(&mut conn).await
    }

    /// Lists coupons with how often each was redeemed.
    pub async fn list_coupons(&self, discount_id: Option<i64>) -> DbResult<Vec<CouponUsage>> {
        let coupons = sqlx::query_as::<_, CouponUsage>(
            r#"
            SELECT
                c.id, c.discount_id, c.code,
                c.usage_limit_total, c.usage_limit_per_customer, c.is_active,
                (SELECT COUNT(*) FROM coupon_redemptions r WHERE r.coupon_id = c.id) AS redemption_count
            FROM coupons c
            WHERE ?1 IS NULL OR c.discount_id = ?1
            ORDER BY c.id
            "#,
        )
        .bind(discount_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(coupons)
    }
}

// =============================================================================
// Catalog Loading
// =============================================================================

/// Loads every active discount with its scope links, in id order.
pub async fn load_catalog(conn: &mut SqliteConnection) -> DbResult<DiscountCatalog> {
    let discounts = sqlx::query_as::<_, Discount>(&format!(
        "SELECT {DISCOUNT_COLUMNS} FROM discounts WHERE is_active = 1 ORDER BY id"
    ))
    .fetch_all(&mut *conn)
    .await?;

    let category_links: Vec<(i64, i64)> =
        sqlx::query_as("SELECT discount_id, category_id FROM discount_categories")
            .fetch_all(&mut *conn)
            .await?;

    let product_links: Vec<(i64, i64)> =
        sqlx::query_as("SELECT discount_id, product_id FROM discount_products")
            .fetch_all(&mut *conn)
            .await?;

    let mut rules: Vec<DiscountRule> = discounts.into_iter().map(DiscountRule::unlinked).collect();
    let index: HashMap<i64, usize> = rules
        .iter()
        .enumerate()
        .map(|(i, r)| (r.discount.id, i))
        .collect();

    for (discount_id, category_id) in category_links {
        if let Some(&i) = index.get(&discount_id) {
            rules[i].category_ids.insert(category_id);
        }
    }
    for (discount_id, product_id) in product_links {
        if let Some(&i) = index.get(&discount_id) {
            rules[i].product_ids.insert(product_id);
        }
    }

    debug!(discounts = rules.len(), "Loaded discount catalog");

    Ok(DiscountCatalog::new(rules))
}

// =============================================================================
// Discounts
// =============================================================================

pub async fn insert_discount(
    conn: &mut SqliteConnection,
    new: &NewDiscount,
    now: DateTime<Utc>,
) -> DbResult<Discount> {
    debug!(name = %new.name, scope = ?new.scope, value = new.value, "Inserting discount");

    let id = sqlx::query(
        r#"
        INSERT INTO discounts (
            name, discount_type, value, scope, is_stackable, priority,
            starts_at, ends_at, min_basket_subtotal_cents, max_total_discount_cents,
            is_active, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11)
        "#,
    )
    .bind(&new.name)
    .bind(new.discount_type)
    .bind(new.value)
    .bind(new.scope)
    .bind(new.is_stackable)
    .bind(new.priority)
    .bind(new.starts_at)
    .bind(new.ends_at)
    .bind(new.min_basket_subtotal_cents)
    .bind(new.max_total_discount_cents)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    fetch_discount(conn, id).await
}

pub async fn find_discount(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Discount>> {
    let discount = sqlx::query_as::<_, Discount>(&format!(
        "SELECT {DISCOUNT_COLUMNS} FROM discounts WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(discount)
}

pub async fn fetch_discount(conn: &mut SqliteConnection, id: i64) -> DbResult<Discount> {
    find_discount(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Discount", id))
}

pub async fn set_discount_active(conn: &mut SqliteConnection, id: i64, active: bool) -> DbResult<()> {
    let result = sqlx::query("UPDATE discounts SET is_active = ?2 WHERE id = ?1")
        .bind(id)
        .bind(active)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Discount", id));
    }

    Ok(())
}

/// Links a category. Linking twice is a no-op.
pub async fn link_category(conn: &mut SqliteConnection, discount_id: i64, category_id: i64) -> DbResult<()> {
    sqlx::query("INSERT OR IGNORE INTO discount_categories (discount_id, category_id) VALUES (?1, ?2)")
        .bind(discount_id)
        .bind(category_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Links a product. Linking twice is a no-op.
pub async fn link_product(conn: &mut SqliteConnection, discount_id: i64, product_id: i64) -> DbResult<()> {
    sqlx::query("INSERT OR IGNORE INTO discount_products (discount_id, product_id) VALUES (?1, ?2)")
        .bind(discount_id)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Coupons
// =============================================================================

/// Inserts a coupon. `new.code` must already be trimmed.
///
/// ## Errors
/// `UniqueViolation` when the code is taken.
pub async fn insert_coupon(
    conn: &mut SqliteConnection,
    new: &NewCoupon,
    now: DateTime<Utc>,
) -> DbResult<Coupon> {
    debug!(code = %new.code, discount_id = new.discount_id, "Inserting coupon");

    let id = sqlx::query(
        r#"
        INSERT INTO coupons (
            discount_id, code, usage_limit_total, usage_limit_per_customer, is_active, created_at
        ) VALUES (?1, ?2, ?3, ?4, 1, ?5)
        "#,
    )
    .bind(new.discount_id)
    .bind(&new.code)
    .bind(new.usage_limit_total)
    .bind(new.usage_limit_per_customer)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, new.code.clone()),
        other => other,
    })?
    .last_insert_rowid();

    find_coupon(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Coupon", id))
}

pub async fn find_coupon(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Coupon>> {
    let coupon = sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(coupon)
}

/// Exact, case-sensitive lookup.
pub async fn find_coupon_by_code(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Coupon>> {
    let coupon = sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?1"
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(coupon)
}

pub async fn set_coupon_active(conn: &mut SqliteConnection, id: i64, active: bool) -> DbResult<()> {
    let result = sqlx::query("UPDATE coupons SET is_active = ?2 WHERE id = ?1")
        .bind(id)
        .bind(active)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Coupon", id));
    }

    Ok(())
}
