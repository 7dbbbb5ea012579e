//! # Catalog Repository
//!
//! Categories and products. Pricing only ever reads from here; the back
//! office writes through [`crate::service::catalog::CatalogService`].

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{Category, NewCategory, NewProduct, Product, ProductUpdate};

const PRODUCT_COLUMNS: &str =
    "id, category_id, name, description, unit_price_cents, is_active, created_at, updated_at";

/// Repository for catalog reads outside a transaction.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Gets a product by ID (active or not).
    pub async fn get_product(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        find_product(&mut conn, id).await
    }

    /// Gets a category by ID.
    pub async fn get_category(&self, id: i64) -> DbResult<Option<Category>> {
        let mut conn = self.pool.acquire().await?;
        find_category(&mut conn, id).await
    }

    /// Counts products (for diagnostics and the seed binary).
    pub async fn count_products(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Categories
// =============================================================================

pub async fn insert_category(
    conn: &mut SqliteConnection,
    new: &NewCategory,
    now: DateTime<Utc>,
) -> DbResult<Category> {
    debug!(name = %new.name, parent_id = ?new.parent_id, "Inserting category");

    let id = sqlx::query(
        "INSERT INTO categories (name, parent_id, is_active, created_at) VALUES (?1, ?2, 1, ?3)",
    )
    .bind(&new.name)
    .bind(new.parent_id)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    find_category(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Category", id))
}

pub async fn find_category(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT id, name, parent_id, is_active, created_at FROM categories WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(category)
}

// =============================================================================
// Products
// =============================================================================

pub async fn insert_product(
    conn: &mut SqliteConnection,
    new: &NewProduct,
    now: DateTime<Utc>,
) -> DbResult<Product> {
    debug!(name = %new.name, category_id = new.category_id, price = new.unit_price_cents, "Inserting product");

    let id = sqlx::query(
        r#"
        INSERT INTO products (
            category_id, name, description, unit_price_cents, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
        "#,
    )
    .bind(new.category_id)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.unit_price_cents)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    fetch_product(conn, id).await
}

pub async fn find_product(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

pub async fn fetch_product(conn: &mut SqliteConnection, id: i64) -> DbResult<Product> {
    find_product(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
}

/// Loads the given products keyed by id. Unknown ids are simply absent.
pub async fn products_by_ids(
    conn: &mut SqliteConnection,
    ids: &[i64],
) -> DbResult<HashMap<i64, Product>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let products = qb.build_query_as::<Product>().fetch_all(&mut *conn).await?;

    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

/// Applies a partial update and returns the stored product.
pub async fn update_product(
    conn: &mut SqliteConnection,
    id: i64,
    update: &ProductUpdate,
    now: DateTime<Utc>,
) -> DbResult<Product> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            name = COALESCE(?2, name),
            unit_price_cents = COALESCE(?3, unit_price_cents),
            is_active = COALESCE(?4, is_active),
            updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(&update.name)
    .bind(update.unit_price_cents)
    .bind(update.is_active)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    fetch_product(conn, id).await
}
