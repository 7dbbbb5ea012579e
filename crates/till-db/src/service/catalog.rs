//! # Catalog Service
//!
//! Back-office writes to categories and products.
//!
//! Every new product gets its inventory snapshot (0 on hand) in the same
//! transaction, so payment never finds a product without one unless the row
//! was removed by hand. Product writes are audited after commit, in the
//! background.

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::error::ServiceResult;
use crate::pool::Database;
use crate::repository::audit::AuditEntry;
use crate::repository::{catalog, inventory};
use till_core::validation::{validate_name, validate_note, validate_price_cents};
use till_core::{Category, Clock, CoreError, NewCategory, NewProduct, Product, ProductUpdate};

/// Catalog operations. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        CatalogService { db, clock }
    }

    /// Creates a category. A parent, when given, must exist.
    pub async fn create_category(&self, new: NewCategory, user_id: i64) -> ServiceResult<Category> {
        let new = NewCategory {
            name: validate_name("name", &new.name)?,
            parent_id: new.parent_id,
        };
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        if let Some(parent_id) = new.parent_id {
            catalog::find_category(&mut *tx, parent_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Category", parent_id))?;
        }
        let category = catalog::insert_category(&mut *tx, &new, now).await?;
        tx.commit().await?;

        info!(category_id = category.id, name = %category.name, user_id, "Category created");

        Ok(category)
    }

    /// Creates an active product with an empty inventory snapshot.
    pub async fn create_product(&self, new: NewProduct, user_id: i64) -> ServiceResult<Product> {
        validate_price_cents(new.unit_price_cents)?;
        let new = NewProduct {
            category_id: new.category_id,
            name: validate_name("name", &new.name)?,
            description: validate_note(new.description.as_deref())?,
            unit_price_cents: new.unit_price_cents,
        };
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        catalog::find_category(&mut *tx, new.category_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Category", new.category_id))?;

        let product = catalog::insert_product(&mut *tx, &new, now).await?;
        inventory::insert_snapshot(&mut *tx, product.id, 0, now).await?;
        tx.commit().await?;

        info!(product_id = product.id, name = %product.name, price = product.unit_price_cents, "Product created");

        self.db.audit().spawn_record(
            AuditEntry {
                user_id,
                entity_name: "Product",
                entity_id: product.id.to_string(),
                action: "CREATE",
                changes: serde_json::to_value(&product).ok(),
            },
            now,
        );

        Ok(product)
    }

    /// Changes name, price or active flag. Existing order lines keep the
    /// name and price they were added with.
    pub async fn update_product(&self, id: i64, update: ProductUpdate, user_id: i64) -> ServiceResult<Product> {
        let update = ProductUpdate {
            name: update.name.as_deref().map(|n| validate_name("name", n)).transpose()?,
            unit_price_cents: update.unit_price_cents,
            is_active: update.is_active,
        };
        if let Some(price) = update.unit_price_cents {
            validate_price_cents(price)?;
        }
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        let before = catalog::fetch_product(&mut *tx, id).await?;
        let after = catalog::update_product(&mut *tx, id, &update, now).await?;
        tx.commit().await?;

        info!(product_id = id, user_id, "Product updated");

        self.db.audit().spawn_record(
            AuditEntry {
                user_id,
                entity_name: "Product",
                entity_id: id.to_string(),
                action: "UPDATE",
                changes: Some(json!({ "before": before, "after": after })),
            },
            now,
        );

        Ok(after)
    }

    pub async fn get_product(&self, id: i64) -> ServiceResult<Product> {
        let product = self
            .db
            .catalog()
            .get_product(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", id))?;
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use crate::service::testing::{Fixture, CASHIER};
    use till_core::{
        ErrorCode, NewCategory, NewProduct, ProductUpdate, MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_CENTS,
    };

    #[tokio::test]
    async fn test_create_product_starts_with_zero_stock() {
        let fx = Fixture::new().await;
        let product = fx.product("Cola", 150, 0).await;

        assert!(product.is_active);
        assert_eq!(fx.on_hand(product.id).await, 0);
        assert_eq!(fx.catalog.get_product(product.id).await.unwrap().name, "Cola");
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let fx = Fixture::new().await;

        let err = fx
            .catalog
            .create_product(
                NewProduct {
                    category_id: 9999,
                    name: "Ghost".to_string(),
                    description: None,
                    unit_price_cents: 100,
                },
                CASHIER,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = fx
            .catalog
            .create_product(
                NewProduct {
                    category_id: fx.category.id,
                    name: "  ".to_string(),
                    description: None,
                    unit_price_cents: 100,
                },
                CASHIER,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = fx
            .catalog
            .create_category(
                NewCategory {
                    name: "Orphans".to_string(),
                    parent_id: Some(9999),
                },
                CASHIER,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let child = fx
            .catalog
            .create_category(
                NewCategory {
                    name: "Sodas".to_string(),
                    parent_id: Some(fx.category.id),
                },
                CASHIER,
            )
            .await
            .unwrap();
        assert_eq!(child.parent_id, Some(fx.category.id));
    }

    #[tokio::test]
    async fn test_price_ceiling_keeps_line_math_in_range() {
        let fx = Fixture::new().await;

        let err = fx
            .catalog
            .create_product(
                NewProduct {
                    category_id: fx.category.id,
                    name: "Gold bar".to_string(),
                    description: None,
                    unit_price_cents: 10_000_000_000_000_000,
                },
                CASHIER,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let bar = fx.product("Gold bar", MAX_UNIT_PRICE_CENTS, 0).await;
        let err = fx
            .catalog
            .update_product(
                bar.id,
                ProductUpdate {
                    unit_price_cents: Some(MAX_UNIT_PRICE_CENTS + 1),
                    ..Default::default()
                },
                CASHIER,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let order_id = fx.order().await;
        let priced = fx.orders.add_line(order_id, bar.id, MAX_ITEM_QUANTITY).await.unwrap();
        assert_eq!(priced.order.subtotal_cents, MAX_UNIT_PRICE_CENTS * MAX_ITEM_QUANTITY);
        assert_eq!(priced.order.grand_total_cents, MAX_UNIT_PRICE_CENTS * MAX_ITEM_QUANTITY);
    }

    #[tokio::test]
    async fn test_update_product_is_audited() {
        let fx = Fixture::new().await;
        let product = fx.product("Cola", 150, 0).await;

        let updated = fx
            .catalog
            .update_product(
                product.id,
                ProductUpdate {
                    unit_price_cents: Some(175),
                    ..Default::default()
                },
                CASHIER,
            )
            .await
            .unwrap();
        assert_eq!(updated.unit_price_cents, 175);
        assert_eq!(updated.name, "Cola");

        // Audit rows are written by background tasks
        let audit = fx.db.audit();
        let mut logs = Vec::new();
        for _ in 0..100 {
            logs = audit.list_for_entity("Product", &product.id.to_string()).await.unwrap();
            if logs.len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().any(|l| l.action == "CREATE"));
        let update = logs.iter().find(|l| l.action == "UPDATE").unwrap();
        assert_eq!(update.user_id, CASHIER);
        assert!(update.changes.as_deref().unwrap_or_default().contains("175"));

        let err = fx
            .catalog
            .update_product(
                product.id,
                ProductUpdate {
                    unit_price_cents: Some(-1),
                    ..Default::default()
                },
                CASHIER,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = fx
            .catalog
            .update_product(9999, ProductUpdate::default(), CASHIER)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
