//! # Discount Service
//!
//! Promotion setup for the back office: discounts, their scope links and
//! coupon codes.
//!
//! ```text
//! create_discount ──► link_category / link_product   (Category / Product scope)
//!        │
//!        └──────────► create_coupon                  (Coupon scope only)
//! ```
//!
//! Changes take effect at the next re-price of each Unpaid order. Paid and
//! voided orders keep the totals they were closed with.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{DbError, ServiceError, ServiceResult};
use crate::pool::Database;
use crate::repository::{catalog, discount};
use till_core::validation::{
    validate_coupon_code, validate_discount_value, validate_name, validate_optional_cents,
    validate_usage_limit, validate_window,
};
use till_core::{
    Clock, CoreError, Coupon, CouponUsage, Discount, DiscountScope, NewCoupon, NewDiscount,
    ValidationError,
};

/// Discount operations. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DiscountService {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl DiscountService {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        DiscountService { db, clock }
    }

    /// Creates an active discount.
    ///
    /// `value` is basis points for Percent (at most 10000) and cents for
    /// Amount.
    pub async fn create_discount(&self, new: NewDiscount) -> ServiceResult<Discount> {
        validate_discount_value(new.discount_type, new.value)?;
        validate_window(new.starts_at, new.ends_at)?;
        validate_optional_cents("min_basket_subtotal_cents", new.min_basket_subtotal_cents)?;
        validate_optional_cents("max_total_discount_cents", new.max_total_discount_cents)?;
        let new = NewDiscount {
            name: validate_name("name", &new.name)?,
            ..new
        };
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        let created = discount::insert_discount(&mut *tx, &new, now).await?;
        tx.commit().await?;

        info!(
            discount_id = created.id,
            name = %created.name,
            scope = ?created.scope,
            value = created.value,
            "Discount created"
        );

        Ok(created)
    }

    pub async fn set_discount_active(&self, id: i64, active: bool) -> ServiceResult<()> {
        let mut tx = self.db.begin_write().await?;
        discount::set_discount_active(&mut *tx, id, active).await?;
        tx.commit().await?;

        info!(discount_id = id, active, "Discount toggled");
        Ok(())
    }

    /// Links a category to a discount. Linking twice is a no-op.
    pub async fn link_category(&self, discount_id: i64, category_id: i64) -> ServiceResult<()> {
        let mut tx = self.db.begin_write().await?;
        discount::fetch_discount(&mut *tx, discount_id).await?;
        catalog::find_category(&mut *tx, category_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Category", category_id))?;
        discount::link_category(&mut *tx, discount_id, category_id).await?;
        tx.commit().await?;

        info!(discount_id, category_id, "Category linked to discount");
        Ok(())
    }

    /// Links a product to a discount. Linking twice is a no-op.
    pub async fn link_product(&self, discount_id: i64, product_id: i64) -> ServiceResult<()> {
        let mut tx = self.db.begin_write().await?;
        discount::fetch_discount(&mut *tx, discount_id).await?;
        catalog::find_product(&mut *tx, product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        discount::link_product(&mut *tx, discount_id, product_id).await?;
        tx.commit().await?;

        info!(discount_id, product_id, "Product linked to discount");
        Ok(())
    }

    /// Creates a coupon code for a Coupon-scope discount.
    ///
    /// ## Errors
    /// - `VALIDATION_ERROR` for a blank code, a non-positive limit, or a
    ///   discount that is not Coupon scope
    /// - `NOT_FOUND` when the discount does not exist
    /// - `CONFLICT` when the code is taken
    pub async fn create_coupon(&self, new: NewCoupon) -> ServiceResult<Coupon> {
        let new = NewCoupon {
            code: validate_coupon_code(&new.code)?,
            ..new
        };
        validate_usage_limit("usage_limit_total", new.usage_limit_total)?;
        validate_usage_limit("usage_limit_per_customer", new.usage_limit_per_customer)?;
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;

        let promotion = discount::fetch_discount(&mut *tx, new.discount_id).await?;
        if promotion.scope != DiscountScope::Coupon {
            return Err(ValidationError::InvalidFormat {
                field: "discount_id".to_string(),
                reason: "coupons require a coupon-scope discount".to_string(),
            }
            .into());
        }

        let coupon = discount::insert_coupon(&mut *tx, &new, now)
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation { .. } => {
                    warn!(code = %new.code, "Coupon code already exists");
                    ServiceError::from(CoreError::conflict(format!("Coupon code {} already exists", new.code)))
                }
                other => other.into(),
            })?;
        tx.commit().await?;

        info!(coupon_id = coupon.id, code = %coupon.code, discount_id = coupon.discount_id, "Coupon created");

        Ok(coupon)
    }

    pub async fn set_coupon_active(&self, id: i64, active: bool) -> ServiceResult<()> {
        let mut tx = self.db.begin_write().await?;
        discount::set_coupon_active(&mut *tx, id, active).await?;
        tx.commit().await?;

        info!(coupon_id = id, active, "Coupon toggled");
        Ok(())
    }

    /// Coupons with their redemption counts, optionally for one discount.
    pub async fn list_coupons(&self, discount_id: Option<i64>) -> ServiceResult<Vec<CouponUsage>> {
        Ok(self.db.discounts().list_coupons(discount_id).await?)
    }

    pub async fn get_discount(&self, id: i64) -> ServiceResult<Discount> {
        let found = self
            .db
            .discounts()
            .get_discount(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Discount", id))?;
        Ok(found)
    }
}
