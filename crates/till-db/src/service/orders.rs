//! # Order Service
//!
//! Order creation, line edits, coupons and order reads. Payment and voiding
//! live in [`super::fulfillment`].
//!
//! ## Edit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POS screen                                                            │
//! │       │                                                                 │
//! │       │  add_line(order_id, product_id, qty)                           │
//! │       ▼                                                                 │
//! │  validate_quantity(qty)          ← rejected before any I/O             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │  lock_order → fetch_order → ensure_mutable                             │
//! │  find_product (active)   → insert_line (name + price snapshot)         │
//! │  reprice                 → every line, every live discount             │
//! │  COMMIT                                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PricedOrder { order, lines }                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{DbError, ServiceError, ServiceResult};
use crate::pool::Database;
use crate::repository::{catalog, discount, order, redemption};
use crate::service::reprice;
use till_core::validation::{validate_coupon_code, validate_quantity};
use till_core::{
    ensure_mutable, Clock, CoreError, Order, OrderDetails, OrderFilter, OrderSummary, Page,
    PricedOrder, ValidationError,
};

/// Order operations. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OrderService {
    pub(crate) db: Database,
    pub(crate) clock: Arc<dyn Clock>,
}

impl OrderService {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        OrderService { db, clock }
    }

    /// Creates an empty Unpaid order and returns its id.
    ///
    /// ## Errors
    /// `Conflict` when another order was created in the same millisecond.
    pub async fn create_order(&self, customer_id: Option<i64>) -> ServiceResult<i64> {
        let now = self.clock.now();
        let order_number = Order::number_for(now);

        let mut tx = self.db.begin_write().await?;
        let order = order::insert_order(&mut *tx, &order_number, customer_id, now)
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation { .. } => ServiceError::from(CoreError::conflict(format!(
                    "Order number {order_number} already exists"
                ))),
                other => other.into(),
            })?;
        tx.commit().await?;

        info!(order_id = order.id, order_number = %order.order_number, ?customer_id, "Order created");

        Ok(order.id)
    }

    /// Adds a new line. The same product added twice gives two lines.
    pub async fn add_line(&self, order_id: i64, product_id: i64, quantity: i64) -> ServiceResult<PricedOrder> {
        validate_quantity(quantity)?;
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        let mut order = open_for_edit(&mut tx, order_id, "add lines").await?;

        let product = catalog::find_product(&mut *tx, product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;

        let line_id = order::insert_line(&mut *tx, order_id, &product, quantity).await?;
        let (lines, summary) = reprice(&mut *tx, &mut order, now).await?;
        tx.commit().await?;

        info!(
            order_id,
            line_id,
            product_id,
            quantity,
            grand_total = %summary.grand_total,
            "Line added"
        );

        Ok(PricedOrder { order, lines })
    }

    /// Sets the quantity of an existing line.
    pub async fn update_line(&self, order_id: i64, line_id: i64, quantity: i64) -> ServiceResult<PricedOrder> {
        validate_quantity(quantity)?;
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        let mut order = open_for_edit(&mut tx, order_id, "update lines").await?;

        order::find_line(&mut *tx, order_id, line_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order line", line_id))?;

        order::update_line_quantity(&mut *tx, line_id, quantity).await?;
        let (lines, summary) = reprice(&mut *tx, &mut order, now).await?;
        tx.commit().await?;

        info!(order_id, line_id, quantity, grand_total = %summary.grand_total, "Line updated");

        Ok(PricedOrder { order, lines })
    }

    /// Removes a line and re-prices what is left.
    pub async fn remove_line(&self, order_id: i64, line_id: i64) -> ServiceResult<PricedOrder> {
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        let mut order = open_for_edit(&mut tx, order_id, "remove lines").await?;

        if !order::delete_line(&mut *tx, order_id, line_id).await? {
            return Err(CoreError::not_found("Order line", line_id).into());
        }

        let (lines, summary) = reprice(&mut *tx, &mut order, now).await?;
        tx.commit().await?;

        info!(order_id, line_id, grand_total = %summary.grand_total, "Line removed");

        Ok(PricedOrder { order, lines })
    }

    /// Redeems a coupon code on an order.
    ///
    /// ## Checks (in order)
    /// ```text
    /// blank code                        → VALIDATION_ERROR  (before BEGIN)
    /// order not Unpaid                  → INVALID_STATE
    /// order already has a coupon        → CONFLICT
    /// unknown code                      → NOT_FOUND
    /// coupon or discount inactive       → VALIDATION_ERROR
    /// outside the discount window       → VALIDATION_ERROR
    /// total cap reached                 → CONFLICT
    /// per-customer cap reached          → CONFLICT
    /// ```
    ///
    /// The per-customer cap counts redemptions by `customer_id`, falling back
    /// to the order's customer. With neither, only the total cap applies.
    pub async fn apply_coupon(
        &self,
        order_id: i64,
        code: &str,
        customer_id: Option<i64>,
    ) -> ServiceResult<PricedOrder> {
        let code = validate_coupon_code(code)?;
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        let mut order = open_for_edit(&mut tx, order_id, "apply a coupon").await?;

        if redemption::find_for_order(&mut *tx, order_id).await?.is_some() {
            warn!(order_id, code = %code, "Order already has a coupon");
            return Err(CoreError::conflict(format!("Order {order_id} already has a coupon")).into());
        }

        let coupon = discount::find_coupon_by_code(&mut *tx, &code)
            .await?
            .ok_or_else(|| CoreError::not_found("Coupon", &code))?;

        if !coupon.is_active {
            return Err(inactive("Coupon"));
        }

        let promotion = discount::fetch_discount(&mut *tx, coupon.discount_id).await?;
        if !promotion.is_active {
            return Err(inactive("Discount"));
        }
        if promotion.starts_at.is_some_and(|start| now < start) {
            return Err(ValidationError::NotYetValid {
                entity: "Coupon".to_string(),
            }
            .into());
        }
        if promotion.ends_at.is_some_and(|end| now > end) {
            return Err(ValidationError::Expired {
                entity: "Coupon".to_string(),
            }
            .into());
        }

        if let Some(limit) = coupon.usage_limit_total {
            let used = redemption::count_for_coupon(&mut *tx, coupon.id).await?;
            if used >= limit {
                warn!(coupon_id = coupon.id, used, limit, "Coupon usage limit reached");
                return Err(CoreError::conflict(format!("Coupon {code} has reached its usage limit")).into());
            }
        }

        let customer_id = customer_id.or(order.customer_id);
        if let (Some(limit), Some(customer)) = (coupon.usage_limit_per_customer, customer_id) {
            let used = redemption::count_for_customer(&mut *tx, coupon.id, customer).await?;
            if used >= limit {
                warn!(coupon_id = coupon.id, customer_id = customer, used, limit, "Per-customer coupon limit reached");
                return Err(CoreError::conflict(format!(
                    "Coupon {code} has reached its limit for customer {customer}"
                ))
                .into());
            }
        }

        redemption::insert_redemption(&mut *tx, coupon.id, order_id, customer_id, now).await?;
        let (lines, summary) = reprice(&mut *tx, &mut order, now).await?;
        tx.commit().await?;

        info!(
            order_id,
            coupon_id = coupon.id,
            ?customer_id,
            discount_total = %summary.discount_total,
            "Coupon applied"
        );

        Ok(PricedOrder { order, lines })
    }

    /// Drops the order's coupon and re-prices.
    pub async fn remove_coupon(&self, order_id: i64) -> ServiceResult<PricedOrder> {
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        let mut order = open_for_edit(&mut tx, order_id, "remove a coupon").await?;

        if !redemption::delete_for_order(&mut *tx, order_id).await? {
            return Err(CoreError::not_found("Coupon redemption", order_id).into());
        }

        let (lines, summary) = reprice(&mut *tx, &mut order, now).await?;
        tx.commit().await?;

        info!(order_id, grand_total = %summary.grand_total, "Coupon removed");

        Ok(PricedOrder { order, lines })
    }

    /// Order with lines, status history and redeemed coupon code.
    pub async fn get_order(&self, order_id: i64) -> ServiceResult<OrderDetails> {
        let mut conn = self.db.pool().acquire().await?;

        let order = order::fetch_order(&mut conn, order_id).await?;
        let lines = order::lines_for_order(&mut conn, order_id).await?;
        let history = order::history_for_order(&mut conn, order_id).await?;
        let coupon_code = redemption::coupon_code_for_order(&mut conn, order_id).await?;

        Ok(OrderDetails {
            order,
            lines,
            coupon_code,
            history,
        })
    }

    /// One page of orders, newest first.
    pub async fn list_orders(&self, filter: OrderFilter) -> ServiceResult<Page<OrderSummary>> {
        Ok(self.db.orders().list(&filter).await?)
    }
}

/// Locks the order and checks that it still accepts edits.
pub(crate) async fn open_for_edit(
    conn: &mut SqliteConnection,
    order_id: i64,
    operation: &str,
) -> ServiceResult<Order> {
    order::lock_order(conn, order_id).await?;
    let order = order::fetch_order(conn, order_id).await?;

    if let Err(e) = ensure_mutable(&order, operation) {
        warn!(order_id, status = %order.status, operation, "Rejected edit of closed order");
        return Err(e.into());
    }

    Ok(order)
}

fn inactive(entity: &str) -> ServiceError {
    ValidationError::Inactive {
        entity: entity.to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================
