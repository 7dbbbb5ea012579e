//! Shared fixture for service tests: an in-memory database, a manual clock
//! and one of each service.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use crate::pool::{Database, DbConfig};
use crate::service::catalog::CatalogService;
use crate::service::discounts::DiscountService;
use crate::service::inventory::InventoryService;
use crate::service::orders::OrderService;
use till_core::{
    Category, Clock, Coupon, Discount, DiscountScope, DiscountType, ManualClock, NewCategory,
    NewCoupon, NewDiscount, NewProduct, Product,
};

pub(crate) const CASHIER: i64 = 42;

pub(crate) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub(crate) struct Fixture {
    pub db: Database,
    pub clock: Arc<ManualClock>,
    pub orders: OrderService,
    pub inventory: InventoryService,
    pub catalog: CatalogService,
    pub discounts: DiscountService,
    pub category: Category,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(DbConfig::in_memory()).await
    }

    /// Fixture over a file database, for tests that need real connection
    /// concurrency.
    pub async fn with_config(config: DbConfig) -> Self {
        let db = Database::new(config).await.unwrap();
        let clock = Arc::new(ManualClock::new(start_time()));
        let shared: Arc<dyn Clock> = clock.clone();

        let orders = OrderService::new(db.clone(), shared.clone());
        let inventory = InventoryService::new(db.clone(), shared.clone());
        let catalog = CatalogService::new(db.clone(), shared.clone());
        let discounts = DiscountService::new(db.clone(), shared);

        let category = catalog
            .create_category(
                NewCategory {
                    name: "Drinks".to_string(),
                    parent_id: None,
                },
                CASHIER,
            )
            .await
            .unwrap();

        Fixture {
            db,
            clock,
            orders,
            inventory,
            catalog,
            discounts,
            category,
        }
    }

    /// Active product in the default category with `stock` units on hand.
    pub async fn product(&self, name: &str, unit_price_cents: i64, stock: i64) -> Product {
        self.product_in(self.category.id, name, unit_price_cents, stock).await
    }

    pub async fn product_in(
        &self,
        category_id: i64,
        name: &str,
        unit_price_cents: i64,
        stock: i64,
    ) -> Product {
        let product = self
            .catalog
            .create_product(
                NewProduct {
                    category_id,
                    name: name.to_string(),
                    description: None,
                    unit_price_cents,
                },
                CASHIER,
            )
            .await
            .unwrap();

        if stock != 0 {
            self.inventory
                .adjust_stock(product.id, stock, Some("Initial count"), Some(CASHIER))
                .await
                .unwrap();
        }

        product
    }

    pub async fn discount(
        &self,
        discount_type: DiscountType,
        value: i64,
        scope: DiscountScope,
        priority: i64,
    ) -> Discount {
        let mut new = NewDiscount::simple(format!("{scope:?} {value}"), discount_type, value, scope);
        new.priority = priority;
        self.discounts.create_discount(new).await.unwrap()
    }

    /// Coupon-scope percent discount plus one code for it.
    pub async fn coupon(
        &self,
        code: &str,
        percent_bps: i64,
        usage_limit_total: Option<i64>,
        usage_limit_per_customer: Option<i64>,
    ) -> Coupon {
        let discount = self
            .discount(DiscountType::Percent, percent_bps, DiscountScope::Coupon, 0)
            .await;

        self.discounts
            .create_coupon(NewCoupon {
                discount_id: discount.id,
                code: code.to_string(),
                usage_limit_total,
                usage_limit_per_customer,
            })
            .await
            .unwrap()
    }

    /// Creates an order a millisecond after the previous one.
    pub async fn order(&self) -> i64 {
        self.order_for(None).await
    }

    pub async fn order_for(&self, customer_id: Option<i64>) -> i64 {
        self.clock.advance(Duration::milliseconds(1));
        self.orders.create_order(customer_id).await.unwrap()
    }

    pub async fn on_hand(&self, product_id: i64) -> i64 {
        self.inventory
            .snapshot(product_id)
            .await
            .unwrap()
            .quantity_on_hand
    }
}
