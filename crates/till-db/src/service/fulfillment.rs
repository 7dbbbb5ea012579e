//! # Fulfillment Transaction
//!
//! Paying and voiding orders.
//!
//! ## Pay
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │   1. lock_order, fetch_order, lines_for_order                          │
//! │   2. ensure_payable             Unpaid and at least one line           │
//! │   3. reprice                    with the discounts live right now      │
//! │   4. plan_stock_debits          one debit per product (summed)         │
//! │   5. on_hand_for + check_availability                                  │
//! │                                 nothing written yet if stock is short  │
//! │   6. debit_snapshot × products  UPDATE … WHERE on_hand >= qty          │
//! │   7. ledger::append × lines     ORDER, -quantity, "Order paid"         │
//! │   8. set_status Unpaid → Paid   UPDATE … WHERE status = 'unpaid'       │
//! │   9. insert_status_history                                             │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any `?` before COMMIT drops the transaction: order, totals, stock     │
//! │  and ledger stay exactly as they were.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Voiding only flips the status and records history. It has no inventory
//! effect and is only possible from Unpaid.

use tracing::{info, warn};

use crate::error::ServiceResult;
use crate::repository::inventory;
use crate::repository::ledger::{self, LedgerAppend};
use crate::repository::order;
use crate::service::orders::OrderService;
use crate::service::reprice;
use till_core::{
    check_availability, ensure_payable, plan_stock_debits, transition, CoreError, LedgerRefType,
    Order, OrderEvent, PricedOrder, LEDGER_REASON_ORDER_PAID, SYSTEM_USER_ID,
};

impl OrderService {
    /// Pays an order: re-price, debit stock, write the ledger, flip to Paid.
    ///
    /// ## Errors
    /// - `INVALID_STATE` when the order is not Unpaid or has no lines
    /// - `NOT_FOUND` when a product has no inventory snapshot
    /// - `INSUFFICIENT_STOCK` naming the first product that is short
    pub async fn pay(&self, order_id: i64, changed_by: i64) -> ServiceResult<PricedOrder> {
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;
        order::lock_order(&mut *tx, order_id).await?;
        let mut order = order::fetch_order(&mut *tx, order_id).await?;
        let current = order::lines_for_order(&mut *tx, order_id).await?;

        if let Err(e) = ensure_payable(&order, current.len()) {
            warn!(order_id, status = %order.status, lines = current.len(), "Order cannot be paid");
            return Err(e.into());
        }

        let (lines, summary) = reprice(&mut *tx, &mut order, now).await?;

        let debits = plan_stock_debits(&lines);
        let product_ids: Vec<i64> = debits.iter().map(|d| d.product_id).collect();
        let on_hand = inventory::on_hand_for(&mut *tx, &product_ids).await?;

        if let Err(e) = check_availability(&debits, &on_hand) {
            warn!(order_id, error = %e, "Payment rejected");
            return Err(e.into());
        }

        for debit in &debits {
            if !inventory::debit_snapshot(&mut *tx, debit.product_id, debit.quantity, now).await? {
                // Only reachable if stock moved after the availability check
                let available = inventory::on_hand_for(&mut *tx, &[debit.product_id])
                    .await?
                    .get(&debit.product_id)
                    .copied()
                    .unwrap_or(0);
                warn!(order_id, product_id = debit.product_id, available, "Stock debit lost a race");
                return Err(CoreError::InsufficientStock {
                    product_id: debit.product_id,
                    available,
                    requested: debit.quantity,
                }
                .into());
            }
        }

        for line in &lines {
            ledger::append(
                &mut *tx,
                LedgerAppend {
                    product_id: line.product_id,
                    ref_type: LedgerRefType::Order,
                    ref_id: order_id,
                    delta: -line.quantity,
                    reason: Some(LEDGER_REASON_ORDER_PAID),
                },
                now,
            )
            .await?;
        }

        let from = order.status;
        let to = transition(&order, OrderEvent::Pay)?;
        if !order::set_status(&mut *tx, order_id, from, to, now).await? {
            return Err(CoreError::invalid_state(order_id, from, "pay").into());
        }
        order::insert_status_history(&mut *tx, order_id, from, to, changed_by, now).await?;

        tx.commit().await?;

        order.status = to;
        order.updated_at = now;

        info!(
            order_id,
            order_number = %order.order_number,
            grand_total = %summary.grand_total,
            products = debits.len(),
            changed_by,
            "Order paid"
        );

        Ok(PricedOrder { order, lines })
    }

    /// Voids an Unpaid order. Stock is not touched.
    pub async fn void(&self, order_id: i64, changed_by: Option<i64>) -> ServiceResult<Order> {
        let now = self.clock.now();
        let changed_by = changed_by.unwrap_or(SYSTEM_USER_ID);

        let mut tx = self.db.begin_write().await?;
        order::lock_order(&mut *tx, order_id).await?;
        let mut order = order::fetch_order(&mut *tx, order_id).await?;

        let from = order.status;
        let to = match transition(&order, OrderEvent::Void) {
            Ok(to) => to,
            Err(e) => {
                warn!(order_id, status = %from, "Order cannot be voided");
                return Err(e.into());
            }
        };

        if !order::set_status(&mut *tx, order_id, from, to, now).await? {
            return Err(CoreError::invalid_state(order_id, from, "void").into());
        }
        order::insert_status_history(&mut *tx, order_id, from, to, changed_by, now).await?;

        tx.commit().await?;

        order.status = to;
        order.updated_at = now;

        info!(order_id, order_number = %order.order_number, changed_by, "Order voided");

        Ok(order)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::DbConfig;
    use crate::repository::ledger;
    use crate::service::testing::{Fixture, CASHIER};
    use till_core::{DiscountScope, DiscountType, ErrorCode, LedgerRefType, NewProduct, OrderStatus};

    #[tokio::test]
    async fn test_pay_debits_stock_and_writes_ledger() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 10).await;
        let chips = fx.product("Chips", 250, 4).await;
        let order_id = fx.order().await;
        fx.orders.add_line(order_id, cola.id, 3).await.unwrap();
        fx.orders.add_line(order_id, chips.id, 4).await.unwrap();

        let paid = fx.orders.pay(order_id, CASHIER).await.unwrap();
        assert_eq!(paid.order.status, OrderStatus::Paid);
        assert_eq!(paid.order.grand_total_cents, 1450);

        assert_eq!(fx.on_hand(cola.id).await, 7);
        assert_eq!(fx.on_hand(chips.id).await, 0);

        let mut conn = fx.db.pool().acquire().await.unwrap();
        let entries = ledger::entries_for_ref(&mut conn, LedgerRefType::Order, order_id)
            .await
            .unwrap();
        drop(conn);
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].product_id, entries[0].delta), (cola.id, -3));
        assert_eq!((entries[1].product_id, entries[1].delta), (chips.id, -4));
        assert!(entries.iter().all(|e| e.reason.as_deref() == Some("Order paid")));

        let details = fx.orders.get_order(order_id).await.unwrap();
        assert_eq!(details.history.len(), 1);
        assert_eq!(details.history[0].from_status, OrderStatus::Unpaid);
        assert_eq!(details.history[0].to_status, OrderStatus::Paid);
        assert_eq!(details.history[0].changed_by, CASHIER);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 3).await;
        let order_id = fx.order().await;
        fx.orders.add_line(order_id, cola.id, 5).await.unwrap();

        let err = fx.orders.pay(order_id, CASHIER).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);

        assert_eq!(fx.on_hand(cola.id).await, 3);
        let details = fx.orders.get_order(order_id).await.unwrap();
        assert_eq!(details.order.status, OrderStatus::Unpaid);
        assert!(details.history.is_empty());

        // Only the initial adjustment is on the ledger
        let entries = fx.inventory.ledger_for_product(cola.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ref_type, LedgerRefType::Adjustment);
    }

    #[tokio::test]
    async fn test_lines_of_one_product_are_summed() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 4).await;
        let order_id = fx.order().await;
        fx.orders.add_line(order_id, cola.id, 2).await.unwrap();
        fx.orders.add_line(order_id, cola.id, 3).await.unwrap();

        let err = fx.orders.pay(order_id, CASHIER).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);
        assert_eq!(fx.on_hand(cola.id).await, 4);

        fx.inventory.adjust_stock(cola.id, 1, None, None).await.unwrap();
        fx.orders.pay(order_id, CASHIER).await.unwrap();
        assert_eq!(fx.on_hand(cola.id).await, 0);
    }

    #[tokio::test]
    async fn test_pay_without_snapshot_is_not_found() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 3).await;
        let order_id = fx.order().await;
        fx.orders.add_line(order_id, cola.id, 1).await.unwrap();

        sqlx::query("DELETE FROM inventory_items WHERE product_id = ?1")
            .bind(cola.id)
            .execute(fx.db.pool())
            .await
            .unwrap();

        let err = fx.orders.pay(order_id, CASHIER).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_empty_order_cannot_be_paid() {
        let fx = Fixture::new().await;
        let order_id = fx.order().await;

        let err = fx.orders.pay(order_id, CASHIER).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[tokio::test]
    async fn test_pay_reprices_with_current_discounts() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 1000, 10).await;
        let order_id = fx.order().await;
        let priced = fx.orders.add_line(order_id, cola.id, 2).await.unwrap();
        assert_eq!(priced.order.grand_total_cents, 2000);

        fx.discount(DiscountType::Percent, 2500, DiscountScope::Global, 0).await;

        let paid = fx.orders.pay(order_id, CASHIER).await.unwrap();
        assert_eq!(paid.order.discount_total_cents, 500);
        assert_eq!(paid.order.grand_total_cents, 1500);

        let details = fx.orders.get_order(order_id).await.unwrap();
        assert_eq!(details.order.grand_total_cents, 1500);
        assert_eq!(details.lines[0].line_total_cents, 1500);
    }

    #[tokio::test]
    async fn test_terminal_orders_are_read_only() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 10).await;
        fx.coupon("SAVE20", 2000, None, None).await;

        let paid = fx.order().await;
        let line_id = fx.orders.add_line(paid, cola.id, 1).await.unwrap().lines[0].id;
        fx.orders.pay(paid, CASHIER).await.unwrap();

        let voided = fx.order().await;
        fx.orders.void(voided, None).await.unwrap();

        for order_id in [paid, voided] {
            let before = fx.orders.get_order(order_id).await.unwrap();

            let errors = vec![
                fx.orders.add_line(order_id, cola.id, 1).await.unwrap_err(),
                fx.orders.update_line(order_id, line_id, 2).await.unwrap_err(),
                fx.orders.remove_line(order_id, line_id).await.unwrap_err(),
                fx.orders.apply_coupon(order_id, "SAVE20", None).await.unwrap_err(),
                fx.orders.remove_coupon(order_id).await.unwrap_err(),
                fx.orders.pay(order_id, CASHIER).await.unwrap_err(),
                fx.orders.void(order_id, None).await.unwrap_err(),
            ];
            assert!(errors.iter().all(|e| e.code() == ErrorCode::InvalidState));

            let after = fx.orders.get_order(order_id).await.unwrap();
            assert_eq!(before.order.status, after.order.status);
            assert_eq!(before.order.grand_total_cents, after.order.grand_total_cents);
            assert_eq!(before.lines.len(), after.lines.len());
            assert_eq!(before.history.len(), after.history.len());
        }

        assert_eq!(fx.on_hand(cola.id).await, 9);
    }

    #[tokio::test]
    async fn test_void_leaves_stock_alone() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 10).await;
        let order_id = fx.order().await;
        fx.orders.add_line(order_id, cola.id, 4).await.unwrap();

        let order = fx.orders.void(order_id, None).await.unwrap();
        assert_eq!(order.status, OrderStatus::Voided);

        assert_eq!(fx.on_hand(cola.id).await, 10);
        let entries = fx.inventory.ledger_for_product(cola.id).await.unwrap();
        assert_eq!(entries.len(), 1);

        let details = fx.orders.get_order(order_id).await.unwrap();
        assert_eq!(details.history.len(), 1);
        assert_eq!(details.history[0].to_status, OrderStatus::Voided);
        assert_eq!(details.history[0].changed_by, 0);
    }

    #[tokio::test]
    async fn test_last_unit_goes_to_one_payment() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 1).await;
        let first = fx.order().await;
        let second = fx.order().await;
        fx.orders.add_line(first, cola.id, 1).await.unwrap();
        fx.orders.add_line(second, cola.id, 1).await.unwrap();

        let (a, b) = tokio::join!(fx.orders.pay(first, CASHIER), fx.orders.pay(second, CASHIER));

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        assert_eq!(loser.code(), ErrorCode::InsufficientStock);
        assert_eq!(fx.on_hand(cola.id).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_wait_for_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let fx = Fixture::with_config(DbConfig::new(dir.path().join("till.db")).max_connections(5)).await;
        let cola = fx.product("Cola", 150, 100).await;
        let promo = fx.discount(DiscountType::Percent, 500, DiscountScope::Product, 0).await;

        for round in 0..20 {
            let order_id = fx.order().await;
            fx.orders.add_line(order_id, cola.id, 1).await.unwrap();

            let new_product = NewProduct {
                category_id: fx.category.id,
                name: format!("Batch {round}"),
                description: None,
                unit_price_cents: 100,
            };
            let (up, paid, down, created, linked) = tokio::join!(
                fx.inventory.adjust_stock(cola.id, 1, Some("recount"), None),
                fx.orders.pay(order_id, CASHIER),
                fx.inventory.adjust_stock(cola.id, -1, Some("recount"), None),
                fx.catalog.create_product(new_product, CASHIER),
                fx.discounts.link_product(promo.id, cola.id),
            );

            up.unwrap();
            paid.unwrap();
            down.unwrap();
            created.unwrap();
            linked.unwrap();
        }

        assert_eq!(fx.on_hand(cola.id).await, 80);
        let entries = fx.inventory.ledger_for_product(cola.id).await.unwrap();
        let total: i64 = entries.iter().map(|e| e.delta).sum();
        assert_eq!(total, 80);
    }

    #[tokio::test]
    async fn test_ledger_and_history_are_append_only() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 5).await;
        let order_id = fx.order().await;
        fx.orders.add_line(order_id, cola.id, 1).await.unwrap();
        fx.orders.pay(order_id, CASHIER).await.unwrap();

        for sql in [
            "UPDATE stock_ledger SET delta = 0",
            "DELETE FROM stock_ledger",
            "UPDATE order_status_history SET changed_by = 1",
            "DELETE FROM order_status_history",
        ] {
            assert!(sqlx::query(sql).execute(fx.db.pool()).await.is_err(), "{sql}");
        }

        let entries = fx.inventory.ledger_for_product(cola.id).await.unwrap();
        assert_eq!(entries.len(), 2);
    }
}
