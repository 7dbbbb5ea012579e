//! # Inventory Service
//!
//! Manual stock adjustments and stock reads.
//!
//! ## Adjustment
//! ```text
//! adjust_stock(product, delta, note?, created_by?)
//!      │
//!      ├── delta == 0          → VALIDATION_ERROR (before BEGIN)
//!      ▼
//! BEGIN
//!   find_snapshot             → NOT_FOUND("Inventory") when missing
//!   insert_adjustment         → stock_adjustments row
//!   ledger::append            → ADJUSTMENT, ref = adjustment id, reason = note
//!   apply_delta               → no sufficiency check, may go negative
//! COMMIT
//! ```

use std::sync::Arc;
use tracing::info;

use crate::error::ServiceResult;
use crate::pool::Database;
use crate::repository::inventory;
use crate::repository::ledger::{self, LedgerAppend};
use till_core::validation::{validate_note, validate_stock_delta};
use till_core::{
    Clock, CoreError, InventorySnapshot, LedgerRefType, StockAdjustment, StockLedgerEntry,
    SYSTEM_USER_ID,
};

/// Inventory operations. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InventoryService {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl InventoryService {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        InventoryService { db, clock }
    }

    /// Applies a signed manual correction and returns the new snapshot.
    pub async fn adjust_stock(
        &self,
        product_id: i64,
        delta: i64,
        note: Option<&str>,
        created_by: Option<i64>,
    ) -> ServiceResult<InventorySnapshot> {
        validate_stock_delta(delta)?;
        let note = validate_note(note)?;
        let created_by = created_by.unwrap_or(SYSTEM_USER_ID);
        let now = self.clock.now();

        let mut tx = self.db.begin_write().await?;

        let mut snapshot = inventory::find_snapshot(&mut *tx, product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Inventory", product_id))?;

        let adjustment =
            inventory::insert_adjustment(&mut *tx, product_id, delta, note.as_deref(), created_by, now)
                .await?;

        ledger::append(
            &mut *tx,
            LedgerAppend {
                product_id,
                ref_type: LedgerRefType::Adjustment,
                ref_id: adjustment.id,
                delta,
                reason: note.as_deref(),
            },
            now,
        )
        .await?;

        snapshot.quantity_on_hand = inventory::apply_delta(&mut *tx, product_id, delta, now).await?;
        snapshot.updated_at = now;

        tx.commit().await?;

        info!(
            product_id,
            delta,
            on_hand = snapshot.quantity_on_hand,
            adjustment_id = adjustment.id,
            created_by,
            "Stock adjusted"
        );

        Ok(snapshot)
    }

    /// Current snapshot of one product.
    pub async fn snapshot(&self, product_id: i64) -> ServiceResult<InventorySnapshot> {
        let snapshot = self
            .db
            .inventory()
            .get_snapshot(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Inventory", product_id))?;
        Ok(snapshot)
    }

    pub async fn list_snapshots(&self) -> ServiceResult<Vec<InventorySnapshot>> {
        Ok(self.db.inventory().list_snapshots().await?)
    }

    /// Ledger of one product, oldest first.
    pub async fn ledger_for_product(&self, product_id: i64) -> ServiceResult<Vec<StockLedgerEntry>> {
        Ok(self.db.inventory().ledger_for_product(product_id).await?)
    }

    pub async fn adjustments_for_product(&self, product_id: i64) -> ServiceResult<Vec<StockAdjustment>> {
        Ok(self.db.inventory().adjustments_for_product(product_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::service::testing::{Fixture, CASHIER};
    use till_core::{ErrorCode, LedgerRefType};

    #[tokio::test]
    async fn test_adjustment_writes_ledger_with_adjustment_ref() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 0).await;

        let snapshot = fx
            .inventory
            .adjust_stock(cola.id, 12, Some("  Delivery #88 "), Some(CASHIER))
            .await
            .unwrap();
        assert_eq!(snapshot.quantity_on_hand, 12);

        let adjustments = fx.inventory.adjustments_for_product(cola.id).await.unwrap();
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].note.as_deref(), Some("Delivery #88"));
        assert_eq!(adjustments[0].created_by, CASHIER);

        let entries = fx.inventory.ledger_for_product(cola.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ref_type, LedgerRefType::Adjustment);
        assert_eq!(entries[0].ref_id, adjustments[0].id);
        assert_eq!(entries[0].delta, 12);
        assert_eq!(entries[0].reason.as_deref(), Some("Delivery #88"));
    }

    #[tokio::test]
    async fn test_negative_adjustment_may_go_below_zero() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 2).await;

        let snapshot = fx.inventory.adjust_stock(cola.id, -5, None, None).await.unwrap();
        assert_eq!(snapshot.quantity_on_hand, -3);

        let entries = fx.inventory.ledger_for_product(cola.id).await.unwrap();
        assert_eq!(entries.iter().map(|e| e.delta).sum::<i64>(), -3);
        assert_eq!(entries[1].reason, None);

        let adjustments = fx.inventory.adjustments_for_product(cola.id).await.unwrap();
        assert_eq!(adjustments[1].created_by, 0);
    }

    #[tokio::test]
    async fn test_adjustment_rejections() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 2).await;

        let err = fx.inventory.adjust_stock(cola.id, 0, None, None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = fx.inventory.adjust_stock(9999, 1, None, None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let long_note = "x".repeat(501);
        let err = fx
            .inventory
            .adjust_stock(cola.id, 1, Some(&long_note), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        assert_eq!(fx.on_hand(cola.id).await, 2);
        assert_eq!(fx.inventory.ledger_for_product(cola.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_matches_ledger_sum() {
        let fx = Fixture::new().await;
        let cola = fx.product("Cola", 150, 10).await;
        let order_id = fx.order().await;
        fx.orders.add_line(order_id, cola.id, 4).await.unwrap();
        fx.orders.pay(order_id, CASHIER).await.unwrap();
        fx.inventory.adjust_stock(cola.id, -1, Some("Broken"), None).await.unwrap();

        let entries = fx.inventory.ledger_for_product(cola.id).await.unwrap();
        let sum: i64 = entries.iter().map(|e| e.delta).sum();
        assert_eq!(sum, fx.on_hand(cola.id).await);
        assert_eq!(sum, 5);

        let snapshots = fx.inventory.list_snapshots().await.unwrap();
        assert_eq!(snapshots.len(), 1);
    }
}
