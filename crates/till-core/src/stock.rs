//! # Stock Debit Planning
//!
//! Works out what a payment takes from inventory before anything is written.
//!
//! ```text
//! lines ──► plan_stock_debits ──► [StockDebit { product, qty }]   (one per product)
//!                                         │
//!            on-hand snapshots ──► check_availability ──► Ok / NotFound / InsufficientStock
//! ```
//!
//! Two lines for the same product are summed, so a basket holding
//! `2 × A` and `3 × A` needs 5 units of A on hand.

use std::collections::{BTreeMap, HashMap};

use crate::error::{CoreError, CoreResult};
use crate::types::OrderLine;

/// Quantity a payment removes from one product's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDebit {
    pub product_id: i64,
    pub quantity: i64,
}

/// Aggregates line quantities per product, ordered by product id.
pub fn plan_stock_debits(lines: &[OrderLine]) -> Vec<StockDebit> {
    let mut totals: BTreeMap<i64, i64> = BTreeMap::new();
    for line in lines {
        *totals.entry(line.product_id).or_insert(0) += line.quantity;
    }

    totals
        .into_iter()
        .map(|(product_id, quantity)| StockDebit {
            product_id,
            quantity,
        })
        .collect()
}

/// Checks every debit against `on_hand` (product id → quantity on hand).
///
/// ## Errors
/// - `NotFound("Inventory")` when a product has no snapshot
/// - `InsufficientStock` on the first product that would go negative
pub fn check_availability(debits: &[StockDebit], on_hand: &HashMap<i64, i64>) -> CoreResult<()> {
    for debit in debits {
        let available = *on_hand
            .get(&debit.product_id)
            .ok_or_else(|| CoreError::not_found("Inventory", debit.product_id))?;

        if available < debit.quantity {
            return Err(CoreError::InsufficientStock {
                product_id: debit.product_id,
                available,
                requested: debit.quantity,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, product_id: i64, quantity: i64) -> OrderLine {
        OrderLine {
            id,
            order_id: 1,
            product_id,
            product_name: "P".to_string(),
            unit_price_cents: 100,
            quantity,
            line_discount_cents: 0,
            line_total_cents: 0,
            discount_id: None,
        }
    }

    #[test]
    fn test_plan_aggregates_per_product() {
        let debits = plan_stock_debits(&[line(1, 7, 2), line(2, 3, 1), line(3, 7, 3)]);
        assert_eq!(
            debits,
            vec![
                StockDebit { product_id: 3, quantity: 1 },
                StockDebit { product_id: 7, quantity: 5 },
            ]
        );
    }

    #[test]
    fn test_check_availability() {
        let debits = vec![StockDebit { product_id: 7, quantity: 5 }];

        let on_hand = HashMap::from([(7, 5)]);
        assert!(check_availability(&debits, &on_hand).is_ok());

        let on_hand = HashMap::from([(7, 4)]);
        let err = check_availability(&debits, &on_hand).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { product_id: 7, available: 4, requested: 5 }
        ));

        let err = check_availability(&debits, &HashMap::new()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
