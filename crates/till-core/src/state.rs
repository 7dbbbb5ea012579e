//! # Order State Machine
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            ┌──────── Pay ────────►  Paid    (terminal)                 │
//! │   Unpaid ──┤                                                            │
//! │            └──────── Void ───────►  Voided  (terminal)                 │
//! │                                                                         │
//! │   Lines and coupons can only change while Unpaid.                      │
//! │   Every other event/state pair is InvalidState and nothing changes.    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{Order, OrderStatus};

/// Events that move an order out of Unpaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    Pay,
    Void,
}

impl OrderEvent {
    fn operation(&self) -> &'static str {
        match self {
            OrderEvent::Pay => "pay",
            OrderEvent::Void => "void",
        }
    }
}

/// Returns the status `order` moves to on `event`.
pub fn transition(order: &Order, event: OrderEvent) -> CoreResult<OrderStatus> {
    match (order.status, event) {
        (OrderStatus::Unpaid, OrderEvent::Pay) => Ok(OrderStatus::Paid),
        (OrderStatus::Unpaid, OrderEvent::Void) => Ok(OrderStatus::Voided),
        (status, event) => Err(CoreError::invalid_state(order.id, status, event.operation())),
    }
}

/// Guard for line and coupon mutations.
pub fn ensure_mutable(order: &Order, operation: &str) -> CoreResult<()> {
    if order.status == OrderStatus::Unpaid {
        Ok(())
    } else {
        Err(CoreError::invalid_state(order.id, order.status, operation))
    }
}

/// Guard for payment: Unpaid with at least one line.
pub fn ensure_payable(order: &Order, line_count: usize) -> CoreResult<()> {
    transition(order, OrderEvent::Pay)?;
    if line_count == 0 {
        return Err(CoreError::EmptyOrder { order_id: order.id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: 9,
            order_number: "ORD-1".to_string(),
            customer_id: None,
            status,
            subtotal_cents: 0,
            discount_total_cents: 0,
            tax_total_cents: 0,
            grand_total_cents: 0,
            is_active: true,
            row_version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_unpaid_transitions() {
        let unpaid = order(OrderStatus::Unpaid);
        assert_eq!(transition(&unpaid, OrderEvent::Pay).unwrap(), OrderStatus::Paid);
        assert_eq!(transition(&unpaid, OrderEvent::Void).unwrap(), OrderStatus::Voided);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for status in [OrderStatus::Paid, OrderStatus::Voided] {
            let o = order(status);
            for event in [OrderEvent::Pay, OrderEvent::Void] {
                let err = transition(&o, event).unwrap_err();
                assert!(matches!(err, CoreError::InvalidState { order_id: 9, .. }));
            }
            assert!(ensure_mutable(&o, "add line").is_err());
        }
    }

    #[test]
    fn test_ensure_payable() {
        let unpaid = order(OrderStatus::Unpaid);
        assert!(ensure_payable(&unpaid, 1).is_ok());
        assert!(matches!(
            ensure_payable(&unpaid, 0),
            Err(CoreError::EmptyOrder { order_id: 9 })
        ));
        // Status is checked before emptiness
        assert!(matches!(
            ensure_payable(&order(OrderStatus::Paid), 0),
            Err(CoreError::InvalidState { .. })
        ));
    }
}
