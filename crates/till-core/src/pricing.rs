//! # Order Pricing Recalculator
//!
//! Re-prices every line of an order and rolls the totals up.
//!
//! ## Where It Runs
//! ```text
//! add_line ─────┐
//! update_line ──┤
//! remove_line ──┤                               ┌──► persist lines
//! apply_coupon ─┼──► recalculate(order, lines) ─┤
//! remove_coupon ┤                               └──► persist totals
//! pay ──────────┘          (inside the same transaction, before commit)
//! ```
//!
//! ## Invariants
//! - `line_total = base - line_discount`, `0 ≤ line_discount ≤ base`
//! - `subtotal = Σ base`, `discount_total = Σ line_discount`
//! - `tax_total = 0`
//! - `grand_total = max(0, subtotal - discount_total + tax_total)`
//!
//! Running it twice with the same catalog and clock gives the same result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::discount::{best_discount_for_line, DiscountCatalog, LineContext};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Order, OrderLine, Product};

/// Totals produced by one pricing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingSummary {
    pub subtotal: Money,
    pub discount_total: Money,
    pub tax_total: Money,
    pub grand_total: Money,
    pub line_count: usize,
}

/// Re-prices `lines` and writes totals onto `order`. In memory only.
///
/// ## Arguments
/// * `products` - Catalog rows for every product on the order, keyed by id
/// * `has_coupon` - Whether the order carries a coupon redemption
/// * `now` - Instant used for discount windows and `updated_at`
///
/// ## Errors
/// `NotFound` when a line's product is missing from `products`. Nothing is
/// modified in that case.
pub fn recalculate(
    order: &mut Order,
    lines: &mut [OrderLine],
    products: &HashMap<i64, Product>,
    catalog: &DiscountCatalog,
    has_coupon: bool,
    now: DateTime<Utc>,
) -> CoreResult<PricingSummary> {
    // Resolve everything first so a missing product leaves the order untouched
    let contexts = lines
        .iter()
        .map(|line| {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| CoreError::not_found("Product", line.product_id))?;
            Ok(LineContext {
                product_id: line.product_id,
                category_id: product.category_id,
                unit_price: line.unit_price(),
                quantity: line.quantity,
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;

    let mut subtotal = Money::zero();
    let mut discount_total = Money::zero();

    for (line, ctx) in lines.iter_mut().zip(&contexts) {
        let base = ctx.base();
        let chosen = best_discount_for_line(catalog, ctx, has_coupon, now);

        line.line_discount_cents = chosen.amount.cents();
        line.line_total_cents = (base - chosen.amount).cents();
        line.discount_id = chosen.discount_id;

        subtotal += base;
        discount_total += chosen.amount;
    }

    let tax_total = Money::zero();
    let grand_total = (subtotal - discount_total + tax_total).max(Money::zero());

    order.subtotal_cents = subtotal.cents();
    order.discount_total_cents = discount_total.cents();
    order.tax_total_cents = tax_total.cents();
    order.grand_total_cents = grand_total.cents();
    order.updated_at = now;

    Ok(PricingSummary {
        subtotal,
        discount_total,
        tax_total,
        grand_total,
        line_count: lines.len(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
