//! # Discount Selection Engine
//!
//! Picks the single best promotion for one order line.
//!
//! ## Selection Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  best_discount_for_line(catalog, line, has_coupon, now)                │
//! │                                                                         │
//! │  qty ≤ 0 or price ≤ 0 ──────────────────────────────► 0 (no lookup)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. active && starts_at ≤ now ≤ ends_at                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. scope filter                                                       │
//! │     Global   → always                                                  │
//! │     Category → product's category is linked                            │
//! │     Product  → product is linked                                       │
//! │     Coupon   → order carries a coupon redemption                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. amount: Percent → round_half_even(base × bps / 10000)              │
//! │             Amount  → min(value, base)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. winner: larger amount, then lower priority, then first seen        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  5. clamp to [0, base]                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Coupon Scope
//! A Coupon-scope discount applies to every line of any order that has a
//! redemption, whichever coupon was redeemed. Existing receipts were priced
//! this way, so the behavior is kept.
//!
//! Discounts never stack: exactly one wins per line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Discount, DiscountScope};

// =============================================================================
// Catalog
// =============================================================================

/// A discount together with its scope links.
#[derive(Debug, Clone)]
pub struct DiscountRule {
    pub discount: Discount,
    pub category_ids: HashSet<i64>,
    pub product_ids: HashSet<i64>,
}

impl DiscountRule {
    /// A rule without scope links (Global or Coupon scope).
    pub fn unlinked(discount: Discount) -> Self {
        DiscountRule {
            discount,
            category_ids: HashSet::new(),
            product_ids: HashSet::new(),
        }
    }

    fn matches_scope(&self, line: &LineContext, has_coupon: bool) -> bool {
        match self.discount.scope {
            DiscountScope::Global => true,
            DiscountScope::Category => self.category_ids.contains(&line.category_id),
            DiscountScope::Product => self.product_ids.contains(&line.product_id),
            DiscountScope::Coupon => has_coupon,
        }
    }
}

/// Read-only view of the promotions, loaded once per pricing pass.
///
/// Iteration order is load order; it decides exact ties on priority.
#[derive(Debug, Clone, Default)]
pub struct DiscountCatalog {
    rules: Vec<DiscountRule>,
}

impl DiscountCatalog {
    pub fn new(rules: Vec<DiscountRule>) -> Self {
        DiscountCatalog { rules }
    }

    pub fn rules(&self) -> &[DiscountRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules that are switched on and inside their window at `now`.
    pub fn live_at(&self, now: DateTime<Utc>) -> impl Iterator<Item = &DiscountRule> {
        self.rules
            .iter()
            .filter(move |r| r.discount.is_active && r.discount.is_live_at(now))
    }
}

// =============================================================================
// Line Input / Output
// =============================================================================

/// What the engine needs to know about a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineContext {
    pub product_id: i64,
    pub category_id: i64,
    pub unit_price: Money,
    pub quantity: i64,
}

impl LineContext {
    /// `unit_price × quantity`.
    pub fn base(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Discount chosen for a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineDiscount {
    /// In `[0, base]`.
    pub amount: Money,
    /// `None` when nothing reduces the line.
    pub discount_id: Option<i64>,
}

// =============================================================================
// Selection
// =============================================================================

/// Returns the best discount for `line` at `now`.
///
/// Pure: no I/O, no clock, no mutation.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use till_core::discount::{best_discount_for_line, DiscountCatalog, LineContext};
/// use till_core::Money;
///
/// let line = LineContext {
///     product_id: 1,
///     category_id: 1,
///     unit_price: Money::from_cents(1000),
///     quantity: 3,
/// };
/// let best = best_discount_for_line(&DiscountCatalog::default(), &line, false, Utc::now());
/// assert!(best.amount.is_zero());
/// ```
pub fn best_discount_for_line(
    catalog: &DiscountCatalog,
    line: &LineContext,
    has_coupon: bool,
    now: DateTime<Utc>,
) -> LineDiscount {
    if line.quantity <= 0 || !line.unit_price.is_positive() {
        return LineDiscount::default();
    }

    let base = line.base();
    let mut best: Option<(Money, &Discount)> = None;

    for rule in catalog.live_at(now) {
        if !rule.matches_scope(line, has_coupon) {
            continue;
        }

        let candidate = &rule.discount;
        let amount = candidate.amount_for(base);

        let better = match best {
            None => true,
            Some((best_amount, current)) => {
                amount > best_amount
                    || (amount == best_amount && candidate.priority < current.priority)
            }
        };

        if better {
            best = Some((amount, candidate));
        }
    }

    match best {
        Some((amount, discount)) => {
            let amount = amount.clamp_to(Money::zero(), base);
            LineDiscount {
                amount,
                discount_id: amount.is_positive().then_some(discount.id),
            }
        }
        None => LineDiscount::default(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiscountType;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn discount(id: i64, discount_type: DiscountType, value: i64, scope: DiscountScope) -> Discount {
        Discount {
            id,
            name: format!("D{id}"),
            discount_type,
            value,
            scope,
            is_stackable: false,
            priority: 0,
            starts_at: None,
            ends_at: None,
            min_basket_subtotal_cents: None,
            max_total_discount_cents: None,
            is_active: true,
            created_at: now(),
        }
    }

    fn line(price: i64, qty: i64) -> LineContext {
        LineContext {
            product_id: 10,
            category_id: 5,
            unit_price: Money::from_cents(price),
            quantity: qty,
        }
    }

    #[test]
    fn test_global_percent() {
        // 3 × $10.00 with a 10% global discount → $3.00
        let catalog = DiscountCatalog::new(vec![DiscountRule::unlinked(discount(
            1,
            DiscountType::Percent,
            1000,
            DiscountScope::Global,
        ))]);

        let best = best_discount_for_line(&catalog, &line(1000, 3), false, now());
        assert_eq!(best.amount.cents(), 300);
        assert_eq!(best.discount_id, Some(1));
    }

    #[test]
    fn test_higher_amount_wins_over_priority() {
        // 10% global (priority 5) vs $5 on the product (priority 1): amount beats priority
        let mut global = discount(1, DiscountType::Percent, 1000, DiscountScope::Global);
        global.priority = 5;
        let mut product = discount(2, DiscountType::Amount, 500, DiscountScope::Product);
        product.priority = 1;
        let mut product_rule = DiscountRule::unlinked(product);
        product_rule.product_ids.insert(10);

        let catalog = DiscountCatalog::new(vec![DiscountRule::unlinked(global), product_rule]);

        let best = best_discount_for_line(&catalog, &line(1000, 3), false, now());
        assert_eq!(best.amount.cents(), 500);
        assert_eq!(best.discount_id, Some(2));
    }

    #[test]
    fn test_tie_goes_to_lower_priority() {
        // Two $5 discounts tie on amount; priority 2 beats priority 3
        let mut a = discount(1, DiscountType::Amount, 500, DiscountScope::Global);
        a.priority = 3;
        let mut b = discount(2, DiscountType::Amount, 500, DiscountScope::Global);
        b.priority = 2;

        let catalog = DiscountCatalog::new(vec![DiscountRule::unlinked(a), DiscountRule::unlinked(b)]);
        let best = best_discount_for_line(&catalog, &line(1000, 1), false, now());
        assert_eq!(best.amount.cents(), 500);
        assert_eq!(best.discount_id, Some(2));
    }

    #[test]
    fn test_exact_tie_keeps_first_seen() {
        let a = discount(1, DiscountType::Amount, 500, DiscountScope::Global);
        let b = discount(2, DiscountType::Amount, 500, DiscountScope::Global);

        let catalog = DiscountCatalog::new(vec![DiscountRule::unlinked(a), DiscountRule::unlinked(b)]);
        let best = best_discount_for_line(&catalog, &line(1000, 1), false, now());
        assert_eq!(best.discount_id, Some(1));
    }

    #[test]
    fn test_amount_clamped_to_base() {
        // $50 off a $40 line is capped at $40
        let catalog = DiscountCatalog::new(vec![DiscountRule::unlinked(discount(
            1,
            DiscountType::Amount,
            5000,
            DiscountScope::Global,
        ))]);
        let best = best_discount_for_line(&catalog, &line(4000, 1), false, now());
        assert_eq!(best.amount.cents(), 4000);
    }

    #[test]
    fn test_category_scope() {
        let mut rule = DiscountRule::unlinked(discount(1, DiscountType::Amount, 100, DiscountScope::Category));
        rule.category_ids.insert(99);
        let catalog = DiscountCatalog::new(vec![rule.clone()]);
        assert!(best_discount_for_line(&catalog, &line(1000, 1), false, now()).amount.is_zero());

        rule.category_ids.insert(5);
        let catalog = DiscountCatalog::new(vec![rule]);
        assert_eq!(best_discount_for_line(&catalog, &line(1000, 1), false, now()).amount.cents(), 100);
    }

    #[test]
    fn test_coupon_scope_requires_any_redemption() {
        let catalog = DiscountCatalog::new(vec![DiscountRule::unlinked(discount(
            1,
            DiscountType::Percent,
            2000,
            DiscountScope::Coupon,
        ))]);
        assert!(best_discount_for_line(&catalog, &line(1000, 1), false, now()).amount.is_zero());
        assert_eq!(best_discount_for_line(&catalog, &line(1000, 1), true, now()).amount.cents(), 200);
    }

    #[test]
    fn test_inactive_and_out_of_window_ignored() {
        let mut inactive = discount(1, DiscountType::Amount, 100, DiscountScope::Global);
        inactive.is_active = false;
        let mut expired = discount(2, DiscountType::Amount, 200, DiscountScope::Global);
        expired.ends_at = Some(now() - Duration::seconds(1));
        let mut future = discount(3, DiscountType::Amount, 300, DiscountScope::Global);
        future.starts_at = Some(now() + Duration::seconds(1));
        let mut edge = discount(4, DiscountType::Amount, 50, DiscountScope::Global);
        edge.starts_at = Some(now());
        edge.ends_at = Some(now());

        let catalog = DiscountCatalog::new(
            [inactive, expired, future, edge]
                .into_iter()
                .map(DiscountRule::unlinked)
                .collect(),
        );
        let best = best_discount_for_line(&catalog, &line(1000, 1), false, now());
        assert_eq!(best.amount.cents(), 50);
        assert_eq!(best.discount_id, Some(4));
    }

    #[test]
    fn test_zero_quantity_or_price_short_circuits() {
        let catalog = DiscountCatalog::new(vec![DiscountRule::unlinked(discount(
            1,
            DiscountType::Amount,
            100,
            DiscountScope::Global,
        ))]);
        assert_eq!(best_discount_for_line(&catalog, &line(0, 3), false, now()), LineDiscount::default());
        assert_eq!(best_discount_for_line(&catalog, &line(1000, 0), false, now()), LineDiscount::default());
    }

    #[test]
    fn test_zero_amount_winner_reports_no_discount() {
        let catalog = DiscountCatalog::new(vec![DiscountRule::unlinked(discount(
            1,
            DiscountType::Percent,
            0,
            DiscountScope::Global,
        ))]);
        let best = best_discount_for_line(&catalog, &line(1000, 1), false, now());
        assert!(best.amount.is_zero());
        assert_eq!(best.discount_id, None);
    }
}
