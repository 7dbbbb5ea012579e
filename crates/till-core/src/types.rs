//! # Domain Types
//!
//! Core domain types used throughout Till.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderLine     │   │   Discount      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  order_id (FK)  │   │  type / scope   │       │
//! │  │  order_number   │   │  product_name   │   │  value          │       │
//! │  │  status         │   │  unit_price     │   │  priority       │       │
//! │  │  *_total_cents  │   │  line_discount  │   │  window         │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                        │ 1..n           │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────▼────────┐       │
//! │  │ InventorySnap.  │   │ StockLedgerEntry│   │    Coupon       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id (U) │   │  ref_type/ref_id│   │  code (unique)  │       │
//! │  │  qty_on_hand    │   │  delta (signed) │   │  usage limits   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Row Types
//! Every struct here is also a database row. With the `sqlx` feature the
//! structs derive `FromRow` and the enums derive `Type`, so till-db can
//! `query_as` straight into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{Money, Percent};
use crate::ORDER_NUMBER_PREFIX;

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// ```text
///            pay
///   Unpaid ───────► Paid
///     │
///     │ void
///     ▼
///   Voided
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Basket is open, lines and coupon can change.
    Unpaid,
    /// Payment taken, stock debited. Terminal.
    Paid,
    /// Cancelled before payment. Terminal.
    Voided,
}

impl OrderStatus {
    /// Database/wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unpaid => "unpaid",
            OrderStatus::Paid => "paid",
            OrderStatus::Voided => "voided",
        }
    }

    /// Terminal states accept no further events or mutations.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Voided)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Unpaid
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Discount Type & Scope
// =============================================================================

/// How a discount's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is basis points of the line base (1000 = 10.00%).
    Percent,
    /// `value` is cents off the line base.
    Amount,
}

/// Which lines a discount can apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountScope {
    /// Every line.
    Global,
    /// Lines whose product category is linked to the discount.
    Category,
    /// Lines whose product is linked to the discount.
    Product,
    /// Lines of orders carrying a coupon redemption.
    Coupon,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Parent category; trees are not traversed by pricing.
    pub parent_id: Option<i64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    /// Display name shown to cashier and on receipt.
    pub name: String,
    pub description: Option<String>,
    /// Price in cents (smallest currency unit).
    pub unit_price_cents: i64,
    /// Inactive products cannot be added to orders.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Current on-hand quantity for one product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventorySnapshot {
    pub id: i64,
    pub product_id: i64,
    /// May go negative through manual adjustments, never through payment.
    pub quantity_on_hand: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A manual stock adjustment entered in the back office.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockAdjustment {
    pub id: i64,
    pub product_id: i64,
    /// Signed, never zero.
    pub delta: i64,
    pub note: Option<String>,
    /// User id, 0 when unknown.
    pub created_by: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// What produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerRefType {
    /// `ref_id` is a `StockAdjustment` id.
    Adjustment,
    /// `ref_id` is an `Order` id.
    Order,
}

/// One immutable inventory movement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLedgerEntry {
    pub id: i64,
    pub product_id: i64,
    pub ref_type: LedgerRefType,
    pub ref_id: i64,
    /// Signed quantity change.
    pub delta: i64,
    /// "Order paid" for payments, the adjustment note otherwise.
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
}

// =============================================================================
// Discounts & Coupons
// =============================================================================

/// A promotion definition.
///
/// ## Inert Fields
/// `is_stackable`, `min_basket_subtotal_cents` and `max_total_discount_cents`
/// are stored for the back office but do not affect pricing. One discount
/// wins per line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Discount {
    pub id: i64,
    pub name: String,
    pub discount_type: DiscountType,
    /// Basis points for Percent, cents for Amount.
    pub value: i64,
    pub scope: DiscountScope,
    pub is_stackable: bool,
    /// Lower wins ties.
    pub priority: i64,
    #[ts(as = "Option<String>")]
    pub starts_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub ends_at: Option<DateTime<Utc>>,
    pub min_basket_subtotal_cents: Option<i64>,
    pub max_total_discount_cents: Option<i64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Discount {
    /// True when `now` falls inside the inclusive validity window.
    /// Missing bounds are open.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.starts_at.map_or(true, |start| start <= now)
            && self.ends_at.map_or(true, |end| now <= end)
    }

    /// Raw (unclamped) discount this promotion gives on `base`.
    pub fn amount_for(&self, base: Money) -> Money {
        match self.discount_type {
            DiscountType::Percent => base.percentage(Percent::from_bps(self.value)),
            DiscountType::Amount => Money::from_cents(self.value).min(base),
        }
    }
}

/// A redeemable code attached to a Coupon-scope discount.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Coupon {
    pub id: i64,
    pub discount_id: i64,
    /// Case-sensitive, unique.
    pub code: String,
    pub usage_limit_total: Option<i64>,
    pub usage_limit_per_customer: Option<i64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Coupon with how often it has been redeemed (back-office listing).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CouponUsage {
    pub id: i64,
    pub discount_id: i64,
    pub code: String,
    pub usage_limit_total: Option<i64>,
    pub usage_limit_per_customer: Option<i64>,
    pub is_active: bool,
    pub redemption_count: i64,
}

/// Record of a coupon used on an order. At most one per order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CouponRedemption {
    pub id: i64,
    pub coupon_id: i64,
    pub order_id: i64,
    pub customer_id: Option<i64>,
    #[ts(as = "String")]
    pub redeemed_at: DateTime<Utc>,
}

// =============================================================================
// Order
// =============================================================================

/// A customer basket that becomes a sale once paid.
///
/// ## Totals Invariant
/// `grand_total = max(0, subtotal - discount_total + tax_total)`, written
/// only by [`crate::pricing::recalculate`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: i64,
    /// Human-readable number: `ORD-yyyyMMddHHmmssfff`.
    pub order_number: String,
    pub customer_id: Option<i64>,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub discount_total_cents: i64,
    /// Always zero, tax is out of scope.
    pub tax_total_cents: i64,
    pub grand_total_cents: i64,
    pub is_active: bool,
    /// Bumped by every mutating transaction.
    pub row_version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds the order number for an order created at `now`.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use till_core::Order;
    ///
    /// let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    ///     + chrono::Duration::milliseconds(42);
    /// assert_eq!(Order::number_for(at), "ORD-20240309140507042");
    /// ```
    pub fn number_for(now: DateTime<Utc>) -> String {
        format!("{}{}", ORDER_NUMBER_PREFIX, now.format("%Y%m%d%H%M%S%3f"))
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount_total(&self) -> Money {
        Money::from_cents(self.discount_total_cents)
    }

    #[inline]
    pub fn tax_total(&self) -> Money {
        Money::from_cents(self.tax_total_cents)
    }

    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }
}

/// A line in an order.
/// Uses snapshot pattern to freeze product name and price at add time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    /// Product name when the line was added (frozen).
    pub product_name: String,
    /// Unit price in cents when the line was added (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_discount_cents: i64,
    /// `unit_price × quantity - line_discount`.
    pub line_total_cents: i64,
    /// Discount that won for this line, if any.
    pub discount_id: Option<i64>,
}

impl OrderLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// `unit_price × quantity`, before discount.
    #[inline]
    pub fn base(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    #[inline]
    pub fn line_discount(&self) -> Money {
        Money::from_cents(self.line_discount_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// One status change of an order. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderStatusHistoryEntry {
    pub id: i64,
    pub order_id: i64,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    /// User id, 0 when unknown.
    pub changed_by: i64,
    #[ts(as = "String")]
    pub changed_at: DateTime<Utc>,
}

// =============================================================================
// Order Views
// =============================================================================

/// An order with its lines, as returned by every line/coupon mutation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Everything the order screen shows.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    /// Code of the redeemed coupon, if any.
    pub coupon_code: Option<String>,
    pub history: Vec<OrderStatusHistoryEntry>,
}

/// One row of the order list.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderSummary {
    pub id: i64,
    pub order_number: String,
    pub status: OrderStatus,
    pub customer_id: Option<i64>,
    pub subtotal_cents: i64,
    pub discount_total_cents: i64,
    pub tax_total_cents: i64,
    pub grand_total_cents: i64,
    pub line_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Order list query.
///
/// `q` matches an order-number substring, or an exact id when numeric.
/// `from` is inclusive, `to` exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub q: Option<String>,
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    pub page: i64,
    pub page_size: i64,
}

impl OrderFilter {
    pub const DEFAULT_PAGE_SIZE: i64 = 20;
    pub const MAX_PAGE_SIZE: i64 = 100;

    /// Page clamped to ≥ 1 and page size clamped to 1..=100.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, Self::MAX_PAGE_SIZE);
        self.q = self
            .q
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        self
    }

    /// Rows to skip for the current page.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

impl Default for OrderFilter {
    fn default() -> Self {
        OrderFilter {
            status: None,
            q: None,
            from: None,
            to: None,
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Page<T: TS> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

// =============================================================================
// Audit
// =============================================================================

/// A best-effort audit record.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AuditLog {
    pub id: i64,
    pub user_id: i64,
    pub entity_name: String,
    pub entity_id: String,
    pub action: String,
    /// JSON, truncated to [`crate::AUDIT_CHANGES_MAX_CHARS`].
    pub changes: Option<String>,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
}

// =============================================================================
// Input Types
// =============================================================================

/// Fields for a new category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<i64>,
}

/// Fields for a new product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub unit_price_cents: i64,
}

/// Partial product update; `None` leaves the field alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub unit_price_cents: Option<i64>,
    pub is_active: Option<bool>,
}

/// Fields for a new discount.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewDiscount {
    pub name: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub scope: DiscountScope,
    pub is_stackable: bool,
    pub priority: i64,
    #[ts(as = "Option<String>")]
    pub starts_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub ends_at: Option<DateTime<Utc>>,
    pub min_basket_subtotal_cents: Option<i64>,
    pub max_total_discount_cents: Option<i64>,
}

impl NewDiscount {
    /// Open-ended, non-stackable discount with priority 0.
    pub fn simple(
        name: impl Into<String>,
        discount_type: DiscountType,
        value: i64,
        scope: DiscountScope,
    ) -> Self {
        NewDiscount {
            name: name.into(),
            discount_type,
            value,
            scope,
            is_stackable: false,
            priority: 0,
            starts_at: None,
            ends_at: None,
            min_basket_subtotal_cents: None,
            max_total_discount_cents: None,
        }
    }
}

/// Fields for a new coupon.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCoupon {
    pub discount_id: i64,
    pub code: String,
    pub usage_limit_total: Option<i64>,
    pub usage_limit_per_customer: Option<i64>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn discount(discount_type: DiscountType, value: i64) -> Discount {
        Discount {
            id: 1,
            name: "Test".to_string(),
            discount_type,
            value,
            scope: DiscountScope::Global,
            is_stackable: false,
            priority: 0,
            starts_at: None,
            ends_at: None,
            min_basket_subtotal_cents: None,
            max_total_discount_cents: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_status_default_and_terminal() {
        assert_eq!(OrderStatus::default(), OrderStatus::Unpaid);
        assert!(!OrderStatus::Unpaid.is_terminal());
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Voided.is_terminal());
        assert_eq!(OrderStatus::Voided.to_string(), "voided");
    }

    #[test]
    fn test_discount_window_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut d = discount(DiscountType::Percent, 1000);
        assert!(d.is_live_at(now));

        d.starts_at = Some(now);
        d.ends_at = Some(now);
        assert!(d.is_live_at(now));
        assert!(!d.is_live_at(now + Duration::seconds(1)));
        assert!(!d.is_live_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_discount_amount_for() {
        let base = Money::from_cents(3000);
        assert_eq!(discount(DiscountType::Percent, 1000).amount_for(base).cents(), 300);
        assert_eq!(discount(DiscountType::Amount, 500).amount_for(base).cents(), 500);
        // Amount never exceeds the base
        assert_eq!(discount(DiscountType::Amount, 5000).amount_for(base).cents(), 3000);
    }

    #[test]
    fn test_order_number_format() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 58).unwrap() + Duration::milliseconds(7);
        assert_eq!(Order::number_for(at), "ORD-20241231235958007");
    }

    #[test]
    fn test_order_filter_normalized() {
        let filter = OrderFilter {
            page: 0,
            page_size: 500,
            q: Some("   ".to_string()),
            ..OrderFilter::default()
        }
        .normalized();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 100);
        assert_eq!(filter.q, None);

        let filter = OrderFilter {
            page: 3,
            page_size: 0,
            ..OrderFilter::default()
        }
        .normalized();
        assert_eq!(filter.page_size, 1);
        assert_eq!(filter.offset(), 2);
    }

    #[test]
    fn test_ledger_ref_type_serialization() {
        let json = serde_json::to_string(&LedgerRefType::Adjustment).unwrap();
        assert_eq!(json, "\"ADJUSTMENT\"");
    }
}
