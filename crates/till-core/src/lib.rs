//! # till-core: Pure Business Logic for Till
//!
//! This crate is the **heart** of Till's order pipeline. It contains the
//! pricing and state rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              REST API / Admin UI / POS screen                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            till-db services (one transaction per call)          │   │
//! │  │   create_order, add_line, apply_coupon, pay, adjust_stock ...   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ discount  │  │  pricing  │  │   state   │  │   │
//! │  │   │  Order    │  │  engine   │  │ recalc &  │  │ Unpaid →  │  │   │
//! │  │   │  Discount │  │  catalog  │  │  totals   │  │ Paid/Void │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │   stock   │  │   clock   │  │ validation│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, OrderLine, Discount, Coupon, ...)
//! - [`money`] - Money and Percent with integer arithmetic (no floating point!)
//! - [`discount`] - Discount Selection Engine
//! - [`pricing`] - Order Pricing Recalculator
//! - [`state`] - Order State Machine
//! - [`stock`] - Stock debit planning for payment
//! - [`clock`] - Injected time source
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, time comes in as an argument
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::money::{Money, Percent};
//!
//! let base = Money::from_cents(1000).multiply_quantity(3);
//! let off = base.percentage(Percent::from_bps(1000));
//! assert_eq!((base - off).cents(), 2700);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod discount;
pub mod error;
pub mod money;
pub mod pricing;
pub mod state;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use till_core::Money` instead of
// `use till_core::money::Money`

pub use clock::{Clock, ManualClock, SystemClock};
pub use discount::{best_discount_for_line, DiscountCatalog, DiscountRule, LineContext, LineDiscount};
pub use error::{CoreError, CoreResult, ErrorCode, ValidationError};
pub use money::{Money, Percent};
pub use pricing::{recalculate, PricingSummary};
pub use state::{ensure_mutable, ensure_payable, transition, OrderEvent};
pub use stock::{check_availability, plan_stock_debits, StockDebit};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single order line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price a product may carry ($100,000,000.00).
///
/// Keeps `unit_price × MAX_ITEM_QUANTITY` and any realistic sum of such
/// lines well inside `i64` cents.
pub const MAX_UNIT_PRICE_CENTS: i64 = 10_000_000_000;

/// Prefix of generated order numbers.
pub const ORDER_NUMBER_PREFIX: &str = "ORD-";

/// Audit payloads longer than this are cut.
pub const AUDIT_CHANGES_MAX_CHARS: usize = 20_000;

/// Ledger reason written for every line of a paid order.
pub const LEDGER_REASON_ORDER_PAID: &str = "Order paid";

/// Actor id recorded when the caller is unknown.
pub const SYSTEM_USER_ID: i64 = 0;
