//! # Validation Module
//!
//! Input validation utilities for Till.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Admin UI / POS screen                                        │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Service layer (till-db::service)                             │
//! │  └── THIS MODULE: called before any transaction is opened              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (quantity > 0)                                  │
//! │  ├── UNIQUE constraints (coupon code, one redemption per order)        │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_coupon_code, validate_quantity};
//!
//! assert_eq!(validate_coupon_code("  SAVE10 ").unwrap(), "SAVE10");
//! assert!(validate_quantity(0).is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::money::Percent;
use crate::types::DiscountType;
use crate::{MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_CODE_LEN: usize = 64;
const MAX_NOTE_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product, category, discount).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ## Returns
/// The trimmed name.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates a coupon code and returns it trimmed.
///
/// Codes are case-sensitive; only surrounding whitespace is removed.
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    Ok(code.to_string())
}

/// Validates an optional free-text note. Blank notes become `None`.
pub fn validate_note(note: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if note.chars().count() > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LEN,
        });
    }

    Ok(Some(note.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Order: Add / Update Line                                               │
/// │                                                                         │
/// │  validate_quantity(qty) ← THIS FUNCTION                                │
/// │       │                                                                 │
/// │       ├── qty <= 0?  → Error: "quantity must be positive"              │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       └── OK → open the transaction                                    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a manual stock delta. Any sign, never zero.
pub fn validate_stock_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::MustNotBeZero {
            field: "delta".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price in cents: `0..=MAX_UNIT_PRICE_CENTS`.
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());  // $10.99
/// assert!(validate_price_cents(0).is_ok());     // Free item
/// assert!(validate_price_cents(-100).is_err()); // Invalid
/// assert!(validate_price_cents(i64::MAX).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_UNIT_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a discount value for its type.
///
/// ## Rules
/// - Never negative
/// - Percent: at most 10000 bps (100.00%)
pub fn validate_discount_value(discount_type: DiscountType, value: i64) -> ValidationResult<()> {
    let max = match discount_type {
        DiscountType::Percent => Percent::FULL.bps(),
        DiscountType::Amount => i64::MAX,
    };

    if !(0..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: "value".to_string(),
            min: 0,
            max,
        });
    }

    Ok(())
}

/// Validates an optional usage limit (coupon caps).
pub fn validate_usage_limit(field: &str, limit: Option<i64>) -> ValidationResult<()> {
    match limit {
        Some(n) if n <= 0 => Err(ValidationError::MustBePositive {
            field: field.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Validates an optional non-negative money amount.
pub fn validate_optional_cents(field: &str, cents: Option<i64>) -> ValidationResult<()> {
    match cents {
        Some(c) if c < 0 => Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates a validity window: when both bounds exist, start ≤ end.
pub fn validate_window(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> ValidationResult<()> {
    if let (Some(start), Some(end)) = (starts_at, ends_at) {
        if start > end {
            return Err(ValidationError::InvalidFormat {
                field: "ends_at".to_string(),
                reason: "must not be before starts_at".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "  Cola  ").unwrap(), "Cola");
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_coupon_code() {
        assert_eq!(validate_coupon_code(" SAVE10\t").unwrap(), "SAVE10");
        // Case is preserved
        assert_eq!(validate_coupon_code("save10").unwrap(), "save10");
        assert!(matches!(
            validate_coupon_code("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_coupon_code(&"X".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_note() {
        assert_eq!(validate_note(None).unwrap(), None);
        assert_eq!(validate_note(Some("  ")).unwrap(), None);
        assert_eq!(validate_note(Some(" recount ")).unwrap(), Some("recount".to_string()));
        assert!(validate_note(Some(&"n".repeat(501))).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(MAX_UNIT_PRICE_CENTS).is_ok());
        assert!(validate_price_cents(-1).is_err());
        assert!(matches!(
            validate_price_cents(MAX_UNIT_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { max: MAX_UNIT_PRICE_CENTS, .. })
        ));

        // The dearest line still fits in i64 cents
        assert!(MAX_UNIT_PRICE_CENTS.checked_mul(MAX_ITEM_QUANTITY).is_some());
    }

    #[test]
    fn test_validate_stock_delta() {
        assert!(validate_stock_delta(5).is_ok());
        assert!(validate_stock_delta(-5).is_ok());
        assert!(matches!(
            validate_stock_delta(0),
            Err(ValidationError::MustNotBeZero { .. })
        ));
    }

    #[test]
    fn test_validate_discount_value() {
        assert!(validate_discount_value(DiscountType::Percent, 0).is_ok());
        assert!(validate_discount_value(DiscountType::Percent, 10000).is_ok());
        assert!(validate_discount_value(DiscountType::Percent, 10001).is_err());
        assert!(validate_discount_value(DiscountType::Amount, 250_000).is_ok());
        assert!(validate_discount_value(DiscountType::Amount, -1).is_err());
    }

    #[test]
    fn test_validate_limits() {
        assert!(validate_usage_limit("usage_limit_total", None).is_ok());
        assert!(validate_usage_limit("usage_limit_total", Some(1)).is_ok());
        assert!(validate_usage_limit("usage_limit_total", Some(0)).is_err());
        assert!(validate_optional_cents("min_basket_subtotal", Some(-5)).is_err());
    }

    #[test]
    fn test_validate_window() {
        let now = Utc::now();
        assert!(validate_window(None, None).is_ok());
        assert!(validate_window(Some(now), Some(now)).is_ok());
        assert!(validate_window(Some(now), Some(now - Duration::days(1))).is_err());
    }
}
