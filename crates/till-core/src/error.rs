//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorCode        - Stable class the UI switches on                │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ServiceError     - What callers of the service layer see          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ServiceError → ErrorCode│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (order id, product id, ...)
//! 3. Errors are enum variants, never String
//! 4. Every variant maps to exactly one [`ErrorCode`]

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    ///
    /// ## When This Occurs
    /// - Order, line, product or coupon id doesn't exist
    /// - A line id belongs to a different order
    /// - A product has no inventory snapshot at payment time
    /// - Removing a coupon from an order that has none
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The order is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Adding lines to a paid order ("Paid orders are read-only")
    /// - Paying or voiding an order that is already terminal
    #[error("Order {order_id} is {status}, cannot {operation}")]
    InvalidState {
        order_id: i64,
        status: OrderStatus,
        operation: String,
    },

    /// Payment attempted on an order without lines.
    #[error("Order {order_id} has no items to pay")]
    EmptyOrder { order_id: i64 },

    /// The operation collides with existing state.
    ///
    /// ## When This Occurs
    /// - Order already has a coupon
    /// - Coupon usage limit reached (total or per customer)
    /// - Duplicate coupon code or order number
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Insufficient stock to complete payment.
    ///
    /// ## User Workflow
    /// ```text
    /// Pay order (2 × product 7)
    ///      │
    ///      ▼
    /// Check snapshot: on hand = 1
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: 7, available: 1, requested: 2 }
    ///      │
    ///      ▼
    /// Nothing written, order stays Unpaid
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates an InvalidState error for an order.
    pub fn invalid_state(order_id: i64, status: OrderStatus, operation: impl Into<String>) -> Self {
        CoreError::InvalidState {
            order_id,
            status,
            operation: operation.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict(message.into())
    }

    /// Returns the error class reported to callers.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::InvalidState { .. } | CoreError::EmptyOrder { .. } => ErrorCode::InvalidState,
            CoreError::Conflict(_) => ErrorCode::Conflict,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Raised before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be non-zero.
    #[error("{field} must not be zero")]
    MustNotBeZero { field: String },

    /// Invalid format or inconsistent values.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Referenced record exists but is switched off.
    #[error("{entity} is inactive")]
    Inactive { entity: String },

    /// Validity window has not opened yet.
    #[error("{entity} is not yet valid")]
    NotYetValid { entity: String },

    /// Validity window has closed.
    #[error("{entity} has expired")]
    Expired { entity: String },
}

// =============================================================================
// Error Code
// =============================================================================

/// Error classes exposed to the admin UI and the POS screen.
///
/// ## Serialization
/// ```text
/// ErrorCode::InsufficientStock → "INSUFFICIENT_STOCK"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    InvalidState,
    Conflict,
    InsufficientStock,
    Internal,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: 7,
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product 7: available 1, requested 2"
        );

        let err = CoreError::invalid_state(3, OrderStatus::Paid, "add line");
        assert_eq!(err.to_string(), "Order 3 is paid, cannot add line");

        let err = CoreError::not_found("Inventory", 12);
        assert_eq!(err.to_string(), "Inventory not found: 12");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::Expired {
            entity: "Coupon".to_string(),
        };
        assert_eq!(err.to_string(), "Coupon has expired");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustNotBeZero {
            field: "delta".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CoreError::EmptyOrder { order_id: 1 }.code(), ErrorCode::InvalidState);
        assert_eq!(CoreError::conflict("coupon").code(), ErrorCode::Conflict);
        assert_eq!(CoreError::not_found("Order", 1).code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_error_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
        let json = serde_json::to_string(&ErrorCode::ValidationError).unwrap();
        assert_eq!(json, "\"VALIDATION_ERROR\"");
    }
}
