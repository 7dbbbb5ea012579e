//! # till-db: Database Layer and Services for Till
//!
//! SQLite storage for orders, inventory and promotions, plus the service
//! layer that runs every operation as one transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Data Flow                                 │
//! │                                                                         │
//! │  POS screen / admin UI                                                 │
//! │       │  orders.add_line(order_id, product_id, qty)                    │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │  Repositories │    │   Database   │  │   │
//! │  │   │ (service/)    │───►│ (repository/) │───►│  (pool.rs)   │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ OrderService  │    │ order, ledger │    │ SqlitePool   │  │   │
//! │  │   │ InventorySvc  │    │ inventory ... │    │ migrations   │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ pricing, state, stock rules                         │   │
//! │  │           ▼                                                     │   │
//! │  │        till-core                                                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys on, append-only ledger triggers)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and service error types
//! - [`repository`] - SQL per table group
//! - [`service`] - The operations callers use
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use till_core::SystemClock;
//! use till_db::{Database, DbConfig, OrderService};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//! let orders = OrderService::new(db.clone(), Arc::new(SystemClock));
//!
//! let order_id = orders.create_order(None).await?;
//! orders.add_line(order_id, product_id, 2).await?;
//! let paid = orders.pay(order_id, cashier_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, ErrorResponse, ServiceError, ServiceResult};
pub use pool::{ConfigError, Database, DbConfig};

// Service re-exports for convenience
pub use service::catalog::CatalogService;
pub use service::discounts::DiscountService;
pub use service::inventory::InventoryService;
pub use service::orders::OrderService;
