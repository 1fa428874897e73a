//! # feria-db: Persistence and Workflows for Feria
//!
//! SQLite storage for the craft-fair sales core, the append-only inventory
//! ledger, and the transactional sale / exchange / cancellation workflows.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Feria Data Flow                                  │
//! │                                                                         │
//! │  HTTP controller (create sale)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     feria-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │  Repositories │    │  Database    │  │   │
//! │  │   │ (service/)    │───►│ (repository/) │───►│  (pool.rs)   │  │   │
//! │  │   │ rules + tx    │    │  SQL per      │    │  SqlitePool  │  │   │
//! │  │   │ boundaries    │    │  entity       │    │  writer gate │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ feria-core: rules, phases, money                   │   │
//! │  └───────────┼─────────────────────────────────────────────────────┘   │
//! │              ▼                                                          │
//! │       Sale / CreatedSale / ProductChange / typed ServiceError          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration and write transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - `DbError` and the caller-facing `ServiceError`
//! - [`config`] - File and environment configuration
//! - [`repository`] - Per-entity SQL
//! - [`service`] - The operations controllers call
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feria_db::{FeriaConfig, Services};
//!
//! let config = FeriaConfig::load(None)?;
//! let services = Services::from_config(&config).await?;
//!
//! let created = services.create_sale(new_sale).await?;
//! let stock = services.current_stock(&created.sale.product_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, DatabaseSettings, FairSettings, FeriaConfig};
pub use error::{DbError, DbResult, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig, WriteTransaction};
pub use service::{MultiSaleError, Services};

pub use repository::artisan::ArtisanRepository;
pub use repository::event::EventRepository;
pub use repository::exchange::ExchangeRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
