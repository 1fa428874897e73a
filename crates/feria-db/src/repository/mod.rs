//! # Repository Module
//!
//! SQL for every Feria table, one repository per entity.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Read side (no transaction)          Workflow side (WriteTransaction)  │
//! │  ───────────────────────────         ────────────────────────────────  │
//! │  db.sales().get_by_id(id)            SaleRepository::find(tx.conn(), id)│
//! │       │                                   │                             │
//! │       └──────────┐          ┌─────────────┘                             │
//! │                  ▼          ▼                                           │
//! │        SaleRepository::find<E: Executor>                               │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │               SQLite                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Associated functions are generic over the executor, so the same SQL
//! serves a pooled read and a read inside a workflow transaction. Writes
//! take `&mut SqliteConnection` and are only reachable from a transaction.
//!
//! ## Available Repositories
//!
//! - [`EventRepository`](event::EventRepository) - Fairs
//! - [`ArtisanRepository`](artisan::ArtisanRepository) - Artisans
//! - [`ProductRepository`](product::ProductRepository) - Products
//! - [`InventoryRepository`](inventory::InventoryRepository) - Movement ledger and stock
//! - [`SaleRepository`](sale::SaleRepository) - Sales
//! - [`ExchangeRepository`](exchange::ExchangeRepository) - Product changes

pub mod artisan;
pub mod event;
pub mod exchange;
pub mod inventory;
pub mod product;
pub mod sale;
