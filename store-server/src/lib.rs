//! SupplyVend Store Server - school supply commerce backend
//!
//! # Architecture
//!
//! ```text
//! store-server/src/
//! ├── core/          # Configuration, shared state
//! ├── auth/          # Actor identity (gateway-asserted), authorization
//! ├── api/           # HTTP routes and handlers
//! ├── db/            # Embedded redb document store
//! ├── orders/        # Checkout, totals, order state machine
//! ├── payments/      # Payment orchestrator, providers, webhooks
//! ├── stock/         # Stock ledger with audit trail
//! ├── delivery/      # Signed digital delivery links
//! └── utils/         # Logging setup
//! ```
//!
//! Orders, transactions and products live as JSON documents in a single
//! embedded store; each mutation commits per document, cross-aggregate
//! consistency is handled explicitly by the services (reservation
//! compensation, state-machine driven synchronization).

pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod db;
pub mod delivery;
pub mod orders;
pub mod payments;
pub mod stock;
pub mod utils;

// Re-export common types
pub use auth::{Actor, Role};
pub use config::Config;
pub use core::ServerState;
pub use db::StoreStorage;
pub use shared::{AppError, AppResult};
