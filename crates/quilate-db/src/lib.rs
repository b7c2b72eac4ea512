//! # quilate-db: Database Layer and Engine Services for Quilate
//!
//! This crate owns everything that touches storage: the SQLite pool, the
//! embedded schema, tenant-scoped repositories, the folio allocator, and
//! the engine services that turn stored documents into reports and frozen
//! day closures.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Quilate Data Flow                                │
//! │                                                                         │
//! │  Enclosing service / `corte` CLI                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   quilate-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    Engine     │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (engine.rs)  │───►│ ledger, folio │    │  (embedded)  │  │   │
//! │  │   │ close_day     │    │ layaway, order│    │ 001_initial  │  │   │
//! │  │   │ view_period   │    │ closure, ...  │    │              │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │ quilate-core       │ Database (pool.rs)            │   │
//! │  │           ▼ (pure rules)       ▼                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/quilate/quilate.db                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `quilate.toml` and `QUILATE_*` settings
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (ledger, folio, closures, ...)
//! - [`engine`] - Reports, day close, transitions, repricing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quilate_db::{Database, DbConfig, Engine};
//! use quilate_core::EngineSettings;
//!
//! let db = Database::new(DbConfig::new("path/to/quilate.db")).await?;
//! let engine = Engine::new(db, EngineSettings::default())?;
//!
//! let report = engine.compute_report("joyeria-centro", from, to).await?;
//! let closure = engine.close_day("joyeria-centro", to, &actor).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, QuilateConfig};
pub use engine::{Engine, RateUpdate, SweepSummary, SystemClock};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::closure::{ClosureKind, ClosureRepository};
pub use repository::folio::{allocate_folio, FolioRepository};
pub use repository::inventory::NewMovement;
pub use repository::layaway::NewCreditPayment;
pub use repository::ledger::LedgerRepository;
pub use repository::order::NewOrderPayment;
pub use repository::product::ProductRepository;
pub use repository::status_history::record_state_transition;
