//! # quilate-core: Pure Reporting Logic for Quilate
//!
//! This crate is the **heart** of Quilate. It turns a tenant's ledger
//! (cash sales, layaways, custom orders and their payments) into daily
//! reports, closure documents and inventory views, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Quilate Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Enclosing service (HTTP, auth, UI)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                quilate-db (Database + Services)                 │   │
//! │  │   load_ledger ─► compute_report ─► close_day / view_period      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ quilate-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌───────────┐  ┌──────────────┐  │   │
//! │  │   │  ledger  │─►│ classify │─►│ aggregate │─►│    report    │  │   │
//! │  │   │ documents│  │ buckets  │  │ counters  │  │ totals, JSON │  │   │
//! │  │   └──────────┘  └──────────┘  └───────────┘  └──────┬───────┘  │   │
//! │  │                                                     │          │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌───────────┐  ┌──────▼───────┐  │   │
//! │  │   │  state   │  │ pricing  │  │ inventory │  │   closure    │  │   │
//! │  │   │ machines │  │ per gram │  │  replay   │  │ period sums  │  │   │
//! │  │   └──────────┘  └──────────┘  └───────────┘  └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO WALL CLOCK • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer centavos, card netting
//! - [`time`] - Store offset, local-date windows, timestamp parsing
//! - [`types`] - Payment methods, statuses, movement kinds
//! - [`ledger`] - Documents and payments as read from storage
//! - [`classify`] - Payment attribution into buckets
//! - [`aggregate`] - Bucket, seller, day and piece counters
//! - [`report`] - Derived totals and the report document
//! - [`closure`] - Frozen day documents and period sums
//! - [`inventory`] - Historical stock and the inventory report
//! - [`state`] - Layaway and order transition rules, overdue checks
//! - [`pricing`] - Price from metal rate and weight
//! - [`folio`] - Per-kind document numbering format
//!
//! ## Example Usage
//!
//! ```rust
//! use quilate_core::money::Money;
//! use quilate_core::types::{MethodTally, PaymentMethod};
//!
//! let mut tally = MethodTally::default();
//! tally.add(PaymentMethod::Efectivo, Money::from_pesos(500));
//! tally.add(PaymentMethod::Tarjeta, Money::from_pesos(200));
//!
//! // card netted once at 3%: 500 + 194
//! assert_eq!(tally.net(300), Money::from_pesos(694));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod catalog;
pub mod classify;
pub mod closure;
pub mod error;
pub mod folio;
pub mod inventory;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod report;
pub mod settings;
pub mod state;
pub mod time;
pub mod types;
pub mod validation;
pub mod warning;

#[cfg(test)]
pub(crate) mod fixtures;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use classify::Bucket;
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use ledger::Ledger;
pub use money::Money;
pub use report::{compute_report, Report};
pub use settings::EngineSettings;
pub use time::{DateWindow, StoreOffset};
pub use types::*;
pub use warning::{DataWarning, WarningKind};
