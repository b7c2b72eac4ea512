//! # Error Types
//!
//! Domain-specific error types for quilate-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  quilate-core errors (this file)                                       │
//! │  ├── CoreError        - Domain errors, grouped by ErrorKind            │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  quilate-db errors (separate crate)                                    │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → enclosing service       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Data inconsistencies found while aggregating are NOT errors: they travel
//! as [`crate::warning::DataWarning`] inside the report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Stable error categories surfaced by the engine.
///
/// The enclosing service maps these to status codes; operators see
/// [`ErrorKind::operator_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Invariant,
    BadInput,
    Conflict,
}

impl ErrorKind {
    /// Operator-facing message. Stable across versions.
    pub fn operator_message(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "El registro solicitado no existe o aún está pendiente",
            ErrorKind::AlreadyExists => "El registro ya existe (¿día ya cerrado?)",
            ErrorKind::Invariant => "La operación rompería una regla del inventario o del saldo",
            ErrorKind::BadInput => "Los datos enviados no son válidos",
            ErrorKind::Conflict => "El cambio de estado no está permitido",
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested entity does not exist where the caller needs it.
    ///
    /// ## When This Occurs
    /// - `view_day` on a day that has not been closed
    /// - Status transition on an unknown layaway/order id
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique key already taken.
    ///
    /// ## When This Occurs
    /// - `close_day` twice for the same (tenant, date)
    /// - Two admins closing concurrently: the loser lands here
    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: String, key: String },

    /// Inventory movement would leave negative stock.
    #[error("Insufficient stock for {codigo}: available {available}, requested {requested}")]
    InsufficientStock {
        codigo: String,
        available: i64,
        requested: i64,
    },

    /// A document balance rule would be broken.
    ///
    /// ## Examples
    /// - layaway `amount_paid > total`
    /// - marking a layaway `pagado` while a balance remains
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// State machine refuses the transition.
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// Date window is inverted.
    #[error("Invalid date window: {from} is after {to}")]
    InvalidWindow { from: NaiveDate, to: NaiveDate },

    /// Folio kind string not recognized.
    #[error("Unknown folio kind: {0}")]
    UnknownFolioKind(String),

    /// A stored timestamp could not be parsed in either accepted form.
    #[error("Unparseable timestamp: '{0}'")]
    InvalidTimestamp(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an AlreadyExists error.
    pub fn already_exists(entity: impl Into<String>, key: impl Into<String>) -> Self {
        CoreError::AlreadyExists {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Returns the stable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            CoreError::InsufficientStock { .. } | CoreError::Invariant(_) => ErrorKind::Invariant,
            CoreError::InvalidTransition { .. } => ErrorKind::Conflict,
            CoreError::InvalidWindow { .. }
            | CoreError::UnknownFolioKind(_)
            | CoreError::InvalidTimestamp(_)
            | CoreError::Validation(_) => ErrorKind::BadInput,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
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

    /// Invalid format (e.g., invalid codigo).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
