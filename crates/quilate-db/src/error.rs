//! # Database Error Types
//!
//! Error types for database operations and the engine services built on
//! top of them.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (quilate-core)           │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ◄──────── DbError::Domain                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError::kind() → ErrorKind ← enclosing service picks a status code    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use quilate_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and domain errors and provide additional
/// context for debugging and operator feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist for the tenant
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate codigo
    /// - A second closure for the same (tenant, date)
    /// - Any UNIQUE index violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Writing rows for a tenant that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, bad status literal).
    #[error("Check constraint failed: {message}")]
    CheckViolation { message: String },

    /// SQLite reported SQLITE_BUSY / SQLITE_LOCKED.
    ///
    /// Retried by the folio allocator; surfaced when retries run out.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored JSON document could not be read or written.
    #[error("Document error: {0}")]
    Document(#[from] serde_json::Error),

    /// Business rule failure raised by quilate-core.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for SQLITE_BUSY / SQLITE_LOCKED, the only retryable failures.
    pub fn is_busy(&self) -> bool {
        matches!(self, DbError::Busy(_))
    }

    /// Stable category for the enclosing service.
    ///
    /// Infrastructure failures have no domain category and return `None`.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DbError::Domain(err) => Some(err.kind()),
            DbError::NotFound { .. } => Some(ErrorKind::NotFound),
            DbError::UniqueViolation { .. } => Some(ErrorKind::AlreadyExists),
            DbError::CheckViolation { .. } => Some(ErrorKind::Invariant),
            DbError::ForeignKeyViolation { .. } => Some(ErrorKind::BadInput),
            _ => None,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type / busy
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite messages:
                //   "UNIQUE constraint failed: <table>.<column>"
                //   "FOREIGN KEY constraint failed"
                //   "CHECK constraint failed: <expr>"
                //   "database is locked" / "database table is locked"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked")
                    || msg.contains("is locked")
                    || msg.contains("database is busy")
                {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<quilate_core::ValidationError> for DbError {
    fn from(err: quilate_core::ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
