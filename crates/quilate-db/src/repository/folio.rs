//! # Folio Repository
//!
//! Per-tenant, per-kind document numbers (`V-000001`, `AP-000001`,
//! `PED-000001`).
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT INTO folio_counters (tenant_id, tipo, next_seq)                 │
//! │  VALUES (?, ?, 2)                                                       │
//! │  ON CONFLICT (tenant_id, tipo) DO UPDATE SET next_seq = next_seq + 1    │
//! │  RETURNING next_seq - 1                                                 │
//! │                                                                         │
//! │  first call  → row created with next_seq = 2, returns 1                 │
//! │  later calls → next_seq bumped in place, returns the previous value     │
//! │                                                                         │
//! │  One statement: the write lock is taken before the read, so two         │
//! │  writers can never see the same value. A rollback of the caller's       │
//! │  transaction gives the number back (gaps are allowed).                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use quilate_core::folio::FolioKind;

/// Attempts before a busy database is reported to the caller.
const MAX_ATTEMPTS: u32 = 5;

/// First backoff delay; doubles on every retry.
const BASE_BACKOFF: Duration = Duration::from_millis(20);

/// Allocates the next folio of `kind` on the caller's connection.
///
/// Never commits: the number belongs to the caller's transaction.
///
/// ## Errors
/// * `DbError::Busy` - the database stayed locked through every retry
pub async fn allocate_folio(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    kind: FolioKind,
) -> DbResult<String> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match next_seq(conn, tenant_id, kind).await {
            Ok(seq) => {
                let folio = kind.format(seq);
                debug!(tenant_id = %tenant_id, tipo = %kind, folio = %folio, "Allocated folio");
                return Ok(folio);
            }
            Err(err) if err.is_busy() && attempt < MAX_ATTEMPTS => {
                let delay = BASE_BACKOFF * 2u32.pow(attempt - 1);
                warn!(
                    tenant_id = %tenant_id,
                    tipo = %kind,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Folio counter busy, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn next_seq(conn: &mut SqliteConnection, tenant_id: &str, kind: FolioKind) -> DbResult<i64> {
    let seq: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO folio_counters (tenant_id, tipo, next_seq) VALUES (?1, ?2, 2)
        ON CONFLICT (tenant_id, tipo) DO UPDATE SET next_seq = next_seq + 1
        RETURNING next_seq - 1
        "#,
    )
    .bind(tenant_id)
    .bind(kind.tipo())
    .fetch_one(&mut *conn)
    .await?;
    Ok(seq)
}

/// Repository for folio counters.
#[derive(Debug, Clone)]
pub struct FolioRepository {
    pool: SqlitePool,
}

impl FolioRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FolioRepository { pool }
    }

    /// Allocates a folio in its own transaction.
    ///
    /// `tipo` accepts the stored kind (`VENTA`) or its prefix (`V`).
    ///
    /// ## Errors
    /// * `DbError::Domain(UnknownFolioKind)` - unrecognized `tipo`
    pub async fn allocate(&self, tenant_id: &str, tipo: &str) -> DbResult<String> {
        let kind: FolioKind = tipo.parse()?;
        let mut tx = self.pool.begin().await?;
        let folio = allocate_folio(&mut tx, tenant_id, kind).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(folio)
    }

    /// Next sequence number that would be handed out (1 when unused).
    pub async fn peek(&self, tenant_id: &str, kind: FolioKind) -> DbResult<i64> {
        let next: Option<i64> = sqlx::query_scalar(
            "SELECT next_seq FROM folio_counters WHERE tenant_id = ?1 AND tipo = ?2",
        )
        .bind(tenant_id)
        .bind(kind.tipo())
        .fetch_optional(&self.pool)
        .await?;
        Ok(next.unwrap_or(1))
    }
}
