//! # Closure Repository
//!
//! Frozen day documents: one sales closure and one inventory closure per
//! (tenant, date). Rows are inserted once and never updated; the unique
//! index turns a second close (or the loser of two concurrent closes) into
//! `AlreadyExists`.

use chrono::NaiveDate;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{new_id, ts_text};
use quilate_core::closure::{ClosureDocument, ClosureRef};
use quilate_core::CoreError;

/// Which closure table a document lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    Sales,
    Inventory,
}

impl ClosureKind {
    fn table(&self) -> &'static str {
        match self {
            ClosureKind::Sales => "day_closures",
            ClosureKind::Inventory => "inventory_closures",
        }
    }

    fn entity(&self) -> &'static str {
        match self {
            ClosureKind::Sales => "day_closure",
            ClosureKind::Inventory => "inventory_closure",
        }
    }
}

#[derive(Debug, FromRow)]
struct ClosureRow {
    document: String,
}

/// Stores a closure document on the caller's connection.
///
/// ## Errors
/// * `Domain(AlreadyExists)` - the day is already closed for the tenant
pub async fn insert_in(
    conn: &mut SqliteConnection,
    kind: ClosureKind,
    document: &ClosureDocument,
) -> DbResult<ClosureRef> {
    let id = new_id();
    let body = serde_json::to_string(document)?;
    let sql = format!(
        "INSERT INTO {} (id, tenant_id, date, closed_at, closed_by, document) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        kind.table()
    );

    let result = sqlx::query(&sql)
        .bind(&id)
        .bind(&document.tenant_id)
        .bind(document.date.to_string())
        .bind(ts_text(document.closed_at))
        .bind(&document.closed_by)
        .bind(body)
        .execute(&mut *conn)
        .await;

    if let Err(err) = result {
        return Err(match DbError::from(err) {
            DbError::UniqueViolation { .. } => CoreError::already_exists(
                kind.entity(),
                format!("{}/{}", document.tenant_id, document.date),
            )
            .into(),
            other => other,
        });
    }

    info!(
        tenant_id = %document.tenant_id,
        date = %document.date,
        table = kind.table(),
        "Day closed"
    );

    Ok(ClosureRef {
        closure_id: id,
        tenant_id: document.tenant_id.clone(),
        date: document.date,
        closed_at: document.closed_at,
    })
}

/// Repository for day and inventory closures.
#[derive(Debug, Clone)]
pub struct ClosureRepository {
    pool: SqlitePool,
}

impl ClosureRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClosureRepository { pool }
    }

    /// Stores a closure document in its own statement.
    pub async fn insert(&self, kind: ClosureKind, document: &ClosureDocument) -> DbResult<ClosureRef> {
        let mut conn = self.pool.acquire().await?;
        insert_in(&mut conn, kind, document).await
    }

    /// The stored document for one day, `None` while the day is pending.
    pub async fn get(
        &self,
        kind: ClosureKind,
        tenant_id: &str,
        date: NaiveDate,
    ) -> DbResult<Option<ClosureDocument>> {
        let sql = format!(
            "SELECT document FROM {} WHERE tenant_id = ?1 AND date = ?2",
            kind.table()
        );
        let row: Option<ClosureRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(date.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| serde_json::from_str(&r.document).map_err(DbError::from))
            .transpose()
    }

    /// Stored documents whose date falls in `[from, to]`, by date.
    pub async fn list(
        &self,
        kind: ClosureKind,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<ClosureDocument>> {
        let sql = format!(
            "SELECT document FROM {} WHERE tenant_id = ?1 AND date BETWEEN ?2 AND ?3 ORDER BY date",
            kind.table()
        );
        let rows: Vec<ClosureRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(from.to_string())
            .bind(to.to_string())
            .fetch_all(&self.pool)
            .await?;

        debug!(tenant_id = %tenant_id, %from, %to, count = rows.len(), "Listed closures");
        rows.iter()
            .map(|r| serde_json::from_str(&r.document).map_err(DbError::from))
            .collect()
    }
}
