//! # Status History Repository
//!
//! Append-only audit of layaway and order status changes. Rows are written
//! on the same transaction as the status update they describe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::repository::{new_id, ts_parse, ts_text};
use quilate_core::{Actor, EntityKind, StoreOffset};

/// One audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: String,
    pub tenant_id: String,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    /// `None` when the document was created in `new_status`.
    pub old_status: Option<String>,
    pub new_status: String,
    pub user_id: String,
    pub user_email: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct StatusChangeRow {
    id: String,
    tenant_id: String,
    entity_id: String,
    old_status: Option<String>,
    new_status: String,
    user_id: String,
    user_email: Option<String>,
    notes: Option<String>,
    created_at: String,
}

/// Appends a status-change row on the caller's connection.
#[allow(clippy::too_many_arguments)]
pub async fn record_state_transition(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    entity_kind: EntityKind,
    entity_id: &str,
    old_status: Option<&str>,
    new_status: &str,
    actor: &Actor,
    notes: Option<&str>,
    at: DateTime<Utc>,
) -> DbResult<String> {
    let id = new_id();

    sqlx::query(
        r#"
        INSERT INTO status_history (
            id, tenant_id, entity_kind, entity_id, old_status, new_status,
            user_id, user_email, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&id)
    .bind(tenant_id)
    .bind(entity_kind.as_str())
    .bind(entity_id)
    .bind(old_status)
    .bind(new_status)
    .bind(&actor.user_id)
    .bind(&actor.email)
    .bind(notes)
    .bind(ts_text(at))
    .execute(&mut *conn)
    .await?;

    info!(
        tenant_id = %tenant_id,
        entity = entity_kind.as_str(),
        entity_id = %entity_id,
        from = old_status.unwrap_or("-"),
        to = %new_status,
        user_id = %actor.user_id,
        "Status changed"
    );
    Ok(id)
}

/// Repository for reading the audit log.
#[derive(Debug, Clone)]
pub struct StatusHistoryRepository {
    pool: SqlitePool,
    offset: StoreOffset,
}

impl StatusHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StatusHistoryRepository {
            pool,
            offset: StoreOffset::default(),
        }
    }

    /// Uses `offset` for naive timestamps.
    pub fn with_offset(mut self, offset: StoreOffset) -> Self {
        self.offset = offset;
        self
    }

    /// History of one document, oldest first.
    pub async fn list_for(
        &self,
        tenant_id: &str,
        entity_kind: EntityKind,
        entity_id: &str,
    ) -> DbResult<Vec<StatusChange>> {
        let rows: Vec<StatusChangeRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, entity_id, old_status, new_status,
                   user_id, user_email, notes, created_at
            FROM status_history
            WHERE tenant_id = ?1 AND entity_kind = ?2 AND entity_id = ?3
            ORDER BY created_at, rowid
            "#,
        )
        .bind(tenant_id)
        .bind(entity_kind.as_str())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(StatusChange {
                    created_at: ts_parse(&r.created_at, self.offset)?,
                    id: r.id,
                    tenant_id: r.tenant_id,
                    entity_kind,
                    entity_id: r.entity_id,
                    old_status: r.old_status,
                    new_status: r.new_status,
                    user_id: r.user_id,
                    user_email: r.user_email,
                    notes: r.notes,
                })
            })
            .collect()
    }
}
