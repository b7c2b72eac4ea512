//! # Tenant Repository
//!
//! Every other table hangs off `tenants` with `ON DELETE CASCADE`, so
//! [`TenantRepository::delete`] removes a store's whole history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{ts_parse, ts_text};
use quilate_core::StoreOffset;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct TenantRow {
    id: String,
    name: String,
    created_at: String,
}

/// Repository for tenant rows.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
    offset: StoreOffset,
}

impl TenantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TenantRepository {
            pool,
            offset: StoreOffset::default(),
        }
    }

    /// Uses `offset` for naive timestamps.
    pub fn with_offset(mut self, offset: StoreOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Inserts a tenant.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - id already taken
    pub async fn insert(&self, id: &str, name: &str, created_at: DateTime<Utc>) -> DbResult<Tenant> {
        info!(tenant_id = %id, "Creating tenant");

        sqlx::query("INSERT INTO tenants (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(name)
            .bind(ts_text(created_at))
            .execute(&self.pool)
            .await?;

        Ok(Tenant {
            id: id.to_string(),
            name: name.to_string(),
            created_at,
        })
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Tenant>> {
        let row: Option<TenantRow> =
            sqlx::query_as("SELECT id, name, created_at FROM tenants WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| {
            Ok(Tenant {
                created_at: ts_parse(&r.created_at, self.offset)?,
                id: r.id,
                name: r.name,
            })
        })
        .transpose()
    }

    /// Deletes a tenant and, through the cascade, all of its rows.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(tenant_id = %id, "Deleting tenant");

        let result = sqlx::query("DELETE FROM tenants WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Tenant", id));
        }

        info!(tenant_id = %id, "Tenant deleted with all of its data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{at, setup};

    #[tokio::test]
    async fn test_delete_cascades_to_rows() {
        let (db, tenant) = setup().await;
        db.products()
            .insert(&crate::test_support::product(&tenant, "AN-001", 3))
            .await
            .unwrap();

        db.tenants().delete(&tenant).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(db.tenants().get(&tenant).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_tenant_rejected() {
        let (db, tenant) = setup().await;
        let err = db.tenants().insert(&tenant, "Otra", at(1, 12)).await.unwrap_err();
        assert!(matches!(err, crate::DbError::UniqueViolation { .. }));
    }
}
