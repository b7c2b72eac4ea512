//! # Metal Rate Repository
//!
//! Price per gram keyed by (tenant, metal_type). Metal types are stored
//! normalized (`"14K "` → `"14k"`).

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{new_id, ts_parse, ts_text};
use quilate_core::catalog::{normalize_metal_type, MetalRate};
use quilate_core::{Money, StoreOffset};

#[derive(Debug, FromRow)]
struct MetalRateRow {
    tenant_id: String,
    metal_type: String,
    rate_per_gram_cents: i64,
    updated_at: String,
}

impl MetalRateRow {
    fn into_rate(self, offset: StoreOffset) -> DbResult<MetalRate> {
        Ok(MetalRate {
            updated_at: ts_parse(&self.updated_at, offset)?,
            tenant_id: self.tenant_id,
            metal_type: self.metal_type,
            rate_per_gram: Money::from_cents(self.rate_per_gram_cents),
        })
    }
}

/// Repository for metal rates.
#[derive(Debug, Clone)]
pub struct MetalRateRepository {
    pool: SqlitePool,
    offset: StoreOffset,
}

impl MetalRateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MetalRateRepository {
            pool,
            offset: StoreOffset::default(),
        }
    }

    /// Uses `offset` for naive timestamps.
    pub fn with_offset(mut self, offset: StoreOffset) -> Self {
        self.offset = offset;
        self
    }

    pub async fn get(&self, tenant_id: &str, metal_type: &str) -> DbResult<Option<MetalRate>> {
        let row: Option<MetalRateRow> = sqlx::query_as(
            "SELECT tenant_id, metal_type, rate_per_gram_cents, updated_at \
             FROM metal_rates WHERE tenant_id = ?1 AND metal_type = ?2",
        )
        .bind(tenant_id)
        .bind(normalize_metal_type(metal_type))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_rate(self.offset)).transpose()
    }

    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<MetalRate>> {
        let rows: Vec<MetalRateRow> = sqlx::query_as(
            "SELECT tenant_id, metal_type, rate_per_gram_cents, updated_at \
             FROM metal_rates WHERE tenant_id = ?1 ORDER BY metal_type",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_rate(self.offset)).collect()
    }
}

/// Inserts or replaces the rate for (tenant, metal_type).
pub(crate) async fn upsert_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    metal_type: &str,
    rate_per_gram: Money,
    now: DateTime<Utc>,
) -> DbResult<MetalRate> {
    let metal_type = normalize_metal_type(metal_type);
    debug!(tenant_id = %tenant_id, metal_type = %metal_type, rate = %rate_per_gram, "Upserting metal rate");

    sqlx::query(
        r#"
        INSERT INTO metal_rates (id, tenant_id, metal_type, rate_per_gram_cents, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (tenant_id, metal_type) DO UPDATE SET
            rate_per_gram_cents = excluded.rate_per_gram_cents,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(new_id())
    .bind(tenant_id)
    .bind(&metal_type)
    .bind(rate_per_gram.cents())
    .bind(ts_text(now))
    .execute(&mut *conn)
    .await?;

    Ok(MetalRate {
        tenant_id: tenant_id.to_string(),
        metal_type,
        rate_per_gram,
        updated_at: now,
    })
}
