//! # Product Repository
//!
//! Database operations for the jewelry catalog.
//!
//! ## Key Operations
//! - CRUD by id / codigo (codigo is unique per tenant)
//! - Stock deltas guarded against going negative
//! - Price updates from metal-rate repricing
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Stock is always changed by delta, inside the caller's transaction  │
//! │                                                                     │
//! │     UPDATE products SET stock = stock + ?delta                      │
//! │     WHERE id = ? AND stock + ?delta >= 0                            │
//! │                                                                     │
//! │  0 rows affected → product missing or not enough stock              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{ts_parse, ts_text};
use quilate_core::catalog::{normalize_metal_type, Product};
use quilate_core::{CoreError, Money, StoreOffset};

pub(crate) const PRODUCT_COLUMNS: &str = "id, tenant_id, codigo, name, modelo, color, quilataje, marca, base, \
     tipo_joya, talla, weight_mg, cost_price_cents, price_cents, discount_bps, manual_price, \
     stock, active, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: String,
    tenant_id: String,
    codigo: String,
    name: String,
    modelo: Option<String>,
    color: Option<String>,
    quilataje: Option<String>,
    marca: Option<String>,
    base: Option<String>,
    tipo_joya: Option<String>,
    talla: Option<String>,
    weight_mg: Option<i64>,
    cost_price_cents: i64,
    price_cents: i64,
    discount_bps: i64,
    manual_price: bool,
    stock: i64,
    active: bool,
    created_at: String,
    updated_at: String,
}

impl ProductRow {
    pub(crate) fn into_product(self, offset: StoreOffset) -> DbResult<Product> {
        Ok(Product {
            created_at: ts_parse(&self.created_at, offset)?,
            updated_at: ts_parse(&self.updated_at, offset)?,
            id: self.id,
            tenant_id: self.tenant_id,
            codigo: self.codigo,
            name: self.name,
            modelo: self.modelo,
            color: self.color,
            quilataje: self.quilataje,
            marca: self.marca,
            base: self.base,
            tipo_joya: self.tipo_joya,
            talla: self.talla,
            weight_mg: self.weight_mg,
            cost_price: Money::from_cents(self.cost_price_cents),
            price: Money::from_cents(self.price_cents),
            discount_bps: u32::try_from(self.discount_bps).unwrap_or(0),
            manual_price: self.manual_price,
            stock: self.stock,
            active: self.active,
        })
    }
}

fn into_products(rows: Vec<ProductRow>, offset: StoreOffset) -> DbResult<Vec<Product>> {
    rows.into_iter().map(|r| r.into_product(offset)).collect()
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    offset: StoreOffset,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository {
            pool,
            offset: StoreOffset::default(),
        }
    }

    /// Uses `offset` for naive timestamps.
    pub fn with_offset(mut self, offset: StoreOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Gets a product by its ID within a tenant.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        get_by_id_in(&mut conn, tenant_id, id, self.offset).await
    }

    /// Gets a product by its codigo (e.g. "AN-14K-0001").
    pub async fn get_by_codigo(&self, tenant_id: &str, codigo: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        get_by_codigo_in(&mut conn, tenant_id, codigo, self.offset).await
    }

    /// Lists every product of a tenant, active or not, ordered by codigo.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products WHERE tenant_id = ?1 ORDER BY codigo", PRODUCT_COLUMNS);
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(tenant_id = %tenant_id, count = rows.len(), "Listed products");
        into_products(rows, self.offset)
    }

    /// Products priced from `metal_type` (matched on quilataje, case-insensitive).
    pub async fn list_by_metal(&self, tenant_id: &str, metal_type: &str) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        list_by_metal_in(&mut conn, tenant_id, metal_type, self.offset).await
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - codigo already exists for the tenant
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        insert_in(&mut conn, product).await?;
        Ok(product.clone())
    }

    /// Soft-deletes a product by setting active = false.
    ///
    /// Historical lines still reference it through their snapshot.
    pub async fn deactivate(&self, tenant_id: &str, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query(
            "UPDATE products SET active = 0, updated_at = ?3 WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(ts_text(now))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = ?1 AND active = 1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-bound operations
// =============================================================================

pub(crate) async fn get_by_id_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    offset: StoreOffset,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1 AND tenant_id = ?2", PRODUCT_COLUMNS);
    let row: Option<ProductRow> = sqlx::query_as(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(|r| r.into_product(offset)).transpose()
}

pub(crate) async fn get_by_codigo_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    codigo: &str,
    offset: StoreOffset,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE codigo = ?1 AND tenant_id = ?2", PRODUCT_COLUMNS);
    let row: Option<ProductRow> = sqlx::query_as(&sql)
        .bind(codigo)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(|r| r.into_product(offset)).transpose()
}

pub(crate) async fn list_by_metal_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    metal_type: &str,
    offset: StoreOffset,
) -> DbResult<Vec<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE tenant_id = ?1 AND lower(replace(quilataje, ' ', '')) = ?2 \
         ORDER BY codigo",
        PRODUCT_COLUMNS
    );
    let rows: Vec<ProductRow> = sqlx::query_as(&sql)
        .bind(tenant_id)
        .bind(normalize_metal_type(metal_type))
        .fetch_all(&mut *conn)
        .await?;
    into_products(rows, offset)
}

pub(crate) async fn insert_in(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(codigo = %product.codigo, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, tenant_id, codigo, name, modelo, color, quilataje, marca, base,
            tipo_joya, talla, weight_mg, cost_price_cents, price_cents, discount_bps,
            manual_price, stock, active, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13, ?14, ?15,
            ?16, ?17, ?18, ?19, ?20
        )
        "#,
    )
    .bind(&product.id)
    .bind(&product.tenant_id)
    .bind(&product.codigo)
    .bind(&product.name)
    .bind(&product.modelo)
    .bind(&product.color)
    .bind(&product.quilataje)
    .bind(&product.marca)
    .bind(&product.base)
    .bind(&product.tipo_joya)
    .bind(&product.talla)
    .bind(product.weight_mg)
    .bind(product.cost_price.cents())
    .bind(product.price.cents())
    .bind(product.discount_bps as i64)
    .bind(product.manual_price)
    .bind(product.stock)
    .bind(product.active)
    .bind(ts_text(product.created_at))
    .bind(ts_text(product.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Applies a stock delta, refusing to go below zero.
///
/// ## Errors
/// - `NotFound` when the product does not exist for the tenant
/// - `Domain(InsufficientStock)` when `stock + delta < 0`
pub(crate) async fn apply_stock_delta_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    product_id: &str,
    delta: i64,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let (codigo, stock): (String, i64) =
        sqlx::query_as("SELECT codigo, stock FROM products WHERE id = ?1 AND tenant_id = ?2")
            .bind(product_id)
            .bind(tenant_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

    let new_stock = stock + delta;
    if new_stock < 0 {
        return Err(CoreError::InsufficientStock {
            codigo,
            available: stock,
            requested: -delta,
        }
        .into());
    }

    sqlx::query("UPDATE products SET stock = ?3, updated_at = ?4 WHERE id = ?1 AND tenant_id = ?2")
        .bind(product_id)
        .bind(tenant_id)
        .bind(new_stock)
        .bind(ts_text(now))
        .execute(&mut *conn)
        .await?;

    debug!(product_id = %product_id, delta, new_stock, "Stock updated");
    Ok(new_stock)
}

pub(crate) async fn set_price_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    product_id: &str,
    price: Money,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("UPDATE products SET price_cents = ?3, updated_at = ?4 WHERE id = ?1 AND tenant_id = ?2")
        .bind(product_id)
        .bind(tenant_id)
        .bind(price.cents())
        .bind(ts_text(now))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, product, setup};

    #[tokio::test]
    async fn test_insert_and_lookup_by_codigo() {
        let (db, tenant) = setup().await;
        let p = product(&tenant, "AN-14K-001", 5);
        db.products().insert(&p).await.unwrap();

        let found = db.products().get_by_codigo(&tenant, "AN-14K-001").await.unwrap().unwrap();
        assert_eq!(found.id, p.id);
        assert_eq!(found.stock, 5);
        assert_eq!(found.created_at, p.created_at);
        assert!(db.products().get_by_codigo("other-tenant", "AN-14K-001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_codigo_rejected() {
        let (db, tenant) = setup().await;
        db.products().insert(&product(&tenant, "AN-001", 1)).await.unwrap();
        let err = db.products().insert(&product(&tenant, "AN-001", 1)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_stock_never_negative() {
        let (db, tenant) = setup().await;
        let p = product(&tenant, "AN-001", 2);
        db.products().insert(&p).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let err = apply_stock_delta_in(&mut conn, &tenant, &p.id, -3, at(2, 12)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 2, requested: 3, .. })
        ));
        assert_eq!(apply_stock_delta_in(&mut conn, &tenant, &p.id, -2, at(2, 12)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_naive_timestamps_follow_repository_offset() {
        let (db, tenant) = setup().await;
        let p = product(&tenant, "AN-001", 1);
        db.products().insert(&p).await.unwrap();
        sqlx::query("UPDATE products SET created_at = '2026-03-01 12:00:00' WHERE id = ?1")
            .bind(&p.id)
            .execute(db.pool())
            .await
            .unwrap();

        let local = db.products().get_by_id(&tenant, &p.id).await.unwrap().unwrap();
        assert_eq!(local.created_at, at(1, 18));

        let utc = db.products().with_offset(StoreOffset::from_minutes(0).unwrap());
        let found = utc.get_by_id(&tenant, &p.id).await.unwrap().unwrap();
        assert_eq!(found.created_at, at(1, 12));
        let listed = utc.list(&tenant).await.unwrap();
        assert_eq!(listed[0].created_at, at(1, 12));
    }
}
