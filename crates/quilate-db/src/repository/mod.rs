//! # Repository Module
//!
//! Database repository implementations for Quilate.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Engine service (close_day)                                            │
//! │       │                                                                 │
//! │       │  db.ledger().load_ledger(tenant, &window)                      │
//! │       ▼                                                                 │
//! │  LedgerRepository                                                      │
//! │  ├── load_ledger(tenant, window)                                       │
//! │  ├── load_movements_since(tenant, since)                               │
//! │  └── load_sold_lines_since(tenant, since)                              │
//! │       │                                                                 │
//! │       │  SQL (tenant_id on every statement)                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Writes that must share a transaction (folio + document + stock +      │
//! │  status history) expose `*_in(conn, …)` functions taking the caller's  │
//! │  connection; they never commit.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`TenantRepository`](tenant::TenantRepository) - Tenants
//! - [`ProductRepository`](product::ProductRepository) - Catalog and stock
//! - [`MetalRateRepository`](metal_rate::MetalRateRepository) - Price per gram
//! - [`CashSaleRepository`](cash_sale::CashSaleRepository) - Ventas de contado and legacy sales
//! - [`LayawayRepository`](layaway::LayawayRepository) - Apartados and credit payments
//! - [`OrderRepository`](order::OrderRepository) - Pedidos and order payments
//! - [`InventoryRepository`](inventory::InventoryRepository) - Stock movements
//! - [`FolioRepository`](folio::FolioRepository) - Folio counters
//! - [`ClosureRepository`](closure::ClosureRepository) - Day and inventory closures
//! - [`StatusHistoryRepository`](status_history::StatusHistoryRepository) - Audit log
//! - [`LedgerRepository`](ledger::LedgerRepository) - Report read layer

pub mod cash_sale;
pub mod closure;
pub mod folio;
pub mod inventory;
pub mod layaway;
pub mod ledger;
pub mod metal_rate;
pub mod order;
pub mod product;
pub mod status_history;
pub mod tenant;

use chrono::{DateTime, Utc};
use quilate_core::catalog::ProductSnapshot;
use quilate_core::ledger::LineItem;
use quilate_core::time::{format_timestamp, parse_timestamp, StoreOffset};
use quilate_core::Money;
use sqlx::{FromRow, SqliteConnection};
use uuid::Uuid;

use crate::error::DbResult;

/// Generates a new row id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Storage form of a timestamp.
pub(crate) fn ts_text(ts: DateTime<Utc>) -> String {
    format_timestamp(ts)
}

/// Parses a stored timestamp (naive local or offset-aware) into UTC.
pub(crate) fn ts_parse(raw: &str, offset: StoreOffset) -> DbResult<DateTime<Utc>> {
    Ok(parse_timestamp(raw, offset)?)
}

pub(crate) fn ts_parse_opt(raw: Option<&str>, offset: StoreOffset) -> DbResult<Option<DateTime<Utc>>> {
    raw.map(|r| ts_parse(r, offset)).transpose()
}

// =============================================================================
// Line Items
// =============================================================================

/// One row of `venta_contado_items`, `apartado_items` or `pedido_items`.
///
/// `parent_id` is aliased in each SELECT.
#[derive(Debug, FromRow)]
pub(crate) struct LineRow {
    pub id: String,
    pub parent_id: String,
    pub product_id: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub unit_cost_cents: i64,
    pub discount_cents: i64,
    pub total_price_cents: i64,
    pub product_snapshot: Option<String>,
}

impl LineRow {
    pub(crate) fn into_line(self) -> LineItem {
        LineItem {
            id: self.id,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: Money::from_cents(self.unit_price_cents),
            unit_cost: Money::from_cents(self.unit_cost_cents),
            discount: Money::from_cents(self.discount_cents),
            total_price: Money::from_cents(self.total_price_cents),
            snapshot: ProductSnapshot::from_json(self.product_snapshot.as_deref()),
        }
    }
}

/// Item tables share one column layout.
#[derive(Debug, Clone, Copy)]
pub(crate) enum LineTable {
    VentaContado,
    Apartado,
    Pedido,
}

impl LineTable {
    fn table(&self) -> &'static str {
        match self {
            LineTable::VentaContado => "venta_contado_items",
            LineTable::Apartado => "apartado_items",
            LineTable::Pedido => "pedido_items",
        }
    }

    fn parent_column(&self) -> &'static str {
        match self {
            LineTable::VentaContado => "venta_id",
            LineTable::Apartado => "apartado_id",
            LineTable::Pedido => "pedido_id",
        }
    }

    /// `SELECT` of every line column with the parent aliased as `parent_id`.
    pub(crate) fn select(&self) -> String {
        format!(
            "SELECT i.id, i.{} AS parent_id, i.product_id, i.quantity, i.unit_price_cents, \
             i.unit_cost_cents, i.discount_cents, i.total_price_cents, i.product_snapshot \
             FROM {} i",
            self.parent_column(),
            self.table()
        )
    }
}

/// Inserts the lines of one document on the caller's connection.
pub(crate) async fn insert_lines_in(
    conn: &mut SqliteConnection,
    table: LineTable,
    parent_id: &str,
    lines: &[LineItem],
) -> DbResult<()> {
    let sql = format!(
        "INSERT INTO {} (id, {}, product_id, quantity, unit_price_cents, unit_cost_cents, \
         discount_cents, total_price_cents, product_snapshot) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        table.table(),
        table.parent_column()
    );
    for line in lines {
        let snapshot = serde_json::to_string(&line.snapshot)?;
        sqlx::query(&sql)
            .bind(&line.id)
            .bind(parent_id)
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .bind(line.unit_cost.cents())
            .bind(line.discount.cents())
            .bind(line.total_price.cents())
            .bind(snapshot)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Loads the lines of one document.
pub(crate) async fn lines_of(
    conn: &mut SqliteConnection,
    table: LineTable,
    parent_id: &str,
) -> DbResult<Vec<LineItem>> {
    let sql = format!("{} WHERE i.{} = ?1 ORDER BY i.rowid", table.select(), table.parent_column());
    let rows: Vec<LineRow> = sqlx::query_as(&sql)
        .bind(parent_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(LineRow::into_line).collect())
}
