//! # Cash Sale Repository
//!
//! Ventas de contado, their returns, and the read-only legacy `sales` table.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cash Sale Write                                   │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── allocate_folio(VENTA)      (when the sale has none)               │
//! │   ├── INSERT ventas_contado                                             │
//! │   ├── INSERT venta_contado_items                                        │
//! │   └── stock -= quantity per line with a product                         │
//! │       (returns carry negative quantities, so stock comes back)          │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Returns are separate rows with return_of_id set and negative totals.  │
//! │  A sale is never edited after commit.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::folio::allocate_folio;
use crate::repository::{insert_lines_in, lines_of, product, ts_parse, ts_text, LineTable};
use quilate_core::folio::FolioKind;
use quilate_core::ledger::{CashSale, LegacySale, LineItem, SaleSource};
use quilate_core::{MethodTally, Money, PaymentMethod, StoreOffset, TaxRate};

pub(crate) const CASH_SALE_COLUMNS: &str = "id, tenant_id, folio, subtotal_cents, discount_cents, \
     tax_rate_bps, tax_cents, total_cents, total_cost_cents, utilidad_cents, customer_name, \
     customer_phone, vendedor_id, user_id, efectivo_cents, tarjeta_cents, transferencia_cents, \
     return_of_id, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct CashSaleRow {
    pub id: String,
    tenant_id: String,
    folio: Option<String>,
    subtotal_cents: i64,
    discount_cents: i64,
    tax_rate_bps: i64,
    tax_cents: i64,
    total_cents: i64,
    total_cost_cents: i64,
    utilidad_cents: i64,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    vendedor_id: Option<String>,
    user_id: Option<String>,
    efectivo_cents: i64,
    tarjeta_cents: i64,
    transferencia_cents: i64,
    return_of_id: Option<String>,
    created_at: String,
}

impl CashSaleRow {
    pub(crate) fn into_sale(self, offset: StoreOffset, items: Vec<LineItem>) -> DbResult<CashSale> {
        Ok(CashSale {
            created_at: ts_parse(&self.created_at, offset)?,
            id: self.id,
            tenant_id: self.tenant_id,
            folio: self.folio,
            source: SaleSource::VentasContado,
            subtotal: Money::from_cents(self.subtotal_cents),
            discount: Money::from_cents(self.discount_cents),
            tax_rate: TaxRate::from_bps(u32::try_from(self.tax_rate_bps).unwrap_or(0)),
            tax: Money::from_cents(self.tax_cents),
            total: Money::from_cents(self.total_cents),
            total_cost: Money::from_cents(self.total_cost_cents),
            utilidad: Money::from_cents(self.utilidad_cents),
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            vendedor_id: self.vendedor_id,
            user_id: self.user_id,
            tender: MethodTally {
                efectivo: Money::from_cents(self.efectivo_cents),
                transferencia: Money::from_cents(self.transferencia_cents),
                tarjeta: Money::from_cents(self.tarjeta_cents),
                otro: Money::zero(),
            },
            return_of_id: self.return_of_id,
            items,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct LegacySaleRow {
    id: String,
    tenant_id: String,
    total_cents: i64,
    payment_method: String,
    vendedor_id: Option<String>,
    user_id: Option<String>,
    status: String,
    created_at: String,
}

pub(crate) const LEGACY_SALE_COLUMNS: &str =
    "id, tenant_id, total_cents, payment_method, vendedor_id, user_id, status, created_at";

impl LegacySaleRow {
    pub(crate) fn into_legacy(self, offset: StoreOffset) -> DbResult<LegacySale> {
        Ok(LegacySale {
            created_at: ts_parse(&self.created_at, offset)?,
            id: self.id,
            tenant_id: self.tenant_id,
            total: Money::from_cents(self.total_cents),
            payment_method: PaymentMethod::parse_lenient(&self.payment_method),
            vendedor_id: self.vendedor_id,
            user_id: self.user_id,
            status: self.status,
        })
    }
}

// =============================================================================
// Transaction-bound operations
// =============================================================================

/// Writes a cash sale (or return) with its lines and stock effect.
///
/// A folio is allocated when `sale.folio` is `None`. The tender's `otro`
/// amount is folded into efectivo, the table has no column for it.
///
/// ## Errors
/// - `NotFound` when a line references a product the tenant does not have
/// - `Domain(InsufficientStock)` when a line exceeds the stock on hand
pub async fn create_in(
    conn: &mut SqliteConnection,
    sale: &CashSale,
    now: DateTime<Utc>,
) -> DbResult<CashSale> {
    let mut sale = sale.clone();
    if sale.folio.is_none() {
        sale.folio = Some(allocate_folio(conn, &sale.tenant_id, FolioKind::Venta).await?);
    }

    sqlx::query(
        r#"
        INSERT INTO ventas_contado (
            id, tenant_id, folio, subtotal_cents, discount_cents, tax_rate_bps, tax_cents,
            total_cents, total_cost_cents, utilidad_cents, customer_name, customer_phone,
            vendedor_id, user_id, efectivo_cents, tarjeta_cents, transferencia_cents,
            return_of_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.tenant_id)
    .bind(&sale.folio)
    .bind(sale.subtotal.cents())
    .bind(sale.discount.cents())
    .bind(sale.tax_rate.bps() as i64)
    .bind(sale.tax.cents())
    .bind(sale.total.cents())
    .bind(sale.total_cost.cents())
    .bind(sale.utilidad.cents())
    .bind(&sale.customer_name)
    .bind(&sale.customer_phone)
    .bind(&sale.vendedor_id)
    .bind(&sale.user_id)
    .bind((sale.tender.efectivo + sale.tender.otro).cents())
    .bind(sale.tender.tarjeta.cents())
    .bind(sale.tender.transferencia.cents())
    .bind(&sale.return_of_id)
    .bind(ts_text(sale.created_at))
    .execute(&mut *conn)
    .await?;

    insert_lines_in(conn, LineTable::VentaContado, &sale.id, &sale.items).await?;

    for line in &sale.items {
        if let Some(product_id) = &line.product_id {
            product::apply_stock_delta_in(conn, &sale.tenant_id, product_id, -line.quantity, now)
                .await?;
        }
    }

    info!(
        tenant_id = %sale.tenant_id,
        folio = sale.folio.as_deref().unwrap_or("-"),
        total = %sale.total,
        is_return = sale.is_return(),
        "Cash sale recorded"
    );
    Ok(sale)
}

pub(crate) async fn get_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    offset: StoreOffset,
) -> DbResult<Option<CashSale>> {
    let sql = format!(
        "SELECT {} FROM ventas_contado WHERE id = ?1 AND tenant_id = ?2",
        CASH_SALE_COLUMNS
    );
    let row: Option<CashSaleRow> = sqlx::query_as(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let items = lines_of(conn, LineTable::VentaContado, &row.id).await?;
            Ok(Some(row.into_sale(offset, items)?))
        }
        None => Ok(None),
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for cash sales.
#[derive(Debug, Clone)]
pub struct CashSaleRepository {
    pool: SqlitePool,
    offset: StoreOffset,
}

impl CashSaleRepository {
    /// Creates a new CashSaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashSaleRepository {
            pool,
            offset: StoreOffset::default(),
        }
    }

    /// Uses `offset` for naive timestamps.
    pub fn with_offset(mut self, offset: StoreOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Records a sale in its own transaction.
    pub async fn create(&self, sale: &CashSale, now: DateTime<Utc>) -> DbResult<CashSale> {
        let mut tx = self.pool.begin().await?;
        let created = create_in(&mut tx, sale, now).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Gets a sale with its lines.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<CashSale>> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, tenant_id, id, self.offset).await
    }

    /// Loads a row into the pre-migration `sales` table.
    ///
    /// Only imports write here; the engine reads the table and never
    /// changes it.
    pub async fn import_legacy(&self, sale: &LegacySale) -> DbResult<()> {
        debug!(id = %sale.id, "Importing legacy sale");

        sqlx::query(
            r#"
            INSERT INTO sales (id, tenant_id, total_cents, payment_method, vendedor_id, user_id, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(sale.total.cents())
        .bind(sale.payment_method.as_str())
        .bind(&sale.vendedor_id)
        .bind(&sale.user_id)
        .bind(&sale.status)
        .bind(ts_text(sale.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
