//! # Ledger Repository
//!
//! Tenant-scoped read layer feeding the report engine and the inventory
//! reconstructor.
//!
//! ## Window Loading
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Coarse SQL prefilter on the date prefix of stored timestamps        │
//! │       substr(created_at, 1, 10) BETWEEN from-1 AND to+1                 │
//! │     (stored values may be naive local or UTC; a day of padding on each  │
//! │      side covers any offset)                                            │
//! │                                                                         │
//! │  2. Parse every timestamp with the store offset                         │
//! │                                                                         │
//! │  3. Exact test                                                          │
//! │       cash sales / orphan payments: window.contains(created_at)         │
//! │       layaways / orders: kept whole; the classifier picks the event     │
//! │       time of each payment and status change                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A layaway or order is in scope when it was created, changed status, or
//! received a payment inside the padded window. It is loaded with ALL its
//! lines and payments.

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::DbResult;
use crate::repository::cash_sale::{CashSaleRow, LegacySaleRow, CASH_SALE_COLUMNS, LEGACY_SALE_COLUMNS};
use crate::repository::inventory::{MovementRow, MOVEMENT_COLUMNS};
use crate::repository::layaway::{self, CreditPaymentRow, LayawayRow, CREDIT_PAYMENT_COLUMNS, LAYAWAY_COLUMNS};
use crate::repository::order::{self, OrderPaymentRow, OrderRow, ORDER_COLUMNS, ORDER_PAYMENT_COLUMNS};
use crate::repository::product::ProductRow;
use crate::repository::{lines_of, ts_parse, LineTable};
use quilate_core::catalog::Product;
use quilate_core::inventory::{InventoryMovement, SoldLine};
use quilate_core::{DateWindow, Ledger, StoreOffset};

#[derive(Debug, FromRow)]
struct SoldLineRow {
    product_id: String,
    quantity: i64,
    created_at: String,
}

/// Read layer for reports.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
    offset: StoreOffset,
}

impl LedgerRepository {
    /// Creates a read layer that interprets naive timestamps with the
    /// default store offset.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository {
            pool,
            offset: StoreOffset::default(),
        }
    }

    /// Uses `offset` for naive timestamps.
    pub fn with_offset(mut self, offset: StoreOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Loads every document with activity in `window`.
    pub async fn load_ledger(&self, tenant_id: &str, window: &DateWindow) -> DbResult<Ledger> {
        let mut conn = self.pool.acquire().await?;
        let (lo, hi) = window.coarse_bounds();

        let mut ledger = Ledger {
            cash_sales: self.cash_sales(&mut conn, tenant_id, window, &lo, &hi).await?,
            layaways: self.layaways(&mut conn, tenant_id, &lo, &hi).await?,
            orders: self.orders(&mut conn, tenant_id, &lo, &hi).await?,
            ..Ledger::default()
        };
        self.orphans(&mut conn, tenant_id, window, &lo, &hi, &mut ledger).await?;

        debug!(
            tenant_id = %tenant_id,
            from = %window.from(),
            to = %window.to(),
            cash_sales = ledger.cash_sales.len(),
            layaways = ledger.layaways.len(),
            orders = ledger.orders.len(),
            "Loaded ledger"
        );
        Ok(ledger)
    }

    async fn cash_sales(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        window: &DateWindow,
        lo: &str,
        hi: &str,
    ) -> DbResult<Vec<quilate_core::ledger::CashSale>> {
        let sql = format!(
            "SELECT {} FROM ventas_contado WHERE tenant_id = ?1 \
             AND substr(created_at, 1, 10) BETWEEN ?2 AND ?3 ORDER BY created_at, id",
            CASH_SALE_COLUMNS
        );
        let rows: Vec<CashSaleRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(lo)
            .bind(hi)
            .fetch_all(&mut *conn)
            .await?;

        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            let items = lines_of(conn, LineTable::VentaContado, &row.id).await?;
            let sale = row.into_sale(self.offset, items)?;
            if window.contains(sale.created_at) {
                sales.push(sale);
            }
        }

        let sql = format!(
            "SELECT {} FROM sales WHERE tenant_id = ?1 \
             AND substr(created_at, 1, 10) BETWEEN ?2 AND ?3 ORDER BY created_at, id",
            LEGACY_SALE_COLUMNS
        );
        let legacy: Vec<LegacySaleRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(lo)
            .bind(hi)
            .fetch_all(&mut *conn)
            .await?;
        for row in legacy {
            let legacy = row.into_legacy(self.offset)?;
            if !window.contains(legacy.created_at) {
                continue;
            }
            if let Some(sale) = legacy.into_cash_sale() {
                sales.push(sale);
            }
        }

        Ok(sales)
    }

    async fn layaways(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        lo: &str,
        hi: &str,
    ) -> DbResult<Vec<quilate_core::ledger::Layaway>> {
        let sql = format!(
            r#"
            SELECT {} FROM apartados a
            WHERE a.tenant_id = ?1 AND (
                substr(a.created_at, 1, 10) BETWEEN ?2 AND ?3
                OR substr(a.status_changed_at, 1, 10) BETWEEN ?2 AND ?3
                OR EXISTS (
                    SELECT 1 FROM credit_payments p
                    WHERE p.tenant_id = a.tenant_id AND p.apartado_id = a.id
                      AND substr(p.created_at, 1, 10) BETWEEN ?2 AND ?3
                )
            )
            ORDER BY a.created_at, a.id
            "#,
            LAYAWAY_COLUMNS
        );
        let rows: Vec<LayawayRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(lo)
            .bind(hi)
            .fetch_all(&mut *conn)
            .await?;

        let mut layaways = Vec::with_capacity(rows.len());
        for row in rows {
            let items = lines_of(conn, LineTable::Apartado, &row.id).await?;
            let payments = layaway::payments_of(conn, tenant_id, &row.id, self.offset).await?;
            layaways.push(row.into_layaway(self.offset, items, payments)?);
        }
        Ok(layaways)
    }

    async fn orders(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        lo: &str,
        hi: &str,
    ) -> DbResult<Vec<quilate_core::ledger::Order>> {
        let sql = format!(
            r#"
            SELECT {} FROM pedidos o
            WHERE o.tenant_id = ?1 AND (
                substr(o.created_at, 1, 10) BETWEEN ?2 AND ?3
                OR substr(o.status_changed_at, 1, 10) BETWEEN ?2 AND ?3
                OR EXISTS (
                    SELECT 1 FROM order_payments p
                    WHERE p.tenant_id = o.tenant_id AND p.pedido_id = o.id
                      AND substr(p.created_at, 1, 10) BETWEEN ?2 AND ?3
                )
            )
            ORDER BY o.created_at, o.id
            "#,
            ORDER_COLUMNS
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(lo)
            .bind(hi)
            .fetch_all(&mut *conn)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = lines_of(conn, LineTable::Pedido, &row.id).await?;
            let payments = order::payments_of(conn, tenant_id, &row.id, self.offset).await?;
            orders.push(row.into_order(self.offset, items, payments)?);
        }
        Ok(orders)
    }

    /// Payments in the window whose document no longer exists.
    async fn orphans(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        window: &DateWindow,
        lo: &str,
        hi: &str,
        ledger: &mut Ledger,
    ) -> DbResult<()> {
        let sql = format!(
            r#"
            SELECT {} FROM credit_payments p
            WHERE p.tenant_id = ?1 AND substr(p.created_at, 1, 10) BETWEEN ?2 AND ?3
              AND NOT EXISTS (
                  SELECT 1 FROM apartados a WHERE a.tenant_id = p.tenant_id AND a.id = p.apartado_id
              )
            ORDER BY p.created_at, p.id
            "#,
            CREDIT_PAYMENT_COLUMNS
        );
        let rows: Vec<CreditPaymentRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(lo)
            .bind(hi)
            .fetch_all(&mut *conn)
            .await?;
        for row in rows {
            let payment = row.into_payment(self.offset)?;
            if window.contains(payment.created_at) {
                ledger.orphan_credit_payments.push(payment);
            }
        }

        let sql = format!(
            r#"
            SELECT {} FROM order_payments p
            WHERE p.tenant_id = ?1 AND substr(p.created_at, 1, 10) BETWEEN ?2 AND ?3
              AND NOT EXISTS (
                  SELECT 1 FROM pedidos o WHERE o.tenant_id = p.tenant_id AND o.id = p.pedido_id
              )
            ORDER BY p.created_at, p.id
            "#,
            ORDER_PAYMENT_COLUMNS
        );
        let rows: Vec<OrderPaymentRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(lo)
            .bind(hi)
            .fetch_all(&mut *conn)
            .await?;
        for row in rows {
            let payment = row.into_payment(self.offset)?;
            if window.contains(payment.created_at) {
                ledger.orphan_order_payments.push(payment);
            }
        }

        let orphans = ledger.orphan_credit_payments.len() + ledger.orphan_order_payments.len();
        if orphans > 0 {
            warn!(tenant_id = %tenant_id, orphans, "Payments without a document in window");
        }
        Ok(())
    }

    // =========================================================================
    // Inventory inputs
    // =========================================================================

    /// Every product of the tenant, active or not.
    pub async fn load_products(&self, tenant_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE tenant_id = ?1 ORDER BY codigo",
            crate::repository::product::PRODUCT_COLUMNS
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| r.into_product(self.offset)).collect()
    }

    /// Movements at or after `since`.
    pub async fn load_movements_since(
        &self,
        tenant_id: &str,
        since: DateTime<Utc>,
    ) -> DbResult<Vec<InventoryMovement>> {
        let lo = coarse_floor(since);
        let sql = format!(
            "SELECT {} FROM inventory_movements WHERE tenant_id = ?1 \
             AND substr(created_at, 1, 10) >= ?2 ORDER BY created_at, id",
            MOVEMENT_COLUMNS
        );
        let rows: Vec<MovementRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(lo)
            .fetch_all(&self.pool)
            .await?;

        let mut movements = Vec::with_capacity(rows.len());
        for row in rows {
            let m = row.into_movement(self.offset)?;
            if m.created_at >= since {
                movements.push(m);
            }
        }
        Ok(movements)
    }

    /// Movements inside `window`.
    pub async fn load_movements_in(
        &self,
        tenant_id: &str,
        window: &DateWindow,
    ) -> DbResult<Vec<InventoryMovement>> {
        let movements = self.load_movements_since(tenant_id, window.start()).await?;
        Ok(movements
            .into_iter()
            .filter(|m| window.contains(m.created_at))
            .collect())
    }

    /// Cash-sale lines with a product, sold at or after `since`.
    ///
    /// Return lines come back with their negative quantity.
    pub async fn load_sold_lines_since(
        &self,
        tenant_id: &str,
        since: DateTime<Utc>,
    ) -> DbResult<Vec<SoldLine>> {
        let rows: Vec<SoldLineRow> = sqlx::query_as(
            r#"
            SELECT i.product_id AS product_id, i.quantity AS quantity, v.created_at AS created_at
            FROM venta_contado_items i
            JOIN ventas_contado v ON v.id = i.venta_id
            WHERE v.tenant_id = ?1 AND i.product_id IS NOT NULL
              AND substr(v.created_at, 1, 10) >= ?2
            ORDER BY v.created_at
            "#,
        )
        .bind(tenant_id)
        .bind(coarse_floor(since))
        .fetch_all(&self.pool)
        .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let at = ts_parse(&row.created_at, self.offset)?;
            if at >= since {
                lines.push(SoldLine {
                    product_id: row.product_id,
                    quantity: row.quantity,
                    at,
                });
            }
        }
        Ok(lines)
    }
}

/// Date prefix one day before `since`, for a coarse `>=` prefilter.
fn coarse_floor(since: DateTime<Utc>) -> String {
    (since - Duration::days(1)).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::layaway::NewCreditPayment;
    use crate::test_support::{at, cash_sale, date, layaway, product, setup};
    use quilate_core::ledger::LegacySale;
    use quilate_core::{Actor, Money, PaymentMethod};

    fn window(from: u32, to: u32) -> DateWindow {
        DateWindow::new(date(from), date(to), StoreOffset::default()).unwrap()
    }

    #[tokio::test]
    async fn test_naive_and_aware_timestamps_land_on_the_same_day() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 5)).await.unwrap();

        // 2026-03-10 23:30 local, stored aware (UTC next day)
        let aware = cash_sale(&tenant, &p, 1, PaymentMethod::Efectivo, at(11, 5) + Duration::minutes(30));
        db.cash_sales().create(&aware, at(11, 6)).await.unwrap();

        // same wall time stored naive by an older writer
        let naive = cash_sale(&tenant, &p, 1, PaymentMethod::Efectivo, at(11, 5));
        db.cash_sales().create(&naive, at(11, 6)).await.unwrap();
        sqlx::query("UPDATE ventas_contado SET created_at = '2026-03-10 23:30:00' WHERE id = ?1")
            .bind(&naive.id)
            .execute(db.pool())
            .await
            .unwrap();

        let day = db.ledger().load_ledger(&tenant, &window(10, 10)).await.unwrap();
        assert_eq!(day.cash_sales.len(), 2);

        let next = db.ledger().load_ledger(&tenant, &window(11, 11)).await.unwrap();
        assert!(next.cash_sales.is_empty());
    }

    #[tokio::test]
    async fn test_layaway_in_scope_through_payment_only() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 5)).await.unwrap();
        let actor = Actor::new("u1");

        let l = db.layaways().create(&layaway(&tenant, &p, 1_000, &[300]), &actor, at(1, 18)).await.unwrap();
        let abono = NewCreditPayment {
            amount: Money::from_pesos(200),
            method: PaymentMethod::Transferencia,
            kind: None,
            notes: None,
        };
        db.layaways().add_payment(&tenant, &l.id, &abono, &actor, at(20, 18)).await.unwrap();

        let ledger = db.ledger().load_ledger(&tenant, &window(20, 20)).await.unwrap();
        assert_eq!(ledger.layaways.len(), 1);
        // full payment history, not only the in-window row
        assert_eq!(ledger.layaways[0].payments.len(), 2);

        let quiet = db.ledger().load_ledger(&tenant, &window(10, 12)).await.unwrap();
        assert!(quiet.layaways.is_empty());
    }

    #[tokio::test]
    async fn test_orphan_payments_and_legacy_sales() {
        let (db, tenant) = setup().await;

        sqlx::query(
            "INSERT INTO credit_payments (id, tenant_id, apartado_id, amount_cents, payment_method, created_at) \
             VALUES ('cp-x', ?1, 'gone', 5000, 'efectivo', '2026-03-10 12:00:00')",
        )
        .bind(&tenant)
        .execute(db.pool())
        .await
        .unwrap();

        for (id, status) in [("s-1", "completed"), ("s-2", "voided")] {
            db.cash_sales()
                .import_legacy(&LegacySale {
                    id: id.to_string(),
                    tenant_id: tenant.clone(),
                    total: Money::from_pesos(250),
                    payment_method: PaymentMethod::Tarjeta,
                    vendedor_id: None,
                    user_id: Some("u-old".to_string()),
                    status: status.to_string(),
                    created_at: at(10, 18),
                })
                .await
                .unwrap();
        }

        let ledger = db.ledger().load_ledger(&tenant, &window(10, 10)).await.unwrap();
        assert_eq!(ledger.orphan_credit_payments.len(), 1);
        assert_eq!(ledger.orphan_credit_payments[0].amount, Money::from_pesos(50));
        assert_eq!(ledger.cash_sales.len(), 1);
        assert_eq!(ledger.cash_sales[0].tender.tarjeta, Money::from_pesos(250));
    }

    #[tokio::test]
    async fn test_sold_lines_keep_return_sign() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 5)).await.unwrap();

        let sale = cash_sale(&tenant, &p, 2, PaymentMethod::Efectivo, at(10, 18));
        db.cash_sales().create(&sale, at(10, 18)).await.unwrap();
        let mut ret = cash_sale(&tenant, &p, -1, PaymentMethod::Efectivo, at(12, 18));
        ret.return_of_id = Some(sale.id.clone());
        db.cash_sales().create(&ret, at(12, 18)).await.unwrap();

        let lines = db.ledger().load_sold_lines_since(&tenant, at(11, 6)).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, -1);
    }
}
