//! # Engine Services
//!
//! The operations the enclosing service exposes: reports, day close,
//! period views, historical stock, status transitions and repricing.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Engine (this module)                             │
//! │                                                                         │
//! │  compute_report(tenant, from, to)                                      │
//! │       │  DateWindow::new(from, to, offset)                             │
//! │       ▼                                                                 │
//! │  LedgerRepository::load_ledger ──► quilate_core::compute_report        │
//! │       │                                                                 │
//! │       ├──► close_day ──► ClosureDocument ──► day_closures (insert once)│
//! │       └──► inventory_report ──► inventory_closures                     │
//! │                                                                         │
//! │  transition_* / sweep_overdue / upsert_metal_rate                      │
//! │       │  one transaction per document:                                 │
//! │       │  status + history row + stock movements, committed once        │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! "Now" comes from an injected [`Clock`]; production uses [`SystemClock`].

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::closure::ClosureKind;
use crate::repository::inventory::{record_movement_in, NewMovement};
use crate::repository::ledger::LedgerRepository;
use crate::repository::{layaway, metal_rate, new_id, order, product};
use quilate_core::catalog::{MetalRate, Product};
use quilate_core::closure::{sum_period, ClosureDocument, ClosureRef, PeriodReport};
use quilate_core::inventory::{historical_stock, GroupedStock, InventoryMovement, InventoryReport};
use quilate_core::ledger::{Layaway, LineItem, Order};
use quilate_core::pricing::{reprice_plan, Reprice};
use quilate_core::state::{layaway_is_overdue, order_is_overdue};
use quilate_core::time::Clock;
use quilate_core::validation::{validate_metal_type, validate_rate_cents};
use quilate_core::{
    compute_report, Actor, CoreError, CreditStatus, DataWarning, DateWindow, EngineSettings, Money,
    MovementReason, MovementType, OrderStatus, Report, StoreOffset,
};

// =============================================================================
// Clock
// =============================================================================

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// Results
// =============================================================================

/// Documents moved to vencido by one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub layaways: Vec<String>,
    pub orders: Vec<String>,
}

impl SweepSummary {
    pub fn total(&self) -> usize {
        self.layaways.len() + self.orders.len()
    }
}

/// Outcome of a metal-rate update.
#[derive(Debug, Clone, PartialEq)]
pub struct RateUpdate {
    pub rate: MetalRate,
    /// Empty unless recomputation was requested.
    pub repriced: Vec<Reprice>,
}

// =============================================================================
// Engine
// =============================================================================

/// Entry point for every tenant-scoped operation.
///
/// ## Usage
/// ```rust,ignore
/// let engine = Engine::new(db, EngineSettings::default())?;
/// let closure = engine.close_day("joyeria-centro", date, &actor).await?;
/// ```
#[derive(Clone)]
pub struct Engine {
    db: Database,
    settings: EngineSettings,
    offset: StoreOffset,
    clock: Arc<dyn Clock>,
}

impl Engine {
    /// Builds an engine on the wall clock.
    ///
    /// ## Errors
    /// `Domain(Validation)` or `Domain(InvalidTimestamp)` for bad settings.
    pub fn new(db: Database, settings: EngineSettings) -> DbResult<Self> {
        settings.validate()?;
        let offset = settings.offset()?;
        Ok(Engine {
            db,
            settings,
            offset,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock (tests pin "now").
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Store-local date of "now".
    pub fn today(&self) -> NaiveDate {
        self.offset.local_date(self.clock.now())
    }

    fn ledger(&self) -> LedgerRepository {
        self.db.ledger().with_offset(self.offset)
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Report for the inclusive local-date range `[from, to]`.
    ///
    /// ## Errors
    /// `Domain(InvalidWindow)` when `from > to`.
    pub async fn compute_report(&self, tenant_id: &str, from: NaiveDate, to: NaiveDate) -> DbResult<Report> {
        let window = DateWindow::new(from, to, self.offset)?;
        self.report_for(tenant_id, &window).await
    }

    async fn report_for(&self, tenant_id: &str, window: &DateWindow) -> DbResult<Report> {
        let ledger = self.ledger().load_ledger(tenant_id, window).await?;
        let report = compute_report(tenant_id, &ledger, window, &self.settings, self.clock.now())?;

        log_warnings(tenant_id, &report.warnings);
        info!(
            tenant_id = %tenant_id,
            from = %window.from(),
            to = %window.to(),
            net_cash_flow = %report.totals.net_cash_flow,
            warnings = report.warnings.len(),
            "Report computed"
        );
        Ok(report)
    }

    /// Stock activity over `[from, to]` with the stock at the end of `to`.
    pub async fn inventory_report(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<InventoryReport> {
        let window = DateWindow::new(from, to, self.offset)?;
        self.inventory_report_for(tenant_id, &window).await
    }

    async fn inventory_report_for(&self, tenant_id: &str, window: &DateWindow) -> DbResult<InventoryReport> {
        let ledger = self.ledger();
        let products = ledger.load_products(tenant_id).await?;
        let movements = ledger.load_movements_in(tenant_id, window).await?;
        let sales = self.report_for(tenant_id, window).await?;
        let stock = self.stock_at(tenant_id, window.to(), &products).await?;

        let report = InventoryReport::build(window, &products, &movements, &sales, stock, self.clock.now());
        log_warnings(tenant_id, &report.warnings);
        debug!(
            tenant_id = %tenant_id,
            entradas = report.totals.entradas,
            salidas = report.totals.salidas,
            existencia = report.stock.total_pieces,
            "Inventory report computed"
        );
        Ok(report)
    }

    /// Stock of active products at the end of `date`, grouped.
    ///
    /// Dates from today on return the current stock.
    pub async fn historical_stock(&self, tenant_id: &str, date: NaiveDate) -> DbResult<GroupedStock> {
        let products = self.ledger().load_products(tenant_id).await?;
        let stock = self.stock_at(tenant_id, date, &products).await?;
        log_warnings(tenant_id, &stock.warnings);
        Ok(stock)
    }

    async fn stock_at(&self, tenant_id: &str, date: NaiveDate, products: &[Product]) -> DbResult<GroupedStock> {
        let today = self.today();
        if date >= today {
            return Ok(historical_stock(date, today, self.offset, products, &[], &[]));
        }

        let since = self.offset.start_of_day(date + Duration::days(1));
        let ledger = self.ledger();
        let movements = ledger.load_movements_since(tenant_id, since).await?;
        let sold = ledger.load_sold_lines_since(tenant_id, since).await?;
        debug!(
            tenant_id = %tenant_id,
            %date,
            movements = movements.len(),
            sold_lines = sold.len(),
            "Replaying stock"
        );
        Ok(historical_stock(date, today, self.offset, products, &movements, &sold))
    }

    // =========================================================================
    // Day close
    // =========================================================================

    /// Freezes the sales report of `date`.
    ///
    /// ## Errors
    /// `Domain(AlreadyExists)` when the day is already closed, including for
    /// the loser of two concurrent closes.
    pub async fn close_day(&self, tenant_id: &str, date: NaiveDate, actor: &Actor) -> DbResult<ClosureRef> {
        let window = DateWindow::single_day(date, self.offset);
        let report = self.report_for(tenant_id, &window).await?;
        let document = ClosureDocument::from_report(&report, date, self.clock.now(), Some(actor.user_id.clone()))?;
        self.db.closures().insert(ClosureKind::Sales, &document).await
    }

    /// The frozen sales document of `date`.
    ///
    /// ## Errors
    /// `Domain(NotFound)` while the day is pending.
    pub async fn view_day(&self, tenant_id: &str, date: NaiveDate) -> DbResult<ClosureDocument> {
        self.db
            .closures()
            .get(ClosureKind::Sales, tenant_id, date)
            .await?
            .ok_or_else(|| CoreError::not_found("day_closure", format!("{}/{}", tenant_id, date)).into())
    }

    /// Sums the closed days of `[from, to]`; pending days count zero.
    pub async fn view_period(&self, tenant_id: &str, from: NaiveDate, to: NaiveDate) -> DbResult<PeriodReport> {
        let window = DateWindow::new(from, to, self.offset)?;
        let closures = self.db.closures().list(ClosureKind::Sales, tenant_id, from, to).await?;
        let period = sum_period(tenant_id, &window, &closures);
        info!(
            tenant_id = %tenant_id,
            %from,
            %to,
            closed = period.closed_days,
            pending = period.pending_days,
            "Period summed"
        );
        Ok(period)
    }

    /// Freezes the inventory report of `date`.
    pub async fn close_inventory_day(
        &self,
        tenant_id: &str,
        date: NaiveDate,
        actor: &Actor,
    ) -> DbResult<ClosureRef> {
        let window = DateWindow::single_day(date, self.offset);
        let report = self.inventory_report_for(tenant_id, &window).await?;
        let document =
            ClosureDocument::from_inventory(&report, date, self.clock.now(), Some(actor.user_id.clone()))?;
        self.db.closures().insert(ClosureKind::Inventory, &document).await
    }

    pub async fn view_inventory_day(&self, tenant_id: &str, date: NaiveDate) -> DbResult<ClosureDocument> {
        self.db
            .closures()
            .get(ClosureKind::Inventory, tenant_id, date)
            .await?
            .ok_or_else(|| {
                CoreError::not_found("inventory_closure", format!("{}/{}", tenant_id, date)).into()
            })
    }

    // =========================================================================
    // Status transitions
    // =========================================================================

    /// Moves a layaway to `to` with its history row.
    ///
    /// Cancelling puts the reserved pieces back on the shelf as devolución
    /// entradas in the same transaction.
    ///
    /// ## Errors
    /// - `Domain(NotFound)` for an unknown id
    /// - `Domain(InvalidTransition)` when the machine forbids the move
    /// - `Domain(Invariant)` when entering pagado with a balance left
    pub async fn transition_layaway(
        &self,
        tenant_id: &str,
        id: &str,
        to: CreditStatus,
        actor: &Actor,
        notes: Option<&str>,
    ) -> DbResult<Layaway> {
        let now = self.clock.now();
        let mut tx = self.db.pool().begin().await?;

        let layaway = layaway::set_status_in(&mut tx, tenant_id, id, self.offset, to, actor, notes, now)
            .await?;
        if to == CreditStatus::Cancelado {
            let label = layaway.folio.clone().unwrap_or_else(|| layaway.id.clone());
            restock_layaway_in(&mut tx, tenant_id, self.offset, &label, &layaway.items, actor, now).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(layaway)
    }

    /// Moves an order to `to` with its history row.
    ///
    /// Entering recibido records one entrada per line against the catalog
    /// product, creating the product from the line snapshot when missing.
    pub async fn transition_order(
        &self,
        tenant_id: &str,
        id: &str,
        to: OrderStatus,
        actor: &Actor,
        notes: Option<&str>,
    ) -> DbResult<Order> {
        let now = self.clock.now();
        let mut tx = self.db.pool().begin().await?;

        let order = order::set_status_in(&mut tx, tenant_id, id, self.offset, to, actor, notes, now)
            .await?;
        if to == OrderStatus::Recibido {
            receive_order_in(&mut tx, tenant_id, self.offset, &order, actor, now).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(order)
    }

    /// Moves every open layaway and apartado order with a balance older than
    /// the overdue threshold to vencido, one transaction per document.
    pub async fn sweep_overdue(&self, tenant_id: &str, actor: &Actor) -> DbResult<SweepSummary> {
        let now = self.clock.now();
        let days = self.settings.overdue_days;
        let note = format!("vencido tras {} días", days);
        let mut summary = SweepSummary::default();

        for l in self.db.layaways().with_offset(self.offset).list_pending(tenant_id).await? {
            if !layaway_is_overdue(&l, now, days) {
                continue;
            }
            let mut tx = self.db.pool().begin().await?;
            let to = CreditStatus::Vencido;
            layaway::set_status_in(&mut tx, tenant_id, &l.id, self.offset, to, actor, Some(&note), now)
                .await?;
            tx.commit()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            summary.layaways.push(l.id);
        }

        for o in self.db.orders().with_offset(self.offset).list_pending(tenant_id).await? {
            if !order_is_overdue(&o, now, days) {
                continue;
            }
            let mut tx = self.db.pool().begin().await?;
            let to = OrderStatus::Vencido;
            order::set_status_in(&mut tx, tenant_id, &o.id, self.offset, to, actor, Some(&note), now)
                .await?;
            tx.commit()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            summary.orders.push(o.id);
        }

        info!(
            tenant_id = %tenant_id,
            layaways = summary.layaways.len(),
            orders = summary.orders.len(),
            "Overdue sweep finished"
        );
        Ok(summary)
    }

    // =========================================================================
    // Inventory and pricing
    // =========================================================================

    /// Records a manual stock movement.
    ///
    /// ## Errors
    /// `Domain(InsufficientStock)` when a salida exceeds the stock on hand.
    pub async fn record_movement(&self, tenant_id: &str, movement: &NewMovement) -> DbResult<InventoryMovement> {
        self.db.inventory().record(tenant_id, movement, self.clock.now()).await
    }

    /// Sets the per-gram rate of a metal; with `recompute`, reprices every
    /// metal-priced product of that karat in the same transaction.
    pub async fn upsert_metal_rate(
        &self,
        tenant_id: &str,
        metal_type: &str,
        rate_per_gram: Money,
        recompute: bool,
    ) -> DbResult<RateUpdate> {
        validate_metal_type(metal_type)?;
        validate_rate_cents(rate_per_gram.cents())?;
        let now = self.clock.now();

        let mut tx = self.db.pool().begin().await?;
        let rate = metal_rate::upsert_in(&mut tx, tenant_id, metal_type, rate_per_gram, now).await?;

        let mut repriced = Vec::new();
        if recompute {
            let products = product::list_by_metal_in(&mut tx, tenant_id, metal_type, self.offset).await?;
            repriced = reprice_plan(&products, metal_type, rate_per_gram);
            for change in &repriced {
                product::set_price_in(&mut tx, tenant_id, &change.product_id, change.new_price, now).await?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            tenant_id = %tenant_id,
            metal_type = %rate.metal_type,
            rate = %rate.rate_per_gram,
            repriced = repriced.len(),
            "Metal rate updated"
        );
        Ok(RateUpdate { rate, repriced })
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

async fn restock_layaway_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    offset: StoreOffset,
    label: &str,
    items: &[LineItem],
    actor: &Actor,
    now: DateTime<Utc>,
) -> DbResult<()> {
    for line in items.iter().filter(|l| l.quantity > 0) {
        let Some(product_id) = line.product_id.as_deref() else {
            continue;
        };
        if product::get_by_id_in(conn, tenant_id, product_id, offset).await?.is_none() {
            warn!(tenant_id = %tenant_id, product_id = %product_id, "Cancelled layaway line has no product");
            continue;
        }
        let movement = NewMovement {
            product_id: product_id.to_string(),
            movement_type: MovementType::Entrada,
            quantity: line.quantity,
            cost: Some(line.unit_cost),
            reason: MovementReason::Devolucion,
            notes: Some(format!("apartado cancelado {}", label)),
            user_id: Some(actor.user_id.clone()),
        };
        record_movement_in(conn, tenant_id, &movement, now).await?;
    }
    Ok(())
}

async fn receive_order_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    offset: StoreOffset,
    order: &Order,
    actor: &Actor,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let label = order.folio.clone().unwrap_or_else(|| order.id.clone());

    for (index, line) in order.lines().iter().enumerate() {
        if line.quantity <= 0 {
            continue;
        }
        let product_id = resolve_received_product(conn, tenant_id, offset, &label, index, line, now).await?;
        let movement = NewMovement {
            product_id,
            movement_type: MovementType::Entrada,
            quantity: line.quantity,
            cost: Some(line.unit_cost),
            reason: MovementReason::PedidoRecibido,
            notes: Some(format!("pedido {}", label)),
            user_id: Some(actor.user_id.clone()),
        };
        record_movement_in(conn, tenant_id, &movement, now).await?;
    }

    info!(tenant_id = %tenant_id, pedido = %label, "Order received into stock");
    Ok(())
}

/// Catalog product a received line lands on: the linked product, else the
/// one with the snapshot codigo, else a new one built from the snapshot.
async fn resolve_received_product(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    offset: StoreOffset,
    label: &str,
    index: usize,
    line: &LineItem,
    now: DateTime<Utc>,
) -> DbResult<String> {
    if let Some(id) = line.product_id.as_deref() {
        if let Some(existing) = product::get_by_id_in(conn, tenant_id, id, offset).await? {
            return Ok(existing.id);
        }
    }

    let codigo = line
        .snapshot
        .codigo
        .clone()
        .unwrap_or_else(|| format!("{}-{}", label, index + 1));
    if let Some(existing) = product::get_by_codigo_in(conn, tenant_id, &codigo, offset).await? {
        return Ok(existing.id);
    }

    let snap = &line.snapshot;
    let created = Product {
        id: new_id(),
        tenant_id: tenant_id.to_string(),
        codigo: codigo.clone(),
        name: snap.name.clone().unwrap_or_else(|| codigo.clone()),
        modelo: snap.modelo.clone(),
        color: snap.color.clone(),
        quilataje: snap.quilataje.clone(),
        marca: snap.marca.clone(),
        base: snap.base.clone(),
        tipo_joya: snap.tipo_joya.clone(),
        talla: snap.talla.clone(),
        weight_mg: snap.weight_mg,
        cost_price: snap.cost_price.unwrap_or(line.unit_cost),
        price: line.unit_price,
        discount_bps: 0,
        manual_price: true,
        stock: 0,
        active: true,
        created_at: now,
        updated_at: now,
    };
    product::insert_in(conn, &created).await?;
    info!(tenant_id = %tenant_id, codigo = %codigo, "Product created from received order");
    Ok(created.id)
}

fn log_warnings(tenant_id: &str, warnings: &[DataWarning]) {
    for w in warnings {
        warn!(
            tenant_id = %tenant_id,
            kind = ?w.kind,
            subject = %w.subject_id,
            detail = %w.detail,
            "Data inconsistency"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::layaway::NewCreditPayment;
    use crate::repository::order::NewOrderPayment;
    use crate::test_support::{at, cash_sale, date, layaway, line_for, order, product, setup, setup_on_disk};
    use chrono::TimeZone;
    use quilate_core::time::FixedClock;
    use quilate_core::{Bucket, EntityKind, ErrorKind, MethodTally, OrderKind, PaymentMethod};

    fn engine_at(db: &Database, now: DateTime<Utc>) -> Engine {
        Engine::new(db.clone(), EngineSettings::default())
            .unwrap()
            .with_clock(Arc::new(FixedClock(now)))
    }

    fn admin() -> Actor {
        Actor::new("u-admin")
    }

    #[tokio::test]
    async fn test_single_cash_sale_report() {
        let (db, tenant) = setup().await;
        let p1 = db.products().insert(&product(&tenant, "AN-001", 5)).await.unwrap();
        let p2 = db.products().insert(&product(&tenant, "AR-002", 5)).await.unwrap();

        let mut sale = cash_sale(&tenant, &p1, 1, PaymentMethod::Efectivo, at(10, 18));
        sale.items = vec![
            line_for(&p1, 1, Money::from_pesos(100)),
            line_for(&p2, 1, Money::from_pesos(50)),
        ];
        sale.subtotal = Money::from_pesos(150);
        sale.total = Money::from_pesos(150);
        sale.total_cost = Money::from_pesos(1_600);
        sale.utilidad = sale.total - sale.total_cost;
        sale.tender = MethodTally::single(PaymentMethod::Efectivo, Money::from_pesos(150));
        db.cash_sales().create(&sale, at(10, 18)).await.unwrap();

        let engine = engine_at(&db, at(11, 18));
        let report = engine.compute_report(&tenant, date(10), date(10)).await.unwrap();

        let active = report.bucket(Bucket::ActiveCash).unwrap();
        assert_eq!(active.efectivo, Money::from_pesos(150));
        assert_eq!(active.tarjeta, Money::zero());
        assert_eq!(report.totals.active_sales_net, Money::from_pesos(150));
        assert_eq!(report.pieces.vendidas, 2);
    }

    #[tokio::test]
    async fn test_layaway_abono_and_liquidation() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 1)).await.unwrap();
        let mut l = layaway(&tenant, &p, 1_000, &[300]);
        l.payments[0].method = PaymentMethod::Tarjeta;
        let l = db.layaways().create(&l, &admin(), at(1, 18)).await.unwrap();

        let card = NewCreditPayment {
            amount: Money::from_pesos(200),
            method: PaymentMethod::Tarjeta,
            kind: None,
            notes: None,
        };
        db.layaways().add_payment(&tenant, &l.id, &card, &admin(), at(11, 18)).await.unwrap();
        let cash = NewCreditPayment {
            amount: Money::from_pesos(500),
            method: PaymentMethod::Efectivo,
            kind: None,
            notes: None,
        };
        let paid = db.layaways().add_payment(&tenant, &l.id, &cash, &admin(), at(16, 18)).await.unwrap();
        assert_eq!(paid.credit_status, CreditStatus::Pagado);

        let engine = engine_at(&db, at(20, 18));
        let report = engine.compute_report(&tenant, date(11), date(16)).await.unwrap();

        assert_eq!(report.bucket(Bucket::PassiveLayawayAbono).unwrap().tarjeta_neto, Money::from_pesos(194));
        assert_eq!(report.totals.liquidation_total, Money::from_pesos(1_000));
        assert_eq!(report.bucket(Bucket::PassiveLayawayAnticipo).unwrap().bruto, Money::zero());
        assert_eq!(report.totals.net_cash_flow, report.totals.total_net_cash_in);
    }

    #[tokio::test]
    async fn test_cancelled_order_is_refundable() {
        let (db, tenant) = setup().await;
        let o = db
            .orders()
            .create(&order(&tenant, OrderKind::Apartado, 2_000, &[800]), &admin(), at(1, 18))
            .await
            .unwrap();

        let engine = engine_at(&db, at(3, 18));
        engine
            .transition_order(&tenant, &o.id, OrderStatus::Cancelado, &admin(), Some("cliente desistió"))
            .await
            .unwrap();

        let report = engine.compute_report(&tenant, date(1), date(3)).await.unwrap();
        assert_eq!(report.bucket(Bucket::PassiveOrderAnticipo).unwrap().efectivo, Money::from_pesos(800));
        assert_eq!(report.totals.refundable_pedidos, Money::from_pesos(800));
    }

    #[tokio::test]
    async fn test_order_with_saldo_cannot_be_marked_pagado() {
        let (db, tenant) = setup().await;
        let o = db
            .orders()
            .create(&order(&tenant, OrderKind::Apartado, 2_000, &[800]), &admin(), at(1, 18))
            .await
            .unwrap();

        let engine = engine_at(&db, at(2, 18));
        let err = engine
            .transition_order(&tenant, &o.id, OrderStatus::Pagado, &admin(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Invariant));

        let stored = db.orders().get(&tenant, &o.id).await.unwrap().unwrap();
        assert_eq!(stored.estado, OrderStatus::Pendiente);
        assert_eq!(stored.saldo_pendiente, Money::from_pesos(1_200));
        let history = db.status_history().list_for(&tenant, EntityKind::Pedido, &o.id).await.unwrap();
        assert_eq!(history.len(), 1);

        let report = engine.compute_report(&tenant, date(1), date(2)).await.unwrap();
        assert_eq!(report.totals.liquidation_total, Money::zero());
    }

    #[tokio::test]
    async fn test_historical_stock_replays_movements_and_sales() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 8)).await.unwrap();
        let engine = engine_at(&db, at(20, 18));

        let entrada = NewMovement {
            product_id: p.id.clone(),
            movement_type: MovementType::Entrada,
            quantity: 5,
            cost: Some(Money::from_pesos(800)),
            reason: MovementReason::AjusteManual,
            notes: None,
            user_id: Some("u1".to_string()),
        };
        db.inventory().record(&tenant, &entrada, at(15, 18)).await.unwrap();
        db.cash_sales()
            .create(&cash_sale(&tenant, &p, 3, PaymentMethod::Efectivo, at(18, 18)), at(18, 18))
            .await
            .unwrap();

        let past = engine.historical_stock(&tenant, date(14)).await.unwrap();
        assert!(past.historical);
        assert_eq!(past.product(&p.id), Some(8));

        let current = engine.historical_stock(&tenant, date(20)).await.unwrap();
        assert!(!current.historical);
        assert_eq!(current.product(&p.id), Some(10));
    }

    #[tokio::test]
    async fn test_close_day_is_idempotent_and_frozen() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 5)).await.unwrap();
        db.cash_sales()
            .create(&cash_sale(&tenant, &p, 1, PaymentMethod::Efectivo, at(10, 18)), at(10, 18))
            .await
            .unwrap();

        let engine = engine_at(&db, at(11, 3));
        let closed = engine.close_day(&tenant, date(10), &admin()).await.unwrap();
        assert_eq!(closed.date, date(10));

        let err = engine.close_day(&tenant, date(10), &admin()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::AlreadyExists));

        // a late sale dated on the closed day does not change the stored document
        db.cash_sales()
            .create(&cash_sale(&tenant, &p, 1, PaymentMethod::Efectivo, at(10, 20)), at(11, 4))
            .await
            .unwrap();
        let stored = engine.view_day(&tenant, date(10)).await.unwrap();
        assert_eq!(stored.metric("active_sales_net"), Money::from_pesos(2_000).cents());
        assert_eq!(stored.closed_by.as_deref(), Some("u-admin"));
        assert!(stored.sales_report().is_some());

        let pending = engine.view_day(&tenant, date(11)).await.unwrap_err();
        assert_eq!(pending.kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_racing_closes_store_one_document() {
        let (_dir, db, tenant) = setup_on_disk().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 5)).await.unwrap();
        db.cash_sales()
            .create(&cash_sale(&tenant, &p, 1, PaymentMethod::Efectivo, at(10, 18)), at(10, 18))
            .await
            .unwrap();

        let first = engine_at(&db, at(11, 3));
        let second = first.clone();
        let first_actor = admin();
        let second_actor = Actor::new("u-cajero");
        let (a, b) = tokio::join!(
            first.close_day(&tenant, date(10), &first_actor),
            second.close_day(&tenant, date(10), &second_actor),
        );

        let (won, lost): (Vec<_>, Vec<_>) = [a, b].into_iter().partition(|r| r.is_ok());
        assert_eq!(won.len(), 1);
        assert_eq!(lost.len(), 1);
        let err = lost.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::AlreadyExists));

        let stored = first.view_day(&tenant, date(10)).await.unwrap();
        assert_eq!(stored.metric("active_sales_net"), Money::from_pesos(2_000).cents());
        let period = first.view_period(&tenant, date(10), date(10)).await.unwrap();
        assert_eq!(period.closed_days, 1);
    }

    #[tokio::test]
    async fn test_view_period_sums_closed_days() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 5)).await.unwrap();
        for d in [10, 11, 12] {
            db.cash_sales()
                .create(&cash_sale(&tenant, &p, 1, PaymentMethod::Efectivo, at(d, 18)), at(d, 18))
                .await
                .unwrap();
        }

        let engine = engine_at(&db, at(13, 18));
        engine.close_day(&tenant, date(10), &admin()).await.unwrap();
        engine.close_day(&tenant, date(11), &admin()).await.unwrap();

        let period = engine.view_period(&tenant, date(10), date(12)).await.unwrap();
        assert_eq!(period.closed_days, 2);
        assert_eq!(period.pending_days, 1);
        assert!(!period.days[2].has_closure);
        assert_eq!(period.total("active_sales_net"), Money::from_pesos(4_000).cents());
    }

    #[tokio::test]
    async fn test_received_order_creates_product_and_entrada() {
        let (db, tenant) = setup().await;
        let o = db
            .orders()
            .create(&order(&tenant, OrderKind::Apartado, 3_000, &[1_000]), &admin(), at(1, 18))
            .await
            .unwrap();

        let engine = engine_at(&db, at(5, 18));
        for to in [OrderStatus::Pedido, OrderStatus::Pedidas, OrderStatus::Recibido] {
            engine.transition_order(&tenant, &o.id, to, &admin(), None).await.unwrap();
        }

        let created = db.products().get_by_codigo(&tenant, "PED-ANILLO-7").await.unwrap().unwrap();
        assert_eq!(created.stock, 1);
        assert_eq!(created.quilataje.as_deref(), Some("14k"));

        let movements = db.inventory().list_for_product(&tenant, &created.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].reason, MovementReason::PedidoRecibido);

        let history = db.status_history().list_for(&tenant, EntityKind::Pedido, &o.id).await.unwrap();
        assert_eq!(history.len(), 4);

        let inventory = engine.inventory_report(&tenant, date(5), date(5)).await.unwrap();
        assert_eq!(inventory.totals.pedidos_recibidos, 1);
    }

    #[tokio::test]
    async fn test_forbidden_transition_changes_nothing() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 1)).await.unwrap();
        let l = db
            .layaways()
            .create(&layaway(&tenant, &p, 1_000, &[300]), &admin(), at(1, 18))
            .await
            .unwrap();
        let engine = engine_at(&db, at(2, 18));

        let err = engine
            .transition_layaway(&tenant, &l.id, CreditStatus::Entregado, &admin(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Conflict));

        let err = engine
            .transition_layaway(&tenant, &l.id, CreditStatus::Pagado, &admin(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Invariant));

        let stored = db.layaways().get(&tenant, &l.id).await.unwrap().unwrap();
        assert_eq!(stored.credit_status, CreditStatus::Pendiente);
        let history = db.status_history().list_for(&tenant, EntityKind::Apartado, &l.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_layaway_returns_piece() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 1)).await.unwrap();
        let l = db
            .layaways()
            .create(&layaway(&tenant, &p, 1_000, &[300]), &admin(), at(1, 18))
            .await
            .unwrap();
        assert_eq!(db.products().get_by_id(&tenant, &p.id).await.unwrap().unwrap().stock, 0);

        let engine = engine_at(&db, at(2, 18));
        engine
            .transition_layaway(&tenant, &l.id, CreditStatus::Cancelado, &admin(), None)
            .await
            .unwrap();

        assert_eq!(db.products().get_by_id(&tenant, &p.id).await.unwrap().unwrap().stock, 1);
        let movements = db.inventory().list_for_product(&tenant, &p.id).await.unwrap();
        assert_eq!(movements[0].reason, MovementReason::Devolucion);
    }

    #[tokio::test]
    async fn test_historical_stock_sees_reserved_and_returned_pieces() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 1)).await.unwrap();
        let l = db
            .layaways()
            .create(&layaway(&tenant, &p, 1_000, &[300]), &admin(), at(5, 18))
            .await
            .unwrap();
        engine_at(&db, at(10, 18))
            .transition_layaway(&tenant, &l.id, CreditStatus::Cancelado, &admin(), None)
            .await
            .unwrap();

        let engine = engine_at(&db, at(20, 18));
        let before = engine.historical_stock(&tenant, date(3)).await.unwrap();
        assert_eq!(before.product(&p.id), Some(1));
        let reserved = engine.historical_stock(&tenant, date(7)).await.unwrap();
        assert_eq!(reserved.product(&p.id), Some(0));
        let returned = engine.historical_stock(&tenant, date(12)).await.unwrap();
        assert_eq!(returned.product(&p.id), Some(1));

        let inventory = engine.inventory_report(&tenant, date(5), date(10)).await.unwrap();
        assert_eq!(inventory.totals.salidas, 1);
        assert_eq!(inventory.totals.devoluciones, 1);
    }

    #[tokio::test]
    async fn test_transitions_read_naive_rows_with_store_offset() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 1)).await.unwrap();
        let l = db
            .layaways()
            .create(&layaway(&tenant, &p, 1_000, &[300]), &admin(), at(1, 18))
            .await
            .unwrap();
        let o = db
            .orders()
            .create(&order(&tenant, OrderKind::Apartado, 2_000, &[800]), &admin(), at(1, 18))
            .await
            .unwrap();
        sqlx::query("UPDATE apartados SET created_at = '2026-03-01 12:00:00' WHERE id = ?1")
            .bind(&l.id)
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE pedidos SET created_at = '2026-03-01 12:00:00' WHERE id = ?1")
            .bind(&o.id)
            .execute(db.pool())
            .await
            .unwrap();

        let utc_store = EngineSettings {
            utc_offset_minutes: 0,
            ..EngineSettings::default()
        };
        let engine = Engine::new(db.clone(), utc_store)
            .unwrap()
            .with_clock(Arc::new(FixedClock(at(2, 18))));
        let noon_utc = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let vencido = engine
            .transition_layaway(&tenant, &l.id, CreditStatus::Vencido, &admin(), None)
            .await
            .unwrap();
        assert_eq!(vencido.created_at, noon_utc);

        let pedido = engine
            .transition_order(&tenant, &o.id, OrderStatus::Pedido, &admin(), None)
            .await
            .unwrap();
        assert_eq!(pedido.created_at, noon_utc);

        // the default store offset reads the same wall clock as 18:00 UTC
        let stored = db.orders().get(&tenant, &o.id).await.unwrap().unwrap();
        assert_eq!(stored.created_at, at(1, 18));
        let utc_orders = db.orders().with_offset(StoreOffset::from_minutes(0).unwrap());
        let stored = utc_orders.get(&tenant, &o.id).await.unwrap().unwrap();
        assert_eq!(stored.created_at, noon_utc);
    }

    #[tokio::test]
    async fn test_sweep_moves_old_open_documents() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 2)).await.unwrap();
        let open = db
            .layaways()
            .create(&layaway(&tenant, &p, 1_000, &[300]), &admin(), at(1, 18))
            .await
            .unwrap();
        let pedido = db
            .orders()
            .create(&order(&tenant, OrderKind::Apartado, 2_000, &[500]), &admin(), at(1, 18))
            .await
            .unwrap();
        db.orders()
            .create(&order(&tenant, OrderKind::Contado, 2_000, &[2_000]), &admin(), at(1, 18))
            .await
            .unwrap();

        // day 1 + 75 days is May 15
        let early = engine_at(&db, Utc.with_ymd_and_hms(2026, 5, 10, 18, 0, 0).unwrap());
        assert_eq!(early.sweep_overdue(&tenant, &admin()).await.unwrap().total(), 0);

        let late = engine_at(&db, Utc.with_ymd_and_hms(2026, 5, 20, 18, 0, 0).unwrap());
        let swept = late.sweep_overdue(&tenant, &admin()).await.unwrap();
        assert_eq!(swept.layaways, vec![open.id.clone()]);
        assert_eq!(swept.orders, vec![pedido.id.clone()]);

        let stored = db.layaways().get(&tenant, &open.id).await.unwrap().unwrap();
        assert_eq!(stored.credit_status, CreditStatus::Vencido);

        // a vencido order can still be settled
        let rest = NewOrderPayment {
            amount: Money::from_pesos(1_500),
            method: PaymentMethod::Efectivo,
            kind: None,
        };
        let settled = db
            .orders()
            .add_payment(&tenant, &pedido.id, &rest, &admin(), at(20, 18))
            .await
            .unwrap();
        assert_eq!(settled.estado, OrderStatus::Pagado);
    }

    #[tokio::test]
    async fn test_record_movement_rejects_oversell() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 2)).await.unwrap();
        let engine = engine_at(&db, at(5, 18));

        let salida = NewMovement {
            product_id: p.id.clone(),
            movement_type: MovementType::Salida,
            quantity: 3,
            cost: None,
            reason: MovementReason::Eliminacion,
            notes: None,
            user_id: None,
        };
        let err = engine.record_movement(&tenant, &salida).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Invariant));
        assert_eq!(db.products().get_by_id(&tenant, &p.id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_rate_update_reprices_metal_products() {
        let (db, tenant) = setup().await;
        let priced = db.products().insert(&product(&tenant, "AN-001", 1)).await.unwrap();
        let mut manual = product(&tenant, "AN-002", 1);
        manual.manual_price = true;
        let manual = db.products().insert(&manual).await.unwrap();
        let engine = engine_at(&db, at(5, 18));

        let update = engine
            .upsert_metal_rate(&tenant, "14 K", Money::from_pesos(1_000), true)
            .await
            .unwrap();
        assert_eq!(update.rate.metal_type, "14k");
        assert_eq!(update.repriced.len(), 1);

        // 2.5 g at $1,000
        let repriced = db.products().get_by_id(&tenant, &priced.id).await.unwrap().unwrap();
        assert_eq!(repriced.price, Money::from_pesos(2_500));
        let untouched = db.products().get_by_id(&tenant, &manual.id).await.unwrap().unwrap();
        assert_eq!(untouched.price, Money::from_pesos(2_000));

        let bare = engine
            .upsert_metal_rate(&tenant, "14k", Money::from_pesos(1_200), false)
            .await
            .unwrap();
        assert!(bare.repriced.is_empty());
    }
}
