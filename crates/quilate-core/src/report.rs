//! # Corte de Caja Report
//!
//! Derived metrics computed from the counter bag.
//!
//! ## Pipeline
//! ```text
//! Ledger ──► classify() ──► CounterBag::accumulate() ──► compute_report()
//!                                                             │
//!            ┌────────────────────────────────────────────────┤
//!            ▼                    ▼                 ▼         ▼
//!        buckets (15)          totals          sellers     daily
//! ```
//!
//! ## Cash Identity
//! ```text
//! net_cash_flow = active_sales_net + liquidation_collected_net
//!               + passive_total − returns
//!
//! net_cash_flow == total_net_cash_in   (independent sum of payment rows)
//! ```
//! Both sides round card netting per bucket vs. once overall, so they may
//! differ by a few centavos; larger gaps raise a `ConservationMismatch`
//! warning. Refund and overdue buckets carry exposure and stay out of the
//! identity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::{cost_of, net_of, BucketCounter, CounterBag, PieceCounters, PieceRollups};
use crate::classify::{cash_in_net, classify, Bucket};
use crate::error::CoreResult;
use crate::ledger::Ledger;
use crate::money::Money;
use crate::settings::EngineSettings;
use crate::time::DateWindow;
use crate::warning::{DataWarning, WarningKind};

/// Version stamped on every report and closure document.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

// =============================================================================
// Report Sections
// =============================================================================

/// One bucket as reported: gross per method plus net.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub bucket: Bucket,
    pub documentos: u64,
    pub registros: u64,
    pub efectivo: Money,
    pub transferencia: Money,
    pub tarjeta: Money,
    pub tarjeta_neto: Money,
    pub otro: Money,
    pub bruto: Money,
    pub neto: Money,
    pub total_documentos: Money,
    pub costo: Money,
    pub piezas: i64,
}

impl BucketSummary {
    fn from_counter(bucket: Bucket, counter: Option<&BucketCounter>, card_fee_bps: u32) -> Self {
        let empty = BucketCounter::default();
        let c = counter.unwrap_or(&empty);
        BucketSummary {
            bucket,
            documentos: c.documents(),
            registros: c.rows,
            efectivo: c.gross.efectivo,
            transferencia: c.gross.transferencia,
            tarjeta: c.gross.tarjeta,
            tarjeta_neto: c.gross.tarjeta_net(card_fee_bps),
            otro: c.gross.otro,
            bruto: c.gross.gross(),
            neto: c.net(card_fee_bps),
            total_documentos: c.document_total,
            costo: c.cost,
            piezas: c.pieces,
        }
    }

    fn metrics(&self, out: &mut BTreeMap<String, i64>) {
        let key = self.bucket.key();
        let fields = [
            ("documentos", self.documentos as i64),
            ("registros", self.registros as i64),
            ("efectivo", self.efectivo.cents()),
            ("transferencia", self.transferencia.cents()),
            ("tarjeta", self.tarjeta.cents()),
            ("tarjeta_neto", self.tarjeta_neto.cents()),
            ("otro", self.otro.cents()),
            ("bruto", self.bruto.cents()),
            ("neto", self.neto.cents()),
            ("total_documentos", self.total_documentos.cents()),
            ("costo", self.costo.cents()),
            ("piezas", self.piezas),
        ];
        for (field, value) in fields {
            out.insert(format!("{}.{}", key, field), value);
        }
    }
}

/// Field names every bucket contributes to the flat metric map.
pub const BUCKET_METRIC_FIELDS: [&str; 12] = [
    "documentos",
    "registros",
    "efectivo",
    "transferencia",
    "tarjeta",
    "tarjeta_neto",
    "otro",
    "bruto",
    "neto",
    "total_documentos",
    "costo",
    "piezas",
];

/// Headline figures. Money is net of the card fee unless named gross.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Totals {
    pub active_sales_net: Money,
    pub active_cost: Money,
    pub active_profit: Money,
    /// Document totals of layaways and orders liquidated in-window.
    pub liquidation_total: Money,
    /// Cash actually received by the liquidating payments.
    pub liquidation_collected_net: Money,
    pub liquidation_cost: Money,
    pub liquidation_profit: Money,
    pub anticipos_net: Money,
    pub abonos_net: Money,
    pub passive_total: Money,
    /// Money handed back on cash-sale returns (positive).
    pub returns: Money,
    pub returns_cost: Money,
    /// Owed back on cancelled contado orders.
    pub contado_refunds: Money,
    pub receivable_layaways: Money,
    pub receivable_orders: Money,
    pub accounts_receivable: Money,
    pub saldo_vencido_apartados: Money,
    pub saldo_vencido_pedidos: Money,
    pub refundable_apartados: Money,
    pub refundable_pedidos: Money,
    pub net_cash_flow: Money,
    pub total_net_cash_in: Money,
    /// Active plus liquidation profit, less the margin given back on returns.
    pub total_profit: Money,
    pub other_rows: i64,
}

impl Totals {
    /// Name → value pairs, money in centavos.
    pub fn entries(&self) -> [(&'static str, i64); 24] {
        [
            ("active_sales_net", self.active_sales_net.cents()),
            ("active_cost", self.active_cost.cents()),
            ("active_profit", self.active_profit.cents()),
            ("liquidation_total", self.liquidation_total.cents()),
            ("liquidation_collected_net", self.liquidation_collected_net.cents()),
            ("liquidation_cost", self.liquidation_cost.cents()),
            ("liquidation_profit", self.liquidation_profit.cents()),
            ("anticipos_net", self.anticipos_net.cents()),
            ("abonos_net", self.abonos_net.cents()),
            ("passive_total", self.passive_total.cents()),
            ("returns", self.returns.cents()),
            ("returns_cost", self.returns_cost.cents()),
            ("contado_refunds", self.contado_refunds.cents()),
            ("receivable_layaways", self.receivable_layaways.cents()),
            ("receivable_orders", self.receivable_orders.cents()),
            ("accounts_receivable", self.accounts_receivable.cents()),
            ("saldo_vencido_apartados", self.saldo_vencido_apartados.cents()),
            ("saldo_vencido_pedidos", self.saldo_vencido_pedidos.cents()),
            ("refundable_apartados", self.refundable_apartados.cents()),
            ("refundable_pedidos", self.refundable_pedidos.cents()),
            ("net_cash_flow", self.net_cash_flow.cents()),
            ("total_net_cash_in", self.total_net_cash_in.cents()),
            ("total_profit", self.total_profit.cents()),
            ("other_rows", self.other_rows),
        ]
    }
}

/// Per-seller figures, all net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerStats {
    pub seller_id: String,
    pub ventas_netas: Money,
    pub devoluciones: Money,
    pub anticipos: Money,
    pub abonos: Money,
    pub liquidaciones_cobradas: Money,
    pub total_neto: Money,
    pub costo_ventas: Money,
    pub utilidad: Money,
    pub registros: u64,
    pub piezas_vendidas: i64,
}

/// One store-local day of the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    /// Gross, as captured, for auditability.
    pub subtotal_bruto: Money,
    pub ventas_netas: Money,
    pub devoluciones: Money,
    pub anticipos: Money,
    pub abonos: Money,
    pub liquidaciones: Money,
    pub total_neto: Money,
    pub documentos: u64,
}

/// Net figures shared by the global, per-seller and per-day views.
struct CashFigures {
    ventas_netas: Money,
    devoluciones: Money,
    anticipos: Money,
    abonos: Money,
    liquidaciones: Money,
}

impl CashFigures {
    fn from_map(map: &BTreeMap<Bucket, BucketCounter>, fee: u32) -> Self {
        CashFigures {
            ventas_netas: net_of(map, Bucket::ActiveCash, fee) + net_of(map, Bucket::ActiveOrderCash, fee),
            devoluciones: -net_of(map, Bucket::CancellationCashSale, fee),
            anticipos: net_of(map, Bucket::PassiveLayawayAnticipo, fee)
                + net_of(map, Bucket::PassiveOrderAnticipo, fee),
            abonos: net_of(map, Bucket::PassiveLayawayAbono, fee)
                + net_of(map, Bucket::PassiveOrderAbono, fee),
            liquidaciones: net_of(map, Bucket::LiquidationLayaway, fee)
                + net_of(map, Bucket::LiquidationOrder, fee),
        }
    }

    fn total(&self) -> Money {
        self.ventas_netas + self.liquidaciones + self.anticipos + self.abonos - self.devoluciones
    }
}

// =============================================================================
// Report
// =============================================================================

/// The full computed report for a tenant and window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: u32,
    pub tenant_id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub card_fee_bps: u32,
    pub buckets: Vec<BucketSummary>,
    #[serde(default)]
    pub totals: Totals,
    #[serde(default)]
    pub pieces: PieceCounters,
    #[serde(default)]
    pub piezas_por_nombre: PieceRollups,
    #[serde(default)]
    pub sellers: Vec<SellerStats>,
    #[serde(default)]
    pub daily: Vec<DailySummary>,
    #[serde(default)]
    pub warnings: Vec<DataWarning>,
}

impl Report {
    /// Summary of one bucket.
    pub fn bucket(&self, bucket: Bucket) -> Option<&BucketSummary> {
        self.buckets.iter().find(|b| b.bucket == bucket)
    }

    /// Flat `name → integer` view, money in centavos.
    ///
    /// Names are stable and additive across schema versions.
    pub fn metrics(&self) -> BTreeMap<String, i64> {
        let mut out = BTreeMap::new();
        for summary in &self.buckets {
            summary.metrics(&mut out);
        }
        for (name, value) in self.totals.entries() {
            out.insert(name.to_string(), value);
        }
        for (name, value) in piece_entries(&self.pieces) {
            out.insert(name.to_string(), value);
        }
        out.insert("warnings".to_string(), self.warnings.len() as i64);
        out
    }
}

/// Piece counter name → value pairs.
pub fn piece_entries(p: &PieceCounters) -> [(&'static str, i64); 10] {
    [
        ("piezas.vendidas", p.vendidas),
        ("piezas.devueltas", p.devueltas),
        ("piezas.apartadas", p.apartadas),
        ("piezas.pedidas", p.pedidas),
        ("piezas.liquidadas", p.liquidadas()),
        ("piezas.liquidadas_apartados", p.liquidadas_apartados),
        ("piezas.liquidadas_pedidos", p.liquidadas_pedidos),
        ("piezas.entregadas", p.entregadas),
        ("piezas.canceladas", p.canceladas),
        ("piezas.vencidas", p.vencidas),
    ]
}

/// Computes the report for `window` from an already-loaded ledger.
///
/// ## Errors
/// `BadInput` when the settings carry an invalid UTC offset.
pub fn compute_report(
    tenant_id: &str,
    ledger: &Ledger,
    window: &DateWindow,
    settings: &EngineSettings,
    generated_at: DateTime<Utc>,
) -> CoreResult<Report> {
    let offset = settings.offset()?;
    let fee = settings.card_fee_bps;

    let classified = classify(ledger, window);
    let bag = CounterBag::accumulate(&classified, offset);
    let mut warnings = classified.warnings.clone();

    let buckets: Vec<BucketSummary> = Bucket::ALL
        .iter()
        .map(|b| BucketSummary::from_counter(*b, bag.bucket(*b), fee))
        .collect();

    let cash = CashFigures::from_map(&bag.buckets, fee);
    let mut totals = Totals {
        active_sales_net: cash.ventas_netas,
        active_cost: bag.cost(Bucket::ActiveCash) + bag.cost(Bucket::ActiveOrderCash),
        liquidation_collected_net: cash.liquidaciones,
        liquidation_cost: bag.cost(Bucket::LiquidationLayaway) + bag.cost(Bucket::LiquidationOrder),
        anticipos_net: cash.anticipos,
        abonos_net: cash.abonos,
        passive_total: cash.anticipos + cash.abonos,
        returns: cash.devoluciones,
        returns_cost: -bag.cost(Bucket::CancellationCashSale),
        contado_refunds: bag.net(Bucket::CancellationOrderCash, fee),
        saldo_vencido_apartados: bag.net(Bucket::OverdueLayaway, fee),
        saldo_vencido_pedidos: bag.net(Bucket::OverdueOrder, fee),
        refundable_apartados: bag.net(Bucket::RefundLayawayCancelled, fee),
        refundable_pedidos: bag.net(Bucket::RefundOrderCancelled, fee),
        net_cash_flow: cash.total(),
        total_net_cash_in: cash_in_net(ledger, window, fee),
        other_rows: bag.other_rows() as i64,
        ..Totals::default()
    };

    totals.liquidation_total = [Bucket::LiquidationLayaway, Bucket::LiquidationOrder]
        .iter()
        .filter_map(|b| bag.bucket(*b))
        .map(|c| c.document_total)
        .sum();
    totals.active_profit = totals.active_sales_net - totals.active_cost;
    totals.liquidation_profit = totals.liquidation_total - totals.liquidation_cost;
    totals.total_profit = totals.active_profit + totals.liquidation_profit
        - (totals.returns - totals.returns_cost);

    totals.receivable_layaways = ledger
        .layaways
        .iter()
        .filter(|l| l.credit_status.is_open() && window.contains(l.created_at))
        .map(|l| l.balance())
        .sum();
    totals.receivable_orders = ledger
        .orders
        .iter()
        .filter(|o| o.estado.is_open() && window.contains(o.created_at))
        .map(|o| o.saldo_pendiente)
        .sum();
    totals.accounts_receivable = totals.receivable_layaways + totals.receivable_orders;

    let delta = totals.total_net_cash_in - totals.net_cash_flow;
    let tolerance = Bucket::ALL.iter().filter(|b| b.moves_cash()).count() as i64;
    if delta.cents().abs() > tolerance {
        warnings.push(DataWarning::new(
            WarningKind::ConservationMismatch,
            tenant_id,
            format!(
                "bucket cash flow {} vs payment rows {} (delta {})",
                totals.net_cash_flow, totals.total_net_cash_in, delta
            ),
        ));
    }

    let sellers = bag
        .sellers
        .iter()
        .map(|(seller_id, map)| {
            let figures = CashFigures::from_map(map, fee);
            let costo_ventas = cost_of(map, Bucket::ActiveCash) + cost_of(map, Bucket::ActiveOrderCash);
            SellerStats {
                seller_id: seller_id.clone(),
                ventas_netas: figures.ventas_netas,
                devoluciones: figures.devoluciones,
                anticipos: figures.anticipos,
                abonos: figures.abonos,
                liquidaciones_cobradas: figures.liquidaciones,
                total_neto: figures.total(),
                costo_ventas,
                utilidad: figures.ventas_netas - costo_ventas,
                registros: map
                    .iter()
                    .filter(|(b, _)| b.moves_cash())
                    .map(|(_, c)| c.rows)
                    .sum(),
                piezas_vendidas: [Bucket::ActiveCash, Bucket::ActiveOrderCash, Bucket::CancellationCashSale]
                    .iter()
                    .filter_map(|b| map.get(b))
                    .map(|c| c.pieces)
                    .sum(),
            }
        })
        .collect();

    let daily = bag
        .days
        .iter()
        .map(|(date, map)| {
            let figures = CashFigures::from_map(map, fee);
            DailySummary {
                date: *date,
                subtotal_bruto: map
                    .iter()
                    .filter(|(b, _)| b.moves_cash())
                    .map(|(_, c)| c.gross.gross())
                    .sum(),
                ventas_netas: figures.ventas_netas,
                devoluciones: figures.devoluciones,
                anticipos: figures.anticipos,
                abonos: figures.abonos,
                liquidaciones: figures.liquidaciones,
                total_neto: figures.total(),
                documentos: bag
                    .day_documents
                    .get(date)
                    .map(|d| d.len() as u64)
                    .unwrap_or(0),
            }
        })
        .collect();

    Ok(Report {
        schema_version: REPORT_SCHEMA_VERSION,
        tenant_id: tenant_id.to_string(),
        from: window.from(),
        to: window.to(),
        generated_at,
        card_fee_bps: fee,
        buckets,
        totals,
        pieces: bag.pieces,
        piezas_por_nombre: bag.rollups,
        sellers,
        daily,
        warnings,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use crate::types::{
        CreditPaymentKind, CreditStatus, OrderKind, OrderPaymentKind, OrderStatus, PaymentMethod,
        MOSTRADOR_SELLER_ID,
    };

    fn report(ledger: &Ledger, from: u32, to: u32) -> Report {
        compute_report("t1", ledger, &window(from, to), &EngineSettings::default(), day(28, 12))
            .unwrap()
    }

    #[test]
    fn test_single_cash_sale() {
        let mut ledger = Ledger::default();
        ledger.cash_sales.push(cash_sale(
            "s1",
            day(10, 18),
            &[(100, 1), (50, 1)],
            PaymentMethod::Efectivo,
        ));

        let r = report(&ledger, 10, 10);
        let active = r.bucket(Bucket::ActiveCash).unwrap();
        assert_eq!(active.efectivo, Money::from_pesos(150));
        assert_eq!(active.tarjeta, Money::zero());
        assert_eq!(r.totals.active_sales_net, Money::from_pesos(150));
        assert_eq!(r.pieces.vendidas, 2);
        assert_eq!(r.totals.net_cash_flow, r.totals.total_net_cash_in);
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn test_layaway_abono_and_liquidation_window() {
        // created on the 1st, abono on the 11th, liquidated on the 16th
        let mut l = layaway("L1", 1000, day(1, 18), CreditStatus::Pagado);
        l.payments = vec![
            credit_payment("p1", "L1", 300, PaymentMethod::Tarjeta, CreditPaymentKind::Anticipo, day(1, 18)),
            credit_payment("p2", "L1", 200, PaymentMethod::Tarjeta, CreditPaymentKind::Abono, day(11, 18)),
            credit_payment("p3", "L1", 500, PaymentMethod::Efectivo, CreditPaymentKind::Abono, day(16, 18)),
        ];
        l.amount_paid = Money::from_pesos(1000);
        l.status_changed_at = Some(day(16, 18));
        let ledger = Ledger {
            layaways: vec![l],
            ..Ledger::default()
        };

        let r = report(&ledger, 11, 16);
        let abonos = r.bucket(Bucket::PassiveLayawayAbono).unwrap();
        assert_eq!(abonos.tarjeta_neto, Money::from_pesos(194));
        assert_eq!(r.bucket(Bucket::LiquidationLayaway).unwrap().total_documentos, Money::from_pesos(1000));
        assert_eq!(r.totals.liquidation_total, Money::from_pesos(1000));
        assert_eq!(r.bucket(Bucket::PassiveLayawayAnticipo).unwrap().bruto, Money::zero());
        // 194 abono + 500 liquidating cash
        assert_eq!(r.totals.net_cash_flow, Money::from_pesos(694));
        assert_eq!(r.totals.net_cash_flow, r.totals.total_net_cash_in);
    }

    #[test]
    fn test_cancelled_order_surfaces_refundable_anticipo() {
        let mut o = order("O1", OrderKind::Apartado, 2000, day(10, 18), OrderStatus::Cancelado);
        o.payments = vec![order_payment("op1", "O1", 800, PaymentMethod::Efectivo, OrderPaymentKind::Anticipo, day(10, 18))];
        o.anticipo_pagado = Money::from_pesos(800);
        o.saldo_pendiente = Money::from_pesos(1200);
        o.status_changed_at = Some(day(12, 18));
        let ledger = Ledger {
            orders: vec![o],
            ..Ledger::default()
        };

        let r = report(&ledger, 10, 12);
        assert_eq!(r.bucket(Bucket::PassiveOrderAnticipo).unwrap().efectivo, Money::from_pesos(800));
        assert_eq!(r.totals.refundable_pedidos, Money::from_pesos(800));
        assert_eq!(r.pieces.canceladas, 1);

        let day_10 = r.daily.iter().find(|d| d.date == date(10)).unwrap();
        assert_eq!(day_10.anticipos, Money::from_pesos(800));
    }

    #[test]
    fn test_conservation_across_families() {
        let mut ledger = Ledger::default();
        ledger.cash_sales.push(cash_sale("s1", day(5, 18), &[(300, 1)], PaymentMethod::Tarjeta));
        let mut ret = cash_sale("s2", day(5, 19), &[(100, -1)], PaymentMethod::Efectivo);
        ret.return_of_id = Some("s0".to_string());
        ledger.cash_sales.push(ret);

        let mut contado = order("O1", OrderKind::Contado, 400, day(5, 18), OrderStatus::Pagado);
        contado.payments = vec![order_payment("op1", "O1", 400, PaymentMethod::Transferencia, OrderPaymentKind::Total, day(5, 18))];
        contado.anticipo_pagado = Money::from_pesos(400);
        contado.saldo_pendiente = Money::zero();
        ledger.orders.push(contado);

        let mut l = layaway("L1", 600, day(5, 18), CreditStatus::Pagado);
        l.payments = vec![
            credit_payment("p1", "L1", 100, PaymentMethod::Tarjeta, CreditPaymentKind::Anticipo, day(5, 18)),
            credit_payment("p2", "L1", 500, PaymentMethod::Efectivo, CreditPaymentKind::Abono, day(6, 18)),
        ];
        l.amount_paid = Money::from_pesos(600);
        ledger.layaways.push(l);

        let r = report(&ledger, 5, 6);
        assert_eq!(r.totals.net_cash_flow, r.totals.total_net_cash_in);
        // 291 + 400 - 100 + 97 + 500
        assert_eq!(r.totals.net_cash_flow, Money::from_pesos(1188));
        assert_eq!(r.totals.returns, Money::from_pesos(100));
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn test_accounts_receivable_is_a_cohort() {
        let mut open = layaway("L1", 1000, day(3, 18), CreditStatus::Pendiente);
        open.amount_paid = Money::from_pesos(300);
        let mut older = layaway("L2", 500, day(1, 18), CreditStatus::Pendiente);
        older.amount_paid = Money::from_pesos(100);
        let pedido = order("O1", OrderKind::Apartado, 900, day(3, 19), OrderStatus::Vencido);
        let ledger = Ledger {
            layaways: vec![open, older],
            orders: vec![pedido],
            ..Ledger::default()
        };

        let r = report(&ledger, 3, 3);
        assert_eq!(r.totals.receivable_layaways, Money::from_pesos(700));
        assert_eq!(r.totals.receivable_orders, Money::from_pesos(900));
        assert_eq!(r.totals.accounts_receivable, Money::from_pesos(1600));
    }

    #[test]
    fn test_sellers_fall_back_to_mostrador() {
        let mut ledger = Ledger::default();
        let mut anon = cash_sale("s1", day(10, 18), &[(100, 1)], PaymentMethod::Efectivo);
        anon.user_id = None;
        anon.vendedor_id = None;
        let mut sold = cash_sale("s2", day(10, 18), &[(200, 1)], PaymentMethod::Tarjeta);
        sold.vendedor_id = Some("ana".to_string());
        ledger.cash_sales.extend([anon, sold]);

        let r = report(&ledger, 10, 10);
        let mostrador = r.sellers.iter().find(|s| s.seller_id == MOSTRADOR_SELLER_ID).unwrap();
        let ana = r.sellers.iter().find(|s| s.seller_id == "ana").unwrap();
        assert_eq!(mostrador.ventas_netas, Money::from_pesos(100));
        assert_eq!(ana.ventas_netas, Money::from_pesos(194));
        assert_eq!(ana.piezas_vendidas, 1);
    }

    #[test]
    fn test_metrics_are_flat_and_named() {
        let mut ledger = Ledger::default();
        ledger.cash_sales.push(cash_sale("s1", day(10, 18), &[(100, 2)], PaymentMethod::Tarjeta));

        let metrics = report(&ledger, 10, 10).metrics();
        assert_eq!(metrics.get("active.cash.tarjeta"), Some(&20_000));
        assert_eq!(metrics.get("active.cash.tarjeta_neto"), Some(&19_400));
        assert_eq!(metrics.get("active_sales_net"), Some(&19_400));
        assert_eq!(metrics.get("piezas.vendidas"), Some(&2));
        assert_eq!(metrics.get("other.bruto"), Some(&0));
    }
}
