//! # Attribution Classifier
//!
//! Maps every payment-bearing event of a [`Ledger`] to exactly one
//! [`Bucket`], stamped with the instant that decides window membership.
//!
//! ## Rules
//! ```text
//! ┌──────────────────────────────┬─────────────────────────────┬──────────────────┐
//! │ Source                       │ Bucket                      │ Window time      │
//! ├──────────────────────────────┼─────────────────────────────┼──────────────────┤
//! │ CashSale                     │ active.cash                 │ sale created_at  │
//! │ CashSale return (total < 0)  │ cancellation.cash_sale      │ sale created_at  │
//! │ Order contado pagado         │ active.order_cash           │ order created_at │
//! │ Order contado cancelado      │ cancellation.order_cash     │ status change    │
//! │ CreditPayment anticipo       │ passive.layaway_anticipo    │ layaway created  │
//! │ CreditPayment abono          │ passive.layaway_abono       │ payment created  │
//! │ CreditPayment liquidating    │ liquidation.layaway         │ payment created  │
//! │ OrderPayment anticipo        │ passive.order_anticipo      │ order created    │
//! │ OrderPayment saldo/total     │ passive.order_abono         │ payment created  │
//! │ OrderPayment liquidating     │ liquidation.order           │ payment created  │
//! │ Layaway cancelado / vencido  │ refund / overdue .layaway   │ status change    │
//! │ Order cancelado / vencido    │ refund / overdue .order     │ status change    │
//! │ anything else                │ other (+ DataWarning)       │ row created_at   │
//! └──────────────────────────────┴─────────────────────────────┴──────────────────┘
//! ```
//!
//! ## Liquidating Payment
//! The document is pagado/entregado and the payment is the first of its
//! candidates ordered by `(created_at desc, id desc)`. Candidates are every
//! payment of a layaway, or the saldo/total payments of an order. It never
//! lands in a passive bucket.
//!
//! Document status only matters for that test: cancelling a layaway later
//! does not take its anticipo out of the day it was received.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::{Layaway, Ledger, Order, PieceLine};
use crate::money::Money;
use crate::time::DateWindow;
use crate::types::{
    attribute_seller, CreditPaymentKind, CreditStatus, MethodTally, OrderKind, OrderPaymentKind,
    OrderStatus,
};
use crate::warning::{DataWarning, WarningKind};

// =============================================================================
// Buckets
// =============================================================================

/// Attribution bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bucket {
    #[serde(rename = "active.cash")]
    ActiveCash,
    #[serde(rename = "active.order_cash")]
    ActiveOrderCash,
    #[serde(rename = "cancellation.cash_sale")]
    CancellationCashSale,
    #[serde(rename = "cancellation.order_cash")]
    CancellationOrderCash,
    #[serde(rename = "passive.layaway_anticipo")]
    PassiveLayawayAnticipo,
    #[serde(rename = "passive.layaway_abono")]
    PassiveLayawayAbono,
    #[serde(rename = "liquidation.layaway")]
    LiquidationLayaway,
    #[serde(rename = "passive.order_anticipo")]
    PassiveOrderAnticipo,
    #[serde(rename = "passive.order_abono")]
    PassiveOrderAbono,
    #[serde(rename = "liquidation.order")]
    LiquidationOrder,
    #[serde(rename = "refund.layaway_cancelled")]
    RefundLayawayCancelled,
    #[serde(rename = "overdue.layaway")]
    OverdueLayaway,
    #[serde(rename = "refund.order_cancelled")]
    RefundOrderCancelled,
    #[serde(rename = "overdue.order")]
    OverdueOrder,
    #[serde(rename = "other")]
    Other,
}

impl Bucket {
    pub const ALL: [Bucket; 15] = [
        Bucket::ActiveCash,
        Bucket::ActiveOrderCash,
        Bucket::CancellationCashSale,
        Bucket::CancellationOrderCash,
        Bucket::PassiveLayawayAnticipo,
        Bucket::PassiveLayawayAbono,
        Bucket::LiquidationLayaway,
        Bucket::PassiveOrderAnticipo,
        Bucket::PassiveOrderAbono,
        Bucket::LiquidationOrder,
        Bucket::RefundLayawayCancelled,
        Bucket::OverdueLayaway,
        Bucket::RefundOrderCancelled,
        Bucket::OverdueOrder,
        Bucket::Other,
    ];

    /// Stable dotted name, used as the metric prefix.
    pub fn key(&self) -> &'static str {
        match self {
            Bucket::ActiveCash => "active.cash",
            Bucket::ActiveOrderCash => "active.order_cash",
            Bucket::CancellationCashSale => "cancellation.cash_sale",
            Bucket::CancellationOrderCash => "cancellation.order_cash",
            Bucket::PassiveLayawayAnticipo => "passive.layaway_anticipo",
            Bucket::PassiveLayawayAbono => "passive.layaway_abono",
            Bucket::LiquidationLayaway => "liquidation.layaway",
            Bucket::PassiveOrderAnticipo => "passive.order_anticipo",
            Bucket::PassiveOrderAbono => "passive.order_abono",
            Bucket::LiquidationOrder => "liquidation.order",
            Bucket::RefundLayawayCancelled => "refund.layaway_cancelled",
            Bucket::OverdueLayaway => "overdue.layaway",
            Bucket::RefundOrderCancelled => "refund.order_cancelled",
            Bucket::OverdueOrder => "overdue.order",
            Bucket::Other => "other",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Bucket::ActiveCash | Bucket::ActiveOrderCash)
    }

    pub fn is_passive(&self) -> bool {
        matches!(
            self,
            Bucket::PassiveLayawayAnticipo
                | Bucket::PassiveLayawayAbono
                | Bucket::PassiveOrderAnticipo
                | Bucket::PassiveOrderAbono
        )
    }

    pub fn is_liquidation(&self) -> bool {
        matches!(self, Bucket::LiquidationLayaway | Bucket::LiquidationOrder)
    }

    /// Buckets whose tally is money that entered (or left) the drawer
    /// during the window. Refund, overdue and cancelled-contado buckets
    /// carry exposure, not cash movement.
    pub fn moves_cash(&self) -> bool {
        self.is_active()
            || self.is_passive()
            || self.is_liquidation()
            || matches!(self, Bucket::CancellationCashSale)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// =============================================================================
// Classified Stream
// =============================================================================

/// One attributed event.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub bucket: Bucket,
    pub document_id: String,
    pub payment_id: Option<String>,
    pub seller: String,
    /// Instant deciding window membership.
    pub at: DateTime<Utc>,
    /// Gross amounts per method.
    pub tally: MethodTally,
    /// Document total, for document-level buckets; zero for passive rows.
    pub document_total: Money,
    pub cost: Money,
    pub lines: Vec<PieceLine>,
}

impl Entry {
    pub fn pieces(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// Document events that count pieces but move no money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    /// Layaway created.
    Apartado,
    /// Order created.
    Pedido,
    /// Layaway or order handed over.
    Entregado,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub document_id: String,
    pub seller: String,
    pub at: DateTime<Utc>,
    pub lines: Vec<PieceLine>,
}

/// Classifier output for one window.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    pub entries: Vec<Entry>,
    pub milestones: Vec<Milestone>,
    pub warnings: Vec<DataWarning>,
}

impl Classified {
    fn push(&mut self, window: &DateWindow, entry: Entry) {
        if window.contains(entry.at) {
            self.entries.push(entry);
        }
    }

    fn milestone(&mut self, window: &DateWindow, milestone: Milestone) {
        if window.contains(milestone.at) {
            self.milestones.push(milestone);
        }
    }

    /// Entries of one bucket.
    pub fn in_bucket(&self, bucket: Bucket) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |e| e.bucket == bucket)
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Classifies every event of `ledger` whose window time falls in `window`.
pub fn classify(ledger: &Ledger, window: &DateWindow) -> Classified {
    let mut out = Classified::default();

    classify_cash_sales(ledger, window, &mut out);
    for layaway in &ledger.layaways {
        classify_layaway(layaway, window, &mut out);
    }
    for order in &ledger.orders {
        match order.kind {
            OrderKind::Contado => classify_contado_order(order, window, &mut out),
            OrderKind::Apartado => classify_apartado_order(order, window, &mut out),
        }
    }
    classify_orphans(ledger, window, &mut out);

    out
}

fn classify_cash_sales(ledger: &Ledger, window: &DateWindow, out: &mut Classified) {
    for sale in &ledger.cash_sales {
        if !window.contains(sale.created_at) {
            continue;
        }
        let bucket = match &sale.return_of_id {
            None => Bucket::ActiveCash,
            Some(_) if sale.total.is_negative() => Bucket::CancellationCashSale,
            Some(original) => {
                out.warnings.push(DataWarning::new(
                    WarningKind::PositiveReturn,
                    &sale.id,
                    format!("return of {} has non-negative total {}", original, sale.total),
                ));
                Bucket::Other
            }
        };
        out.entries.push(Entry {
            bucket,
            document_id: sale.id.clone(),
            payment_id: None,
            seller: sale.seller(),
            at: sale.created_at,
            tally: sale.effective_tender(),
            document_total: sale.total,
            cost: sale.cost(),
            lines: sale.piece_lines(),
        });
    }
}

fn classify_layaway(layaway: &Layaway, window: &DateWindow, out: &mut Classified) {
    if let Err(err) = layaway.check_invariants() {
        if window.contains(layaway.created_at) || window.contains(layaway.status_time()) {
            out.warnings.push(DataWarning::new(
                WarningKind::BrokenInvariant,
                &layaway.id,
                err.to_string(),
            ));
        }
    }

    out.milestone(
        window,
        Milestone {
            kind: MilestoneKind::Apartado,
            document_id: layaway.id.clone(),
            seller: layaway.seller(),
            at: layaway.created_at,
            lines: layaway.piece_lines(),
        },
    );

    let liquidating_id = layaway.liquidating_payment().map(|p| p.id.as_str());

    for payment in &layaway.payments {
        let seller = attribute_seller(
            layaway.vendedor_id.as_deref(),
            payment.user_id.as_deref().or(layaway.user_id.as_deref()),
        );
        let tally = MethodTally::single(payment.method, payment.amount);

        let entry = if Some(payment.id.as_str()) == liquidating_id {
            Entry {
                bucket: Bucket::LiquidationLayaway,
                document_id: layaway.id.clone(),
                payment_id: Some(payment.id.clone()),
                seller,
                at: payment.created_at,
                tally,
                document_total: layaway.total,
                cost: layaway.cost(),
                lines: layaway.piece_lines(),
            }
        } else {
            let (bucket, at) = match payment.kind {
                CreditPaymentKind::Anticipo => (Bucket::PassiveLayawayAnticipo, layaway.created_at),
                CreditPaymentKind::Abono => (Bucket::PassiveLayawayAbono, payment.created_at),
            };
            Entry {
                bucket,
                document_id: layaway.id.clone(),
                payment_id: Some(payment.id.clone()),
                seller,
                at,
                tally,
                document_total: Money::zero(),
                cost: Money::zero(),
                lines: Vec::new(),
            }
        };
        out.push(window, entry);
    }

    if layaway.credit_status.is_liquidated() && liquidating_id.is_none() {
        out.push(
            window,
            Entry {
                bucket: Bucket::LiquidationLayaway,
                document_id: layaway.id.clone(),
                payment_id: None,
                seller: layaway.seller(),
                at: layaway.status_time(),
                tally: MethodTally::default(),
                document_total: layaway.total,
                cost: layaway.cost(),
                lines: layaway.piece_lines(),
            },
        );
    }

    let exposure_bucket = match layaway.credit_status {
        CreditStatus::Cancelado => Some(Bucket::RefundLayawayCancelled),
        CreditStatus::Vencido => Some(Bucket::OverdueLayaway),
        _ => None,
    };
    if let Some(bucket) = exposure_bucket {
        out.push(
            window,
            Entry {
                bucket,
                document_id: layaway.id.clone(),
                payment_id: None,
                seller: layaway.seller(),
                at: layaway.status_time(),
                tally: layaway.paid_tally(),
                document_total: layaway.total,
                cost: layaway.cost(),
                lines: layaway.piece_lines(),
            },
        );
    }

    if layaway.credit_status == CreditStatus::Entregado {
        out.milestone(
            window,
            Milestone {
                kind: MilestoneKind::Entregado,
                document_id: layaway.id.clone(),
                seller: layaway.seller(),
                at: layaway.status_time(),
                lines: layaway.piece_lines(),
            },
        );
    }
}

fn order_milestones(order: &Order, window: &DateWindow, out: &mut Classified) {
    out.milestone(
        window,
        Milestone {
            kind: MilestoneKind::Pedido,
            document_id: order.id.clone(),
            seller: order.seller(),
            at: order.created_at,
            lines: order.piece_lines(),
        },
    );
    if order.estado == OrderStatus::Entregado {
        out.milestone(
            window,
            Milestone {
                kind: MilestoneKind::Entregado,
                document_id: order.id.clone(),
                seller: order.seller(),
                at: order.status_time(),
                lines: order.piece_lines(),
            },
        );
    }
}

fn document_entry(order: &Order, bucket: Bucket, at: DateTime<Utc>, tally: MethodTally) -> Entry {
    Entry {
        bucket,
        document_id: order.id.clone(),
        payment_id: None,
        seller: order.seller(),
        at,
        tally,
        document_total: order.total,
        cost: order.cost(),
        lines: order.piece_lines(),
    }
}

fn classify_contado_order(order: &Order, window: &DateWindow, out: &mut Classified) {
    order_milestones(order, window, out);

    let tender = order.contado_tender();
    let entry = match order.estado {
        OrderStatus::Pagado | OrderStatus::Entregado => {
            document_entry(order, Bucket::ActiveOrderCash, order.created_at, tender)
        }
        OrderStatus::Cancelado => {
            document_entry(order, Bucket::CancellationOrderCash, order.status_time(), tender)
        }
        other => {
            if window.contains(order.created_at) {
                out.warnings.push(DataWarning::new(
                    WarningKind::ContadoNotSettled,
                    &order.id,
                    format!("contado order in estado {}", other),
                ));
            }
            document_entry(order, Bucket::Other, order.created_at, tender)
        }
    };
    out.push(window, entry);
}

fn classify_apartado_order(order: &Order, window: &DateWindow, out: &mut Classified) {
    if let Err(err) = order.check_invariants() {
        if window.contains(order.created_at) || window.contains(order.status_time()) {
            out.warnings.push(DataWarning::new(
                WarningKind::BrokenInvariant,
                &order.id,
                err.to_string(),
            ));
        }
    }

    order_milestones(order, window, out);

    let liquidating_id = order.liquidating_payment().map(|p| p.id.as_str());

    for payment in &order.payments {
        let seller = attribute_seller(
            order.vendedor_id.as_deref(),
            payment.user_id.as_deref().or(order.user_id.as_deref()),
        );
        let tally = MethodTally::single(payment.method, payment.amount);

        let entry = if Some(payment.id.as_str()) == liquidating_id {
            Entry {
                payment_id: Some(payment.id.clone()),
                seller,
                ..document_entry(order, Bucket::LiquidationOrder, payment.created_at, tally)
            }
        } else {
            let (bucket, at) = match payment.kind {
                OrderPaymentKind::Anticipo => (Bucket::PassiveOrderAnticipo, order.created_at),
                OrderPaymentKind::Saldo | OrderPaymentKind::Total => {
                    (Bucket::PassiveOrderAbono, payment.created_at)
                }
            };
            Entry {
                bucket,
                document_id: order.id.clone(),
                payment_id: Some(payment.id.clone()),
                seller,
                at,
                tally,
                document_total: Money::zero(),
                cost: Money::zero(),
                lines: Vec::new(),
            }
        };
        out.push(window, entry);
    }

    if order.estado.is_liquidated() && liquidating_id.is_none() {
        out.push(
            window,
            document_entry(
                order,
                Bucket::LiquidationOrder,
                order.status_time(),
                MethodTally::default(),
            ),
        );
    }

    let exposure_bucket = match order.estado {
        OrderStatus::Cancelado => Some(Bucket::RefundOrderCancelled),
        OrderStatus::Vencido => Some(Bucket::OverdueOrder),
        _ => None,
    };
    if let Some(bucket) = exposure_bucket {
        out.push(
            window,
            document_entry(order, bucket, order.status_time(), order.paid_tally()),
        );
    }
}

fn classify_orphans(ledger: &Ledger, window: &DateWindow, out: &mut Classified) {
    let credit = ledger.orphan_credit_payments.iter().map(|p| {
        (&p.id, &p.apartado_id, &p.user_id, p.created_at, MethodTally::single(p.method, p.amount))
    });
    let order = ledger.orphan_order_payments.iter().map(|p| {
        (&p.id, &p.pedido_id, &p.user_id, p.created_at, MethodTally::single(p.method, p.amount))
    });

    for (id, document_id, user_id, at, tally) in credit.chain(order) {
        if !window.contains(at) {
            continue;
        }
        out.warnings.push(DataWarning::new(
            WarningKind::OrphanPayment,
            id.as_str(),
            format!("document {} not found", document_id),
        ));
        out.entries.push(Entry {
            bucket: Bucket::Other,
            document_id: document_id.clone(),
            payment_id: Some(id.clone()),
            seller: attribute_seller(None, user_id.as_deref()),
            at,
            tally,
            document_total: Money::zero(),
            cost: Money::zero(),
            lines: Vec::new(),
        });
    }
}

// =============================================================================
// Independent Cash Sum
// =============================================================================

/// Net sum of every in-window payment row, computed without buckets.
///
/// Cash-sale tenders (returns included), tenders of paid contado orders,
/// and every layaway/order payment at its own window time (anticipos at
/// document creation). Card is netted once over the whole tally.
pub fn cash_in_net(ledger: &Ledger, window: &DateWindow, card_fee_bps: u32) -> Money {
    let mut tally = MethodTally::default();

    for sale in ledger.cash_sales.iter().filter(|s| window.contains(s.created_at)) {
        tally.merge(&sale.effective_tender());
    }

    for layaway in &ledger.layaways {
        for p in &layaway.payments {
            let at = match p.kind {
                CreditPaymentKind::Anticipo => layaway.created_at,
                CreditPaymentKind::Abono => p.created_at,
            };
            if window.contains(at) {
                tally.add(p.method, p.amount);
            }
        }
    }

    for order in &ledger.orders {
        match order.kind {
            OrderKind::Contado => {
                if order.estado.is_liquidated() && window.contains(order.created_at) {
                    tally.merge(&order.contado_tender());
                }
            }
            OrderKind::Apartado => {
                for p in &order.payments {
                    let at = match p.kind {
                        OrderPaymentKind::Anticipo => order.created_at,
                        _ => p.created_at,
                    };
                    if window.contains(at) {
                        tally.add(p.method, p.amount);
                    }
                }
            }
        }
    }

    for p in &ledger.orphan_credit_payments {
        if window.contains(p.created_at) {
            tally.add(p.method, p.amount);
        }
    }
    for p in &ledger.orphan_order_payments {
        if window.contains(p.created_at) {
            tally.add(p.method, p.amount);
        }
    }

    tally.net(card_fee_bps)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use crate::types::PaymentMethod;

    #[test]
    fn test_cash_sale_and_return() {
        let mut ledger = Ledger::default();
        ledger.cash_sales.push(cash_sale("s1", day(10, 12), &[(100, 1), (50, 1)], PaymentMethod::Efectivo));
        let mut ret = cash_sale("s2", day(10, 13), &[(50, -1)], PaymentMethod::Efectivo);
        ret.return_of_id = Some("s1".to_string());
        ledger.cash_sales.push(ret);

        let out = classify(&ledger, &window(10, 10));
        assert_eq!(out.in_bucket(Bucket::ActiveCash).count(), 1);
        let returned: Vec<_> = out.in_bucket(Bucket::CancellationCashSale).collect();
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].pieces(), -1);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_positive_return_goes_to_other() {
        let mut ledger = Ledger::default();
        let mut ret = cash_sale("s2", day(10, 13), &[(50, 1)], PaymentMethod::Efectivo);
        ret.return_of_id = Some("s1".to_string());
        ledger.cash_sales.push(ret);

        let out = classify(&ledger, &window(10, 10));
        assert_eq!(out.in_bucket(Bucket::Other).count(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::PositiveReturn);
    }

    #[test]
    fn test_liquidating_payment_never_passive() {
        let mut l = layaway("L1", 1000, day(1, 12), CreditStatus::Pagado);
        l.payments = vec![
            credit_payment("p1", "L1", 300, PaymentMethod::Tarjeta, CreditPaymentKind::Anticipo, day(1, 12)),
            credit_payment("p2", "L1", 200, PaymentMethod::Tarjeta, CreditPaymentKind::Abono, day(10, 12)),
            credit_payment("p3", "L1", 500, PaymentMethod::Efectivo, CreditPaymentKind::Abono, day(15, 12)),
        ];
        l.amount_paid = Money::from_pesos(1000);
        let ledger = Ledger {
            layaways: vec![l],
            ..Ledger::default()
        };

        let out = classify(&ledger, &window(1, 20));
        let liquidation: Vec<_> = out.in_bucket(Bucket::LiquidationLayaway).collect();
        assert_eq!(liquidation.len(), 1);
        assert_eq!(liquidation[0].payment_id.as_deref(), Some("p3"));
        assert_eq!(liquidation[0].document_total, Money::from_pesos(1000));

        let passive_ids: Vec<_> = out
            .entries
            .iter()
            .filter(|e| e.bucket.is_passive())
            .filter_map(|e| e.payment_id.as_deref())
            .collect();
        assert_eq!(passive_ids, vec!["p1", "p2"]);
    }

    #[test]
    fn test_anticipo_uses_document_time() {
        let mut l = layaway("L1", 1000, day(1, 12), CreditStatus::Pendiente);
        // captured a few minutes past local midnight of the next day
        l.payments = vec![credit_payment(
            "p1",
            "L1",
            300,
            PaymentMethod::Efectivo,
            CreditPaymentKind::Anticipo,
            day(2, 6) + chrono::Duration::minutes(5),
        )];
        let ledger = Ledger {
            layaways: vec![l],
            ..Ledger::default()
        };

        assert_eq!(classify(&ledger, &window(1, 1)).in_bucket(Bucket::PassiveLayawayAnticipo).count(), 1);
        assert_eq!(classify(&ledger, &window(2, 2)).entries.len(), 0);
    }

    #[test]
    fn test_liquidated_order_without_saldo_payment() {
        let mut o = order("O1", OrderKind::Apartado, 2000, day(1, 12), OrderStatus::Pagado);
        o.payments = vec![order_payment("op1", "O1", 2000, PaymentMethod::Efectivo, OrderPaymentKind::Anticipo, day(1, 12))];
        o.anticipo_pagado = Money::from_pesos(2000);
        o.saldo_pendiente = Money::zero();
        o.status_changed_at = Some(day(3, 12));
        let ledger = Ledger {
            orders: vec![o],
            ..Ledger::default()
        };

        let out = classify(&ledger, &window(3, 3));
        let liquidation: Vec<_> = out.in_bucket(Bucket::LiquidationOrder).collect();
        assert_eq!(liquidation.len(), 1);
        assert!(liquidation[0].tally.gross().is_zero());
        assert_eq!(liquidation[0].document_total, Money::from_pesos(2000));
    }

    #[test]
    fn test_orphan_payment_is_other() {
        let ledger = Ledger {
            orphan_order_payments: vec![order_payment(
                "op9",
                "missing",
                100,
                PaymentMethod::Efectivo,
                OrderPaymentKind::Saldo,
                day(5, 12),
            )],
            ..Ledger::default()
        };
        let out = classify(&ledger, &window(5, 5));
        assert_eq!(out.in_bucket(Bucket::Other).count(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::OrphanPayment);
    }

    #[test]
    fn test_contado_order_buckets() {
        let paid = order("O1", OrderKind::Contado, 500, day(4, 12), OrderStatus::Pagado);
        let mut cancelled = order("O2", OrderKind::Contado, 300, day(4, 12), OrderStatus::Cancelado);
        cancelled.status_changed_at = Some(day(6, 12));
        let ledger = Ledger {
            orders: vec![paid, cancelled],
            ..Ledger::default()
        };

        let out = classify(&ledger, &window(4, 4));
        assert_eq!(out.in_bucket(Bucket::ActiveOrderCash).count(), 1);
        assert_eq!(out.in_bucket(Bucket::CancellationOrderCash).count(), 0);

        let later = classify(&ledger, &window(6, 6));
        assert_eq!(later.in_bucket(Bucket::CancellationOrderCash).count(), 1);
    }
}
