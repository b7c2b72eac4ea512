//! # Ledger Documents
//!
//! The payment-bearing documents the reporting engine reads, already
//! normalized by the read layer (UTC timestamps, resolved enums).
//!
//! ## Document Families
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CashSale ──── LineItem*        (returns: negative mirror rows)        │
//! │  LegacySale ─► CashSale         (pre-migration `sales`, no lines)      │
//! │                                                                         │
//! │  Layaway ───┬─ LineItem*                                               │
//! │             └─ CreditPayment*   (anticipo | abono)                     │
//! │                                                                         │
//! │  Order ─────┬─ LineItem*        (or the legacy single-product link)    │
//! │             └─ OrderPayment*    (anticipo | saldo | total)             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A [`Ledger`] is the slice of these documents relevant to one report
//! window; see `quilate-db`'s read layer for how it is loaded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ProductSnapshot;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    attribute_seller, CreditPaymentKind, CreditStatus, MethodTally, OrderKind, OrderPaymentKind,
    OrderStatus, PaymentMethod, TaxRate,
};

// =============================================================================
// Line Items
// =============================================================================

/// One line of a cash sale, layaway or order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub product_id: Option<String>,
    /// Negative on return rows.
    pub quantity: i64,
    pub unit_price: Money,
    pub unit_cost: Money,
    pub discount: Money,
    pub total_price: Money,
    pub snapshot: ProductSnapshot,
}

impl LineItem {
    /// Cost of the line, sign following the quantity.
    pub fn cost(&self) -> Money {
        self.unit_cost * self.quantity
    }

    /// Name used in piece rollups.
    pub fn display_name(&self) -> String {
        self.snapshot
            .name
            .clone()
            .or_else(|| self.snapshot.codigo.clone())
            .or_else(|| self.product_id.clone())
            .unwrap_or_else(|| "Sin nombre".to_string())
    }
}

/// Quantity of a named piece, for rollups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceLine {
    pub name: String,
    pub quantity: i64,
}

fn piece_lines(items: &[LineItem]) -> Vec<PieceLine> {
    items
        .iter()
        .map(|item| PieceLine {
            name: item.display_name(),
            quantity: item.quantity,
        })
        .collect()
}

fn lines_cost(items: &[LineItem], header_cost: Money) -> Money {
    if items.is_empty() {
        header_cost
    } else {
        items.iter().map(LineItem::cost).sum()
    }
}

// =============================================================================
// Cash Sales
// =============================================================================

/// Table a cash sale was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleSource {
    VentasContado,
    Legacy,
}

/// A cash sale (venta de contado), or a return when `return_of_id` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashSale {
    pub id: String,
    pub tenant_id: String,
    pub folio: Option<String>,
    pub source: SaleSource,
    pub subtotal: Money,
    pub discount: Money,
    pub tax_rate: TaxRate,
    pub tax: Money,
    pub total: Money,
    pub total_cost: Money,
    pub utilidad: Money,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub vendedor_id: Option<String>,
    pub user_id: Option<String>,
    /// Gross amounts captured per method.
    pub tender: MethodTally,
    pub return_of_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<LineItem>,
}

impl CashSale {
    #[inline]
    pub fn is_return(&self) -> bool {
        self.return_of_id.is_some()
    }

    pub fn seller(&self) -> String {
        attribute_seller(self.vendedor_id.as_deref(), self.user_id.as_deref())
    }

    pub fn pieces(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn cost(&self) -> Money {
        lines_cost(&self.items, self.total_cost)
    }

    pub fn piece_lines(&self) -> Vec<PieceLine> {
        piece_lines(&self.items)
    }

    /// Tender used for attribution.
    ///
    /// Rows captured before the tender split existed carry an empty tender;
    /// their total is taken as cash.
    pub fn effective_tender(&self) -> MethodTally {
        if self.tender.gross().is_zero() && !self.total.is_zero() {
            MethodTally::single(PaymentMethod::Efectivo, self.total)
        } else {
            self.tender
        }
    }
}

/// Row of the pre-migration `sales` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacySale {
    pub id: String,
    pub tenant_id: String,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub vendedor_id: Option<String>,
    pub user_id: Option<String>,
    /// `completed` or `voided`.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl LegacySale {
    /// Converts into the cash-sale shape; voided sales yield `None`.
    pub fn into_cash_sale(self) -> Option<CashSale> {
        if self.status.trim().eq_ignore_ascii_case("voided") {
            return None;
        }
        Some(CashSale {
            id: self.id,
            tenant_id: self.tenant_id,
            folio: None,
            source: SaleSource::Legacy,
            subtotal: self.total,
            discount: Money::zero(),
            tax_rate: TaxRate::zero(),
            tax: Money::zero(),
            total: self.total,
            total_cost: Money::zero(),
            utilidad: Money::zero(),
            customer_name: None,
            customer_phone: None,
            vendedor_id: self.vendedor_id,
            user_id: self.user_id,
            tender: MethodTally::single(self.payment_method, self.total),
            return_of_id: None,
            created_at: self.created_at,
            items: Vec::new(),
        })
    }
}

// =============================================================================
// Layaways
// =============================================================================

/// A payment applied to a layaway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditPayment {
    pub id: String,
    pub apartado_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub kind: CreditPaymentKind,
    pub user_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An apartado: a sale paid in installments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layaway {
    pub id: String,
    pub tenant_id: String,
    pub folio: Option<String>,
    pub subtotal: Money,
    pub discount: Money,
    pub vip_discount: Money,
    pub tax: Money,
    pub total: Money,
    pub total_cost: Money,
    pub amount_paid: Money,
    pub credit_status: CreditStatus,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub vendedor_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub items: Vec<LineItem>,
    pub payments: Vec<CreditPayment>,
}

impl Layaway {
    /// Outstanding amount.
    pub fn balance(&self) -> Money {
        self.total - self.amount_paid
    }

    pub fn seller(&self) -> String {
        attribute_seller(self.vendedor_id.as_deref(), self.user_id.as_deref())
    }

    pub fn pieces(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn cost(&self) -> Money {
        lines_cost(&self.items, self.total_cost)
    }

    pub fn piece_lines(&self) -> Vec<PieceLine> {
        piece_lines(&self.items)
    }

    /// When the current status was entered; creation when untracked.
    pub fn status_time(&self) -> DateTime<Utc> {
        self.status_changed_at.unwrap_or(self.created_at)
    }

    /// The payment that liquidated this layaway, if it is liquidated.
    ///
    /// Latest by `(created_at, id)` among all its payments.
    pub fn liquidating_payment(&self) -> Option<&CreditPayment> {
        if !self.credit_status.is_liquidated() {
            return None;
        }
        self.payments
            .iter()
            .max_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)))
    }

    /// Gross of every payment ever made.
    pub fn paid_tally(&self) -> MethodTally {
        let mut tally = MethodTally::default();
        for p in &self.payments {
            tally.add(p.method, p.amount);
        }
        tally
    }

    /// Balance rules that must hold at rest.
    ///
    /// ## Errors
    /// `CoreError::Invariant` when `amount_paid > total`, or when the
    /// layaway is pagado with a balance left.
    pub fn check_invariants(&self) -> CoreResult<()> {
        if self.amount_paid > self.total {
            return Err(CoreError::Invariant(format!(
                "apartado {}: amount_paid {} exceeds total {}",
                self.id, self.amount_paid, self.total
            )));
        }
        if self.credit_status == CreditStatus::Pagado && self.amount_paid < self.total {
            return Err(CoreError::Invariant(format!(
                "apartado {}: pagado with balance {}",
                self.id,
                self.balance()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A payment applied to an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayment {
    pub id: String,
    pub pedido_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub kind: OrderPaymentKind,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A pedido: a custom order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub tenant_id: String,
    pub folio: Option<String>,
    /// Legacy single-product link, used when `items` is empty.
    pub producto_pedido_id: Option<String>,
    pub cliente_nombre: Option<String>,
    pub cliente_telefono: Option<String>,
    pub cliente_email: Option<String>,
    pub cantidad: i64,
    pub precio_unitario: Money,
    pub total: Money,
    pub total_cost: Money,
    pub anticipo_pagado: Money,
    pub saldo_pendiente: Money,
    pub kind: OrderKind,
    pub estado: OrderStatus,
    pub vendedor_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub items: Vec<LineItem>,
    pub payments: Vec<OrderPayment>,
}

impl Order {
    /// Order lines, synthesizing one from the legacy columns if needed.
    pub fn lines(&self) -> Vec<LineItem> {
        if !self.items.is_empty() || self.cantidad <= 0 {
            return self.items.clone();
        }
        vec![LineItem {
            id: format!("{}-legacy", self.id),
            product_id: self.producto_pedido_id.clone(),
            quantity: self.cantidad,
            unit_price: self.precio_unitario,
            unit_cost: Money::zero(),
            discount: Money::zero(),
            total_price: self.precio_unitario * self.cantidad,
            snapshot: ProductSnapshot {
                codigo: self.producto_pedido_id.clone(),
                ..ProductSnapshot::default()
            },
        }]
    }

    pub fn seller(&self) -> String {
        attribute_seller(self.vendedor_id.as_deref(), self.user_id.as_deref())
    }

    pub fn pieces(&self) -> i64 {
        self.lines().iter().map(|i| i.quantity).sum()
    }

    pub fn cost(&self) -> Money {
        lines_cost(&self.items, self.total_cost)
    }

    pub fn piece_lines(&self) -> Vec<PieceLine> {
        piece_lines(&self.lines())
    }

    pub fn status_time(&self) -> DateTime<Utc> {
        self.status_changed_at.unwrap_or(self.created_at)
    }

    /// The saldo/total payment that liquidated this order, if any.
    pub fn liquidating_payment(&self) -> Option<&OrderPayment> {
        if !self.estado.is_liquidated() {
            return None;
        }
        self.payments
            .iter()
            .filter(|p| p.kind.can_liquidate())
            .max_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)))
    }

    /// Gross of every payment ever made.
    pub fn paid_tally(&self) -> MethodTally {
        let mut tally = MethodTally::default();
        for p in &self.payments {
            tally.add(p.method, p.amount);
        }
        tally
    }

    /// Tender of a contado order: its payments, or the total as cash when
    /// no payment rows exist.
    pub fn contado_tender(&self) -> MethodTally {
        if self.payments.is_empty() {
            MethodTally::single(PaymentMethod::Efectivo, self.total)
        } else {
            self.paid_tally()
        }
    }

    /// Balance rules that must hold at rest.
    pub fn check_invariants(&self) -> CoreResult<()> {
        if !(self.anticipo_pagado + self.saldo_pendiente).approx_eq(self.total) {
            return Err(CoreError::Invariant(format!(
                "pedido {}: anticipo {} + saldo {} != total {}",
                self.id, self.anticipo_pagado, self.saldo_pendiente, self.total
            )));
        }
        if self.kind == OrderKind::Contado
            && !matches!(
                self.estado,
                OrderStatus::Pagado | OrderStatus::Entregado | OrderStatus::Cancelado
            )
        {
            return Err(CoreError::Invariant(format!(
                "pedido {}: contado order in estado {}",
                self.id, self.estado
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Documents in scope for one report window.
///
/// Layaways and orders carry ALL their payments (liquidation and refund
/// exposure need the full history), not only in-window ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub cash_sales: Vec<CashSale>,
    pub layaways: Vec<Layaway>,
    pub orders: Vec<Order>,
    /// Credit payments whose apartado could not be found.
    pub orphan_credit_payments: Vec<CreditPayment>,
    /// Order payments whose pedido could not be found.
    pub orphan_order_payments: Vec<OrderPayment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn credit(id: &str, amount: i64, day: u32) -> CreditPayment {
        CreditPayment {
            id: id.to_string(),
            apartado_id: "L1".to_string(),
            amount: Money::from_pesos(amount),
            method: PaymentMethod::Efectivo,
            kind: CreditPaymentKind::Abono,
            user_id: None,
            notes: None,
            created_at: ts(day, 12),
        }
    }

    fn layaway(status: CreditStatus, paid: i64) -> Layaway {
        Layaway {
            id: "L1".to_string(),
            tenant_id: "t1".to_string(),
            folio: Some("AP-000001".to_string()),
            subtotal: Money::from_pesos(1000),
            discount: Money::zero(),
            vip_discount: Money::zero(),
            tax: Money::zero(),
            total: Money::from_pesos(1000),
            total_cost: Money::from_pesos(400),
            amount_paid: Money::from_pesos(paid),
            credit_status: status,
            customer_name: None,
            customer_phone: None,
            vendedor_id: None,
            user_id: Some("u1".to_string()),
            created_at: ts(1, 12),
            status_changed_at: None,
            items: Vec::new(),
            payments: vec![credit("p1", 300, 1), credit("p3", 500, 9), credit("p2", 200, 9)],
        }
    }

    #[test]
    fn test_liquidating_payment_ties_break_on_id() {
        let l = layaway(CreditStatus::Pagado, 1000);
        assert_eq!(l.liquidating_payment().map(|p| p.id.as_str()), Some("p3"));

        let open = layaway(CreditStatus::Pendiente, 500);
        assert!(open.liquidating_payment().is_none());
    }

    #[test]
    fn test_layaway_invariants() {
        assert!(layaway(CreditStatus::Pagado, 1000).check_invariants().is_ok());
        assert!(layaway(CreditStatus::Pagado, 900).check_invariants().is_err());
        assert!(layaway(CreditStatus::Pendiente, 1100).check_invariants().is_err());
        assert_eq!(layaway(CreditStatus::Pendiente, 300).balance(), Money::from_pesos(700));
    }

    #[test]
    fn test_legacy_sale_conversion() {
        let legacy = LegacySale {
            id: "s1".to_string(),
            tenant_id: "t1".to_string(),
            total: Money::from_pesos(250),
            payment_method: PaymentMethod::Tarjeta,
            vendedor_id: None,
            user_id: None,
            status: "completed".to_string(),
            created_at: ts(2, 10),
        };
        let sale = legacy.clone().into_cash_sale().unwrap();
        assert_eq!(sale.source, SaleSource::Legacy);
        assert_eq!(sale.tender.tarjeta, Money::from_pesos(250));
        assert_eq!(sale.seller(), crate::types::MOSTRADOR_SELLER_ID);

        let voided = LegacySale {
            status: "voided".to_string(),
            ..legacy
        };
        assert!(voided.into_cash_sale().is_none());
    }
}
