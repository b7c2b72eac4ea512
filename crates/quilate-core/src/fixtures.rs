//! Builders shared by the unit tests of this crate.
//!
//! Every date is in March 2026; `day(d, h)` is UTC, so `day(d, 18)` is
//! noon store time on day `d`.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::catalog::{Product, ProductSnapshot};
use crate::ledger::{CashSale, CreditPayment, Layaway, LineItem, Order, OrderPayment, SaleSource};
use crate::money::Money;
use crate::time::{DateWindow, StoreOffset};
use crate::types::{
    CreditPaymentKind, CreditStatus, MethodTally, OrderKind, OrderPaymentKind, OrderStatus,
    PaymentMethod, TaxRate,
};

pub const FIXTURE_PIECE_NAME: &str = "Anillo 14k";

pub fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

pub fn day(d: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, hour, 0, 0).unwrap()
}

pub fn window(from: u32, to: u32) -> DateWindow {
    DateWindow::new(date(from), date(to), StoreOffset::default()).unwrap()
}

pub fn line(price_pesos: i64, quantity: i64) -> LineItem {
    LineItem {
        id: format!("line-{}-{}", price_pesos, quantity),
        product_id: Some("P1".to_string()),
        quantity,
        unit_price: Money::from_pesos(price_pesos),
        unit_cost: Money::from_pesos(price_pesos * 4 / 10),
        discount: Money::zero(),
        total_price: Money::from_pesos(price_pesos * quantity),
        snapshot: ProductSnapshot {
            codigo: Some("AN-14K-001".to_string()),
            name: Some(FIXTURE_PIECE_NAME.to_string()),
            quilataje: Some("14k".to_string()),
            ..ProductSnapshot::default()
        },
    }
}

pub fn cash_sale(id: &str, at: DateTime<Utc>, lines: &[(i64, i64)], method: PaymentMethod) -> CashSale {
    let items: Vec<LineItem> = lines.iter().map(|(p, q)| line(*p, *q)).collect();
    let total: Money = items.iter().map(|i| i.total_price).sum();
    CashSale {
        id: id.to_string(),
        tenant_id: "t1".to_string(),
        folio: Some(format!("V-{}", id)),
        source: SaleSource::VentasContado,
        subtotal: total,
        discount: Money::zero(),
        tax_rate: TaxRate::zero(),
        tax: Money::zero(),
        total,
        total_cost: items.iter().map(LineItem::cost).sum(),
        utilidad: Money::zero(),
        customer_name: None,
        customer_phone: None,
        vendedor_id: None,
        user_id: Some("u1".to_string()),
        tender: MethodTally::single(method, total),
        return_of_id: None,
        created_at: at,
        items,
    }
}

pub fn layaway(id: &str, total_pesos: i64, created_at: DateTime<Utc>, status: CreditStatus) -> Layaway {
    Layaway {
        id: id.to_string(),
        tenant_id: "t1".to_string(),
        folio: Some(format!("AP-{}", id)),
        subtotal: Money::from_pesos(total_pesos),
        discount: Money::zero(),
        vip_discount: Money::zero(),
        tax: Money::zero(),
        total: Money::from_pesos(total_pesos),
        total_cost: Money::zero(),
        amount_paid: Money::zero(),
        credit_status: status,
        customer_name: Some("Cliente".to_string()),
        customer_phone: None,
        vendedor_id: None,
        user_id: Some("u1".to_string()),
        created_at,
        status_changed_at: None,
        items: vec![line(total_pesos, 1)],
        payments: Vec::new(),
    }
}

pub fn credit_payment(
    id: &str,
    layaway_id: &str,
    pesos: i64,
    method: PaymentMethod,
    kind: CreditPaymentKind,
    at: DateTime<Utc>,
) -> CreditPayment {
    CreditPayment {
        id: id.to_string(),
        apartado_id: layaway_id.to_string(),
        amount: Money::from_pesos(pesos),
        method,
        kind,
        user_id: Some("u1".to_string()),
        notes: None,
        created_at: at,
    }
}

pub fn order(
    id: &str,
    kind: OrderKind,
    total_pesos: i64,
    created_at: DateTime<Utc>,
    estado: OrderStatus,
) -> Order {
    Order {
        id: id.to_string(),
        tenant_id: "t1".to_string(),
        folio: Some(format!("PED-{}", id)),
        producto_pedido_id: Some("AN-14K-001".to_string()),
        cliente_nombre: Some("Cliente".to_string()),
        cliente_telefono: None,
        cliente_email: None,
        cantidad: 1,
        precio_unitario: Money::from_pesos(total_pesos),
        total: Money::from_pesos(total_pesos),
        total_cost: Money::zero(),
        anticipo_pagado: Money::zero(),
        saldo_pendiente: Money::from_pesos(total_pesos),
        kind,
        estado,
        vendedor_id: None,
        user_id: Some("u1".to_string()),
        created_at,
        status_changed_at: None,
        items: Vec::new(),
        payments: Vec::new(),
    }
}

pub fn order_payment(
    id: &str,
    order_id: &str,
    pesos: i64,
    method: PaymentMethod,
    kind: OrderPaymentKind,
    at: DateTime<Utc>,
) -> OrderPayment {
    OrderPayment {
        id: id.to_string(),
        pedido_id: order_id.to_string(),
        amount: Money::from_pesos(pesos),
        method,
        kind,
        user_id: Some("u1".to_string()),
        created_at: at,
    }
}

pub fn product(id: &str, codigo: &str, stock: i64) -> Product {
    Product {
        id: id.to_string(),
        tenant_id: "t1".to_string(),
        codigo: codigo.to_string(),
        name: "Anillo".to_string(),
        modelo: Some("Solitario".to_string()),
        color: Some("Amarillo".to_string()),
        quilataje: Some("10k".to_string()),
        marca: None,
        base: None,
        tipo_joya: Some("anillo".to_string()),
        talla: Some("7".to_string()),
        weight_mg: Some(2_500),
        cost_price: Money::from_pesos(800),
        price: Money::from_pesos(2_000),
        discount_bps: 0,
        manual_price: false,
        stock,
        active: true,
        created_at: day(1, 12),
        updated_at: day(1, 12),
    }
}
