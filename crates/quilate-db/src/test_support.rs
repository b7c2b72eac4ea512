//! Builders shared by the database tests.
//!
//! Every date is in March 2026; `at(d, h)` is UTC, so `at(d, 18)` is noon
//! store time on day `d`.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;

use crate::pool::{Database, DbConfig};
use crate::repository::new_id;
use quilate_core::catalog::{Product, ProductSnapshot};
use quilate_core::ledger::{CashSale, CreditPayment, Layaway, LineItem, Order, OrderPayment, SaleSource};
use quilate_core::{
    CreditPaymentKind, CreditStatus, MethodTally, Money, OrderKind, OrderPaymentKind, OrderStatus,
    PaymentMethod, TaxRate,
};

pub const TENANT: &str = "joyeria-centro";

/// Fresh in-memory database with one tenant.
pub async fn setup() -> (Database, String) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    db.tenants().insert(TENANT, "Joyería Centro", at(1, 0)).await.unwrap();
    (db, TENANT.to_string())
}

/// Same as [`setup`] on a temporary file, so the pool has several
/// connections that can race. Keep the `TempDir` alive for the test.
pub async fn setup_on_disk() -> (TempDir, Database, String) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("quilate.db")).max_connections(4))
        .await
        .unwrap();
    db.tenants().insert(TENANT, "Joyería Centro", at(1, 0)).await.unwrap();
    (dir, db, TENANT.to_string())
}

pub fn at(d: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, hour, 0, 0).unwrap()
}

pub fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

/// A 14k ring priced at $2,000 with cost $800.
pub fn product(tenant: &str, codigo: &str, stock: i64) -> Product {
    Product {
        id: new_id(),
        tenant_id: tenant.to_string(),
        codigo: codigo.to_string(),
        name: "Anillo solitario".to_string(),
        modelo: Some("Solitario".to_string()),
        color: Some("Amarillo".to_string()),
        quilataje: Some("14k".to_string()),
        marca: None,
        base: None,
        tipo_joya: Some("Anillo".to_string()),
        talla: Some("7".to_string()),
        weight_mg: Some(2_500),
        cost_price: Money::from_pesos(800),
        price: Money::from_pesos(2_000),
        discount_bps: 0,
        manual_price: false,
        stock,
        active: true,
        created_at: at(1, 0),
        updated_at: at(1, 0),
    }
}

pub fn line_for(product: &Product, quantity: i64, unit_price: Money) -> LineItem {
    LineItem {
        id: new_id(),
        product_id: Some(product.id.clone()),
        quantity,
        unit_price,
        unit_cost: product.cost_price,
        discount: Money::zero(),
        total_price: unit_price * quantity,
        snapshot: product.snapshot(),
    }
}

/// Sale of `quantity` pieces at list price; a negative quantity builds the
/// body of a return (set `return_of_id` on it).
pub fn cash_sale(
    tenant: &str,
    product: &Product,
    quantity: i64,
    method: PaymentMethod,
    created_at: DateTime<Utc>,
) -> CashSale {
    let line = line_for(product, quantity, product.price);
    let total = line.total_price;
    let cost = product.cost_price * quantity;
    CashSale {
        id: new_id(),
        tenant_id: tenant.to_string(),
        folio: None,
        source: SaleSource::VentasContado,
        subtotal: total,
        discount: Money::zero(),
        tax_rate: TaxRate::zero(),
        tax: Money::zero(),
        total,
        total_cost: cost,
        utilidad: total - cost,
        customer_name: None,
        customer_phone: None,
        vendedor_id: Some("v-ana".to_string()),
        user_id: Some("u1".to_string()),
        tender: MethodTally::single(method, total),
        return_of_id: None,
        created_at,
        items: vec![line],
    }
}

/// Pendiente layaway of one piece, created on day 1; each entry of
/// `payments` is a cash payment (the first one the anticipo) at creation.
pub fn layaway(tenant: &str, product: &Product, total_pesos: i64, payments: &[i64]) -> Layaway {
    let total = Money::from_pesos(total_pesos);
    let created_at = at(1, 18);
    let id = new_id();
    Layaway {
        id: id.clone(),
        tenant_id: tenant.to_string(),
        folio: None,
        subtotal: total,
        discount: Money::zero(),
        vip_discount: Money::zero(),
        tax: Money::zero(),
        total,
        total_cost: product.cost_price,
        amount_paid: Money::zero(),
        credit_status: CreditStatus::Pendiente,
        customer_name: Some("María López".to_string()),
        customer_phone: None,
        vendedor_id: Some("v-ana".to_string()),
        user_id: Some("u1".to_string()),
        created_at,
        status_changed_at: None,
        items: vec![line_for(product, 1, total)],
        payments: payments
            .iter()
            .enumerate()
            .map(|(i, pesos)| CreditPayment {
                id: new_id(),
                apartado_id: id.clone(),
                amount: Money::from_pesos(*pesos),
                method: PaymentMethod::Efectivo,
                kind: if i == 0 {
                    CreditPaymentKind::Anticipo
                } else {
                    CreditPaymentKind::Abono
                },
                user_id: Some("u1".to_string()),
                notes: None,
                created_at,
            })
            .collect(),
    }
}

/// Order of one made-to-measure piece, created on day 1.
///
/// Contado orders are pagado; apartado orders are pendiente. The line has
/// no catalog product yet; its snapshot codigo is `PED-ANILLO-7`.
pub fn order(tenant: &str, kind: OrderKind, total_pesos: i64, payments: &[i64]) -> Order {
    let total = Money::from_pesos(total_pesos);
    let created_at = at(1, 18);
    let id = new_id();
    let (estado, first_kind) = match kind {
        OrderKind::Contado => (OrderStatus::Pagado, OrderPaymentKind::Total),
        OrderKind::Apartado => (OrderStatus::Pendiente, OrderPaymentKind::Anticipo),
    };
    Order {
        id: id.clone(),
        tenant_id: tenant.to_string(),
        folio: None,
        producto_pedido_id: None,
        cliente_nombre: Some("Laura Ruiz".to_string()),
        cliente_telefono: None,
        cliente_email: None,
        cantidad: 1,
        precio_unitario: total,
        total,
        total_cost: Money::from_pesos(total_pesos * 4 / 10),
        anticipo_pagado: Money::zero(),
        saldo_pendiente: total,
        kind,
        estado,
        vendedor_id: None,
        user_id: Some("u2".to_string()),
        created_at,
        status_changed_at: None,
        items: vec![LineItem {
            id: new_id(),
            product_id: None,
            quantity: 1,
            unit_price: total,
            unit_cost: Money::from_pesos(total_pesos * 4 / 10),
            discount: Money::zero(),
            total_price: total,
            snapshot: ProductSnapshot {
                codigo: Some("PED-ANILLO-7".to_string()),
                name: Some("Anillo grabado".to_string()),
                quilataje: Some("14k".to_string()),
                talla: Some("7".to_string()),
                ..ProductSnapshot::default()
            },
        }],
        payments: payments
            .iter()
            .enumerate()
            .map(|(i, pesos)| OrderPayment {
                id: new_id(),
                pedido_id: id.clone(),
                amount: Money::from_pesos(*pesos),
                method: PaymentMethod::Efectivo,
                kind: if i == 0 { first_kind } else { OrderPaymentKind::Saldo },
                user_id: Some("u2".to_string()),
                created_at,
            })
            .collect(),
    }
}
