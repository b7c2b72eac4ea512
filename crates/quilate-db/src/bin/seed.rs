//! # Seed Data Generator
//!
//! Populates the database with a demo jewelry store for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default tenant into the configured database
//! cargo run -p quilate-db --bin seed
//!
//! # Specify database path and tenant
//! cargo run -p quilate-db --bin seed -- --db ./data/quilate.db --tenant joyeria-norte
//! ```
//!
//! ## Generated Data
//! - Metal rates for 10k, 14k, 18k and plata
//! - A catalog of rings, earrings, chains and pendants priced from the rates
//! - Cash sales over the last three days (efectivo, tarjeta, transferencia)
//! - One layaway with anticipo and abono, one apartado order, one contado order

use std::env;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use quilate_core::catalog::Product;
use quilate_core::pricing::derive_price;
use quilate_core::ledger::{CashSale, CreditPayment, Layaway, LineItem, Order, OrderPayment, SaleSource};
use quilate_core::{
    Actor, CreditPaymentKind, CreditStatus, MethodTally, Money, OrderKind, OrderPaymentKind,
    OrderStatus, PaymentMethod, TaxRate,
};
use quilate_db::repository::new_id;
use quilate_db::{Database, Engine, QuilateConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_TENANT: &str = "joyeria-centro";

/// (metal, rate per gram in pesos)
const RATES: &[(&str, i64)] = &[("10k", 780), ("14k", 1_090), ("18k", 1_420), ("plata", 28)];

/// (codigo, name, tipo_joya, quilataje, weight in mg, talla, stock)
const CATALOG: &[(&str, &str, &str, &str, i64, Option<&str>, i64)] = &[
    ("AN-10K-001", "Anillo liso", "Anillo", "10k", 2_100, Some("6"), 6),
    ("AN-14K-001", "Anillo solitario", "Anillo", "14k", 2_500, Some("7"), 4),
    ("AN-14K-002", "Anillo solitario", "Anillo", "14k", 2_600, Some("8"), 3),
    ("AN-18K-001", "Churumbela", "Anillo", "18k", 3_200, Some("6"), 2),
    ("AR-10K-001", "Arracada mediana", "Arete", "10k", 1_800, None, 10),
    ("AR-14K-001", "Broquel corazón", "Arete", "14k", 900, None, 12),
    ("CA-14K-001", "Cadena cartier 50cm", "Cadena", "14k", 6_400, None, 5),
    ("CA-18K-001", "Cadena torzal 45cm", "Cadena", "18k", 5_100, None, 2),
    ("DI-14K-001", "Dije Virgen de Guadalupe", "Dije", "14k", 1_300, None, 8),
    ("PU-PL-001", "Pulsera tejida", "Pulsera", "plata", 14_000, None, 15),
];

fn product(tenant: &str, row: &(&str, &str, &str, &str, i64, Option<&str>, i64), now: DateTime<Utc>) -> Product {
    let (codigo, name, tipo_joya, quilataje, weight_mg, talla, stock) = *row;
    let rate = RATES
        .iter()
        .find(|(metal, _)| *metal == quilataje)
        .map(|(_, pesos)| Money::from_pesos(*pesos))
        .unwrap_or_default();
    let price = derive_price(rate, weight_mg, 0);
    Product {
        id: new_id(),
        tenant_id: tenant.to_string(),
        codigo: codigo.to_string(),
        name: name.to_string(),
        modelo: None,
        color: Some(if quilataje == "plata" { "Plata" } else { "Amarillo" }.to_string()),
        quilataje: Some(quilataje.to_string()),
        marca: None,
        base: None,
        tipo_joya: Some(tipo_joya.to_string()),
        talla: talla.map(str::to_string),
        weight_mg: Some(weight_mg),
        // demo cost: 45% of price
        cost_price: Money::from_cents(price.cents() * 45 / 100),
        price,
        discount_bps: 0,
        manual_price: false,
        stock,
        active: true,
        created_at: now,
        updated_at: now,
    }
}

fn line(product: &Product, quantity: i64) -> LineItem {
    LineItem {
        id: new_id(),
        product_id: Some(product.id.clone()),
        quantity,
        unit_price: product.price,
        unit_cost: product.cost_price,
        discount: Money::zero(),
        total_price: product.price * quantity,
        snapshot: product.snapshot(),
    }
}

fn cash_sale(tenant: &str, items: Vec<LineItem>, method: PaymentMethod, vendedor: &str, at: DateTime<Utc>) -> CashSale {
    let total = items.iter().fold(Money::zero(), |acc, l| acc + l.total_price);
    let cost = items.iter().fold(Money::zero(), |acc, l| acc + l.unit_cost * l.quantity);
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
        vendedor_id: Some(vendedor.to_string()),
        user_id: Some("seed".to_string()),
        tender: MethodTally::single(method, total),
        return_of_id: None,
        created_at: at,
        items,
    }
}

fn layaway(tenant: &str, product: &Product, anticipo: Money, at: DateTime<Utc>) -> Layaway {
    let id = new_id();
    Layaway {
        id: id.clone(),
        tenant_id: tenant.to_string(),
        folio: None,
        subtotal: product.price,
        discount: Money::zero(),
        vip_discount: Money::zero(),
        tax: Money::zero(),
        total: product.price,
        total_cost: product.cost_price,
        amount_paid: Money::zero(),
        credit_status: CreditStatus::Pendiente,
        customer_name: Some("María López".to_string()),
        customer_phone: Some("3312345678".to_string()),
        vendedor_id: Some("v-ana".to_string()),
        user_id: Some("seed".to_string()),
        created_at: at,
        status_changed_at: None,
        items: vec![line(product, 1)],
        payments: vec![CreditPayment {
            id: new_id(),
            apartado_id: id,
            amount: anticipo,
            method: PaymentMethod::Efectivo,
            kind: CreditPaymentKind::Anticipo,
            user_id: Some("seed".to_string()),
            notes: None,
            created_at: at,
        }],
    }
}

fn order(tenant: &str, kind: OrderKind, total: Money, paid: Money, at: DateTime<Utc>) -> Order {
    let id = new_id();
    let (estado, payment_kind) = match kind {
        OrderKind::Contado => (OrderStatus::Pagado, OrderPaymentKind::Total),
        OrderKind::Apartado => (OrderStatus::Pendiente, OrderPaymentKind::Anticipo),
    };
    let cost = Money::from_cents(total.cents() * 45 / 100);
    Order {
        id: id.clone(),
        tenant_id: tenant.to_string(),
        folio: None,
        producto_pedido_id: None,
        cliente_nombre: Some("Laura Ruiz".to_string()),
        cliente_telefono: Some("3398765432".to_string()),
        cliente_email: None,
        cantidad: 1,
        precio_unitario: total,
        total,
        total_cost: cost,
        anticipo_pagado: Money::zero(),
        saldo_pendiente: total,
        kind,
        estado,
        vendedor_id: Some("v-luis".to_string()),
        user_id: Some("seed".to_string()),
        created_at: at,
        status_changed_at: None,
        items: vec![LineItem {
            id: new_id(),
            product_id: None,
            quantity: 1,
            unit_price: total,
            unit_cost: cost,
            discount: Money::zero(),
            total_price: total,
            snapshot: quilate_core::catalog::ProductSnapshot {
                codigo: Some(format!("PED-{}", &id[..8].to_uppercase())),
                name: Some("Anillo de compromiso grabado".to_string()),
                quilataje: Some("14k".to_string()),
                talla: Some("6".to_string()),
                ..Default::default()
            },
        }],
        payments: vec![OrderPayment {
            id: new_id(),
            pedido_id: id,
            amount: paid,
            method: PaymentMethod::Transferencia,
            kind: payment_kind,
            user_id: Some("seed".to_string()),
            created_at: at,
        }],
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,quilate=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut config = QuilateConfig::load()?;
    let mut tenant = config.tenant_id.clone().unwrap_or_else(|| DEFAULT_TENANT.to_string());

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database.path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Quilate Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: from quilate.toml)");
                println!("  -t, --tenant <ID>     Tenant to create (default: {})", DEFAULT_TENANT);
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Quilate Seed Data Generator");
    println!("==============================");
    println!("Tenant: {}", tenant);
    println!();

    let db = Database::new(config.db_config()?).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let now = Utc::now();
    if db.tenants().get(&tenant).await?.is_some() {
        let existing = db.products().count(&tenant).await?;
        println!("⚠ Tenant {} already exists with {} products", tenant, existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }
    db.tenants().insert(&tenant, "Joyería Centro (demo)", now).await?;

    let engine = Engine::new(db.clone(), config.engine)?;
    let seed = Actor::new("seed");

    // Catalog priced from the rates, then the rates themselves
    let mut catalog = Vec::new();
    for row in CATALOG {
        let p = product(&tenant, row, now - Duration::days(30));
        catalog.push(db.products().insert(&p).await?);
    }
    println!("✓ {} products", catalog.len());
    for (metal, pesos) in RATES {
        let update = engine.upsert_metal_rate(&tenant, metal, Money::from_pesos(*pesos), true).await?;
        println!(
            "  {} @ {}/g ({} repriced)",
            update.rate.metal_type,
            update.rate.rate_per_gram,
            update.repriced.len()
        );
    }

    // Cash sales over the last three days
    let methods = [PaymentMethod::Efectivo, PaymentMethod::Tarjeta, PaymentMethod::Transferencia];
    let sellers = ["v-ana", "v-luis"];
    let mut sales = 0;
    for day in 1..=3i64 {
        for (n, p) in catalog.iter().enumerate().filter(|(n, _)| (*n as i64 + day) % 3 == 0) {
            let at = now - Duration::days(day) + Duration::minutes(n as i64 * 17);
            let sale = cash_sale(&tenant, vec![line(p, 1)], methods[n % 3], sellers[n % 2], at);
            if let Err(e) = db.cash_sales().create(&sale, at).await {
                eprintln!("Failed to insert sale of {}: {}", p.codigo, e);
                continue;
            }
            sales += 1;
        }
    }
    println!("✓ {} cash sales", sales);

    // Layaway: anticipo five days ago, abono yesterday
    if let Some(ring) = catalog.iter().find(|p| p.codigo == "AN-18K-001") {
        let anticipo = Money::from_cents(ring.price.cents() / 5);
        let l = db
            .layaways()
            .create(&layaway(&tenant, ring, anticipo, now - Duration::days(5)), &seed, now - Duration::days(5))
            .await?;
        let abono = quilate_db::NewCreditPayment {
            amount: anticipo,
            method: PaymentMethod::Tarjeta,
            kind: None,
            notes: None,
        };
        let l = db.layaways().add_payment(&tenant, &l.id, &abono, &seed, now - Duration::days(1)).await?;
        println!("✓ Layaway {} with balance {}", l.folio.as_deref().unwrap_or_default(), l.balance());
    }

    // Orders
    let apartado = order(&tenant, OrderKind::Apartado, Money::from_pesos(9_800), Money::from_pesos(3_000), now - Duration::days(2));
    let apartado = db.orders().create(&apartado, &seed, now - Duration::days(2)).await?;
    let contado = order(&tenant, OrderKind::Contado, Money::from_pesos(4_500), Money::from_pesos(4_500), now - Duration::days(1));
    let contado = db.orders().create(&contado, &seed, now - Duration::days(1)).await?;
    println!(
        "✓ Orders {} (apartado) and {} (contado)",
        apartado.folio.unwrap_or_default(),
        contado.folio.unwrap_or_default()
    );

    println!();
    println!("Done. Try: corte compute {} --tenant {}", engine.today() - Duration::days(1), tenant);
    Ok(())
}
