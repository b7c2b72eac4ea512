//! # Inventory
//!
//! Movements, historical stock reconstruction and the inventory report.
//!
//! ## Historical Stock
//! ```text
//!                    target_date           today
//!   ──────────────────────┤ cutoff ───────────┤
//!                         │◄──── replayed ───►│
//!
//!   historical = stock now
//!              + Σ salidas after cutoff
//!              − Σ entradas after cutoff
//!              + Σ cash-sale line quantities after cutoff
//! ```
//! `cutoff` is local midnight following `target_date`. Values below zero
//! are floored and reported as warnings.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::aggregate::PieceRollups;
use crate::catalog::{Product, StockGroupKey};
use crate::money::Money;
use crate::report::{Report, REPORT_SCHEMA_VERSION};
use crate::time::{DateWindow, StoreOffset};
use crate::types::{MovementReason, MovementType};
use crate::warning::{DataWarning, WarningKind};

// =============================================================================
// Movements
// =============================================================================

/// A stock change. Quantity is always positive; direction is the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub cost: Option<Money>,
    pub reason: MovementReason,
    pub notes: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    /// Stock delta: positive for entradas.
    pub fn signed_quantity(&self) -> i64 {
        self.movement_type.sign() * self.quantity
    }
}

/// Units of a product that left through a cash-sale line.
///
/// Return rows carry negative quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoldLine {
    pub product_id: String,
    pub quantity: i64,
    pub at: DateTime<Utc>,
}

// =============================================================================
// Grouped Stock
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStock {
    pub product_id: String,
    pub codigo: String,
    pub stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockGroup {
    pub key: StockGroupKey,
    pub total: i64,
    pub products: Vec<ProductStock>,
}

/// Stock per product, grouped by identifying attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedStock {
    pub date: NaiveDate,
    /// False for the current-stock variant.
    pub historical: bool,
    pub groups: Vec<StockGroup>,
    pub total_pieces: i64,
    #[serde(default)]
    pub warnings: Vec<DataWarning>,
}

impl GroupedStock {
    /// Stock of one product, if listed.
    pub fn product(&self, product_id: &str) -> Option<i64> {
        self.groups
            .iter()
            .flat_map(|g| g.products.iter())
            .find(|p| p.product_id == product_id)
            .map(|p| p.stock)
    }
}

fn group(
    date: NaiveDate,
    historical: bool,
    products: &[&Product],
    stock_of: impl Fn(&Product) -> i64,
    warnings: Vec<DataWarning>,
) -> GroupedStock {
    let mut groups: BTreeMap<StockGroupKey, StockGroup> = BTreeMap::new();
    for product in products {
        let key = product.group_key();
        let stock = stock_of(*product);
        let entry = groups.entry(key.clone()).or_insert_with(|| StockGroup {
            key,
            total: 0,
            products: Vec::new(),
        });
        entry.total += stock;
        entry.products.push(ProductStock {
            product_id: product.id.clone(),
            codigo: product.codigo.clone(),
            stock,
        });
    }
    let groups: Vec<StockGroup> = groups.into_values().collect();
    let total_pieces = groups.iter().map(|g| g.total).sum();
    GroupedStock {
        date,
        historical,
        groups,
        total_pieces,
        warnings,
    }
}

/// Stock of active products at the end of `target_date`.
///
/// `target_date >= today` yields the current-stock variant. Only movements
/// and sold lines at or after the cutoff matter; earlier ones are ignored.
pub fn historical_stock(
    target_date: NaiveDate,
    today: NaiveDate,
    offset: StoreOffset,
    products: &[Product],
    movements: &[InventoryMovement],
    sold: &[SoldLine],
) -> GroupedStock {
    let active: Vec<&Product> = products.iter().filter(|p| p.active).collect();

    if target_date >= today {
        return group(target_date, false, &active, |p| p.stock, Vec::new());
    }

    let cutoff = offset.start_of_day(target_date + Duration::days(1));
    let mut replay: HashMap<&str, i64> = HashMap::new();
    for m in movements.iter().filter(|m| m.created_at >= cutoff) {
        *replay.entry(m.product_id.as_str()).or_insert(0) -= m.signed_quantity();
    }
    for line in sold.iter().filter(|l| l.at >= cutoff) {
        *replay.entry(line.product_id.as_str()).or_insert(0) += line.quantity;
    }

    let mut warnings = Vec::new();
    let mut stock_by_id: HashMap<&str, i64> = HashMap::new();
    for product in &active {
        let raw = product.stock + replay.get(product.id.as_str()).copied().unwrap_or(0);
        if raw < 0 {
            warnings.push(DataWarning::new(
                WarningKind::NegativeHistoricalStock,
                &product.id,
                format!("{} replays to {} on {}", product.codigo, raw, target_date),
            ));
        }
        stock_by_id.insert(product.id.as_str(), raw.max(0));
    }

    group(
        target_date,
        true,
        &active,
        |p| stock_by_id.get(p.id.as_str()).copied().unwrap_or(0),
        warnings,
    )
}

// =============================================================================
// Inventory Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementLine {
    pub movement_id: String,
    pub product_id: String,
    pub codigo: String,
    pub name: String,
    pub quantity: i64,
    pub cost: Option<Money>,
    pub reason: MovementReason,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryTotals {
    pub entradas: i64,
    pub salidas: i64,
    pub pedidos_recibidos: i64,
    pub devoluciones: i64,
    /// Σ cost × quantity over entradas and pedidos recibidos with a cost.
    pub costo_entradas: Money,
}

/// Stock activity over a window plus stock at its end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryReport {
    pub schema_version: u32,
    pub tenant_id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub entradas: Vec<MovementLine>,
    pub salidas: Vec<MovementLine>,
    pub pedidos_recibidos: Vec<MovementLine>,
    pub devoluciones: Vec<MovementLine>,
    #[serde(default)]
    pub totals: InventoryTotals,
    pub stock: GroupedStock,
    #[serde(default)]
    pub piezas_por_nombre: PieceRollups,
    #[serde(default)]
    pub warnings: Vec<DataWarning>,
}

impl InventoryReport {
    /// Assembles the report from in-window movements, the sales report of
    /// the same window and the stock at its end.
    pub fn build(
        window: &DateWindow,
        products: &[Product],
        movements: &[InventoryMovement],
        sales: &Report,
        stock: GroupedStock,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut report = InventoryReport {
            schema_version: REPORT_SCHEMA_VERSION,
            tenant_id: sales.tenant_id.clone(),
            from: window.from(),
            to: window.to(),
            generated_at,
            entradas: Vec::new(),
            salidas: Vec::new(),
            pedidos_recibidos: Vec::new(),
            devoluciones: Vec::new(),
            totals: InventoryTotals::default(),
            warnings: stock.warnings.clone(),
            stock,
            piezas_por_nombre: sales.piezas_por_nombre.clone(),
        };

        for m in movements.iter().filter(|m| window.contains(m.created_at)) {
            let product = by_id.get(m.product_id.as_str());
            let line = MovementLine {
                movement_id: m.id.clone(),
                product_id: m.product_id.clone(),
                codigo: product.map(|p| p.codigo.clone()).unwrap_or_default(),
                name: product
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| "Producto eliminado".to_string()),
                quantity: m.quantity,
                cost: m.cost,
                reason: m.reason,
                notes: m.notes.clone(),
                at: m.created_at,
            };
            let entry_cost = m.cost.map(|c| c * m.quantity).unwrap_or_default();

            match (m.reason, m.movement_type) {
                (MovementReason::Devolucion, _) => {
                    report.totals.devoluciones += m.quantity;
                    report.devoluciones.push(line);
                }
                (MovementReason::PedidoRecibido, MovementType::Entrada) => {
                    report.totals.pedidos_recibidos += m.quantity;
                    report.totals.costo_entradas += entry_cost;
                    report.pedidos_recibidos.push(line);
                }
                (_, MovementType::Entrada) => {
                    report.totals.entradas += m.quantity;
                    report.totals.costo_entradas += entry_cost;
                    report.entradas.push(line);
                }
                (_, MovementType::Salida) => {
                    report.totals.salidas += m.quantity;
                    report.salidas.push(line);
                }
            }
        }

        report
    }

    /// Flat `name → integer` view for the inventory closure.
    pub fn metrics(&self) -> BTreeMap<String, i64> {
        let mut out = BTreeMap::new();
        let t = &self.totals;
        for (name, value) in [
            ("inventario.entradas", t.entradas),
            ("inventario.salidas", t.salidas),
            ("inventario.pedidos_recibidos", t.pedidos_recibidos),
            ("inventario.devoluciones", t.devoluciones),
            ("inventario.costo_entradas", t.costo_entradas.cents()),
            ("inventario.existencia_total", self.stock.total_pieces),
            ("inventario.grupos", self.stock.groups.len() as i64),
        ] {
            out.insert(name.to_string(), value);
        }
        let rollups = &self.piezas_por_nombre;
        for (name, map) in [
            ("piezas.vendidas", &rollups.piezas_vendidas_por_nombre),
            ("piezas.devueltas", &rollups.piezas_devueltas_por_nombre),
            ("piezas.apartadas", &rollups.piezas_apartadas_por_nombre),
            ("piezas.pedidas", &rollups.piezas_pedidas_por_nombre),
            ("piezas.liquidadas", &rollups.piezas_liquidadas_por_nombre),
        ] {
            out.insert(name.to_string(), map.values().sum());
        }
        out.insert("warnings".to_string(), self.warnings.len() as i64);
        out
    }
}
