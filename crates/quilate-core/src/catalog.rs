//! # Catalog
//!
//! Products, their frozen snapshots on sale lines, and metal rates.
//!
//! ## Product Identity
//! ```text
//! ┌──────────────┐   codigo (unique per tenant)      ┌──────────────────┐
//! │   Product    │──────────────────────────────────►│  ProductSnapshot │
//! │  stock ≥ 0   │   frozen into every sale line     │  (JSON, immutable│
//! │  price       │                                   │   once written)  │
//! └──────┬───────┘                                   └──────────────────┘
//!        │ quilataje
//!        ▼
//! ┌──────────────┐
//! │  MetalRate   │  (tenant, metal_type) → rate_per_gram
//! └──────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub codigo: String,
    pub name: String,
    pub modelo: Option<String>,
    pub color: Option<String>,
    /// Karat, e.g. `10k`, `14k`. Also the metal-rate key.
    pub quilataje: Option<String>,
    pub marca: Option<String>,
    pub base: Option<String>,
    pub tipo_joya: Option<String>,
    pub talla: Option<String>,
    /// Weight in milligrams.
    pub weight_mg: Option<i64>,
    pub cost_price: Money,
    pub price: Money,
    /// Catalog discount applied on top of the derived price.
    pub discount_bps: u32,
    /// When set, metal-rate updates never touch the price.
    pub manual_price: bool,
    pub stock: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Frozen copy of the descriptive attributes, for sale lines.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            codigo: Some(self.codigo.clone()),
            name: Some(self.name.clone()),
            modelo: self.modelo.clone(),
            color: self.color.clone(),
            quilataje: self.quilataje.clone(),
            marca: self.marca.clone(),
            base: self.base.clone(),
            tipo_joya: self.tipo_joya.clone(),
            talla: self.talla.clone(),
            weight_mg: self.weight_mg,
            cost_price: Some(self.cost_price),
        }
    }

    /// Grouping key for stock listings.
    pub fn group_key(&self) -> StockGroupKey {
        StockGroupKey {
            name: self.name.clone(),
            modelo: self.modelo.clone().unwrap_or_default(),
            quilataje: self.quilataje.clone().unwrap_or_default(),
            marca: self.marca.clone().unwrap_or_default(),
            color: self.color.clone().unwrap_or_default(),
            base: self.base.clone().unwrap_or_default(),
            tipo_joya: self.tipo_joya.clone().unwrap_or_default(),
            talla: self.talla.clone().unwrap_or_default(),
        }
    }
}

/// Attribute tuple products are grouped by in stock reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockGroupKey {
    pub name: String,
    pub modelo: String,
    pub quilataje: String,
    pub marca: String,
    pub color: String,
    pub base: String,
    pub tipo_joya: String,
    pub talla: String,
}

// =============================================================================
// Product Snapshot
// =============================================================================

/// Product attributes frozen on a sale line.
///
/// Read leniently: older snapshots carry fewer keys and unknown keys are
/// ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSnapshot {
    pub codigo: Option<String>,
    pub name: Option<String>,
    pub modelo: Option<String>,
    pub color: Option<String>,
    pub quilataje: Option<String>,
    pub marca: Option<String>,
    pub base: Option<String>,
    pub tipo_joya: Option<String>,
    pub talla: Option<String>,
    pub weight_mg: Option<i64>,
    pub cost_price: Option<Money>,
}

impl ProductSnapshot {
    /// Parses a stored snapshot; malformed JSON yields an empty snapshot.
    pub fn from_json(raw: Option<&str>) -> Self {
        raw.and_then(|r| serde_json::from_str(r).ok()).unwrap_or_default()
    }
}

// =============================================================================
// Metal Rate
// =============================================================================

/// Price of one gram of a metal, per tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalRate {
    pub tenant_id: String,
    /// Normalized key, see [`normalize_metal_type`].
    pub metal_type: String,
    pub rate_per_gram: Money,
    pub updated_at: DateTime<Utc>,
}

/// Canonical metal key: trimmed, lowercase, inner spaces removed.
///
/// `" 14 K"` and `"14k"` address the same rate.
pub fn normalize_metal_type(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
