//! # Metal-Rate Pricing
//!
//! Gold and silver pieces are priced from the tenant's rate per gram.
//!
//! ## Derived Price
//! ```text
//! rate_per_gram × weight_grams × (1 − discount)   → rounded to whole pesos
//!
//! $1,250.00/g × 3.200 g × (1 − 10%) = $3,600.00
//! ```
//!
//! One rounding, at the end, done in i128 so large catalogs and heavy pieces
//! never overflow.

use crate::catalog::{normalize_metal_type, Product};
use crate::money::Money;

/// Derived price in whole pesos, half away from zero.
pub fn derive_price(rate_per_gram: Money, weight_mg: i64, discount_bps: u32) -> Money {
    let keep_bps = 10_000i128 - discount_bps.min(10_000) as i128;
    // cents * mg * bps  →  cents: divide by 1000 (mg→g) and 10_000 (bps)
    let numerator = rate_per_gram.cents() as i128 * weight_mg as i128 * keep_bps;
    let denominator = 1_000i128 * 10_000 * 100;
    let pesos = if numerator >= 0 {
        (numerator + denominator / 2) / denominator
    } else {
        (numerator - denominator / 2) / denominator
    };
    Money::from_pesos(pesos as i64)
}

/// Price the product should carry under `rate_per_gram`, when it is
/// metal-priced: has a karat, a weight and no manual override.
pub fn derived_price_for(product: &Product, rate_per_gram: Money) -> Option<Money> {
    if product.manual_price {
        return None;
    }
    product.quilataje.as_ref()?;
    let weight_mg = product.weight_mg.filter(|w| *w > 0)?;
    Some(derive_price(rate_per_gram, weight_mg, product.discount_bps))
}

/// A price change produced by a rate update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reprice {
    pub product_id: String,
    pub old_price: Money,
    pub new_price: Money,
}

/// Products whose price changes when `metal_type` moves to `rate_per_gram`.
///
/// Products already at the derived price are left out.
pub fn reprice_plan(products: &[Product], metal_type: &str, rate_per_gram: Money) -> Vec<Reprice> {
    let metal = normalize_metal_type(metal_type);
    products
        .iter()
        .filter(|p| {
            p.quilataje
                .as_deref()
                .map(|q| normalize_metal_type(q) == metal)
                .unwrap_or(false)
        })
        .filter_map(|p| {
            let new_price = derived_price_for(p, rate_per_gram)?;
            (new_price != p.price).then(|| Reprice {
                product_id: p.id.clone(),
                old_price: p.price,
                new_price,
            })
        })
        .collect()
}
