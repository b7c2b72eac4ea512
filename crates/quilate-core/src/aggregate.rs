//! # Aggregator
//!
//! Folds a [`Classified`] stream into a typed counter bag.
//!
//! ## Counter Bag
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CounterBag                                                             │
//! │  ├── buckets:  Bucket → BucketCounter   (docs, gross tally, cost, pcs) │
//! │  ├── sellers:  seller → Bucket → BucketCounter                         │
//! │  ├── days:     local date → Bucket → BucketCounter                     │
//! │  ├── pieces:   vendidas, devueltas, apartadas, pedidas, liquidadas…    │
//! │  └── rollups:  piezas_*_por_nombre                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Counters hold gross amounts only. Netting happens when a counter is read
//! ([`BucketCounter::net`]), once per bucket, so per-row rounding never
//! accumulates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{Bucket, Classified, Entry, MilestoneKind};
use crate::ledger::PieceLine;
use crate::money::Money;
use crate::time::StoreOffset;
use crate::types::MethodTally;

// =============================================================================
// Bucket Counter
// =============================================================================

/// Accumulated values of one bucket (globally, per seller or per day).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketCounter {
    documents: BTreeSet<String>,
    pub rows: u64,
    pub gross: MethodTally,
    pub document_total: Money,
    pub cost: Money,
    pub pieces: i64,
}

impl BucketCounter {
    pub fn add(&mut self, entry: &Entry) {
        // document-level amounts count once per document
        if self.documents.insert(entry.document_id.clone()) {
            self.document_total += entry.document_total;
            self.cost += entry.cost;
            self.pieces += entry.pieces();
        }
        self.rows += 1;
        self.gross.merge(&entry.tally);
    }

    /// Distinct documents seen.
    pub fn documents(&self) -> u64 {
        self.documents.len() as u64
    }

    /// Net of the card fee, rounded once.
    pub fn net(&self, card_fee_bps: u32) -> Money {
        self.gross.net(card_fee_bps)
    }
}

/// Net of one bucket in a map, zero when absent.
pub fn net_of(map: &BTreeMap<Bucket, BucketCounter>, bucket: Bucket, card_fee_bps: u32) -> Money {
    map.get(&bucket)
        .map(|c| c.net(card_fee_bps))
        .unwrap_or_default()
}

/// Cost of one bucket in a map, zero when absent.
pub fn cost_of(map: &BTreeMap<Bucket, BucketCounter>, bucket: Bucket) -> Money {
    map.get(&bucket).map(|c| c.cost).unwrap_or_default()
}

// =============================================================================
// Piece Counters
// =============================================================================

/// Piece counts for the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceCounters {
    /// Sold through cash sales and contado orders, net of returns.
    pub vendidas: i64,
    pub devueltas: i64,
    /// On layaways created in-window.
    pub apartadas: i64,
    /// On orders created in-window.
    pub pedidas: i64,
    pub liquidadas_apartados: i64,
    pub liquidadas_pedidos: i64,
    pub entregadas: i64,
    pub canceladas: i64,
    pub vencidas: i64,
}

impl PieceCounters {
    pub fn liquidadas(&self) -> i64 {
        self.liquidadas_apartados + self.liquidadas_pedidos
    }
}

/// Piece counts by product name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceRollups {
    pub piezas_vendidas_por_nombre: BTreeMap<String, i64>,
    pub piezas_devueltas_por_nombre: BTreeMap<String, i64>,
    pub piezas_apartadas_por_nombre: BTreeMap<String, i64>,
    pub piezas_pedidas_por_nombre: BTreeMap<String, i64>,
    pub piezas_liquidadas_por_nombre: BTreeMap<String, i64>,
}

fn roll(map: &mut BTreeMap<String, i64>, lines: &[PieceLine], sign: i64) {
    for line in lines {
        *map.entry(line.name.clone()).or_insert(0) += line.quantity * sign;
    }
}

// =============================================================================
// Counter Bag
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct CounterBag {
    pub buckets: BTreeMap<Bucket, BucketCounter>,
    pub sellers: BTreeMap<String, BTreeMap<Bucket, BucketCounter>>,
    pub days: BTreeMap<NaiveDate, BTreeMap<Bucket, BucketCounter>>,
    /// Distinct documents per local day, over cash-moving buckets.
    pub day_documents: BTreeMap<NaiveDate, BTreeSet<String>>,
    pub pieces: PieceCounters,
    pub rollups: PieceRollups,
}

impl CounterBag {
    /// Accumulates a classified stream; days are store-local.
    pub fn accumulate(classified: &Classified, offset: StoreOffset) -> Self {
        let mut bag = CounterBag::default();

        for entry in &classified.entries {
            bag.add_entry(entry, offset);
        }

        for milestone in &classified.milestones {
            let pieces: i64 = milestone.lines.iter().map(|l| l.quantity).sum();
            match milestone.kind {
                MilestoneKind::Apartado => {
                    bag.pieces.apartadas += pieces;
                    roll(&mut bag.rollups.piezas_apartadas_por_nombre, &milestone.lines, 1);
                }
                MilestoneKind::Pedido => {
                    bag.pieces.pedidas += pieces;
                    roll(&mut bag.rollups.piezas_pedidas_por_nombre, &milestone.lines, 1);
                }
                MilestoneKind::Entregado => bag.pieces.entregadas += pieces,
            }
        }

        bag
    }

    fn add_entry(&mut self, entry: &Entry, offset: StoreOffset) {
        self.buckets.entry(entry.bucket).or_default().add(entry);
        self.sellers
            .entry(entry.seller.clone())
            .or_default()
            .entry(entry.bucket)
            .or_default()
            .add(entry);

        let date = offset.local_date(entry.at);
        self.days
            .entry(date)
            .or_default()
            .entry(entry.bucket)
            .or_default()
            .add(entry);
        if entry.bucket.moves_cash() {
            self.day_documents
                .entry(date)
                .or_default()
                .insert(entry.document_id.clone());
        }

        // piece counters follow document-level rows only
        let pieces = entry.pieces();
        match entry.bucket {
            Bucket::ActiveCash | Bucket::ActiveOrderCash => {
                self.pieces.vendidas += pieces;
                roll(&mut self.rollups.piezas_vendidas_por_nombre, &entry.lines, 1);
            }
            Bucket::CancellationCashSale => {
                self.pieces.vendidas += pieces;
                self.pieces.devueltas -= pieces;
                roll(&mut self.rollups.piezas_vendidas_por_nombre, &entry.lines, 1);
                roll(&mut self.rollups.piezas_devueltas_por_nombre, &entry.lines, -1);
            }
            Bucket::LiquidationLayaway => {
                self.pieces.liquidadas_apartados += pieces;
                roll(&mut self.rollups.piezas_liquidadas_por_nombre, &entry.lines, 1);
            }
            Bucket::LiquidationOrder => {
                self.pieces.liquidadas_pedidos += pieces;
                roll(&mut self.rollups.piezas_liquidadas_por_nombre, &entry.lines, 1);
            }
            Bucket::CancellationOrderCash
            | Bucket::RefundLayawayCancelled
            | Bucket::RefundOrderCancelled => self.pieces.canceladas += pieces,
            Bucket::OverdueLayaway | Bucket::OverdueOrder => self.pieces.vencidas += pieces,
            _ => {}
        }
    }

    pub fn bucket(&self, bucket: Bucket) -> Option<&BucketCounter> {
        self.buckets.get(&bucket)
    }

    pub fn net(&self, bucket: Bucket, card_fee_bps: u32) -> Money {
        net_of(&self.buckets, bucket, card_fee_bps)
    }

    pub fn cost(&self, bucket: Bucket) -> Money {
        cost_of(&self.buckets, bucket)
    }

    /// Entries that landed in `other`.
    pub fn other_rows(&self) -> u64 {
        self.bucket(Bucket::Other).map(|c| c.rows).unwrap_or(0)
    }
}
