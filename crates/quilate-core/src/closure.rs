//! # Closure Documents
//!
//! A closed day is a frozen, versioned document. Readers go by metric name
//! and ignore names they do not know, so fields can be added freely.
//!
//! ## Layout
//! ```text
//! {
//!   "schema_version": 1,
//!   "tenant_id": "…",
//!   "date": "2026-03-10",
//!   "closed_at": "2026-03-11T04:12:09.000000Z",
//!   "closed_by": "admin-1",
//!   "metrics": { "active_sales_net": 15000, "active.cash.efectivo": 15000, … },
//!   "report":  { …full report… }
//! }
//! ```
//!
//! ## Period View
//! ```text
//! days:   03-09 (closed)   03-10 (pending)   03-11 (closed)
//!            │                  │                 │
//!            └──── Σ whitelisted metrics ─────────┘   pending adds 0
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::classify::Bucket;
use crate::report::{piece_entries, Report, Totals, BUCKET_METRIC_FIELDS, REPORT_SCHEMA_VERSION};
use crate::aggregate::PieceCounters;
use crate::inventory::InventoryReport;
use crate::time::DateWindow;

// =============================================================================
// Closure Document
// =============================================================================

/// Stored snapshot of one closed day (sales or inventory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub tenant_id: String,
    pub date: NaiveDate,
    pub closed_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_by: Option<String>,
    /// Flat `name → integer`, money in centavos.
    #[serde(default)]
    pub metrics: BTreeMap<String, i64>,
    /// Full report as computed at close time.
    #[serde(default)]
    pub report: serde_json::Value,
}

fn default_schema_version() -> u32 {
    REPORT_SCHEMA_VERSION
}

impl ClosureDocument {
    /// Freezes a sales report.
    pub fn from_report(
        report: &Report,
        date: NaiveDate,
        closed_at: DateTime<Utc>,
        closed_by: Option<String>,
    ) -> serde_json::Result<Self> {
        Ok(ClosureDocument {
            schema_version: REPORT_SCHEMA_VERSION,
            tenant_id: report.tenant_id.clone(),
            date,
            closed_at,
            closed_by,
            metrics: report.metrics(),
            report: serde_json::to_value(report)?,
        })
    }

    /// Freezes an inventory report.
    pub fn from_inventory(
        report: &InventoryReport,
        date: NaiveDate,
        closed_at: DateTime<Utc>,
        closed_by: Option<String>,
    ) -> serde_json::Result<Self> {
        Ok(ClosureDocument {
            schema_version: REPORT_SCHEMA_VERSION,
            tenant_id: report.tenant_id.clone(),
            date,
            closed_at,
            closed_by,
            metrics: report.metrics(),
            report: serde_json::to_value(report)?,
        })
    }

    /// Value of a metric, zero when the document predates it.
    pub fn metric(&self, name: &str) -> i64 {
        self.metrics.get(name).copied().unwrap_or(0)
    }

    /// Typed view of the embedded sales report, when it parses.
    pub fn sales_report(&self) -> Option<Report> {
        serde_json::from_value(self.report.clone()).ok()
    }

    /// Typed view of the embedded inventory report, when it parses.
    pub fn inventory_report(&self) -> Option<InventoryReport> {
        serde_json::from_value(self.report.clone()).ok()
    }
}

/// Reference returned after a successful close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureRef {
    pub closure_id: String,
    pub tenant_id: String,
    pub date: NaiveDate,
    pub closed_at: DateTime<Utc>,
}

// =============================================================================
// Period View
// =============================================================================

/// Metric names that may be summed across days.
///
/// Everything the sales report emits today, except the warning count.
pub fn summable_metrics() -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for bucket in Bucket::ALL {
        for field in BUCKET_METRIC_FIELDS {
            names.insert(format!("{}.{}", bucket.key(), field));
        }
    }
    for (name, _) in Totals::default().entries() {
        names.insert(name.to_string());
    }
    for (name, _) in piece_entries(&PieceCounters::default()) {
        names.insert(name.to_string());
    }
    names
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDay {
    pub date: NaiveDate,
    pub has_closure: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
}

/// Sum of frozen days over a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub tenant_id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<PeriodDay>,
    pub closed_days: u32,
    pub pending_days: u32,
    pub totals: BTreeMap<String, i64>,
}

impl PeriodReport {
    pub fn total(&self, name: &str) -> i64 {
        self.totals.get(name).copied().unwrap_or(0)
    }
}

/// Sums `closures` over every day of `window`.
///
/// Closures outside the window are ignored, as are unknown metric names.
pub fn sum_period(tenant_id: &str, window: &DateWindow, closures: &[ClosureDocument]) -> PeriodReport {
    let by_date: BTreeMap<NaiveDate, &ClosureDocument> =
        closures.iter().map(|c| (c.date, c)).collect();
    let whitelist = summable_metrics();

    let mut totals: BTreeMap<String, i64> =
        whitelist.iter().map(|name| (name.clone(), 0)).collect();
    let mut days = Vec::new();
    let mut closed_days = 0;
    let mut pending_days = 0;

    for date in window.days() {
        match by_date.get(&date) {
            Some(closure) => {
                closed_days += 1;
                for (name, value) in &closure.metrics {
                    if let Some(total) = totals.get_mut(name) {
                        *total += value;
                    }
                }
                days.push(PeriodDay {
                    date,
                    has_closure: true,
                    closed_at: Some(closure.closed_at),
                    closed_by: closure.closed_by.clone(),
                });
            }
            None => {
                pending_days += 1;
                days.push(PeriodDay {
                    date,
                    has_closure: false,
                    closed_at: None,
                    closed_by: None,
                });
            }
        }
    }

    PeriodReport {
        tenant_id: tenant_id.to_string(),
        from: window.from(),
        to: window.to(),
        days,
        closed_days,
        pending_days,
        totals,
    }
}
