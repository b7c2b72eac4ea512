//! Non-fatal data inconsistencies found while building a report.
//!
//! Aggregation is total: a row that cannot be attributed lands in the
//! `other` bucket and a [`DataWarning`] explains why.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Return row (`return_of_id` set) with a non-negative total.
    PositiveReturn,
    /// Contado order in a state other than pagado/entregado/cancelado.
    ContadoNotSettled,
    /// Payment whose layaway or order is missing.
    OrphanPayment,
    /// A document breaks a balance invariant at rest.
    BrokenInvariant,
    /// Bucket totals disagree with the independent cash sum.
    ConservationMismatch,
    /// Replayed stock went below zero and was floored.
    NegativeHistoricalStock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWarning {
    pub kind: WarningKind,
    /// Document, payment or product the warning is about.
    pub subject_id: String,
    pub detail: String,
}

impl DataWarning {
    pub fn new(kind: WarningKind, subject_id: impl Into<String>, detail: impl Into<String>) -> Self {
        DataWarning {
            kind,
            subject_id: subject_id.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} [{}]: {}", self.kind, self.subject_id, self.detail)
    }
}
