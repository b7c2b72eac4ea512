//! # Folios
//!
//! Human-readable document identifiers, unique per tenant and kind.
//!
//! ```text
//! VENTA     →  V-000042
//! APARTADO  →  AP-000007
//! PEDIDO    →  PED-000113
//! ```
//!
//! Folios are opaque: nothing in the engine parses them back. Allocation
//! (the counter) lives in quilate-db; this module owns the naming.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Zero-padded width of the sequence part.
pub const FOLIO_WIDTH: usize = 6;

/// Document kind a folio counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FolioKind {
    Venta,
    Apartado,
    Pedido,
}

impl FolioKind {
    /// Value stored in `folio_counters.tipo`.
    pub fn tipo(&self) -> &'static str {
        match self {
            FolioKind::Venta => "VENTA",
            FolioKind::Apartado => "APARTADO",
            FolioKind::Pedido => "PEDIDO",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            FolioKind::Venta => "V",
            FolioKind::Apartado => "AP",
            FolioKind::Pedido => "PED",
        }
    }

    /// Formats sequence `seq` as a folio of this kind.
    ///
    /// ## Example
    /// ```rust
    /// use quilate_core::folio::FolioKind;
    ///
    /// assert_eq!(FolioKind::Venta.format(42), "V-000042");
    /// assert_eq!(FolioKind::Pedido.format(1_234_567), "PED-1234567");
    /// ```
    pub fn format(&self, seq: i64) -> String {
        format!("{}-{:0width$}", self.prefix(), seq, width = FOLIO_WIDTH)
    }
}

impl fmt::Display for FolioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tipo())
    }
}

impl FromStr for FolioKind {
    type Err = CoreError;

    /// Accepts the stored tipo (`VENTA`) or the prefix (`V`), any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "VENTA" | "V" => Ok(FolioKind::Venta),
            "APARTADO" | "AP" => Ok(FolioKind::Apartado),
            "PEDIDO" | "PED" => Ok(FolioKind::Pedido),
            _ => Err(CoreError::UnknownFolioKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_format_is_zero_padded() {
        assert_eq!(FolioKind::Venta.format(1), "V-000001");
        assert_eq!(FolioKind::Apartado.format(7), "AP-000007");
        assert_eq!(FolioKind::Pedido.format(113), "PED-000113");
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("venta".parse::<FolioKind>().unwrap(), FolioKind::Venta);
        assert_eq!("AP".parse::<FolioKind>().unwrap(), FolioKind::Apartado);

        let err = "REMISION".parse::<FolioKind>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadInput);
    }
}
