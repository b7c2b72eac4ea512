//! # Domain Types
//!
//! Value types and enums shared by the ledger, the classifier and the
//! database layer.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  PaymentMethod  │   │  CreditStatus   │   │   OrderStatus   │       │
//! │  │  efectivo       │   │  pendiente      │   │  pendiente      │       │
//! │  │  transferencia  │   │  pagado         │   │  pedido/pedidas │       │
//! │  │  tarjeta        │   │  entregado      │   │  recibido       │       │
//! │  │  otro           │   │  vencido        │   │  entregado      │       │
//! │  └─────────────────┘   │  cancelado      │   │  pagado/vencido │       │
//! │                        └─────────────────┘   │  cancelado      │       │
//! │  ┌─────────────────┐   ┌─────────────────┐   └─────────────────┘       │
//! │  │  MethodTally    │   │ CreditPayment-  │   ┌─────────────────┐       │
//! │  │  gross amounts  │   │ Kind            │   │ MovementReason  │       │
//! │  │  per method     │   │ anticipo/abono  │   │ ajuste, pedido… │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status enums are stored as lowercase text; with the `sqlx` feature they
//! decode straight from rows. Payment methods are parsed leniently because
//! collaborators have written free-form values over the years.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, ValidationError};
use crate::money::Money;

/// Seller id used when a row carries neither `vendedor_id` nor `user_id`.
pub const MOSTRADOR_SELLER_ID: &str = "mostrador";

/// Note written on the first payment of a layaway by older capture screens.
pub const INITIAL_ANTICIPO_NOTE: &str = "Anticipo inicial";

/// Default acquirer fee on card payments: 300 bps = 3%.
pub const DEFAULT_CARD_FEE_BPS: u32 = 300;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1600 bps = 16% (IVA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Efectivo,
    Transferencia,
    /// Credit or debit card; subject to the acquirer fee.
    Tarjeta,
    /// Anything else (vales, cheques, unknown legacy values).
    Otro,
}

impl PaymentMethod {
    /// Parses stored values, mapping anything unknown to `Otro`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "efectivo" | "cash" => PaymentMethod::Efectivo,
            "tarjeta" | "card" | "tarjeta_credito" | "tarjeta_debito" | "credito" | "debito" => {
                PaymentMethod::Tarjeta
            }
            "transferencia" | "transfer" | "spei" => PaymentMethod::Transferencia,
            _ => PaymentMethod::Otro,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Efectivo => "efectivo",
            PaymentMethod::Transferencia => "transferencia",
            PaymentMethod::Tarjeta => "tarjeta",
            PaymentMethod::Otro => "otro",
        }
    }

    #[inline]
    pub fn is_card(&self) -> bool {
        matches!(self, PaymentMethod::Tarjeta)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Method Tally
// =============================================================================

/// Gross amounts split by payment method.
///
/// Used both as the tender of a cash sale and as the accumulator inside
/// every report bucket. Netting happens once, on the tally, never per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodTally {
    pub efectivo: Money,
    pub transferencia: Money,
    pub tarjeta: Money,
    pub otro: Money,
}

impl MethodTally {
    /// A tally holding a single payment.
    pub fn single(method: PaymentMethod, amount: Money) -> Self {
        let mut tally = MethodTally::default();
        tally.add(method, amount);
        tally
    }

    pub fn add(&mut self, method: PaymentMethod, amount: Money) {
        match method {
            PaymentMethod::Efectivo => self.efectivo += amount,
            PaymentMethod::Transferencia => self.transferencia += amount,
            PaymentMethod::Tarjeta => self.tarjeta += amount,
            PaymentMethod::Otro => self.otro += amount,
        }
    }

    pub fn merge(&mut self, other: &MethodTally) {
        self.efectivo += other.efectivo;
        self.transferencia += other.transferencia;
        self.tarjeta += other.tarjeta;
        self.otro += other.otro;
    }

    /// Sum of every method, as captured.
    pub fn gross(&self) -> Money {
        self.efectivo + self.transferencia + self.tarjeta + self.otro
    }

    /// Card amount after the acquirer fee.
    pub fn tarjeta_net(&self, card_fee_bps: u32) -> Money {
        self.tarjeta.net_of_fee(card_fee_bps)
    }

    /// Sum of every method with card netted.
    pub fn net(&self, card_fee_bps: u32) -> Money {
        self.efectivo + self.transferencia + self.tarjeta_net(card_fee_bps) + self.otro
    }

    pub fn is_zero(&self) -> bool {
        self.gross().is_zero() && self.tarjeta.is_zero()
    }
}

// =============================================================================
// Layaway Status
// =============================================================================

/// `credit_status` of a layaway (apartado).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CreditStatus {
    Pendiente,
    Pagado,
    Entregado,
    Vencido,
    Cancelado,
}

impl CreditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditStatus::Pendiente => "pendiente",
            CreditStatus::Pagado => "pagado",
            CreditStatus::Entregado => "entregado",
            CreditStatus::Vencido => "vencido",
            CreditStatus::Cancelado => "cancelado",
        }
    }

    /// Fully paid (possibly already handed over).
    #[inline]
    pub fn is_liquidated(&self) -> bool {
        matches!(self, CreditStatus::Pagado | CreditStatus::Entregado)
    }

    /// Still owes money and counts toward receivables.
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, CreditStatus::Pendiente | CreditStatus::Vencido)
    }
}

impl fmt::Display for CreditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pendiente" => Ok(CreditStatus::Pendiente),
            "pagado" => Ok(CreditStatus::Pagado),
            "entregado" => Ok(CreditStatus::Entregado),
            "vencido" => Ok(CreditStatus::Vencido),
            "cancelado" => Ok(CreditStatus::Cancelado),
            other => Err(unknown_value("credit_status", other)),
        }
    }
}

// =============================================================================
// Order Status / Kind
// =============================================================================

/// `estado` of a custom order (pedido).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pendiente,
    /// Requested from the supplier.
    Pedido,
    /// Supplier confirmed the pieces.
    Pedidas,
    /// Pieces arrived at the store.
    Recibido,
    Entregado,
    Pagado,
    Vencido,
    Cancelado,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pendiente => "pendiente",
            OrderStatus::Pedido => "pedido",
            OrderStatus::Pedidas => "pedidas",
            OrderStatus::Recibido => "recibido",
            OrderStatus::Entregado => "entregado",
            OrderStatus::Pagado => "pagado",
            OrderStatus::Vencido => "vencido",
            OrderStatus::Cancelado => "cancelado",
        }
    }

    #[inline]
    pub fn is_liquidated(&self) -> bool {
        matches!(self, OrderStatus::Pagado | OrderStatus::Entregado)
    }

    /// Counts toward receivables (cohort measure).
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Pendiente | OrderStatus::Vencido)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pendiente" => Ok(OrderStatus::Pendiente),
            "pedido" => Ok(OrderStatus::Pedido),
            "pedidas" => Ok(OrderStatus::Pedidas),
            "recibido" => Ok(OrderStatus::Recibido),
            "entregado" => Ok(OrderStatus::Entregado),
            "pagado" => Ok(OrderStatus::Pagado),
            "vencido" => Ok(OrderStatus::Vencido),
            "cancelado" => Ok(OrderStatus::Cancelado),
            other => Err(unknown_value("estado", other)),
        }
    }
}

/// `tipo_pedido`: paid in full at creation, or anticipo + installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Contado,
    Apartado,
}

/// `tipo_pago` of an order payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderPaymentKind {
    Anticipo,
    Saldo,
    Total,
}

impl OrderPaymentKind {
    /// Saldo and total payments can liquidate an order.
    #[inline]
    pub fn can_liquidate(&self) -> bool {
        matches!(self, OrderPaymentKind::Saldo | OrderPaymentKind::Total)
    }
}

// =============================================================================
// Credit Payment Kind
// =============================================================================

/// Explicit kind of a layaway payment.
///
/// Older rows have no kind; the first payment was marked only by its note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CreditPaymentKind {
    Anticipo,
    Abono,
}

impl CreditPaymentKind {
    /// Resolves the kind of a row, falling back to the legacy note.
    pub fn resolve(stored: Option<CreditPaymentKind>, notes: Option<&str>) -> Self {
        match stored {
            Some(kind) => kind,
            None => match notes {
                Some(n) if n.trim().eq_ignore_ascii_case(INITIAL_ANTICIPO_NOTE) => {
                    CreditPaymentKind::Anticipo
                }
                _ => CreditPaymentKind::Abono,
            },
        }
    }
}

// =============================================================================
// Inventory Movement Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Entrada,
    Salida,
}

impl MovementType {
    /// +1 for entradas, -1 for salidas.
    #[inline]
    pub fn sign(&self) -> i64 {
        match self {
            MovementType::Entrada => 1,
            MovementType::Salida => -1,
        }
    }
}

/// Why stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    AjusteManual,
    PedidoRecibido,
    Devolucion,
    Eliminacion,
    /// Pieces reserved by a new layaway.
    Apartado,
    Otro,
}

impl MovementReason {
    /// Resolves the reason of a row, inferring it from notes on legacy rows.
    pub fn resolve(stored: Option<MovementReason>, notes: Option<&str>) -> Self {
        if let Some(reason) = stored {
            return reason;
        }
        let notes = notes.unwrap_or_default().to_lowercase();
        if notes.contains("pedido") {
            MovementReason::PedidoRecibido
        } else if notes.contains("devoluci") {
            MovementReason::Devolucion
        } else if notes.contains("elimina") || notes.contains("baja") {
            MovementReason::Eliminacion
        } else if notes.contains("ajuste") || notes.contains("manual") {
            MovementReason::AjusteManual
        } else {
            MovementReason::Otro
        }
    }
}

// =============================================================================
// Audit
// =============================================================================

/// Kind of document a status change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Apartado,
    Pedido,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Apartado => "apartado",
            EntityKind::Pedido => "pedido",
        }
    }
}

/// Who performed a write. The email is frozen into audit rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub email: Option<String>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Actor {
            user_id: user_id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Seller attribution: `vendedor_id`, else `user_id`, else mostrador.
pub fn attribute_seller(vendedor_id: Option<&str>, user_id: Option<&str>) -> String {
    vendedor_id
        .filter(|v| !v.trim().is_empty())
        .or_else(|| user_id.filter(|u| !u.trim().is_empty()))
        .unwrap_or(MOSTRADOR_SELLER_ID)
        .to_string()
}

fn unknown_value(field: &str, value: &str) -> CoreError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("unknown value '{}'", value),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_lenient_parse() {
        assert_eq!(PaymentMethod::parse_lenient("Efectivo"), PaymentMethod::Efectivo);
        assert_eq!(PaymentMethod::parse_lenient("tarjeta_credito"), PaymentMethod::Tarjeta);
        assert_eq!(PaymentMethod::parse_lenient(" SPEI "), PaymentMethod::Transferencia);
        assert_eq!(PaymentMethod::parse_lenient("vale"), PaymentMethod::Otro);
    }

    #[test]
    fn test_tally_nets_card_only() {
        let mut tally = MethodTally::single(PaymentMethod::Efectivo, Money::from_pesos(100));
        tally.add(PaymentMethod::Tarjeta, Money::from_pesos(200));
        tally.add(PaymentMethod::Transferencia, Money::from_pesos(50));

        assert_eq!(tally.gross(), Money::from_pesos(350));
        assert_eq!(tally.tarjeta_net(300), Money::from_pesos(194));
        assert_eq!(tally.net(300), Money::from_pesos(344));
    }

    #[test]
    fn test_credit_payment_kind_from_legacy_note() {
        assert_eq!(
            CreditPaymentKind::resolve(None, Some("Anticipo inicial")),
            CreditPaymentKind::Anticipo
        );
        assert_eq!(
            CreditPaymentKind::resolve(None, Some("abono semanal")),
            CreditPaymentKind::Abono
        );
        assert_eq!(
            CreditPaymentKind::resolve(Some(CreditPaymentKind::Abono), Some("Anticipo inicial")),
            CreditPaymentKind::Abono
        );
    }

    #[test]
    fn test_movement_reason_inference() {
        assert_eq!(
            MovementReason::resolve(None, Some("Pedido recibido PED-000004")),
            MovementReason::PedidoRecibido
        );
        assert_eq!(
            MovementReason::resolve(None, Some("Devolución cliente")),
            MovementReason::Devolucion
        );
        assert_eq!(MovementReason::resolve(None, None), MovementReason::Otro);
    }

    #[test]
    fn test_seller_attribution() {
        assert_eq!(attribute_seller(Some("v1"), Some("u1")), "v1");
        assert_eq!(attribute_seller(None, Some("u1")), "u1");
        assert_eq!(attribute_seller(Some(" "), None), MOSTRADOR_SELLER_ID);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Pagado".parse::<CreditStatus>().unwrap(), CreditStatus::Pagado);
        assert_eq!("pedidas".parse::<OrderStatus>().unwrap(), OrderStatus::Pedidas);
        assert!("perdido".parse::<OrderStatus>().is_err());
        assert!(CreditStatus::Entregado.is_liquidated());
        assert!(OrderStatus::Vencido.is_open());
    }
}
