//! # Document State Machines
//!
//! ## Layaway (`credit_status`)
//! ```text
//!              ┌──────────► vencido ──────┐
//!              │               │          │
//!   pendiente ─┼──────────► pagado ──► entregado
//!              │               ▲
//!              │               └─ vencido
//!              └──────────► cancelado ◄── vencido
//! ```
//!
//! ## Order (`estado`)
//! ```text
//!   pendiente ─► pedido ─► pedidas ─► recibido ─► entregado
//!       └──────────┴──────────┴──────────┴─► pagado | cancelado | vencido
//!   pagado  ─► entregado | cancelado
//!   vencido ─► pagado | cancelado
//! ```
//!
//! Terminal states: `entregado`, `cancelado`. Nothing ever leaves `pagado`
//! toward `pendiente` or `vencido`.

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, CoreResult};
use crate::ledger::{Layaway, Order};
use crate::types::{CreditStatus, OrderKind, OrderStatus};

/// Default age after which an unpaid layaway or order is overdue.
pub const DEFAULT_OVERDUE_DAYS: u32 = 75;

// =============================================================================
// Layaway
// =============================================================================

/// True when the layaway machine allows `from → to`.
pub fn layaway_allows(from: CreditStatus, to: CreditStatus) -> bool {
    use CreditStatus::*;
    matches!(
        (from, to),
        (Pendiente, Pagado)
            | (Pendiente, Vencido)
            | (Pendiente, Cancelado)
            | (Vencido, Pagado)
            | (Vencido, Cancelado)
            | (Pagado, Entregado)
    )
}

/// Validates a layaway transition against its balance.
///
/// ## Errors
/// - `InvalidTransition` when the machine forbids the move
/// - `Invariant` when entering `pagado` with a balance left
pub fn check_layaway_transition(layaway: &Layaway, to: CreditStatus) -> CoreResult<()> {
    let from = layaway.credit_status;
    if !layaway_allows(from, to) {
        return Err(CoreError::InvalidTransition {
            entity: "apartado".to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    if to == CreditStatus::Pagado && layaway.amount_paid < layaway.total {
        return Err(CoreError::Invariant(format!(
            "apartado {} cannot be pagado with balance {}",
            layaway.id,
            layaway.balance()
        )));
    }
    Ok(())
}

// =============================================================================
// Order
// =============================================================================

/// True when the order machine allows `from → to`.
pub fn order_allows(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match from {
        Pendiente | Pedido | Pedidas | Recibido => {
            let forward = matches!(
                (from, to),
                (Pendiente, Pedido) | (Pedido, Pedidas) | (Pedidas, Recibido) | (Recibido, Entregado)
            );
            forward || matches!(to, Pagado | Cancelado | Vencido)
        }
        Pagado => matches!(to, Entregado | Cancelado),
        Vencido => matches!(to, Pagado | Cancelado),
        Entregado | Cancelado => false,
    }
}

/// Validates an order transition against its balance.
///
/// Contado orders are paid at creation; they only move to `entregado`
/// or `cancelado`.
///
/// ## Errors
/// - `InvalidTransition` when the machine forbids the move
/// - `Invariant` when entering `pagado` with `saldo_pendiente` left
pub fn check_order_transition(order: &Order, to: OrderStatus) -> CoreResult<()> {
    let from = order.estado;
    let contado_ok = order.kind != OrderKind::Contado
        || matches!(to, OrderStatus::Entregado | OrderStatus::Cancelado);
    if !order_allows(from, to) || !contado_ok {
        return Err(CoreError::InvalidTransition {
            entity: "pedido".to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    if to == OrderStatus::Pagado && order.saldo_pendiente.is_positive() {
        return Err(CoreError::Invariant(format!(
            "pedido {} cannot be pagado with saldo {}",
            order.id, order.saldo_pendiente
        )));
    }
    Ok(())
}

// =============================================================================
// Overdue Sweep
// =============================================================================

/// Age rule shared by layaways and apartado orders.
pub fn is_past_due(created_at: DateTime<Utc>, now: DateTime<Utc>, overdue_days: u32) -> bool {
    now - created_at > Duration::days(overdue_days as i64)
}

/// Layaway should be swept to `vencido`.
pub fn layaway_is_overdue(layaway: &Layaway, now: DateTime<Utc>, overdue_days: u32) -> bool {
    layaway.credit_status == CreditStatus::Pendiente
        && layaway.balance().is_positive()
        && is_past_due(layaway.created_at, now, overdue_days)
}

/// Order should be swept to `vencido`. Contado orders never are.
pub fn order_is_overdue(order: &Order, now: DateTime<Utc>, overdue_days: u32) -> bool {
    order.kind == OrderKind::Apartado
        && matches!(
            order.estado,
            OrderStatus::Pendiente | OrderStatus::Pedido | OrderStatus::Pedidas | OrderStatus::Recibido
        )
        && order.saldo_pendiente.is_positive()
        && is_past_due(order.created_at, now, overdue_days)
}
