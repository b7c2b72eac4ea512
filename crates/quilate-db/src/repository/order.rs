//! # Order Repository
//!
//! Pedidos (custom orders), their lines and their payments.
//!
//! ## Balance Columns
//! ```text
//! anticipo_pagado + saldo_pendiente = total      (checked on every write)
//!
//!   contado  → created paid in full, estado pagado
//!   apartado → anticipo at creation, saldo/total payments afterwards;
//!              the payment that zeroes saldo_pendiente moves it to pagado
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::folio::allocate_folio;
use crate::repository::status_history::record_state_transition;
use crate::repository::{insert_lines_in, lines_of, new_id, ts_parse, ts_parse_opt, ts_text, LineTable};
use quilate_core::folio::FolioKind;
use quilate_core::ledger::{LineItem, Order, OrderPayment};
use quilate_core::state::check_order_transition;
use quilate_core::{
    Actor, CoreError, EntityKind, Money, OrderKind, OrderPaymentKind, OrderStatus, PaymentMethod,
    StoreOffset, ValidationError,
};

pub(crate) const ORDER_COLUMNS: &str = "id, tenant_id, folio, producto_pedido_id, cliente_nombre, \
     cliente_telefono, cliente_email, cantidad, precio_unitario_cents, total_cents, \
     total_cost_cents, anticipo_pagado_cents, saldo_pendiente_cents, tipo_pedido, estado, \
     vendedor_id, user_id, created_at, status_changed_at";

pub(crate) const ORDER_PAYMENT_COLUMNS: &str =
    "id, pedido_id, amount_cents, metodo_pago, tipo_pago, user_id, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct OrderRow {
    pub id: String,
    tenant_id: String,
    folio: Option<String>,
    producto_pedido_id: Option<String>,
    cliente_nombre: Option<String>,
    cliente_telefono: Option<String>,
    cliente_email: Option<String>,
    cantidad: i64,
    precio_unitario_cents: i64,
    total_cents: i64,
    total_cost_cents: i64,
    anticipo_pagado_cents: i64,
    saldo_pendiente_cents: i64,
    tipo_pedido: OrderKind,
    estado: OrderStatus,
    vendedor_id: Option<String>,
    user_id: Option<String>,
    created_at: String,
    status_changed_at: Option<String>,
}

impl OrderRow {
    pub(crate) fn into_order(
        self,
        offset: StoreOffset,
        items: Vec<LineItem>,
        payments: Vec<OrderPayment>,
    ) -> DbResult<Order> {
        Ok(Order {
            created_at: ts_parse(&self.created_at, offset)?,
            status_changed_at: ts_parse_opt(self.status_changed_at.as_deref(), offset)?,
            id: self.id,
            tenant_id: self.tenant_id,
            folio: self.folio,
            producto_pedido_id: self.producto_pedido_id,
            cliente_nombre: self.cliente_nombre,
            cliente_telefono: self.cliente_telefono,
            cliente_email: self.cliente_email,
            cantidad: self.cantidad,
            precio_unitario: Money::from_cents(self.precio_unitario_cents),
            total: Money::from_cents(self.total_cents),
            total_cost: Money::from_cents(self.total_cost_cents),
            anticipo_pagado: Money::from_cents(self.anticipo_pagado_cents),
            saldo_pendiente: Money::from_cents(self.saldo_pendiente_cents),
            kind: self.tipo_pedido,
            estado: self.estado,
            vendedor_id: self.vendedor_id,
            user_id: self.user_id,
            items,
            payments,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct OrderPaymentRow {
    id: String,
    pub pedido_id: String,
    amount_cents: i64,
    metodo_pago: String,
    tipo_pago: OrderPaymentKind,
    user_id: Option<String>,
    created_at: String,
}

impl OrderPaymentRow {
    pub(crate) fn into_payment(self, offset: StoreOffset) -> DbResult<OrderPayment> {
        Ok(OrderPayment {
            created_at: ts_parse(&self.created_at, offset)?,
            id: self.id,
            pedido_id: self.pedido_id,
            amount: Money::from_cents(self.amount_cents),
            method: PaymentMethod::parse_lenient(&self.metodo_pago),
            kind: self.tipo_pago,
            user_id: self.user_id,
        })
    }
}

/// Input for a payment on an existing order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderPayment {
    pub amount: Money,
    pub method: PaymentMethod,
    /// `None` picks total when it settles the order, saldo otherwise.
    pub kind: Option<OrderPaymentKind>,
}

// =============================================================================
// Transaction-bound operations
// =============================================================================

async fn insert_payment_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    payment: &OrderPayment,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_payments (
            id, tenant_id, pedido_id, amount_cents, metodo_pago, tipo_pago, user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payment.id)
    .bind(tenant_id)
    .bind(&payment.pedido_id)
    .bind(payment.amount.cents())
    .bind(payment.method.as_str())
    .bind(payment.kind)
    .bind(&payment.user_id)
    .bind(ts_text(payment.created_at))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Writes a new order with its lines and initial payments.
///
/// `anticipo_pagado` and `saldo_pendiente` are derived from the payments
/// given. Orders do not touch stock until the pieces are received.
///
/// ## Errors
/// - `Domain(Invariant)` when the payments exceed the total, or a contado
///   order is not created pagado
pub async fn create_in(
    conn: &mut SqliteConnection,
    order: &Order,
    actor: &Actor,
    now: DateTime<Utc>,
) -> DbResult<Order> {
    let mut order = order.clone();
    let paid: Money = order.payments.iter().map(|p| p.amount).sum();
    if paid > order.total {
        return Err(CoreError::Invariant(format!(
            "pedido {}: payments {} exceed total {}",
            order.id, paid, order.total
        ))
        .into());
    }
    order.anticipo_pagado = paid;
    order.saldo_pendiente = order.total - paid;
    for payment in &mut order.payments {
        payment.pedido_id = order.id.clone();
    }
    order.check_invariants()?;

    if order.folio.is_none() {
        order.folio = Some(allocate_folio(conn, &order.tenant_id, FolioKind::Pedido).await?);
    }

    sqlx::query(
        r#"
        INSERT INTO pedidos (
            id, tenant_id, folio, producto_pedido_id, cliente_nombre, cliente_telefono,
            cliente_email, cantidad, precio_unitario_cents, total_cents, total_cost_cents,
            anticipo_pagado_cents, saldo_pendiente_cents, tipo_pedido, estado, vendedor_id,
            user_id, created_at, status_changed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
        "#,
    )
    .bind(&order.id)
    .bind(&order.tenant_id)
    .bind(&order.folio)
    .bind(&order.producto_pedido_id)
    .bind(&order.cliente_nombre)
    .bind(&order.cliente_telefono)
    .bind(&order.cliente_email)
    .bind(order.cantidad)
    .bind(order.precio_unitario.cents())
    .bind(order.total.cents())
    .bind(order.total_cost.cents())
    .bind(order.anticipo_pagado.cents())
    .bind(order.saldo_pendiente.cents())
    .bind(order.kind)
    .bind(order.estado)
    .bind(&order.vendedor_id)
    .bind(&order.user_id)
    .bind(ts_text(order.created_at))
    .bind(order.status_changed_at.map(ts_text))
    .execute(&mut *conn)
    .await?;

    insert_lines_in(conn, LineTable::Pedido, &order.id, &order.items).await?;
    for payment in &order.payments {
        insert_payment_in(conn, &order.tenant_id, payment).await?;
    }

    record_state_transition(
        conn,
        &order.tenant_id,
        EntityKind::Pedido,
        &order.id,
        None,
        order.estado.as_str(),
        actor,
        None,
        now,
    )
    .await?;

    info!(
        tenant_id = %order.tenant_id,
        folio = order.folio.as_deref().unwrap_or("-"),
        kind = ?order.kind,
        total = %order.total,
        saldo = %order.saldo_pendiente,
        "Order created"
    );
    Ok(order)
}

/// Loads an order with its lines and every payment.
pub async fn get_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    offset: StoreOffset,
) -> DbResult<Option<Order>> {
    let sql = format!("SELECT {} FROM pedidos WHERE id = ?1 AND tenant_id = ?2", ORDER_COLUMNS);
    let row: Option<OrderRow> = sqlx::query_as(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let items = lines_of(conn, LineTable::Pedido, &row.id).await?;
            let payments = payments_of(conn, tenant_id, &row.id, offset).await?;
            Ok(Some(row.into_order(offset, items, payments)?))
        }
        None => Ok(None),
    }
}

pub(crate) async fn payments_of(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    pedido_id: &str,
    offset: StoreOffset,
) -> DbResult<Vec<OrderPayment>> {
    let sql = format!(
        "SELECT {} FROM order_payments WHERE tenant_id = ?1 AND pedido_id = ?2 \
         ORDER BY created_at, id",
        ORDER_PAYMENT_COLUMNS
    );
    let rows: Vec<OrderPaymentRow> = sqlx::query_as(&sql)
        .bind(tenant_id)
        .bind(pedido_id)
        .fetch_all(&mut *conn)
        .await?;
    rows.into_iter().map(|r| r.into_payment(offset)).collect()
}

/// Moves an order to `to`, validating the machine and logging the change.
///
/// Stock effects of the move (reception) are the caller's concern.
#[allow(clippy::too_many_arguments)]
pub async fn set_status_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    offset: StoreOffset,
    to: OrderStatus,
    actor: &Actor,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<Order> {
    let mut order = get_in(conn, tenant_id, id, offset)
        .await?
        .ok_or_else(|| CoreError::not_found("pedido", id))?;
    check_order_transition(&order, to)?;

    let from = order.estado;
    sqlx::query(
        "UPDATE pedidos SET estado = ?3, status_changed_at = ?4 WHERE id = ?1 AND tenant_id = ?2",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(to)
    .bind(ts_text(now))
    .execute(&mut *conn)
    .await?;

    record_state_transition(
        conn,
        tenant_id,
        EntityKind::Pedido,
        id,
        Some(from.as_str()),
        to.as_str(),
        actor,
        notes,
        now,
    )
    .await?;

    order.estado = to;
    order.status_changed_at = Some(now);
    Ok(order)
}

/// Applies a payment to an apartado order that is not yet settled.
///
/// The payment that zeroes `saldo_pendiente` moves the order to pagado on
/// the same connection.
pub async fn add_payment_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    pedido_id: &str,
    offset: StoreOffset,
    payment: &NewOrderPayment,
    actor: &Actor,
    now: DateTime<Utc>,
) -> DbResult<Order> {
    if !payment.amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        }
        .into());
    }

    let mut order = get_in(conn, tenant_id, pedido_id, offset)
        .await?
        .ok_or_else(|| CoreError::not_found("pedido", pedido_id))?;

    let settled = matches!(
        order.estado,
        OrderStatus::Pagado | OrderStatus::Entregado | OrderStatus::Cancelado
    );
    if order.kind == OrderKind::Contado || settled {
        return Err(CoreError::InvalidTransition {
            entity: "pedido".to_string(),
            from: order.estado.to_string(),
            to: "abono".to_string(),
        }
        .into());
    }
    if payment.amount > order.saldo_pendiente {
        return Err(CoreError::Invariant(format!(
            "pedido {}: payment {} exceeds saldo {}",
            pedido_id, payment.amount, order.saldo_pendiente
        ))
        .into());
    }

    let settles = payment.amount == order.saldo_pendiente;
    let kind = payment.kind.unwrap_or(if settles && order.payments.is_empty() {
        OrderPaymentKind::Total
    } else {
        OrderPaymentKind::Saldo
    });
    let row = OrderPayment {
        id: new_id(),
        pedido_id: pedido_id.to_string(),
        amount: payment.amount,
        method: payment.method,
        kind,
        user_id: Some(actor.user_id.clone()),
        created_at: now,
    };
    insert_payment_in(conn, tenant_id, &row).await?;

    order.anticipo_pagado += payment.amount;
    order.saldo_pendiente -= payment.amount;
    sqlx::query(
        "UPDATE pedidos SET anticipo_pagado_cents = ?3, saldo_pendiente_cents = ?4 \
         WHERE id = ?1 AND tenant_id = ?2",
    )
    .bind(pedido_id)
    .bind(tenant_id)
    .bind(order.anticipo_pagado.cents())
    .bind(order.saldo_pendiente.cents())
    .execute(&mut *conn)
    .await?;
    order.payments.push(row);

    info!(
        tenant_id = %tenant_id,
        pedido_id = %pedido_id,
        amount = %payment.amount,
        kind = ?kind,
        saldo = %order.saldo_pendiente,
        "Order payment recorded"
    );

    if order.saldo_pendiente.is_zero() {
        let paid = set_status_in(
            conn,
            tenant_id,
            pedido_id,
            offset,
            OrderStatus::Pagado,
            actor,
            Some("saldo liquidado"),
            now,
        )
        .await?;
        order.estado = paid.estado;
        order.status_changed_at = paid.status_changed_at;
    }

    Ok(order)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    offset: StoreOffset,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository {
            pool,
            offset: StoreOffset::default(),
        }
    }

    /// Uses `offset` for naive timestamps.
    pub fn with_offset(mut self, offset: StoreOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Creates an order in its own transaction.
    pub async fn create(&self, order: &Order, actor: &Actor, now: DateTime<Utc>) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;
        let created = create_in(&mut tx, order, actor, now).await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, tenant_id, id, self.offset).await
    }

    /// Records a payment in its own transaction.
    pub async fn add_payment(
        &self,
        tenant_id: &str,
        pedido_id: &str,
        payment: &NewOrderPayment,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;
        let order =
            add_payment_in(&mut tx, tenant_id, pedido_id, self.offset, payment, actor, now).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(order)
    }

    /// Apartado orders still collecting (pendiente through recibido), oldest first.
    pub async fn list_pending(&self, tenant_id: &str) -> DbResult<Vec<Order>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM pedidos WHERE tenant_id = ?1 \
             AND estado IN ('pendiente', 'pedido', 'pedidas', 'recibido') \
             AND tipo_pedido = 'apartado' ORDER BY created_at, id",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(o) = get_in(&mut conn, tenant_id, &id, self.offset).await? {
                orders.push(o);
            }
        }
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, order, setup};
    use quilate_core::ErrorKind;

    fn saldo(pesos: i64) -> NewOrderPayment {
        NewOrderPayment {
            amount: Money::from_pesos(pesos),
            method: PaymentMethod::Tarjeta,
            kind: None,
        }
    }

    #[tokio::test]
    async fn test_create_derives_balance_columns() {
        let (db, tenant) = setup().await;
        let created = db
            .orders()
            .create(&order(&tenant, OrderKind::Apartado, 2_000, &[500]), &Actor::new("u1"), at(1, 18))
            .await
            .unwrap();

        assert_eq!(created.folio.as_deref(), Some("PED-000001"));
        assert_eq!(created.anticipo_pagado, Money::from_pesos(500));
        assert_eq!(created.saldo_pendiente, Money::from_pesos(1_500));

        let stored = db.orders().get(&tenant, &created.id).await.unwrap().unwrap();
        assert_eq!(stored.payments[0].kind, OrderPaymentKind::Anticipo);
        assert_eq!(stored.estado, OrderStatus::Pendiente);
    }

    #[tokio::test]
    async fn test_saldo_payment_settles_order() {
        let (db, tenant) = setup().await;
        let actor = Actor::new("u1");
        let o = db
            .orders()
            .create(&order(&tenant, OrderKind::Apartado, 2_000, &[500]), &actor, at(1, 18))
            .await
            .unwrap();

        let o = db.orders().add_payment(&tenant, &o.id, &saldo(500), &actor, at(3, 18)).await.unwrap();
        assert_eq!(o.estado, OrderStatus::Pendiente);

        let o = db.orders().add_payment(&tenant, &o.id, &saldo(1_000), &actor, at(6, 18)).await.unwrap();
        assert_eq!(o.estado, OrderStatus::Pagado);
        assert!(o.saldo_pendiente.is_zero());
        assert_eq!(o.liquidating_payment().map(|p| p.created_at), Some(at(6, 18)));
    }

    #[tokio::test]
    async fn test_contado_order_takes_no_payments() {
        let (db, tenant) = setup().await;
        let actor = Actor::new("u1");
        let o = db
            .orders()
            .create(&order(&tenant, OrderKind::Contado, 1_000, &[1_000]), &actor, at(1, 18))
            .await
            .unwrap();

        let err = db.orders().add_payment(&tenant, &o.id, &saldo(10), &actor, at(2, 18)).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Conflict));
    }

    #[tokio::test]
    async fn test_paid_order_cannot_reopen() {
        let (db, tenant) = setup().await;
        let actor = Actor::new("u1");
        let o = db
            .orders()
            .create(&order(&tenant, OrderKind::Apartado, 1_000, &[200]), &actor, at(1, 18))
            .await
            .unwrap();
        db.orders().add_payment(&tenant, &o.id, &saldo(800), &actor, at(2, 18)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let offset = StoreOffset::default();
        for to in [OrderStatus::Pendiente, OrderStatus::Vencido] {
            let err = set_status_in(&mut conn, &tenant, &o.id, offset, to, &actor, None, at(3, 18))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), Some(ErrorKind::Conflict));
        }
    }
}
