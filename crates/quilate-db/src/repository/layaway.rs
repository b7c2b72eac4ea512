//! # Layaway Repository
//!
//! Apartados, their lines and their credit payments.
//!
//! ## Balance Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  amount_paid = Σ credit_payments.amount         (kept on every write)   │
//! │  amount_paid ≤ total                            (CHECK + Invariant)     │
//! │                                                                         │
//! │  add_payment:                                                           │
//! │    pendiente / vencido ──► payment row + amount_paid += amount          │
//! │                       └──► amount_paid == total ? → pagado              │
//! │                            (status_history row on the same tx)          │
//! │    pagado / entregado / cancelado ──► Conflict                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::folio::allocate_folio;
use crate::repository::inventory::{record_movement_in, NewMovement};
use crate::repository::status_history::record_state_transition;
use crate::repository::{insert_lines_in, lines_of, new_id, ts_parse, ts_parse_opt, ts_text, LineTable};
use quilate_core::folio::FolioKind;
use quilate_core::ledger::{CreditPayment, Layaway, LineItem};
use quilate_core::state::check_layaway_transition;
use quilate_core::{
    Actor, CoreError, CreditPaymentKind, CreditStatus, EntityKind, Money, MovementReason,
    MovementType, PaymentMethod, StoreOffset, ValidationError,
};

pub(crate) const LAYAWAY_COLUMNS: &str = "id, tenant_id, folio, subtotal_cents, discount_cents, \
     vip_discount_cents, tax_cents, total_cents, total_cost_cents, amount_paid_cents, \
     credit_status, customer_name, customer_phone, vendedor_id, user_id, created_at, \
     status_changed_at";

pub(crate) const CREDIT_PAYMENT_COLUMNS: &str =
    "id, apartado_id, amount_cents, payment_method, payment_kind, user_id, notes, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct LayawayRow {
    pub id: String,
    tenant_id: String,
    folio: Option<String>,
    subtotal_cents: i64,
    discount_cents: i64,
    vip_discount_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    total_cost_cents: i64,
    amount_paid_cents: i64,
    credit_status: CreditStatus,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    vendedor_id: Option<String>,
    user_id: Option<String>,
    created_at: String,
    status_changed_at: Option<String>,
}

impl LayawayRow {
    pub(crate) fn into_layaway(
        self,
        offset: StoreOffset,
        items: Vec<LineItem>,
        payments: Vec<CreditPayment>,
    ) -> DbResult<Layaway> {
        Ok(Layaway {
            created_at: ts_parse(&self.created_at, offset)?,
            status_changed_at: ts_parse_opt(self.status_changed_at.as_deref(), offset)?,
            id: self.id,
            tenant_id: self.tenant_id,
            folio: self.folio,
            subtotal: Money::from_cents(self.subtotal_cents),
            discount: Money::from_cents(self.discount_cents),
            vip_discount: Money::from_cents(self.vip_discount_cents),
            tax: Money::from_cents(self.tax_cents),
            total: Money::from_cents(self.total_cents),
            total_cost: Money::from_cents(self.total_cost_cents),
            amount_paid: Money::from_cents(self.amount_paid_cents),
            credit_status: self.credit_status,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            vendedor_id: self.vendedor_id,
            user_id: self.user_id,
            items,
            payments,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CreditPaymentRow {
    id: String,
    pub apartado_id: String,
    amount_cents: i64,
    payment_method: String,
    payment_kind: Option<CreditPaymentKind>,
    user_id: Option<String>,
    notes: Option<String>,
    created_at: String,
}

impl CreditPaymentRow {
    pub(crate) fn into_payment(self, offset: StoreOffset) -> DbResult<CreditPayment> {
        Ok(CreditPayment {
            created_at: ts_parse(&self.created_at, offset)?,
            kind: CreditPaymentKind::resolve(self.payment_kind, self.notes.as_deref()),
            id: self.id,
            apartado_id: self.apartado_id,
            amount: Money::from_cents(self.amount_cents),
            method: PaymentMethod::parse_lenient(&self.payment_method),
            user_id: self.user_id,
            notes: self.notes,
        })
    }
}

/// Input for a payment on an existing layaway.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCreditPayment {
    pub amount: Money,
    pub method: PaymentMethod,
    /// `None` picks anticipo for the first payment and abono afterwards.
    pub kind: Option<CreditPaymentKind>,
    pub notes: Option<String>,
}

// =============================================================================
// Transaction-bound operations
// =============================================================================

async fn insert_payment_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    payment: &CreditPayment,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO credit_payments (
            id, tenant_id, apartado_id, amount_cents, payment_method, payment_kind,
            user_id, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&payment.id)
    .bind(tenant_id)
    .bind(&payment.apartado_id)
    .bind(payment.amount.cents())
    .bind(payment.method.as_str())
    .bind(payment.kind)
    .bind(&payment.user_id)
    .bind(&payment.notes)
    .bind(ts_text(payment.created_at))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Writes a new layaway with its lines, initial payments and stock effect.
///
/// `amount_paid` is derived from the payments given. A folio is allocated
/// when the layaway has none. The creation is logged in the status history.
///
/// ## Errors
/// - `Domain(Invariant)` when the payments exceed the total
/// - `Domain(InsufficientStock)` when a line exceeds the stock on hand
pub async fn create_in(
    conn: &mut SqliteConnection,
    layaway: &Layaway,
    actor: &Actor,
    now: DateTime<Utc>,
) -> DbResult<Layaway> {
    let mut layaway = layaway.clone();
    layaway.amount_paid = layaway.payments.iter().map(|p| p.amount).sum();
    for payment in &mut layaway.payments {
        payment.apartado_id = layaway.id.clone();
    }
    layaway.check_invariants()?;

    if layaway.folio.is_none() {
        layaway.folio = Some(allocate_folio(conn, &layaway.tenant_id, FolioKind::Apartado).await?);
    }

    sqlx::query(
        r#"
        INSERT INTO apartados (
            id, tenant_id, folio, subtotal_cents, discount_cents, vip_discount_cents, tax_cents,
            total_cents, total_cost_cents, amount_paid_cents, credit_status, customer_name,
            customer_phone, vendedor_id, user_id, created_at, status_changed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        "#,
    )
    .bind(&layaway.id)
    .bind(&layaway.tenant_id)
    .bind(&layaway.folio)
    .bind(layaway.subtotal.cents())
    .bind(layaway.discount.cents())
    .bind(layaway.vip_discount.cents())
    .bind(layaway.tax.cents())
    .bind(layaway.total.cents())
    .bind(layaway.total_cost.cents())
    .bind(layaway.amount_paid.cents())
    .bind(layaway.credit_status)
    .bind(&layaway.customer_name)
    .bind(&layaway.customer_phone)
    .bind(&layaway.vendedor_id)
    .bind(&layaway.user_id)
    .bind(ts_text(layaway.created_at))
    .bind(layaway.status_changed_at.map(ts_text))
    .execute(&mut *conn)
    .await?;

    insert_lines_in(conn, LineTable::Apartado, &layaway.id, &layaway.items).await?;
    for payment in &layaway.payments {
        insert_payment_in(conn, &layaway.tenant_id, payment).await?;
    }

    // the pieces leave the display case as salidas so the stock replay sees them
    let label = layaway.folio.clone().unwrap_or_else(|| layaway.id.clone());
    for line in layaway.items.iter().filter(|l| l.quantity > 0) {
        let Some(product_id) = &line.product_id else {
            continue;
        };
        let reservation = NewMovement {
            product_id: product_id.clone(),
            movement_type: MovementType::Salida,
            quantity: line.quantity,
            cost: Some(line.unit_cost),
            reason: MovementReason::Apartado,
            notes: Some(format!("apartado {}", label)),
            user_id: Some(actor.user_id.clone()),
        };
        record_movement_in(conn, &layaway.tenant_id, &reservation, now).await?;
    }

    record_state_transition(
        conn,
        &layaway.tenant_id,
        EntityKind::Apartado,
        &layaway.id,
        None,
        layaway.credit_status.as_str(),
        actor,
        None,
        now,
    )
    .await?;

    info!(
        tenant_id = %layaway.tenant_id,
        folio = layaway.folio.as_deref().unwrap_or("-"),
        total = %layaway.total,
        amount_paid = %layaway.amount_paid,
        "Layaway created"
    );
    Ok(layaway)
}

/// Loads a layaway with its lines and every payment.
pub async fn get_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    offset: StoreOffset,
) -> DbResult<Option<Layaway>> {
    let sql = format!("SELECT {} FROM apartados WHERE id = ?1 AND tenant_id = ?2", LAYAWAY_COLUMNS);
    let row: Option<LayawayRow> = sqlx::query_as(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let items = lines_of(conn, LineTable::Apartado, &row.id).await?;
            let payments = payments_of(conn, tenant_id, &row.id, offset).await?;
            Ok(Some(row.into_layaway(offset, items, payments)?))
        }
        None => Ok(None),
    }
}

pub(crate) async fn payments_of(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    apartado_id: &str,
    offset: StoreOffset,
) -> DbResult<Vec<CreditPayment>> {
    let sql = format!(
        "SELECT {} FROM credit_payments WHERE tenant_id = ?1 AND apartado_id = ?2 \
         ORDER BY created_at, id",
        CREDIT_PAYMENT_COLUMNS
    );
    let rows: Vec<CreditPaymentRow> = sqlx::query_as(&sql)
        .bind(tenant_id)
        .bind(apartado_id)
        .fetch_all(&mut *conn)
        .await?;
    rows.into_iter().map(|r| r.into_payment(offset)).collect()
}

/// Moves a layaway to `to`, validating the machine and logging the change.
///
/// ## Errors
/// - `Domain(NotFound)` for an unknown id
/// - `Domain(InvalidTransition)` when the machine forbids the move
/// - `Domain(Invariant)` when entering pagado with a balance left
#[allow(clippy::too_many_arguments)]
pub async fn set_status_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    offset: StoreOffset,
    to: CreditStatus,
    actor: &Actor,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<Layaway> {
    let mut layaway = get_in(conn, tenant_id, id, offset)
        .await?
        .ok_or_else(|| CoreError::not_found("apartado", id))?;
    check_layaway_transition(&layaway, to)?;

    let from = layaway.credit_status;
    sqlx::query(
        "UPDATE apartados SET credit_status = ?3, status_changed_at = ?4 \
         WHERE id = ?1 AND tenant_id = ?2",
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
        EntityKind::Apartado,
        id,
        Some(from.as_str()),
        to.as_str(),
        actor,
        notes,
        now,
    )
    .await?;

    layaway.credit_status = to;
    layaway.status_changed_at = Some(now);
    Ok(layaway)
}

/// Applies a payment to an open layaway.
///
/// The payment that completes the balance also moves the layaway to
/// pagado on the same connection.
///
/// ## Errors
/// - `Domain(Validation)` for a non-positive amount
/// - `Domain(InvalidTransition)` when the layaway is not pendiente/vencido
/// - `Domain(Invariant)` when the payment exceeds the balance
pub async fn add_payment_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    apartado_id: &str,
    offset: StoreOffset,
    payment: &NewCreditPayment,
    actor: &Actor,
    now: DateTime<Utc>,
) -> DbResult<Layaway> {
    if !payment.amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        }
        .into());
    }

    let mut layaway = get_in(conn, tenant_id, apartado_id, offset)
        .await?
        .ok_or_else(|| CoreError::not_found("apartado", apartado_id))?;

    if !layaway.credit_status.is_open() {
        return Err(CoreError::InvalidTransition {
            entity: "apartado".to_string(),
            from: layaway.credit_status.to_string(),
            to: "abono".to_string(),
        }
        .into());
    }
    if payment.amount > layaway.balance() {
        return Err(CoreError::Invariant(format!(
            "apartado {}: payment {} exceeds balance {}",
            apartado_id,
            payment.amount,
            layaway.balance()
        ))
        .into());
    }

    let kind = payment.kind.unwrap_or(if layaway.payments.is_empty() {
        CreditPaymentKind::Anticipo
    } else {
        CreditPaymentKind::Abono
    });
    let row = CreditPayment {
        id: new_id(),
        apartado_id: apartado_id.to_string(),
        amount: payment.amount,
        method: payment.method,
        kind,
        user_id: Some(actor.user_id.clone()),
        notes: payment.notes.clone(),
        created_at: now,
    };
    insert_payment_in(conn, tenant_id, &row).await?;

    layaway.amount_paid += payment.amount;
    sqlx::query("UPDATE apartados SET amount_paid_cents = ?3 WHERE id = ?1 AND tenant_id = ?2")
        .bind(apartado_id)
        .bind(tenant_id)
        .bind(layaway.amount_paid.cents())
        .execute(&mut *conn)
        .await?;
    layaway.payments.push(row);

    info!(
        tenant_id = %tenant_id,
        apartado_id = %apartado_id,
        amount = %payment.amount,
        method = %payment.method,
        balance = %layaway.balance(),
        "Layaway payment recorded"
    );

    if layaway.balance().is_zero() {
        let paid = set_status_in(
            conn,
            tenant_id,
            apartado_id,
            offset,
            CreditStatus::Pagado,
            actor,
            Some("saldo liquidado"),
            now,
        )
        .await?;
        layaway.credit_status = paid.credit_status;
        layaway.status_changed_at = paid.status_changed_at;
    }

    Ok(layaway)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for layaways.
#[derive(Debug, Clone)]
pub struct LayawayRepository {
    pool: SqlitePool,
    offset: StoreOffset,
}

impl LayawayRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LayawayRepository {
            pool,
            offset: StoreOffset::default(),
        }
    }

    /// Uses `offset` for naive timestamps.
    pub fn with_offset(mut self, offset: StoreOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Creates a layaway in its own transaction.
    pub async fn create(&self, layaway: &Layaway, actor: &Actor, now: DateTime<Utc>) -> DbResult<Layaway> {
        let mut tx = self.pool.begin().await?;
        let created = create_in(&mut tx, layaway, actor, now).await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Layaway>> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, tenant_id, id, self.offset).await
    }

    /// Records a payment in its own transaction.
    pub async fn add_payment(
        &self,
        tenant_id: &str,
        apartado_id: &str,
        payment: &NewCreditPayment,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> DbResult<Layaway> {
        let mut tx = self.pool.begin().await?;
        let layaway =
            add_payment_in(&mut tx, tenant_id, apartado_id, self.offset, payment, actor, now).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(layaway)
    }

    /// Open layaways (pendiente) of a tenant, oldest first.
    pub async fn list_pending(&self, tenant_id: &str) -> DbResult<Vec<Layaway>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM apartados WHERE tenant_id = ?1 AND credit_status = 'pendiente' \
             ORDER BY created_at, id",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        let mut layaways = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(l) = get_in(&mut conn, tenant_id, &id, self.offset).await? {
                layaways.push(l);
            }
        }
        Ok(layaways)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, layaway, product, setup};
    use crate::repository::status_history::StatusChange;
    use quilate_core::ErrorKind;

    fn abono(pesos: i64) -> NewCreditPayment {
        NewCreditPayment {
            amount: Money::from_pesos(pesos),
            method: PaymentMethod::Efectivo,
            kind: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_allocates_folio_and_reserves_stock() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 2)).await.unwrap();

        let created = db
            .layaways()
            .create(&layaway(&tenant, &p, 1_000, &[300]), &Actor::new("u1"), at(1, 18))
            .await
            .unwrap();
        assert_eq!(created.folio.as_deref(), Some("AP-000001"));
        assert_eq!(created.amount_paid, Money::from_pesos(300));

        let stored = db.layaways().get(&tenant, &created.id).await.unwrap().unwrap();
        assert_eq!(stored.payments.len(), 1);
        assert_eq!(stored.payments[0].kind, CreditPaymentKind::Anticipo);
        assert_eq!(stored.items.len(), 1);

        let p = db.products().get_by_id(&tenant, &p.id).await.unwrap().unwrap();
        assert_eq!(p.stock, 1);

        let movements = db.inventory().list_for_product(&tenant, &p.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Salida);
        assert_eq!(movements[0].reason, MovementReason::Apartado);
        assert_eq!(movements[0].notes.as_deref(), Some("apartado AP-000001"));
    }

    #[tokio::test]
    async fn test_final_payment_liquidates() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 2)).await.unwrap();
        let actor = Actor::new("u1");
        let l = db
            .layaways()
            .create(&layaway(&tenant, &p, 1_000, &[300]), &actor, at(1, 18))
            .await
            .unwrap();

        let after = db.layaways().add_payment(&tenant, &l.id, &abono(200), &actor, at(4, 18)).await.unwrap();
        assert_eq!(after.credit_status, CreditStatus::Pendiente);
        assert_eq!(after.payments[1].kind, CreditPaymentKind::Abono);

        let paid = db.layaways().add_payment(&tenant, &l.id, &abono(500), &actor, at(8, 18)).await.unwrap();
        assert_eq!(paid.credit_status, CreditStatus::Pagado);
        assert_eq!(paid.status_changed_at, Some(at(8, 18)));
        assert!(paid.balance().is_zero());

        let history: Vec<StatusChange> = db
            .status_history()
            .list_for(&tenant, EntityKind::Apartado, &l.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].old_status.as_deref(), Some("pendiente"));
        assert_eq!(history[1].new_status, "pagado");
    }

    #[tokio::test]
    async fn test_overpayment_is_rejected() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 2)).await.unwrap();
        let actor = Actor::new("u1");
        let l = db
            .layaways()
            .create(&layaway(&tenant, &p, 1_000, &[300]), &actor, at(1, 18))
            .await
            .unwrap();

        let err = db.layaways().add_payment(&tenant, &l.id, &abono(701), &actor, at(2, 18)).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Invariant));

        let stored = db.layaways().get(&tenant, &l.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_paid, Money::from_pesos(300));
        assert_eq!(stored.payments.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_layaway_takes_no_payments() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 2)).await.unwrap();
        let actor = Actor::new("u1");
        let l = db
            .layaways()
            .create(&layaway(&tenant, &p, 1_000, &[300]), &actor, at(1, 18))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let offset = StoreOffset::default();
        set_status_in(&mut conn, &tenant, &l.id, offset, CreditStatus::Cancelado, &actor, None, at(2, 18))
            .await
            .unwrap();
        drop(conn);

        let err = db.layaways().add_payment(&tenant, &l.id, &abono(100), &actor, at(3, 18)).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Conflict));
    }
}
