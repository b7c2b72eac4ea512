//! # Inventory Repository
//!
//! Stock movements (entradas / salidas). Recording a movement and changing
//! the product's stock happen on one connection so they cannot drift apart.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::repository::{new_id, product, ts_parse, ts_text};
use quilate_core::inventory::InventoryMovement;
use quilate_core::validation::validate_movement_quantity;
use quilate_core::{Money, MovementReason, MovementType, StoreOffset};

/// Input for a new stock movement.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub product_id: String,
    pub movement_type: MovementType,
    /// Always positive; the direction is `movement_type`.
    pub quantity: i64,
    pub cost: Option<Money>,
    pub reason: MovementReason,
    pub notes: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, FromRow)]
pub(crate) struct MovementRow {
    id: String,
    tenant_id: String,
    product_id: String,
    movement_type: MovementType,
    quantity: i64,
    cost_cents: Option<i64>,
    reason: Option<MovementReason>,
    notes: Option<String>,
    user_id: Option<String>,
    created_at: String,
}

pub(crate) const MOVEMENT_COLUMNS: &str =
    "id, tenant_id, product_id, movement_type, quantity, cost_cents, reason, notes, user_id, created_at";

impl MovementRow {
    pub(crate) fn into_movement(self, offset: StoreOffset) -> DbResult<InventoryMovement> {
        Ok(InventoryMovement {
            created_at: ts_parse(&self.created_at, offset)?,
            reason: MovementReason::resolve(self.reason, self.notes.as_deref()),
            id: self.id,
            tenant_id: self.tenant_id,
            product_id: self.product_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            cost: self.cost_cents.map(Money::from_cents),
            notes: self.notes,
            user_id: self.user_id,
        })
    }
}

/// Records a movement and applies it to the product's stock.
///
/// ## Errors
/// - `Domain(Validation)` when the quantity is not positive
/// - `NotFound` when the product does not exist for the tenant
/// - `Domain(InsufficientStock)` when a salida exceeds the stock on hand
pub async fn record_movement_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    movement: &NewMovement,
    now: DateTime<Utc>,
) -> DbResult<InventoryMovement> {
    validate_movement_quantity(movement.quantity)?;

    let delta = movement.movement_type.sign() * movement.quantity;
    let new_stock =
        product::apply_stock_delta_in(conn, tenant_id, &movement.product_id, delta, now).await?;

    let id = new_id();
    sqlx::query(
        r#"
        INSERT INTO inventory_movements (
            id, tenant_id, product_id, movement_type, quantity, cost_cents,
            reason, notes, user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&id)
    .bind(tenant_id)
    .bind(&movement.product_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(movement.cost.map(|c| c.cents()))
    .bind(movement.reason)
    .bind(&movement.notes)
    .bind(&movement.user_id)
    .bind(ts_text(now))
    .execute(&mut *conn)
    .await?;

    info!(
        tenant_id = %tenant_id,
        product_id = %movement.product_id,
        movement_type = ?movement.movement_type,
        quantity = movement.quantity,
        new_stock,
        "Inventory movement recorded"
    );

    Ok(InventoryMovement {
        id,
        tenant_id: tenant_id.to_string(),
        product_id: movement.product_id.clone(),
        movement_type: movement.movement_type,
        quantity: movement.quantity,
        cost: movement.cost,
        reason: movement.reason,
        notes: movement.notes.clone(),
        user_id: movement.user_id.clone(),
        created_at: now,
    })
}

/// Repository for inventory movements.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
    offset: StoreOffset,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository {
            pool,
            offset: StoreOffset::default(),
        }
    }

    /// Uses `offset` for naive timestamps.
    pub fn with_offset(mut self, offset: StoreOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Records a movement in its own transaction.
    pub async fn record(
        &self,
        tenant_id: &str,
        movement: &NewMovement,
        now: DateTime<Utc>,
    ) -> DbResult<InventoryMovement> {
        let mut tx = self.pool.begin().await?;
        let recorded = record_movement_in(&mut tx, tenant_id, movement, now).await?;
        tx.commit().await?;
        Ok(recorded)
    }

    /// Movements of one product, newest first.
    pub async fn list_for_product(
        &self,
        tenant_id: &str,
        product_id: &str,
    ) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!(
            "SELECT {} FROM inventory_movements WHERE tenant_id = ?1 AND product_id = ?2 \
             ORDER BY created_at DESC, id DESC",
            MOVEMENT_COLUMNS
        );
        let rows: Vec<MovementRow> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| r.into_movement(self.offset))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, product, setup};
    use crate::DbError;
    use quilate_core::{CoreError, ErrorKind};

    fn salida(product_id: &str, quantity: i64) -> NewMovement {
        NewMovement {
            product_id: product_id.to_string(),
            movement_type: MovementType::Salida,
            quantity,
            cost: None,
            reason: MovementReason::AjusteManual,
            notes: None,
            user_id: Some("u-admin".to_string()),
        }
    }

    #[tokio::test]
    async fn test_movement_updates_stock() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 4)).await.unwrap();

        let entrada = NewMovement {
            movement_type: MovementType::Entrada,
            reason: MovementReason::Otro,
            cost: Some(Money::from_pesos(800)),
            ..salida(&p.id, 3)
        };
        db.inventory().record(&tenant, &entrada, at(5, 10)).await.unwrap();
        db.inventory().record(&tenant, &salida(&p.id, 2), at(5, 11)).await.unwrap();

        let stored = db.products().get_by_id(&tenant, &p.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 5);

        let movements = db.inventory().list_for_product(&tenant, &p.id).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].movement_type, MovementType::Salida);
        assert_eq!(movements[1].cost, Some(Money::from_pesos(800)));
    }

    #[tokio::test]
    async fn test_salida_beyond_stock_is_rejected() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 1)).await.unwrap();

        let err = db.inventory().record(&tenant, &salida(&p.id, 2), at(5, 10)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 1, requested: 2, .. })
        ));

        // nothing was written
        let stored = db.products().get_by_id(&tenant, &p.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 1);
        assert!(db.inventory().list_for_product(&tenant, &p.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_is_bad_input() {
        let (db, tenant) = setup().await;
        let p = db.products().insert(&product(&tenant, "AN-001", 1)).await.unwrap();

        let err = db.inventory().record(&tenant, &salida(&p.id, 0), at(5, 10)).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::BadInput));
    }
}
