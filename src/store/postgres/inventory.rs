use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{push_changes, PgStore};
use crate::error::StoreResult;
use crate::models::inventory::{plan_balance_effect, plan_corrections};
use crate::models::{
    BalanceChanges, BalanceEffect, Correction, InventoryBalance, MovementReceipt, NewBalance,
    NewMovement, OutWithoutBalance, StockMovement,
};
use crate::store::InventoryStore;

#[async_trait]
impl InventoryStore for PgStore {
    async fn balance(&self, id: i64) -> StoreResult<Option<InventoryBalance>> {
        let balance =
            sqlx::query_as::<_, InventoryBalance>("SELECT * FROM inventory_balances WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(balance)
    }

    async fn balance_for(
        &self,
        product_id: i64,
        warehouse_code: &str,
    ) -> StoreResult<Option<InventoryBalance>> {
        let balance = sqlx::query_as::<_, InventoryBalance>(
            "SELECT * FROM inventory_balances WHERE product_id = $1 AND warehouse_code = $2",
        )
        .bind(product_id)
        .bind(warehouse_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(balance)
    }

    async fn create_balance(&self, balance: NewBalance) -> StoreResult<InventoryBalance> {
        let mut tx = self.pool.begin().await?;

        // Waits out in-flight movements so the floor splits the ledger cleanly.
        sqlx::query("LOCK TABLE inventory_balances IN EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let floor: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM stock_movements")
            .fetch_one(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, InventoryBalance>(
            r#"
            INSERT INTO inventory_balances (
                product_id, warehouse_code, quantity, reserved_quantity,
                opening_quantity, ledger_floor
            )
            VALUES ($1, $2, $3, $4, $3, $5)
            RETURNING *
            "#,
        )
        .bind(balance.product_id)
        .bind(&balance.warehouse_code)
        .bind(balance.quantity)
        .bind(balance.reserved_quantity)
        .bind(floor)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_balance(
        &self,
        id: i64,
        changes: BalanceChanges,
    ) -> StoreResult<Option<InventoryBalance>> {
        let mut builder =
            QueryBuilder::<Postgres>::new("UPDATE inventory_balances SET updated_at = NOW()");
        push_changes!(builder, changes, quantity, reserved_quantity);
        builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        let balance = builder
            .build_query_as::<InventoryBalance>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(balance)
    }

    async fn delete_balance(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM inventory_balances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn balances_by_product(&self, product_id: i64) -> StoreResult<Vec<InventoryBalance>> {
        let balances = sqlx::query_as::<_, InventoryBalance>(
            "SELECT * FROM inventory_balances WHERE product_id = $1 ORDER BY warehouse_code",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(balances)
    }

    async fn balances_by_warehouse(
        &self,
        warehouse_code: &str,
    ) -> StoreResult<Vec<InventoryBalance>> {
        let balances = sqlx::query_as::<_, InventoryBalance>(
            "SELECT * FROM inventory_balances WHERE warehouse_code = $1 ORDER BY id",
        )
        .bind(warehouse_code)
        .fetch_all(&self.pool)
        .await?;
        Ok(balances)
    }

    async fn all_balances(&self) -> StoreResult<Vec<InventoryBalance>> {
        let balances =
            sqlx::query_as::<_, InventoryBalance>("SELECT * FROM inventory_balances ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(balances)
    }

    async fn record_movement(
        &self,
        movement: NewMovement,
        policy: OutWithoutBalance,
    ) -> StoreResult<MovementReceipt> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent movements on the same pair.
        let existing = sqlx::query_as::<_, InventoryBalance>(
            r#"
            SELECT * FROM inventory_balances
            WHERE product_id = $1 AND warehouse_code = $2
            FOR UPDATE
            "#,
        )
        .bind(movement.product_id)
        .bind(&movement.warehouse_code)
        .fetch_optional(&mut *tx)
        .await?;

        let effect = plan_balance_effect(
            movement.direction,
            movement.quantity,
            existing.is_some(),
            policy,
        )?;

        let entry = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (
                product_id, warehouse_code, direction, quantity, reference, note, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(movement.product_id)
        .bind(&movement.warehouse_code)
        .bind(movement.direction.to_string())
        .bind(movement.quantity)
        .bind(&movement.reference)
        .bind(&movement.note)
        .bind(movement.created_by)
        .fetch_one(&mut *tx)
        .await?;

        let balance = match effect {
            BalanceEffect::Adjust(delta) => Some(
                sqlx::query_as::<_, InventoryBalance>(
                    r#"
                    UPDATE inventory_balances
                    SET quantity = quantity + $3, updated_at = NOW()
                    WHERE product_id = $1 AND warehouse_code = $2
                    RETURNING *
                    "#,
                )
                .bind(entry.product_id)
                .bind(&entry.warehouse_code)
                .bind(delta)
                .fetch_one(&mut *tx)
                .await?,
            ),
            BalanceEffect::Open(quantity) => Some(
                sqlx::query_as::<_, InventoryBalance>(
                    r#"
                    INSERT INTO inventory_balances (product_id, warehouse_code, quantity)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (product_id, warehouse_code)
                    DO UPDATE SET
                        quantity = inventory_balances.quantity + EXCLUDED.quantity,
                        updated_at = NOW()
                    RETURNING *
                    "#,
                )
                .bind(entry.product_id)
                .bind(&entry.warehouse_code)
                .bind(quantity)
                .fetch_one(&mut *tx)
                .await?,
            ),
            BalanceEffect::LedgerOnly => None,
        };

        tx.commit().await?;

        Ok(MovementReceipt {
            movement: entry,
            balance,
        })
    }

    async fn movement(&self, id: i64) -> StoreResult<Option<StockMovement>> {
        let movement =
            sqlx::query_as::<_, StockMovement>("SELECT * FROM stock_movements WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(movement)
    }

    async fn movements_by_product(&self, product_id: i64) -> StoreResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    async fn movements_by_warehouse(
        &self,
        warehouse_code: &str,
    ) -> StoreResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE warehouse_code = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(warehouse_code)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    async fn recent_movements(&self, limit: i64) -> StoreResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT * FROM stock_movements ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    async fn reconcile_balances(
        &self,
        policy: OutWithoutBalance,
    ) -> StoreResult<Vec<Correction>> {
        let mut tx = self.pool.begin().await?;

        // Conflicts with the ROW SHARE lock every movement takes through its
        // FOR UPDATE, so no movement runs between the read and the rewrite.
        sqlx::query("LOCK TABLE inventory_balances IN EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let ledger =
            sqlx::query_as::<_, StockMovement>("SELECT * FROM stock_movements ORDER BY id")
                .fetch_all(&mut *tx)
                .await?;
        let balances =
            sqlx::query_as::<_, InventoryBalance>("SELECT * FROM inventory_balances ORDER BY id")
                .fetch_all(&mut *tx)
                .await?;

        let corrections = plan_corrections(&ledger, &balances, policy);
        for correction in &corrections {
            sqlx::query(
                r#"
                INSERT INTO inventory_balances (product_id, warehouse_code, quantity)
                VALUES ($1, $2, $3)
                ON CONFLICT (product_id, warehouse_code)
                DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
                "#,
            )
            .bind(correction.product_id)
            .bind(&correction.warehouse_code)
            .bind(correction.corrected)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(corrections)
    }

    async fn ledger(&self) -> StoreResult<Vec<StockMovement>> {
        let movements =
            sqlx::query_as::<_, StockMovement>("SELECT * FROM stock_movements ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(movements)
    }
}
