use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{like_pattern, push_changes, PgStore};
use crate::error::StoreResult;
use crate::models::{NewWarehouse, Warehouse, WarehouseChanges};
use crate::store::WarehouseStore;

#[async_trait]
impl WarehouseStore for PgStore {
    async fn warehouse(&self, code: &str) -> StoreResult<Option<Warehouse>> {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            "SELECT * FROM warehouses WHERE code = $1 AND deleted_at IS NULL",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(warehouse)
    }

    async fn warehouse_code_taken(&self, code: &str) -> StoreResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM warehouses WHERE code = $1)",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn create_warehouse(
        &self,
        code: &str,
        warehouse: NewWarehouse,
    ) -> StoreResult<Warehouse> {
        let created = sqlx::query_as::<_, Warehouse>(
            "INSERT INTO warehouses (code, name, location) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(code)
        .bind(&warehouse.name)
        .bind(&warehouse.location)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_warehouse(
        &self,
        code: &str,
        mut changes: WarehouseChanges,
    ) -> StoreResult<Option<Warehouse>> {
        changes.name = changes.name.map(|name| name.trim().to_string());

        let mut builder =
            QueryBuilder::<Postgres>::new("UPDATE warehouses SET updated_at = NOW()");
        push_changes!(builder, changes, name, location);
        builder
            .push(" WHERE code = ")
            .push_bind(code.to_string())
            .push(" AND deleted_at IS NULL RETURNING *");

        let warehouse = builder
            .build_query_as::<Warehouse>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(warehouse)
    }

    async fn soft_delete_warehouse(&self, code: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE warehouses SET deleted_at = NOW() WHERE code = $1 AND deleted_at IS NULL",
        )
        .bind(code)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_warehouses(&self) -> StoreResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            "SELECT * FROM warehouses WHERE deleted_at IS NULL ORDER BY name, code",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(warehouses)
    }

    async fn search_warehouses(&self, query: &str) -> StoreResult<Vec<Warehouse>> {
        if query.trim().is_empty() {
            return self.list_warehouses().await;
        }
        let warehouses = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT * FROM warehouses
            WHERE deleted_at IS NULL AND (name ILIKE $1 OR code ILIKE $1)
            ORDER BY name, code
            "#,
        )
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await?;
        Ok(warehouses)
    }
}
