use async_trait::async_trait;
use chrono::Utc;

use super::{duplicate, search, MemoryStore};
use crate::error::StoreResult;
use crate::models::{NewWarehouse, Warehouse, WarehouseChanges};
use crate::store::WarehouseStore;

#[async_trait]
impl WarehouseStore for MemoryStore {
    async fn warehouse(&self, code: &str) -> StoreResult<Option<Warehouse>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .warehouses
            .get(code)
            .filter(|w| w.deleted_at.is_none())
            .cloned())
    }

    async fn warehouse_code_taken(&self, code: &str) -> StoreResult<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.warehouses.contains_key(code))
    }

    async fn create_warehouse(
        &self,
        code: &str,
        warehouse: NewWarehouse,
    ) -> StoreResult<Warehouse> {
        let mut tables = self.tables.lock().await;
        if tables.warehouses.contains_key(code) {
            return Err(duplicate("warehouse code", code));
        }
        let now = Utc::now();
        let created = Warehouse {
            code: code.to_string(),
            name: warehouse.name,
            location: warehouse.location,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.warehouses.insert(created.code.clone(), created.clone());
        Ok(created)
    }

    async fn update_warehouse(
        &self,
        code: &str,
        changes: WarehouseChanges,
    ) -> StoreResult<Option<Warehouse>> {
        let mut tables = self.tables.lock().await;
        let Some(warehouse) = tables
            .warehouses
            .get_mut(code)
            .filter(|w| w.deleted_at.is_none())
        else {
            return Ok(None);
        };
        changes.apply_to(warehouse);
        Ok(Some(warehouse.clone()))
    }

    async fn soft_delete_warehouse(&self, code: &str) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.warehouses.get_mut(code) {
            Some(warehouse) if warehouse.deleted_at.is_none() => {
                warehouse.deleted_at = Some(Utc::now());
                true
            }
            _ => false,
        })
    }

    async fn list_warehouses(&self) -> StoreResult<Vec<Warehouse>> {
        self.search_warehouses("").await
    }

    async fn search_warehouses(&self, query: &str) -> StoreResult<Vec<Warehouse>> {
        let tables = self.tables.lock().await;
        let mut warehouses = search(
            tables.warehouses.values().filter(|w| w.deleted_at.is_none()),
            query,
            Warehouse::matches,
        );
        warehouses.sort_by(|a, b| a.name.cmp(&b.name).then(a.code.cmp(&b.code)));
        Ok(warehouses)
    }
}
