use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use super::{MemoryStore, Tables};
use crate::error::{StoreError, StoreResult};
use crate::models::inventory::{add_to_balance, plan_balance_effect, plan_corrections};
use crate::models::{
    BalanceChanges, BalanceEffect, Correction, InventoryBalance, MovementReceipt, NewBalance,
    NewMovement, OutWithoutBalance, StockMovement,
};
use crate::store::InventoryStore;

impl Tables {
    fn balance_id_for(&self, product_id: i64, warehouse_code: &str) -> Option<i64> {
        self.balances
            .values()
            .find(|b| b.product_id == product_id && b.warehouse_code == warehouse_code)
            .map(|b| b.id)
    }

    /// Opens a row that the ledger alone accounts for.
    fn open_balance(
        &mut self,
        product_id: i64,
        warehouse_code: &str,
        quantity: Decimal,
    ) -> InventoryBalance {
        let id = self.next_id();
        let balance = InventoryBalance {
            id,
            product_id,
            warehouse_code: warehouse_code.to_string(),
            quantity,
            reserved_quantity: Decimal::ZERO,
            opening_quantity: Decimal::ZERO,
            ledger_floor: None,
            updated_at: Utc::now(),
        };
        self.balances.insert(id, balance.clone());
        balance
    }

    fn newest_first<P>(&self, keep: P) -> Vec<StockMovement>
    where
        P: Fn(&StockMovement) -> bool,
    {
        self.movements
            .iter()
            .rev()
            .filter(|m| keep(m))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn balance(&self, id: i64) -> StoreResult<Option<InventoryBalance>> {
        let tables = self.tables.lock().await;
        Ok(tables.balances.get(&id).cloned())
    }

    async fn balance_for(
        &self,
        product_id: i64,
        warehouse_code: &str,
    ) -> StoreResult<Option<InventoryBalance>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .balance_id_for(product_id, warehouse_code)
            .and_then(|id| tables.balances.get(&id).cloned()))
    }

    async fn create_balance(&self, balance: NewBalance) -> StoreResult<InventoryBalance> {
        let mut tables = self.tables.lock().await;
        tables.require_product(balance.product_id)?;
        tables.require_warehouse(&balance.warehouse_code)?;
        if tables
            .balance_id_for(balance.product_id, &balance.warehouse_code)
            .is_some()
        {
            return Err(StoreError::ConstraintViolation(format!(
                "a balance for product {} at warehouse {} already exists",
                balance.product_id, balance.warehouse_code
            )));
        }
        let id = tables.next_id();
        let created = InventoryBalance {
            id,
            product_id: balance.product_id,
            warehouse_code: balance.warehouse_code,
            quantity: balance.quantity,
            reserved_quantity: balance.reserved_quantity,
            opening_quantity: balance.quantity,
            ledger_floor: Some(tables.movements.last().map_or(0, |m| m.id)),
            updated_at: Utc::now(),
        };
        tables.balances.insert(id, created.clone());
        Ok(created)
    }

    async fn update_balance(
        &self,
        id: i64,
        changes: BalanceChanges,
    ) -> StoreResult<Option<InventoryBalance>> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.balances.get_mut(&id) {
            Some(balance) => {
                changes.apply_to(balance);
                Some(balance.clone())
            }
            None => None,
        })
    }

    async fn delete_balance(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        Ok(tables.balances.remove(&id).is_some())
    }

    async fn balances_by_product(&self, product_id: i64) -> StoreResult<Vec<InventoryBalance>> {
        let tables = self.tables.lock().await;
        let mut balances: Vec<_> = tables
            .balances
            .values()
            .filter(|b| b.product_id == product_id)
            .cloned()
            .collect();
        balances.sort_by(|a, b| a.warehouse_code.cmp(&b.warehouse_code));
        Ok(balances)
    }

    async fn balances_by_warehouse(
        &self,
        warehouse_code: &str,
    ) -> StoreResult<Vec<InventoryBalance>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .balances
            .values()
            .filter(|b| b.warehouse_code == warehouse_code)
            .cloned()
            .collect())
    }

    async fn all_balances(&self) -> StoreResult<Vec<InventoryBalance>> {
        let tables = self.tables.lock().await;
        Ok(tables.balances.values().cloned().collect())
    }

    async fn record_movement(
        &self,
        movement: NewMovement,
        policy: OutWithoutBalance,
    ) -> StoreResult<MovementReceipt> {
        let mut tables = self.tables.lock().await;
        tables.require_product(movement.product_id)?;
        tables.require_warehouse(&movement.warehouse_code)?;

        let existing = tables.balance_id_for(movement.product_id, &movement.warehouse_code);
        let effect = plan_balance_effect(
            movement.direction,
            movement.quantity,
            existing.is_some(),
            policy,
        )?;
        let next_quantity = match (effect, existing) {
            (BalanceEffect::Adjust(delta), Some(balance_id)) => {
                match tables.balances.get(&balance_id) {
                    Some(balance) => Some(add_to_balance(balance.quantity, delta)?),
                    None => None,
                }
            }
            (BalanceEffect::Open(quantity), _) => Some(quantity),
            _ => None,
        };

        let id = tables.next_id();
        let entry = StockMovement {
            id,
            product_id: movement.product_id,
            warehouse_code: movement.warehouse_code,
            direction: movement.direction,
            quantity: movement.quantity,
            reference: movement.reference,
            note: movement.note,
            created_by: movement.created_by,
            created_at: Utc::now(),
        };
        tables.movements.push(entry.clone());

        let balance = match (next_quantity, existing) {
            (Some(quantity), Some(balance_id)) => match tables.balances.get_mut(&balance_id) {
                Some(balance) => {
                    balance.quantity = quantity;
                    balance.updated_at = entry.created_at;
                    Some(balance.clone())
                }
                None => None,
            },
            (Some(quantity), None) => {
                Some(tables.open_balance(entry.product_id, &entry.warehouse_code, quantity))
            }
            (None, _) => None,
        };

        Ok(MovementReceipt {
            movement: entry,
            balance,
        })
    }

    async fn movement(&self, id: i64) -> StoreResult<Option<StockMovement>> {
        let tables = self.tables.lock().await;
        Ok(tables.movements.iter().find(|m| m.id == id).cloned())
    }

    async fn movements_by_product(&self, product_id: i64) -> StoreResult<Vec<StockMovement>> {
        let tables = self.tables.lock().await;
        Ok(tables.newest_first(|m| m.product_id == product_id))
    }

    async fn movements_by_warehouse(
        &self,
        warehouse_code: &str,
    ) -> StoreResult<Vec<StockMovement>> {
        let tables = self.tables.lock().await;
        Ok(tables.newest_first(|m| m.warehouse_code == warehouse_code))
    }

    async fn recent_movements(&self, limit: i64) -> StoreResult<Vec<StockMovement>> {
        let tables = self.tables.lock().await;
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(tables.movements.iter().rev().take(limit).cloned().collect())
    }

    async fn reconcile_balances(
        &self,
        policy: OutWithoutBalance,
    ) -> StoreResult<Vec<Correction>> {
        let mut tables = self.tables.lock().await;
        let balances: Vec<InventoryBalance> = tables.balances.values().cloned().collect();
        let corrections = plan_corrections(&tables.movements, &balances, policy);

        let now = Utc::now();
        for correction in &corrections {
            match tables.balance_id_for(correction.product_id, &correction.warehouse_code) {
                Some(id) => {
                    if let Some(balance) = tables.balances.get_mut(&id) {
                        balance.quantity = correction.corrected;
                        balance.updated_at = now;
                    }
                }
                None => {
                    tables.open_balance(
                        correction.product_id,
                        &correction.warehouse_code,
                        correction.corrected,
                    );
                }
            }
        }
        Ok(corrections)
    }

    async fn ledger(&self) -> StoreResult<Vec<StockMovement>> {
        let tables = self.tables.lock().await;
        Ok(tables.movements.clone())
    }
}
