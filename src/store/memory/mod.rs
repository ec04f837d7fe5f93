mod catalog;
mod inventory;
mod orders;
mod users;
mod warehouses;

use std::collections::BTreeMap;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Category, InventoryBalance, Order, OrderItem, Product, StockMovement, Unit, User, Warehouse,
};

/// In-process store. A single lock guards every table, so each trait call
/// is one serialised transaction.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct Tables {
    products: BTreeMap<i64, Product>,
    categories: BTreeMap<i64, Category>,
    units: BTreeMap<i64, Unit>,
    warehouses: BTreeMap<String, Warehouse>,
    balances: BTreeMap<i64, InventoryBalance>,
    movements: Vec<StockMovement>,
    orders: BTreeMap<i64, Order>,
    order_items: BTreeMap<i64, OrderItem>,
    users: BTreeMap<Uuid, User>,
    sequence: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn require_product(&self, id: i64) -> StoreResult<()> {
        if self.products.contains_key(&id) {
            Ok(())
        } else {
            Err(foreign_key("product", id))
        }
    }

    fn require_warehouse(&self, code: &str) -> StoreResult<()> {
        if self.warehouses.contains_key(code) {
            Ok(())
        } else {
            Err(foreign_key("warehouse", code))
        }
    }
}

fn foreign_key(entity: &str, key: impl std::fmt::Display) -> StoreError {
    StoreError::StorageFailure(format!("{entity} {key} does not exist"))
}

fn duplicate(what: &str, value: &str) -> StoreError {
    StoreError::ConstraintViolation(format!("{what} '{value}' already exists"))
}

/// Live rows matching the query, or every live row for a blank query.
fn search<'a, T, F>(rows: impl Iterator<Item = &'a T>, query: &str, matches: F) -> Vec<T>
where
    T: Clone + 'a,
    F: Fn(&T, &str) -> bool,
{
    let query = query.trim();
    rows.filter(|row| query.is_empty() || matches(row, query))
        .cloned()
        .collect()
}
