//! Display rows for templates. Values are pre-formatted strings so the
//! templates stay free of formatting logic.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::StoreResult;
use crate::models::{Direction, InventoryBalance, Product, StockMovement, Warehouse};
use crate::store::{CatalogStore, Store, WarehouseStore};

use super::forms::Choice;

pub fn qty(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

pub fn timestamp(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

/// Names of live products and warehouses, for joining onto balances and
/// movements.
pub struct Lookup {
    pub products: HashMap<i64, Product>,
    pub warehouses: HashMap<String, Warehouse>,
}

impl Lookup {
    pub async fn load(store: &dyn Store) -> StoreResult<Self> {
        let products = store
            .list_products()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let warehouses = store
            .list_warehouses()
            .await?
            .into_iter()
            .map(|w| (w.code.clone(), w))
            .collect();
        Ok(Self {
            products,
            warehouses,
        })
    }

    fn product_label(&self, id: i64) -> (String, String) {
        match self.products.get(&id) {
            Some(p) => (p.name.clone(), p.sku.clone()),
            None => (format!("#{id} (deleted)"), String::new()),
        }
    }

    fn warehouse_label(&self, code: &str) -> String {
        match self.warehouses.get(code) {
            Some(w) => w.name.clone(),
            None => format!("{code} (deleted)"),
        }
    }

    pub fn product_choices(&self) -> Vec<Choice> {
        let mut products: Vec<&Product> = self.products.values().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        products
            .into_iter()
            .map(|p| Choice::new(p.id, format!("{} ({})", p.name, p.sku)))
            .collect()
    }

    pub fn warehouse_choices(&self) -> Vec<Choice> {
        let mut warehouses: Vec<&Warehouse> = self.warehouses.values().collect();
        warehouses.sort_by(|a, b| a.name.cmp(&b.name).then(a.code.cmp(&b.code)));
        warehouses
            .into_iter()
            .map(|w| Choice::new(&w.code, format!("{} ({})", w.name, w.code)))
            .collect()
    }

    pub fn balance_rows(&self, balances: Vec<InventoryBalance>) -> Vec<BalanceRow> {
        let mut rows: Vec<BalanceRow> = balances
            .into_iter()
            .map(|b| {
                let (product, sku) = self.product_label(b.product_id);
                let low = self
                    .products
                    .get(&b.product_id)
                    .is_some_and(|p| b.quantity <= p.reorder_point);
                BalanceRow {
                    id: b.id,
                    product_id: b.product_id,
                    product,
                    sku,
                    warehouse: self.warehouse_label(&b.warehouse_code),
                    warehouse_code: b.warehouse_code,
                    quantity: qty(b.quantity),
                    reserved: qty(b.reserved_quantity),
                    negative: b.quantity < Decimal::ZERO,
                    low,
                    updated_at: timestamp(b.updated_at),
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            a.product
                .cmp(&b.product)
                .then_with(|| a.warehouse_code.cmp(&b.warehouse_code))
        });
        rows
    }

    pub fn movement_rows(&self, movements: Vec<StockMovement>) -> Vec<MovementRow> {
        movements
            .into_iter()
            .map(|m| {
                let (product, sku) = self.product_label(m.product_id);
                MovementRow {
                    id: m.id,
                    created_at: timestamp(m.created_at),
                    product_id: m.product_id,
                    product,
                    sku,
                    warehouse: self.warehouse_label(&m.warehouse_code),
                    warehouse_code: m.warehouse_code,
                    direction: m.direction.to_string(),
                    is_in: m.direction == Direction::In,
                    quantity: qty(m.quantity),
                    reference: m.reference.unwrap_or_default(),
                    note: m.note.unwrap_or_default(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct BalanceRow {
    pub id: i64,
    pub product_id: i64,
    pub product: String,
    pub sku: String,
    pub warehouse_code: String,
    pub warehouse: String,
    pub quantity: String,
    pub reserved: String,
    pub negative: bool,
    pub low: bool,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct MovementRow {
    pub id: i64,
    pub created_at: String,
    pub product_id: i64,
    pub product: String,
    pub sku: String,
    pub warehouse_code: String,
    pub warehouse: String,
    pub direction: String,
    pub is_in: bool,
    pub quantity: String,
    pub reference: String,
    pub note: String,
}
