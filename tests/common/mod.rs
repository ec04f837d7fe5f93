#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use stockroom::models::{
    Category, Direction, NewCategory, NewMovement, NewProduct, NewWarehouse, OutWithoutBalance,
    Product, StockMovement, Warehouse,
};
use stockroom::services;
use stockroom::store::{MemoryStore, Store};

pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub async fn product(store: &dyn Store, sku: &str, name: &str) -> Product {
    services::catalog::create_product(store, NewProduct::new(sku, name))
        .await
        .expect("create product")
}

pub async fn priced_product(
    store: &dyn Store,
    sku: &str,
    name: &str,
    cost: Decimal,
    reorder_point: Decimal,
    category_id: Option<i64>,
) -> Product {
    let mut new = NewProduct::new(sku, name);
    new.cost = cost;
    new.reorder_point = reorder_point;
    new.category_id = category_id;
    services::catalog::create_product(store, new)
        .await
        .expect("create product")
}

pub async fn category(store: &dyn Store, name: &str) -> Category {
    let new = NewCategory {
        name: name.to_string(),
        description: None,
    };
    services::catalog::create_category(store, new)
        .await
        .expect("create category")
}

pub async fn warehouse(store: &dyn Store, code: &str) -> Warehouse {
    let new = NewWarehouse {
        code: Some(code.to_string()),
        name: format!("Warehouse {code}"),
        location: None,
    };
    services::warehouses::create_warehouse(store, new)
        .await
        .expect("create warehouse")
}

pub async fn movement(
    store: &dyn Store,
    product_id: i64,
    warehouse_code: &str,
    direction: Direction,
    quantity: Decimal,
) -> StockMovement {
    services::ledger::record_movement(
        store,
        NewMovement::new(product_id, warehouse_code, direction, quantity),
        OutWithoutBalance::Ignore,
    )
    .await
    .expect("record movement")
}
