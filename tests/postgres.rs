//! Runs against a real database. Set `DATABASE_URL` and use
//! `cargo test -- --ignored`.

use std::sync::Arc;

use rust_decimal_macros::dec;
use stockroom::database::{create_database_pool, run_migrations};
use stockroom::error::StoreError;
use stockroom::models::inventory::max_quantity;
use stockroom::models::{
    Direction, NewBalance, NewMovement, NewProduct, NewWarehouse, OutWithoutBalance,
};
use stockroom::services::{catalog, ledger, warehouses};
use stockroom::store::{CatalogStore, InventoryStore, PgStore};
use stockroom::utils::random_token;

async fn pg_store() -> Arc<PgStore> {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = create_database_pool(&url).await.expect("connect");
    run_migrations(&pool).await.expect("migrate");
    Arc::new(PgStore::new(pool))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", random_token(&mut rand::thread_rng(), 8))
}

#[tokio::test]
#[ignore]
async fn ledger_and_balance_stay_in_step() {
    let store = pg_store().await;
    let product = catalog::create_product(
        store.as_ref(),
        NewProduct::new(unique("SKU"), "Integration pallet"),
    )
    .await
    .unwrap();
    let warehouse = warehouses::create_warehouse(
        store.as_ref(),
        NewWarehouse {
            code: None,
            name: "Integration depot".to_string(),
            location: None,
        },
    )
    .await
    .unwrap();

    let out = ledger::record_movement(
        store.as_ref(),
        NewMovement::new(product.id, &warehouse.code, Direction::Out, dec!(4)),
        OutWithoutBalance::Ignore,
    )
    .await
    .unwrap();
    assert_eq!(out.direction, Direction::Out);
    assert!(store
        .balance_for(product.id, &warehouse.code)
        .await
        .unwrap()
        .is_none());

    let rejected = ledger::record_movement(
        store.as_ref(),
        NewMovement::new(product.id, &warehouse.code, Direction::Out, dec!(4)),
        OutWithoutBalance::Reject,
    )
    .await
    .unwrap_err();
    assert!(matches!(rejected, StoreError::ValidationFailure(_)));

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let store = store.clone();
            let product_id = product.id;
            let code = warehouse.code.clone();
            tokio::spawn(async move {
                ledger::record_movement(
                    store.as_ref(),
                    NewMovement::new(product_id, code, Direction::In, dec!(1)),
                    OutWithoutBalance::Ignore,
                )
                .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let balance = store
        .balance_for(product.id, &warehouse.code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.quantity, dec!(20));

    let history = store.movements_by_product(product.id).await.unwrap();
    assert_eq!(history.len(), 21);
    assert!(history.windows(2).all(|w| w[0].id > w[1].id));
}

#[tokio::test]
#[ignore]
async fn duplicate_sku_maps_to_constraint_violation() {
    let store = pg_store().await;
    let sku = unique("DUP");
    catalog::create_product(store.as_ref(), NewProduct::new(sku.clone(), "First"))
        .await
        .unwrap();
    let err = catalog::create_product(store.as_ref(), NewProduct::new(sku.clone(), "Second"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));

    let found = store.product_by_sku(&sku).await.unwrap().unwrap();
    assert!(store.soft_delete_product(found.id).await.unwrap());
    assert!(store.product(found.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn reconcile_keeps_hand_opened_row_and_rejects_overflow() {
    let store = pg_store().await;
    let product = catalog::create_product(
        store.as_ref(),
        NewProduct::new(unique("SKU"), "Reconciled pallet"),
    )
    .await
    .unwrap();
    let warehouse = warehouses::create_warehouse(
        store.as_ref(),
        NewWarehouse {
            code: None,
            name: "Reconcile depot".to_string(),
            location: None,
        },
    )
    .await
    .unwrap();

    let opened = ledger::create_balance(
        store.as_ref(),
        NewBalance {
            product_id: product.id,
            warehouse_code: warehouse.code.clone(),
            quantity: dec!(50),
            reserved_quantity: dec!(0),
        },
    )
    .await
    .unwrap();
    assert_eq!(opened.opening_quantity, dec!(50));
    assert!(opened.ledger_floor.is_some());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            let product_id = product.id;
            let code = warehouse.code.clone();
            tokio::spawn(async move {
                ledger::record_movement(
                    store.as_ref(),
                    NewMovement::new(product_id, code, Direction::In, dec!(1)),
                    OutWithoutBalance::Ignore,
                )
                .await
            })
        })
        .collect();
    let corrections = ledger::reconcile_balances(store.as_ref(), OutWithoutBalance::Ignore)
        .await
        .unwrap();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert!(corrections.iter().all(|c| c.product_id != product.id));

    let balance = store
        .balance_for(product.id, &warehouse.code)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.quantity, dec!(60));

    ledger::record_movement(
        store.as_ref(),
        NewMovement::new(product.id, &warehouse.code, Direction::In, max_quantity() - dec!(60)),
        OutWithoutBalance::Ignore,
    )
    .await
    .unwrap();
    let overflow = ledger::record_movement(
        store.as_ref(),
        NewMovement::new(product.id, &warehouse.code, Direction::In, dec!(1)),
        OutWithoutBalance::Ignore,
    )
    .await
    .unwrap_err();
    assert!(matches!(overflow, StoreError::ValidationFailure(_)));
    assert_eq!(store.movements_by_product(product.id).await.unwrap().len(), 11);
}
