mod common;

use rust_decimal_macros::dec;
use stockroom::error::StoreError;
use stockroom::models::{NewBalance, NewProduct, NewWarehouse, ProductChanges, WarehouseChanges};
use stockroom::services::{self, ledger, warehouses};
use stockroom::store::{CatalogStore, InventoryStore, WarehouseStore};

use common::{category, product, store, warehouse};

#[tokio::test]
async fn soft_deleted_product_looks_like_a_missing_one() {
    let store = store();
    let p = product(store.as_ref(), "X-100", "ABC Widget").await;

    assert!(store.soft_delete_product(p.id).await.unwrap());
    assert!(!store.soft_delete_product(p.id).await.unwrap());

    assert!(store.product(p.id).await.unwrap().is_none());
    assert!(store.product(p.id + 1000).await.unwrap().is_none());
    assert!(store.product_by_sku("X-100").await.unwrap().is_none());
    assert!(store.list_products().await.unwrap().is_empty());
    assert!(store.search_products("widget").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_matches_name_and_sku_case_insensitively() {
    let store = store();
    product(store.as_ref(), "X-100", "ABC Widget").await;
    product(store.as_ref(), "Y-200", "Gear").await;

    let hits = store.search_products("abc").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].sku, "X-100");

    let by_sku = store.search_products("x-1").await.unwrap();
    assert_eq!(by_sku.len(), 1);

    assert!(store.search_products("zzz").await.unwrap().is_empty());
    assert_eq!(store.search_products("").await.unwrap().len(), 2);
}

#[tokio::test]
async fn duplicate_sku_is_a_constraint_violation() {
    let store = store();
    product(store.as_ref(), "X-100", "ABC Widget").await;

    let err = services::catalog::create_product(store.as_ref(), NewProduct::new("X-100", "Other"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));
}

#[tokio::test]
async fn product_validation_failures() {
    let store = store();

    let blank = services::catalog::create_product(store.as_ref(), NewProduct::new("  ", "Thing"))
        .await
        .unwrap_err();
    assert!(matches!(blank, StoreError::ValidationFailure(_)));

    let mut negative = NewProduct::new("N-1", "Negative");
    negative.price = dec!(-1);
    let err = services::catalog::create_product(store.as_ref(), negative)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ValidationFailure(_)));

    let mut dangling = NewProduct::new("D-1", "Dangling");
    dangling.category_id = Some(404);
    let err = services::catalog::create_product(store.as_ref(), dangling)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ValidationFailure(_)));
}

#[tokio::test]
async fn update_merges_fields_and_reports_absence() {
    let store = store();
    let tools = category(store.as_ref(), "Tools").await;
    let p = product(store.as_ref(), "X-100", "ABC Widget").await;

    let changes = ProductChanges {
        name: Some("ABC Widget Mk2".to_string()),
        category_id: Some(Some(tools.id)),
        cost: Some(dec!(3.50)),
        ..Default::default()
    };
    let updated = services::catalog::update_product(store.as_ref(), p.id, changes)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "ABC Widget Mk2");
    assert_eq!(updated.sku, "X-100");
    assert_eq!(updated.category_id, Some(tools.id));
    assert_eq!(updated.cost, dec!(3.50));
    assert!(updated.updated_at >= p.updated_at);

    let missing = services::catalog::update_product(
        store.as_ref(),
        p.id + 1000,
        ProductChanges {
            name: Some("Ghost".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn supplied_warehouse_code_is_checked() {
    let store = store();
    let created = warehouse(store.as_ref(), "main-1").await;
    assert_eq!(created.code, "MAIN-1");

    let taken = warehouses::create_warehouse(
        store.as_ref(),
        NewWarehouse {
            code: Some("MAIN-1".to_string()),
            name: "Second".to_string(),
            location: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(taken, StoreError::ConstraintViolation(_)));

    let malformed = warehouses::create_warehouse(
        store.as_ref(),
        NewWarehouse {
            code: Some("NO SPACES".to_string()),
            name: "Third".to_string(),
            location: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(malformed, StoreError::ValidationFailure(_)));
}

#[tokio::test]
async fn deleted_warehouse_code_stays_reserved() {
    let store = store();
    warehouse(store.as_ref(), "OLD").await;
    assert!(store.soft_delete_warehouse("OLD").await.unwrap());
    assert!(store.warehouse("OLD").await.unwrap().is_none());

    let err = warehouses::create_warehouse(
        store.as_ref(),
        NewWarehouse {
            code: Some("old".to_string()),
            name: "Reborn".to_string(),
            location: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));
}

#[tokio::test]
async fn generated_warehouse_codes_have_the_expected_shape() {
    let store = store();
    let mut codes = Vec::new();
    for i in 0..5 {
        let created = warehouses::create_warehouse(
            store.as_ref(),
            NewWarehouse {
                code: None,
                name: format!("Depot {i}"),
                location: Some(" Dock 4 ".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.code.len(), warehouses::CODE_LENGTH);
        assert!(created
            .code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(created.location.as_deref(), Some("Dock 4"));
        codes.push(created.code);
    }
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 5);
}

#[tokio::test]
async fn warehouse_update_is_keyed_by_code() {
    let store = store();
    warehouse(store.as_ref(), "W1").await;

    let updated = warehouses::update_warehouse(
        store.as_ref(),
        "w1",
        WarehouseChanges {
            name: Some("North".to_string()),
            location: None,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.name, "North");

    let blank = warehouses::update_warehouse(
        store.as_ref(),
        "W1",
        WarehouseChanges {
            name: Some(" ".to_string()),
            location: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(blank, StoreError::ValidationFailure(_)));
}

#[tokio::test]
async fn balance_pair_is_unique_and_hard_deleted() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    let new = || NewBalance {
        product_id: p.id,
        warehouse_code: "w1".to_string(),
        quantity: dec!(5),
        reserved_quantity: dec!(1),
    };
    let balance = ledger::create_balance(store.as_ref(), new()).await.unwrap();
    assert_eq!(balance.warehouse_code, "W1");

    let err = ledger::create_balance(store.as_ref(), new()).await.unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));

    assert!(store.delete_balance(balance.id).await.unwrap());
    assert!(store.balance(balance.id).await.unwrap().is_none());
    assert!(!store.delete_balance(balance.id).await.unwrap());

    // The pair is free again once the row is physically gone.
    ledger::create_balance(store.as_ref(), new()).await.unwrap();
}

#[tokio::test]
async fn negative_reserved_quantity_is_rejected() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    let err = ledger::create_balance(
        store.as_ref(),
        NewBalance {
            product_id: p.id,
            warehouse_code: "W1".to_string(),
            quantity: dec!(5),
            reserved_quantity: dec!(-1),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::ValidationFailure(_)));
}

#[tokio::test]
async fn categories_and_units_have_unique_keys() {
    let store = store();
    category(store.as_ref(), "Tools").await;
    let err = services::catalog::create_category(
        store.as_ref(),
        stockroom::models::NewCategory {
            name: "Tools".to_string(),
            description: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));

    let unit = services::catalog::create_unit(
        store.as_ref(),
        stockroom::models::NewUnit {
            name: "Kilogram".to_string(),
            abbreviation: "kg".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(
        store.unit_by_abbreviation("kg").await.unwrap().unwrap().id,
        unit.id
    );
    assert_eq!(store.search_units("kilo").await.unwrap().len(), 1);
}
