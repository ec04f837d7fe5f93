mod common;

use rust_decimal_macros::dec;
use stockroom::error::StoreError;
use stockroom::models::inventory::max_quantity;
use stockroom::models::{BalanceChanges, Direction, NewBalance, NewMovement, OutWithoutBalance};
use stockroom::services::ledger;
use stockroom::store::InventoryStore;

use common::{movement, product, store, warehouse};

#[tokio::test]
async fn in_movements_on_fresh_pair_sum_up() {
    let store = store();
    let p = product(store.as_ref(), "X-100", "ABC Widget").await;
    warehouse(store.as_ref(), "W1").await;

    for qty in [dec!(5), dec!(2.5), dec!(10)] {
        movement(store.as_ref(), p.id, "W1", Direction::In, qty).await;
    }

    let balance = store.balance_for(p.id, "W1").await.unwrap().unwrap();
    assert_eq!(balance.quantity, dec!(17.5));
    assert_eq!(balance.reserved_quantity, dec!(0));
    assert_eq!(store.ledger().await.unwrap().len(), 3);
}

#[tokio::test]
async fn mixed_movements_may_drive_balance_negative() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    let mut seen = Vec::new();
    for (direction, qty) in [
        (Direction::In, dec!(10)),
        (Direction::Out, dec!(3)),
        (Direction::Out, dec!(20)),
    ] {
        movement(store.as_ref(), p.id, "W1", direction, qty).await;
        let balance = store.balance_for(p.id, "W1").await.unwrap().unwrap();
        seen.push(balance.quantity);
    }

    assert_eq!(seen, vec![dec!(10), dec!(7), dec!(-13)]);
}

#[tokio::test]
async fn out_without_balance_is_ledger_only_by_default() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    let entry = movement(store.as_ref(), p.id, "W1", Direction::Out, dec!(4)).await;

    assert!(store.balance_for(p.id, "W1").await.unwrap().is_none());
    let stored = store.movement(entry.id).await.unwrap().unwrap();
    assert_eq!(stored.direction, Direction::Out);
    assert_eq!(stored.quantity, dec!(4));
}

#[tokio::test]
async fn reject_policy_refuses_before_append() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    let err = ledger::record_movement(
        store.as_ref(),
        NewMovement::new(p.id, "W1", Direction::Out, dec!(4)),
        OutWithoutBalance::Reject,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, StoreError::ValidationFailure(_)));
    assert!(store.ledger().await.unwrap().is_empty());
}

#[tokio::test]
async fn materialize_policy_opens_negative_row() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    let receipt = ledger::apply_movement(
        store.as_ref(),
        NewMovement::new(p.id, "w1", Direction::Out, dec!(4)),
        OutWithoutBalance::Materialize,
    )
    .await
    .unwrap();

    assert_eq!(receipt.movement.warehouse_code, "W1");
    assert_eq!(receipt.balance.unwrap().quantity, dec!(-4));
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    for qty in [dec!(0), dec!(-1)] {
        let err = ledger::record_movement(
            store.as_ref(),
            NewMovement::new(p.id, "W1", Direction::In, qty),
            OutWithoutBalance::Ignore,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::ValidationFailure(_)));
    }
    assert!(store.ledger().await.unwrap().is_empty());
    assert!(store.balance_for(p.id, "W1").await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_product_or_warehouse_is_rejected() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    let missing_product = ledger::record_movement(
        store.as_ref(),
        NewMovement::new(p.id + 1000, "W1", Direction::In, dec!(1)),
        OutWithoutBalance::Ignore,
    )
    .await
    .unwrap_err();
    let missing_warehouse = ledger::record_movement(
        store.as_ref(),
        NewMovement::new(p.id, "NOPE", Direction::In, dec!(1)),
        OutWithoutBalance::Ignore,
    )
    .await
    .unwrap_err();

    assert!(matches!(missing_product, StoreError::ValidationFailure(_)));
    assert!(matches!(missing_warehouse, StoreError::ValidationFailure(_)));
    assert!(store.ledger().await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_movements_lose_no_update() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    let product_id = p.id;
    let handles: Vec<_> = (0..50)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                ledger::record_movement(
                    store.as_ref(),
                    NewMovement::new(product_id, "W1", Direction::In, dec!(2)),
                    OutWithoutBalance::Ignore,
                )
                .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let balance = store.balance_for(p.id, "W1").await.unwrap().unwrap();
    assert_eq!(balance.quantity, dec!(100));
    assert_eq!(store.ledger().await.unwrap().len(), 50);
}

#[tokio::test]
async fn movement_reads_are_newest_first() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    let mut ids = Vec::new();
    for _ in 0..12 {
        ids.push(movement(store.as_ref(), p.id, "W1", Direction::In, dec!(1)).await.id);
    }

    let by_product: Vec<i64> = store
        .movements_by_product(p.id)
        .await
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    let mut expected = ids.clone();
    expected.reverse();
    assert_eq!(by_product, expected);

    let by_warehouse: Vec<i64> = store
        .movements_by_warehouse("W1")
        .await
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(by_warehouse, expected);

    let recent = ledger::recent_movements(store.as_ref(), None).await.unwrap();
    assert_eq!(recent.len(), ledger::DEFAULT_RECENT_LIMIT as usize);
    assert_eq!(recent[0].id, *ids.last().unwrap());

    let three = ledger::recent_movements(store.as_ref(), Some(3)).await.unwrap();
    assert_eq!(three.len(), 3);
}

#[tokio::test]
async fn reconcile_repairs_drifted_balance() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    let q = product(store.as_ref(), "P2", "Crate").await;
    warehouse(store.as_ref(), "W1").await;

    movement(store.as_ref(), p.id, "W1", Direction::In, dec!(10)).await;
    movement(store.as_ref(), p.id, "W1", Direction::Out, dec!(3)).await;
    let drifted = store.balance_for(p.id, "W1").await.unwrap().unwrap();
    store
        .update_balance(
            drifted.id,
            BalanceChanges {
                quantity: Some(dec!(99)),
                reserved_quantity: None,
            },
        )
        .await
        .unwrap();

    // Opened by hand with no ledger history, so it must survive untouched.
    ledger::create_balance(
        store.as_ref(),
        NewBalance {
            product_id: q.id,
            warehouse_code: "W1".to_string(),
            quantity: dec!(42),
            reserved_quantity: dec!(0),
        },
    )
    .await
    .unwrap();

    let corrections = ledger::reconcile_balances(store.as_ref(), OutWithoutBalance::Ignore)
        .await
        .unwrap();

    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].product_id, p.id);
    assert_eq!(corrections[0].previous, Some(dec!(99)));
    assert_eq!(corrections[0].corrected, dec!(7));
    assert_eq!(
        store.balance_for(p.id, "W1").await.unwrap().unwrap().quantity,
        dec!(7)
    );
    assert_eq!(
        store.balance_for(q.id, "W1").await.unwrap().unwrap().quantity,
        dec!(42)
    );

    // Movements after a hand-opened row build on its opening quantity.
    movement(store.as_ref(), q.id, "W1", Direction::In, dec!(10)).await;
    assert!(ledger::reconcile_balances(store.as_ref(), OutWithoutBalance::Ignore)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        store.balance_for(q.id, "W1").await.unwrap().unwrap().quantity,
        dec!(52)
    );

    let again = ledger::reconcile_balances(store.as_ref(), OutWithoutBalance::Ignore)
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn reconcile_keeps_hand_opened_baseline() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    // Ledger-only under the default policy, and older than the row below.
    movement(store.as_ref(), p.id, "W1", Direction::Out, dec!(4)).await;
    let opened = ledger::create_balance(
        store.as_ref(),
        NewBalance {
            product_id: p.id,
            warehouse_code: "W1".to_string(),
            quantity: dec!(50),
            reserved_quantity: dec!(0),
        },
    )
    .await
    .unwrap();
    assert_eq!(opened.opening_quantity, dec!(50));
    movement(store.as_ref(), p.id, "W1", Direction::In, dec!(10)).await;

    let corrections = ledger::reconcile_balances(store.as_ref(), OutWithoutBalance::Ignore)
        .await
        .unwrap();
    assert!(corrections.is_empty());
    assert_eq!(
        store.balance_for(p.id, "W1").await.unwrap().unwrap().quantity,
        dec!(60)
    );

    // A raw edit is drift from opening quantity plus later movements.
    store
        .update_balance(
            opened.id,
            BalanceChanges {
                quantity: Some(dec!(5)),
                reserved_quantity: None,
            },
        )
        .await
        .unwrap();
    let corrections = ledger::reconcile_balances(store.as_ref(), OutWithoutBalance::Ignore)
        .await
        .unwrap();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].previous, Some(dec!(5)));
    assert_eq!(corrections[0].corrected, dec!(60));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reconcile_during_movements_loses_no_update() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;
    movement(store.as_ref(), p.id, "W1", Direction::In, dec!(1)).await;

    let product_id = p.id;
    let movements: Vec<_> = (0..50)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                ledger::record_movement(
                    store.as_ref(),
                    NewMovement::new(product_id, "W1", Direction::In, dec!(2)),
                    OutWithoutBalance::Ignore,
                )
                .await
            })
        })
        .collect();
    let reconciles: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                ledger::reconcile_balances(store.as_ref(), OutWithoutBalance::Ignore).await
            })
        })
        .collect();
    for handle in movements {
        handle.await.unwrap().unwrap();
    }
    for handle in reconciles {
        assert!(handle.await.unwrap().unwrap().is_empty());
    }

    let balance = store.balance_for(p.id, "W1").await.unwrap().unwrap();
    assert_eq!(balance.quantity, dec!(101));
    assert_eq!(store.ledger().await.unwrap().len(), 51);
}

#[tokio::test]
async fn overflowing_movement_leaves_ledger_and_balance_alone() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    movement(store.as_ref(), p.id, "W1", Direction::In, max_quantity()).await;
    let err = ledger::record_movement(
        store.as_ref(),
        NewMovement::new(p.id, "W1", Direction::In, dec!(1)),
        OutWithoutBalance::Ignore,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, StoreError::ValidationFailure(_)));
    assert_eq!(store.ledger().await.unwrap().len(), 1);
    assert_eq!(
        store.balance_for(p.id, "W1").await.unwrap().unwrap().quantity,
        max_quantity()
    );
    assert!(ledger::reconcile_balances(store.as_ref(), OutWithoutBalance::Ignore)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn quantities_must_fit_the_stored_column() {
    let store = store();
    let p = product(store.as_ref(), "P1", "Pallet").await;
    warehouse(store.as_ref(), "W1").await;

    for qty in [dec!(1.00001), dec!(10000000000)] {
        let err = ledger::record_movement(
            store.as_ref(),
            NewMovement::new(p.id, "W1", Direction::In, qty),
            OutWithoutBalance::Ignore,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::ValidationFailure(_)));
    }
    assert!(store.ledger().await.unwrap().is_empty());

    // Trailing zeros past the fourth place carry no precision.
    let entry = movement(store.as_ref(), p.id, "W1", Direction::In, dec!(1.50000)).await;
    assert_eq!(entry.quantity, dec!(1.5));

    let err = ledger::create_balance(
        store.as_ref(),
        NewBalance {
            product_id: p.id,
            warehouse_code: "W1".to_string(),
            quantity: dec!(0.12345),
            reserved_quantity: dec!(0),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::ValidationFailure(_)));
}
