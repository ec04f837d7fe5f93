//! Entry point of the ledger applier and balance reconciliation.

use rust_decimal::Decimal;

use crate::error::{StoreError, StoreResult};
use crate::models::inventory::check_quantity;
use crate::models::{
    opt_string, BalanceChanges, Correction, InventoryBalance, MovementReceipt, NewBalance,
    NewMovement, OutWithoutBalance, StockMovement,
};
use crate::store::{CatalogStore, InventoryStore, Store, WarehouseStore};

pub const DEFAULT_RECENT_LIMIT: i64 = 10;
const MAX_RECENT_LIMIT: i64 = 500;

/// Validates a movement, then appends it and applies its balance effect in
/// one unit of work.
pub async fn record_movement(
    store: &dyn Store,
    movement: NewMovement,
    policy: OutWithoutBalance,
) -> StoreResult<StockMovement> {
    apply_movement(store, movement, policy)
        .await
        .map(|receipt| receipt.movement)
}

/// Like [`record_movement`] but also returns the balance row it touched.
pub async fn apply_movement(
    store: &dyn Store,
    mut movement: NewMovement,
    policy: OutWithoutBalance,
) -> StoreResult<MovementReceipt> {
    if movement.quantity <= Decimal::ZERO {
        return Err(StoreError::ValidationFailure(
            "movement quantity must be greater than zero".to_string(),
        ));
    }
    check_quantity("movement quantity", movement.quantity)?;

    movement.warehouse_code = movement.warehouse_code.trim().to_uppercase();
    movement.reference = opt_string(movement.reference);
    movement.note = opt_string(movement.note);

    if store.product(movement.product_id).await?.is_none() {
        return Err(StoreError::ValidationFailure(format!(
            "product {} does not exist",
            movement.product_id
        )));
    }
    if store.warehouse(&movement.warehouse_code).await?.is_none() {
        return Err(StoreError::ValidationFailure(format!(
            "warehouse {} does not exist",
            movement.warehouse_code
        )));
    }

    let receipt = store.record_movement(movement, policy).await?;
    let entry = &receipt.movement;
    match &receipt.balance {
        Some(balance) => log::info!(
            "movement {}: {} {} of product {} at {}, balance now {}",
            entry.id,
            entry.direction,
            entry.quantity,
            entry.product_id,
            entry.warehouse_code,
            balance.quantity
        ),
        None => log::info!(
            "movement {}: {} {} of product {} at {}, no balance row",
            entry.id,
            entry.direction,
            entry.quantity,
            entry.product_id,
            entry.warehouse_code
        ),
    }
    Ok(receipt)
}

/// Opens a balance row by hand. The pair must reference a live product and
/// warehouse and must not have a row yet.
pub async fn create_balance(
    store: &dyn Store,
    mut balance: NewBalance,
) -> StoreResult<InventoryBalance> {
    balance.warehouse_code = balance.warehouse_code.trim().to_uppercase();
    if balance.reserved_quantity < Decimal::ZERO {
        return Err(StoreError::ValidationFailure(
            "reserved quantity must not be negative".to_string(),
        ));
    }
    check_quantity("quantity", balance.quantity)?;
    check_quantity("reserved quantity", balance.reserved_quantity)?;
    if store.product(balance.product_id).await?.is_none() {
        return Err(StoreError::ValidationFailure(format!(
            "product {} does not exist",
            balance.product_id
        )));
    }
    if store.warehouse(&balance.warehouse_code).await?.is_none() {
        return Err(StoreError::ValidationFailure(format!(
            "warehouse {} does not exist",
            balance.warehouse_code
        )));
    }
    store.create_balance(balance).await
}

pub async fn update_balance(
    store: &dyn Store,
    id: i64,
    changes: BalanceChanges,
) -> StoreResult<Option<InventoryBalance>> {
    if changes.reserved_quantity.is_some_and(|r| r < Decimal::ZERO) {
        return Err(StoreError::ValidationFailure(
            "reserved quantity must not be negative".to_string(),
        ));
    }
    if let Some(quantity) = changes.quantity {
        check_quantity("quantity", quantity)?;
    }
    if let Some(reserved) = changes.reserved_quantity {
        check_quantity("reserved quantity", reserved)?;
    }
    store.update_balance(id, changes).await
}

pub async fn recent_movements(
    store: &dyn Store,
    limit: Option<i64>,
) -> StoreResult<Vec<StockMovement>> {
    let limit = limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    store.recent_movements(limit).await
}

/// Replays the ledger per pair and rewrites every balance that disagrees
/// with it. Runs as one locked pass in the store, so movements recorded
/// meanwhile wait for it instead of being overwritten.
pub async fn reconcile_balances(
    store: &dyn Store,
    policy: OutWithoutBalance,
) -> StoreResult<Vec<Correction>> {
    let corrections = store.reconcile_balances(policy).await?;
    for correction in &corrections {
        log::warn!(
            "reconciled balance of product {} at {}: {:?} -> {}",
            correction.product_id,
            correction.warehouse_code,
            correction.previous,
            correction.corrected
        );
    }
    log::info!("reconciliation finished with {} corrections", corrections.len());
    Ok(corrections)
}
