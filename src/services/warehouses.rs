use validator::Validate;

use crate::error::{StoreError, StoreResult};
use crate::models::{NewWarehouse, Warehouse, WarehouseChanges};
use crate::store::{Store, WarehouseStore};
use crate::utils::{is_valid_code, random_token};

pub const CODE_LENGTH: usize = 8;
const MAX_ATTEMPTS: usize = 5;

pub fn generate_code() -> String {
    random_token(&mut rand::thread_rng(), CODE_LENGTH)
}

/// Creates a warehouse, generating a code when none was supplied.
///
/// A supplied code that is already in use, even by a soft-deleted warehouse,
/// is a constraint violation.
pub async fn create_warehouse(
    store: &dyn Store,
    warehouse: NewWarehouse,
) -> StoreResult<Warehouse> {
    let warehouse = warehouse.normalized();
    warehouse.validate()?;

    let code = match warehouse.code.clone() {
        Some(code) => {
            if !is_valid_code(&code) {
                return Err(StoreError::ValidationFailure(
                    "warehouse code may only contain letters, digits, '-' and '_'".to_string(),
                ));
            }
            if store.warehouse_code_taken(&code).await? {
                return Err(StoreError::ConstraintViolation(format!(
                    "warehouse code {code} is already in use"
                )));
            }
            code
        }
        None => unused_code(store).await?,
    };

    let created = store.create_warehouse(&code, warehouse).await?;
    log::info!("created warehouse {} ({})", created.code, created.name);
    Ok(created)
}

async fn unused_code(store: &dyn Store) -> StoreResult<String> {
    for _ in 0..MAX_ATTEMPTS {
        let code = generate_code();
        if !store.warehouse_code_taken(&code).await? {
            return Ok(code);
        }
        log::warn!("generated warehouse code {} collided, retrying", code);
    }
    Err(StoreError::ConstraintViolation(
        "could not generate an unused warehouse code".to_string(),
    ))
}

pub async fn update_warehouse(
    store: &dyn Store,
    code: &str,
    changes: WarehouseChanges,
) -> StoreResult<Option<Warehouse>> {
    if matches!(&changes.name, Some(name) if name.trim().is_empty()) {
        return Err(StoreError::ValidationFailure("name is required".to_string()));
    }
    store.update_warehouse(&code.to_uppercase(), changes).await
}
