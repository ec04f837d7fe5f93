use validator::Validate;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Category, CategoryChanges, NewCategory, NewProduct, NewUnit, Product, ProductChanges, Unit,
    UnitChanges,
};
use crate::store::{CatalogStore, Store};

pub async fn create_product(store: &dyn Store, product: NewProduct) -> StoreResult<Product> {
    let product = product.normalized();
    product.validate()?;
    check_references(store, product.category_id, product.unit_id).await?;

    let created = store.create_product(product).await?;
    log::info!("created product {} ({})", created.sku, created.id);
    Ok(created)
}

pub async fn update_product(
    store: &dyn Store,
    id: i64,
    changes: ProductChanges,
) -> StoreResult<Option<Product>> {
    changes.check().map_err(StoreError::ValidationFailure)?;
    check_references(
        store,
        changes.category_id.flatten(),
        changes.unit_id.flatten(),
    )
    .await?;

    let updated = store.update_product(id, changes).await?;
    if let Some(product) = &updated {
        log::info!("updated product {} ({})", product.sku, product.id);
    }
    Ok(updated)
}

async fn check_references(
    store: &dyn Store,
    category_id: Option<i64>,
    unit_id: Option<i64>,
) -> StoreResult<()> {
    if let Some(id) = category_id {
        if store.category(id).await?.is_none() {
            return Err(StoreError::ValidationFailure(format!(
                "category {id} does not exist"
            )));
        }
    }
    if let Some(id) = unit_id {
        if store.unit(id).await?.is_none() {
            return Err(StoreError::ValidationFailure(format!(
                "unit {id} does not exist"
            )));
        }
    }
    Ok(())
}

pub async fn create_category(store: &dyn Store, category: NewCategory) -> StoreResult<Category> {
    let category = category.normalized();
    category.validate()?;
    store.create_category(category).await
}

pub async fn update_category(
    store: &dyn Store,
    id: i64,
    changes: CategoryChanges,
) -> StoreResult<Option<Category>> {
    if matches!(&changes.name, Some(name) if name.trim().is_empty()) {
        return Err(StoreError::ValidationFailure("name is required".to_string()));
    }
    store.update_category(id, changes).await
}

pub async fn create_unit(store: &dyn Store, unit: NewUnit) -> StoreResult<Unit> {
    let unit = unit.normalized();
    unit.validate()?;
    store.create_unit(unit).await
}

pub async fn update_unit(
    store: &dyn Store,
    id: i64,
    changes: UnitChanges,
) -> StoreResult<Option<Unit>> {
    if matches!(&changes.name, Some(name) if name.trim().is_empty()) {
        return Err(StoreError::ValidationFailure("name is required".to_string()));
    }
    if matches!(&changes.abbreviation, Some(abbr) if abbr.trim().is_empty()) {
        return Err(StoreError::ValidationFailure(
            "abbreviation is required".to_string(),
        ));
    }
    store.update_unit(id, changes).await
}
