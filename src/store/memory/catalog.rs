use async_trait::async_trait;
use chrono::Utc;

use super::{duplicate, search, MemoryStore};
use crate::error::StoreResult;
use crate::models::{
    Category, CategoryChanges, NewCategory, NewProduct, NewUnit, Product, ProductChanges, Unit,
    UnitChanges,
};
use crate::store::CatalogStore;

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn product(&self, id: i64) -> StoreResult<Option<Product>> {
        let tables = self.tables.lock().await;
        Ok(tables.products.get(&id).filter(|p| p.deleted_at.is_none()).cloned())
    }

    async fn product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .products
            .values()
            .find(|p| p.deleted_at.is_none() && p.sku == sku)
            .cloned())
    }

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
        let mut tables = self.tables.lock().await;
        if tables
            .products
            .values()
            .any(|p| p.deleted_at.is_none() && p.sku == product.sku)
        {
            return Err(duplicate("SKU", &product.sku));
        }
        let now = Utc::now();
        let id = tables.next_id();
        let created = Product {
            id,
            sku: product.sku,
            name: product.name,
            description: product.description,
            barcode: product.barcode,
            category_id: product.category_id,
            unit_id: product.unit_id,
            price: product.price,
            cost: product.cost,
            weight: product.weight,
            length: product.length,
            width: product.width,
            height: product.height,
            min_stock: product.min_stock,
            max_stock: product.max_stock,
            reorder_point: product.reorder_point,
            lead_time_days: product.lead_time_days,
            is_active: product.is_active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.products.insert(id, created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        id: i64,
        changes: ProductChanges,
    ) -> StoreResult<Option<Product>> {
        let mut tables = self.tables.lock().await;
        if let Some(sku) = changes.sku.as_deref().map(str::trim) {
            if tables
                .products
                .values()
                .any(|p| p.id != id && p.deleted_at.is_none() && p.sku == sku)
            {
                return Err(duplicate("SKU", sku));
            }
        }
        let Some(product) = tables
            .products
            .get_mut(&id)
            .filter(|p| p.deleted_at.is_none())
        else {
            return Ok(None);
        };
        changes.apply_to(product);
        Ok(Some(product.clone()))
    }

    async fn soft_delete_product(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.products.get_mut(&id) {
            Some(product) if product.deleted_at.is_none() => {
                product.deleted_at = Some(Utc::now());
                true
            }
            _ => false,
        })
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        self.search_products("").await
    }

    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>> {
        let tables = self.tables.lock().await;
        let mut products = search(
            tables.products.values().filter(|p| p.deleted_at.is_none()),
            query,
            Product::matches,
        );
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn category(&self, id: i64) -> StoreResult<Option<Category>> {
        let tables = self.tables.lock().await;
        Ok(tables.categories.get(&id).filter(|c| c.deleted_at.is_none()).cloned())
    }

    async fn category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .categories
            .values()
            .find(|c| c.deleted_at.is_none() && c.name == name)
            .cloned())
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut tables = self.tables.lock().await;
        if tables
            .categories
            .values()
            .any(|c| c.deleted_at.is_none() && c.name == category.name)
        {
            return Err(duplicate("category", &category.name));
        }
        let now = Utc::now();
        let id = tables.next_id();
        let created = Category {
            id,
            name: category.name,
            description: category.description,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.categories.insert(id, created.clone());
        Ok(created)
    }

    async fn update_category(
        &self,
        id: i64,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>> {
        let mut tables = self.tables.lock().await;
        if let Some(name) = changes.name.as_deref().map(str::trim) {
            if tables
                .categories
                .values()
                .any(|c| c.id != id && c.deleted_at.is_none() && c.name == name)
            {
                return Err(duplicate("category", name));
            }
        }
        let Some(category) = tables
            .categories
            .get_mut(&id)
            .filter(|c| c.deleted_at.is_none())
        else {
            return Ok(None);
        };
        changes.apply_to(category);
        Ok(Some(category.clone()))
    }

    async fn soft_delete_category(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.categories.get_mut(&id) {
            Some(category) if category.deleted_at.is_none() => {
                category.deleted_at = Some(Utc::now());
                true
            }
            _ => false,
        })
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.search_categories("").await
    }

    async fn search_categories(&self, query: &str) -> StoreResult<Vec<Category>> {
        let tables = self.tables.lock().await;
        let mut categories = search(
            tables.categories.values().filter(|c| c.deleted_at.is_none()),
            query,
            Category::matches,
        );
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn unit(&self, id: i64) -> StoreResult<Option<Unit>> {
        let tables = self.tables.lock().await;
        Ok(tables.units.get(&id).filter(|u| u.deleted_at.is_none()).cloned())
    }

    async fn unit_by_abbreviation(&self, abbreviation: &str) -> StoreResult<Option<Unit>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .units
            .values()
            .find(|u| u.deleted_at.is_none() && u.abbreviation == abbreviation)
            .cloned())
    }

    async fn create_unit(&self, unit: NewUnit) -> StoreResult<Unit> {
        let mut tables = self.tables.lock().await;
        if tables
            .units
            .values()
            .any(|u| u.deleted_at.is_none() && u.abbreviation == unit.abbreviation)
        {
            return Err(duplicate("unit", &unit.abbreviation));
        }
        let now = Utc::now();
        let id = tables.next_id();
        let created = Unit {
            id,
            name: unit.name,
            abbreviation: unit.abbreviation,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.units.insert(id, created.clone());
        Ok(created)
    }

    async fn update_unit(&self, id: i64, changes: UnitChanges) -> StoreResult<Option<Unit>> {
        let mut tables = self.tables.lock().await;
        if let Some(abbreviation) = changes.abbreviation.as_deref().map(str::trim) {
            if tables
                .units
                .values()
                .any(|u| u.id != id && u.deleted_at.is_none() && u.abbreviation == abbreviation)
            {
                return Err(duplicate("unit", abbreviation));
            }
        }
        let Some(unit) = tables.units.get_mut(&id).filter(|u| u.deleted_at.is_none()) else {
            return Ok(None);
        };
        changes.apply_to(unit);
        Ok(Some(unit.clone()))
    }

    async fn soft_delete_unit(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.units.get_mut(&id) {
            Some(unit) if unit.deleted_at.is_none() => {
                unit.deleted_at = Some(Utc::now());
                true
            }
            _ => false,
        })
    }

    async fn list_units(&self) -> StoreResult<Vec<Unit>> {
        self.search_units("").await
    }

    async fn search_units(&self, query: &str) -> StoreResult<Vec<Unit>> {
        let tables = self.tables.lock().await;
        let mut units = search(
            tables.units.values().filter(|u| u.deleted_at.is_none()),
            query,
            Unit::matches,
        );
        units.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(units)
    }
}
