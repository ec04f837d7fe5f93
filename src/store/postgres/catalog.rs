use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{like_pattern, push_changes, PgStore};
use crate::error::StoreResult;
use crate::models::{
    Category, CategoryChanges, NewCategory, NewProduct, NewUnit, Product, ProductChanges, Unit,
    UnitChanges,
};
use crate::store::CatalogStore;

#[async_trait]
impl CatalogStore for PgStore {
    async fn product(&self, id: i64) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE sku = $1 AND deleted_at IS NULL",
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
        let created = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                sku, name, description, barcode, category_id, unit_id, price, cost,
                weight, length, width, height, min_stock, max_stock, reorder_point,
                lead_time_days, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.barcode)
        .bind(product.category_id)
        .bind(product.unit_id)
        .bind(product.price)
        .bind(product.cost)
        .bind(product.weight)
        .bind(product.length)
        .bind(product.width)
        .bind(product.height)
        .bind(product.min_stock)
        .bind(product.max_stock)
        .bind(product.reorder_point)
        .bind(product.lead_time_days)
        .bind(product.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_product(
        &self,
        id: i64,
        mut changes: ProductChanges,
    ) -> StoreResult<Option<Product>> {
        changes.sku = changes.sku.map(|sku| sku.trim().to_string());
        changes.name = changes.name.map(|name| name.trim().to_string());

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = NOW()");
        push_changes!(
            builder,
            changes,
            sku,
            name,
            description,
            barcode,
            category_id,
            unit_id,
            price,
            cost,
            weight,
            length,
            width,
            height,
            min_stock,
            max_stock,
            reorder_point,
            lead_time_days,
            is_active,
        );
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL RETURNING *");

        let product = builder
            .build_query_as::<Product>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn soft_delete_product(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE deleted_at IS NULL ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>> {
        if query.trim().is_empty() {
            return self.list_products().await;
        }
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE deleted_at IS NULL AND (name ILIKE $1 OR sku ILIKE $1)
            ORDER BY name, id
            "#,
        )
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn category(&self, id: i64) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE name = $1 AND deleted_at IS NULL",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let created = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_category(
        &self,
        id: i64,
        mut changes: CategoryChanges,
    ) -> StoreResult<Option<Category>> {
        changes.name = changes.name.map(|name| name.trim().to_string());

        let mut builder =
            QueryBuilder::<Postgres>::new("UPDATE categories SET updated_at = NOW()");
        push_changes!(builder, changes, name, description);
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL RETURNING *");

        let category = builder
            .build_query_as::<Category>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn soft_delete_category(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE categories SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE deleted_at IS NULL ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn search_categories(&self, query: &str) -> StoreResult<Vec<Category>> {
        if query.trim().is_empty() {
            return self.list_categories().await;
        }
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT * FROM categories
            WHERE deleted_at IS NULL AND (name ILIKE $1 OR description ILIKE $1)
            ORDER BY name, id
            "#,
        )
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn unit(&self, id: i64) -> StoreResult<Option<Unit>> {
        let unit =
            sqlx::query_as::<_, Unit>("SELECT * FROM units WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(unit)
    }

    async fn unit_by_abbreviation(&self, abbreviation: &str) -> StoreResult<Option<Unit>> {
        let unit = sqlx::query_as::<_, Unit>(
            "SELECT * FROM units WHERE abbreviation = $1 AND deleted_at IS NULL",
        )
        .bind(abbreviation)
        .fetch_optional(&self.pool)
        .await?;
        Ok(unit)
    }

    async fn create_unit(&self, unit: NewUnit) -> StoreResult<Unit> {
        let created = sqlx::query_as::<_, Unit>(
            "INSERT INTO units (name, abbreviation) VALUES ($1, $2) RETURNING *",
        )
        .bind(&unit.name)
        .bind(&unit.abbreviation)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_unit(&self, id: i64, mut changes: UnitChanges) -> StoreResult<Option<Unit>> {
        changes.name = changes.name.map(|name| name.trim().to_string());
        changes.abbreviation = changes.abbreviation.map(|a| a.trim().to_string());

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE units SET updated_at = NOW()");
        push_changes!(builder, changes, name, abbreviation);
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL RETURNING *");

        let unit = builder
            .build_query_as::<Unit>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(unit)
    }

    async fn soft_delete_unit(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE units SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_units(&self) -> StoreResult<Vec<Unit>> {
        let units = sqlx::query_as::<_, Unit>(
            "SELECT * FROM units WHERE deleted_at IS NULL ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(units)
    }

    async fn search_units(&self, query: &str) -> StoreResult<Vec<Unit>> {
        if query.trim().is_empty() {
            return self.list_units().await;
        }
        let units = sqlx::query_as::<_, Unit>(
            r#"
            SELECT * FROM units
            WHERE deleted_at IS NULL AND (name ILIKE $1 OR abbreviation ILIKE $1)
            ORDER BY name, id
            "#,
        )
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await?;
        Ok(units)
    }
}
