use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};

use super::{like_pattern, PgStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{NewOrder, NewOrderItem, Order, OrderChanges, OrderItem, OrderKind};
use crate::store::OrderStore;

#[async_trait]
impl OrderStore for PgStore {
    async fn order(&self, id: i64) -> StoreResult<Option<Order>> {
        let order =
            sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(order)
    }

    async fn order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE order_number = $1 AND deleted_at IS NULL",
        )
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn create_order(&self, order_number: &str, order: NewOrder) -> StoreResult<Order> {
        let created = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (order_number, kind, status, order_date, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(order_number)
        .bind(order.kind.to_string())
        .bind(order.status.to_string())
        .bind(order.order_date)
        .bind(&order.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_order(&self, id: i64, changes: OrderChanges) -> StoreResult<Option<Order>> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE orders SET updated_at = NOW()");
        if let Some(kind) = changes.kind {
            builder.push(", kind = ").push_bind(kind.to_string());
        }
        if let Some(status) = changes.status {
            builder.push(", status = ").push_bind(status.to_string());
        }
        if let Some(order_date) = changes.order_date {
            builder.push(", order_date = ").push_bind(order_date);
        }
        if let Some(notes) = changes.notes {
            builder.push(", notes = ").push_bind(notes);
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL RETURNING *");

        let order = builder
            .build_query_as::<Order>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn soft_delete_order(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE deleted_at IS NULL ORDER BY order_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn search_orders(&self, query: &str) -> StoreResult<Vec<Order>> {
        if query.trim().is_empty() {
            return self.list_orders().await;
        }
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE deleted_at IS NULL AND (order_number ILIKE $1 OR notes ILIKE $1)
            ORDER BY order_date DESC, id DESC
            "#,
        )
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn orders_since(&self, since: NaiveDate) -> StoreResult<Vec<(NaiveDate, OrderKind)>> {
        let rows = sqlx::query_as::<_, (NaiveDate, String)>(
            "SELECT order_date, kind FROM orders WHERE deleted_at IS NULL AND order_date >= $1",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(date, kind)| {
                OrderKind::try_from(kind)
                    .map(|kind| (date, kind))
                    .map_err(|e| StoreError::StorageFailure(e.to_string()))
            })
            .collect()
    }

    async fn order_items(&self, order_id: i64) -> StoreResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn add_order_item(&self, item: NewOrderItem) -> StoreResult<OrderItem> {
        let created = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn delete_order_item(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM order_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
