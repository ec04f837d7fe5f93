use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::{duplicate, search, MemoryStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{NewOrder, NewOrderItem, Order, OrderChanges, OrderItem, OrderKind};
use crate::store::OrderStore;

#[async_trait]
impl OrderStore for MemoryStore {
    async fn order(&self, id: i64) -> StoreResult<Option<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.get(&id).filter(|o| o.deleted_at.is_none()).cloned())
    }

    async fn order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .values()
            .find(|o| o.deleted_at.is_none() && o.order_number == order_number)
            .cloned())
    }

    async fn create_order(&self, order_number: &str, order: NewOrder) -> StoreResult<Order> {
        let mut tables = self.tables.lock().await;
        if tables.orders.values().any(|o| o.order_number == order_number) {
            return Err(duplicate("order number", order_number));
        }
        let now = Utc::now();
        let id = tables.next_id();
        let created = Order {
            id,
            order_number: order_number.to_string(),
            kind: order.kind,
            status: order.status,
            order_date: order.order_date,
            notes: order.notes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.orders.insert(id, created.clone());
        Ok(created)
    }

    async fn update_order(&self, id: i64, changes: OrderChanges) -> StoreResult<Option<Order>> {
        let mut tables = self.tables.lock().await;
        let Some(order) = tables.orders.get_mut(&id).filter(|o| o.deleted_at.is_none()) else {
            return Ok(None);
        };
        changes.apply_to(order);
        Ok(Some(order.clone()))
    }

    async fn soft_delete_order(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.orders.get_mut(&id) {
            Some(order) if order.deleted_at.is_none() => {
                order.deleted_at = Some(Utc::now());
                true
            }
            _ => false,
        })
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        self.search_orders("").await
    }

    async fn search_orders(&self, query: &str) -> StoreResult<Vec<Order>> {
        let tables = self.tables.lock().await;
        let mut orders = search(
            tables.orders.values().filter(|o| o.deleted_at.is_none()),
            query,
            Order::matches,
        );
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn orders_since(&self, since: NaiveDate) -> StoreResult<Vec<(NaiveDate, OrderKind)>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.deleted_at.is_none() && o.order_date >= since)
            .map(|o| (o.order_date, o.kind))
            .collect())
    }

    async fn order_items(&self, order_id: i64) -> StoreResult<Vec<OrderItem>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .order_items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn add_order_item(&self, item: NewOrderItem) -> StoreResult<OrderItem> {
        let mut tables = self.tables.lock().await;
        if !tables.orders.contains_key(&item.order_id) {
            return Err(StoreError::StorageFailure(format!(
                "order {} does not exist",
                item.order_id
            )));
        }
        tables.require_product(item.product_id)?;
        let id = tables.next_id();
        let created = OrderItem {
            id,
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        };
        tables.order_items.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_order_item(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        Ok(tables.order_items.remove(&id).is_some())
    }
}
