//! Typed access to every persisted entity.
//!
//! Two backends implement the same traits: [`PgStore`] over PostgreSQL and
//! [`MemoryStore`], an in-process store used by the test suite and by
//! `STORAGE=memory`.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{
    BalanceChanges, Category, CategoryChanges, Correction, InventoryBalance, MovementReceipt,
    NewBalance, NewCategory, NewMovement, NewOrder, NewOrderItem, NewProduct, NewUnit, NewUser,
    NewWarehouse, Order, OrderChanges, OrderItem, OrderKind, OutWithoutBalance, Product,
    ProductChanges, StockMovement, Unit, UnitChanges, User, UserChanges, Warehouse,
    WarehouseChanges,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn product(&self, id: i64) -> StoreResult<Option<Product>>;
    async fn product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>>;
    async fn create_product(&self, product: NewProduct) -> StoreResult<Product>;
    async fn update_product(&self, id: i64, changes: ProductChanges)
        -> StoreResult<Option<Product>>;
    async fn soft_delete_product(&self, id: i64) -> StoreResult<bool>;
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>>;

    async fn category(&self, id: i64) -> StoreResult<Option<Category>>;
    async fn category_by_name(&self, name: &str) -> StoreResult<Option<Category>>;
    async fn create_category(&self, category: NewCategory) -> StoreResult<Category>;
    async fn update_category(
        &self,
        id: i64,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>>;
    async fn soft_delete_category(&self, id: i64) -> StoreResult<bool>;
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn search_categories(&self, query: &str) -> StoreResult<Vec<Category>>;

    async fn unit(&self, id: i64) -> StoreResult<Option<Unit>>;
    async fn unit_by_abbreviation(&self, abbreviation: &str) -> StoreResult<Option<Unit>>;
    async fn create_unit(&self, unit: NewUnit) -> StoreResult<Unit>;
    async fn update_unit(&self, id: i64, changes: UnitChanges) -> StoreResult<Option<Unit>>;
    async fn soft_delete_unit(&self, id: i64) -> StoreResult<bool>;
    async fn list_units(&self) -> StoreResult<Vec<Unit>>;
    async fn search_units(&self, query: &str) -> StoreResult<Vec<Unit>>;
}

#[async_trait]
pub trait WarehouseStore: Send + Sync {
    async fn warehouse(&self, code: &str) -> StoreResult<Option<Warehouse>>;
    /// True if any row, soft-deleted or not, already uses the code.
    async fn warehouse_code_taken(&self, code: &str) -> StoreResult<bool>;
    /// Inserts with the code already decided; see `services::warehouses`.
    async fn create_warehouse(&self, code: &str, warehouse: NewWarehouse)
        -> StoreResult<Warehouse>;
    async fn update_warehouse(
        &self,
        code: &str,
        changes: WarehouseChanges,
    ) -> StoreResult<Option<Warehouse>>;
    async fn soft_delete_warehouse(&self, code: &str) -> StoreResult<bool>;
    async fn list_warehouses(&self) -> StoreResult<Vec<Warehouse>>;
    async fn search_warehouses(&self, query: &str) -> StoreResult<Vec<Warehouse>>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn balance(&self, id: i64) -> StoreResult<Option<InventoryBalance>>;
    async fn balance_for(
        &self,
        product_id: i64,
        warehouse_code: &str,
    ) -> StoreResult<Option<InventoryBalance>>;
    async fn create_balance(&self, balance: NewBalance) -> StoreResult<InventoryBalance>;
    async fn update_balance(
        &self,
        id: i64,
        changes: BalanceChanges,
    ) -> StoreResult<Option<InventoryBalance>>;
    async fn delete_balance(&self, id: i64) -> StoreResult<bool>;
    async fn balances_by_product(&self, product_id: i64) -> StoreResult<Vec<InventoryBalance>>;
    async fn balances_by_warehouse(&self, warehouse_code: &str)
        -> StoreResult<Vec<InventoryBalance>>;
    async fn all_balances(&self) -> StoreResult<Vec<InventoryBalance>>;
    /// Replays the ledger and rewrites every balance that disagrees with it,
    /// all while no movement or balance write can interleave. See
    /// [`plan_corrections`](crate::models::inventory::plan_corrections).
    async fn reconcile_balances(&self, policy: OutWithoutBalance)
        -> StoreResult<Vec<Correction>>;

    /// Appends a ledger entry and applies its balance effect as one atomic
    /// unit. Either both happen or neither does.
    async fn record_movement(
        &self,
        movement: NewMovement,
        policy: OutWithoutBalance,
    ) -> StoreResult<MovementReceipt>;
    async fn movement(&self, id: i64) -> StoreResult<Option<StockMovement>>;
    async fn movements_by_product(&self, product_id: i64) -> StoreResult<Vec<StockMovement>>;
    async fn movements_by_warehouse(&self, warehouse_code: &str)
        -> StoreResult<Vec<StockMovement>>;
    async fn recent_movements(&self, limit: i64) -> StoreResult<Vec<StockMovement>>;
    /// The whole ledger in append order.
    async fn ledger(&self) -> StoreResult<Vec<StockMovement>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn order(&self, id: i64) -> StoreResult<Option<Order>>;
    async fn order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>>;
    /// Inserts with the number already decided; see `services::orders`.
    async fn create_order(&self, order_number: &str, order: NewOrder) -> StoreResult<Order>;
    async fn update_order(&self, id: i64, changes: OrderChanges) -> StoreResult<Option<Order>>;
    async fn soft_delete_order(&self, id: i64) -> StoreResult<bool>;
    async fn list_orders(&self) -> StoreResult<Vec<Order>>;
    async fn search_orders(&self, query: &str) -> StoreResult<Vec<Order>>;
    /// Live orders dated on or after `since`.
    async fn orders_since(&self, since: NaiveDate) -> StoreResult<Vec<(NaiveDate, OrderKind)>>;

    async fn order_items(&self, order_id: i64) -> StoreResult<Vec<OrderItem>>;
    async fn add_order_item(&self, item: NewOrderItem) -> StoreResult<OrderItem>;
    async fn delete_order_item(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>>;
    async fn soft_delete_user(&self, id: Uuid) -> StoreResult<bool>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn search_users(&self, query: &str) -> StoreResult<Vec<User>>;
    async fn count_users(&self) -> StoreResult<i64>;
}

pub trait Store: CatalogStore + WarehouseStore + InventoryStore + OrderStore + UserStore {}

impl<T> Store for T where T: CatalogStore + WarehouseStore + InventoryStore + OrderStore + UserStore
{}

pub type SharedStore = Arc<dyn Store>;
