pub mod catalog;
pub mod inventory;
pub mod order;
pub mod product;
pub mod user;
pub mod warehouse;

use rust_decimal::Decimal;
use validator::ValidationError;

pub use catalog::{Category, CategoryChanges, NewCategory, NewUnit, Unit, UnitChanges};
pub use inventory::{
    BalanceChanges, BalanceEffect, Correction, Direction, InventoryBalance, MovementReceipt,
    NewBalance, NewMovement, OutWithoutBalance, StockMovement,
};
pub use order::{NewOrder, NewOrderItem, Order, OrderChanges, OrderItem, OrderKind, OrderStatus};
pub use product::{NewProduct, Product, ProductChanges};
pub use user::{NewUser, Role, User, UserChanges, UserResponse};
pub use warehouse::{NewWarehouse, Warehouse, WarehouseChanges};

pub(crate) fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("non_negative"));
    }
    Ok(())
}

/// Trims a form value and turns blank input into `None`.
pub(crate) fn opt_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
