use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{StoreError, StoreResult};
use crate::models::{opt_string, NewOrder, NewOrderItem, Order, OrderChanges, OrderItem};
use crate::store::{CatalogStore, OrderStore, Store};
use crate::utils::{is_valid_code, random_token};

const SUFFIX_LENGTH: usize = 6;
const MAX_ATTEMPTS: usize = 5;

/// `ORD-YYYYMMDD-XXXXXX`
pub fn generate_order_number(date: NaiveDate) -> String {
    format!(
        "ORD-{}-{}",
        date.format("%Y%m%d"),
        random_token(&mut rand::thread_rng(), SUFFIX_LENGTH)
    )
}

pub async fn create_order(store: &dyn Store, order: NewOrder) -> StoreResult<Order> {
    let order = order.normalized();

    let created = match order.order_number.clone() {
        Some(number) => {
            if !is_valid_code(&number) {
                return Err(StoreError::ValidationFailure(
                    "order number may only contain letters, digits, '-' and '_'".to_string(),
                ));
            }
            store.create_order(&number, order).await?
        }
        None => create_with_generated_number(store, order).await?,
    };

    log::info!(
        "created {} order {} ({})",
        created.kind,
        created.order_number,
        created.id
    );
    Ok(created)
}

async fn create_with_generated_number(store: &dyn Store, order: NewOrder) -> StoreResult<Order> {
    let mut last_error = None;
    for _ in 0..MAX_ATTEMPTS {
        let number = generate_order_number(order.order_date);
        match store.create_order(&number, order.clone()).await {
            Ok(created) => return Ok(created),
            Err(StoreError::ConstraintViolation(message)) => {
                log::warn!("order number {} collided, retrying", number);
                last_error = Some(StoreError::ConstraintViolation(message));
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        StoreError::ConstraintViolation("could not generate an unused order number".to_string())
    }))
}

pub async fn update_order(
    store: &dyn Store,
    id: i64,
    mut changes: OrderChanges,
) -> StoreResult<Option<Order>> {
    if let Some(notes) = changes.notes.take() {
        changes.notes = Some(opt_string(notes));
    }
    let updated = store.update_order(id, changes).await?;
    if let Some(order) = &updated {
        log::info!("order {} is now {}", order.order_number, order.status);
    }
    Ok(updated)
}

pub async fn add_item(store: &dyn Store, item: NewOrderItem) -> StoreResult<OrderItem> {
    if item.quantity <= Decimal::ZERO {
        return Err(StoreError::ValidationFailure(
            "item quantity must be greater than zero".to_string(),
        ));
    }
    if item.unit_price < Decimal::ZERO {
        return Err(StoreError::ValidationFailure(
            "unit price must not be negative".to_string(),
        ));
    }
    if store.order(item.order_id).await?.is_none() {
        return Err(StoreError::ValidationFailure(format!(
            "order {} does not exist",
            item.order_id
        )));
    }
    if store.product(item.product_id).await?.is_none() {
        return Err(StoreError::ValidationFailure(format!(
            "product {} does not exist",
            item.product_id
        )));
    }
    store.add_order_item(item).await
}

pub fn order_total(items: &[OrderItem]) -> Decimal {
    items.iter().map(OrderItem::line_total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_number_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        let number = generate_order_number(date);
        assert!(number.starts_with("ORD-20240509-"));
        assert_eq!(number.len(), "ORD-20240509-".len() + SUFFIX_LENGTH);
    }

    #[test]
    fn total_sums_line_totals() {
        let item = |quantity, unit_price| OrderItem {
            id: 0,
            order_id: 1,
            product_id: 1,
            quantity,
            unit_price,
        };
        let items = vec![item(dec!(2), dec!(3.50)), item(dec!(1), dec!(10))];
        assert_eq!(order_total(&items), dec!(17.00));
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }
}
