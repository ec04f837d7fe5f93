//! Read-only views derived from products, balances, movements and orders.
//! Everything is recomputed on each call.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::StoreResult;
use crate::models::{InventoryBalance, OrderKind, Product, StockMovement};
use crate::services::ledger::{recent_movements, DEFAULT_RECENT_LIMIT};
use crate::store::{CatalogStore, InventoryStore, OrderStore, Store, WarehouseStore};

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const TOP_CATEGORIES: usize = 5;
pub const TREND_MONTHS: u32 = 6;

#[derive(Debug, Clone, Serialize)]
pub struct LowStockItem {
    pub product: Product,
    pub balance: InventoryBalance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyOrders {
    /// `YYYY-MM`
    pub month: String,
    pub incoming: i64,
    pub outgoing: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub product_count: usize,
    pub warehouse_count: usize,
    pub open_orders: usize,
    pub total_value: Decimal,
    pub low_stock_count: usize,
    pub low_stock: Vec<LowStockItem>,
    pub recent_movements: Vec<StockMovement>,
    pub categories: Vec<CategoryTotal>,
    pub order_trend: Vec<MonthlyOrders>,
}

async fn live_products(store: &dyn Store) -> StoreResult<HashMap<i64, Product>> {
    Ok(store
        .list_products()
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect())
}

/// Σ quantity × cost over balances of live products.
pub async fn total_inventory_value(store: &dyn Store) -> StoreResult<Decimal> {
    let products = live_products(store).await?;
    let balances = store.all_balances().await?;
    Ok(inventory_value(&products, &balances))
}

fn inventory_value(products: &HashMap<i64, Product>, balances: &[InventoryBalance]) -> Decimal {
    balances
        .iter()
        .filter_map(|b| products.get(&b.product_id).map(|p| b.quantity * p.cost))
        .sum()
}

/// Balances at or below their product's reorder point, by product name then
/// warehouse code.
pub async fn low_stock_items(store: &dyn Store) -> StoreResult<Vec<LowStockItem>> {
    let products = live_products(store).await?;
    let balances = store.all_balances().await?;
    Ok(low_stock(&products, balances))
}

fn low_stock(
    products: &HashMap<i64, Product>,
    balances: Vec<InventoryBalance>,
) -> Vec<LowStockItem> {
    let mut items: Vec<LowStockItem> = balances
        .into_iter()
        .filter_map(|balance| {
            let product = products.get(&balance.product_id)?;
            (balance.quantity <= product.reorder_point).then(|| LowStockItem {
                product: product.clone(),
                balance,
            })
        })
        .collect();
    items.sort_by(|a, b| {
        a.product
            .name
            .cmp(&b.product.name)
            .then_with(|| a.balance.warehouse_code.cmp(&b.balance.warehouse_code))
    });
    items
}

/// On-hand quantity per category name, largest first, at most `limit` rows.
pub async fn inventory_by_category(
    store: &dyn Store,
    limit: usize,
) -> StoreResult<Vec<CategoryTotal>> {
    let products = live_products(store).await?;
    let categories: HashMap<i64, String> = store
        .list_categories()
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let balances = store.all_balances().await?;

    let mut totals: HashMap<String, Decimal> = HashMap::new();
    for balance in &balances {
        let Some(product) = products.get(&balance.product_id) else {
            continue;
        };
        let name = product
            .category_id
            .and_then(|id| categories.get(&id))
            .map(String::as_str)
            .unwrap_or(UNCATEGORIZED);
        *totals.entry(name.to_string()).or_default() += balance.quantity;
    }

    let mut rows: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, quantity)| CategoryTotal { category, quantity })
        .collect();
    rows.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.category.cmp(&b.category))
    });
    rows.truncate(limit);
    Ok(rows)
}

/// First day of the month `back` months before the month of `date`.
fn month_start(date: NaiveDate, back: u32) -> NaiveDate {
    let index = date.year() * 12 + date.month0() as i32 - back as i32;
    NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
        .unwrap_or(date)
}

/// Incoming (purchase) and outgoing (sales) order counts for the `months`
/// calendar months ending with the month of `today`, oldest first.
pub async fn order_trend(
    store: &dyn Store,
    today: NaiveDate,
    months: u32,
) -> StoreResult<Vec<MonthlyOrders>> {
    let months = months.max(1);
    let since = month_start(today, months - 1);
    let orders = store.orders_since(since).await?;
    Ok(bucket_orders(today, months, &orders))
}

fn bucket_orders(today: NaiveDate, months: u32, orders: &[(NaiveDate, OrderKind)]) -> Vec<MonthlyOrders> {
    let mut buckets: Vec<((i32, u32), MonthlyOrders)> = (0..months)
        .rev()
        .map(|back| {
            let start = month_start(today, back);
            (
                (start.year(), start.month()),
                MonthlyOrders {
                    month: start.format("%Y-%m").to_string(),
                    incoming: 0,
                    outgoing: 0,
                },
            )
        })
        .collect();

    for (date, kind) in orders {
        let key = (date.year(), date.month());
        if let Some((_, bucket)) = buckets.iter_mut().find(|(k, _)| *k == key) {
            match kind {
                OrderKind::Purchase => bucket.incoming += 1,
                OrderKind::Sales => bucket.outgoing += 1,
            }
        }
    }
    buckets.into_iter().map(|(_, bucket)| bucket).collect()
}

pub async fn summary(store: &dyn Store, today: NaiveDate) -> StoreResult<DashboardSummary> {
    let products = live_products(store).await?;
    let balances = store.all_balances().await?;
    let warehouse_count = store.list_warehouses().await?.len();
    let open_orders = store
        .list_orders()
        .await?
        .iter()
        .filter(|o| o.status.is_open())
        .count();

    let total_value = inventory_value(&products, &balances);
    let low_stock = low_stock(&products, balances);

    Ok(DashboardSummary {
        product_count: products.len(),
        warehouse_count,
        open_orders,
        total_value,
        low_stock_count: low_stock.len(),
        low_stock,
        recent_movements: recent_movements(store, Some(DEFAULT_RECENT_LIMIT)).await?,
        categories: inventory_by_category(store, TOP_CATEGORIES).await?,
        order_trend: order_trend(store, today, TREND_MONTHS).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_start_crosses_year_boundary() {
        assert_eq!(month_start(date(2024, 3, 17), 0), date(2024, 3, 1));
        assert_eq!(month_start(date(2024, 3, 17), 5), date(2023, 10, 1));
        assert_eq!(month_start(date(2024, 1, 31), 1), date(2023, 12, 1));
    }

    #[test]
    fn orders_land_in_their_month() {
        let orders = vec![
            (date(2024, 3, 2), OrderKind::Purchase),
            (date(2024, 3, 30), OrderKind::Sales),
            (date(2024, 3, 30), OrderKind::Sales),
            (date(2023, 10, 1), OrderKind::Purchase),
            (date(2023, 9, 30), OrderKind::Purchase),
        ];
        let trend = bucket_orders(date(2024, 3, 17), 6, &orders);

        let months: Vec<&str> = trend.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(
            months,
            ["2023-10", "2023-11", "2023-12", "2024-01", "2024-02", "2024-03"]
        );
        assert_eq!(trend[0].incoming, 1);
        assert_eq!(trend[5].incoming, 1);
        assert_eq!(trend[5].outgoing, 2);
        assert!(trend[1..5].iter().all(|m| m.incoming == 0 && m.outgoing == 0));
    }
}
