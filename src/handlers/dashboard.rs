use askama::Template;
use axum::{extract::State, response::Html};
use chrono::Utc;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use tower_cookies::Cookies;

use super::render;
use super::views::{money, qty, Lookup, MovementRow};
use crate::{
    error::AppError,
    middleware::{require_user, CurrentUser},
    services::dashboard::{self, CategoryTotal, MonthlyOrders},
    AppState,
};

pub struct LowStockRow {
    pub product_id: i64,
    pub product: String,
    pub sku: String,
    pub warehouse_code: String,
    pub quantity: String,
    pub reorder_point: String,
}

pub struct CategoryBar {
    pub category: String,
    pub quantity: String,
    // Bar width relative to the largest category
    pub percent: u32,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    current_user: &'a CurrentUser,
    product_count: usize,
    warehouse_count: usize,
    open_orders: usize,
    total_value: String,
    low_stock_count: usize,
    low_stock: Vec<LowStockRow>,
    movements: Vec<MovementRow>,
    categories: Vec<CategoryBar>,
    order_trend: Vec<MonthlyOrders>,
}

fn category_bars(categories: Vec<CategoryTotal>) -> Vec<CategoryBar> {
    let largest = categories
        .iter()
        .map(|c| c.quantity)
        .max()
        .unwrap_or_default();
    categories
        .into_iter()
        .map(|c| {
            let percent = if largest > Decimal::ZERO && c.quantity > Decimal::ZERO {
                (c.quantity * Decimal::ONE_HUNDRED / largest)
                    .round()
                    .to_u32()
                    .unwrap_or(0)
            } else {
                0
            };
            CategoryBar {
                category: c.category,
                quantity: qty(c.quantity),
                percent,
            }
        })
        .collect()
}

pub async fn dashboard(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let store = state.store.as_ref();

    let summary = dashboard::summary(store, Utc::now().date_naive()).await?;
    let lookup = Lookup::load(store).await?;

    let low_stock = summary
        .low_stock
        .into_iter()
        .map(|item| LowStockRow {
            product_id: item.product.id,
            product: item.product.name,
            sku: item.product.sku,
            warehouse_code: item.balance.warehouse_code,
            quantity: qty(item.balance.quantity),
            reorder_point: qty(item.product.reorder_point),
        })
        .collect();

    render(&DashboardTemplate {
        current_user: &current_user,
        product_count: summary.product_count,
        warehouse_count: summary.warehouse_count,
        open_orders: summary.open_orders,
        total_value: money(summary.total_value),
        low_stock_count: summary.low_stock_count,
        low_stock,
        movements: lookup.movement_rows(summary.recent_movements),
        categories: category_bars(summary.categories),
        order_trend: summary.order_trend,
    })
}
