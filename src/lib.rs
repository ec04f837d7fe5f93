pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use config::Config;
use store::SharedStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: SharedStore, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        // Public routes (no authentication required)
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route("/health", get(handlers::api::health))
        .route("/login", get(handlers::auth::login_page))
        .route("/login", post(handlers::auth::login))
        .route("/register", get(handlers::auth::register_page))
        .route("/register", post(handlers::auth::register))
        .route("/logout", post(handlers::auth::logout))
        // Protected routes (authentication required)
        .route("/dashboard", get(handlers::dashboard::dashboard))
        // Catalog
        .route("/products", get(handlers::products::products_list))
        .route("/products", post(handlers::products::create_product))
        .route("/products/new", get(handlers::products::product_form))
        .route("/products/:id", get(handlers::products::product_detail))
        .route("/products/:id", post(handlers::products::update_product))
        .route("/products/:id/edit", get(handlers::products::product_edit_form))
        .route("/products/:id/delete", post(handlers::products::delete_product))
        .route("/categories", get(handlers::catalog::categories_list))
        .route("/categories", post(handlers::catalog::create_category))
        .route("/categories/new", get(handlers::catalog::category_form))
        .route("/categories/:id", post(handlers::catalog::update_category))
        .route("/categories/:id/edit", get(handlers::catalog::category_edit_form))
        .route("/categories/:id/delete", post(handlers::catalog::delete_category))
        .route("/units", get(handlers::catalog::units_list))
        .route("/units", post(handlers::catalog::create_unit))
        .route("/units/new", get(handlers::catalog::unit_form))
        .route("/units/:id", post(handlers::catalog::update_unit))
        .route("/units/:id/edit", get(handlers::catalog::unit_edit_form))
        .route("/units/:id/delete", post(handlers::catalog::delete_unit))
        // Warehouses
        .route("/warehouses", get(handlers::warehouses::warehouses_list))
        .route("/warehouses", post(handlers::warehouses::create_warehouse))
        .route("/warehouses/new", get(handlers::warehouses::warehouse_form))
        .route("/warehouses/:code", get(handlers::warehouses::warehouse_detail))
        .route("/warehouses/:code", post(handlers::warehouses::update_warehouse))
        .route("/warehouses/:code/edit", get(handlers::warehouses::warehouse_edit_form))
        .route("/warehouses/:code/delete", post(handlers::warehouses::delete_warehouse))
        // Inventory balances and the movement ledger
        .route("/inventory", get(handlers::inventory::balances_list))
        .route("/inventory", post(handlers::inventory::create_balance))
        .route("/inventory/new", get(handlers::inventory::balance_form))
        .route("/inventory/reconcile", post(handlers::inventory::reconcile))
        .route("/inventory/:id", post(handlers::inventory::update_balance))
        .route("/inventory/:id/edit", get(handlers::inventory::balance_edit_form))
        .route("/inventory/:id/delete", post(handlers::inventory::delete_balance))
        .route("/movements", get(handlers::movements::movements_list))
        .route("/movements", post(handlers::movements::create_movement))
        .route("/movements/new", get(handlers::movements::movement_form))
        // Orders
        .route("/orders", get(handlers::orders::orders_list))
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders/new", get(handlers::orders::order_form))
        .route("/orders/:id", get(handlers::orders::order_detail))
        .route("/orders/:id", post(handlers::orders::update_order))
        .route("/orders/:id/delete", post(handlers::orders::delete_order))
        .route("/orders/:id/items", post(handlers::orders::add_item))
        .route(
            "/orders/:id/items/:item_id/delete",
            post(handlers::orders::remove_item),
        )
        // User management (admin only)
        .route("/users", get(handlers::users::users_list))
        .route("/users", post(handlers::users::create_user))
        .route("/users/new", get(handlers::users::user_form))
        .route("/users/:id", post(handlers::users::update_user))
        .route("/users/:id/edit", get(handlers::users::user_edit_form))
        .route("/users/:id/delete", post(handlers::users::delete_user))
        // JSON API
        .route("/api/products", get(handlers::api::list_products))
        .route("/api/products/:id", get(handlers::api::get_product))
        .route("/api/inventory", get(handlers::api::list_balances))
        .route("/api/inventory/reconcile", post(handlers::api::reconcile))
        .route("/api/movements", post(handlers::api::record_movement))
        .route("/api/movements/recent", get(handlers::api::recent_movements))
        .route("/api/dashboard", get(handlers::api::dashboard))
        // Static files
        .nest_service("/static", ServeDir::new(static_dir))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(1024 * 1024)),
        )
        .with_state(state)
}
