use std::collections::HashMap;

use askama::Template;
use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_cookies::Cookies;

use super::forms::{self, rejected, Choice, SearchQuery};
use super::render;
use super::views::{money, qty, BalanceRow, Lookup, MovementRow};
use crate::{
    error::{AppError, StoreResult},
    middleware::{require_user, CurrentUser},
    models::{InventoryBalance, NewProduct, Product, ProductChanges},
    services,
    store::{CatalogStore, InventoryStore, Store},
    AppState,
};

pub struct ProductRow {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub price: String,
    pub cost: String,
    pub reorder_point: String,
    pub on_hand: String,
    pub is_active: bool,
}

#[derive(Template)]
#[template(path = "products/list.html")]
struct ProductsTemplate<'a> {
    current_user: &'a CurrentUser,
    products: Vec<ProductRow>,
    query: String,
}

#[derive(Template)]
#[template(path = "products/form.html")]
struct ProductFormTemplate<'a> {
    current_user: &'a CurrentUser,
    title: String,
    action: String,
    form: ProductForm,
    categories: Vec<Choice>,
    units: Vec<Choice>,
    error: String,
}

#[derive(Template)]
#[template(path = "products/detail.html")]
struct ProductDetailTemplate<'a> {
    current_user: &'a CurrentUser,
    product: ProductRow,
    description: String,
    barcode: String,
    dimensions: String,
    min_stock: String,
    max_stock: String,
    lead_time: String,
    balances: Vec<BalanceRow>,
    movements: Vec<MovementRow>,
}

// Every field arrives as text; numbers are parsed in `to_new_product`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub barcode: String,
    pub category_id: String,
    pub unit_id: String,
    pub price: String,
    pub cost: String,
    pub weight: String,
    pub length: String,
    pub width: String,
    pub height: String,
    pub min_stock: String,
    pub max_stock: String,
    pub reorder_point: String,
    pub lead_time_days: String,
    pub is_active: Option<String>,
}

impl ProductForm {
    fn to_new_product(&self) -> Result<NewProduct, AppError> {
        Ok(NewProduct {
            sku: self.sku.clone(),
            name: self.name.clone(),
            description: forms::text(&self.description),
            barcode: forms::text(&self.barcode),
            category_id: forms::optional_id("category", &self.category_id)?,
            unit_id: forms::optional_id("unit", &self.unit_id)?,
            price: forms::decimal("price", &self.price)?,
            cost: forms::decimal("cost", &self.cost)?,
            weight: forms::optional_decimal("weight", &self.weight)?,
            length: forms::optional_decimal("length", &self.length)?,
            width: forms::optional_decimal("width", &self.width)?,
            height: forms::optional_decimal("height", &self.height)?,
            min_stock: forms::decimal("minimum stock", &self.min_stock)?,
            max_stock: forms::decimal("maximum stock", &self.max_stock)?,
            reorder_point: forms::decimal("reorder point", &self.reorder_point)?,
            lead_time_days: forms::optional_int("lead time", &self.lead_time_days)?,
            is_active: forms::checkbox(&self.is_active),
        })
    }
}

impl From<Product> for ProductForm {
    fn from(product: Product) -> Self {
        let text = |value: Option<Decimal>| value.map(qty).unwrap_or_default();
        Self {
            sku: product.sku,
            name: product.name,
            description: product.description.unwrap_or_default(),
            barcode: product.barcode.unwrap_or_default(),
            category_id: product.category_id.map(|id| id.to_string()).unwrap_or_default(),
            unit_id: product.unit_id.map(|id| id.to_string()).unwrap_or_default(),
            price: qty(product.price),
            cost: qty(product.cost),
            weight: text(product.weight),
            length: text(product.length),
            width: text(product.width),
            height: text(product.height),
            min_stock: qty(product.min_stock),
            max_stock: qty(product.max_stock),
            reorder_point: qty(product.reorder_point),
            lead_time_days: product
                .lead_time_days
                .map(|d| d.to_string())
                .unwrap_or_default(),
            is_active: product.is_active.then(|| "on".to_string()),
        }
    }
}

/// Category names and unit abbreviations by id.
struct CatalogNames {
    categories: Vec<(i64, String)>,
    units: Vec<(i64, String)>,
}

impl CatalogNames {
    async fn load(store: &dyn Store) -> StoreResult<Self> {
        let categories = store
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let units = store
            .list_units()
            .await?
            .into_iter()
            .map(|u| (u.id, u.abbreviation))
            .collect();
        Ok(Self { categories, units })
    }

    fn category(&self, id: Option<i64>) -> String {
        id.and_then(|id| self.categories.iter().find(|(cid, _)| *cid == id))
            .map(|(_, name)| name.clone())
            .unwrap_or_default()
    }

    fn unit(&self, id: Option<i64>) -> String {
        id.and_then(|id| self.units.iter().find(|(uid, _)| *uid == id))
            .map(|(_, abbr)| abbr.clone())
            .unwrap_or_default()
    }

    fn category_choices(&self) -> Vec<Choice> {
        self.categories
            .iter()
            .map(|(id, name)| Choice::new(id, name.clone()))
            .collect()
    }

    fn unit_choices(&self) -> Vec<Choice> {
        self.units
            .iter()
            .map(|(id, abbr)| Choice::new(id, abbr.clone()))
            .collect()
    }

    fn row(&self, product: &Product, on_hand: Decimal) -> ProductRow {
        ProductRow {
            id: product.id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            category: self.category(product.category_id),
            unit: self.unit(product.unit_id),
            price: money(product.price),
            cost: money(product.cost),
            reorder_point: qty(product.reorder_point),
            on_hand: qty(on_hand),
            is_active: product.is_active,
        }
    }
}

fn on_hand_by_product(balances: &[InventoryBalance]) -> HashMap<i64, Decimal> {
    let mut totals: HashMap<i64, Decimal> = HashMap::new();
    for balance in balances {
        *totals.entry(balance.product_id).or_default() += balance.quantity;
    }
    totals
}

pub async fn products_list(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let store = state.store.as_ref();

    let products = store.search_products(&query.q).await?;
    let names = CatalogNames::load(store).await?;
    let on_hand = on_hand_by_product(&store.all_balances().await?);

    let products = products
        .iter()
        .map(|p| names.row(p, on_hand.get(&p.id).copied().unwrap_or_default()))
        .collect();

    render(&ProductsTemplate {
        current_user: &current_user,
        products,
        query: query.q,
    })
}

async fn render_form(
    state: &AppState,
    current_user: &CurrentUser,
    title: &str,
    action: String,
    form: ProductForm,
    error: String,
) -> Result<Html<String>, AppError> {
    let names = CatalogNames::load(state.store.as_ref()).await?;
    render(&ProductFormTemplate {
        current_user,
        title: title.to_string(),
        action,
        form,
        categories: names.category_choices(),
        units: names.unit_choices(),
        error,
    })
}

pub async fn product_form(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let form = ProductForm {
        is_active: Some("on".to_string()),
        ..Default::default()
    };
    render_form(
        &state,
        &current_user,
        "New product",
        "/products".to_string(),
        form,
        String::new(),
    )
    .await
}

pub async fn create_product(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<ProductForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;

    let result = async {
        let product = form.to_new_product()?;
        Ok::<_, AppError>(services::catalog::create_product(state.store.as_ref(), product).await?)
    }
    .await;

    match result {
        Ok(product) => Ok(Redirect::to(&format!("/products/{}", product.id)).into_response()),
        Err(err) => {
            let (status, message) = rejected(err)?;
            let page = render_form(
                &state,
                &current_user,
                "New product",
                "/products".to_string(),
                form,
                message,
            )
            .await?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn product_detail(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let store = state.store.as_ref();

    let product = store.product(id).await?.ok_or(AppError::NotFound)?;
    let balances = store.balances_by_product(id).await?;
    let movements = store.movements_by_product(id).await?;

    let names = CatalogNames::load(store).await?;
    let lookup = Lookup::load(store).await?;
    let on_hand: Decimal = balances.iter().map(|b| b.quantity).sum();

    let dimensions = match (product.length, product.width, product.height) {
        (Some(l), Some(w), Some(h)) => format!("{} × {} × {}", qty(l), qty(w), qty(h)),
        _ => String::new(),
    };

    render(&ProductDetailTemplate {
        current_user: &current_user,
        product: names.row(&product, on_hand),
        description: product.description.clone().unwrap_or_default(),
        barcode: product.barcode.clone().unwrap_or_default(),
        dimensions,
        min_stock: qty(product.min_stock),
        max_stock: qty(product.max_stock),
        lead_time: product
            .lead_time_days
            .map(|d| format!("{d} days"))
            .unwrap_or_default(),
        balances: lookup.balance_rows(balances),
        movements: lookup.movement_rows(movements),
    })
}

pub async fn product_edit_form(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let product = state
        .store
        .product(id)
        .await?
        .ok_or(AppError::NotFound)?;

    render_form(
        &state,
        &current_user,
        "Edit product",
        format!("/products/{id}"),
        ProductForm::from(product),
        String::new(),
    )
    .await
}

pub async fn update_product(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Form(form): Form<ProductForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;

    let result = async {
        let changes = ProductChanges::replace_with(form.to_new_product()?.normalized());
        Ok::<_, AppError>(
            services::catalog::update_product(state.store.as_ref(), id, changes).await?,
        )
    }
    .await;

    match result {
        Ok(Some(_)) => Ok(Redirect::to(&format!("/products/{id}")).into_response()),
        Ok(None) => Err(AppError::NotFound),
        Err(err) => {
            let (status, message) = rejected(err)?;
            let page = render_form(
                &state,
                &current_user,
                "Edit product",
                format!("/products/{id}"),
                form,
                message,
            )
            .await?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn delete_product(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    if !state.store.soft_delete_product(id).await? {
        return Err(AppError::NotFound);
    }
    log::info!("product {} deleted by {}", id, current_user.username);
    Ok(Redirect::to("/products"))
}
