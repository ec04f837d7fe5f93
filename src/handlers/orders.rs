use askama::Template;
use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use strum::IntoEnumIterator;
use tower_cookies::Cookies;

use super::forms::{self, rejected, Choice, SearchQuery};
use super::render;
use super::views::{money, qty, Lookup};
use crate::{
    error::AppError,
    middleware::{require_user, CurrentUser},
    models::{NewOrder, NewOrderItem, Order, OrderChanges, OrderKind, OrderStatus},
    services,
    store::OrderStore,
    AppState,
};

pub struct OrderRow {
    pub id: i64,
    pub order_number: String,
    pub kind: String,
    pub status: String,
    pub order_date: String,
    pub notes: String,
    pub is_open: bool,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            kind: order.kind.to_string(),
            status: order.status.to_string(),
            order_date: order.order_date.format("%Y-%m-%d").to_string(),
            notes: order.notes.clone().unwrap_or_default(),
            is_open: order.status.is_open(),
        }
    }
}

pub struct ItemRow {
    pub id: i64,
    pub product: String,
    pub quantity: String,
    pub unit_price: String,
    pub line_total: String,
}

#[derive(Template)]
#[template(path = "orders/list.html")]
struct OrdersTemplate<'a> {
    current_user: &'a CurrentUser,
    orders: Vec<OrderRow>,
    query: String,
}

#[derive(Template)]
#[template(path = "orders/form.html")]
struct OrderFormTemplate<'a> {
    current_user: &'a CurrentUser,
    form: OrderForm,
    kinds: Vec<Choice>,
    statuses: Vec<Choice>,
    error: String,
}

#[derive(Template)]
#[template(path = "orders/detail.html")]
struct OrderDetailTemplate<'a> {
    current_user: &'a CurrentUser,
    order: OrderRow,
    form: OrderForm,
    items: Vec<ItemRow>,
    total: String,
    kinds: Vec<Choice>,
    statuses: Vec<Choice>,
    products: Vec<Choice>,
    error: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderForm {
    pub order_number: String,
    pub kind: String,
    pub status: String,
    pub order_date: String,
    pub notes: String,
}

impl OrderForm {
    fn kind(&self) -> Result<OrderKind, AppError> {
        self.kind
            .parse()
            .map_err(|_| AppError::BadRequest("order kind must be purchase or sales".to_string()))
    }

    fn status(&self) -> Result<OrderStatus, AppError> {
        if self.status.trim().is_empty() {
            return Ok(OrderStatus::default());
        }
        self.status
            .parse()
            .map_err(|_| AppError::BadRequest(format!("unknown order status {}", self.status)))
    }

    fn order_date(&self) -> Result<NaiveDate, AppError> {
        let value = self.order_date.trim();
        if value.is_empty() {
            return Ok(Utc::now().date_naive());
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest("order date must be YYYY-MM-DD".to_string()))
    }

    fn to_new_order(&self) -> Result<NewOrder, AppError> {
        Ok(NewOrder {
            order_number: forms::text(&self.order_number),
            kind: self.kind()?,
            status: self.status()?,
            order_date: self.order_date()?,
            notes: forms::text(&self.notes),
        })
    }

    fn to_changes(&self) -> Result<OrderChanges, AppError> {
        Ok(OrderChanges {
            kind: Some(self.kind()?),
            status: Some(self.status()?),
            order_date: Some(self.order_date()?),
            notes: Some(forms::text(&self.notes)),
        })
    }
}

impl From<&Order> for OrderForm {
    fn from(order: &Order) -> Self {
        let row = OrderRow::from(order);
        Self {
            order_number: row.order_number,
            kind: row.kind,
            status: row.status,
            order_date: row.order_date,
            notes: row.notes,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemForm {
    pub product_id: String,
    pub quantity: String,
    pub unit_price: String,
}

fn kind_choices() -> Vec<Choice> {
    OrderKind::iter().map(|k| Choice::new(k, k.to_string())).collect()
}

fn status_choices() -> Vec<Choice> {
    OrderStatus::iter()
        .map(|s| Choice::new(s, s.to_string()))
        .collect()
}

pub async fn orders_list(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let orders = state.store.search_orders(&query.q).await?;
    render(&OrdersTemplate {
        current_user: &current_user,
        orders: orders.iter().map(OrderRow::from).collect(),
        query: query.q,
    })
}

pub async fn order_form(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let form = OrderForm {
        kind: OrderKind::Purchase.to_string(),
        status: OrderStatus::default().to_string(),
        order_date: Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        ..Default::default()
    };
    render(&OrderFormTemplate {
        current_user: &current_user,
        form,
        kinds: kind_choices(),
        statuses: status_choices(),
        error: String::new(),
    })
}

pub async fn create_order(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<OrderForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;

    let result = async {
        let order = form.to_new_order()?;
        Ok::<_, AppError>(services::orders::create_order(state.store.as_ref(), order).await?)
    }
    .await;

    match result {
        Ok(order) => Ok(Redirect::to(&format!("/orders/{}", order.id)).into_response()),
        Err(err) => {
            let (status, message) = rejected(err)?;
            let page = render(&OrderFormTemplate {
                current_user: &current_user,
                form,
                kinds: kind_choices(),
                statuses: status_choices(),
                error: message,
            })?;
            Ok((status, page).into_response())
        }
    }
}

async fn render_detail(
    state: &AppState,
    current_user: &CurrentUser,
    order: &Order,
    form: OrderForm,
    error: String,
) -> Result<Html<String>, AppError> {
    let store = state.store.as_ref();
    let items = store.order_items(order.id).await?;
    let lookup = Lookup::load(store).await?;
    let total = services::orders::order_total(&items);

    let items = items
        .iter()
        .map(|item| ItemRow {
            id: item.id,
            product: lookup
                .products
                .get(&item.product_id)
                .map(|p| format!("{} ({})", p.name, p.sku))
                .unwrap_or_else(|| format!("#{} (deleted)", item.product_id)),
            quantity: qty(item.quantity),
            unit_price: money(item.unit_price),
            line_total: money(item.line_total()),
        })
        .collect();

    render(&OrderDetailTemplate {
        current_user,
        order: OrderRow::from(order),
        form,
        items,
        total: money(total),
        kinds: kind_choices(),
        statuses: status_choices(),
        products: lookup.product_choices(),
        error,
    })
}

pub async fn order_detail(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let order = state.store.order(id).await?.ok_or(AppError::NotFound)?;
    render_detail(&state, &current_user, &order, OrderForm::from(&order), String::new()).await
}

pub async fn update_order(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Form(form): Form<OrderForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let order = state.store.order(id).await?.ok_or(AppError::NotFound)?;

    let result = async {
        let changes = form.to_changes()?;
        Ok::<_, AppError>(services::orders::update_order(state.store.as_ref(), id, changes).await?)
    }
    .await;

    match result {
        Ok(Some(_)) => Ok(Redirect::to(&format!("/orders/{id}")).into_response()),
        Ok(None) => Err(AppError::NotFound),
        Err(err) => {
            let (status, message) = rejected(err)?;
            let page = render_detail(&state, &current_user, &order, form, message).await?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn delete_order(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    if !state.store.soft_delete_order(id).await? {
        return Err(AppError::NotFound);
    }
    log::info!("order {} deleted by {}", id, current_user.username);
    Ok(Redirect::to("/orders"))
}

pub async fn add_item(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Form(form): Form<ItemForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let order = state.store.order(id).await?.ok_or(AppError::NotFound)?;

    let result = async {
        let item = NewOrderItem {
            order_id: id,
            product_id: forms::id("product", &form.product_id)?,
            quantity: forms::decimal("quantity", &form.quantity)?,
            unit_price: forms::decimal("unit price", &form.unit_price)?,
        };
        Ok::<_, AppError>(services::orders::add_item(state.store.as_ref(), item).await?)
    }
    .await;

    match result {
        Ok(_) => Ok(Redirect::to(&format!("/orders/{id}")).into_response()),
        Err(err) => {
            let (status, message) = rejected(err)?;
            let page = render_detail(
                &state,
                &current_user,
                &order,
                OrderForm::from(&order),
                message,
            )
            .await?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn remove_item(
    State(state): State<AppState>,
    cookies: Cookies,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<Redirect, AppError> {
    require_user(&cookies, &state).await?;
    let belongs = state
        .store
        .order_items(id)
        .await?
        .iter()
        .any(|item| item.id == item_id);
    if !belongs || !state.store.delete_order_item(item_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Redirect::to(&format!("/orders/{id}")))
}
