use askama::Template;
use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_cookies::Cookies;

use super::forms::{self, rejected, SearchQuery};
use super::render;
use super::views::{qty, BalanceRow, Lookup, MovementRow};
use crate::{
    error::AppError,
    middleware::{require_user, CurrentUser},
    models::{NewWarehouse, Warehouse, WarehouseChanges},
    services,
    store::{InventoryStore, WarehouseStore},
    AppState,
};

pub struct WarehouseRow {
    pub code: String,
    pub name: String,
    pub location: String,
    pub products: usize,
    pub on_hand: String,
}

#[derive(Template)]
#[template(path = "warehouses/list.html")]
struct WarehousesTemplate<'a> {
    current_user: &'a CurrentUser,
    warehouses: Vec<WarehouseRow>,
    query: String,
}

#[derive(Template)]
#[template(path = "warehouses/form.html")]
struct WarehouseFormTemplate<'a> {
    current_user: &'a CurrentUser,
    title: &'a str,
    action: String,
    // The code is only editable on creation
    is_new: bool,
    form: WarehouseForm,
    error: String,
}

#[derive(Template)]
#[template(path = "warehouses/detail.html")]
struct WarehouseDetailTemplate<'a> {
    current_user: &'a CurrentUser,
    warehouse: WarehouseRow,
    balances: Vec<BalanceRow>,
    movements: Vec<MovementRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WarehouseForm {
    pub code: String,
    pub name: String,
    pub location: String,
}

impl From<Warehouse> for WarehouseForm {
    fn from(warehouse: Warehouse) -> Self {
        Self {
            code: warehouse.code,
            name: warehouse.name,
            location: warehouse.location.unwrap_or_default(),
        }
    }
}

async fn warehouse_row(state: &AppState, warehouse: Warehouse) -> Result<WarehouseRow, AppError> {
    let balances = state.store.balances_by_warehouse(&warehouse.code).await?;
    Ok(WarehouseRow {
        products: balances.len(),
        on_hand: qty(balances.iter().map(|b| b.quantity).sum()),
        code: warehouse.code,
        name: warehouse.name,
        location: warehouse.location.unwrap_or_default(),
    })
}

pub async fn warehouses_list(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;

    let mut warehouses = Vec::new();
    for warehouse in state.store.search_warehouses(&query.q).await? {
        warehouses.push(warehouse_row(&state, warehouse).await?);
    }

    render(&WarehousesTemplate {
        current_user: &current_user,
        warehouses,
        query: query.q,
    })
}

pub async fn warehouse_form(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    render(&WarehouseFormTemplate {
        current_user: &current_user,
        title: "New warehouse",
        action: "/warehouses".to_string(),
        is_new: true,
        form: WarehouseForm::default(),
        error: String::new(),
    })
}

pub async fn create_warehouse(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<WarehouseForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;

    let warehouse = NewWarehouse {
        code: forms::text(&form.code),
        name: form.name.clone(),
        location: forms::text(&form.location),
    };
    match services::warehouses::create_warehouse(state.store.as_ref(), warehouse).await {
        Ok(created) => {
            Ok(Redirect::to(&format!("/warehouses/{}", created.code)).into_response())
        }
        Err(err) => {
            let (status, message) = rejected(err.into())?;
            let page = render(&WarehouseFormTemplate {
                current_user: &current_user,
                title: "New warehouse",
                action: "/warehouses".to_string(),
                is_new: true,
                form,
                error: message,
            })?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn warehouse_detail(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(code): Path<String>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let store = state.store.as_ref();

    let warehouse = store
        .warehouse(&code.to_uppercase())
        .await?
        .ok_or(AppError::NotFound)?;
    let balances = store.balances_by_warehouse(&warehouse.code).await?;
    let movements = store.movements_by_warehouse(&warehouse.code).await?;
    let lookup = Lookup::load(store).await?;

    render(&WarehouseDetailTemplate {
        current_user: &current_user,
        warehouse: warehouse_row(&state, warehouse).await?,
        balances: lookup.balance_rows(balances),
        movements: lookup.movement_rows(movements),
    })
}

pub async fn warehouse_edit_form(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(code): Path<String>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let warehouse = state
        .store
        .warehouse(&code.to_uppercase())
        .await?
        .ok_or(AppError::NotFound)?;

    render(&WarehouseFormTemplate {
        current_user: &current_user,
        title: "Edit warehouse",
        action: format!("/warehouses/{}", warehouse.code),
        is_new: false,
        form: WarehouseForm::from(warehouse),
        error: String::new(),
    })
}

pub async fn update_warehouse(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(code): Path<String>,
    Form(mut form): Form<WarehouseForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let code = code.to_uppercase();

    let changes = WarehouseChanges {
        name: Some(form.name.clone()),
        location: Some(forms::text(&form.location)),
    };
    match services::warehouses::update_warehouse(state.store.as_ref(), &code, changes).await {
        Ok(Some(_)) => Ok(Redirect::to(&format!("/warehouses/{code}")).into_response()),
        Ok(None) => Err(AppError::NotFound),
        Err(err) => {
            let (status, message) = rejected(err.into())?;
            form.code = code.clone();
            let page = render(&WarehouseFormTemplate {
                current_user: &current_user,
                title: "Edit warehouse",
                action: format!("/warehouses/{code}"),
                is_new: false,
                form,
                error: message,
            })?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn delete_warehouse(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(code): Path<String>,
) -> Result<Redirect, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    if !state.store.soft_delete_warehouse(&code.to_uppercase()).await? {
        return Err(AppError::NotFound);
    }
    log::info!("warehouse {} deleted by {}", code, current_user.username);
    Ok(Redirect::to("/warehouses"))
}
