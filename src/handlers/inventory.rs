use askama::Template;
use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_cookies::Cookies;

use super::forms::{self, rejected, Choice};
use super::render;
use super::views::{qty, BalanceRow, Lookup};
use crate::{
    error::AppError,
    middleware::{require_admin, require_user, CurrentUser},
    models::{BalanceChanges, Correction, NewBalance},
    services,
    store::InventoryStore,
    AppState,
};

#[derive(Template)]
#[template(path = "inventory/list.html")]
struct BalancesTemplate<'a> {
    current_user: &'a CurrentUser,
    balances: Vec<BalanceRow>,
    products: Vec<Choice>,
    warehouses: Vec<Choice>,
    filter: BalanceFilter,
}

#[derive(Template)]
#[template(path = "inventory/form.html")]
struct BalanceFormTemplate<'a> {
    current_user: &'a CurrentUser,
    title: &'a str,
    action: String,
    // Product and warehouse are fixed once the row exists
    is_new: bool,
    label: String,
    form: BalanceForm,
    products: Vec<Choice>,
    warehouses: Vec<Choice>,
    error: String,
}

#[derive(Template)]
#[template(path = "inventory/reconcile.html")]
struct ReconcileTemplate<'a> {
    current_user: &'a CurrentUser,
    corrections: Vec<CorrectionRow>,
}

pub struct CorrectionRow {
    pub product_id: i64,
    pub warehouse_code: String,
    pub previous: String,
    pub corrected: String,
}

impl From<Correction> for CorrectionRow {
    fn from(correction: Correction) -> Self {
        Self {
            product_id: correction.product_id,
            warehouse_code: correction.warehouse_code,
            previous: correction
                .previous
                .map(qty)
                .unwrap_or_else(|| "missing".to_string()),
            corrected: qty(correction.corrected),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BalanceFilter {
    pub product_id: String,
    pub warehouse: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BalanceForm {
    pub product_id: String,
    pub warehouse_code: String,
    pub quantity: String,
    pub reserved_quantity: String,
}

pub async fn balances_list(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(filter): Query<BalanceFilter>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let store = state.store.as_ref();

    let product_id = forms::optional_id("product", &filter.product_id)?;
    let warehouse = forms::text(&filter.warehouse).map(|code| code.to_uppercase());

    let balances = match (product_id, &warehouse) {
        (Some(id), Some(code)) => store
            .balances_by_product(id)
            .await?
            .into_iter()
            .filter(|b| &b.warehouse_code == code)
            .collect(),
        (Some(id), None) => store.balances_by_product(id).await?,
        (None, Some(code)) => store.balances_by_warehouse(code).await?,
        (None, None) => store.all_balances().await?,
    };

    let lookup = Lookup::load(store).await?;
    render(&BalancesTemplate {
        current_user: &current_user,
        balances: lookup.balance_rows(balances),
        products: lookup.product_choices(),
        warehouses: lookup.warehouse_choices(),
        filter: BalanceFilter {
            product_id: product_id.map(|id| id.to_string()).unwrap_or_default(),
            warehouse: warehouse.unwrap_or_default(),
        },
    })
}

#[allow(clippy::too_many_arguments)]
async fn render_form(
    state: &AppState,
    current_user: &CurrentUser,
    title: &str,
    action: String,
    is_new: bool,
    label: String,
    form: BalanceForm,
    error: String,
) -> Result<Html<String>, AppError> {
    let lookup = Lookup::load(state.store.as_ref()).await?;
    render(&BalanceFormTemplate {
        current_user,
        title,
        action,
        is_new,
        label,
        form,
        products: lookup.product_choices(),
        warehouses: lookup.warehouse_choices(),
        error,
    })
}

pub async fn balance_form(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let form = BalanceForm {
        quantity: "0".to_string(),
        reserved_quantity: "0".to_string(),
        ..Default::default()
    };
    render_form(
        &state,
        &current_user,
        "New balance",
        "/inventory".to_string(),
        true,
        String::new(),
        form,
        String::new(),
    )
    .await
}

pub async fn create_balance(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<BalanceForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;

    let result = async {
        let balance = NewBalance {
            product_id: forms::id("product", &form.product_id)?,
            warehouse_code: form.warehouse_code.clone(),
            quantity: forms::decimal("quantity", &form.quantity)?,
            reserved_quantity: forms::decimal("reserved quantity", &form.reserved_quantity)?,
        };
        Ok::<_, AppError>(services::ledger::create_balance(state.store.as_ref(), balance).await?)
    }
    .await;

    match result {
        Ok(_) => Ok(Redirect::to("/inventory").into_response()),
        Err(err) => {
            let (status, message) = rejected(err)?;
            let page = render_form(
                &state,
                &current_user,
                "New balance",
                "/inventory".to_string(),
                true,
                String::new(),
                form,
                message,
            )
            .await?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn balance_edit_form(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let balance = state.store.balance(id).await?.ok_or(AppError::NotFound)?;

    let label = format!("product #{} at {}", balance.product_id, balance.warehouse_code);
    let form = BalanceForm {
        product_id: balance.product_id.to_string(),
        warehouse_code: balance.warehouse_code,
        quantity: qty(balance.quantity),
        reserved_quantity: qty(balance.reserved_quantity),
    };
    render_form(
        &state,
        &current_user,
        "Edit balance",
        format!("/inventory/{id}"),
        false,
        label,
        form,
        String::new(),
    )
    .await
}

pub async fn update_balance(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Form(form): Form<BalanceForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;

    let result = async {
        let changes = BalanceChanges {
            quantity: forms::optional_decimal("quantity", &form.quantity)?,
            reserved_quantity: forms::optional_decimal(
                "reserved quantity",
                &form.reserved_quantity,
            )?,
        };
        Ok::<_, AppError>(services::ledger::update_balance(state.store.as_ref(), id, changes).await?)
    }
    .await;

    match result {
        Ok(Some(balance)) => {
            log::info!(
                "balance {} set to {} by {}",
                balance.id,
                balance.quantity,
                current_user.username
            );
            Ok(Redirect::to("/inventory").into_response())
        }
        Ok(None) => Err(AppError::NotFound),
        Err(err) => {
            let (status, message) = rejected(err)?;
            let label = format!("product #{} at {}", form.product_id, form.warehouse_code);
            let page = render_form(
                &state,
                &current_user,
                "Edit balance",
                format!("/inventory/{id}"),
                false,
                label,
                form,
                message,
            )
            .await?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn delete_balance(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    if !state.store.delete_balance(id).await? {
        return Err(AppError::NotFound);
    }
    log::info!("balance {} deleted by {}", id, current_user.username);
    Ok(Redirect::to("/inventory"))
}

pub async fn reconcile(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let current_user = require_admin(&cookies, &state).await?;
    let corrections = services::ledger::reconcile_balances(
        state.store.as_ref(),
        state.config.out_without_balance,
    )
    .await?;

    render(&ReconcileTemplate {
        current_user: &current_user,
        corrections: corrections.into_iter().map(CorrectionRow::from).collect(),
    })
}
