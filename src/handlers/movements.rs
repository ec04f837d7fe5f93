use askama::Template;
use axum::{
    extract::{Form, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_cookies::Cookies;

use super::forms::{self, rejected, Choice};
use super::render;
use super::views::{Lookup, MovementRow};
use crate::{
    error::AppError,
    middleware::{require_user, CurrentUser},
    models::{Direction, NewMovement},
    services,
    store::InventoryStore,
    AppState,
};

const LIST_LIMIT: i64 = 100;

#[derive(Template)]
#[template(path = "movements/list.html")]
struct MovementsTemplate<'a> {
    current_user: &'a CurrentUser,
    movements: Vec<MovementRow>,
    products: Vec<Choice>,
    warehouses: Vec<Choice>,
    filter: MovementFilter,
}

#[derive(Template)]
#[template(path = "movements/form.html")]
struct MovementFormTemplate<'a> {
    current_user: &'a CurrentUser,
    form: MovementForm,
    products: Vec<Choice>,
    warehouses: Vec<Choice>,
    error: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MovementFilter {
    pub product_id: String,
    pub warehouse: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MovementForm {
    pub product_id: String,
    pub warehouse_code: String,
    pub direction: String,
    pub quantity: String,
    pub reference: String,
    pub note: String,
}

impl MovementForm {
    fn to_new_movement(&self, current_user: &CurrentUser) -> Result<NewMovement, AppError> {
        let direction: Direction = self
            .direction
            .parse()
            .map_err(|_| AppError::BadRequest("direction must be IN or OUT".to_string()))?;
        let quantity = forms::optional_decimal("quantity", &self.quantity)?
            .ok_or_else(|| AppError::BadRequest("quantity is required".to_string()))?;

        let mut movement = NewMovement::new(
            forms::id("product", &self.product_id)?,
            self.warehouse_code.clone(),
            direction,
            quantity,
        );
        movement.reference = forms::text(&self.reference);
        movement.note = forms::text(&self.note);
        movement.created_by = Some(current_user.id);
        Ok(movement)
    }
}

pub async fn movements_list(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(filter): Query<MovementFilter>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let store = state.store.as_ref();

    let product_id = forms::optional_id("product", &filter.product_id)?;
    let warehouse = forms::text(&filter.warehouse).map(|code| code.to_uppercase());

    let movements = match (product_id, &warehouse) {
        (Some(id), Some(code)) => store
            .movements_by_product(id)
            .await?
            .into_iter()
            .filter(|m| &m.warehouse_code == code)
            .collect(),
        (Some(id), None) => store.movements_by_product(id).await?,
        (None, Some(code)) => store.movements_by_warehouse(code).await?,
        (None, None) => services::ledger::recent_movements(store, Some(LIST_LIMIT)).await?,
    };

    let lookup = Lookup::load(store).await?;
    render(&MovementsTemplate {
        current_user: &current_user,
        movements: lookup.movement_rows(movements),
        products: lookup.product_choices(),
        warehouses: lookup.warehouse_choices(),
        filter: MovementFilter {
            product_id: product_id.map(|id| id.to_string()).unwrap_or_default(),
            warehouse: warehouse.unwrap_or_default(),
        },
    })
}

async fn render_form(
    state: &AppState,
    current_user: &CurrentUser,
    form: MovementForm,
    error: String,
) -> Result<Html<String>, AppError> {
    let lookup = Lookup::load(state.store.as_ref()).await?;
    render(&MovementFormTemplate {
        current_user,
        form,
        products: lookup.product_choices(),
        warehouses: lookup.warehouse_choices(),
        error,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MovementPreset {
    pub product_id: String,
    pub warehouse: String,
}

pub async fn movement_form(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(preset): Query<MovementPreset>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let form = MovementForm {
        product_id: preset.product_id,
        warehouse_code: preset.warehouse,
        direction: Direction::In.to_string(),
        ..Default::default()
    };
    render_form(&state, &current_user, form, String::new()).await
}

pub async fn create_movement(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<MovementForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;

    let result = async {
        let movement = form.to_new_movement(&current_user)?;
        Ok::<_, AppError>(
            services::ledger::record_movement(
                state.store.as_ref(),
                movement,
                state.config.out_without_balance,
            )
            .await?,
        )
    }
    .await;

    match result {
        Ok(movement) => {
            let target = format!(
                "/movements?warehouse={}",
                urlencoding::encode(&movement.warehouse_code)
            );
            Ok(Redirect::to(&target).into_response())
        }
        Err(err) => {
            let (status, message) = rejected(err)?;
            let page = render_form(&state, &current_user, form, message).await?;
            Ok((status, page).into_response())
        }
    }
}
