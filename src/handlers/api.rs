//! JSON API. Same cookie session as the HTML pages; errors come back as
//! `{ "error": ..., "message": ... }`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_cookies::Cookies;

use crate::{
    error::{AppError, StoreError},
    middleware::{get_current_user, CurrentUser},
    models::{
        Correction, Direction, InventoryBalance, MovementReceipt, NewMovement, Product,
        StockMovement,
    },
    services::{self, dashboard::DashboardSummary},
    store::{CatalogStore, InventoryStore},
    AppState,
};

#[derive(Debug)]
pub struct ApiError(AppError);

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let error = match &self.0 {
            AppError::NotFound => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::BadRequest(_) => "bad_request",
            AppError::Store(StoreError::ValidationFailure(_)) => "validation_failure",
            AppError::Store(StoreError::ConstraintViolation(_)) => "constraint_violation",
            AppError::Store(StoreError::StorageFailure(_)) | AppError::Template(_) => {
                "internal_error"
            }
        };
        if status.is_server_error() {
            log::error!("api request failed: {}", self.0);
        }
        let body = json!({ "error": error, "message": self.0.public_message() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn api_user(cookies: &Cookies, state: &AppState) -> ApiResult<CurrentUser> {
    get_current_user(cookies, state)
        .await
        .ok_or(ApiError(AppError::Unauthorized))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn list_products(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    api_user(&cookies, &state).await?;
    Ok(Json(state.store.search_products(&query.q).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> ApiResult<Json<Product>> {
    api_user(&cookies, &state).await?;
    let product = state.store.product(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(product))
}

#[derive(Debug, Default, Deserialize)]
pub struct BalanceQuery {
    pub product_id: Option<i64>,
    pub warehouse: Option<String>,
}

pub async fn list_balances(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<BalanceQuery>,
) -> ApiResult<Json<Vec<InventoryBalance>>> {
    api_user(&cookies, &state).await?;
    let store = state.store.as_ref();
    let warehouse = query
        .warehouse
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_uppercase);

    let balances = match (query.product_id, warehouse) {
        (Some(product_id), Some(code)) => store
            .balance_for(product_id, &code)
            .await?
            .into_iter()
            .collect(),
        (Some(product_id), None) => store.balances_by_product(product_id).await?,
        (None, Some(code)) => store.balances_by_warehouse(&code).await?,
        (None, None) => store.all_balances().await?,
    };
    Ok(Json(balances))
}

#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub product_id: i64,
    pub warehouse_code: String,
    pub direction: Direction,
    pub quantity: Decimal,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn record_movement(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(request): Json<MovementRequest>,
) -> ApiResult<(StatusCode, Json<MovementReceipt>)> {
    let current_user = api_user(&cookies, &state).await?;

    let mut movement = NewMovement::new(
        request.product_id,
        request.warehouse_code,
        request.direction,
        request.quantity,
    );
    movement.reference = request.reference;
    movement.note = request.note;
    movement.created_by = Some(current_user.id);

    let receipt = services::ledger::apply_movement(
        state.store.as_ref(),
        movement,
        state.config.out_without_balance,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

pub async fn recent_movements(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<Vec<StockMovement>>> {
    api_user(&cookies, &state).await?;
    let movements = services::ledger::recent_movements(state.store.as_ref(), query.limit).await?;
    Ok(Json(movements))
}

pub async fn dashboard(
    State(state): State<AppState>,
    cookies: Cookies,
) -> ApiResult<Json<DashboardSummary>> {
    api_user(&cookies, &state).await?;
    let summary =
        services::dashboard::summary(state.store.as_ref(), Utc::now().date_naive()).await?;
    Ok(Json(summary))
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub corrections: Vec<Correction>,
}

pub async fn reconcile(
    State(state): State<AppState>,
    cookies: Cookies,
) -> ApiResult<Json<ReconcileResponse>> {
    let current_user = api_user(&cookies, &state).await?;
    if !current_user.is_admin {
        return Err(ApiError(AppError::Forbidden));
    }
    let corrections = services::ledger::reconcile_balances(
        state.store.as_ref(),
        state.config.out_without_balance,
    )
    .await?;
    Ok(Json(ReconcileResponse { corrections }))
}
