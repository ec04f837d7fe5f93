use askama::Template;
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_cookies::Cookies;

use super::render;
use crate::{
    error::{AppError, StoreError},
    middleware::{cleared_session_cookie, session_cookie},
    services::accounts::{self, Registration},
    utils::create_token,
    AppState,
};

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    username: String,
    error: String,
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    username: String,
    email: String,
    full_name: String,
    error: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    username: String,
    email: String,
    full_name: String,
    password: String,
}

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub async fn login_page() -> Result<Html<String>, AppError> {
    render(&LoginTemplate {
        username: String::new(),
        error: String::new(),
    })
}

pub async fn register_page() -> Result<Html<String>, AppError> {
    render(&RegisterTemplate {
        username: String::new(),
        email: String::new(),
        full_name: String::new(),
        error: String::new(),
    })
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user =
        accounts::authenticate(state.store.as_ref(), &form.username, &form.password).await?;

    let Some(user) = user else {
        let page = render(&LoginTemplate {
            username: form.username,
            error: INVALID_CREDENTIALS.to_string(),
        })?;
        return Ok((StatusCode::UNAUTHORIZED, page).into_response());
    };

    let token = create_token(
        user.id,
        user.username.clone(),
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )
    .map_err(|e| StoreError::StorageFailure(format!("token signing failed: {e}")))?;

    cookies.add(session_cookie(token, state.config.token_ttl_hours));
    log::info!("{} signed in", user.username);

    Ok(Redirect::to("/dashboard").into_response())
}

pub async fn logout(cookies: Cookies) -> impl IntoResponse {
    cookies.remove(cleared_session_cookie());
    Redirect::to("/login")
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let registration = Registration {
        username: form.username.clone(),
        email: form.email.clone(),
        full_name: form.full_name.clone(),
        password: form.password,
    };

    match accounts::register(state.store.as_ref(), registration, state.config.bcrypt_cost).await {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(err) => {
            let (status, error) = match err {
                StoreError::ConstraintViolation(_) => (
                    StatusCode::CONFLICT,
                    "That username is already taken".to_string(),
                ),
                StoreError::ValidationFailure(message) => (StatusCode::BAD_REQUEST, message),
                other => return Err(other.into()),
            };
            let page = render(&RegisterTemplate {
                username: form.username,
                email: form.email,
                full_name: form.full_name,
                error,
            })?;
            Ok((status, page).into_response())
        }
    }
}
