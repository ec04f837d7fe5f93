use askama::Template;
use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_cookies::Cookies;
use uuid::Uuid;

use super::forms::{self, rejected, SearchQuery};
use super::render;
use super::views::timestamp;
use crate::{
    error::AppError,
    middleware::{require_admin, CurrentUser},
    models::{Role, User, UserChanges},
    services::{self, accounts::Registration},
    store::UserStore,
    AppState,
};

pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: String,
}

impl From<User> for UserRow {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role.to_string(),
            is_active: user.is_active,
            last_login: user.last_login.map(timestamp).unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "users/list.html")]
struct UsersTemplate<'a> {
    current_user: &'a CurrentUser,
    users: Vec<UserRow>,
    query: String,
}

#[derive(Template)]
#[template(path = "users/form.html")]
struct UserFormTemplate<'a> {
    current_user: &'a CurrentUser,
    title: &'a str,
    action: String,
    is_new: bool,
    form: UserForm,
    error: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserForm {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: String,
    pub is_active: Option<String>,
}

impl UserForm {
    fn role(&self) -> Result<Role, AppError> {
        self.role
            .parse()
            .map_err(|_| AppError::BadRequest("role must be admin or staff".to_string()))
    }
}

impl From<User> for UserForm {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            password: String::new(),
            role: user.role.to_string(),
            is_active: user.is_active.then(|| "on".to_string()),
        }
    }
}

pub async fn users_list(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    let current_user = require_admin(&cookies, &state).await?;
    let users = state.store.search_users(&query.q).await?;
    render(&UsersTemplate {
        current_user: &current_user,
        users: users.into_iter().map(UserRow::from).collect(),
        query: query.q,
    })
}

pub async fn user_form(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let current_user = require_admin(&cookies, &state).await?;
    let form = UserForm {
        role: Role::Staff.to_string(),
        is_active: Some("on".to_string()),
        ..Default::default()
    };
    render(&UserFormTemplate {
        current_user: &current_user,
        title: "New user",
        action: "/users".to_string(),
        is_new: true,
        form,
        error: String::new(),
    })
}

pub async fn create_user(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(mut form): Form<UserForm>,
) -> Result<Response, AppError> {
    let current_user = require_admin(&cookies, &state).await?;

    let result = async {
        let registration = Registration {
            username: form.username.clone(),
            email: form.email.clone(),
            full_name: form.full_name.clone(),
            password: form.password.clone(),
        };
        let role = form.role()?;
        Ok::<_, AppError>(
            services::accounts::create_account(
                state.store.as_ref(),
                registration,
                role,
                state.config.bcrypt_cost,
            )
            .await?,
        )
    }
    .await;

    match result {
        Ok(user) => {
            log::info!("{} created user {}", current_user.username, user.username);
            Ok(Redirect::to("/users").into_response())
        }
        Err(err) => {
            let (status, message) = rejected(err)?;
            form.password.clear();
            let page = render(&UserFormTemplate {
                current_user: &current_user,
                title: "New user",
                action: "/users".to_string(),
                is_new: true,
                form,
                error: message,
            })?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn user_edit_form(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let current_user = require_admin(&cookies, &state).await?;
    let user = state.store.user(id).await?.ok_or(AppError::NotFound)?;
    render(&UserFormTemplate {
        current_user: &current_user,
        title: "Edit user",
        action: format!("/users/{id}"),
        is_new: false,
        form: UserForm::from(user),
        error: String::new(),
    })
}

pub async fn update_user(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<Uuid>,
    Form(mut form): Form<UserForm>,
) -> Result<Response, AppError> {
    let current_user = require_admin(&cookies, &state).await?;
    let user = state.store.user(id).await?.ok_or(AppError::NotFound)?;

    let result = async {
        let role = form.role()?;
        let is_active = forms::checkbox(&form.is_active);
        if id == current_user.id && (role != Role::Admin || !is_active) {
            return Err(AppError::BadRequest(
                "you cannot demote or deactivate your own account".to_string(),
            ));
        }
        let email = form.email.trim().to_string();
        if !validator::validate_email(&email) {
            return Err(AppError::BadRequest(
                "a valid email address is required".to_string(),
            ));
        }
        let full_name = form.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(AppError::BadRequest("full name is required".to_string()));
        }

        let changes = UserChanges {
            email: Some(email),
            full_name: Some(full_name),
            role: Some(role),
            is_active: Some(is_active),
            ..Default::default()
        };
        state.store.update_user(id, changes).await?;

        if !form.password.is_empty() {
            services::accounts::set_password(
                state.store.as_ref(),
                &user,
                &form.password,
                state.config.bcrypt_cost,
            )
            .await?;
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => Ok(Redirect::to("/users").into_response()),
        Err(err) => {
            let (status, message) = rejected(err)?;
            form.password.clear();
            form.username = user.username;
            let page = render(&UserFormTemplate {
                current_user: &current_user,
                title: "Edit user",
                action: format!("/users/{id}"),
                is_new: false,
                form,
                error: message,
            })?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn delete_user(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    let current_user = require_admin(&cookies, &state).await?;
    if id == current_user.id {
        return Err(AppError::BadRequest(
            "you cannot delete your own account".to_string(),
        ));
    }
    if !state.store.soft_delete_user(id).await? {
        return Err(AppError::NotFound);
    }
    log::info!("user {} deleted by {}", id, current_user.username);
    Ok(Redirect::to("/users"))
}
