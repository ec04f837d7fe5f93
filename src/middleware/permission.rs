use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Role, User},
    store::UserStore,
    utils::verify_token,
    AppState,
};

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    // Helper property for templates
    pub is_admin: bool,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_admin: user.role == Role::Admin,
        }
    }
}

pub fn session_cookie(token: String, ttl_hours: i64) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::hours(ttl_hours))
        .build()
}

pub fn cleared_session_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, "")).path("/").build()
}

pub async fn get_current_user(cookies: &Cookies, state: &AppState) -> Option<CurrentUser> {
    let token = cookies.get(AUTH_COOKIE)?.value().to_string();

    let claims = match verify_token(&token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            log::debug!("rejected session token: {}", e);
            cookies.remove(cleared_session_cookie());
            return None;
        }
    };

    let user_id = claims.user_id()?;
    match state.store.user(user_id).await {
        Ok(Some(user)) if user.is_active => Some(CurrentUser::from(user)),
        Ok(_) => None,
        Err(e) => {
            log::error!("failed to load session user {}: {}", user_id, e);
            None
        }
    }
}

/// The signed-in user, or `Unauthorized`.
pub async fn require_user(cookies: &Cookies, state: &AppState) -> Result<CurrentUser, AppError> {
    get_current_user(cookies, state)
        .await
        .ok_or(AppError::Unauthorized)
}

/// The signed-in user if they are an admin; `Forbidden` for other roles.
pub async fn require_admin(cookies: &Cookies, state: &AppState) -> Result<CurrentUser, AppError> {
    let user = require_user(cookies, state).await?;
    if !user.is_admin {
        log::warn!("user {} denied admin page", user.username);
        return Err(AppError::Forbidden);
    }
    Ok(user)
}
