use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::error::{StoreError, StoreResult};
use crate::models::{NewUser, Role, User, UserChanges};
use crate::store::{Store, UserStore};
use crate::utils::{hash_password, verify_password};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 3, max = 64, message = "username must be 3-64 characters"))]
    pub username: String,
    #[validate(email(message = "a valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 200, message = "full name is required"))]
    pub full_name: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

impl Registration {
    fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self.full_name = self.full_name.trim().to_string();
        self
    }
}

/// Self-service sign-up. The first account ever created becomes an admin.
pub async fn register(
    store: &dyn Store,
    registration: Registration,
    bcrypt_cost: u32,
) -> StoreResult<User> {
    let role = if store.count_users().await? == 0 {
        Role::Admin
    } else {
        Role::Staff
    };
    create_account(store, registration, role, bcrypt_cost).await
}

pub async fn create_account(
    store: &dyn Store,
    registration: Registration,
    role: Role,
    bcrypt_cost: u32,
) -> StoreResult<User> {
    let registration = registration.normalized();
    registration.validate()?;

    let password_hash = hash_password(&registration.password, bcrypt_cost)
        .map_err(|e| StoreError::StorageFailure(format!("password hashing failed: {e}")))?;

    let user = NewUser {
        username: registration.username,
        email: registration.email,
        full_name: registration.full_name,
        password_hash,
        role,
    };
    user.validate()?;

    let created = store.create_user(user).await?;
    log::info!("created {} account {}", created.role, created.username);
    Ok(created)
}

/// Returns the user when the credentials match an active account, stamping
/// `last_login`. Any mismatch is `None`.
pub async fn authenticate(
    store: &dyn Store,
    username: &str,
    password: &str,
) -> StoreResult<Option<User>> {
    let Some(user) = store.user_by_username(username.trim()).await? else {
        return Ok(None);
    };
    if !user.is_active || !verify_password(password, &user.password_hash) {
        log::debug!("failed login for {}", user.username);
        return Ok(None);
    }

    let changes = UserChanges {
        last_login: Some(Utc::now()),
        ..Default::default()
    };
    let user = store.update_user(user.id, changes).await?.unwrap_or(user);
    Ok(Some(user))
}

/// Replaces a user's password after checking the length rule.
pub async fn set_password(
    store: &dyn Store,
    user: &User,
    password: &str,
    bcrypt_cost: u32,
) -> StoreResult<()> {
    if password.chars().count() < 8 {
        return Err(StoreError::ValidationFailure(
            "password must be at least 8 characters".to_string(),
        ));
    }
    let password_hash = hash_password(password, bcrypt_cost)
        .map_err(|e| StoreError::StorageFailure(format!("password hashing failed: {e}")))?;
    let changes = UserChanges {
        password_hash: Some(password_hash),
        ..Default::default()
    };
    store.update_user(user.id, changes).await?;
    Ok(())
}
