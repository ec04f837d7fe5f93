use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{duplicate, search, MemoryStore};
use crate::error::StoreResult;
use crate::models::{NewUser, User, UserChanges};
use crate::store::UserStore;

#[async_trait]
impl UserStore for MemoryStore {
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.get(&id).filter(|u| u.deleted_at.is_none()).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.deleted_at.is_none() && u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        if tables
            .users
            .values()
            .any(|u| u.deleted_at.is_none() && u.username == user.username)
        {
            return Err(duplicate("username", &user.username));
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            role: user.role,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut tables = self.tables.lock().await;
        let Some(user) = tables.users.get_mut(&id).filter(|u| u.deleted_at.is_none()) else {
            return Ok(None);
        };
        changes.apply_to(user);
        Ok(Some(user.clone()))
    }

    async fn soft_delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.users.get_mut(&id) {
            Some(user) if user.deleted_at.is_none() => {
                user.deleted_at = Some(Utc::now());
                true
            }
            _ => false,
        })
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.search_users("").await
    }

    async fn search_users(&self, query: &str) -> StoreResult<Vec<User>> {
        let tables = self.tables.lock().await;
        let mut users = search(
            tables.users.values().filter(|u| u.deleted_at.is_none()),
            query,
            User::matches,
        );
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn count_users(&self) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().filter(|u| u.deleted_at.is_none()).count() as i64)
    }
}
