pub mod api;
pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod forms;
pub mod inventory;
pub mod movements;
pub mod orders;
pub mod products;
pub mod users;
pub mod views;
pub mod warehouses;

use askama::Template;
use axum::response::Html;

use crate::error::AppError;

pub(crate) fn render<T: Template>(template: &T) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}
