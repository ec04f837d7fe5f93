use askama::Template;
use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_cookies::Cookies;

use super::forms::{self, rejected, SearchQuery};
use super::render;
use crate::{
    error::AppError,
    middleware::{require_user, CurrentUser},
    models::{Category, CategoryChanges, NewCategory, NewUnit, Unit, UnitChanges},
    services,
    store::CatalogStore,
    AppState,
};

#[derive(Template)]
#[template(path = "catalog/categories.html")]
struct CategoriesTemplate<'a> {
    current_user: &'a CurrentUser,
    categories: Vec<Category>,
    query: String,
}

#[derive(Template)]
#[template(path = "catalog/category_form.html")]
struct CategoryFormTemplate<'a> {
    current_user: &'a CurrentUser,
    title: &'a str,
    action: String,
    form: CategoryForm,
    error: String,
}

#[derive(Template)]
#[template(path = "catalog/units.html")]
struct UnitsTemplate<'a> {
    current_user: &'a CurrentUser,
    units: Vec<Unit>,
    query: String,
}

#[derive(Template)]
#[template(path = "catalog/unit_form.html")]
struct UnitFormTemplate<'a> {
    current_user: &'a CurrentUser,
    title: &'a str,
    action: String,
    form: UnitForm,
    error: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryForm {
    pub name: String,
    pub description: String,
}

impl CategoryForm {
    fn to_new_category(&self) -> NewCategory {
        NewCategory {
            name: self.name.clone(),
            description: forms::text(&self.description),
        }
    }
}

impl From<Category> for CategoryForm {
    fn from(category: Category) -> Self {
        Self {
            name: category.name,
            description: category.description.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UnitForm {
    pub name: String,
    pub abbreviation: String,
}

impl UnitForm {
    fn to_new_unit(&self) -> NewUnit {
        NewUnit {
            name: self.name.clone(),
            abbreviation: self.abbreviation.clone(),
        }
    }
}

impl From<Unit> for UnitForm {
    fn from(unit: Unit) -> Self {
        Self {
            name: unit.name,
            abbreviation: unit.abbreviation,
        }
    }
}

// Categories

pub async fn categories_list(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let categories = state.store.search_categories(&query.q).await?;
    render(&CategoriesTemplate {
        current_user: &current_user,
        categories,
        query: query.q,
    })
}

pub async fn category_form(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    render(&CategoryFormTemplate {
        current_user: &current_user,
        title: "New category",
        action: "/categories".to_string(),
        form: CategoryForm::default(),
        error: String::new(),
    })
}

pub async fn create_category(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    match services::catalog::create_category(state.store.as_ref(), form.to_new_category()).await {
        Ok(_) => Ok(Redirect::to("/categories").into_response()),
        Err(err) => {
            let (status, message) = rejected(err.into())?;
            let page = render(&CategoryFormTemplate {
                current_user: &current_user,
                title: "New category",
                action: "/categories".to_string(),
                form,
                error: message,
            })?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn category_edit_form(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let category = state.store.category(id).await?.ok_or(AppError::NotFound)?;
    render(&CategoryFormTemplate {
        current_user: &current_user,
        title: "Edit category",
        action: format!("/categories/{id}"),
        form: CategoryForm::from(category),
        error: String::new(),
    })
}

pub async fn update_category(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let changes = CategoryChanges::from(form.to_new_category().normalized());
    match services::catalog::update_category(state.store.as_ref(), id, changes).await {
        Ok(Some(_)) => Ok(Redirect::to("/categories").into_response()),
        Ok(None) => Err(AppError::NotFound),
        Err(err) => {
            let (status, message) = rejected(err.into())?;
            let page = render(&CategoryFormTemplate {
                current_user: &current_user,
                title: "Edit category",
                action: format!("/categories/{id}"),
                form,
                error: message,
            })?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn delete_category(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    require_user(&cookies, &state).await?;
    if !state.store.soft_delete_category(id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Redirect::to("/categories"))
}

// Units

pub async fn units_list(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let units = state.store.search_units(&query.q).await?;
    render(&UnitsTemplate {
        current_user: &current_user,
        units,
        query: query.q,
    })
}

pub async fn unit_form(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    render(&UnitFormTemplate {
        current_user: &current_user,
        title: "New unit",
        action: "/units".to_string(),
        form: UnitForm::default(),
        error: String::new(),
    })
}

pub async fn create_unit(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<UnitForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    match services::catalog::create_unit(state.store.as_ref(), form.to_new_unit()).await {
        Ok(_) => Ok(Redirect::to("/units").into_response()),
        Err(err) => {
            let (status, message) = rejected(err.into())?;
            let page = render(&UnitFormTemplate {
                current_user: &current_user,
                title: "New unit",
                action: "/units".to_string(),
                form,
                error: message,
            })?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn unit_edit_form(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let unit = state.store.unit(id).await?.ok_or(AppError::NotFound)?;
    render(&UnitFormTemplate {
        current_user: &current_user,
        title: "Edit unit",
        action: format!("/units/{id}"),
        form: UnitForm::from(unit),
        error: String::new(),
    })
}

pub async fn update_unit(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
    Form(form): Form<UnitForm>,
) -> Result<Response, AppError> {
    let current_user = require_user(&cookies, &state).await?;
    let changes = UnitChanges::from(form.to_new_unit().normalized());
    match services::catalog::update_unit(state.store.as_ref(), id, changes).await {
        Ok(Some(_)) => Ok(Redirect::to("/units").into_response()),
        Ok(None) => Err(AppError::NotFound),
        Err(err) => {
            let (status, message) = rejected(err.into())?;
            let page = render(&UnitFormTemplate {
                current_user: &current_user,
                title: "Edit unit",
                action: format!("/units/{id}"),
                form,
                error: message,
            })?;
            Ok((status, page).into_response())
        }
    }
}

pub async fn delete_unit(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    require_user(&cookies, &state).await?;
    if !state.store.soft_delete_unit(id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Redirect::to("/units"))
}
