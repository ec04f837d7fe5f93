//! Parsing helpers for urlencoded form fields. Forms post every value as a
//! string; blank optional fields become `None`.

use std::str::FromStr;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, StoreError};

/// `?q=` on list pages.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// One `<option>` of a select box.
#[derive(Debug, Clone, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl ToString, label: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
        }
    }
}

/// Required decimal; blank means zero.
pub fn decimal(field: &str, value: &str) -> Result<Decimal, AppError> {
    Ok(optional_decimal(field, value)?.unwrap_or(Decimal::ZERO))
}

pub fn optional_decimal(field: &str, value: &str) -> Result<Option<Decimal>, AppError> {
    parse_optional(field, value)
}

pub fn optional_id(field: &str, value: &str) -> Result<Option<i64>, AppError> {
    parse_optional(field, value)
}

pub fn id(field: &str, value: &str) -> Result<i64, AppError> {
    optional_id(field, value)?.ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}

pub fn optional_int(field: &str, value: &str) -> Result<Option<i32>, AppError> {
    parse_optional(field, value)
}

fn parse_optional<T: FromStr>(field: &str, value: &str) -> Result<Option<T>, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("{field} must be a number")))
}

/// Trimmed text, `None` when blank.
pub fn text(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// HTML checkboxes send "on" or nothing.
pub fn checkbox(value: &Option<String>) -> bool {
    value.is_some()
}

/// Splits errors a user can fix by editing the form from everything else.
/// The former come back as a status and message to re-render the form with.
pub fn rejected(err: AppError) -> Result<(StatusCode, String), AppError> {
    match err {
        AppError::BadRequest(_)
        | AppError::Store(StoreError::ValidationFailure(_))
        | AppError::Store(StoreError::ConstraintViolation(_)) => {
            Ok((err.status(), err.public_message()))
        }
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn blank_numbers() {
        assert_eq!(decimal("price", "  ").unwrap(), Decimal::ZERO);
        assert_eq!(optional_decimal("weight", "").unwrap(), None);
        assert_eq!(optional_id("category", "").unwrap(), None);
    }

    #[test]
    fn parses_trimmed_numbers() {
        assert_eq!(decimal("price", " 12.50 ").unwrap(), dec!(12.50));
        assert_eq!(optional_int("lead time", "7").unwrap(), Some(7));
        assert_eq!(id("product", "42").unwrap(), 42);
    }

    #[test]
    fn bad_numbers_are_bad_requests() {
        assert!(matches!(
            decimal("price", "abc"),
            Err(AppError::BadRequest(msg)) if msg == "price must be a number"
        ));
        assert!(matches!(id("product", ""), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn storage_failures_are_not_form_errors() {
        let err = AppError::Store(StoreError::StorageFailure("down".to_string()));
        assert!(rejected(err).is_err());

        let err = AppError::Store(StoreError::ConstraintViolation("dup".to_string()));
        let (status, _) = rejected(err).unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
