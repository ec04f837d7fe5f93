use std::env;

use strum::{Display, EnumString};
use thiserror::Error;

use crate::models::OutWithoutBalance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub out_without_balance: OutWithoutBalance,
    pub static_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = parse_or(&lookup, "STORAGE", StorageBackend::Postgres)?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            storage,
            database_url,
            port: parse_or(&lookup, "PORT", 3000)?,
            jwt_secret,
            token_ttl_hours: parse_or(&lookup, "TOKEN_TTL_HOURS", 24)?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            out_without_balance: parse_or(
                &lookup,
                "OUT_WITHOUT_BALANCE",
                OutWithoutBalance::default(),
            )?,
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| "static".to_string()),
        })
    }

    /// Memory-backed configuration with cheap password hashing, for tests
    /// and local demos.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            port: 3000,
            jwt_secret: jwt_secret.into(),
            token_ttl_hours: 24,
            bcrypt_cost: 4,
            out_without_balance: OutWithoutBalance::default(),
            static_dir: "static".to_string(),
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "s")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn memory_backend_with_defaults() {
        let config =
            Config::from_lookup(lookup(&[("STORAGE", "memory"), ("JWT_SECRET", "s")])).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.port, 3000);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.out_without_balance, OutWithoutBalance::Ignore);
    }

    #[test]
    fn parses_out_policy_and_rejects_garbage() {
        let config = Config::from_lookup(lookup(&[
            ("STORAGE", "memory"),
            ("JWT_SECRET", "s"),
            ("OUT_WITHOUT_BALANCE", "Reject"),
        ]))
        .unwrap();
        assert_eq!(config.out_without_balance, OutWithoutBalance::Reject);

        let err = Config::from_lookup(lookup(&[
            ("STORAGE", "memory"),
            ("JWT_SECRET", "s"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }
}
