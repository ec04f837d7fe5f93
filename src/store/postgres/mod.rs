mod catalog;
mod inventory;
mod orders;
mod users;
mod warehouses;

use crate::database::Database;

/// PostgreSQL-backed store. Every method is a short statement (or one
/// transaction) against the shared pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Database,
}

impl PgStore {
    pub fn new(pool: Database) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Database {
        &self.pool
    }
}

/// `ILIKE` pattern for a case-insensitive substring match.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Appends `, column = $n` to an `UPDATE ... SET` builder for every field of
/// a changes struct that is `Some`.
macro_rules! push_changes {
    ($builder:expr, $changes:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $changes.$field {
                $builder
                    .push(concat!(", ", stringify!($field), " = "))
                    .push_bind(value);
            }
        )+
    };
}

pub(crate) use push_changes;

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" abc "), "%abc%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
