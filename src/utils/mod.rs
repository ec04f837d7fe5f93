pub mod auth;
pub mod codes;

pub use auth::{create_token, hash_password, verify_password, verify_token, Claims};
pub use codes::{is_valid_code, random_token};
