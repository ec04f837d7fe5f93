pub mod permission;

pub use permission::{
    cleared_session_cookie, get_current_user, require_admin, require_user, session_cookie,
    CurrentUser, AUTH_COOKIE,
};
