pub mod auth;

pub use auth::{require_admin, AuthMiddleware};
