//! Shared HTTP API helpers
//!
//! Pure functions only; each service wraps them in framework middleware.

pub mod auth;

pub use auth::{
    admin_password_digest, validate_admin_password, AdminAuthError, ADMIN_PASSWORD_HEADER,
};
