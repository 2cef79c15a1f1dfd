//! Admin password validation for mutating routes
//!
//! Mutating live-race routes carry the configured admin password in the
//! `x-admin-password` header. An empty configured password disables the
//! check. Passwords are compared by SHA-256 digest so the comparison length
//! does not depend on the input.

use sha2::{Digest, Sha256};

/// Request header carrying the admin password
pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// Admin authentication failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAuthError {
    /// Header absent
    MissingPassword,
    /// Header present but wrong
    InvalidPassword,
}

impl std::fmt::Display for AdminAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminAuthError::MissingPassword => {
                write!(f, "Missing {} header", ADMIN_PASSWORD_HEADER)
            }
            AdminAuthError::InvalidPassword => write!(f, "Invalid admin password"),
        }
    }
}

impl std::error::Error for AdminAuthError {}

/// SHA-256 digest of a password, as 64 hex characters
///
/// # Examples
///
/// ```
/// use xcd_common::api::auth::admin_password_digest;
///
/// let digest = admin_password_digest("hunter2");
/// assert_eq!(digest.len(), 64);
/// assert_eq!(digest, admin_password_digest("hunter2"));
/// ```
pub fn admin_password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a provided password against the configured one
///
/// # Examples
///
/// ```
/// use xcd_common::api::auth::{validate_admin_password, AdminAuthError};
///
/// // Empty configured password disables the check
/// assert!(validate_admin_password("", None).is_ok());
///
/// assert!(validate_admin_password("secret", Some("secret")).is_ok());
/// assert_eq!(
///     validate_admin_password("secret", Some("guess")),
///     Err(AdminAuthError::InvalidPassword)
/// );
/// ```
pub fn validate_admin_password(
    configured: &str,
    provided: Option<&str>,
) -> Result<(), AdminAuthError> {
    if configured.is_empty() {
        return Ok(());
    }

    let provided = provided.ok_or(AdminAuthError::MissingPassword)?;
    if admin_password_digest(provided) == admin_password_digest(configured) {
        Ok(())
    } else {
        Err(AdminAuthError::InvalidPassword)
    }
}
