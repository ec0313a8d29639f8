//! Operation-level error kinds.
//!
//! Every orchestrated operation fails with one of these. They are surfaced to
//! the caller as-is; nothing here is retried. The HTTP mapping lives in
//! `app::errors`.

use thiserror::Error;

use fitshop_auth::{AuthzError, CredentialError, PasswordError};
use fitshop_core::DomainError;
use fitshop_infra::{MailError, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A credential was presented but failed verification.
    #[error("invalid credential")]
    InvalidCredential,

    /// No identity where one is required.
    #[error("you must be signed in to do that")]
    Unauthenticated,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("no user for that email")]
    NoSuchUser,

    #[error("invalid password")]
    BadCredentials,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("reset token is invalid or expired")]
    InvalidOrExpiredToken,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("mail delivery failed: {0}")]
    MailDeliveryFailed(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    Validation(String),

    /// An email body failed to render.
    #[error("template error: {0}")]
    Template(String),

    /// Server-side failure unrelated to the store (hashing, task join).
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self::MailDeliveryFailed(err.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
        }
    }
}

impl From<askama::Error> for ApiError {
    fn from(err: askama::Error) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        Self::PermissionDenied(err.to_string())
    }
}

impl From<CredentialError> for ApiError {
    fn from(_: CredentialError) -> Self {
        Self::InvalidCredential
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Empty => Self::Validation(err.to_string()),
            PasswordError::Mismatch => Self::BadCredentials,
            PasswordError::CorruptHash | PasswordError::Hashing(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use fitshop_core::{Email, ItemId};

    use super::*;

    #[test]
    fn bad_input_becomes_a_validation_error() {
        let err = Email::parse("nope").unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::Validation(_)));

        let err = "not-a-uuid".parse::<ItemId>().unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::Validation(_)));
    }

    #[test]
    fn render_failures_are_template_errors() {
        let err = askama::Error::from(std::fmt::Error);
        assert!(matches!(ApiError::from(err), ApiError::Template(_)));
    }
}
