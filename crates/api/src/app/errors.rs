use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::ApiError;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredential | Self::Unauthenticated | Self::BadCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::NoSuchUser => StatusCode::NOT_FOUND,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::PasswordMismatch | Self::InvalidOrExpiredToken | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MailDeliveryFailed(_) => StatusCode::BAD_GATEWAY,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Template(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredential => "invalid_credential",
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied(_) => "permission_denied",
            Self::DuplicateEmail => "duplicate_email",
            Self::NoSuchUser => "no_such_user",
            Self::BadCredentials => "bad_credentials",
            Self::PasswordMismatch => "password_mismatch",
            Self::InvalidOrExpiredToken => "invalid_or_expired_token",
            Self::NotFound(_) => "not_found",
            Self::MailDeliveryFailed(_) => "mail_delivery_failed",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Validation(_) => "validation_error",
            Self::Template(_) => "template_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Response for a failed signin that does not reveal whether the email
    /// exists. Other errors pass through.
    pub fn into_signin_response(self) -> Response {
        match self {
            Self::NoSuchUser | Self::BadCredentials => json_error(
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "invalid email or password",
            ),
            other => other.into_response(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        // Backend detail stays in the log.
        let message = match &self {
            Self::StoreUnavailable(_) => "the store is temporarily unavailable".to_string(),
            Self::MailDeliveryFailed(_) => "the email could not be sent".to_string(),
            Self::Template(_) | Self::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        json_error(status, self.code(), message)
    }
}

/// Malformed bodies are reported like any other invalid input.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
