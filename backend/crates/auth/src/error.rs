//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system. Every variant maps to exactly one
//! HTTP status. `AccountLocked` renders the same body as
//! `InvalidCredentials`.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::client::BearerError;
use platform::password::PasswordPolicyError;
use thiserror::Error;

use crate::infra::jwt::TokenError;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Too many recent failures for this email
    #[error("Account is temporarily locked")]
    AccountLocked,

    /// Bad signature, malformed, expired, or missing required claims
    #[error("Invalid token")]
    InvalidToken,

    /// Token verified but names no identity
    #[error("Token has no subject")]
    MissingSubject,

    /// Token subject no longer exists
    #[error("User not found")]
    UnknownIdentity,

    /// No bearer credential presented
    #[error("Authentication required")]
    Unauthenticated,

    /// Identity exists but carries no role
    #[error("User has no role assigned")]
    MissingRole,

    #[error("Access denied. Allowed roles: {}", .allowed.join(", "))]
    Forbidden { allowed: Vec<String> },

    #[error("Rate limit exceeded. Try again later.")]
    RateLimited { retry_after_secs: u64 },

    #[error("Password does not meet policy: {0}")]
    WeakPassword(#[from] PasswordPolicyError),

    #[error("Email already registered")]
    EmailTaken,

    /// Unusable keys or settings; the process must not serve requests
    #[error("Configuration error: {0}")]
    ConfigurationFatal(String),

    /// Identity store returned an unusable record
    #[error("Identity store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::AccountLocked
            | AuthError::InvalidToken
            | AuthError::MissingSubject
            | AuthError::UnknownIdentity
            | AuthError::Unauthenticated => ErrorKind::Unauthorized,
            AuthError::MissingRole | AuthError::Forbidden { .. } => ErrorKind::Forbidden,
            AuthError::RateLimited { .. } => ErrorKind::TooManyRequests,
            AuthError::WeakPassword(_) | AuthError::EmailTaken => ErrorKind::UnprocessableEntity,
            AuthError::Database(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_),
            ) => ErrorKind::ServiceUnavailable,
            AuthError::Database(_) => ErrorKind::InternalServerError,
            AuthError::ConfigurationFatal(_) | AuthError::Store(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError
    ///
    /// Server-side failures never leak their detail to the client.
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::AccountLocked => AppError::new(
                self.kind(),
                AuthError::InvalidCredentials.to_string(),
            ),
            AuthError::Database(_)
            | AuthError::ConfigurationFatal(_)
            | AuthError::Store(_)
            | AuthError::Internal(_) => {
                AppError::new(self.kind(), "Internal server error")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::ConfigurationFatal(msg) => {
                tracing::error!(message = %msg, "Auth configuration error");
            }
            AuthError::Store(msg) | AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidToken | AuthError::MissingSubject | AuthError::UnknownIdentity => {
                tracing::warn!(error = %self, "Rejected bearer token");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();

        let mut response = self.to_app_error().into_response();
        let headers = response.headers_mut();
        match &self {
            AuthError::RateLimited { retry_after_secs } => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
            }
            _ if self.kind() == ErrorKind::Unauthorized => {
                headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            _ => {}
        }
        response
    }
}

impl From<BearerError> for AuthError {
    fn from(err: BearerError) -> Self {
        match err {
            BearerError::Missing => AuthError::Unauthenticated,
            BearerError::Malformed => AuthError::InvalidToken,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        if err.is_configuration() {
            AuthError::ConfigurationFatal(err.to_string())
        } else {
            AuthError::InvalidToken
        }
    }
}
