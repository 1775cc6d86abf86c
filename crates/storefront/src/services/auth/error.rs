//! Authentication error types.

use thiserror::Error;

use crate::backend::{BackendError, IdentityErrorCode};
use crate::storage::StorageError;

/// Generic message shown for failures the visitor cannot fix.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email")]
    InvalidEmail,

    /// Email already registered.
    #[error("email already registered")]
    EmailInUse,

    /// Password rejected by the identity service.
    #[error("password too weak")]
    WeakPassword,

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account has been disabled.
    #[error("account disabled")]
    UserDisabled,

    /// Too many failed attempts.
    #[error("too many attempts")]
    TooManyAttempts,

    /// The refresh token was rejected; the visitor must sign in again.
    #[error("session expired")]
    SessionExpired,

    /// OAuth state missing or mismatched.
    #[error("invalid OAuth state")]
    InvalidOAuthState,

    /// Google sign-in is not configured.
    #[error("Google sign-in is not configured")]
    GoogleDisabled,

    /// Backend call failed.
    #[error("backend error: {0}")]
    Backend(BackendError),

    /// Client storage could not be written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<cineteca_core::EmailError> for AuthError {
    fn from(_: cineteca_core::EmailError) -> Self {
        Self::InvalidEmail
    }
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Identity(code) => match code {
                IdentityErrorCode::EmailExists => Self::EmailInUse,
                IdentityErrorCode::InvalidEmail => Self::InvalidEmail,
                IdentityErrorCode::WeakPassword => Self::WeakPassword,
                IdentityErrorCode::EmailNotFound
                | IdentityErrorCode::InvalidPassword
                | IdentityErrorCode::InvalidCredentials => Self::InvalidCredentials,
                IdentityErrorCode::UserDisabled => Self::UserDisabled,
                IdentityErrorCode::TooManyAttempts => Self::TooManyAttempts,
                IdentityErrorCode::TokenExpired => Self::SessionExpired,
                other @ IdentityErrorCode::Other(_) => Self::Backend(BackendError::Identity(other)),
            },
            other => Self::Backend(other),
        }
    }
}

impl AuthError {
    /// Message shown to the visitor.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::EmailInUse => "This email is already registered.",
            Self::InvalidEmail => "The email address is not valid.",
            Self::WeakPassword => "The password must be at least 6 characters.",
            Self::InvalidCredentials => "Incorrect email or password.",
            Self::UserDisabled => "This account has been disabled.",
            Self::TooManyAttempts => "Too many attempts. Please wait a moment and try again.",
            Self::SessionExpired => "Your session has expired. Please sign in again.",
            Self::InvalidOAuthState => "The sign-in attempt expired. Please try again.",
            Self::GoogleDisabled => "Google sign-in is not available.",
            Self::Backend(_) | Self::Storage(_) => GENERIC_MESSAGE,
        }
    }

    /// Whether this is a server-side failure worth reporting.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Storage(_))
    }
}
