//! Client storage.
//!
//! A per-visitor key/value store backed by the visitor's session. Each key
//! holds one JSON value, mirroring what a browser keeps in local storage:
//! the cart, per-movie comments, the theme and the signed-in user.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tower_sessions::Session;

use cineteca_core::Theme;

use crate::models::keys;

/// Error writing to client storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Kind of a flash message, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    /// CSS modifier class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A one-shot message shown on the next page render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }
}

/// Visitor-scoped key/value storage.
#[derive(Debug, Clone)]
pub struct ClientStorage {
    session: Session,
}

impl ClientStorage {
    /// Wrap a session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Read a value. Missing keys and values that no longer decode are both
    /// treated as absent; the latter is logged.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.session.get::<T>(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unreadable client storage value");
                None
            }
        }
    }

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn set<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        self.session.insert(key, value).await?;
        Ok(())
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.session.remove_value(key).await?;
        Ok(())
    }

    /// The visitor's theme, dark by default.
    pub async fn theme(&self) -> Theme {
        self.get(keys::THEME).await.unwrap_or_default()
    }

    /// Queue a flash message for the next page.
    ///
    /// Failures are logged; a lost flash message is not worth failing the
    /// request over.
    pub async fn flash(&self, flash: Flash) {
        if let Err(e) = self.set(keys::FLASH, &flash).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    /// Take the pending flash message, if any.
    pub async fn take_flash(&self) -> Option<Flash> {
        match self.session.remove::<Flash>(keys::FLASH).await {
            Ok(flash) => flash,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable flash message");
                None
            }
        }
    }
}

impl<S> FromRequestParts<S> for ClientStorage
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(Self::new)
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session layer missing",
            ))
    }
}
