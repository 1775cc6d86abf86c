//! REST clients for the hosted backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth for accounts, profiles and purchases;
//!   there is no local sync
//! - One `reqwest::Client` is shared by every client
//! - Base URLs come from [`BackendConfig`] so tests can point them at a mock
//!
//! # Clients
//!
//! - [`IdentityClient`] - sign-up, password and identity-provider sign-in,
//!   password reset, profile updates and token refresh
//! - [`DocumentClient`] - document reads, writes with server timestamps and
//!   equality queries
//! - [`BlobClient`] - file uploads and public download URLs
//! - [`GoogleOAuthClient`] - authorization-code flow for "Sign in with Google"

mod blobs;
mod documents;
mod identity;
mod oauth;
mod value;

pub use blobs::{BlobClient, StoredObject};
pub use documents::{Document, DocumentClient, Fields, QueryOrder, fields_from};
pub use identity::{AuthAccount, IdentityClient, IdentityErrorCode, RefreshedTokens, UpdatedProfile};
pub use oauth::{GOOGLE_PROVIDER_ID, GoogleOAuthClient, GoogleTokens};
pub use value::Value;

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{BackendConfig, GoogleConfig};

/// Timeout applied to every backend request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the body (truncated).
        message: String,
    },

    /// A configured base URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The identity service rejected the request.
    #[error("identity error: {0}")]
    Identity(IdentityErrorCode),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The OAuth provider rejected the request.
    #[error("OAuth error: {0}")]
    OAuth(String),
}

/// All backend clients, sharing one connection pool.
#[derive(Clone)]
pub struct Backend {
    identity: IdentityClient,
    documents: DocumentClient,
    blobs: BlobClient,
    google: Option<GoogleOAuthClient>,
}

impl Backend {
    /// Build every client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig, google: Option<&GoogleConfig>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("Cineteca/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            identity: IdentityClient::new(client.clone(), config),
            documents: DocumentClient::new(client.clone(), config),
            blobs: BlobClient::new(client.clone(), config),
            google: google.map(|g| GoogleOAuthClient::new(client, g)),
        })
    }

    /// Get the identity client.
    #[must_use]
    pub const fn identity(&self) -> &IdentityClient {
        &self.identity
    }

    /// Get the document store client.
    #[must_use]
    pub const fn documents(&self) -> &DocumentClient {
        &self.documents
    }

    /// Get the object storage client.
    #[must_use]
    pub const fn blobs(&self) -> &BlobClient {
        &self.blobs
    }

    /// Get the Google OAuth client, if Google sign-in is configured.
    #[must_use]
    pub const fn google(&self) -> Option<&GoogleOAuthClient> {
        self.google.as_ref()
    }
}

/// Generate a cryptographically secure random alphanumeric string.
#[must_use]
pub fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET.get(idx).map_or('0', |b| char::from(*b))
        })
        .collect()
}

/// Standard `{"error": {"message": ...}}` body returned by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Read a response body, turning non-success statuses into [`BackendError::Status`].
async fn read_body(response: reqwest::Response) -> Result<String, BackendError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = error_message(&text);
        tracing::error!(
            status = %status,
            message = %message,
            "Backend returned non-success status"
        );
        return Err(BackendError::Status {
            status: status.as_u16(),
            message,
        });
    }

    Ok(text)
}

/// Extract the error message from a backend error body, falling back to the
/// raw text (truncated).
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| body.chars().take(200).collect(),
        |b| b.error.message,
    )
}

/// Parse a JSON body, logging a snippet of it when parsing fails.
fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        BackendError::Parse(e)
    })
}
