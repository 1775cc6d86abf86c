//! Identity REST client.
//!
//! Speaks the Identity Toolkit REST dialect: every call is a `POST` with the
//! project's web API key in the `key` query parameter, and failures come back
//! as `{"error": {"message": "EMAIL_EXISTS"}}`.

use std::fmt;
use std::sync::Arc;

use cineteca_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use super::{BackendError, error_message, parse_json};
use crate::config::BackendConfig;

/// Classified identity failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityErrorCode {
    EmailExists,
    InvalidEmail,
    WeakPassword,
    EmailNotFound,
    InvalidPassword,
    InvalidCredentials,
    UserDisabled,
    TooManyAttempts,
    TokenExpired,
    Other(String),
}

impl IdentityErrorCode {
    /// Classify a backend error message. Anything after ` : ` is detail text
    /// and is ignored.
    #[must_use]
    pub fn parse(message: &str) -> Self {
        let code = message.split(" : ").next().unwrap_or_default().trim();
        match code {
            "EMAIL_EXISTS" => Self::EmailExists,
            "INVALID_EMAIL" | "MISSING_EMAIL" => Self::InvalidEmail,
            "WEAK_PASSWORD" => Self::WeakPassword,
            "EMAIL_NOT_FOUND" => Self::EmailNotFound,
            "INVALID_PASSWORD" | "MISSING_PASSWORD" => Self::InvalidPassword,
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_IDP_RESPONSE" => Self::InvalidCredentials,
            "USER_DISABLED" => Self::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyAttempts,
            "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
                Self::TokenExpired
            }
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for IdentityErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmailExists => f.write_str("EMAIL_EXISTS"),
            Self::InvalidEmail => f.write_str("INVALID_EMAIL"),
            Self::WeakPassword => f.write_str("WEAK_PASSWORD"),
            Self::EmailNotFound => f.write_str("EMAIL_NOT_FOUND"),
            Self::InvalidPassword => f.write_str("INVALID_PASSWORD"),
            Self::InvalidCredentials => f.write_str("INVALID_LOGIN_CREDENTIALS"),
            Self::UserDisabled => f.write_str("USER_DISABLED"),
            Self::TooManyAttempts => f.write_str("TOO_MANY_ATTEMPTS_TRY_LATER"),
            Self::TokenExpired => f.write_str("TOKEN_EXPIRED"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

/// A signed-in account as returned by the identity service.
#[derive(Clone)]
pub struct AuthAccount {
    pub uid: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub id_token: SecretString,
    pub refresh_token: SecretString,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

impl fmt::Debug for AuthAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthAccount")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("photo_url", &self.photo_url)
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Fresh tokens from the secure-token endpoint.
#[derive(Clone)]
pub struct RefreshedTokens {
    pub id_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_in: i64,
}

/// Profile fields echoed back by `accounts:update`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    id_token: String,
    refresh_token: String,
    /// Seconds, encoded as a string.
    #[serde(default)]
    expires_in: Option<String>,
}

impl From<AccountResponse> for AuthAccount {
    fn from(r: AccountResponse) -> Self {
        Self {
            uid: UserId::new(r.local_id),
            email: r.email.filter(|e| !e.is_empty()),
            display_name: r.display_name.filter(|n| !n.is_empty()),
            photo_url: r.photo_url.filter(|p| !p.is_empty()),
            id_token: SecretString::from(r.id_token),
            refresh_token: SecretString::from(r.refresh_token),
            expires_in: parse_expires_in(r.expires_in.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'static str,
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

/// Default token lifetime when the backend omits it.
const DEFAULT_EXPIRES_IN: i64 = 3600;

fn parse_expires_in(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_EXPIRES_IN)
}

/// Client for the identity service.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    identity_url: String,
    token_url: String,
    api_key: SecretString,
}

impl IdentityClient {
    /// Create a new identity client.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            inner: Arc::new(IdentityClientInner {
                client,
                identity_url: config.identity_url.clone(),
                token_url: config.token_url.clone(),
                api_key: config.api_key.clone(),
            }),
        }
    }

    /// Create an email/password account.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Identity`] with `EmailExists`, `InvalidEmail`
    /// or `WeakPassword` when the backend rejects the credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthAccount, BackendError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account: AccountResponse = self.post("accounts:signUp", &body).await?;
        Ok(account.into())
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Identity`] when the credentials are rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthAccount, BackendError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account: AccountResponse = self.post("accounts:signInWithPassword", &body).await?;
        Ok(account.into())
    }

    /// Sign in with a third-party identity provider's id token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the provider token.
    #[instrument(skip(self, id_token))]
    pub async fn sign_in_with_idp(
        &self,
        id_token: &str,
        provider_id: &str,
        request_uri: &str,
    ) -> Result<AuthAccount, BackendError> {
        let body = IdpRequest {
            post_body: format!(
                "id_token={}&providerId={}",
                urlencoding::encode(id_token),
                urlencoding::encode(provider_id)
            ),
            request_uri,
            return_secure_token: true,
            return_idp_credential: true,
        };
        let account: AccountResponse = self.post("accounts:signInWithIdp", &body).await?;
        Ok(account.into())
    }

    /// Send a password-reset email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. Callers hide the outcome from
    /// visitors.
    #[instrument(skip(self))]
    pub async fn send_password_reset(&self, email: &str) -> Result<(), BackendError> {
        let body = OobRequest {
            request_type: "PASSWORD_RESET",
            email,
        };
        let _: serde_json::Value = self.post("accounts:sendOobCode", &body).await?;
        Ok(())
    }

    /// Set the display name and/or photo URL on the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the id token is rejected or the request fails.
    #[instrument(skip(self, id_token))]
    pub async fn update_profile(
        &self,
        id_token: &SecretString,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<UpdatedProfile, BackendError> {
        let body = UpdateRequest {
            id_token: id_token.expose_secret(),
            display_name,
            photo_url,
            return_secure_token: false,
        };
        self.post("accounts:update", &body).await
    }

    /// Exchange a refresh token for a new id token.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Identity`] with `TokenExpired` when the refresh
    /// token is no longer valid.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<RefreshedTokens, BackendError> {
        let url = self.url(&self.inner.token_url, "token")?;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
        ];

        let response = self.inner.client.post(url).form(&params).send().await?;
        let text = identity_body(response).await?;
        let tokens: TokenResponse = parse_json(&text)?;

        Ok(RefreshedTokens {
            id_token: SecretString::from(tokens.id_token),
            refresh_token: SecretString::from(tokens.refresh_token),
            expires_in: parse_expires_in(tokens.expires_in.as_deref()),
        })
    }

    fn url(&self, base: &str, method: &str) -> Result<Url, BackendError> {
        let mut url = Url::parse(&format!("{base}/{method}"))?;
        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret());
        Ok(url)
    }

    async fn post<B, T>(&self, method: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let url = self.url(&self.inner.identity_url, method)?;
        let response = self.inner.client.post(url).json(body).send().await?;
        let text = identity_body(response).await?;
        parse_json(&text)
    }
}

/// Read an identity response, classifying failures into [`IdentityErrorCode`].
async fn identity_body(response: reqwest::Response) -> Result<String, BackendError> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        return Ok(text);
    }

    let message = error_message(&text);
    let code = IdentityErrorCode::parse(&message);
    tracing::warn!(status = %status, code = %code, "Identity request rejected");

    if status.is_client_error() {
        Err(BackendError::Identity(code))
    } else {
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }
}
