//! Google OAuth 2.0 client for the authorization-code flow.
//!
//! # Flow
//!
//! 1. Redirect the visitor to [`GoogleOAuthClient::authorization_url`]
//! 2. Google redirects back with an authorization code
//! 3. Exchange it with [`GoogleOAuthClient::exchange_code`]
//! 4. Hand the returned id token to the identity service
//!    (`sign_in_with_idp` with provider `google.com`)

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::BackendError;
use crate::config::GoogleConfig;

/// Provider id understood by the identity service.
pub const GOOGLE_PROVIDER_ID: &str = "google.com";

/// Tokens returned by Google's token endpoint.
#[derive(Clone, Debug)]
pub struct GoogleTokens {
    pub id_token: SecretString,
    pub access_token: SecretString,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    id_token: Option<String>,
}

/// Client for Google's OAuth endpoints.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    inner: Arc<GoogleOAuthClientInner>,
}

struct GoogleOAuthClientInner {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    auth_url: String,
    token_url: String,
}

impl GoogleOAuthClient {
    /// Create a new OAuth client.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &GoogleConfig) -> Self {
        Self {
            inner: Arc::new(GoogleOAuthClientInner {
                client,
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                auth_url: config.auth_url.clone(),
                token_url: config.token_url.clone(),
            }),
        }
    }

    /// Generate the authorization URL the visitor is redirected to.
    ///
    /// # Arguments
    ///
    /// * `redirect_uri` - The callback URL to redirect to after authentication
    /// * `state` - A random string stored in client storage to prevent CSRF attacks
    /// * `nonce` - A random string for `OpenID` Connect replay protection
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str, nonce: &str) -> String {
        format!(
            "{}?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            scope=openid%20email%20profile&\
            prompt=select_account&\
            state={}&\
            nonce={}",
            self.inner.auth_url,
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
            urlencoding::encode(nonce)
        )
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::OAuth`] if the exchange is rejected or the
    /// response carries no id token.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<GoogleTokens, BackendError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .inner
            .client
            .post(&self.inner.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::OAuth(format!(
                "Token exchange failed: {}",
                text.chars().take(200).collect::<String>()
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        let id_token = token_response
            .id_token
            .ok_or_else(|| BackendError::OAuth("Token response missing id_token".to_string()))?;

        Ok(GoogleTokens {
            id_token: SecretString::from(id_token),
            access_token: SecretString::from(token_response.access_token),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(token_url: String) -> GoogleConfig {
        GoogleConfig {
            client_id: "client-123".to_string(),
            client_secret: SecretString::from("s3cr3t-value"),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url,
        }
    }

    #[test]
    fn test_authorization_url() {
        let client = GoogleOAuthClient::new(
            reqwest::Client::new(),
            &config("https://oauth2.googleapis.com/token".to_string()),
        );
        let url = client.authorization_url(
            "http://localhost:3000/auth/google/callback",
            "state-1",
            "nonce-1",
        );

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?client_id=client-123&"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("state=state-1"));
        assert!(url.contains("nonce=nonce-1"));
        assert!(url.contains("scope=openid%20email%20profile"));
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access",
                "id_token": "google-id-token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(
            reqwest::Client::new(),
            &config(format!("{}/token", server.uri())),
        );
        let tokens = client
            .exchange_code("auth-code", "http://localhost:3000/auth/google/callback")
            .await
            .unwrap();

        assert_eq!(tokens.id_token.expose_secret(), "google-id-token");
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let client = GoogleOAuthClient::new(
            reqwest::Client::new(),
            &config(format!("{}/token", server.uri())),
        );
        let err = client.exchange_code("bad", "http://x").await.unwrap_err();

        assert!(matches!(err, BackendError::OAuth(_)));
    }
}
