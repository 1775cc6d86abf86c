//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in user in route handlers.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{Method, StatusCode, header::REFERER, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, keys};
use crate::services::AuthService;
use crate::state::AppState;
use crate::storage::{ClientStorage, StorageError};

/// Extractor that requires a signed-in user.
///
/// If the visitor is not signed in, returns a redirect to the login page
/// that comes back to the current path. An id token close to expiry is
/// refreshed before the handler runs, so handlers can call the backend with
/// `user.id_token` directly.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_username())
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the visitor is not signed in.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests), carrying the return path.
    RedirectToLogin(String),
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(next) => Redirect::to(&login_url(&next)).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl AuthRejection {
    fn for_request(parts: &Parts) -> Self {
        let is_api = parts.uri.path().starts_with("/api/");
        if is_api {
            return Self::Unauthorized;
        }
        // A form post cannot be replayed after sign-in; return to the page
        // that held the form instead.
        let next = if parts.method == Method::GET {
            parts
                .uri
                .path_and_query()
                .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string())
        } else {
            parts
                .headers
                .get(REFERER)
                .and_then(|v| v.to_str().ok())
                .and_then(|r| url::Url::parse(r).ok())
                .map_or_else(|| "/".to_string(), |u| local_path(&u))
        };
        Self::RedirectToLogin(safe_next(Some(&next)))
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;
        let storage = ClientStorage::new(session);

        let mut user: CurrentUser = storage
            .get(keys::CURRENT_USER)
            .await
            .ok_or_else(|| AuthRejection::for_request(parts))?;

        let state = AppState::from_ref(state);
        match AuthService::new(state.backend())
            .refresh_if_needed(&mut user)
            .await
        {
            Ok(false) => {}
            Ok(true) => {
                if let Err(e) = storage.set(keys::CURRENT_USER, &user).await {
                    tracing::warn!(error = %e, "Failed to store refreshed tokens");
                }
            }
            Err(e) => {
                tracing::info!(uid = %user.uid, error = %e, "Token refresh failed, signing out");
                if let Err(e) = clear_current_user(&storage).await {
                    tracing::warn!(error = %e, "Failed to clear signed-out user");
                }
                return Err(AuthRejection::for_request(parts));
            }
        }

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the visitor is
/// not signed in, and it never refreshes tokens.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     OptionalAuth(user): OptionalAuth,
/// ) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}!", u.display_username()),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => {
                ClientStorage::new(session.clone())
                    .get::<CurrentUser>(keys::CURRENT_USER)
                    .await
            }
            None => None,
        };

        Ok(Self(user))
    }
}

/// Helper to set the current user in client storage.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    storage: &ClientStorage,
    user: &CurrentUser,
) -> Result<(), StorageError> {
    storage.set(keys::CURRENT_USER, user).await?;
    crate::error::set_sentry_user(&user.uid, user.email.as_deref());
    Ok(())
}

/// Helper to clear the current user (logout). Cart, comments and theme stay.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(storage: &ClientStorage) -> Result<(), StorageError> {
    storage.remove(keys::CURRENT_USER).await?;
    crate::error::clear_sentry_user();
    Ok(())
}

/// Login page URL that returns to `next` afterwards.
#[must_use]
pub fn login_url(next: &str) -> String {
    if next == "/" {
        "/auth/login".to_string()
    } else {
        format!("/auth/login?next={}", urlencoding::encode(next))
    }
}

fn local_path(url: &url::Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

/// `next` if it is a local path, else `/`.
///
/// Protocol-relative (`//host`) and backslash tricks are refused.
#[must_use]
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.contains(['\r', '\n']) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
