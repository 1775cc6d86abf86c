//! Google sign-in route handlers.
//!
//! Handles the OAuth flow for Google accounts:
//! - Login: Redirects to Google's authorization page
//! - Callback: Exchanges the code and signs the user in to the identity service

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::backend::generate_random_string;
use crate::middleware::{safe_next, set_current_user};
use crate::models::keys;
use crate::routes::auth::NextQuery;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;
use crate::storage::{ClientStorage, Flash};

/// Query parameters from the Google OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
}

/// Values kept in client storage between the redirect and the callback.
#[derive(Debug)]
struct PendingLogin {
    state: String,
    nonce: String,
    next: String,
}

fn redirect_uri(state: &AppState) -> String {
    format!("{}/auth/google/callback", state.config().base_url)
}

async fn fail(storage: &ClientStorage, message: &str) -> Response {
    storage.flash(Flash::error(message)).await;
    Redirect::to("/auth/login").into_response()
}

/// Initiate Google login.
///
/// Generates state and nonce parameters, stores them in client storage,
/// and redirects to Google's authorization page.
///
/// # Route
///
/// `GET /auth/google/login`
pub async fn login(
    State(state): State<AppState>,
    storage: ClientStorage,
    Query(query): Query<NextQuery>,
) -> Response {
    let pending = PendingLogin {
        state: generate_random_string(32),
        nonce: generate_random_string(32),
        next: safe_next(query.next.as_deref()),
    };

    let stored = async {
        storage.set(keys::OAUTH_STATE, &pending.state).await?;
        storage.set(keys::OAUTH_NONCE, &pending.nonce).await?;
        storage.set(keys::OAUTH_NEXT, &pending.next).await
    };
    if let Err(e) = stored.await {
        tracing::error!(error = %e, "Failed to store OAuth state");
        return fail(&storage, crate::services::auth::GENERIC_MESSAGE).await;
    }

    match AuthService::new(state.backend()).google_authorization_url(
        &redirect_uri(&state),
        &pending.state,
        &pending.nonce,
    ) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Google sign-in requested but not configured");
            fail(&storage, e.user_message()).await
        }
    }
}

/// Handle the Google OAuth callback.
///
/// Validates the state parameter, signs the user in and returns them to the
/// page they started from.
///
/// # Route
///
/// `GET /auth/google/callback`
pub async fn callback(
    State(state): State<AppState>,
    storage: ClientStorage,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let stored_state: Option<String> = storage.get(keys::OAUTH_STATE).await;
    let next: Option<String> = storage.get(keys::OAUTH_NEXT).await;

    // One-time use, whatever the outcome.
    for key in [keys::OAUTH_STATE, keys::OAUTH_NONCE, keys::OAUTH_NEXT] {
        if let Err(e) = storage.remove(key).await {
            tracing::warn!(key, error = %e, "Failed to clear OAuth state");
        }
    }

    if let Some(error) = query.error {
        tracing::info!(%error, "Google sign-in was cancelled");
        return fail(&storage, "Google sign-in was cancelled.").await;
    }

    let Some(code) = query.code else {
        tracing::warn!("Google OAuth callback missing code");
        return fail(&storage, crate::services::auth::GENERIC_MESSAGE).await;
    };

    if stored_state.is_none() || stored_state != query.state {
        tracing::warn!("Google OAuth state mismatch");
        return fail(&storage, AuthError::InvalidOAuthState.user_message()).await;
    }

    let user = match AuthService::new(state.backend())
        .login_with_google(&code, &redirect_uri(&state))
        .await
    {
        Ok(user) => user,
        Err(e) => {
            if e.is_internal() {
                let event_id = sentry::capture_error(&e);
                tracing::error!(error = %e, sentry_event_id = %event_id, "Google sign-in failed");
            }
            return fail(&storage, e.user_message()).await;
        }
    };

    if let Err(e) = set_current_user(&storage, &user).await {
        tracing::error!(error = %e, "Failed to store signed-in user");
        return fail(&storage, crate::services::auth::GENERIC_MESSAGE).await;
    }

    tracing::info!(uid = %user.uid, "Google user signed in");
    storage
        .flash(Flash::success(format!("Welcome, {}!", user.display_username())))
        .await;
    Redirect::to(&safe_next(next.as_deref())).into_response()
}
