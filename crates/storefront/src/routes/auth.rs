//! Authentication route handlers.
//!
//! Handles login, registration, password reset and logout against the
//! hosted identity service. Failed submissions re-render the form with a
//! message instead of redirecting, so the visitor keeps what they typed.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::{clear_current_user, safe_next, set_current_user};
use crate::routes::Layout;
use crate::routes::upload::AvatarForm;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;
use crate::storage::{ClientStorage, Flash};

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Where to go after signing in.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub email: String,
    pub next: String,
    pub google_enabled: bool,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub email: String,
    pub username: String,
    pub next: String,
    pub google_enabled: bool,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub layout: Layout,
    pub sent: bool,
}

fn render_error<T: IntoResponse>(error: &AuthError, page: T) -> Response {
    if error.is_internal() {
        let event_id = sentry::capture_error(error);
        tracing::error!(error = %error, sentry_event_id = %event_id, "Authentication failed");
    } else {
        tracing::info!(error = %error, "Authentication rejected");
    }
    let status = if error.is_internal() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, page).into_response()
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<NextQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        layout,
        error: None,
        email: String::new(),
        next: safe_next(query.next.as_deref()),
        google_enabled: state.backend().google().is_some(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, layout, storage, form))]
pub async fn login(
    State(state): State<AppState>,
    layout: Layout,
    storage: ClientStorage,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(form.next.as_deref());

    match AuthService::new(state.backend())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            set_current_user(&storage, &user).await?;
            storage
                .flash(Flash::success(format!("Welcome back, {}!", user.display_username())))
                .await;
            Ok(Redirect::to(&next).into_response())
        }
        Err(e) => Ok(render_error(
            &e,
            LoginTemplate {
                layout,
                error: Some(e.user_message().to_string()),
                email: form.email,
                next,
                google_enabled: state.backend().google().is_some(),
            },
        )),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<NextQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        layout,
        error: None,
        email: String::new(),
        username: String::new(),
        next: safe_next(query.next.as_deref()),
        google_enabled: state.backend().google().is_some(),
    }
}

/// Handle registration form submission (multipart, with an optional avatar).
///
/// The visitor is signed in straight away.
#[instrument(skip(state, layout, storage, multipart))]
pub async fn register(
    State(state): State<AppState>,
    layout: Layout,
    storage: ClientStorage,
    multipart: Multipart,
) -> Result<Response> {
    let form = AvatarForm::parse(multipart).await?;
    let email = form.text("email").trim().to_string();
    let username = form.text("username").trim().to_string();
    let next = safe_next(Some(form.text("next")));

    let page = |error: String| RegisterTemplate {
        layout: layout.clone(),
        error: Some(error),
        email: email.clone(),
        username: username.clone(),
        next: next.clone(),
        google_enabled: state.backend().google().is_some(),
    };

    if form.text("password") != form.text("password_confirm") {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            page("Passwords do not match.".to_string()),
        )
            .into_response());
    }
    if form.rejected_avatar {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            page("The avatar must be an image.".to_string()),
        )
            .into_response());
    }

    match AuthService::new(state.backend())
        .register(&email, form.text("password"), &username, form.avatar.clone())
        .await
    {
        Ok(user) => {
            set_current_user(&storage, &user).await?;
            storage
                .flash(Flash::success(format!("Welcome, {}!", user.display_username())))
                .await;
            Ok(Redirect::to(&next).into_response())
        }
        Err(e) => Ok(render_error(&e, page(e.user_message().to_string()))),
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(layout: Layout) -> impl IntoResponse {
    ForgotPasswordTemplate { layout, sent: false }
}

/// Handle forgot password form submission.
///
/// Always reports success so the page does not reveal which emails have
/// accounts.
#[instrument(skip(state, layout, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    layout: Layout,
    Form(form): Form<ForgotPasswordForm>,
) -> impl IntoResponse {
    AuthService::new(state.backend())
        .reset_password(&form.email)
        .await;

    ForgotPasswordTemplate { layout, sent: true }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out. Cart, comments and theme stay in client storage.
#[instrument(skip(storage))]
pub async fn logout(storage: ClientStorage) -> Result<Response> {
    clear_current_user(&storage).await?;
    storage.flash(Flash::info("You have signed out.")).await;
    Ok(Redirect::to("/").into_response())
}
