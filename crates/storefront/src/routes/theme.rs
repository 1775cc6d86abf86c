//! Theme toggle.

use axum::{
    Form,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::safe_next;
use crate::models::keys;
use crate::storage::ClientStorage;

/// Theme toggle form: the page to return to.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ThemeForm {
    pub next: Option<String>,
}

/// Switch between dark and light, then go back to the page the toggle was on.
#[instrument(skip(storage))]
pub async fn toggle(storage: ClientStorage, Form(form): Form<ThemeForm>) -> Result<Response> {
    let theme = storage.theme().await.toggled();
    storage.set(keys::THEME, &theme).await?;
    tracing::debug!(theme = theme.as_str(), "Theme changed");
    Ok(Redirect::to(&safe_next(form.next.as_deref())).into_response())
}
