//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::catalog::HomeRow;
use crate::filters;
use crate::routes::Layout;
use crate::state::AppState;

/// Search box query.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub q: String,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate<'a> {
    pub layout: Layout,
    pub rows: Vec<HomeRow<'a>>,
    pub query: String,
}

/// Display the home page: one row per featured category, filtered by `?q=`.
#[instrument(skip(state, layout))]
pub async fn home(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<SearchQuery>,
) -> Response {
    let q = query.q.trim();
    let rows = state.catalog().home_rows(q);
    if rows.is_empty() {
        tracing::debug!(query = %q, "Search returned no movies");
    }

    HomeTemplate {
        layout: layout.with_search(q),
        rows,
        query: q.to_string(),
    }
    .into_response()
}
