//! Comment route handlers.
//!
//! Every action redirects back to the movie page with a flash message.
//! Ownership is checked here, not just hidden in the template.

use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use cineteca_core::{CommentId, MovieId};

use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::routes::movies::find_movie;
use crate::services::{CommentError, CommentThread};
use crate::state::AppState;
use crate::storage::{ClientStorage, Flash};

/// Comment form data. The rating arrives as text so an unselected rating
/// is reported as a validation message rather than a 400.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub message: String,
    pub rating: String,
}

impl CommentForm {
    fn rating(&self) -> Option<i64> {
        self.rating.trim().parse().ok()
    }
}

fn movie_url(id: MovieId) -> String {
    format!("/movies/{id}#comments")
}

async fn finish(
    storage: &ClientStorage,
    thread: &CommentThread,
    result: std::result::Result<(), CommentError>,
    success: &str,
    retry_url: String,
    done_url: String,
) -> Result<Response> {
    match result {
        Ok(()) => {
            thread.save(storage).await?;
            storage.flash(Flash::success(success)).await;
            Ok(Redirect::to(&done_url).into_response())
        }
        Err(e) => {
            storage.flash(Flash::error(e.to_string())).await;
            Ok(Redirect::to(&retry_url).into_response())
        }
    }
}

/// `POST /movies/{id}/comments`
#[instrument(skip(state, storage, user, form))]
pub async fn create(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
    storage: ClientStorage,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<CommentForm>,
) -> Result<Response> {
    find_movie(&state, id)?;
    let mut thread = CommentThread::load(&storage, state.catalog(), id).await;

    let result = thread
        .add(
            user.as_ref(),
            &form.message,
            form.rating(),
            Utc::now().timestamp_millis(),
        )
        .map(|_| ());

    finish(
        &storage,
        &thread,
        result,
        "Your comment was posted",
        movie_url(id),
        movie_url(id),
    )
    .await
}

/// `POST /movies/{id}/comments/{comment_id}`
#[instrument(skip(state, storage, user, form))]
pub async fn update(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(MovieId, CommentId)>,
    storage: ClientStorage,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<CommentForm>,
) -> Result<Response> {
    find_movie(&state, id)?;
    let mut thread = CommentThread::load(&storage, state.catalog(), id).await;

    let result = thread.edit(user.as_ref(), comment_id, &form.message, form.rating());
    let retry = if matches!(result, Err(CommentError::Invalid)) {
        format!("/movies/{id}?edit={comment_id}#comments")
    } else {
        movie_url(id)
    };

    finish(&storage, &thread, result, "Your comment was updated", retry, movie_url(id)).await
}

/// `POST /movies/{id}/comments/{comment_id}/delete`
#[instrument(skip(state, storage, user))]
pub async fn delete(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(MovieId, CommentId)>,
    storage: ClientStorage,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    find_movie(&state, id)?;
    let mut thread = CommentThread::load(&storage, state.catalog(), id).await;

    let result = thread.delete(user.as_ref(), comment_id);
    finish(
        &storage,
        &thread,
        result,
        "Your comment was deleted",
        movie_url(id),
        movie_url(id),
    )
    .await
}
