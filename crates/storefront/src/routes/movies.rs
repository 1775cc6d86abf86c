//! Movie route handlers: category shelves, detail pages and add-to-cart.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use cineteca_core::{CommentId, MovieId, Rating};

use crate::catalog::{Movie, Shelf, ShelfListing, ShelfQuery};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CartItem, Comment, CurrentUser};
use crate::routes::Layout;
use crate::services::{Cart, CommentThread};
use crate::state::AppState;
use crate::storage::{ClientStorage, Flash};

/// Message on the 404 page for unknown movies.
pub const MOVIE_NOT_FOUND: &str = "Movie not found";

/// Detail page query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetailQuery {
    /// Comment to load into the form for editing.
    pub edit: Option<String>,
    /// Comment awaiting delete confirmation.
    pub delete: Option<String>,
}

fn parse_comment_id(raw: Option<&str>) -> Option<CommentId> {
    raw.and_then(|s| CommentId::from_str(s).ok())
}

/// A comment as rendered on the detail page.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub id: CommentId,
    pub author_name: String,
    pub message: String,
    pub stars: String,
    pub rating: u8,
    pub is_mine: bool,
}

impl CommentView {
    fn new(comment: &Comment, user: Option<&CurrentUser>) -> Self {
        Self {
            id: comment.id,
            author_name: comment.author_name.clone(),
            message: comment.message.clone(),
            stars: comment.rating.stars(),
            rating: comment.rating.get(),
            is_mine: user.is_some_and(|u| comment.is_owned_by(&u.uid)),
        }
    }
}

/// Shelf page template.
#[derive(Template, WebTemplate)]
#[template(path = "movies/shelf.html")]
pub struct ShelfTemplate<'a> {
    pub layout: Layout,
    pub listing: ShelfListing<'a>,
    pub shelves: [Shelf; 5],
}

/// Movie detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "movies/show.html")]
pub struct MovieTemplate<'a> {
    pub layout: Layout,
    pub movie: &'a Movie,
    pub comments: Vec<CommentView>,
    /// Comment being edited, when `?edit=` names one of the viewer's.
    pub editing: Option<CommentView>,
    /// Comment awaiting delete confirmation.
    pub confirm_delete: Option<CommentId>,
    pub ratings: Vec<u8>,
}

impl MovieTemplate<'_> {
    /// Action URL of the comment form.
    #[must_use]
    pub fn form_action(&self) -> String {
        match &self.editing {
            Some(comment) => format!("/movies/{}/comments/{}", self.movie.id, comment.id),
            None => format!("/movies/{}/comments", self.movie.id),
        }
    }

    /// Whether `rating` is preselected in the form.
    #[must_use]
    pub fn rating_selected(&self, rating: &u8) -> bool {
        self.editing.as_ref().is_some_and(|c| c.rating == *rating)
    }

    /// Whether `id` is awaiting delete confirmation.
    #[must_use]
    pub fn confirming(&self, id: &CommentId) -> bool {
        self.confirm_delete == Some(*id)
    }
}

/// `GET /movies/{key}`: a numeric key is a movie, anything else a shelf.
#[instrument(skip(state, layout, storage, user, shelf_query, detail_query))]
pub async fn show(
    State(state): State<AppState>,
    Path(key): Path<String>,
    layout: Layout,
    storage: ClientStorage,
    OptionalAuth(user): OptionalAuth,
    Query(shelf_query): Query<ShelfQuery>,
    Query(detail_query): Query<DetailQuery>,
) -> Result<Response> {
    if let Ok(id) = MovieId::from_str(&key) {
        return movie_detail(&state, id, layout, &storage, user.as_ref(), &detail_query).await;
    }

    let shelf = Shelf::from_str(&key).map_err(|()| AppError::NotFound("Page not found".to_string()))?;
    Ok(ShelfTemplate {
        layout,
        listing: state.catalog().shelf_listing(shelf, &shelf_query),
        shelves: Shelf::ALL,
    }
    .into_response())
}

async fn movie_detail(
    state: &AppState,
    id: MovieId,
    layout: Layout,
    storage: &ClientStorage,
    user: Option<&CurrentUser>,
    query: &DetailQuery,
) -> Result<Response> {
    let movie = find_movie(state, id)?;
    let thread = CommentThread::load(storage, state.catalog(), id).await;

    let editing = parse_comment_id(query.edit.as_deref())
        .and_then(|cid| thread.editable(user, cid))
        .map(|c| CommentView::new(c, user));
    let confirm_delete = parse_comment_id(query.delete.as_deref())
        .filter(|cid| thread.editable(user, *cid).is_some());

    Ok(MovieTemplate {
        layout,
        movie,
        comments: thread
            .comments()
            .iter()
            .map(|c| CommentView::new(c, user))
            .collect(),
        editing,
        confirm_delete,
        ratings: Rating::all().map(Rating::get).collect(),
    }
    .into_response())
}

/// `POST /movies/{id}/cart`: add the movie to the cart and come back.
#[instrument(skip(state, storage))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
    storage: ClientStorage,
) -> Result<Response> {
    let movie = find_movie(&state, id)?;

    let mut cart = Cart::load(&storage).await;
    let outcome = cart.add(CartItem::from(movie));
    cart.save(&storage).await?;

    crate::error::add_breadcrumb("cart", "Added movie to cart", Some(&[("movie_id", &id.to_string())]));
    storage
        .flash(Flash::success(outcome.message(&movie.title)))
        .await;

    Ok(Redirect::to(&format!("/movies/{id}")).into_response())
}

/// Look up a movie or fail with the 404 page.
pub(crate) fn find_movie(state: &AppState, id: MovieId) -> Result<&Movie> {
    state
        .catalog()
        .find(id)
        .ok_or_else(|| AppError::NotFound(MOVIE_NOT_FOUND.to_string()))
}
