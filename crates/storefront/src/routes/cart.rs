//! Cart route handlers.
//!
//! The cart lives in client storage; checkout records a purchase in the
//! document store and empties it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use cineteca_core::MovieId;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CartItem;
use crate::routes::Layout;
use crate::services::{Cart, CheckoutError, PurchaseService};
use crate::state::AppState;
use crate::storage::{ClientStorage, Flash};

/// Remove-from-cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub id: MovieId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub layout: Layout,
    pub items: Vec<CartItem>,
}

/// Cart count badge fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: usize,
}

/// Display the cart page.
#[instrument(skip(layout, storage))]
pub async fn show(layout: Layout, storage: ClientStorage) -> impl IntoResponse {
    let cart = Cart::load(&storage).await;
    CartTemplate {
        layout,
        items: cart.items().to_vec(),
    }
}

/// Remove a movie from the cart.
#[instrument(skip(storage))]
pub async fn remove(storage: ClientStorage, Form(form): Form<RemoveForm>) -> Result<Response> {
    let mut cart = Cart::load(&storage).await;
    cart.remove(form.id);
    cart.save(&storage).await?;
    Ok(Redirect::to("/cart").into_response())
}

/// Get the cart count badge (fragment).
pub async fn count(storage: ClientStorage) -> impl IntoResponse {
    CartCountTemplate {
        count: Cart::load(&storage).await.len(),
    }
}

/// Record the cart as a purchase.
///
/// An empty cart or a failed write sends the visitor back to the cart with
/// a message; the cart is only cleared after the record is written.
#[instrument(skip(state, storage, user), fields(uid = %user.uid))]
pub async fn checkout(
    State(state): State<AppState>,
    storage: ClientStorage,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let mut cart = Cart::load(&storage).await;

    match PurchaseService::new(state.backend()).checkout(&user, &cart).await {
        Ok(_) => {
            cart.clear();
            cart.save(&storage).await?;
            storage
                .flash(Flash::success("Thank you! Your purchase was recorded."))
                .await;
            Ok(Redirect::to("/account/purchases").into_response())
        }
        Err(CheckoutError::EmptyCart) => {
            storage.flash(Flash::info("Your cart is empty.")).await;
            Ok(Redirect::to("/cart").into_response())
        }
        Err(CheckoutError::Backend(e)) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Checkout failed");
            storage
                .flash(Flash::error(crate::services::auth::GENERIC_MESSAGE))
                .await;
            Ok(Redirect::to("/cart").into_response())
        }
    }
}
