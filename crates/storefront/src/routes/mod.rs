//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (?q= search)
//! GET  /health                 - Health check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Movies
//! GET  /movies/{shelf}         - Category shelf (?genre=, ?category=)
//! GET  /movies/{id}            - Movie detail and comments (?edit=, ?delete=)
//! POST /movies/{id}/cart       - Add to cart
//! POST /movies/{id}/comments   - Add comment
//! POST /movies/{id}/comments/{comment_id}        - Edit comment
//! POST /movies/{id}/comments/{comment_id}/delete - Delete comment
//!
//! # Cart
//! GET  /cart                   - Cart page
//! POST /cart/remove            - Remove item
//! GET  /cart/count             - Cart count badge (fragment)
//! POST /checkout               - Record purchase (requires auth)
//!
//! # Auth (rate limited)
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action (multipart, optional avatar)
//! GET  /auth/forgot-password   - Password reset page
//! POST /auth/forgot-password   - Send password reset email
//! POST /auth/logout            - Logout action
//! GET  /auth/google/login      - Redirect to Google
//! GET  /auth/google/callback   - Handle Google callback
//!
//! # Account (requires auth)
//! GET  /account                - Profile form
//! POST /account                - Save profile (multipart, optional avatar)
//! GET  /account/purchases      - Purchase history
//!
//! POST /theme                  - Toggle dark/light theme
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod comments;
pub mod google_auth;
pub mod home;
pub mod layout;
pub mod movies;
pub mod theme;
pub mod upload;

pub use layout::Layout;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Body limit for forms carrying an avatar: the file plus the text fields.
const UPLOAD_BODY_LIMIT: usize = upload::MAX_AVATAR_BYTES + 64 * 1024;

/// Create the movie routes router.
///
/// `/{id}` serves both shelves and detail pages; the handler tells them apart.
pub fn movie_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(movies::show))
        .route("/{id}/cart", post(movies::add_to_cart))
        .route("/{id}/comments", post(comments::create))
        .route("/{id}/comments/{comment_id}", post(comments::update))
        .route("/{id}/comments/{comment_id}/delete", post(comments::delete))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route(
            "/register",
            get(auth::register_page)
                .post(auth::register)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route("/logout", post(auth::logout))
        // Google sign-in
        .route("/google/login", get(google_auth::login))
        .route("/google/callback", get(google_auth::callback))
        .layer(auth_rate_limiter())
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(account::profile)
                .post(account::update_profile)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/purchases", get(account::purchases))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Shelves, detail pages, comments
        .nest("/movies", movie_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        .route("/checkout", post(cart::checkout))
        // Account routes (RequireAuth in each handler)
        .nest("/account", account_routes())
        // Auth routes
        .nest("/auth", auth_routes())
        .route("/theme", post(theme::toggle))
}
