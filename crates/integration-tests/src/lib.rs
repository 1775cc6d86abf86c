//! Integration tests for Cineteca.
//!
//! Every test talks to a running storefront over HTTP and is `#[ignore]`d
//! by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Create the session table and start the storefront
//! cargo run -p cineteca-cli -- migrate
//! cargo run -p cineteca-storefront
//!
//! # Run integration tests
//! cargo test -p cineteca-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - defaults to `http://localhost:3000`
//! - `TEST_USER_EMAIL` / `TEST_USER_PASSWORD` - an existing backend account,
//!   needed by the signed-in tests

use reqwest::{Client, redirect};

/// Base URL for the storefront (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client that keeps the session cookie and does not follow redirects,
/// so tests can assert on `Location`.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Credentials of the test account, when configured.
#[must_use]
pub fn test_credentials() -> Option<(String, String)> {
    let email = std::env::var("TEST_USER_EMAIL").ok()?;
    let password = std::env::var("TEST_USER_PASSWORD").ok()?;
    Some((email, password))
}

/// The `Location` header of a redirect, or an empty string.
#[must_use]
pub fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
