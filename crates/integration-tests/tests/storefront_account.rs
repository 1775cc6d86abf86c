//! Integration tests for signed-in flows: comments and checkout.
//!
//! These tests require:
//! - A running storefront (cargo run -p cineteca-storefront)
//! - `TEST_USER_EMAIL` / `TEST_USER_PASSWORD` for an existing backend account

use cineteca_integration_tests::{
    location, session_client, storefront_base_url, test_credentials,
};
use reqwest::{Client, StatusCode};
use uuid::Uuid;

/// Sign in with the test account; returns `None` when it is not configured.
async fn signed_in_client() -> Option<Client> {
    let (email, password) = test_credentials()?;
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .post(format!("{base_url}/auth/login"))
        .form(&[
            ("email", email.as_str()),
            ("password", password.as_str()),
            ("next", "/account"),
        ])
        .send()
        .await
        .expect("Failed to sign in");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/account");

    Some(client)
}

#[tokio::test]
#[ignore = "Requires running storefront and a test account"]
async fn test_comment_lifecycle() {
    let Some(client) = signed_in_client().await else {
        return;
    };
    let base_url = storefront_base_url();
    let marker = format!("integration {}", Uuid::new_v4());

    let resp = client
        .post(format!("{base_url}/movies/2/comments"))
        .form(&[("message", marker.as_str()), ("rating", "4")])
        .send()
        .await
        .expect("Failed to post comment");
    assert_eq!(location(&resp), "/movies/2#comments");

    let body = client
        .get(format!("{base_url}/movies/2"))
        .send()
        .await
        .expect("Failed to get movie")
        .text()
        .await
        .expect("Failed to read response");
    assert!(body.contains(&marker));
    assert!(body.contains("Your comment was posted"));
}

#[tokio::test]
#[ignore = "Requires running storefront and a test account"]
async fn test_checkout_records_purchase() {
    let Some(client) = signed_in_client().await else {
        return;
    };
    let base_url = storefront_base_url();

    client
        .post(format!("{base_url}/movies/3/cart"))
        .send()
        .await
        .expect("Failed to add to cart");

    let resp = client
        .post(format!("{base_url}/checkout"))
        .send()
        .await
        .expect("Failed to checkout");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/account/purchases");

    let body = client
        .get(format!("{base_url}/account/purchases"))
        .send()
        .await
        .expect("Failed to get purchases")
        .text()
        .await
        .expect("Failed to read response");
    assert!(body.contains("Thank you! Your purchase was recorded."));

    let count = client
        .get(format!("{base_url}/cart/count"))
        .send()
        .await
        .expect("Failed to get cart count")
        .text()
        .await
        .expect("Failed to read response");
    assert_eq!(count.trim(), "0");
}
