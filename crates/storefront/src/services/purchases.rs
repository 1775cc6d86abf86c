//! Purchase records.
//!
//! A checkout writes one document to `compras` and is never updated.

use thiserror::Error;
use tracing::instrument;

use crate::backend::{Backend, BackendError, QueryOrder, Value, fields_from};
use crate::models::purchase::{self, NewPurchase, Purchase};
use crate::models::CurrentUser;
use crate::services::cart::Cart;

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Reads and writes purchase records.
pub struct PurchaseService<'a> {
    backend: &'a Backend,
}

impl<'a> PurchaseService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Record the cart contents as a purchase and return the document id.
    ///
    /// The caller clears the cart once this succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` for an empty cart, or
    /// `CheckoutError::Backend` if the write fails.
    #[instrument(skip(self, user, cart), fields(uid = %user.uid, items = cart.len()))]
    pub async fn checkout(&self, user: &CurrentUser, cart: &Cart) -> Result<String, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let record = NewPurchase {
            uid: user.uid.clone(),
            items: cart.items().to_vec(),
            item_count: cart.len(),
        };
        let id = self
            .backend
            .documents()
            .create(
                purchase::COLLECTION,
                fields_from(&record)?,
                &[purchase::DATE_FIELD],
                &user.id_token,
            )
            .await?;

        tracing::info!(purchase_id = %id, "Purchase recorded");
        Ok(id)
    }

    /// The user's purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails. Records that cannot be decoded
    /// are skipped.
    #[instrument(skip(self, user), fields(uid = %user.uid))]
    pub async fn list_for_user(&self, user: &CurrentUser) -> Result<Vec<Purchase>, BackendError> {
        let docs = self
            .backend
            .documents()
            .query_eq_ordered(
                purchase::COLLECTION,
                "uid",
                Value::from(user.uid.as_str()),
                purchase::DATE_FIELD,
                QueryOrder::Descending,
                &user.id_token,
            )
            .await?;

        let purchases = docs
            .into_iter()
            .filter_map(|doc| match doc.decode::<Purchase>() {
                Ok(mut purchase) => {
                    purchase.id = doc.id;
                    Some(purchase)
                }
                Err(e) => {
                    tracing::warn!(id = %doc.id, error = %e, "Skipping malformed purchase");
                    None
                }
            })
            .collect();
        Ok(purchases)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::AuthAccount;
    use crate::config::BackendConfig;
    use crate::models::CartItem;
    use crate::models::cart::PLACEHOLDER_POSTER;
    use cineteca_core::{MovieId, UserId};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ROOT: &str = "/documents/projects/cineteca-test/databases/(default)/documents";

    fn backend(server: &MockServer) -> Backend {
        Backend::new(&BackendConfig::for_base_url(&server.uri()), None).unwrap()
    }

    fn signed_in() -> CurrentUser {
        CurrentUser::from_account(
            AuthAccount {
                uid: UserId::new("uid-1"),
                email: Some("ana@cineteca.co".to_string()),
                display_name: None,
                photo_url: None,
                id_token: "id-token".to_string().into(),
                refresh_token: "refresh-token".to_string().into(),
                expires_in: 3600,
            },
            None,
        )
    }

    #[tokio::test]
    async fn test_checkout_refuses_empty_cart() {
        let server = MockServer::start().await;
        let backend = backend(&server);

        let err = PurchaseService::new(&backend)
            .checkout(&signed_in(), &Cart::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_writes_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{ROOT}:commit")))
            .and(body_partial_json(json!({
                "writes": [{
                    "update": {"fields": {
                        "uid": {"stringValue": "uid-1"},
                        "cantidad": {"integerValue": "1"},
                        "items": {"arrayValue": {"values": [{"mapValue": {"fields": {
                            "id": {"integerValue": "7"},
                            "titulo": {"stringValue": "Oldboy"}
                        }}}]}}
                    }},
                    "currentDocument": {"exists": false},
                    "updateTransforms": [{"fieldPath": "fecha", "setToServerValue": "REQUEST_TIME"}]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"writeResults": [{}]})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server);
        let mut cart = Cart::default();
        cart.add(CartItem {
            id: MovieId::new(7),
            title: "Oldboy".to_string(),
            image: "https://picsum.photos/seed/7/300/450".to_string(),
        });

        let id = PurchaseService::new(&backend)
            .checkout(&signed_in(), &cart)
            .await
            .unwrap();
        assert_eq!(id.len(), 20);
    }

    #[tokio::test]
    async fn test_list_for_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{ROOT}:runQuery")))
            .and(body_partial_json(json!({
                "structuredQuery": {
                    "from": [{"collectionId": "compras"}],
                    "orderBy": [{"field": {"fieldPath": "fecha"}, "direction": "DESCENDING"}]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"document": {
                    "name": "projects/cineteca-test/databases/(default)/documents/compras/AAAAAAAAAAAAAAA3XyZ9",
                    "fields": {
                        "uid": {"stringValue": "uid-1"},
                        "cantidad": {"integerValue": "3"},
                        "items": {"arrayValue": {"values": [
                            {"mapValue": {"fields": {
                                "id": {"integerValue": "7"},
                                "titulo": {"stringValue": "Oldboy"},
                                "imagen": {"stringValue": "https://img/7.jpg"}
                            }}},
                            {"mapValue": {"fields": {
                                "id": {"integerValue": "8"},
                                "titulo": {"stringValue": "Akira"}
                            }}},
                            {"stringValue": "Parásitos"}
                        ]}},
                        "fecha": {"timestampValue": "2024-03-01T10:05:00Z"}
                    }
                }},
                {"document": {
                    "name": "projects/cineteca-test/databases/(default)/documents/compras/broken",
                    "fields": {"cantidad": {"stringValue": "lots"}}
                }}
            ])))
            .mount(&server)
            .await;

        let backend = backend(&server);
        let purchases = PurchaseService::new(&backend)
            .list_for_user(&signed_in())
            .await
            .unwrap();

        assert_eq!(purchases.len(), 1);
        let purchase = &purchases[0];
        assert_eq!(purchase.short_id(), "3XyZ9");
        assert_eq!(purchase.item_count, 3);
        assert_eq!(purchase.formatted_date(), "01 March 2024, 10:05");

        let titles: Vec<&str> = purchase.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Oldboy", "Akira", "Parásitos"]);
        assert_eq!(purchase.items[0].poster(), "https://img/7.jpg");
        assert_eq!(purchase.items[1].poster(), PLACEHOLDER_POSTER);
        assert_eq!(purchase.items[2].id, None);
    }
}
