//! Data shared by every page: theme, navigation badge, search box and flash.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use cineteca_core::Theme;

use crate::models::{CartItem, CurrentUser, keys};
use crate::storage::{ClientStorage, Flash};

/// Signed-in user as shown in the navigation bar.
#[derive(Debug, Clone)]
pub struct UserBadge {
    pub name: String,
    pub initial: String,
    pub avatar_url: Option<String>,
}

impl From<&CurrentUser> for UserBadge {
    fn from(user: &CurrentUser) -> Self {
        Self {
            name: user.display_username(),
            initial: user.initial(),
            avatar_url: user.avatar_url(),
        }
    }
}

/// Page chrome read from client storage.
///
/// Extracting it consumes the pending flash message.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub theme: Theme,
    pub user: Option<UserBadge>,
    pub cart_count: usize,
    /// Current path and query, used by the theme toggle to come back.
    pub current_path: String,
    pub search_query: String,
    pub flash: Option<Flash>,
}

impl Layout {
    /// Prefill the search box.
    #[must_use]
    pub fn with_search(mut self, query: &str) -> Self {
        self.search_query = query.to_string();
        self
    }

    /// Whether the visitor is signed in.
    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Read the chrome for `storage`.
    pub async fn load(storage: &ClientStorage, current_path: String) -> Self {
        let user: Option<CurrentUser> = storage.get(keys::CURRENT_USER).await;
        let cart: Vec<CartItem> = storage.get(keys::CART).await.unwrap_or_default();

        Self {
            theme: storage.theme().await,
            user: user.as_ref().map(UserBadge::from),
            cart_count: cart.len(),
            current_path,
            search_query: String::new(),
            flash: storage.take_flash().await,
        }
    }
}

impl<S> FromRequestParts<S> for Layout
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let current_path = parts
            .uri
            .path_and_query()
            .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string());

        let layout = match parts.extensions.get::<Session>() {
            Some(session) => Self::load(&ClientStorage::new(session.clone()), current_path).await,
            None => Self {
                current_path,
                ..Self::default()
            },
        };
        Ok(layout)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::tests::storage;
    use cineteca_core::MovieId;

    #[tokio::test]
    async fn test_load_reads_client_storage() {
        let storage = storage();
        storage.set(keys::THEME, &Theme::Light).await.unwrap();
        storage
            .set(
                keys::CART,
                &vec![CartItem {
                    id: MovieId::new(1),
                    title: "Oldboy".to_string(),
                    image: String::new(),
                }],
            )
            .await
            .unwrap();
        storage.flash(Flash::info("Hello")).await;

        let layout = Layout::load(&storage, "/cart".to_string()).await;
        assert_eq!(layout.theme, Theme::Light);
        assert_eq!(layout.cart_count, 1);
        assert!(!layout.signed_in());
        assert_eq!(layout.flash.unwrap().message, "Hello");

        // The flash is shown once.
        let again = Layout::load(&storage, "/cart".to_string()).await;
        assert!(again.flash.is_none());
    }
}
