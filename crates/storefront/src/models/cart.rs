//! Cart line.

use serde::{Deserialize, Serialize};

use cineteca_core::MovieId;

use crate::catalog::Movie;

/// Shown when a stored line has no poster.
pub const PLACEHOLDER_POSTER: &str = "/static/img/placeholder.svg";

/// A movie in the cart. Purchases store the same shape, with the
/// `titulo`/`imagen` keys the profile and purchase documents already use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: MovieId,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "imagen", default)]
    pub image: String,
}

impl CartItem {
    /// Poster URL, or the placeholder when none was stored.
    #[must_use]
    pub fn poster(&self) -> &str {
        poster_or_placeholder(&self.image)
    }
}

impl From<&Movie> for CartItem {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            image: movie.image.clone(),
        }
    }
}

pub(crate) fn poster_or_placeholder(image: &str) -> &str {
    if image.trim().is_empty() {
        PLACEHOLDER_POSTER
    } else {
        image
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_poster_falls_back_to_placeholder() {
        let mut item = CartItem {
            id: MovieId::new(1),
            title: "Akira".to_string(),
            image: "https://img.example/akira.jpg".to_string(),
        };
        assert_eq!(item.poster(), "https://img.example/akira.jpg");

        item.image = " ".to_string();
        assert_eq!(item.poster(), PLACEHOLDER_POSTER);
    }

    #[test]
    fn test_stored_keys() {
        let item = CartItem {
            id: MovieId::new(1),
            title: "Akira".to_string(),
            image: String::new(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({"id": 1, "titulo": "Akira", "imagen": ""}));

        let without_image: CartItem =
            serde_json::from_value(serde_json::json!({"id": 1, "titulo": "Akira"})).unwrap();
        assert_eq!(without_image.poster(), PLACEHOLDER_POSTER);
    }
}
