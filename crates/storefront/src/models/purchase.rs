//! Purchase records stored in the `compras` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cineteca_core::{MovieId, UserId};

use super::CartItem;
use super::cart::poster_or_placeholder;

/// Collection holding purchase records.
pub const COLLECTION: &str = "compras";

/// Server-stamped purchase time; also the history sort key.
pub const DATE_FIELD: &str = "fecha";

/// Shown when a purchase has no server timestamp yet.
pub const MISSING_DATE: &str = "—";

/// Title shown for a stored line that has none.
pub const UNTITLED: &str = "Movie";

/// Fields written at checkout. `fecha` is stamped by the server.
#[derive(Debug, Clone, Serialize)]
pub struct NewPurchase {
    pub uid: UserId,
    pub items: Vec<CartItem>,
    #[serde(rename = "cantidad")]
    pub item_count: usize,
}

/// A stored purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct Purchase {
    /// Document id; filled in after decoding.
    #[serde(skip)]
    pub id: String,
    pub uid: UserId,
    #[serde(default)]
    pub items: Vec<PurchasedItem>,
    #[serde(rename = "cantidad", default)]
    pub item_count: usize,
    #[serde(rename = "fecha", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Purchase {
    /// Date as `dd MMMM yyyy, HH:mm` (UTC), or a dash when unknown.
    #[must_use]
    pub fn formatted_date(&self) -> String {
        self.created_at.map_or_else(
            || MISSING_DATE.to_string(),
            |t| t.format("%d %B %Y, %H:%M").to_string(),
        )
    }

    /// Last five characters of the document id.
    #[must_use]
    pub fn short_id(&self) -> String {
        let count = self.id.chars().count();
        self.id.chars().skip(count.saturating_sub(5)).collect()
    }
}

/// A line of a stored purchase.
///
/// Older records hold bare titles instead of item maps, and item maps may
/// lack the id or the poster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "StoredItem")]
pub struct PurchasedItem {
    pub id: Option<MovieId>,
    pub title: String,
    pub image: String,
}

impl PurchasedItem {
    /// Poster URL, or the placeholder when none was stored.
    #[must_use]
    pub fn poster(&self) -> &str {
        poster_or_placeholder(&self.image)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredItem {
    Title(String),
    Line {
        #[serde(default)]
        id: Option<MovieId>,
        #[serde(rename = "titulo", default)]
        title: String,
        #[serde(rename = "imagen", default)]
        image: String,
    },
}

impl From<StoredItem> for PurchasedItem {
    fn from(stored: StoredItem) -> Self {
        let (id, title, image) = match stored {
            StoredItem::Title(title) => (None, title, String::new()),
            StoredItem::Line { id, title, image } => (id, title, image),
        };
        let title = if title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            title
        };
        Self { id, title, image }
    }
}
