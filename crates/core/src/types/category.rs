//! Catalog categories.

use core::fmt;

use serde::{Deserialize, Serialize};

/// The category a movie is filed under.
///
/// Serialized with the label shown to visitors, which is also the value
/// stored in the catalog dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Curated top ten.
    #[serde(rename = "Top 10")]
    Top10,
    /// Adaptations of books.
    #[serde(rename = "Basadas en Libros")]
    BasedOnBooks,
    /// Children's movies.
    #[serde(rename = "Kids")]
    Kids,
    /// Family movies, shown on the kids shelf.
    #[serde(rename = "Familiar")]
    Family,
    /// Documentaries.
    #[serde(rename = "Documentales")]
    Documentaries,
    /// Asian cinema.
    #[serde(rename = "Asiáticas", alias = "Asiaticas")]
    Asian,
    /// Anime, shown on the Asian shelf.
    #[serde(rename = "Animes")]
    Anime,
}

impl Category {
    /// Every category, in dataset order.
    pub const ALL: [Self; 7] = [
        Self::Top10,
        Self::BasedOnBooks,
        Self::Kids,
        Self::Family,
        Self::Documentaries,
        Self::Asian,
        Self::Anime,
    ];

    /// Label shown to visitors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Top10 => "Top 10",
            Self::BasedOnBooks => "Basadas en Libros",
            Self::Kids => "Kids",
            Self::Family => "Familiar",
            Self::Documentaries => "Documentales",
            Self::Asian => "Asiáticas",
            Self::Anime => "Animes",
        }
    }

    /// The label with one trailing `s` removed ("Animes" becomes "Anime").
    #[must_use]
    pub fn singular_label(self) -> &'static str {
        let label = self.label();
        label.strip_suffix('s').unwrap_or(label)
    }

    /// Looks a category up by label, ignoring case and the accent in
    /// "Asiáticas".
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().to_lowercase().replace('á', "a");
        Self::ALL
            .into_iter()
            .find(|c| c.label().to_lowercase().replace('á', "a") == wanted)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
