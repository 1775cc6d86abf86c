//! Category shelves with genre filtering.

use std::str::FromStr;

use serde::Deserialize;

use cineteca_core::Category;

use super::{Catalog, Movie, filter_by_genre, genres};

/// The catch-all filter value.
pub const ALL: &str = "All";

/// A browsable shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shelf {
    Top,
    Kids,
    Documentaries,
    Books,
    Asian,
}

impl Shelf {
    /// Every shelf, in navigation order.
    pub const ALL: [Self; 5] = [
        Self::Top,
        Self::Books,
        Self::Kids,
        Self::Documentaries,
        Self::Asian,
    ];

    /// URL segment under `/movies/`.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Kids => "kids",
            Self::Documentaries => "documentaries",
            Self::Books => "books",
            Self::Asian => "asian",
        }
    }

    /// Page heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Top => "Top 10",
            Self::Kids => "Kids & Family",
            Self::Documentaries => "Documentaries",
            Self::Books => "Based on Books",
            Self::Asian => "Asian Cinema & Anime",
        }
    }

    /// Categories gathered on this shelf.
    #[must_use]
    pub const fn categories(self) -> &'static [Category] {
        match self {
            Self::Top => &[Category::Top10],
            Self::Kids => &[Category::Kids, Category::Family],
            Self::Documentaries => &[Category::Documentaries],
            Self::Books => &[Category::BasedOnBooks],
            Self::Asian => &[Category::Asian, Category::Anime],
        }
    }

    /// Whether the shelf offers a sub-category selector above the genre one.
    #[must_use]
    pub const fn has_sub_categories(self) -> bool {
        matches!(self, Self::Asian)
    }
}

impl FromStr for Shelf {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|shelf| shelf.slug() == s).ok_or(())
    }
}

/// Filter selection submitted by the shelf form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShelfQuery {
    pub genre: Option<String>,
    /// Sub-category picked in the form.
    pub category: Option<String>,
    /// Sub-category the page was rendered with. When it differs from
    /// `category` the visitor changed the sub-category and the genre resets.
    pub shown_category: Option<String>,
}

impl ShelfQuery {
    /// The selected sub-category, `"All"` when none.
    #[must_use]
    pub fn sub_category(&self) -> &str {
        non_blank(self.category.as_deref()).unwrap_or(ALL)
    }

    /// The genre to apply: ignored when the sub-category just changed.
    #[must_use]
    pub fn effective_genre(&self) -> &str {
        let shown = non_blank(self.shown_category.as_deref()).unwrap_or(ALL);
        if self.category.is_some() && shown != self.sub_category() {
            return ALL;
        }
        non_blank(self.genre.as_deref()).unwrap_or(ALL)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Everything a shelf page renders.
#[derive(Debug, Clone)]
pub struct ShelfListing<'a> {
    pub shelf: Shelf,
    pub movies: Vec<&'a Movie>,
    pub genres: Vec<String>,
    pub selected_genre: String,
    /// `"All"` plus distinct singular category labels. Empty for shelves
    /// without sub-categories.
    pub sub_categories: Vec<String>,
    pub selected_sub_category: String,
    pub genre_disabled: bool,
}

impl Catalog {
    /// Apply a shelf's filters.
    #[must_use]
    pub fn shelf_listing(&self, shelf: Shelf, query: &ShelfQuery) -> ShelfListing<'_> {
        let base = self.shelf_movies(shelf);

        let (sub_categories, selected_sub_category, narrowed) = if shelf.has_sub_categories() {
            let mut subs = vec![ALL.to_string()];
            for movie in &base {
                let label = movie.category.singular_label();
                if !subs.iter().any(|s| s == label) {
                    subs.push(label.to_string());
                }
            }
            let selected = query.sub_category().to_string();
            let narrowed: Vec<&Movie> = if selected == ALL {
                base
            } else {
                base.into_iter()
                    .filter(|m| m.category.singular_label() == selected)
                    .collect()
            };
            (subs, selected, narrowed)
        } else {
            (Vec::new(), ALL.to_string(), base)
        };

        let genre_options = genres(&narrowed);
        let selected_genre = query.effective_genre().to_string();
        let movies = filter_by_genre(&narrowed, Some(&selected_genre));
        let genre_disabled = selected_sub_category == ALL && genre_options.len() <= 1;

        ShelfListing {
            shelf,
            movies,
            genres: genre_options,
            selected_genre,
            sub_categories,
            selected_sub_category,
            genre_disabled,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample;

    fn query(category: Option<&str>, shown: Option<&str>, genre: Option<&str>) -> ShelfQuery {
        ShelfQuery {
            genre: genre.map(str::to_string),
            category: category.map(str::to_string),
            shown_category: shown.map(str::to_string),
        }
    }

    fn titles(listing: &ShelfListing<'_>) -> Vec<String> {
        listing.movies.iter().map(|m| m.title.clone()).collect()
    }

    #[test]
    fn test_shelf_slugs() {
        for shelf in Shelf::ALL {
            assert_eq!(shelf.slug().parse::<Shelf>(), Ok(shelf));
        }
        assert!("western".parse::<Shelf>().is_err());
    }

    #[test]
    fn test_genre_filter_on_plain_shelf() {
        let catalog = sample();
        let listing = catalog.shelf_listing(Shelf::Kids, &query(None, None, Some("Comedia")));
        assert_eq!(titles(&listing), vec!["Paddington"]);
        assert_eq!(listing.genres, vec!["All", "Animación", "Comedia"]);
        assert!(listing.sub_categories.is_empty());
        assert!(!listing.genre_disabled);
    }

    #[test]
    fn test_unknown_genre_is_empty() {
        let catalog = sample();
        let listing = catalog.shelf_listing(Shelf::Kids, &query(None, None, Some("Western")));
        assert!(listing.movies.is_empty());
    }

    #[test]
    fn test_asian_sub_categories() {
        let catalog = sample();
        let listing = catalog.shelf_listing(Shelf::Asian, &ShelfQuery::default());
        assert_eq!(listing.sub_categories, vec!["All", "Asiática", "Anime"]);
        assert_eq!(listing.movies.len(), 4);

        let anime = catalog.shelf_listing(Shelf::Asian, &query(Some("Anime"), Some("Anime"), None));
        assert_eq!(titles(&anime), vec!["Akira", "Your Name"]);
        assert_eq!(anime.genres, vec!["All", "Ciencia Ficción", "Romance"]);
    }

    #[test]
    fn test_changing_sub_category_resets_genre() {
        let catalog = sample();
        // Genre "Thriller" was picked under "All"; switching to Anime drops it.
        let listing = catalog.shelf_listing(
            Shelf::Asian,
            &query(Some("Anime"), Some("All"), Some("Thriller")),
        );
        assert_eq!(listing.selected_genre, "All");
        assert_eq!(listing.movies.len(), 2);

        // Same sub-category: genre applies.
        let listing = catalog.shelf_listing(
            Shelf::Asian,
            &query(Some("Anime"), Some("Anime"), Some("Romance")),
        );
        assert_eq!(titles(&listing), vec!["Your Name"]);
    }

    #[test]
    fn test_genre_disabled_with_single_option() {
        let catalog = sample();
        let listing = catalog.shelf_listing(Shelf::Top, &ShelfQuery::default());
        // "All" + "Drama"
        assert!(!listing.genre_disabled);

        let empty = Catalog::from_json("[]", "[]").unwrap();
        let listing = empty.shelf_listing(Shelf::Top, &ShelfQuery::default());
        assert!(listing.genre_disabled);
        assert!(listing.movies.is_empty());
    }
}
