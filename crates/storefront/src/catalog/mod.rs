//! The movie catalog.
//!
//! The dataset ships inside the binary (`data/movies.json`) together with the
//! seed reviews shown before anyone comments (`data/seed_comments.json`).
//! Everything here is read-only and lives in `AppState` for the lifetime of
//! the process.

mod shelf;

pub use shelf::{ALL, Shelf, ShelfListing, ShelfQuery};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cineteca_core::{Category, MovieId};

use crate::models::Comment;

const MOVIES_JSON: &str = include_str!("../../data/movies.json");
const SEED_COMMENTS_JSON: &str = include_str!("../../data/seed_comments.json");

/// Categories shown as rows on the home page, in order.
pub const HOME_ROWS: [Category; 5] = [
    Category::Top10,
    Category::BasedOnBooks,
    Category::Kids,
    Category::Documentaries,
    Category::Asian,
];

/// Errors raised while loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate movie id {0}")]
    DuplicateId(MovieId),
    #[error("seed comment {comment} refers to unknown movie {movie}")]
    UnknownMovie { comment: String, movie: MovieId },
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Poster URL.
    pub image: String,
    pub year: u16,
    pub genre: String,
    pub category: Category,
    pub age_rating: String,
    pub description: String,
    /// Author of the original work.
    pub author: String,
    pub production_details: String,
    pub duration: String,
}

impl Movie {
    /// Case-insensitive substring match against title, genre, category label
    /// or year. `needle` must already be lower-cased.
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.genre.to_lowercase().contains(needle)
            || self.category.label().to_lowercase().contains(needle)
            || self.year.to_string().contains(needle)
    }
}

/// A titled row of movies on the home page.
#[derive(Debug, Clone)]
pub struct HomeRow<'a> {
    pub category: Category,
    pub movies: Vec<&'a Movie>,
}

/// The in-memory catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    movies: Vec<Movie>,
    seed_comments: Vec<Comment>,
}

impl Catalog {
    /// Parse the embedded datasets.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded JSON is malformed or inconsistent.
    pub fn load() -> Result<Self, CatalogError> {
        Self::from_json(MOVIES_JSON, SEED_COMMENTS_JSON)
    }

    /// Parse catalog datasets from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON, duplicate movie ids, or seed
    /// comments pointing at movies that do not exist.
    pub fn from_json(movies: &str, seed_comments: &str) -> Result<Self, CatalogError> {
        let movies: Vec<Movie> = serde_json::from_str(movies)?;
        let seed_comments: Vec<Comment> = serde_json::from_str(seed_comments)?;

        let mut seen = HashSet::new();
        for movie in &movies {
            if !seen.insert(movie.id) {
                return Err(CatalogError::DuplicateId(movie.id));
            }
        }
        if let Some(orphan) = seed_comments.iter().find(|c| !seen.contains(&c.movie_id)) {
            return Err(CatalogError::UnknownMovie {
                comment: orphan.id.to_string(),
                movie: orphan.movie_id,
            });
        }

        Ok(Self {
            movies,
            seed_comments,
        })
    }

    /// Every movie, in dataset order.
    #[must_use]
    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    /// Look a movie up by id.
    #[must_use]
    pub fn find(&self, id: MovieId) -> Option<&Movie> {
        self.movies.iter().find(|m| m.id == id)
    }

    /// Movies matching `query` (case-insensitive substring of title, genre,
    /// category or year). An empty query matches everything.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Movie> {
        let needle = query.to_lowercase();
        self.movies.iter().filter(|m| m.matches(&needle)).collect()
    }

    /// Home page rows for `query`. Rows without movies are left out, so an
    /// empty result means "no results".
    #[must_use]
    pub fn home_rows(&self, query: &str) -> Vec<HomeRow<'_>> {
        let results = self.search(query);
        HOME_ROWS
            .iter()
            .map(|&category| HomeRow {
                category,
                movies: results
                    .iter()
                    .copied()
                    .filter(|m| m.category.label().to_lowercase() == category.label().to_lowercase())
                    .collect(),
            })
            .filter(|row| !row.movies.is_empty())
            .collect()
    }

    /// The base list of a shelf, in dataset order.
    #[must_use]
    pub fn shelf_movies(&self, shelf: Shelf) -> Vec<&Movie> {
        self.movies
            .iter()
            .filter(|m| shelf.categories().contains(&m.category))
            .collect()
    }

    /// Seed reviews for a movie, in dataset order.
    #[must_use]
    pub fn seed_comments(&self, movie_id: MovieId) -> Vec<Comment> {
        self.seed_comments
            .iter()
            .filter(|c| c.movie_id == movie_id)
            .cloned()
            .collect()
    }

    /// Number of seed reviews across the catalog.
    #[must_use]
    pub fn seed_comment_count(&self) -> usize {
        self.seed_comments.len()
    }
}

/// `"All"` followed by the distinct genres of `movies`, in order of first
/// appearance.
#[must_use]
pub fn genres(movies: &[&Movie]) -> Vec<String> {
    let mut out = vec![ALL.to_string()];
    for movie in movies {
        if !out.iter().any(|g| g == &movie.genre) {
            out.push(movie.genre.clone());
        }
    }
    out
}

/// Narrow `movies` to one genre. `None` or `"All"` leaves the list unchanged;
/// an unknown genre yields an empty list.
#[must_use]
pub fn filter_by_genre<'a>(movies: &[&'a Movie], genre: Option<&str>) -> Vec<&'a Movie> {
    match genre {
        None | Some(ALL) => movies.to_vec(),
        Some(genre) => movies.iter().copied().filter(|m| m.genre == genre).collect(),
    }
}
