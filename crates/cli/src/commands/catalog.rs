//! Catalog inspection commands.
//!
//! The catalog is compiled into the storefront, so these run without any
//! configuration.
//!
//! # Usage
//!
//! ```bash
//! # Validate the embedded dataset and print a summary
//! ct-cli catalog check
//!
//! # List the movies on a shelf
//! ct-cli catalog list --shelf asian
//! ```

use cineteca_core::Category;
use cineteca_storefront::catalog::{Catalog, CatalogError, Shelf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from catalog commands.
#[derive(Debug, Error)]
pub enum CatalogCommandError {
    /// The embedded dataset is invalid.
    #[error("Invalid catalog: {0}")]
    Invalid(#[from] CatalogError),

    /// Unknown shelf slug.
    #[error("Unknown shelf: {0}. Valid shelves: top, books, kids, documentaries, asian")]
    UnknownShelf(String),
}

/// Load the catalog and report what it contains.
///
/// # Errors
///
/// Returns an error if the dataset does not load.
pub fn check() -> Result<(), CatalogCommandError> {
    let catalog = Catalog::load()?;

    info!("Catalog OK");
    info!("  Movies: {}", catalog.movies().len());
    info!("  Seed comments: {}", catalog.seed_comment_count());

    for category in Category::ALL {
        let count = catalog
            .movies()
            .iter()
            .filter(|m| m.category == category)
            .count();
        info!("  {}: {count}", category.label());
    }

    let missing_posters: Vec<_> = catalog
        .movies()
        .iter()
        .filter(|m| m.image.trim().is_empty())
        .collect();
    for movie in &missing_posters {
        warn!(id = %movie.id, title = %movie.title, "Movie has no poster");
    }

    Ok(())
}

/// List the movies on `shelf`, or on every shelf.
///
/// # Errors
///
/// Returns an error if the dataset does not load or the shelf is unknown.
pub fn list(shelf: Option<&str>) -> Result<(), CatalogCommandError> {
    let catalog = Catalog::load()?;

    let shelves: Vec<Shelf> = match shelf {
        Some(slug) => vec![
            slug.parse()
                .map_err(|()| CatalogCommandError::UnknownShelf(slug.to_owned()))?,
        ],
        None => Shelf::ALL.to_vec(),
    };

    for shelf in shelves {
        info!("{} (/movies/{})", shelf.title(), shelf.slug());
        for movie in catalog.shelf_movies(shelf) {
            info!(
                "  #{:<3} {} ({}) - {}",
                movie.id, movie.title, movie.year, movie.genre
            );
        }
    }

    Ok(())
}
