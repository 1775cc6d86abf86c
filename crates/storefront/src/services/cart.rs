//! Shopping cart kept in client storage under a single key.

use cineteca_core::MovieId;

use crate::models::{CartItem, keys};
use crate::storage::{ClientStorage, StorageError};

/// Result of adding a movie to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyInCart,
}

impl AddOutcome {
    /// Flash message for the movie that was added.
    #[must_use]
    pub fn message(self, title: &str) -> String {
        match self {
            Self::Added => format!("“{title}” was added to your cart"),
            Self::AlreadyInCart => format!("“{title}” is already in your cart"),
        }
    }
}

/// Ordered list of cart items. A movie appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Load the cart; a missing or corrupt value is an empty cart.
    pub async fn load(storage: &ClientStorage) -> Self {
        Self {
            items: storage.get(keys::CART).await.unwrap_or_default(),
        }
    }

    /// Persist the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn save(&self, storage: &ClientStorage) -> Result<(), StorageError> {
        storage.set(keys::CART, &self.items).await
    }

    /// Append `item` unless a movie with the same id is already present.
    pub fn add(&mut self, item: CartItem) -> AddOutcome {
        if self.items.iter().any(|i| i.id == item.id) {
            return AddOutcome::AlreadyInCart;
        }
        self.items.push(item);
        AddOutcome::Added
    }

    /// Drop every item with `id`.
    pub fn remove(&mut self, id: MovieId) {
        self.items.retain(|i| i.id != id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
