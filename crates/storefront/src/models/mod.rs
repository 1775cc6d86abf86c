//! Domain models for storefront.
//!
//! Records kept in client storage (cart items, comments), documents kept in
//! the backend (profiles, purchases) and the session user.

pub mod cart;
pub mod comment;
pub mod purchase;
pub mod session;
pub mod user;

pub use cart::CartItem;
pub use comment::Comment;
pub use purchase::{NewPurchase, Purchase, PurchasedItem};
pub use session::{CurrentUser, keys};
pub use user::{NewProfile, ProfileForm, ProfileUpdate, UserProfile};
