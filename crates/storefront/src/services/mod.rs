//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Registration, sign-in (password and Google) and token refresh
//! - `profile` - Account form and avatar updates
//! - `cart` - Cart kept in client storage
//! - `comments` - Per-movie comment threads kept in client storage
//! - `purchases` - Checkout records in the document store

pub mod auth;
pub mod cart;
pub mod comments;
pub mod profile;
pub mod purchases;

pub use auth::{AuthError, AuthService, AvatarUpload};
pub use cart::{AddOutcome, Cart};
pub use comments::{CommentError, CommentThread};
pub use profile::ProfileService;
pub use purchases::{CheckoutError, PurchaseService};
