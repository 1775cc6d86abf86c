//! Movie comment.

use serde::{Deserialize, Serialize};

use cineteca_core::{CommentId, MovieId, Rating, UserId};

/// A visitor review of a movie.
///
/// Seed comments shipped with the catalog have no `uid`, so nobody can edit
/// or delete them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub movie_id: MovieId,
    pub author_name: String,
    pub message: String,
    pub rating: Rating,
    #[serde(default)]
    pub uid: Option<UserId>,
}

impl Comment {
    /// Whether `uid` wrote this comment.
    #[must_use]
    pub fn is_owned_by(&self, uid: &UserId) -> bool {
        self.uid.as_ref() == Some(uid)
    }
}
