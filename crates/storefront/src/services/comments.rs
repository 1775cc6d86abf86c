//! Per-movie comment threads kept in client storage.
//!
//! A movie's thread lives under `comments_{movie_id}`. Until the visitor
//! writes one, the catalog's seed reviews are shown.

use thiserror::Error;

use cineteca_core::{CommentId, MovieId, Rating};

use crate::catalog::Catalog;
use crate::models::{Comment, CurrentUser, keys};
use crate::storage::{ClientStorage, StorageError};

/// Errors from comment operations. The `Display` text is shown to visitors.
#[derive(Debug, Error)]
pub enum CommentError {
    #[error("You must sign in to comment")]
    SignInRequired,

    #[error("Please write a comment and select a rating")]
    Invalid,

    #[error("Comment not found")]
    NotFound,

    #[error("You can only change your own comments")]
    NotOwner,

    #[error("Something went wrong. Please try again.")]
    Storage(#[from] StorageError),
}

/// The comments of one movie.
#[derive(Debug, Clone)]
pub struct CommentThread {
    movie_id: MovieId,
    comments: Vec<Comment>,
}

impl CommentThread {
    /// Stored thread if one exists, else the seed comments.
    pub async fn load(storage: &ClientStorage, catalog: &Catalog, movie_id: MovieId) -> Self {
        let comments = match storage.get::<Vec<Comment>>(&keys::comments(movie_id)).await {
            Some(stored) => stored,
            None => catalog.seed_comments(movie_id),
        };
        Self { movie_id, comments }
    }

    /// Persist the thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn save(&self, storage: &ClientStorage) -> Result<(), StorageError> {
        storage
            .set(&keys::comments(self.movie_id), &self.comments)
            .await
    }

    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// The comment `id` if `user` may edit it.
    #[must_use]
    pub fn editable(&self, user: Option<&CurrentUser>, id: CommentId) -> Option<&Comment> {
        let user = user?;
        self.comments
            .iter()
            .find(|c| c.id == id && c.is_owned_by(&user.uid))
    }

    /// Append a comment by `user`.
    ///
    /// The id is `now_ms`, bumped past the largest existing id when needed.
    ///
    /// # Errors
    ///
    /// Returns `CommentError::Invalid` for an empty message or missing
    /// rating, and `CommentError::SignInRequired` without a user.
    pub fn add(
        &mut self,
        user: Option<&CurrentUser>,
        message: &str,
        rating: Option<i64>,
        now_ms: i64,
    ) -> Result<CommentId, CommentError> {
        let (message, rating) = validate(message, rating)?;
        let user = user.ok_or(CommentError::SignInRequired)?;

        let next = self
            .comments
            .iter()
            .map(|c| c.id.get().saturating_add(1))
            .max()
            .unwrap_or(i64::MIN);
        let id = CommentId::new(now_ms.max(next));

        self.comments.push(Comment {
            id,
            movie_id: self.movie_id,
            author_name: user.comment_author(),
            message,
            rating,
            uid: Some(user.uid.clone()),
        });
        Ok(id)
    }

    /// Replace the message and rating of one of `user`'s comments.
    ///
    /// # Errors
    ///
    /// Fails on invalid input, without a user, for an unknown id, or when the
    /// comment belongs to someone else.
    pub fn edit(
        &mut self,
        user: Option<&CurrentUser>,
        id: CommentId,
        message: &str,
        rating: Option<i64>,
    ) -> Result<(), CommentError> {
        let (message, rating) = validate(message, rating)?;
        let comment = self.owned_mut(user, id)?;
        comment.message = message;
        comment.rating = rating;
        Ok(())
    }

    /// Remove one of `user`'s comments.
    ///
    /// # Errors
    ///
    /// Fails without a user, for an unknown id, or when the comment belongs
    /// to someone else.
    pub fn delete(&mut self, user: Option<&CurrentUser>, id: CommentId) -> Result<(), CommentError> {
        self.owned_mut(user, id)?;
        self.comments.retain(|c| c.id != id);
        Ok(())
    }

    fn owned_mut(
        &mut self,
        user: Option<&CurrentUser>,
        id: CommentId,
    ) -> Result<&mut Comment, CommentError> {
        let user = user.ok_or(CommentError::SignInRequired)?;
        let comment = self
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CommentError::NotFound)?;
        if !comment.is_owned_by(&user.uid) {
            tracing::warn!(uid = %user.uid, comment_id = %id, "Refused to modify another user's comment");
            return Err(CommentError::NotOwner);
        }
        Ok(comment)
    }
}

fn validate(message: &str, rating: Option<i64>) -> Result<(String, Rating), CommentError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(CommentError::Invalid);
    }
    let rating = rating
        .and_then(|r| Rating::parse(r).ok())
        .ok_or(CommentError::Invalid)?;
    Ok((message.to_string(), rating))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::AuthAccount;
    use crate::catalog::tests::sample;
    use crate::storage::tests::storage;
    use cineteca_core::UserId;

    const NOW: i64 = 1_700_000_000_000;

    fn user(uid: &str, display_name: Option<&str>) -> CurrentUser {
        CurrentUser::from_account(
            AuthAccount {
                uid: UserId::new(uid),
                email: Some(format!("{uid}@cineteca.co")),
                display_name: display_name.map(str::to_string),
                photo_url: None,
                id_token: "id".to_string().into(),
                refresh_token: "refresh".to_string().into(),
                expires_in: 3600,
            },
            None,
        )
    }

    fn empty_thread() -> CommentThread {
        CommentThread {
            movie_id: MovieId::new(2),
            comments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_load_falls_back_to_seeds() {
        let catalog = sample();
        let storage = storage();

        let thread = CommentThread::load(&storage, &catalog, MovieId::new(1)).await;
        assert_eq!(thread.len(), catalog.seed_comments(MovieId::new(1)).len());
        assert!(!thread.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_comment_stays_deleted() {
        let catalog = sample();
        let storage = storage();
        let ana = user("ana", None);

        let mut thread = CommentThread::load(&storage, &catalog, MovieId::new(2)).await;
        assert!(thread.is_empty());
        let id = thread.add(Some(&ana), "Great", Some(5), NOW).unwrap();
        thread.save(&storage).await.unwrap();

        let mut thread = CommentThread::load(&storage, &catalog, MovieId::new(2)).await;
        assert_eq!(thread.len(), 1);
        thread.delete(Some(&ana), id).unwrap();
        thread.save(&storage).await.unwrap();

        let reloaded = CommentThread::load(&storage, &catalog, MovieId::new(2)).await;
        assert!(reloaded.is_empty());
        let stored: Option<Vec<Comment>> = storage.get(&keys::comments(MovieId::new(2))).await;
        assert_eq!(stored.map(|c| c.len()), Some(0));
    }

    #[tokio::test]
    async fn test_seeded_thread_keeps_seeds_after_delete() {
        let catalog = sample();
        let storage = storage();
        let ana = user("ana", None);

        let mut thread = CommentThread::load(&storage, &catalog, MovieId::new(1)).await;
        let id = thread.add(Some(&ana), "Great", Some(5), NOW).unwrap();
        // Seed comments have no uid and cannot be removed.
        assert!(matches!(
            thread.delete(Some(&ana), thread.comments()[0].id),
            Err(CommentError::NotOwner)
        ));
        thread.delete(Some(&ana), id).unwrap();
        thread.save(&storage).await.unwrap();

        let reloaded = CommentThread::load(&storage, &catalog, MovieId::new(1)).await;
        assert_eq!(reloaded.comments(), catalog.seed_comments(MovieId::new(1)).as_slice());
    }

    #[tokio::test]
    async fn test_stored_empty_list_hides_seeds() {
        let catalog = sample();
        let storage = storage();
        storage
            .set(&keys::comments(MovieId::new(1)), &Vec::<Comment>::new())
            .await
            .unwrap();

        let thread = CommentThread::load(&storage, &catalog, MovieId::new(1)).await;
        assert!(thread.is_empty());
    }

    #[test]
    fn test_add_validates_before_sign_in() {
        let mut thread = empty_thread();
        assert!(matches!(
            thread.add(None, "   ", Some(3), NOW),
            Err(CommentError::Invalid)
        ));
        assert!(matches!(
            thread.add(None, "Nice", None, NOW),
            Err(CommentError::Invalid)
        ));
        assert!(matches!(
            thread.add(None, "Nice", Some(6), NOW),
            Err(CommentError::Invalid)
        ));
        assert!(matches!(
            thread.add(None, "Nice", Some(4), NOW),
            Err(CommentError::SignInRequired)
        ));
        assert!(thread.is_empty());
    }

    #[test]
    fn test_add_sets_author_and_owner() {
        let mut thread = empty_thread();
        let ana = user("ana", Some("Ana G"));
        let id = thread.add(Some(&ana), "  Loved it ", Some(4), NOW).unwrap();

        let comment = &thread.comments()[0];
        assert_eq!(comment.id, id);
        assert_eq!(comment.author_name, "Ana G");
        assert_eq!(comment.message, "Loved it");
        assert_eq!(comment.rating.get(), 4);
        assert!(comment.is_owned_by(&ana.uid));

        let bo = user("bo", None);
        thread.add(Some(&bo), "Meh", Some(2), NOW).unwrap();
        assert_eq!(thread.comments()[1].author_name, "bo@cineteca.co");
    }

    #[test]
    fn test_ids_stay_unique_within_same_millisecond() {
        let mut thread = empty_thread();
        let ana = user("ana", None);
        let first = thread.add(Some(&ana), "One", Some(3), NOW).unwrap();
        let second = thread.add(Some(&ana), "Two", Some(3), NOW).unwrap();
        assert_eq!(second.get(), first.get() + 1);
    }

    #[test]
    fn test_only_owner_can_edit_or_delete() {
        let mut thread = empty_thread();
        let ana = user("ana", None);
        let bo = user("bo", None);
        let id = thread.add(Some(&ana), "Original", Some(3), NOW).unwrap();

        assert!(matches!(
            thread.edit(Some(&bo), id, "Hacked", Some(1)),
            Err(CommentError::NotOwner)
        ));
        assert!(matches!(
            thread.delete(None, id),
            Err(CommentError::SignInRequired)
        ));
        assert!(matches!(
            thread.delete(Some(&ana), CommentId::new(1)),
            Err(CommentError::NotFound)
        ));
        assert!(thread.editable(Some(&bo), id).is_none());
        assert!(thread.editable(Some(&ana), id).is_some());

        thread.edit(Some(&ana), id, "Edited", Some(5)).unwrap();
        assert_eq!(thread.comments()[0].message, "Edited");
        assert_eq!(thread.comments()[0].rating.get(), 5);

        thread.delete(Some(&ana), id).unwrap();
        assert!(thread.is_empty());
    }
}
