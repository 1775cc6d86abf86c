//! Account profile editing.

use tracing::instrument;

use crate::backend::{Backend, Fields, fields_from};
use crate::models::user::{self, ProfileForm};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, AuthService, AvatarUpload};

/// Updates the identity account and the `users/{uid}` document together.
pub struct ProfileService<'a> {
    backend: &'a Backend,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Save the account form and return the reloaded user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if either the identity update or the
    /// document update fails.
    #[instrument(skip(self, user, form), fields(uid = %user.uid))]
    pub async fn update_profile(
        &self,
        user: &CurrentUser,
        form: &ProfileForm,
    ) -> Result<CurrentUser, AuthError> {
        let display_name = form.display_name();
        let updated = self
            .backend
            .identity()
            .update_profile(&user.id_token, Some(&display_name), None)
            .await?;

        self.backend
            .documents()
            .update(
                user::COLLECTION,
                user.uid.as_str(),
                fields_from(&form.to_update())?,
                &["updatedAt"],
                &user.id_token,
            )
            .await?;

        tracing::info!("Profile updated");

        let mut user = user.clone();
        user.display_name = updated
            .display_name
            .or_else(|| (!display_name.is_empty()).then_some(display_name));
        Ok(AuthService::new(self.backend).reload(user).await)
    }

    /// Replace the avatar and return the reloaded user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if the upload or either update fails.
    #[instrument(skip(self, user, upload), fields(uid = %user.uid))]
    pub async fn update_avatar(
        &self,
        user: &CurrentUser,
        upload: AvatarUpload,
    ) -> Result<CurrentUser, AuthError> {
        let path = format!("avatars/{}/{}", user.uid, upload.safe_file_name());
        let object = self
            .backend
            .blobs()
            .upload(&path, upload.bytes, &upload.content_type, &user.id_token)
            .await?;
        let url = self.backend.blobs().download_url(&object);

        self.backend
            .identity()
            .update_profile(&user.id_token, None, Some(&url))
            .await?;

        let mut fields = Fields::new();
        fields.insert("avatar".to_string(), url.as_str().into());
        self.backend
            .documents()
            .update(
                user::COLLECTION,
                user.uid.as_str(),
                fields,
                &["updatedAt"],
                &user.id_token,
            )
            .await?;

        tracing::info!("Avatar updated");

        let mut user = user.clone();
        user.photo_url = Some(url);
        Ok(AuthService::new(self.backend).reload(user).await)
    }
}
