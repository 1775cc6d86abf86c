//! Multipart forms carrying an optional avatar image.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppError;
use crate::services::AvatarUpload;

/// Largest accepted avatar, in bytes.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Text fields of a multipart form plus the avatar file, if one was chosen.
#[derive(Debug, Default)]
pub struct AvatarForm {
    fields: HashMap<String, String>,
    pub avatar: Option<AvatarUpload>,
    /// Set when a file was chosen but is not an image.
    pub rejected_avatar: bool,
}

impl AvatarForm {
    /// Read every part. The file part named `avatar` becomes the upload; an
    /// empty file input (nothing chosen) is ignored.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is not valid multipart or
    /// the file is too large.
    pub async fn parse(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid form: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "avatar" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;

                if bytes.is_empty() {
                    continue;
                }
                if bytes.len() > MAX_AVATAR_BYTES {
                    return Err(AppError::BadRequest("Avatar is too large".to_string()));
                }
                if !content_type.starts_with("image/") {
                    tracing::debug!(%content_type, "Ignoring non-image avatar");
                    form.rejected_avatar = true;
                    continue;
                }

                form.avatar = Some(AvatarUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid form: {e}")))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// A text field, empty when absent.
    #[must_use]
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }
}
