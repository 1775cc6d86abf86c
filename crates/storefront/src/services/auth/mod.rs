//! Authentication service.
//!
//! Provides email/password and Google sign-in against the hosted identity
//! service, and keeps the profile document in `users/{uid}` in step with the
//! identity account.

mod error;

pub use error::{AuthError, GENERIC_MESSAGE};

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use cineteca_core::{Email, UserId};

use crate::backend::{AuthAccount, Backend, GOOGLE_PROVIDER_ID, fields_from};
use crate::models::user::{self, NewProfile, UserProfile};
use crate::models::CurrentUser;

/// Minimum password length accepted by the identity service.
const MIN_PASSWORD_LENGTH: usize = 6;

/// An uploaded image destined for `avatars/{uid}/`.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AvatarUpload {
    /// The file name with any directory components removed.
    #[must_use]
    pub fn safe_file_name(&self) -> String {
        let name = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        if name.is_empty() {
            "avatar".to_string()
        } else {
            name.to_string()
        }
    }
}

/// Authentication service.
///
/// Handles registration, sign-in, password resets and token refresh.
pub struct AuthService<'a> {
    backend: &'a Backend,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user with email and password.
    ///
    /// The avatar is optional; if its upload fails the account is created
    /// without one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::EmailInUse` if the email is already registered.
    /// Returns `AuthError::Backend` if the profile document cannot be written.
    #[instrument(skip(self, password, avatar))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
        avatar: Option<AvatarUpload>,
    ) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let account = self
            .backend
            .identity()
            .sign_up(email.as_str(), password)
            .await?;

        let avatar_url = match avatar {
            Some(upload) => self.upload_registration_avatar(&account, upload).await,
            None => None,
        };

        let username = username.trim();
        let display_name = if username.is_empty() {
            email.local_part().to_string()
        } else {
            username.to_string()
        };

        let updated = self
            .backend
            .identity()
            .update_profile(&account.id_token, Some(&display_name), avatar_url.as_deref())
            .await?;

        let profile = NewProfile {
            uid: account.uid.clone(),
            email: email.as_str().to_string(),
            username: username.to_string(),
            avatar: avatar_url.clone().unwrap_or_default(),
            provider: "password",
        };
        self.backend
            .documents()
            .set(
                user::COLLECTION,
                account.uid.as_str(),
                fields_from(&profile)?,
                &["createdAt"],
                &account.id_token,
            )
            .await?;

        tracing::info!(uid = %account.uid, "User registered");

        let account = AuthAccount {
            display_name: updated.display_name.or(Some(display_name)),
            photo_url: updated.photo_url.or(avatar_url),
            ..account
        };
        Ok(self.load_full_user(account).await)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email or password is
    /// wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let account = self
            .backend
            .identity()
            .sign_in_with_password(email.as_str(), password)
            .await?;

        // A missing profile should not block sign-in.
        if let Err(e) = self.ensure_profile(&account, "password").await {
            tracing::warn!(uid = %account.uid, error = %e, "Could not ensure profile document");
        }

        tracing::info!(uid = %account.uid, "User signed in");
        Ok(self.load_full_user(account).await)
    }

    /// Send a password reset email.
    ///
    /// Failures are logged and never reported, so the response does not
    /// reveal whether an account exists.
    #[instrument(skip(self))]
    pub async fn reset_password(&self, email: &str) {
        let Ok(email) = Email::parse(email) else {
            tracing::debug!("Password reset requested for invalid email");
            return;
        };

        if let Err(e) = self
            .backend
            .identity()
            .send_password_reset(email.as_str())
            .await
        {
            tracing::warn!(error = %e, "Password reset email failed");
        }
    }

    // =========================================================================
    // Google Sign-in
    // =========================================================================

    /// Authorization URL for the Google consent screen.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::GoogleDisabled` if Google sign-in is not configured.
    pub fn google_authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        nonce: &str,
    ) -> Result<String, AuthError> {
        let google = self.backend.google().ok_or(AuthError::GoogleDisabled)?;
        Ok(google.authorization_url(redirect_uri, state, nonce))
    }

    /// Complete Google sign-in: exchange the code, sign in to the identity
    /// service with the Google id token and create the profile document on
    /// first sign-in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::GoogleDisabled` if Google sign-in is not configured,
    /// or `AuthError::Backend` if any backend call fails.
    #[instrument(skip(self, code))]
    pub async fn login_with_google(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<CurrentUser, AuthError> {
        let google = self.backend.google().ok_or(AuthError::GoogleDisabled)?;
        let tokens = google.exchange_code(code, redirect_uri).await?;

        let account = self
            .backend
            .identity()
            .sign_in_with_idp(tokens.id_token.expose_secret(), GOOGLE_PROVIDER_ID, redirect_uri)
            .await?;

        self.ensure_profile(&account, "google").await?;

        tracing::info!(uid = %account.uid, "User signed in with Google");
        Ok(self.load_full_user(account).await)
    }

    // =========================================================================
    // Profile Documents
    // =========================================================================

    /// Create `users/{uid}` from the account data if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if the document cannot be read or written.
    pub async fn ensure_profile(
        &self,
        account: &AuthAccount,
        provider: &'static str,
    ) -> Result<(), AuthError> {
        let documents = self.backend.documents();
        if documents
            .get(user::COLLECTION, account.uid.as_str(), &account.id_token)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let profile = NewProfile {
            uid: account.uid.clone(),
            email: account.email.clone().unwrap_or_default(),
            username: account.display_name.clone().unwrap_or_default(),
            avatar: account.photo_url.clone().unwrap_or_default(),
            provider,
        };
        documents
            .set(
                user::COLLECTION,
                account.uid.as_str(),
                fields_from(&profile)?,
                &["createdAt"],
                &account.id_token,
            )
            .await?;

        tracing::info!(uid = %account.uid, provider, "Created profile document");
        Ok(())
    }

    /// Merge the profile document over the account data.
    ///
    /// A missing or unreadable document leaves the user with account data
    /// only.
    pub async fn load_full_user(&self, account: AuthAccount) -> CurrentUser {
        let profile = self.fetch_profile(&account.uid, &account.id_token).await;
        CurrentUser::from_account(account, profile)
    }

    /// Re-read the profile document for a signed-in user.
    pub async fn reload(&self, mut user: CurrentUser) -> CurrentUser {
        user.profile = self.fetch_profile(&user.uid, &user.id_token).await;
        user
    }

    async fn fetch_profile(
        &self,
        uid: &UserId,
        id_token: &SecretString,
    ) -> Option<UserProfile> {
        match self
            .backend
            .documents()
            .get(user::COLLECTION, uid.as_str(), id_token)
            .await
        {
            Ok(Some(doc)) => doc
                .decode::<UserProfile>()
                .inspect_err(|e| tracing::warn!(uid = %uid, error = %e, "Malformed profile document"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(uid = %uid, error = %e, "Failed to load profile document");
                None
            }
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Refresh the id token when it is about to expire.
    ///
    /// Returns `true` if the user was updated and should be saved.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` if the refresh token is rejected.
    #[instrument(skip(self, user), fields(uid = %user.uid))]
    pub async fn refresh_if_needed(&self, user: &mut CurrentUser) -> Result<bool, AuthError> {
        let now = Utc::now().timestamp();
        if !user.token_expiring(now) {
            return Ok(false);
        }

        let tokens = self.backend.identity().refresh(&user.refresh_token).await?;
        user.apply_refresh(tokens, now);
        tracing::debug!("Refreshed id token");
        Ok(true)
    }

    async fn upload_registration_avatar(
        &self,
        account: &AuthAccount,
        upload: AvatarUpload,
    ) -> Option<String> {
        let path = format!(
            "avatars/{uid}/{uid}-{millis}-{name}",
            uid = account.uid,
            millis = Utc::now().timestamp_millis(),
            name = upload.safe_file_name()
        );

        match self
            .backend
            .blobs()
            .upload(&path, upload.bytes, &upload.content_type, &account.id_token)
            .await
        {
            Ok(object) => Some(self.backend.blobs().download_url(&object)),
            Err(e) => {
                tracing::warn!(uid = %account.uid, error = %e, "Avatar upload failed, continuing without one");
                None
            }
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ROOT: &str = "/documents/projects/cineteca-test/databases/(default)/documents";

    fn backend(server: &MockServer) -> Backend {
        Backend::new(&BackendConfig::for_base_url(&server.uri()), None).unwrap()
    }

    fn account_json(display_name: &str) -> serde_json::Value {
        json!({
            "localId": "uid-1",
            "email": "ana@cineteca.co",
            "displayName": display_name,
            "idToken": "id-token",
            "refreshToken": "refresh-token",
            "expiresIn": "3600"
        })
    }

    fn profile_doc() -> serde_json::Value {
        json!({
            "name": "projects/cineteca-test/databases/(default)/documents/usuarios/uid-1",
            "fields": {
                "uid": {"stringValue": "uid-1"},
                "username": {"stringValue": "Ana"},
                "provider": {"stringValue": "password"}
            }
        })
    }

    async fn mock_commit(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(format!("{ROOT}:commit")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "writeResults": [{}],
                "commitTime": "2024-03-01T10:00:00Z"
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_avatar_file_name_strips_directories() {
        let upload = AvatarUpload {
            file_name: "C:\\Users\\ana\\me.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![],
        };
        assert_eq!(upload.safe_file_name(), "me.png");

        let upload = AvatarUpload {
            file_name: "../".to_string(),
            ..upload
        };
        assert_eq!(upload.safe_file_name(), "avatar");
    }

    #[tokio::test]
    async fn test_register_rejects_short_password_locally() {
        let server = MockServer::start().await;
        let backend = backend(&server);

        let err = AuthService::new(&backend)
            .register("ana@cineteca.co", "123", "", None)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::WeakPassword));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_uses_email_local_part_as_display_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/accounts:signUp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(account_json("")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/identity/accounts:update"))
            .and(body_partial_json(json!({"displayName": "ana"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"displayName": "ana"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{ROOT}:commit")))
            .and(body_partial_json(json!({
                "writes": [{
                    "update": {"fields": {
                        "provider": {"stringValue": "password"},
                        "username": {"stringValue": ""}
                    }},
                    "updateTransforms": [{"fieldPath": "createdAt", "setToServerValue": "REQUEST_TIME"}]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"writeResults": [{}]})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{ROOT}/usuarios/uid-1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_doc()))
            .mount(&server)
            .await;

        let backend = backend(&server);
        let user = AuthService::new(&backend)
            .register("ana@cineteca.co", "hunter22", "  ", None)
            .await
            .unwrap();

        assert_eq!(user.uid.as_str(), "uid-1");
        assert_eq!(user.display_name.as_deref(), Some("ana"));
        assert!(user.profile.is_some());
    }

    #[tokio::test]
    async fn test_register_continues_when_avatar_upload_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/accounts:signUp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(account_json("")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex("^/storage/b/.*/o$"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "Permission denied."}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/identity/accounts:update"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"displayName": "Ana"})))
            .mount(&server)
            .await;
        mock_commit(&server).await;
        Mock::given(method("GET"))
            .and(path(format!("{ROOT}/usuarios/uid-1")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": {"code": 404}})))
            .mount(&server)
            .await;

        let backend = backend(&server);
        let upload = AvatarUpload {
            file_name: "me.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };
        let user = AuthService::new(&backend)
            .register("ana@cineteca.co", "hunter22", "Ana", Some(upload))
            .await
            .unwrap();

        assert!(user.photo_url.is_none());
        assert!(user.profile.is_none());
        assert_eq!(user.display_username(), "Ana");
    }

    #[tokio::test]
    async fn test_register_email_in_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/accounts:signUp"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "EMAIL_EXISTS"}
            })))
            .mount(&server)
            .await;

        let backend = backend(&server);
        let err = AuthService::new(&backend)
            .register("ana@cineteca.co", "hunter22", "Ana", None)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::EmailInUse));
    }

    #[tokio::test]
    async fn test_login_creates_missing_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(200).set_body_json(account_json("Ana")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{ROOT}/usuarios/uid-1")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": {"code": 404}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{ROOT}:commit")))
            .and(body_partial_json(json!({
                "writes": [{"update": {"fields": {"username": {"stringValue": "Ana"}}}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"writeResults": [{}]})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server);
        let user = AuthService::new(&backend)
            .login("ana@cineteca.co", "hunter22")
            .await
            .unwrap();

        assert_eq!(user.display_name.as_deref(), Some("Ana"));
        assert_eq!(user.id_token.expose_secret(), "id-token");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS"}
            })))
            .mount(&server)
            .await;

        let backend = backend(&server);
        let err = AuthService::new(&backend)
            .login("ana@cineteca.co", "nope-nope")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_reset_password_swallows_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/accounts:sendOobCode"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "EMAIL_NOT_FOUND"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server);
        AuthService::new(&backend)
            .reset_password("nobody@cineteca.co")
            .await;
    }

    #[tokio::test]
    async fn test_google_disabled_without_config() {
        let server = MockServer::start().await;
        let backend = backend(&server);
        let service = AuthService::new(&backend);

        assert!(matches!(
            service.google_authorization_url("http://localhost/cb", "s", "n"),
            Err(AuthError::GoogleDisabled)
        ));
        assert!(matches!(
            service.login_with_google("code", "http://localhost/cb").await,
            Err(AuthError::GoogleDisabled)
        ));
    }

    #[tokio::test]
    async fn test_refresh_if_needed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "new-id-token",
                "refresh_token": "new-refresh-token",
                "expires_in": "3600",
                "user_id": "uid-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server);
        let service = AuthService::new(&backend);

        let account: AuthAccount = AuthAccount {
            uid: UserId::new("uid-1"),
            email: None,
            display_name: None,
            photo_url: None,
            id_token: "old".to_string().into(),
            refresh_token: "refresh-token".to_string().into(),
            expires_in: 3600,
        };
        let mut user = CurrentUser::from_account(account, None);
        assert!(!service.refresh_if_needed(&mut user).await.unwrap());

        user.expires_at = Utc::now().timestamp() + 30;
        assert!(service.refresh_if_needed(&mut user).await.unwrap());
        assert_eq!(user.id_token.expose_secret(), "new-id-token");
        assert!(!user.token_expiring(Utc::now().timestamp()));
    }
}
