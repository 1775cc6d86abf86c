//! Session-related types.
//!
//! Types stored in the session for authentication state.

use std::fmt;

use chrono::Utc;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use cineteca_core::UserId;

use super::user::{ProfileForm, UserProfile, non_empty};
use crate::backend::{AuthAccount, RefreshedTokens};

/// Seconds before expiry at which an id token is refreshed.
pub const TOKEN_REFRESH_MARGIN_SECONDS: i64 = 60;

/// Session-stored user identity.
///
/// The identity account merged with its profile document, plus the tokens
/// needed to call the backend on the user's behalf.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub uid: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    #[serde(with = "secret_string")]
    pub id_token: SecretString,
    #[serde(with = "secret_string")]
    pub refresh_token: SecretString,
    /// Unix timestamp (seconds) at which `id_token` expires.
    pub expires_at: i64,
    /// Profile document, when one could be loaded.
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

impl fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentUser")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("photo_url", &self.photo_url)
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("profile", &self.profile)
            .finish()
    }
}

impl CurrentUser {
    /// Build the session user from a freshly signed-in account.
    #[must_use]
    pub fn from_account(account: AuthAccount, profile: Option<UserProfile>) -> Self {
        Self {
            uid: account.uid,
            email: account.email,
            display_name: account.display_name,
            photo_url: account.photo_url,
            id_token: account.id_token,
            refresh_token: account.refresh_token,
            expires_at: Utc::now().timestamp() + account.expires_in,
            profile,
        }
    }

    /// Whether the id token expires within the refresh margin of `now`.
    #[must_use]
    pub const fn token_expiring(&self, now: i64) -> bool {
        now >= self.expires_at - TOKEN_REFRESH_MARGIN_SECONDS
    }

    /// Swap in refreshed tokens.
    pub fn apply_refresh(&mut self, tokens: RefreshedTokens, now: i64) {
        self.id_token = tokens.id_token;
        self.refresh_token = tokens.refresh_token;
        self.expires_at = now + tokens.expires_in;
    }

    /// Name shown in the navigation and on comments: profile username, else
    /// display name, else the email's local part.
    #[must_use]
    pub fn display_username(&self) -> String {
        self.profile
            .as_ref()
            .and_then(|p| non_empty(p.username.as_ref()))
            .or_else(|| non_empty(self.display_name.as_ref()))
            .map(str::to_string)
            .or_else(|| {
                self.email
                    .as_deref()
                    .map(|e| e.split('@').next().unwrap_or_default().to_string())
            })
            .unwrap_or_default()
    }

    /// Author name recorded on new comments: display name, else email, else
    /// "Anonymous user".
    #[must_use]
    pub fn comment_author(&self) -> String {
        non_empty(self.display_name.as_ref())
            .or_else(|| non_empty(self.email.as_ref()))
            .unwrap_or("Anonymous user")
            .to_string()
    }

    /// Avatar: account photo URL, else the profile's avatar.
    #[must_use]
    pub fn avatar_url(&self) -> Option<String> {
        non_empty(self.photo_url.as_ref())
            .or_else(|| {
                self.profile
                    .as_ref()
                    .and_then(|p| non_empty(p.avatar.as_ref()))
            })
            .map(str::to_string)
    }

    /// Upper-cased first letter of the display username, or "U".
    #[must_use]
    pub fn initial(&self) -> String {
        self.display_username()
            .chars()
            .next()
            .map_or_else(|| "U".to_string(), |c| c.to_uppercase().collect())
    }

    /// Account form prefilled from the profile, falling back to the words of
    /// the display name.
    #[must_use]
    pub fn profile_form(&self) -> ProfileForm {
        let profile = self.profile.clone().unwrap_or_default();
        let mut words = self
            .display_name
            .as_deref()
            .unwrap_or_default()
            .split_whitespace();
        let first_word = words.next().unwrap_or_default().to_string();
        let second_word = words.next().unwrap_or_default().to_string();

        ProfileForm {
            first_name: non_empty(profile.username.as_ref())
                .map_or(first_word, str::to_string),
            last_name: non_empty(profile.last_name.as_ref())
                .map_or(second_word, str::to_string),
            birth_date: profile.birth_date.unwrap_or_default(),
            phone: profile.phone.unwrap_or_default(),
            favorite_venue: profile.favorite_venue.unwrap_or_default(),
            gender: profile.gender.unwrap_or_default(),
        }
    }
}

/// Serialize `SecretString` as a plain string. Only used for session storage,
/// which is server-side.
mod secret_string {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(secret.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

/// Session keys. Each one stands for one client-storage entry.
pub mod keys {
    /// Key for the cart (list of cart items).
    pub const CART: &str = "cart";

    /// Key for the color theme.
    pub const THEME: &str = "theme";

    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for Google OAuth state (CSRF protection).
    pub const OAUTH_STATE: &str = "oauth_state";

    /// Key for Google OAuth nonce (`OpenID` Connect replay protection).
    pub const OAUTH_NONCE: &str = "oauth_nonce";

    /// Key for where to go after the OAuth round trip.
    pub const OAUTH_NEXT: &str = "oauth_next";

    /// Key for the one-shot flash message.
    pub const FLASH: &str = "flash";

    /// Key for a movie's comment list.
    #[must_use]
    pub fn comments(movie_id: cineteca_core::MovieId) -> String {
        format!("comments_{movie_id}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn user() -> CurrentUser {
        CurrentUser {
            uid: UserId::new("uid-1"),
            email: Some("ana.gomez@cineteca.co".to_string()),
            display_name: None,
            photo_url: None,
            id_token: SecretString::from("id-token"),
            refresh_token: SecretString::from("refresh-token"),
            expires_at: 10_000,
            profile: None,
        }
    }

    #[test]
    fn test_display_username_fallbacks() {
        let mut u = user();
        assert_eq!(u.display_username(), "ana.gomez");

        u.display_name = Some("Ana Gómez".to_string());
        assert_eq!(u.display_username(), "Ana Gómez");

        u.profile = Some(UserProfile {
            username: Some("anita".to_string()),
            ..UserProfile::default()
        });
        assert_eq!(u.display_username(), "anita");
    }

    #[test]
    fn test_initial() {
        let mut u = user();
        assert_eq!(u.initial(), "A");
        u.email = None;
        assert_eq!(u.initial(), "U");
    }

    #[test]
    fn test_comment_author() {
        let mut u = user();
        assert_eq!(u.comment_author(), "ana.gomez@cineteca.co");
        u.display_name = Some("Ana".to_string());
        assert_eq!(u.comment_author(), "Ana");
        u.display_name = None;
        u.email = None;
        assert_eq!(u.comment_author(), "Anonymous user");
    }

    #[test]
    fn test_avatar_prefers_account_photo() {
        let mut u = user();
        assert!(u.avatar_url().is_none());

        u.profile = Some(UserProfile {
            avatar: Some("https://files/profile.png".to_string()),
            ..UserProfile::default()
        });
        assert_eq!(u.avatar_url().as_deref(), Some("https://files/profile.png"));

        u.photo_url = Some("https://files/account.png".to_string());
        assert_eq!(u.avatar_url().as_deref(), Some("https://files/account.png"));
    }

    #[test]
    fn test_token_expiring() {
        let u = user();
        assert!(!u.token_expiring(9_000));
        assert!(u.token_expiring(9_940));
        assert!(u.token_expiring(10_500));
    }

    #[test]
    fn test_profile_form_prefill() {
        let mut u = user();
        u.display_name = Some("Ana María Gómez".to_string());
        let form = u.profile_form();
        assert_eq!(form.first_name, "Ana");
        assert_eq!(form.last_name, "María");

        u.profile = Some(UserProfile {
            username: Some("Anita".to_string()),
            last_name: Some("Gómez".to_string()),
            phone: Some("3001234567".to_string()),
            ..UserProfile::default()
        });
        let form = u.profile_form();
        assert_eq!(form.first_name, "Anita");
        assert_eq!(form.last_name, "Gómez");
        assert_eq!(form.phone, "3001234567");
        assert_eq!(form.gender, "");
    }

    #[test]
    fn test_session_roundtrip_keeps_tokens() {
        let json = serde_json::to_string(&user()).unwrap();
        let back: CurrentUser = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id_token.expose_secret(), "id-token");
        assert!(!format!("{back:?}").contains("refresh-token"));
    }

    #[test]
    fn test_comment_key() {
        assert_eq!(keys::comments(cineteca_core::MovieId::new(7)), "comments_7");
    }
}
