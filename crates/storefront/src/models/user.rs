//! Profile documents stored in the `usuarios` collection.
//!
//! These types represent the backend document separate from the identity
//! account, which only knows the display name and photo URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cineteca_core::UserId;

/// Collection holding one profile document per uid.
pub const COLLECTION: &str = "usuarios";

/// Choices offered for the favourite venue.
pub const VENUE_OPTIONS: &[&str] = &["Sabaneta", "Envigado"];

/// Choices offered for gender.
pub const GENDER_OPTIONS: &[&str] = &["Femenino", "Masculino", "No Binario"];

/// A profile document (`usuarios/{uid}`).
///
/// Every field is optional: documents written by older sign-ups or by the
/// Google flow only carry a subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub uid: Option<UserId>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
    pub provider: Option<String>,
    pub last_name: Option<String>,
    #[serde(rename = "fechaNacimiento")]
    pub birth_date: Option<String>,
    #[serde(rename = "celular")]
    pub phone: Option<String>,
    #[serde(rename = "cineFavorito")]
    pub favorite_venue: Option<String>,
    #[serde(rename = "genero")]
    pub gender: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Profile document written on first sign-in. `createdAt` is stamped by the
/// server.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub uid: UserId,
    pub email: String,
    pub username: String,
    pub avatar: String,
    pub provider: &'static str,
}

/// Fields merged into the profile document by the account form.
/// `updatedAt` is stamped by the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub username: String,
    pub last_name: String,
    #[serde(rename = "fechaNacimiento")]
    pub birth_date: String,
    #[serde(rename = "celular")]
    pub phone: String,
    #[serde(rename = "cineFavorito")]
    pub favorite_venue: String,
    #[serde(rename = "genero")]
    pub gender: String,
}

/// The account form. Every field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub phone: String,
    pub favorite_venue: String,
    pub gender: String,
}

impl ProfileForm {
    /// Display name for the identity account: `"{first} {last}"`, trimmed.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// The document fields this form writes.
    #[must_use]
    pub fn to_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            username: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            birth_date: self.birth_date.trim().to_string(),
            phone: self.phone.trim().to_string(),
            favorite_venue: self.favorite_venue.trim().to_string(),
            gender: self.gender.trim().to_string(),
        }
    }
}

/// Treat empty strings as missing.
pub(crate) fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_decodes_partial_document() {
        let json = serde_json::json!({
            "uid": "uid-1",
            "email": "ana@cineteca.co",
            "username": "ana",
            "provider": "password",
            "createdAt": "2024-03-01T10:00:00Z"
        });
        let profile: UserProfile = serde_json::from_value(json).unwrap();

        assert_eq!(profile.username.as_deref(), Some("ana"));
        assert!(profile.last_name.is_none());
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn test_profile_decodes_account_form_fields() {
        let json = serde_json::json!({
            "uid": "uid-1",
            "username": "Ana",
            "lastName": "Gómez",
            "fechaNacimiento": "1994-05-02",
            "celular": "3001234567",
            "cineFavorito": "Sabaneta",
            "genero": "Femenino",
            "updatedAt": "2024-03-02T08:30:00Z"
        });
        let profile: UserProfile = serde_json::from_value(json).unwrap();

        assert_eq!(profile.last_name.as_deref(), Some("Gómez"));
        assert_eq!(profile.birth_date.as_deref(), Some("1994-05-02"));
        assert_eq!(profile.phone.as_deref(), Some("3001234567"));
        assert_eq!(profile.favorite_venue.as_deref(), Some("Sabaneta"));
        assert_eq!(profile.gender.as_deref(), Some("Femenino"));
    }

    #[test]
    fn test_new_profile_field_names() {
        let doc = serde_json::to_value(NewProfile {
            uid: UserId::new("uid-1"),
            email: "ana@cineteca.co".to_string(),
            username: "ana".to_string(),
            avatar: String::new(),
            provider: "password",
        })
        .unwrap();

        assert_eq!(doc["uid"], "uid-1");
        assert_eq!(doc["avatar"], "");
        assert_eq!(doc["provider"], "password");
    }

    #[test]
    fn test_form_display_name() {
        let form = ProfileForm {
            first_name: " Ana ".to_string(),
            last_name: "Gómez".to_string(),
            ..ProfileForm::default()
        };
        assert_eq!(form.display_name(), "Ana Gómez");

        let only_first = ProfileForm {
            first_name: "Ana".to_string(),
            ..ProfileForm::default()
        };
        assert_eq!(only_first.display_name(), "Ana");
    }

    #[test]
    fn test_form_update_uses_document_names() {
        let form = ProfileForm {
            first_name: "Ana".to_string(),
            last_name: "Gómez".to_string(),
            favorite_venue: "Envigado".to_string(),
            ..ProfileForm::default()
        };
        let doc = serde_json::to_value(form.to_update()).unwrap();

        assert_eq!(doc["username"], "Ana");
        assert_eq!(doc["lastName"], "Gómez");
        assert_eq!(doc["cineFavorito"], "Envigado");
        assert_eq!(doc["fechaNacimiento"], "");
        assert!(doc.get("favoriteVenue").is_none());
    }
}
