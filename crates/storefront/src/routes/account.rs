//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::Purchase;
use crate::models::user::{GENDER_OPTIONS, ProfileForm, VENUE_OPTIONS};
use crate::routes::Layout;
use crate::routes::upload::AvatarForm;
use crate::services::{AuthError, ProfileService, PurchaseService};
use crate::state::AppState;
use crate::storage::{ClientStorage, Flash};

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub email: String,
    pub avatar_url: Option<String>,
    pub initial: String,
    pub form: ProfileForm,
    pub venues: Vec<&'static str>,
    pub genders: Vec<&'static str>,
    pub error: Option<String>,
}

impl ProfileTemplate {
    fn new(layout: Layout, user: &crate::models::CurrentUser, form: ProfileForm) -> Self {
        Self {
            layout,
            email: user.email.clone().unwrap_or_default(),
            avatar_url: user.avatar_url(),
            initial: user.initial(),
            form,
            venues: VENUE_OPTIONS.to_vec(),
            genders: GENDER_OPTIONS.to_vec(),
            error: None,
        }
    }

    fn venue_selected(&self, venue: &&str) -> bool {
        self.form.favorite_venue == *venue
    }

    fn gender_selected(&self, gender: &&str) -> bool {
        self.form.gender == *gender
    }
}

/// Purchase history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/purchases.html")]
pub struct PurchasesTemplate {
    pub layout: Layout,
    pub purchases: Vec<Purchase>,
}

/// Display the profile form, prefilled from the profile document.
#[instrument(skip(layout, user), fields(uid = %user.uid))]
pub async fn profile(layout: Layout, RequireAuth(user): RequireAuth) -> impl IntoResponse {
    let form = user.profile_form();
    ProfileTemplate::new(layout, &user, form)
}

fn form_from(multipart: &AvatarForm) -> ProfileForm {
    ProfileForm {
        first_name: multipart.text("first_name").to_string(),
        last_name: multipart.text("last_name").to_string(),
        birth_date: multipart.text("birth_date").to_string(),
        phone: multipart.text("phone").to_string(),
        favorite_venue: multipart.text("favorite_venue").to_string(),
        gender: multipart.text("gender").to_string(),
    }
}

/// An option outside the offered choices, if any.
fn invalid_choice(form: &ProfileForm) -> Option<&'static str> {
    let venue = form.favorite_venue.trim();
    let gender = form.gender.trim();
    if !venue.is_empty() && !VENUE_OPTIONS.contains(&venue) {
        return Some("Please choose a venue from the list.");
    }
    if !gender.is_empty() && !GENDER_OPTIONS.contains(&gender) {
        return Some("Please choose a gender from the list.");
    }
    None
}

/// Save the profile form and, when a file was chosen, the avatar.
#[instrument(skip(state, layout, storage, user, multipart), fields(uid = %user.uid))]
pub async fn update_profile(
    State(state): State<AppState>,
    layout: Layout,
    storage: ClientStorage,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    let parsed = AvatarForm::parse(multipart).await?;
    let form = form_from(&parsed);

    let rejection = if parsed.rejected_avatar {
        Some("The avatar must be an image.")
    } else {
        invalid_choice(&form)
    };
    if let Some(message) = rejection {
        let mut page = ProfileTemplate::new(layout, &user, form);
        page.error = Some(message.to_string());
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    let service = ProfileService::new(state.backend());
    let saved = match service.update_profile(&user, &form).await {
        Ok(updated) => match parsed.avatar {
            Some(upload) => service.update_avatar(&updated, upload).await,
            None => Ok(updated),
        },
        Err(e) => Err(e),
    };

    match saved {
        Ok(updated) => {
            set_current_user(&storage, &updated).await?;
            storage.flash(Flash::success("Your profile was saved.")).await;
            Ok(Redirect::to("/account").into_response())
        }
        Err(e) => {
            report(&e);
            let mut page = ProfileTemplate::new(layout, &user, form);
            page.error = Some(e.user_message().to_string());
            Ok((StatusCode::BAD_GATEWAY, page).into_response())
        }
    }
}

fn report(error: &AuthError) {
    let event_id = sentry::capture_error(error);
    tracing::error!(error = %error, sentry_event_id = %event_id, "Profile update failed");
}

/// Display the user's purchases, newest first.
#[instrument(skip(state, layout, user), fields(uid = %user.uid))]
pub async fn purchases(
    State(state): State<AppState>,
    layout: Layout,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let purchases = PurchaseService::new(state.backend())
        .list_for_user(&user)
        .await?;

    Ok(PurchasesTemplate { layout, purchases }.into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_choice() {
        let mut form = ProfileForm::default();
        assert!(invalid_choice(&form).is_none());

        form.favorite_venue = "Envigado".to_string();
        form.gender = "No Binario".to_string();
        assert!(invalid_choice(&form).is_none());

        form.favorite_venue = "Bogotá".to_string();
        assert!(invalid_choice(&form).is_some());

        form.favorite_venue = String::new();
        form.gender = "Other".to_string();
        assert!(invalid_choice(&form).is_some());
    }
}
