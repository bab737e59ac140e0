//! Profile route handlers.
//!
//! The profile page has five tabs selected by `?tab=`: profile, details,
//! subscriptions, wishlist and settings.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use boxsub_core::SubscriptionId;

use crate::catalog::Subscription;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAuth, fresh_id_token, sign_out_session, update_current_user};
use crate::models::{CurrentUser, Flash};
use crate::routes::{PageContext, flash_redirect};
use crate::services::AccountError;
use crate::state::AppState;
use crate::storage::{Gender, ProfileDetails};

// =============================================================================
// Tabs
// =============================================================================

/// A profile page tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileTab {
    #[default]
    Profile,
    Details,
    Subscriptions,
    Wishlist,
    Settings,
}

impl ProfileTab {
    pub const ALL: [Self; 5] = [
        Self::Profile,
        Self::Details,
        Self::Subscriptions,
        Self::Wishlist,
        Self::Settings,
    ];

    /// Parse `?tab=`; unknown values select the profile tab.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| Some(t.as_str()) == value)
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Details => "details",
            Self::Subscriptions => "subscriptions",
            Self::Wishlist => "wishlist",
            Self::Settings => "settings",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Profile => "Profile",
            Self::Details => "Profile Details",
            Self::Subscriptions => "My Subscriptions",
            Self::Wishlist => "Wishlist",
            Self::Settings => "Account Settings",
        }
    }

    fn href(self) -> String {
        format!("/profile?tab={}", self.as_str())
    }
}

// =============================================================================
// Form and Query Types
// =============================================================================

/// Profile page query parameters.
#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub tab: Option<String>,
}

/// Name and photo form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    #[serde(default)]
    pub photo_url: String,
}

/// Profile details form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetailsForm {
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub zip_code: String,
    pub date_of_birth: String,
    pub gender: String,
}

impl From<DetailsForm> for ProfileDetails {
    fn from(form: DetailsForm) -> Self {
        Self {
            phone: form.phone,
            address: form.address,
            city: form.city,
            country: form.country,
            zip_code: form.zip_code,
            date_of_birth: form.date_of_birth,
            gender: Gender::from_label(&form.gender),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile/show.html")]
pub struct ProfileTemplate {
    pub ctx: PageContext,
    pub user: CurrentUser,
    pub tab: ProfileTab,
    pub tabs: [ProfileTab; 5],
    pub details: ProfileDetails,
    pub gender_options: Vec<GenderOption>,
    /// Filled for the subscriptions tab.
    pub subscriptions: Vec<Subscription>,
    /// Filled for the wishlist tab.
    pub wishlist: Vec<Subscription>,
}

/// An option in the gender select.
pub struct GenderOption {
    pub label: &'static str,
    pub selected: bool,
}

fn gender_options(selected: Option<Gender>) -> Vec<GenderOption> {
    Gender::ALL
        .into_iter()
        .map(|g| GenderOption {
            label: g.label(),
            selected: selected == Some(g),
        })
        .collect()
}

// =============================================================================
// Routes
// =============================================================================

/// Display the profile page.
///
/// # Errors
///
/// Returns `AppError::Storage` if stored details or membership cannot be read.
#[instrument(skip(state, user, ctx), fields(uid = %user.uid))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut ctx: PageContext,
    Query(query): Query<ProfileQuery>,
) -> Result<Response, AppError> {
    let tab = ProfileTab::from_query(query.tab.as_deref());

    let details = state.profile_details().load(&user.uid).await?;

    let list = match (tab, &user.email) {
        (ProfileTab::Subscriptions, Some(email)) => Some(state.subscriptions().ids(email).await?),
        (ProfileTab::Wishlist, Some(email)) => Some(state.wishlist().ids(email).await?),
        _ => None,
    };
    let entries = match list {
        Some(ids) => match state.catalog().subscriptions_by_ids(&ids).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load subscriptions");
                ctx.notify(Flash::error("Failed to load subscription data"));
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    let (subscriptions, wishlist) = if tab == ProfileTab::Wishlist {
        (Vec::new(), entries)
    } else {
        (entries, Vec::new())
    };

    Ok(ProfileTemplate {
        ctx: ctx.with_title("Profile"),
        user,
        tab,
        tabs: ProfileTab::ALL,
        gender_options: gender_options(details.gender),
        details,
        subscriptions,
        wishlist,
    }
    .into_response())
}

/// Update the display name and photo URL.
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be updated.
#[instrument(skip(state, session, user, form), fields(uid = %user.uid))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect, AppError> {
    let back = ProfileTab::Profile.href();

    let token = match fresh_id_token(&state, &session).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "No usable identity token");
            let flash = Flash::error("Failed to update profile. Please try again.");
            return Ok(flash_redirect(&session, flash, &back).await);
        }
    };

    let result = state
        .accounts()
        .update_profile(&token, &form.name, &form.photo_url)
        .await;
    let flash = match result {
        Ok(updated) => {
            let mut current = CurrentUser::from(updated);
            // Some providers omit the email from update responses.
            if current.email.is_none() {
                current.email = user.email;
            }
            update_current_user(&session, &current).await?;
            Flash::success("Profile updated successfully!")
        }
        Err(AccountError::Validation(msg)) => Flash::error(msg),
        Err(e) => {
            tracing::warn!(error = %e, "Profile update failed");
            Flash::error("Failed to update profile. Please try again.")
        }
    };
    Ok(flash_redirect(&session, flash, &back).await)
}

/// Save the profile details stored under `userDetails_<uid>`.
#[instrument(skip(state, session, user, form), fields(uid = %user.uid))]
pub async fn save_details(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<DetailsForm>,
) -> Redirect {
    let flash = match state
        .accounts()
        .save_details(&user.uid, ProfileDetails::from(form))
        .await
    {
        Ok(()) => Flash::success("Profile details updated successfully!"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to save profile details");
            Flash::error("Failed to update profile details. Please try again.")
        }
    };
    flash_redirect(&session, flash, &ProfileTab::Details.href()).await
}

/// Remove a box from the wishlist.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn remove_wishlist(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Redirect {
    let back = ProfileTab::Wishlist.href();
    let (Ok(id), Some(email)) = (id.parse::<SubscriptionId>(), user.email.as_ref()) else {
        return Redirect::to(&back);
    };

    let name = match state.catalog().subscription(id).await {
        Ok(Some(subscription)) => subscription.name,
        Ok(None) => "Subscription".to_string(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load subscriptions");
            "Subscription".to_string()
        }
    };

    let flash = match state.wishlist().remove(email, id).await {
        Ok(_) => Flash::success(format!("{name} removed from wishlist")),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update wishlist");
            Flash::error("Something went wrong. Please try again.")
        }
    };
    flash_redirect(&session, flash, &back).await
}

/// Delete the account and everything stored for it.
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be cleared.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn delete_account(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect, AppError> {
    let back = ProfileTab::Settings.href();

    let token = match fresh_id_token(&state, &session).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "No usable identity token");
            let flash = Flash::error(
                "Failed to delete account. Please log out and log in again before deleting your account.",
            );
            return Ok(flash_redirect(&session, flash, &back).await);
        }
    };

    let result = state.accounts().delete_account(&user, &token).await;
    match result {
        Ok(()) => {
            sign_out_session(&session).await?;
            Ok(flash_redirect(&session, Flash::success("Account deleted successfully"), "/").await)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Account deletion failed");
            Ok(flash_redirect(&session, Flash::error(e.delete_message()), &back).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_from_query() {
        assert_eq!(ProfileTab::from_query(Some("wishlist")), ProfileTab::Wishlist);
        assert_eq!(ProfileTab::from_query(Some("settings")), ProfileTab::Settings);
        assert_eq!(ProfileTab::from_query(Some("billing")), ProfileTab::Profile);
        assert_eq!(ProfileTab::from_query(None), ProfileTab::Profile);
    }

    #[test]
    fn test_details_form_maps_gender() {
        let form = DetailsForm {
            city: "Dhaka".to_string(),
            gender: "Prefer not to say".to_string(),
            ..DetailsForm::default()
        };
        let details = ProfileDetails::from(form);
        assert_eq!(details.city, "Dhaka");
        assert_eq!(details.gender, Some(Gender::PreferNotToSay));

        let details = ProfileDetails::from(DetailsForm::default());
        assert_eq!(details.gender, None);
    }
}
