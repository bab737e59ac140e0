//! Subscription box route handlers.
//!
//! All routes here require a signed-in user. Membership changes read and
//! rewrite the user's entry in `userSubscriptions` or `userWishlist` and
//! redirect back with a notification.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use boxsub_core::{Email, Rating, ReviewId, SubscriptionId};

use crate::catalog::Subscription;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAuth, fresh_id_token, sign_out_session};
use crate::models::{CurrentUser, Flash};
use crate::reviews::Review;
use crate::routes::pages::not_found_page;
use crate::routes::{PageContext, flash_redirect};
use crate::state::AppState;
use crate::storage::StorageError;

/// Notification for a store failure during a membership change.
const STORAGE_FAILED: &str = "Something went wrong. Please try again.";

// =============================================================================
// Form Types
// =============================================================================

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub review: String,
    /// 1-5; blank means 5.
    #[serde(default)]
    pub rating: String,
}

// =============================================================================
// Templates
// =============================================================================

/// A review as shown on the detail page.
pub struct ReviewView {
    pub id: String,
    pub user_name: String,
    pub user_photo: String,
    pub rating: u8,
    pub review: String,
    pub date: String,
    /// Whether the signed-in user wrote it.
    pub is_own: bool,
}

impl ReviewView {
    fn new(review: Review, viewer: &CurrentUser) -> Self {
        Self {
            is_own: review.user_id == viewer.uid,
            id: review.id.to_string(),
            user_name: review.user_name,
            user_photo: review.user_photo,
            rating: review.rating.value(),
            review: review.review,
            date: review
                .created_at
                .and_then(|t| t.to_datetime())
                .map(|dt| dt.format("%B %-d, %Y").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Subscription detail template.
#[derive(Template, WebTemplate)]
#[template(path = "subscriptions/show.html")]
pub struct SubscriptionTemplate {
    pub ctx: PageContext,
    pub subscription: Subscription,
    pub is_subscribed: bool,
    pub is_wishlisted: bool,
    pub reviews: Vec<ReviewView>,
    pub ratings: [u8; 5],
}

/// "My subscriptions" template.
#[derive(Template, WebTemplate)]
#[template(path = "subscriptions/index.html")]
pub struct SubscriptionsTemplate {
    pub ctx: PageContext,
    pub subscriptions: Vec<Subscription>,
}

// =============================================================================
// Helpers
// =============================================================================

/// The catalog record for a path id, or `None` for malformed and unknown
/// ids. Fixture failures are logged and count as unknown.
async fn find_subscription(state: &AppState, id: &str) -> Option<Subscription> {
    let id = id.parse::<SubscriptionId>().ok()?;
    match state.catalog().subscription(id).await {
        Ok(found) => found,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load subscriptions");
            None
        }
    }
}

fn detail_path(id: SubscriptionId) -> String {
    format!("/subscription/{id}")
}

async fn not_found_redirect(session: &Session) -> Response {
    flash_redirect(session, Flash::error("Subscription not found"), "/")
        .await
        .into_response()
}

/// The user's email, which keys the membership maps.
async fn membership_email<'a>(
    session: &Session,
    user: &'a CurrentUser,
    back: &str,
) -> Result<&'a Email, Response> {
    match &user.email {
        Some(email) => Ok(email),
        None => Err(flash_redirect(
            session,
            Flash::error("You must be logged in to manage subscriptions"),
            back,
        )
        .await
        .into_response()),
    }
}

/// Queue the storage-failure notification and redirect to `back`.
async fn storage_failed(session: &Session, back: &str, error: &StorageError) -> Response {
    tracing::error!(error = %error, "Membership update failed");
    flash_redirect(session, Flash::error(STORAGE_FAILED), back)
        .await
        .into_response()
}

// =============================================================================
// Detail Routes
// =============================================================================

/// Display a subscription box with the user's membership state and its
/// reviews.
///
/// # Errors
///
/// Returns `AppError::Storage` if membership cannot be read.
#[instrument(skip(state, user, ctx), fields(uid = %user.uid))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ctx: PageContext,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(subscription) = find_subscription(&state, &id).await else {
        return Ok(not_found_page(ctx, "Subscription"));
    };

    let (is_subscribed, is_wishlisted) = match &user.email {
        Some(email) => (
            state.subscriptions().contains(email, subscription.id).await?,
            state.wishlist().contains(email, subscription.id).await?,
        ),
        None => (false, false),
    };

    let reviews = state
        .reviews()
        .list(subscription.id)
        .await
        .into_iter()
        .map(|r| ReviewView::new(r, &user))
        .collect();

    Ok(SubscriptionTemplate {
        ctx: ctx.with_title(subscription.name.clone()),
        subscription,
        is_subscribed,
        is_wishlisted,
        reviews,
        ratings: [5, 4, 3, 2, 1],
    }
    .into_response())
}

/// Subscribe to a box.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn subscribe(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let Some(subscription) = find_subscription(&state, &id).await else {
        return not_found_redirect(&session).await;
    };
    let back = detail_path(subscription.id);
    let email = match membership_email(&session, &user, &back).await {
        Ok(email) => email,
        Err(response) => return response,
    };

    let flash = match state.subscriptions().add(email, subscription.id).await {
        Ok(true) => {
            tracing::info!(subscription_id = %subscription.id, "Subscribed");
            Flash::success("Successfully subscribed!")
                .with_link("/subscriptions", "View My Subscriptions")
        }
        Ok(false) => Flash::info("You are already subscribed to this box"),
        Err(e) => return storage_failed(&session, &back, &e).await,
    };
    flash_redirect(&session, flash, &back).await.into_response()
}

/// Unsubscribe from a box.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let Some(subscription) = find_subscription(&state, &id).await else {
        return not_found_redirect(&session).await;
    };
    let back = detail_path(subscription.id);
    let email = match membership_email(&session, &user, &back).await {
        Ok(email) => email,
        Err(response) => return response,
    };

    if let Err(e) = state.subscriptions().remove(email, subscription.id).await {
        return storage_failed(&session, &back, &e).await;
    }
    tracing::info!(subscription_id = %subscription.id, "Unsubscribed");
    flash_redirect(&session, Flash::success("Successfully unsubscribed"), &back)
        .await
        .into_response()
}

/// Add a box to the wishlist, or remove it if already there.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn toggle_wishlist(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let Some(subscription) = find_subscription(&state, &id).await else {
        return not_found_redirect(&session).await;
    };
    let back = detail_path(subscription.id);
    let email = match membership_email(&session, &user, &back).await {
        Ok(email) => email,
        Err(response) => return response,
    };

    let flash = match state.wishlist().toggle(email, subscription.id).await {
        Ok(true) => Flash::success("Added to wishlist"),
        Ok(false) => Flash::success("Removed from wishlist"),
        Err(e) => return storage_failed(&session, &back, &e).await,
    };
    flash_redirect(&session, flash, &back).await.into_response()
}

// =============================================================================
// Review Routes
// =============================================================================

/// An id token for a review write, or the response that sends the user to
/// log in again.
async fn write_token(
    state: &AppState,
    session: &Session,
    back: &str,
) -> Result<secrecy::SecretString, Response> {
    match fresh_id_token(state, session).await {
        Ok(token) => Ok(token),
        Err(e) => {
            tracing::warn!(error = %e, "No usable identity token");
            if let Err(e) = sign_out_session(session).await {
                tracing::error!(error = %e, "Failed to clear session");
            }
            let login = format!("/login?from={}", urlencoding::encode(back));
            Err(flash_redirect(
                session,
                Flash::error("Your session has expired. Please log in again."),
                &login,
            )
            .await
            .into_response())
        }
    }
}

/// Submit a review for a box the user is subscribed to.
#[instrument(skip(state, session, user, form), fields(uid = %user.uid))]
pub async fn submit_review(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Response {
    let Some(subscription) = find_subscription(&state, &id).await else {
        return not_found_redirect(&session).await;
    };
    let back = detail_path(subscription.id);

    let rating = if form.rating.trim().is_empty() {
        Rating::default()
    } else if let Ok(rating) = Rating::parse(&form.rating) {
        rating
    } else {
        let flash = Flash::error("Please choose a rating between 1 and 5");
        return flash_redirect(&session, flash, &back).await.into_response();
    };

    let token = match write_token(&state, &session, &back).await {
        Ok(token) => token,
        Err(response) => return response,
    };

    let flash = match state
        .reviews()
        .submit(&user, &token, subscription.id, &form.review, rating)
        .await
    {
        Ok(_) => Flash::success("Review submitted successfully!"),
        Err(e) => {
            tracing::warn!(error = %e, "Review rejected");
            Flash::error(e.submit_message())
        }
    };
    flash_redirect(&session, flash, &back).await.into_response()
}

/// Delete one of the user's own reviews.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn delete_review(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path((id, review_id)): Path<(String, String)>,
) -> Response {
    let back = id
        .parse::<SubscriptionId>()
        .map_or_else(|_| "/".to_string(), detail_path);

    let token = match write_token(&state, &session, &back).await {
        Ok(token) => token,
        Err(response) => return response,
    };

    let flash = match state
        .reviews()
        .delete(&user, &token, &ReviewId::new(review_id))
        .await
    {
        Ok(()) => Flash::success("Review deleted successfully"),
        Err(e) => {
            tracing::warn!(error = %e, "Review delete rejected");
            Flash::error(e.delete_message())
        }
    };
    flash_redirect(&session, flash, &back).await.into_response()
}

// =============================================================================
// My Subscriptions Routes
// =============================================================================

/// Display the user's subscriptions.
///
/// # Errors
///
/// Returns `AppError::Storage` if membership cannot be read.
#[instrument(skip(state, user, ctx), fields(uid = %user.uid))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut ctx: PageContext,
) -> Result<Response, AppError> {
    let ids = match &user.email {
        Some(email) => state.subscriptions().ids(email).await?,
        None => Vec::new(),
    };

    let subscriptions = match state.catalog().subscriptions_by_ids(&ids).await {
        Ok(list) => list,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load subscriptions");
            ctx.notify(Flash::error("Failed to load subscription data"));
            Vec::new()
        }
    };

    Ok(SubscriptionsTemplate {
        ctx: ctx.with_title("My Subscriptions"),
        subscriptions,
    }
    .into_response())
}

/// Remove a box from the user's subscriptions.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    const BACK: &str = "/subscriptions";

    let Ok(subscription_id) = id.parse::<SubscriptionId>() else {
        return Redirect::to(BACK).into_response();
    };
    let email = match membership_email(&session, &user, BACK).await {
        Ok(email) => email,
        Err(response) => return response,
    };
    let name = find_subscription(&state, &id)
        .await
        .map_or_else(|| "Subscription".to_string(), |s| s.name);

    if let Err(e) = state.subscriptions().remove(email, subscription_id).await {
        return storage_failed(&session, BACK, &e).await;
    }
    flash_redirect(&session, Flash::success(format!("{name} removed successfully")), BACK)
        .await
        .into_response()
}
