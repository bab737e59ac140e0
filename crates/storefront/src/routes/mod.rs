//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Home page (?all=true, ?reviews=all)
//! GET  /terms-and-conditions              - Terms page
//! GET  /privacy-policy                    - Privacy page
//!
//! # Blog
//! GET  /blog                              - Post list (?category=)
//! GET  /blog/{id}                         - Post detail with related posts
//!
//! # Auth
//! GET  /login                             - Login page (?from=)
//! POST /login                             - Email/password sign-in
//! GET  /signup                            - Sign-up page
//! POST /signup                            - Create account
//! GET  /forgot-password                   - Password reset page
//! POST /forgot-password                   - Send reset email
//! POST /logout                            - Sign out
//! GET  /auth/{provider}/login             - Start Google/GitHub sign-in
//! GET  /auth/{provider}/callback          - Finish Google/GitHub sign-in
//!
//! # Subscriptions (requires auth)
//! GET  /subscription/{id}                             - Box detail with reviews
//! POST /subscription/{id}/subscribe                   - Subscribe
//! POST /subscription/{id}/unsubscribe                 - Unsubscribe
//! POST /subscription/{id}/wishlist                    - Toggle wishlist
//! POST /subscription/{id}/reviews                     - Submit review
//! POST /subscription/{id}/reviews/{review_id}/delete  - Delete own review
//! GET  /subscriptions                                 - My subscriptions
//! POST /subscriptions/{id}/remove                     - Unsubscribe from list
//!
//! # Profile (requires auth)
//! GET  /profile                           - Profile tabs (?tab=)
//! POST /profile                           - Update name and photo
//! POST /profile/details                   - Save profile details
//! POST /profile/wishlist/{id}/remove      - Remove wishlist entry
//! POST /profile/delete                    - Delete account
//! ```

pub mod auth;
pub mod blog;
pub mod context;
pub mod home;
pub mod pages;
pub mod profile;
pub mod social_auth;
pub mod subscriptions;

use std::sync::Arc;

use axum::{
    Router,
    response::Redirect,
    routing::{MethodRouter, get, post},
};
use tower_sessions::Session;

pub use context::PageContext;

use crate::catalog::CatalogError;
use crate::middleware::rate_limit::RateLimiterLayer;
use crate::middleware::{auth_rate_limiter, is_safe_redirect};
use crate::models::{Flash, Flashes};
use crate::state::AppState;

/// Create the auth routes router.
///
/// Credential posts are rate limited per client IP when `rate_limit` is set.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let limiter = if rate_limit {
        let limiter = auth_rate_limiter();
        if limiter.is_none() {
            tracing::error!("Invalid rate limiter configuration, credential forms are unlimited");
        }
        limiter
    } else {
        None
    };

    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(limited(post(auth::login), limiter.as_ref())),
        )
        .route(
            "/signup",
            get(auth::signup_page).merge(limited(post(auth::signup), limiter.as_ref())),
        )
        .route(
            "/forgot-password",
            get(auth::forgot_password_page)
                .merge(limited(post(auth::forgot_password), limiter.as_ref())),
        )
        .route("/logout", post(auth::logout))
        .route("/auth/{provider}/login", get(social_auth::login))
        .route("/auth/{provider}/callback", get(social_auth::callback))
}

fn limited(
    route: MethodRouter<AppState>,
    limiter: Option<&RateLimiterLayer>,
) -> MethodRouter<AppState> {
    match limiter {
        Some(layer) => route.layer(layer.clone()),
        None => route,
    }
}

/// Create the blog routes router.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(blog::index))
        .route("/{id}", get(blog::show))
}

/// Create the subscription detail routes router.
pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(subscriptions::show))
        .route("/{id}/subscribe", post(subscriptions::subscribe))
        .route("/{id}/unsubscribe", post(subscriptions::unsubscribe))
        .route("/{id}/wishlist", post(subscriptions::toggle_wishlist))
        .route("/{id}/reviews", post(subscriptions::submit_review))
        .route(
            "/{id}/reviews/{review_id}/delete",
            post(subscriptions::delete_review),
        )
}

/// Create the "my subscriptions" routes router.
pub fn my_subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(subscriptions::index))
        .route("/{id}/remove", post(subscriptions::remove))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::show).post(profile::update))
        .route("/details", post(profile::save_details))
        .route("/wishlist/{id}/remove", post(profile::remove_wishlist))
        .route("/delete", post(profile::delete_account))
}

/// Create all routes for the storefront.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Static pages
        .route("/terms-and-conditions", get(pages::terms))
        .route("/privacy-policy", get(pages::privacy))
        // Blog
        .nest("/blog", blog_routes())
        // Auth
        .merge(auth_routes(rate_limit))
        // Subscriptions
        .nest("/subscription", subscription_routes())
        .nest("/subscriptions", my_subscription_routes())
        // Profile
        .nest("/profile", profile_routes())
}

/// Unwrap a fixture, logging a load failure and rendering the empty state.
pub(crate) fn fixture_or_empty<T>(
    result: Result<Arc<Vec<T>>, CatalogError>,
    fixture: &str,
) -> Arc<Vec<T>> {
    result.unwrap_or_else(|e| {
        tracing::error!(fixture, error = %e, "Failed to load fixture");
        Arc::new(Vec::new())
    })
}

/// The `from` target if it is a safe same-site path, else `/`.
pub(crate) fn redirect_target(from: Option<&str>) -> &str {
    from.filter(|f| is_safe_redirect(f)).unwrap_or("/")
}

/// Queue `flash` and redirect to `to`.
pub(crate) async fn flash_redirect(session: &Session, flash: Flash, to: &str) -> Redirect {
    Flashes::push(session, flash).await;
    Redirect::to(to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_target() {
        assert_eq!(redirect_target(Some("/subscriptions")), "/subscriptions");
        assert_eq!(redirect_target(Some("https://evil.example")), "/");
        assert_eq!(redirect_target(Some("//evil.example")), "/");
        assert_eq!(redirect_target(None), "/");
    }

    #[test]
    fn test_fixture_or_empty() {
        let ok: Result<Arc<Vec<i32>>, CatalogError> = Ok(Arc::new(vec![1, 2]));
        assert_eq!(fixture_or_empty(ok, "numbers").len(), 2);

        let err: Result<Arc<Vec<i32>>, CatalogError> = Err(CatalogError::Io {
            path: "data/missing.json".to_string(),
            message: "not found".to_string(),
        });
        assert!(fixture_or_empty(err, "numbers").is_empty());
    }
}
