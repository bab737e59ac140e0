//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in user in route handlers, plus
//! the session helpers used by the sign-in and sign-out flows.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{Method, StatusCode, Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use secrecy::SecretString;
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::identity::AuthSession;
use crate::models::{CurrentUser, Flash, Flashes, StoredTokens, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in user.
///
/// If nobody is signed in, queues an "Access Denied" notification and
/// redirects to `/login?from=<path>`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name_or_email())
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but nobody is signed in.
pub enum AuthRejection {
    /// Redirect to the login page, returning to `from` afterwards.
    RedirectToLogin { from: String },
    /// No session layer is installed.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { from } => {
                Redirect::to(&format!("/login?from={}", urlencoding::encode(&from)))
                    .into_response()
            }
            Self::MissingSession => {
                tracing::error!("Session layer missing from request extensions");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        if let Some(user) = current_user(session).await {
            return Ok(Self(user));
        }

        // Nested routers strip their prefix from `parts.uri`.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        let from = return_path(&parts.method, uri);
        tracing::debug!(from = %from, "Redirecting anonymous user to login");
        Flashes::push(
            session,
            Flash::error("Please log in to view this content").with_title("Access Denied"),
        )
        .await;
        Err(AuthRejection::RedirectToLogin { from })
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is signed in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Page to come back to after signing in.
///
/// Page views come back to the same path and query. Form posts return to
/// the page that holds the form: the subscription page for
/// `/subscription/{id}/...` and the first path segment otherwise.
fn return_path(method: &Method, uri: &Uri) -> String {
    if method == Method::GET {
        return uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), ToString::to_string);
    }
    let mut segments = uri.path().trim_start_matches('/').split('/');
    match (segments.next(), segments.next()) {
        (Some("subscription"), Some(id)) => format!("/subscription/{id}"),
        (Some(first), _) if !first.is_empty() => format!("/{first}"),
        _ => "/".to_string(),
    }
}

/// Store a freshly signed-in user and their tokens in the session.
///
/// The session id is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_in_session(
    session: &Session,
    auth: &AuthSession,
) -> Result<CurrentUser, tower_sessions::session::Error> {
    session.cycle_id().await?;
    let user = CurrentUser::from(auth.user.clone());
    session.insert(session_keys::CURRENT_USER, &user).await?;
    session
        .insert(session_keys::IDENTITY_TOKENS, StoredTokens::from_auth(auth))
        .await?;

    set_sentry_user(&user.uid, user.email.as_ref().map(boxsub_core::Email::as_str));
    Ok(user)
}

/// Replace the stored user after a profile change.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn update_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Clear the signed-in user (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_out_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session
        .remove::<StoredTokens>(session_keys::IDENTITY_TOKENS)
        .await?;
    clear_sentry_user();
    Ok(())
}

/// An id token valid for at least the refresh margin, refreshing it through
/// the identity provider first when needed.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if the session holds no tokens, or the
/// identity error if the refresh fails.
pub async fn fresh_id_token(state: &AppState, session: &Session) -> Result<SecretString, AppError> {
    let tokens: StoredTokens = session
        .get(session_keys::IDENTITY_TOKENS)
        .await?
        .ok_or_else(|| AppError::Unauthorized("no identity tokens in session".to_string()))?;

    if !tokens.needs_refresh(Utc::now()) {
        return Ok(tokens.id_token());
    }

    tracing::debug!("Refreshing identity token");
    let refreshed = state.identity().refresh(&tokens.refresh_token()).await?;
    session
        .insert(
            session_keys::IDENTITY_TOKENS,
            StoredTokens::from_auth(&refreshed),
        )
        .await?;
    Ok(refreshed.id_token)
}

/// Whether `target` is a same-site path that is safe to redirect to.
#[must_use]
pub fn is_safe_redirect(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn uri(s: &'static str) -> Uri {
        Uri::from_static(s)
    }

    #[test]
    fn test_return_path_for_pages_and_forms() {
        assert_eq!(return_path(&Method::GET, &uri("/subscription/3")), "/subscription/3");
        assert_eq!(
            return_path(&Method::POST, &uri("/subscription/3/subscribe")),
            "/subscription/3"
        );
        assert_eq!(return_path(&Method::POST, &uri("/profile/details")), "/profile");
        assert_eq!(
            return_path(&Method::POST, &uri("/subscriptions/2/remove")),
            "/subscriptions"
        );
        assert_eq!(return_path(&Method::POST, &uri("/")), "/");
    }

    #[test]
    fn test_return_path_keeps_query_for_page_views() {
        assert_eq!(
            return_path(&Method::GET, &uri("/profile?tab=wishlist")),
            "/profile?tab=wishlist"
        );
        assert_eq!(
            return_path(&Method::POST, &uri("/profile/details?x=1")),
            "/profile"
        );
    }

    #[test]
    fn test_is_safe_redirect() {
        assert!(is_safe_redirect("/subscriptions"));
        assert!(!is_safe_redirect("//evil.example"));
        assert!(!is_safe_redirect("https://evil.example"));
        assert!(!is_safe_redirect("/\\evil.example"));
        assert!(!is_safe_redirect(""));
    }
}
