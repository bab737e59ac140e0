//! Authentication route handlers.
//!
//! Handles email/password login, sign-up, password reset and logout through
//! the configured identity provider. Failed submissions re-render the form
//! with the entered values and an error notification.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::identity::SocialProvider;
use crate::middleware::{sign_in_session, sign_out_session};
use crate::models::Flash;
use crate::routes::{PageContext, flash_redirect, redirect_target};
use crate::services::SignUpInput;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub from: Option<String>,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub name: String,
    #[serde(default)]
    pub photo_url: String,
    pub email: String,
    pub password: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Page the user was sent away from.
    pub from: Option<String>,
}

/// Query parameters for the forgot-password page.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordQuery {
    /// Prefill from the login form.
    pub email: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// A social sign-in button.
pub struct SocialButton {
    pub href: String,
    pub label: &'static str,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub email: String,
    /// Safe return path, empty when none.
    pub from: String,
    pub redirect_message: Option<String>,
    pub social: Vec<SocialButton>,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignUpTemplate {
    pub ctx: PageContext,
    pub name: String,
    pub photo_url: String,
    pub email: String,
    pub social: Vec<SocialButton>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub ctx: PageContext,
    pub email: String,
    /// Whether a reset email was just sent.
    pub sent: bool,
}

/// Explanation shown above the login form when the user was sent there from
/// a private page.
#[must_use]
pub fn redirect_message(from: &str) -> Option<String> {
    let from = from.split('?').next().unwrap_or(from);
    if from.is_empty() || from == "/" {
        return None;
    }
    let message = if from.starts_with("/subscription/") {
        "Please log in to access the subscription details you were viewing.".to_string()
    } else if from == "/subscriptions" {
        "Please log in to view your subscriptions.".to_string()
    } else if from == "/profile" || from.starts_with("/profile/") {
        "Please log in to access your profile.".to_string()
    } else if from.starts_with("/blog/") {
        "Please log in to view the full blog post.".to_string()
    } else {
        format!("Please log in to access {}.", from.trim_start_matches('/'))
    };
    Some(message)
}

/// Sign-in buttons for the configured social providers.
fn social_buttons(state: &AppState, from: &str) -> Vec<SocialButton> {
    [SocialProvider::Google, SocialProvider::GitHub]
        .into_iter()
        .filter(|p| state.oauth_client(*p).is_some())
        .map(|p| SocialButton {
            href: if from.is_empty() {
                format!("/auth/{p}/login")
            } else {
                format!("/auth/{p}/login?from={}", urlencoding::encode(from))
            },
            label: p.label(),
        })
        .collect()
}

fn login_template(state: &AppState, ctx: PageContext, email: String, from: &str) -> LoginTemplate {
    LoginTemplate {
        ctx: ctx.with_title("Login"),
        email,
        from: from.to_string(),
        redirect_message: redirect_message(from),
        social: social_buttons(state, from),
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
///
/// Signed-in users are sent on to `from` instead.
#[instrument(skip(state, ctx))]
pub async fn login_page(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<LoginQuery>,
) -> Response {
    let from = query.from.as_deref().map_or("", |f| redirect_target(Some(f)));
    if ctx.user.is_some() {
        return Redirect::to(redirect_target(Some(from))).into_response();
    }
    login_template(&state, ctx, String::new(), from).into_response()
}

/// Handle login form submission.
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be updated.
#[instrument(skip(state, session, ctx, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    mut ctx: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let from = form
        .from
        .as_deref()
        .filter(|f| !f.is_empty())
        .map_or("", |f| redirect_target(Some(f)))
        .to_string();

    let result = state.accounts().sign_in(&form.email, &form.password).await;
    match result {
        Ok(auth) => {
            sign_in_session(&session, &auth).await?;
            let to = redirect_target(Some(from.as_str()));
            Ok(flash_redirect(&session, Flash::success("Successfully signed in!"), to)
                .await
                .into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            ctx.notify(Flash::error(e.sign_in_message()));
            Ok(login_template(&state, ctx, form.email, &from).into_response())
        }
    }
}

// =============================================================================
// Sign-up Routes
// =============================================================================

/// Display the sign-up page.
#[instrument(skip(state, ctx))]
pub async fn signup_page(State(state): State<AppState>, ctx: PageContext) -> Response {
    if ctx.user.is_some() {
        return Redirect::to("/").into_response();
    }
    SignUpTemplate {
        ctx: ctx.with_title("Sign Up"),
        name: String::new(),
        photo_url: String::new(),
        email: String::new(),
        social: social_buttons(&state, ""),
    }
    .into_response()
}

/// Handle sign-up form submission.
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be updated.
#[instrument(skip(state, session, ctx, form))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    mut ctx: PageContext,
    Form(form): Form<SignUpForm>,
) -> Result<Response, AppError> {
    let input = SignUpInput {
        name: form.name,
        email: form.email,
        password: form.password,
        photo_url: form.photo_url,
    };

    let result = state.accounts().sign_up(&input).await;
    match result {
        Ok(outcome) => {
            sign_in_session(&session, &outcome.session).await?;
            Ok(
                flash_redirect(&session, Flash::success(outcome.message()), "/")
                    .await
                    .into_response(),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up failed");
            ctx.notify(Flash::error(e.sign_up_message()));
            Ok(SignUpTemplate {
                ctx: ctx.with_title("Sign Up"),
                name: input.name,
                photo_url: input.photo_url,
                email: input.email,
                social: social_buttons(&state, ""),
            }
            .into_response())
        }
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
#[instrument(skip(ctx))]
pub async fn forgot_password_page(
    ctx: PageContext,
    Query(query): Query<ForgotPasswordQuery>,
) -> impl IntoResponse {
    ForgotPasswordTemplate {
        ctx: ctx.with_title("Forgot Password"),
        email: query.email.unwrap_or_default(),
        sent: false,
    }
}

/// Handle forgot password form submission.
///
/// The page is shown again either way, with a notification saying whether
/// the email went out.
#[instrument(skip(state, ctx, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    mut ctx: PageContext,
    Form(form): Form<ForgotPasswordForm>,
) -> impl IntoResponse {
    let sent = match state.accounts().send_password_reset(&form.email).await {
        Ok(()) => {
            ctx.notify(Flash::success("Password reset email sent! Check your inbox."));
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "Password reset failed");
            ctx.notify(Flash::error(e.reset_message()));
            false
        }
    };

    ForgotPasswordTemplate {
        ctx: ctx.with_title("Forgot Password"),
        email: form.email,
        sent,
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be updated.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    sign_out_session(&session).await?;
    Ok(flash_redirect(&session, Flash::success("Logged out successfully"), "/").await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_message() {
        assert_eq!(
            redirect_message("/subscription/4").as_deref(),
            Some("Please log in to access the subscription details you were viewing.")
        );
        assert_eq!(
            redirect_message("/subscriptions").as_deref(),
            Some("Please log in to view your subscriptions.")
        );
        assert_eq!(
            redirect_message("/profile").as_deref(),
            Some("Please log in to access your profile.")
        );
        assert_eq!(
            redirect_message("/blog/2").as_deref(),
            Some("Please log in to view the full blog post.")
        );
        assert_eq!(
            redirect_message("/checkout").as_deref(),
            Some("Please log in to access checkout.")
        );
        assert_eq!(
            redirect_message("/profile?tab=wishlist").as_deref(),
            Some("Please log in to access your profile.")
        );
        assert_eq!(redirect_message("/"), None);
        assert_eq!(redirect_message(""), None);
    }
}
