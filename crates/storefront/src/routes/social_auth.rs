//! Google and GitHub sign-in route handlers.
//!
//! The login route stores a random `state` and the return path in the
//! session before sending the user to the provider. The callback checks the
//! `state`, exchanges the code and signs the user in through the identity
//! provider.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::identity::SocialProvider;
use crate::identity::social::generate_random_string;
use crate::middleware::sign_in_session;
use crate::models::{Flash, PendingOAuth, session_keys};
use crate::routes::{flash_redirect, redirect_target};
use crate::state::AppState;

/// Length of the CSRF `state` value.
const STATE_LENGTH: usize = 32;

/// Query parameters for starting a social sign-in.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub from: Option<String>,
}

/// Query parameters sent back by the provider.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn callback_uri(state: &AppState, provider: SocialProvider) -> String {
    format!("{}/auth/{provider}/callback", state.config().base_url)
}

fn sign_in_failed() -> Flash {
    Flash::error("Sign in failed. Please try again.")
}

/// Start a social sign-in by redirecting to the provider.
///
/// # Errors
///
/// Returns `AppError::Session` if the pending sign-in cannot be stored.
#[instrument(skip(state, session))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    let Ok(provider) = provider.parse::<SocialProvider>() else {
        return Ok(
            flash_redirect(&session, Flash::error("Unknown sign-in provider"), "/login")
                .await
                .into_response(),
        );
    };
    let Some(client) = state.oauth_client(provider) else {
        tracing::warn!(%provider, "Social sign-in requested but not configured");
        let flash = Flash::error(format!("{} sign-in is not available", provider.label()));
        return Ok(flash_redirect(&session, flash, "/login").await.into_response());
    };

    let csrf_state = generate_random_string(STATE_LENGTH);
    let pending = PendingOAuth {
        provider: provider.as_str().to_string(),
        state: csrf_state.clone(),
        redirect_to: redirect_target(query.from.as_deref()).to_string(),
    };
    session.insert(session_keys::OAUTH_PENDING, &pending).await?;

    let url = client.authorization_url(&callback_uri(&state, provider), &csrf_state);
    Ok(Redirect::to(&url).into_response())
}

/// Finish a social sign-in.
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be read or updated.
#[instrument(skip(state, session, query))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    // The pending entry is single use.
    let pending: Option<PendingOAuth> = session.remove(session_keys::OAUTH_PENDING).await?;

    let Ok(provider) = provider.parse::<SocialProvider>() else {
        return Ok(flash_redirect(&session, sign_in_failed(), "/login").await);
    };
    if let Some(error) = &query.error {
        tracing::info!(%provider, error = %error, "Provider returned an error");
        return Ok(flash_redirect(&session, sign_in_failed(), "/login").await);
    }

    let Some(pending) = pending.filter(|p| {
        p.provider == provider.as_str() && query.state.as_deref() == Some(p.state.as_str())
    }) else {
        tracing::warn!(%provider, "OAuth state mismatch");
        return Ok(flash_redirect(&session, sign_in_failed(), "/login").await);
    };
    let (Some(client), Some(code)) = (state.oauth_client(provider), query.code.as_deref()) else {
        return Ok(flash_redirect(&session, sign_in_failed(), "/login").await);
    };

    let access_token = match client
        .exchange_code(code, &callback_uri(&state, provider))
        .await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(%provider, error = %e, "Code exchange failed");
            return Ok(flash_redirect(&session, sign_in_failed(), "/login").await);
        }
    };

    let auth = match state
        .identity()
        .sign_in_with_idp(provider, &access_token)
        .await
    {
        Ok(auth) => auth,
        Err(e) => {
            tracing::warn!(%provider, error = %e, "Identity provider rejected social sign-in");
            return Ok(flash_redirect(&session, sign_in_failed(), "/login").await);
        }
    };

    sign_in_session(&session, &auth).await?;
    tracing::info!(%provider, uid = %auth.user.uid, "Signed in with social provider");

    let flash = Flash::success(format!("Successfully signed in with {}!", provider.label()));
    Ok(flash_redirect(&session, flash, &pending.redirect_to).await)
}
