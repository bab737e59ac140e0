//! Identity provider abstraction.
//!
//! Accounts, passwords and tokens are owned by an external identity provider.
//! The storefront only forwards credentials and keeps the returned tokens in
//! the session.
//!
//! - [`FirebaseIdentity`] talks to the Firebase Identity Toolkit REST API.
//! - [`MemoryIdentity`] keeps accounts in process for development and tests.
//! - [`social`] runs the Google and GitHub OAuth code flow whose access token
//!   is then exchanged with [`IdentityProvider::sign_in_with_idp`].

mod error;
mod firebase;
mod memory;
pub mod social;

pub use error::IdentityError;
pub use firebase::FirebaseIdentity;
pub use memory::MemoryIdentity;
pub use social::SocialProvider;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use boxsub_core::{Email, Uid};

/// Tokens within this window of expiry are refreshed before use.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Profile data held by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub uid: Uid,
    /// Social accounts may have no email.
    pub email: Option<Email>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl IdentityUser {
    /// Display name, falling back to the email, for review bylines.
    #[must_use]
    pub fn name_or_email(&self) -> String {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.email.as_ref().map(ToString::to_string))
            .unwrap_or_default()
    }
}

/// A signed-in user and the provider tokens for acting on their behalf.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: IdentityUser,
    pub id_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Whether the id token expires within [`REFRESH_MARGIN_SECS`].
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// Operations the storefront needs from an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password account and sign it in.
    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthSession, IdentityError>;

    /// Sign in with email and password.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, IdentityError>;

    /// Sign in with an access token issued by a social provider.
    async fn sign_in_with_idp(
        &self,
        provider: SocialProvider,
        access_token: &SecretString,
    ) -> Result<AuthSession, IdentityError>;

    /// Set the display name and photo URL of the signed-in user.
    async fn update_profile(
        &self,
        id_token: &SecretString,
        display_name: &str,
        photo_url: Option<&str>,
    ) -> Result<IdentityUser, IdentityError>;

    /// Send a password-reset email.
    async fn send_password_reset(&self, email: &Email) -> Result<(), IdentityError>;

    /// Delete the signed-in user's account.
    async fn delete_account(&self, id_token: &SecretString) -> Result<(), IdentityError>;

    /// Exchange a refresh token for a fresh session.
    async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthSession, IdentityError>;
}
