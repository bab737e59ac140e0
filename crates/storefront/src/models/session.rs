//! Session-related types.
//!
//! Types stored in the session for authentication state.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use boxsub_core::{Email, Uid};

use crate::identity::{AuthSession, IdentityUser, REFRESH_MARGIN_SECS};

/// Avatar service used when a user has no photo.
const AVATAR_FALLBACK_URL: &str = "https://ui-avatars.com/api/?name=";

/// Session-stored user identity.
///
/// Mirrors the profile held by the identity provider so pages can render
/// the navbar without a provider round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identity provider user id.
    pub uid: Uid,
    /// Email address, absent for some social accounts.
    pub email: Option<Email>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl CurrentUser {
    /// Display name, falling back to the email.
    #[must_use]
    pub fn name_or_email(&self) -> String {
        IdentityUser::from(self.clone()).name_or_email()
    }

    /// Photo URL, or a generated avatar for the display name.
    #[must_use]
    pub fn avatar_url(&self) -> String {
        self.photo_url
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "{AVATAR_FALLBACK_URL}{}",
                    urlencoding::encode(&self.name_or_email())
                )
            })
    }
}

impl From<IdentityUser> for CurrentUser {
    fn from(user: IdentityUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
        }
    }
}

impl From<CurrentUser> for IdentityUser {
    fn from(user: CurrentUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
        }
    }
}

/// Identity provider tokens kept alongside [`CurrentUser`].
///
/// Implements `Debug` manually to redact the tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredTokens {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredTokens")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl StoredTokens {
    #[must_use]
    pub fn from_auth(auth: &AuthSession) -> Self {
        use secrecy::ExposeSecret;

        Self {
            id_token: auth.id_token.expose_secret().to_string(),
            refresh_token: auth.refresh_token.expose_secret().to_string(),
            expires_at: auth.expires_at,
        }
    }

    #[must_use]
    pub fn id_token(&self) -> SecretString {
        SecretString::from(self.id_token.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> SecretString {
        SecretString::from(self.refresh_token.clone())
    }

    /// Whether the id token expires within the refresh margin.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= chrono::Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// A social sign-in in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOAuth {
    /// Provider path segment, `google` or `github`.
    pub provider: String,
    /// CSRF state sent to the provider.
    pub state: String,
    /// Where to go after sign-in.
    pub redirect_to: String,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the identity provider tokens.
    pub const IDENTITY_TOKENS: &str = "identity_tokens";

    /// Key for queued flash notifications.
    pub const FLASH: &str = "flash";

    /// Key for an in-progress social sign-in.
    pub const OAUTH_PENDING: &str = "oauth_pending";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(display_name: Option<&str>, photo_url: Option<&str>) -> CurrentUser {
        CurrentUser {
            uid: Uid::new("u1"),
            email: Some(Email::parse("ann@example.com").unwrap()),
            display_name: display_name.map(str::to_string),
            photo_url: photo_url.map(str::to_string),
        }
    }

    #[test]
    fn test_avatar_url_fallback() {
        assert_eq!(
            user(Some("Ann Lee"), None).avatar_url(),
            "https://ui-avatars.com/api/?name=Ann%20Lee"
        );
        assert_eq!(
            user(Some("Ann"), Some("https://img/a.png")).avatar_url(),
            "https://img/a.png"
        );
        assert_eq!(
            user(None, Some(" ")).avatar_url(),
            "https://ui-avatars.com/api/?name=ann%40example.com"
        );
    }

    #[test]
    fn test_tokens_debug_is_redacted() {
        let tokens = StoredTokens {
            id_token: "id-secret".to_string(),
            refresh_token: "refresh-secret".to_string(),
            expires_at: Utc::now(),
        };
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("id-secret"));
        assert!(!debug.contains("refresh-secret"));
    }

    #[test]
    fn test_tokens_need_refresh_near_expiry() {
        let now = Utc::now();
        let tokens = StoredTokens {
            id_token: String::new(),
            refresh_token: String::new(),
            expires_at: now + chrono::Duration::seconds(45),
        };
        assert!(tokens.needs_refresh(now));
        assert!(!tokens.needs_refresh(now - chrono::Duration::seconds(120)));
    }
}
