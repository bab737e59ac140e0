//! Google and GitHub sign-in.
//!
//! The storefront runs the OAuth authorization-code flow itself: the user is
//! redirected to the provider with a random `state` kept in the session, the
//! callback exchanges the code for an access token, and that token is handed
//! to [`IdentityProvider::sign_in_with_idp`](super::IdentityProvider::sign_in_with_idp).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::{Rng, distr::Alphanumeric};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::IdentityError;
use crate::config::OAuthClientConfig;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

/// A social sign-in provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocialProvider {
    Google,
    GitHub,
}

impl SocialProvider {
    /// Path segment used in `/auth/{provider}/...` routes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::GitHub => "github",
        }
    }

    /// Name shown to users.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::GitHub => "GitHub",
        }
    }

    /// Provider id understood by `accounts:signInWithIdp`.
    #[must_use]
    pub const fn firebase_provider_id(self) -> &'static str {
        match self {
            Self::Google => "google.com",
            Self::GitHub => "github.com",
        }
    }

    const fn scope(self) -> &'static str {
        match self {
            Self::Google => "openid email profile",
            Self::GitHub => "read:user user:email",
        }
    }

    const fn authorize_url(self) -> &'static str {
        match self {
            Self::Google => GOOGLE_AUTHORIZE_URL,
            Self::GitHub => GITHUB_AUTHORIZE_URL,
        }
    }

    const fn token_url(self) -> &'static str {
        match self {
            Self::Google => GOOGLE_TOKEN_URL,
            Self::GitHub => GITHUB_TOKEN_URL,
        }
    }
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocialProvider {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::GitHub),
            other => Err(IdentityError::Social(format!("unknown provider '{other}'"))),
        }
    }
}

/// Token endpoint response. GitHub reports failures with a 200 and an
/// `error` field, so both shapes are accepted.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// OAuth client for one provider.
#[derive(Clone)]
pub struct OAuthClient {
    inner: Arc<OAuthClientInner>,
}

struct OAuthClientInner {
    provider: SocialProvider,
    client_id: String,
    client_secret: SecretString,
    http: reqwest::Client,
}

impl OAuthClient {
    #[must_use]
    pub fn new(provider: SocialProvider, config: &OAuthClientConfig) -> Self {
        Self {
            inner: Arc::new(OAuthClientInner {
                provider,
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                http: reqwest::Client::new(),
            }),
        }
    }

    #[must_use]
    pub fn provider(&self) -> SocialProvider {
        self.inner.provider
    }

    /// URL to send the browser to.
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        let provider = self.inner.provider;
        let mut url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            provider.authorize_url(),
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(provider.scope()),
            urlencoding::encode(state),
        );
        if provider == SocialProvider::Google {
            url.push_str("&prompt=select_account");
        }
        url
    }

    /// Exchange an authorization code for the provider's access token.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Social` if the provider rejects the code, or a
    /// transport error.
    #[instrument(skip(self, code), fields(provider = %self.inner.provider))]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<SecretString, IdentityError> {
        let response = self
            .inner
            .http
            .post(self.inner.provider.token_url())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("code", code),
                ("client_id", self.inner.client_id.as_str()),
                ("client_secret", self.inner.client_secret.expose_secret()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = %status, "OAuth token exchange failed");
            return Err(IdentityError::Social(format!(
                "token endpoint returned {status}"
            )));
        }

        parse_token_response(&body)
    }
}

fn parse_token_response(body: &str) -> Result<SecretString, IdentityError> {
    let token: TokenResponse = serde_json::from_str(body)?;
    if let Some(error) = token.error {
        let description = token.error_description.unwrap_or_default();
        tracing::warn!(error = %error, description = %description, "OAuth provider returned error");
        return Err(IdentityError::Social(error));
    }
    token
        .access_token
        .map(SecretString::from)
        .ok_or_else(|| IdentityError::Social("missing access_token".to_string()))
}

/// Generate a random alphanumeric string for OAuth `state` values and tokens.
#[must_use]
pub fn generate_random_string(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(provider: SocialProvider) -> OAuthClient {
        OAuthClient::new(
            provider,
            &OAuthClientConfig {
                client_id: "client 1".to_string(),
                client_secret: SecretString::from("s3cr3t"),
            },
        )
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("google".parse::<SocialProvider>().unwrap(), SocialProvider::Google);
        assert_eq!("github".parse::<SocialProvider>().unwrap(), SocialProvider::GitHub);
        assert!("facebook".parse::<SocialProvider>().is_err());
        assert_eq!(SocialProvider::GitHub.firebase_provider_id(), "github.com");
    }

    #[test]
    fn test_authorization_url() {
        let url = client(SocialProvider::Google)
            .authorization_url("http://localhost:3000/auth/google/callback", "abc");
        assert!(url.starts_with(GOOGLE_AUTHORIZE_URL));
        assert!(url.contains("client_id=client%201"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=abc"));

        let url = client(SocialProvider::GitHub).authorization_url("http://x/cb", "s");
        assert!(url.starts_with(GITHUB_AUTHORIZE_URL));
        assert!(!url.contains("prompt="));
    }

    #[test]
    fn test_parse_token_response() {
        let token = parse_token_response(r#"{"access_token":"gho_1","token_type":"bearer"}"#)
            .unwrap();
        assert_eq!(token.expose_secret(), "gho_1");

        let err = parse_token_response(
            r#"{"error":"bad_verification_code","error_description":"expired"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, IdentityError::Social(e) if e == "bad_verification_code"));

        assert!(parse_token_response("{}").is_err());
    }

    #[test]
    fn test_generate_random_string() {
        let a = generate_random_string(32);
        let b = generate_random_string(32);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
