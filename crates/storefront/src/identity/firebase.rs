//! Firebase Identity Toolkit REST client.
//!
//! Every call is a JSON `POST {auth_url}/accounts:{method}?key={api_key}`,
//! except token refresh which goes to the Secure Token endpoint. Failed calls
//! return `{"error": {"code": 400, "message": "EMAIL_EXISTS"}}`; the message
//! prefix is mapped to [`IdentityError`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use boxsub_core::{Email, Uid};

use super::{AuthSession, IdentityError, IdentityProvider, IdentityUser, SocialProvider};
use crate::config::FirebaseConfig;

/// Default token lifetime when the response omits `expiresIn`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Identity provider backed by Firebase Authentication.
#[derive(Clone)]
pub struct FirebaseIdentity {
    inner: Arc<FirebaseIdentityInner>,
}

struct FirebaseIdentityInner {
    client: reqwest::Client,
    api_key: SecretString,
    auth_url: String,
    token_url: String,
    /// Sent as `requestUri` on IdP sign-in.
    request_uri: String,
}

/// Tokens returned by sign-up, sign-in and IdP sign-in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    error_message: Option<String>,
}

/// Tokens returned by the Secure Token endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

/// Account fields shared by `lookup` and `update` responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
}

impl From<AccountInfo> for IdentityUser {
    fn from(info: AccountInfo) -> Self {
        Self {
            uid: Uid::new(info.local_id),
            email: info.email.as_deref().and_then(|e| Email::parse(e).ok()),
            display_name: info.display_name.filter(|n| !n.is_empty()),
            photo_url: info.photo_url.filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    delete_attribute: Vec<&'static str>,
    return_secure_token: bool,
}

impl FirebaseIdentity {
    /// Create a client for the configured project.
    #[must_use]
    pub fn new(config: &FirebaseConfig, base_url: &str) -> Self {
        Self {
            inner: Arc::new(FirebaseIdentityInner {
                client: reqwest::Client::new(),
                api_key: config.api_key.clone(),
                auth_url: config.auth_url.trim_end_matches('/').to_string(),
                token_url: config.token_url.trim_end_matches('/').to_string(),
                request_uri: base_url.to_string(),
            }),
        }
    }

    /// Call `accounts:{method}` and decode the response.
    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, IdentityError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/accounts:{method}", self.inner.auth_url);
        let response = self
            .inner
            .client
            .post(&url)
            .query(&[("key", self.inner.api_key.expose_secret())])
            .json(body)
            .send()
            .await?;

        decode_response(response, method).await
    }

    /// Fetch the account behind an id token.
    async fn lookup(&self, id_token: &str) -> Result<IdentityUser, IdentityError> {
        let response: LookupResponse = self.call("lookup", &json!({ "idToken": id_token })).await?;
        response
            .users
            .into_iter()
            .next()
            .map(IdentityUser::from)
            .ok_or(IdentityError::UserNotFound)
    }

    /// Complete a token response into a session by looking up the profile.
    async fn session_from_tokens(
        &self,
        tokens: TokenResponse,
    ) -> Result<AuthSession, IdentityError> {
        if let Some(message) = tokens.error_message {
            return Err(map_error_code(&message));
        }
        let (Some(id_token), Some(refresh_token)) = (tokens.id_token, tokens.refresh_token) else {
            return Err(IdentityError::Provider(
                "response did not include tokens".to_string(),
            ));
        };

        let user = self.lookup(&id_token).await?;
        Ok(AuthSession {
            user,
            id_token: SecretString::from(id_token),
            refresh_token: SecretString::from(refresh_token),
            expires_at: expiry_from(tokens.expires_in.as_deref()),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthSession, IdentityError> {
        let tokens: TokenResponse = self
            .call(
                "signUp",
                &json!({
                    "email": email.as_str(),
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        self.session_from_tokens(tokens).await
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, IdentityError> {
        let tokens: TokenResponse = self
            .call(
                "signInWithPassword",
                &json!({
                    "email": email.as_str(),
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        self.session_from_tokens(tokens).await
    }

    #[instrument(skip(self, access_token))]
    async fn sign_in_with_idp(
        &self,
        provider: SocialProvider,
        access_token: &SecretString,
    ) -> Result<AuthSession, IdentityError> {
        let post_body = format!(
            "access_token={}&providerId={}",
            urlencoding::encode(access_token.expose_secret()),
            provider.firebase_provider_id()
        );
        let tokens: TokenResponse = self
            .call(
                "signInWithIdp",
                &json!({
                    "postBody": post_body,
                    "requestUri": self.inner.request_uri,
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                }),
            )
            .await?;
        self.session_from_tokens(tokens).await
    }

    #[instrument(skip(self, id_token))]
    async fn update_profile(
        &self,
        id_token: &SecretString,
        display_name: &str,
        photo_url: Option<&str>,
    ) -> Result<IdentityUser, IdentityError> {
        let request = UpdateRequest {
            id_token: id_token.expose_secret(),
            display_name,
            photo_url,
            delete_attribute: if photo_url.is_none() {
                vec!["PHOTO_URL"]
            } else {
                Vec::new()
            },
            return_secure_token: false,
        };
        let info: AccountInfo = self.call("update", &request).await?;
        Ok(info.into())
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn send_password_reset(&self, email: &Email) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call(
                "sendOobCode",
                &json!({
                    "requestType": "PASSWORD_RESET",
                    "email": email.as_str(),
                }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, id_token))]
    async fn delete_account(&self, id_token: &SecretString) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call("delete", &json!({ "idToken": id_token.expose_secret() }))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthSession, IdentityError> {
        let url = format!("{}/token", self.inner.token_url);
        let response = self
            .inner
            .client
            .post(&url)
            .query(&[("key", self.inner.api_key.expose_secret())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
            ])
            .send()
            .await?;

        let refreshed: RefreshResponse = decode_response(response, "token").await?;
        let user = self.lookup(&refreshed.id_token).await?;
        Ok(AuthSession {
            user,
            id_token: SecretString::from(refreshed.id_token),
            refresh_token: SecretString::from(refreshed.refresh_token),
            expires_at: expiry_from(refreshed.expires_in.as_deref()),
        })
    }
}

/// Decode a success body or map the error envelope.
async fn decode_response<R: DeserializeOwned>(
    response: reqwest::Response,
    method: &str,
) -> Result<R, IdentityError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        tracing::warn!(method, status = %status, message = %message, "Identity provider rejected request");
        return Err(map_error_code(&message));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(
            method,
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse identity provider response"
        );
        IdentityError::Parse(e)
    })
}

/// Map an Identity Toolkit error message such as `WEAK_PASSWORD : Password
/// should be at least 6 characters` to an [`IdentityError`].
fn map_error_code(message: &str) -> IdentityError {
    let code = message
        .split([' ', ':'])
        .next()
        .unwrap_or_default()
        .trim();
    match code {
        "EMAIL_EXISTS" => IdentityError::EmailExists,
        "INVALID_EMAIL" | "MISSING_EMAIL" => IdentityError::InvalidEmail,
        "WEAK_PASSWORD" => IdentityError::WeakPassword(message.to_string()),
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => IdentityError::UserNotFound,
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" | "MISSING_PASSWORD" => {
            IdentityError::InvalidCredentials
        }
        "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => IdentityError::RequiresRecentLogin,
        "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" | "INVALID_REFRESH_TOKEN" => {
            IdentityError::TokenExpired
        }
        _ => IdentityError::Provider(message.to_string()),
    }
}

fn expiry_from(expires_in: Option<&str>) -> chrono::DateTime<Utc> {
    let secs = expires_in
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    Utc::now() + Duration::seconds(secs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_map_error_code() {
        assert!(matches!(
            map_error_code("EMAIL_EXISTS"),
            IdentityError::EmailExists
        ));
        assert!(matches!(
            map_error_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            IdentityError::WeakPassword(_)
        ));
        assert!(matches!(
            map_error_code("INVALID_LOGIN_CREDENTIALS"),
            IdentityError::InvalidCredentials
        ));
        assert!(matches!(
            map_error_code("EMAIL_NOT_FOUND"),
            IdentityError::UserNotFound
        ));
        assert!(matches!(
            map_error_code("CREDENTIAL_TOO_OLD_LOGIN_AGAIN"),
            IdentityError::RequiresRecentLogin
        ));
        assert!(matches!(
            map_error_code("TOO_MANY_ATTEMPTS_TRY_LATER"),
            IdentityError::Provider(_)
        ));
    }

    #[test]
    fn test_account_info_into_user() {
        let info: AccountInfo = serde_json::from_str(
            r#"{"localId":"abc","email":"Ann@Example.com","displayName":"","photoUrl":"https://p/1.png"}"#,
        )
        .unwrap();
        let user = IdentityUser::from(info);
        assert_eq!(user.uid.as_str(), "abc");
        assert_eq!(user.email.unwrap().as_str(), "Ann@example.com");
        assert_eq!(user.display_name, None);
        assert_eq!(user.photo_url.as_deref(), Some("https://p/1.png"));
    }

    #[test]
    fn test_update_request_clears_photo_when_absent() {
        let request = UpdateRequest {
            id_token: "t",
            display_name: "Ann",
            photo_url: None,
            delete_attribute: vec!["PHOTO_URL"],
            return_secure_token: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["displayName"], "Ann");
        assert_eq!(json["deleteAttribute"][0], "PHOTO_URL");
        assert!(json.get("photoUrl").is_none());
    }

    #[test]
    fn test_expiry_defaults() {
        let now = Utc::now();
        let expiry = expiry_from(Some("120"));
        assert!(expiry > now + Duration::seconds(100));
        assert!(expiry_from(None) > now + Duration::seconds(3000));
        assert!(expiry_from(Some("soon")) > now + Duration::seconds(3000));
    }
}
