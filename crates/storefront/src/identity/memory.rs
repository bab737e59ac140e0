//! In-process identity provider for local development and tests.
//!
//! Passwords are hashed with Argon2id. Tokens are random strings mapped back
//! to the account they were issued for; nothing survives a restart.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use boxsub_core::{Email, MIN_PASSWORD_LENGTH, Uid};

use super::social::generate_random_string;
use super::{AuthSession, IdentityError, IdentityProvider, IdentityUser, SocialProvider};

/// Lifetime of issued id tokens.
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Identity provider that keeps accounts in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryIdentity {
    inner: Arc<RwLock<Accounts>>,
}

#[derive(Default)]
struct Accounts {
    users: HashMap<Uid, Account>,
    /// Email → uid for password accounts.
    by_email: HashMap<Email, Uid>,
    /// `(provider, access token)` → uid for social accounts.
    by_social: HashMap<(SocialProvider, String), Uid>,
    id_tokens: HashMap<String, Uid>,
    refresh_tokens: HashMap<String, Uid>,
}

struct Account {
    user: IdentityUser,
    password_hash: Option<String>,
}

impl Accounts {
    fn issue(&mut self, uid: &Uid) -> Result<AuthSession, IdentityError> {
        let user = self
            .users
            .get(uid)
            .map(|a| a.user.clone())
            .ok_or(IdentityError::UserNotFound)?;

        let id_token = generate_random_string(40);
        let refresh_token = generate_random_string(40);
        self.id_tokens.insert(id_token.clone(), uid.clone());
        self.refresh_tokens.insert(refresh_token.clone(), uid.clone());

        Ok(AuthSession {
            user,
            id_token: SecretString::from(id_token),
            refresh_token: SecretString::from(refresh_token),
            expires_at: Utc::now() + Duration::seconds(TOKEN_LIFETIME_SECS),
        })
    }

    fn uid_for_token(&self, id_token: &SecretString) -> Result<Uid, IdentityError> {
        self.id_tokens
            .get(id_token.expose_secret())
            .cloned()
            .ok_or(IdentityError::TokenExpired)
    }
}

impl MemoryIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts.
    pub async fn account_count(&self) -> usize {
        self.inner.read().await.users.len()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthSession, IdentityError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::WeakPassword(format!(
                "Password should be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        let password_hash = hash_password(password)?;

        let mut accounts = self.inner.write().await;
        if accounts.by_email.contains_key(email) {
            return Err(IdentityError::EmailExists);
        }

        let uid = Uid::new(generate_random_string(28));
        accounts.users.insert(
            uid.clone(),
            Account {
                user: IdentityUser {
                    uid: uid.clone(),
                    email: Some(email.clone()),
                    display_name: None,
                    photo_url: None,
                },
                password_hash: Some(password_hash),
            },
        );
        accounts.by_email.insert(email.clone(), uid.clone());
        tracing::info!(uid = %uid, "Created in-memory account");

        accounts.issue(&uid)
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, IdentityError> {
        let mut accounts = self.inner.write().await;
        let uid = accounts
            .by_email
            .get(email)
            .cloned()
            .ok_or(IdentityError::InvalidCredentials)?;
        let hash = accounts
            .users
            .get(&uid)
            .and_then(|a| a.password_hash.clone())
            .ok_or(IdentityError::InvalidCredentials)?;

        verify_password(password, &hash)?;
        accounts.issue(&uid)
    }

    async fn sign_in_with_idp(
        &self,
        provider: SocialProvider,
        access_token: &SecretString,
    ) -> Result<AuthSession, IdentityError> {
        let key = (provider, access_token.expose_secret().to_string());
        let mut accounts = self.inner.write().await;

        let uid = if let Some(uid) = accounts.by_social.get(&key) {
            uid.clone()
        } else {
            let uid = Uid::new(generate_random_string(28));
            accounts.users.insert(
                uid.clone(),
                Account {
                    user: IdentityUser {
                        uid: uid.clone(),
                        email: None,
                        display_name: Some(format!("{} user", provider.label())),
                        photo_url: None,
                    },
                    password_hash: None,
                },
            );
            accounts.by_social.insert(key, uid.clone());
            uid
        };

        accounts.issue(&uid)
    }

    async fn update_profile(
        &self,
        id_token: &SecretString,
        display_name: &str,
        photo_url: Option<&str>,
    ) -> Result<IdentityUser, IdentityError> {
        let mut accounts = self.inner.write().await;
        let uid = accounts.uid_for_token(id_token)?;
        let account = accounts
            .users
            .get_mut(&uid)
            .ok_or(IdentityError::UserNotFound)?;

        account.user.display_name = Some(display_name.to_string()).filter(|n| !n.is_empty());
        account.user.photo_url = photo_url.map(str::to_string);
        Ok(account.user.clone())
    }

    async fn send_password_reset(&self, email: &Email) -> Result<(), IdentityError> {
        if self.inner.read().await.by_email.contains_key(email) {
            tracing::info!(email = %email, "Password reset requested");
            Ok(())
        } else {
            Err(IdentityError::UserNotFound)
        }
    }

    async fn delete_account(&self, id_token: &SecretString) -> Result<(), IdentityError> {
        let mut accounts = self.inner.write().await;
        let uid = accounts.uid_for_token(id_token)?;

        accounts.users.remove(&uid);
        accounts.by_email.retain(|_, u| *u != uid);
        accounts.by_social.retain(|_, u| *u != uid);
        accounts.id_tokens.retain(|_, u| *u != uid);
        accounts.refresh_tokens.retain(|_, u| *u != uid);
        tracing::info!(uid = %uid, "Deleted in-memory account");
        Ok(())
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthSession, IdentityError> {
        let mut accounts = self.inner.write().await;
        let uid = accounts
            .refresh_tokens
            .remove(refresh_token.expose_secret())
            .ok_or(IdentityError::TokenExpired)?;
        accounts.issue(&uid)
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| IdentityError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), IdentityError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| IdentityError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| IdentityError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let identity = MemoryIdentity::new();
        let ann = email("ann@example.com");

        let created = identity.sign_up(&ann, "Secret1").await.unwrap();
        assert_eq!(created.user.email.as_ref(), Some(&ann));

        let signed_in = identity.sign_in(&ann, "Secret1").await.unwrap();
        assert_eq!(signed_in.user.uid, created.user.uid);

        assert!(matches!(
            identity.sign_in(&ann, "wrong").await,
            Err(IdentityError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let identity = MemoryIdentity::new();
        let ann = email("ann@example.com");
        identity.sign_up(&ann, "Secret1").await.unwrap();

        assert!(matches!(
            identity.sign_up(&ann, "Secret2").await,
            Err(IdentityError::EmailExists)
        ));
        assert_eq!(identity.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_short_password_is_weak() {
        let identity = MemoryIdentity::new();
        assert!(matches!(
            identity.sign_up(&email("a@b.io"), "Ab1").await,
            Err(IdentityError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_and_refresh() {
        let identity = MemoryIdentity::new();
        let session = identity
            .sign_up(&email("ann@example.com"), "Secret1")
            .await
            .unwrap();

        let user = identity
            .update_profile(&session.id_token, "Ann", Some("https://img/ann.png"))
            .await
            .unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Ann"));

        let refreshed = identity.refresh(&session.refresh_token).await.unwrap();
        assert_eq!(refreshed.user.display_name.as_deref(), Some("Ann"));

        // Refresh tokens are single use.
        assert!(matches!(
            identity.refresh(&session.refresh_token).await,
            Err(IdentityError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_social_sign_in_reuses_account() {
        let identity = MemoryIdentity::new();
        let token = SecretString::from("gh-token");

        let first = identity
            .sign_in_with_idp(SocialProvider::GitHub, &token)
            .await
            .unwrap();
        let second = identity
            .sign_in_with_idp(SocialProvider::GitHub, &token)
            .await
            .unwrap();
        assert_eq!(first.user.uid, second.user.uid);
        assert_eq!(first.user.email, None);
    }

    #[tokio::test]
    async fn test_delete_account_and_password_reset() {
        let identity = MemoryIdentity::new();
        let ann = email("ann@example.com");
        let session = identity.sign_up(&ann, "Secret1").await.unwrap();

        identity.send_password_reset(&ann).await.unwrap();
        identity.delete_account(&session.id_token).await.unwrap();

        assert_eq!(identity.account_count().await, 0);
        assert!(matches!(
            identity.send_password_reset(&ann).await,
            Err(IdentityError::UserNotFound)
        ));
        assert!(matches!(
            identity.delete_account(&session.id_token).await,
            Err(IdentityError::TokenExpired)
        ));
    }
}
