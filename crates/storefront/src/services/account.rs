//! Account flows: sign-up, sign-in, password reset, profile changes and
//! account deletion.

use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;
use tracing::instrument;

use boxsub_core::{Email, Uid, password};

use crate::identity::{AuthSession, IdentityError, IdentityProvider, IdentityUser};
use crate::models::CurrentUser;
use crate::storage::{MembershipList, ProfileDetails, ProfileDetailsStore, StorageError};

/// Sign-up form input.
#[derive(Debug, Clone, Default)]
pub struct SignUpInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub photo_url: String,
}

/// Result of a successful sign-up.
#[derive(Debug)]
pub struct SignUpOutcome {
    pub session: AuthSession,
    /// Whether the name and photo were saved to the new account.
    pub profile_updated: bool,
}

impl SignUpOutcome {
    /// Notification text for the new account.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        if self.profile_updated {
            "Account created successfully!"
        } else {
            "Account created, but profile details could not be updated"
        }
    }
}

/// Why an account flow failed.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Form input rejected before contacting the provider.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AccountError {
    /// Notification text for a failed sign-up.
    #[must_use]
    pub fn sign_up_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Identity(
                err @ (IdentityError::EmailExists
                | IdentityError::InvalidEmail
                | IdentityError::WeakPassword(_)),
            ) => err.user_message(),
            Self::Identity(err) => format!("Registration failed: {}", err.user_message()),
            Self::Storage(_) => "Registration failed: please try again.".to_string(),
        }
    }

    /// Notification text for a failed sign-in.
    #[must_use]
    pub fn sign_in_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("Sign in failed: {msg}"),
            Self::Identity(err) => format!("Sign in failed: {}", err.user_message()),
            Self::Storage(_) => "Sign in failed: please try again.".to_string(),
        }
    }

    /// Notification text for a failed password reset.
    #[must_use]
    pub fn reset_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Identity(IdentityError::UserNotFound) => {
                "No account found with this email address".to_string()
            }
            Self::Identity(err) => format!("Error: {}", err.user_message()),
            Self::Storage(err) => format!("Error: {err}"),
        }
    }

    /// Notification text for a failed account deletion.
    #[must_use]
    pub fn delete_message(&self) -> String {
        let hint = match self {
            Self::Identity(IdentityError::RequiresRecentLogin | IdentityError::TokenExpired) => {
                "Please log out and log in again before deleting your account."
            }
            _ => "Please try again.",
        };
        format!("Failed to delete account. {hint}")
    }
}

/// Account operations over the identity provider and the per-user stores.
#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    subscriptions: MembershipList,
    wishlist: MembershipList,
    details: ProfileDetailsStore,
}

impl AccountService {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        subscriptions: MembershipList,
        wishlist: MembershipList,
        details: ProfileDetailsStore,
    ) -> Self {
        Self {
            identity,
            subscriptions,
            wishlist,
            details,
        }
    }

    /// Create an account, then set its display name and photo.
    ///
    /// A failed profile update after the account exists still succeeds,
    /// with `profile_updated` false.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` for a blank name or email or a
    /// password that fails the policy, or the provider's error.
    #[instrument(skip(self, input), fields(email = %input.email.trim()))]
    pub async fn sign_up(&self, input: &SignUpInput) -> Result<SignUpOutcome, AccountError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AccountError::Validation("Please enter your name".to_string()));
        }
        if input.email.trim().is_empty() {
            return Err(AccountError::Validation("Please enter your email".to_string()));
        }
        let check = password::check(&input.password);
        if !check.is_valid() {
            return Err(AccountError::Validation(format!(
                "Password must have: {}",
                check.missing().join(", ")
            )));
        }
        let email = Email::parse(&input.email).map_err(|_| IdentityError::InvalidEmail)?;

        let mut session = self.identity.sign_up(&email, &input.password).await?;
        tracing::info!(uid = %session.user.uid, "Account created");

        let photo_url = Some(input.photo_url.trim()).filter(|p| !p.is_empty());
        let profile_updated = match self
            .identity
            .update_profile(&session.id_token, name, photo_url)
            .await
        {
            Ok(user) => {
                session.user = user;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Account created but profile update failed");
                false
            }
        };

        Ok(SignUpOutcome {
            session,
            profile_updated,
        })
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` for a blank email or password, or
    /// the provider's error.
    #[instrument(skip(self, email, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AccountError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AccountError::Validation(
                "Please enter your email and password".to_string(),
            ));
        }
        let email = Email::parse(email).map_err(|_| IdentityError::InvalidEmail)?;
        let session = self.identity.sign_in(&email, password).await?;
        tracing::info!(uid = %session.user.uid, "Signed in");
        Ok(session)
    }

    /// Send a password-reset email.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` for a blank email, or the
    /// provider's error.
    #[instrument(skip(self, email))]
    pub async fn send_password_reset(&self, email: &str) -> Result<(), AccountError> {
        if email.trim().is_empty() {
            return Err(AccountError::Validation(
                "Please enter your email address".to_string(),
            ));
        }
        let email = Email::parse(email).map_err(|_| IdentityError::InvalidEmail)?;
        self.identity.send_password_reset(&email).await?;
        Ok(())
    }

    /// Change the display name and photo URL.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` for a blank name, or the provider's
    /// error.
    #[instrument(skip(self, id_token))]
    pub async fn update_profile(
        &self,
        id_token: &SecretString,
        name: &str,
        photo_url: &str,
    ) -> Result<IdentityUser, AccountError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AccountError::Validation("Please enter your name".to_string()));
        }
        let photo_url = Some(photo_url.trim()).filter(|p| !p.is_empty());
        Ok(self
            .identity
            .update_profile(id_token, name, photo_url)
            .await?)
    }

    /// Replace the user's stored profile details.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Storage` if the store cannot be written.
    pub async fn save_details(
        &self,
        uid: &Uid,
        details: ProfileDetails,
    ) -> Result<(), AccountError> {
        self.details.save(uid, &details.trimmed()).await?;
        Ok(())
    }

    /// The user's stored profile details.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Storage` if the store cannot be read.
    pub async fn details(&self, uid: &Uid) -> Result<ProfileDetails, AccountError> {
        Ok(self.details.load(uid).await?)
    }

    /// Delete the identity account, then purge the user's stored data.
    ///
    /// Purge failures after the account is gone are logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the account could not be deleted;
    /// nothing is purged in that case.
    #[instrument(skip(self, user, id_token), fields(uid = %user.uid))]
    pub async fn delete_account(
        &self,
        user: &CurrentUser,
        id_token: &SecretString,
    ) -> Result<(), AccountError> {
        self.identity.delete_account(id_token).await?;
        tracing::info!("Identity account deleted");

        if let Some(email) = &user.email {
            for list in [&self.subscriptions, &self.wishlist] {
                if let Err(e) = list.purge(email).await {
                    tracing::error!(key = list.key(), error = %e, "Failed to purge membership entry");
                }
            }
        }
        if let Err(e) = self.details.remove(&user.uid).await {
            tracing::error!(error = %e, "Failed to remove profile details");
        }
        Ok(())
    }
}
