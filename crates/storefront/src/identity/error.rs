//! Identity provider error types.

use thiserror::Error;

/// Errors returned by an identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// An account with this email already exists.
    #[error("email already in use")]
    EmailExists,

    /// The email address was rejected.
    #[error("invalid email address")]
    InvalidEmail,

    /// The password was rejected as too weak.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Wrong email/password combination.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account exists for the email.
    #[error("user not found")]
    UserNotFound,

    /// The operation needs a fresh sign-in.
    #[error("requires recent login")]
    RequiresRecentLogin,

    /// The id or refresh token is no longer valid.
    #[error("token expired")]
    TokenExpired,

    /// Social provider is not configured or the OAuth exchange failed.
    #[error("social sign-in failed: {0}")]
    Social(String),

    /// Provider returned an error this client does not map.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// Password hashing failed.
    #[error("password hashing error")]
    PasswordHash,

    /// Transport error talking to the provider.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected response body.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl IdentityError {
    /// Whether this error is the provider's fault rather than the user's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Provider(_) | Self::PasswordHash | Self::Http(_) | Self::Parse(_)
        )
    }

    /// Human-readable description shown after "Sign in failed: " and similar prefixes.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmailExists => "This email is already registered. Please login instead.".to_string(),
            Self::InvalidEmail => "Invalid email address. Please check and try again.".to_string(),
            Self::WeakPassword(_) => {
                "Password is too weak. Please choose a stronger password.".to_string()
            }
            Self::InvalidCredentials => "Incorrect email or password.".to_string(),
            Self::UserNotFound => "No account found with this email address".to_string(),
            Self::RequiresRecentLogin => {
                "Please log out and log in again before deleting your account.".to_string()
            }
            Self::TokenExpired => "Your session has expired. Please log in again.".to_string(),
            Self::Social(_) => "Sign in failed. Please try again.".to_string(),
            Self::Provider(_) | Self::PasswordHash | Self::Http(_) | Self::Parse(_) => {
                "The sign-in service is unavailable. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors() {
        assert!(IdentityError::Provider("x".to_string()).is_server_error());
        assert!(!IdentityError::EmailExists.is_server_error());
        assert!(!IdentityError::RequiresRecentLogin.is_server_error());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            IdentityError::UserNotFound.user_message(),
            "No account found with this email address"
        );
        assert!(
            IdentityError::EmailExists
                .user_message()
                .contains("already registered")
        );
    }
}
