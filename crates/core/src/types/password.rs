//! Sign-up password policy.
//!
//! The identity provider enforces its own minimum, but the storefront checks
//! a stricter policy before ever calling it so the form can list exactly
//! which requirements are missing.

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Result of checking a password against the sign-up policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordCheck {
    pub has_uppercase: bool,
    pub has_lowercase: bool,
    pub has_min_length: bool,
}

impl PasswordCheck {
    /// Check a password against the policy.
    #[must_use]
    pub fn new(password: &str) -> Self {
        Self {
            has_uppercase: password.chars().any(char::is_uppercase),
            has_lowercase: password.chars().any(char::is_lowercase),
            has_min_length: password.chars().count() >= MIN_PASSWORD_LENGTH,
        }
    }

    /// Whether every requirement is met.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.has_uppercase && self.has_lowercase && self.has_min_length
    }

    /// Human-readable names of the unmet requirements.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_uppercase {
            missing.push("uppercase letter");
        }
        if !self.has_lowercase {
            missing.push("lowercase letter");
        }
        if !self.has_min_length {
            missing.push("minimum length of 6 characters");
        }
        missing
    }
}

/// Check a password against the sign-up policy.
#[must_use]
pub fn check(password: &str) -> PasswordCheck {
    PasswordCheck::new(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_password() {
        let result = check("Secret1");
        assert!(result.is_valid());
        assert!(result.missing().is_empty());
    }

    #[test]
    fn test_exactly_min_length() {
        assert!(check("Abcdef").is_valid());
        assert!(!check("Abcde").is_valid());
    }

    #[test]
    fn test_missing_requirements_in_order() {
        assert_eq!(
            check("abc").missing(),
            vec!["uppercase letter", "minimum length of 6 characters"]
        );
        assert_eq!(check("ABCDEFG").missing(), vec!["lowercase letter"]);
        assert_eq!(
            check("").missing(),
            vec![
                "uppercase letter",
                "lowercase letter",
                "minimum length of 6 characters"
            ]
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // Five characters, more than six bytes
        assert!(!check("Ééééé").has_min_length);
    }
}
