//! Business logic services for storefront.
//!
//! # Services
//!
//! - `account` - Sign-up validation, sign-in, password reset, profile and
//!   account deletion
//! - `reviews` - Review listing order and the submit/delete rules

pub mod account;
pub mod reviews;

pub use account::{AccountError, AccountService, SignUpInput, SignUpOutcome};
pub use reviews::{ReviewRejection, ReviewService};
