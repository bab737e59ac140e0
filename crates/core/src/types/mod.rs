//! Core types for Box Subscription.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod password;
pub mod price;
pub mod rating;
pub mod timestamp;

pub use email::{Email, EmailError};
pub use id::*;
pub use password::{MIN_PASSWORD_LENGTH, PasswordCheck};
pub use price::Price;
pub use rating::{Rating, RatingError};
pub use timestamp::Timestamp;
