//! Box Subscription Core - Shared types library.
//!
//! This crate provides common types used across all Box Subscription components:
//! - `storefront` - Public-facing subscription-box site
//! - `cli` - Command-line tools for migrations and catalog checks
//!
//! # Architecture
//!
//! The core crate contains only types and validation rules - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, prices, ratings, timestamps
//!   and the sign-up password policy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
