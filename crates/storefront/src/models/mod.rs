//! Session and view models for storefront.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashKind, Flashes};
pub use session::{CurrentUser, PendingOAuth, StoredTokens, keys as session_keys};
