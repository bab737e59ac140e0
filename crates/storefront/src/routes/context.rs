//! Per-page template context.
//!
//! Every full page shares the same chrome: the title, the signed-in user in
//! the navbar, queued notifications and the CSP nonce for inline scripts.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
};
use tower_sessions::Session;

use crate::middleware::{CspNonce, OptionalAuth};
use crate::models::{CurrentUser, Flash, Flashes};

/// Site name used in page titles.
pub const SITE_NAME: &str = "Box Subscription";

/// Shared page chrome, extracted once per rendered page.
///
/// Extracting the context drains the session's notification queue, so only
/// handlers that render a page should take it.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub title: String,
    pub nonce: String,
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    /// Request path, for highlighting the active nav link.
    pub path: String,
}

impl PageContext {
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Show a notification on the page being rendered.
    pub fn notify(&mut self, flash: Flash) {
        self.flashes.push(flash);
    }

    /// `"<title> | Box Subscription"`, or the bare site name.
    #[must_use]
    pub fn page_title(&self) -> String {
        if self.title.is_empty() {
            SITE_NAME.to_string()
        } else {
            format!("{} | {SITE_NAME}", self.title)
        }
    }

    /// Whether the nav link to `href` points at the current page.
    #[must_use]
    pub fn is_active(&self, href: &str) -> bool {
        if href == "/" {
            self.path == "/"
        } else {
            self.path == href || self.path.starts_with(&format!("{href}/"))
        }
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let OptionalAuth(user) = OptionalAuth::from_request_parts(parts, state).await?;
        let nonce = parts
            .extensions
            .get::<CspNonce>()
            .map(|n| n.value().to_string())
            .unwrap_or_default();

        let flashes = match parts.extensions.get::<Session>() {
            Some(session) => Flashes::take(session).await,
            None => Vec::new(),
        };

        Ok(Self {
            title: String::new(),
            nonce,
            user,
            flashes,
            path: parts
                .extensions
                .get::<OriginalUri>()
                .map_or_else(|| parts.uri.path(), |uri| uri.path())
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_title() {
        let ctx = PageContext::default();
        assert_eq!(ctx.page_title(), "Box Subscription");
        assert_eq!(ctx.with_title("Login").page_title(), "Login | Box Subscription");
    }

    #[test]
    fn test_is_active() {
        let ctx = PageContext {
            path: "/blog/3".to_string(),
            ..PageContext::default()
        };
        assert!(ctx.is_active("/blog"));
        assert!(!ctx.is_active("/"));
        assert!(!ctx.is_active("/bl"));
    }
}
