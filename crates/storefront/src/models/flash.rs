//! Transient notifications carried across a redirect.
//!
//! Handlers queue a [`Flash`] in the session; the next rendered page drains
//! the queue and shows each message once.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session::keys;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    /// CSS modifier class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// One notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    /// Optional bold heading shown above the message.
    pub title: Option<String>,
    pub message: String,
    /// Optional `(href, label)` action link.
    pub link: Option<(String, String)>,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Success, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Error, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Info, message)
    }

    fn new(kind: FlashKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: None,
            message: message.into(),
            link: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_link(mut self, href: impl Into<String>, label: impl Into<String>) -> Self {
        self.link = Some((href.into(), label.into()));
        self
    }
}

/// Session-backed flash queue.
pub struct Flashes;

impl Flashes {
    /// Queue a notification for the next rendered page.
    ///
    /// Session failures are logged; a lost notification never fails the
    /// request.
    pub async fn push(session: &Session, flash: Flash) {
        let mut queue: Vec<Flash> = match session.get(keys::FLASH).await {
            Ok(existing) => existing.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read flash queue");
                Vec::new()
            }
        };
        queue.push(flash);
        if let Err(e) = session.insert(keys::FLASH, &queue).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    /// Remove and return all queued notifications.
    pub async fn take(session: &Session) -> Vec<Flash> {
        match session.remove::<Vec<Flash>>(keys::FLASH).await {
            Ok(queue) => queue.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to drain flash queue");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[test]
    fn test_builders() {
        let flash = Flash::success("Successfully subscribed!").with_link("/subscriptions", "View");
        assert_eq!(flash.kind, FlashKind::Success);
        assert_eq!(
            flash.link,
            Some(("/subscriptions".to_string(), "View".to_string()))
        );
        assert_eq!(FlashKind::Error.as_str(), "error");
    }

    #[tokio::test]
    async fn test_push_then_take_drains_queue() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        Flashes::push(&session, Flash::info("first")).await;
        Flashes::push(&session, Flash::error("second")).await;

        let taken = Flashes::take(&session).await;
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].message, "first");
        assert_eq!(taken[1].kind, FlashKind::Error);

        assert!(Flashes::take(&session).await.is_empty());
    }
}
