//! Integration tests for Box Subscription.
//!
//! [`TestApp::spawn`] starts the full storefront router on an ephemeral
//! port with in-memory identity, reviews, key-value store and sessions, and
//! returns a cookie-keeping client that does not follow redirects.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p boxsub-integration-tests
//! ```
//!
//! No database or network access is required.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use boxsub_storefront::app;
use boxsub_storefront::config::{Backend, CatalogConfig, StorefrontConfig};
use boxsub_storefront::identity::MemoryIdentity;
use boxsub_storefront::middleware::create_session_layer;
use boxsub_storefront::reviews::MemoryReviews;
use boxsub_storefront::state::AppState;
use boxsub_storefront::storage::MemoryKeyValueStore;
use reqwest::{Client, Response, redirect::Policy};
use secrecy::SecretString;
use tokio::task::JoinHandle;
use tower_sessions::MemoryStore;

/// Result type for harness setup.
pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A running storefront and a client bound to it.
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub storage: Arc<MemoryKeyValueStore>,
    pub identity: Arc<MemoryIdentity>,
    pub reviews: Arc<MemoryReviews>,
    server: JoinHandle<()>,
}

/// Storefront configuration for tests: memory backends, no rate limit,
/// fixtures from the storefront crate, caching off.
#[must_use]
pub fn test_config(base_url: &str) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused/test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: base_url.to_string(),
        session_secret: SecretString::from("k3Jp9vQ2xL7mN4rT8wY1zB6cF0hD5gS2"),
        backend: Backend::Memory,
        firebase: None,
        google: None,
        github: None,
        catalog: CatalogConfig {
            data_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../storefront/data")),
            cache_ttl: Duration::ZERO,
        },
        auth_rate_limit: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

impl TestApp {
    /// Start the storefront on `127.0.0.1:0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or the client cannot
    /// be built.
    pub async fn spawn() -> TestResult<Self> {
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let config = test_config(&base_url);

        let storage = Arc::new(MemoryKeyValueStore::new());
        let identity = Arc::new(MemoryIdentity::new());
        let reviews = Arc::new(MemoryReviews::new());
        let state = AppState::with_backends(
            config.clone(),
            storage.clone(),
            identity.clone(),
            reviews.clone(),
        );
        let router = app(state, create_session_layer(MemoryStore::default(), &config));

        let server = tokio::spawn(async move {
            let service = router.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, service).await {
                log_server_error(&e);
            }
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            base_url,
            client,
            storage,
            identity,
            reviews,
            server,
        })
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// Returns the transport error, if any.
    pub async fn get(&self, path: &str) -> reqwest::Result<Response> {
        self.client.get(self.url(path)).send().await
    }

    /// `GET path` and return the body text.
    ///
    /// # Errors
    ///
    /// Returns the transport error, if any.
    pub async fn page(&self, path: &str) -> reqwest::Result<String> {
        self.get(path).await?.text().await
    }

    /// `POST path` with a URL-encoded form.
    ///
    /// # Errors
    ///
    /// Returns the transport error, if any.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Result<Response> {
        self.client.post(self.url(path)).form(form).send().await
    }

    /// Create an account through the sign-up form. The client is signed in
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns the transport error, if any.
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> reqwest::Result<Response> {
        self.post_form(
            "/signup",
            &[
                ("name", name),
                ("photo_url", ""),
                ("email", email),
                ("password", password),
            ],
        )
        .await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// The `Location` header of a redirect response.
#[must_use]
pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

fn log_server_error(error: &std::io::Error) {
    // The harness has no subscriber installed; stderr is the only sink.
    #[allow(clippy::print_stderr)]
    {
        eprintln!("test server stopped: {error}");
    }
}
