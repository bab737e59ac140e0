//! Static catalog fixtures: subscription boxes, blog posts, seed reviews and FAQs.
//!
//! Fixtures are JSON files read from the configured data directory.
//! `subscriptions.json` and `blogs.json` hold bare arrays; `reviews.json` and
//! `faq.json` wrap theirs as `{"reviews": [...]}` and `{"faqs": [...]}` (a
//! bare array is accepted there too):
//!
//! ```text
//! data/
//! ├── subscriptions.json
//! ├── blogs.json
//! ├── reviews.json
//! └── faq.json
//! ```
//!
//! Parsed fixtures are cached with `moka` for `CATALOG_CACHE_TTL_SECS`. With a
//! TTL of zero every call re-reads the file.

mod types;

pub use types::{Blog, CategoryCount, Faq, SeedReview, Subscription};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use comrak::{Options, markdown_to_html};
use moka::future::Cache;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use boxsub_core::{BlogId, SubscriptionId};

use crate::config::CatalogConfig;

/// Number of items shown before "show all" on the home page.
pub const FEATURED_COUNT: usize = 6;

/// Number of related posts shown under a blog post.
pub const RELATED_BLOGS_COUNT: usize = 3;

/// Errors loading a fixture file.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

/// The four fixture files.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum Fixture {
    Subscriptions,
    Blogs,
    SeedReviews,
    Faqs,
}

impl Fixture {
    const fn file_name(self) -> &'static str {
        match self {
            Self::Subscriptions => "subscriptions.json",
            Self::Blogs => "blogs.json",
            Self::SeedReviews => "reviews.json",
            Self::Faqs => "faq.json",
        }
    }

    /// Object field holding the array, for wrapped fixtures.
    const fn wrapper(self) -> Option<&'static str> {
        match self {
            Self::Subscriptions | Self::Blogs => None,
            Self::SeedReviews => Some("reviews"),
            Self::Faqs => Some("faqs"),
        }
    }
}

/// Cached fixture contents.
#[derive(Debug, Clone)]
enum Cached {
    Subscriptions(Arc<Vec<Subscription>>),
    Blogs(Arc<Vec<Blog>>),
    SeedReviews(Arc<Vec<SeedReview>>),
    Faqs(Arc<Vec<Faq>>),
}

/// Read-only access to the catalog fixtures.
///
/// Cheaply cloneable; clones share the cache.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    data_dir: PathBuf,
    cache: Option<Cache<Fixture, Cached>>,
}

impl Catalog {
    /// Create a catalog reading from `config.data_dir`.
    #[must_use]
    pub fn new(config: &CatalogConfig) -> Self {
        let cache = (!config.cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(8)
                .time_to_live(config.cache_ttl)
                .build()
        });

        Self {
            inner: Arc::new(CatalogInner {
                data_dir: config.data_dir.clone(),
                cache,
            }),
        }
    }

    /// Directory the fixtures are read from.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    /// All subscription boxes in file order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the fixture cannot be read or parsed.
    pub async fn subscriptions(&self) -> Result<Arc<Vec<Subscription>>, CatalogError> {
        match self.get(Fixture::Subscriptions).await? {
            Cached::Subscriptions(list) => Ok(list),
            _ => unreachable_fixture(Fixture::Subscriptions),
        }
    }

    /// All blog posts in file order, with rendered HTML.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the fixture cannot be read or parsed.
    pub async fn blogs(&self) -> Result<Arc<Vec<Blog>>, CatalogError> {
        match self.get(Fixture::Blogs).await? {
            Cached::Blogs(list) => Ok(list),
            _ => unreachable_fixture(Fixture::Blogs),
        }
    }

    /// Home page testimonials.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the fixture cannot be read or parsed.
    pub async fn seed_reviews(&self) -> Result<Arc<Vec<SeedReview>>, CatalogError> {
        match self.get(Fixture::SeedReviews).await? {
            Cached::SeedReviews(list) => Ok(list),
            _ => unreachable_fixture(Fixture::SeedReviews),
        }
    }

    /// Frequently asked questions.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the fixture cannot be read or parsed.
    pub async fn faqs(&self) -> Result<Arc<Vec<Faq>>, CatalogError> {
        match self.get(Fixture::Faqs).await? {
            Cached::Faqs(list) => Ok(list),
            _ => unreachable_fixture(Fixture::Faqs),
        }
    }

    /// Find a subscription box by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the fixture cannot be read or parsed.
    pub async fn subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, CatalogError> {
        Ok(self.subscriptions().await?.iter().find(|s| s.id == id).cloned())
    }

    /// Map ids to catalog records, keeping the order of `ids` and dropping
    /// ids the catalog does not know.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the fixture cannot be read or parsed.
    pub async fn subscriptions_by_ids(
        &self,
        ids: &[SubscriptionId],
    ) -> Result<Vec<Subscription>, CatalogError> {
        let all = self.subscriptions().await?;
        Ok(ids
            .iter()
            .filter_map(|id| all.iter().find(|s| s.id == *id).cloned())
            .collect())
    }

    /// Find a blog post by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the fixture cannot be read or parsed.
    pub async fn blog(&self, id: BlogId) -> Result<Option<Blog>, CatalogError> {
        Ok(self.blogs().await?.iter().find(|b| b.id == id).cloned())
    }

    async fn get(&self, fixture: Fixture) -> Result<Cached, CatalogError> {
        let Some(cache) = &self.inner.cache else {
            return self.load(fixture).await;
        };

        cache
            .try_get_with(fixture, self.load(fixture))
            .await
            .map_err(|e| (*e).clone())
    }

    #[instrument(skip(self), fields(dir = %self.inner.data_dir.display()))]
    async fn load(&self, fixture: Fixture) -> Result<Cached, CatalogError> {
        let path = self.inner.data_dir.join(fixture.file_name());
        let wrapper = fixture.wrapper();
        let cached = match fixture {
            Fixture::Subscriptions => {
                Cached::Subscriptions(Arc::new(read_fixture(&path, wrapper).await?))
            }
            Fixture::Blogs => {
                let mut blogs: Vec<Blog> = read_fixture(&path, wrapper).await?;
                for blog in &mut blogs {
                    blog.content_html = render_markdown(&blog.content);
                }
                Cached::Blogs(Arc::new(blogs))
            }
            Fixture::SeedReviews => {
                Cached::SeedReviews(Arc::new(read_fixture(&path, wrapper).await?))
            }
            Fixture::Faqs => Cached::Faqs(Arc::new(read_fixture(&path, wrapper).await?)),
        };
        tracing::debug!(file = fixture.file_name(), "Loaded catalog fixture");
        Ok(cached)
    }
}

/// Error for a cache entry whose variant does not match its key.
fn unreachable_fixture<T>(fixture: Fixture) -> Result<T, CatalogError> {
    Err(CatalogError::Parse {
        path: fixture.file_name().to_string(),
        message: "cached fixture has the wrong type".to_string(),
    })
}

async fn read_fixture<T: DeserializeOwned>(
    path: &Path,
    wrapper: Option<&'static str>,
) -> Result<Vec<T>, CatalogError> {
    let display = path.display().to_string();
    let bytes = tokio::fs::read(path).await.map_err(|e| CatalogError::Io {
        path: display.clone(),
        message: e.to_string(),
    })?;
    parse_fixture(&bytes, wrapper).map_err(|e| CatalogError::Parse {
        path: display,
        message: e.to_string(),
    })
}

/// Parse a fixture array, unwrapping `{"<wrapper>": [...]}` when given.
fn parse_fixture<T: DeserializeOwned>(
    bytes: &[u8],
    wrapper: Option<&'static str>,
) -> Result<Vec<T>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    match (value, wrapper) {
        (serde_json::Value::Object(mut object), Some(field)) => {
            let items = object
                .remove(field)
                .ok_or_else(|| <serde_json::Error as serde::de::Error>::missing_field(field))?;
            serde_json::from_value(items)
        }
        (value, _) => serde_json::from_value(value),
    }
}

/// Render blog Markdown to HTML. Raw HTML in the source is escaped.
fn render_markdown(content: &str) -> String {
    let mut options = Options::default();

    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.header_ids = Some(String::new());

    markdown_to_html(content, &options)
}

// =============================================================================
// Queries over loaded fixtures
// =============================================================================

/// The first `FEATURED_COUNT` items, or all of them when `show_all` is set.
#[must_use]
pub fn featured<T: Clone>(items: &[T], show_all: bool) -> Vec<T> {
    if show_all {
        items.to_vec()
    } else {
        items.iter().take(FEATURED_COUNT).cloned().collect()
    }
}

/// Posts sharing `blog`'s category, excluding `blog` itself, in file order.
#[must_use]
pub fn related_blogs(blogs: &[Blog], blog: &Blog) -> Vec<Blog> {
    blogs
        .iter()
        .filter(|b| b.category == blog.category && b.id != blog.id)
        .take(RELATED_BLOGS_COUNT)
        .cloned()
        .collect()
}

/// Distinct categories in order of first appearance, with post counts.
#[must_use]
pub fn blog_categories(blogs: &[Blog]) -> Vec<CategoryCount> {
    let mut categories: Vec<CategoryCount> = Vec::new();
    for blog in blogs {
        if let Some(existing) = categories.iter_mut().find(|c| c.name == blog.category) {
            existing.count += 1;
        } else {
            categories.push(CategoryCount {
                name: blog.category.clone(),
                count: 1,
            });
        }
    }
    categories
}

/// Posts in `category`; `None` or an empty string selects every post.
#[must_use]
pub fn blogs_in_category(blogs: &[Blog], category: Option<&str>) -> Vec<Blog> {
    match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(category) => blogs
            .iter()
            .filter(|b| b.category == category)
            .cloned()
            .collect(),
        None => blogs.to_vec(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use boxsub_core::FaqId;

    use super::*;

    fn blog(id: i32, category: &str) -> Blog {
        Blog {
            id: BlogId::new(id),
            title: format!("Post {id}"),
            category: category.to_string(),
            date: "2024-01-01".to_string(),
            author: "Ann".to_string(),
            image: String::new(),
            content: String::new(),
            content_html: String::new(),
        }
    }

    fn temp_data_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("boxsub-catalog-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_featured() {
        let items: Vec<i32> = (1..=9).collect();
        assert_eq!(featured(&items, false), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(featured(&items, true).len(), 9);
        assert_eq!(featured(&items[..2], false), vec![1, 2]);
    }

    #[test]
    fn test_related_blogs_excludes_self_and_caps() {
        let blogs = vec![
            blog(1, "Tech"),
            blog(2, "Tech"),
            blog(3, "Food"),
            blog(4, "Tech"),
            blog(5, "Tech"),
            blog(6, "Tech"),
        ];
        let related = related_blogs(&blogs, &blogs[0]);
        let ids: Vec<i32> = related.iter().map(|b| b.id.as_i32()).collect();
        assert_eq!(ids, vec![2, 4, 5]);

        assert!(related_blogs(&blogs, &blogs[2]).is_empty());
    }

    #[test]
    fn test_blog_categories_counts_in_first_seen_order() {
        let blogs = vec![blog(1, "Tech"), blog(2, "Food"), blog(3, "Tech")];
        assert_eq!(
            blog_categories(&blogs),
            vec![
                CategoryCount {
                    name: "Tech".to_string(),
                    count: 2
                },
                CategoryCount {
                    name: "Food".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_blogs_in_category() {
        let blogs = vec![blog(1, "Tech"), blog(2, "Food")];
        assert_eq!(blogs_in_category(&blogs, None).len(), 2);
        assert_eq!(blogs_in_category(&blogs, Some("")).len(), 2);
        assert_eq!(blogs_in_category(&blogs, Some("Food"))[0].id, BlogId::new(2));
        assert!(blogs_in_category(&blogs, Some("Travel")).is_empty());
    }

    #[test]
    fn test_render_markdown_escapes_raw_html() {
        let html = render_markdown("**bold** <script>alert(1)</script>");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(!html.contains("<script>"));
    }

    #[tokio::test]
    async fn test_load_and_lookup() {
        let dir = temp_data_dir();
        std::fs::write(
            dir.join("blogs.json"),
            r##"[{"id":1,"title":"Hello","category":"News","date":"2024-02-01",
                "author":"Ann","image":"x.jpg","content":"# Hi"}]"##,
        )
        .unwrap();

        let catalog = Catalog::new(&CatalogConfig {
            data_dir: dir.clone(),
            cache_ttl: Duration::from_secs(60),
        });

        let post = catalog.blog(BlogId::new(1)).await.unwrap().unwrap();
        assert_eq!(post.title, "Hello");
        assert!(post.content_html.contains("<h1"));
        assert!(catalog.blog(BlogId::new(2)).await.unwrap().is_none());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_fixture_is_io_error() {
        let dir = temp_data_dir();
        let catalog = Catalog::new(&CatalogConfig {
            data_dir: dir.clone(),
            cache_ttl: Duration::ZERO,
        });

        assert!(matches!(
            catalog.faqs().await,
            Err(CatalogError::Io { .. })
        ));

        std::fs::write(dir.join("faq.json"), "not json").unwrap();
        assert!(matches!(
            catalog.faqs().await,
            Err(CatalogError::Parse { .. })
        ));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_wrapped_reviews_and_faqs_load() {
        let dir = temp_data_dir();
        std::fs::write(
            dir.join("reviews.json"),
            r#"{"reviews":[{"id":1,"text":"Love it","image":"a.jpg","name":"Ann",
                "subscription":"Glow Beauty Box","rating":5}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("faq.json"),
            r#"{"faqs":[{"id":1,"question":"Q?","answer":"A."},
                {"id":2,"question":"Q2?","answer":"A2."}]}"#,
        )
        .unwrap();

        let catalog = Catalog::new(&CatalogConfig {
            data_dir: dir.clone(),
            cache_ttl: Duration::ZERO,
        });

        let reviews = catalog.seed_reviews().await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].name, "Ann");
        assert_eq!(catalog.faqs().await.unwrap().len(), 2);

        // Bare arrays still load.
        std::fs::write(dir.join("faq.json"), r#"[{"id":3,"question":"Q","answer":"A"}]"#)
            .unwrap();
        assert_eq!(catalog.faqs().await.unwrap()[0].id, FaqId::new(3));

        std::fs::write(dir.join("faq.json"), r#"{"questions":[]}"#).unwrap();
        assert!(matches!(
            catalog.faqs().await,
            Err(CatalogError::Parse { .. })
        ));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_bundled_fixtures_load() {
        let catalog = Catalog::new(&CatalogConfig {
            data_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/data")),
            cache_ttl: Duration::ZERO,
        });

        assert!(!catalog.subscriptions().await.unwrap().is_empty());
        assert!(!catalog.blogs().await.unwrap().is_empty());
        assert!(!catalog.seed_reviews().await.unwrap().is_empty());
        assert!(!catalog.faqs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscriptions_by_ids_keeps_order_and_drops_unknown() {
        let dir = temp_data_dir();
        let sub = |id: i32| {
            format!(
                r#"{{"id":{id},"name":"Box {id}","description":"d","price":10,"frequency":"Monthly",
                   "tech_category":"t","thumbnail":"","banner":"","ratings":4.0,"number_of_reviews":1}}"#
            )
        };
        std::fs::write(
            dir.join("subscriptions.json"),
            format!("[{},{},{}]", sub(1), sub(2), sub(3)),
        )
        .unwrap();

        let catalog = Catalog::new(&CatalogConfig {
            data_dir: dir.clone(),
            cache_ttl: Duration::ZERO,
        });

        let ids = [SubscriptionId::new(3), SubscriptionId::new(99), SubscriptionId::new(1)];
        let names: Vec<String> = catalog
            .subscriptions_by_ids(&ids)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Box 3", "Box 1"]);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
