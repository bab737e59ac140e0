//! Blog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use boxsub_core::BlogId;

use crate::catalog::{Blog, CategoryCount, blog_categories, blogs_in_category, related_blogs};
use crate::filters;
use crate::routes::pages::not_found_page;
use crate::routes::{PageContext, fixture_or_empty};
use crate::state::AppState;

/// Characters shown in a post teaser.
const EXCERPT_CHARS: usize = 160;

/// Blog index query parameters.
#[derive(Debug, Deserialize)]
pub struct BlogQuery {
    pub category: Option<String>,
}

/// Post summary for list views.
#[derive(Clone)]
pub struct PostCard {
    pub id: BlogId,
    pub title: String,
    pub category: String,
    pub date: String,
    pub author: String,
    pub image: String,
    pub excerpt: String,
}

impl From<&Blog> for PostCard {
    fn from(blog: &Blog) -> Self {
        Self {
            id: blog.id,
            title: blog.title.clone(),
            category: blog.category.clone(),
            date: blog.display_date(),
            author: blog.author.clone(),
            image: blog.image.clone(),
            excerpt: blog.excerpt(EXCERPT_CHARS),
        }
    }
}

/// Blog index page template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/index.html")]
pub struct BlogIndexTemplate {
    pub ctx: PageContext,
    pub posts: Vec<PostCard>,
    pub categories: Vec<CategoryCount>,
    pub total: usize,
    /// Selected category, empty for all.
    pub category: String,
}

/// Blog post detail template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/show.html")]
pub struct BlogShowTemplate {
    pub ctx: PageContext,
    pub post: Blog,
    pub date: String,
    pub related: Vec<PostCard>,
}

/// Display the blog index, optionally filtered by category.
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<BlogQuery>,
) -> impl IntoResponse {
    let blogs = fixture_or_empty(state.catalog().blogs().await, "blogs");
    let category = query
        .category
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    let posts = blogs_in_category(&blogs, Some(category.as_str()))
        .iter()
        .map(PostCard::from)
        .collect();

    BlogIndexTemplate {
        ctx: ctx.with_title("Blog"),
        posts,
        categories: blog_categories(&blogs),
        total: blogs.len(),
        category,
    }
}

/// Display a single blog post with related posts from its category.
///
/// Unknown or malformed ids render the not-found page.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = id.parse::<BlogId>() else {
        return not_found_page(ctx, "Blog post");
    };
    let blogs = fixture_or_empty(state.catalog().blogs().await, "blogs");
    let Some(post) = blogs.iter().find(|b| b.id == id).cloned() else {
        return not_found_page(ctx, "Blog post");
    };

    let related = related_blogs(&blogs, &post)
        .iter()
        .map(PostCard::from)
        .collect();

    BlogShowTemplate {
        ctx: ctx.with_title(post.title.clone()),
        date: post.display_date(),
        post,
        related,
    }
    .into_response()
}
