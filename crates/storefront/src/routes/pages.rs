//! Static page route handlers: terms, privacy and the not-found page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::filters;
use crate::routes::PageContext;

/// Last revision date shown on the legal pages.
const LEGAL_UPDATED: &str = "January 15, 2025";

/// Terms and conditions template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/terms.html")]
pub struct TermsTemplate {
    pub ctx: PageContext,
    pub updated: &'static str,
}

/// Privacy policy template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/privacy.html")]
pub struct PrivacyTemplate {
    pub ctx: PageContext,
    pub updated: &'static str,
}

/// Not-found template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub ctx: PageContext,
    /// What was missing, e.g. "Subscription".
    pub what: String,
}

/// Display the terms and conditions.
#[instrument(skip(ctx))]
pub async fn terms(ctx: PageContext) -> impl IntoResponse {
    TermsTemplate {
        ctx: ctx.with_title("Terms and Conditions"),
        updated: LEGAL_UPDATED,
    }
}

/// Display the privacy policy.
#[instrument(skip(ctx))]
pub async fn privacy(ctx: PageContext) -> impl IntoResponse {
    PrivacyTemplate {
        ctx: ctx.with_title("Privacy Policy"),
        updated: LEGAL_UPDATED,
    }
}

/// Fallback for unknown paths.
#[instrument(skip(ctx))]
pub async fn not_found(ctx: PageContext) -> Response {
    not_found_page(ctx, "Page")
}

/// Render the not-found page with a 404 status.
pub fn not_found_page(ctx: PageContext, what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            ctx: ctx.with_title("Not Found"),
            what: what.to_string(),
        },
    )
        .into_response()
}
