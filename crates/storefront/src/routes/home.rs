//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::catalog::{FEATURED_COUNT, Faq, SeedReview, Subscription, featured};
use crate::filters;
use crate::routes::{PageContext, fixture_or_empty};
use crate::state::AppState;

/// A category tile in the hero section.
pub struct HeroCategory {
    pub name: &'static str,
    pub tagline: &'static str,
}

/// Categories highlighted in the hero.
pub const HERO_CATEGORIES: [HeroCategory; 5] = [
    HeroCategory {
        name: "Beauty",
        tagline: "Premium skincare and makeup products",
    },
    HeroCategory {
        name: "Fitness",
        tagline: "Exercise equipment and supplements",
    },
    HeroCategory {
        name: "Gourmet",
        tagline: "Artisanal foods and specialty treats",
    },
    HeroCategory {
        name: "Tech",
        tagline: "Latest gadgets and accessories",
    },
    HeroCategory {
        name: "Books",
        tagline: "Curated books and reading accessories",
    },
];

/// "Why choose us" features.
pub const FEATURES: [(&str, &str); 4] = [
    (
        "Curated by experts",
        "Every box is assembled by specialists in its category.",
    ),
    (
        "Flexible plans",
        "Subscribe, pause or cancel from your account at any time.",
    ),
    (
        "Free shipping",
        "Boxes ship free to your door every cycle.",
    ),
    (
        "Member reviews",
        "Subscribers share honest reviews of every box.",
    ),
];

/// Home page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    /// `true` shows every subscription box.
    pub all: Option<String>,
    /// `all` shows every testimonial.
    pub reviews: Option<String>,
}

impl HomeQuery {
    fn show_all_boxes(&self) -> bool {
        self.all.as_deref() == Some("true")
    }

    fn show_all_reviews(&self) -> bool {
        self.reviews.as_deref() == Some("all")
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub hero_categories: &'static [HeroCategory],
    pub features: &'static [(&'static str, &'static str)],
    pub subscriptions: Vec<Subscription>,
    pub show_all_boxes: bool,
    pub has_more_boxes: bool,
    pub reviews: Vec<SeedReview>,
    pub show_all_reviews: bool,
    pub has_more_reviews: bool,
    pub faqs: Vec<Faq>,
}

/// Display the home page.
#[instrument(skip(state, ctx))]
pub async fn home(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<HomeQuery>,
) -> impl IntoResponse {
    let catalog = state.catalog();
    let subscriptions = fixture_or_empty(catalog.subscriptions().await, "subscriptions");
    let reviews = fixture_or_empty(catalog.seed_reviews().await, "reviews");
    let faqs = fixture_or_empty(catalog.faqs().await, "faq");

    let show_all_boxes = query.show_all_boxes();
    let show_all_reviews = query.show_all_reviews();

    HomeTemplate {
        ctx: ctx.with_title("Home"),
        hero_categories: &HERO_CATEGORIES,
        features: &FEATURES,
        subscriptions: featured(&subscriptions, show_all_boxes),
        show_all_boxes,
        has_more_boxes: subscriptions.len() > FEATURED_COUNT,
        reviews: featured(&reviews, show_all_reviews),
        show_all_reviews,
        has_more_reviews: reviews.len() > FEATURED_COUNT,
        faqs: faqs.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_query_flags() {
        let query = HomeQuery {
            all: Some("true".to_string()),
            reviews: Some("all".to_string()),
        };
        assert!(query.show_all_boxes());
        assert!(query.show_all_reviews());

        let query = HomeQuery {
            all: Some("yes".to_string()),
            reviews: Some("true".to_string()),
        };
        assert!(!query.show_all_boxes());
        assert!(!query.show_all_reviews());
        assert!(!HomeQuery::default().show_all_boxes());
    }
}
