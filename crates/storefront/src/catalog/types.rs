//! Catalog record types as they appear in the fixture files.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use boxsub_core::{BlogId, FaqId, Price, SeedReviewId, SubscriptionId};

/// A subscription box offered in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub frequency: String,
    pub tech_category: String,
    pub thumbnail: String,
    pub banner: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub subscription_benefits: Vec<String>,
    pub ratings: f32,
    pub number_of_reviews: u32,
}

/// A blog post. `content` is Markdown; `content_html` is rendered on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blog {
    pub id: BlogId,
    pub title: String,
    pub category: String,
    pub date: String,
    pub author: String,
    pub image: String,
    pub content: String,
    #[serde(skip)]
    pub content_html: String,
}

impl Blog {
    /// Publication date formatted as "Month D, YYYY".
    ///
    /// Dates that are not `YYYY-MM-DD` are shown as written.
    #[must_use]
    pub fn display_date(&self) -> String {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_or_else(|_| self.date.clone(), |d| d.format("%B %-d, %Y").to_string())
    }

    /// Plain-text teaser for list views.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> String {
        let text: String = self
            .content
            .chars()
            .filter(|c| !matches!(c, '#' | '*' | '_' | '`' | '>'))
            .collect();
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.chars().count() <= max_chars {
            return text;
        }
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}

/// A testimonial shown on the home page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedReview {
    pub id: SeedReviewId,
    pub text: String,
    pub image: String,
    pub name: String,
    pub subscription: String,
    pub rating: u8,
}

/// A frequently asked question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faq {
    pub id: FaqId,
    pub question: String,
    pub answer: String,
}

/// A blog category with the number of posts in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}
