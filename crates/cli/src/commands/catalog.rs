//! Catalog fixture checks.
//!
//! Loads every fixture through the storefront's own loader, then looks for
//! problems the loader accepts: duplicate ids, ratings outside 0..=5 and
//! testimonials naming a box that does not exist.

use std::collections::HashSet;
use std::hash::Hash;
use std::path::PathBuf;
use std::time::Duration;

use boxsub_storefront::catalog::{Catalog, CatalogError, SeedReview, Subscription};
use boxsub_storefront::config::CatalogConfig;
use thiserror::Error;

/// Errors from `catalog check`.
#[derive(Debug, Error)]
pub enum CatalogCheckError {
    #[error(transparent)]
    Load(#[from] CatalogError),

    #[error("{0} problem(s) found in the catalog fixtures")]
    Problems(usize),
}

/// Check the fixtures in `data_dir`.
///
/// # Errors
///
/// Returns `CatalogCheckError::Load` if a fixture cannot be read or parsed,
/// and `CatalogCheckError::Problems` if any consistency check fails.
pub async fn check(data_dir: PathBuf) -> Result<(), CatalogCheckError> {
    let catalog = Catalog::new(&CatalogConfig {
        data_dir,
        cache_ttl: Duration::ZERO,
    });
    tracing::info!(dir = %catalog.data_dir().display(), "Checking catalog fixtures");

    let subscriptions = catalog.subscriptions().await?;
    let blogs = catalog.blogs().await?;
    let seed_reviews = catalog.seed_reviews().await?;
    let faqs = catalog.faqs().await?;

    let mut problems = Vec::new();
    problems.extend(duplicates("subscriptions.json", subscriptions.iter().map(|s| s.id)));
    problems.extend(duplicates("blogs.json", blogs.iter().map(|b| b.id)));
    problems.extend(duplicates("reviews.json", seed_reviews.iter().map(|r| r.id)));
    problems.extend(duplicates("faq.json", faqs.iter().map(|f| f.id)));
    problems.extend(subscription_problems(&subscriptions));
    problems.extend(seed_review_problems(&seed_reviews, &subscriptions));

    for problem in &problems {
        tracing::warn!("{problem}");
    }
    if !problems.is_empty() {
        return Err(CatalogCheckError::Problems(problems.len()));
    }

    tracing::info!(
        subscriptions = subscriptions.len(),
        blogs = blogs.len(),
        reviews = seed_reviews.len(),
        faqs = faqs.len(),
        "Catalog fixtures OK"
    );
    Ok(())
}

fn duplicates<T>(file: &str, ids: impl IntoIterator<Item = T>) -> Vec<String>
where
    T: Eq + Hash + std::fmt::Display,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter_map(|id| {
            let message = format!("{file}: duplicate id {id}");
            (!seen.insert(id)).then_some(message)
        })
        .collect()
}

fn subscription_problems(subscriptions: &[Subscription]) -> Vec<String> {
    subscriptions
        .iter()
        .filter(|s| !(0.0..=5.0).contains(&s.ratings))
        .map(|s| format!("subscriptions.json: {} has rating {}", s.name, s.ratings))
        .collect()
}

fn seed_review_problems(reviews: &[SeedReview], subscriptions: &[Subscription]) -> Vec<String> {
    let names: HashSet<&str> = subscriptions.iter().map(|s| s.name.as_str()).collect();
    let mut problems = Vec::new();
    for review in reviews {
        if !(1..=5).contains(&review.rating) {
            problems.push(format!(
                "reviews.json: review {} has rating {}",
                review.id, review.rating
            ));
        }
        if !names.contains(review.subscription.as_str()) {
            problems.push(format!(
                "reviews.json: review {} names unknown box \"{}\"",
                review.id, review.subscription
            ));
        }
    }
    problems
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn subscription(id: i32, name: &str, ratings: f32) -> Subscription {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "description": "",
            "price": 10,
            "frequency": "Monthly",
            "tech_category": "Gadgets",
            "thumbnail": "",
            "banner": "",
            "ratings": ratings,
            "number_of_reviews": 0
        }))
        .unwrap()
    }

    fn seed_review(id: i32, box_name: &str, rating: u8) -> SeedReview {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "text": "Great",
            "image": "",
            "name": "Ann",
            "subscription": box_name,
            "rating": rating
        }))
        .unwrap()
    }

    #[test]
    fn test_duplicates() {
        assert!(duplicates("f", [1, 2, 3]).is_empty());
        assert_eq!(
            duplicates("f", [1, 2, 1, 1]),
            vec!["f: duplicate id 1", "f: duplicate id 1"]
        );
    }

    #[test]
    fn test_subscription_rating_range() {
        let subs = vec![subscription(1, "A", 4.5), subscription(2, "B", 7.0)];
        let problems = subscription_problems(&subs);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains('B'));
    }

    #[test]
    fn test_seed_reviews_reference_known_boxes() {
        let subs = vec![subscription(1, "Gadget Box", 4.0)];
        let reviews = vec![
            seed_review(1, "Gadget Box", 5),
            seed_review(2, "Mystery Box", 0),
        ];
        let problems = seed_review_problems(&reviews, &subs);
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().all(|p| p.contains("review 2")));
    }
}
