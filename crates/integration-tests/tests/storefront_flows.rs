//! End-to-end storefront flows against a live server with in-memory
//! backends.

#![allow(clippy::unwrap_used)]

use boxsub_integration_tests::{TestApp, location};
use reqwest::StatusCode;

const PASSWORD: &str = "Secret12";

// =============================================================================
// Public Pages
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await.unwrap();

    let res = app.get("/health").await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ok");

    let res = app.get("/health/ready").await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_home_shows_first_six_boxes_until_expanded() {
    let app = TestApp::spawn().await.unwrap();

    let home = app.page("/").await.unwrap();
    assert!(home.contains("<title>Home | Box Subscription</title>"));
    assert!(home.contains("Glow Beauty Box"));
    assert!(!home.contains("Smart Home Starter"));
    assert!(home.contains("/?all=true"));
    assert!(home.contains("<strong>Aisha Rahman</strong>"));
    assert!(home.contains("How does a subscription box work?"));

    let all = app.page("/?all=true").await.unwrap();
    assert!(all.contains("Smart Home Starter"));
}

#[tokio::test]
async fn test_blog_filter_and_unknown_post() {
    let app = TestApp::spawn().await.unwrap();

    let page = app.page("/blog?category=Unboxing").await.unwrap();
    assert!(page.contains("Unboxing: Gadget Lab Holiday Special"));
    assert!(!page.contains("5 Ways to Reduce Packaging Waste"));

    let res = app.get("/blog/999").await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.get("/no-such-page").await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Auth Guard
// =============================================================================

#[tokio::test]
async fn test_private_page_redirects_to_login_with_message() {
    let app = TestApp::spawn().await.unwrap();

    let res = app.get("/subscriptions").await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), Some("/login?from=%2Fsubscriptions"));

    let login = app.page("/login?from=%2Fsubscriptions").await.unwrap();
    assert!(login.contains("Access Denied"));
    assert!(login.contains("Please log in to view your subscriptions."));
    assert!(login.contains(r#"name="from" value="/subscriptions""#));
}

#[tokio::test]
async fn test_login_returns_to_requested_page() {
    let app = TestApp::spawn().await.unwrap();
    app.sign_up("Ann", "ann@example.com", PASSWORD).await.unwrap();
    app.post_form("/logout", &[]).await.unwrap();

    let res = app
        .post_form(
            "/login",
            &[
                ("email", "ann@example.com"),
                ("password", PASSWORD),
                ("from", "/subscription/2"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), Some("/subscription/2"));

    let detail = app.page("/subscription/2").await.unwrap();
    assert!(detail.contains("Successfully signed in!"));
    assert!(detail.contains("FitLife Power Box"));
}

#[tokio::test]
async fn test_login_failure_rerenders_form() {
    let app = TestApp::spawn().await.unwrap();
    app.sign_up("Ann", "ann@example.com", PASSWORD).await.unwrap();
    app.post_form("/logout", &[]).await.unwrap();

    let res = app
        .post_form(
            "/login",
            &[("email", "ann@example.com"), ("password", "Wrong123")],
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await.unwrap();
    assert!(body.contains("Sign in failed"));
    assert!(body.contains(r#"value="ann@example.com""#));
}

#[tokio::test]
async fn test_external_from_is_ignored() {
    let app = TestApp::spawn().await.unwrap();
    app.sign_up("Ann", "ann@example.com", PASSWORD).await.unwrap();
    app.post_form("/logout", &[]).await.unwrap();

    let res = app
        .post_form(
            "/login",
            &[
                ("email", "ann@example.com"),
                ("password", PASSWORD),
                ("from", "//evil.example/phish"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(location(&res), Some("/"));
}

// =============================================================================
// Membership and Reviews
// =============================================================================

#[tokio::test]
async fn test_sign_up_subscribe_review_and_delete_account() {
    let app = TestApp::spawn().await.unwrap();

    // Sign up
    let res = app.sign_up("Ann", "ann@example.com", PASSWORD).await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), Some("/"));
    assert_eq!(app.identity.account_count().await, 1);
    let home = app.page("/").await.unwrap();
    assert!(home.contains("Account created successfully!"));

    // Subscribe twice; the second is a no-op
    let res = app.post_form("/subscription/3/subscribe", &[]).await.unwrap();
    assert_eq!(location(&res), Some("/subscription/3"));
    let detail = app.page("/subscription/3").await.unwrap();
    assert!(detail.contains("Successfully subscribed!"));
    assert!(detail.contains("Unsubscribe"));

    app.post_form("/subscription/3/subscribe", &[]).await.unwrap();
    let detail = app.page("/subscription/3").await.unwrap();
    assert!(detail.contains("You are already subscribed to this box"));

    let mine = app.page("/subscriptions").await.unwrap();
    assert!(mine.contains("Gourmet Explorer"));
    assert_eq!(mine.matches("/subscriptions/3/remove").count(), 1);

    // Wishlist toggles
    app.post_form("/subscription/3/wishlist", &[]).await.unwrap();
    let wishlist = app.page("/profile?tab=wishlist").await.unwrap();
    assert!(wishlist.contains("Added to wishlist"));
    assert!(wishlist.contains("/profile/wishlist/3/remove"));

    // Review
    let res = app
        .post_form(
            "/subscription/3/reviews",
            &[("review", "Loved the hot sauces"), ("rating", "4")],
        )
        .await
        .unwrap();
    assert_eq!(location(&res), Some("/subscription/3"));
    assert_eq!(app.reviews.len().await, 1);
    let detail = app.page("/subscription/3").await.unwrap();
    assert!(detail.contains("Review submitted successfully!"));
    assert!(detail.contains("Loved the hot sauces"));
    assert!(detail.contains("/delete"));

    // Delete account
    let res = app.post_form("/profile/delete", &[]).await.unwrap();
    assert_eq!(location(&res), Some("/"));
    assert_eq!(app.identity.account_count().await, 0);
    let home = app.page("/").await.unwrap();
    assert!(home.contains("Account deleted successfully"));

    let res = app.get("/subscriptions").await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    // Membership is gone when the same email signs up again
    app.sign_up("Ann", "ann@example.com", PASSWORD).await.unwrap();
    let mine = app.page("/subscriptions").await.unwrap();
    assert!(!mine.contains("/subscriptions/3/remove"));
}

#[tokio::test]
async fn test_review_rating_must_be_in_range() {
    let app = TestApp::spawn().await.unwrap();
    app.sign_up("Ann", "ann@example.com", PASSWORD).await.unwrap();

    app.post_form(
        "/subscription/1/reviews",
        &[("review", "Great"), ("rating", "9")],
    )
    .await
    .unwrap();
    assert!(app.reviews.is_empty().await);
    let detail = app.page("/subscription/1").await.unwrap();
    assert!(detail.contains("Please choose a rating between 1 and 5"));
}

#[tokio::test]
async fn test_unknown_subscription() {
    let app = TestApp::spawn().await.unwrap();
    app.sign_up("Ann", "ann@example.com", PASSWORD).await.unwrap();

    let res = app.get("/subscription/999").await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.post_form("/subscription/999/subscribe", &[]).await.unwrap();
    assert_eq!(location(&res), Some("/"));
    let home = app.page("/").await.unwrap();
    assert!(home.contains("Subscription not found"));
}

#[tokio::test]
async fn test_profile_details_round_trip() {
    let app = TestApp::spawn().await.unwrap();
    app.sign_up("Ann", "ann@example.com", PASSWORD).await.unwrap();

    app.post_form(
        "/profile/details",
        &[
            ("phone", "+8801700000000"),
            ("city", "Dhaka"),
            ("gender", "Female"),
        ],
    )
    .await
    .unwrap();

    let page = app.page("/profile?tab=details").await.unwrap();
    assert!(page.contains("Profile details updated successfully!"));
    assert!(page.contains(r#"value="Dhaka""#));
    assert!(page.contains(r#"<option value="Female" selected>"#));
}
