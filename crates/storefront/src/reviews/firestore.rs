//! Firestore REST client for the review collection.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::instrument;

use boxsub_core::{ReviewId, SubscriptionId};

use super::value::{Document, Value, decode_review, encode_review};
use super::{COLLECTION, NewReview, Review, ReviewError, ReviewStore};
use crate::config::FirebaseConfig;

/// Review store backed by Cloud Firestore.
#[derive(Clone)]
pub struct FirestoreReviews {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    client: reqwest::Client,
    api_key: SecretString,
    /// `{firestore_url}/projects/{project}/databases/(default)/documents`
    documents_url: String,
}

/// One element of a `runQuery` response. Empty results still carry a
/// `readTime` element with no document.
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirestoreReviews {
    #[must_use]
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            inner: Arc::new(FirestoreInner {
                client: reqwest::Client::new(),
                api_key: config.api_key.clone(),
                documents_url: format!(
                    "{}/projects/{}/databases/(default)/documents",
                    config.firestore_url.trim_end_matches('/'),
                    config.project_id
                ),
            }),
        }
    }

    fn document_url(&self, id: &ReviewId) -> String {
        format!(
            "{}/{COLLECTION}/{}",
            self.inner.documents_url,
            urlencoding::encode(id.as_str())
        )
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        id_token: Option<&SecretString>,
    ) -> reqwest::RequestBuilder {
        let builder = self
            .inner
            .client
            .request(method, url)
            .query(&[("key", self.inner.api_key.expose_secret())]);
        match id_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }
}

#[async_trait]
impl ReviewStore for FirestoreReviews {
    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    async fn list_for_subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Vec<Review>, ReviewError> {
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "subscriptionId" },
                        "op": "EQUAL",
                        "value": Value::integer(i64::from(subscription_id.as_i32())),
                    }
                }
            }
        });
        let url = format!("{}:runQuery", self.inner.documents_url);
        let response = self
            .request(reqwest::Method::POST, &url, None)
            .json(&query)
            .send()
            .await?;
        let items: Vec<RunQueryItem> = decode_response(response).await?;

        let reviews = items
            .into_iter()
            .filter_map(|item| item.document)
            .filter_map(|doc| match decode_review(&doc) {
                Ok(review) => Some(review),
                Err(e) => {
                    tracing::warn!(document = %doc.name, error = %e, "Skipping unreadable review");
                    None
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = reviews.len(), "Fetched reviews");
        Ok(reviews)
    }

    #[instrument(skip(self, review, id_token), fields(subscription_id = %review.subscription_id))]
    async fn add(
        &self,
        review: &NewReview,
        id_token: &SecretString,
    ) -> Result<ReviewId, ReviewError> {
        let url = format!("{}/{COLLECTION}", self.inner.documents_url);
        let response = self
            .request(reqwest::Method::POST, &url, Some(id_token))
            .json(&encode_review(review))
            .send()
            .await?;
        let created: Document = decode_response(response).await?;

        created
            .id()
            .map(ReviewId::new)
            .ok_or_else(|| ReviewError::Decode("created document has no name".to_string()))
    }

    #[instrument(skip(self), fields(review_id = %id))]
    async fn get(&self, id: &ReviewId) -> Result<Option<Review>, ReviewError> {
        let response = self
            .request(reqwest::Method::GET, &self.document_url(id), None)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: Document = decode_response(response).await?;
        decode_review(&doc).map(Some)
    }

    #[instrument(skip(self, id_token), fields(review_id = %id))]
    async fn delete(&self, id: &ReviewId, id_token: &SecretString) -> Result<(), ReviewError> {
        let response = self
            .request(reqwest::Method::DELETE, &self.document_url(id), Some(id_token))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ReviewError::NotFound);
        }
        let _: serde_json::Value = decode_response(response).await?;
        Ok(())
    }
}

async fn decode_response<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ReviewError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map_or_else(|_| body.chars().take(200).collect(), |e| e.error.message);
        tracing::warn!(status = %status, message = %message, "Document store rejected request");
        return Err(ReviewError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse document store response");
        ReviewError::Parse(e)
    })
}
