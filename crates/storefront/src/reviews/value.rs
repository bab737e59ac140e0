//! Firestore REST value encoding.
//!
//! Documents travel as `{"fields": {"name": {"stringValue": "Ann"}}}`. Integers
//! are encoded as decimal strings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boxsub_core::{Rating, ReviewId, SubscriptionId, Timestamp, Uid};

use super::{NewReview, Review, ReviewError};

/// Field map of a document or map value.
pub type Fields = BTreeMap<String, Value>;

/// A single typed Firestore value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    StringValue(String),
    IntegerValue(String),
    DoubleValue(f64),
    BooleanValue(bool),
    NullValue(()),
    /// RFC 3339 timestamp.
    TimestampValue(String),
    MapValue(MapValue),
    ArrayValue(ArrayValue),
    /// Document path, `projects/.../documents/...`.
    ReferenceValue(String),
    GeoPointValue(LatLng),
    /// Base64-encoded bytes.
    BytesValue(String),
    /// Any value type this codec does not know, kept as raw JSON.
    #[serde(untagged)]
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Value {
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::StringValue(s.into())
    }

    #[must_use]
    pub fn integer(n: i64) -> Self {
        Self::IntegerValue(n.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value; doubles with no fractional part also count.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::IntegerValue(s) => s.trim().parse().ok(),
            Self::DoubleValue(d) if d.fract() == 0.0 => Some(*d as i64),
            _ => None,
        }
    }

    /// Either a native timestamp or a `{seconds, nanoseconds}` map.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::TimestampValue(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| Timestamp::from_datetime(dt.with_timezone(&Utc))),
            Self::MapValue(map) => {
                let seconds = map.fields.get("seconds")?.as_i64()?;
                let nanoseconds = map
                    .fields
                    .get("nanoseconds")
                    .and_then(Self::as_i64)
                    .and_then(|n| i32::try_from(n).ok())
                    .unwrap_or(0);
                Some(Timestamp::new(seconds, nanoseconds))
            }
            _ => None,
        }
    }
}

/// A document as returned by the REST API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name, `projects/.../documents/CustomerReviews/<id>`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    /// Last path segment of the resource name.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.name.rsplit('/').next().filter(|id| !id.is_empty())
    }
}

/// Encode a review for `createDocument`.
#[must_use]
pub fn encode_review(review: &NewReview) -> Document {
    let mut created_at = Fields::new();
    created_at.insert("seconds".to_string(), Value::integer(review.created_at.seconds));
    created_at.insert(
        "nanoseconds".to_string(),
        Value::integer(i64::from(review.created_at.nanoseconds)),
    );

    let mut fields = Fields::new();
    fields.insert(
        "subscriptionId".to_string(),
        Value::integer(i64::from(review.subscription_id.as_i32())),
    );
    fields.insert("userId".to_string(), Value::string(review.user_id.as_str()));
    fields.insert("userName".to_string(), Value::string(&review.user_name));
    fields.insert("userEmail".to_string(), Value::string(&review.user_email));
    fields.insert("userPhoto".to_string(), Value::string(&review.user_photo));
    fields.insert(
        "rating".to_string(),
        Value::integer(i64::from(review.rating.value())),
    );
    fields.insert("review".to_string(), Value::string(&review.review));
    fields.insert(
        "createdAt".to_string(),
        Value::MapValue(MapValue { fields: created_at }),
    );

    Document {
        name: String::new(),
        fields,
    }
}

/// Decode a stored document into a [`Review`].
///
/// # Errors
///
/// Returns `ReviewError::Decode` if a required field is missing or has the
/// wrong type.
pub fn decode_review(doc: &Document) -> Result<Review, ReviewError> {
    let id = doc
        .id()
        .ok_or_else(|| ReviewError::Decode("document has no name".to_string()))?;

    let subscription_id = int_field(doc, "subscriptionId")
        .and_then(|n| i32::try_from(n).ok())
        .map(SubscriptionId::new)
        .ok_or_else(|| missing(id, "subscriptionId"))?;
    let user_id = str_field(doc, "userId").ok_or_else(|| missing(id, "userId"))?;
    let rating = int_field(doc, "rating")
        .and_then(|n| Rating::new(n).ok())
        .ok_or_else(|| missing(id, "rating"))?;

    Ok(Review {
        id: ReviewId::new(id),
        subscription_id,
        user_id: Uid::new(user_id),
        user_name: str_field(doc, "userName").unwrap_or_default().to_string(),
        user_email: str_field(doc, "userEmail").unwrap_or_default().to_string(),
        user_photo: str_field(doc, "userPhoto").unwrap_or_default().to_string(),
        rating,
        review: str_field(doc, "review").unwrap_or_default().to_string(),
        created_at: doc.fields.get("createdAt").and_then(Value::as_timestamp),
    })
}

fn str_field<'a>(doc: &'a Document, name: &str) -> Option<&'a str> {
    doc.fields.get(name).and_then(Value::as_str)
}

fn int_field(doc: &Document, name: &str) -> Option<i64> {
    doc.fields.get(name).and_then(Value::as_i64)
}

fn missing(id: &str, field: &str) -> ReviewError {
    ReviewError::Decode(format!("{id}: missing or invalid {field}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_review() -> NewReview {
        NewReview {
            subscription_id: SubscriptionId::new(3),
            user_id: Uid::new("uid-1"),
            user_name: "Ann".to_string(),
            user_email: "ann@example.com".to_string(),
            user_photo: "https://ui-avatars.com/api/?name=Ann".to_string(),
            rating: Rating::new(4).unwrap(),
            review: "Great box".to_string(),
            created_at: Timestamp::new(1_700_000_000, 0),
        }
    }

    #[test]
    fn test_value_wire_shape() {
        let json = serde_json::to_value(Value::integer(3)).unwrap();
        assert_eq!(json, serde_json::json!({"integerValue": "3"}));

        let json = serde_json::to_value(Value::NullValue(())).unwrap();
        assert_eq!(json, serde_json::json!({"nullValue": null}));

        let value: Value = serde_json::from_str(r#"{"booleanValue": true}"#).unwrap();
        assert_eq!(value, Value::BooleanValue(true));

        let value: Value =
            serde_json::from_str(r#"{"geoPointValue": {"latitude": 1.5, "longitude": -2.0}}"#)
                .unwrap();
        assert_eq!(
            value,
            Value::GeoPointValue(LatLng {
                latitude: 1.5,
                longitude: -2.0
            })
        );

        let value: Value = serde_json::from_str(r#"{"vectorValue": {"values": []}}"#).unwrap();
        assert!(matches!(value, Value::Other(_)));
    }

    #[test]
    fn test_encoded_review_fields() {
        let doc = encode_review(&new_review());
        let json = serde_json::to_value(&doc).unwrap();

        assert!(json.get("name").is_none());
        assert_eq!(json["fields"]["subscriptionId"]["integerValue"], "3");
        assert_eq!(json["fields"]["userName"]["stringValue"], "Ann");
        assert_eq!(json["fields"]["rating"]["integerValue"], "4");
        assert_eq!(
            json["fields"]["createdAt"]["mapValue"]["fields"]["seconds"]["integerValue"],
            "1700000000"
        );
    }

    #[test]
    fn test_decode_stored_document() {
        let mut doc = encode_review(&new_review());
        doc.name = "projects/p/databases/(default)/documents/CustomerReviews/abc123".to_string();

        let review = decode_review(&doc).unwrap();
        assert_eq!(review.id.as_str(), "abc123");
        assert_eq!(review, new_review().into_review(ReviewId::new("abc123")));
    }

    #[test]
    fn test_decode_accepts_native_timestamp_and_double_rating() {
        let doc: Document = serde_json::from_str(
            r#"{
                "name": "projects/p/databases/(default)/documents/CustomerReviews/x1",
                "fields": {
                    "subscriptionId": {"integerValue": "2"},
                    "userId": {"stringValue": "u"},
                    "rating": {"doubleValue": 5.0},
                    "createdAt": {"timestampValue": "2024-03-01T12:00:00Z"}
                }
            }"#,
        )
        .unwrap();

        let review = decode_review(&doc).unwrap();
        assert_eq!(review.rating.value(), 5);
        assert_eq!(review.created_at.unwrap().seconds, 1_709_294_400);
        assert_eq!(review.review, "");
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let doc = Document {
            name: "a/b/CustomerReviews/x".to_string(),
            fields: Fields::new(),
        };
        assert!(matches!(decode_review(&doc), Err(ReviewError::Decode(_))));

        let mut doc = encode_review(&new_review());
        doc.name = "a/CustomerReviews/y".to_string();
        doc.fields.insert("rating".to_string(), Value::integer(9));
        assert!(decode_review(&doc).is_err());
    }
}
