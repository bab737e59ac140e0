//! Free-form profile details stored under `userDetails_<uid>`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use boxsub_core::Uid;

use super::{KeyValueStore, StorageError, keys};

/// Gender options offered on the details form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
    #[serde(rename = "Prefer not to say")]
    PreferNotToSay,
}

impl Gender {
    pub const ALL: [Self; 4] = [Self::Male, Self::Female, Self::Other, Self::PreferNotToSay];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
            Self::PreferNotToSay => "Prefer not to say",
        }
    }

    /// Parse a form value; unknown or empty values are `None`.
    #[must_use]
    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.label() == s.trim())
    }
}

/// Contact and demographic details a user may fill in.
///
/// Every field is optional; the stored JSON uses the camelCase names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileDetails {
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub zip_code: String,
    pub date_of_birth: String,
    #[serde(
        deserialize_with = "deserialize_gender",
        skip_serializing_if = "Option::is_none"
    )]
    pub gender: Option<Gender>,
}

fn deserialize_gender<'de, D>(deserializer: D) -> Result<Option<Gender>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Gender::from_label))
}

impl ProfileDetails {
    /// Trim every text field.
    #[must_use]
    pub fn trimmed(self) -> Self {
        Self {
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            country: self.country.trim().to_string(),
            zip_code: self.zip_code.trim().to_string(),
            date_of_birth: self.date_of_birth.trim().to_string(),
            gender: self.gender,
        }
    }
}

/// Reads and writes `userDetails_<uid>` entries.
#[derive(Clone)]
pub struct ProfileDetailsStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileDetailsStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Details for `uid`; empty details if none were saved or the entry is unreadable.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub async fn load(&self, uid: &Uid) -> Result<ProfileDetails, StorageError> {
        let key = keys::user_details(uid.as_str());
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(ProfileDetails::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(key = %key, error = %e, "Discarding unreadable profile details");
            ProfileDetails::default()
        }))
    }

    /// Replace the details for `uid`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    pub async fn save(&self, uid: &Uid, details: &ProfileDetails) -> Result<(), StorageError> {
        let raw = serde_json::to_string(details)?;
        self.store
            .set(&keys::user_details(uid.as_str()), &raw)
            .await
    }

    /// Delete the details for `uid`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    pub async fn remove(&self, uid: &Uid) -> Result<(), StorageError> {
        self.store.remove(&keys::user_details(uid.as_str())).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;

    #[test]
    fn test_gender_labels() {
        assert_eq!(Gender::from_label("Prefer not to say"), Some(Gender::PreferNotToSay));
        assert_eq!(Gender::from_label(" Female "), Some(Gender::Female));
        assert_eq!(Gender::from_label(""), None);
        assert_eq!(Gender::from_label("unknown"), None);
    }

    #[test]
    fn test_stored_shape_uses_camel_case() {
        let details = ProfileDetails {
            zip_code: "12345".to_string(),
            date_of_birth: "1990-01-01".to_string(),
            gender: Some(Gender::PreferNotToSay),
            ..ProfileDetails::default()
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["zipCode"], "12345");
        assert_eq!(json["dateOfBirth"], "1990-01-01");
        assert_eq!(json["gender"], "Prefer not to say");
    }

    #[test]
    fn test_partial_and_unknown_values_parse() {
        let details: ProfileDetails =
            serde_json::from_str(r#"{"city":"Oslo","gender":"","extra":1}"#).unwrap();
        assert_eq!(details.city, "Oslo");
        assert_eq!(details.gender, None);
    }

    #[tokio::test]
    async fn test_save_load_remove() {
        let store = ProfileDetailsStore::new(Arc::new(MemoryKeyValueStore::new()));
        let uid = Uid::new("u1");

        assert_eq!(store.load(&uid).await.unwrap(), ProfileDetails::default());

        let details = ProfileDetails {
            phone: "555-0100".to_string(),
            ..ProfileDetails::default()
        };
        store.save(&uid, &details).await.unwrap();
        assert_eq!(store.load(&uid).await.unwrap(), details);
        assert_eq!(
            store.load(&Uid::new("u2")).await.unwrap(),
            ProfileDetails::default()
        );

        store.remove(&uid).await.unwrap();
        assert_eq!(store.load(&uid).await.unwrap(), ProfileDetails::default());
    }
}
