//! Delta records returned by the change feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type of change a delta record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Entity was created or modified.
    Changed,
    /// Entity was removed.
    Deleted,
}

/// A single change-feed entry.
///
/// The correlation between `change_type` and the fields present in
/// `data.system` is a convention of the upstream API; nothing here enforces
/// it beyond the shape checks in [`crate::payload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaRecord<S> {
    /// Whether the entity changed or was deleted.
    pub change_type: ChangeType,
    /// When the change happened.
    #[serde(with = "utc_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Current metadata of the entity.
    pub data: DeltaData<S>,
}

/// Payload of a delta record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaData<S> {
    /// System metadata of the entity.
    pub system: S,
}

impl<S> DeltaRecord<S> {
    /// Creates a `changed` record.
    pub fn changed(timestamp: DateTime<Utc>, system: S) -> Self {
        Self {
            change_type: ChangeType::Changed,
            timestamp,
            data: DeltaData { system },
        }
    }

    /// Creates a `deleted` record.
    pub fn deleted(timestamp: DateTime<Utc>, system: S) -> Self {
        Self {
            change_type: ChangeType::Deleted,
            timestamp,
            data: DeltaData { system },
        }
    }

    /// Returns true if the entity was deleted.
    pub fn is_deleted(&self) -> bool {
        self.change_type == ChangeType::Deleted
    }

    /// Returns the system metadata.
    pub fn system(&self) -> &S {
        &self.data.system
    }
}

/// System metadata of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItemSystem {
    /// Item ID.
    pub id: String,
    /// Collection codename.
    pub collection: String,
    /// Item codename.
    pub codename: String,
    /// Display name.
    pub name: String,
    /// Content type codename.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Language codename.
    pub language: String,
    /// Last modification time as sent by the API.
    pub last_modified: String,
    /// Workflow codename, if the item is in a workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    /// Workflow step codename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_step: Option<String>,
}

/// System metadata of a content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeSystem {
    /// Type ID.
    pub id: String,
    /// Type codename.
    pub codename: String,
    /// Display name.
    pub name: String,
    /// Last modification time as sent by the API.
    pub last_modified: String,
}

/// System metadata of a language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSystem {
    /// Language ID.
    pub id: String,
    /// Language codename.
    pub codename: String,
    /// Display name.
    pub name: String,
}

/// System metadata of a taxonomy group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomySystem {
    /// Taxonomy ID.
    pub id: String,
    /// Taxonomy codename.
    pub codename: String,
    /// Display name.
    pub name: String,
    /// Last modification time as sent by the API.
    pub last_modified: String,
}

/// ISO 8601 timestamps in UTC with a `Z` designator.
///
/// Offsets such as `+02:00` are rejected; the API always reports UTC.
mod utc_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if !raw.ends_with('Z') {
            return Err(D::Error::custom(format!(
                "timestamp '{}' must be in UTC with a 'Z' designator",
                raw
            )));
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| D::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
    }
}

/// Delta record for a content item.
pub type ContentItemDelta = DeltaRecord<ContentItemSystem>;
/// Delta record for a content type.
pub type ContentTypeDelta = DeltaRecord<ContentTypeSystem>;
/// Delta record for a language.
pub type LanguageDelta = DeltaRecord<LanguageSystem>;
/// Delta record for a taxonomy group.
pub type TaxonomyDelta = DeltaRecord<TaxonomySystem>;
