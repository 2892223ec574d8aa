//! Sync response payloads and shape validation.
//!
//! Both the init and the sync endpoints answer with an object holding four
//! arrays: `items`, `types`, `languages` and `taxonomies`. Clients keep the
//! body as raw JSON so that unvalidated responses pass through untouched;
//! [`validate_payload`] and [`validate_init_payload`] perform the strict
//! typed check when response validation is switched on.

use crate::delta::{ContentItemDelta, ContentTypeDelta, LanguageDelta, TaxonomyDelta};
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One of the four collections of a sync payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Content items.
    Items,
    /// Content types.
    Types,
    /// Languages.
    Languages,
    /// Taxonomy groups.
    Taxonomies,
}

impl Collection {
    /// All collections in wire order.
    pub const ALL: [Collection; 4] = [
        Collection::Items,
        Collection::Types,
        Collection::Languages,
        Collection::Taxonomies,
    ];

    /// Returns the JSON key of this collection.
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Items => "items",
            Collection::Types => "types",
            Collection::Languages => "languages",
            Collection::Taxonomies => "taxonomies",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Typed view of a sync response body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncPayload {
    /// Changed or deleted content items.
    pub items: Vec<ContentItemDelta>,
    /// Changed or deleted content types.
    pub types: Vec<ContentTypeDelta>,
    /// Changed or deleted languages.
    pub languages: Vec<LanguageDelta>,
    /// Changed or deleted taxonomy groups.
    pub taxonomies: Vec<TaxonomyDelta>,
}

impl SyncPayload {
    /// Decodes a typed payload from a raw body.
    pub fn from_value(body: &Value) -> ProtocolResult<Self> {
        Ok(Self::deserialize(body)?)
    }

    /// Returns the number of records in one collection.
    pub fn len_of(&self, collection: Collection) -> usize {
        match collection {
            Collection::Items => self.items.len(),
            Collection::Types => self.types.len(),
            Collection::Languages => self.languages.len(),
            Collection::Taxonomies => self.taxonomies.len(),
        }
    }

    /// Returns the total number of records.
    pub fn len(&self) -> usize {
        Collection::ALL.iter().map(|c| self.len_of(*c)).sum()
    }

    /// Returns true if all four collections are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns the number of records in one collection of a raw body.
///
/// A missing key or a non-array value counts as zero records.
pub fn collection_len(body: &Value, collection: Collection) -> usize {
    body.get(collection.key())
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

/// Returns true if a raw body is an object holding all four collections as
/// arrays.
pub fn has_collections(body: &Value) -> bool {
    Collection::ALL
        .iter()
        .all(|c| body.get(c.key()).is_some_and(Value::is_array))
}

/// Returns true if a raw body holds all four collections and none of them
/// has records.
///
/// A body missing any collection is never empty: only a page that reports
/// four zero-length collections marks the end of the feed.
pub fn is_empty_body(body: &Value) -> bool {
    has_collections(body)
        && Collection::ALL
            .iter()
            .all(|c| collection_len(body, *c) == 0)
}

/// Validates a sync page body against the expected shape.
pub fn validate_payload(body: &Value) -> ProtocolResult<SyncPayload> {
    if !body.is_object() {
        return Err(ProtocolError::InvalidPayload(format!(
            "expected an object, got {}",
            json_kind(body)
        )));
    }
    SyncPayload::from_value(body)
}

/// Validates an init body: the sync shape with four empty collections.
pub fn validate_init_payload(body: &Value) -> ProtocolResult<SyncPayload> {
    let payload = validate_payload(body)?;
    for collection in Collection::ALL {
        let count = payload.len_of(collection);
        if count > 0 {
            return Err(ProtocolError::NonEmptyInit { collection, count });
        }
    }
    Ok(payload)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
