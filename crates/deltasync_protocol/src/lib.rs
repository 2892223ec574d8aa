//! # DeltaSync Protocol
//!
//! Wire types for the delta sync API of a headless content platform.
//!
//! This crate provides:
//! - `DeltaRecord` and the per-entity system metadata
//! - `SyncPayload` and shape validation of response bodies
//! - The `X-Continuation` header and token extraction
//! - API modes and endpoint URL resolution
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod delta;
mod endpoint;
mod error;
mod headers;
mod payload;

pub use delta::{
    ChangeType, ContentItemDelta, ContentItemSystem, ContentTypeDelta, ContentTypeSystem,
    DeltaData, DeltaRecord, LanguageDelta, LanguageSystem, TaxonomyDelta, TaxonomySystem,
};
pub use endpoint::{
    join_endpoint, parse_base_url, remove_duplicate_slashes, resolve_url, ApiMode,
    DELIVERY_BASE_URL, PREVIEW_BASE_URL, SYNC_INIT_PATH, SYNC_PATH,
};
pub use error::{ProtocolError, ProtocolResult};
pub use headers::{
    extract_continuation_token, find_header, Header, AUTHORIZATION_HEADER, CONTINUATION_HEADER,
};
pub use payload::{
    collection_len, has_collections, is_empty_body, validate_init_payload, validate_payload,
    Collection, SyncPayload,
};
