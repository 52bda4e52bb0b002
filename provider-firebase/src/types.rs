//! Wire types for the Firebase REST surfaces.
//!
//! Covers the slices of three APIs the connector touches: Firestore
//! documents/queries/commits, Identity Toolkit password sign-in, and the
//! Storage object metadata returned by a finalized upload.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Firestore
// ============================================================================

/// A typed Firestore field value.
///
/// Firestore's JSON encoding wraps every value in a type tag; note that
/// integers travel as STRINGS on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirestoreValue {
    StringValue(String),
    IntegerValue(String),
    TimestampValue(String),
    BooleanValue(bool),
    DoubleValue(f64),
}

/// A Firestore document: resource name plus typed fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirestoreDocument {
    /// Full resource name
    /// (`projects/{p}/databases/(default)/documents/{collection}/{id}`);
    /// empty for documents about to be created.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, FirestoreValue>,
}

impl FirestoreDocument {
    /// The backend-assigned id: the last segment of the resource name.
    pub fn doc_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn string_field(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FirestoreValue::StringValue(s)) => Some(s),
            _ => None,
        }
    }

    pub fn integer_field(&self, key: &str) -> Option<i64> {
        match self.fields.get(key) {
            Some(FirestoreValue::IntegerValue(s)) => s.parse().ok(),
            _ => None,
        }
    }

    /// Timestamp field as Unix epoch seconds.
    pub fn timestamp_field(&self, key: &str) -> Option<i64> {
        match self.fields.get(key) {
            Some(FirestoreValue::TimestampValue(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).timestamp()),
            _ => None,
        }
    }

    pub fn with_string(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(key.to_string(), FirestoreValue::StringValue(value.into()));
        self
    }

    pub fn with_integer(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(
            key.to_string(),
            FirestoreValue::IntegerValue(value.to_string()),
        );
        self
    }

    pub fn with_timestamp(mut self, key: &str, epoch_secs: i64) -> Self {
        let rfc3339 = Utc
            .timestamp_opt(epoch_secs, 0)
            .single()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        self.fields
            .insert(key.to_string(), FirestoreValue::TimestampValue(rfc3339));
        self
    }
}

/// `documents:runQuery` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<QueryOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOrder {
    pub field: FieldReference,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

/// One element of a `runQuery` response stream. Elements without a
/// `document` carry read metadata and are skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct RunQueryResponseElement {
    #[serde(default)]
    pub document: Option<FirestoreDocument>,
}

/// `documents:commit` request body - the atomic multi-document write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub writes: Vec<CommitWrite>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitWrite {
    pub update: FirestoreDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<DocumentMask>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMask {
    pub field_paths: Vec<String>,
}

// ============================================================================
// Identity Toolkit
// ============================================================================

/// `accounts:signInWithPassword` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    pub return_secure_token: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub id_token: String,
    pub email: String,
    pub local_id: String,
    /// Token lifetime in seconds, as a decimal string.
    #[serde(default)]
    pub expires_in: Option<String>,
}

/// Error envelope shared by the Google REST surfaces.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Storage
// ============================================================================

/// Object metadata returned when a resumable upload finalizes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageObject {
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Comma-separated download tokens; the first one builds the public URL.
    #[serde(default)]
    pub download_tokens: Option<String>,
}
