//! Data models for the chat and collections API.
//!
//! Wire payloads use `snake_case` keys. They are camel-cased on receipt (see
//! [`crate::case`]) and snake-cased again before sending, so every model
//! here is declared with `camelCase` field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

use crate::case::to_camel_case;
use crate::decoder::{StreamDecodeError, StreamEvent};
use crate::token::UploadToken;

/// Where answers are grounded: a shared collection or the user's own files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    Collection,
    File,
}

/// File metadata attached to a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

/// A document excerpt used to ground an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
    pub file: SourceFile,
}

/// The assistant's answer for one turn, built up from stream events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub generation_completed: bool,
}

/// Progress of a file upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadStatus {
    /// Latest progress message; earlier ones are not kept
    pub message: Option<String>,
    pub completed: bool,
}

/// Message shown before the first progress event arrives.
pub const UPLOAD_PREPARING_MESSAGE: &str = "Preparing upload...";

impl UploadStatus {
    pub fn preparing() -> Self {
        Self {
            message: Some(UPLOAD_PREPARING_MESSAGE.to_string()),
            completed: false,
        }
    }
}

/// Events of the chat message stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Sources(Vec<Source>),
    Content(String),
    /// Any other event kind; ignored by the accumulator.
    Other(String),
}

#[derive(Deserialize)]
struct SourcesPayload {
    #[serde(default)]
    sources: Option<Vec<Source>>,
}

#[derive(Deserialize)]
struct ContentPayload {
    #[serde(default)]
    content: Option<String>,
}

impl TryFrom<StreamEvent> for ChatEvent {
    type Error = StreamDecodeError;

    fn try_from(event: StreamEvent) -> Result<Self, Self::Error> {
        let payload = to_camel_case(event.payload);
        let schema_error = |source| StreamDecodeError::Schema {
            kind: event.kind.clone(),
            source,
        };

        match event.kind.as_str() {
            "sources" => serde_json::from_value::<SourcesPayload>(payload)
                .map(|p| ChatEvent::Sources(p.sources.unwrap_or_default()))
                .map_err(schema_error),
            "content" => serde_json::from_value::<ContentPayload>(payload)
                .map(|p| ChatEvent::Content(p.content.unwrap_or_default()))
                .map_err(schema_error),
            other => Ok(ChatEvent::Other(other.to_string())),
        }
    }
}

/// Events of the upload progress stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Progress { message: String },
}

#[derive(Deserialize)]
struct ProgressPayload {
    message: String,
}

impl TryFrom<StreamEvent> for UploadEvent {
    type Error = StreamDecodeError;

    fn try_from(event: StreamEvent) -> Result<Self, Self::Error> {
        serde_json::from_value::<ProgressPayload>(to_camel_case(event.payload))
            .map(|p| UploadEvent::Progress { message: p.message })
            .map_err(|source| StreamDecodeError::Schema {
                kind: event.kind,
                source,
            })
    }
}

/// A chat question as sent to the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPromptRequest {
    pub workflow: String,
    pub mode: AnswerMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    /// Collection id in collection mode, upload token in file mode
    pub index: String,
    pub message: String,
    pub token: UploadToken,
}

/// Thumbs up / thumbs down on an answer. Sent as `0` / `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UserFeedback {
    Down = 0,
    Up = 1,
}

impl Serialize for UserFeedback {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Number of documents retrieved per question during an evaluation run.
pub const DEFAULT_EVALUATION_PRECISION: u32 = 5;

/// An evaluation run of a workflow against a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationRequest {
    pub workflow: String,
    /// Collection id
    pub index: String,
    pub precision: u32,
}

/// Evaluation metrics by name, as reported by the backend.
pub type EvaluationMetrics = HashMap<String, f64>;

/// Collection entry of the collections listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub nb_files: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionFile {
    pub id: String,
    pub name: String,
    pub extension: String,
    pub size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

/// A collection with its files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<CollectionFile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionList {
    pub data: Vec<CollectionSummary>,
}

/// Timestamps arrive either as RFC 3339 or as naive ISO-8601 (taken as UTC).
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}
