//! Note document and API payload types.

use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A note document as stored in the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: bson::DateTime,
}

/// Payload for creating a note. Both fields are required and non-empty.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNoteInput {
    pub title: String,
    pub content: String,
}

impl CreateNoteInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::InvalidInput("title is required"));
        }
        if self.content.trim().is_empty() {
            return Err(ApiError::InvalidInput("content is required"));
        }
        Ok(())
    }
}

/// Payload for a partial note update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNoteInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub completed: Option<bool>,
}

/// JSON representation of a note returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: note.title,
            content: note.content,
            completed: note.completed,
            created_at: to_datetime(note.created_at),
            updated_at: to_datetime(note.updated_at),
        }
    }
}

fn to_datetime(dt: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}
