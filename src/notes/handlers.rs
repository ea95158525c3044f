//! HTTP handlers for the notes CRUD surface.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use crate::error::ApiError;

use super::model::{CreateNoteInput, NoteResponse, UpdateNoteInput};
use super::repository::NoteRepository;

/// Shared state for the notes routes.
#[derive(Clone)]
pub struct AppState {
    pub notes: NoteRepository,
}

pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<NoteResponse>>, ApiError> {
    let notes = state.notes.list().await?;
    Ok(Json(notes.into_iter().map(NoteResponse::from).collect()))
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NoteResponse>, ApiError> {
    let id = parse_note_id(&id)?;
    let note = state.notes.get(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(note.into()))
}

pub async fn create_note(
    State(state): State<AppState>,
    Json(input): Json<CreateNoteInput>,
) -> Result<impl IntoResponse, ApiError> {
    input.validate()?;
    let note = state.notes.create(input).await?;
    Ok((StatusCode::CREATED, Json(NoteResponse::from(note))))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateNoteInput>,
) -> Result<Json<NoteResponse>, ApiError> {
    let id = parse_note_id(&id)?;
    let note = state
        .notes
        .update(id, &input)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(note.into()))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_note_id(&id)?;
    state.notes.delete(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "message": "Note deleted successfully" })))
}

fn parse_note_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::InvalidId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_id_accepts_hex() {
        let id = ObjectId::new();
        assert_eq!(parse_note_id(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn test_parse_note_id_rejects_garbage() {
        assert!(matches!(parse_note_id("not-an-id"), Err(ApiError::InvalidId)));
        assert!(matches!(parse_note_id(""), Err(ApiError::InvalidId)));
    }
}
