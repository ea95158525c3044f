//! Persistence layer for notes.
//!
//! A thin wrapper over one MongoDB collection. Queries are pass-through; no
//! caching and no in-process state beyond the collection handle.

use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::ReturnDocument;
use mongodb::Collection;

use super::model::{CreateNoteInput, Note, UpdateNoteInput};

/// Repository over the notes collection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NoteRepository {
    collection: Collection<Note>,
}

impl NoteRepository {
    pub fn new(collection: Collection<Note>) -> Self {
        Self { collection }
    }

    /// All notes, newest first.
    pub async fn list(&self) -> mongodb::error::Result<Vec<Note>> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .await?;
        cursor.try_collect().await
    }

    pub async fn get(&self, id: ObjectId) -> mongodb::error::Result<Option<Note>> {
        self.collection.find_one(doc! { "_id": id }).await
    }

    pub async fn create(&self, input: CreateNoteInput) -> mongodb::error::Result<Note> {
        let now = DateTime::now();
        let mut note = Note {
            id: None,
            title: input.title,
            content: input.content,
            completed: false,
            created_at: now,
            updated_at: now,
        };

        let result = self.collection.insert_one(&note).await?;
        note.id = result.inserted_id.as_object_id();
        Ok(note)
    }

    /// Apply a partial update and return the post-update document.
    pub async fn update(
        &self,
        id: ObjectId,
        input: &UpdateNoteInput,
    ) -> mongodb::error::Result<Option<Note>> {
        self.collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": update_fields(input) })
            .return_document(ReturnDocument::After)
            .await
    }

    pub async fn delete(&self, id: ObjectId) -> mongodb::error::Result<Option<Note>> {
        self.collection.find_one_and_delete(doc! { "_id": id }).await
    }
}

/// Build the `$set` document for a partial update. `updatedAt` is always
/// refreshed, even when no other field changes.
fn update_fields(input: &UpdateNoteInput) -> Document {
    let mut fields = doc! { "updatedAt": DateTime::now() };
    if let Some(title) = &input.title {
        fields.insert("title", title.as_str());
    }
    if let Some(content) = &input.content {
        fields.insert("content", content.as_str());
    }
    if let Some(completed) = input.completed {
        fields.insert("completed", completed);
    }
    fields
}
