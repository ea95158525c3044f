//! The notes resource: data model, persistence, and HTTP surface.

mod handlers;
mod model;
mod repository;
mod routes;

pub use handlers::AppState;
pub use model::{CreateNoteInput, Note, NoteResponse, UpdateNoteInput};
pub use repository::NoteRepository;
pub use routes::notes_router;
