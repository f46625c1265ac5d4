use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, trace};
use serde_json::{Map, Value};

use crate::{
    iso_timestamp, CollectionPath, DocPath, DocumentStore, NewNote, Note, NoteQuery,
    PrepaseError, Result, SortOrder,
};

/// Manages the notes of every user inside a document store.
///
/// Notes live at `users/{username}/notes/{noteId}`. Reads scan the whole
/// collection and filter/sort on the client; writes are point operations.
#[derive(Clone)]
pub struct NoteStorage {
    store: Arc<dyn DocumentStore>,
}

impl NoteStorage {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Inserts a note with a generated id stamped with the current time
    pub async fn add_note(&self, username: &str, new_note: NewNote) -> Result<Note> {
        info!("Adding note for {}", username);
        let collection = CollectionPath::notes(username)?;
        let timestamp = iso_timestamp(Utc::now());

        let draft = new_note.into_note(String::new(), timestamp);
        let id = self.store.add(&collection, draft.to_document()?).await?;

        debug!("Note added for {} with the id {}", username, id);
        Ok(Note { id, ..draft })
    }

    /// Retrieves a note by its ID
    pub async fn get_note(&self, username: &str, note_id: &str) -> Result<Note> {
        debug!("Retrieving note {} of {}", note_id, username);
        let path = DocPath::note(username, note_id)?;
        match self.store.get(&path).await? {
            Some(data) => Note::from_document(crate::Document {
                id: note_id.to_string(),
                data,
            }),
            None => {
                debug!("Note not found: {}", path);
                Err(PrepaseError::NoteNotFound {
                    id: note_id.to_string(),
                })
            }
        }
    }

    /// All notes of a user matching `query`
    pub async fn list_notes(&self, username: &str, query: &NoteQuery) -> Result<Vec<Note>> {
        let documents = self.store.list(&CollectionPath::notes(username)?).await?;
        debug!("Fetched {} note documents for {}", documents.len(), username);

        let mut notes = Vec::with_capacity(documents.len());
        for doc in documents {
            let id = doc.id.clone();
            match Note::from_document(doc) {
                Ok(note) => notes.push(note),
                Err(e) => error!("Skipping malformed note {}: {}", id, e),
            }
        }

        let mut notes = match query.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => filter_by_title(notes, term),
            _ => notes,
        };
        sort_notes(&mut notes, query.order);

        if let Some(limit) = query.limit {
            notes.truncate(limit);
        }

        info!("Returning {} notes for {}", notes.len(), username);
        Ok(notes)
    }

    /// Number of notes a user owns
    pub async fn count_notes(&self, username: &str) -> Result<usize> {
        Ok(self
            .store
            .list(&CollectionPath::notes(username)?)
            .await?
            .len())
    }

    /// Replaces title and content of a note. Id, timestamp and source stay
    /// untouched.
    pub async fn update_note(
        &self,
        username: &str,
        note_id: &str,
        title: &str,
        content: &str,
    ) -> Result<Note> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(PrepaseError::validation(
                "Note title and content cannot be empty",
            ));
        }

        let path = DocPath::note(username, note_id)?;
        let mut fields = Map::new();
        fields.insert("noteTitle".to_string(), Value::String(title.to_string()));
        fields.insert("noteContent".to_string(), Value::String(content.to_string()));

        self.store
            .update(&path, fields)
            .await
            .map_err(|e| match e {
                PrepaseError::DocumentNotFound { .. } => PrepaseError::NoteNotFound {
                    id: note_id.to_string(),
                },
                other => other,
            })?;

        info!("Note updated: {}", path);
        self.get_note(username, note_id).await
    }

    /// Deletes a note
    pub async fn delete_note(&self, username: &str, note_id: &str) -> Result<()> {
        info!("Deleting note {} of {}", note_id, username);
        let path = DocPath::note(username, note_id)?;
        if !self.store.delete(&path).await? {
            error!("Cannot delete note {}: Note not found", path);
            return Err(PrepaseError::NoteNotFound {
                id: note_id.to_string(),
            });
        }
        Ok(())
    }
}

/// Keeps notes whose title contains `term`, ignoring case
pub fn filter_by_title(notes: Vec<Note>, term: &str) -> Vec<Note> {
    let needle = term.to_lowercase();
    notes
        .into_iter()
        .filter(|note| note.title.to_lowercase().contains(&needle))
        .collect()
}

/// Sorts notes by timestamp. Notes without a usable timestamp count as the
/// epoch; ties keep their relative order.
pub fn sort_notes(notes: &mut [Note], order: SortOrder) {
    trace!("Sorting {} notes, {}", notes.len(), order);
    match order {
        SortOrder::Newest => notes.sort_by_key(|note| std::cmp::Reverse(note.sort_key())),
        SortOrder::Oldest => notes.sort_by_key(|note| note.sort_key()),
    }
}
