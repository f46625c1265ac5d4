//! Sharing notes through typed codes.
//!
//! A sharing code is the plain string `{owner},__,{noteId}`. It is not signed
//! and does not expire: whoever holds it can read the note.
use std::{fmt, str::FromStr, time::Duration};

use log::{debug, info, warn};

use crate::{NewNote, Note, NoteStorage, OperationCell, PrepaseError, Result, Status};

/// Separator between owner and note id inside a sharing code
pub const SHARING_DELIMITER: &str = ",__,";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharingCode {
    pub owner: String,
    pub note_id: String,
}

impl SharingCode {
    pub fn new(owner: impl Into<String>, note_id: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            note_id: note_id.into(),
        }
    }

    /// Text handed to other apps when sharing a note
    pub fn share_message(&self) -> String {
        format!(
            "Paste this code to access the note shared by *{}*, code: *{}*",
            self.owner, self
        )
    }
}

impl fmt::Display for SharingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.owner, SHARING_DELIMITER, self.note_id)
    }
}

impl FromStr for SharingCode {
    type Err = PrepaseError;

    fn from_str(raw: &str) -> Result<Self> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(PrepaseError::validation("Please enter a sharing code"));
        }
        let parts: Vec<&str> = code.split(SHARING_DELIMITER).collect();
        match parts.as_slice() {
            [owner, note_id] if !owner.trim().is_empty() && !note_id.trim().is_empty() => {
                Ok(SharingCode::new(owner.trim(), note_id.trim()))
            }
            _ => Err(PrepaseError::InvalidSharingCode {
                code: code.to_string(),
            }),
        }
    }
}

/// A note read through a sharing code
#[derive(Debug, Clone, PartialEq)]
pub struct SharedNote {
    pub owner: String,
    pub note: Note,
}

/// Generates, resolves and adopts shared notes. Resolving and adopting are
/// guarded so a repeated trigger while one is in flight is refused.
#[derive(Clone)]
pub struct SharingDesk {
    notes: NoteStorage,
    access: OperationCell<SharedNote>,
    adopt: OperationCell<Note>,
}

impl SharingDesk {
    pub fn new(notes: NoteStorage) -> Self {
        Self {
            notes,
            access: OperationCell::new("Accessing the shared note"),
            adopt: OperationCell::new("Adding the shared note"),
        }
    }

    /// Failed access or adopt runs clear back to idle after `delay`
    pub fn reset_issue_after(self, delay: Duration) -> Self {
        Self {
            access: self.access.reset_issue_after(delay),
            adopt: self.adopt.reset_issue_after(delay),
            ..self
        }
    }

    pub fn access_status(&self) -> Status {
        self.access.status()
    }

    pub fn adopt_status(&self) -> Status {
        self.adopt.status()
    }

    /// Sharing code for one of `username`'s notes
    pub async fn generate(&self, username: &str, note_id: &str) -> Result<SharingCode> {
        let note = self.notes.get_note(username, note_id).await?;
        let code = SharingCode::new(username, note.id);
        info!("Generated sharing code {}", code);
        Ok(code)
    }

    /// Fetches the note a code points at. Malformed codes are rejected before
    /// any lookup.
    pub async fn access(&self, raw_code: &str) -> Result<SharedNote> {
        let code: SharingCode = raw_code.parse().map_err(|e| {
            warn!("Rejected sharing code '{}': {}", raw_code.trim(), e);
            e
        })?;
        self.access
            .run(async {
                debug!("Resolving note {} of {}", code.note_id, code.owner);
                let note = self.notes.get_note(&code.owner, &code.note_id).await?;
                Ok(SharedNote {
                    owner: code.owner.clone(),
                    note,
                })
            })
            .await
    }

    /// Copies a shared note into `username`'s own collection
    pub async fn adopt(&self, username: &str, shared: &SharedNote) -> Result<Note> {
        self.adopt
            .run(async {
                let copy = self
                    .notes
                    .add_note(username, NewNote::copied_from(&shared.note))
                    .await?;
                info!(
                    "{} added note {} shared by {} as {}",
                    username, shared.note.id, shared.owner, copy.id
                );
                Ok(copy)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DocumentStore, MemoryStore, NoteQuery};
    use std::sync::Arc;

    #[test]
    fn codes_render_with_the_fixed_delimiter() {
        let code = SharingCode::new("alice", "n1");
        assert_eq!(code.to_string(), "alice,__,n1");
        assert_eq!(" alice,__,n1 ".parse::<SharingCode>().unwrap(), code);
        assert!(code.share_message().contains("*alice,__,n1*"));
    }

    #[test]
    fn malformed_codes_are_rejected() {
        for raw in ["alice-n1", "a,__,b,__,c", ",__,n1", "alice,__,"] {
            assert!(
                matches!(
                    raw.parse::<SharingCode>(),
                    Err(PrepaseError::InvalidSharingCode { .. })
                ),
                "{raw} should be rejected"
            );
        }
        assert!(matches!(
            "  ".parse::<SharingCode>(),
            Err(PrepaseError::Validation { .. })
        ));
    }

    /// Counts reads so tests can tell whether a lookup happened
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        reads: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl DocumentStore for CountingStore {
        async fn get(&self, path: &crate::DocPath) -> Result<Option<serde_json::Value>> {
            self.reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.get(path).await
        }
        async fn set(&self, path: &crate::DocPath, data: serde_json::Value) -> Result<()> {
            self.inner.set(path, data).await
        }
        async fn update(
            &self,
            path: &crate::DocPath,
            fields: serde_json::Map<String, serde_json::Value>,
        ) -> Result<()> {
            self.inner.update(path, fields).await
        }
        async fn delete(&self, path: &crate::DocPath) -> Result<bool> {
            self.inner.delete(path).await
        }
        async fn list(&self, collection: &crate::CollectionPath) -> Result<Vec<crate::Document>> {
            self.inner.list(collection).await
        }
    }

    #[tokio::test]
    async fn codes_resolve_and_can_be_adopted() {
        let notes = NoteStorage::new(Arc::new(MemoryStore::new()));
        let original = notes
            .add_note("alice", NewNote::manual("Recipe", "flour").unwrap())
            .await
            .unwrap();
        let desk = SharingDesk::new(notes.clone());

        let code = desk.generate("alice", &original.id).await.unwrap();
        let shared = desk.access(&code.to_string()).await.unwrap();
        assert_eq!(shared.owner, "alice");
        assert_eq!(shared.note, original);

        let copy = desk.adopt("bob", &shared).await.unwrap();
        assert_ne!(copy.id, original.id);
        let bobs = notes.list_notes("bob", &NoteQuery::default()).await.unwrap();
        assert_eq!(bobs, vec![copy]);
        assert_eq!(bobs[0].title, "Recipe");
    }

    #[tokio::test]
    async fn malformed_codes_never_reach_the_store() {
        let store = Arc::new(CountingStore::default());
        let desk = SharingDesk::new(NoteStorage::new(store.clone()));

        let result = desk.access("alice;n1").await;

        assert!(matches!(result, Err(PrepaseError::InvalidSharingCode { .. })));
        assert_eq!(store.reads.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_notes_are_not_found() {
        let desk = SharingDesk::new(NoteStorage::new(Arc::new(MemoryStore::new())));
        assert!(matches!(
            desk.access("alice,__,nope").await,
            Err(PrepaseError::NoteNotFound { .. })
        ));
        assert!(matches!(
            desk.generate("alice", "nope").await,
            Err(PrepaseError::NoteNotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_access_clears_after_the_delay() {
        let desk = SharingDesk::new(NoteStorage::new(Arc::new(MemoryStore::new())))
            .reset_issue_after(std::time::Duration::from_secs(3));

        let missing = desk.access("alice,__,nope").await;
        assert!(matches!(missing, Err(PrepaseError::NoteNotFound { .. })));
        assert_eq!(desk.access_status(), Status::Issue);

        tokio::time::sleep(std::time::Duration::from_secs(4)).await;
        assert_eq!(desk.access_status(), Status::Default);
        assert_eq!(desk.adopt_status(), Status::Default);
    }
}
