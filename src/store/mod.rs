//! Document database contract.
//!
//! Documents are JSON objects addressed by slash-separated paths of the form
//! `users/{username}`, `users/{username}/notes/{noteId}` and
//! `users/{username}/ttf/{fontId}`. A collection is every document one level
//! below a collection path.

mod file;
mod memory;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{PrepaseError, Result};

pub use file::FileStore;
pub use memory::MemoryStore;

const USERS: &str = "users";
const NOTES: &str = "notes";
const FONTS: &str = "ttf";

fn checked_segment(segment: &str) -> Result<String> {
    if segment.is_empty() || segment.contains('/') || segment == "." || segment == ".." {
        return Err(PrepaseError::InvalidPath {
            segment: segment.to_string(),
        });
    }
    Ok(segment.to_string())
}

/// Path of a collection, always an odd number of segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    pub fn users() -> Self {
        Self {
            segments: vec![USERS.to_string()],
        }
    }

    /// `users/{username}/notes`
    pub fn notes(username: &str) -> Result<Self> {
        Ok(Self {
            segments: vec![USERS.to_string(), checked_segment(username)?, NOTES.to_string()],
        })
    }

    /// `users/{username}/ttf`
    pub fn fonts(username: &str) -> Result<Self> {
        Ok(Self {
            segments: vec![USERS.to_string(), checked_segment(username)?, FONTS.to_string()],
        })
    }

    /// Path of the document `id` inside this collection
    pub fn doc(&self, id: &str) -> Result<DocPath> {
        let mut segments = self.segments.clone();
        segments.push(checked_segment(id)?);
        Ok(DocPath { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Path of a single document, always an even number of segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    segments: Vec<String>,
}

impl DocPath {
    /// `users/{username}`
    pub fn user(username: &str) -> Result<Self> {
        CollectionPath::users().doc(username)
    }

    /// `users/{username}/notes/{noteId}`
    pub fn note(username: &str, note_id: &str) -> Result<Self> {
        CollectionPath::notes(username)?.doc(note_id)
    }

    /// `users/{username}/ttf/{fontId}`
    pub fn font(username: &str, font_id: &str) -> Result<Self> {
        CollectionPath::fonts(username)?.doc(font_id)
    }

    /// Last segment, the document key
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Collection holding this document
    pub fn parent(&self) -> CollectionPath {
        let mut segments = self.segments.clone();
        segments.pop();
        CollectionPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// A document read back from a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Minimal document database: point reads and writes plus collection scans.
/// There are no transactions; the last writer wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads one document, `None` if absent
    async fn get(&self, path: &DocPath) -> Result<Option<Value>>;

    /// Creates or overwrites a document
    async fn set(&self, path: &DocPath, data: Value) -> Result<()>;

    /// Merges `fields` into an existing document.
    /// Fails with [`PrepaseError::DocumentNotFound`] when nothing is stored at `path`.
    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> Result<()>;

    /// Removes a document, returning whether one existed
    async fn delete(&self, path: &DocPath) -> Result<bool>;

    /// Inserts a document under a generated id and returns the id
    async fn add(&self, collection: &CollectionPath, data: Value) -> Result<String> {
        let id = generate_id();
        self.set(&collection.doc(&id)?, data).await?;
        Ok(id)
    }

    /// All documents directly inside `collection`, in no particular order
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>>;
}

/// Generated document key: 20 lowercase hex characters
pub fn generate_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(20);
    id
}

/// Shallow merge of `fields` into `target`; non-object targets are replaced
pub(crate) fn merge_fields(target: &mut Value, fields: Map<String, Value>) {
    match target {
        Value::Object(existing) => existing.extend(fields),
        other => *other = Value::Object(fields),
    }
}
