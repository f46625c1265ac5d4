//! Note and font records as they are persisted in the document store.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{helper::parse_timestamp, trimmed_or, Document, PrepaseError, Result};

/// Title given to notes created without one by the import and share flows
pub const UNTITLED_NOTE: &str = "Untitled Note";

/// Source recorded for imported notes without a file name
pub const MANUAL_ENTRY: &str = "Manual Entry";

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Document key inside the owner's notes collection
    #[serde(default)]
    pub id: String,
    #[serde(rename = "noteTitle", default)]
    pub title: String,
    #[serde(rename = "noteContent", default)]
    pub content: String,
    /// ISO-8601 creation time, kept as the raw stored string
    #[serde(rename = "timeStamp", default)]
    pub timestamp: String,
    /// Where the note came from (file name for imported notes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Body of a note document; the id is the document key and is not stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NoteBody {
    #[serde(rename = "noteTitle", default)]
    title: String,
    #[serde(rename = "noteContent", default)]
    content: String,
    #[serde(rename = "timeStamp", default)]
    timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl Note {
    /// Builds a note from a stored document
    pub fn from_document(doc: Document) -> Result<Self> {
        let body: NoteBody = serde_json::from_value(doc.data)?;
        Ok(Note {
            id: doc.id,
            title: body.title,
            content: body.content,
            timestamp: body.timestamp,
            source: body.source,
        })
    }

    /// Document body written to the store
    pub fn to_document(&self) -> Result<Value> {
        let body = NoteBody {
            title: self.title.clone(),
            content: self.content.clone(),
            timestamp: self.timestamp.clone(),
            source: self.source.clone(),
        };
        Ok(serde_json::to_value(body)?)
    }

    /// Parsed creation time, `None` for missing or malformed timestamps
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Sort key: milliseconds since the epoch, 0 when the timestamp is unusable
    pub fn sort_key(&self) -> i64 {
        self.created_at().map(|t| t.timestamp_millis()).unwrap_or(0)
    }
}

/// A note about to be inserted. The constructors apply the trimming and
/// defaulting rules of each creation flow.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub source: Option<String>,
}

impl NewNote {
    /// Note typed in by the user. Both fields are trimmed; at least one of them
    /// must be non-empty.
    pub fn manual(title: &str, content: &str) -> Result<Self> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() && content.is_empty() {
            return Err(PrepaseError::validation(
                "Note title and content cannot both be empty",
            ));
        }
        Ok(NewNote {
            title: title.to_string(),
            content: content.to_string(),
            source: None,
        })
    }

    /// Note extracted from a text file. Content is required.
    pub fn imported(title: &str, content: &str, source: Option<&str>) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(PrepaseError::validation(
                "Please extract text from a file first",
            ));
        }
        Ok(NewNote {
            title: trimmed_or(title, UNTITLED_NOTE),
            content: content.trim().to_string(),
            source: Some(trimmed_or(source.unwrap_or_default(), MANUAL_ENTRY)),
        })
    }

    /// Note made from text extracted out of an image. Title is required.
    pub fn extracted(title: &str, content: &str) -> Result<Self> {
        if title.trim().is_empty() {
            return Err(PrepaseError::validation("Please provide a note title"));
        }
        Ok(NewNote {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
            source: None,
        })
    }

    /// Copy of somebody else's note being saved into one's own collection
    pub fn copied_from(note: &Note) -> Self {
        NewNote {
            title: trimmed_or(&note.title, UNTITLED_NOTE),
            content: note.content.trim().to_string(),
            source: None,
        }
    }

    /// Materializes the note with its generated id and creation time
    pub fn into_note(self, id: String, timestamp: String) -> Note {
        Note {
            id,
            title: self.title,
            content: self.content,
            timestamp,
            source: self.source,
        }
    }
}

/// Handwriting font uploaded by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Public object-store URL of the TTF file
    #[serde(default)]
    pub link: String,
    #[serde(rename = "timeStamp", default)]
    pub timestamp: String,
}

impl FontRecord {
    pub fn from_document(doc: Document) -> Result<Self> {
        let mut font: FontRecord = serde_json::from_value(doc.data)?;
        font.id = doc.id;
        Ok(font)
    }

    pub fn to_document(&self) -> Value {
        serde_json::json!({
            "title": self.title,
            "link": self.link,
            "timeStamp": self.timestamp,
        })
    }

    pub fn sort_key(&self) -> i64 {
        parse_timestamp(&self.timestamp)
            .map(|t| t.timestamp_millis())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn note_document_uses_camel_case_fields() {
        let note = Note {
            id: "abc".into(),
            title: "Groceries".into(),
            content: "milk".into(),
            timestamp: "2024-01-01T00:00:00.000Z".into(),
            source: None,
        };
        let doc = note.to_document().unwrap();

        assert_eq!(
            doc,
            json!({
                "noteTitle": "Groceries",
                "noteContent": "milk",
                "timeStamp": "2024-01-01T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn from_document_tolerates_missing_fields() {
        let note = Note::from_document(Document {
            id: "n1".into(),
            data: json!({"noteTitle": "only title"}),
        })
        .unwrap();

        assert_eq!(note.id, "n1");
        assert_eq!(note.content, "");
        assert_eq!(note.sort_key(), 0);
    }

    #[test]
    fn manual_notes_need_some_text() {
        assert!(matches!(
            NewNote::manual("  ", "\n"),
            Err(PrepaseError::Validation { .. })
        ));
        let note = NewNote::manual(" Title ", "").unwrap();
        assert_eq!(note.title, "Title");
    }

    #[test]
    fn imported_notes_get_defaults() {
        let note = NewNote::imported("", " body ", None).unwrap();
        assert_eq!(note.title, UNTITLED_NOTE);
        assert_eq!(note.content, "body");
        assert_eq!(note.source.as_deref(), Some(MANUAL_ENTRY));

        assert!(NewNote::imported("t", "  ", Some("a.txt")).is_err());
    }

    #[test]
    fn extracted_notes_need_a_title() {
        assert!(NewNote::extracted(" ", "text").is_err());
        assert_eq!(NewNote::extracted("Scan", " text ").unwrap().content, "text");
    }

    #[test]
    fn copies_of_untitled_notes_get_a_title() {
        let shared = Note {
            id: "x".into(),
            title: "   ".into(),
            content: " shared body ".into(),
            timestamp: String::new(),
            source: Some("notes.txt".into()),
        };
        let copy = NewNote::copied_from(&shared);
        assert_eq!(copy.title, UNTITLED_NOTE);
        assert_eq!(copy.content, "shared body");
        assert_eq!(copy.source, None);
    }
}
