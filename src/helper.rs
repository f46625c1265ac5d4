use std::{
    fs,
    io::Write,
    path::Path,
};

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, error, trace};
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

use crate::{PrepaseError, Result};

/// Helper method to load a JSON document from file
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Loading JSON from file: {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| {
        error!("Failed to open file {}: {}", path.display(), e);
        PrepaseError::Io(e)
    })?;

    let value = serde_json::from_str(&content).map_err(|e| {
        error!("Failed to parse {}: {}", path.display(), e);
        PrepaseError::Serialization(e)
    })?;

    trace!("Successfully loaded {}", path.display());
    Ok(value)
}

/// Writes a value as pretty JSON through a temporary file so readers never
/// observe a half written document
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    if !dir.exists() {
        debug!("Creating parent directory: {}", dir.display());
        fs::create_dir_all(dir).map_err(|e| {
            error!("Failed to create directory {}: {}", dir.display(), e);
            PrepaseError::DirectoryError {
                path: dir.to_path_buf(),
            }
        })?;
    }

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
        error!("Failed to create temporary file: {}", e);
        PrepaseError::Io(e)
    })?;

    let json = serde_json::to_string_pretty(value)?;
    temp_file.write_all(json.as_bytes())?;
    temp_file.flush()?;

    temp_file.persist(path).map_err(|e| {
        error!("Failed to persist file {}: {}", path.display(), e.error);
        PrepaseError::Io(e.error)
    })?;

    trace!("Wrote {}", path.display());
    Ok(())
}

/// Current time in the ISO-8601 form stored in `timeStamp` fields
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a stored `timeStamp`; anything unparseable yields `None`
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Trims and falls back to `default` when nothing is left
pub fn trimmed_or(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Cuts text to at most `max_chars` characters, appending an ellipsis when cut
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
