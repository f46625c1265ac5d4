use std::{
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use log::{debug, error, info, trace, warn};
use serde_json::{Map, Value};
use walkdir::WalkDir;

use super::{merge_fields, CollectionPath, DocPath, Document, DocumentStore};
use crate::{read_json_file, write_json_atomic, PrepaseError, Result};

/// Document store keeping one pretty-printed JSON file per document.
///
/// `users/alice/notes/n1` lives at `<root>/users/alice/notes/n1.json`, so a
/// user document and the directory holding its sub-collections sit side by
/// side (`alice.json` next to `alice/`).
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            debug!("Store directory does not exist, creating: {}", root.display());
            fs::create_dir_all(&root).map_err(|e| {
                error!("Failed to create store directory: {}", e);
                PrepaseError::DirectoryError { path: root.clone() }
            })?;
        }
        info!("Opened document store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn doc_file(&self, path: &DocPath) -> PathBuf {
        let mut file = self.root.clone();
        let segments = path.segments();
        if let Some((last, parents)) = segments.split_last() {
            for segment in parents {
                file.push(segment);
            }
            file.push(format!("{}.json", last));
        }
        file
    }

    fn collection_dir(&self, collection: &CollectionPath) -> PathBuf {
        collection
            .segments()
            .iter()
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Value>> {
        let file = self.doc_file(path);
        if !file.exists() {
            trace!("No document at {}", path);
            return Ok(None);
        }
        read_json_file(&file).map(Some)
    }

    async fn set(&self, path: &DocPath, data: Value) -> Result<()> {
        debug!("Writing document {}", path);
        write_json_atomic(&self.doc_file(path), &data)
    }

    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> Result<()> {
        let file = self.doc_file(path);
        if !file.exists() {
            error!("Cannot update {}: document does not exist", path);
            return Err(PrepaseError::DocumentNotFound {
                path: path.to_string(),
            });
        }
        let mut current: Value = read_json_file(&file)?;
        merge_fields(&mut current, fields);
        debug!("Updating document {}", path);
        write_json_atomic(&file, &current)
    }

    async fn delete(&self, path: &DocPath) -> Result<bool> {
        let file = self.doc_file(path);
        if !file.exists() {
            debug!("Nothing to delete at {}", path);
            return Ok(false);
        }
        fs::remove_file(&file).map_err(|e| {
            error!("Failed to delete {}: {}", file.display(), e);
            PrepaseError::Io(e)
        })?;
        info!("Deleted document {}", path);
        Ok(true)
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            debug!("Collection {} is empty", collection);
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let Some(id) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            match read_json_file::<Value>(path) {
                Ok(data) => documents.push(Document { id, data }),
                Err(e) => warn!("Skipping unreadable document {}: {}", path.display(), e),
            }
        }

        debug!("Listed {} documents in {}", documents.len(), collection);
        Ok(documents)
    }
}
