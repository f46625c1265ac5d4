//! Handwriting fonts: TTF uploads and the per-user records pointing at them.
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use url::Url;

use crate::{
    iso_timestamp, unique_object_name, upload_bytes, CollectionPath, DocPath, Document,
    DocumentStore, FontRecord, ObjectStore, PrepaseError, Result,
};

const FONT_CONTENT_TYPE: &str = "font/ttf";

#[derive(Clone)]
pub struct FontLibrary {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
}

impl FontLibrary {
    pub fn new(store: Arc<dyn DocumentStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, objects }
    }

    /// A user's fonts, most recently added first
    pub async fn list_fonts(&self, username: &str) -> Result<Vec<FontRecord>> {
        let documents = self.store.list(&CollectionPath::fonts(username)?).await?;
        let mut fonts = documents
            .into_iter()
            .map(FontRecord::from_document)
            .collect::<Result<Vec<_>>>()?;
        fonts.sort_by_key(|font| std::cmp::Reverse(font.sort_key()));
        debug!("{} has {} fonts", username, fonts.len());
        Ok(fonts)
    }

    pub async fn get_font(&self, username: &str, font_id: &str) -> Result<FontRecord> {
        let data = self
            .store
            .get(&DocPath::font(username, font_id)?)
            .await?
            .ok_or_else(|| PrepaseError::FontNotFound {
                id: font_id.to_string(),
            })?;
        FontRecord::from_document(Document {
            id: font_id.to_string(),
            data,
        })
    }

    /// Records an uploaded font. The title is required and the link must be
    /// an absolute URL.
    pub async fn add_font(&self, username: &str, title: &str, link: &str) -> Result<FontRecord> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PrepaseError::validation(
                "Please enter a title for your font file",
            ));
        }
        let link = Url::parse(link.trim())
            .map_err(|_| PrepaseError::validation("Please upload a font file first"))?;

        let mut font = FontRecord {
            id: String::new(),
            title: title.to_string(),
            link: link.to_string(),
            timestamp: iso_timestamp(Utc::now()),
        };
        font.id = self
            .store
            .add(&CollectionPath::fonts(username)?, font.to_document())
            .await?;

        info!("Font {} added for {}", font.id, username);
        Ok(font)
    }

    /// Uploads TTF bytes under a unique name and returns their public URL
    pub async fn upload_font(&self, file_name: &str, bytes: Vec<u8>) -> Result<Url> {
        if bytes.is_empty() {
            return Err(PrepaseError::validation("Font file is empty"));
        }
        let stem = file_name
            .rsplit('/')
            .next()
            .unwrap_or(file_name)
            .trim_end_matches(".ttf")
            .replace(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_', "_");
        let stem = if stem.is_empty() { "font".to_string() } else { stem };
        let path = unique_object_name(&stem, "ttf");
        upload_bytes(self.objects.as_ref(), &path, bytes, FONT_CONTENT_TYPE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryObjectStore, MemoryStore};

    fn library() -> (MemoryObjectStore, FontLibrary) {
        let objects = MemoryObjectStore::new(
            "fonts",
            Url::parse("https://cdn.example.test/public/").unwrap(),
        );
        let library = FontLibrary::new(Arc::new(MemoryStore::new()), Arc::new(objects.clone()));
        (objects, library)
    }

    #[tokio::test]
    async fn uploaded_fonts_can_be_registered_and_listed() {
        let (objects, fonts) = library();

        let url = fonts.upload_font("My Hand.ttf", vec![0, 1, 2]).await.unwrap();
        assert!(url.as_str().starts_with("https://cdn.example.test/public/fonts/My_Hand_"));
        let path = url.path().trim_start_matches("/public/fonts/");
        assert_eq!(objects.get(path).unwrap().content_type, "font/ttf");

        let record = fonts.add_font("alice", " Mine ", url.as_str()).await.unwrap();
        let listed = fonts.list_fonts("alice").await.unwrap();
        assert_eq!(listed, vec![record.clone()]);
        assert_eq!(fonts.get_font("alice", &record.id).await.unwrap().title, "Mine");
    }

    #[tokio::test]
    async fn fonts_need_a_title_and_a_link() {
        let (_, fonts) = library();
        assert!(fonts.add_font("alice", "", "https://x/y.ttf").await.is_err());
        assert!(fonts.add_font("alice", "t", "not a url").await.is_err());
        assert!(matches!(
            fonts.get_font("alice", "missing").await,
            Err(PrepaseError::FontNotFound { .. })
        ));
    }
}
