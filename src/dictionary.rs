//! Word lookups against a free dictionary API.
use std::time::Duration;

use log::{debug, error, info};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{analysis::with_trailing_slash, PrepaseError, Result};

/// Lookups give up after this long
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meaning {
    #[serde(default)]
    pub part_of_speech: String,
    #[serde(default)]
    pub definitions: Vec<Definition>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Entry {
    word: String,
    #[serde(default)]
    phonetic: Option<String>,
    #[serde(default)]
    meanings: Vec<Meaning>,
}

/// What the word screen shows: the first entry plus every synonym and
/// antonym found anywhere in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordInfo {
    pub word: String,
    pub phonetic: String,
    pub meanings: Vec<Meaning>,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
}

impl WordInfo {
    fn from_entry(entry: Entry) -> Self {
        let mut synonyms = Vec::new();
        let mut antonyms = Vec::new();
        for meaning in &entry.meanings {
            push_unique(&mut synonyms, &meaning.synonyms);
            push_unique(&mut antonyms, &meaning.antonyms);
            for definition in &meaning.definitions {
                push_unique(&mut synonyms, &definition.synonyms);
                push_unique(&mut antonyms, &definition.antonyms);
            }
        }
        WordInfo {
            word: entry.word,
            phonetic: entry.phonetic.unwrap_or_default(),
            meanings: entry.meanings,
            synonyms,
            antonyms,
        }
    }
}

fn push_unique(into: &mut Vec<String>, words: &[String]) {
    for word in words {
        if !into.contains(word) {
            into.push(word.clone());
        }
    }
}

/// Client for `GET {base}/{word}` dictionary lookups
#[derive(Debug, Clone)]
pub struct DictionaryClient {
    client: Client,
    base_url: Url,
}

impl DictionaryClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    pub async fn lookup(&self, word: &str) -> Result<WordInfo> {
        let word = word.trim();
        if word.is_empty() {
            return Err(PrepaseError::validation("Please enter a word"));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PrepaseError::ConfigError {
                message: format!("Dictionary URL cannot take a path: {}", self.base_url),
            })?
            .pop_if_empty()
            .push(word);
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!("Dictionary lookup for {} failed: {}", word, e);
                PrepaseError::Http(e)
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(PrepaseError::WordNotFound {
                    word: word.to_string(),
                })
            }
            status if !status.is_success() => {
                return Err(PrepaseError::Backend {
                    endpoint: "dictionary".to_string(),
                    message: format!("Server responded with status: {}", status.as_u16()),
                })
            }
            _ => {}
        }

        let entries: Vec<Entry> = response.json().await?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| PrepaseError::WordNotFound {
                word: word.to_string(),
            })?;

        info!("Found dictionary entry for {}", entry.word);
        Ok(WordInfo::from_entry(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    async fn spawn_dictionary() -> Url {
        let router = Router::new().route(
            "/api/v2/entries/en/{word}",
            get(|Path(word): Path<String>| async move {
                if word != "happy" {
                    return Err(StatusCode::NOT_FOUND);
                }
                Ok(Json(json!([{
                    "word": "happy",
                    "phonetic": "/ˈhæpi/",
                    "meanings": [{
                        "partOfSpeech": "adjective",
                        "synonyms": ["glad", "cheerful"],
                        "antonyms": ["sad"],
                        "definitions": [{
                            "definition": "Feeling pleasure.",
                            "synonyms": ["cheerful", "content"],
                            "antonyms": ["unhappy", "sad"]
                        }]
                    }]
                }])))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{}/api/v2/entries/en", addr)).unwrap()
    }

    #[tokio::test]
    async fn gathers_unique_synonyms_and_antonyms() {
        let dictionary = DictionaryClient::new(spawn_dictionary().await, DEFAULT_LOOKUP_TIMEOUT)
            .unwrap();

        let info = dictionary.lookup(" happy ").await.unwrap();

        assert_eq!(info.word, "happy");
        assert_eq!(info.meanings[0].part_of_speech, "adjective");
        assert_eq!(info.synonyms, ["glad", "cheerful", "content"]);
        assert_eq!(info.antonyms, ["sad", "unhappy"]);
    }

    #[tokio::test]
    async fn unknown_words_are_reported() {
        let dictionary = DictionaryClient::new(spawn_dictionary().await, DEFAULT_LOOKUP_TIMEOUT)
            .unwrap();

        assert!(matches!(
            dictionary.lookup("qwzx").await,
            Err(PrepaseError::WordNotFound { .. })
        ));
        assert!(matches!(
            dictionary.lookup("  ").await,
            Err(PrepaseError::Validation { .. })
        ));
    }
}
