//! Client for the text analysis backend.
//!
//! Every endpoint takes a JSON `POST` and answers with an envelope whose
//! `status` is `"pass"` on success. Calls are never retried.
use std::{collections::BTreeMap, time::Duration};

use log::{debug, error, info, warn};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::{language_name, parse_probable_languages, PrepaseError, ProbableLanguage, Result};

const PASS: &[&str] = &["pass"];
const PASS_OR_SUCCESS: &[&str] = &["pass", "success"];

/// Target language used when none is chosen
pub const DEFAULT_TARGET_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDetection {
    pub language: String,
    /// Raw candidate list, e.g. `"[en:0.98, fr:0.02]"`
    #[serde(default)]
    pub probable_languages: String,
}

impl LanguageDetection {
    pub fn language_name(&self) -> String {
        language_name(&self.language)
    }

    pub fn candidates(&self) -> Vec<ProbableLanguage> {
        parse_probable_languages(&self.probable_languages)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub translated_text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub summarized_text: Option<String>,
    #[serde(default)]
    pub translated_summary: Option<String>,
}

impl Summary {
    /// The summary text, whichever field the backend filled in
    pub fn text(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .or(self.summarized_text.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub corrected_text: String,
}

/// Keywords found in a text, each mapped to whatever the backend says about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraInfo {
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl ExtraInfo {
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub extracted_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handwriting {
    pub file_url: String,
}

/// Detected language plus the summary written in that language
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSummary {
    pub detection: LanguageDetection,
    pub summary: Summary,
}

/// Diagram of a note and the English text it was drawn from, if translated
#[derive(Debug, Clone, PartialEq)]
pub struct Visualization {
    pub translated_text: Option<String>,
    pub diagram: Diagram,
}

/// HTTP client for the analysis backend
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    client: Client,
    base_url: Url,
}

impl AnalysisClient {
    /// Builds a client. The backend has no timeout unless one is given.
    pub fn new(base_url: Url, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
        accepted: &[&str],
    ) -> Result<T> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| PrepaseError::ConfigError {
                message: format!("Invalid backend URL for {}: {}", endpoint, e),
            })?;
        debug!("POST {}", url);

        let response = self.client.post(url).json(&body).send().await.map_err(|e| {
            error!("{} request failed: {}", endpoint, e);
            PrepaseError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("{} answered HTTP {}", endpoint, status);
            return Err(PrepaseError::Backend {
                endpoint: endpoint.to_string(),
                message: format!("HTTP error! Status: {}", status.as_u16()),
            });
        }

        let payload: Value = response.json().await?;
        let envelope_status = payload.get("status").and_then(Value::as_str).unwrap_or("");
        if !accepted.contains(&envelope_status) {
            let message = payload
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("status was '{}'", envelope_status));
            warn!("{} rejected the request: {}", endpoint, message);
            return Err(PrepaseError::Backend {
                endpoint: endpoint.to_string(),
                message,
            });
        }

        info!("{} succeeded", endpoint);
        serde_json::from_value(payload).map_err(|e| {
            error!("Unexpected {} payload: {}", endpoint, e);
            PrepaseError::Serialization(e)
        })
    }

    pub async fn detect_language(&self, text: &str) -> Result<LanguageDetection> {
        self.call("detect-language", json!({ "text": text }), PASS)
            .await
    }

    /// Translates `text`; a blank target falls back to English
    pub async fn translate(&self, text: &str, target_language: &str) -> Result<Translation> {
        let target = if target_language.trim().is_empty() {
            DEFAULT_TARGET_LANGUAGE
        } else {
            target_language.trim()
        };
        self.call(
            "translate",
            json!({ "text": text, "target_language": target }),
            PASS,
        )
        .await
    }

    pub async fn summarize(&self, text: &str, target_language: &str) -> Result<Summary> {
        self.call(
            "summarize",
            json!({ "text": text, "target_language": target_language }),
            PASS,
        )
        .await
    }

    pub async fn correct(&self, text: &str) -> Result<Correction> {
        self.call("correct", json!({ "text": text }), PASS).await
    }

    pub async fn extra_info(&self, text: &str) -> Result<ExtraInfo> {
        self.call("extra-info", json!({ "text": text }), PASS).await
    }

    pub async fn extract_text(&self, image_url: &Url) -> Result<ExtractedText> {
        self.call(
            "extract-text",
            json!({ "image_url": image_url.as_str() }),
            PASS,
        )
        .await
    }

    pub async fn generate_diagram(&self, text: &str) -> Result<Diagram> {
        self.call("generate-diagram", json!({ "text": text }), PASS_OR_SUCCESS)
            .await
    }

    pub async fn generate_handwriting(&self, text: &str, ttf_url: &str) -> Result<Handwriting> {
        self.call(
            "generate-handwriting",
            json!({ "text": text, "ttf_url": ttf_url }),
            PASS,
        )
        .await
    }

    /// Detects the language of `text`, then summarizes it in that language
    pub async fn summarize_note(&self, text: &str) -> Result<NoteSummary> {
        let detection = self.detect_language(text).await?;
        debug!("Detected language {}", detection.language);
        let summary = self.summarize(text, &detection.language).await?;
        Ok(NoteSummary { detection, summary })
    }

    /// Translates `text` to English and draws a diagram of it. When the
    /// backend rejects the translation the original text is drawn instead.
    pub async fn visualize_note(&self, text: &str) -> Result<Visualization> {
        let translated_text = match self.translate(text, DEFAULT_TARGET_LANGUAGE).await {
            Ok(translation) => Some(translation.translated_text),
            Err(PrepaseError::Backend { message, .. }) => {
                warn!("Translation failed ({}), using original text", message);
                None
            }
            Err(e) => return Err(e),
        };
        let diagram = self
            .generate_diagram(translated_text.as_deref().unwrap_or(text))
            .await?;
        Ok(Visualization {
            translated_text,
            diagram,
        })
    }
}

/// Appends a trailing slash so endpoint joins keep any base path
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
