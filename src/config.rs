use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{read_json_file, write_json_atomic, PrepaseError, Result};

const CONFIG_FILE: &str = "config.json";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Root of the document store (users, notes, fonts) and the session file
    pub data_dir: PathBuf,

    /// Root of the object store
    pub objects_dir: PathBuf,

    /// Bucket holding uploaded images and fonts
    pub bucket: String,

    /// Prefix of public object URLs; defaults to a `file://` URL of `objects_dir`
    pub public_base_url: Option<String>,

    /// Base URL of the analysis backend
    pub backend_url: String,

    /// Timeout for backend calls in seconds, none by default
    pub backend_timeout_secs: Option<u64>,

    /// Base URL of the dictionary API
    pub dictionary_url: String,

    pub dictionary_timeout_secs: u64,

    /// How long a failed operation keeps its issue status
    pub issue_reset_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = ProjectDirs::from("com", "prepase", "prepase")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".prepase"));
        Self {
            objects_dir: data_dir.join("objects"),
            data_dir,
            bucket: "prepase".to_string(),
            public_base_url: None,
            backend_url: "http://127.0.0.1:5000".to_string(),
            backend_timeout_secs: None,
            dictionary_url: "https://api.dictionaryapi.dev/api/v2/entries/en".to_string(),
            dictionary_timeout_secs: 8,
            issue_reset_secs: 3,
        }
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("com", "prepase", "prepase")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Loads the configuration at `path`, falling back to defaults when the
    /// file does not exist, then applies environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_env();
        Ok(config)
    }

    /// The configuration exactly as stored at `path`, without environment
    /// overrides
    pub fn read(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            read_json_file(path).map_err(|e| PrepaseError::ConfigError {
                message: format!("Cannot read {}: {}", path.display(), e),
            })
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Applies `PREPASE_BACKEND_URL` and `PREPASE_DATA_DIR`
    pub fn apply_env(&mut self) {
        if let Ok(url) = env::var("PREPASE_BACKEND_URL") {
            debug!("Backend URL overridden from environment");
            self.backend_url = url;
        }
        if let Ok(dir) = env::var("PREPASE_DATA_DIR") {
            debug!("Data directory overridden from environment");
            self.set_data_dir(PathBuf::from(dir));
        }
    }

    /// Moves the data directory; an objects directory that followed the old
    /// default follows the new one
    pub fn set_data_dir(&mut self, dir: PathBuf) {
        if self.objects_dir == self.data_dir.join("objects") {
            self.objects_dir = dir.join("objects");
        }
        self.data_dir = dir;
    }

    /// Updates one setting from a `key=value` assignment
    pub fn set(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| PrepaseError::ConfigError {
                message: format!("Expected key=value, got '{}'", assignment),
            })?;
        let value = value.trim();
        let invalid = |what: &str| PrepaseError::ConfigError {
            message: format!("Invalid value '{}' for {}", value, what),
        };
        match key.trim() {
            "data_dir" => self.set_data_dir(PathBuf::from(value)),
            "objects_dir" => self.objects_dir = PathBuf::from(value),
            "bucket" => self.bucket = value.to_string(),
            "public_base_url" => {
                self.public_base_url = if value.is_empty() {
                    None
                } else {
                    Url::parse(value).map_err(|_| invalid("public_base_url"))?;
                    Some(value.to_string())
                }
            }
            "backend_url" => {
                Url::parse(value).map_err(|_| invalid("backend_url"))?;
                self.backend_url = value.to_string();
            }
            "backend_timeout_secs" => {
                self.backend_timeout_secs = if value.is_empty() {
                    None
                } else {
                    Some(value.parse().map_err(|_| invalid("backend_timeout_secs"))?)
                }
            }
            "dictionary_url" => {
                Url::parse(value).map_err(|_| invalid("dictionary_url"))?;
                self.dictionary_url = value.to_string();
            }
            "dictionary_timeout_secs" => {
                self.dictionary_timeout_secs =
                    value.parse().map_err(|_| invalid("dictionary_timeout_secs"))?
            }
            "issue_reset_secs" => {
                self.issue_reset_secs = value.parse().map_err(|_| invalid("issue_reset_secs"))?
            }
            other => {
                return Err(PrepaseError::ConfigError {
                    message: format!("Unknown setting '{}'", other),
                })
            }
        }
        Ok(())
    }

    pub fn backend_url(&self) -> Result<Url> {
        Url::parse(&self.backend_url).map_err(|e| PrepaseError::ConfigError {
            message: format!("Invalid backend_url '{}': {}", self.backend_url, e),
        })
    }

    pub fn dictionary_url(&self) -> Result<Url> {
        Url::parse(&self.dictionary_url).map_err(|e| PrepaseError::ConfigError {
            message: format!("Invalid dictionary_url '{}': {}", self.dictionary_url, e),
        })
    }

    pub fn public_base_url(&self) -> Result<Url> {
        match &self.public_base_url {
            Some(raw) => Url::parse(raw).map_err(|e| PrepaseError::ConfigError {
                message: format!("Invalid public_base_url '{}': {}", raw, e),
            }),
            None => {
                let dir = if self.objects_dir.is_absolute() {
                    self.objects_dir.clone()
                } else {
                    env::current_dir()?.join(&self.objects_dir)
                };
                Url::from_directory_path(&dir).map_err(|_| PrepaseError::ConfigError {
                    message: format!("Cannot turn {} into a URL", dir.display()),
                })
            }
        }
    }

    pub fn backend_timeout(&self) -> Option<Duration> {
        self.backend_timeout_secs.map(Duration::from_secs)
    }

    pub fn dictionary_timeout(&self) -> Duration {
        Duration::from_secs(self.dictionary_timeout_secs)
    }

    pub fn issue_reset(&self) -> Duration {
        Duration::from_secs(self.issue_reset_secs)
    }
}
