//! Core data structures for the prepase application.
//!
//! This module contains the shared result alias, the note listing options and
//! the command-line subcommands.
use std::{fmt, path::PathBuf};

use clap::{Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::PrepaseError;

/// A specialized Result type for prepase operations.
pub type Result<T> = std::result::Result<T, PrepaseError>;

/// Order in which notes are listed, by their timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Newest => write!(f, "newest"),
            SortOrder::Oldest => write!(f, "oldest"),
        }
    }
}

/// Filtering and ordering applied when listing a user's notes
#[derive(Debug, Clone, Default)]
pub struct NoteQuery {
    /// Case-insensitive substring matched against note titles
    pub search: Option<String>,
    /// Timestamp order of the result
    pub order: SortOrder,
    /// Maximum number of notes returned
    pub limit: Option<usize>,
}

impl NoteQuery {
    pub fn ordered(order: SortOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Available subcommands for the prepase application
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new account
    Register {
        username: String,

        #[clap(short, long)]
        password: String,

        /// Repeat of the password
        #[clap(short = 'C', long)]
        confirm: String,
    },

    /// Log in and remember the user for subsequent commands
    Login {
        username: String,

        #[clap(short, long)]
        password: String,
    },

    /// Forget the logged-in user
    Logout,

    /// Overwrite the password of an account
    ResetPassword {
        username: String,

        #[clap(short = 'n', long)]
        new_password: String,

        #[clap(short = 'C', long)]
        confirm: String,
    },

    /// Show the logged-in user and how many notes they own
    Profile,

    /// Create a new note
    Add {
        /// Title of the note
        #[clap(short = 'T', long, default_value = "")]
        title: String,

        /// Content of the note
        #[clap(short, long, default_value = "")]
        content: String,
    },

    /// Create a note from the text of a local file
    Import {
        /// Path to the text file
        file: PathBuf,

        /// Title of the note, defaults to "Untitled Note"
        #[clap(short = 'T', long)]
        title: Option<String>,
    },

    /// List notes with optional filtering
    List {
        /// Only notes whose title contains this text
        #[clap(short, long)]
        search: Option<String>,

        /// Sort by timestamp
        #[clap(short, long, value_enum, default_value_t = SortOrder::Newest)]
        order: SortOrder,

        /// Limit the number of notes returned
        #[clap(short = 'n', long)]
        limit: Option<usize>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// View a note by ID
    View {
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Replace the title and content of a note
    Update {
        id: String,

        #[clap(short = 'T', long)]
        title: String,

        #[clap(short, long)]
        content: String,
    },

    /// Delete a note by ID
    Delete {
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Generate the sharing code of a note
    Share { id: String },

    /// Open a note shared with a sharing code
    Access {
        code: String,

        /// Copy the shared note into your own notes
        #[clap(short, long)]
        save: bool,
    },

    /// Detect the language of a note
    DetectLanguage { id: String },

    /// Translate a note
    Translate {
        id: String,

        /// Target language code
        #[clap(short, long, default_value = "en")]
        to: String,
    },

    /// Summarize a note in its own language
    Summarize { id: String },

    /// Correct the grammar of a note
    Correct { id: String },

    /// Extract keywords and extra information from a note
    Keywords { id: String },

    /// Generate a diagram of a note
    Visualize { id: String },

    /// Upload an image, extract its text and optionally save it as a note
    ImageToNote {
        image: PathBuf,

        /// Save the extracted text as a note with this title
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// The file holds base64 text instead of raw image bytes
        #[clap(long)]
        base64: bool,
    },

    /// Handwriting font operations
    #[clap(subcommand)]
    Font(FontCommands),

    /// Render a note as a handwriting image with one of your fonts
    Handwriting {
        id: String,

        /// ID of the font record
        #[clap(short, long)]
        font: String,
    },

    /// Look up a word in the dictionary
    Lookup { word: String },

    /// Configuration management
    #[clap(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum FontCommands {
    /// Upload a TTF file and register it
    Add {
        file: PathBuf,

        #[clap(short = 'T', long)]
        title: String,
    },

    /// List registered fonts
    List,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Update a configuration setting (`key=value`)
    Set { assignment: String },

    /// Reset configuration to defaults
    Reset,
}
