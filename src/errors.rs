//! Error types for the prepase application.
//!
//! This module defines the error type shared by the stores, the account and
//! note services, the sharing desk and the remote analysis clients.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the prepase application.
#[derive(Error, Debug)]
pub enum PrepaseError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport level failure talking to a remote service.
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Input rejected before reaching any store or service.
    #[error("{message}")]
    Validation { message: String },

    /// Registration attempted with a username that already has a record.
    #[error("A user with the username '{username}' already exists")]
    UsernameOccupied { username: String },

    /// No user record under the given username.
    #[error("No user found with the username '{username}'")]
    UserNotFound { username: String },

    #[error("Wrong password provided")]
    WrongPassword,

    #[error("Password and confirm password do not match")]
    PasswordMismatch,

    /// Hashing or parsing a stored password hash failed.
    #[error("Password hashing failed: {message}")]
    PasswordHash { message: String },

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// Font record was not found.
    #[error("Font not found: {id}")]
    FontNotFound { id: String },

    /// A document update targeted a path with no document.
    #[error("Document not found: {path}")]
    DocumentNotFound { path: String },

    /// A document or collection path segment was empty or contained a slash.
    #[error("Invalid document path segment: '{segment}'")]
    InvalidPath { segment: String },

    /// Sharing code did not have the `owner,__,noteId` shape.
    #[error("Invalid sharing code format: {code}")]
    InvalidSharingCode { code: String },

    /// Upload refused because the object already exists.
    #[error("Object already exists: {path}")]
    ObjectExists { path: String },

    /// Base64 payload could not be decoded.
    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The analysis backend answered with an error status or a failed envelope.
    #[error("Backend call to {endpoint} failed: {message}")]
    Backend { endpoint: String, message: String },

    #[error("Word not found in dictionary: {word}")]
    WordNotFound { word: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// A command that needs a logged-in user ran without a session.
    #[error("Not logged in, run `prepase login` first")]
    NotLoggedIn,

    /// An operation was triggered again while the previous run is in flight.
    #[error("{operation} is already in progress")]
    Busy { operation: String },

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },
}

impl PrepaseError {
    /// Shorthand for building a [`PrepaseError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        PrepaseError::Validation {
            message: message.into(),
        }
    }
}
