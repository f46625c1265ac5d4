//! Prepase note-taking library
//!
//! This library provides accounts, note storage over a document database,
//! note sharing through typed codes, and clients for the text analysis
//! backend and the dictionary service.

mod accounts;
mod analysis;
mod cli;
mod config;
mod dictionary;
mod errors;
mod fonts;
mod helper;
mod language;
mod note;
mod objects;
mod remote;
mod session;
mod sharing;
mod storage;
mod store;
mod types;
mod user;

// Re-export key components
pub use accounts::*;
pub use analysis::*;
pub use cli::*;
pub use config::*;
pub use dictionary::*;
pub use errors::*;
pub use fonts::*;
pub use helper::*;
pub use language::*;
pub use note::*;
pub use objects::*;
pub use remote::*;
pub use session::*;
pub use sharing::*;
pub use storage::*;
pub use store::*;
pub use types::*;
pub use user::*;
