//! Command-line front end: one subcommand per screen flow.
mod app;
mod args;

pub use app::*;
pub use args::*;
