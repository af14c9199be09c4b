//! Shared pieces of the searchlight CLI.

pub mod error;
pub mod output;
pub mod settings;
