//! Command-line transcription of a single audio file.

pub mod args;
pub mod audio_reader;
pub mod transcribe;

pub use args::{Cli, UsageError, USAGE};
