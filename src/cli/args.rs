//! CLI argument definitions using clap.

use crate::domain::types::Device;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Usage line printed when the positional argument count is wrong.
pub const USAGE: &str = "Usage: transcribe <audio_path>";

/// Transcribe an audio file with a Whisper model and print the result as JSON
#[derive(Parser, Debug)]
#[command(name = "transcribe")]
#[command(about = "Transcribe an audio file with Whisper and print the result as JSON", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the audio file (WAV) to transcribe
    #[arg(value_name = "AUDIO_PATH")]
    pub inputs: Vec<PathBuf>,

    /// Model size tag (tiny, base, small, medium, large-v3), filename or path
    #[arg(short, long)]
    pub model: Option<String>,

    /// Language code or name (en, hi, hindi, auto)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Translate to English instead of transcribing
    #[arg(long)]
    pub translate: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file path (default: ~/.config/whisper-transcribe/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Inference device
    #[arg(long, value_enum)]
    pub device: Option<Device>,

    /// Inference threads (0 = automatic)
    #[arg(short, long)]
    pub threads: Option<u16>,

    /// Directory where models are cached
    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    /// List known models and exit
    #[arg(long)]
    pub list_models: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// JSON transcription result (default)
    #[default]
    Json,
    /// Plain text only
    Text,
}

impl OutputFormat {
    /// Parse the config file spelling; unknown values fall back to JSON.
    pub fn from_config(value: &str) -> Self {
        match value {
            "text" | "txt" => OutputFormat::Text,
            _ => OutputFormat::Json,
        }
    }
}

/// Wrong number of positional arguments.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("expected exactly one audio path, got {count}")]
pub struct UsageError {
    pub count: usize,
}

impl Cli {
    /// The single audio path, or a usage error if zero or several were given.
    pub fn audio_path(&self) -> Result<&Path, UsageError> {
        match self.inputs.as_slice() {
            [path] => Ok(path.as_path()),
            other => Err(UsageError { count: other.len() }),
        }
    }
}
