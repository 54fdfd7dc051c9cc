//! Core domain traits.
//!
//! The CLI only talks to the speech model through [`Transcription`], which
//! lets the pipeline run against a mock in tests.

use crate::domain::types::{DecodeOptions, TranscriptionResult};
use anyhow::Result;

/// Speech-to-text transcription abstraction.
pub trait Transcription {
    /// Transcribe audio samples into a structured result.
    ///
    /// # Arguments
    /// * `samples` - Audio samples at 16kHz mono
    /// * `options` - Language, task and thread settings
    fn transcribe(&self, samples: &[f32], options: &DecodeOptions) -> Result<TranscriptionResult>;

    /// Check if a model is loaded and ready for transcription.
    fn is_loaded(&self) -> bool;

    /// Get the name/path of the loaded model.
    fn model_name(&self) -> Option<String>;
}

/// Configuration provider abstraction.
pub trait ConfigProvider {
    fn default_model(&self) -> String;
    fn language(&self) -> Option<String>;
    fn device(&self) -> crate::domain::types::Device;
    fn threads(&self) -> u16;
}
