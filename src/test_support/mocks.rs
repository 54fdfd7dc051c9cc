//! Mock implementations for unit testing.
//!
//! These mocks implement the core traits from `crate::domain::traits` to
//! enable testing without Whisper models.

use crate::domain::traits::Transcription;
use crate::domain::types::{DecodeOptions, TranscriptionResult};
use anyhow::Result;
use std::cell::RefCell;

enum MockOutcome {
    Result(TranscriptionResult),
    Error(String),
    Unloaded,
}

/// Mock transcription engine for testing.
///
/// Returns a predefined result (or error) and records what it was called with.
pub struct MockTranscription {
    outcome: MockOutcome,
    last_call: RefCell<Option<(usize, DecodeOptions)>>,
}

impl MockTranscription {
    /// Create a mock that returns `result` on every call.
    pub fn with_result(result: TranscriptionResult) -> Self {
        Self::from_outcome(MockOutcome::Result(result))
    }

    /// Create a mock whose transcription always fails.
    pub fn failing(message: &str) -> Self {
        Self::from_outcome(MockOutcome::Error(message.to_string()))
    }

    /// Create a mock reporting no loaded model.
    pub fn unloaded() -> Self {
        Self::from_outcome(MockOutcome::Unloaded)
    }

    fn from_outcome(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            last_call: RefCell::new(None),
        }
    }

    /// Options passed to the most recent `transcribe` call.
    pub fn last_options(&self) -> Option<DecodeOptions> {
        self.last_call.borrow().as_ref().map(|(_, o)| o.clone())
    }

    /// Number of samples passed to the most recent `transcribe` call.
    pub fn last_sample_count(&self) -> Option<usize> {
        self.last_call.borrow().as_ref().map(|(n, _)| *n)
    }
}

impl Transcription for MockTranscription {
    fn transcribe(&self, samples: &[f32], options: &DecodeOptions) -> Result<TranscriptionResult> {
        *self.last_call.borrow_mut() = Some((samples.len(), options.clone()));
        match &self.outcome {
            MockOutcome::Result(result) => Ok(result.clone()),
            MockOutcome::Error(message) => anyhow::bail!("{}", message),
            MockOutcome::Unloaded => anyhow::bail!("Model not loaded"),
        }
    }

    fn is_loaded(&self) -> bool {
        !matches!(self.outcome, MockOutcome::Unloaded)
    }

    fn model_name(&self) -> Option<String> {
        self.is_loaded().then(|| "mock".to_string())
    }
}
