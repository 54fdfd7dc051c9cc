//! Shared types used across multiple modules.
//!
//! The result types here are what gets serialized to stdout, so field names
//! are part of the program's output format.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structured result of transcribing one audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Full recognized text (all segments, trimmed).
    pub text: String,
    pub segments: Vec<Segment>,
    /// Language code that was requested or detected, e.g. "en".
    pub language: String,
}

impl TranscriptionResult {
    /// Build a result from segments, deriving `text` from the segment texts.
    pub fn from_segments(segments: Vec<Segment>, language: String) -> Self {
        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<String>()
            .trim()
            .to_string();

        Self {
            text,
            segments,
            language,
        }
    }

    /// Duration covered by the segments in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }
}

/// A single recognized segment with timing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: usize,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub text: String,
    /// Text token ids (special tokens excluded)
    pub tokens: Vec<i32>,
    /// Mean natural log of the token probabilities
    pub avg_logprob: f64,
}

impl Segment {
    /// Convert a whisper.cpp timestamp (centiseconds) to seconds.
    pub fn centis_to_secs(t: i64) -> f64 {
        t as f64 / 100.0
    }

    /// Mean log probability of a token probability list; 0.0 when empty.
    pub fn mean_logprob(probs: &[f32]) -> f64 {
        if probs.is_empty() {
            return 0.0;
        }
        let sum: f64 = probs
            .iter()
            .map(|&p| (p.max(f32::MIN_POSITIVE) as f64).ln())
            .sum();
        sum / probs.len() as f64
    }
}

/// Options passed to a single decoding run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeOptions {
    /// Language code; `None` means auto-detect
    pub language: Option<String>,
    /// Translate to English instead of transcribing
    pub translate: bool,
    /// Inference threads; 0 lets the backend decide
    pub threads: u16,
}

/// Inference device selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Device {
    /// Try GPU first, fall back to CPU
    #[default]
    Auto,
    /// CPU only
    Cpu,
    /// GPU only
    Gpu,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::Gpu => "gpu",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Device::Auto),
            "cpu" => Ok(Device::Cpu),
            "gpu" | "cuda" => Ok(Device::Gpu),
            other => bail!("Unknown device: {}", other),
        }
    }
}
