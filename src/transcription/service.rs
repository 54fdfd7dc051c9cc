//! Transcription service layer.
//!
//! Owns the loaded model and picks the inference device, falling back from
//! GPU to CPU when the GPU load fails in `auto` mode.

use crate::domain::types::{DecodeOptions, Device, TranscriptionResult};
use crate::transcription::WhisperSTT;
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

/// Transcription backend variants.
enum TranscriptionBackend {
    Whisper(WhisperSTT),
    None,
}

/// Transcription service wrapping the loaded Whisper model.
pub struct TranscriptionService {
    backend: TranscriptionBackend,
    device: Option<Device>,
}

impl TranscriptionService {
    /// Create a new TranscriptionService without a loaded model.
    pub fn new() -> Self {
        Self {
            backend: TranscriptionBackend::None,
            device: None,
        }
    }

    /// Load a Whisper model on the requested device.
    pub fn load(model_path: &Path, device: Device) -> Result<Self> {
        let mut service = Self::new();
        service.load_model(model_path, device)?;
        Ok(service)
    }

    /// Load or replace the model.
    ///
    /// `Device::Auto` tries the GPU first and retries on CPU if that fails.
    /// The device actually used is available through [`Self::device`].
    pub fn load_model(&mut self, model_path: &Path, device: Device) -> Result<()> {
        let path_str = model_path.to_string_lossy();

        let (whisper, used) = match device {
            Device::Cpu => (WhisperSTT::new(&path_str, false)?, Device::Cpu),
            Device::Gpu => (WhisperSTT::new(&path_str, true)?, Device::Gpu),
            Device::Auto => match WhisperSTT::new(&path_str, true) {
                Ok(w) => (w, Device::Gpu),
                Err(e) => {
                    warn!("GPU load failed ({:#}), falling back to CPU", e);
                    let w = WhisperSTT::new(&path_str, false)
                        .with_context(|| format!("CPU fallback failed for {}", path_str))?;
                    (w, Device::Cpu)
                }
            },
        };

        info!("Loaded model {} ({})", whisper.model_path(), used);
        self.backend = TranscriptionBackend::Whisper(whisper);
        self.device = Some(used);
        Ok(())
    }

    /// Device the current model was loaded on.
    pub fn device(&self) -> Option<Device> {
        self.device
    }
}

impl Default for TranscriptionService {
    fn default() -> Self {
        Self::new()
    }
}

// === Trait Implementation ===

use crate::domain::traits::Transcription;

impl Transcription for TranscriptionService {
    fn transcribe(&self, samples: &[f32], options: &DecodeOptions) -> Result<TranscriptionResult> {
        match &self.backend {
            TranscriptionBackend::Whisper(w) => w.transcribe(samples, options),
            TranscriptionBackend::None => {
                anyhow::bail!("Model not loaded")
            }
        }
    }

    fn is_loaded(&self) -> bool {
        !matches!(self.backend, TranscriptionBackend::None)
    }

    fn model_name(&self) -> Option<String> {
        match &self.backend {
            TranscriptionBackend::Whisper(w) => Transcription::model_name(w),
            TranscriptionBackend::None => None,
        }
    }
}
