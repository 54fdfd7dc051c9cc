//! CLI transcription command implementation.

use crate::app::config::{load_config, load_config_from, Config};
use crate::cli::args::{Cli, OutputFormat};
use crate::cli::audio_reader::{prepare_for_whisper, read_audio, WHISPER_SAMPLE_RATE};
use crate::domain::traits::{ConfigProvider, Transcription};
use crate::domain::types::{DecodeOptions, Device, TranscriptionResult};
use crate::infrastructure::models::{
    ensure_model, format_size, get_available_models, is_model_downloaded, resolve_model,
};
use crate::transcription::{normalize_language, TranscriptionService};
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Effective settings after merging CLI flags over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model: String,
    pub language: Option<String>,
    pub translate: bool,
    pub device: Device,
    pub threads: u16,
    pub models_dir: PathBuf,
    pub format: OutputFormat,
}

impl Settings {
    pub fn resolve(cli: &Cli, config: &Config) -> Result<Self> {
        let language = match &cli.language {
            Some(lang) => normalize_language(lang)?,
            None => match ConfigProvider::language(config) {
                Some(lang) => normalize_language(&lang)?,
                None => None,
            },
        };

        Ok(Self {
            model: cli.model.clone().unwrap_or_else(|| config.default_model()),
            language,
            translate: cli.translate,
            device: cli.device.unwrap_or_else(|| ConfigProvider::device(config)),
            threads: cli.threads.unwrap_or_else(|| config.threads()),
            models_dir: cli.models_dir.clone().unwrap_or_else(|| config.models_dir()),
            format: cli
                .format
                .unwrap_or_else(|| OutputFormat::from_config(&config.output_format)),
        })
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            language: self.language.clone(),
            translate: self.translate,
            threads: self.threads,
        }
    }
}

/// Run the transcribe command for one audio file.
pub fn run(cli: &Cli, audio_path: &Path) -> Result<()> {
    let config = load_config_cascade(cli.config.as_deref())?;
    let settings = Settings::resolve(cli, &config)?;

    // Name lookup only; nothing is downloaded before the audio decodes
    let model = resolve_model(&settings.model, &settings.models_dir)?;

    info!("Reading: {}", audio_path.display());
    let audio = read_audio(audio_path)?;
    info!(
        "  {} channels, {}Hz, {:.1}s",
        audio.channels, audio.sample_rate, audio.duration_secs
    );
    let samples = prepare_for_whisper(&audio)
        .with_context(|| format!("Failed to decode audio: {}", audio_path.display()))?;

    let model_path = ensure_model(&model, &settings.models_dir)?;
    info!("Loading model: {}", model_path.display());
    let service = TranscriptionService::load(&model_path, settings.device)?;

    let result = transcribe_samples(&service, &samples, &settings.decode_options())?;
    if let Some(device) = service.device() {
        info!(
            "Transcribed {:.1}s of speech on {}",
            result.duration_secs(),
            device
        );
    }
    let rendered = render(&result, settings.format)?;
    write_output(&rendered, cli.output.as_deref())
}

/// Load config with cascade: custom path -> default path -> defaults.
fn load_config_cascade(custom_path: Option<&Path>) -> Result<Config> {
    match custom_path {
        Some(path) => load_config_from(path),
        None => Ok(load_config().unwrap_or_else(|e| {
            warn!("Ignoring config: {:#}", e);
            Config::default()
        })),
    }
}

/// Run the engine over prepared 16kHz mono samples.
pub fn transcribe_samples(
    engine: &dyn Transcription,
    samples: &[f32],
    options: &DecodeOptions,
) -> Result<TranscriptionResult> {
    if !engine.is_loaded() {
        bail!("Model not loaded");
    }

    info!(
        "Transcribing {:.1}s with {} (language: {})...",
        samples.len() as f64 / WHISPER_SAMPLE_RATE as f64,
        engine.model_name().unwrap_or_default(),
        options.language.as_deref().unwrap_or("auto")
    );
    let result = engine.transcribe(samples, options)?;
    info!(
        "Done: {} segments, language {}",
        result.segments.len(),
        result.language
    );
    Ok(result)
}

/// Serialize a result in the requested format.
pub fn render(result: &TranscriptionResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(result).context("Failed to serialize JSON"),
        OutputFormat::Text => Ok(result.text.clone()),
    }
}

fn write_output(output_text: &str, output_path: Option<&Path>) -> Result<()> {
    if let Some(output_path) = output_path {
        fs::write(output_path, format!("{}\n", output_text))
            .with_context(|| format!("Failed to write output: {}", output_path.display()))?;
        info!("Output written to: {}", output_path.display());
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", output_text)?;
    }

    Ok(())
}

/// List available models.
pub fn list_models(cli: &Cli) -> Result<()> {
    let config = load_config_cascade(cli.config.as_deref())?;
    let models_dir = cli.models_dir.clone().unwrap_or_else(|| config.models_dir());

    println!("Available Whisper models:");
    println!();

    for model in get_available_models() {
        let status = if is_model_downloaded(model.filename, &models_dir) {
            "[downloaded]"
        } else {
            ""
        };

        println!(
            "  {:12} {:24} {:>10}  {}",
            model.tag,
            model.filename,
            format_size(model.size_bytes),
            status
        );
    }

    println!();
    println!("Models directory: {}", models_dir.display());

    Ok(())
}
