use crate::domain::types::{DecodeOptions, Segment, TranscriptionResult};
use anyhow::{bail, Context, Result};
use log::debug;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

pub(crate) struct WhisperSTT {
    ctx: WhisperContext,
    model_path: String,
}

impl WhisperSTT {
    pub fn new(model_path: &str, use_gpu: bool) -> Result<Self> {
        let mut params = WhisperContextParameters::default();
        params.use_gpu = use_gpu;

        let ctx = WhisperContext::new_with_params(model_path, params)
            .with_context(|| format!("Failed to load Whisper model: {}", model_path))?;

        Ok(Self {
            ctx,
            model_path: model_path.to_string(),
        })
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    pub fn transcribe(&self, samples: &[f32], options: &DecodeOptions) -> Result<TranscriptionResult> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_language(Some(options.language.as_deref().unwrap_or("auto")));
        params.set_translate(options.translate);
        if options.threads > 0 {
            params.set_n_threads(options.threads as i32);
        }

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let mut state = self.ctx.create_state().context("Failed to create Whisper state")?;
        state
            .full(params, samples)
            .context("Whisper inference failed")?;

        let language = match &options.language {
            Some(lang) => lang.clone(),
            None => {
                let id = state.full_lang_id_from_state()?;
                whisper_rs::get_lang_str(id).unwrap_or("unknown").to_string()
            }
        };

        // Token ids at or above end-of-text are timestamps and control tokens
        let eot = self.ctx.token_eot();
        let num_segments = state.full_n_segments()?;
        let mut segments = Vec::with_capacity(num_segments.max(0) as usize);

        for i in 0..num_segments {
            let Ok(text) = state.full_get_segment_text(i) else {
                debug!("Skipping segment {} with undecodable text", i);
                continue;
            };
            let t0 = state.full_get_segment_t0(i)?;
            let t1 = state.full_get_segment_t1(i)?;

            let mut tokens = Vec::new();
            let mut probs = Vec::new();
            for j in 0..state.full_n_tokens(i)? {
                let id = state.full_get_token_id(i, j)?;
                if id >= eot {
                    continue;
                }
                tokens.push(id);
                probs.push(state.full_get_token_prob(i, j)?);
            }

            segments.push(Segment {
                id: segments.len(),
                start: Segment::centis_to_secs(t0),
                end: Segment::centis_to_secs(t1),
                text,
                tokens,
                avg_logprob: Segment::mean_logprob(&probs),
            });
        }

        Ok(TranscriptionResult::from_segments(segments, language))
    }
}

/// Normalize a user-supplied language to a Whisper language code.
///
/// Accepts codes ("hi") and English names ("Hindi"). "auto" maps to `None`.
pub fn normalize_language(language: &str) -> Result<Option<String>> {
    let lang = language.trim().to_lowercase();
    if lang.is_empty() || lang == "auto" {
        return Ok(None);
    }

    let Some(id) = whisper_rs::get_lang_id(&lang) else {
        bail!("Unsupported language: {}", language);
    };

    Ok(whisper_rs::get_lang_str(id).map(str::to_string))
}

// === Trait Implementation ===

use crate::domain::traits::Transcription;

impl Transcription for WhisperSTT {
    fn transcribe(&self, samples: &[f32], options: &DecodeOptions) -> Result<TranscriptionResult> {
        WhisperSTT::transcribe(self, samples, options)
    }

    fn is_loaded(&self) -> bool {
        true // WhisperSTT only exists when model is loaded
    }

    fn model_name(&self) -> Option<String> {
        Some(self.model_path.clone())
    }
}
