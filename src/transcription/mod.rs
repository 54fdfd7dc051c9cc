pub mod service;
pub mod whisper;

pub(crate) use whisper::WhisperSTT;
pub use service::TranscriptionService;
pub use whisper::normalize_language;
