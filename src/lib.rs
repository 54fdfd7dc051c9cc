pub mod app;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod transcription;

#[cfg(test)]
pub mod test_support;
