//! Extraction-rule synthesis.
//!
//! The plot specification comes either from an OpenAI-compatible chat
//! endpoint fed with the warm-up samples, or from a file on disk.

mod client;
pub mod prompt;
pub mod retry;
mod spec_file;

use std::path::PathBuf;

use thiserror::Error;

pub use client::{
    OpenAiClient, DEFAULT_MODEL, OPENAI_API_BASE_URL, OPENAI_API_KEY_ENV, OPENAI_BASE_URL_ENV,
};
pub use retry::RetryPolicy;
pub use spec_file::load_spec_file;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: {message}")]
    RateLimit {
        message: String,
        /// Retry-After header value in seconds, if provided
        retry_after_secs: Option<u64>,
    },

    #[error("Network error: {message} (after {attempts} attempts)")]
    NetworkError { message: String, attempts: u32 },

    #[error("model refused: {0}")]
    Refusal(String),

    #[error("empty response from model")]
    EmptyResponse,

    #[error("malformed plot specification: {0}")]
    MalformedResponse(String),

    #[error("plot specification has no extraction rules")]
    NoExtracts,

    #[error("failed to load spec file '{}': {message}", .path.display())]
    SpecFile { path: PathBuf, message: String },
}
