use thiserror::Error;

/// Failures reported by a completion service.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("rate limited by completion service: {0}")]
    RateLimited(String),

    #[error("completion request rejected as invalid: {0}")]
    InvalidRequest(String),

    #[error("completion service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to reach completion service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode completion response: {0}")]
    Decode(String),

    #[error("completion response contained no choices")]
    EmptyCompletion,
}

impl CompletionError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CompletionError::RateLimited(_))
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, CompletionError::InvalidRequest(_))
    }
}

/// Failures of the sampling / aggregation pipeline.
#[derive(Error, Debug)]
pub enum NerError {
    #[error("no labeled examples available to sample from")]
    EmptyExampleSource,

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

impl NerError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, NerError::Completion(e) if e.is_rate_limited())
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, NerError::Completion(e) if e.is_invalid_request())
    }
}

pub type NerResult<T> = Result<T, NerError>;
