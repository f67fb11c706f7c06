use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("empty payload")]
    EmptyPayload,

    #[error("payload is not valid UTF-8")]
    InvalidEncoding,

    #[error("empty measure group at position {index}")]
    EmptyGroup { index: usize },

    #[error("unmatched key in measure group '{group}': expected key/value pairs, got {tokens} tokens")]
    OddTokenCount { group: String, tokens: usize },

    #[error("empty attribute key in measure group '{group}'")]
    EmptyKey { group: String },
}

pub type Result<T> = std::result::Result<T, PayloadError>;
