use thiserror::Error;

/// Errors raised outside the fetch paths (config, storage, transport, local state).
///
/// The advisor never returns these to its callers; it folds them into a
/// fallback instead.
#[derive(Error, Debug)]
pub enum NutriError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Gemini API error: {0}")]
    Api(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Item {0} not found")]
    NotFound(i64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, NutriError>;
