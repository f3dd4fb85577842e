use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse scenario or config JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Malformed scenario input at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Invalid scenario: {0}")]
    InvalidInput(String),

    /// A committed schedule broke one of its own guarantees (capacity, contention,
    /// flow conservation or segment alignment). Signals a bug, never corrected silently.
    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Failed to write statistics: {0}")]
    StatisticsError(#[from] csv::Error),
}

impl Error {
    /// `true` for every error caused by the caller's input rather than by the engine.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::ParseError { .. } | Error::InvalidInput(_) | Error::DeserializationError(_))
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Error::InvariantViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
