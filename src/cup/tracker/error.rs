use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Faults raised while talking to the tabular store or preparing a request.
///
/// Business outcomes such as a missing entity or an insufficient balance are
/// not errors; they are returned as outcome enums inside `Ok`.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the configuration file cannot be decoded.
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Generic collaborator failure reported by a store implementation.
    #[error("store error: {0}")]
    Store(String),

    /// Raised when a table id does not exist in the store.
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    /// Raised when a cell address cannot be parsed or is out of range.
    #[error("invalid cell address '{0}'")]
    InvalidAddress(String),

    /// Raised when a request is missing a required field or carries a bad value.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Raised when a saga compensation could not be applied.
    #[error("compensation for step '{step}' failed: {message}")]
    CompensationFailed { step: String, message: String },

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl TrackerError {
    /// Whether the error stems from malformed caller input rather than a
    /// collaborator fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, TrackerError::Validation(_))
    }
}
