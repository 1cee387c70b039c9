use std::time::Duration;

use tila_recon::ReconError;

/// Error type for extraction operations.
#[derive(Debug)]
pub enum ExtractError {
    /// Connection failed or the request could not be sent
    Network(String),
    /// Service answered with a non-success status
    Http(u16, String),
    /// No response within the configured timeout
    Timeout(Duration),
    /// Batch was cancelled before this document was sent
    Cancelled,
    /// Response text has no fenced or bare JSON payload
    NoStructuredBlock,
    /// Payload found but not valid JSON
    InvalidJson(String),
    /// Payload is JSON but does not fit the record schema
    Schema(ReconError),
    /// Local file could not be read
    Io(String),
    /// Spreadsheet could not be decoded
    Sheet(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Network(msg) => write!(f, "Network error: {}", msg),
            ExtractError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ExtractError::Timeout(d) => write!(f, "Timed out after {}s", d.as_secs()),
            ExtractError::Cancelled => write!(f, "Cancelled"),
            ExtractError::NoStructuredBlock => {
                write!(f, "Response did not contain a JSON block")
            }
            ExtractError::InvalidJson(msg) => write!(f, "Invalid JSON in response: {}", msg),
            ExtractError::Schema(e) => write!(f, "{}", e),
            ExtractError::Io(msg) => write!(f, "I/O error: {}", msg),
            ExtractError::Sheet(msg) => write!(f, "Spreadsheet error: {}", msg),
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<ReconError> for ExtractError {
    fn from(e: ReconError) -> Self {
        ExtractError::Schema(e)
    }
}
