//! Errors shared by every transit data source.

use crate::identifiers::*;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Line not found: {0}")]
    LineNotFound(LineIdentifier),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP {status} from {url}")]
    Status {
        status: u16,
        url: String,
        body: Vec<u8>,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for TransitError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message_omits_body() {
        let err = TransitError::Status {
            status: 404,
            url: "http://localhost/api/routes/999".into(),
            body: b"{\"error\":\"Line not found\"}".to_vec(),
        };
        assert_eq!(err.to_string(), "HTTP 404 from http://localhost/api/routes/999");
    }

    #[test]
    fn test_json_errors_convert() {
        let err: TransitError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, TransitError::SerializationError(_)));
    }
}
