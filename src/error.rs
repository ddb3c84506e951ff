//! Error taxonomy for the upload core.

use serde::Deserialize;
use thiserror::Error;

/// Result type used throughout the crate.
pub type UploadResult<T> = Result<T, UploadError>;

/// A single sub-error entry in a Google-style JSON error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct SubError {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, rename = "locationType")]
    pub location_type: String,
}

/// The server's JSON error envelope on a 4xx response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDocument {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<SubError>,
}

impl ErrorDocument {
    /// Render the first sub-error as `Message[..] Location[.. - ..] Reason[..] Domain[..]`,
    /// falling back to the top-level message if the server sent no sub-errors.
    fn first_sub_error_text(&self) -> String {
        match self.errors.first() {
            Some(e) => format!(
                "Message[{}] Location[{} - {}] Reason[{}] Domain[{}]",
                e.message, e.location, e.location_type, e.reason, e.domain
            ),
            None => format!("Message[{}]", self.message),
        }
    }
}

/// Errors produced by the upload core.
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    /// Upload was cancelled by the caller's `CancellationToken`.
    #[error("upload cancelled")]
    Cancelled,

    /// Caller misuse caught at construction time (empty method, bad chunk size, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A transport-level exception or 5xx response. Recoverable via the retry policy
    /// and recovery hook.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The server violated the protocol: malformed `Location`, malformed `Range`, or a
    /// required header was missing. Always fatal.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A 4xx response with a decodable error envelope. Never retried.
    #[error("server error ({status}): {}", .document.first_sub_error_text())]
    ServerError { status: u16, document: ErrorDocument },

    /// A 4xx response whose body did not parse as an error envelope.
    #[error("server error ({status}): {body}")]
    ServerErrorOpaque { status: u16, body: String },

    /// Error reading the source stream.
    #[error("i/o error reading source: {0}")]
    Io(String),
}

impl UploadError {
    /// Transient transport/5xx failures are the only ones eligible for the retry policy
    /// and recovery hook; everything else is fatal on first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::Transient(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, UploadError::Cancelled)
    }
}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        UploadError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_renders_first_sub_error() {
        let document = ErrorDocument {
            code: 401,
            message: "Login Required".to_string(),
            errors: vec![SubError {
                domain: "global".to_string(),
                reason: "required".to_string(),
                message: "Login Required".to_string(),
                location: "Authorization".to_string(),
                location_type: "header".to_string(),
            }],
        };
        let err = UploadError::ServerError {
            status: 401,
            document,
        };
        assert!(
            err.to_string()
                .contains("Message[Login Required] Location[Authorization - header] Reason[required] Domain[global]")
        );
    }

    #[test]
    fn server_error_falls_back_to_top_level_message() {
        let document = ErrorDocument {
            code: 500,
            message: "unexpected".to_string(),
            errors: vec![],
        };
        let err = UploadError::ServerError {
            status: 500,
            document,
        };
        assert!(err.to_string().contains("Message[unexpected]"));
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(UploadError::Transient("boom".into()).is_retryable());
        assert!(!UploadError::Cancelled.is_retryable());
        assert!(!UploadError::InvalidArgument("x".into()).is_retryable());
        assert!(
            !UploadError::ServerError {
                status: 404,
                document: ErrorDocument {
                    code: 404,
                    message: String::new(),
                    errors: vec![]
                }
            }
            .is_retryable()
        );
    }
}
