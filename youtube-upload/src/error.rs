//! Error types returned by the upload client.

use thiserror::Error;

/// Result type for all client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while talking to the upload API.
///
/// None of these are retried by the client. Provider-supplied detail is
/// surfaced verbatim so callers can show it to the user.
#[derive(Debug, Error)]
pub enum Error {
    /// The provider rejected our credentials (HTTP 403).
    ///
    /// Carries the title of the error page the provider returned.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The provider rejected the request for any other reason.
    ///
    /// Carries one `field: code` line per reported error, or the error string
    /// from a failed login exchange.
    #[error("upload failed: {0}")]
    Upload(String),

    /// The request cannot be addressed: an unusable API base URL, or a video
    /// ID that does not name a single video.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A successful response did not contain what we expected to find in it.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request could not be sent or the response could not be read.
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// The video data source could not be measured or read.
    #[error("failed to read video data")]
    Io(#[from] std::io::Error),
}
