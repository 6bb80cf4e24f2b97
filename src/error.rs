use thiserror::Error;

/// Result type for scanner operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that can occur while discovering or querying Roku devices
#[derive(Error, Debug)]
pub enum ScanError {
    /// Socket error during the discovery session (anything other than the
    /// receive timeout, which is normal termination)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A discovered Roku record carried no LOCATION header
    #[error("unable to find LOCATION in device data from {0}")]
    MissingLocation(String),

    /// JSON serialization error while formatting output
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
