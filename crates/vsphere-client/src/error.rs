//! vSphere client errors

use thiserror::Error;

/// Errors that can occur when interacting with the vSphere API
#[derive(Debug, Error)]
pub enum VsphereError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// vSphere API returned an error
    #[error("vSphere API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Login failed or the session is no longer valid
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Managed object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request cannot be expressed against the REST API
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
