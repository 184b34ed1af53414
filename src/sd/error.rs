//! Stable Diffusion WebUI API error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for WebUI API operations.
pub type SdApiResult<T> = Result<T, SdApiError>;

/// Errors raised by calls to the Stable Diffusion WebUI API.
///
/// The variants keep the three network failure classes apart so callers can
/// tell "the server rejected the request" from "the server never answered"
/// from "the request never left this process".
#[derive(Debug, Error)]
pub enum SdApiError {
    /// The server answered with a non-success status and (possibly empty) body.
    #[error("Stable Diffusion API error (HTTP {status}): {body}")]
    Status { status: StatusCode, body: String },

    /// No response was received (connection refused, timeout, ...).
    #[error("No response from the Stable Diffusion API: {0}")]
    NoResponse(#[source] reqwest::Error),

    /// The request could not be constructed or sent.
    #[error("Failed to send request to the Stable Diffusion API: {0}")]
    Request(#[source] reqwest::Error),

    /// The server answered with a success status but an undecodable body.
    #[error("Unexpected response from the Stable Diffusion API: {0}")]
    Decode(#[source] reqwest::Error),
}

impl SdApiError {
    /// Classify a reqwest error into the taxonomy above.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::NoResponse(err)
        } else if err.is_decode() {
            Self::Decode(err)
        } else {
            Self::Request(err)
        }
    }
}
