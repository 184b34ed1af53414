//! Tool-specific error types.
//!
//! Every tool returns [`ToolError`]; the single [`From`] impl at the bottom
//! is the only place tool failures are translated into protocol errors, so
//! the error-code mapping stays consistent across tools.

use rmcp::ErrorData as McpError;
use thiserror::Error;

use crate::core::output::OutputError;
use crate::sd::SdApiError;
use crate::sd::images::PngTextError;

/// Errors that can occur during tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Invalid arguments were provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The Stable Diffusion API call failed.
    #[error(transparent)]
    Api(#[from] SdApiError),

    /// The API answered successfully but returned no images.
    #[error("{0}")]
    EmptyResult(String),

    /// A filesystem operation on an image file failed.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Returned image data was not valid base64.
    #[error("Failed to decode base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Re-encoding a PNG with embedded parameters failed.
    #[error(transparent)]
    PngText(#[from] PngTextError),

    /// Image dimensions could not be read.
    #[error("Failed to read image dimensions: {0}")]
    ImageSize(#[from] imagesize::ImageError),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a new "empty result" error.
    pub fn empty_result(msg: impl Into<String>) -> Self {
        Self::EmptyResult(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let message = err.to_string();
        match err {
            ToolError::InvalidArguments(_) => McpError::invalid_params(message, None),
            _ => McpError::internal_error(message, None),
        }
    }
}
