//! Stable Diffusion WebUI API layer.
//!
//! Everything that talks to the WebUI lives here: the HTTP client, request
//! payloads with their defaults, response types, and the helpers for image
//! encoding and parameter-text handling. Tools build payloads, call the
//! client, and never touch HTTP directly.

pub mod client;
pub mod error;
pub mod images;
pub mod info;
pub mod payload;
pub mod response;

pub use client::SdClient;
pub use error::{SdApiError, SdApiResult};
