//! Tool definitions module.
//!
//! This module exports all available tool definitions.
//! Each tool is defined in its own file for better maintainability.

pub mod common;
pub mod generate;
pub mod get_models;
pub mod get_upscalers;
pub mod hires_fix;
pub mod set_model;
pub mod upscale;

pub use generate::{GenerateImageParams, GenerateImageTool};
pub use get_models::GetSdModelsTool;
pub use get_upscalers::GetSdUpscalersTool;
pub use hires_fix::{HiresFixParams, HiresFixTool};
pub use set_model::{SetSdModelParams, SetSdModelTool};
pub use upscale::{UpscaleImagesParams, UpscaleImagesTool};
