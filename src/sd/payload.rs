//! Request payloads for the Stable Diffusion WebUI API.
//!
//! One struct per endpoint, serialized exactly as the WebUI expects. The
//! defaulting constants live here so every payload builder draws from the
//! same table.

use serde::Serialize;

// ============================================================================
// Generation defaults
// ============================================================================

pub const DEFAULT_STEPS: u32 = 20;
pub const DEFAULT_WIDTH: u32 = 1024;
pub const DEFAULT_HEIGHT: u32 = 1024;
pub const DEFAULT_CFG_SCALE: f64 = 7.0;
pub const DEFAULT_SAMPLER: &str = "Euler";
pub const DEFAULT_SCHEDULER: &str = "Simple";
pub const DEFAULT_SEED: i64 = -1;
pub const DEFAULT_N_ITER: u32 = 1;
pub const DEFAULT_DISTILLED_CFG_SCALE: f64 = 3.5;

pub const DEFAULT_HR_SCALE: f64 = 2.0;
pub const DEFAULT_DENOISING_STRENGTH: f64 = 0.3;

// ============================================================================
// Payload types
// ============================================================================

/// Body of `POST /sdapi/v1/txt2img`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Txt2ImgPayload {
    pub prompt: String,
    pub negative_prompt: String,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    pub cfg_scale: f64,
    pub sampler_name: String,
    pub scheduler: String,
    pub seed: i64,
    pub n_iter: u32,
    pub restore_faces: bool,
    pub tiling: bool,
    pub distilled_cfg_scale: f64,
}

/// Body of `POST /sdapi/v1/png-info`. `image` is a full data URI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PngInfoPayload {
    pub image: String,
}

/// Body of `POST /sdapi/v1/options`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsPayload {
    pub sd_model_checkpoint: String,
}

/// One input image of an extras batch: raw base64 plus its display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileData {
    pub data: String,
    pub name: String,
}

/// Body of `POST /sdapi/v1/extra-batch-images`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtrasBatchPayload {
    pub resize_mode: u8,
    pub show_extras_results: bool,
    pub gfpgan_visibility: f64,
    pub codeformer_visibility: f64,
    pub codeformer_weight: f64,
    pub upscaling_resize: f64,
    pub upscaling_resize_w: u32,
    pub upscaling_resize_h: u32,
    pub upscaling_crop: bool,
    pub upscaler_1: String,
    pub upscaler_2: String,
    pub extras_upscaler_2_visibility: f64,
    pub upscale_first: bool,
    #[serde(rename = "imageList")]
    pub image_list: Vec<FileData>,
}

impl ExtrasBatchPayload {
    /// Build an extras-batch body. The non-configurable fields the WebUI
    /// requires are pinned here so no caller can forget one.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resize_mode: u8,
        upscaling_resize: f64,
        upscaling_resize_w: u32,
        upscaling_resize_h: u32,
        upscaler_1: String,
        upscaler_2: String,
        image_list: Vec<FileData>,
    ) -> Self {
        Self {
            resize_mode,
            show_extras_results: true,
            gfpgan_visibility: 0.0,
            codeformer_visibility: 0.0,
            codeformer_weight: 0.0,
            upscaling_resize,
            upscaling_resize_w,
            upscaling_resize_h,
            upscaling_crop: true,
            upscaler_1,
            upscaler_2,
            extras_upscaler_2_visibility: 0.0,
            upscale_first: false,
            image_list,
        }
    }
}

/// Body of `POST /sdapi/v1/img2img`, used for the detached hires-fix pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Img2ImgPayload {
    pub init_images: Vec<String>,
    pub prompt: String,
    pub negative_prompt: String,
    pub denoising_strength: f64,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    pub cfg_scale: f64,
    pub sampler_name: String,
    pub scheduler: String,
    pub seed: i64,
    pub hr_upscaler: String,
}
