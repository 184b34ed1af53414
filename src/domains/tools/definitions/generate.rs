//! Image generation tool definition.
//!
//! Renders images from a text prompt via txt2img, embeds the generation
//! parameters the WebUI reports into each PNG, and saves them to the
//! resolved output directory.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::config::Config;
use crate::core::output;
use crate::domains::tools::definitions::common::{check_range, json_result, lenient_f64};
use crate::domains::tools::error::ToolError;
use crate::sd::SdClient;
use crate::sd::images;
use crate::sd::payload::{self, Txt2ImgPayload};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the image generation tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateImageParams {
    /// Text prompt describing the image to generate.
    pub prompt: String,

    /// Things to keep out of the image.
    #[serde(default)]
    pub negative_prompt: Option<String>,

    /// Sampling steps, between 1 and 150.
    #[serde(default, deserialize_with = "lenient_f64")]
    #[schemars(with = "Option<f64>")]
    pub steps: Option<f64>,

    /// Image width in pixels.
    #[serde(default)]
    pub width: Option<u32>,

    /// Image height in pixels.
    #[serde(default)]
    pub height: Option<u32>,

    /// Classifier-free guidance scale.
    #[serde(default)]
    pub cfg_scale: Option<f64>,

    /// Sampler name, e.g. "Euler".
    #[serde(default)]
    pub sampler_name: Option<String>,

    /// Scheduler name, e.g. "Simple".
    #[serde(default)]
    pub scheduler: Option<String>,

    /// Random seed, -1 picks one at random.
    #[serde(default)]
    pub seed: Option<i64>,

    /// Number of images to generate, between 1 and 4.
    #[serde(default, deserialize_with = "lenient_f64")]
    #[schemars(with = "Option<f64>")]
    pub batch_size: Option<f64>,

    /// Run face restoration on the result.
    #[serde(default)]
    pub restore_faces: Option<bool>,

    /// Generate a tileable image.
    #[serde(default)]
    pub tiling: Option<bool>,

    /// Distilled CFG scale, used by Flux-family models.
    #[serde(default)]
    pub distilled_cfg_scale: Option<f64>,

    /// Directory to save images into; defaults to the configured output
    /// directory.
    #[serde(default)]
    pub output_path: Option<String>,
}

impl GenerateImageParams {
    /// Check constraints that the type system cannot express. Runs before
    /// any network or filesystem access.
    fn validate(&self) -> Result<(), ToolError> {
        if self.prompt.is_empty() {
            return Err(ToolError::invalid_arguments("prompt must not be empty"));
        }
        if let Some(steps) = self.steps {
            check_range("steps", steps, 1.0, 150.0)?;
        }
        if let Some(batch_size) = self.batch_size {
            check_range("batch_size", batch_size, 1.0, 4.0)?;
        }
        Ok(())
    }
}

// ============================================================================
// Structured Output
// ============================================================================

/// One saved image with the parameters the WebUI reported for it.
#[derive(Debug, Serialize, JsonSchema)]
pub struct GeneratedImage {
    /// Path of the saved PNG.
    pub path: String,
    /// Generation-parameters text embedded in the file.
    pub parameters: String,
}

/// Result of an image generation call.
#[derive(Debug, Serialize, JsonSchema)]
pub struct GenerateImageResult {
    /// Saved images, in the order the WebUI returned them.
    pub images: Vec<GeneratedImage>,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Image generation tool - text-to-image via the WebUI's txt2img endpoint.
pub struct GenerateImageTool;

impl GenerateImageTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "generate_image";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Generate images with Stable Diffusion from a text prompt. Each image is saved as a PNG with its generation parameters embedded, and the saved paths are returned.";

    /// Execute the tool logic.
    #[instrument(skip_all, fields(prompt_len = params.prompt.len()))]
    pub async fn execute(
        params: &GenerateImageParams,
        config: &Config,
        client: &SdClient,
    ) -> Result<CallToolResult, ToolError> {
        params.validate()?;

        let payload = build_payload(params);
        info!(
            steps = payload.steps,
            n_iter = payload.n_iter,
            "Generating {}x{} image(s)",
            payload.width,
            payload.height
        );

        let response = client.txt2img(&payload).await?;
        if response.images.is_empty() {
            return Err(ToolError::empty_result("no images generated"));
        }

        // Nothing touches the filesystem until the response is known good.
        let dir = output::prepare_dir(params.output_path.as_deref(), config).await?;

        let mut saved = Vec::with_capacity(response.images.len());
        for image in &response.images {
            let cleaned = images::strip_data_uri_prefix(image);
            let info_response = client.png_info(images::to_data_uri(cleaned)).await?;

            let bytes = images::decode_base64_image(cleaned)?;
            let tagged = images::embed_parameters(&bytes, &info_response.info)?;

            let file_path = dir.join(output::generated_image_name());
            output::write_image(&file_path, &tagged).await?;
            info!(path = %file_path.display(), "Image saved");

            saved.push(GeneratedImage {
                path: file_path.display().to_string(),
                parameters: info_response.info,
            });
        }

        json_result(&GenerateImageResult { images: saved })
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<GenerateImageParams>(),
            annotations: None,
            output_schema: Some(cached_schema_for_type::<GenerateImageResult>()),
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for STDIO/TCP transport.
    pub fn create_route<S>(config: Arc<Config>, client: Arc<SdClient>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let config = config.clone();
            let client = client.clone();
            async move {
                let params: GenerateImageParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &config, &client).await?)
            }
            .boxed()
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Apply the defaulting table to validated parameters.
fn build_payload(params: &GenerateImageParams) -> Txt2ImgPayload {
    Txt2ImgPayload {
        prompt: params.prompt.clone(),
        negative_prompt: params.negative_prompt.clone().unwrap_or_default(),
        steps: params
            .steps
            .map(|s| s.round() as u32)
            .unwrap_or(payload::DEFAULT_STEPS),
        width: params.width.unwrap_or(payload::DEFAULT_WIDTH),
        height: params.height.unwrap_or(payload::DEFAULT_HEIGHT),
        cfg_scale: params.cfg_scale.unwrap_or(payload::DEFAULT_CFG_SCALE),
        sampler_name: params
            .sampler_name
            .clone()
            .unwrap_or_else(|| payload::DEFAULT_SAMPLER.to_string()),
        scheduler: params
            .scheduler
            .clone()
            .unwrap_or_else(|| payload::DEFAULT_SCHEDULER.to_string()),
        seed: params.seed.unwrap_or(payload::DEFAULT_SEED),
        n_iter: params
            .batch_size
            .map(|b| b.round() as u32)
            .unwrap_or(payload::DEFAULT_N_ITER),
        restore_faces: params.restore_faces.unwrap_or(false),
        tiling: params.tiling.unwrap_or(false),
        distilled_cfg_scale: params
            .distilled_cfg_scale
            .unwrap_or(payload::DEFAULT_DISTILLED_CFG_SCALE),
    }
}

// ============================================================================
// Tests
// ============================================================================
