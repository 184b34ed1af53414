//! Hires-fix tool definition.
//!
//! Re-renders an existing image at a higher resolution through img2img.
//! The render is dispatched fire-and-forget: the WebUI queues the job and
//! saves the result itself, and the tool answers immediately instead of
//! holding the connection open for a multi-minute render.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::config::Config;
use crate::core::output;
use crate::domains::tools::definitions::common::{check_range, lenient_f64, text_result};
use crate::domains::tools::error::ToolError;
use crate::sd::SdClient;
use crate::sd::images;
use crate::sd::info::extract_prompt;
use crate::sd::payload::{self, Img2ImgPayload};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the hires-fix tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct HiresFixParams {
    /// Path of the image to re-render at higher resolution.
    pub image_path: String,

    /// Upscale factor, between 1 and 4.
    #[serde(default, deserialize_with = "lenient_f64")]
    #[schemars(with = "Option<f64>")]
    pub hr_scale: Option<f64>,

    /// How far the re-render may drift from the source, between 0 and 1.
    #[serde(default, deserialize_with = "lenient_f64")]
    #[schemars(with = "Option<f64>")]
    pub denoising_strength: Option<f64>,

    /// Sampling steps, between 1 and 150.
    #[serde(default, deserialize_with = "lenient_f64")]
    #[schemars(with = "Option<f64>")]
    pub steps: Option<f64>,

    /// Upscaler to use, as listed by get_sd_upscalers.
    #[serde(default)]
    pub hr_upscaler: Option<String>,
}

impl HiresFixParams {
    /// Check constraints that the type system cannot express. Runs before
    /// any network or filesystem access.
    fn validate(&self) -> Result<(), ToolError> {
        if self.image_path.is_empty() {
            return Err(ToolError::invalid_arguments("image_path must not be empty"));
        }
        if let Some(hr_scale) = self.hr_scale {
            check_range("hr_scale", hr_scale, 1.0, 4.0)?;
        }
        if let Some(denoising_strength) = self.denoising_strength {
            check_range("denoising_strength", denoising_strength, 0.0, 1.0)?;
        }
        if let Some(steps) = self.steps {
            check_range("steps", steps, 1.0, 150.0)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Hires-fix tool - upscales an image by re-rendering it through img2img.
pub struct HiresFixTool;

impl HiresFixTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "hires_fix_image";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Upscale an existing image by re-rendering it with img2img (hires fix). The render runs in the background inside the WebUI; the tool returns immediately.";

    /// Execute the tool logic.
    pub async fn execute(
        params: &HiresFixParams,
        config: &Config,
        client: &SdClient,
    ) -> Result<CallToolResult, ToolError> {
        params.validate()?;

        let bytes = output::read_image(Path::new(&params.image_path)).await?;
        let size = imagesize::blob_size(&bytes)?;

        let hr_scale = params.hr_scale.unwrap_or(payload::DEFAULT_HR_SCALE);
        let width = (size.width as f64 * hr_scale).round() as u32;
        let height = (size.height as f64 * hr_scale).round() as u32;

        let data_uri = images::to_data_uri(&images::encode_base64(&bytes));

        // Best effort: the render still works with an empty prompt, so
        // nothing from this lookup is allowed to fail the call.
        let prompt = match client.png_info(data_uri.clone()).await {
            Ok(info_response) => extract_prompt(&info_response.info).unwrap_or_default(),
            Err(err) => {
                debug!(%err, "Could not recover the original prompt");
                String::new()
            }
        };

        let img2img = Img2ImgPayload {
            init_images: vec![data_uri],
            prompt,
            negative_prompt: String::new(),
            denoising_strength: params
                .denoising_strength
                .unwrap_or(payload::DEFAULT_DENOISING_STRENGTH),
            steps: params
                .steps
                .map(|s| s.round() as u32)
                .unwrap_or(payload::DEFAULT_STEPS),
            width,
            height,
            cfg_scale: payload::DEFAULT_CFG_SCALE,
            sampler_name: payload::DEFAULT_SAMPLER.to_string(),
            scheduler: payload::DEFAULT_SCHEDULER.to_string(),
            seed: payload::DEFAULT_SEED,
            hr_upscaler: params
                .hr_upscaler
                .clone()
                .unwrap_or_else(|| config.upscale.upscaler_1.clone()),
        };

        client.img2img_detached(img2img);
        info!(
            image = %params.image_path,
            "Hires fix dispatched, target {width}x{height}"
        );

        Ok(text_result(format!(
            "Hires fix started for {}: upscaling by {hr_scale}x to {width}x{height}. \
             The WebUI renders in the background and saves the result to its own \
             output directory when done.",
            params.image_path
        )))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<HiresFixParams>(),
            annotations: None,
            output_schema: None,
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
                let params: HiresFixParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &config, &client).await?)
            }
            .boxed()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tiny_png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer
                .write_image_data(&vec![0u8; (width * height * 4) as usize])
                .unwrap();
        }
        out
    }

    fn setup(server_url: &str) -> (Config, SdClient) {
        let mut config = Config::default();
        config.sd.base_url = server_url.to_string();
        let client = SdClient::new(&config.sd).unwrap();
        (config, client)
    }

    fn params_from(value: serde_json::Value) -> HiresFixParams {
        serde_json::from_value(value).unwrap()
    }

    async fn wait_for_img2img(server: &MockServer) -> serde_json::Value {
        for _ in 0..50 {
            let requests = server.received_requests().await.unwrap_or_default();
            if let Some(request) = requests
                .iter()
                .find(|r| r.url.path() == "/sdapi/v1/img2img")
            {
                return serde_json::from_slice(&request.body).unwrap();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("img2img request never arrived");
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_parameters() {
        let (config, client) = setup("http://127.0.0.1:1");

        for args in [
            json!({ "image_path": "" }),
            json!({ "image_path": "a.png", "hr_scale": 0.5 }),
            json!({ "image_path": "a.png", "hr_scale": 4.5 }),
            json!({ "image_path": "a.png", "denoising_strength": 1.5 }),
            json!({ "image_path": "a.png", "steps": "0" }),
        ] {
            let params = params_from(args.clone());
            let err = HiresFixTool::execute(&params, &config, &client)
                .await
                .unwrap_err();
            assert!(
                matches!(err, ToolError::InvalidArguments(_)),
                "expected rejection for {args}"
            );
        }
    }

    #[tokio::test]
    async fn test_missing_image_is_a_filesystem_error() {
        let temp = TempDir::new().unwrap();
        let (config, client) = setup("http://127.0.0.1:1");

        let missing = temp.path().join("missing.png");
        let params = params_from(json!({ "image_path": missing.to_string_lossy() }));
        let err = HiresFixTool::execute(&params, &config, &client)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Output(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_returns_immediately_and_dispatches_img2img() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("small.png");
        std::fs::write(&source, tiny_png(4, 6)).unwrap();

        Mock::given(method("POST"))
            .and(path("/sdapi/v1/png-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "info": "a lighthouse at dusk\nNegative prompt: blur\nSteps: 20",
            })))
            .mount(&server)
            .await;
        // The render would take minutes; the tool must not wait for it.
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/img2img"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "images": [] }))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let (config, client) = setup(&server.uri());
        let params = params_from(json!({
            "image_path": source.to_string_lossy(),
            "hr_scale": 2,
        }));

        let started = std::time::Instant::now();
        let result = HiresFixTool::execute(&params, &config, &client)
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        let text = match &result.content[0].raw {
            rmcp::model::RawContent::Text(t) => &t.text,
            _ => panic!("Expected text content"),
        };
        assert!(text.contains("2x"));
        assert!(text.contains("8x12"));

        let body = wait_for_img2img(&server).await;
        assert_eq!(body["prompt"], "a lighthouse at dusk");
        assert_eq!(body["width"], 8);
        assert_eq!(body["height"], 12);
        assert_eq!(body["denoising_strength"], 0.3);
        assert_eq!(body["hr_upscaler"], "R-ESRGAN 4x+");
        assert!(
            body["init_images"][0]
                .as_str()
                .unwrap()
                .starts_with("data:image/png;base64,")
        );
    }

    #[tokio::test]
    async fn test_prompt_lookup_failure_falls_back_to_empty() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("small.png");
        std::fs::write(&source, tiny_png(2, 2)).unwrap();

        Mock::given(method("POST"))
            .and(path("/sdapi/v1/png-info"))
            .respond_with(ResponseTemplate::new(500).set_body_string("no metadata"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/img2img"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": [] })))
            .mount(&server)
            .await;

        let (config, client) = setup(&server.uri());
        let params = params_from(json!({ "image_path": source.to_string_lossy() }));
        HiresFixTool::execute(&params, &config, &client)
            .await
            .unwrap();

        let body = wait_for_img2img(&server).await;
        assert_eq!(body["prompt"], "");
        // Default scale is 2x.
        assert_eq!(body["width"], 4);
        assert_eq!(body["height"], 4);
    }

    #[tokio::test]
    async fn test_explicit_hr_upscaler_overrides_default() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("small.png");
        std::fs::write(&source, tiny_png(2, 2)).unwrap();

        Mock::given(method("POST"))
            .and(path("/sdapi/v1/png-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "info": "" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/img2img"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": [] })))
            .mount(&server)
            .await;

        let (config, client) = setup(&server.uri());
        let params = params_from(json!({
            "image_path": source.to_string_lossy(),
            "hr_upscaler": "Lanczos",
            "steps": "40",
        }));
        HiresFixTool::execute(&params, &config, &client)
            .await
            .unwrap();

        let body = wait_for_img2img(&server).await;
        assert_eq!(body["hr_upscaler"], "Lanczos");
        assert_eq!(body["steps"], 40);
    }

    #[tokio::test]
    async fn test_non_image_source_is_rejected() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("notes.txt");
        std::fs::write(&source, b"not an image").unwrap();

        let (config, client) = setup("http://127.0.0.1:1");
        let params = params_from(json!({ "image_path": source.to_string_lossy() }));
        let err = HiresFixTool::execute(&params, &config, &client)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ImageSize(_)), "got {err:?}");
    }
}
