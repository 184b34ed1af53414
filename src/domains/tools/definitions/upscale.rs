//! Batch upscaling tool definition.
//!
//! Reads local images, submits them to the WebUI's extras batch endpoint in
//! one request, and saves the upscaled copies as `upscaled_<basename>` in
//! the resolved output directory. Response order follows input order, so
//! saved files pair up with their sources by index.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::config::{Config, UpscaleConfig};
use crate::core::output;
use crate::domains::tools::definitions::common::{check_min, json_result, lenient_f64};
use crate::domains::tools::error::ToolError;
use crate::sd::SdClient;
use crate::sd::images;
use crate::sd::payload::{ExtrasBatchPayload, FileData};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the batch upscaling tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpscaleImagesParams {
    /// Paths of the images to upscale.
    pub images: Vec<String>,

    /// "0" scales by multiplier, "1" scales to explicit dimensions.
    #[serde(default)]
    pub resize_mode: Option<String>,

    /// Scale factor for multiplier mode, at least 1.
    #[serde(default, deserialize_with = "lenient_f64")]
    #[schemars(with = "Option<f64>")]
    pub upscaling_resize: Option<f64>,

    /// Target width in pixels for dimensions mode, at least 1.
    #[serde(default, deserialize_with = "lenient_f64")]
    #[schemars(with = "Option<f64>")]
    pub upscaling_resize_w: Option<f64>,

    /// Target height in pixels for dimensions mode, at least 1.
    #[serde(default, deserialize_with = "lenient_f64")]
    #[schemars(with = "Option<f64>")]
    pub upscaling_resize_h: Option<f64>,

    /// Primary upscaler model name, as listed by get_sd_upscalers.
    #[serde(default)]
    pub upscaler_1: Option<String>,

    /// Secondary upscaler model name, "None" to disable.
    #[serde(default)]
    pub upscaler_2: Option<String>,

    /// Directory to save upscaled images into; defaults to the configured
    /// output directory.
    #[serde(default)]
    pub output_path: Option<String>,
}

impl UpscaleImagesParams {
    /// Check constraints that the type system cannot express. Runs before
    /// any network or filesystem access.
    fn validate(&self) -> Result<(), ToolError> {
        if self.images.is_empty() {
            return Err(ToolError::invalid_arguments("images must not be empty"));
        }
        if self.images.iter().any(|path| path.is_empty()) {
            return Err(ToolError::invalid_arguments(
                "images must not contain empty paths",
            ));
        }
        if let Some(mode) = &self.resize_mode {
            if mode != "0" && mode != "1" {
                return Err(ToolError::invalid_arguments(
                    r#"resize_mode must be "0" or "1""#,
                ));
            }
        }
        if let Some(resize) = self.upscaling_resize {
            check_min("upscaling_resize", resize, 1.0)?;
        }
        if let Some(width) = self.upscaling_resize_w {
            check_min("upscaling_resize_w", width, 1.0)?;
        }
        if let Some(height) = self.upscaling_resize_h {
            check_min("upscaling_resize_h", height, 1.0)?;
        }
        Ok(())
    }
}

// ============================================================================
// Structured Output
// ============================================================================

/// Result of a batch upscaling call.
#[derive(Debug, Serialize, JsonSchema)]
pub struct UpscaleImagesResult {
    /// Saved upscaled files, matching the order of the input list.
    pub images: Vec<String>,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Batch upscaling tool - upscales local images via the extras endpoint.
pub struct UpscaleImagesTool;

impl UpscaleImagesTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "upscale_images";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Upscale one or more local images with the WebUI's upscalers. Saves each result as upscaled_<name> and returns the saved paths in input order.";

    /// Execute the tool logic.
    #[instrument(skip_all, fields(count = params.images.len()))]
    pub async fn execute(
        params: &UpscaleImagesParams,
        config: &Config,
        client: &SdClient,
    ) -> Result<CallToolResult, ToolError> {
        params.validate()?;
        info!("Upscaling {} image(s)", params.images.len());

        let mut image_list = Vec::with_capacity(params.images.len());
        for image_path in &params.images {
            let bytes = output::read_image(Path::new(image_path)).await?;
            image_list.push(FileData {
                data: images::encode_base64(&bytes),
                name: file_basename(image_path),
            });
        }

        let payload = build_payload(params, &config.upscale, image_list);
        let response = client.extra_batch_images(&payload).await?;
        if response.images.is_empty() {
            return Err(ToolError::empty_result("no images upscaled"));
        }

        let dir = output::prepare_dir(params.output_path.as_deref(), config).await?;

        let mut saved = Vec::with_capacity(response.images.len());
        for (source, upscaled) in params.images.iter().zip(response.images.iter()) {
            let bytes = images::decode_base64_image(upscaled)?;
            let file_path = dir.join(output::upscaled_image_name(source));
            output::write_image(&file_path, &bytes).await?;
            info!(path = %file_path.display(), "Upscaled image saved");
            saved.push(file_path.display().to_string());
        }

        json_result(&UpscaleImagesResult { images: saved })
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<UpscaleImagesParams>(),
            annotations: None,
            output_schema: Some(cached_schema_for_type::<UpscaleImagesResult>()),
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
                let params: UpscaleImagesParams =
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

/// Apply per-call overrides on top of the configured upscale defaults.
fn build_payload(
    params: &UpscaleImagesParams,
    defaults: &UpscaleConfig,
    image_list: Vec<FileData>,
) -> ExtrasBatchPayload {
    let resize_mode = match params.resize_mode.as_deref() {
        Some("1") => 1,
        Some(_) => 0, // validated: only "0" remains
        None => defaults.resize_mode,
    };

    ExtrasBatchPayload::new(
        resize_mode,
        params.upscaling_resize.unwrap_or(defaults.multiplier),
        params
            .upscaling_resize_w
            .map(|w| w.round() as u32)
            .unwrap_or(defaults.width),
        params
            .upscaling_resize_h
            .map(|h| h.round() as u32)
            .unwrap_or(defaults.height),
        params
            .upscaler_1
            .clone()
            .unwrap_or_else(|| defaults.upscaler_1.clone()),
        params
            .upscaler_2
            .clone()
            .unwrap_or_else(|| defaults.upscaler_2.clone()),
        image_list,
    )
}

fn file_basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::sd::images::encode_base64;

    fn setup(server_url: &str, output_dir: &Path) -> (Config, SdClient) {
        let mut config = Config::default();
        config.sd.base_url = server_url.to_string();
        config.output.default_dir = output_dir.to_path_buf();
        let client = SdClient::new(&config.sd).unwrap();
        (config, client)
    }

    fn params_from(value: serde_json::Value) -> UpscaleImagesParams {
        serde_json::from_value(value).unwrap()
    }

    fn write_source(dir: &Path, name: &str, content: &[u8]) -> String {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_rejects_invalid_arguments_before_any_request() {
        let temp = TempDir::new().unwrap();
        let (config, client) = setup("http://127.0.0.1:1", temp.path());

        for args in [
            json!({ "images": [] }),
            json!({ "images": ["a.png", ""] }),
            json!({ "images": ["a.png"], "resize_mode": "2" }),
            json!({ "images": ["a.png"], "upscaling_resize": 0.5 }),
            json!({ "images": ["a.png"], "upscaling_resize_w": "0" }),
        ] {
            let params = params_from(args.clone());
            let err = UpscaleImagesTool::execute(&params, &config, &client)
                .await
                .unwrap_err();
            assert!(
                matches!(err, ToolError::InvalidArguments(_)),
                "expected rejection for {args}"
            );
        }
    }

    #[tokio::test]
    async fn test_missing_source_file_is_a_filesystem_error() {
        let temp = TempDir::new().unwrap();
        // Unreachable API: the read must fail before any request is sent.
        let (config, client) = setup("http://127.0.0.1:1", temp.path());

        let missing = temp.path().join("missing.png");
        let params = params_from(json!({ "images": [missing.to_string_lossy()] }));
        let err = UpscaleImagesTool::execute(&params, &config, &client)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Output(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_upscales_and_saves_in_input_order() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let first = write_source(temp.path(), "cat.png", b"cat bytes");
        let second = write_source(temp.path(), "dog.png", b"dog bytes");

        Mock::given(method("POST"))
            .and(path("/sdapi/v1/extra-batch-images"))
            .and(body_partial_json(json!({
                "resize_mode": 0,
                "upscaling_resize": 4.0,
                "upscaler_1": "R-ESRGAN 4x+",
                "upscaler_2": "None",
                "show_extras_results": true,
                "upscaling_crop": true,
                "imageList": [
                    { "data": encode_base64(b"cat bytes"), "name": "cat.png" },
                    { "data": encode_base64(b"dog bytes"), "name": "dog.png" },
                ],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [encode_base64(b"big cat"), encode_base64(b"big dog")],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let output_dir = temp.path().join("out");
        let (config, client) = setup(&server.uri(), &output_dir);
        let params = params_from(json!({ "images": [first, second] }));
        let result = UpscaleImagesTool::execute(&params, &config, &client)
            .await
            .unwrap();

        let structured = result.structured_content.unwrap();
        let saved: Vec<&str> = structured["images"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(saved.len(), 2);
        assert!(saved[0].ends_with("upscaled_cat.png"));
        assert!(saved[1].ends_with("upscaled_dog.png"));
        assert_eq!(std::fs::read(saved[0]).unwrap(), b"big cat");
        assert_eq!(std::fs::read(saved[1]).unwrap(), b"big dog");
    }

    #[tokio::test]
    async fn test_resize_mode_one_sends_dimensions() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let source = write_source(temp.path(), "cat.png", b"cat bytes");

        Mock::given(method("POST"))
            .and(path("/sdapi/v1/extra-batch-images"))
            .and(body_partial_json(json!({
                "resize_mode": 1,
                "upscaling_resize_w": 2048,
                "upscaling_resize_h": 1536,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [encode_base64(b"resized")],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (config, client) = setup(&server.uri(), temp.path());
        let params = params_from(json!({
            "images": [source],
            "resize_mode": "1",
            "upscaling_resize_w": "2048",
            "upscaling_resize_h": 1536,
        }));
        UpscaleImagesTool::execute(&params, &config, &client)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_response_fails_without_writes() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let source = write_source(temp.path(), "cat.png", b"cat bytes");
        let output_dir = temp.path().join("never-created");

        Mock::given(method("POST"))
            .and(path("/sdapi/v1/extra-batch-images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": [] })))
            .mount(&server)
            .await;

        let (config, client) = setup(&server.uri(), &output_dir);
        let params = params_from(json!({ "images": [source] }));
        let err = UpscaleImagesTool::execute(&params, &config, &client)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "no images upscaled");
        assert!(!output_dir.exists());
    }

    #[tokio::test]
    async fn test_surplus_response_images_are_ignored() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let source = write_source(temp.path(), "cat.png", b"cat bytes");

        Mock::given(method("POST"))
            .and(path("/sdapi/v1/extra-batch-images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [encode_base64(b"big cat"), encode_base64(b"stray")],
            })))
            .mount(&server)
            .await;

        let output_dir = temp.path().join("out");
        let (config, client) = setup(&server.uri(), &output_dir);
        let params = params_from(json!({ "images": [source] }));
        let result = UpscaleImagesTool::execute(&params, &config, &client)
            .await
            .unwrap();

        let structured = result.structured_content.unwrap();
        assert_eq!(structured["images"].as_array().unwrap().len(), 1);
        assert_eq!(std::fs::read_dir(&output_dir).unwrap().count(), 1);
    }

    #[test]
    fn test_basename_used_for_payload_names() {
        assert_eq!(file_basename("photos/cat.png"), "cat.png");
        assert_eq!(file_basename("cat.png"), "cat.png");
        assert_eq!(file_basename("/abs/dog.png"), "dog.png");
    }
}
