//! Upscaler listing tool definition.

use futures::FutureExt;
use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::domains::tools::definitions::common::{EmptyParams, json_result};
use crate::domains::tools::error::ToolError;
use crate::sd::SdClient;

// ============================================================================
// Structured Output
// ============================================================================

/// Result of an upscaler listing call.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SdUpscalersResult {
    /// Names of the available upscalers, usable as `upscaler_1`/`upscaler_2`
    /// in upscale_images and as `hr_upscaler` in hires_fix_image.
    pub upscalers: Vec<String>,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Upscaler listing tool - lists the upscalers the WebUI has available.
pub struct GetSdUpscalersTool;

impl GetSdUpscalersTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "get_sd_upscalers";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "List the upscalers available in the WebUI, for use with upscale_images and hires_fix_image.";

    /// Execute the tool logic.
    pub async fn execute(client: &SdClient) -> Result<CallToolResult, ToolError> {
        let upscalers = client.upscalers().await?;
        info!("Listed {} upscaler(s)", upscalers.len());

        let names = upscalers.into_iter().map(|upscaler| upscaler.name).collect();
        json_result(&SdUpscalersResult { upscalers: names })
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<EmptyParams>(),
            annotations: None,
            output_schema: Some(cached_schema_for_type::<SdUpscalersResult>()),
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for STDIO/TCP transport. Arguments are ignored.
    pub fn create_route<S>(client: Arc<SdClient>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |_ctx: ToolCallContext<'_, S>| {
            let client = client.clone();
            async move { Ok(Self::execute(&client).await?) }.boxed()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
