//! Model listing tool definition.

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

/// Result of a model listing call.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SdModelsResult {
    /// Display titles of the installed checkpoints. These are the values
    /// `set_sd_model` accepts.
    pub models: Vec<String>,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Model listing tool - lists installed Stable Diffusion checkpoints.
pub struct GetSdModelsTool;

impl GetSdModelsTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "get_sd_models";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "List the Stable Diffusion model checkpoints installed in the WebUI. Returns the display titles accepted by set_sd_model.";

    /// Execute the tool logic.
    pub async fn execute(client: &SdClient) -> Result<CallToolResult, ToolError> {
        let models = client.sd_models().await?;
        info!("Listed {} model(s)", models.len());

        let titles = models.into_iter().map(|model| model.title).collect();
        json_result(&SdModelsResult { models: titles })
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<EmptyParams>(),
            annotations: None,
            output_schema: Some(cached_schema_for_type::<SdModelsResult>()),
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
