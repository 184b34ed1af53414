//! Model switch tool definition.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::domains::tools::definitions::common::text_result;
use crate::domains::tools::error::ToolError;
use crate::sd::SdClient;
use crate::sd::payload::OptionsPayload;

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the model switch tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SetSdModelParams {
    /// Checkpoint title as listed by get_sd_models.
    pub model_name: String,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Model switch tool - sets the active Stable Diffusion checkpoint.
pub struct SetSdModelTool;

impl SetSdModelTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "set_sd_model";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Switch the active Stable Diffusion model checkpoint. Use a title from get_sd_models. Loading a large model can take a while.";

    /// Execute the tool logic. The call returns once the WebUI has loaded
    /// the checkpoint.
    pub async fn execute(
        params: &SetSdModelParams,
        client: &SdClient,
    ) -> Result<CallToolResult, ToolError> {
        info!("Switching model to '{}'", params.model_name);

        let options = OptionsPayload {
            sd_model_checkpoint: params.model_name.clone(),
        };
        client.set_options(&options).await?;

        Ok(text_result(format!("Model set to {}", params.model_name)))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<SetSdModelParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for STDIO/TCP transport.
    pub fn create_route<S>(client: Arc<SdClient>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let client = client.clone();
            async move {
                let params: SetSdModelParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &client).await?)
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
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::core::config::SdApiConfig;

    fn client_for(server: &MockServer) -> SdClient {
        SdClient::new(&SdApiConfig {
            base_url: server.uri(),
            auth_user: None,
            auth_pass: None,
            request_timeout_ms: 2_000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_checkpoint_and_confirms() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/options"))
            .and(body_partial_json(json!({
                "sd_model_checkpoint": "flux1.safetensors [abc123]",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let params = SetSdModelParams {
            model_name: "flux1.safetensors [abc123]".to_string(),
        };
        let result = SetSdModelTool::execute(&params, &client_for(&server))
            .await
            .unwrap();

        let text = match &result.content[0].raw {
            rmcp::model::RawContent::Text(t) => &t.text,
            _ => panic!("Expected text content"),
        };
        assert_eq!(text, "Model set to flux1.safetensors [abc123]");
    }

    #[tokio::test]
    async fn test_unknown_model_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/options"))
            .respond_with(ResponseTemplate::new(422).set_body_string("model not found"))
            .mount(&server)
            .await;

        let params = SetSdModelParams {
            model_name: "nope.safetensors".to_string(),
        };
        let err = SetSdModelTool::execute(&params, &client_for(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Api(_)), "got {err:?}");
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn test_missing_model_name_is_a_parse_error() {
        let parsed: Result<SetSdModelParams, _> = serde_json::from_value(json!({}));
        assert!(parsed.is_err());
    }
}
