//! MCP Server implementation and lifecycle management.
//!
//! This module contains the main server handler that implements the MCP
//! protocol and dispatches tool calls to the Stable Diffusion WebUI client.
//!
//! ## Tool Architecture
//!
//! Tools are defined in `domains/tools/definitions/` with one file per tool.
//! Each tool defines:
//! - Parameters struct (for rmcp)
//! - `execute()` method (core logic)
//! - `create_route()` method (registered with the ToolRouter)
//!
//! The ToolRouter is built dynamically in `domains/tools/router.rs`.
//! **Adding a new tool does NOT require modifying this file!**

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::{ToolCallContext, ToolRouter},
    model::*,
    service::RequestContext,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::config::Config;
use crate::domains::tools::{ToolRegistry, build_tool_router};
use crate::sd::{SdApiResult, SdClient};

/// The main MCP server handler.
///
/// This struct implements the `ServerHandler` trait from rmcp and dispatches
/// MCP protocol messages to the tool layer.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    ///
    /// Fails if the HTTP client for the WebUI API cannot be constructed.
    pub fn new(config: Config) -> SdApiResult<Self> {
        let config = Arc::new(config);
        let client = Arc::new(SdClient::new(&config.sd)?);

        Ok(Self {
            tool_router: build_tool_router::<Self>(config.clone(), client),
            config,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }
}

/// Build the error returned for a tool name no route exists for.
///
/// Unknown tool names are a protocol-level problem, not a bad argument,
/// so they map to `METHOD_NOT_FOUND` rather than `INVALID_PARAMS`.
fn unknown_tool(name: &str) -> McpError {
    McpError::new(
        ErrorCode::METHOD_NOT_FOUND,
        format!("Unknown tool: {name}"),
        None,
    )
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "This server exposes a Stable Diffusion WebUI (AUTOMATIC1111/Forge) instance \
                 as MCP tools. Use generate_image to render images from a text prompt, \
                 upscale_images and hires_fix_image to enlarge existing images, set_sd_model \
                 to switch checkpoints, and get_sd_models / get_sd_upscalers to list what the \
                 WebUI has installed."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    #[instrument(skip_all)]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        info!("Listing tools");
        Ok(ListToolsResult {
            tools: ToolRegistry::get_all_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip_all, fields(tool = %request.name))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!("Calling tool");

        if !ToolRegistry::tool_names().contains(&request.name.as_ref()) {
            return Err(unknown_tool(&request.name));
        }

        let ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(ctx).await
    }
}
