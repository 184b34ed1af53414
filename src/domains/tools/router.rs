//! Tool Router - builds the rmcp ToolRouter from the tool definitions.
//!
//! Each tool knows how to create its own route; this module only assembles
//! them, threading the shared configuration and API client through.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;

use crate::core::config::Config;
use crate::sd::SdClient;

use super::definitions::{
    GenerateImageTool, GetSdModelsTool, GetSdUpscalersTool, HiresFixTool, SetSdModelTool,
    UpscaleImagesTool,
};

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(config: Arc<Config>, client: Arc<SdClient>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolRouter::new()
        .with_route(GenerateImageTool::create_route(
            config.clone(),
            client.clone(),
        ))
        .with_route(SetSdModelTool::create_route(client.clone()))
        .with_route(UpscaleImagesTool::create_route(
            config.clone(),
            client.clone(),
        ))
        .with_route(HiresFixTool::create_route(config, client.clone()))
        .with_route(GetSdModelsTool::create_route(client.clone()))
        .with_route(GetSdUpscalersTool::create_route(client))
}
