//! Tool Registry - central registration for all tools.
//!
//! Single source of truth for which tools exist and their metadata.
//! `tools/list` serves exactly this set; the router must stay in sync, and
//! a test in `router.rs` checks the two against each other.

use rmcp::model::Tool;

use super::definitions::{
    GenerateImageTool, GetSdModelsTool, GetSdUpscalersTool, HiresFixTool, SetSdModelTool,
    UpscaleImagesTool,
};

// ============================================================================
// Tool Registry
// ============================================================================

/// Tool registry - lists all available tools.
pub struct ToolRegistry;

impl ToolRegistry {
    /// Get all tool names.
    pub fn tool_names() -> Vec<&'static str> {
        vec![
            GenerateImageTool::NAME,
            SetSdModelTool::NAME,
            UpscaleImagesTool::NAME,
            HiresFixTool::NAME,
            GetSdModelsTool::NAME,
            GetSdUpscalersTool::NAME,
        ]
    }

    /// Get all tools as Tool models (metadata).
    pub fn get_all_tools() -> Vec<Tool> {
        vec![
            GenerateImageTool::to_tool(),
            SetSdModelTool::to_tool(),
            UpscaleImagesTool::to_tool(),
            HiresFixTool::to_tool(),
            GetSdModelsTool::to_tool(),
            GetSdUpscalersTool::to_tool(),
        ]
    }
}
