//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables, configuration files, or defaults.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Main configuration structure for the MCP server.
///
/// This struct contains all configurable aspects of the server, organized
/// by domain for clarity and maintainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Stable Diffusion WebUI API connection settings.
    pub sd: SdApiConfig,

    /// Where generated and upscaled images are written.
    pub output: OutputConfig,

    /// Default parameters for the upscaling tools.
    pub upscale: UpscaleConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Connection settings for the Stable Diffusion WebUI API.
#[derive(Clone, Serialize, Deserialize)]
pub struct SdApiConfig {
    /// Base URL of the WebUI, e.g. `http://127.0.0.1:7860`.
    pub base_url: String,

    /// Basic-auth username. Only used when the password is also set.
    pub auth_user: Option<String>,

    /// Basic-auth password. Only used when the username is also set.
    pub auth_pass: Option<String>,

    /// Request timeout in milliseconds. Generation can take minutes on
    /// slower hardware, so the default is generous.
    pub request_timeout_ms: u64,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for SdApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdApiConfig")
            .field("base_url", &self.base_url)
            .field("auth_user", &self.auth_user)
            .field("auth_pass", &self.auth_pass.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl SdApiConfig {
    /// Username/password pair, present only when both halves are configured.
    pub fn basic_auth(&self) -> Option<(String, String)> {
        match (&self.auth_user, &self.auth_pass) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        }
    }
}

/// Configuration for image output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory images are saved to when a tool call does not name one.
    pub default_dir: PathBuf,
}

/// Default parameters for `upscale_images`, overridable per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpscaleConfig {
    /// 0 = scale by multiplier, 1 = scale to explicit dimensions.
    pub resize_mode: u8,

    /// Scale factor used in multiplier mode.
    pub multiplier: f64,

    /// Target width in pixels, used in dimensions mode.
    pub width: u32,

    /// Target height in pixels, used in dimensions mode.
    pub height: u32,

    /// Primary upscaler model name.
    pub upscaler_1: String,

    /// Secondary upscaler model name, "None" to disable.
    pub upscaler_2: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "sd-webui-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            sd: SdApiConfig {
                base_url: "http://127.0.0.1:7860".to_string(),
                auth_user: None,
                auth_pass: None,
                request_timeout_ms: 300_000,
            },
            output: OutputConfig {
                default_dir: PathBuf::from("./output"),
            },
            upscale: UpscaleConfig {
                resize_mode: 0,
                multiplier: 4.0,
                width: 512,
                height: 512,
                upscaler_1: "R-ESRGAN 4x+".to_string(),
                upscaler_2: "None".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Unset, empty, or unparseable variables fall back to defaults; a bad
    /// value logs a warning rather than aborting startup.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Some(name) = env_non_empty("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Some(level) = env_non_empty("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(url) = env_non_empty("SD_WEBUI_URL") {
            config.sd.base_url = url;
        }
        config.sd.request_timeout_ms =
            parse_env_or("REQUEST_TIMEOUT", config.sd.request_timeout_ms);

        // Basic auth is all-or-nothing: a lone half is ignored.
        let auth_user = env_non_empty("SD_AUTH_USER");
        let auth_pass = env_non_empty("SD_AUTH_PASS");
        match (auth_user, auth_pass) {
            (Some(user), Some(pass)) => {
                config.sd.auth_user = Some(user);
                config.sd.auth_pass = Some(pass);
            }
            (Some(_), None) => {
                warn!("SD_AUTH_USER is set without SD_AUTH_PASS; API authentication disabled");
            }
            (None, Some(_)) => {
                warn!("SD_AUTH_PASS is set without SD_AUTH_USER; API authentication disabled");
            }
            (None, None) => {}
        }

        if let Some(dir) = env_non_empty("SD_OUTPUT_DIR") {
            config.output.default_dir = PathBuf::from(dir);
        }

        config.upscale.resize_mode =
            parse_env_or("SD_RESIZE_MODE", config.upscale.resize_mode);
        config.upscale.multiplier =
            parse_env_or("SD_UPSCALE_MULTIPLIER", config.upscale.multiplier);
        config.upscale.width = parse_env_or("SD_UPSCALE_WIDTH", config.upscale.width);
        config.upscale.height = parse_env_or("SD_UPSCALE_HEIGHT", config.upscale.height);
        if let Some(upscaler) = env_non_empty("SD_UPSCALER_1") {
            config.upscale.upscaler_1 = upscaler;
        }
        if let Some(upscaler) = env_non_empty("SD_UPSCALER_2") {
            config.upscale.upscaler_2 = upscaler;
        }

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        config
    }
}

/// Read an environment variable, treating empty or whitespace-only values
/// as unset.
fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` with a warning
/// when the value does not parse.
fn parse_env_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    let Some(raw) = env_non_empty(name) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!("Ignoring invalid {name}={raw:?}, using default {default}");
            default
        }
    }
}
