//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.liftbot/config.json`) and environment.
//! LINE credentials are required to serve; everything else has working defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// LINE Messaging API credentials.
    #[serde(default)]
    pub line: LineConfig,

    /// OpenAI completion settings (model, sampling).
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Routing rules (escalation keywords, working window).
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// Server bind and port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for the webhook HTTP server (default 3000). Overridden by PORT env when set.
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0" — LINE must be able to reach the webhook).
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_server_port() -> u16 {
    3000
}

fn default_server_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
        }
    }
}

/// LINE Messaging API credentials. Both are required to serve; env vars
/// CHANNEL_ACCESS_TOKEN and CHANNEL_SECRET override the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineConfig {
    /// Long-lived channel access token from the LINE developer console.
    pub channel_access_token: Option<String>,
    /// Channel secret, used to verify the X-Line-Signature header on webhook POSTs.
    pub channel_secret: Option<String>,
}

/// OpenAI completion settings. Sampling is fixed at startup, not per-request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiConfig {
    /// API key. Overridden by OPENAI_API_KEY env when set. When absent the
    /// fallback strategy fails per delivery; the server still starts.
    pub api_key: Option<String>,
    /// Chat model name (default "gpt-4o").
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Sampling temperature (default 0.55).
    #[serde(default = "default_openai_temperature")]
    pub temperature: f32,
    /// Maximum completion tokens (default 400).
    #[serde(default = "default_openai_max_tokens")]
    pub max_tokens: u32,
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_temperature() -> f32 {
    0.55
}

fn default_openai_max_tokens() -> u32 {
    400
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            max_tokens: default_openai_max_tokens(),
        }
    }
}

/// Routing rules: escalation keyword set and the working window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    /// Installation/sizing trigger terms, matched case-insensitively as substrings.
    /// The literal set is the contract — no synonym expansion.
    #[serde(default = "default_escalation_keywords")]
    pub escalation_keywords: Vec<String>,
    /// Fixed UTC offset in hours for the working window (default 7, Asia/Bangkok — no DST).
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Start of the working window, local hour, inclusive (default 9).
    #[serde(default = "default_open_hour")]
    pub open_hour: u32,
    /// End of the working window, local hour, exclusive (default 18).
    #[serde(default = "default_close_hour")]
    pub close_hour: u32,
    /// Weekly rest day, lowercase English weekday name (default "sunday").
    #[serde(default = "default_rest_day")]
    pub rest_day: String,
}

fn default_escalation_keywords() -> Vec<String> {
    [
        "install",
        "ติดตั้ง",
        "cut-out",
        "cut out",
        "cutout",
        "hatch",
        "gate",
        "mezzanine",
        "void",
        "size",
        "opening",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_utc_offset_hours() -> i32 {
    7
}

fn default_open_hour() -> u32 {
    9
}

fn default_close_hour() -> u32 {
    18
}

fn default_rest_day() -> String {
    "sunday".to_string()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            escalation_keywords: default_escalation_keywords(),
            utc_offset_hours: default_utc_offset_hours(),
            open_hour: default_open_hour(),
            close_hour: default_close_hour(),
            rest_day: default_rest_day(),
        }
    }
}

fn trimmed_non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Resolve the LINE channel access token: env CHANNEL_ACCESS_TOKEN overrides config.
pub fn resolve_channel_access_token(config: &Config) -> Option<String> {
    trimmed_non_empty(std::env::var("CHANNEL_ACCESS_TOKEN").ok())
        .or_else(|| trimmed_non_empty(config.line.channel_access_token.clone()))
}

/// Resolve the LINE channel secret: env CHANNEL_SECRET overrides config.
pub fn resolve_channel_secret(config: &Config) -> Option<String> {
    trimmed_non_empty(std::env::var("CHANNEL_SECRET").ok())
        .or_else(|| trimmed_non_empty(config.line.channel_secret.clone()))
}

/// Resolve the OpenAI API key: env OPENAI_API_KEY overrides config.
pub fn resolve_openai_api_key(config: &Config) -> Option<String> {
    trimmed_non_empty(std::env::var("OPENAI_API_KEY").ok())
        .or_else(|| trimmed_non_empty(config.openai.api_key.clone()))
}

/// Resolved LINE credentials. Construction fails when either credential is
/// missing — the process must refuse to serve without them.
#[derive(Debug, Clone)]
pub struct LineCredentials {
    pub channel_access_token: String,
    pub channel_secret: String,
}

impl LineCredentials {
    pub fn resolve(config: &Config) -> Result<Self> {
        let channel_access_token = resolve_channel_access_token(config).context(
            "CHANNEL_ACCESS_TOKEN is not set (env or line.channelAccessToken in config)",
        )?;
        let channel_secret = resolve_channel_secret(config)
            .context("CHANNEL_SECRET is not set (env or line.channelSecret in config)")?;
        Ok(Self {
            channel_access_token,
            channel_secret,
        })
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("LIFTBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".liftbot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or LIFTBOT_CONFIG_PATH). Missing file => default config.
/// PORT env overrides server.port when set to a valid port number.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    if let Ok(port) = std::env::var("PORT") {
        match port.trim().parse::<u16>() {
            Ok(p) => config.server.port = p,
            Err(_) => log::warn!("ignoring PORT env: not a valid port number: {}", port),
        }
    }
    Ok((config, path))
}
