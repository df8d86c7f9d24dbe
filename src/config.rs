//! Configuration loading for dbsleuth
//!
//! Loads YAML configuration with per-section defaults. Gateway credentials can
//! be supplied via config or environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SleuthError};

/// Environment variable holding the HQ base URL (database API lives at `/apidb`)
pub const HQ_URL_ENV: &str = "AG3NTS_HQ_URL";
/// Environment variable holding the report endpoint URL
pub const REPORT_URL_ENV: &str = "AG3NTS_HQ_URL_REPORT";
/// Environment variable holding the HQ API key
pub const API_KEY_ENV: &str = "AG3NTS_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub gateway: GatewayConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            timeout_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub api_url: Option<String>,
    pub report_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            report_url: None,
            api_key: None,
            timeout_ms: 30_000,
        }
    }
}

impl GatewayConfig {
    /// Resolve the database API URL from config or the HQ base URL env var
    pub fn resolve_api_url(&self) -> Result<String> {
        if let Some(url) = &self.api_url {
            return Ok(url.clone());
        }
        match std::env::var(HQ_URL_ENV) {
            Ok(base) => Ok(format!("{}/apidb", base.trim_end_matches('/'))),
            Err(_) => Err(SleuthError::Config(format!(
                "gateway.api_url not set and {} not in environment",
                HQ_URL_ENV
            ))),
        }
    }

    /// Resolve the report endpoint URL from config or environment
    pub fn resolve_report_url(&self) -> Result<String> {
        if let Some(url) = &self.report_url {
            return Ok(url.clone());
        }
        std::env::var(REPORT_URL_ENV).map_err(|_| {
            SleuthError::Config(format!(
                "gateway.report_url not set and {} not in environment",
                REPORT_URL_ENV
            ))
        })
    }

    /// Resolve the API key from config or environment
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        std::env::var(API_KEY_ENV).map_err(|_| {
            SleuthError::Config(format!(
                "gateway.api_key not set and {} not in environment",
                API_KEY_ENV
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum number of loop cycles before the task is declared exhausted
    pub max_cycles: u32,
    /// Optional wall-clock deadline in milliseconds, checked between cycles
    pub deadline_ms: Option<u64>,
    /// Ask the reasoning component for a reflection after each execution
    pub reflect: bool,
    /// Markdown trace log destination; absent disables trace logging
    pub log_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_cycles: 10,
            deadline_ms: None,
            reflect: false,
            log_path: None,
        }
    }
}

impl Config {
    /// Load configuration, trying an explicit path first, then standard locations
    ///
    /// An explicit path that fails to load is an error; fallback locations that
    /// fail to parse are logged and skipped.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let primary = config_dir.join("dbsleuth").join("dbsleuth.yml");
            if primary.exists() {
                match Self::load_from_file(&primary) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!(path = %primary.display(), error = %e, "Failed to load config");
                    }
                }
            }
        }

        let fallback = PathBuf::from("dbsleuth.yml");
        if fallback.exists() {
            match Self::load_from_file(&fallback) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!(path = %fallback.display(), error = %e, "Failed to load config");
                }
            }
        }

        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_yaml::from_str(&content)
            .map_err(|e| SleuthError::Config(format!("failed to parse config file: {}", e)))
    }
}
