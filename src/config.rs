// SPDX-License-Identifier: MIT

//! Configuration management for Medscan

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{MedscanError, Result};

/// Environment variable holding the model-provider API key
pub const CREDENTIAL_ENV_VAR: &str = "GOOGLE_API_KEY";

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// AI engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Prompt templates
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Web search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,

    /// Directory for transient scratch files (system temp dir if unset)
    #[serde(default)]
    pub scratch_dir: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Upper bound on function-calling rounds per analysis
    #[serde(default = "default_tool_rounds")]
    pub max_tool_rounds: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_analysis_prompt")]
    pub analysis: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_results")]
    pub max_results: usize,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

// Default value functions
fn default_engine_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}
fn default_timeout() -> u64 {
    120
}
fn default_tool_rounds() -> u32 {
    4
}
fn default_search_results() -> usize {
    10
}
fn default_search_timeout() -> u64 {
    10
}
fn default_web_host() -> String {
    "127.0.0.1".to_string()
}
fn default_web_port() -> u16 {
    8080
}

fn default_analysis_prompt() -> String {
    "You are a highly skilled medical imaging expert with extensive knowledge in radiology \
     and diagnostic imaging. Analyze the medical image and structure your response as follows:\n\
     \n\
     ### 1. Image Type & Region\n\
     - Identify imaging modality (X-ray/MRI/CT/Ultrasound/etc.).\n\
     - Specify anatomical region and positioning.\n\
     - Evaluate image quality and technical adequacy.\n\
     \n\
     ### 2. Key Findings\n\
     - Highlight primary observations systematically.\n\
     - Identify potential abnormalities with detailed descriptions.\n\
     - Include measurements and densities where relevant.\n\
     \n\
     ### 3. Diagnostic Assessment\n\
     - Provide primary diagnosis with confidence level.\n\
     - List differential diagnoses ranked by likelihood.\n\
     - Support each diagnosis with observed evidence.\n\
     - Highlight critical/urgent findings.\n\
     \n\
     ### 4. Patient-Friendly Explanation\n\
     - Simplify findings in clear, non-technical language.\n\
     - Avoid medical jargon or provide easy definitions.\n\
     - Include relatable visual analogies.\n\
     \n\
     ### 5. Research Context\n\
     - Use the web_search tool to find recent medical literature.\n\
     - Search for standard treatment protocols.\n\
     - Provide 2-3 key references supporting the analysis.\n\
     \n\
     Ensure a structured and medically accurate response using clear markdown formatting.\n"
        .to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            prompts: PromptConfig::default(),
            search: SearchConfig::default(),
            web: WebConfig::default(),
            scratch_dir: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            model: default_model(),
            timeout_secs: default_timeout(),
            max_tool_rounds: default_tool_rounds(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            analysis: default_analysis_prompt(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_search_results(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| MedscanError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory for transient scratch files
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Model-provider API key, read once at startup and never persisted
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Read the credential from the standard environment variable.
    /// Missing or empty is a startup failure, not a recoverable error.
    pub fn from_env() -> Result<Self> {
        Self::from_env_var(CREDENTIAL_ENV_VAR)
    }

    pub fn from_env_var(name: &str) -> Result<Self> {
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(Self(value)),
            _ => Err(MedscanError::MissingCredential(format!(
                "{} environment variable is not set",
                name
            ))),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}
