//! Configuration resolution for the CLI.
//!
//! Resolves client.toml in priority order:
//! 1. `--config <path>` flag (explicit override)
//! 2. `{cwd}/.narwhal/client.toml` (workspace config)
//! 3. `~/.config/narwhal/client.toml` (global default)
//!
//! If the global default doesn't exist, it is generated automatically.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default client config template generated when no config exists.
const DEFAULT_CONFIG: &str = r#"base_url = "http://localhost:11434"
model = "llama3.2"
system_prompt = "You are a helpful assistant. Be concise."
temperature = 0.7
# top_p = 0.9
# context_length = 8192
"#;

/// Per-call chat configuration, all externally supplied.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Base API URL of the backend
    pub base_url: String,

    /// Model to run
    pub model: String,

    /// System prompt sent at position 0
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff
    #[serde(default)]
    pub top_p: Option<f32>,

    /// Model context window, in tokens
    #[serde(default)]
    pub context_length: Option<u32>,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".into()
}

fn default_temperature() -> f32 {
    0.7
}

impl ChatConfig {
    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }
}

/// Resolve the client config following the priority chain.
pub fn resolve_config(config_flag: Option<&str>) -> Result<ChatConfig> {
    // 1. Explicit --config flag.
    if let Some(path) = config_flag {
        return ChatConfig::load(path);
    }

    // 2. Workspace config: {cwd}/.narwhal/client.toml
    let workspace_path = PathBuf::from(".narwhal/client.toml");
    if workspace_path.exists() {
        return ChatConfig::load(&workspace_path);
    }

    // 3. Global default: ~/.config/narwhal/client.toml
    let global_path = global_config_path();
    if global_path.exists() {
        return ChatConfig::load(&global_path);
    }

    generate_default_config(&global_path)?;
    tracing::info!("generated default config at {}", global_path.display());
    ChatConfig::load(&global_path)
}

/// Path to the global default config.
fn global_config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("narwhal")
        .join("client.toml")
}

/// Generate a default client.toml at the given path.
pub fn generate_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    std::fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config to {}", path.display()))?;
    Ok(())
}
