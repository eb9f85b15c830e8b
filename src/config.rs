//! This module provides functionality for loading and handling the application's settings.
//!
//! It defines the `VimAssistConfig` struct, which holds the API credentials, the
//! names and instructions used for remote resources, and the polling and sync
//! knobs, plus a `load_config` function to load it from a YAML file.
//!
//! The settings are distinct from the per-session record kept by
//! [`crate::state`]: settings are edited by hand, the record is rewritten by
//! every command.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use vim_assist::config::{VimAssistConfig, load_config};
//!
//! let config_file_path = "/path/to/config.yaml";
//! let config: VimAssistConfig = load_config(config_file_path).unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{env, error::Error, fs, path::Path, time::Duration};

use crate::sync::SyncStrategy;
use tracing::*;

/// Environment variable consulted when `api_key` is left empty.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub const DEFAULT_ASSISTANT_INSTRUCTIONS: &str = "You are a research assistant with fabulous writing skills.

You answer user's questions by searching from the attached documents, and organize the information into a well-written response.";

/// Represents the application's settings.
///
/// Every field has a default, so a settings file only needs to name the values
/// it changes. An empty file (or none at all) yields [`VimAssistConfig::default`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct VimAssistConfig {
    /// The API key used to authenticate requests. Empty means "read `OPENAI_API_KEY`".
    pub api_key: String,

    /// The base URL of the API.
    pub api_base: String,

    /// Model used by the assistant and by content revision.
    pub model: String,

    /// Name given to the assistant when it is created.
    pub assistant_name: String,

    /// Name given to the vector store; a stored id whose store carries another
    /// name is treated as stale.
    pub vector_store_name: String,

    /// Standing instructions of the assistant.
    pub assistant_instructions: String,

    // Per-run instructions sent with every question.
    pub run_instructions: Option<String>,

    // Prepended to every question so the assistant searches the knowledge base.
    pub message_prefix: String,

    // Delay between two run status checks.
    pub poll_interval_ms: u64,

    // Give up waiting for a run after this many seconds. Unset waits forever.
    pub run_timeout_secs: Option<u64>,

    // How `update-docs` reconciles the knowledge base.
    pub sync_strategy: SyncStrategy,
}

impl Default for VimAssistConfig {
    fn default() -> Self {
        VimAssistConfig {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: "gpt-4-turbo-preview".to_string(),
            assistant_name: "VimAssist".to_string(),
            vector_store_name: "vimassist_vector_store".to_string(),
            assistant_instructions: DEFAULT_ASSISTANT_INSTRUCTIONS.to_string(),
            run_instructions: Some("Give concise answers to the user's questions.".to_string()),
            message_prefix: "Search attached documents, ".to_string(),
            poll_interval_ms: 50,
            run_timeout_secs: None,
            sync_strategy: SyncStrategy::Replace,
        }
    }
}

impl VimAssistConfig {
    /// Resolve the API key, falling back to the `OPENAI_API_KEY` environment variable.
    ///
    /// # Errors
    /// Returns an error if neither the settings nor the environment provide a key.
    pub fn resolve_api_key(&self) -> Result<String, Box<dyn Error>> {
        self.api_key_or(env::var(API_KEY_ENV).ok())
    }

    fn api_key_or(&self, from_env: Option<String>) -> Result<String, Box<dyn Error>> {
        if !self.api_key.trim().is_empty() {
            return Ok(self.api_key.clone());
        }

        match from_env {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(format!("No api_key configured and {API_KEY_ENV} is not set").into()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}

/// Loads the application's settings from a YAML file.
///
/// # Parameters
///
/// - `file`: The path to the YAML settings file.
///
/// # Returns
///
/// - `Ok(VimAssistConfig)`: The loaded settings.
/// - `Err(Box<dyn Error>)`: An error occurred while reading the file or parsing the YAML.
pub fn load_config(file: impl AsRef<Path>) -> Result<VimAssistConfig, Box<dyn Error>> {
    let file = file.as_ref();
    debug!("Loading settings from {}", file.display());
    let content = fs::read_to_string(file)?;
    if content.trim().is_empty() {
        return Ok(VimAssistConfig::default());
    }
    let config: VimAssistConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Loads the settings if `file` exists, otherwise falls back to the defaults.
pub fn load_config_or_default(file: impl AsRef<Path>) -> Result<VimAssistConfig, Box<dyn Error>> {
    let file = file.as_ref();
    if file.exists() {
        load_config(file)
    } else {
        info!(
            "No settings at {}, using defaults (run `vimassist init` to create them)",
            file.display()
        );
        Ok(VimAssistConfig::default())
    }
}
