//! Configuration for the zoomi-player service
//!
//! Bootstrap settings come from a TOML file (see
//! [`zoomi_common::config::resolve_config_path`]); command-line arguments
//! override the file. Every setting has a built-in default so the service
//! starts without any file at all.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use zoomi_common::config::LoggingConfig;
use zoomi_common::Locale;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Path to the SQLite catalog (defaults to the OS data folder)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP port (default: 5750)
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub backend: BackendConfig,
}

pub const DEFAULT_PORT: u16 = 5750;

/// Playback tunables
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Display locale used for resolution until the host changes it
    #[serde(default)]
    pub locale: Locale,

    /// Completion delay for a single exercise without timer, reps or audio
    #[serde(default = "default_fixed_delay_ms")]
    pub fixed_delay_ms: u64,

    /// Length of the non-interactive screen between playlist entries
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,

    /// Points credited when the remote award cannot be confirmed
    #[serde(default = "default_fallback_award")]
    pub fallback_award: u32,

    /// Upper bound on the remote completion log call
    #[serde(default = "default_progress_timeout_ms")]
    pub progress_timeout_ms: u64,

    /// EventBus buffer size
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_fixed_delay_ms() -> u64 {
    10_000
}

fn default_transition_ms() -> u64 {
    600
}

fn default_fallback_award() -> u32 {
    5
}

fn default_progress_timeout_ms() -> u64 {
    8_000
}

fn default_event_capacity() -> usize {
    100
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            fixed_delay_ms: default_fixed_delay_ms(),
            transition_ms: default_transition_ms(),
            fallback_award: default_fallback_award(),
            progress_timeout_ms: default_progress_timeout_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl PlayerConfig {
    pub fn fixed_delay(&self) -> Duration {
        Duration::from_millis(self.fixed_delay_ms)
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    pub fn progress_timeout(&self) -> Duration {
        Duration::from_millis(self.progress_timeout_ms)
    }
}

/// Remote backend endpoints
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL of the REST/RPC backend (progress logging)
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Anonymous API key sent with every backend request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the public object storage holding narration assets
    #[serde(default)]
    pub storage_base_url: Option<String>,

    /// Storage bucket holding narration assets
    #[serde(default = "default_audio_bucket")]
    pub audio_bucket: String,
}

fn default_audio_bucket() -> String {
    "exercise-audio".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_key: None,
            storage_base_url: None,
            audio_bucket: default_audio_bucket(),
        }
    }
}
