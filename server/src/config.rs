//! Runtime-tunable settings, following the teacher's `GameConfig.json` +
//! `/reload` pattern (`lobby::reload_config`), trimmed to what this single
//! fixed-capacity game mode needs: the bind address and the room tick period.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_tick_ms() -> u64 {
    50
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
            tick_ms: default_tick_ms(),
        }
    }
}

const CONFIG_PATH: &str = "ServerConfig.json";

/// Reads `ServerConfig.json` from the working directory if present, else
/// falls back to defaults rather than refusing to start, same as the
/// teacher's `reload_config` tolerance for a missing/partial file.
pub fn load_config() -> ServerConfig {
    match std::fs::read_to_string(Path::new(CONFIG_PATH)) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!(error = ?err, "Failed to parse ServerConfig.json, using defaults.");
                ServerConfig::default()
            }
        },
        Err(_) => ServerConfig::default(),
    }
}
