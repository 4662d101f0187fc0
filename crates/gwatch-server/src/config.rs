//! Server configuration: TOML file + CLI overrides.

use gwatch_core::{GwatchError, GwatchResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
}

/// `[server]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_port() -> u16 {
    8080
}
fn default_max_sessions() -> usize {
    100
}

/// Resolved server configuration (CLI overrides applied).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub max_sessions: usize,
}

impl ServerConfig {
    /// Load config from a TOML file, then apply CLI overrides.
    pub fn load(
        config_path: Option<&Path>,
        cli_port: Option<u16>,
        cli_max_sessions: Option<usize>,
    ) -> GwatchResult<Self> {
        let file_config = if let Some(path) = config_path {
            let expanded = expand_tilde(path);
            if expanded.exists() {
                info!(path = %expanded.display(), "loading config file");
                let content = std::fs::read_to_string(&expanded)?;
                toml::from_str::<ConfigFile>(&content)
                    .map_err(|e| GwatchError::Other(format!("config parse error: {e}")))?
            } else {
                info!(path = %expanded.display(), "config file not found, using defaults");
                ConfigFile::default()
            }
        } else {
            ConfigFile::default()
        };

        Ok(Self {
            port: cli_port.unwrap_or(file_config.server.port),
            max_sessions: cli_max_sessions.unwrap_or(file_config.server.max_sessions),
        })
    }
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_defaults_apply() {
        let parsed: ConfigFile = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(parsed.server.port, 9000);
        assert_eq!(parsed.server.max_sessions, 100);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let parsed: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(parsed.server.port, 8080);
    }

    #[test]
    fn cli_overrides_win() {
        let cfg = ServerConfig::load(
            Some(Path::new("/nonexistent/gwatch/config.toml")),
            Some(9999),
            Some(7),
        )
        .unwrap();
        assert_eq!(cfg.port, 9999);
        assert_eq!(cfg.max_sessions, 7);
    }
}
