//! Settings loaded from `~/.grantsyncrc`.

use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "localhost:8765";

/// Configuration loaded from ~/.grantsyncrc
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct CliConfig {
    /// Default host:port to connect to
    #[serde(default)]
    pub host: Option<String>,
    /// Default authentication token
    #[serde(default)]
    pub token: Option<String>,
    /// Username for login
    #[serde(default)]
    pub user: Option<String>,
    /// Directory holding grant state files
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    /// Keep removing when the grant option was never set
    #[serde(default)]
    pub tolerate_missing_grant_option: Option<bool>,
    /// Statement timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u32>,
}

impl CliConfig {
    /// Load configuration from ~/.grantsyncrc, falling back to defaults.
    ///
    /// The file may hold a token; on Unix a warning is printed when group or
    /// others can read it.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            if let Ok(metadata) = std::fs::metadata(&path) {
                let mode = metadata.mode();
                if mode & 0o077 != 0 {
                    eprintln!(
                        "WARNING: {} has insecure permissions ({:o}). Run: chmod 600 {}",
                        path.display(),
                        mode & 0o777,
                        path.display()
                    );
                }
            }
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => parse_config(&contents),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config, using defaults");
                Self::default()
            }
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|h| h.join(".grantsyncrc"))
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs_next::data_dir()
                .map(|d| d.join("grantsync"))
                .unwrap_or_else(|| PathBuf::from(".grantsync"))
        })
    }
}

/// `key = value` lines; `#` starts a comment, unknown keys are ignored.
fn parse_config(contents: &str) -> CliConfig {
    let mut config = CliConfig::default();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');

            match key {
                "host" => config.host = Some(value.to_string()),
                "token" => config.token = Some(value.to_string()),
                "user" => config.user = Some(value.to_string()),
                "state_dir" => config.state_dir = Some(PathBuf::from(value)),
                "tolerate_missing_grant_option" => {
                    config.tolerate_missing_grant_option = Some(value == "true" || value == "1")
                }
                "timeout_ms" => config.timeout_ms = value.parse().ok(),
                _ => {}
            }
        }
    }

    config
}
