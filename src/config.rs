//! Runtime configuration: connection parameters, server root, security
//! policies, image handling, and copy limits.
//!
//! Loaded from a JSON file, then overlaid with `FTPBOX_*` environment
//! variables so credentials can stay out of the file.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::PolicyConfig;

/// Work-stack depth limit for recursive folder operations when the
/// config does not say otherwise.
pub const DEFAULT_COPY_MAX_DEPTH: usize = 32;

/// Config file consulted when neither `--config` nor `FTPBOX_CONFIG`
/// names one.
pub const DEFAULT_CONFIG_PATH: &str = "ftpbox.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub root: String,
    pub security: SecurityConfig,
    pub images: ImagesConfig,
    pub copy_max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            root: "/".to_string(),
            security: SecurityConfig::default(),
            images: ImagesConfig::default(),
            copy_max_depth: DEFAULT_COPY_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 21,
            username: "anonymous".to_string(),
            password: String::new(),
            timeout_secs: 30,
        }
    }
}

impl ConnectionConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityConfig {
    pub read_only: bool,
    pub extensions: PolicyConfig,
    pub patterns: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImagesConfig {
    pub extensions: Vec<String>,
    pub thumbnail_dir: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            extensions: ["jpg", "jpeg", "png", "gif", "bmp", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            thumbnail_dir: "_thumbs".to_string(),
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Resolve the config: explicit path, else `FTPBOX_CONFIG`, else the
    /// default file if present, else built-in defaults. Environment
    /// overrides apply last in every case.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = env::var("FTPBOX_CONFIG").ok();
        let mut config = if let Some(path) = explicit {
            Self::from_file(path)?
        } else if let Some(ref path) = env_path {
            Self::from_file(Path::new(path))?
        } else {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::from_file(default)?
            } else {
                log::info!("no config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_from(|key| env::var(key).ok());
        Ok(config)
    }

    /// Overlay `FTPBOX_*` variables onto the loaded config. The lookup is
    /// injected so tests do not touch the process environment.
    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("FTPBOX_HOST") {
            self.connection.host = host;
        }
        if let Some(port) = lookup("FTPBOX_PORT") {
            match port.parse() {
                Ok(port) => self.connection.port = port,
                Err(_) => log::warn!("ignoring non-numeric FTPBOX_PORT: {port:?}"),
            }
        }
        if let Some(username) = lookup("FTPBOX_USERNAME") {
            self.connection.username = username;
        }
        if let Some(password) = lookup("FTPBOX_PASSWORD") {
            self.connection.password = password;
        }
        if let Some(root) = lookup("FTPBOX_ROOT") {
            self.root = root;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyMode;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.connection.addr(), "localhost:21");
        assert_eq!(config.connection.timeout(), Duration::from_secs(30));
        assert_eq!(config.root, "/");
        assert_eq!(config.copy_max_depth, DEFAULT_COPY_MAX_DEPTH);
        assert!(!config.security.read_only);
        assert!(config.images.extensions.iter().any(|e| e == "png"));
    }

    #[test]
    fn parses_full_document() {
        let config = Config::from_json(
            r#"{
                "connection": {"host": "ftp.example.net", "port": 2121,
                               "username": "u", "password": "p", "timeoutSecs": 5},
                "root": "/srv/files/",
                "security": {
                    "readOnly": true,
                    "extensions": {"policy": "ALLOW_LIST", "ignoreCase": false,
                                   "restrictions": ["txt"]},
                    "patterns": {"policy": "DISALLOW_LIST", "ignoreCase": false,
                                 "restrictions": [".*"]}
                },
                "images": {"extensions": ["png"], "thumbnailDir": "thumbs"},
                "copyMaxDepth": 4
            }"#,
        )
        .unwrap();
        assert_eq!(config.connection.addr(), "ftp.example.net:2121");
        assert!(config.security.read_only);
        assert_eq!(config.security.extensions.policy, PolicyMode::AllowList);
        assert_eq!(config.images.thumbnail_dir, "thumbs");
        assert_eq!(config.copy_max_depth, 4);
    }

    #[test]
    fn partial_document_fills_defaults() {
        let config = Config::from_json(r#"{"root": "/data"}"#).unwrap();
        assert_eq!(config.root, "/data");
        assert_eq!(config.connection.port, 21);
        assert_eq!(config.images.thumbnail_dir, "_thumbs");
    }

    #[test]
    fn env_overrides_win() {
        let mut config = Config::default();
        config.apply_env_from(|key| match key {
            "FTPBOX_HOST" => Some("override.example".to_string()),
            "FTPBOX_PORT" => Some("990".to_string()),
            "FTPBOX_PASSWORD" => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.connection.host, "override.example");
        assert_eq!(config.connection.port, 990);
        assert_eq!(config.connection.password, "secret");
        assert_eq!(config.connection.username, "anonymous");
    }

    #[test]
    fn bad_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_env_from(|key| {
            (key == "FTPBOX_PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.connection.port, 21);
    }
}
