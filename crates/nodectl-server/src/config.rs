//! Daemon configuration file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use nodectl_rpc::DEFAULT_CLIENT_TIMEOUT;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ServerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Listen here instead of the default runtime socket.
    pub socket_path: Option<PathBuf>,

    /// Methods whose deprecated behaviour is switched back on.
    pub deprecated_rpc: HashSet<String>,

    /// Seconds `nodectl` waits for a reply when `--timeout` is not given.
    pub client_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            deprecated_rpc: HashSet::new(),
            client_timeout_secs: DEFAULT_CLIENT_TIMEOUT.as_secs(),
        }
    }
}

impl ServerConfig {
    /// Load from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the file exists but cannot be read
    /// or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// `<config dir>/nodectl/config.json`, if a home directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "nodectl").map(|dirs| dirs.config_dir().join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.client_timeout_secs, 900);
        assert!(config.socket_path.is_none());
        assert!(config.deprecated_rpc.is_empty());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"deprecatedRpc": ["getinfo"]}}"#).unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert!(config.deprecated_rpc.contains("getinfo"));
        assert_eq!(config.client_timeout_secs, 900);
    }

    #[test]
    fn test_full_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"socketPath": "/tmp/n.sock", "clientTimeoutSecs": 30}}"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.socket_path, Some(PathBuf::from("/tmp/n.sock")));
        assert_eq!(config.client_timeout_secs, 30);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = ServerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
