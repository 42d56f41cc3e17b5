use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::auth::{AuthenticationMode, IamConfig};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Which header prefix carries the caller identity. `Proxy` trusts the
    /// authenticating reverse proxy; `Mock` is for local development and tests.
    pub auth_mode: AuthenticationMode,
    pub iam: IamConfig,
    pub session_ttl_hours: i64,
    /// Base URL of the university directory API. When unset, the background
    /// sync is disabled and departments/programs are managed by hand.
    pub directory_base_url: Option<String>,
    pub sync_interval_hours: u64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("prethesis.db")
    }

    /// Loads configuration from a TOML file. Missing keys fall back to
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            auth_mode: AuthenticationMode::Proxy,
            iam: IamConfig::default(),
            session_ttl_hours: 12,
            directory_base_url: None,
            sync_interval_hours: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_path(), PathBuf::from("./data/prethesis.db"));
        assert!(config.directory_base_url.is_none());
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prethesis.toml");
        std::fs::write(
            &path,
            "port = 9090\nsession_ttl_hours = 2\n\n[iam]\nadmin_group = \"grp-test-admins\"\nemployee_group = \"hy-employees\"\n",
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.session_ttl_hours, 2);
        assert_eq!(config.iam.admin_group, "grp-test-admins");
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = ServerConfig::load(Path::new("/nonexistent/prethesis.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
