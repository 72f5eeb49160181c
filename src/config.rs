//! Developer configuration.
//!
//! Loaded from the JSON file shared with other tooling, unknown keys (e.g. account secrets
//! used by test scripts) are ignored and never read into memory as configuration.

use core::fmt;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::transaction::builder::DEFAULT_MAX_FEE;

#[derive(Clone, Eq, PartialEq)]
pub struct NodeConfig {
    pub address: String,
    pub token: String,
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("address", &self.address)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    pub node: NodeConfig,
    /// Directory of compiled programs and schemas.
    pub build_dir: PathBuf,
    /// Rounds to wait for a confirmation.
    pub confirmation_rounds: u64,
    pub max_fee: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    algod_address: String,
    algod_token: String,
    #[serde(default = "RawConfig::default_build_dir")]
    build_dir: PathBuf,
    #[serde(default = "RawConfig::default_confirmation_rounds")]
    confirmation_rounds: u64,
    #[serde(default = "RawConfig::default_max_fee")]
    max_fee: u64,
}

impl RawConfig {
    fn default_build_dir() -> PathBuf {
        PathBuf::from("build")
    }

    const fn default_confirmation_rounds() -> u64 {
        5
    }

    const fn default_max_fee() -> u64 {
        DEFAULT_MAX_FEE
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|error| ConfigError::Read { path: path.to_owned(), error })?;
        Config::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let raw = serde_json::from_str::<RawConfig>(content).map_err(ConfigError::Parse)?;
        if raw.confirmation_rounds == 0 {
            return Err(ConfigError::ZeroConfirmationRounds);
        }
        Ok(Config {
            node: NodeConfig {
                address: raw.algod_address,
                token: raw.algod_token,
            },
            build_dir: raw.build_dir,
            confirmation_rounds: raw.confirmation_rounds,
            max_fee: raw.max_fee,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, error: std::io::Error },
    Parse(serde_json::Error),
    ZeroConfirmationRounds,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Read { path, .. } => write!(f, "failed to read configuration file {}", path.display()),
            ConfigError::Parse(_) => f.write_str("invalid configuration"),
            ConfigError::ZeroConfirmationRounds => f.write_str("confirmationRounds must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { error, .. } => Some(error),
            ConfigError::Parse(error) => Some(error),
            ConfigError::ZeroConfirmationRounds => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use super::{Config, ConfigError};

    const DEVELOPER_CONFIG: &str = r#"{
        "algodAddress": "http://localhost:4001",
        "algodToken": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        "fund_account_mnemonic": "not read"
    }"#;

    #[test]
    fn defaults() {
        let config = Config::from_json(DEVELOPER_CONFIG).unwrap();
        assert_eq!(config.node.address, "http://localhost:4001");
        assert_eq!(config.build_dir, Path::new("build"));
        assert_eq!(config.confirmation_rounds, 5);
        assert_eq!(config.max_fee, 3000);
    }

    #[test]
    fn overrides() {
        let json = r#"{"algodAddress": "a", "algodToken": "t", "buildDir": "/tmp/out", "confirmationRounds": 10, "maxFee": 10000}"#;
        let config = Config::from_json(json).unwrap();
        assert_eq!(config.build_dir, Path::new("/tmp/out"));
        assert_eq!(config.confirmation_rounds, 10);
        assert_eq!(config.max_fee, 10000);
    }

    #[test]
    fn invalid() {
        assert!(matches!(Config::from_json(r#"{"algodAddress": "a"}"#), Err(ConfigError::Parse(_))));
        let json = r#"{"algodAddress": "a", "algodToken": "t", "confirmationRounds": 0}"#;
        assert!(matches!(Config::from_json(json), Err(ConfigError::ZeroConfirmationRounds)));
        assert!(matches!(Config::load("/nonexistent/DeveloperConfig.json"), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn debug_redacts_token() {
        let config = Config::from_json(DEVELOPER_CONFIG).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("aaaa"));
        assert!(debug.contains("http://localhost:4001"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DeveloperConfig.json");
        std::fs::write(&path, DEVELOPER_CONFIG).unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::from_json(DEVELOPER_CONFIG).unwrap());
    }
}
