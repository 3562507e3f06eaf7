use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ACCESS_TOKEN_URL: &str = "https://www.sidefx.com/oauth2/application_token";
pub const DEFAULT_ENDPOINT_URL: &str = "https://www.sidefx.com/api/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OAuth2 endpoint that exchanges client credentials for an access token
    pub access_token_url: String,

    /// Endpoint receiving the RPC-style API calls
    pub endpoint_url: String,

    /// Product whose daily builds are requested
    pub product: String,

    /// Platform whose daily builds are requested
    pub platform: String,

    /// Only consider production builds
    pub only_production: bool,

    /// Where the downloaded archive is written. Overwritten on every run.
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token_url: DEFAULT_ACCESS_TOKEN_URL.to_string(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            product: "houdini".to_string(),
            platform: "linux".to_string(),
            only_production: true,
            output: PathBuf::from("hou.tar.gz"),
        }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// An explicit `path` must exist. Without one, the default config file is
    /// read if present, see [Self::default_config_file]; otherwise the
    /// built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_config_file() {
                Some(default_path) if default_path.is_file() => Self::from_file(&default_path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn default_config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hfetch").join("config.toml"))
    }
}
