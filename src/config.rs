use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::remote::GenerationOptions;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config: {0}")]
    Read(std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(serde_yaml::Error),
}

/// Client configuration, usually read from a YAML file.
///
/// ```yaml
/// endpoint: http://barcodes.internal:5000
/// timeout_secs: 120
/// defaults:
///   create_pdf: true
///   grid_cols: 4
///   grid_rows: 10
///   auto_generate_second_imei: false
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_endpoint")]
    pub endpoint: Url,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub defaults: GenerationOptions,
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            defaults: GenerationOptions::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(source: &str) -> Result<Self, Error> {
        serde_yaml::from_str(source).map_err(Error::Parse)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(Error::Read)?;
        Self::from_yaml(&source)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.endpoint.scheme(), "http" | "https") {
            return Err(format!(
                "endpoint must be an http(s) URL, got {}",
                self.endpoint
            ));
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be positive".to_owned());
        }
        if self.defaults.grid_cols == 0 || self.defaults.grid_rows == 0 {
            return Err("default grid dimensions must be positive".to_owned());
        }
        Ok(())
    }
}
