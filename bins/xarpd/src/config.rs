use std::{fs, path::PathBuf};

use arp::{CONTROL_PORT, DEFAULT_TTL_SECS, TTL_PERMANENT};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error while deserializing TOML: {0}")]
    Deserialize(#[from] toml::de::Error),

    #[error("Error while reading TOML config file: {0}")]
    Read(#[from] std::io::Error),
}

#[derive(Deserialize)]
#[serde(default)]
pub struct RawConfig {
    port: u16,
    default_ttl: i64,
    interfaces: Vec<String>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            port: CONTROL_PORT,
            default_ttl: DEFAULT_TTL_SECS as i64,
            interfaces: Vec::new(),
        }
    }
}

impl RawConfig {
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let b = fs::read_to_string(path)?;
        let c: Self = toml::from_str(&b)?;

        Ok(c)
    }

    pub fn validate(&self) -> Result<Config, ConfigError> {
        Ok(Config {
            port: self.port,
            // Any negative TTL in the file selects permanence
            default_ttl: if self.default_ttl < 0 {
                TTL_PERMANENT
            } else {
                self.default_ttl.min(i32::MAX as i64) as i32
            },
            interfaces: self.interfaces.clone(),
        })
    }
}

pub struct Config {
    pub port: u16,
    pub default_ttl: i32,
    pub interfaces: Vec<String>,
}

impl Config {
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw_config = RawConfig::from_file(path)?;
        raw_config.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: CONTROL_PORT,
            default_ttl: DEFAULT_TTL_SECS,
            interfaces: Vec::new(),
        }
    }
}
