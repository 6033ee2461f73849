use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub blob: BlobConfig,
    pub identity: IdentityConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file, or ":memory:"
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Base URL under which uploaded objects are publicly readable
    pub public_url: Option<String>,
    /// Files larger than this are sent as multipart uploads
    #[serde(default = "default_part_size_mb")]
    pub part_size_mb: u64,
}

fn default_part_size_mb() -> u64 {
    8
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub uid: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub path: Option<String>,
    /// Rotate the log file after this many MiB
    pub size: Option<u64>,
    pub max_files: Option<usize>,
}

pub fn load_config(path: &str) -> Result<Config> {
    let config_text = fs::read_to_string(Path::new(path))
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: Config = toml::from_str(&config_text)
        .with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}
