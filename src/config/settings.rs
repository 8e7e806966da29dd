use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::{ConfigError, LogLevel, ProducerConfig, producer::ProducerFileEntry};

// -----------------------------------------------------------------------------
// ----- PoolSettings ----------------------------------------------------------

/// Everything needed to build a pool: where to connect, how many
/// connections, and the options each connection gets.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub address: String,
    pub connections: usize,
    pub log_level: LogLevel,
    pub producer: ProducerConfig,
}

// -----------------------------------------------------------------------------
// ----- PoolSettings: Static --------------------------------------------------

impl PoolSettings {
    pub async fn from_file(path: &Path) -> Result<PoolSettings, ConfigError> {
        let raw = fs::read_to_string(path).await.map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let settings = Self::parse(&raw)?;
        debug!(
            "loaded pool settings from {:?}: {} connections to {}",
            path, settings.connections, settings.address
        );
        Ok(settings)
    }

    pub fn parse(raw: &str) -> Result<PoolSettings, ConfigError> {
        let doc: SettingsFile = toml::from_str(raw).map_err(|e| ConfigError::Toml { source: e })?;

        let address = doc.address.trim().to_string();
        if address.is_empty() {
            return Err(ConfigError::InvalidField("address".to_string()));
        }

        if doc.connections == 0 {
            return Err(ConfigError::OutOfRange {
                field: "connections",
                value: doc.connections.to_string(),
                expected: ">= 1",
            });
        }

        let producer = doc.producer.into_config();
        producer.validate()?;

        Ok(PoolSettings {
            address,
            connections: doc.connections,
            log_level: doc.log_level,
            producer,
        })
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: On-disk format ----------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    address: String,

    #[serde(default = "default_connections")]
    connections: usize,

    #[serde(default)]
    log_level: LogLevel,

    #[serde(default)]
    producer: ProducerFileEntry,
}

fn default_connections() -> usize {
    1
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
