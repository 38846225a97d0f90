use std::path::PathBuf;
use std::time::Duration;

use memorydb_common::{ConfigError, DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_TTL_SECS};

/// Configuração do store, validada uma vez em [`Db::open`](crate::Db::open).
///
/// ```rust
/// use memorydb_storage::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_cleanup_interval(Duration::from_secs(30))
///     .with_persistence_dir("/tmp/memorydb");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Intervalo entre varreduras de chaves expiradas (padrão: 5 min).
    pub cleanup_interval: Duration,
    /// TTL aplicado quando a operação não informa um (padrão: 5 min).
    pub default_ttl: Duration,
    /// Diretório do log de operações. `None` desliga a persistência.
    pub persistence_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            persistence_dir: None,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_persistence_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persistence_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::ZeroCleanupInterval);
        }
        if self.default_ttl.is_zero() {
            return Err(ConfigError::ZeroDefaultTtl);
        }
        Ok(())
    }
}
