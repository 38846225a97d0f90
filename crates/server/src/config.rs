use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use memorydb_common::{DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TTL_SECS};
use memorydb_storage::StoreConfig;

/// Argumentos da linha de comando; cada um também pode vir de variável de ambiente.
#[derive(Parser, Debug)]
#[command(name = "memorydb-server", about = "MemoryDB — key-value store in-memory com TTL")]
pub struct ServerArgs {
    #[arg(long, env = "MEMORYDB_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    #[arg(long, env = "MEMORYDB_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// TTL padrão das chaves, em segundos.
    #[arg(long, env = "MEMORYDB_DEFAULT_TTL", value_name = "SECS", default_value_t = DEFAULT_TTL_SECS)]
    pub default_ttl: u64,
    /// Intervalo da varredura de chaves expiradas, em segundos.
    #[arg(long, env = "MEMORYDB_CLEANUP_INTERVAL", value_name = "SECS", default_value_t = DEFAULT_CLEANUP_INTERVAL_SECS)]
    pub cleanup_interval: u64,
    /// Diretório do log de operações. Sem ele, nada é persistido.
    #[arg(long, env = "MEMORYDB_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
    #[arg(long, env = "MEMORYDB_VERBOSE")]
    pub verbose: bool,
}

impl ServerArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn store_config(&self) -> StoreConfig {
        let config = StoreConfig::default()
            .with_default_ttl(Duration::from_secs(self.default_ttl))
            .with_cleanup_interval(Duration::from_secs(self.cleanup_interval));

        match self.data_dir {
            Some(ref dir) => config.with_persistence_dir(dir),
            None => config,
        }
    }

    /// Filtro de log usado quando `RUST_LOG` não está definido.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "memorydb_server=debug,memorydb_storage=debug,tower_http=debug"
        } else {
            "memorydb_server=info,memorydb_storage=info"
        }
    }
}
