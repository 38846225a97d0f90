/// Erros de armazenamento/engine de dados.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("chave não encontrada")]
    KeyNotFound,
    #[error("chave expirada")]
    Expired,
    #[error("tipo de valor inválido: esperado string ou lista de strings")]
    InvalidType,
}

/// Erros do log de operações (escrita e replay).
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("linha {line}: registro inválido: {reason}")]
    Corrupt { line: usize, reason: String },
    #[error("linha {line}: chave '{key}' não existe para '{command}'")]
    MissingKey {
        line: usize,
        command: String,
        key: String,
    },
    #[error("linha {line}: falha ao aplicar operação em '{key}': {source}")]
    Replay {
        line: usize,
        key: String,
        source: StorageError,
    },
}

/// Erros de validação da configuração do store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("intervalo de limpeza deve ser maior que zero")]
    ZeroCleanupInterval,
    #[error("TTL padrão deve ser maior que zero")]
    ZeroDefaultTtl,
}

/// Erro top-level do MemoryDB.
#[derive(Debug, thiserror::Error)]
pub enum MemoryDbError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias.
pub type MemoryDbResult<T> = Result<T, MemoryDbError>;

// Conversão implícita de io::Error → MemoryDbError (via PersistenceError)
impl From<std::io::Error> for MemoryDbError {
    fn from(e: std::io::Error) -> Self {
        MemoryDbError::Persistence(PersistenceError::Io(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_display() {
        let err = StorageError::InvalidType;
        assert_eq!(
            err.to_string(),
            "tipo de valor inválido: esperado string ou lista de strings"
        );
        assert_eq!(StorageError::KeyNotFound.to_string(), "chave não encontrada");
    }

    #[test]
    fn persistence_error_display() {
        let err = PersistenceError::MissingKey {
            line: 3,
            command: "update".into(),
            key: "p".into(),
        };
        assert_eq!(err.to_string(), "linha 3: chave 'p' não existe para 'update'");
    }

    #[test]
    fn replay_error_keeps_source() {
        let err = PersistenceError::Replay {
            line: 7,
            key: "list".into(),
            source: StorageError::InvalidType,
        };
        assert!(err.to_string().starts_with("linha 7: falha ao aplicar operação em 'list'"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn memorydb_error_from_storage() {
        let err: MemoryDbError = StorageError::Expired.into();
        assert!(matches!(err, MemoryDbError::Storage(StorageError::Expired)));
    }

    #[test]
    fn memorydb_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MemoryDbError = io_err.into();
        assert!(matches!(
            err,
            MemoryDbError::Persistence(PersistenceError::Io(_))
        ));
    }

    #[test]
    fn config_error_display() {
        let err: MemoryDbError = ConfigError::ZeroDefaultTtl.into();
        assert_eq!(err.to_string(), "TTL padrão deve ser maior que zero");
    }
}
