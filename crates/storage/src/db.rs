use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, warn};

use memorydb_common::{MemoryDbResult, StorageError};

use crate::aof::{AofWriter, Operation, log_path, replay_aof};
use crate::config::StoreConfig;
use crate::entry::Entry;
use crate::value::Value;

/// Dados protegidos pelo lock único: mapa de entradas + handle do log.
struct State {
    entries: HashMap<String, Entry>,
    aof: Option<AofWriter>,
}

/// Estado compartilhado entre todos os handles.
struct SharedState {
    state: RwLock<State>,
    default_ttl: Duration,
    shutdown: watch::Sender<bool>,
}

/// Handle para o banco de dados in-memory.
///
/// Toda operação (inclusive `get`, que pode despejar uma chave expirada)
/// segura o lock exclusivo do mapa inteiro do início ao fim.
#[derive(Clone)]
pub struct Db {
    shared: Arc<SharedState>,
}

impl Db {
    /// Store com configuração padrão e sem persistência.
    ///
    /// Precisa de um runtime Tokio ativo (a varredura roda em background).
    pub fn new() -> Self {
        Self::build(&StoreConfig::default(), HashMap::new(), None)
    }

    /// Valida a configuração e, com persistência ligada, faz o replay do log
    /// antes de devolver o handle.
    pub async fn open(config: StoreConfig) -> MemoryDbResult<Self> {
        config.validate()?;

        let (entries, aof) = match config.persistence_dir {
            Some(ref dir) => {
                let entries = replay_aof(&log_path(dir)).await?;
                (entries, Some(AofWriter::open(dir)?))
            }
            None => (HashMap::new(), None),
        };

        Ok(Self::build(&config, entries, aof))
    }

    fn build(config: &StoreConfig, entries: HashMap<String, Entry>, aof: Option<AofWriter>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let db = Db {
            shared: Arc::new(SharedState {
                state: RwLock::new(State { entries, aof }),
                default_ttl: config.default_ttl,
                shutdown: shutdown_tx,
            }),
        };

        // Spawn background task para purgar keys expiradas
        let shared = Arc::downgrade(&db.shared);
        tokio::spawn(purge_expired_keys(
            shared,
            config.cleanup_interval,
            shutdown_rx,
        ));

        db
    }

    fn lock(&self) -> RwLockWriteGuard<'_, State> {
        self.shared.lock()
    }

    pub fn get(&self, key: &str) -> Result<Entry, StorageError> {
        let mut state = self.lock();
        let entry = state.entries.get(key).ok_or(StorageError::KeyNotFound)?;

        if entry.is_expired(Utc::now()) {
            state.entries.remove(key);
            return Err(StorageError::Expired);
        }
        Ok(entry.clone())
    }

    /// Cria ou sobrescreve a chave. `created_at` e `updated_at` sempre voltam
    /// para agora.
    pub fn set(&self, key: String, value: Value, ttl: Option<Duration>) {
        let entry = Entry::new(value, ttl.unwrap_or(self.shared.default_ttl), Utc::now());

        let mut guard = self.lock();
        let state = &mut *guard;
        let slot = state.entries.entry(key).insert_entry(entry);

        if let Some(aof) = state.aof.as_mut() {
            append(aof, Operation::set(slot.key(), slot.get()));
        }
    }

    pub fn update(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StorageError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let entry = live_entry(&mut state.entries, key, Utc::now())?;

        entry.replace(value, Utc::now(), ttl);

        if let Some(aof) = state.aof.as_mut() {
            append(aof, Operation::update(key, entry));
        }
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let now = Utc::now();
        live_entry(&mut state.entries, key, now)?;
        state.entries.remove(key);

        if let Some(aof) = state.aof.as_mut() {
            append(aof, Operation::remove(key, now));
        }
        Ok(())
    }

    /// Adiciona `item` ao final da lista e devolve a entrada atualizada.
    pub fn push(&self, key: &str, item: String, ttl: Option<Duration>) -> Result<Entry, StorageError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let now = Utc::now();
        let entry = live_entry(&mut state.entries, key, now)?;

        entry.push(item, now)?;
        if let Some(ttl) = ttl {
            entry.refresh_ttl(ttl, now);
        }

        if let Some(aof) = state.aof.as_mut()
            && let Value::List(list) = entry.value()
            && let Some(item) = list.last()
        {
            append(aof, Operation::push(key, item, entry));
        }
        Ok(entry.clone())
    }

    /// Remove o último item da lista e devolve a entrada já sem ele.
    pub fn pop(&self, key: &str) -> Result<Entry, StorageError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let now = Utc::now();
        let entry = live_entry(&mut state.entries, key, now)?;

        entry.pop(now)?;

        if let Some(aof) = state.aof.as_mut() {
            append(aof, Operation::pop(key, entry));
        }
        Ok(entry.clone())
    }

    /// Para a varredura, limpa o mapa e fecha o log. Chamadas repetidas não
    /// fazem nada.
    pub fn close(&self) {
        self.shared.shutdown.send_replace(true);

        let mut state = self.lock();
        state.entries.clear();
        if let Some(aof) = state.aof.take() {
            info!("log de operações fechado: {:?}", aof.path());
        }
    }

    /// Roda uma varredura agora. Retorna quantas chaves foram removidas.
    pub fn purge_expired(&self) -> usize {
        self.shared.purge_expired(Utc::now())
    }

    /// Número de entradas no mapa, incluindo expiradas ainda não varridas.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    fn lock(&self) -> RwLockWriteGuard<'_, State> {
        // Nenhuma operação deixa o mapa pela metade entre dois statements.
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        before - state.entries.len()
    }
}

/// Busca uma entrada viva; expirada conta como ausente e é despejada.
fn live_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: DateTime<Utc>,
) -> Result<&'a mut Entry, StorageError> {
    let expired = entries
        .get(key)
        .ok_or(StorageError::KeyNotFound)?
        .is_expired(now);

    if expired {
        entries.remove(key);
        debug!("key expirada removida: {key}");
        return Err(StorageError::KeyNotFound);
    }
    entries.get_mut(key).ok_or(StorageError::KeyNotFound)
}

fn append(aof: &mut AofWriter, op: Operation) {
    if let Err(e) = aof.append(&op) {
        warn!(
            "falha ao gravar operação '{}' da chave '{}' no log: {e}",
            op.command.as_str(),
            op.key
        );
    }
}

/// Background task que purga chaves expiradas a cada `every`.
async fn purge_expired_keys(
    shared: Weak<SharedState>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval(every);
    // Primeiro tick é imediato
    tick.tick().await;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let Some(shared) = shared.upgrade() else { break };
                let removed = shared.purge_expired(Utc::now());
                if removed > 0 {
                    debug!("varredura: {removed} keys expiradas removidas");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("varredura de expiração encerrada");
}
