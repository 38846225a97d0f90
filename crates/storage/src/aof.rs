use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use memorydb_common::{LOG_FILE_NAME, PersistenceError};

use crate::entry::Entry;
use crate::value::{Kind, Value};

/// Comando registrado no log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Set,
    Update,
    Remove,
    Push,
    Pop,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Set => "set",
            Command::Update => "update",
            Command::Remove => "remove",
            Command::Push => "push",
            Command::Pop => "pop",
        }
    }
}

/// Registro do log: uma linha JSON por mutação bem-sucedida.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub command: Command,
    pub key: String,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Operation {
    fn bare(command: Command, key: &str, time: DateTime<Utc>) -> Self {
        Self {
            command,
            key: key.to_string(),
            time,
            value: None,
            ttl: None,
            kind: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn set(key: &str, entry: &Entry) -> Self {
        Self {
            value: Some(entry.value().clone()),
            ttl: Some(entry.expires_at()),
            kind: Some(entry.kind()),
            created_at: Some(entry.created_at()),
            updated_at: Some(entry.updated_at()),
            ..Self::bare(Command::Set, key, entry.updated_at())
        }
    }

    pub fn update(key: &str, entry: &Entry) -> Self {
        Self {
            value: Some(entry.value().clone()),
            ttl: Some(entry.expires_at()),
            kind: Some(entry.kind()),
            updated_at: Some(entry.updated_at()),
            ..Self::bare(Command::Update, key, entry.updated_at())
        }
    }

    pub fn remove(key: &str, time: DateTime<Utc>) -> Self {
        Self::bare(Command::Remove, key, time)
    }

    /// `value` carrega só o item empilhado, não a lista inteira.
    pub fn push(key: &str, item: &str, entry: &Entry) -> Self {
        Self {
            value: Some(Value::Text(item.to_string())),
            ttl: Some(entry.expires_at()),
            kind: Some(entry.kind()),
            updated_at: Some(entry.updated_at()),
            ..Self::bare(Command::Push, key, entry.updated_at())
        }
    }

    pub fn pop(key: &str, entry: &Entry) -> Self {
        Self {
            updated_at: Some(entry.updated_at()),
            ..Self::bare(Command::Pop, key, entry.updated_at())
        }
    }
}

/// Writer append-only do log. Cada registro vai para o arquivo numa única
/// chamada de `write_all`, antes de a operação retornar.
#[derive(Debug)]
pub struct AofWriter {
    file: File,
    path: PathBuf,
}

impl AofWriter {
    /// Cria o diretório (se preciso) e abre `<dir>/memorydb.log` em modo append.
    pub fn open(dir: &Path) -> Result<Self, PersistenceError> {
        std::fs::create_dir_all(dir)?;
        let path = log_path(dir);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        info!("log de operações aberto: {:?}", path);
        Ok(Self { file, path })
    }

    pub fn append(&mut self, op: &Operation) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_vec(op).map_err(std::io::Error::from)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Caminho fixo do log dentro do diretório de persistência.
pub fn log_path(dir: &Path) -> PathBuf {
    dir.join(LOG_FILE_NAME)
}

/// Lê o log e reconstrói o mapa de entradas, em ordem de arquivo.
///
/// Qualquer linha inválida ou operação sem a chave correspondente aborta o
/// replay: o store não sobe com um estado sabidamente inconsistente.
pub async fn replay_aof(path: &Path) -> Result<HashMap<String, Entry>, PersistenceError> {
    let mut entries = HashMap::new();

    if !tokio::fs::try_exists(path).await? {
        info!("arquivo de log não encontrado, iniciando sem dados");
        return Ok(entries);
    }

    let data = tokio::fs::read_to_string(path).await?;
    let mut count = 0;

    for (idx, raw) in data.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let op: Operation = serde_json::from_str(raw).map_err(|e| PersistenceError::Corrupt {
            line,
            reason: e.to_string(),
        })?;
        debug!("replay linha {line}: {} {}", op.command.as_str(), op.key);
        apply_operation(&mut entries, op, line)?;
        count += 1;
    }

    info!(
        "replay completo: {count} operações aplicadas, {} chaves restauradas",
        entries.len()
    );
    Ok(entries)
}

/// Aplica um registro ao mapa (replay do log).
fn apply_operation(
    entries: &mut HashMap<String, Entry>,
    op: Operation,
    line: usize,
) -> Result<(), PersistenceError> {
    let updated_at = op.updated_at.unwrap_or(op.time);

    match op.command {
        Command::Set => {
            let value = checked_value(op.value, op.kind, line)?;
            let expires_at = op.ttl.ok_or_else(|| corrupt(line, "set sem ttl"))?;
            let created_at = op.created_at.unwrap_or(op.time);
            entries.insert(
                op.key,
                Entry::restore(value, expires_at, created_at, updated_at),
            );
        }
        Command::Update => {
            let entry = existing(entries, &op.key, op.command, line)?;
            let value = checked_value(op.value, op.kind, line)?;
            entry.replace(value, updated_at, None);
            if let Some(ttl) = op.ttl {
                entry.set_expires_at(ttl);
            }
        }
        Command::Remove => {
            existing(entries, &op.key, op.command, line)?;
            entries.remove(&op.key);
        }
        Command::Push => {
            let entry = existing(entries, &op.key, op.command, line)?;
            let item = match op.value {
                Some(Value::Text(item)) => item,
                _ => return Err(corrupt(line, "push sem item string")),
            };
            entry
                .push(item, updated_at)
                .map_err(|source| PersistenceError::Replay {
                    line,
                    key: op.key.clone(),
                    source,
                })?;
            if let Some(ttl) = op.ttl {
                entry.set_expires_at(ttl);
            }
        }
        Command::Pop => {
            let entry = existing(entries, &op.key, op.command, line)?;
            entry
                .pop(updated_at)
                .map_err(|source| PersistenceError::Replay {
                    line,
                    key: op.key.clone(),
                    source,
                })?;
        }
    }

    Ok(())
}

fn existing<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    command: Command,
    line: usize,
) -> Result<&'a mut Entry, PersistenceError> {
    entries
        .get_mut(key)
        .ok_or_else(|| PersistenceError::MissingKey {
            line,
            command: command.as_str().to_string(),
            key: key.to_string(),
        })
}

fn checked_value(
    value: Option<Value>,
    kind: Option<Kind>,
    line: usize,
) -> Result<Value, PersistenceError> {
    let value = value.ok_or_else(|| corrupt(line, "registro sem value"))?;
    match kind {
        Some(kind) if kind != value.kind() => Err(corrupt(line, "kind diverge do value")),
        _ => Ok(value),
    }
}

fn corrupt(line: usize, reason: &str) -> PersistenceError {
    PersistenceError::Corrupt {
        line,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn entry(value: Value) -> Entry {
        Entry::new(value, Duration::from_secs(60), Utc::now())
    }

    #[test]
    fn set_record_shape() {
        let e = entry(Value::from(vec!["a", "b"]));
        let json = serde_json::to_value(Operation::set("k", &e)).unwrap();

        assert_eq!(json["command"], "set");
        assert_eq!(json["key"], "k");
        assert_eq!(json["value"], serde_json::json!(["a", "b"]));
        assert_eq!(json["kind"], 1);
        assert!(json["ttl"].is_string());
        assert!(json["created_at"].is_string());
        assert!(json["updated_at"].is_string());
    }

    #[test]
    fn remove_record_has_no_value_fields() {
        let json = serde_json::to_value(Operation::remove("k", Utc::now())).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["command", "key", "time"]);
    }

    #[test]
    fn record_line_round_trip() {
        let mut e = entry(Value::from(vec!["x"]));
        e.push("y".into(), Utc::now()).unwrap();
        let op = Operation::push("list", "y", &e);

        let line = serde_json::to_string(&op).unwrap();
        let back: Operation = serde_json::from_str(&line).unwrap();
        assert_eq!(back, op);
        assert_eq!(back.value, Some(Value::from("y")));
    }

    #[tokio::test]
    async fn write_and_replay() {
        let dir = tempdir().unwrap();
        let mut writer = AofWriter::open(dir.path()).unwrap();

        let mut p = entry(Value::from("1"));
        writer.append(&Operation::set("p", &p)).unwrap();
        p.replace(Value::from("2"), Utc::now(), None);
        writer.append(&Operation::update("p", &p)).unwrap();

        let mut list = entry(Value::from(vec!["x"]));
        writer.append(&Operation::set("list", &list)).unwrap();
        list.push("y".into(), Utc::now()).unwrap();
        writer.append(&Operation::push("list", "y", &list)).unwrap();
        list.push("z".into(), Utc::now()).unwrap();
        writer.append(&Operation::push("list", "z", &list)).unwrap();
        list.pop(Utc::now()).unwrap();
        writer.append(&Operation::pop("list", &list)).unwrap();

        let gone = entry(Value::from("tmp"));
        writer.append(&Operation::set("gone", &gone)).unwrap();
        writer.append(&Operation::remove("gone", Utc::now())).unwrap();
        drop(writer);

        let entries = replay_aof(&log_path(dir.path())).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["p"], p);
        assert_eq!(entries["list"], list);
        assert_eq!(entries["list"].value(), &Value::from(vec!["x", "y"]));
    }

    #[tokio::test]
    async fn replay_nonexistent() {
        let dir = tempdir().unwrap();
        let entries = replay_aof(&dir.path().join("missing.log")).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn replay_empty_file() {
        let dir = tempdir().unwrap();
        let path = log_path(dir.path());
        tokio::fs::write(&path, b"").await.unwrap();
        assert!(replay_aof(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replay_update_missing_key_is_fatal() {
        let dir = tempdir().unwrap();
        let path = log_path(dir.path());
        let e = entry(Value::from("v"));
        let line = serde_json::to_string(&Operation::update("ghost", &e)).unwrap();
        tokio::fs::write(&path, format!("{line}\n")).await.unwrap();

        let err = replay_aof(&path).await.unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::MissingKey { line: 1, ref key, .. } if key == "ghost"
        ));
    }

    #[tokio::test]
    async fn replay_corrupted_line_is_fatal() {
        let dir = tempdir().unwrap();
        let path = log_path(dir.path());
        let e = entry(Value::from("v"));
        let valid = serde_json::to_string(&Operation::set("k", &e)).unwrap();
        tokio::fs::write(&path, format!("{valid}\n{{\"command\":\"set\",\"ke"))
            .await
            .unwrap();

        let err = replay_aof(&path).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { line: 2, .. }));
    }

    #[tokio::test]
    async fn replay_pop_on_empty_list_is_fatal() {
        let dir = tempdir().unwrap();
        let path = log_path(dir.path());
        let e = entry(Value::List(vec![]));
        let lines = [
            serde_json::to_string(&Operation::set("l", &e)).unwrap(),
            serde_json::to_string(&Operation::pop("l", &e)).unwrap(),
        ];
        tokio::fs::write(&path, lines.join("\n")).await.unwrap();

        let err = replay_aof(&path).await.unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Replay {
                line: 2,
                source: memorydb_common::StorageError::KeyNotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn replay_kind_mismatch_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = log_path(dir.path());
        let line = r#"{"command":"set","key":"k","time":"2024-01-01T00:00:00Z","value":"v","ttl":"2024-01-01T00:05:00Z","kind":1}"#;
        tokio::fs::write(&path, line).await.unwrap();

        let err = replay_aof(&path).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { line: 1, .. }));
    }
}
