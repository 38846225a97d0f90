use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use memorydb_common::StorageError;

use crate::value::{Kind, Value};

/// 9999-12-31T23:59:59Z: último instante que ainda cabe em RFC3339.
const LATEST_DEADLINE_SECS: i64 = 253_402_300_799;

fn latest_deadline() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(LATEST_DEADLINE_SECS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Calcula `now + ttl`, saturando em [`latest_deadline`].
pub(crate) fn deadline(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    let latest = latest_deadline();
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .filter(|at| *at <= latest)
        .unwrap_or(latest)
}

/// Entrada no store: valor + metadados de tempo.
///
/// `kind` sempre acompanha a variante de `value`; os campos são privados para
/// que nenhuma mutação troque um sem o outro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    value: Value,
    kind: Kind,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(value: Value, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            kind: value.kind(),
            value,
            expires_at: deadline(now, ttl),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstrói uma entrada a partir de um registro do log.
    pub(crate) fn restore(
        value: Value,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: value.kind(),
            value,
            expires_at,
            created_at,
            updated_at,
        }
    }

    /// Substitui o valor (a variante pode mudar).
    pub fn replace(&mut self, value: Value, updated_at: DateTime<Utc>, ttl: Option<Duration>) {
        self.kind = value.kind();
        self.value = value;
        if let Some(ttl) = ttl {
            self.expires_at = deadline(updated_at, ttl);
        }
        self.updated_at = updated_at;
    }

    /// Adiciona `item` ao final da lista.
    pub fn push(&mut self, item: String, updated_at: DateTime<Utc>) -> Result<(), StorageError> {
        match (&self.kind, &mut self.value) {
            (Kind::List, Value::List(list)) => {
                list.push(item);
                self.updated_at = updated_at;
                Ok(())
            }
            _ => Err(StorageError::InvalidType),
        }
    }

    /// Remove e devolve o último item da lista.
    pub fn pop(&mut self, updated_at: DateTime<Utc>) -> Result<String, StorageError> {
        match (&self.kind, &mut self.value) {
            (Kind::List, Value::List(list)) => {
                let item = list.pop().ok_or(StorageError::KeyNotFound)?;
                self.updated_at = updated_at;
                Ok(item)
            }
            _ => Err(StorageError::InvalidType),
        }
    }

    pub fn refresh_ttl(&mut self, ttl: Duration, now: DateTime<Utc>) {
        self.expires_at = deadline(now, ttl);
    }

    pub(crate) fn set_expires_at(&mut self, expires_at: DateTime<Utc>) {
        self.expires_at = expires_at;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
