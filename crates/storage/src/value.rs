use serde::{Deserialize, Deserializer, Serialize, Serializer};

use memorydb_common::StorageError;

/// Tipo do valor armazenado.
///
/// Serializado sem tag: texto vira string JSON e lista vira array JSON, então
/// a distinção entre os dois formatos sobrevive ao log de operações.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    List(Vec<String>),
}

/// Tag redundante com a variante de [`Value`], gravada como inteiro (0 ou 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Text = 0,
    List = 1,
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Text(_) => Kind::Text,
            Value::List(_) => Kind::List,
        }
    }
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Text => "string",
            Kind::List => "list",
        }
    }
}

impl Serialize for Kind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Kind::Text),
            1 => Ok(Kind::List),
            other => Err(serde::de::Error::custom(format!(
                "kind inválido: {other}"
            ))),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Conversão de JSON arbitrário (ex.: corpo de requisição).
///
/// Arrays só são aceitos se todos os elementos forem strings.
impl TryFrom<serde_json::Value> for Value {
    type Error = StorageError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => Ok(s),
                    _ => Err(StorageError::InvalidType),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            _ => Err(StorageError::InvalidType),
        }
    }
}
