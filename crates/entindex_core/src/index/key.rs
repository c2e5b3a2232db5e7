//! Comparable key values.

use crate::entity::EntityId;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The comparable type of a key field.
///
/// Floating point values are not key types: they have no total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// `true` / `false`.
    Bool,
    /// Signed 64-bit integer.
    Integer,
    /// Point in time.
    Timestamp,
    /// 128-bit GUID, typically a reference to another entity.
    Guid,
    /// UTF-8 text, ordered bytewise.
    Text,
    /// Raw bytes, ordered bytewise.
    Bytes,
}

impl KeyKind {
    /// Returns true if values of this kind can key a time series.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, KeyKind::Timestamp | KeyKind::Integer)
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyKind::Bool => "bool",
            KeyKind::Integer => "integer",
            KeyKind::Timestamp => "timestamp",
            KeyKind::Guid => "guid",
            KeyKind::Text => "text",
            KeyKind::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// One component of a key tuple.
///
/// `Null` sorts before every other value. Non-null values are only ever
/// compared with values of the same [`KeyKind`] inside one index level.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    /// Absent value of a nullable field.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Timestamp value.
    Timestamp(Timestamp),
    /// GUID value.
    Guid(Uuid),
    /// Text value.
    Text(String),
    /// Byte string value.
    Bytes(Vec<u8>),
}

impl KeyValue {
    /// Returns the kind of this value, or `None` for `Null`.
    #[must_use]
    pub const fn kind(&self) -> Option<KeyKind> {
        match self {
            KeyValue::Null => None,
            KeyValue::Bool(_) => Some(KeyKind::Bool),
            KeyValue::Integer(_) => Some(KeyKind::Integer),
            KeyValue::Timestamp(_) => Some(KeyKind::Timestamp),
            KeyValue::Guid(_) => Some(KeyKind::Guid),
            KeyValue::Text(_) => Some(KeyKind::Text),
            KeyValue::Bytes(_) => Some(KeyKind::Bytes),
        }
    }

    /// Returns true for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, KeyValue::Null)
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Null => f.write_str("null"),
            KeyValue::Bool(v) => write!(f, "{v}"),
            KeyValue::Integer(v) => write!(f, "{v}"),
            KeyValue::Timestamp(v) => write!(f, "{v}"),
            KeyValue::Guid(v) => write!(f, "{v}"),
            KeyValue::Text(v) => write!(f, "{v:?}"),
            KeyValue::Bytes(v) => write!(f, "bytes[{}]", v.len()),
        }
    }
}

impl From<bool> for KeyValue {
    fn from(v: bool) -> Self {
        KeyValue::Bool(v)
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Integer(v)
    }
}

impl From<i32> for KeyValue {
    fn from(v: i32) -> Self {
        KeyValue::Integer(i64::from(v))
    }
}

impl From<u32> for KeyValue {
    fn from(v: u32) -> Self {
        KeyValue::Integer(i64::from(v))
    }
}

impl From<Timestamp> for KeyValue {
    fn from(v: Timestamp) -> Self {
        KeyValue::Timestamp(v)
    }
}

impl From<Uuid> for KeyValue {
    fn from(v: Uuid) -> Self {
        KeyValue::Guid(v)
    }
}

impl From<EntityId> for KeyValue {
    fn from(v: EntityId) -> Self {
        KeyValue::Guid(*v.as_uuid())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        KeyValue::Text(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Text(v.to_owned())
    }
}

impl From<Vec<u8>> for KeyValue {
    fn from(v: Vec<u8>) -> Self {
        KeyValue::Bytes(v)
    }
}

impl<T: Into<KeyValue>> From<Option<T>> for KeyValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(KeyValue::Null, Into::into)
    }
}
