use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::error::{Result, SqlError};

/// SQL type of a value, kept on nulls so that Postgres receives correctly
/// typed parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    Uuid,
    Timestamp,
}

/// A single SQL value read from or written to a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Null(Kind),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Text(_) => Kind::Text,
            Value::Bytes(_) => Kind::Bytes,
            Value::Uuid(_) => Kind::Uuid,
            Value::Timestamp(_) => Kind::Timestamp,
            Value::Null(kind) => *kind,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Timestamp(_) => "timestamp",
            Value::Null(_) => "null",
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }

            impl From<Option<$ty>> for Value {
                fn from(value: Option<$ty>) -> Self {
                    value.map_or(Value::Null(Kind::$variant), Value::from)
                }
            }
        )*
    };
}

value_from!(
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<Key> for Value {
    fn from(value: Key) -> Self {
        match value {
            Key::Int(id) => Value::Int(id),
            Key::Uuid(id) => Value::Uuid(id),
        }
    }
}

impl From<Option<Key>> for Value {
    fn from(value: Option<Key>) -> Self {
        match value {
            Some(key) => key.into(),
            None => Value::Null(Kind::Int),
        }
    }
}

impl From<Value> for sea_query::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(v) => v.into(),
            Value::Int(v) => v.into(),
            Value::Float(v) => v.into(),
            Value::Text(v) => v.into(),
            Value::Bytes(v) => v.into(),
            Value::Uuid(v) => v.into(),
            Value::Timestamp(v) => v.into(),
            Value::Null(Kind::Bool) => Option::<bool>::None.into(),
            Value::Null(Kind::Int) => Option::<i64>::None.into(),
            Value::Null(Kind::Float) => Option::<f64>::None.into(),
            Value::Null(Kind::Text) => Option::<String>::None.into(),
            Value::Null(Kind::Bytes) => Option::<Vec<u8>>::None.into(),
            Value::Null(Kind::Uuid) => Option::<Uuid>::None.into(),
            Value::Null(Kind::Timestamp) => Option::<DateTime<Utc>>::None.into(),
        }
    }
}

/// Primary key of a row, integer in early generations and UUID later on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Uuid(Uuid),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(id) => write!(f, "{id}"),
            Key::Uuid(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<Uuid> for Key {
    fn from(value: Uuid) -> Self {
        Key::Uuid(value)
    }
}

/// Value did not have the shape the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: &'static str,
    pub found: &'static str,
}

impl Mismatch {
    fn new(expected: &'static str, value: &Value) -> Self {
        Self {
            expected,
            found: value.type_name(),
        }
    }
}

/// Conversion from a decoded SQL value into a Rust type.
///
/// Conversions are lenient where backends disagree on storage: SQLite
/// returns booleans as integers, timestamps as text and UUIDs as 16 byte
/// blobs, so those shapes are accepted too.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Null(_) => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Bool(v) => Ok(*v),
            Value::Int(v) => Ok(*v != 0),
            value => Err(Mismatch::new("bool", value)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Int(v) => Ok(*v),
            value => Err(Mismatch::new("integer", value)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Int(v) => i32::try_from(*v).map_err(|_| Mismatch::new("i32", value)),
            value => Err(Mismatch::new("i32", value)),
        }
    }
}

impl FromValue for i16 {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Int(v) => i16::try_from(*v).map_err(|_| Mismatch::new("i16", value)),
            value => Err(Mismatch::new("i16", value)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            value => Err(Mismatch::new("float", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Text(v) => Ok(v.clone()),
            value => Err(Mismatch::new("text", value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Bytes(v) => Ok(v.clone()),
            Value::Text(v) => Ok(v.as_bytes().to_vec()),
            value => Err(Mismatch::new("bytes", value)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Uuid(v) => Ok(*v),
            Value::Text(v) => Uuid::parse_str(v).map_err(|_| Mismatch::new("uuid", value)),
            Value::Bytes(v) => Uuid::from_slice(v).map_err(|_| Mismatch::new("uuid", value)),
            value => Err(Mismatch::new("uuid", value)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Timestamp(v) => Ok(*v),
            Value::Text(v) => parse_timestamp(v).ok_or_else(|| Mismatch::new("timestamp", value)),
            value => Err(Mismatch::new("timestamp", value)),
        }
    }
}

impl FromValue for Key {
    fn from_value(value: &Value) -> std::result::Result<Self, Mismatch> {
        match value {
            Value::Int(v) => Ok(Key::Int(*v)),
            value => Uuid::from_value(value)
                .map(Key::Uuid)
                .map_err(|_| Mismatch::new("key", value)),
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.with_timezone(&Utc));
    }

    if let Ok(datetime) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(datetime.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// A row returned by the database, columns kept in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push((column.into(), value));
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Decodes the named column.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T> {
        let value = self
            .value(column)
            .ok_or_else(|| SqlError::MissingColumn(column.to_owned()))?;

        T::from_value(value).map_err(|mismatch| SqlError::Decode {
            column: column.to_owned(),
            expected: mismatch.expected,
            found: mismatch.found,
        })
    }

    /// Decodes the first column, for scalar queries such as `COUNT(*)`.
    pub fn first<T: FromValue>(&self) -> Result<T> {
        let (column, _) = self
            .columns
            .first()
            .ok_or_else(|| SqlError::MissingColumn("0".to_owned()))?;

        self.get(&column.clone())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<C: Into<String>> FromIterator<(C, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (C, Value)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(column, value)| (column.into(), value))
                .collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}
