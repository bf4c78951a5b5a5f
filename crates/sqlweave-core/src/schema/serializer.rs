//! Field value serializers selected with the `serializer` tag.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::Field;
use crate::error::{Error, Result};
use crate::value::SqlValue;

/// Converts a field value to and from its stored form.
pub trait Serializer: fmt::Debug + Send + Sync {
    /// Converts a field value into the value bound to the statement.
    fn value(&self, field: &Field, value: &serde_json::Value) -> Result<SqlValue>;

    /// Converts a stored value back into a field value.
    fn scan(&self, field: &Field, stored: &SqlValue) -> Result<serde_json::Value>;
}

/// Stores values as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn value(&self, field: &Field, value: &serde_json::Value) -> Result<SqlValue> {
        if value.is_null() {
            return Ok(if field.not_null {
                SqlValue::Text(String::new())
            } else {
                SqlValue::Null
            });
        }
        serde_json::to_string(value)
            .map(SqlValue::Text)
            .map_err(|err| Error::Serialization(format!("{}: {err}", field.name)))
    }

    fn scan(&self, field: &Field, stored: &SqlValue) -> Result<serde_json::Value> {
        let text = match stored {
            SqlValue::Null => return Ok(serde_json::Value::Null),
            SqlValue::Text(text) => text.clone(),
            SqlValue::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            other => return Ok(to_json(other)),
        };
        if text.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|err| Error::Serialization(format!("{}: {err}", field.name)))
    }
}

/// Stores integer unix seconds as a timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixTimeSerializer;

impl Serializer for UnixTimeSerializer {
    fn value(&self, field: &Field, value: &serde_json::Value) -> Result<SqlValue> {
        if value.is_null() {
            return Ok(SqlValue::Null);
        }
        let seconds = match (value.as_i64(), value.as_u64()) {
            (Some(seconds), _) => seconds,
            (None, Some(seconds)) => {
                return Err(Error::Serialization(format!(
                    "{}: integer overflow converting {seconds} to unix time",
                    field.name
                )))
            }
            (None, None) => {
                return Err(Error::Serialization(format!(
                    "{}: unix time requires an integer, got {value}",
                    field.name
                )))
            }
        };
        DateTime::<Utc>::from_timestamp(seconds, 0)
            .map(SqlValue::Time)
            .ok_or_else(|| {
                Error::Serialization(format!("{}: {seconds} is out of range", field.name))
            })
    }

    fn scan(&self, field: &Field, stored: &SqlValue) -> Result<serde_json::Value> {
        match stored {
            SqlValue::Null => Ok(serde_json::Value::Null),
            SqlValue::Time(time) => Ok(serde_json::Value::from(time.timestamp())),
            SqlValue::Int(seconds) => Ok(serde_json::Value::from(*seconds)),
            other => Err(Error::Serialization(format!(
                "{}: cannot read unix time from {}",
                field.name,
                other.to_sql_inline()
            ))),
        }
    }
}

fn to_json(value: &SqlValue) -> serde_json::Value {
    match value {
        SqlValue::Null => serde_json::Value::Null,
        SqlValue::Bool(b) => serde_json::Value::from(*b),
        SqlValue::Int(i) => serde_json::Value::from(*i),
        SqlValue::Uint(u) => serde_json::Value::from(*u),
        SqlValue::Float(f) => serde_json::Value::from(*f),
        SqlValue::Text(text) => serde_json::Value::from(text.as_str()),
        SqlValue::Blob(bytes) => {
            serde_json::Value::from(String::from_utf8_lossy(bytes).into_owned())
        }
        SqlValue::Time(time) => serde_json::Value::from(time.to_rfc3339()),
        SqlValue::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
    }
}

static SERIALIZERS: Lazy<DashMap<String, Arc<dyn Serializer>>> = Lazy::new(|| {
    let registry: DashMap<String, Arc<dyn Serializer>> = DashMap::new();
    registry.insert(String::from("json"), Arc::new(JsonSerializer));
    registry.insert(String::from("unixtime"), Arc::new(UnixTimeSerializer));
    registry
});

/// Registers a serializer under `name`, replacing any previous one.
pub fn register(name: &str, serializer: Arc<dyn Serializer>) {
    SERIALIZERS.insert(name.to_lowercase(), serializer);
}

/// Looks up a serializer by name, case-insensitively.
#[must_use]
pub fn lookup(name: &str) -> Option<Arc<dyn Serializer>> {
    SERIALIZERS
        .get(&name.to_lowercase())
        .map(|entry| Arc::clone(entry.value()))
}
