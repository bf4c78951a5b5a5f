//! SQLite dialect.

use super::Dialect;
use crate::schema::{DataType, Field};

/// SQLite: backtick identifiers and `?` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn data_type_of(&self, field: &Field) -> String {
        match &field.data_type {
            Some(DataType::Bool) => "numeric".to_string(),
            Some(DataType::Int | DataType::Uint) if field.auto_increment && field.primary_key => {
                "integer PRIMARY KEY AUTOINCREMENT".to_string()
            }
            Some(DataType::Int | DataType::Uint) => "integer".to_string(),
            Some(DataType::Float) => "real".to_string(),
            Some(DataType::String) => "text".to_string(),
            Some(DataType::Time) => "datetime".to_string(),
            Some(DataType::Bytes | DataType::BytesArray) => "blob".to_string(),
            Some(DataType::Custom(name)) => name.clone(),
            None => String::new(),
        }
    }

    fn max_limit(&self) -> Option<u64> {
        Some(i64::MAX.unsigned_abs())
    }
}
