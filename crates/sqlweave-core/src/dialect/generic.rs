//! Generic SQL dialect.

use super::Dialect;
use crate::schema::{DataType, Field};

/// A generic SQL dialect using ANSI SQL standards.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl GenericDialect {
    /// Creates a new generic dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn data_type_of(&self, field: &Field) -> String {
        match &field.data_type {
            Some(DataType::Bool) => "BOOLEAN".to_string(),
            Some(DataType::Int | DataType::Uint) => match field.size {
                0..=16 => "SMALLINT".to_string(),
                17..=32 => "INTEGER".to_string(),
                _ => "BIGINT".to_string(),
            },
            Some(DataType::Float) => match (field.precision, field.scale) {
                (0, _) => "DOUBLE PRECISION".to_string(),
                (p, 0) => format!("DECIMAL({p})"),
                (p, s) => format!("DECIMAL({p}, {s})"),
            },
            Some(DataType::String) => match field.size {
                0 => "TEXT".to_string(),
                n => format!("VARCHAR({n})"),
            },
            Some(DataType::Time) => "TIMESTAMP".to_string(),
            Some(DataType::Bytes | DataType::BytesArray) => "BLOB".to_string(),
            Some(DataType::Custom(name)) => name.clone(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SqlValue;

    #[test]
    fn test_generic_dialect() {
        let dialect = GenericDialect::new();
        assert_eq!(dialect.name(), "generic");
        assert_eq!(dialect.quote_char(), '"');
        assert_eq!(dialect.max_limit(), None);

        let mut out = String::new();
        dialect.quote_to(&mut out, "users.id");
        dialect.bind_var_to(&mut out, 1, &SqlValue::Int(1));
        assert_eq!(out, "\"users\".\"id\"?");
    }
}
