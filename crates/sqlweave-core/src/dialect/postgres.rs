//! PostgreSQL dialect.

use super::{explain_sql, Dialect};
use crate::schema::{DataType, Field};
use crate::value::SqlValue;

/// PostgreSQL: double-quoted identifiers and `$N` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn bind_var_to(&self, out: &mut String, position: usize, _value: &SqlValue) {
        out.push('$');
        out.push_str(&position.to_string());
    }

    fn data_type_of(&self, field: &Field) -> String {
        match &field.data_type {
            Some(DataType::Bool) => "boolean".to_string(),
            Some(DataType::Int | DataType::Uint) if field.auto_increment => match field.size {
                0..=15 => "smallserial".to_string(),
                16..=30 => "serial".to_string(),
                _ => "bigserial".to_string(),
            },
            Some(DataType::Int | DataType::Uint) => match field.size {
                0..=15 => "smallint".to_string(),
                16..=30 => "integer".to_string(),
                _ => "bigint".to_string(),
            },
            Some(DataType::Float) => match (field.precision, field.scale) {
                (0, _) => "decimal".to_string(),
                (p, 0) => format!("numeric({p})"),
                (p, s) => format!("numeric({p}, {s})"),
            },
            Some(DataType::String) => match field.size {
                0 => "text".to_string(),
                n => format!("varchar({n})"),
            },
            Some(DataType::Time) => match field.precision {
                0 => "timestamp with time zone".to_string(),
                p => format!("timestamp({p}) with time zone"),
            },
            Some(DataType::Bytes | DataType::BytesArray) => "bytea".to_string(),
            Some(DataType::Custom(name)) => name.clone(),
            None => String::new(),
        }
    }

    fn explain(&self, sql: &str, vars: &[SqlValue]) -> String {
        explain_sql(sql, true, '\'', vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_placeholders() {
        let dialect = PostgresDialect::new();
        let mut out = String::from("id = ");
        dialect.bind_var_to(&mut out, 1, &SqlValue::Int(1));
        out.push_str(" AND name = ");
        dialect.bind_var_to(&mut out, 2, &SqlValue::Null);
        assert_eq!(out, "id = $1 AND name = $2");
        assert_eq!(
            dialect.explain(&out, &[SqlValue::Int(1), SqlValue::Text(String::from("x"))]),
            "id = 1 AND name = 'x'"
        );
    }
}
