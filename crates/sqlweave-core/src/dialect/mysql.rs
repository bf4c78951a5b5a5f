//! MySQL dialect.

use super::{explain_sql, Dialect};
use crate::schema::{DataType, Field};
use crate::value::SqlValue;

const MEDIUM_SIZE: usize = 1 << 24;

/// MySQL: backtick identifiers and `?` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn data_type_of(&self, field: &Field) -> String {
        match &field.data_type {
            Some(DataType::Bool) => "boolean".to_string(),
            Some(data_type @ (DataType::Int | DataType::Uint)) => {
                let mut sql_type = match field.size {
                    0..=8 => "tinyint",
                    9..=16 => "smallint",
                    17..=32 => "int",
                    _ => "bigint",
                }
                .to_string();
                if *data_type == DataType::Uint {
                    sql_type.push_str(" unsigned");
                }
                if field.auto_increment {
                    sql_type.push_str(" AUTO_INCREMENT");
                }
                sql_type
            }
            Some(DataType::Float) => match (field.precision, field.scale) {
                (0, _) if field.size <= 32 => "float".to_string(),
                (0, _) => "double".to_string(),
                (p, s) => format!("decimal({p}, {s})"),
            },
            Some(DataType::String) => {
                let size = if field.primary_key && field.size == 0 {
                    256
                } else {
                    field.size
                };
                match size {
                    0 => "longtext".to_string(),
                    n if (65536..=MEDIUM_SIZE).contains(&n) => "mediumtext".to_string(),
                    n if n > MEDIUM_SIZE => "longtext".to_string(),
                    n => format!("varchar({n})"),
                }
            }
            Some(DataType::Time) => {
                let precision = if field.precision == 0 { 3 } else { field.precision };
                if field.not_null || field.primary_key {
                    format!("datetime({precision})")
                } else {
                    format!("datetime({precision}) NULL")
                }
            }
            Some(DataType::Bytes | DataType::BytesArray) => match field.size {
                n if n > 0 && n < 65536 => format!("varbinary({n})"),
                n if (65536..=MEDIUM_SIZE).contains(&n) => "mediumblob".to_string(),
                _ => "longblob".to_string(),
            },
            Some(DataType::Custom(name)) => name.clone(),
            None => String::new(),
        }
    }

    fn explain(&self, sql: &str, vars: &[SqlValue]) -> String {
        explain_sql(sql, false, '"', vars)
    }

    fn max_limit(&self) -> Option<u64> {
        Some(u64::MAX)
    }
}
