//! SQL values bound as statement parameters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// A SQL value that can be used as a parameter.
///
/// Values are always bound through a placeholder; `to_sql_inline` exists for
/// logging and for dialects that need literal defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Unsigned integer value.
    Uint(u64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// Timestamp value.
    Time(DateTime<Utc>),
    /// Array value bound to a single placeholder.
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Returns the SQL representation for inline use (escaped).
    ///
    /// **Warning**: Prefer using parameterized queries instead.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int(n) => format!("{n}"),
            Self::Uint(n) => format!("{n}"),
            Self::Float(f) => format!("{f}"),
            Self::Text(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::Time(t) => format!("'{}'", t.format("%Y-%m-%d %H:%M:%S%.6f")),
            Self::Array(items) => {
                let inner: Vec<String> = items.iter().map(Self::to_sql_inline).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    /// Returns true for `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

macro_rules! signed_to_sql_value {
    ($($ty:ty),*) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Int(i64::from(self))
                }
            }
        )*
    };
}

macro_rules! unsigned_to_sql_value {
    ($($ty:ty),*) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Uint(u64::from(self))
                }
            }
        )*
    };
}

signed_to_sql_value!(i8, i16, i32, i64);
unsigned_to_sql_value!(u8, u16, u32, u64);

impl ToSqlValue for isize {
    fn to_sql_value(self) -> SqlValue {
        i64::try_from(self).map_or_else(|_| SqlValue::Text(self.to_string()), SqlValue::Int)
    }
}

impl ToSqlValue for usize {
    fn to_sql_value(self) -> SqlValue {
        u64::try_from(self).map_or_else(|_| SqlValue::Text(self.to_string()), SqlValue::Uint)
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for &String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Time(self)
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Time(self.and_utc())
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(self) -> SqlValue {
        self.and_hms_opt(0, 0, 0)
            .map_or(SqlValue::Null, |t| SqlValue::Time(t.and_utc()))
    }
}

impl ToSqlValue for serde_json::Value {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Self::Null => SqlValue::Null,
            other => SqlValue::Text(other.to_string()),
        }
    }
}
