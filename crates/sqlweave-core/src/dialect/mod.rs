//! SQL dialects.
//!
//! A dialect decides how identifiers are quoted, how placeholders are
//! rendered, which column type a schema field maps to and how a finished
//! statement is rendered for logs. Dialects are registered by name in a
//! process-wide registry so configuration can select one at runtime.

mod explain;
mod generic;
mod mysql;
mod postgres;
mod sqlite;

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

pub use explain::explain_sql;
pub use generic::GenericDialect;
pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::clause::{ClauseBuilder, Expression};
use crate::schema::Field;
use crate::value::SqlValue;

/// Dialect-specific rendering.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Returns the name the dialect is registered under.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Writes a quoted identifier. A single `.` separates a qualifier from
    /// the name; each part is quoted on its own and embedded quote
    /// characters are doubled.
    fn quote_to(&self, out: &mut String, ident: &str) {
        let quote = self.quote_char();
        let parts = match ident.split_once('.') {
            Some((qualifier, name)) => vec![qualifier, name],
            None => vec![ident],
        };
        for (idx, part) in parts.into_iter().enumerate() {
            if idx > 0 {
                out.push('.');
            }
            let bare = part
                .strip_prefix(quote)
                .and_then(|p| p.strip_suffix(quote))
                .unwrap_or(part);
            out.push(quote);
            for c in bare.chars() {
                if c == quote {
                    out.push(quote);
                }
                out.push(c);
            }
            out.push(quote);
        }
    }

    /// Writes the placeholder for the parameter at 1-based `position`.
    fn bind_var_to(&self, out: &mut String, _position: usize, _value: &SqlValue) {
        out.push('?');
    }

    /// Returns the column type for a schema field.
    fn data_type_of(&self, field: &Field) -> String;

    /// Returns the expression used when a field should take its database
    /// default.
    fn default_value_of(&self, _field: &Field) -> Expression {
        Expression::raw("DEFAULT", Vec::new())
    }

    /// Renders a statement with its parameters inlined, for logging only.
    fn explain(&self, sql: &str, vars: &[SqlValue]) -> String {
        explain_sql(sql, false, '"', vars)
    }

    /// Returns the limit written when only an offset is present, for
    /// dialects that reject a bare `OFFSET`.
    fn max_limit(&self) -> Option<u64> {
        None
    }

    /// Returns a builder replacing the default serialization of the named
    /// clause.
    fn clause_builder(&self, _name: &str) -> Option<ClauseBuilder> {
        None
    }
}

static REGISTRY: Lazy<DashMap<String, Arc<dyn Dialect>>> = Lazy::new(|| {
    let registry: DashMap<String, Arc<dyn Dialect>> = DashMap::new();
    let builtin: [Arc<dyn Dialect>; 4] = [
        Arc::new(GenericDialect::new()),
        Arc::new(MysqlDialect::new()),
        Arc::new(PostgresDialect::new()),
        Arc::new(SqliteDialect::new()),
    ];
    for dialect in builtin {
        registry.insert(String::from(dialect.name()), dialect);
    }
    registry
});

/// Registers a dialect under `name`, replacing any previous registration.
pub fn register(name: &str, dialect: Arc<dyn Dialect>) {
    REGISTRY.insert(name.to_lowercase(), dialect);
}

/// Looks up a dialect by name, case-insensitively.
#[must_use]
pub fn lookup(name: &str) -> Option<Arc<dyn Dialect>> {
    REGISTRY
        .get(&name.to_lowercase())
        .map(|entry| Arc::clone(entry.value()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_dialects_registered() {
        for name in ["generic", "mysql", "postgres", "sqlite"] {
            let dialect = lookup(name).unwrap();
            assert_eq!(dialect.name(), name);
        }
        assert_eq!(lookup("MySQL").unwrap().name(), "mysql");
        assert!(lookup("oracle").is_none());
    }

    #[test]
    fn test_register_custom_dialect() {
        #[derive(Debug)]
        struct Bracketed;

        impl Dialect for Bracketed {
            fn name(&self) -> &'static str {
                "bracketed"
            }

            fn quote_to(&self, out: &mut String, ident: &str) {
                out.push('[');
                out.push_str(ident);
                out.push(']');
            }

            fn data_type_of(&self, _field: &Field) -> String {
                String::from("ANY")
            }
        }

        register("Bracketed", Arc::new(Bracketed));
        let dialect = lookup("bracketed").unwrap();
        let mut out = String::new();
        dialect.quote_to(&mut out, "users");
        assert_eq!(out, "[users]");
    }

    #[test]
    fn test_quote_to_splits_single_qualifier() {
        let dialect = MysqlDialect::new();
        let mut out = String::new();
        dialect.quote_to(&mut out, "users.name");
        assert_eq!(out, "`users`.`name`");

        out.clear();
        dialect.quote_to(&mut out, "db.users.name");
        assert_eq!(out, "`db`.`users.name`");

        out.clear();
        dialect.quote_to(&mut out, "we`ird");
        assert_eq!(out, "`we``ird`");

        out.clear();
        dialect.quote_to(&mut out, "`users`.id");
        assert_eq!(out, "`users`.`id`");
    }
}
