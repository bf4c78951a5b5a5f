//! Runtime configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dialect::{self, Dialect};
use crate::error::{Error, Result};
use crate::naming::NamingStrategy;
use crate::schema::SchemaCache;
use crate::statement::Statement;

fn default_dialect() -> String {
    String::from("mysql")
}

/// Settings shared by every statement built from one configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registered dialect name.
    #[serde(default = "default_dialect")]
    pub dialect: String,
    /// Allows `UPDATE` and `DELETE` without `WHERE`.
    pub allow_global_update: bool,
    /// Naming applied to tables, columns and constraints.
    pub naming: NamingStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            allow_global_update: false,
            naming: NamingStrategy::default(),
        }
    }
}

impl Config {
    /// Parses a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the document is malformed or names an
    /// unregistered dialect.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| Error::Config(err.to_string()))?;
        config.dialect()?;
        debug!(dialect = %config.dialect, "configuration loaded");
        Ok(config)
    }

    /// Resolves the configured dialect from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown dialect name.
    pub fn dialect(&self) -> Result<Arc<dyn Dialect>> {
        dialect::lookup(&self.dialect)
            .ok_or_else(|| Error::Config(format!("unknown dialect: {}", self.dialect)))
    }

    /// Creates an empty statement for the configured dialect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown dialect name.
    pub fn statement(&self) -> Result<Statement> {
        Ok(Statement::new(self.dialect()?).allow_global_update(self.allow_global_update))
    }

    /// Creates a schema cache using the configured naming.
    #[must_use]
    pub fn schema_cache(&self) -> SchemaCache {
        SchemaCache::new(self.naming.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.dialect, "mysql");
        assert!(!config.allow_global_update);
        assert_eq!(config.dialect().unwrap().name(), "mysql");
    }

    #[test]
    fn test_from_json() {
        let config = Config::from_json(
            r#"{
                "dialect": "postgres",
                "allow_global_update": true,
                "naming": { "table_prefix": "t_", "singular_table": true }
            }"#,
        )
        .unwrap();
        assert_eq!(config.dialect, "postgres");
        assert!(config.allow_global_update);
        assert_eq!(config.naming.table_name("UserProfile"), "t_user_profile");
        assert_eq!(config.schema_cache().naming().table_prefix, "t_");
    }

    #[test]
    fn test_unknown_dialect() {
        let err = Config::from_json(r#"{"dialect": "oracle"}"#).unwrap_err();
        assert_eq!(err, Error::Config(String::from("unknown dialect: oracle")));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Config::from_json("{ dialect"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_statement_honours_global_update() {
        use crate::clause::{Delete, From};

        let config = Config {
            allow_global_update: true,
            ..Config::default()
        };
        let mut stmt = config.statement().unwrap().with_table("users");
        stmt.add_clause(Delete::default());
        stmt.add_clause(From::default());
        stmt.build(&["DELETE", "FROM", "WHERE"]);
        let (sql, vars) = stmt.finish().unwrap();
        assert_eq!(sql, "DELETE FROM `users`");
        assert!(vars.is_empty());
    }
}
