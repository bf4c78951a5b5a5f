//! # sqlweave-core
//!
//! A SQL clause composition engine and a schema reflector.
//!
//! This crate provides:
//! - Named clauses (`SELECT`, `WHERE`, `ORDER BY`, ...) that merge when added
//!   twice and build in a caller-chosen order
//! - An expression tree with placeholder expansion, named parameters and
//!   negation
//! - Dialects deciding quoting, placeholders and column types
//! - A schema reflector turning `#[derive(Model)]` types into tables,
//!   columns, indexes, constraints and relationships
//!
//! ## Building a statement
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sqlweave_core::clause::{Expression, From, Limit, Select, Where};
//! use sqlweave_core::dialect::MysqlDialect;
//! use sqlweave_core::Statement;
//!
//! let mut stmt = Statement::new(Arc::new(MysqlDialect::new())).with_table("users");
//! stmt.add_clause(Select::default());
//! stmt.add_clause(From::default());
//! stmt.add_clause(Where::new(vec![Expression::eq("name", "jinzhu")]));
//! stmt.add_clause(Limit::limit(10));
//! stmt.build(&["SELECT", "FROM", "WHERE", "LIMIT"]);
//!
//! let (sql, vars) = stmt.finish().unwrap();
//! assert_eq!(sql, "SELECT * FROM `users` WHERE `name` = ? LIMIT 10");
//! assert_eq!(vars.len(), 1);
//! ```
//!
//! ## SQL Injection Prevention
//!
//! Values are never written into the SQL text. Every value becomes a
//! placeholder and is returned alongside the statement:
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sqlweave_core::clause::{Expression, From, Select, Where};
//! use sqlweave_core::dialect::PostgresDialect;
//! use sqlweave_core::{SqlValue, Statement};
//!
//! let user_input = "'; DROP TABLE users; --";
//! let mut stmt = Statement::new(Arc::new(PostgresDialect::new())).with_table("users");
//! stmt.add_clause(Select::default());
//! stmt.add_clause(From::default());
//! stmt.add_clause(Where::new(vec![Expression::eq("name", user_input)]));
//! stmt.build(&["SELECT", "FROM", "WHERE"]);
//!
//! let (sql, vars) = stmt.finish().unwrap();
//! assert_eq!(sql, r#"SELECT * FROM "users" WHERE "name" = $1"#);
//! assert_eq!(vars, vec![SqlValue::Text(String::from(user_input))]);
//! ```

pub mod clause;
pub mod config;
pub mod dialect;
pub mod error;
pub mod naming;
pub mod schema;
pub mod statement;
pub mod tag;
pub mod value;

pub use clause::{Arg, Builder, Clause, ClauseExpression, Column, Expression, Table};
pub use config::Config;
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use naming::NamingStrategy;
pub use schema::{Field, Model, Reflect, Schema, SchemaCache};
pub use statement::Statement;
pub use value::{SqlValue, ToSqlValue};
