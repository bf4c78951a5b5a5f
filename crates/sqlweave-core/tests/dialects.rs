//! Column types, placeholders, explain output and the dialect registry.

mod common;

use std::sync::Arc;

use common::{build, mysql, postgres, text, AuditEntry, Language, Person, User};
use sqlweave_core::clause::{Builder, Clause, ClauseBuilder, Expression, From, Limit, Select, Where};
use sqlweave_core::dialect::{self, MysqlDialect, PostgresDialect, SqliteDialect};
use sqlweave_core::{schema, Dialect, Field, Model, SqlValue, Statement};

fn field_of<T: Model>(name: &str) -> Arc<Field> {
    let schema = schema::parse::<T>().unwrap();
    Arc::clone(
        schema
            .lookup_field(name)
            .unwrap_or_else(|| panic!("{} has no field {name}", schema.name)),
    )
}

fn types_of(dialect: &dyn Dialect, fields: &[Arc<Field>]) -> Vec<String> {
    fields.iter().map(|f| dialect.data_type_of(f)).collect()
}

fn sample_fields() -> Vec<Arc<Field>> {
    vec![
        field_of::<Person>("id"),
        field_of::<Person>("full_name"),
        field_of::<Person>("age"),
        field_of::<Person>("email"),
        field_of::<Person>("enabled"),
        field_of::<User>("created_at"),
        field_of::<AuditEntry>("seq"),
        field_of::<AuditEntry>("payload"),
        field_of::<AuditEntry>("raw"),
        field_of::<Language>("code"),
    ]
}

// =============================================================================
// Column types
// =============================================================================

#[test]
fn test_mysql_data_types() {
    assert_eq!(
        types_of(&MysqlDialect::new(), &sample_fields()),
        [
            "int AUTO_INCREMENT",
            "varchar(128)",
            "tinyint unsigned",
            "longtext",
            "boolean",
            "datetime(3) NULL",
            "bigint",
            "longtext",
            "longblob",
            "varchar(256)",
        ]
    );
}

#[test]
fn test_postgres_data_types() {
    assert_eq!(
        types_of(&PostgresDialect::new(), &sample_fields()),
        [
            "bigserial",
            "varchar(128)",
            "smallint",
            "text",
            "boolean",
            "timestamp with time zone",
            "bigint",
            "text",
            "bytea",
            "text",
        ]
    );
}

#[test]
fn test_sqlite_data_types() {
    assert_eq!(
        types_of(&SqliteDialect::new(), &sample_fields()),
        [
            "integer PRIMARY KEY AUTOINCREMENT",
            "text",
            "integer",
            "text",
            "numeric",
            "datetime",
            "integer",
            "text",
            "blob",
            "text",
        ]
    );
}

#[test]
fn test_default_value_expression() {
    let enabled = field_of::<Person>("enabled");
    for dialect in ["mysql", "postgres", "sqlite"] {
        let dialect = dialect::lookup(dialect).unwrap();
        assert_eq!(
            dialect.default_value_of(&enabled),
            Expression::raw("DEFAULT", Vec::new())
        );
    }
}

// =============================================================================
// Placeholders and explain
// =============================================================================

fn filtered(mut stmt: Statement) -> Statement {
    stmt.add_clause(Select::default());
    stmt.add_clause(From::default());
    stmt.add_clause(Where::new(vec![
        Expression::eq("name", "jinzhu"),
        Expression::gt("age", 18),
        Expression::in_list("role", ["a", "b"]),
    ]));
    stmt.build(&["SELECT", "FROM", "WHERE"]);
    stmt
}

#[test]
fn test_mysql_explain() {
    let stmt = filtered(mysql("users"));
    assert_eq!(
        stmt.sql(),
        "SELECT * FROM `users` WHERE `name` = ? AND `age` > ? AND `role` IN (?,?)"
    );
    assert_eq!(
        stmt.explain(),
        r#"SELECT * FROM `users` WHERE `name` = "jinzhu" AND `age` > 18 AND `role` IN ("a","b")"#
    );
}

#[test]
fn test_postgres_explain() {
    let stmt = filtered(postgres("users"));
    assert_eq!(
        stmt.sql(),
        r#"SELECT * FROM "users" WHERE "name" = $1 AND "age" > $2 AND "role" IN ($3,$4)"#
    );
    assert_eq!(
        stmt.explain(),
        r#"SELECT * FROM "users" WHERE "name" = 'jinzhu' AND "age" > 18 AND "role" IN ('a','b')"#
    );
    assert_eq!(
        stmt.vars(),
        [text("jinzhu"), SqlValue::Int(18), text("a"), text("b")]
    );
}

#[test]
fn test_sqlite_offset_only() {
    let mut stmt = Statement::new(Arc::new(SqliteDialect::new())).with_table("users");
    stmt.add_clause(Limit::offset(3));
    assert_eq!(
        build(stmt, &["LIMIT"]).0,
        format!("LIMIT {} OFFSET 3", i64::MAX)
    );
}

// =============================================================================
// Registry and custom dialects
// =============================================================================

#[derive(Debug)]
struct FetchFirst;

impl Dialect for FetchFirst {
    fn name(&self) -> &'static str {
        "fetch-first"
    }

    fn data_type_of(&self, field: &Field) -> String {
        PostgresDialect::new().data_type_of(field)
    }

    fn clause_builder(&self, name: &str) -> Option<ClauseBuilder> {
        if name != "LIMIT" {
            return None;
        }
        let builder: ClauseBuilder = Arc::new(|_clause: &Clause, out: &mut dyn Builder| {
            out.write_str("FETCH FIRST ROWS ONLY");
        });
        Some(builder)
    }
}

#[test]
fn test_custom_clause_builder() {
    let mut stmt = Statement::new(Arc::new(FetchFirst)).with_table("users");
    stmt.add_clause(Select::default());
    stmt.add_clause(From::default());
    stmt.add_clause(Limit::limit(10));
    assert_eq!(
        build(stmt, &["SELECT", "FROM", "LIMIT"]).0,
        r#"SELECT * FROM "users" FETCH FIRST ROWS ONLY"#
    );
}

#[test]
fn test_registered_dialect_is_found_by_any_case() {
    dialect::register("Fetch-First", Arc::new(FetchFirst));
    let found = dialect::lookup("FETCH-FIRST").unwrap();
    assert_eq!(found.name(), "fetch-first");
    assert_eq!(found.data_type_of(&field_of::<Person>("age")), "smallint");
}
