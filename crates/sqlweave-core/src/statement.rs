//! Statement assembly.
//!
//! A [`Statement`] owns the SQL buffer, the bound parameters and the clause
//! registry. Clauses are added in any order; [`Statement::build`] writes
//! them in the order the caller names.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::clause::{
    Arg, Builder, Clause, ClauseExpression, Column, Expression, Name, Quoted, Table,
};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::value::SqlValue;

/// A statement under construction.
pub struct Statement {
    dialect: Arc<dyn Dialect>,
    schema: Option<Arc<Schema>>,
    table: String,
    table_expr: Option<Expression>,
    clauses: HashMap<String, Clause>,
    allow_global_update: bool,
    sql: String,
    vars: Vec<SqlValue>,
    errors: Vec<Error>,
}

impl Statement {
    /// Creates an empty statement for `dialect`.
    #[must_use]
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            schema: None,
            table: String::new(),
            table_expr: None,
            clauses: HashMap::new(),
            allow_global_update: false,
            sql: String::new(),
            vars: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Binds a schema; its table becomes the current table unless one was
    /// set explicitly.
    #[must_use]
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        if self.table.is_empty() {
            self.table.clone_from(&schema.table);
        }
        self.schema = Some(schema);
        self
    }

    /// Sets the current table.
    #[must_use]
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = String::from(table);
        self
    }

    /// Replaces the current table with an expression such as a subquery.
    #[must_use]
    pub fn with_table_expr(mut self, expr: Expression) -> Self {
        self.table_expr = Some(expr);
        self
    }

    /// Allows `UPDATE` and `DELETE` without a `WHERE` condition.
    #[must_use]
    pub const fn allow_global_update(mut self, allow: bool) -> Self {
        self.allow_global_update = allow;
        self
    }

    /// The current table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Installs a clause, merging it with an installed clause of the same
    /// name.
    pub fn add_clause(&mut self, clause: impl Into<ClauseExpression>) {
        let expression = clause.into();
        let name = expression.name().to_string();
        let slot = self.clauses.entry(name).or_default();
        expression.merge_into(slot);
    }

    /// Installs a clause only when none of that name exists.
    pub fn add_clause_if_not_exists(&mut self, clause: impl Into<ClauseExpression>) {
        let expression = clause.into();
        if !self.clauses.contains_key(expression.name()) {
            self.add_clause(expression);
        }
    }

    /// Returns the installed clause.
    #[must_use]
    pub fn clause(&self, name: &str) -> Option<&Clause> {
        self.clauses.get(name)
    }

    /// Returns the named clause for customization, creating an empty one.
    pub fn clause_mut(&mut self, name: &str) -> &mut Clause {
        self.clauses.entry(String::from(name)).or_insert_with(|| Clause {
            name: String::from(name),
            ..Clause::default()
        })
    }

    /// Writes the named clauses in order, separated by spaces. Missing and
    /// empty clauses are skipped.
    pub fn build(&mut self, names: &[&str]) {
        self.check_global_update(names);

        for name in names {
            let Some(clause) = self.clauses.remove(*name) else {
                continue;
            };
            if !clause.is_empty() {
                if !self.sql.is_empty() {
                    self.sql.push(' ');
                }
                match self.dialect.clause_builder(name) {
                    Some(custom) => custom(&clause, &mut *self),
                    None => clause.build(self),
                }
            }
            self.clauses.insert(String::from(*name), clause);
        }
    }

    fn check_global_update(&mut self, names: &[&str]) {
        if self.allow_global_update {
            return;
        }
        let Some(destructive) = names.iter().find(|n| **n == "UPDATE" || **n == "DELETE") else {
            return;
        };
        let has_where = self
            .clauses
            .get("WHERE")
            .is_some_and(|clause| !clause.is_empty());
        if !has_where {
            self.errors.push(Error::MissingWhere(String::from(*destructive)));
        }
    }

    /// The SQL written so far.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The parameters bound so far.
    #[must_use]
    pub fn vars(&self) -> &[SqlValue] {
        &self.vars
    }

    /// Errors recorded so far.
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Renders the SQL with parameters inlined, for logs.
    #[must_use]
    pub fn explain(&self) -> String {
        self.dialect.explain(&self.sql, &self.vars)
    }

    /// Returns the SQL and parameters, or every recorded error.
    ///
    /// # Errors
    ///
    /// Returns the recorded error, or [`Error::Multiple`] when several were
    /// recorded.
    pub fn finish(mut self) -> Result<(String, Vec<SqlValue>)> {
        if let Some(err) = Error::aggregate(std::mem::take(&mut self.errors)) {
            debug!(error = %err, sql = %self.sql, "statement failed");
            return Err(err);
        }
        debug!(dialect = self.dialect.name(), sql = %self.explain(), "statement built");
        Ok((self.sql, self.vars))
    }

    fn write_ident(&mut self, ident: &str) {
        self.dialect.quote_to(&mut self.sql, ident);
    }

    fn write_current_table(&mut self) {
        if let Some(expr) = self.table_expr.clone() {
            expr.build(self);
        } else if self.table.is_empty() {
            self.errors.push(Error::UnsupportedModel(String::from(
                "statement has no table bound",
            )));
        } else {
            let table = self.table.clone();
            self.write_ident(&table);
        }
    }

    fn write_primary_key(&mut self) {
        let primary = match &self.schema {
            None => Err(Error::InvalidField(String::from(
                "primary key requires a bound schema",
            ))),
            Some(schema) => schema
                .prioritized_primary_field
                .as_ref()
                .or_else(|| schema.primary_fields.first())
                .map(|field| field.db_name.clone())
                .ok_or_else(|| Error::InvalidField(format!("{} has no primary key", schema.name))),
        };
        match primary {
            Ok(db_name) => self.write_ident(&db_name),
            Err(err) => self.errors.push(err),
        }
    }

    fn write_name(&mut self, name: &Name) {
        match name {
            Name::Ident(ident) => self.write_ident(ident),
            Name::CurrentTable => self.write_current_table(),
            Name::PrimaryKey => self.write_primary_key(),
            Name::Associations => {}
        }
    }

    fn write_column(&mut self, column: &Column) {
        if let Some(table) = &column.table {
            match table {
                Name::Ident(table) if column.raw => self.sql.push_str(table),
                table => self.write_name(table),
            }
            self.sql.push('.');
        }

        match (&column.name, column.raw) {
            (Name::Ident(name), true) => self.sql.push_str(name),
            (Name::Ident(name), false) if name == "*" => self.sql.push('*'),
            (name, _) => self.write_name(name),
        }

        if let Some(alias) = &column.alias {
            self.sql.push_str(" AS ");
            if column.raw {
                self.sql.push_str(alias);
            } else {
                self.write_ident(alias);
            }
        }
    }

    fn write_table(&mut self, table: &Table) {
        match (&table.name, table.raw) {
            (Name::Ident(name), true) => self.sql.push_str(name),
            (name, _) => self.write_name(name),
        }
        if let Some(alias) = &table.alias {
            self.sql.push(' ');
            if table.raw {
                self.sql.push_str(alias);
            } else {
                self.write_ident(alias);
            }
        }
    }

    fn bind(&mut self, value: SqlValue) {
        self.vars.push(value);
        let position = self.vars.len();
        if let Some(value) = self.vars.last() {
            self.dialect.bind_var_to(&mut self.sql, position, value);
        }
    }
}

impl Builder for Statement {
    fn write_str(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn write_char(&mut self, c: char) {
        self.sql.push(c);
    }

    fn write_quoted(&mut self, target: Quoted<'_>) {
        match target {
            Quoted::Column(column) => self.write_column(column),
            Quoted::Table(table) => self.write_table(table),
            Quoted::Ident(ident) => self.write_ident(ident),
        }
    }

    fn add_var(&mut self, args: &[Arg]) {
        for (idx, arg) in args.iter().enumerate() {
            if idx > 0 {
                self.sql.push(',');
            }
            match arg {
                Arg::Value(value) => self.bind(value.clone()),
                Arg::List(items) if items.is_empty() => self.sql.push_str("(NULL)"),
                Arg::List(items) => {
                    let plain: Option<Vec<SqlValue>> = items
                        .iter()
                        .map(|item| match item {
                            Arg::Value(value) => Some(value.clone()),
                            _ => None,
                        })
                        .collect();
                    match plain {
                        Some(values) => self.bind(SqlValue::Array(values)),
                        None => {
                            self.sql.push('(');
                            self.add_var(items);
                            self.sql.push(')');
                        }
                    }
                }
                Arg::Column(column) => self.write_column(column),
                Arg::Table(table) => self.write_table(table),
                Arg::Expr(expr) => expr.build(self),
                Arg::Named(_, value) => self.add_arg(value),
                Arg::Map(entries) => {
                    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
                    self.errors.push(Error::InvalidField(format!(
                        "named arguments {names:?} can only be bound by name"
                    )));
                }
            }
        }
    }

    fn add_error(&mut self, err: Error) {
        self.errors.push(err);
    }

    fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn schema(&self) -> Option<&Schema> {
        self.schema.as_deref()
    }
}
