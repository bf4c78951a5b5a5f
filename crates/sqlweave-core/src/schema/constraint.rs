//! Check, unique and foreign-key constraints.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Field, Index};
use crate::clause::{Arg, Column, Expression};
use crate::naming::NamingStrategy;

/// Names made of word characters and dashes are taken as explicit
/// constraint names.
static CONSTRAINT_NAME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[\w-]+$").ok());

pub(crate) fn is_constraint_name(candidate: &str) -> bool {
    CONSTRAINT_NAME
        .as_ref()
        .is_some_and(|re| re.is_match(candidate))
}

/// A `CHECK` constraint declared with the `check` tag.
#[derive(Debug, Clone)]
pub struct CheckConstraint {
    /// Constraint name.
    pub name: String,
    /// Predicate, e.g. `length(phone) >= 10`.
    pub constraint: String,
    /// Field carrying the tag.
    pub field: Arc<Field>,
}

impl CheckConstraint {
    /// `CONSTRAINT name CHECK (predicate)`
    #[must_use]
    pub fn build(&self) -> Expression {
        Expression::raw(
            "CONSTRAINT ? CHECK (?)",
            vec![
                Arg::Column(Column::new(&self.name)),
                Arg::from(Expression::raw(&self.constraint, Vec::new())),
            ],
        )
    }
}

/// A `UNIQUE` constraint declared with the `unique` tag.
#[derive(Debug, Clone)]
pub struct UniqueConstraint {
    /// Constraint name.
    pub name: String,
    /// Constrained field.
    pub field: Arc<Field>,
}

impl UniqueConstraint {
    /// `CONSTRAINT name UNIQUE (column)`
    #[must_use]
    pub fn build(&self) -> Expression {
        Expression::raw(
            "CONSTRAINT ? UNIQUE (?)",
            vec![
                Arg::Column(Column::new(&self.name)),
                Arg::Column(Column::new(&self.field.db_name)),
            ],
        )
    }
}

/// A foreign-key constraint derived from a relationship.
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Constraint name.
    pub name: String,
    /// Relationship field the constraint belongs to.
    pub field: Arc<Field>,
    /// Table holding the foreign keys.
    pub table: String,
    /// Foreign-key fields.
    pub foreign_keys: Vec<Arc<Field>>,
    /// Referenced table.
    pub reference_table: String,
    /// Referenced fields.
    pub references: Vec<Arc<Field>>,
    /// `ON DELETE` action.
    pub on_delete: String,
    /// `ON UPDATE` action.
    pub on_update: String,
}

impl Constraint {
    /// `CONSTRAINT name FOREIGN KEY (fks) REFERENCES table(refs) [actions]`
    #[must_use]
    pub fn build(&self) -> Expression {
        let mut sql = String::from("CONSTRAINT ? FOREIGN KEY ? REFERENCES ??");
        if !self.on_delete.is_empty() {
            sql.push_str(" ON DELETE ");
            sql.push_str(&self.on_delete);
        }
        if !self.on_update.is_empty() {
            sql.push_str(" ON UPDATE ");
            sql.push_str(&self.on_update);
        }

        let columns = |fields: &[Arc<Field>]| {
            Arg::List(
                fields
                    .iter()
                    .map(|f| Arg::Column(Column::new(&f.db_name)))
                    .collect(),
            )
        };

        Expression::raw(
            &sql,
            vec![
                Arg::Column(Column::new(&self.name)),
                columns(&self.foreign_keys),
                Arg::Table(crate::clause::Table::new(&self.reference_table)),
                columns(&self.references),
            ],
        )
    }
}

/// Collects `check` tags. A later check with the same name replaces an
/// earlier one.
pub(crate) fn parse_checks(
    table: &str,
    naming: &NamingStrategy,
    fields: &[Arc<Field>],
) -> Vec<CheckConstraint> {
    let mut checks: Vec<CheckConstraint> = Vec::new();

    for field in fields {
        let Some(check) = field.tag_settings.value("CHECK") else {
            continue;
        };

        let parts: Vec<&str> = check.split(',').collect();
        let (name, constraint) = if parts.len() > 1 && is_constraint_name(parts[0]) {
            (String::from(parts[0]), parts[1..].join(","))
        } else {
            let constraint = if parts[0].is_empty() {
                parts[1..].join(",")
            } else {
                String::from(check)
            };
            (naming.checker_name(table, &field.db_name), constraint)
        };

        checks.retain(|existing| existing.name != name);
        checks.push(CheckConstraint {
            name,
            constraint,
            field: Arc::clone(field),
        });
    }

    checks
}

/// Collects `unique` fields. A field that is the sole member of a unique
/// index is covered by that index and gets no separate constraint.
pub(crate) fn parse_uniques(
    table: &str,
    naming: &NamingStrategy,
    fields: &[Arc<Field>],
    indexes: &[Index],
) -> Vec<UniqueConstraint> {
    fields
        .iter()
        .filter(|field| field.unique && !field.db_name.is_empty())
        .filter(|field| {
            !indexes.iter().any(|idx| {
                idx.is_unique()
                    && idx.fields.len() == 1
                    && Arc::ptr_eq(&idx.fields[0].field, field)
            })
        })
        .map(|field| UniqueConstraint {
            name: naming.unique_name(table, &field.db_name),
            field: Arc::clone(field),
        })
        .collect()
}
