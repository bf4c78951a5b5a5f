use std::fmt;

use super::{AsOfSystemTime, Builder, Expression, Quoted, Table, Where};

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    /// `CROSS JOIN`
    Cross,
    /// `INNER JOIN`
    #[default]
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cross => write!(f, "CROSS"),
            Self::Inner => write!(f, "INNER"),
            Self::Left => write!(f, "LEFT"),
            Self::Right => write!(f, "RIGHT"),
        }
    }
}

/// A join attached to `FROM`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Join {
    /// Join flavor.
    pub join_type: JoinType,
    /// Joined table.
    pub table: Table,
    /// `ON` conditions.
    pub on: Where,
    /// `USING` columns, written when `on` is empty.
    pub using: Vec<String>,
    /// Replaces the whole join.
    pub expression: Option<Expression>,
}

impl Join {
    /// `<type> JOIN table ON conditions`
    #[must_use]
    pub fn on(join_type: JoinType, table: Table, conditions: Vec<Expression>) -> Self {
        Self {
            join_type,
            table,
            on: Where::new(conditions),
            ..Self::default()
        }
    }

    /// `<type> JOIN table USING (columns)`
    #[must_use]
    pub fn using(join_type: JoinType, table: Table, columns: &[&str]) -> Self {
        Self {
            join_type,
            table,
            using: columns.iter().map(|c| String::from(*c)).collect(),
            ..Self::default()
        }
    }

    /// Writes the join.
    pub fn build(&self, builder: &mut dyn Builder) {
        if let Some(expression) = &self.expression {
            expression.build(builder);
            return;
        }

        builder.write_str(&self.join_type.to_string());
        builder.write_str(" JOIN ");
        builder.write_quoted(Quoted::Table(&self.table));

        if !self.on.is_empty() {
            builder.write_str(" ON ");
            self.on.build(builder);
        } else if !self.using.is_empty() {
            builder.write_str(" USING (");
            for (idx, column) in self.using.iter().enumerate() {
                if idx > 0 {
                    builder.write_char(',');
                }
                builder.write_quoted(Quoted::Ident(column));
            }
            builder.write_char(')');
        }
    }
}

/// `FROM` tables and joins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct From {
    /// Tables; the bound table when empty.
    pub tables: Vec<Table>,
    /// Joins in order.
    pub joins: Vec<Join>,
    /// Inline `AS OF SYSTEM TIME`.
    pub as_of_system_time: Option<AsOfSystemTime>,
}

impl From {
    /// `FROM` the given tables.
    #[must_use]
    pub fn tables<I, T>(tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Table>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Joins concatenate; a later table list replaces this one.
    #[must_use]
    pub fn merge(mut self, later: Self) -> Self {
        if !later.tables.is_empty() {
            self.tables = later.tables;
        }
        self.joins.extend(later.joins);
        if later.as_of_system_time.is_some() {
            self.as_of_system_time = later.as_of_system_time;
        }
        self
    }

    /// Writes the tables, joins and time travel suffix.
    pub fn build(&self, builder: &mut dyn Builder) {
        if self.tables.is_empty() {
            builder.write_quoted(Quoted::Table(&Table::current()));
        } else {
            for (idx, table) in self.tables.iter().enumerate() {
                if idx > 0 {
                    builder.write_char(',');
                }
                builder.write_quoted(Quoted::Table(table));
            }
        }

        for join in &self.joins {
            builder.write_char(' ');
            join.build(builder);
        }

        if let Some(as_of) = self.as_of_system_time.as_ref().filter(|a| !a.is_empty()) {
            builder.write_char(' ');
            as_of.build(builder);
        }
    }
}
