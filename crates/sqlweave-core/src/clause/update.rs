use super::{Arg, Builder, Column, Quoted, Table};

/// `UPDATE [modifier] table`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Update {
    /// Target table; the bound table when unset.
    pub table: Option<Table>,
    /// Modifier such as `LOW_PRIORITY`.
    pub modifier: String,
}

impl Update {
    /// Updates `table`.
    #[must_use]
    pub fn table(table: impl Into<Table>) -> Self {
        Self {
            table: Some(table.into()),
            modifier: String::new(),
        }
    }

    /// Sets the modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: &str) -> Self {
        self.modifier = String::from(modifier);
        self
    }

    /// The later non-empty table and modifier win.
    #[must_use]
    pub fn merge(self, later: Self) -> Self {
        Self {
            table: later.table.or(self.table),
            modifier: if later.modifier.is_empty() {
                self.modifier
            } else {
                later.modifier
            },
        }
    }

    /// Writes `[modifier ]table`.
    pub fn build(&self, builder: &mut dyn Builder) {
        if !self.modifier.is_empty() {
            builder.write_str(&self.modifier);
            builder.write_char(' ');
        }
        match &self.table {
            Some(table) => builder.write_quoted(Quoted::Table(table)),
            None => builder.write_quoted(Quoted::Table(&Table::current())),
        }
    }
}

/// One `column=value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Assigned column.
    pub column: Column,
    /// New value.
    pub value: Arg,
}

impl Assignment {
    /// Creates an assignment.
    #[must_use]
    pub fn new(column: impl Into<Column>, value: impl Into<Arg>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// `SET` assignments. A later `SET` replaces an earlier one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Set(pub Vec<Assignment>);

impl Set {
    /// Creates a `SET` from assignments.
    #[must_use]
    pub const fn new(assignments: Vec<Assignment>) -> Self {
        Self(assignments)
    }

    /// Creates assignments from key/value pairs, sorted by key.
    #[must_use]
    pub fn from_map<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Arg>,
    {
        let mut pairs: Vec<(String, Arg)> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| Assignment::new(Column::new(&k), v))
                .collect(),
        )
    }

    /// Assigns each column from the row proposed for insertion, for use in
    /// `ON CONFLICT DO UPDATE`.
    #[must_use]
    pub fn assignment_columns(columns: &[&str]) -> Self {
        Self(
            columns
                .iter()
                .map(|c| Assignment::new(Column::new(c), Column::qualified("excluded", c)))
                .collect(),
        )
    }

    /// Returns true when no assignment is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Writes `col=?` pairs, or `pk=pk` when empty.
    pub fn build(&self, builder: &mut dyn Builder) {
        if self.0.is_empty() {
            let pk = Column::primary_key();
            builder.write_quoted(Quoted::Column(&pk));
            builder.write_char('=');
            builder.write_quoted(Quoted::Column(&pk));
            return;
        }
        for (idx, assignment) in self.0.iter().enumerate() {
            if idx > 0 {
                builder.write_char(',');
            }
            builder.write_quoted(Quoted::Column(&assignment.column));
            builder.write_char('=');
            builder.add_arg(&assignment.value);
        }
    }
}
