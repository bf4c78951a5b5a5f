use super::{Arg, Builder, Column, Quoted, Table};

/// `INSERT [modifier] INTO table`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Insert {
    /// Target table; the bound table when unset.
    pub table: Option<Table>,
    /// Modifier such as `IGNORE`.
    pub modifier: String,
}

impl Insert {
    /// Inserts into `table`.
    #[must_use]
    pub fn into_table(table: impl Into<Table>) -> Self {
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

    /// Writes `[modifier ]INTO table`.
    pub fn build(&self, builder: &mut dyn Builder) {
        if !self.modifier.is_empty() {
            builder.write_str(&self.modifier);
            builder.write_char(' ');
        }
        builder.write_str("INTO ");
        match &self.table {
            Some(table) => builder.write_quoted(Quoted::Table(table)),
            None => builder.write_quoted(Quoted::Table(&Table::current())),
        }
    }
}

/// `(columns) VALUES (row),(row)`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Values {
    /// Column names.
    pub columns: Vec<Column>,
    /// One entry per row, one value per column.
    pub rows: Vec<Vec<Arg>>,
}

impl Values {
    /// Creates a values list.
    #[must_use]
    pub fn new<I, C>(columns: I, rows: Vec<Vec<Arg>>) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    /// Writes the column list and rows, or `DEFAULT VALUES` without columns.
    pub fn build(&self, builder: &mut dyn Builder) {
        if self.columns.is_empty() {
            builder.write_str("DEFAULT VALUES");
            return;
        }

        builder.write_char('(');
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                builder.write_char(',');
            }
            builder.write_quoted(Quoted::Column(column));
        }
        builder.write_str(") VALUES ");

        for (idx, row) in self.rows.iter().enumerate() {
            if idx > 0 {
                builder.write_char(',');
            }
            builder.write_char('(');
            builder.add_var(row);
            builder.write_char(')');
        }
    }
}
