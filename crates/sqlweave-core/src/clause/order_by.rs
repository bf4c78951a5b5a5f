use super::{Builder, Column, Expression, Quoted};

/// One `ORDER BY` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByColumn {
    /// Sort column.
    pub column: Column,
    /// Sort descending.
    pub desc: bool,
    /// Discard the ordering accumulated before this entry.
    pub reorder: bool,
}

impl OrderByColumn {
    /// Ascending order on `column`.
    #[must_use]
    pub fn asc(column: impl Into<Column>) -> Self {
        Self {
            column: column.into(),
            desc: false,
            reorder: false,
        }
    }

    /// Descending order on `column`.
    #[must_use]
    pub fn desc(column: impl Into<Column>) -> Self {
        Self {
            desc: true,
            ..Self::asc(column)
        }
    }

    /// Marks the entry as replacing earlier ordering.
    #[must_use]
    pub const fn reorder(mut self) -> Self {
        self.reorder = true;
        self
    }
}

/// `ORDER BY` list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderBy {
    /// Entries in order.
    pub columns: Vec<OrderByColumn>,
    /// Replaces the column list.
    pub expression: Option<Expression>,
}

impl OrderBy {
    /// Orders by the given entries.
    #[must_use]
    pub const fn new(columns: Vec<OrderByColumn>) -> Self {
        Self {
            columns,
            expression: None,
        }
    }

    /// Orders by an arbitrary expression.
    #[must_use]
    pub const fn expression(expression: Expression) -> Self {
        Self {
            columns: Vec::new(),
            expression: Some(expression),
        }
    }

    /// Returns true when nothing would be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.expression.as_ref().map_or(true, Expression::is_empty)
    }

    /// Later entries follow earlier ones, except that the last `reorder`
    /// entry and everything after it replace the list.
    #[must_use]
    pub fn merge(self, later: Self) -> Self {
        let expression = later.expression.or(self.expression);
        if let Some(idx) = later.columns.iter().rposition(|c| c.reorder) {
            let mut later_columns = later.columns;
            return Self {
                columns: later_columns.split_off(idx),
                expression,
            };
        }
        let mut columns = self.columns;
        columns.extend(later.columns);
        Self {
            columns,
            expression,
        }
    }

    /// Writes the entries separated by `,`.
    pub fn build(&self, builder: &mut dyn Builder) {
        if let Some(expression) = &self.expression {
            expression.build(builder);
            return;
        }
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                builder.write_char(',');
            }
            builder.write_quoted(Quoted::Column(&column.column));
            if column.desc {
                builder.write_str(" DESC");
            }
        }
    }
}
