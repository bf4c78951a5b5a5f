use super::{Builder, Column, Expression, Quoted, Where};

/// `GROUP BY` columns with optional `HAVING` conditions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupBy {
    /// Grouping columns.
    pub columns: Vec<Column>,
    /// `HAVING` conditions.
    pub having: Vec<Expression>,
}

impl GroupBy {
    /// Groups by the given columns.
    #[must_use]
    pub fn columns<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            having: Vec::new(),
        }
    }

    /// Adds `HAVING` conditions.
    #[must_use]
    pub fn having(mut self, conditions: Vec<Expression>) -> Self {
        self.having.extend(conditions);
        self
    }

    /// Returns true when neither columns nor conditions are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.having.iter().all(Expression::is_empty)
    }

    /// Columns and conditions concatenate.
    #[must_use]
    pub fn merge(mut self, later: Self) -> Self {
        self.columns.extend(later.columns);
        self.having.extend(later.having);
        self
    }

    /// Writes the columns, then ` HAVING ` and the conditions.
    pub fn build(&self, builder: &mut dyn Builder) {
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                builder.write_char(',');
            }
            builder.write_quoted(Quoted::Column(column));
        }

        if self.having.iter().any(|e| !e.is_empty()) {
            if self.columns.is_empty() {
                builder.write_str("HAVING ");
            } else {
                builder.write_str(" HAVING ");
            }
            Where::new(self.having.clone()).build(builder);
        }
    }
}
