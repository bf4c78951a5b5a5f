use super::{Builder, Column, Expression, Quoted};

/// `SELECT` column list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    /// Emit `DISTINCT`.
    pub distinct: bool,
    /// Selected columns; `*` when empty.
    pub columns: Vec<Column>,
    /// Columns excluded from the bound schema's readable columns.
    pub omits: Vec<String>,
    /// Replaces the column list.
    pub expression: Option<Expression>,
}

impl Select {
    /// Selects the given columns.
    #[must_use]
    pub fn columns<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Selects an arbitrary expression.
    #[must_use]
    pub fn expression(expression: Expression) -> Self {
        Self {
            expression: Some(expression),
            ..Self::default()
        }
    }

    fn selects_nothing(&self) -> bool {
        self.columns.is_empty() && self.omits.is_empty() && self.expression.is_none()
    }

    /// A later selection replaces this one unless it selects nothing.
    #[must_use]
    pub fn merge(self, later: Self) -> Self {
        if later.selects_nothing() {
            Self {
                distinct: self.distinct || later.distinct,
                ..self
            }
        } else {
            later
        }
    }

    /// Writes the selection.
    pub fn build(&self, builder: &mut dyn Builder) {
        if self.distinct {
            builder.write_str("DISTINCT ");
        }

        if let Some(expression) = &self.expression {
            expression.build(builder);
            return;
        }

        if !self.columns.is_empty() {
            for (idx, column) in self.columns.iter().enumerate() {
                if idx > 0 {
                    builder.write_char(',');
                }
                builder.write_quoted(Quoted::Column(column));
            }
            return;
        }

        if !self.omits.is_empty() {
            let readable: Option<Vec<String>> = builder.schema().map(|schema| {
                schema
                    .db_names
                    .iter()
                    .filter(|name| !self.omits.contains(name))
                    .filter(|name| schema.lookup_field(name).is_some_and(|f| f.readable))
                    .cloned()
                    .collect()
            });
            if let Some(names) = readable.filter(|names| !names.is_empty()) {
                for (idx, name) in names.iter().enumerate() {
                    if idx > 0 {
                        builder.write_char(',');
                    }
                    builder.write_quoted(Quoted::Column(&Column::of_current_table(name)));
                }
                return;
            }
        }

        builder.write_char('*');
    }
}
