use super::{Builder, Column, Quoted};

/// `RETURNING` columns; `*` when empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Returning {
    /// Returned columns.
    pub columns: Vec<Column>,
}

impl Returning {
    /// Returns the given columns.
    #[must_use]
    pub fn columns<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Column lists concatenate.
    #[must_use]
    pub fn merge(mut self, later: Self) -> Self {
        self.columns.extend(later.columns);
        self
    }

    /// Writes the columns.
    pub fn build(&self, builder: &mut dyn Builder) {
        if self.columns.is_empty() {
            builder.write_char('*');
            return;
        }
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                builder.write_char(',');
            }
            builder.write_quoted(Quoted::Column(column));
        }
    }
}
