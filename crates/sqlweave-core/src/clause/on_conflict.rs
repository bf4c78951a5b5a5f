use super::{Builder, Column, Quoted, Set, Where};

/// `ON CONFLICT` upsert behavior.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OnConflict {
    /// Conflict target columns.
    pub columns: Vec<Column>,
    /// Condition on the update action.
    pub where_clause: Where,
    /// Condition on the conflict target (partial index).
    pub target_where: Where,
    /// Named constraint used as the conflict target.
    pub on_constraint: Option<String>,
    /// `DO NOTHING`
    pub do_nothing: bool,
    /// Assignments for `DO UPDATE SET`.
    pub do_updates: Set,
    /// Update every updatable non-primary column of the bound schema when
    /// `do_updates` is empty.
    pub update_all: bool,
}

impl OnConflict {
    /// Conflict on `columns`.
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

    /// Ignores conflicting rows.
    #[must_use]
    pub const fn do_nothing(mut self) -> Self {
        self.do_nothing = true;
        self
    }

    /// Updates the given assignments on conflict.
    #[must_use]
    pub fn do_updates(mut self, set: Set) -> Self {
        self.do_updates = set;
        self
    }

    fn updates(&self, builder: &dyn Builder) -> Set {
        if !self.do_updates.is_empty() || !self.update_all {
            return self.do_updates.clone();
        }
        let columns: Vec<&str> = builder
            .schema()
            .map(|schema| {
                schema
                    .db_names
                    .iter()
                    .filter(|name| {
                        schema.lookup_field(name).is_some_and(|f| {
                            f.updatable && !f.primary_key && f.auto_create_time.is_none()
                        })
                    })
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default();
        Set::assignment_columns(&columns)
    }

    /// Writes the target, the action and the action condition.
    pub fn build(&self, builder: &mut dyn Builder) {
        if let Some(constraint) = &self.on_constraint {
            builder.write_str("ON CONSTRAINT ");
            builder.write_str(constraint);
            builder.write_char(' ');
        } else {
            if !self.columns.is_empty() {
                builder.write_char('(');
                for (idx, column) in self.columns.iter().enumerate() {
                    if idx > 0 {
                        builder.write_char(',');
                    }
                    builder.write_quoted(Quoted::Column(column));
                }
                builder.write_str(") ");
            }
            if !self.target_where.is_empty() {
                builder.write_str(" WHERE ");
                self.target_where.build(builder);
                builder.write_char(' ');
            }
        }

        if self.do_nothing {
            builder.write_str("DO NOTHING");
        } else {
            let updates = self.updates(builder);
            builder.write_str("DO UPDATE SET ");
            updates.build(builder);
        }

        if !self.where_clause.is_empty() {
            builder.write_str(" WHERE ");
            self.where_clause.build(builder);
            builder.write_char(' ');
        }
    }
}
