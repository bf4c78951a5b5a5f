use super::{Builder, Expression, Quoted};

/// One common table expression: `name (columns) AS (body)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    /// CTE name; nothing is written when empty.
    pub name: String,
    /// Optional column list.
    pub columns: Vec<String>,
    /// Body query.
    pub body: Expression,
}

impl Cte {
    /// Creates a CTE without a column list.
    #[must_use]
    pub fn new(name: &str, body: Expression) -> Self {
        Self {
            name: String::from(name),
            columns: Vec::new(),
            body,
        }
    }

    /// Sets the column list.
    #[must_use]
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| String::from(*c)).collect();
        self
    }

    fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Writes the CTE.
    pub fn build(&self, builder: &mut dyn Builder) {
        if self.is_empty() {
            return;
        }
        builder.write_quoted(Quoted::Ident(&self.name));
        if !self.columns.is_empty() {
            builder.write_str(" (");
            for (idx, column) in self.columns.iter().enumerate() {
                if idx > 0 {
                    builder.write_char(',');
                }
                builder.write_quoted(Quoted::Ident(column.trim()));
            }
            builder.write_char(')');
        }
        builder.write_str(" AS (");
        self.body.build(builder);
        builder.write_char(')');
    }
}

/// `WITH [RECURSIVE] cte, cte`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct With {
    /// Emit `RECURSIVE`.
    pub recursive: bool,
    /// CTEs in order.
    pub ctes: Vec<Cte>,
    /// Replaces the CTE list.
    pub expression: Option<Expression>,
}

impl With {
    /// Creates a `WITH` from CTEs.
    #[must_use]
    pub const fn new(ctes: Vec<Cte>) -> Self {
        Self {
            recursive: false,
            ctes,
            expression: None,
        }
    }

    /// Marks the `WITH` as recursive.
    #[must_use]
    pub const fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Creates a `WITH` whose body is a raw expression.
    #[must_use]
    pub const fn expression(expression: Expression) -> Self {
        Self {
            recursive: false,
            ctes: Vec::new(),
            expression: Some(expression),
        }
    }

    /// Returns true when nothing would be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.expression {
            Some(expression) => expression.is_empty(),
            None => self.ctes.iter().all(Cte::is_empty),
        }
    }

    /// `recursive` is sticky; the latest override expression wins and drops
    /// the CTEs; otherwise CTE lists concatenate.
    #[must_use]
    pub fn merge(self, later: Self) -> Self {
        let recursive = self.recursive || later.recursive;
        if later.expression.is_some() {
            return Self {
                recursive,
                ctes: Vec::new(),
                expression: later.expression,
            };
        }
        if self.expression.is_some() {
            return Self { recursive, ..self };
        }
        let mut ctes = self.ctes;
        ctes.extend(later.ctes);
        Self {
            recursive,
            ctes,
            expression: None,
        }
    }

    /// Writes the CTEs separated by `,`.
    pub fn build(&self, builder: &mut dyn Builder) {
        if let Some(expression) = &self.expression {
            expression.build(builder);
            return;
        }
        if self.recursive {
            builder.write_str("RECURSIVE ");
        }
        for (idx, cte) in self.ctes.iter().filter(|c| !c.is_empty()).enumerate() {
            if idx > 0 {
                builder.write_char(',');
            }
            cte.build(builder);
        }
    }
}
