use super::expression::build_exprs;
use super::{Builder, Expression, AND_WITH_SPACE};

/// `WHERE` conditions, joined by `AND` unless a child is a lone `OR`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Where {
    /// Conditions in order.
    pub exprs: Vec<Expression>,
}

impl Where {
    /// Creates a `WHERE` from conditions.
    #[must_use]
    pub const fn new(exprs: Vec<Expression>) -> Self {
        Self { exprs }
    }

    /// Returns true when no condition would be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exprs.iter().all(Expression::is_empty)
    }

    /// Appends the later conditions.
    #[must_use]
    pub fn merge(mut self, later: Self) -> Self {
        self.exprs.extend(later.exprs);
        self
    }

    /// Writes the conditions.
    pub fn build(&self, builder: &mut dyn Builder) {
        let mut exprs: Vec<&Expression> = self.exprs.iter().collect();

        if let [Expression::And(children)] = self.exprs.as_slice() {
            if !children.iter().any(|c| matches!(c, Expression::Or(_))) {
                exprs = children.iter().collect();
            }
        }

        if exprs.first().is_some_and(|e| is_single_or(e)) {
            if let Some(idx) = exprs.iter().position(|e| !is_single_or(e)) {
                exprs.swap(0, idx);
            }
        }

        build_exprs(exprs, AND_WITH_SPACE, builder);
    }
}

fn is_single_or(expr: &Expression) -> bool {
    matches!(expr, Expression::Or(children) if children.len() == 1)
}
