//! Expression tree: comparisons, raw SQL, named parameters and composites.
//!
//! Expressions are immutable values. Each one builds into a [`Builder`];
//! comparisons and `NOT` additionally expose a negation build that writes
//! the logically negated form without a `NOT` prefix.

use std::collections::HashMap;

use tracing::warn;

use super::{raw_conjunctions, Arg, Builder, Column, Quoted, AND_WITH_SPACE, OR_WITH_SPACE};
use crate::value::SqlValue;

/// A column compared against a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Left-hand column.
    pub column: Column,
    /// Right-hand value.
    pub value: Arg,
}

/// Membership test.
#[derive(Debug, Clone, PartialEq)]
pub struct In {
    /// Tested column.
    pub column: Column,
    /// Candidate values.
    pub values: Vec<Arg>,
}

/// Raw SQL with `?` placeholders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expr {
    /// SQL text.
    pub sql: String,
    /// One var per `?`.
    pub vars: Vec<Arg>,
    /// Expand list vars even when the `?` does not follow `(`.
    pub without_parentheses: bool,
}

impl Expr {
    /// Creates a raw expression.
    #[must_use]
    pub fn new(sql: &str, vars: Vec<Arg>) -> Self {
        Self {
            sql: String::from(sql),
            vars,
            without_parentheses: false,
        }
    }
}

/// Raw SQL with `@name` and `?` placeholders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedExpr {
    /// SQL text.
    pub sql: String,
    /// Named (`Arg::Named`, `Arg::Map`) and positional vars.
    pub vars: Vec<Arg>,
}

/// One `WHEN ... THEN ...` branch.
#[derive(Debug, Clone, PartialEq)]
pub struct When {
    /// Condition SQL.
    pub when: String,
    /// Result SQL.
    pub then: String,
    /// Vars consumed by the `?` in `when` then `then`.
    pub vars: Vec<Arg>,
}

/// The `ELSE` branch of a case expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseElse {
    /// Result SQL.
    pub then: String,
    /// Vars consumed by the `?` in `then`.
    pub vars: Vec<Arg>,
}

/// `CASE WHEN ... END`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaseExpr {
    /// Branches in order.
    pub whens: Vec<When>,
    /// Optional fallback.
    pub otherwise: Option<CaseElse>,
}

/// A node of the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `column = value`, `IS NULL` for null, `IN (...)` for a list.
    Eq(Comparison),
    /// `column <> value`, `IS NOT NULL` for null, `NOT IN (...)` for a list.
    Neq(Comparison),
    /// `column > value`
    Gt(Comparison),
    /// `column >= value`
    Gte(Comparison),
    /// `column < value`
    Lt(Comparison),
    /// `column <= value`
    Lte(Comparison),
    /// `column LIKE value`
    Like(Comparison),
    /// `column IN (values)`
    In(In),
    /// Raw SQL.
    Expr(Expr),
    /// Raw SQL with named parameters.
    Named(NamedExpr),
    /// Conjunction.
    And(Vec<Expression>),
    /// Disjunction.
    Or(Vec<Expression>),
    /// Negation of every child.
    Not(Vec<Expression>),
    /// `CASE` expression.
    Case(CaseExpr),
    /// Children joined by `", "`.
    Comma(Vec<Expression>),
}

fn comparison(column: impl Into<Column>, value: impl Into<Arg>) -> Comparison {
    Comparison {
        column: column.into(),
        value: value.into(),
    }
}

impl Expression {
    /// `column = value`
    #[must_use]
    pub fn eq(column: impl Into<Column>, value: impl Into<Arg>) -> Self {
        Self::Eq(comparison(column, value))
    }

    /// `column <> value`
    #[must_use]
    pub fn neq(column: impl Into<Column>, value: impl Into<Arg>) -> Self {
        Self::Neq(comparison(column, value))
    }

    /// `column > value`
    #[must_use]
    pub fn gt(column: impl Into<Column>, value: impl Into<Arg>) -> Self {
        Self::Gt(comparison(column, value))
    }

    /// `column >= value`
    #[must_use]
    pub fn gte(column: impl Into<Column>, value: impl Into<Arg>) -> Self {
        Self::Gte(comparison(column, value))
    }

    /// `column < value`
    #[must_use]
    pub fn lt(column: impl Into<Column>, value: impl Into<Arg>) -> Self {
        Self::Lt(comparison(column, value))
    }

    /// `column <= value`
    #[must_use]
    pub fn lte(column: impl Into<Column>, value: impl Into<Arg>) -> Self {
        Self::Lte(comparison(column, value))
    }

    /// `column LIKE value`
    #[must_use]
    pub fn like(column: impl Into<Column>, value: impl Into<Arg>) -> Self {
        Self::Like(comparison(column, value))
    }

    /// `column IN (values)`
    #[must_use]
    pub fn in_list<I, T>(column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arg>,
    {
        Self::In(In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Raw SQL with positional vars.
    #[must_use]
    pub fn raw(sql: &str, vars: Vec<Arg>) -> Self {
        Self::Expr(Expr::new(sql, vars))
    }

    /// Raw SQL with named vars.
    #[must_use]
    pub fn named(sql: &str, vars: Vec<Arg>) -> Self {
        Self::Named(NamedExpr {
            sql: String::from(sql),
            vars,
        })
    }

    /// Conjunction; a single non-`OR` child is returned as is.
    #[must_use]
    pub fn and(mut exprs: Vec<Self>) -> Self {
        if exprs.len() == 1 && !matches!(exprs[0], Self::Or(_)) {
            return exprs.remove(0);
        }
        Self::And(exprs)
    }

    /// Disjunction.
    #[must_use]
    pub const fn or(exprs: Vec<Self>) -> Self {
        Self::Or(exprs)
    }

    /// Negation.
    #[must_use]
    pub const fn not(exprs: Vec<Self>) -> Self {
        Self::Not(exprs)
    }

    /// Returns true when the expression offers a negation build.
    #[must_use]
    pub const fn is_negatable(&self) -> bool {
        matches!(
            self,
            Self::Eq(_)
                | Self::Neq(_)
                | Self::Gt(_)
                | Self::Gte(_)
                | Self::Lt(_)
                | Self::Lte(_)
                | Self::Like(_)
                | Self::In(_)
                | Self::Not(_)
        )
    }

    /// Returns true when building would write nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Expr(e) => e.sql.is_empty(),
            Self::Named(e) => e.sql.is_empty(),
            Self::And(exprs) | Self::Or(exprs) | Self::Comma(exprs) => {
                exprs.iter().all(Self::is_empty)
            }
            Self::Not(exprs) if exprs.iter().all(Self::is_negatable) => {
                exprs.iter().all(Self::is_empty_negation)
            }
            Self::Not(exprs) => exprs.iter().all(Self::is_empty),
            _ => false,
        }
    }

    /// Returns true when the negation build would write nothing.
    fn is_empty_negation(&self) -> bool {
        match self {
            Self::In(i) => i.values.is_empty(),
            Self::Not(exprs) => exprs.iter().all(Self::is_empty),
            other => other.is_empty(),
        }
    }

    /// Writes the expression.
    pub fn build(&self, builder: &mut dyn Builder) {
        match self {
            Self::Eq(c) => build_eq(c, builder),
            Self::Neq(c) => build_neq(c, builder),
            Self::Gt(c) => build_binary(c, " > ", builder),
            Self::Gte(c) => build_binary(c, " >= ", builder),
            Self::Lt(c) => build_binary(c, " < ", builder),
            Self::Lte(c) => build_binary(c, " <= ", builder),
            Self::Like(c) => build_binary(c, " LIKE ", builder),
            Self::In(i) => build_in(i, builder),
            Self::Expr(e) => build_raw(e, builder),
            Self::Named(e) => build_named(e, builder),
            Self::And(exprs) => build_group(exprs, AND_WITH_SPACE, builder),
            Self::Or(exprs) => build_group(exprs, OR_WITH_SPACE, builder),
            Self::Not(exprs) => build_not(exprs, builder),
            Self::Case(c) => build_case(c, builder),
            Self::Comma(exprs) => {
                for (idx, expr) in exprs.iter().enumerate() {
                    if idx > 0 {
                        builder.write_str(", ");
                    }
                    expr.build(builder);
                }
            }
        }
    }

    /// Writes the negated form. Returns false, writing nothing, when the
    /// expression has no negation build.
    pub fn negation_build(&self, builder: &mut dyn Builder) -> bool {
        match self {
            Self::Eq(c) => build_neq(c, builder),
            Self::Neq(c) => build_eq(c, builder),
            Self::Gt(c) => build_binary(c, " <= ", builder),
            Self::Gte(c) => build_binary(c, " < ", builder),
            Self::Lt(c) => build_binary(c, " >= ", builder),
            Self::Lte(c) => build_binary(c, " > ", builder),
            Self::Like(c) => build_binary(c, " NOT LIKE ", builder),
            Self::In(i) => build_not_in(i, builder),
            Self::Not(exprs) => build_not_negation(exprs, builder),
            _ => return false,
        }
        true
    }
}

fn build_binary(c: &Comparison, op: &str, builder: &mut dyn Builder) {
    builder.write_quoted(Quoted::Column(&c.column));
    builder.write_str(op);
    builder.add_arg(&c.value);
}

fn build_eq(c: &Comparison, builder: &mut dyn Builder) {
    builder.write_quoted(Quoted::Column(&c.column));
    match &c.value {
        Arg::List(items) if items.is_empty() => builder.write_str(" IN (NULL)"),
        Arg::List(items) => {
            builder.write_str(" IN (");
            builder.add_var(items);
            builder.write_char(')');
        }
        value if value.is_null() => builder.write_str(" IS NULL"),
        value => {
            builder.write_str(" = ");
            builder.add_arg(value);
        }
    }
}

fn build_neq(c: &Comparison, builder: &mut dyn Builder) {
    builder.write_quoted(Quoted::Column(&c.column));
    match &c.value {
        Arg::List(items) if items.is_empty() => builder.write_str(" NOT IN (NULL)"),
        Arg::List(items) => {
            builder.write_str(" NOT IN (");
            builder.add_var(items);
            builder.write_char(')');
        }
        value if value.is_null() => builder.write_str(" IS NOT NULL"),
        value => {
            builder.write_str(" <> ");
            builder.add_arg(value);
        }
    }
}

fn build_in(i: &In, builder: &mut dyn Builder) {
    builder.write_quoted(Quoted::Column(&i.column));
    match i.values.as_slice() {
        [] => builder.write_str(" IN (NULL)"),
        [single] if !matches!(single, Arg::List(_)) => {
            builder.write_str(" = ");
            builder.add_arg(single);
        }
        values => {
            builder.write_str(" IN (");
            builder.add_var(values);
            builder.write_char(')');
        }
    }
}

fn build_not_in(i: &In, builder: &mut dyn Builder) {
    match i.values.as_slice() {
        [] => {}
        [single] if !matches!(single, Arg::List(_)) => {
            builder.write_quoted(Quoted::Column(&i.column));
            builder.write_str(" <> ");
            builder.add_arg(single);
        }
        values => {
            builder.write_quoted(Quoted::Column(&i.column));
            builder.write_str(" NOT IN (");
            builder.add_var(values);
            builder.write_char(')');
        }
    }
}

/// Writes `vars[idx]` for a `?`, expanding a list when `expand` is set.
fn build_placeholder(var: &Arg, expand: bool, builder: &mut dyn Builder) {
    match var {
        Arg::List(items) if expand => {
            if items.is_empty() {
                builder.add_arg(&Arg::Value(SqlValue::Null));
            } else {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        builder.write_char(',');
                    }
                    builder.add_arg(item);
                }
            }
        }
        other => builder.add_arg(other),
    }
}

fn build_raw(expr: &Expr, builder: &mut dyn Builder) {
    let mut after_paren = false;
    let mut idx = 0;
    let mut pending = String::new();

    for c in expr.sql.chars() {
        if c == '?' && idx < expr.vars.len() {
            builder.write_str(&pending);
            pending.clear();
            build_placeholder(
                &expr.vars[idx],
                after_paren || expr.without_parentheses,
                builder,
            );
            idx += 1;
        } else {
            after_paren = c == '(';
            pending.push(c);
        }
    }
    builder.write_str(&pending);

    if idx < expr.vars.len() {
        warn!(
            sql = %expr.sql,
            unused = expr.vars.len() - idx,
            "raw expression has more vars than placeholders; extra vars dropped"
        );
    }
}

const NAME_BOUNDARIES: &[char] = &[' ', ',', ')', '"', '\'', '`', '\r', '\n', ';'];

fn build_named(expr: &NamedExpr, builder: &mut dyn Builder) {
    let mut named: HashMap<&str, &Arg> = HashMap::new();
    for var in &expr.vars {
        match var {
            Arg::Named(name, value) => {
                named.insert(name.as_str(), value.as_ref());
            }
            Arg::Map(entries) => {
                for (name, value) in entries {
                    named.insert(name.as_str(), value);
                }
            }
            _ => {}
        }
    }

    let flush_name = |name: &str, builder: &mut dyn Builder| {
        if let Some(value) = named.get(name) {
            builder.add_arg(value);
        } else {
            builder.write_char('@');
            builder.write_str(name);
        }
    };

    let mut idx = 0;
    let mut in_name = false;
    let mut after_paren = false;
    let mut name = String::new();

    for c in expr.sql.chars() {
        if c == '@' && !in_name {
            in_name = true;
            name.clear();
        } else if NAME_BOUNDARIES.contains(&c) {
            if in_name {
                flush_name(&name, builder);
                in_name = false;
            }
            after_paren = false;
            builder.write_char(c);
        } else if c == '?' && idx < expr.vars.len() {
            build_placeholder(&expr.vars[idx], after_paren, builder);
            idx += 1;
        } else if in_name {
            name.push(c);
        } else {
            after_paren = c == '(';
            builder.write_char(c);
        }
    }

    if in_name {
        flush_name(&name, builder);
    }
}

/// Joins children, wrapping raw SQL that would change meaning when joined.
pub(crate) fn build_exprs<'a, I>(exprs: I, join: &str, builder: &mut dyn Builder)
where
    I: IntoIterator<Item = &'a Expression>,
{
    let exprs: Vec<&Expression> = exprs.into_iter().filter(|e| !e.is_empty()).collect();
    let multiple = exprs.len() > 1;

    for (idx, expr) in exprs.iter().enumerate() {
        if idx > 0 {
            match expr {
                Expression::Or(children) if children.len() == 1 => {
                    builder.write_str(OR_WITH_SPACE);
                }
                _ => builder.write_str(join),
            }
        }

        let wrap = multiple && needs_parentheses(expr);
        if wrap {
            builder.write_char('(');
        }
        expr.build(builder);
        if wrap {
            builder.write_char(')');
        }
    }
}

fn needs_parentheses(expr: &Expression) -> bool {
    match expr {
        Expression::Or(children) if children.len() == 1 => match &children[0] {
            Expression::Expr(e) => {
                let (and, or) = raw_conjunctions(&e.sql);
                and || or
            }
            _ => false,
        },
        Expression::And(children) if children.len() == 1 => match &children[0] {
            Expression::Expr(e) => raw_conjunctions(&e.sql).1,
            _ => false,
        },
        Expression::Expr(e) => raw_conjunctions(&e.sql).1,
        Expression::Named(e) => raw_conjunctions(&e.sql).1,
        _ => false,
    }
}

fn build_group(exprs: &[Expression], join: &str, builder: &mut dyn Builder) {
    let count = exprs.iter().filter(|e| !e.is_empty()).count();
    if count > 1 {
        builder.write_char('(');
        build_exprs(exprs, join, builder);
        builder.write_char(')');
    } else {
        build_exprs(exprs, join, builder);
    }
}

fn build_not(exprs: &[Expression], builder: &mut dyn Builder) {
    if exprs.iter().all(Expression::is_negatable) {
        let children: Vec<&Expression> = exprs
            .iter()
            .filter(|e| !e.is_empty_negation())
            .collect();
        let multiple = children.len() > 1;
        if multiple {
            builder.write_char('(');
        }
        for (idx, child) in children.iter().enumerate() {
            if idx > 0 {
                builder.write_str(AND_WITH_SPACE);
            }
            child.negation_build(builder);
        }
        if multiple {
            builder.write_char(')');
        }
        return;
    }

    builder.write_str("NOT ");
    let multiple = exprs.len() > 1;
    if multiple {
        builder.write_char('(');
    }
    for (idx, child) in exprs.iter().enumerate() {
        if idx > 0 {
            match child {
                Expression::Or(_) => builder.write_str(OR_WITH_SPACE),
                _ => builder.write_str(AND_WITH_SPACE),
            }
        }
        let wrap = match child {
            Expression::Expr(e) => {
                let (and, or) = raw_conjunctions(&e.sql);
                and || or
            }
            _ => false,
        };
        if wrap {
            builder.write_char('(');
        }
        child.build(builder);
        if wrap {
            builder.write_char(')');
        }
    }
    if multiple {
        builder.write_char(')');
    }
}

/// Undoes a `NOT`: the children are written as they are. When every child
/// was negated individually, `¬(¬a AND ¬b)` becomes `(a OR b)`.
fn build_not_negation(exprs: &[Expression], builder: &mut dyn Builder) {
    if exprs.iter().all(Expression::is_negatable) {
        build_group(exprs, OR_WITH_SPACE, builder);
    } else {
        build_group(exprs, AND_WITH_SPACE, builder);
    }
}

fn build_case(case: &CaseExpr, builder: &mut dyn Builder) {
    let mut sql = String::from("CASE");
    let mut vars = Vec::new();
    for when in &case.whens {
        sql.push_str(" WHEN ");
        sql.push_str(&when.when);
        sql.push_str(" THEN ");
        sql.push_str(&when.then);
        vars.extend(when.vars.iter().cloned());
    }
    if let Some(otherwise) = &case.otherwise {
        sql.push_str(" ELSE ");
        sql.push_str(&otherwise.then);
        vars.extend(otherwise.vars.iter().cloned());
    }
    sql.push_str(" END");
    build_raw(&Expr::new(&sql, vars), builder);
}
