//! Clause engine: identifiers, arguments, expressions and named clauses.
//!
//! A statement is a set of named clauses. Each clause knows how to build
//! itself into a [`Builder`] and how to merge with an earlier clause of the
//! same name, so callers can assemble statements piecewise in any order.

mod as_of_system_time;
mod delete;
mod expression;
mod from;
mod group_by;
mod insert;
mod limit;
mod locking;
mod on_conflict;
mod order_by;
mod returning;
mod select;
mod update;
mod where_clause;
mod with;

use std::fmt;
use std::sync::Arc;

pub use as_of_system_time::AsOfSystemTime;
pub use delete::Delete;
pub use expression::{CaseElse, CaseExpr, Comparison, Expr, Expression, In, NamedExpr, When};
pub use from::{From, Join, JoinType};
pub use group_by::GroupBy;
pub use insert::{Insert, Values};
pub use limit::Limit;
pub use locking::{Locking, LockingOptions, LockingStrength};
pub use on_conflict::OnConflict;
pub use order_by::{OrderBy, OrderByColumn};
pub use returning::Returning;
pub use select::Select;
pub use update::{Assignment, Set, Update};
pub use where_clause::Where;
pub use with::{Cte, With};

use crate::dialect::Dialect;
use crate::error::Error;
use crate::schema::Schema;
use crate::value::{SqlValue, ToSqlValue};

pub(crate) const AND_WITH_SPACE: &str = " AND ";
pub(crate) const OR_WITH_SPACE: &str = " OR ";

/// An identifier, or one of the sentinels substituted at build time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    /// A plain identifier.
    Ident(String),
    /// The statement's bound table.
    CurrentTable,
    /// The bound schema's prioritized primary key column.
    PrimaryKey,
    /// Marker for association preloading; never rendered.
    Associations,
}

impl Name {
    /// Returns the identifier text, or `None` for sentinels.
    #[must_use]
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Self::Ident(s) => Some(s),
            _ => None,
        }
    }
}

impl std::convert::From<&str> for Name {
    fn from(value: &str) -> Self {
        Self::Ident(String::from(value))
    }
}

impl std::convert::From<String> for Name {
    fn from(value: String) -> Self {
        Self::Ident(value)
    }
}

/// A column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Optional table qualifier.
    pub table: Option<Name>,
    /// Column name.
    pub name: Name,
    /// Optional alias, written as `AS alias`.
    pub alias: Option<String>,
    /// Written verbatim without quoting.
    pub raw: bool,
}

/// Creates a column reference.
#[must_use]
pub fn col(name: &str) -> Column {
    Column::new(name)
}

impl Column {
    /// Creates an unqualified column.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            table: None,
            name: Name::from(name),
            alias: None,
            raw: false,
        }
    }

    /// Creates a qualified column reference.
    #[must_use]
    pub fn qualified(table: &str, name: &str) -> Self {
        Self {
            table: Some(Name::from(table)),
            ..Self::new(name)
        }
    }

    /// Creates a column written verbatim.
    #[must_use]
    pub fn raw(sql: &str) -> Self {
        Self {
            raw: true,
            ..Self::new(sql)
        }
    }

    /// The current table's primary key column.
    #[must_use]
    pub const fn primary() -> Self {
        Self {
            table: Some(Name::CurrentTable),
            name: Name::PrimaryKey,
            alias: None,
            raw: false,
        }
    }

    /// The primary key column without table qualifier.
    #[must_use]
    pub const fn primary_key() -> Self {
        Self {
            table: None,
            name: Name::PrimaryKey,
            alias: None,
            raw: false,
        }
    }

    /// A column qualified with the current table.
    #[must_use]
    pub fn of_current_table(name: &str) -> Self {
        Self {
            table: Some(Name::CurrentTable),
            ..Self::new(name)
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(String::from(alias));
        self
    }
}

impl std::convert::From<&str> for Column {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::convert::From<String> for Column {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// A table reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Table name.
    pub name: Name,
    /// Optional alias.
    pub alias: Option<String>,
    /// Written verbatim without quoting.
    pub raw: bool,
}

impl Table {
    /// Creates a table reference.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Name::from(name),
            alias: None,
            raw: false,
        }
    }

    /// The statement's bound table.
    #[must_use]
    pub const fn current() -> Self {
        Self {
            name: Name::CurrentTable,
            alias: None,
            raw: false,
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(String::from(alias));
        self
    }

    /// Returns true when this refers to the bound table.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.name == Name::CurrentTable
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::current()
    }
}

impl std::convert::From<&str> for Table {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A value handed to an expression.
///
/// `Value` is bound as one parameter and never expanded; `List` is a slice
/// and expands to one placeholder per element inside `(?)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A scalar value.
    Value(SqlValue),
    /// A slice of arguments.
    List(Vec<Arg>),
    /// A column, written quoted.
    Column(Column),
    /// A table, written quoted.
    Table(Table),
    /// A nested expression, built inline.
    Expr(Box<Expression>),
    /// A named argument for `@name` tokens.
    Named(String, Box<Arg>),
    /// A set of named arguments.
    Map(Vec<(String, Arg)>),
}

impl Arg {
    /// Creates a scalar argument.
    #[must_use]
    pub fn value(value: impl ToSqlValue) -> Self {
        Self::Value(value.to_sql_value())
    }

    /// Creates a list argument.
    #[must_use]
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Creates a named argument.
    #[must_use]
    pub fn named(name: &str, value: impl Into<Self>) -> Self {
        Self::Named(String::from(name), Box::new(value.into()))
    }

    /// Returns true for a `NULL` scalar.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Value(SqlValue::Null))
    }
}

impl<T: ToSqlValue> std::convert::From<T> for Arg {
    fn from(value: T) -> Self {
        Self::Value(value.to_sql_value())
    }
}

impl std::convert::From<Column> for Arg {
    fn from(value: Column) -> Self {
        Self::Column(value)
    }
}

impl std::convert::From<Table> for Arg {
    fn from(value: Table) -> Self {
        Self::Table(value)
    }
}

impl std::convert::From<Expression> for Arg {
    fn from(value: Expression) -> Self {
        Self::Expr(Box::new(value))
    }
}

/// Something `write_quoted` can render.
#[derive(Debug, Clone, Copy)]
pub enum Quoted<'a> {
    /// A column reference.
    Column(&'a Column),
    /// A table reference.
    Table(&'a Table),
    /// A bare identifier.
    Ident(&'a str),
}

/// The sink expressions and clauses build into.
pub trait Builder {
    /// Writes raw SQL text.
    fn write_str(&mut self, s: &str);

    /// Writes one raw character.
    fn write_char(&mut self, c: char) {
        let mut buf = [0_u8; 4];
        self.write_str(c.encode_utf8(&mut buf));
    }

    /// Writes an identifier, resolving sentinels and quoting.
    fn write_quoted(&mut self, target: Quoted<'_>);

    /// Binds arguments, writing one placeholder per bound value, comma
    /// separated.
    fn add_var(&mut self, args: &[Arg]);

    /// Records an error without interrupting the build.
    fn add_error(&mut self, err: Error);

    /// The dialect the statement is built for.
    fn dialect(&self) -> &dyn Dialect;

    /// The schema bound to the statement, if any.
    fn schema(&self) -> Option<&Schema> {
        None
    }

    /// Binds one argument.
    fn add_arg(&mut self, arg: &Arg) {
        self.add_var(std::slice::from_ref(arg));
    }
}

/// Replaces the default serialization of a clause.
pub type ClauseBuilder = Arc<dyn Fn(&Clause, &mut dyn Builder) + Send + Sync>;

/// A named clause installed on a statement.
#[derive(Clone, Default)]
pub struct Clause {
    /// Name written before the expression; empty for clauses that write
    /// their own keyword.
    pub name: String,
    /// Fragment written before the name.
    pub before_expression: Option<Expression>,
    /// Fragment written between the name and the expression.
    pub after_name_expression: Option<Expression>,
    /// Fragment written after the expression.
    pub after_expression: Option<Expression>,
    /// The clause body.
    pub expression: Option<ClauseExpression>,
    /// Custom serialization.
    pub builder: Option<ClauseBuilder>,
}

impl fmt::Debug for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clause")
            .field("name", &self.name)
            .field("before_expression", &self.before_expression)
            .field("after_name_expression", &self.after_name_expression)
            .field("after_expression", &self.after_expression)
            .field("expression", &self.expression)
            .field("builder", &self.builder.is_some())
            .finish()
    }
}

impl Clause {
    /// Builds the clause: pre-fragment, name, post-name fragment,
    /// expression, trailing fragment.
    pub fn build(&self, builder: &mut dyn Builder) {
        if let Some(custom) = &self.builder {
            custom(self, builder);
            return;
        }
        let Some(expression) = &self.expression else {
            return;
        };

        if let Some(before) = &self.before_expression {
            before.build(builder);
            builder.write_char(' ');
        }
        if !self.name.is_empty() {
            builder.write_str(&self.name);
            builder.write_char(' ');
        }
        if let Some(after_name) = &self.after_name_expression {
            after_name.build(builder);
            builder.write_char(' ');
        }
        expression.build(builder);
        if let Some(after) = &self.after_expression {
            builder.write_char(' ');
            after.build(builder);
        }
    }

    /// Returns true when building would produce no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.builder.is_none() && self.expression.as_ref().map_or(true, ClauseExpression::is_empty)
    }
}

/// The body of a named clause.
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseExpression {
    /// `SELECT`
    Select(Select),
    /// `FROM`
    From(From),
    /// `WHERE`
    Where(Where),
    /// `GROUP BY` with optional `HAVING`
    GroupBy(GroupBy),
    /// `ORDER BY`
    OrderBy(OrderBy),
    /// `LIMIT` / `OFFSET`
    Limit(Limit),
    /// `INSERT INTO`
    Insert(Insert),
    /// `VALUES`
    Values(Values),
    /// `UPDATE`
    Update(Update),
    /// `SET`
    Set(Set),
    /// `DELETE`
    Delete(Delete),
    /// `RETURNING`
    Returning(Returning),
    /// `ON CONFLICT`
    OnConflict(OnConflict),
    /// `FOR UPDATE` / `FOR SHARE`
    Locking(Locking),
    /// `WITH`
    With(With),
    /// `AS OF SYSTEM TIME`
    AsOfSystemTime(AsOfSystemTime),
    /// A free-form clause under a caller-chosen name.
    Custom(String, Expression),
}

impl ClauseExpression {
    /// The canonical name the clause is registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Select(_) => "SELECT",
            Self::From(_) => "FROM",
            Self::Where(_) => "WHERE",
            Self::GroupBy(_) => "GROUP BY",
            Self::OrderBy(_) => "ORDER BY",
            Self::Limit(_) => "LIMIT",
            Self::Insert(_) => "INSERT",
            Self::Values(_) => "VALUES",
            Self::Update(_) => "UPDATE",
            Self::Set(_) => "SET",
            Self::Delete(_) => "DELETE",
            Self::Returning(_) => "RETURNING",
            Self::OnConflict(_) => "ON CONFLICT",
            Self::Locking(_) => "FOR",
            Self::With(_) => "WITH",
            Self::AsOfSystemTime(_) => "AS OF SYSTEM TIME",
            Self::Custom(name, _) => name.as_str(),
        }
    }

    /// Builds the clause body.
    pub fn build(&self, builder: &mut dyn Builder) {
        match self {
            Self::Select(c) => c.build(builder),
            Self::From(c) => c.build(builder),
            Self::Where(c) => c.build(builder),
            Self::GroupBy(c) => c.build(builder),
            Self::OrderBy(c) => c.build(builder),
            Self::Limit(c) => c.build(builder),
            Self::Insert(c) => c.build(builder),
            Self::Values(c) => c.build(builder),
            Self::Update(c) => c.build(builder),
            Self::Set(c) => c.build(builder),
            Self::Delete(c) => c.build(builder),
            Self::Returning(c) => c.build(builder),
            Self::OnConflict(c) => c.build(builder),
            Self::Locking(c) => c.build(builder),
            Self::With(c) => c.build(builder),
            Self::AsOfSystemTime(c) => c.build(builder),
            Self::Custom(_, expr) => expr.build(builder),
        }
    }

    /// Returns true when the body would build to nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Where(c) => c.is_empty(),
            Self::GroupBy(c) => c.is_empty(),
            Self::OrderBy(c) => c.is_empty(),
            Self::Limit(c) => c.is_empty(),
            Self::With(c) => c.is_empty(),
            Self::AsOfSystemTime(c) => c.is_empty(),
            Self::Custom(_, expr) => expr.is_empty(),
            _ => false,
        }
    }

    /// Installs `self` on `clause`, merging with the body already there.
    pub fn merge_into(self, clause: &mut Clause) {
        let existing = clause.expression.take();
        let name = self.name().to_string();
        clause.name = name;

        let merged = match (existing, self) {
            (Some(Self::Select(old)), Self::Select(new)) => Self::Select(old.merge(new)),
            (Some(Self::From(old)), Self::From(new)) => Self::From(old.merge(new)),
            (Some(Self::Where(old)), Self::Where(new)) => Self::Where(old.merge(new)),
            (Some(Self::GroupBy(old)), Self::GroupBy(new)) => Self::GroupBy(old.merge(new)),
            (Some(Self::OrderBy(old)), Self::OrderBy(new)) => Self::OrderBy(old.merge(new)),
            (Some(Self::Limit(old)), Self::Limit(new)) => Self::Limit(old.merge(new)),
            (Some(Self::Insert(old)), Self::Insert(new)) => Self::Insert(old.merge(new)),
            (Some(Self::Update(old)), Self::Update(new)) => Self::Update(old.merge(new)),
            (Some(Self::Returning(old)), Self::Returning(new)) => Self::Returning(old.merge(new)),
            (Some(Self::With(old)), Self::With(new)) => Self::With(old.merge(new)),
            (_, Self::Limit(new)) => Self::Limit(new.normalized()),
            (_, new) => new,
        };

        // Clauses that write their own keyword carry an empty name.
        match &merged {
            Self::Limit(_) | Self::Values(_) | Self::Delete(_) => clause.name.clear(),
            Self::GroupBy(group_by) if group_by.columns.is_empty() => clause.name.clear(),
            Self::AsOfSystemTime(_) => clause.name.clear(),
            _ => {}
        }
        clause.expression = Some(merged);
    }
}

macro_rules! clause_expression_from {
    ($($variant:ident),*) => {
        $(
            impl std::convert::From<$variant> for ClauseExpression {
                fn from(value: $variant) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

clause_expression_from!(
    Select,
    From,
    Where,
    GroupBy,
    OrderBy,
    Limit,
    Insert,
    Values,
    Update,
    Set,
    Delete,
    Returning,
    OnConflict,
    Locking,
    With,
    AsOfSystemTime
);

/// Returns `(has " AND ", has " OR ")` for raw SQL, case-insensitively.
pub(crate) fn raw_conjunctions(sql: &str) -> (bool, bool) {
    let upper = sql.to_uppercase();
    (upper.contains(AND_WITH_SPACE), upper.contains(OR_WITH_SPACE))
}
