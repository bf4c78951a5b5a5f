//! Expression serialization: membership, NULL handling, raw placeholder
//! expansion, named parameters and negation.

mod common;

use common::{build, init_tracing, mysql, postgres, text, User};
use sqlweave_core::clause::{
    CaseElse, CaseExpr, Column, Expression, Select, When, Where,
};
use sqlweave_core::{schema, Arg, SqlValue, Statement};

fn render_with(mut stmt: Statement, expr: &Expression) -> (String, Vec<SqlValue>) {
    expr.build(&mut stmt);
    stmt.finish()
        .unwrap_or_else(|e| panic!("expression failed: {e}"))
}

fn render(expr: &Expression) -> (String, Vec<SqlValue>) {
    render_with(mysql("users"), expr)
}

fn sql(expr: &Expression) -> String {
    render(expr).0
}

fn where_sql(exprs: Vec<Expression>) -> String {
    let mut stmt = mysql("users");
    stmt.add_clause(Where::new(exprs));
    build(stmt, &["WHERE"]).0
}

// =============================================================================
// Comparisons and membership
// =============================================================================

#[test]
fn test_in_list_arity() {
    assert_eq!(
        render(&Expression::in_list("id", Vec::<i32>::new())),
        (String::from("`id` IN (NULL)"), vec![])
    );
    assert_eq!(
        render(&Expression::in_list("id", [7])),
        (String::from("`id` = ?"), vec![SqlValue::Int(7)])
    );
    assert_eq!(
        render(&Expression::in_list("id", [1, 2, 3])),
        (
            String::from("`id` IN (?,?,?)"),
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
        )
    );
}

#[test]
fn test_eq_with_list_becomes_in() {
    assert_eq!(
        render(&Expression::eq("role", Arg::list(["a", "b"]))),
        (String::from("`role` IN (?,?)"), vec![text("a"), text("b")])
    );
    assert_eq!(
        sql(&Expression::neq("role", Arg::list(Vec::<&str>::new()))),
        "`role` NOT IN (NULL)"
    );
}

#[test]
fn test_null_comparisons() {
    assert_eq!(
        render(&Expression::eq("deleted_at", None::<i64>)),
        (String::from("`deleted_at` IS NULL"), vec![])
    );
    assert_eq!(
        sql(&Expression::neq("deleted_at", None::<i64>)),
        "`deleted_at` IS NOT NULL"
    );
}

#[test]
fn test_comparison_against_column() {
    assert_eq!(
        render(&Expression::gte("updated_at", Column::qualified("audit", "seen_at"))),
        (String::from("`updated_at` >= `audit`.`seen_at`"), vec![])
    );
}

#[test]
fn test_primary_key_sentinel_in_raw_sql() {
    let users = schema::parse::<User>().unwrap();
    let stmt = mysql("").with_schema(users);
    let expr = Expression::raw(
        "? = ?",
        vec![Arg::Column(Column::primary()), Arg::from(5)],
    );
    assert_eq!(
        render_with(stmt, &expr),
        (String::from("`users`.`id` = ?"), vec![SqlValue::Int(5)])
    );
}

// =============================================================================
// Raw SQL
// =============================================================================

#[test]
fn test_raw_list_expands_after_parenthesis() {
    let expr = Expression::raw("name IN (?)", vec![Arg::list(["a", "b"])]);
    assert_eq!(
        render(&expr),
        (String::from("name IN (?,?)"), vec![text("a"), text("b")])
    );

    let expr = Expression::raw("name IN (?)", vec![Arg::list(Vec::<&str>::new())]);
    assert_eq!(
        render(&expr),
        (String::from("name IN (?)"), vec![SqlValue::Null])
    );
}

#[test]
fn test_raw_list_without_parenthesis_binds_array() {
    let expr = Expression::raw("tags = ?", vec![Arg::list(["a", "b"])]);
    assert_eq!(
        render(&expr),
        (
            String::from("tags = ?"),
            vec![SqlValue::Array(vec![text("a"), text("b")])]
        )
    );
}

#[test]
fn test_raw_nested_expressions() {
    let expr = Expression::raw(
        "? OR ?",
        vec![
            Arg::from(Expression::eq("a", 1)),
            Arg::from(Expression::eq("b", 2)),
        ],
    );
    assert_eq!(
        render(&expr),
        (
            String::from("`a` = ? OR `b` = ?"),
            vec![SqlValue::Int(1), SqlValue::Int(2)]
        )
    );
}

#[test]
fn test_raw_placeholder_mismatch() {
    init_tracing();
    let surplus = Expression::raw("a = ?", vec![Arg::from(1), Arg::from(2)]);
    assert_eq!(
        render(&surplus),
        (String::from("a = ?"), vec![SqlValue::Int(1)])
    );

    let missing = Expression::raw("a = ? AND b = ?", vec![Arg::from(1)]);
    assert_eq!(
        render(&missing),
        (String::from("a = ? AND b = ?"), vec![SqlValue::Int(1)])
    );
}

#[test]
fn test_raw_with_postgres_placeholders() {
    let expr = Expression::raw(
        "a = ? AND b IN (?)",
        vec![Arg::from(1), Arg::list([2, 3])],
    );
    assert_eq!(
        render_with(postgres("users"), &expr).0,
        "a = $1 AND b IN ($2,$3)"
    );
}

#[test]
fn test_raw_or_wrapped_when_joined() {
    assert_eq!(
        where_sql(vec![
            Expression::eq("a", 1),
            Expression::raw("b = 1 OR c = 2", Vec::new()),
        ]),
        "WHERE `a` = ? AND (b = 1 OR c = 2)"
    );
    assert_eq!(
        where_sql(vec![Expression::raw("b = 1 OR c = 2", Vec::new())]),
        "WHERE b = 1 OR c = 2"
    );
    assert_eq!(
        where_sql(vec![
            Expression::eq("a", 1),
            Expression::or(vec![Expression::raw("b = 1 AND c = 2", Vec::new())]),
        ]),
        "WHERE `a` = ? OR (b = 1 AND c = 2)"
    );
}

// =============================================================================
// Named parameters
// =============================================================================

#[test]
fn test_named_parameters() {
    let expr = Expression::named(
        "name = @name AND age > @age",
        vec![Arg::named("name", "jinzhu"), Arg::named("age", 18)],
    );
    assert_eq!(
        render(&expr),
        (
            String::from("name = ? AND age > ?"),
            vec![text("jinzhu"), SqlValue::Int(18)]
        )
    );
}

#[test]
fn test_named_parameters_from_map() {
    let expr = Expression::named(
        "(@a,@b,@a)",
        vec![Arg::Map(vec![
            (String::from("a"), Arg::from(1)),
            (String::from("b"), Arg::from(2)),
        ])],
    );
    assert_eq!(
        render(&expr),
        (
            String::from("(?,?,?)"),
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(1)]
        )
    );
}

#[test]
fn test_named_mixed_with_positional() {
    let expr = Expression::named(
        "a = ? AND b = @b",
        vec![Arg::from(1), Arg::named("b", 2)],
    );
    assert_eq!(
        render(&expr),
        (
            String::from("a = ? AND b = ?"),
            vec![SqlValue::Int(1), SqlValue::Int(2)]
        )
    );
}

#[test]
fn test_unresolved_names_written_verbatim() {
    assert_eq!(
        render(&Expression::named("x = @missing", Vec::new())),
        (String::from("x = @missing"), vec![])
    );
    assert_eq!(
        sql(&Expression::named("email = 'a@b.c'", Vec::new())),
        "email = 'a@b.c'"
    );
}

// =============================================================================
// Negation
// =============================================================================

#[test]
fn test_not_rewrites_comparisons() {
    assert_eq!(sql(&Expression::not(vec![Expression::eq("a", 1)])), "`a` <> ?");
    assert_eq!(sql(&Expression::not(vec![Expression::gt("a", 1)])), "`a` <= ?");
    assert_eq!(sql(&Expression::not(vec![Expression::lte("a", 1)])), "`a` > ?");
    assert_eq!(
        sql(&Expression::not(vec![Expression::like("name", "j%")])),
        "`name` NOT LIKE ?"
    );
    assert_eq!(
        sql(&Expression::not(vec![Expression::in_list("a", [1, 2])])),
        "`a` NOT IN (?,?)"
    );
    assert_eq!(
        sql(&Expression::not(vec![Expression::in_list("a", [1])])),
        "`a` <> ?"
    );
    assert_eq!(
        sql(&Expression::not(vec![Expression::eq("a", None::<i64>)])),
        "`a` IS NOT NULL"
    );
}

#[test]
fn test_not_over_several_children() {
    assert_eq!(
        sql(&Expression::not(vec![
            Expression::eq("a", 1),
            Expression::gt("b", 2),
        ])),
        "(`a` <> ? AND `b` <= ?)"
    );
}

#[test]
fn test_not_prefix_for_raw_sql() {
    assert_eq!(
        sql(&Expression::not(vec![Expression::raw("a = 1", Vec::new())])),
        "NOT a = 1"
    );
    assert_eq!(
        sql(&Expression::not(vec![Expression::raw("a = 1 OR b = 2", Vec::new())])),
        "NOT (a = 1 OR b = 2)"
    );
    assert_eq!(
        sql(&Expression::not(vec![
            Expression::eq("a", 1),
            Expression::raw("b > 1", Vec::new()),
        ])),
        "NOT (`a` = ? AND b > 1)"
    );
}

#[test]
fn test_negating_a_negation() {
    let both = Expression::not(vec![Expression::eq("a", 1), Expression::lt("b", 2)]);
    assert_eq!(sql(&both), "(`a` <> ? AND `b` >= ?)");
    assert_eq!(
        render(&Expression::not(vec![both])),
        (
            String::from("(`a` = ? OR `b` < ?)"),
            vec![SqlValue::Int(1), SqlValue::Int(2)]
        )
    );

    let mixed = Expression::not(vec![
        Expression::eq("a", 1),
        Expression::raw("b > 1", Vec::new()),
    ]);
    assert_eq!(sql(&Expression::not(vec![mixed])), "(`a` = ? AND b > 1)");
}

#[test]
fn test_double_negated_empty_list_matches_nothing() {
    let expr = Expression::not(vec![Expression::not(vec![Expression::in_list(
        "id",
        Vec::<i32>::new(),
    )])]);
    assert!(!expr.is_empty());
    assert_eq!(sql(&expr), "`id` IN (NULL)");
    assert_eq!(where_sql(vec![expr]), "WHERE `id` IN (NULL)");
}

#[test]
fn test_not_in_empty_list_is_dropped() {
    let mut stmt = mysql("users");
    stmt.add_clause(Select::default());
    stmt.add_clause(Where::new(vec![Expression::not(vec![Expression::in_list(
        "id",
        Vec::<i32>::new(),
    )])]));
    assert_eq!(build(stmt, &["SELECT", "WHERE"]).0, "SELECT *");
}

// =============================================================================
// Composites
// =============================================================================

#[test]
fn test_nested_groups_are_parenthesized() {
    let expr = Expression::and(vec![
        Expression::eq("a", 1),
        Expression::or(vec![Expression::eq("b", 2), Expression::eq("c", 3)]),
    ]);
    assert_eq!(sql(&expr), "(`a` = ? AND (`b` = ? OR `c` = ?))");
    assert_eq!(
        where_sql(vec![expr]),
        "WHERE (`a` = ? AND (`b` = ? OR `c` = ?))"
    );
}

#[test]
fn test_and_of_one_is_the_child() {
    assert_eq!(
        Expression::and(vec![Expression::eq("a", 1)]),
        Expression::eq("a", 1)
    );
    assert!(matches!(
        Expression::and(vec![Expression::or(vec![Expression::eq("a", 1)])]),
        Expression::And(_)
    ));
}

#[test]
fn test_case_expression() {
    let expr = Expression::Case(CaseExpr {
        whens: vec![
            When {
                when: String::from("age < ?"),
                then: String::from("'minor'"),
                vars: vec![Arg::from(18)],
            },
            When {
                when: String::from("age > ?"),
                then: String::from("'senior'"),
                vars: vec![Arg::from(65)],
            },
        ],
        otherwise: Some(CaseElse {
            then: String::from("?"),
            vars: vec![Arg::from("adult")],
        }),
    });
    assert_eq!(
        render(&expr),
        (
            String::from("CASE WHEN age < ? THEN 'minor' WHEN age > ? THEN 'senior' ELSE ? END"),
            vec![SqlValue::Int(18), SqlValue::Int(65), text("adult")]
        )
    );
}

#[test]
fn test_comma_list() {
    let expr = Expression::Comma(vec![
        Expression::raw("a", Vec::new()),
        Expression::eq("b", 1),
    ]);
    assert_eq!(sql(&expr), "a, `b` = ?");
}

#[test]
fn test_emptiness() {
    assert!(Expression::raw("", Vec::new()).is_empty());
    assert!(Expression::and(vec![]).is_empty());
    assert!(Expression::not(vec![Expression::in_list("a", Vec::<i32>::new())]).is_empty());
    assert!(!Expression::in_list("a", Vec::<i32>::new()).is_empty());
    assert!(!Expression::eq("a", 1).is_empty());
}
