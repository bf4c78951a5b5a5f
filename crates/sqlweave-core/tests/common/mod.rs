#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDateTime;
use sqlweave_core::dialect::{MysqlDialect, PostgresDialect};
use sqlweave_core::{SqlValue, Statement};
use sqlweave_derive::Model;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

// =============================================================================
// Models
// =============================================================================

#[derive(Model)]
pub struct Company {
    pub id: i64,
    pub name: String,
}

#[derive(Model)]
pub struct Toy {
    pub id: u64,
    pub name: String,
    pub owner_id: String,
    pub owner_type: String,
}

#[derive(Model)]
pub struct Pet {
    pub id: u64,
    pub user_id: Option<u64>,
    pub name: String,
    #[orm("polymorphic:Owner;")]
    pub toy: Toy,
}

#[derive(Model)]
pub struct Language {
    #[orm("primaryKey")]
    pub code: String,
    pub name: String,
}

#[derive(Model)]
pub struct Account {
    pub id: u64,
    pub user_id: Option<u64>,
    pub number: String,
}

#[derive(Model)]
pub struct User {
    pub id: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub name: String,
    pub age: u32,
    pub birthday: Option<NaiveDateTime>,
    pub account: Account,
    pub pets: Vec<Box<Pet>>,
    #[orm("polymorphic:Owner")]
    pub toys: Vec<Toy>,
    pub company_id: Option<i64>,
    pub company: Company,
    pub manager_id: Option<u64>,
    pub manager: Option<Box<User>>,
    #[orm("foreignKey:ManagerID")]
    pub team: Vec<User>,
    #[orm("many2many:UserSpeak;")]
    pub languages: Vec<Language>,
    #[orm("many2many:user_friends")]
    pub friends: Vec<Box<User>>,
    pub active: bool,
}

#[derive(Model)]
pub struct BaseModel {
    pub id: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Model)]
pub struct Author {
    pub name: String,
    pub email: String,
}

#[derive(Model)]
pub struct Blog {
    #[orm(anonymous)]
    pub base: BaseModel,
    #[orm("embedded;embeddedPrefix:author_")]
    pub author: Author,
    pub title: String,
    #[orm("-")]
    pub draft: String,
}

#[derive(Model)]
#[model(table = "people")]
pub struct Person {
    pub id: i32,
    #[orm("column:full_name;size:128;not null;comment:'display name'")]
    pub name: String,
    #[orm("uniqueIndex")]
    pub email: String,
    #[orm("unique")]
    pub nickname: String,
    #[orm("check:age > 0")]
    pub age: u8,
    #[orm("default:true")]
    pub enabled: bool,
    #[orm(skip)]
    pub cached_score: Vec<std::collections::HashMap<String, String>>,
}

#[derive(Model)]
#[orm("tableName:audit_log")]
pub struct AuditEntry {
    #[orm("primaryKey;autoIncrement:false")]
    pub seq: i64,
    #[orm("index:idx_scope,priority:2")]
    pub scope: String,
    #[orm("index:idx_scope,priority:1,sort:desc")]
    pub tenant: String,
    #[orm("<-:create")]
    pub actor: String,
    #[orm("->")]
    pub computed: String,
    #[orm("autoCreateTime:milli")]
    pub logged_at: i64,
    #[orm("serializer:json")]
    pub payload: serde_json::Value,
    pub raw: Vec<u8>,
}

// =============================================================================
// Statement helpers
// =============================================================================

/// A MySQL statement bound to `table`.
pub fn mysql(table: &str) -> Statement {
    Statement::new(Arc::new(MysqlDialect::new())).with_table(table)
}

/// A Postgres statement bound to `table`.
pub fn postgres(table: &str) -> Statement {
    Statement::new(Arc::new(PostgresDialect::new())).with_table(table)
}

/// Builds `names` and returns the SQL and vars, panicking on errors.
pub fn build(mut stmt: Statement, names: &[&str]) -> (String, Vec<SqlValue>) {
    stmt.build(names);
    stmt.finish()
        .unwrap_or_else(|e| panic!("statement failed: {e}"))
}

/// Shorthand for a text value.
pub fn text(value: &str) -> SqlValue {
    SqlValue::Text(String::from(value))
}

/// Routes `tracing` output to the test harness. Only the first call
/// installs the subscriber.
pub fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Counts placeholders of the `?` style.
pub fn placeholder_count(sql: &str) -> usize {
    sql.matches('?').count()
}
