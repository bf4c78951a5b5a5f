//! Schema reflection: tables, columns, keys, indexes, constraints and
//! relationship resolution.

mod common;

use std::sync::Arc;

use common::{mysql, AuditEntry, Blog, Company, Language, Person, Pet, Toy, User};
use sqlweave_core::clause::{Column, Expression};
use sqlweave_core::schema::{
    self, DataType, Field, Relationship, RelationshipKind, Schema, SchemaCache, TimeKind,
};
use sqlweave_core::{Error, NamingStrategy, SqlValue};
use sqlweave_derive::Model;

#[derive(Model)]
pub struct Tenant {
    #[orm("primaryKey")]
    pub region: String,
    #[orm("primaryKey")]
    pub code: String,
    pub members: Vec<Member>,
}

#[derive(Model)]
pub struct Member {
    pub id: u64,
    pub tenant_region: String,
    pub tenant_code: String,
}

#[derive(Model)]
pub struct Orphan {
    pub id: u64,
    pub owner: Company,
    #[orm("foreignKey:Missing")]
    pub parent: Company,
}

#[derive(Model)]
pub struct Guild {
    pub id: u64,
    pub name: String,
    pub heroes: Vec<Hero>,
}

#[derive(Model)]
pub struct Hero {
    pub id: u64,
    pub guild_id: Option<u64>,
    pub guild: Option<Box<Guild>>,
}

fn names(fields: &[Arc<Field>]) -> Vec<&str> {
    fields.iter().map(|f| f.name.as_str()).collect()
}

fn relation<'a>(schema: &'a Schema, name: &str) -> &'a Relationship {
    schema
        .relationships()
        .get(name)
        .unwrap_or_else(|| panic!("{} has no relationship {name}", schema.name))
}

fn sql_of(expr: &Expression) -> String {
    let mut stmt = mysql("users");
    expr.build(&mut stmt);
    stmt.sql().to_string()
}

// =============================================================================
// Tables and columns
// =============================================================================

#[test]
fn test_user_table_and_columns() {
    let users = schema::parse::<User>().unwrap();
    assert_eq!(users.name, "User");
    assert_eq!(users.table, "users");
    assert_eq!(
        users.db_names,
        vec![
            "id",
            "created_at",
            "updated_at",
            "name",
            "age",
            "birthday",
            "company_id",
            "manager_id",
            "active"
        ]
    );
    assert_eq!(names(&users.primary_fields), vec!["ID"]);

    let id = users.prioritized_primary_field.as_ref().unwrap();
    assert_eq!(id.db_name, "id");
    assert!(id.auto_increment);
    assert!(id.has_default_value);
    assert_eq!(names(&users.fields_with_default_db_value), vec!["ID"]);

    let languages = schema::parse::<Language>().unwrap();
    let code = languages.prioritized_primary_field.as_ref().unwrap();
    assert_eq!(code.db_name, "code");
    assert!(!code.auto_increment);
    assert!(!code.has_default_value);
}

#[test]
fn test_automatic_timestamps() {
    let users = schema::parse::<User>().unwrap();
    let created = users.lookup_field("created_at").unwrap();
    assert_eq!(created.auto_create_time, Some(TimeKind::Time));
    assert_eq!(created.auto_update_time, None);

    let updated = users.lookup_field("UpdatedAt").unwrap();
    assert_eq!(updated.auto_update_time, Some(TimeKind::Time));

    let birthday = users.lookup_field("birthday").unwrap();
    assert_eq!(birthday.data_type, Some(DataType::Time));
    assert_eq!(birthday.auto_create_time, None);
}

#[test]
fn test_column_settings_from_tags() {
    let people = schema::parse::<Person>().unwrap();
    assert_eq!(people.table, "people");

    let name = people.lookup_field("full_name").unwrap();
    assert_eq!(name.name, "Name");
    assert_eq!(name.size, 128);
    assert!(name.not_null);
    assert_eq!(name.comment, "display name");
    assert!(Arc::ptr_eq(name, people.lookup_field("Name").unwrap()));

    let enabled = people.lookup_field("enabled").unwrap();
    assert!(enabled.has_default_value);
    assert_eq!(enabled.default_sql_value, Some(SqlValue::Bool(true)));

    assert!(people.lookup_field("cached_score").is_none());
    assert_eq!(names(&people.fields_with_default_db_value), vec!["ID"]);
}

#[test]
fn test_permissions_serializer_and_time_units() {
    let audit = schema::parse::<AuditEntry>().unwrap();
    assert_eq!(audit.table, "audit_log");
    assert_eq!(names(&audit.primary_fields), vec!["Seq"]);

    let seq = audit.lookup_field("seq").unwrap();
    assert!(!seq.auto_increment);
    assert!(!seq.has_default_value);

    let actor = audit.lookup_field("actor").unwrap();
    assert!(actor.creatable);
    assert!(!actor.updatable);
    assert!(actor.readable);

    let computed = audit.lookup_field("computed").unwrap();
    assert!(!computed.creatable);
    assert!(!computed.updatable);
    assert!(computed.readable);

    let logged_at = audit.lookup_field("logged_at").unwrap();
    assert_eq!(logged_at.auto_create_time, Some(TimeKind::Milli));

    let payload = audit.lookup_field("payload").unwrap();
    assert_eq!(payload.serializer.as_deref(), Some("json"));
    assert_eq!(payload.data_type, Some(DataType::String));
    assert!(payload.serializer().is_some());

    let raw = audit.lookup_field("raw").unwrap();
    assert_eq!(raw.data_type, Some(DataType::Bytes));
}

#[test]
fn test_embedded_and_anonymous_fields() {
    let blogs = schema::parse::<Blog>().unwrap();
    assert_eq!(blogs.table, "blogs");
    assert_eq!(
        blogs.db_names,
        vec![
            "id",
            "created_at",
            "updated_at",
            "author_name",
            "author_email",
            "title"
        ]
    );

    let id = blogs.lookup_field_by_bind_name(&["Base"], "ID").unwrap();
    assert_eq!(id.bind_names, vec!["Base", "ID"]);
    assert!(id.primary_key);
    assert!(id.owner_schema.is_some());
    assert_eq!(names(&blogs.primary_fields), vec!["ID"]);

    let author_name = blogs.lookup_field("author_name").unwrap();
    assert_eq!(author_name.bind_names, vec!["Author", "Name"]);

    // Ignored fields have no column and no relationship.
    let draft = blogs.field_by_name("Draft").unwrap();
    assert!(draft.db_name.is_empty());
    assert!(!draft.has_permission());
    assert!(blogs.relationships().is_empty());
}

// =============================================================================
// Indexes and constraints
// =============================================================================

#[test]
fn test_unique_index_and_unique_constraint() {
    let people = schema::parse::<Person>().unwrap();

    let email = people.lookup_index("idx_people_email").unwrap();
    assert!(email.is_unique());
    assert_eq!(email.fields.len(), 1);
    assert_eq!(email.fields[0].field.db_name, "email");

    let uniques: Vec<&str> = people.uniques.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(uniques, vec!["uni_people_nickname"]);
    assert_eq!(
        sql_of(&people.uniques[0].build()),
        "CONSTRAINT `uni_people_nickname` UNIQUE (`nickname`)"
    );
}

#[test]
fn test_check_constraint() {
    let people = schema::parse::<Person>().unwrap();
    assert_eq!(people.checks.len(), 1);
    let check = &people.checks[0];
    assert_eq!(check.name, "chk_people_age");
    assert_eq!(check.constraint, "age > 0");
    assert_eq!(
        sql_of(&check.build()),
        "CONSTRAINT `chk_people_age` CHECK (age > 0)"
    );
}

#[test]
fn test_composite_index_orders_by_priority() {
    let audit = schema::parse::<AuditEntry>().unwrap();
    let index = audit.lookup_index("idx_scope").unwrap();
    assert!(!index.is_unique());

    let columns: Vec<&str> = index
        .fields
        .iter()
        .map(|option| option.field.db_name.as_str())
        .collect();
    assert_eq!(columns, vec!["tenant", "scope"]);
    assert_eq!(index.fields[0].sort, "desc");
    assert_eq!(index.fields[0].priority, 1);

    assert!(std::ptr::eq(audit.lookup_index("Scope").unwrap(), index));
}

// =============================================================================
// Relationships
// =============================================================================

#[test]
fn test_has_one_and_has_many() {
    let users = schema::parse::<User>().unwrap();

    let account = relation(&users, "Account");
    assert_eq!(account.kind, RelationshipKind::HasOne);
    assert_eq!(account.references.len(), 1);
    assert_eq!(account.references[0].foreign_key.name, "UserID");
    assert!(account.references[0].own_primary_key);

    let pets = relation(&users, "Pets");
    assert_eq!(pets.kind, RelationshipKind::HasMany);
    assert!(Arc::ptr_eq(&pets.field_schema, &schema::parse::<Pet>().unwrap()));
    let reference = &pets.references[0];
    assert_eq!(reference.primary_key.as_ref().unwrap().name, "ID");
    assert_eq!(reference.foreign_key.name, "UserID");
    assert!(reference.own_primary_key);

    assert_eq!(
        pets.join_on(),
        vec![Expression::eq(
            Column::qualified("pets", "user_id"),
            Column::qualified("users", "id"),
        )]
    );
    assert_eq!(names(&pets.key_fields()), vec!["ID"]);
}

#[test]
fn test_belongs_to() {
    let users = schema::parse::<User>().unwrap();

    let company = relation(&users, "Company");
    assert_eq!(company.kind, RelationshipKind::BelongsTo);
    let reference = &company.references[0];
    assert_eq!(reference.primary_key.as_ref().unwrap().name, "ID");
    assert_eq!(reference.foreign_key.name, "CompanyID");
    assert!(!reference.own_primary_key);
    assert_eq!(
        company.join_on(),
        vec![Expression::eq(
            Column::qualified("users", "company_id"),
            Column::qualified("companies", "id"),
        )]
    );
    assert_eq!(names(&company.key_fields()), vec!["CompanyID"]);
}

#[test]
fn test_self_referential_relationships() {
    let users = schema::parse::<User>().unwrap();

    let manager = relation(&users, "Manager");
    assert_eq!(manager.kind, RelationshipKind::BelongsTo);
    assert!(Arc::ptr_eq(&manager.field_schema, &users));
    assert_eq!(manager.references[0].foreign_key.name, "ManagerID");

    let team = relation(&users, "Team");
    assert_eq!(team.kind, RelationshipKind::HasMany);
    assert!(Arc::ptr_eq(&team.field_schema, &users));
    assert_eq!(team.references[0].foreign_key.name, "ManagerID");
    assert!(team.references[0].own_primary_key);
}

#[test]
fn test_polymorphic_has_many() {
    let users = schema::parse::<User>().unwrap();
    let toys = relation(&users, "Toys");
    assert_eq!(toys.kind, RelationshipKind::HasMany);

    let polymorphic = toys.polymorphic.as_ref().unwrap();
    assert_eq!(polymorphic.value, "users");
    assert_eq!(polymorphic.type_field.name, "OwnerType");
    assert_eq!(polymorphic.id.name, "OwnerID");

    assert_eq!(
        toys.join_on(),
        vec![
            Expression::eq(Column::qualified("toys", "owner_type"), "users"),
            Expression::eq(
                Column::qualified("toys", "owner_id"),
                Column::qualified("users", "id"),
            ),
        ]
    );

    let conditions = toys.to_query_conditions(&[vec![SqlValue::Uint(1)], vec![SqlValue::Uint(2)]]);
    assert_eq!(
        conditions,
        vec![
            Expression::eq(Column::qualified("toys", "owner_type"), "users"),
            Expression::in_list(
                Column::qualified("toys", "owner_id"),
                [SqlValue::Uint(1), SqlValue::Uint(2)],
            ),
        ]
    );
}

#[test]
fn test_polymorphic_has_one_uses_owner_table() {
    let pets = schema::parse::<Pet>().unwrap();
    let toy = relation(&pets, "Toy");
    assert_eq!(toy.kind, RelationshipKind::HasOne);
    assert_eq!(toy.polymorphic.as_ref().unwrap().value, "pets");
    assert!(Arc::ptr_eq(&toy.field_schema, &schema::parse::<Toy>().unwrap()));
}

#[test]
fn test_many2many_join_table() {
    let users = schema::parse::<User>().unwrap();
    let languages = relation(&users, "Languages");
    assert_eq!(languages.kind, RelationshipKind::Many2Many);
    assert!(Arc::ptr_eq(
        &languages.field_schema,
        &schema::parse::<Language>().unwrap()
    ));

    let join = languages.join_table.as_ref().unwrap();
    assert_eq!(join.table, "user_speaks");
    assert_eq!(names(&join.fields), vec!["UserID", "LanguageCode"]);
    assert_eq!(join.db_names, vec!["user_id", "language_code"]);
    assert_eq!(names(&join.primary_fields), vec!["UserID", "LanguageCode"]);

    let references: Vec<(&str, &str, bool)> = languages
        .references
        .iter()
        .map(|r| {
            (
                r.primary_key.as_ref().map_or("", |p| p.name.as_str()),
                r.foreign_key.name.as_str(),
                r.own_primary_key,
            )
        })
        .collect();
    assert_eq!(
        references,
        vec![("ID", "UserID", true), ("Code", "LanguageCode", false)]
    );

    // The join table links back to both sides.
    let back: Vec<&str> = join.relationships().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(back, vec!["User", "Language"]);

    assert_eq!(
        languages.join_on(),
        vec![
            Expression::eq(
                Column::qualified("user_speaks", "user_id"),
                Column::qualified("users", "id"),
            ),
            Expression::eq(
                Column::qualified("user_speaks", "language_code"),
                Column::qualified("languages", "code"),
            ),
        ]
    );
    assert_eq!(
        languages.to_query_conditions(&[vec![SqlValue::Uint(7)]]),
        vec![
            Expression::eq(
                Column::qualified("user_speaks", "language_code"),
                Column::qualified("languages", "code"),
            ),
            Expression::in_list(Column::qualified("user_speaks", "user_id"), [SqlValue::Uint(7)]),
        ]
    );
}

#[test]
fn test_self_referential_many2many_renames_reference() {
    let users = schema::parse::<User>().unwrap();
    let friends = relation(&users, "Friends");
    assert_eq!(friends.kind, RelationshipKind::Many2Many);
    assert!(Arc::ptr_eq(&friends.field_schema, &users));

    let join = friends.join_table.as_ref().unwrap();
    assert_eq!(join.table, "user_friends");
    assert_eq!(names(&join.fields), vec!["UserID", "FriendID"]);
    assert_eq!(join.db_names, vec!["user_id", "friend_id"]);
}

#[test]
fn test_composite_keys_query_conditions() {
    let tenants = schema::parse::<Tenant>().unwrap();
    assert!(tenants.prioritized_primary_field.is_none());

    let members = relation(&tenants, "Members");
    assert_eq!(members.kind, RelationshipKind::HasMany);
    let foreign: Vec<&str> = members
        .references
        .iter()
        .map(|r| r.foreign_key.name.as_str())
        .collect();
    assert_eq!(foreign, vec!["TenantRegion", "TenantCode"]);

    let rows = vec![
        vec![SqlValue::Text(String::from("eu")), SqlValue::Text(String::from("a"))],
        vec![SqlValue::Text(String::from("us")), SqlValue::Text(String::from("b"))],
    ];
    let conditions = members.to_query_conditions(&rows);
    assert_eq!(conditions.len(), 1);
    assert_eq!(
        sql_of(&conditions[0]),
        "((`members`.`tenant_region` = ? AND `members`.`tenant_code` = ?) OR (`members`.`tenant_region` = ? AND `members`.`tenant_code` = ?))"
    );
}

#[test]
fn test_foreign_key_constraints() {
    let users = schema::parse::<User>().unwrap();

    let pets = relation(&users, "Pets").constraint().unwrap();
    assert_eq!(pets.name, "fk_users_pets");
    assert_eq!(pets.table, "pets");
    assert_eq!(pets.reference_table, "users");
    assert_eq!(names(&pets.foreign_keys), vec!["UserID"]);
    assert_eq!(
        sql_of(&pets.build()),
        "CONSTRAINT `fk_users_pets` FOREIGN KEY (`user_id`) REFERENCES `users`(`id`)"
    );

    let company = relation(&users, "Company").constraint().unwrap();
    assert_eq!(company.name, "fk_users_company");
    assert_eq!(company.table, "users");
    assert_eq!(company.reference_table, "companies");
    assert_eq!(names(&company.foreign_keys), vec!["CompanyID"]);

    let languages = relation(&users, "Languages").constraint().unwrap();
    assert_eq!(languages.table, "user_speaks");
    assert_eq!(languages.reference_table, "users");
    assert_eq!(names(&languages.foreign_keys), vec!["UserID"]);
}

#[test]
fn test_belongs_to_constraint_skipped_when_inverse_declares_it() {
    let users = schema::parse::<User>().unwrap();
    assert!(relation(&users, "Manager").constraint().is_none());
    assert!(relation(&users, "Team").constraint().is_some());
}

// =============================================================================
// Cache
// =============================================================================

#[test]
fn test_cache_returns_same_instance() {
    let first = schema::parse::<User>().unwrap();
    let second = schema::parse::<User>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let renamed = schema::parse_with_table_name::<User>("archived_users").unwrap();
    assert_eq!(renamed.table, "archived_users");
    assert!(!Arc::ptr_eq(&first, &renamed));
}

#[test]
fn test_private_cache_with_table_prefix() {
    let cache = SchemaCache::new(NamingStrategy::new().with_table_prefix("app_"));
    assert!(cache.is_empty());

    let companies = cache.parse::<Company>().unwrap();
    assert_eq!(companies.table, "app_companies");
    assert_eq!(cache.len(), 1);
    assert!(Arc::ptr_eq(&companies, &cache.parse::<Company>().unwrap()));
}

#[test]
fn test_concurrent_parses_share_one_schema() {
    const THREADS: usize = 8;

    let cache = SchemaCache::new(NamingStrategy::new());
    let shared = &cache;
    let parsed: Vec<(Arc<Schema>, Arc<Schema>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                scope.spawn(move || {
                    // Half the threads start from each side of the pair.
                    if i % 2 == 0 {
                        let guild = shared.parse::<Guild>().unwrap();
                        (guild, shared.parse::<Hero>().unwrap())
                    } else {
                        let hero = shared.parse::<Hero>().unwrap();
                        (shared.parse::<Guild>().unwrap(), hero)
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let (guild, hero) = &parsed[0];
    for (other_guild, other_hero) in &parsed {
        assert!(Arc::ptr_eq(guild, other_guild));
        assert!(Arc::ptr_eq(hero, other_hero));
    }
    assert_eq!(cache.len(), 2);

    let heroes = relation(guild, "Heroes");
    assert_eq!(heroes.kind, RelationshipKind::HasMany);
    assert!(Arc::ptr_eq(&heroes.field_schema, hero));
    let owner = relation(hero, "Guild");
    assert_eq!(owner.kind, RelationshipKind::BelongsTo);
    assert!(Arc::ptr_eq(&owner.field_schema, guild));
}

#[test]
fn test_concurrent_parses_of_a_model_graph() {
    let expected = {
        let cache = SchemaCache::new(NamingStrategy::new());
        cache.parse::<User>().unwrap();
        cache.len()
    };

    let cache = SchemaCache::new(NamingStrategy::new());
    let shared = &cache;
    let users: Vec<Arc<Schema>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(move || shared.parse::<User>().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(users.iter().all(|users_schema| Arc::ptr_eq(users_schema, &users[0])));
    assert_eq!(cache.len(), expected);
    assert_eq!(users[0].relationships().len(), 8);
}

#[test]
fn test_unresolvable_relationship_is_an_error() {
    let cache = SchemaCache::new(NamingStrategy::new());
    let err = cache.parse::<Orphan>().unwrap_err();
    assert!(matches!(err, Error::InvalidRelationship { .. }), "{err:?}");

    // The failed schema is not left behind.
    assert!(cache.parse::<Orphan>().is_err());
}
