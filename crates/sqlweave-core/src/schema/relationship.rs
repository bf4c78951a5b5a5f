//! Relationship resolution between schemas.
//!
//! Relationships are parsed after a schema's fields are installed in the
//! cache, so a field whose type is the schema itself, or a type that points
//! back at it, resolves to the cached instance.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::constraint::{is_constraint_name, Constraint};
use super::field::parse_field;
use super::model::{Kind, StructField};
use super::{Field, Schema, SchemaCache};
use crate::clause::{Arg, Column, Expression};
use crate::error::{Error, Result};
use crate::naming::singularize;
use crate::tag::{append_setting, remove_settings, TagSettings};
use crate::value::SqlValue;

/// How two schemas are related.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// The related record holds a key to this one; at most one.
    HasOne,
    /// The related records hold a key to this one.
    HasMany,
    /// This record holds a key to the related one.
    BelongsTo,
    /// Records are linked through a join table.
    Many2Many,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HasOne => write!(f, "has_one"),
            Self::HasMany => write!(f, "has_many"),
            Self::BelongsTo => write!(f, "belongs_to"),
            Self::Many2Many => write!(f, "many_to_many"),
        }
    }
}

/// Discriminator columns of a polymorphic relationship.
#[derive(Debug, Clone)]
pub struct Polymorphic {
    /// Field holding the owner's key.
    pub id: Arc<Field>,
    /// Field holding the owner's type.
    pub type_field: Arc<Field>,
    /// Value stored in the type field.
    pub value: String,
}

/// One column pairing of a relationship's join predicate.
#[derive(Debug, Clone)]
pub struct Reference {
    /// Referenced key; `None` when the reference is a constant.
    pub primary_key: Option<Arc<Field>>,
    /// Constant the foreign key must equal.
    pub primary_value: String,
    /// Referencing field.
    pub foreign_key: Arc<Field>,
    /// The referenced key belongs to the owning schema.
    pub own_primary_key: bool,
}

impl Reference {
    fn same_as(&self, other: &Self) -> bool {
        let same_primary = match (&self.primary_key, &other.primary_key) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_primary
            && Arc::ptr_eq(&self.foreign_key, &other.foreign_key)
            && self.primary_value == other.primary_value
    }
}

/// A relationship declared by a struct or slice field.
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Name of the declaring field.
    pub name: String,
    /// Relationship kind.
    pub kind: RelationshipKind,
    /// The declaring field.
    pub field: Arc<Field>,
    /// Name of the owning schema.
    pub owner_name: String,
    /// Table of the owning schema.
    pub owner_table: String,
    /// Schema of the related type.
    pub field_schema: Arc<Schema>,
    /// Join table of a many-to-many relationship.
    pub join_table: Option<Arc<Schema>>,
    /// Polymorphic discriminator.
    pub polymorphic: Option<Polymorphic>,
    /// Join predicate in declaration order.
    pub references: Vec<Reference>,
}

impl Relationship {
    /// Returns the predicate joining the related table (or the join table
    /// for many-to-many) to the owning table.
    #[must_use]
    pub fn join_on(&self) -> Vec<Expression> {
        let owner = self.owner_table.as_str();
        let related = self.field_schema.table.as_str();
        let target = self.join_table.as_ref().map_or(related, |join| join.table.as_str());

        self.references
            .iter()
            .map(|reference| {
                let foreign = &reference.foreign_key.db_name;
                match &reference.primary_key {
                    _ if !reference.primary_value.is_empty() => Expression::eq(
                        Column::qualified(target, foreign),
                        reference.primary_value.as_str(),
                    ),
                    Some(primary) if reference.own_primary_key => Expression::eq(
                        Column::qualified(target, foreign),
                        Column::qualified(owner, &primary.db_name),
                    ),
                    Some(primary) if self.join_table.is_some() => Expression::eq(
                        Column::qualified(target, foreign),
                        Column::qualified(related, &primary.db_name),
                    ),
                    Some(primary) => Expression::eq(
                        Column::qualified(owner, foreign),
                        Column::qualified(related, &primary.db_name),
                    ),
                    None => Expression::eq(Column::qualified(target, foreign), SqlValue::Null),
                }
            })
            .collect()
    }

    /// Fields whose values select the related rows: the owner's keys for
    /// references it owns, otherwise the owner's foreign keys.
    #[must_use]
    pub fn key_fields(&self) -> Vec<Arc<Field>> {
        self.references
            .iter()
            .filter(|r| r.primary_value.is_empty())
            .filter(|r| r.own_primary_key || self.join_table.is_none())
            .filter_map(|r| {
                if r.own_primary_key {
                    r.primary_key.clone()
                } else {
                    Some(Arc::clone(&r.foreign_key))
                }
            })
            .collect()
    }

    /// Builds the conditions loading related rows for owners whose
    /// [`Relationship::key_fields`] hold `rows`.
    #[must_use]
    pub fn to_query_conditions(&self, rows: &[Vec<SqlValue>]) -> Vec<Expression> {
        let related = self.field_schema.table.as_str();
        let target = self.join_table.as_ref().map_or(related, |join| join.table.as_str());
        let mut conditions = Vec::new();
        let mut columns = Vec::new();

        for reference in &self.references {
            if reference.own_primary_key {
                columns.push(Column::qualified(target, &reference.foreign_key.db_name));
            } else if !reference.primary_value.is_empty() {
                conditions.push(Expression::eq(
                    Column::qualified(target, &reference.foreign_key.db_name),
                    reference.primary_value.as_str(),
                ));
            } else if let Some(primary) = &reference.primary_key {
                if self.join_table.is_some() {
                    conditions.push(Expression::eq(
                        Column::qualified(target, &reference.foreign_key.db_name),
                        Column::qualified(related, &primary.db_name),
                    ));
                } else {
                    columns.push(Column::qualified(related, &primary.db_name));
                }
            }
        }

        match columns.as_slice() {
            [] => {}
            [column] => conditions.push(Expression::in_list(
                column.clone(),
                rows.iter().filter_map(|row| row.first().cloned()),
            )),
            _ => conditions.push(Expression::or(
                rows.iter()
                    .map(|row| {
                        Expression::and(
                            columns
                                .iter()
                                .zip(row)
                                .map(|(column, value)| {
                                    Expression::eq(column.clone(), Arg::Value(value.clone()))
                                })
                                .collect(),
                        )
                    })
                    .collect(),
            )),
        }

        conditions
    }

    /// Derives the foreign-key constraint backing the relationship, or
    /// `None` when `constraint:-` disables it or the inverse relationship
    /// already declares the same keys.
    #[must_use]
    pub fn constraint(&self) -> Option<Constraint> {
        let raw = self.field.tag_settings.get("CONSTRAINT").unwrap_or_default();
        if raw == "-" {
            return None;
        }

        if self.kind == RelationshipKind::BelongsTo && self.duplicates_inverse() {
            return None;
        }

        let settings = TagSettings::parse(raw, ',');
        let name = match raw.split_once(',') {
            Some((name, _)) if is_constraint_name(name) => String::from(name),
            _ => self
                .field_schema
                .naming()
                .foreign_key_name(&self.owner_table, &self.name),
        };

        let mut constraint = Constraint {
            name,
            field: Arc::clone(&self.field),
            table: self.owner_table.clone(),
            foreign_keys: Vec::new(),
            reference_table: self.field_schema.table.clone(),
            references: Vec::new(),
            on_delete: settings.get("ONDELETE").map(String::from).unwrap_or_default(),
            on_update: settings.get("ONUPDATE").map(String::from).unwrap_or_default(),
        };

        for reference in &self.references {
            let Some(primary) = &reference.primary_key else {
                continue;
            };
            if self.join_table.is_some() && !reference.own_primary_key {
                continue;
            }
            constraint.foreign_keys.push(Arc::clone(&reference.foreign_key));
            constraint.references.push(Arc::clone(primary));
            if reference.own_primary_key {
                constraint.table = self.join_table.as_ref().map_or_else(
                    || self.field_schema.table.clone(),
                    |join| join.table.clone(),
                );
                constraint.reference_table = self.owner_table.clone();
            } else {
                constraint.table = self.owner_table.clone();
                constraint.reference_table = self.field_schema.table.clone();
            }
        }

        Some(constraint)
    }

    fn duplicates_inverse(&self) -> bool {
        let Some(Ok(inverse)) = self.field_schema.relationships.get() else {
            return false;
        };
        inverse.iter().any(|other| {
            !std::ptr::eq(other, self)
                && other.field_schema.name == self.owner_name
                && other.field_schema.table == self.owner_table
                && other.references.len() == self.references.len()
                && other
                    .references
                    .iter()
                    .zip(&self.references)
                    .all(|(a, b)| a.same_as(b))
        })
    }
}

/// Relationships of a schema in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    relations: Vec<Relationship>,
}

impl Relationships {
    pub(crate) const fn new(relations: Vec<Relationship>) -> Self {
        Self { relations }
    }

    /// Returns the relationship declared by the named field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Relationship> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Iterates over every relationship.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relations.iter()
    }

    /// Iterates over the relationships of one kind.
    pub fn of_kind(&self, kind: RelationshipKind) -> impl Iterator<Item = &Relationship> {
        self.relations.iter().filter(move |r| r.kind == kind)
    }

    /// Has-one relationships.
    pub fn has_one(&self) -> impl Iterator<Item = &Relationship> {
        self.of_kind(RelationshipKind::HasOne)
    }

    /// Has-many relationships.
    pub fn has_many(&self) -> impl Iterator<Item = &Relationship> {
        self.of_kind(RelationshipKind::HasMany)
    }

    /// Belongs-to relationships.
    pub fn belongs_to(&self) -> impl Iterator<Item = &Relationship> {
        self.of_kind(RelationshipKind::BelongsTo)
    }

    /// Many-to-many relationships.
    pub fn many2many(&self) -> impl Iterator<Item = &Relationship> {
        self.of_kind(RelationshipKind::Many2Many)
    }

    /// Number of relationships.
    #[must_use]
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Returns true when the schema declares no relationship.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuessLevel {
    Guess,
    Belongs,
    EmbeddedBelongs,
    Has,
    EmbeddedHas,
}

impl GuessLevel {
    const fn next(self) -> Option<Self> {
        match self {
            Self::Guess => Some(Self::Belongs),
            Self::Belongs => Some(Self::EmbeddedBelongs),
            Self::EmbeddedBelongs => Some(Self::Has),
            Self::Has => Some(Self::EmbeddedHas),
            Self::EmbeddedHas => None,
        }
    }
}

struct Draft {
    foreign_keys: Vec<String>,
    primary_keys: Vec<String>,
    field_schema: Arc<Schema>,
}

/// Parses the relationships of every relationship candidate of `schema`.
pub(crate) fn parse_relationships(
    schema: &Arc<Schema>,
    cache: &SchemaCache,
) -> Result<Relationships> {
    let mut relations = Vec::new();
    for field in schema.relationship_candidates() {
        let relation = parse_relationship(schema, cache, field)?;
        trace!(
            schema = %schema.name,
            relation = %relation.name,
            kind = %relation.kind,
            related = %relation.field_schema.name,
            "parsed relationship"
        );
        relations.push(relation);
    }
    Ok(Relationships::new(relations))
}

fn parse_relationship(
    schema: &Arc<Schema>,
    cache: &SchemaCache,
    field: &Arc<Field>,
) -> Result<Relationship> {
    let Some(model) = field.kind.model() else {
        return Err(Error::UnsupportedDataType {
            model: schema.name.clone(),
            field: field.name.clone(),
            kind: field.kind.to_string(),
        });
    };
    let field_schema = cache.get_or_parse(model, None)?;

    let draft = Draft {
        foreign_keys: to_columns(field.tag_settings.get("FOREIGNKEY")),
        primary_keys: to_columns(field.tag_settings.get("REFERENCES")),
        field_schema,
    };

    let settings = &field.tag_settings;
    let polymorphic_tag = settings.value("POLYMORPHIC");
    let (kind, references, polymorphic, join_table) = if let Some(polymorphic) = polymorphic_tag {
        let (references, polymorphic) = build_polymorphic(schema, field, &draft, polymorphic)?;
        (has_kind(field), references, Some(polymorphic), None)
    } else if let Some(many2many) = settings.value("MANY2MANY") {
        let (references, join_table) = build_many2many(schema, field, &draft, many2many)?;
        (RelationshipKind::Many2Many, references, None, Some(join_table))
    } else {
        let start = if settings.value("BELONGSTO").is_some() {
            GuessLevel::Belongs
        } else {
            match field.kind.indirect() {
                Kind::Struct(_) => GuessLevel::Guess,
                Kind::Slice(_) | Kind::Array(..) => GuessLevel::Has,
                other => {
                    return Err(Error::UnsupportedDataType {
                        model: schema.name.clone(),
                        field: field.name.clone(),
                        kind: other.to_string(),
                    })
                }
            }
        };
        let (references, has) = guess(schema, field, &draft, start)?;
        let kind = if has { has_kind(field) } else { RelationshipKind::BelongsTo };
        (kind, references, None, None)
    };

    Ok(Relationship {
        name: field.name.clone(),
        kind,
        field: Arc::clone(field),
        owner_name: schema.name.clone(),
        owner_table: schema.table.clone(),
        field_schema: draft.field_schema,
        join_table,
        polymorphic,
        references,
    })
}

fn has_kind(field: &Field) -> RelationshipKind {
    if field.kind.is_sequence() {
        RelationshipKind::HasMany
    } else {
        RelationshipKind::HasOne
    }
}

fn to_columns(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn build_polymorphic(
    schema: &Schema,
    field: &Field,
    draft: &Draft,
    polymorphic: &str,
) -> Result<(Vec<Reference>, Polymorphic)> {
    let related = &draft.field_schema;
    let missing = |suffix: &str| {
        Error::relationship(
            &schema.name,
            &field.name,
            format!(
                "invalid polymorphic type {} for {}, missing field {polymorphic}{suffix}",
                related.name, schema.name
            ),
        )
    };

    let type_field = related
        .field_by_name(&format!("{polymorphic}Type"))
        .cloned()
        .ok_or_else(|| missing("Type"))?;
    let id = related
        .field_by_name(&format!("{polymorphic}ID"))
        .cloned()
        .ok_or_else(|| missing("ID"))?;

    let value = field
        .tag_settings
        .get("POLYMORPHICVALUE")
        .map_or_else(|| schema.table.clone(), |v| v.trim().to_string());

    let primary = match draft.foreign_keys.as_slice() {
        [] => schema.prioritized_primary_field.clone(),
        [only] => schema.lookup_field(only).cloned(),
        _ => None,
    }
    .ok_or_else(|| {
        Error::relationship(
            &schema.name,
            &field.name,
            format!("invalid polymorphic foreign keys {:?}", draft.foreign_keys),
        )
    })?;

    let references = vec![
        Reference {
            primary_key: None,
            primary_value: value.clone(),
            foreign_key: Arc::clone(&type_field),
            own_primary_key: false,
        },
        Reference {
            primary_key: Some(primary),
            primary_value: String::new(),
            foreign_key: Arc::clone(&id),
            own_primary_key: true,
        },
    ];

    Ok((references, Polymorphic { id, type_field, value }))
}

const JOIN_FIELD_DROPPED_SETTINGS: [&str; 5] =
    ["column", "autoincrement", "index", "unique", "uniqueindex"];

fn build_many2many(
    schema: &Arc<Schema>,
    field: &Arc<Field>,
    draft: &Draft,
    many2many: &str,
) -> Result<(Vec<Reference>, Arc<Schema>)> {
    let related = &draft.field_schema;
    let invalid_key = |key: &str| {
        Error::relationship(&schema.name, &field.name, format!("invalid foreign key: {key}"))
    };

    let own_fields: Vec<Arc<Field>> = if draft.foreign_keys.is_empty() {
        schema.primary_fields.clone()
    } else {
        draft
            .foreign_keys
            .iter()
            .map(|key| schema.lookup_field(key).cloned().ok_or_else(|| invalid_key(key)))
            .collect::<Result<_>>()?
    };
    let ref_fields: Vec<Arc<Field>> = if draft.primary_keys.is_empty() {
        related.primary_fields.clone()
    } else {
        draft
            .primary_keys
            .iter()
            .map(|key| related.lookup_field(key).cloned().ok_or_else(|| invalid_key(key)))
            .collect::<Result<_>>()?
    };

    let join_foreign_keys = to_columns(field.tag_settings.get("JOINFOREIGNKEY"));
    let join_references = to_columns(field.tag_settings.get("JOINREFERENCES"));

    let mut own_by_name: Vec<(String, Arc<Field>)> = Vec::new();
    let mut ref_by_name: Vec<(String, Arc<Field>)> = Vec::new();
    let mut sources: Vec<(String, Arc<Field>)> = Vec::new();

    for (idx, own) in own_fields.iter().enumerate() {
        let name = join_foreign_keys.get(idx).map_or_else(
            || format!("{}{}", upper_first(&schema.name), own.name),
            |key| upper_first(key),
        );
        own_by_name.push((name.clone(), Arc::clone(own)));
        sources.push((name, Arc::clone(own)));
    }

    for (idx, referenced) in ref_fields.iter().enumerate() {
        let mut name = format!("{}{}", upper_first(&related.name), referenced.name);
        if own_by_name.iter().any(|(n, _)| *n == name) {
            if field.name == related.name {
                name.push_str("Reference");
            } else {
                name = format!("{}{}", singularize(&field.name), referenced.name);
            }
        }
        if let Some(key) = join_references.get(idx) {
            name = upper_first(key);
        }

        ref_by_name.push((name.clone(), Arc::clone(referenced)));
        if !sources.iter().any(|(n, _)| *n == name) {
            sources.push((name, Arc::clone(referenced)));
        }
    }

    let table = related.naming().join_table_name(many2many);
    let mut join_fields = Vec::with_capacity(sources.len());
    for (name, source) in &sources {
        let tag = remove_settings(
            &append_setting(&source.tag, "primaryKey"),
            &JOIN_FIELD_DROPPED_SETTINGS,
        );
        let declared = StructField::new(name, source.kind.clone(), &tag);
        let mut join_field = parse_field(many2many, &table, related.naming(), &declared)?.field;
        if copyable_data_type(source.data_type.as_ref()) {
            join_field.data_type.clone_from(&source.data_type);
        }
        join_field.semantic_type.clone_from(&source.semantic_type);
        if join_field.size == 0 {
            join_field.size = source.size;
        }
        join_fields.push(join_field);
    }

    let join_table = Arc::new(Schema::assemble(
        String::from(many2many),
        table,
        join_fields,
        related.naming(),
    )?);

    let owner_name = schema.name.clone();
    let related_name = if related.name == owner_name {
        field.name.clone()
    } else {
        related.name.clone()
    };

    let mut references = Vec::new();
    let mut owner_link = Vec::new();
    let mut related_link = Vec::new();
    for join_field in join_table.fields.iter().filter(|f| f.has_permission()) {
        if let Some((_, own)) = own_by_name.iter().find(|(n, _)| *n == join_field.name) {
            owner_link.push(Reference {
                primary_key: Some(Arc::clone(own)),
                primary_value: String::new(),
                foreign_key: Arc::clone(join_field),
                own_primary_key: false,
            });
            references.push(Reference {
                primary_key: Some(Arc::clone(own)),
                primary_value: String::new(),
                foreign_key: Arc::clone(join_field),
                own_primary_key: true,
            });
        }
        if let Some((_, referenced)) = ref_by_name.iter().find(|(n, _)| *n == join_field.name) {
            let reference = Reference {
                primary_key: Some(Arc::clone(referenced)),
                primary_value: String::new(),
                foreign_key: Arc::clone(join_field),
                own_primary_key: false,
            };
            related_link.push(reference.clone());
            references.push(reference);
        }
    }

    let link = |name: String, target: &Arc<Schema>, references: Vec<Reference>| Relationship {
        name,
        kind: RelationshipKind::BelongsTo,
        field: Arc::clone(field),
        owner_name: join_table.name.clone(),
        owner_table: join_table.table.clone(),
        field_schema: Arc::clone(target),
        join_table: None,
        polymorphic: None,
        references,
    };
    let join_relations = Relationships::new(vec![
        link(owner_name, schema, owner_link),
        link(related_name, related, related_link),
    ]);
    // Freshly built and never shared, so the cell is empty.
    let _ = join_table.relationships.set(Ok(join_relations));

    Ok((references, join_table))
}

fn copyable_data_type(data_type: Option<&super::DataType>) -> bool {
    let Some(data_type) = data_type else {
        return false;
    };
    let lower = data_type.to_string().to_lowercase();
    !lower.contains("auto_increment") && !lower.contains("primary key")
}

fn guess(
    schema: &Arc<Schema>,
    field: &Field,
    draft: &Draft,
    start: GuessLevel,
) -> Result<(Vec<Reference>, bool)> {
    let mut level = start;
    loop {
        if let Some(found) = try_guess(schema, field, draft, level) {
            return Ok(found);
        }
        level = level.next().ok_or_else(|| {
            Error::relationship(
                &schema.name,
                &field.name,
                format!(
                    "invalid field found for struct {}'s field {}: \
                     define a valid foreign key for relations",
                    schema.name, field.name
                ),
            )
        })?;
    }
}

fn try_guess(
    schema: &Arc<Schema>,
    field: &Field,
    draft: &Draft,
    level: GuessLevel,
) -> Option<(Vec<Reference>, bool)> {
    let related = &draft.field_schema;
    let level = match level {
        GuessLevel::Guess if Arc::ptr_eq(schema, related) => GuessLevel::Belongs,
        GuessLevel::Guess => GuessLevel::Has,
        other => other,
    };

    let (primary_schema, foreign_schema) = match level {
        GuessLevel::Belongs => (related, schema),
        GuessLevel::EmbeddedBelongs => (related, field.owner_schema.as_ref()?),
        GuessLevel::EmbeddedHas => (field.owner_schema.as_ref()?, related),
        GuessLevel::Guess | GuessLevel::Has => (schema, related),
    };

    let mut primary_fields: Vec<Arc<Field>> = Vec::new();
    let mut foreign_fields: Vec<Arc<Field>> = Vec::new();

    if draft.foreign_keys.is_empty() {
        let primary_name = if primary_schema.name.is_empty() {
            &related.name
        } else {
            &primary_schema.name
        };
        let candidates: Vec<Arc<Field>> = if draft.primary_keys.is_empty() {
            primary_schema.primary_fields.clone()
        } else {
            draft
                .primary_keys
                .iter()
                .filter_map(|key| primary_schema.lookup_field(key).cloned())
                .collect()
        };

        for candidate in &candidates {
            let stem = if level == GuessLevel::Belongs {
                field.name.as_str()
            } else {
                primary_name.as_str()
            };
            let mut names = vec![format!("{stem}{}", candidate.name)];
            if candidates.len() == 1 {
                names.push(format!("{stem}ID"));
                names.push(format!("{stem}Id"));
                names.push(
                    foreign_schema
                        .naming()
                        .column_name(&foreign_schema.table, &format!("{stem}ID")),
                );
            }
            if let Some(found) = names.iter().find_map(|name| foreign_schema.lookup_field(name)) {
                foreign_fields.push(Arc::clone(found));
                primary_fields.push(Arc::clone(candidate));
            }
        }
    } else {
        for key in &draft.foreign_keys {
            foreign_fields.push(Arc::clone(foreign_schema.lookup_field(key)?));
        }
    }

    if foreign_fields.is_empty() {
        return None;
    }

    if !draft.primary_keys.is_empty() {
        for (idx, key) in draft.primary_keys.iter().enumerate() {
            let found = primary_schema.lookup_field(key)?;
            match primary_fields.get(idx) {
                None => primary_fields.push(Arc::clone(found)),
                Some(existing) if Arc::ptr_eq(existing, found) => {}
                Some(_) => return None,
            }
        }
    } else if primary_fields.is_empty() {
        match (&primary_schema.prioritized_primary_field, foreign_fields.len()) {
            (Some(prioritized), 1) => primary_fields.push(Arc::clone(prioritized)),
            _ if primary_schema.primary_fields.len() == foreign_fields.len() => {
                primary_fields.extend(primary_schema.primary_fields.iter().cloned());
            }
            _ => return None,
        }
    }

    if primary_fields.len() < foreign_fields.len() {
        return None;
    }

    let has = matches!(level, GuessLevel::Has | GuessLevel::EmbeddedHas);
    let own_primary_key = (Arc::ptr_eq(schema, primary_schema) && level == GuessLevel::Has)
        || (level == GuessLevel::EmbeddedHas
            && field
                .owner_schema
                .as_ref()
                .is_some_and(|owner| Arc::ptr_eq(owner, primary_schema)));

    let references = foreign_fields
        .into_iter()
        .zip(primary_fields)
        .map(|(foreign_key, primary_key)| Reference {
            primary_key: Some(primary_key),
            primary_value: String::new(),
            foreign_key,
            own_primary_key,
        })
        .collect();

    Some((references, has))
}
