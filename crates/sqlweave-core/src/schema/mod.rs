//! Schema reflection.
//!
//! A [`Schema`] is the normalized description of a record type: its table,
//! columns, primary keys, indexes, constraints and relationships. Schemas
//! are parsed from the [`ModelType`] a `#[derive(Model)]` produces and are
//! cached per type in a [`SchemaCache`], so parsing the same type twice
//! returns the same `Arc`.
//!
//! ```ignore
//! use sqlweave_core::schema;
//!
//! let users = schema::parse::<User>()?;
//! assert_eq!(users.table, "users");
//! let pets = users.relationships().get("Pets").unwrap();
//! ```
//!
//! Parsing happens in two phases. Fields, keys, indexes and constraints are
//! parsed first and the schema is installed in the cache; relationships are
//! parsed afterwards and may resolve back to the installed schema. Schemas
//! related to each other hold `Arc`s to one another and therefore live as
//! long as the process.

mod constraint;
mod field;
mod index;
pub mod model;
mod relationship;
pub mod serializer;

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};
use tracing::{debug, trace};

pub use constraint::{CheckConstraint, Constraint, UniqueConstraint};
pub use field::{DataType, Field, TimeKind};
pub use index::{Index, IndexOption};
pub use model::{Kind, Model, ModelRef, ModelType, Reflect, StructField};
pub use relationship::{Polymorphic, Reference, Relationship, RelationshipKind, Relationships};

use crate::error::{Error, Result};
use crate::naming::NamingStrategy;
use crate::tag::TagSettings;
use field::{adopt_embedded, parse_field};

static NO_RELATIONSHIPS: Relationships = Relationships::new(Vec::new());

/// The parsed description of a record type.
pub struct Schema {
    /// Type name.
    pub name: String,
    /// Table name.
    pub table: String,
    /// Fields in declaration order, embedded fields flattened in place.
    pub fields: Vec<Arc<Field>>,
    /// Column names in declaration order.
    pub db_names: Vec<String>,
    /// Primary key fields.
    pub primary_fields: Vec<Arc<Field>>,
    /// The primary key field statements resolve `PrimaryKey` to.
    pub prioritized_primary_field: Option<Arc<Field>>,
    /// Fields whose value is supplied by the database.
    pub fields_with_default_db_value: Vec<Arc<Field>>,
    /// Indexes declared by field tags.
    pub indexes: Vec<Index>,
    /// Check constraints declared by field tags.
    pub checks: Vec<CheckConstraint>,
    /// Unique constraints declared by field tags.
    pub uniques: Vec<UniqueConstraint>,
    fields_by_name: HashMap<String, Arc<Field>>,
    fields_by_db_name: HashMap<String, Arc<Field>>,
    fields_by_bind_name: HashMap<String, Arc<Field>>,
    relationship_fields: Vec<Arc<Field>>,
    naming: NamingStrategy,
    pub(crate) relationships: OnceCell<Result<Relationships>>,
}

impl Schema {
    /// Looks a field up by column name, then by field name.
    #[must_use]
    pub fn lookup_field(&self, name: &str) -> Option<&Arc<Field>> {
        self.fields_by_db_name
            .get(name)
            .or_else(|| self.fields_by_name.get(name))
    }

    /// Looks a field up by name, trying the longest bind path prefix
    /// first: `["Author", "Profile"]` and `Name` tries `Author.Profile.Name`,
    /// then `Author.Name`, then `Name`.
    #[must_use]
    pub fn lookup_field_by_bind_name(
        &self,
        bind_names: &[&str],
        name: &str,
    ) -> Option<&Arc<Field>> {
        (0..=bind_names.len()).rev().find_map(|len| {
            let mut path: Vec<&str> = bind_names[..len].to_vec();
            path.push(name);
            self.fields_by_bind_name.get(&path.join("."))
        })
    }

    /// Looks a field up by field name only.
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&Arc<Field>> {
        self.fields_by_name.get(name)
    }

    /// Looks a field up by column name only.
    #[must_use]
    pub fn field_by_db_name(&self, db_name: &str) -> Option<&Arc<Field>> {
        self.fields_by_db_name.get(db_name)
    }

    /// Returns the parsed relationships; empty while they are still being
    /// resolved.
    #[must_use]
    pub fn relationships(&self) -> &Relationships {
        match self.relationships.get() {
            Some(Ok(relationships)) => relationships,
            _ => &NO_RELATIONSHIPS,
        }
    }

    /// Returns the index with the given name, or the first index covering
    /// the named field.
    #[must_use]
    pub fn lookup_index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|idx| {
            idx.name == name || idx.fields.iter().any(|option| option.field.name == name)
        })
    }

    /// Naming strategy the schema was parsed with.
    #[must_use]
    pub const fn naming(&self) -> &NamingStrategy {
        &self.naming
    }

    pub(crate) fn relationship_candidates(&self) -> impl Iterator<Item = &Arc<Field>> {
        self.relationship_fields.iter()
    }

    fn parse_model(
        model: &ModelType,
        naming: &NamingStrategy,
        table: Option<&str>,
    ) -> Result<Self> {
        let table = table
            .map(String::from)
            .or_else(|| model.table_name.clone())
            .or_else(|| {
                TagSettings::parse(&model.tag, ';')
                    .value("TABLENAME")
                    .map(String::from)
            })
            .unwrap_or_else(|| naming.table_name(&model.name));
        Self::from_model_type(model, naming, table)
    }

    /// Parses a type embedded into a schema stored in `table`. Embedded
    /// schemas are not cached and carry no relationships.
    pub(crate) fn parse_embedded(
        model: &ModelType,
        naming: &NamingStrategy,
        table: &str,
    ) -> Result<Self> {
        let schema = Self::from_model_type(model, naming, String::from(table))?;
        let _ = schema.relationships.set(Ok(Relationships::default()));
        Ok(schema)
    }

    fn from_model_type(model: &ModelType, naming: &NamingStrategy, table: String) -> Result<Self> {
        if model.name.is_empty() {
            return Err(Error::UnsupportedModel(String::from("anonymous type")));
        }

        let mut fields = Vec::with_capacity(model.fields.len());
        for declared in &model.fields {
            let parsed = parse_field(&model.name, &table, naming, declared)?;
            match parsed.embedded {
                Some(embedded) => {
                    let owner = Arc::new(embedded);
                    fields.extend(
                        owner
                            .fields
                            .iter()
                            .map(|inner| adopt_embedded(&parsed.field, &owner, inner)),
                    );
                }
                None => fields.push(parsed.field),
            }
        }

        Self::assemble(model.name.clone(), table, fields, naming)
    }

    /// Builds the lookup tables, elects primary keys and collects indexes
    /// and constraints.
    pub(crate) fn assemble(
        name: String,
        table: String,
        mut fields: Vec<Field>,
        naming: &NamingStrategy,
    ) -> Result<Self> {
        for field in &mut fields {
            if field.db_name.is_empty() && field.data_type.is_some() {
                field.db_name = naming.column_name(&table, &field.name);
            }
        }

        let mut db_names: Vec<String> = Vec::new();
        let mut by_db_name: HashMap<String, usize> = HashMap::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut by_bind_name: HashMap<String, usize> = HashMap::new();
        let mut primary: Vec<usize> = Vec::new();

        for (idx, field) in fields.iter().enumerate() {
            if !field.db_name.is_empty() {
                match by_db_name.get(&field.db_name).copied() {
                    None => {
                        db_names.push(field.db_name.clone());
                        by_db_name.insert(field.db_name.clone(), idx);
                        if field.primary_key {
                            primary.push(idx);
                        }
                    }
                    Some(existing)
                        if field.has_permission()
                            && field.bind_names.len() < fields[existing].bind_names.len() =>
                    {
                        primary.retain(|&p| p != existing);
                        by_db_name.insert(field.db_name.clone(), idx);
                        if field.primary_key {
                            primary.push(idx);
                        }
                    }
                    Some(_) => {}
                }
            }

            let replaceable = |slot: Option<&usize>| {
                slot.map_or(true, |&existing| fields[existing].tag_settings.get("-") == Some("-"))
            };
            if replaceable(by_name.get(&field.name)) {
                by_name.insert(field.name.clone(), idx);
            }
            let bind_name = field.bind_names.join(".");
            if replaceable(by_bind_name.get(&bind_name)) {
                by_bind_name.insert(bind_name, idx);
            }
        }

        let lookup = |name: &str| by_db_name.get(name).or_else(|| by_name.get(name)).copied();
        let mut prioritized = None;
        if let Some(id) = lookup("id").or_else(|| lookup("ID")) {
            if fields[id].primary_key {
                prioritized = Some(id);
            } else if primary.is_empty() {
                fields[id].primary_key = true;
                primary.push(id);
                prioritized = Some(id);
            }
        }
        if prioritized.is_none() {
            prioritized = match primary.as_slice() {
                [only] => Some(*only),
                _ => primary.iter().copied().find(|&idx| fields[idx].auto_increment),
            };
        }

        if let Some(idx) = prioritized {
            let field = &mut fields[idx];
            let integer = field.semantic_type.as_ref().is_some_and(DataType::is_integer);
            if integer && !field.tag_settings.contains("AUTOINCREMENT") {
                field.has_default_value = true;
                field.auto_increment = true;
            }
        }

        let fields: Vec<Arc<Field>> = fields.into_iter().map(Arc::new).collect();
        let pick = |idx: &usize| Arc::clone(&fields[*idx]);

        let primary_fields: Vec<Arc<Field>> = primary.iter().map(pick).collect();
        let mut fields_with_default_db_value: Vec<Arc<Field>> = primary_fields
            .iter()
            .filter(|f| f.has_default_value && f.default_sql_value.is_none())
            .cloned()
            .collect();
        fields_with_default_db_value.extend(
            fields
                .iter()
                .filter(|f| !f.primary_key && f.data_type.is_some())
                .filter(|f| f.has_default_value && f.default_sql_value.is_none())
                .filter(|f| by_db_name.contains_key(&f.db_name))
                .cloned(),
        );

        let relationship_fields = fields
            .iter()
            .filter(|f| f.is_relationship_candidate())
            .cloned()
            .collect();

        let indexes = index::parse_indexes(&name, &table, naming, &fields)?;
        let by_db_order: Vec<Arc<Field>> = db_names
            .iter()
            .filter_map(|db_name| by_db_name.get(db_name).map(pick))
            .collect();
        let checks = constraint::parse_checks(&table, naming, &by_db_order);
        let uniques = constraint::parse_uniques(&table, naming, &fields, &indexes);

        Ok(Self {
            name,
            table,
            db_names,
            prioritized_primary_field: prioritized.as_ref().map(pick),
            primary_fields,
            fields_with_default_db_value,
            indexes,
            checks,
            uniques,
            fields_by_name: by_name.iter().map(|(k, v)| (k.clone(), pick(v))).collect(),
            fields_by_db_name: by_db_name.iter().map(|(k, v)| (k.clone(), pick(v))).collect(),
            fields_by_bind_name: by_bind_name.iter().map(|(k, v)| (k.clone(), pick(v))).collect(),
            relationship_fields,
            naming: naming.clone(),
            relationships: OnceCell::new(),
            fields,
        })
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("db_names", &self.db_names)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    type_id: TypeId,
    table: Option<String>,
}

/// Process-wide store of parsed schemas, one per type and table override.
#[derive(Debug, Default)]
pub struct SchemaCache {
    naming: NamingStrategy,
    entries: DashMap<CacheKey, Arc<Schema>>,
}

static GLOBAL: Lazy<SchemaCache> = Lazy::new(SchemaCache::default);

impl SchemaCache {
    /// Creates an empty cache parsing with `naming`.
    #[must_use]
    pub fn new(naming: NamingStrategy) -> Self {
        Self {
            naming,
            entries: DashMap::new(),
        }
    }

    /// The shared cache using the default naming strategy.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Naming strategy applied to every schema parsed by this cache.
    #[must_use]
    pub const fn naming(&self) -> &NamingStrategy {
        &self.naming
    }

    /// Parses `T`, or returns the cached schema.
    ///
    /// # Errors
    ///
    /// Returns the first tag, field or relationship error found in `T`.
    pub fn parse<T: Model>(&self) -> Result<Arc<Schema>> {
        self.parse_ref(&ModelRef::of::<T>(), None)
    }

    /// Parses `T` stored under an explicit table name. Each table name is
    /// cached separately.
    ///
    /// # Errors
    ///
    /// Returns the first tag, field or relationship error found in `T`.
    pub fn parse_with_table_name<T: Model>(&self, table: &str) -> Result<Arc<Schema>> {
        self.parse_ref(&ModelRef::of::<T>(), Some(table))
    }

    /// Parses the record type behind pointer, slice and array wrappers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedModel`] when `kind` is not a record type.
    pub fn parse_kind(&self, kind: &Kind) -> Result<Arc<Schema>> {
        let model = kind
            .model()
            .ok_or_else(|| Error::UnsupportedModel(kind.to_string()))?;
        self.parse_ref(model, None)
    }

    /// Parses the type behind `model`.
    ///
    /// # Errors
    ///
    /// Returns the first tag, field or relationship error found.
    pub fn parse_ref(&self, model: &ModelRef, table: Option<&str>) -> Result<Arc<Schema>> {
        let schema = self.get_or_parse(model, table)?;
        match schema.relationships.wait() {
            Ok(_) => Ok(schema),
            Err(err) => Err(err.clone()),
        }
    }

    /// Number of cached schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been parsed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached schema or parses and installs it. Does not wait
    /// for relationships being resolved by another caller, so a type
    /// reachable from its own relationships resolves to the installed
    /// instance.
    pub(crate) fn get_or_parse(
        &self,
        model: &ModelRef,
        table: Option<&str>,
    ) -> Result<Arc<Schema>> {
        let key = CacheKey {
            type_id: model.id,
            table: table.map(String::from),
        };

        if let Some(cached) = self.entries.get(&key).map(|entry| Arc::clone(entry.value())) {
            trace!(model = model.name, "schema cache hit");
            return Ok(cached);
        }
        trace!(model = model.name, "schema cache miss");

        let parsed = Arc::new(Schema::parse_model(&model.describe(), &self.naming, table)?);
        let installed = Arc::clone(
            self.entries
                .entry(key.clone())
                .or_insert_with(|| Arc::clone(&parsed))
                .value(),
        );
        if !Arc::ptr_eq(&installed, &parsed) {
            return Ok(installed);
        }

        let outcome = installed
            .relationships
            .get_or_init(|| relationship::parse_relationships(&installed, self));
        match outcome {
            Ok(relationships) => {
                debug!(
                    model = %installed.name,
                    table = %installed.table,
                    fields = installed.fields.len(),
                    relationships = relationships.len(),
                    "parsed schema"
                );
                Ok(installed)
            }
            Err(err) => {
                let err = err.clone();
                self.entries.remove_if(&key, |_, cached| Arc::ptr_eq(cached, &installed));
                Err(err)
            }
        }
    }
}

/// Parses `T` with the global cache.
///
/// # Errors
///
/// Returns the first tag, field or relationship error found in `T`.
pub fn parse<T: Model>() -> Result<Arc<Schema>> {
    SchemaCache::global().parse::<T>()
}

/// Parses `T` stored under `table` with the global cache.
///
/// # Errors
///
/// Returns the first tag, field or relationship error found in `T`.
pub fn parse_with_table_name<T: Model>(table: &str) -> Result<Arc<Schema>> {
    SchemaCache::global().parse_with_table_name::<T>(table)
}
