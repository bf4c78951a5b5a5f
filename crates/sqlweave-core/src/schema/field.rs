//! Field-level tag interpretation.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use super::model::{Kind, StructField};
use super::serializer::{self, Serializer};
use super::Schema;
use crate::error::{Error, Result};
use crate::naming::NamingStrategy;
use crate::tag::{check_truth, TagSettings};
use crate::value::SqlValue;

/// Semantic data type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Unsigned integer.
    Uint,
    /// Floating point.
    Float,
    /// Text.
    String,
    /// Date or timestamp.
    Time,
    /// Variable-length binary.
    Bytes,
    /// Fixed-length binary.
    BytesArray,
    /// A database type named by a `type` tag.
    Custom(String),
}

impl DataType {
    /// Maps a `type` tag value to a data type. Unknown names are kept as
    /// written.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "bool" => Self::Bool,
            "int" => Self::Int,
            "uint" => Self::Uint,
            "float" => Self::Float,
            "string" => Self::String,
            "time" => Self::Time,
            "bytes" => Self::Bytes,
            "bytesarray" => Self::BytesArray,
            _ => Self::Custom(String::from(name)),
        }
    }

    fn of_kind(kind: &Kind) -> Option<Self> {
        match kind {
            Kind::Bool => Some(Self::Bool),
            Kind::Int(_) => Some(Self::Int),
            Kind::Uint(_) => Some(Self::Uint),
            Kind::Float(_) => Some(Self::Float),
            Kind::String => Some(Self::String),
            Kind::Time => Some(Self::Time),
            Kind::Slice(inner) if *inner.indirect() == Kind::Uint(8) => Some(Self::Bytes),
            Kind::Array(inner, _) if *inner.indirect() == Kind::Uint(8) => Some(Self::BytesArray),
            _ => None,
        }
    }

    /// Returns true for signed and unsigned integers.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int | Self::Uint)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Uint => write!(f, "uint"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::Time => write!(f, "time"),
            Self::Bytes => write!(f, "bytes"),
            Self::BytesArray => write!(f, "bytesarray"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// How an automatic timestamp is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    /// A native time column.
    Time,
    /// Unix seconds.
    Seconds,
    /// Unix milliseconds.
    Milli,
    /// Unix nanoseconds.
    Nano,
}

impl TimeKind {
    fn from_tag(value: &str, data_type: Option<&DataType>) -> Self {
        if data_type == Some(&DataType::Time) {
            return Self::Time;
        }
        match value.to_uppercase().as_str() {
            "NANO" => Self::Nano,
            "MILLI" => Self::Milli,
            _ => Self::Seconds,
        }
    }
}

/// A parsed field of a [`Schema`].
#[derive(Debug, Clone)]
pub struct Field {
    /// Field name as declared.
    pub name: String,
    /// Column name; empty for fields without storage.
    pub db_name: String,
    /// Path of field names from the record root, longer for embedded fields.
    pub bind_names: Vec<String>,
    /// Column data type, cleared for ignored fields.
    pub data_type: Option<DataType>,
    /// Data type derived from the Rust type, before any `type` override.
    pub semantic_type: Option<DataType>,
    /// Structural kind of the field type.
    pub kind: Kind,
    /// Part of the primary key.
    pub primary_key: bool,
    /// Auto-incremented by the database.
    pub auto_increment: bool,
    /// Increment step for auto-increment columns.
    pub auto_increment_increment: i64,
    /// Written on insert.
    pub creatable: bool,
    /// Written on update.
    pub updatable: bool,
    /// Read back on select.
    pub readable: bool,
    /// Filled automatically on create.
    pub auto_create_time: Option<TimeKind>,
    /// Filled automatically on update.
    pub auto_update_time: Option<TimeKind>,
    /// The database supplies a value when none is given.
    pub has_default_value: bool,
    /// Raw `default` tag value.
    pub default_value: String,
    /// `default` parsed for the field's data type.
    pub default_sql_value: Option<SqlValue>,
    /// `NOT NULL` column.
    pub not_null: bool,
    /// `UNIQUE` column.
    pub unique: bool,
    /// Column comment.
    pub comment: String,
    /// Column size; bit width for numbers.
    pub size: usize,
    /// Numeric or time precision.
    pub precision: u32,
    /// Numeric scale.
    pub scale: u32,
    /// Excluded from migrations.
    pub ignore_migration: bool,
    /// Registered serializer name.
    pub serializer: Option<String>,
    /// Raw tag string.
    pub tag: String,
    /// Parsed tag settings.
    pub tag_settings: TagSettings,
    /// Embedded schema the field was flattened from.
    pub owner_schema: Option<Arc<Schema>>,
}

impl Field {
    /// Returns true when any of the read/write permissions is granted.
    #[must_use]
    pub const fn has_permission(&self) -> bool {
        self.creatable || self.updatable || self.readable
    }

    /// Returns true for fields that can only be relationships.
    #[must_use]
    pub const fn is_relationship_candidate(&self) -> bool {
        self.data_type.is_none() && self.semantic_type.is_none() && self.has_permission()
    }

    /// Returns the serializer registered under the field's serializer name.
    #[must_use]
    pub fn serializer(&self) -> Option<Arc<dyn Serializer>> {
        self.serializer.as_deref().and_then(serializer::lookup)
    }

    fn new(declared: &StructField) -> Self {
        Self {
            name: declared.name.clone(),
            db_name: String::new(),
            bind_names: vec![declared.name.clone()],
            data_type: None,
            semantic_type: None,
            kind: declared.kind.clone(),
            primary_key: false,
            auto_increment: false,
            auto_increment_increment: 1,
            creatable: true,
            updatable: true,
            readable: true,
            auto_create_time: None,
            auto_update_time: None,
            has_default_value: false,
            default_value: String::new(),
            default_sql_value: None,
            not_null: false,
            unique: false,
            comment: String::new(),
            size: 0,
            precision: 0,
            scale: 0,
            ignore_migration: false,
            serializer: None,
            tag: declared.tag.clone(),
            tag_settings: TagSettings::parse(&declared.tag, ';'),
            owner_schema: None,
        }
    }
}

/// A field as returned by [`parse_field`]: embedded fields carry the schema
/// their columns are flattened from.
pub(crate) struct ParsedField {
    pub(crate) field: Field,
    pub(crate) embedded: Option<Schema>,
}

/// Parses one declared field of `model`, whose table is `table`.
pub(crate) fn parse_field(
    model: &str,
    table: &str,
    naming: &NamingStrategy,
    declared: &StructField,
) -> Result<ParsedField> {
    let mut field = Field::new(declared);
    let settings = field.tag_settings.clone();

    if let Some(column) = settings.value("COLUMN") {
        field.db_name = String::from(column);
    }

    let (storage, valuer) = match declared.kind.indirect() {
        Kind::Valuer(inner) => (inner.indirect(), true),
        other => (other, false),
    };
    field.data_type = DataType::of_kind(storage);
    if let Kind::Int(bits) | Kind::Uint(bits) | Kind::Float(bits) = storage {
        field.size = usize::from(*bits);
    }

    let serializer_name = settings
        .value("SERIALIZER")
        .or_else(|| settings.contains("JSON").then_some("json"));
    if let Some(name) = serializer_name {
        let name = name.trim().to_lowercase();
        if serializer::lookup(&name).is_none() {
            return Err(Error::tag(model, &field.name, format!("invalid serializer type {name}")));
        }
        field.serializer = Some(name);
        field.data_type = Some(DataType::String);
    }

    apply_column_settings(model, &mut field, &settings)?;
    parse_default_value(model, &mut field)?;

    if let Some(value) = settings.value("AUTOCREATETIME") {
        if check_truth(value) {
            field.auto_create_time = Some(TimeKind::from_tag(value, field.data_type.as_ref()));
        }
    } else if field.name == "CreatedAt" && is_timestamp_capable(field.data_type.as_ref()) {
        field.auto_create_time = Some(TimeKind::from_tag("", field.data_type.as_ref()));
    }

    if let Some(value) = settings.value("AUTOUPDATETIME") {
        if check_truth(value) {
            field.auto_update_time = Some(TimeKind::from_tag(value, field.data_type.as_ref()));
        }
    } else if field.name == "UpdatedAt" && is_timestamp_capable(field.data_type.as_ref()) {
        field.auto_update_time = Some(TimeKind::from_tag("", field.data_type.as_ref()));
    }

    field.semantic_type.clone_from(&field.data_type);
    if let Some(type_name) = settings.value("TYPE") {
        field.data_type = Some(DataType::from_name(type_name));
    }

    apply_permissions(&mut field, &settings);

    let embeds = settings.contains("EMBEDDED")
        || (declared.anonymous
            && !valuer
            && !matches!(field.semantic_type, Some(DataType::Time | DataType::Bytes))
            && field.has_permission());
    if !embeds {
        return Ok(ParsedField {
            field,
            embedded: None,
        });
    }

    let Kind::Struct(inner) = storage else {
        if settings.contains("EMBEDDED") {
            return Err(Error::InvalidSchema {
                model: String::from(model),
                reason: format!(
                    "invalid embedded struct for field {}, should be struct, but got {}",
                    field.name, declared.kind
                ),
            });
        }
        return Ok(ParsedField {
            field,
            embedded: None,
        });
    };

    let embedded = Schema::parse_embedded(&inner.describe(), naming, table)?;
    Ok(ParsedField {
        field,
        embedded: Some(embedded),
    })
}

/// Rewrites a field flattened out of an embedded schema owned by `container`.
pub(crate) fn adopt_embedded(container: &Field, owner: &Arc<Schema>, inner: &Field) -> Field {
    let mut field = inner.clone();
    field.owner_schema = Some(Arc::clone(owner));
    field.bind_names.insert(0, container.name.clone());

    if let Some(prefix) = container.tag_settings.get("EMBEDDEDPREFIX") {
        if !field.db_name.is_empty() {
            field.db_name = format!("{prefix}{}", field.db_name);
        }
    }

    if field.primary_key && !explicit_primary_key(&field.tag_settings) {
        field.primary_key = false;
        if !field.tag_settings.get("AUTOINCREMENT").is_some_and(check_truth) {
            field.auto_increment = false;
        }
        if !field.auto_increment && field.default_value.is_empty() {
            field.has_default_value = false;
        }
    }

    field.tag_settings.merge(&container.tag_settings);
    field
}

pub(crate) fn explicit_primary_key(settings: &TagSettings) -> bool {
    ["PRIMARYKEY", "PRIMARY_KEY"]
        .iter()
        .any(|key| settings.value(key).is_some_and(check_truth))
}

fn is_timestamp_capable(data_type: Option<&DataType>) -> bool {
    matches!(data_type, Some(DataType::Time | DataType::Int | DataType::Uint))
}

fn apply_column_settings(model: &str, field: &mut Field, settings: &TagSettings) -> Result<()> {
    field.primary_key = explicit_primary_key(settings);

    if settings.value("AUTOINCREMENT").is_some_and(check_truth) {
        field.auto_increment = true;
        field.has_default_value = true;
    }

    if let Some(value) = settings.value("AUTOINCREMENTINCREMENT") {
        field.auto_increment_increment = value.trim().parse().map_err(|_| {
            Error::tag(model, &field.name, format!("invalid autoIncrementIncrement {value}"))
        })?;
    }

    if let Some(value) = settings.get("DEFAULT") {
        field.has_default_value = true;
        field.default_value = String::from(value);
    }

    if let Some(value) = settings.value("SIZE") {
        match value.trim().parse() {
            Ok(size) => field.size = size,
            Err(_) => {
                warn!(model, field = %field.name, size = value, "ignoring invalid size tag");
                field.size = 0;
            }
        }
    }

    if let Some(value) = settings.value("PRECISION") {
        field.precision = value.trim().parse().map_err(|_| {
            Error::tag(model, &field.name, format!("invalid precision {value}"))
        })?;
    }

    if let Some(value) = settings.value("SCALE") {
        field.scale = value.trim().parse().map_err(|_| {
            Error::tag(model, &field.name, format!("invalid scale {value}"))
        })?;
    }

    field.not_null = settings
        .value("NOT NULL")
        .or_else(|| settings.value("NOTNULL"))
        .is_some_and(check_truth);
    field.unique = settings.value("UNIQUE").is_some_and(check_truth);

    if let Some(comment) = settings.get("COMMENT") {
        field.comment = comment.trim_matches(|c| c == '\'' || c == '"').to_string();
    }

    Ok(())
}

fn parse_default_value(model: &str, field: &mut Field) -> Result<()> {
    let raw = field.default_value.trim();
    let skip = (raw.contains('(') && raw.contains(')'))
        || raw.eq_ignore_ascii_case("null")
        || raw.is_empty();
    if skip {
        return Ok(());
    }

    let invalid = |kind: &str| {
        Error::tag(model, &field.name, format!("failed to parse default value {raw} as {kind}"))
    };

    let parsed = match &field.data_type {
        Some(DataType::Bool) => {
            Some(SqlValue::Bool(parse_bool(raw).ok_or_else(|| invalid("bool"))?))
        }
        Some(DataType::Int) => Some(SqlValue::Int(parse_int(raw).ok_or_else(|| invalid("int"))?)),
        Some(DataType::Uint) => {
            Some(SqlValue::Uint(parse_uint(raw).ok_or_else(|| invalid("uint"))?))
        }
        Some(DataType::Float) => Some(SqlValue::Float(raw.parse().map_err(|_| invalid("float"))?)),
        Some(DataType::String) => Some(SqlValue::Text(
            raw.trim_matches('\'').trim_matches('"').to_string(),
        )),
        Some(DataType::Time) => parse_time(raw).map(SqlValue::Time),
        _ => None,
    };
    field.default_sql_value = parsed;
    Ok(())
}

fn apply_permissions(field: &mut Field, settings: &TagSettings) {
    if let Some(value) = settings.get("-") {
        match value.trim().to_lowercase().as_str() {
            "-" => revoke_all(field),
            "all" => {
                revoke_all(field);
                field.ignore_migration = true;
            }
            "migration" => field.ignore_migration = true,
            _ => {}
        }
    }

    if let Some(value) = settings.get("->") {
        field.creatable = false;
        field.updatable = false;
        field.readable = !value.eq_ignore_ascii_case("false");
    }

    if let Some(value) = settings.get("<-") {
        field.creatable = true;
        field.updatable = true;
        if value != "<-" {
            field.creatable = value.contains("create");
            field.updatable = value.contains("update");
        }
    }
}

fn revoke_all(field: &mut Field) {
    field.creatable = false;
    field.updatable = false;
    field.readable = false;
    field.data_type = None;
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn split_radix(raw: &str) -> (&str, u32) {
    let lower = raw.get(..2).map(str::to_ascii_lowercase);
    match lower.as_deref() {
        Some("0x") => (&raw[2..], 16),
        Some("0o") => (&raw[2..], 8),
        Some("0b") => (&raw[2..], 2),
        _ => (raw, 10),
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    let (negative, unsigned) = raw
        .strip_prefix('-')
        .map_or((false, raw.strip_prefix('+').unwrap_or(raw)), |rest| (true, rest));
    let (digits, radix) = split_radix(unsigned);
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_uint(raw: &str) -> Option<u64> {
    let (digits, radix) = split_radix(raw.strip_prefix('+').unwrap_or(raw));
    u64::from_str_radix(digits, radix).ok()
}

fn parse_time(raw: &str) -> Option<chrono::DateTime<Utc>> {
    let raw = raw.trim_matches('\'').trim_matches('"');
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|parsed| Utc.from_utc_datetime(&parsed))
}
