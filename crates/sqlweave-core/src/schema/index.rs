//! Index definitions collected from `index` and `uniqueIndex` tags.

use std::sync::Arc;

use super::Field;
use crate::error::{Error, Result};
use crate::naming::NamingStrategy;
use crate::tag::{split_items, TagSettings};

const DEFAULT_PRIORITY: i64 = 10;

/// A table index, possibly spanning several fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// `UNIQUE`, `FULLTEXT`, `SPATIAL` or empty.
    pub class: String,
    /// Index method such as `btree` or `gin`.
    pub index_type: String,
    /// Partial index predicate.
    pub where_clause: String,
    /// Index comment.
    pub comment: String,
    /// Trailing index option such as `WITH PARSER ngram`.
    pub option: String,
    /// Member fields ordered by priority.
    pub fields: Vec<IndexOption>,
}

impl Index {
    /// Returns true for a `UNIQUE` index.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.class == "UNIQUE"
    }
}

/// One field's participation in an index.
#[derive(Debug, Clone)]
pub struct IndexOption {
    /// The indexed field.
    pub field: Arc<Field>,
    /// Expression indexed instead of the bare column.
    pub expression: String,
    /// `ASC` or `DESC`.
    pub sort: String,
    /// Collation.
    pub collate: String,
    /// Prefix length.
    pub length: usize,
    /// Position within a composite index; lower comes first.
    pub priority: i64,
}

impl PartialEq for IndexOption {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.field, &other.field)
            && self.expression == other.expression
            && self.sort == other.sort
            && self.collate == other.collate
            && self.length == other.length
            && self.priority == other.priority
    }
}

/// Collects the indexes declared on `fields`, coalescing entries that share
/// a name.
pub(crate) fn parse_indexes(
    model: &str,
    table: &str,
    naming: &NamingStrategy,
    fields: &[Arc<Field>],
) -> Result<Vec<Index>> {
    let mut indexes: Vec<Index> = Vec::new();

    for field in fields {
        for declared in parse_field_indexes(model, table, naming, field)? {
            let Some(existing) = indexes.iter_mut().find(|idx| idx.name == declared.name) else {
                indexes.push(declared);
                continue;
            };
            fill_empty(&mut existing.class, declared.class);
            fill_empty(&mut existing.index_type, declared.index_type);
            fill_empty(&mut existing.where_clause, declared.where_clause);
            fill_empty(&mut existing.comment, declared.comment);
            fill_empty(&mut existing.option, declared.option);
            existing.fields.extend(declared.fields);
            existing.fields.sort_by_key(|option| option.priority);
        }
    }

    Ok(indexes)
}

fn fill_empty(slot: &mut String, value: String) {
    if slot.is_empty() {
        *slot = value;
    }
}

fn parse_field_indexes(
    model: &str,
    table: &str,
    naming: &NamingStrategy,
    field: &Arc<Field>,
) -> Result<Vec<Index>> {
    let mut indexes = Vec::new();

    for item in split_items(&field.tag, ';') {
        let (key, value) = item.split_once(':').unwrap_or((item.as_str(), ""));
        let key = key.trim().to_uppercase();
        if key != "INDEX" && key != "UNIQUEINDEX" && key != "UNIQUE_INDEX" {
            continue;
        }

        let (name, raw_settings) = value.split_once(',').unwrap_or((value, ""));
        let settings = TagSettings::parse(raw_settings, ',');

        let name = if name.is_empty() {
            let mut sub_name = field.name.as_str();
            if let Some(composite) = settings.get("COMPOSITE") {
                if composite.is_empty() || composite == "COMPOSITE" {
                    return Err(Error::tag(
                        model,
                        &field.name,
                        "the composite tag cannot be empty",
                    ));
                }
                sub_name = composite;
            }
            naming.index_name(table, sub_name)
        } else {
            String::from(name)
        };

        let class = if key != "INDEX" || settings.value("UNIQUE").is_some() {
            String::from("UNIQUE")
        } else {
            setting(&settings, "CLASS")
        };

        indexes.push(Index {
            name,
            class,
            index_type: setting(&settings, "TYPE"),
            where_clause: setting(&settings, "WHERE"),
            comment: setting(&settings, "COMMENT"),
            option: setting(&settings, "OPTION"),
            fields: vec![IndexOption {
                field: Arc::clone(field),
                expression: setting(&settings, "EXPRESSION"),
                sort: setting(&settings, "SORT"),
                collate: setting(&settings, "COLLATE"),
                length: settings
                    .value("LENGTH")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or_default(),
                priority: settings
                    .value("PRIORITY")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_PRIORITY),
            }],
        });
    }

    Ok(indexes)
}

fn setting(settings: &TagSettings, key: &str) -> String {
    settings.get(key).map(String::from).unwrap_or_default()
}
