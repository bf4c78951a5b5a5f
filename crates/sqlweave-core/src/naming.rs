//! Naming strategy: table, column, join-table and constraint names.
//!
//! Identifiers are converted to lowercase snake case while keeping common
//! initialisms together, so `HTTPServerHandlerForURLID` becomes
//! `http_server_handler_for_url_id` rather than `h_t_t_p_server_...`.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Initialisms kept together when converting between naming styles.
pub const COMMON_INITIALISMS: &[&str] = &[
    "API", "ASCII", "CPU", "CSS", "DNS", "EOF", "GUID", "HTML", "HTTP", "HTTPS", "ID", "IP",
    "JSON", "LHS", "QPS", "RAM", "RHS", "RPC", "SLA", "SMTP", "SSH", "TLS", "TTL", "UID", "UI",
    "UUID", "URI", "URL", "UTF8", "VM", "XML", "XSRF", "XSS",
];

const DEFAULT_IDENTIFIER_MAX_LENGTH: usize = 64;

static INITIALISM_REPLACEMENTS: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    COMMON_INITIALISMS
        .iter()
        .map(|initialism| (String::from(*initialism), title_case(initialism)))
        .collect()
});

static INITIALISM_RESTORERS: Lazy<Vec<(Regex, String)>> = Lazy::new(|| {
    COMMON_INITIALISMS
        .iter()
        .filter_map(|initialism| {
            Regex::new(&format!("{}([A-Z]|$|_)", title_case(initialism)))
                .ok()
                .map(|re| (re, format!("{initialism}$1")))
        })
        .collect()
});

static SNAKE_CASE_MEMO: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

/// Maps record types and fields to database identifiers.
///
/// All operations are pure functions of their inputs; the snake-case
/// conversion is memoized process-wide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingStrategy {
    /// Prefix prepended to every table name.
    pub table_prefix: String,
    /// Disables pluralization of table names.
    pub singular_table: bool,
    /// Keeps identifiers as written instead of converting to snake case.
    pub no_lower_case: bool,
    /// Maximum identifier length; `0` means 64.
    pub identifier_max_length: usize,
    /// Substring replacements applied before conversion, in priority order.
    pub name_replacements: Vec<(String, String)>,
}

impl NamingStrategy {
    /// Creates the default strategy: plural snake-case tables, no prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the table prefix.
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: &str) -> Self {
        self.table_prefix = String::from(prefix);
        self
    }

    /// Disables pluralization.
    #[must_use]
    pub const fn with_singular_table(mut self, singular: bool) -> Self {
        self.singular_table = singular;
        self
    }

    /// Adds a substring replacement applied before conversion.
    #[must_use]
    pub fn with_replacement(mut self, from: &str, to: &str) -> Self {
        self.name_replacements
            .push((String::from(from), String::from(to)));
        self
    }

    /// Converts a type name to a table name.
    #[must_use]
    pub fn table_name(&self, name: &str) -> String {
        let base = self.to_db_name(name);
        if self.singular_table {
            format!("{}{base}", self.table_prefix)
        } else {
            format!("{}{}", self.table_prefix, pluralize(&base))
        }
    }

    /// Derives a type name from a table name. Not guaranteed to invert
    /// [`NamingStrategy::table_name`].
    #[must_use]
    pub fn schema_name(&self, table: &str) -> String {
        let table = table.strip_prefix(&self.table_prefix).unwrap_or(table);
        if self.singular_table {
            to_schema_name(table)
        } else {
            to_schema_name(&singularize(table))
        }
    }

    /// Converts a field name to a column name.
    #[must_use]
    pub fn column_name(&self, _table: &str, column: &str) -> String {
        self.to_db_name(column)
    }

    /// Converts a `many2many` tag value to a join table name. Lowercase
    /// values are used as written.
    #[must_use]
    pub fn join_table_name(&self, raw: &str) -> String {
        if !self.no_lower_case && raw.to_lowercase() == raw {
            return format!("{}{raw}", self.table_prefix);
        }
        self.table_name(raw)
    }

    /// Name of the foreign-key constraint backing a relationship.
    #[must_use]
    pub fn foreign_key_name(&self, table: &str, relationship: &str) -> String {
        self.format_name("fk", table, &self.to_db_name(relationship))
    }

    /// Name of a check constraint.
    #[must_use]
    pub fn checker_name(&self, table: &str, column: &str) -> String {
        self.format_name("chk", table, column)
    }

    /// Name of an index.
    #[must_use]
    pub fn index_name(&self, table: &str, column: &str) -> String {
        self.format_name("idx", table, &self.to_db_name(column))
    }

    /// Name of a unique constraint.
    #[must_use]
    pub fn unique_name(&self, table: &str, column: &str) -> String {
        self.format_name("uni", table, &self.to_db_name(column))
    }

    fn format_name(&self, prefix: &str, table: &str, name: &str) -> String {
        let formatted = [prefix, table, name].join("_").replace('.', "_");
        let max = if self.identifier_max_length == 0 {
            DEFAULT_IDENTIFIER_MAX_LENGTH
        } else {
            self.identifier_max_length
        };

        if formatted.chars().count() <= max {
            return formatted;
        }

        let digest = Sha1::digest(formatted.as_bytes());
        let hash: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        let hash_len = max.min(8);
        let kept: String = formatted.chars().take(max - hash_len).collect();
        format!("{kept}{}", &hash[..hash_len])
    }

    /// Converts an identifier to its database form.
    #[must_use]
    pub fn to_db_name(&self, name: &str) -> String {
        if name.is_empty() {
            return String::new();
        }

        let mut name = String::from(name);
        if !self.name_replacements.is_empty() {
            let replaced = replace_all(&name, &self.name_replacements);
            if replaced.is_empty() {
                return name;
            }
            name = replaced;
        }

        if self.no_lower_case {
            return name;
        }

        if let Some(cached) = SNAKE_CASE_MEMO.get(&name) {
            return cached.clone();
        }
        let converted = snake_case(&name);
        SNAKE_CASE_MEMO.insert(name, converted.clone());
        converted
    }
}

/// Converts a snake-case identifier to a type-style name, restoring
/// initialisms: `user_id` → `UserID`.
#[must_use]
pub fn to_schema_name(name: &str) -> String {
    let mut result: String = name.split('_').map(title_case_keep_rest).collect();
    for (re, replacement) in INITIALISM_RESTORERS.iter() {
        result = re.replace_all(&result, replacement.as_str()).into_owned();
    }
    result
}

fn snake_case(name: &str) -> String {
    let value: Vec<char> = replace_all(name, &INITIALISM_REPLACEMENTS).chars().collect();
    let is_upper = |c: char| c.is_ascii_uppercase();
    let is_number = |c: char| c.is_ascii_digit();

    let mut buf = String::with_capacity(value.len() + 4);
    let mut last_case = false;
    let mut cur_case = is_upper(value[0]);

    for i in 0..value.len() - 1 {
        let v = value[i];
        let next_case = is_upper(value[i + 1]);
        let next_number = is_number(value[i + 1]);

        if cur_case {
            if !(last_case && (next_case || next_number))
                && i > 0
                && value[i - 1] != '_'
                && value[i + 1] != '_'
            {
                buf.push('_');
            }
            buf.push(v.to_ascii_lowercase());
        } else {
            buf.push(v);
        }

        last_case = cur_case;
        cur_case = next_case;
    }

    let last = value[value.len() - 1];
    if cur_case {
        if !last_case && value.len() > 1 {
            buf.push('_');
        }
        buf.push(last.to_ascii_lowercase());
    } else {
        buf.push(last);
    }
    buf
}

/// Replaces substrings left to right without overlapping; at each position
/// the first matching pair in list order wins.
fn replace_all(input: &str, pairs: &[(String, String)]) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    'outer: while !rest.is_empty() {
        for (from, to) in pairs {
            if !from.is_empty() && rest.starts_with(from.as_str()) {
                out.push_str(to);
                rest = &rest[from.len()..];
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

fn title_case(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    title_case_keep_rest(&lower)
}

fn title_case_keep_rest(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        let mut out = String::with_capacity(word.len());
        out.push(first.to_ascii_uppercase());
        out.push_str(chars.as_str());
        out
    })
}

fn pluralize(word: &str) -> String {
    pluralizer::pluralize(word, 2, false)
}

pub(crate) fn singularize(word: &str) -> String {
    pluralizer::pluralize(word, 1, false)
}
