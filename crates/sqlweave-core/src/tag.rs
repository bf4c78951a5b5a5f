//! Parser for `KEY[:VALUE]` annotation strings.
//!
//! Items are separated by `;` (or `,` for index sub-settings). A `\` before a
//! separator escapes it so values can contain separators. Keys are trimmed and
//! uppercased; a key without value maps to itself.

/// Parsed tag settings, preserving declaration order.
///
/// Lookups return the last value for a key, matching the behavior of a map
/// built by inserting items in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSettings {
    entries: Vec<(String, String)>,
}

impl TagSettings {
    /// Parses `input` using `sep` as the item separator.
    #[must_use]
    pub fn parse(input: &str, sep: char) -> Self {
        let entries = split_items(input, sep)
            .into_iter()
            .filter_map(|item| {
                let mut parts = item.splitn(2, ':');
                let key = parts.next().unwrap_or_default().trim().to_uppercase();
                match parts.next() {
                    Some(value) => Some((key, value.replace("\\\"", "\""))),
                    None if key.is_empty() => None,
                    None => Some((key.clone(), key)),
                }
            })
            .collect();
        Self { entries }
    }

    /// Returns the value for `key` (uppercase).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value for `key` when present and non-empty.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Returns true when `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Returns every `(key, value)` pair in declaration order, including
    /// repeated keys.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets `key` to `value`, replacing an existing entry.
    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.retain(|(k, _)| k != key);
        self.entries.push((String::from(key), String::from(value)));
    }

    /// Copies every entry of `other` over this one.
    pub fn merge(&mut self, other: &Self) {
        for (k, v) in &other.entries {
            self.insert(k, v);
        }
    }

    /// Returns true when no settings are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Interprets a flag value: anything except `false` is true.
#[must_use]
pub fn check_truth(value: &str) -> bool {
    !value.trim().eq_ignore_ascii_case("false")
}

/// Splits raw tag items, joining items whose separator was escaped.
#[must_use]
pub fn split_items(input: &str, sep: char) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&sep) {
            current.push(sep);
            chars.next();
        } else if c == sep {
            items.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    items.push(current);
    items.retain(|item| !item.is_empty());
    items
}

/// Appends a setting to a raw tag string.
#[must_use]
pub fn append_setting(tag: &str, setting: &str) -> String {
    if tag.trim().is_empty() {
        String::from(setting)
    } else {
        format!("{};{setting}", tag.trim_end_matches(';'))
    }
}

/// Removes the given keys (case-insensitive) from a raw tag string.
#[must_use]
pub fn remove_settings(tag: &str, keys: &[&str]) -> String {
    split_items(tag, ';')
        .into_iter()
        .filter(|item| {
            let key = item.split(':').next().unwrap_or_default().trim();
            !keys.iter().any(|k| k.eq_ignore_ascii_case(key))
        })
        .map(|item| item.replace(';', "\\;"))
        .collect::<Vec<_>>()
        .join(";")
}
