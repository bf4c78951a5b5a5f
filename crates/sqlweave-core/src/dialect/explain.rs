use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::value::SqlValue;

static NUMBERED_PLACEHOLDER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\$(\d+)").ok());

fn render(value: &SqlValue, escaper: char) -> String {
    let quoted = |s: &str| {
        let escaped = s.replace(escaper, &format!("\\{escaper}"));
        format!("{escaper}{escaped}{escaper}")
    };
    match value {
        SqlValue::Null => String::from("NULL"),
        SqlValue::Bool(b) => b.to_string(),
        SqlValue::Int(n) => n.to_string(),
        SqlValue::Uint(n) => n.to_string(),
        SqlValue::Float(f) => format!("{f:.6}"),
        SqlValue::Text(s) => quoted(s),
        SqlValue::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) if !s.chars().any(char::is_control) => quoted(s),
            _ => format!("{escaper}<binary>{escaper}"),
        },
        SqlValue::Time(t) => quoted(&t.format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
        SqlValue::Array(items) => {
            let inner: Vec<String> = items.iter().map(|v| render(v, escaper)).collect();
            format!("({})", inner.join(","))
        }
    }
}

/// Inlines `vars` into `sql` for logging.
///
/// With `numbered` set, `$N` placeholders are resolved by position;
/// otherwise each `?` consumes the next var. Strings and times are wrapped
/// in `escaper`. The result must never be executed.
#[must_use]
pub fn explain_sql(sql: &str, numbered: bool, escaper: char, vars: &[SqlValue]) -> String {
    let rendered: Vec<String> = vars.iter().map(|v| render(v, escaper)).collect();

    if let (true, Some(placeholder)) = (numbered, NUMBERED_PLACEHOLDER.as_ref()) {
        return placeholder
            .replace_all(sql, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|idx| rendered.get(idx))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
    }

    let mut out = String::with_capacity(sql.len());
    let mut idx = 0;
    for c in sql.chars() {
        if c == '?' {
            if let Some(value) = rendered.get(idx) {
                out.push_str(value);
                idx += 1;
                continue;
            }
        }
        out.push(c);
    }
    out
}
