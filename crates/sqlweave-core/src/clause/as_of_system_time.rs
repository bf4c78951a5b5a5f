use chrono::{DateTime, Utc};

use super::Builder;

/// `AS OF SYSTEM TIME` time travel suffix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AsOfSystemTime {
    /// Point in time, rendered with microsecond precision.
    pub timestamp: Option<DateTime<Utc>>,
    /// Raw SQL written instead of the timestamp, e.g. `'-1h'`.
    pub raw: Option<String>,
}

impl AsOfSystemTime {
    /// At the given instant.
    #[must_use]
    pub const fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(timestamp),
            raw: None,
        }
    }

    /// With a raw interval or expression.
    #[must_use]
    pub fn raw(raw: &str) -> Self {
        Self {
            timestamp: None,
            raw: Some(String::from(raw)),
        }
    }

    /// Returns true when neither a timestamp nor raw SQL is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none() && self.raw.as_deref().map_or(true, str::is_empty)
    }

    /// Writes the clause including its keyword.
    pub fn build(&self, builder: &mut dyn Builder) {
        if let Some(raw) = self.raw.as_deref().filter(|r| !r.is_empty()) {
            builder.write_str("AS OF SYSTEM TIME ");
            builder.write_str(raw);
        } else if let Some(timestamp) = &self.timestamp {
            builder.write_str(&format!(
                "AS OF SYSTEM TIME '{}'",
                timestamp.format("%Y-%m-%d %H:%M:%S%.6f")
            ));
        }
    }
}
