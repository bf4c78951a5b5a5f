//! Error types shared by the schema reflector and the statement builder.

use thiserror::Error;

/// Errors produced while parsing schemas or building statements.
///
/// Every variant names the offending model, field, relation or clause so the
/// message alone is enough to locate the problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The type handed to the reflector is not a struct.
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    /// The type is a struct but cannot be turned into a schema.
    #[error("invalid schema {model}: {reason}")]
    InvalidSchema {
        /// Name of the model being parsed.
        model: String,
        /// Why the schema was rejected.
        reason: String,
    },

    /// A structured tag value could not be parsed.
    #[error("invalid tag on {model}.{field}: {reason}")]
    InvalidTag {
        /// Name of the model being parsed.
        model: String,
        /// Name of the field carrying the tag.
        field: String,
        /// Why the tag was rejected.
        reason: String,
    },

    /// An ambiguous or contradictory relationship definition.
    #[error("invalid relationship {model}.{field}: {reason}")]
    InvalidRelationship {
        /// Name of the owning model.
        model: String,
        /// Name of the relationship field.
        field: String,
        /// Why the relationship was rejected.
        reason: String,
    },

    /// A field referenced by name does not exist.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// A destructive statement was built without a condition.
    #[error("{0} statement requires a WHERE condition")]
    MissingWhere(String),

    /// No semantic data type maps to the field's kind.
    #[error("unsupported data type for {model}.{field}: {kind}")]
    UnsupportedDataType {
        /// Name of the model being parsed.
        model: String,
        /// Name of the field.
        field: String,
        /// Description of the offending kind.
        kind: String,
    },

    /// An error raised by a dialect implementation.
    #[error("dialect error: {0}")]
    Dialect(String),

    /// A serializer could not convert a field value.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Several errors recorded on one statement.
    #[error("multiple errors: {}", format_multiple(.0))]
    Multiple(Vec<Error>),
}

fn format_multiple(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Collapses a list of errors into one, or `None` when the list is empty.
    #[must_use]
    pub fn aggregate(mut errors: Vec<Self>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    pub(crate) fn tag(model: &str, field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTag {
            model: String::from(model),
            field: String::from(field),
            reason: reason.into(),
        }
    }

    pub(crate) fn relationship(model: &str, field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRelationship {
            model: String::from(model),
            field: String::from(field),
            reason: reason.into(),
        }
    }
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate() {
        assert_eq!(Error::aggregate(Vec::new()), None);

        let single = Error::aggregate(vec![Error::InvalidField(String::from("age"))]);
        assert_eq!(single, Some(Error::InvalidField(String::from("age"))));

        let many = Error::aggregate(vec![
            Error::InvalidField(String::from("age")),
            Error::MissingWhere(String::from("DELETE")),
        ])
        .unwrap();
        assert_eq!(
            many.to_string(),
            "multiple errors: invalid field: age; DELETE statement requires a WHERE condition"
        );
    }

    #[test]
    fn test_messages_name_the_field() {
        let err = Error::tag("User", "Age", "invalid size");
        assert_eq!(err.to_string(), "invalid tag on User.Age: invalid size");
    }
}
