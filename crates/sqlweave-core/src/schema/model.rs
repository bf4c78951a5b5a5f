//! Compile-time description of record types.
//!
//! `#[derive(Model)]` implements [`Model`] for a struct: an ordered list of
//! fields with their name, [`Kind`], tag string and embedding flag. The
//! reflector never inspects values, only these descriptions.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// The structural kind of a field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    /// `bool`
    Bool,
    /// Signed integer of the given bit width.
    Int(u8),
    /// Unsigned integer of the given bit width.
    Uint(u8),
    /// Float of the given bit width.
    Float(u8),
    /// `String`
    String,
    /// Date or timestamp.
    Time,
    /// Growable sequence.
    Slice(Box<Kind>),
    /// Fixed-size array.
    Array(Box<Kind>, usize),
    /// Optional or boxed value.
    Ptr(Box<Kind>),
    /// Another record type.
    Struct(ModelRef),
    /// A type stored as the given scalar kind rather than by structure.
    Valuer(Box<Kind>),
    /// Key/value map.
    Map,
    /// A type with no storage mapping.
    Unsupported(&'static str),
}

impl Kind {
    /// Strips `Ptr` layers.
    #[must_use]
    pub fn indirect(&self) -> &Self {
        let mut kind = self;
        while let Self::Ptr(inner) = kind {
            kind = inner;
        }
        kind
    }

    /// Returns the record type behind pointers, slices and arrays.
    #[must_use]
    pub fn model(&self) -> Option<&ModelRef> {
        match self {
            Self::Struct(model) => Some(model),
            Self::Ptr(inner) | Self::Slice(inner) | Self::Array(inner, _) => inner.model(),
            _ => None,
        }
    }

    /// Returns true for a sequence (after stripping pointers).
    #[must_use]
    pub fn is_sequence(&self) -> bool {
        matches!(self.indirect(), Self::Slice(_) | Self::Array(..))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int(bits) => write!(f, "i{bits}"),
            Self::Uint(bits) => write!(f, "u{bits}"),
            Self::Float(bits) => write!(f, "f{bits}"),
            Self::String => write!(f, "string"),
            Self::Time => write!(f, "time"),
            Self::Slice(inner) => write!(f, "[]{inner}"),
            Self::Array(inner, len) => write!(f, "[{len}]{inner}"),
            Self::Ptr(inner) => write!(f, "*{inner}"),
            Self::Struct(model) => write!(f, "{}", model.name),
            Self::Valuer(inner) => write!(f, "valuer({inner})"),
            Self::Map => write!(f, "map"),
            Self::Unsupported(name) => write!(f, "{name}"),
        }
    }
}

/// A handle to a record type: its identity and a lazy description.
#[derive(Clone, Copy)]
pub struct ModelRef {
    /// Identity used as the schema cache key.
    pub id: TypeId,
    /// Type name.
    pub name: &'static str,
    describe: fn() -> ModelType,
}

impl ModelRef {
    /// Returns the handle for `T`.
    #[must_use]
    pub fn of<T: Model>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::model_name(),
            describe: T::model_type,
        }
    }

    /// Produces the type description.
    #[must_use]
    pub fn describe(&self) -> ModelType {
        (self.describe)()
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef").field(&self.name).finish()
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ModelRef {}

/// One field of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    /// Field name in schema form (`UserID`).
    pub name: String,
    /// Structural kind of the field type.
    pub kind: Kind,
    /// Raw `;`-separated tag string.
    pub tag: String,
    /// Embedded by composition; its fields are flattened into the owner.
    pub anonymous: bool,
}

impl StructField {
    /// Creates a field description.
    #[must_use]
    pub fn new(name: &str, kind: Kind, tag: &str) -> Self {
        Self {
            name: String::from(name),
            kind,
            tag: String::from(tag),
            anonymous: false,
        }
    }

    /// Marks the field as embedded.
    #[must_use]
    pub const fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

/// Description of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelType {
    /// Type name.
    pub name: String,
    /// Explicit table name, overriding the naming strategy.
    pub table_name: Option<String>,
    /// Struct-level tag string.
    pub tag: String,
    /// Fields in declaration order.
    pub fields: Vec<StructField>,
}

/// Types with a known structural [`Kind`].
pub trait Reflect {
    /// Returns the kind of `Self`.
    fn kind() -> Kind;
}

/// Record types the schema reflector can parse.
pub trait Model: Reflect + 'static {
    /// Returns the type name.
    fn model_name() -> &'static str;

    /// Returns the full description.
    fn model_type() -> ModelType;
}

macro_rules! reflect_scalar {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn kind() -> Kind {
                    $kind
                }
            }
        )*
    };
}

reflect_scalar!(
    bool => Kind::Bool,
    i8 => Kind::Int(8),
    i16 => Kind::Int(16),
    i32 => Kind::Int(32),
    i64 => Kind::Int(64),
    isize => Kind::Int(64),
    u8 => Kind::Uint(8),
    u16 => Kind::Uint(16),
    u32 => Kind::Uint(32),
    u64 => Kind::Uint(64),
    usize => Kind::Uint(64),
    f32 => Kind::Float(32),
    f64 => Kind::Float(64),
    String => Kind::String,
    NaiveDateTime => Kind::Time,
    NaiveDate => Kind::Time,
    NaiveTime => Kind::Time,
    serde_json::Value => Kind::Valuer(Box::new(Kind::String)),
);

impl<Tz: TimeZone> Reflect for DateTime<Tz> {
    fn kind() -> Kind {
        Kind::Time
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn kind() -> Kind {
        Kind::Slice(Box::new(T::kind()))
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn kind() -> Kind {
        Kind::Array(Box::new(T::kind()), N)
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn kind() -> Kind {
        Kind::Ptr(Box::new(T::kind()))
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn kind() -> Kind {
        Kind::Ptr(Box::new(T::kind()))
    }
}

impl<T: Reflect> Reflect for Arc<T> {
    fn kind() -> Kind {
        Kind::Ptr(Box::new(T::kind()))
    }
}

impl<K, V> Reflect for HashMap<K, V> {
    fn kind() -> Kind {
        Kind::Map
    }
}

impl<K, V> Reflect for BTreeMap<K, V> {
    fn kind() -> Kind {
        Kind::Map
    }
}
