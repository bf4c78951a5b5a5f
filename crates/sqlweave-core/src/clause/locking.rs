use std::fmt;

use super::{Builder, Quoted, Table};

/// Row lock strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockingStrength {
    /// `FOR UPDATE`
    #[default]
    Update,
    /// `FOR SHARE`
    Share,
}

/// Behavior when rows are already locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockingOptions {
    /// `NOWAIT`
    NoWait,
    /// `SKIP LOCKED`
    SkipLocked,
}

impl fmt::Display for LockingStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update => write!(f, "UPDATE"),
            Self::Share => write!(f, "SHARE"),
        }
    }
}

impl fmt::Display for LockingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWait => write!(f, "NOWAIT"),
            Self::SkipLocked => write!(f, "SKIP LOCKED"),
        }
    }
}

/// `FOR <strength> [OF table] [options]`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Locking {
    /// Lock strength.
    pub strength: LockingStrength,
    /// Restricts the lock to one table.
    pub table: Option<Table>,
    /// Lock wait behavior.
    pub options: Option<LockingOptions>,
}

impl Locking {
    /// Locks rows with `strength`.
    #[must_use]
    pub const fn new(strength: LockingStrength) -> Self {
        Self {
            strength,
            table: None,
            options: None,
        }
    }

    /// Restricts the lock to `table`.
    #[must_use]
    pub fn of(mut self, table: impl Into<Table>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the wait behavior.
    #[must_use]
    pub const fn with_options(mut self, options: LockingOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Writes the strength, table and options.
    pub fn build(&self, builder: &mut dyn Builder) {
        builder.write_str(&self.strength.to_string());
        if let Some(table) = &self.table {
            builder.write_str(" OF ");
            builder.write_quoted(Quoted::Table(table));
        }
        if let Some(options) = self.options {
            builder.write_char(' ');
            builder.write_str(&options.to_string());
        }
    }
}
