use super::Builder;

/// `LIMIT` and `OFFSET`.
///
/// Numbers are written inline. A negative limit means no limit; an offset
/// without a limit promotes the limit to [`Dialect::max_limit`] on dialects
/// that require one.
///
/// [`Dialect::max_limit`]: crate::dialect::Dialect::max_limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limit {
    /// Row limit.
    pub limit: Option<i64>,
    /// Rows skipped.
    pub offset: i64,
}

impl Limit {
    /// `LIMIT n`
    #[must_use]
    pub const fn limit(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: 0,
        }
    }

    /// `OFFSET n`
    #[must_use]
    pub const fn offset(offset: i64) -> Self {
        Self {
            limit: None,
            offset,
        }
    }

    const fn effective_limit(&self) -> Option<i64> {
        match self.limit {
            Some(limit) if limit >= 0 => Some(limit),
            _ => None,
        }
    }

    /// Returns true when neither a limit nor an offset would be written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.effective_limit().is_none() && self.offset <= 0
    }

    /// Clamps a negative offset to zero.
    #[must_use]
    pub const fn normalized(mut self) -> Self {
        if self.offset < 0 {
            self.offset = 0;
        }
        self
    }

    /// A later non-zero limit replaces this one; a later offset replaces
    /// this one unless it is zero.
    #[must_use]
    pub const fn merge(self, later: Self) -> Self {
        let limit = match later.limit {
            None | Some(0) if self.limit.is_some() => self.limit,
            other => other,
        };
        let offset = if later.offset == 0 && self.offset > 0 {
            self.offset
        } else if later.offset < 0 {
            0
        } else {
            later.offset
        };
        Self { limit, offset }
    }

    /// Writes `LIMIT n OFFSET m`.
    pub fn build(&self, builder: &mut dyn Builder) {
        let limit = self
            .effective_limit()
            .map(|l| l.to_string())
            .or_else(|| {
                if self.offset > 0 {
                    builder.dialect().max_limit().map(|max| max.to_string())
                } else {
                    None
                }
            });

        if let Some(limit) = &limit {
            builder.write_str("LIMIT ");
            builder.write_str(limit);
        }
        if self.offset > 0 {
            if limit.is_some() {
                builder.write_char(' ');
            }
            builder.write_str(&format!("OFFSET {}", self.offset));
        }
    }
}
