use super::Builder;

/// `DELETE [modifier]`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Delete {
    /// Modifier such as `LOW_PRIORITY`.
    pub modifier: String,
}

impl Delete {
    /// Writes the keyword and modifier.
    pub fn build(&self, builder: &mut dyn Builder) {
        builder.write_str("DELETE");
        if !self.modifier.is_empty() {
            builder.write_char(' ');
            builder.write_str(&self.modifier);
        }
    }
}
