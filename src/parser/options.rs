//! Blueprint extraction options.

/// Default upper bound on the number of slots in a blueprint.
pub const DEFAULT_MAX_SLOTS: usize = 500;

/// Default length of the sample-text hint recorded for prose slots.
pub const DEFAULT_HINT_LEN: usize = 80;

/// Options for extracting a blueprint from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Maximum number of paragraphs turned into slots (excess is ignored)
    pub max_slots: usize,

    /// Maximum hint length in characters for non-line slots (0 = no hints)
    pub hint_len: usize,
}

impl ExtractOptions {
    /// Create new extraction options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slot limit.
    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = max_slots;
        self
    }

    /// Set the hint length.
    pub fn with_hint_len(mut self, hint_len: usize) -> Self {
        self.hint_len = hint_len;
        self
    }

    /// Do not record hints for prose slots.
    pub fn without_hints(mut self) -> Self {
        self.hint_len = 0;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_slots: DEFAULT_MAX_SLOTS,
            hint_len: DEFAULT_HINT_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = ExtractOptions::default();
        assert_eq!(opts.max_slots, 500);
        assert_eq!(opts.hint_len, 80);
    }

    #[test]
    fn test_builder_pattern() {
        let opts = ExtractOptions::new().with_max_slots(10).without_hints();
        assert_eq!(opts.max_slots, 10);
        assert_eq!(opts.hint_len, 0);
    }
}
