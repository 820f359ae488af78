use crate::constants::{DEFAULT_MAX_DEPTH, MAX_KEY_LENGTH};

/// Per-parse knobs. The defaults match the documented bounds in
/// [`crate::constants`].
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Stored object keys are truncated to this many bytes (at a
    /// character boundary); longer keys are kept, not rejected.
    pub max_key_length: usize,
    /// Depth ceiling seeded into the parsed document's resumable walk.
    pub walk_depth: usize,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_key_length(mut self, max_key_length: usize) -> Self {
        self.max_key_length = max_key_length;
        self
    }

    pub fn with_walk_depth(mut self, walk_depth: usize) -> Self {
        self.walk_depth = walk_depth;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_key_length: MAX_KEY_LENGTH,
            walk_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
