//! Breakpoint ids installed in the debugger, per source file.

use std::collections::HashMap;

/// Tracks which debugger breakpoint ids belong to which client file.
///
/// Entries are replaced wholesale on every `setBreakpoints`; there is no
/// incremental diffing.
#[derive(Debug, Clone, Default)]
pub struct BreakpointRegistry {
    files: HashMap<String, Vec<i64>>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids installed for `path`, or `None` if the file was never seen.
    pub fn ids(&self, path: &str) -> Option<&[i64]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Replace the ids for `path`.
    pub fn replace(&mut self, path: &str, ids: Vec<i64>) {
        self.files.insert(path.to_string(), ids);
    }
}
