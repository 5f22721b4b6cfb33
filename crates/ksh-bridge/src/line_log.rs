//! Append-only log of debugger output lines.
//!
//! The last entry is always the line currently being received; it has no
//! terminating newline yet and is extended by the next chunk. Every other
//! entry is complete and never changes once written.

/// Prompt the debugger prints before reading a command, e.g. `kshdb<3> `.
pub const PROMPT_PREFIX: &str = "kshdb<";

#[derive(Debug, Clone)]
pub struct LineLog {
    lines: Vec<String>,
}

impl Default for LineLog {
    fn default() -> Self {
        Self::new()
    }
}

impl LineLog {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
        }
    }

    /// Append a chunk of output.
    ///
    /// The chunk's first fragment extends the pending entry, each newline
    /// completes an entry and starts a new one. Returns the number of
    /// entries completed by this chunk.
    pub fn push_chunk(&mut self, chunk: &str) -> usize {
        let mut fragments = chunk.split('\n');
        let pending = self.lines.pop().unwrap_or_default();
        let head = fragments.next().unwrap_or_default();
        self.lines.push(strip_prompt(&(pending + head)).to_string());

        let mut completed = 0;
        for fragment in fragments {
            self.lines.push(strip_prompt(fragment).to_string());
            completed += 1;
        }
        completed
    }

    /// Number of entries, including the pending one.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing at all has been received.
    pub fn is_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].is_empty()
    }

    /// Number of complete entries.
    pub fn complete_len(&self) -> usize {
        self.lines.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// The complete entries.
    pub fn complete_lines(&self) -> &[String] {
        &self.lines[..self.complete_len()]
    }

    /// Index of the first complete entry at or after `from` that is exactly
    /// `needle`.
    pub fn find_line(&self, from: usize, needle: &str) -> Option<usize> {
        self.complete_lines()
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, line)| line.as_str() == needle)
            .map(|(index, _)| index)
    }

    /// Cut the reply to a command issued when the log had `start` entries
    /// and whose sentinel landed at `sentinel`.
    ///
    /// The entry at `start - 1` was the pending prompt line when the command
    /// was written, so the command's first output line is appended to it.
    /// It is kept as the reply's context line.
    pub fn reply(&self, start: usize, sentinel: usize) -> Reply {
        let context = start
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .cloned();
        let lines = if start < sentinel {
            self.lines[start..sentinel].to_vec()
        } else {
            Vec::new()
        };
        Reply { context, lines }
    }
}

/// Remove every leading debugger prompt from `line`.
pub fn strip_prompt(mut line: &str) -> &str {
    while line.starts_with(PROMPT_PREFIX) {
        match line.find("> ") {
            Some(end) => line = &line[end + 2..],
            None => break,
        }
    }
    line
}

/// The output produced by one command, up to its sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// The line the command's first output was appended to.
    pub context: Option<String>,
    /// Lines strictly between the issue point and the sentinel.
    pub lines: Vec<String>,
}

impl Reply {
    /// Each line of the reply paired with the line before it.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        let previous = self
            .context
            .as_deref()
            .into_iter()
            .chain(self.lines.iter().map(String::as_str));
        let skip = usize::from(self.context.is_none());
        previous
            .zip(self.lines.iter().skip(skip).map(String::as_str))
    }

    /// The last line before the sentinel, falling back to the context line.
    pub fn last(&self) -> Option<&str> {
        self.lines.last().or(self.context.as_ref()).map(String::as_str)
    }
}
