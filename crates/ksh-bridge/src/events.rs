//! Recognition of unsolicited debugger state changes in the output log.

use crate::line_log::LineLog;

/// Printed by kshdb when the debuggee receives a signal.
const SIGNAL_PREFIX: &str = "Program received signal ";

/// Printed by kshdb when the debuggee exits.
const TERMINATED_PREFIX: &str = "Debugged program terminated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedEvent {
    /// A location line such as `(/tmp/a.sh:12):`.
    Stopped,
    /// A signal stopped the program.
    Signaled,
    Terminated,
}

pub fn classify(line: &str) -> Option<DetectedEvent> {
    if line.starts_with('(') && line.len() >= 2 && line.find("):") == Some(line.len() - 2) {
        Some(DetectedEvent::Stopped)
    } else if line.starts_with(SIGNAL_PREFIX) {
        Some(DetectedEvent::Signaled)
    } else if line.starts_with(TERMINATED_PREFIX) {
        Some(DetectedEvent::Terminated)
    } else {
        None
    }
}

/// Scans each complete log line exactly once.
#[derive(Debug, Clone, Default)]
pub struct EventDetector {
    cursor: usize,
}

impl EventDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next line to scan. Only ever grows.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Classify the complete lines appended since the last scan.
    pub fn scan(&mut self, log: &LineLog) -> Vec<DetectedEvent> {
        let lines = log.complete_lines();
        let events = lines
            .get(self.cursor..)
            .unwrap_or_default()
            .iter()
            .filter_map(|line| classify(line))
            .collect();
        self.cursor = self.cursor.max(lines.len());
        events
    }
}
