//! Text sent to the debugger, the sentinel that ends every reply, and the
//! lock that keeps one command in flight at a time.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Initial end-of-reply marker, strengthened after the first round trip.
pub const BASE_MARKER: &str = "############################################################";

/// Sent once the debugged program has terminated.
pub const QUIT: &str = "\nq\n";

/// Expressions shown in the `Local` scope.
pub const VARIABLE_CATALOG: [&str; 2] = ["$PWD", "$? \\# from '$_Dbg_last_ksh_command'"];

// ---------------------------------------------------------------------------
// Sentinel
// ---------------------------------------------------------------------------

/// The line the debugger prints after finishing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    marker: String,
    strengthened: bool,
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::new()
    }
}

impl Sentinel {
    pub fn new() -> Self {
        Self {
            marker: BASE_MARKER.to_string(),
            strengthened: false,
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Prefix the marker with the debugger's parent process id. Only the
    /// first call has an effect.
    pub fn strengthen(&mut self, pid: u32) {
        if self.strengthened {
            return;
        }
        self.marker = format!("{pid}{}", self.marker);
        self.strengthened = true;
    }

    #[cfg(test)]
    fn is_strengthened(&self) -> bool {
        self.strengthened
    }

    /// `text` followed by the instruction that prints the marker.
    pub fn terminate(&self, text: &str) -> String {
        format!("{text}print '{}'\n", self.marker)
    }
}

// ---------------------------------------------------------------------------
// Command lock
// ---------------------------------------------------------------------------

/// Serializes command/reply conversations with the debugger.
#[derive(Debug, Clone, Default)]
pub struct CommandMutex {
    inner: Arc<Mutex<()>>,
}

/// Exclusive use of the debugger's command channel until dropped.
#[derive(Debug)]
pub struct CommandPermit {
    _guard: OwnedMutexGuard<()>,
}

impl CommandMutex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> CommandPermit {
        CommandPermit {
            _guard: self.inner.clone().lock_owned().await,
        }
    }

    #[cfg(test)]
    fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Escape client text used as a bare debugger argument.
///
/// Quotes, command separators, redirections, substitutions and whitespace
/// are backslash-escaped; line breaks are dropped so the text cannot start
/// a new command. `$` is left alone so variable references still expand.
pub fn escape_arg(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' | '\r' => {}
            '\\' | '\'' | '"' | ';' | '&' | '|' | '<' | '>' | '`' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_whitespace() => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Make `text` safe inside a single-quoted `print` argument.
pub fn quote_literal(text: &str) -> String {
    text.replace(['\n', '\r'], " ").replace('\'', "'\\''")
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Debugger stepping commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Next,
    StepIn,
    StepOut,
}

impl Step {
    pub fn repl_command(self) -> &'static str {
        match self {
            Step::Continue => "continue",
            Step::Next => "next",
            Step::StepIn => "step",
            Step::StepOut => "finish",
        }
    }
}

/// First command after launch: reports versions, prints the debugger's
/// parent pid on the line before the marker, and makes SIGINT stop the
/// program instead of killing it.
pub fn launch_probe() -> &'static str {
    "examine Debug environment: ksh_ver=$KSH_VERSION, kshdb_ver=$_Dbg_release, program=$0, args=$*\nprint \"$PPID\"\nhandle INT stop\n"
}

/// A breakpoint requested by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointRequest {
    pub line: i64,
    pub condition: Option<String>,
}

/// Replace every breakpoint in `path` (already escaped for the debugger).
///
/// `previous` is `None` when the file was never seen, which loads it first.
/// Each `break` is preceded by an echoed `break <...> ` tag line the reply
/// parser keys on.
pub fn set_breakpoints(
    path: &str,
    previous: Option<&[i64]>,
    breakpoints: &[BreakpointRequest],
    show_debug_output: bool,
) -> String {
    let mut text = String::new();
    match previous {
        None => text.push_str(&format!("load {path}\n")),
        Some(ids) if !ids.is_empty() => {
            let ids = ids
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            text.push_str(&format!("print 'delete <{ids}>'\ndelete {ids}\nyes\n"));
        }
        Some(_) => {}
    }

    for bp in breakpoints {
        let condition = bp.condition.as_deref().unwrap_or_default();
        let tag = quote_literal(&format!("break <{path}:{} {condition}> ", bp.line));
        text.push_str(&format!(
            "print '{tag}'\nbreak {path}:{} {}\n",
            bp.line,
            escape_arg(condition)
        ));
    }

    if show_debug_output {
        text.push_str("info files\ninfo breakpoints\n");
    }
    text
}

pub fn backtrace() -> &'static str {
    "print backtrace\nbacktrace\n"
}

/// Examine each catalog entry behind an `examine <...> ` tag line.
pub fn variables(entries: &[&str]) -> String {
    let mut text = String::from("info program\n");
    for entry in entries {
        text.push_str(&format!(
            "print '{}'\nexamine {entry}\n",
            quote_literal(&format!("examine <{entry}> "))
        ));
    }
    text
}

/// Evaluate client text. Hover requests drop quote characters first.
pub fn evaluate(expression: &str, hover: bool) -> String {
    let expression = if hover {
        expression.replace(['\'', '"'], "")
    } else {
        expression.to_string()
    };
    let expression = escape_arg(&expression);
    format!(
        "print '{}'\nexamine {expression}\n",
        quote_literal(&format!("examine <{expression}>"))
    )
}

pub fn step(step: Step) -> String {
    let command = step.repl_command();
    format!("print {command}\n{command}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_strengthens_once() {
        let mut sentinel = Sentinel::new();
        assert_eq!(sentinel.marker().len(), 60);
        sentinel.strengthen(4242);
        assert_eq!(sentinel.marker(), format!("4242{BASE_MARKER}"));
        sentinel.strengthen(7);
        assert!(sentinel.marker().starts_with("4242#"));
        assert!(sentinel.is_strengthened());
    }

    #[test]
    fn terminate_appends_marker_print() {
        let sentinel = Sentinel::new();
        assert_eq!(
            sentinel.terminate("backtrace\n"),
            format!("backtrace\nprint '{BASE_MARKER}'\n")
        );
    }

    #[tokio::test]
    async fn permit_is_exclusive_until_dropped() {
        let mutex = CommandMutex::new();
        let permit = mutex.acquire().await;
        assert!(mutex.is_busy());

        let contender = mutex.clone();
        let task = tokio::spawn(async move {
            let _permit = contender.acquire().await;
        });
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        drop(permit);
        task.await.unwrap();
        assert!(!mutex.is_busy());
    }

    #[test]
    fn escape_neutralizes_shell_syntax() {
        assert_eq!(escape_arg("a b"), "a\\ b");
        assert_eq!(escape_arg("x;rm -rf /"), "x\\;rm\\ -rf\\ /");
        assert_eq!(escape_arg("'q' \"d\""), "\\'q\\'\\ \\\"d\\\"");
        assert_eq!(escape_arg("$(id)`id`"), "$\\(id\\)\\`id\\`");
        assert_eq!(escape_arg("a\nb"), "ab");
        assert_eq!(escape_arg("$PWD"), "$PWD");
    }

    #[test]
    fn quote_literal_closes_and_reopens() {
        assert_eq!(quote_literal("it's"), "it'\\''s");
        assert_eq!(quote_literal("a\nb"), "a b");
    }

    #[test]
    fn first_breakpoint_request_loads_file() {
        let text = set_breakpoints(
            "/tmp/a.sh",
            None,
            &[BreakpointRequest {
                line: 10,
                condition: None,
            }],
            false,
        );
        assert_eq!(
            text,
            "load /tmp/a.sh\nprint 'break </tmp/a.sh:10 > '\nbreak /tmp/a.sh:10 \n"
        );
    }

    #[test]
    fn later_requests_delete_previous_ids() {
        let text = set_breakpoints(
            "/tmp/a.sh",
            Some(&[1, 2]),
            &[BreakpointRequest {
                line: 30,
                condition: Some("$x == 1".into()),
            }],
            true,
        );
        assert!(text.starts_with("print 'delete <1 2>'\ndelete 1 2\nyes\n"));
        assert!(text.contains("break /tmp/a.sh:30 $x\\ ==\\ 1\n"));
        assert!(text.ends_with("info files\ninfo breakpoints\n"));
        assert!(!text.contains("load"));
    }

    #[test]
    fn empty_set_on_known_file_sends_nothing() {
        assert_eq!(set_breakpoints("/tmp/a.sh", Some(&[]), &[], false), "");
    }

    #[test]
    fn variables_tags_each_entry() {
        let text = variables(&VARIABLE_CATALOG[..1]);
        assert_eq!(text, "info program\nprint 'examine <$PWD> '\nexamine $PWD\n");
    }

    #[test]
    fn hover_evaluation_drops_quotes() {
        assert_eq!(
            evaluate("\"$HOME\"", true),
            "print 'examine <$HOME>'\nexamine $HOME\n"
        );
        assert_eq!(
            evaluate("a b", false),
            "print 'examine <a\\ b>'\nexamine a\\ b\n"
        );
    }

    #[test]
    fn stepping_commands() {
        assert_eq!(step(Step::Continue), "print continue\ncontinue\n");
        assert_eq!(step(Step::StepIn), "print step\nstep\n");
        assert_eq!(step(Step::StepOut), "print finish\nfinish\n");
        assert_eq!(step(Step::Next), "print next\nnext\n");
    }
}
