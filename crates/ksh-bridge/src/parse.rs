//! Parsers for the debugger's textual replies.
//!
//! The debugger has no structured output, so each parser keys on the
//! fixed shapes kshdb prints: echoed tag lines, backtrace columns and
//! "Breakpoint N set ..." confirmations.

use std::path::Path;

use ksh_config::paths;
use ksh_dap::Source;

use crate::line_log::Reply;

/// Opaque value attached to sources the adapter resolved itself.
pub const ADAPTER_DATA: &str = "ksh-adapter-data";

/// Leading integer of `text`, ignoring leading whitespace and anything
/// after the digits.
pub fn leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let digits_from = usize::from(text.starts_with(['-', '+']));
    let digits = text[digits_from..]
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(text.len(), |(i, _)| i + digits_from);
    if digits == digits_from {
        return None;
    }
    text[..digits].parse().ok()
}

/// Parent pid printed by the launch probe on the line before the marker.
pub fn process_id(reply: &Reply) -> Option<u32> {
    reply.last().and_then(|line| line.trim().parse().ok())
}

/// Outcome of one `break` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointReply {
    /// `Breakpoint <id> set in file <path>, line <line>.`
    Set { id: i64, line: i64 },
    /// The debugger answered with something else, usually an error.
    Rejected(String),
}

/// Every line that directly follows a `break <...> ` tag.
pub fn breakpoints(reply: &Reply) -> Vec<BreakpointReply> {
    reply
        .pairs()
        .filter(|(tag, _)| is_tag(tag, "break <"))
        .map(|(_, line)| breakpoint_line(line))
        .collect()
}

fn breakpoint_line(line: &str) -> BreakpointReply {
    let nodes: Vec<&str> = line.split(' ').collect();
    let id = nodes.get(1).and_then(|n| leading_int(n));
    let number = nodes
        .last()
        .and_then(|n| leading_int(&n.replace('.', "")));
    match (id, number) {
        (Some(id), Some(line)) if nodes.len() > 2 => BreakpointReply::Set { id, line },
        _ => BreakpointReply::Rejected(line.to_string()),
    }
}

/// One backtrace entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Two-digit frame number from columns 2..4.
    pub index: i64,
    /// The whole backtrace line.
    pub text: String,
    /// Path between the last backquote and the last single quote.
    pub path: Option<String>,
    pub line: i64,
}

/// Parse a backtrace line such as ``##1 in foo() at `/tmp/a.sh'  12``.
pub fn stack_frame(text: &str) -> Option<Frame> {
    let column: String = text.chars().skip(2).take(2).collect();
    let index = leading_int(&column)?;
    let line = leading_int(&text[text.rfind(' ')? + 1..])?;
    let path = match (text.rfind('`'), text.rfind('\'')) {
        (Some(open), Some(close)) if open < close => Some(text[open + 1..close].to_string()),
        _ => None,
    };
    Some(Frame {
        index,
        text: text.to_string(),
        path,
        line,
    })
}

/// Every parseable line of a backtrace reply.
pub fn stack_frames(reply: &Reply) -> Vec<Frame> {
    reply
        .lines
        .iter()
        .filter_map(|line| {
            let frame = stack_frame(line);
            if frame.is_none() {
                tracing::debug!(line = %line, "skipping unparseable backtrace line");
            }
            frame
        })
        .collect()
}

/// Host-side source for a frame path, if the file exists on the host.
///
/// Relative paths are resolved against `cwd`.
pub fn frame_source(path: &str, cwd: &Path) -> Option<Source> {
    let host = paths::to_host_path(path);
    let resolved = paths::absolutize(Path::new(&host), cwd);
    if !resolved.exists() {
        return None;
    }
    Some(Source {
        name: resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
        path: Some(resolved.to_string_lossy().into_owned()),
        source_reference: None,
        adapter_data: Some(serde_json::Value::String(ADAPTER_DATA.to_string())),
    })
}

/// `(name, value)` for every line that follows an `examine <...> ` tag.
///
/// The name is the tag text up to the first `#`.
pub fn variables(reply: &Reply) -> Vec<(String, String)> {
    reply
        .pairs()
        .filter(|(tag, _)| is_tag(tag, "examine <"))
        .map(|(tag, value)| {
            let name = tag
                .replacen("examine <", "", 1)
                .replacen("> ", "", 1);
            let name = name
                .split('#')
                .next()
                .unwrap_or_default()
                .trim_end_matches([' ', '\\'])
                .to_string();
            (name, value.to_string())
        })
        .collect()
}

/// The first reply line, single-quoted.
pub fn evaluation(reply: &Reply) -> String {
    format!("'{}'", reply.lines.first().map(String::as_str).unwrap_or(""))
}

/// A `::KEY::VALUE` line from the proxy's diagnostic stream.
pub fn side_channel(line: &str) -> Option<(&str, &str)> {
    let nodes: Vec<&str> = line.trim_end_matches(['\r', '\n']).split("::").collect();
    match nodes.as_slice() {
        [_, key, value] => Some((*key, *value)),
        _ => None,
    }
}

fn is_tag(line: &str, prefix: &str) -> bool {
    line.starts_with(prefix) && line.find("> ").is_some_and(|i| i > 0)
}
