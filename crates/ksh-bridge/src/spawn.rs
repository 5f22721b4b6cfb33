//! Shell scripts the adapter runs and the processes that run them.
//!
//! The debugger does not talk to the adapter directly. A small proxy
//! script creates two FIFOs; kshdb is started with `--tty`/`--tty_in`
//! pointing at them, and the proxy relays between the FIFOs and its own
//! stdio, which the adapter owns.

use std::process::{ExitStatus, Stdio};

use ksh_config::LaunchConfig;
use ksh_dap::{AdapterEvent, DapSender, OutputCategory};
use rand::Rng;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::error::BridgeError;

/// Title of the terminal the debuggee runs in for `runInTerminal`.
pub const TERMINAL_TITLE: &str = "Ksh Debug Console";

const FIFO_PREFIX: &str = "/tmp/vscode-ksh-debug-fifo-";

/// A fresh FIFO path. The reply FIFO is this path plus `_in`.
pub fn fifo_path() -> String {
    let suffix: u32 = rand::rng().random_range(10000..20000);
    format!("{FIFO_PREFIX}{suffix}")
}

/// Proxy between the adapter's pipes and the debugger's FIFOs.
///
/// Reports its own pid as `::PROXYID::<pid>` on stderr and removes both
/// FIFOs on exit.
pub fn proxy_script(config: &LaunchConfig, fifo: &str) -> String {
    let cat = &config.path_cat;
    let mkfifo = &config.path_mkfifo;
    format!(
        r#"cleanup()
{{
    exit_code=$?
    trap '' ERR INT TERM EXIT
    exec 4>&-
    rm "{fifo}_in"
    rm "{fifo}"
    exit $exit_code
}}
echo "::PROXYID::$$" >&2
trap 'cleanup' ERR INT TERM EXIT
"{mkfifo}" "{fifo}"
"{mkfifo}" "{fifo}_in"

"{cat}" "{fifo}" &
exec 4>"{fifo}"
"{cat}" >"{fifo}_in""#
    )
}

/// Command line that starts kshdb on `program` once the FIFOs exist.
pub fn debugger_command(config: &LaunchConfig, fifo: &str) -> String {
    let exports: String = config
        .env
        .iter()
        .map(|(key, value)| format!("export {key}='{}';", value.replace('\'', "'\\''")))
        .collect();
    let mut kshdb = format!(
        "\"{}\" \"{}\" --quiet --tty \"{fifo}\" --tty_in \"{fifo}_in\" --library \"{}\" -- \"{}\"",
        config.path_ksh,
        config.path_kshdb,
        config.path_kshdb_lib,
        config.program_effective(),
    );
    for arg in &config.args {
        kshdb.push_str(&format!(" \"{}\"", arg.replace('"', "\\\"")));
    }
    [
        format!("{exports}cd \"{}\"", config.cwd_effective()),
        format!("while [[ ! -p \"{fifo}\" ]]; do sleep 0.25; done"),
        kshdb,
    ]
    .join("; ")
}

/// Signal the debugger's process group so the debuggee stops.
pub fn interrupt_script(path_pkill: &str, debugger_ppid: u32) -> String {
    format!("{path_pkill} -INT -P {debugger_ppid} -f kshdb")
}

/// Kill the debugger and stop the proxy's children.
pub fn kill_script(path_pkill: &str, debugger_ppid: Option<u32>, proxy_id: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(ppid) = debugger_ppid {
        parts.push(format!("{path_pkill} -KILL -P \"{ppid}\""));
    }
    if let Some(proxy) = proxy_id {
        parts.push(format!("{path_pkill} -TERM -P \"{proxy}\""));
    }
    parts.join("; ")
}

/// Full argv that runs `script` with `path_ksh`. On Windows hosts the
/// shell is started inside WSL.
pub fn launcher_args(path_ksh: &str, script: &str) -> Vec<String> {
    let mut argv = Vec::with_capacity(4);
    if cfg!(windows) {
        argv.push("wsl.exe".to_string());
    }
    argv.push(path_ksh.to_string());
    argv.push("-c".to_string());
    argv.push(script.to_string());
    argv
}

/// A command running `script`, with every stdio stream piped.
pub fn script_command(path_ksh: &str, script: &str) -> Command {
    let argv = launcher_args(path_ksh, script);
    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    command
}

pub fn spawn_script(path_ksh: &str, script: &str) -> Result<Child, BridgeError> {
    script_command(path_ksh, script)
        .spawn()
        .map_err(|source| BridgeError::Spawn {
            program: path_ksh.to_string(),
            source,
        })
}

/// Decode the longest valid UTF-8 prefix of `pending`, leaving an
/// incomplete trailing sequence for the next read.
pub fn take_utf8(pending: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(pending.as_slice()) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    };
    let rest = pending.split_off(valid);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    text
}

/// Copy everything `reader` produces into `output` events.
pub fn forward_output<R>(mut reader: R, sender: DapSender, category: OutputCategory)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        let mut pending = Vec::new();
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    let text = take_utf8(&mut pending);
                    if text.is_empty() {
                        continue;
                    }
                    if sender.send_event(AdapterEvent::output(category, text)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::debug!("helper output closed: {e}");
                    break;
                }
            }
        }
        if !pending.is_empty() {
            let rest = String::from_utf8_lossy(&pending).into_owned();
            let _ = sender.send_event(AdapterEvent::output(category, rest));
        }
    });
}

/// Start `script` with its stdout and stderr forwarded to the client.
pub fn spawn_forwarded(
    path_ksh: &str,
    script: &str,
    sender: &DapSender,
    stdout: OutputCategory,
    stderr: OutputCategory,
) -> Result<Child, BridgeError> {
    let mut child = spawn_script(path_ksh, script)?;
    if let Some(out) = child.stdout.take() {
        forward_output(out, sender.clone(), stdout);
    }
    if let Some(err) = child.stderr.take() {
        forward_output(err, sender.clone(), stderr);
    }
    Ok(child)
}

/// Run a helper script to completion, its output going to the console.
pub async fn run_helper(
    path_ksh: &str,
    script: &str,
    sender: &DapSender,
) -> Result<ExitStatus, BridgeError> {
    tracing::debug!(script, "running helper");
    let mut child = spawn_forwarded(
        path_ksh,
        script,
        sender,
        OutputCategory::Console,
        OutputCategory::Console,
    )?;
    drop(child.stdin.take());
    Ok(child.wait().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksh_config::{ResolveContext, TerminalKind, ToolDefaults};
    use std::path::PathBuf;
    use tokio::io::AsyncWriteExt;

    fn config() -> LaunchConfig {
        let ctx = ResolveContext {
            adapter_dir: PathBuf::from("/opt/ksh-debug"),
            workspace_dir: PathBuf::from("/work"),
            defaults: ToolDefaults::default(),
        };
        LaunchConfig::resolve(
            serde_json::json!({
                "program": "/work/a.sh",
                "args": ["one", "say \"hi\""],
                "env": { "GREETING": "it's" },
                "pathPkill": "pkill",
                "terminalKind": "debugConsole"
            }),
            &ctx,
        )
        .unwrap()
    }

    #[test]
    fn fifo_paths_are_randomized_in_range() {
        for _ in 0..20 {
            let path = fifo_path();
            let suffix: u32 = path.strip_prefix(FIFO_PREFIX).unwrap().parse().unwrap();
            assert!((10000..20000).contains(&suffix));
        }
    }

    #[test]
    fn proxy_reports_its_pid_and_relays_fifos() {
        let script = proxy_script(&config(), "/tmp/f");
        assert!(script.contains("echo \"::PROXYID::$$\" >&2"));
        assert!(script.contains("\"mkfifo\" \"/tmp/f_in\""));
        assert!(script.contains("\"cat\" \"/tmp/f\" &"));
        assert!(script.contains("exec 4>\"/tmp/f\""));
        assert!(script.ends_with("\"cat\" >\"/tmp/f_in\""));
    }

    #[cfg(unix)]
    #[test]
    fn debugger_command_line() {
        let cfg = config();
        assert_eq!(cfg.terminal_kind, TerminalKind::DebugConsole);
        let command = debugger_command(&cfg, "/tmp/f");
        assert_eq!(
            command,
            "export GREETING='it'\\''s';cd \"/work\"; \
             while [[ ! -p \"/tmp/f\" ]]; do sleep 0.25; done; \
             \"ksh\" \"/opt/ksh-debug/kshdb_dir/kshdb\" --quiet --tty \"/tmp/f\" \
             --tty_in \"/tmp/f_in\" --library \"/opt/ksh-debug/kshdb_dir\" -- \"/work/a.sh\" \
             \"one\" \"say \\\"hi\\\"\""
        );
    }

    #[test]
    fn pkill_scripts() {
        assert_eq!(interrupt_script("pkill", 77), "pkill -INT -P 77 -f kshdb");
        assert_eq!(
            kill_script("pkill", Some(77), Some("88")),
            "pkill -KILL -P \"77\"; pkill -TERM -P \"88\""
        );
        assert_eq!(kill_script("pkill", None, None), "");
    }

    #[cfg(unix)]
    #[test]
    fn launcher_runs_script_with_ksh() {
        assert_eq!(launcher_args("ksh", "true"), vec!["ksh", "-c", "true"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_helper_forwards_output_and_status() {
        let (sender, mut rx) = DapSender::new();
        let status = run_helper("sh", "echo hello; exit 3", &sender).await.unwrap();
        assert_eq!(status.code(), Some(3));

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event["event"], "output");
        assert_eq!(event["body"]["category"], "console");
        assert_eq!(event["body"]["output"], "hello\n");
    }

    #[tokio::test]
    async fn missing_shell_is_a_spawn_error() {
        let err = spawn_script("/nonexistent/ksh-debug-test-shell", "true").unwrap_err();
        assert!(matches!(err, BridgeError::Spawn { .. }));
    }

    #[test]
    fn utf8_split_across_reads_is_carried() {
        let mut pending = "é".as_bytes()[..1].to_vec();
        assert_eq!(take_utf8(&mut pending), "");
        assert_eq!(pending.len(), 1);
        pending.push("é".as_bytes()[1]);
        assert_eq!(take_utf8(&mut pending), "é");
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn forwarded_output_keeps_split_characters() {
        let (sender, mut rx) = DapSender::new();
        let (mut write, read) = tokio::io::duplex(64);
        forward_output(read, sender, OutputCategory::Stdout);

        let bytes = "café\n".as_bytes();
        let split = bytes.len() - 2;
        write.write_all(&bytes[..split]).await.unwrap();
        write.flush().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        write.write_all(&bytes[split..]).await.unwrap();
        drop(write);

        let mut seen = String::new();
        while let Some(message) = rx.recv().await {
            let chunk = message["body"]["output"].as_str().unwrap_or_default().to_string();
            assert!(!chunk.contains('\u{FFFD}'), "split character was mangled: {chunk:?}");
            assert_eq!(message["body"]["category"], "stdout");
            seen.push_str(&chunk);
        }
        assert_eq!(seen, "café\n");
    }
}
