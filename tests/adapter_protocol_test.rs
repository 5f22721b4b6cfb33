use std::process::Stdio;
use std::time::Duration;

use ksh_dap::MessageReader;
use serde_json::{json, Value};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

// ── Drives the real binary over its stdin/stdout ────────────────

struct Adapter {
    child: Child,
    stdin: ChildStdin,
    reader: MessageReader<BufReader<ChildStdout>>,
    _home: tempfile::TempDir,
}

impl Adapter {
    fn start() -> Adapter {
        let home = tempfile::tempdir().unwrap();
        let mut child = Command::new(env!("CARGO_BIN_EXE_ksh-debug-adapter"))
            .env("HOME", home.path())
            .env("KSH_DEBUG_LOG", "debug")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let stdin = child.stdin.take().unwrap();
        let stdout = child.stdout.take().unwrap();
        Adapter {
            child,
            stdin,
            reader: MessageReader::new(BufReader::new(stdout)),
            _home: home,
        }
    }

    async fn send(&mut self, seq: i64, command: &str, arguments: Value) {
        self.send_message(json!({
            "seq": seq,
            "type": "request",
            "command": command,
            "arguments": arguments,
        }))
        .await;
    }

    async fn send_message(&mut self, message: Value) {
        let body = message.to_string();
        let frame = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        self.stdin.write_all(frame.as_bytes()).await.unwrap();
        self.stdin.flush().await.unwrap();
    }

    async fn next_message(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(10), self.reader.read_message())
            .await
            .expect("adapter did not answer")
            .unwrap()
            .expect("adapter closed stdout")
    }

    async fn response(&mut self, request_seq: i64) -> Value {
        loop {
            let message = self.next_message().await;
            if message["type"] == "response" && message["request_seq"] == request_seq {
                return message;
            }
        }
    }
}

#[tokio::test]
async fn initialize_reports_capabilities() {
    let mut adapter = Adapter::start();
    adapter
        .send(1, "initialize", json!({ "adapterID": "ksh", "linesStartAt1": true }))
        .await;
    let response = adapter.response(1).await;
    assert_eq!(response["success"], true);
    assert_eq!(response["command"], "initialize");
    assert_eq!(response["body"]["supportsConditionalBreakpoints"], true);
    assert_eq!(response["body"]["supportsEvaluateForHovers"], true);
    assert_eq!(response["body"]["supportsConfigurationDoneRequest"], false);
}

#[tokio::test]
async fn threads_and_rejected_launch() {
    let mut adapter = Adapter::start();
    adapter.send(1, "threads", json!({})).await;
    let response = adapter.response(1).await;
    assert_eq!(response["body"]["threads"][0]["id"], 42);

    adapter
        .send(2, "launch", json!({ "scriptPath": "/tmp/a.sh" }))
        .await;
    let response = adapter.response(2).await;
    assert_eq!(response["success"], false);
    assert!(response["message"].as_str().unwrap().contains("program"));

    adapter.send(3, "launch", json!({})).await;
    let response = adapter.response(3).await;
    assert_eq!(response["success"], false);
    assert_eq!(
        response["message"],
        "Please specify \"program\" in launch.json."
    );
}

#[tokio::test]
async fn failed_terminal_request_reaches_the_console() {
    let mut adapter = Adapter::start();
    adapter
        .send_message(json!({
            "seq": 1,
            "type": "response",
            "request_seq": 7,
            "command": "runInTerminal",
            "success": false,
            "message": "terminal refused",
        }))
        .await;
    adapter.send(2, "threads", json!({})).await;

    let event = adapter.next_message().await;
    assert_eq!(event["type"], "event");
    assert_eq!(event["event"], "output");
    assert_eq!(event["body"]["category"], "console");
    let shown: Value = serde_json::from_str(event["body"]["output"].as_str().unwrap()).unwrap();
    assert_eq!(shown["command"], "runInTerminal");
    assert_eq!(shown["message"], "terminal refused");

    let response = adapter.response(2).await;
    assert_eq!(response["success"], true);
}

#[tokio::test]
async fn disconnect_ends_the_process() {
    let mut adapter = Adapter::start();
    adapter.send(1, "disconnect", json!({})).await;
    let response = adapter.response(1).await;
    assert_eq!(response["success"], true);

    let status = tokio::time::timeout(Duration::from_secs(10), adapter.child.wait())
        .await
        .expect("adapter kept running after disconnect")
        .unwrap();
    assert!(status.success());
}

#[tokio::test]
async fn closing_stdin_ends_the_process() {
    let Adapter {
        mut child,
        stdin,
        _home,
        ..
    } = Adapter::start();
    drop(stdin);
    let status = tokio::time::timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("adapter kept running after stdin closed")
        .unwrap();
    assert!(status.success());
}
