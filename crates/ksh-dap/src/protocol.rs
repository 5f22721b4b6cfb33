//! Debug Adapter Protocol messages, limited to what a kshdb bridge sends
//! and receives.
//!
//! Inbound requests are decoded into [`Command`]; outbound traffic is
//! built from the body types and [`AdapterEvent`]. Field names follow the
//! protocol's camelCase JSON through serde.

use serde::{Deserialize, Serialize};

use crate::error::DapError;

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// A request from the client, or a reverse request to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub seq: i64,
    /// `"request"`.
    #[serde(rename = "type")]
    pub message_type: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

/// The answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub seq: i64,
    /// `"response"`.
    #[serde(rename = "type")]
    pub message_type: String,
    /// `seq` of the request being answered.
    pub request_seq: i64,
    pub success: bool,
    pub command: String,
    /// Shown to the user when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// An unsolicited notification to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub seq: i64,
    /// `"event"`.
    #[serde(rename = "type")]
    pub message_type: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Decoded requests
// ---------------------------------------------------------------------------

/// What the client asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Initialize(InitializeRequestArguments),
    /// Raw attributes; their shape belongs to the adapter.
    Launch(serde_json::Value),
    ConfigurationDone,
    Disconnect(DisconnectArguments),
    SetBreakpoints(SetBreakpointsArguments),
    Threads,
    StackTrace(StackTraceArguments),
    Scopes(ScopesArguments),
    Variables(VariablesArguments),
    Continue(ThreadArguments),
    Next(ThreadArguments),
    StepIn(ThreadArguments),
    StepOut(ThreadArguments),
    Evaluate(EvaluateArguments),
    Pause(ThreadArguments),
    /// Any command outside this list, by name.
    Unsupported(String),
}

impl Request {
    /// Decode `command` and `arguments`.
    ///
    /// Missing arguments decode as an empty object, so requests whose
    /// fields are all optional need not send any.
    pub fn to_command(&self) -> Result<Command, DapError> {
        Ok(match self.command.as_str() {
            "initialize" => Command::Initialize(self.arguments()?),
            "launch" => Command::Launch(self.raw_arguments()),
            "configurationDone" => Command::ConfigurationDone,
            "disconnect" => Command::Disconnect(self.arguments()?),
            "setBreakpoints" => Command::SetBreakpoints(self.arguments()?),
            "threads" => Command::Threads,
            "stackTrace" => Command::StackTrace(self.arguments()?),
            "scopes" => Command::Scopes(self.arguments()?),
            "variables" => Command::Variables(self.arguments()?),
            "continue" => Command::Continue(self.arguments()?),
            "next" => Command::Next(self.arguments()?),
            "stepIn" => Command::StepIn(self.arguments()?),
            "stepOut" => Command::StepOut(self.arguments()?),
            "evaluate" => Command::Evaluate(self.arguments()?),
            "pause" => Command::Pause(self.arguments()?),
            other => Command::Unsupported(other.to_string()),
        })
    }

    fn raw_arguments(&self) -> serde_json::Value {
        self.arguments
            .clone()
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()))
    }

    fn arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T, DapError> {
        serde_json::from_value(self.raw_arguments()).map_err(|e| DapError::InvalidArguments {
            command: self.command.clone(),
            message: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Request arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitializeRequestArguments {
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(rename = "adapterID")]
    pub adapter_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_start_at1: Option<bool>,
    /// Whether `runInTerminal` reverse requests will be honoured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_run_in_terminal_request: Option<bool>,
}

/// Features announced in the `initialize` response. Unset entries are
/// omitted and read as `false` by clients.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_configuration_done_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_conditional_breakpoints: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_evaluate_for_hovers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_step_back: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_set_variable: Option<bool>,
}

/// Every breakpoint of one file; the list replaces what was set before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsArguments {
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoints: Option<Vec<SourceBreakpoint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakpoint {
    pub line: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    /// Expression that must hold for the breakpoint to stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceArguments {
    pub thread_id: i64,
    /// Index of the first frame to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<i64>,
    /// Maximum frames to return; absent or 0 means all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesArguments {
    pub frame_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesArguments {
    pub variables_reference: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

/// Arguments of the requests that only name a thread: `continue`, `next`,
/// `stepIn`, `stepOut` and `pause`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadArguments {
    pub thread_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArguments {
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
    /// Where the expression comes from, e.g. `"hover"` or `"repl"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisconnectArguments {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminate_debuggee: Option<bool>,
}

/// Reverse request asking the client to run a command line in a terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInTerminalRequestArguments {
    /// `"integrated"` or `"external"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub cwd: String,
    /// Program followed by its arguments.
    pub args: Vec<String>,
}

// ---------------------------------------------------------------------------
// Debugger state as reported to the client
// ---------------------------------------------------------------------------

/// Outcome of one requested breakpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    /// Debugger-assigned id, absent when the breakpoint was refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub verified: bool,
    /// Why the breakpoint could not be set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Line the debugger actually used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub id: i64,
    pub name: String,
    /// Absent when the frame's file cannot be shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    pub line: i64,
    pub column: i64,
}

/// A file as the client knows it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<i64>,
    /// Opaque to the client, which hands it back unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub name: String,
    /// Handle passed back in `variables` requests.
    pub variables_reference: i64,
    pub expensive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    pub value: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<String>,
    /// Zero for values without children.
    pub variables_reference: i64,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// One entry per requested breakpoint, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetBreakpointsResponseBody {
    pub breakpoints: Vec<Breakpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadsResponseBody {
    pub threads: Vec<Thread>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceResponseBody {
    /// The requested page.
    pub stack_frames: Vec<StackFrame>,
    /// Size of the whole stack, not of the page.
    pub total_frames: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopesResponseBody {
    pub scopes: Vec<Scope>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariablesResponseBody {
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponseBody {
    pub result: String,
    pub variables_reference: i64,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// The debugger reported a new location.
    Breakpoint,
    /// The debuggee caught a signal.
    Pause,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    pub reason: StopReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_threads_stopped: Option<bool>,
}

/// Where the client files an `output` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputCategory {
    /// The debug console.
    Console,
    /// Adapter diagnostics; clients usually hide these.
    Telemetry,
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEventBody {
    pub category: OutputCategory,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TerminatedEventBody {
    /// Set to ask the client to restart the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<serde_json::Value>,
}

/// Events this adapter emits.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    /// Ready for configuration requests such as `setBreakpoints`.
    Initialized,
    Stopped(StoppedEventBody),
    Terminated(TerminatedEventBody),
    Output(OutputEventBody),
}

impl AdapterEvent {
    pub fn output(category: OutputCategory, text: impl Into<String>) -> Self {
        AdapterEvent::Output(OutputEventBody {
            category,
            output: text.into(),
        })
    }

    /// Value of the event's `event` field.
    pub fn name(&self) -> &'static str {
        match self {
            AdapterEvent::Initialized => "initialized",
            AdapterEvent::Stopped(_) => "stopped",
            AdapterEvent::Terminated(_) => "terminated",
            AdapterEvent::Output(_) => "output",
        }
    }

    pub fn body(&self) -> Option<serde_json::Value> {
        let body = match self {
            AdapterEvent::Initialized => return None,
            AdapterEvent::Stopped(body) => serde_json::to_value(body),
            AdapterEvent::Terminated(body) => serde_json::to_value(body),
            AdapterEvent::Output(body) => serde_json::to_value(body),
        };
        body.ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn request(command: &str, arguments: Option<serde_json::Value>) -> Request {
        Request {
            seq: 1,
            message_type: "request".into(),
            command: command.into(),
            arguments,
        }
    }

    #[test]
    fn protocol_initialize_arguments_use_uppercase_ids() {
        let json = serde_json::json!({
            "clientID": "vscode",
            "adapterID": "kshdb",
            "linesStartAt1": true
        });
        let args: InitializeRequestArguments = serde_json::from_value(json).unwrap();
        assert_eq!(args.client_id.as_deref(), Some("vscode"));
        assert_eq!(args.adapter_id, "kshdb");
        assert_eq!(args.lines_start_at1, Some(true));
    }

    #[test]
    fn protocol_command_set_breakpoints() {
        let req = request(
            "setBreakpoints",
            Some(serde_json::json!({
                "source": { "path": "/tmp/a.sh" },
                "breakpoints": [{ "line": 10 }, { "line": 20, "condition": "$x == 1" }]
            })),
        );
        match req.to_command().unwrap() {
            Command::SetBreakpoints(args) => {
                assert_eq!(args.source.path.as_deref(), Some("/tmp/a.sh"));
                let bps = args.breakpoints.unwrap();
                assert_eq!(bps.len(), 2);
                assert_eq!(bps[1].condition.as_deref(), Some("$x == 1"));
            }
            other => panic!("expected setBreakpoints, got {other:?}"),
        }
    }

    #[test]
    fn protocol_command_without_arguments() {
        assert_eq!(request("threads", None).to_command().unwrap(), Command::Threads);
        assert_eq!(
            request("disconnect", None).to_command().unwrap(),
            Command::Disconnect(DisconnectArguments::default())
        );
    }

    #[test]
    fn protocol_command_launch_keeps_raw_arguments() {
        let req = request("launch", Some(serde_json::json!({ "program": "/tmp/a.sh" })));
        match req.to_command().unwrap() {
            Command::Launch(value) => assert_eq!(value["program"], "/tmp/a.sh"),
            other => panic!("expected launch, got {other:?}"),
        }
    }

    #[test]
    fn protocol_command_bad_arguments_rejected() {
        let req = request("stackTrace", Some(serde_json::json!({ "levels": 3 })));
        let err = req.to_command().unwrap_err();
        assert!(matches!(err, DapError::InvalidArguments { ref command, .. } if command == "stackTrace"));
    }

    #[test]
    fn protocol_thread_only_requests_share_arguments() {
        let args = serde_json::json!({ "threadId": 42 });
        for (name, expected) in [
            ("continue", Command::Continue(ThreadArguments { thread_id: 42 })),
            ("next", Command::Next(ThreadArguments { thread_id: 42 })),
            ("stepIn", Command::StepIn(ThreadArguments { thread_id: 42 })),
            ("stepOut", Command::StepOut(ThreadArguments { thread_id: 42 })),
            ("pause", Command::Pause(ThreadArguments { thread_id: 42 })),
        ] {
            assert_eq!(request(name, Some(args.clone())).to_command().unwrap(), expected);
        }
    }

    #[test]
    fn protocol_command_unsupported() {
        let req = request("stepBack", Some(serde_json::json!({ "threadId": 42 })));
        assert_eq!(
            req.to_command().unwrap(),
            Command::Unsupported("stepBack".into())
        );
    }

    #[test]
    fn protocol_stack_trace_body_field_names() {
        let body = StackTraceResponseBody {
            stack_frames: vec![StackFrame {
                id: 0,
                name: "#0 in main".into(),
                source: Some(Source {
                    name: Some("a.sh".into()),
                    path: Some("/tmp/a.sh".into()),
                    ..Default::default()
                }),
                line: 12,
                column: 0,
            }],
            total_frames: 1,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["totalFrames"], 1);
        assert_eq!(json["stackFrames"][0]["source"]["path"], "/tmp/a.sh");
        assert!(json["stackFrames"][0]["source"].get("sourceReference").is_none());
    }

    #[test]
    fn protocol_variable_type_renamed() {
        let var = Variable {
            name: "$PWD".into(),
            value: "/home/user".into(),
            variable_type: Some("string".into()),
            variables_reference: 0,
        };
        let json = serde_json::to_value(&var).unwrap();
        assert_eq!(json["type"], "string");
        assert_eq!(json["variablesReference"], 0);
    }

    #[test]
    fn protocol_adapter_event_names_and_bodies() {
        let stopped = AdapterEvent::Stopped(StoppedEventBody {
            reason: StopReason::Breakpoint,
            description: None,
            thread_id: Some(42),
            all_threads_stopped: None,
        });
        assert_eq!(stopped.name(), "stopped");
        let body = stopped.body().unwrap();
        assert_eq!(body["reason"], "breakpoint");
        assert_eq!(body["threadId"], 42);

        assert_eq!(AdapterEvent::Initialized.name(), "initialized");
        assert!(AdapterEvent::Initialized.body().is_none());

        let output = AdapterEvent::output(OutputCategory::Telemetry, "Sending StoppedEvent");
        assert_eq!(output.body().unwrap()["category"], "telemetry");
    }

    #[test]
    fn protocol_capabilities_skip_unset() {
        let caps = Capabilities {
            supports_conditional_breakpoints: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_string(&caps).unwrap();
        assert_eq!(json, r#"{"supportsConditionalBreakpoints":true}"#);
    }
}
