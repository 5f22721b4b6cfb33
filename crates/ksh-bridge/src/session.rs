//! The session controller.
//!
//! One [`DebugSession`] serves one DAP client. Every request that talks to
//! the debugger takes the [`CommandMutex`], writes its command followed by
//! the sentinel `print`, and waits on the [`Signal`] until the sentinel line
//! shows up in the [`LineLog`]. The output reader task appends to the log,
//! raises unsolicited events and wakes the waiters.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ksh_config::{paths, LaunchConfig, ResolveContext};
use ksh_dap::{
    AdapterEvent, Breakpoint, Capabilities, Command, DapSender, DisconnectArguments,
    EvaluateArguments, EvaluateResponseBody, OutputCategory, Request, Response,
    RunInTerminalRequestArguments, Scope, ScopesResponseBody, SetBreakpointsArguments,
    SetBreakpointsResponseBody, StackFrame, StackTraceArguments, StackTraceResponseBody,
    StopReason, StoppedEventBody, TerminatedEventBody, Thread, ThreadArguments, ThreadsResponseBody,
    Variable,
    VariablesArguments, VariablesResponseBody,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, watch, Mutex};

use crate::command::{self, BreakpointRequest, CommandMutex, CommandPermit, Sentinel, Step};
use crate::error::BridgeError;
use crate::events::{DetectedEvent, EventDetector};
use crate::line_log::{LineLog, Reply};
use crate::parse::{self, BreakpointReply};
use crate::registry::BreakpointRegistry;
use crate::signal::Signal;
use crate::spawn::{self, take_utf8};
use crate::{validate, THREAD_ID};

/// How long `disconnect` waits for the proxy to exit.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Page size when the client does not ask for one.
const DEFAULT_PAGE: usize = 100;

const THREAD_NAME: &str = "Ksh thread";

/// Side-channel key under which the proxy reports its pid.
const PROXY_ID_KEY: &str = "PROXYID";

/// A debug session bridging one DAP client to one kshdb REPL.
///
/// Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct DebugSession {
    inner: Arc<Inner>,
}

struct Inner {
    sender: DapSender,
    context: ResolveContext,
    signal: Signal,
    commands: CommandMutex,
    state: Mutex<SessionState>,
    proxy_exited: watch::Sender<bool>,
}

#[derive(Default)]
struct SessionState {
    log: LineLog,
    detector: EventDetector,
    sentinel: Sentinel,
    registry: BreakpointRegistry,
    side_channel: HashMap<String, String>,
    debugger_ppid: Option<u32>,
    config: Option<LaunchConfig>,
    repl_input: Option<mpsc::UnboundedSender<String>>,
    disconnecting: bool,
}

impl SessionState {
    fn config(&self) -> Result<&LaunchConfig, BridgeError> {
        self.config.as_ref().ok_or(BridgeError::NotLaunched)
    }
}

impl DebugSession {
    pub fn new(sender: DapSender, context: ResolveContext) -> Self {
        let (proxy_exited, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                sender,
                context,
                signal: Signal::new(),
                commands: CommandMutex::new(),
                state: Mutex::new(SessionState::default()),
                proxy_exited,
            }),
        }
    }

    /// Whether the session has entered its closing state.
    pub fn is_closing(&self) -> bool {
        self.inner.signal.is_closing()
    }

    /// Serve one request. Failures become error responses.
    pub async fn handle(&self, request: Request) {
        let outcome = match request.to_command() {
            Ok(command) => self.dispatch(&request, command).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = outcome {
            tracing::warn!(command = %request.command, seq = request.seq, "request failed: {e}");
            if let Err(send) = self.inner.sender.respond_error(&request, e.to_string()) {
                tracing::debug!("could not answer request {}: {send}", request.seq);
            }
        }
    }

    /// Note the client's answer to a reverse request.
    ///
    /// A `runInTerminal` the client could not honour leaves the launch
    /// waiting on a debugger that never started, so the failure is shown
    /// on the console.
    pub fn handle_response(&self, response: &Response) {
        tracing::debug!(
            command = %response.command,
            success = response.success,
            "client answered reverse request"
        );
        if response.success || response.command != "runInTerminal" {
            return;
        }
        match serde_json::to_string(response) {
            Ok(json) => self.emit(AdapterEvent::output(OutputCategory::Console, json)),
            Err(e) => tracing::warn!("could not render the runInTerminal failure: {e}"),
        }
    }

    async fn dispatch(&self, request: &Request, command: Command) -> Result<(), BridgeError> {
        match command {
            Command::Initialize(args) => {
                tracing::info!(
                    client = args.client_name.as_deref().unwrap_or("unknown"),
                    adapter = %args.adapter_id,
                    "initialize"
                );
                self.initialize(request)
            }
            Command::Launch(arguments) => self.launch(request, arguments).await,
            Command::ConfigurationDone => Ok(self.inner.sender.respond(request, None)?),
            Command::Disconnect(args) => self.disconnect(request, args).await,
            Command::SetBreakpoints(args) => self.set_breakpoints(request, args).await,
            Command::Threads => self.threads(request),
            Command::StackTrace(args) => self.stack_trace(request, args).await,
            Command::Scopes(_) => self.scopes(request).await,
            Command::Variables(args) => self.variables(request, args).await,
            Command::Continue(_) => self.step(request, Step::Continue).await,
            Command::Next(_) => self.step(request, Step::Next).await,
            Command::StepIn(_) => self.step(request, Step::StepIn).await,
            Command::StepOut(_) => self.step(request, Step::StepOut).await,
            Command::Evaluate(args) => self.evaluate(request, args).await,
            Command::Pause(args) => self.pause(request, args).await,
            Command::Unsupported(name) => {
                Ok(self
                    .inner
                    .sender
                    .respond_error(request, format!("unsupported request '{name}'"))?)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    pub fn initialize(&self, request: &Request) -> Result<(), BridgeError> {
        let capabilities = Capabilities {
            supports_configuration_done_request: Some(false),
            supports_conditional_breakpoints: Some(true),
            supports_evaluate_for_hovers: Some(true),
            supports_step_back: Some(false),
            supports_set_variable: Some(false),
            ..Capabilities::default()
        };
        Ok(self.inner.sender.respond_with(request, &capabilities)?)
    }

    /// Validate the host, start the proxy and the debugger, and run the
    /// environment probe.
    pub async fn launch(&self, request: &Request, arguments: serde_json::Value) -> Result<(), BridgeError> {
        let config = LaunchConfig::resolve(arguments, &self.inner.context)?;
        let permit = self.inner.commands.acquire().await;
        self.ensure_not_launched().await?;
        validate::validate_environment(&config).await?;

        let fifo = spawn::fifo_path();
        tracing::info!(program = %config.program, fifo = %fifo, "launching");
        let mut proxy = spawn::spawn_script(&config.path_ksh, &spawn::proxy_script(&config, &fifo))?;
        let (Some(input), Some(output), Some(diagnostics)) =
            (proxy.stdin.take(), proxy.stdout.take(), proxy.stderr.take())
        else {
            return Err(BridgeError::Io(std::io::Error::other("proxy stdio is not piped")));
        };
        self.watch_proxy(proxy);
        self.watch_side_channel(diagnostics, config.show_debug_output);

        let start = self.attach(config.clone(), output, input).await?;
        self.start_debugger(&config, &fifo)?;
        self.finish_launch(request, permit, start).await
    }

    /// Launch against an already running REPL.
    ///
    /// Skips environment validation and process management; `output` and
    /// `input` take the place of the proxy's stdout and stdin.
    pub async fn launch_with_repl<R, W>(
        &self,
        request: &Request,
        config: LaunchConfig,
        output: R,
        input: W,
    ) -> Result<(), BridgeError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let permit = self.inner.commands.acquire().await;
        let start = self.attach(config, output, input).await?;
        self.finish_launch(request, permit, start).await
    }

    pub async fn set_breakpoints(
        &self,
        request: &Request,
        args: SetBreakpointsArguments,
    ) -> Result<(), BridgeError> {
        let Some(path) = args.source.path else {
            self.emit(AdapterEvent::output(
                OutputCategory::Console,
                "Error: setBreakpoints request has no source path.\n",
            ));
            return Ok(self
                .inner
                .sender
                .respond_with(request, &SetBreakpointsResponseBody { breakpoints: vec![] })?);
        };
        let requested: Vec<BreakpointRequest> = args
            .breakpoints
            .unwrap_or_default()
            .into_iter()
            .map(|bp| BreakpointRequest {
                line: bp.line,
                condition: bp.condition.filter(|c| !c.trim().is_empty()),
            })
            .collect();

        let permit = self.inner.commands.acquire().await;
        let text = {
            let state = self.inner.state.lock().await;
            let show = state.config()?.show_debug_output;
            let repl_path = command::escape_arg(&paths::to_debugger_path(&path));
            command::set_breakpoints(&repl_path, state.registry.ids(&path), &requested, show)
        };
        let reply = self.converse(&text).await?;
        let confirmed = parse::breakpoints(&reply);

        let ids = confirmed
            .iter()
            .filter_map(|bp| match bp {
                BreakpointReply::Set { id, .. } => Some(*id),
                BreakpointReply::Rejected(_) => None,
            })
            .collect();
        self.inner.state.lock().await.registry.replace(&path, ids);
        drop(permit);

        let breakpoints = confirmed
            .into_iter()
            .map(|bp| match bp {
                BreakpointReply::Set { id, line } => Breakpoint {
                    id: Some(id),
                    verified: true,
                    message: None,
                    line: Some(line),
                },
                BreakpointReply::Rejected(message) => Breakpoint {
                    id: None,
                    verified: false,
                    message: Some(message),
                    line: None,
                },
            })
            .collect();
        Ok(self
            .inner
            .sender
            .respond_with(request, &SetBreakpointsResponseBody { breakpoints })?)
    }

    pub fn threads(&self, request: &Request) -> Result<(), BridgeError> {
        let body = ThreadsResponseBody {
            threads: vec![Thread {
                id: THREAD_ID,
                name: THREAD_NAME.to_string(),
            }],
        };
        Ok(self.inner.sender.respond_with(request, &body)?)
    }

    pub async fn stack_trace(
        &self,
        request: &Request,
        args: StackTraceArguments,
    ) -> Result<(), BridgeError> {
        let permit = self.inner.commands.acquire().await;
        let cwd = self.inner.state.lock().await.config()?.cwd.clone();
        let reply = self.converse(command::backtrace()).await?;
        drop(permit);

        let frames: Vec<StackFrame> = parse::stack_frames(&reply)
            .into_iter()
            .map(|frame| StackFrame {
                id: frame.index,
                source: frame
                    .path
                    .as_deref()
                    .and_then(|p| parse::frame_source(p, Path::new(&cwd))),
                name: frame.text,
                line: frame.line,
                column: 0,
            })
            .collect();
        if let Some(top) = frames.first() {
            self.emit(AdapterEvent::output(
                OutputCategory::Telemetry,
                format!("Execution breaks at '{}'\n", top.name),
            ));
        }

        let total_frames = frames.len() as i64;
        let stack_frames = frames
            .into_iter()
            .skip(page_start(args.start_frame))
            .take(page_size(args.levels))
            .collect();
        Ok(self.inner.sender.respond_with(
            request,
            &StackTraceResponseBody {
                stack_frames,
                total_frames,
            },
        )?)
    }

    pub async fn scopes(&self, request: &Request) -> Result<(), BridgeError> {
        let reference = self.inner.state.lock().await.detector.cursor() as i64;
        let body = ScopesResponseBody {
            scopes: vec![Scope {
                name: "Local".to_string(),
                variables_reference: reference,
                expensive: false,
            }],
        };
        Ok(self.inner.sender.respond_with(request, &body)?)
    }

    pub async fn variables(
        &self,
        request: &Request,
        args: VariablesArguments,
    ) -> Result<(), BridgeError> {
        let entries: Vec<&str> = command::VARIABLE_CATALOG
            .iter()
            .skip(page_start(args.start))
            .take(page_size(args.count))
            .copied()
            .collect();

        let permit = self.inner.commands.acquire().await;
        let reply = self.converse(&command::variables(&entries)).await?;
        drop(permit);

        let variables = parse::variables(&reply)
            .into_iter()
            .map(|(name, value)| Variable {
                name,
                value,
                variable_type: Some("string".to_string()),
                variables_reference: 0,
            })
            .collect();
        Ok(self
            .inner
            .sender
            .respond_with(request, &VariablesResponseBody { variables })?)
    }

    /// Start a stepping command.
    ///
    /// The client is answered as soon as the command is written; the
    /// permit is held by a background task until the sentinel arrives, so
    /// later requests queue behind the step.
    pub async fn step(&self, request: &Request, step: Step) -> Result<(), BridgeError> {
        let permit = self.inner.commands.acquire().await;
        let start = self.send_command(&command::step(step)).await?;
        self.inner.sender.respond(request, None)?;

        let session = self.clone();
        tokio::spawn(async move {
            session.finish_step(permit, start).await;
        });
        Ok(())
    }

    pub async fn evaluate(&self, request: &Request, args: EvaluateArguments) -> Result<(), BridgeError> {
        let hover = args.context.as_deref() == Some("hover");
        let permit = self.inner.commands.acquire().await;
        let reply = self
            .converse(&command::evaluate(&args.expression, hover))
            .await?;
        drop(permit);

        let body = EvaluateResponseBody {
            result: parse::evaluation(&reply),
            variables_reference: 0,
        };
        Ok(self.inner.sender.respond_with(request, &body)?)
    }

    /// Interrupt the debuggee. Does not take the command permit.
    pub async fn pause(&self, request: &Request, args: ThreadArguments) -> Result<(), BridgeError> {
        if args.thread_id != THREAD_ID {
            return Ok(self
                .inner
                .sender
                .respond_error(request, format!("unknown thread {}", args.thread_id))?);
        }
        let (path_ksh, path_pkill, ppid) = {
            let state = self.inner.state.lock().await;
            let config = state.config()?;
            (config.path_ksh.clone(), config.path_pkill.clone(), state.debugger_ppid)
        };
        let Some(ppid) = ppid else {
            return Ok(self
                .inner
                .sender
                .respond_error(request, "the debugger's process id is unknown")?);
        };

        let script = spawn::interrupt_script(&path_pkill, ppid);
        let status = spawn::run_helper(&path_ksh, &script, &self.inner.sender).await?;
        if status.success() {
            Ok(self.inner.sender.respond(request, None)?)
        } else {
            Ok(self
                .inner
                .sender
                .respond_error(request, format!("pkill failed: {status}"))?)
        }
    }

    /// Kill the debugger and the proxy, then close the session.
    pub async fn disconnect(
        &self,
        request: &Request,
        _args: DisconnectArguments,
    ) -> Result<(), BridgeError> {
        let target = {
            let mut state = self.inner.state.lock().await;
            state.disconnecting = true;
            state.config.as_ref().map(|config| {
                (
                    config.path_ksh.clone(),
                    spawn::kill_script(
                        &config.path_pkill,
                        state.debugger_ppid,
                        state.side_channel.get(PROXY_ID_KEY).map(String::as_str),
                    ),
                )
            })
        };

        if let Some((path_ksh, script)) = target {
            if !script.is_empty() {
                if let Err(e) = spawn::run_helper(&path_ksh, &script, &self.inner.sender).await {
                    tracing::warn!("failed to stop the debugger: {e}");
                }
            }
            let mut exited = self.inner.proxy_exited.subscribe();
            let finished = tokio::time::timeout(DISCONNECT_TIMEOUT, exited.wait_for(|done| *done))
                .await
                .is_ok();
            if !finished {
                tracing::warn!("proxy still running after {DISCONNECT_TIMEOUT:?}");
            }
        }

        self.inner.signal.close();
        Ok(self.inner.sender.respond(request, None)?)
    }

    // -----------------------------------------------------------------------
    // Launch plumbing
    // -----------------------------------------------------------------------

    async fn ensure_not_launched(&self) -> Result<(), BridgeError> {
        if self.inner.state.lock().await.config.is_some() {
            return Err(BridgeError::AlreadyLaunched);
        }
        Ok(())
    }

    /// Wire the REPL's streams into the session and write the launch probe.
    /// Returns the probe's issue point.
    async fn attach<R, W>(&self, config: LaunchConfig, output: R, input: W) -> Result<usize, BridgeError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = self.inner.state.lock().await;
            if state.config.is_some() {
                return Err(BridgeError::AlreadyLaunched);
            }
            state.config = Some(config);
            state.repl_input = Some(tx);
        }
        tokio::spawn(write_repl(rx, input));

        let session = self.clone();
        tokio::spawn(async move { session.read_repl(output).await });

        self.send_command(command::launch_probe()).await
    }

    fn start_debugger(&self, config: &LaunchConfig, fifo: &str) -> Result<(), BridgeError> {
        let debugger = spawn::debugger_command(config, fifo);
        match config.terminal_kind.run_in_terminal_kind() {
            None => {
                let child = spawn::spawn_forwarded(
                    &config.path_ksh,
                    &debugger,
                    &self.inner.sender,
                    OutputCategory::Stdout,
                    OutputCategory::Stderr,
                )?;
                tokio::spawn(reap_debugger(child));
            }
            Some(kind) => {
                self.inner.sender.run_in_terminal(&RunInTerminalRequestArguments {
                    kind: Some(kind.to_string()),
                    title: Some(spawn::TERMINAL_TITLE.to_string()),
                    cwd: ".".to_string(),
                    args: spawn::launcher_args(&config.path_ksh, &debugger),
                })?;
            }
        }
        Ok(())
    }

    async fn finish_launch(
        &self,
        request: &Request,
        permit: CommandPermit,
        start: usize,
    ) -> Result<(), BridgeError> {
        let reply = self.await_reply(start).await?;
        {
            let mut state = self.inner.state.lock().await;
            match parse::process_id(&reply) {
                Some(ppid) => {
                    state.debugger_ppid = Some(ppid);
                    state.sentinel.strengthen(ppid);
                }
                None => tracing::warn!(
                    reply = ?reply.last(),
                    "could not read the debugger's parent pid; keeping the base marker"
                ),
            }
        }

        self.inner.sender.respond(request, None)?;
        self.emit(AdapterEvent::output(
            OutputCategory::Telemetry,
            "Sending InitializedEvent",
        ));
        drop(permit);
        self.emit(AdapterEvent::Initialized);
        Ok(())
    }

    fn watch_proxy(&self, mut proxy: Child) {
        let exited = self.inner.proxy_exited.clone();
        tokio::spawn(async move {
            match proxy.wait().await {
                Ok(status) => tracing::debug!(%status, "proxy exited"),
                Err(e) => tracing::warn!("failed to wait for the proxy: {e}"),
            }
            exited.send_replace(true);
        });
    }

    /// Collect `::KEY::VALUE` lines from the proxy's stderr.
    fn watch_side_channel<R>(&self, diagnostics: R, show_debug_output: bool)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let session = self.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(diagnostics).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some((key, value)) = parse::side_channel(&line) {
                    tracing::debug!(key, value, "side channel");
                    session
                        .inner
                        .state
                        .lock()
                        .await
                        .side_channel
                        .insert(key.to_string(), value.to_string());
                }
                if show_debug_output {
                    session.emit(AdapterEvent::output(OutputCategory::Stderr, format!("{line}\n")));
                }
            }
        });
    }

    // -----------------------------------------------------------------------
    // Conversations
    // -----------------------------------------------------------------------

    /// Write `text` plus the sentinel `print`. Returns the issue point.
    async fn send_command(&self, text: &str) -> Result<usize, BridgeError> {
        if self.inner.signal.is_closing() {
            return Err(BridgeError::SessionClosed);
        }
        let state = self.inner.state.lock().await;
        let input = state.repl_input.as_ref().ok_or(BridgeError::NotLaunched)?;
        let start = state.log.len();
        let line = state.sentinel.terminate(text);
        if state.config.as_ref().is_some_and(|c| c.trace) {
            tracing::info!(start, command = %line, "to debugger");
        } else {
            tracing::trace!(start, command = %line, "to debugger");
        }
        input.send(line).map_err(|_| BridgeError::SessionClosed)?;
        Ok(start)
    }

    /// Output between the issue point `start` and the sentinel.
    async fn await_reply(&self, start: usize) -> Result<Reply, BridgeError> {
        let mut waiter = self.inner.signal.subscribe();
        loop {
            {
                let state = self.inner.state.lock().await;
                // The first reply line extends the entry pending at `start - 1`.
                let from = start.saturating_sub(1);
                if let Some(end) = state.log.find_line(from, state.sentinel.marker()) {
                    return Ok(state.log.reply(start, end));
                }
            }
            if !waiter.wait().await {
                return Err(BridgeError::SessionClosed);
            }
        }
    }

    async fn converse(&self, text: &str) -> Result<Reply, BridgeError> {
        let start = self.send_command(text).await?;
        self.await_reply(start).await
    }

    async fn finish_step(&self, permit: CommandPermit, start: usize) {
        if let Err(e) = self.await_reply(start).await {
            tracing::debug!("step did not complete: {e}");
        }
        drop(permit);
    }

    // -----------------------------------------------------------------------
    // REPL output
    // -----------------------------------------------------------------------

    async fn read_repl<R: AsyncRead + Unpin>(self, mut output: R) {
        let mut buf = vec![0u8; 4096];
        let mut pending = Vec::new();
        loop {
            match output.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    let text = take_utf8(&mut pending);
                    if !text.is_empty() {
                        self.ingest(&text).await;
                    }
                }
                Err(e) => {
                    tracing::warn!("debugger output failed: {e}");
                    break;
                }
            }
        }
        self.repl_closed().await;
    }

    async fn ingest(&self, chunk: &str) {
        let (events, show, trace) = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            state.log.push_chunk(chunk);
            let events = state.detector.scan(&state.log);
            let (show, trace) = state
                .config
                .as_ref()
                .map_or((false, false), |c| (c.show_debug_output, c.trace));
            (events, show, trace)
        };
        if trace {
            tracing::info!(chunk, "from debugger");
        } else {
            tracing::trace!(chunk, "from debugger");
        }
        if show {
            self.emit(AdapterEvent::output(OutputCategory::Stdout, chunk));
        }
        for event in events {
            self.raise(event).await;
        }
        self.inner.signal.notify();
    }

    async fn raise(&self, event: DetectedEvent) {
        match event {
            DetectedEvent::Stopped => self.stopped(StopReason::Breakpoint),
            DetectedEvent::Signaled => self.stopped(StopReason::Pause),
            DetectedEvent::Terminated => {
                if self.inner.signal.is_closing() {
                    return;
                }
                self.write_raw(command::QUIT).await;
                self.emit(AdapterEvent::output(
                    OutputCategory::Telemetry,
                    "Sending TerminatedEvent",
                ));
                self.emit(AdapterEvent::Terminated(TerminatedEventBody::default()));
                self.inner.signal.close();
            }
        }
    }

    fn stopped(&self, reason: StopReason) {
        self.emit(AdapterEvent::output(OutputCategory::Telemetry, "Sending StoppedEvent"));
        self.emit(AdapterEvent::Stopped(StoppedEventBody {
            reason,
            description: None,
            thread_id: Some(THREAD_ID),
            all_threads_stopped: Some(true),
        }));
    }

    async fn repl_closed(&self) {
        self.inner.proxy_exited.send_replace(true);
        let disconnecting = self.inner.state.lock().await.disconnecting;
        if !disconnecting && !self.inner.signal.is_closing() {
            tracing::warn!("debugger output closed unexpectedly");
            self.emit(AdapterEvent::output(
                OutputCategory::Console,
                "kshdb exited unexpectedly.\n",
            ));
            self.emit(AdapterEvent::Terminated(TerminatedEventBody::default()));
        }
        self.inner.signal.close();
    }

    /// Write to the REPL without a sentinel.
    async fn write_raw(&self, text: &str) {
        let state = self.inner.state.lock().await;
        if let Some(input) = &state.repl_input {
            if input.send(text.to_string()).is_err() {
                tracing::debug!("debugger input already closed");
            }
        }
    }

    fn emit(&self, event: AdapterEvent) {
        if let Err(e) = self.inner.sender.send_event(event) {
            tracing::debug!("dropping event: {e}");
        }
    }
}

/// Drain queued command text into the REPL's stdin.
async fn write_repl<W: AsyncWrite + Unpin>(mut rx: mpsc::UnboundedReceiver<String>, mut input: W) {
    while let Some(text) = rx.recv().await {
        if let Err(e) = input.write_all(text.as_bytes()).await {
            tracing::warn!("failed to write to the debugger: {e}");
            break;
        }
        if let Err(e) = input.flush().await {
            tracing::warn!("failed to flush debugger input: {e}");
            break;
        }
    }
}

/// Wait for a `debugConsole` debugger to exit, keeping its stdin open.
async fn reap_debugger(mut child: Child) {
    let _stdin = child.stdin.take();
    match child.wait().await {
        Ok(status) => tracing::debug!(%status, "debugger exited"),
        Err(e) => tracing::warn!("failed to wait for the debugger: {e}"),
    }
}

fn page_start(start: Option<i64>) -> usize {
    start.unwrap_or(0).max(0) as usize
}

/// Zero or a missing size means the default page.
fn page_size(size: Option<i64>) -> usize {
    match size {
        Some(n) if n > 0 => n as usize,
        _ => DEFAULT_PAGE,
    }
}
