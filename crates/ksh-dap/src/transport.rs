//! Content-Length framing over the adapter's stdio.
//!
//! The adapter reads framed requests from the client with
//! [`MessageReader`] and queues responses and events through a cloneable
//! [`DapSender`]; a single [`write_loop`] task owns the output stream.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::DapError;
use crate::protocol::{AdapterEvent, Event, Request, Response, RunInTerminalRequestArguments};

const CONTENT_LENGTH: &str = "Content-Length:";

/// Largest body the reader accepts.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Frame `value` behind its `Content-Length` header.
pub fn encode_message(value: &serde_json::Value) -> Vec<u8> {
    let body = value.to_string();
    let mut framed = format!("{CONTENT_LENGTH} {}\r\n\r\n", body.len()).into_bytes();
    framed.extend_from_slice(body.as_bytes());
    framed
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Reads framed requests from the client stream.
pub struct MessageReader<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> MessageReader<R> {
    /// Wrap a buffered client stream.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next framed message.
    ///
    /// Returns `Ok(None)` on a clean end of stream.
    pub async fn read_message(&mut self) -> Result<Option<serde_json::Value>, DapError> {
        let mut content_length: Option<usize> = None;
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if content_length.is_some() {
                    break;
                }
                continue;
            }
            if let Some(val) = trimmed.strip_prefix(CONTENT_LENGTH) {
                content_length = Some(val.trim().parse().map_err(|e| {
                    DapError::Transport(format!("invalid Content-Length value '{}': {e}", val.trim()))
                })?);
            }
        }

        let length = content_length.unwrap_or_default();
        if length > MAX_MESSAGE_SIZE {
            return Err(DapError::Transport(format!(
                "message of {length} bytes exceeds the {MAX_MESSAGE_SIZE} byte limit"
            )));
        }
        let mut body = vec![0u8; length];
        self.reader.read_exact(&mut body).await?;
        let value = serde_json::from_slice(&body)
            .map_err(|e| DapError::InvalidMessage(format!("JSON parse error: {e}")))?;
        Ok(Some(value))
    }

    /// Read the next message from the client.
    ///
    /// Besides requests the client sends responses to the adapter's own
    /// reverse requests (`runInTerminal`).
    pub async fn read_incoming(&mut self) -> Result<Option<Incoming>, DapError> {
        let Some(value) = self.read_message().await? else {
            return Ok(None);
        };
        let incoming = match value.get("type").and_then(|t| t.as_str()) {
            Some("request") => Incoming::Request(
                serde_json::from_value(value)
                    .map_err(|e| DapError::InvalidMessage(e.to_string()))?,
            ),
            Some("response") => Incoming::Response(
                serde_json::from_value(value)
                    .map_err(|e| DapError::InvalidMessage(e.to_string()))?,
            ),
            other => {
                return Err(DapError::InvalidMessage(format!(
                    "unexpected message type: {other:?}"
                )))
            }
        };
        Ok(Some(incoming))
    }
}

/// A decoded message from the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Request(Request),
    /// The answer to a reverse request.
    Response(Response),
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Cloneable handle that queues responses, events and reverse requests for
/// the client, stamping each with the next sequence number.
#[derive(Debug, Clone)]
pub struct DapSender {
    tx: mpsc::UnboundedSender<serde_json::Value>,
    seq: Arc<AtomicI64>,
}

impl DapSender {
    /// Create a sender and the receiver that [`write_loop`] drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<serde_json::Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                seq: Arc::new(AtomicI64::new(1)),
            },
            rx,
        )
    }

    fn next_seq(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn push<T: serde::Serialize>(&self, message: &T) -> Result<(), DapError> {
        let value =
            serde_json::to_value(message).map_err(|e| DapError::Transport(e.to_string()))?;
        self.tx.send(value).map_err(|_| DapError::ChannelClosed)
    }

    /// Answer `request` successfully.
    pub fn respond(
        &self,
        request: &Request,
        body: Option<serde_json::Value>,
    ) -> Result<(), DapError> {
        self.push(&Response {
            seq: self.next_seq(),
            message_type: "response".into(),
            request_seq: request.seq,
            success: true,
            command: request.command.clone(),
            message: None,
            body,
        })
    }

    /// Answer `request` with a serializable body.
    pub fn respond_with<T: serde::Serialize>(
        &self,
        request: &Request,
        body: &T,
    ) -> Result<(), DapError> {
        let body = serde_json::to_value(body).map_err(|e| DapError::Transport(e.to_string()))?;
        self.respond(request, Some(body))
    }

    /// Answer `request` with a failure.
    pub fn respond_error(
        &self,
        request: &Request,
        message: impl Into<String>,
    ) -> Result<(), DapError> {
        self.push(&Response {
            seq: self.next_seq(),
            message_type: "response".into(),
            request_seq: request.seq,
            success: false,
            command: request.command.clone(),
            message: Some(message.into()),
            body: None,
        })
    }

    /// Emit an unsolicited event.
    pub fn send_event(&self, event: AdapterEvent) -> Result<(), DapError> {
        self.push(&Event {
            seq: self.next_seq(),
            message_type: "event".into(),
            event: event.name().into(),
            body: event.body(),
        })
    }

    /// Ask the client to run a command line in a terminal.
    pub fn run_in_terminal(&self, args: &RunInTerminalRequestArguments) -> Result<(), DapError> {
        let arguments =
            serde_json::to_value(args).map_err(|e| DapError::Transport(e.to_string()))?;
        self.push(&Request {
            seq: self.next_seq(),
            message_type: "request".into(),
            command: "runInTerminal".into(),
            arguments: Some(arguments),
        })
    }
}

/// Drain queued messages into `writer` until every [`DapSender`] is dropped.
pub async fn write_loop<W: AsyncWrite + Unpin>(
    mut rx: mpsc::UnboundedReceiver<serde_json::Value>,
    mut writer: W,
) -> Result<(), DapError> {
    while let Some(message) = rx.recv().await {
        writer.write_all(&encode_message(&message)).await?;
        writer.flush().await?;
    }
    Ok(())
}
