use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tracing::{debug, info, warn};

use ksh_bridge::DebugSession;
use ksh_config::ResolveContext;
use ksh_dap::{write_loop, DapError, DapSender, Incoming, MessageReader};

/// Time left to the writer to flush the last responses.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Serve one client over `input`/`output` until it disconnects or closes
/// the stream.
///
/// Each request is handled on its own task; ordering between requests is
/// enforced inside the session, not here.
pub(crate) async fn serve<R, W>(input: R, output: W, context: ResolveContext) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (sender, rx) = DapSender::new();
    let writer = tokio::spawn(write_loop(rx, output));
    let session = DebugSession::new(sender, context);
    let mut reader = MessageReader::new(BufReader::new(input));

    loop {
        let request = match reader.read_incoming().await {
            Ok(Some(Incoming::Request(request))) => request,
            Ok(Some(Incoming::Response(response))) => {
                session.handle_response(&response);
                continue;
            }
            Ok(None) => {
                info!("client closed the stream");
                break;
            }
            Err(DapError::InvalidMessage(msg)) => {
                warn!("skipping malformed message: {msg}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        debug!(seq = request.seq, command = %request.command, "request");
        let disconnect = request.command == "disconnect";
        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.handle(request).await })
        };
        if disconnect {
            if let Err(e) = task.await {
                warn!("disconnect handler failed: {e}");
            }
            break;
        }
    }

    drop(session);
    match tokio::time::timeout(SHUTDOWN_GRACE, writer).await {
        Ok(Ok(Err(e))) => warn!("writing to the client failed: {e}"),
        Ok(Err(e)) => warn!("writer task failed: {e}"),
        Ok(Ok(Ok(()))) | Err(_) => {}
    }
    Ok(())
}
