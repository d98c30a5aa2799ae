//! The relay's main loop.
//!
//! Lines are read from the transport and each one is dispatched on its own
//! task, so a slow upstream call never blocks later messages. Finished tasks
//! are written back as they complete, which means responses may be emitted
//! in a different order than their requests arrived. Clients correlate by
//! `id`.
//!
//! # Shutdown
//!
//! - **End of input**: no further lines are accepted; in-flight tasks are
//!   allowed to finish (each is bounded by the upstream timeout) and their
//!   responses are written before returning.
//! - **SIGINT / SIGTERM** (Ctrl+C on Windows): in-flight tasks are aborted,
//!   output is flushed and the loop returns immediately.

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::mcp::dispatch::Dispatcher;
use crate::mcp::protocol::OutgoingMessage;
use crate::mcp::transport::{LineTransport, StdioTransport};

/// Stdio relay server.
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    /// Creates a server around a dispatcher.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Runs the relay over stdin/stdout until end of input or a termination
    /// signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handlers cannot be installed, if
    /// transport I/O fails, or if a message task panics.
    pub async fn run(&self) -> io::Result<()> {
        let shutdown = shutdown_signal()?;
        let mut transport = StdioTransport::stdio();

        self.serve(&mut transport, shutdown).await
    }

    /// Runs the relay over an arbitrary transport.
    ///
    /// `shutdown` resolving is treated like a termination signal: pending
    /// work is abandoned and the call returns `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails or if a message task panics.
    pub async fn serve<R, W, F>(
        &self,
        transport: &mut LineTransport<R, W>,
        shutdown: F,
    ) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut in_flight: JoinSet<Option<OutgoingMessage>> = JoinSet::new();
        let mut reading = true;

        loop {
            if !reading && in_flight.is_empty() {
                info!("Input closed and all requests settled, shutting down");
                return transport.flush().await;
            }

            tokio::select! {
                () = &mut shutdown => {
                    if !in_flight.is_empty() {
                        debug!(pending = in_flight.len(), "Abandoning in-flight requests");
                    }
                    in_flight.abort_all();
                    return transport.flush().await;
                }

                line = transport.read_line(), if reading => {
                    if let Some(line) = line? {
                        let dispatcher = Arc::clone(&self.dispatcher);
                        in_flight.spawn(async move { dispatcher.dispatch_line(line).await });
                    } else {
                        debug!(pending = in_flight.len(), "Input closed");
                        reading = false;
                    }
                }

                Some(joined) = in_flight.join_next() => {
                    if let Some(message) = joined.map_err(io::Error::other)? {
                        transport.write_message(&message).await?;
                    }
                }
            }
        }
    }
}

/// Resolves when the process is asked to terminate.
#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }
    })
}

/// Resolves when the process is asked to terminate.
#[cfg(windows)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        } else {
            // No handler could be installed; rely on end of input instead.
            std::future::pending::<()>().await;
        }
    })
}
