//! # TCP Listener
//!
//! One accept loop per listener. Each accepted socket gets a read loop on
//! its own task and a writer task fed by the connection's outbound queue.
//! Every decoded frame is inspected inline and then handled on a task of
//! its own, so a slow handler never stalls the read loop.
//!
//! Shutdown is driven by a [`CancellationToken`]: the accept loop stops,
//! every connection is closed, and the listener waits a bounded time for
//! connection tasks to finish their cleanup.

use crate::config::ListenerConfig;
use crate::core::codec::FrameCodec;
use crate::error::Result;
use crate::protocol::dispatcher::{dispatch, ConnectionHandler};
use crate::transport::connection::{CloseReason, Connection, ConnectionId, Link, Outbound};
use crate::utils::metrics::Metrics;
use futures::{SinkExt, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// How long a stopping listener waits for its connections to clean up.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_connection_id() -> ConnectionId {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)
}

/// A bound listener driving one [`ConnectionHandler`].
pub struct Listener<H: ConnectionHandler> {
    listener: TcpListener,
    handler: Arc<H>,
    cipher_key: Option<String>,
    max_frame_size: usize,
    metrics: Arc<Metrics>,
}

impl<H: ConnectionHandler> Listener<H> {
    /// Binds `config.address`. Failing to bind is the one error the process
    /// cannot recover from.
    pub async fn bind(
        config: &ListenerConfig,
        max_frame_size: usize,
        handler: Arc<H>,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        // fail before binding if the key is unusable
        FrameCodec::for_key(config.cipher_key())?;
        let listener = TcpListener::bind(&config.address).await?;
        info!(
            listener = handler.name(),
            address = %listener.local_addr()?,
            encrypted = config.use_encryption,
            "Listening"
        );
        Ok(Self {
            listener,
            handler,
            cipher_key: config.cipher_key().map(str::to_owned),
            max_frame_size,
            metrics,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    fn codec(&self) -> Result<FrameCodec> {
        let codec = FrameCodec::for_key(self.cipher_key.as_deref())?;
        Ok(codec.with_max_frame_size(self.max_frame_size))
    }

    /// Accepts until `shutdown` fires. Returns an error only for accept
    /// failures that are not tied to a single peer.
    #[instrument(skip_all, fields(listener = self.handler.name()))]
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let mut connections = JoinSet::new();

        let outcome = loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let (read_codec, write_codec) = (self.codec()?, self.codec()?);
                        connections.spawn(run_connection(
                            Arc::clone(&self.handler),
                            stream,
                            peer,
                            (read_codec, write_codec),
                            shutdown.child_token(),
                            Arc::clone(&self.metrics),
                        ));
                    }
                    Err(e) if is_transient(&e) => {
                        warn!(error = %e, "Failed to accept connection");
                    }
                    Err(e) => {
                        error!(error = %e, "Listener failed");
                        break Err(e.into());
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        };

        shutdown.cancel();
        info!(connections = connections.len(), "Listener stopping");
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(remaining = connections.len(), "Shutdown grace expired, aborting connections");
            connections.abort_all();
        }
        outcome
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    ) || error.raw_os_error().is_some_and(is_descriptor_exhaustion)
}

// EMFILE and ENFILE: a peer cannot be served right now, the listener is fine.
fn is_descriptor_exhaustion(code: i32) -> bool {
    code == 23 || code == 24
}

#[instrument(skip_all, fields(listener = handler.name(), %peer))]
async fn run_connection<H: ConnectionHandler>(
    handler: Arc<H>,
    stream: TcpStream,
    peer: SocketAddr,
    (read_codec, write_codec): (FrameCodec, FrameCodec),
    token: CancellationToken,
    metrics: Arc<Metrics>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "Failed to disable Nagle");
    }
    let (reader, writer) = stream.into_split();
    let (conn, outbound) =
        Connection::open(next_connection_id(), peer, token.clone(), H::State::default());

    metrics.connection_established();
    handler.on_connect(&conn);

    let writer_task = tokio::spawn(write_loop(
        FramedWrite::new(writer, write_codec),
        outbound,
        conn.link().clone(),
        Arc::clone(&metrics),
    ));

    let mut frames = FramedRead::new(reader, read_codec);
    let reason = loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break CloseReason::Shutdown,
            next = frames.next() => match next {
                Some(Ok(frame)) => {
                    metrics.frame_received(frame.len() as u64);
                    let message_id = frame.message_id();
                    let rejected = frame.clone();
                    if let Err(e) = dispatch(&handler, &conn, frame) {
                        error!(
                            conn = conn.id(),
                            message_id,
                            bytes = ?rejected.as_bytes(),
                            error = %e,
                            "Rejected frame"
                        );
                        metrics.protocol_error();
                        break CloseReason::Failed(e.to_string());
                    }
                }
                Some(Err(e)) => {
                    warn!(conn = conn.id(), error = %e, "Malformed frame");
                    metrics.protocol_error();
                    break CloseReason::Failed(e.to_string());
                }
                None => break CloseReason::PeerClosed,
            },
        }
    };

    conn.close(reason.clone());
    let reason = conn.link().close_reason().unwrap_or(reason);
    handler.on_disconnect(&conn, &reason);
    metrics.connection_closed();

    if let Err(e) = writer_task.await {
        warn!(conn = conn.id(), error = %e, "Writer task failed");
    }
}

/// Drains the outbound queue into the socket. A failed write closes the
/// link, which also ends the read loop.
async fn write_loop<W: AsyncWrite + Unpin>(
    mut sink: FramedWrite<W, FrameCodec>,
    mut outbound: UnboundedReceiver<Outbound>,
    link: Link,
    metrics: Arc<Metrics>,
) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(frame) => {
                let len = frame.len() as u64;
                if let Err(e) = sink.send(frame).await {
                    warn!(conn = link.id(), error = %e, "Write failed");
                    link.close(CloseReason::Failed(format!("write failed: {e}")));
                    return;
                }
                metrics.frame_sent(len);
            }
            Outbound::Close => break,
        }
    }
    if let Err(e) = sink.close().await {
        debug!(error = %e, "Socket shutdown failed");
    }
}
