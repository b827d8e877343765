use crate::core::packet::Frame;
use crate::error::{ProtocolError, Result};
use crate::transport::connection::{CloseReason, Connection};
use crate::utils::metrics::Metrics;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// A listener's protocol state machine.
///
/// The server calls [`inspect`](Self::inspect) inline for every decoded
/// frame, in arrival order, then runs [`on_message`](Self::on_message) on its
/// own task. Anything that must observe frames in order (version inference)
/// belongs in `inspect`; an error there closes the connection.
pub trait ConnectionHandler: Send + Sync + 'static {
    type State: Default + Send + 'static;

    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn on_connect(&self, _conn: &Arc<Connection<Self::State>>) {}

    fn inspect(&self, _conn: &Arc<Connection<Self::State>>, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    fn on_message(
        &self,
        conn: Arc<Connection<Self::State>>,
        frame: Frame,
    ) -> impl Future<Output = ()> + Send;

    /// Called exactly once, after the read loop has ended.
    fn on_disconnect(&self, conn: &Arc<Connection<Self::State>>, reason: &CloseReason);
}

/// Inspects `frame` and spawns its handler. Frames of one connection may be
/// handled concurrently.
pub fn dispatch<H: ConnectionHandler>(
    handler: &Arc<H>,
    conn: &Arc<Connection<H::State>>,
    frame: Frame,
) -> Result<JoinHandle<()>> {
    handler.inspect(conn, &frame)?;
    let handler = Arc::clone(handler);
    let conn = Arc::clone(conn);
    Ok(tokio::spawn(async move {
        handler.on_message(conn, frame).await;
    }))
}

/// Logs `error` against the frame that caused it and closes the connection.
pub fn close_on_error<S>(
    handler: &'static str,
    conn: &Connection<S>,
    frame: &Frame,
    error: ProtocolError,
    metrics: &Metrics,
) {
    match &error {
        ProtocolError::ConnectionClosed => {
            debug!(
                handler,
                conn = conn.id(),
                message_id = frame.message_id(),
                "Reply dropped, connection already closed"
            );
            conn.close(CloseReason::Failed(error.to_string()));
            return;
        }
        ProtocolError::Codec(_) => error!(
            handler,
            conn = conn.id(),
            peer = %conn.peer(),
            message_id = frame.message_id(),
            epoch = %conn.epoch(),
            bytes = ?frame.as_bytes(),
            error = %error,
            "Failed to decode message"
        ),
        _ => error!(
            handler,
            conn = conn.id(),
            peer = %conn.peer(),
            message_id = frame.message_id(),
            error = %error,
            "Closing connection"
        ),
    }
    metrics.protocol_error();
    conn.close(CloseReason::Failed(error.to_string()));
}
