//! # Connections
//!
//! A [`Link`] is the shareable half of an accepted socket: its identity, the
//! negotiated [`Epoch`], and a queue into the writer task. Handlers hold
//! links to reply, and the game registry holds them to push kicks to game
//! servers.
//!
//! Replies and close requests travel through the same queue, so a reply
//! queued before [`Link::close`] is always written before the socket shuts.

use crate::core::epoch::Epoch;
use crate::core::packet::Frame;
use crate::error::{ProtocolError, Result};
use crate::protocol::message::WireMessage;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub type ConnectionId = u64;

/// Items for the writer task.
#[derive(Debug)]
pub enum Outbound {
    Frame(Frame),
    /// Flush what is queued and shut the socket.
    Close,
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    PeerClosed,
    Requested,
    Failed(String),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct Link {
    id: ConnectionId,
    peer: SocketAddr,
    epoch: Arc<AtomicU32>,
    outbound: mpsc::UnboundedSender<Outbound>,
    token: CancellationToken,
    reason: Arc<OnceLock<CloseReason>>,
}

impl Link {
    pub fn new(
        id: ConnectionId,
        peer: SocketAddr,
        token: CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let link = Self {
            id,
            peer,
            epoch: Arc::new(AtomicU32::new(Epoch::UNVERSIONED.get())),
            outbound,
            token,
            reason: Arc::new(OnceLock::new()),
        };
        (link, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn epoch(&self) -> Epoch {
        Epoch(self.epoch.load(Ordering::Acquire))
    }

    /// Raises the epoch to at least `floor` and returns the epoch now in
    /// effect. Never lowers it.
    pub fn raise_epoch(&self, floor: Epoch) -> Epoch {
        let previous = self.epoch.fetch_max(floor.get(), Ordering::AcqRel);
        Epoch(previous.max(floor.get()))
    }

    /// Queues an already sealed frame.
    pub fn send_frame(&self, frame: Frame) -> Result<()> {
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| ProtocolError::ConnectionClosed)
    }

    /// Encodes `message` at the connection's epoch and queues it.
    pub fn send<M: WireMessage>(&self, message_id: u16, message: &M) -> Result<()> {
        self.send_at(message_id, message, self.epoch())
    }

    pub fn send_at<M: WireMessage>(
        &self,
        message_id: u16,
        message: &M,
        epoch: Epoch,
    ) -> Result<()> {
        let frame = Frame::seal(message_id, message.encode(epoch)?)?;
        self.send_frame(frame)
    }

    /// Closes after everything queued so far has been written. The first
    /// reason recorded wins.
    pub fn close(&self, reason: CloseReason) {
        if self.reason.set(reason.clone()).is_ok() {
            debug!(connection = self.id, peer = %self.peer, ?reason, "Closing connection");
        }
        let _ = self.outbound.send(Outbound::Close);
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.reason.get().cloned()
    }

    /// Resolves once the connection is closing.
    pub async fn closed(&self) {
        self.token.cancelled().await
    }
}

/// A link plus the owning handler's per-connection state.
#[derive(Debug)]
pub struct Connection<S> {
    link: Link,
    state: Mutex<S>,
}

impl<S> Connection<S> {
    pub fn new(link: Link, state: S) -> Self {
        Self {
            link,
            state: Mutex::new(state),
        }
    }

    /// Builds a connection whose outbound queue is handed to the caller.
    pub fn open(
        id: ConnectionId,
        peer: SocketAddr,
        token: CancellationToken,
        state: S,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (link, rx) = Link::new(id, peer, token);
        (Arc::new(Self::new(link, state)), rx)
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn id(&self) -> ConnectionId {
        self.link.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.link.peer
    }

    pub fn epoch(&self) -> Epoch {
        self.link.epoch()
    }

    pub fn raise_epoch(&self, floor: Epoch) -> Epoch {
        self.link.raise_epoch(floor)
    }

    pub fn send<M: WireMessage>(&self, message_id: u16, message: &M) -> Result<()> {
        self.link.send(message_id, message)
    }

    pub fn close(&self, reason: CloseReason) {
        self.link.close(reason)
    }

    pub fn is_closed(&self) -> bool {
        self.link.is_closed()
    }

    /// Runs `f` with the state locked. Keep it short and never await inside.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.state.lock())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::protocol::packets::GameLoginResult;

    fn open() -> (Arc<Connection<u32>>, mpsc::UnboundedReceiver<Outbound>) {
        Connection::open(7, "127.0.0.1:4500".parse().unwrap(), CancellationToken::new(), 0)
    }

    #[test]
    fn epoch_only_rises() {
        let (conn, _rx) = open();
        assert_eq!(conn.epoch(), Epoch::UNVERSIONED);
        assert_eq!(conn.raise_epoch(Epoch::V8_1_1), Epoch::V8_1_1);
        assert_eq!(conn.raise_epoch(Epoch::V5_2), Epoch::V8_1_1);
        assert_eq!(conn.epoch(), Epoch::V8_1_1);
    }

    #[test]
    fn reply_is_queued_before_close() {
        let (conn, mut rx) = open();
        conn.send(20002, &GameLoginResult::new(6)).unwrap();
        conn.close(CloseReason::Requested);
        conn.close(CloseReason::Shutdown);

        match rx.try_recv().unwrap() {
            Outbound::Frame(frame) => assert_eq!(frame.message_id(), 20002),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(rx.try_recv().unwrap(), Outbound::Close));
        assert!(conn.is_closed());
        assert_eq!(conn.link().close_reason(), Some(CloseReason::Requested));
    }

    #[test]
    fn send_after_writer_is_gone_fails() {
        let (conn, rx) = open();
        drop(rx);
        assert!(matches!(
            conn.send(20002, &GameLoginResult::new(0)),
            Err(ProtocolError::ConnectionClosed)
        ));
    }

    #[test]
    fn state_is_guarded() {
        let (conn, _rx) = open();
        conn.with_state(|count| *count += 2);
        assert_eq!(conn.with_state(|count| *count), 2);
    }
}
