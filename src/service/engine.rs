//! # Engine
//!
//! Wires the shared registries, both handlers and both listeners together
//! and owns the process-wide shutdown.
//!
//! ```rust,no_run
//! use mononoke::config::Config;
//! use mononoke::service::accounts::MemoryAccountStore;
//! use mononoke::service::engine::Engine;
//! use std::sync::Arc;
//!
//! # async fn run() -> mononoke::error::Result<()> {
//! let config = Config::default();
//! let store = Arc::new(MemoryAccountStore::from_config(&config.accounts));
//! let engine = Engine::bind(&config, store).await?;
//! let reason = engine.run().await?;
//! println!("stopped: {reason}");
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::error::Result;
use crate::protocol::auth::AuthHandler;
use crate::protocol::game::GameHandler;
use crate::protocol::registry::{GameRegistry, PlayerRegistry};
use crate::service::accounts::AccountStore;
use crate::transport::server::Listener;
use crate::utils::metrics::Metrics;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Why the engine stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(&'static str),
    ListenerFailed(String),
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "received {name}"),
            Self::ListenerFailed(cause) => write!(f, "listener failed: {cause}"),
            Self::Requested => f.write_str("shutdown requested"),
        }
    }
}

/// Requests a shutdown. Only the first pending request is kept.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: mpsc::Sender<ShutdownReason>,
}

impl ShutdownHandle {
    /// Returns `false` when a request is already pending or the engine is gone.
    pub fn notify(&self, reason: ShutdownReason) -> bool {
        self.tx.try_send(reason).is_ok()
    }
}

pub struct Engine {
    client: Listener<AuthHandler>,
    game: Listener<GameHandler>,
    players: Arc<PlayerRegistry>,
    games: Arc<GameRegistry>,
    metrics: Arc<Metrics>,
    shutdown_tx: mpsc::Sender<ShutdownReason>,
    shutdown_rx: mpsc::Receiver<ShutdownReason>,
}

impl Engine {
    /// Binds both listeners.
    pub async fn bind(config: &Config, store: Arc<dyn AccountStore>) -> Result<Self> {
        let players = Arc::new(PlayerRegistry::new());
        let games = Arc::new(GameRegistry::new());
        let metrics = Arc::new(Metrics::new());

        let auth = Arc::new(AuthHandler::new(
            Arc::clone(&players),
            Arc::clone(&games),
            Arc::clone(&store),
            &config.security,
            Arc::clone(&metrics),
        ));
        let gateway = Arc::new(GameHandler::new(
            Arc::clone(&players),
            Arc::clone(&games),
            store,
            Arc::clone(&metrics),
        ));

        let max_frame_size = config.security.max_frame_size;
        let client =
            Listener::bind(&config.client, max_frame_size, auth, Arc::clone(&metrics)).await?;
        let game =
            Listener::bind(&config.game, max_frame_size, gateway, Arc::clone(&metrics)).await?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Ok(Self {
            client,
            game,
            players,
            games,
            metrics,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn client_addr(&self) -> Result<SocketAddr> {
        self.client.local_addr()
    }

    pub fn game_addr(&self) -> Result<SocketAddr> {
        self.game.local_addr()
    }

    pub fn players(&self) -> &Arc<PlayerRegistry> {
        &self.players
    }

    pub fn games(&self) -> &Arc<GameRegistry> {
        &self.games
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Serves until the first shutdown notification, then stops both
    /// listeners and closes every connection.
    pub async fn run(self) -> Result<ShutdownReason> {
        let Self {
            client,
            game,
            metrics,
            shutdown_tx,
            mut shutdown_rx,
            ..
        } = self;
        let token = CancellationToken::new();
        let handle = ShutdownHandle { tx: shutdown_tx };

        let client_task =
            tokio::spawn(watch_listener(client.serve(token.clone()), handle.clone()));
        let game_task = tokio::spawn(watch_listener(game.serve(token.clone()), handle.clone()));
        let signal_task = tokio::spawn(watch_signals(handle.clone()));

        // `handle` keeps the channel open, so recv only ends with a reason
        let reason = shutdown_rx.recv().await.unwrap_or(ShutdownReason::Requested);
        info!(%reason, "Shutting down");

        token.cancel();
        signal_task.abort();
        for task in [client_task, game_task] {
            if let Err(e) = task.await {
                warn!(error = %e, "Listener task ended abnormally");
            }
        }
        drop(handle);

        metrics.log_metrics();
        Ok(reason)
    }
}

async fn watch_listener(serve: impl Future<Output = Result<()>>, handle: ShutdownHandle) {
    if let Err(e) = serve.await {
        error!(error = %e, "Listener stopped");
        handle.notify(ShutdownReason::ListenerFailed(e.to_string()));
    }
}

#[cfg(unix)]
async fn watch_signals(handle: ShutdownHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(error = %e, "Cannot watch SIGTERM");
            None
        }
    };
    loop {
        let name = tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => "SIGINT",
                Err(e) => {
                    warn!(error = %e, "Cannot watch Ctrl-C");
                    return;
                }
            },
            Some(()) = async {
                match terminate.as_mut() {
                    Some(stream) => stream.recv().await,
                    None => std::future::pending().await,
                }
            } => "SIGTERM",
        };
        if !handle.notify(ShutdownReason::Signal(name)) {
            info!(signal = name, "Shutdown already pending");
        }
    }
}

#[cfg(not(unix))]
async fn watch_signals(handle: ShutdownHandle) {
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot watch Ctrl-C");
            return;
        }
        if !handle.notify(ShutdownReason::Signal("Ctrl-C")) {
            info!("Shutdown already pending");
        }
    }
}
