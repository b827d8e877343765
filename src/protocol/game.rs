//! # Game Handler
//!
//! Game-server-facing state machine. A game server registers its index
//! once, then confirms client handoffs by presenting the one-time key the
//! client received from the auth side, and reports logouts.
//!
//! Game-side frames always use the unversioned layout.

use crate::core::epoch::Epoch;
use crate::core::packet::Frame;
use crate::error::constants::{ERR_ALREADY_REGISTERED, ERR_NOT_REGISTERED};
use crate::error::{ProtocolError, Result};
use crate::protocol::codes::result;
use crate::protocol::dispatcher::{close_on_error, ConnectionHandler};
use crate::protocol::message::{c_string, ids, WireMessage};
use crate::protocol::packets::{
    AccountNotice, ClientLogin, ClientLoginResult, ClientLogout, GameLogin, GameLoginResult,
    SecurityNoCheck,
};
use crate::protocol::registry::{Game, GameRegistry, PlayerRegistry};
use crate::service::accounts::AccountStore;
use crate::transport::connection::{CloseReason, Connection};
use crate::utils::metrics::Metrics;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

const GAME_EPOCH: Epoch = Epoch::UNVERSIONED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamePhase {
    #[default]
    Unregistered,
    /// A game login is being processed.
    Registering,
    Registered(u32),
}

#[derive(Debug, Default)]
pub struct GameSession {
    pub phase: GamePhase,
}

impl GameSession {
    fn server_index(&self) -> Result<u32> {
        match self.phase {
            GamePhase::Registered(index) => Ok(index),
            _ => Err(ProtocolError::StateViolation(ERR_NOT_REGISTERED)),
        }
    }
}

type GameConnection = Connection<GameSession>;

pub struct GameHandler {
    players: Arc<PlayerRegistry>,
    games: Arc<GameRegistry>,
    store: Arc<dyn AccountStore>,
    metrics: Arc<Metrics>,
}

impl GameHandler {
    pub fn new(
        players: Arc<PlayerRegistry>,
        games: Arc<GameRegistry>,
        store: Arc<dyn AccountStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            players,
            games,
            store,
            metrics,
        }
    }

    #[instrument(skip_all, fields(conn = conn.id()))]
    fn game_login(&self, conn: &GameConnection, frame: &Frame) -> Result<()> {
        let login = GameLogin::decode(frame.as_bytes(), GAME_EPOCH)?;
        conn.with_state(|session| match session.phase {
            GamePhase::Unregistered => {
                session.phase = GamePhase::Registering;
                Ok(())
            }
            _ => Err(ProtocolError::StateViolation(ERR_ALREADY_REGISTERED)),
        })?;

        let index = u32::from(login.server_index);
        let game = Game {
            index,
            name: c_string(&login.name),
            screenshot_url: c_string(&login.screenshot_url),
            is_adult: login.is_adult,
            ip: c_string(&login.ip),
            port: login.port,
            link: conn.link().clone(),
        };
        let name = game.name.clone();

        if self.games.register(game).is_err() {
            error!(
                server_index = index,
                name = %name,
                peer = %conn.peer(),
                "Duplicate server index"
            );
            conn.send(ids::GAME_LOGIN_RESULT, &GameLoginResult::new(result::ACCESS_DENIED))?;
            conn.close(CloseReason::Requested);
            return Ok(());
        }

        conn.with_state(|session| session.phase = GamePhase::Registered(index));
        if conn.is_closed() {
            self.games.remove_owned(index, conn.id());
            return Err(ProtocolError::ConnectionClosed);
        }

        info!(
            server_index = index,
            name = %name,
            adult = login.is_adult,
            port = login.port,
            "Game server registered"
        );
        conn.send(ids::GAME_LOGIN_RESULT, &GameLoginResult::new(result::SUCCESS))
    }

    #[instrument(skip_all, fields(conn = conn.id()))]
    async fn client_login(&self, conn: &GameConnection, frame: &Frame) -> Result<()> {
        let index = conn.with_state(|session| session.server_index())?;
        let login = ClientLogin::decode(frame.as_bytes(), GAME_EPOCH)?;
        let name = login.account_name();

        let redeemed = self.players.update(&name, |player| {
            if player.one_time_key == 0 || player.one_time_key != login.one_time_key {
                return None;
            }
            player.in_game = true;
            player.game_index = index;
            player.one_time_key = 0;
            Some(player.clone())
        });

        let player = match redeemed {
            Some(Some(player)) => player,
            Some(None) => {
                error!(account = %name, server_index = index, "One-time key mismatch");
                return conn.send(
                    ids::CLIENT_LOGIN_RESULT,
                    &ClientLoginResult::rejected(login.account, result::ACCESS_DENIED),
                );
            }
            None => {
                error!(account = %name, server_index = index, "Client login for unknown player");
                return conn.send(
                    ids::CLIENT_LOGIN_RESULT,
                    &ClientLoginResult::rejected(login.account, result::ACCESS_DENIED),
                );
            }
        };

        conn.send(
            ids::CLIENT_LOGIN_RESULT,
            &ClientLoginResult {
                account: login.account,
                account_id: player.account_id,
                result: result::SUCCESS,
                permission: player.permission,
                age: u32::from(player.age),
                ..Default::default()
            },
        )?;
        self.metrics.handoff();
        info!(account = %name, server_index = index, "Client handed off");

        let store = Arc::clone(&self.store);
        let account_id = player.account_id;
        let recorded =
            tokio::task::spawn_blocking(move || store.update_last_login_server(account_id, index))
                .await;
        match recorded {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(account = %name, error = %e, "Failed to record last login server"),
            Err(e) => warn!(account = %name, error = %e, "Last login server task failed"),
        }
        Ok(())
    }

    fn client_logout(&self, conn: &GameConnection, frame: &Frame) -> Result<()> {
        let index = conn.with_state(|session| session.server_index())?;
        let logout = ClientLogout::decode(frame.as_bytes(), GAME_EPOCH)?;
        self.release(index, &logout.account_name(), "logout");
        Ok(())
    }

    fn client_kick_failed(&self, conn: &GameConnection, frame: &Frame) -> Result<()> {
        let index = conn.with_state(|session| session.server_index())?;
        let notice = AccountNotice::decode(frame.as_bytes(), GAME_EPOCH)?;
        self.release(index, &notice.account_name(), "kick failed");
        Ok(())
    }

    fn release(&self, index: u32, name: &str, cause: &'static str) {
        match self.players.remove(name) {
            Some(_) => debug!(account = %name, server_index = index, cause, "Player released"),
            None => error!(
                account = %name,
                server_index = index,
                cause,
                "Release of unknown player"
            ),
        }
    }

    fn security_no_check(&self, conn: &GameConnection, frame: &Frame) -> Result<()> {
        let index = conn.with_state(|session| session.server_index())?;
        let notice = SecurityNoCheck::decode(frame.as_bytes(), GAME_EPOCH)?;
        debug!(account = %notice.account_name(), server_index = index, "Security no-check");
        Ok(())
    }
}

impl ConnectionHandler for GameHandler {
    type State = GameSession;

    fn name(&self) -> &'static str {
        "game"
    }

    fn on_connect(&self, conn: &Arc<GameConnection>) {
        debug!(conn = conn.id(), peer = %conn.peer(), "Game server connected");
    }

    async fn on_message(&self, conn: Arc<GameConnection>, frame: Frame) {
        let outcome = match frame.message_id() {
            ids::GAME_LOGIN => self.game_login(&conn, &frame),
            ids::CLIENT_LOGIN => self.client_login(&conn, &frame).await,
            ids::CLIENT_LOGOUT => self.client_logout(&conn, &frame),
            ids::CLIENT_KICK_FAILED => self.client_kick_failed(&conn, &frame),
            ids::SECURITY_NO_CHECK => self.security_no_check(&conn, &frame),
            other => {
                warn!(
                    conn = conn.id(),
                    message_id = other,
                    size = frame.len(),
                    "Unhandled game server message"
                );
                Ok(())
            }
        };
        if let Err(e) = outcome {
            close_on_error(self.name(), &conn, &frame, e, &self.metrics);
        }
    }

    fn on_disconnect(&self, conn: &Arc<GameConnection>, reason: &CloseReason) {
        let phase = conn.with_state(|session| session.phase);
        if let GamePhase::Registered(index) = phase {
            if self.games.remove_owned(index, conn.id()).is_some() {
                let dropped = self.players.remove_on_server(index);
                info!(
                    server_index = index,
                    dropped_players = dropped.len(),
                    ?reason,
                    "Game server unregistered"
                );
            }
        }
        debug!(conn = conn.id(), peer = %conn.peer(), ?reason, "Game server disconnected");
    }
}
