//! # Auth Handler
//!
//! Client-facing state machine: version detection, RSA to AES key exchange,
//! credential checks, the server list and server selection.
//!
//! ```text
//! Unversioned --version--> Versioned --account--> Authenticated --select--> ServerSelected
//! ```
//!
//! While credentials are checked the connection sits in `LoggingIn`; any
//! other account packet seen in that phase closes the connection.
//!
//! Business-rule failures (bad password, unknown server, too young) are
//! answered with a result code and leave the connection open. Protocol-state
//! violations, decode failures and bad keys close it.

use crate::config::SecurityConfig;
use crate::core::epoch::Epoch;
use crate::core::packet::Frame;
use crate::error::constants::{
    ERR_ALREADY_AUTHENTICATED, ERR_ENCRYPTION_FAILED, ERR_LOGIN_IN_PROGRESS,
    ERR_NOT_AUTHENTICATED,
};
use crate::error::{ProtocolError, Result};
use crate::protocol::codes::{login_flag, result};
use crate::protocol::dispatcher::{close_on_error, ConnectionHandler};
use crate::protocol::handshake::{
    decrypt_aes_password, decrypt_des_password, derive_des_key, generate_one_time_key,
    parse_public_key, SessionKey,
};
use crate::protocol::message::{fixed_text, ids, WireMessage};
use crate::protocol::packets::client::{SCREENSHOT_URL_SIZE, SERVER_IP_SIZE, SERVER_NAME_SIZE};
use crate::protocol::packets::game::ACCOUNT_SIZE as GAME_ACCOUNT_SIZE;
use crate::protocol::packets::{
    AccountLogin, AccountNotice, AuthResult, ClientVersion, PublicKeyOffer, SealedAesKey,
    SelectServer, SelectServerResult, ServerInfo, ServerList,
};
use crate::protocol::registry::{GameRegistry, Player, PlayerRegistry};
use crate::protocol::version::{epoch_for_build, implied_epoch};
use crate::service::accounts::{Account, AccountStore};
use crate::transport::connection::{CloseReason, Connection, ConnectionId};
use crate::utils::metrics::Metrics;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Last epoch whose server list counts and indices are 16 bits wide.
const NARROW_LIST_UNTIL: Epoch = Epoch(0x09_06_04);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientPhase {
    #[default]
    Unversioned,
    Versioned,
    /// Credentials are being verified.
    LoggingIn,
    Authenticated,
    ServerSelected,
}

/// Per-connection state of a client.
#[derive(Debug, Default)]
pub struct ClientSession {
    pub phase: ClientPhase,
    /// Account name once the login succeeded.
    pub account: Option<String>,
    pub aes_key: Option<SessionKey>,
}

impl ClientSession {
    fn authenticated_account(&self) -> Result<String> {
        match (self.phase, &self.account) {
            (ClientPhase::Authenticated | ClientPhase::ServerSelected, Some(name)) => {
                Ok(name.clone())
            }
            _ => Err(ProtocolError::StateViolation(ERR_NOT_AUTHENTICATED)),
        }
    }
}

type ClientConnection = Connection<ClientSession>;

pub struct AuthHandler {
    players: Arc<PlayerRegistry>,
    games: Arc<GameRegistry>,
    store: Arc<dyn AccountStore>,
    des_key: [u8; 8],
    age_restriction: u8,
    metrics: Arc<Metrics>,
}

impl AuthHandler {
    pub fn new(
        players: Arc<PlayerRegistry>,
        games: Arc<GameRegistry>,
        store: Arc<dyn AccountStore>,
        security: &SecurityConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            players,
            games,
            store,
            des_key: derive_des_key(&security.des_key),
            age_restriction: security.age_restriction,
            metrics,
        }
    }

    fn reply_login(&self, conn: &ClientConnection, code: u16, flag: i32) -> Result<()> {
        if code == result::SUCCESS {
            self.metrics.login_success();
        } else {
            self.metrics.login_failed();
        }
        conn.send(ids::RESULT, &AuthResult::new(ids::ACCOUNT, code, flag))
    }

    #[instrument(skip_all, fields(conn = conn.id()))]
    async fn account_login(&self, conn: &Arc<ClientConnection>, frame: &Frame) -> Result<()> {
        let login = AccountLogin::decode(frame.as_bytes(), conn.epoch())?;

        let (previous, aes_key) = conn.with_state(|session| match session.phase {
            ClientPhase::Unversioned | ClientPhase::Versioned => {
                let previous = std::mem::replace(&mut session.phase, ClientPhase::LoggingIn);
                Ok((previous, session.aes_key.clone()))
            }
            ClientPhase::LoggingIn => Err(ProtocolError::StateViolation(ERR_LOGIN_IN_PROGRESS)),
            ClientPhase::Authenticated | ClientPhase::ServerSelected => {
                Err(ProtocolError::StateViolation(ERR_ALREADY_AUTHENTICATED))
            }
        })?;

        let outcome = self.verify_login(conn, &login, aes_key).await;
        conn.with_state(|session| {
            if session.phase == ClientPhase::LoggingIn {
                session.phase = previous;
            }
        });
        outcome
    }

    /// Runs with the connection reserved in `LoggingIn`. Only a successful
    /// login moves it on.
    async fn verify_login(
        &self,
        conn: &Arc<ClientConnection>,
        login: &AccountLogin,
        aes_key: Option<SessionKey>,
    ) -> Result<()> {
        let name = login.account_name();
        let password = match aes_key {
            Some(key) => decrypt_aes_password(&key, &login.password, login.password_size)?,
            None => decrypt_des_password(&self.des_key, &login.password)?,
        };

        let store = Arc::clone(&self.store);
        let lookup = name.clone();
        let verified =
            tokio::task::spawn_blocking(move || store.verify_credentials(&lookup, &password))
                .await
                .map_err(|e| ProtocolError::Internal(format!("account lookup task failed: {e}")))?;

        let account = match verified {
            Ok(Some(account)) => account,
            Ok(None) => {
                debug!(account = %name, "Rejected credentials");
                return self.reply_login(conn, result::NOT_EXIST, login_flag::EULA_ACCEPTED);
            }
            Err(e) => {
                warn!(account = %name, error = %e, "Account store failed during login");
                return self.reply_login(conn, result::DB_ERROR, login_flag::EULA_ACCEPTED);
            }
        };

        if account.blocked {
            info!(account = %name, account_id = account.id, "Blocked account tried to log in");
            return self.reply_login(
                conn,
                result::ACCESS_DENIED,
                login_flag::ACCOUNT_BLOCK_WARNING,
            );
        }

        let player = new_player(&name, &account, conn.id());
        if let Err(existing) = self.players.insert_if_absent(player) {
            warn!(
                account = %name,
                in_game = existing.in_game,
                "Account already has a live session"
            );
            if existing.in_game {
                self.kick_from_game(&existing);
            }
            return self.reply_login(conn, result::ALREADY_EXIST, login_flag::EULA_ACCEPTED);
        }

        conn.with_state(|session| {
            session.phase = ClientPhase::Authenticated;
            session.account = Some(name.clone());
        });
        // The connection may have gone away while the store was consulted;
        // its disconnect cleanup could have run before the session existed.
        if conn.is_closed() {
            let id = conn.id();
            self.players
                .remove_unless(&name, |player| player.in_game || player.connection != id);
            return Err(ProtocolError::ConnectionClosed);
        }

        info!(
            account = %name,
            account_id = account.id,
            epoch = %conn.epoch(),
            "Client logged in"
        );
        self.reply_login(conn, result::SUCCESS, login_flag::EULA_ACCEPTED)
    }

    /// Asks the game server hosting `player` to drop them.
    fn kick_from_game(&self, player: &Player) {
        let Some(game) = self.games.get(player.game_index) else {
            warn!(
                account = %player.account_name,
                server_index = player.game_index,
                "In-game player's server is gone"
            );
            return;
        };
        let notice = AccountNotice::new(fixed_text(&player.account_name, GAME_ACCOUNT_SIZE));
        if let Err(e) = game.link.send_at(ids::KICK_CLIENT, &notice, Epoch::UNVERSIONED) {
            warn!(
                account = %player.account_name,
                server_index = game.index,
                error = %e,
                "Failed to send kick request"
            );
        }
    }

    #[instrument(skip_all, fields(conn = conn.id()))]
    fn server_list(&self, conn: &ClientConnection) -> Result<()> {
        let name = conn.with_state(|session| session.authenticated_account())?;
        let player = self
            .players
            .get(&name)
            .ok_or(ProtocolError::StateViolation(ERR_NOT_AUTHENTICATED))?;

        let epoch = conn.epoch();
        let cap = if epoch <= NARROW_LIST_UNTIL {
            usize::from(u16::MAX)
        } else {
            usize::try_from(u32::MAX).unwrap_or(usize::MAX)
        };

        let mut servers = self.games.map_all(|game| ServerInfo {
            index: game.index,
            name: fixed_text(&game.name, SERVER_NAME_SIZE),
            is_adult: game.is_adult,
            screenshot_url: fixed_text(&game.screenshot_url, SCREENSHOT_URL_SIZE),
            ip: fixed_text(&game.ip, SERVER_IP_SIZE),
            port: game.port,
            user_ratio: 0,
        });
        servers.truncate(cap);

        debug!(account = %name, servers = servers.len(), "Sending server list");
        conn.send(
            ids::SERVER_LIST,
            &ServerList {
                last_login_server_index: player.last_server_index,
                servers,
                ..Default::default()
            },
        )
    }

    #[instrument(skip_all, fields(conn = conn.id()))]
    fn select_server(&self, conn: &ClientConnection, frame: &Frame) -> Result<()> {
        let epoch = conn.epoch();
        let request = SelectServer::decode(frame.as_bytes(), epoch)?;
        let name = conn.with_state(|session| session.authenticated_account())?;
        let index = request.server_index;

        let player = self
            .players
            .get(&name)
            .ok_or(ProtocolError::StateViolation(ERR_NOT_AUTHENTICATED))?;
        if player.in_game {
            error!(
                account = %name,
                server_index = player.game_index,
                "Server selection while in game"
            );
            return conn.send(
                ids::SELECT_SERVER_RESULT,
                &SelectServerResult::failure(result::ACCESS_DENIED),
            );
        }

        let Some(game) = self.games.get(index) else {
            warn!(account = %name, server_index = index, "Selected unknown server");
            return conn.send(
                ids::SELECT_SERVER_RESULT,
                &SelectServerResult::failure(result::ACCESS_DENIED),
            );
        };
        if game.is_adult && player.age < self.age_restriction {
            info!(
                account = %name,
                server_index = index,
                age = player.age,
                "Too young for server"
            );
            return conn.send(
                ids::SELECT_SERVER_RESULT,
                &SelectServerResult::failure(result::TOO_YOUNG),
            );
        }

        // Newer layouts only carry the key sealed under the session key.
        let sealing_key = if epoch < Epoch::V8_1_1 {
            None
        } else {
            match conn.with_state(|session| session.aes_key.clone()) {
                Some(key) => Some(key),
                None => {
                    warn!(account = %name, "No session key, one-time key cannot be delivered");
                    return conn.send(
                        ids::SELECT_SERVER_RESULT,
                        &SelectServerResult::failure(result::ACCESS_DENIED),
                    );
                }
            }
        };

        let one_time_key = generate_one_time_key();
        let mut reply = SelectServerResult {
            result: result::SUCCESS,
            ..Default::default()
        };
        match &sealing_key {
            None => reply.one_time_key = one_time_key,
            Some(key) => {
                let sealed = key.seal_one_time_key(one_time_key)?;
                reply.encrypted_size = i32::try_from(sealed.len())
                    .map_err(|_| ProtocolError::Crypto(ERR_ENCRYPTION_FAILED))?;
                reply.encrypted_data = sealed;
            }
        }

        let claimed = self.players.update(&name, |player| {
            if player.in_game {
                return false;
            }
            player.in_game = true;
            player.game_index = index;
            player.one_time_key = one_time_key;
            true
        });
        match claimed {
            Some(true) => {}
            Some(false) => {
                return conn.send(
                    ids::SELECT_SERVER_RESULT,
                    &SelectServerResult::failure(result::ACCESS_DENIED),
                )
            }
            None => return Err(ProtocolError::StateViolation(ERR_NOT_AUTHENTICATED)),
        }

        conn.with_state(|session| session.phase = ClientPhase::ServerSelected);

        info!(account = %name, server_index = index, "Server selected");
        conn.send(ids::SELECT_SERVER_RESULT, &reply)
    }

    #[instrument(skip_all, fields(conn = conn.id(), message_id = frame.message_id()))]
    fn public_key(&self, conn: &ClientConnection, frame: &Frame) -> Result<()> {
        let offer = PublicKeyOffer::decode(frame.as_bytes(), conn.epoch())?;
        let public_key = parse_public_key(&offer.key)?;

        let session_key = SessionKey::generate();
        let sealed = session_key.seal(&public_key)?;
        conn.with_state(|session| session.aes_key = Some(session_key));

        let reply_id = if frame.message_id() == ids::RSA_PUBLIC_KEY {
            ids::AES_KEY
        } else {
            ids::AES_KEY_V2
        };
        debug!(sealed_len = sealed.len(), "Session key issued");
        conn.send(
            reply_id,
            &SealedAesKey {
                key: sealed,
                ..Default::default()
            },
        )
    }
}

fn new_player(name: &str, account: &Account, connection: ConnectionId) -> Player {
    Player {
        account_id: account.id,
        account_name: name.to_owned(),
        age: account.age,
        blocked: account.blocked,
        last_server_index: account.last_server_index,
        permission: account.permission,
        connection,
        ..Default::default()
    }
}

impl ConnectionHandler for AuthHandler {
    type State = ClientSession;

    fn name(&self) -> &'static str {
        "auth"
    }

    fn on_connect(&self, conn: &Arc<ClientConnection>) {
        debug!(conn = conn.id(), peer = %conn.peer(), "Client connected");
    }

    fn inspect(&self, conn: &Arc<ClientConnection>, frame: &Frame) -> Result<()> {
        let header = frame.header();
        if let Some(floor) = implied_epoch(header.message_id, header.size) {
            let epoch = conn.raise_epoch(floor);
            debug!(
                conn = conn.id(),
                message_id = header.message_id,
                %epoch,
                "Epoch implied by frame"
            );
        }

        if header.message_id == ids::VERSION {
            let version = ClientVersion::decode(frame.as_bytes(), Epoch::UNVERSIONED)?;
            let build = version.build();
            let epoch = conn.raise_epoch(epoch_for_build(&build)?);
            conn.with_state(|session| {
                if session.phase == ClientPhase::Unversioned {
                    session.phase = ClientPhase::Versioned;
                }
            });
            info!(conn = conn.id(), build = %build, %epoch, "Client version");
        }
        Ok(())
    }

    async fn on_message(&self, conn: Arc<ClientConnection>, frame: Frame) {
        let outcome = match frame.message_id() {
            // consumed by inspect
            ids::VERSION | ids::PING => Ok(()),
            ids::ACCOUNT => self.account_login(&conn, &frame).await,
            ids::SERVER_LIST_REQUEST => self.server_list(&conn),
            ids::SELECT_SERVER => self.select_server(&conn, &frame),
            ids::RSA_PUBLIC_KEY | ids::RSA_PUBLIC_KEY_V2 => self.public_key(&conn, &frame),
            other => {
                warn!(
                    conn = conn.id(),
                    message_id = other,
                    size = frame.len(),
                    "Unhandled client message"
                );
                Ok(())
            }
        };
        if let Err(e) = outcome {
            close_on_error(self.name(), &conn, &frame, e, &self.metrics);
        }
    }

    fn on_disconnect(&self, conn: &Arc<ClientConnection>, reason: &CloseReason) {
        let account = conn.with_state(|session| session.account.clone());
        if let Some(name) = account {
            let id = conn.id();
            let removed = self
                .players
                .remove_unless(&name, |player| player.in_game || player.connection != id);
            debug!(account = %name, removed = removed.is_some(), "Released client session");
        }
        debug!(conn = conn.id(), peer = %conn.peer(), ?reason, "Client disconnected");
    }
}
