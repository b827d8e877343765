//! Shared harness for tests that drive a live engine over loopback TCP.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use futures::{SinkExt, StreamExt};
use mononoke::config::{Config, SeedAccount, DEFAULT_CLIENT_KEY};
use mononoke::core::codec::FrameCodec;
use mononoke::core::epoch::Epoch;
use mononoke::core::packet::Frame;
use mononoke::protocol::codes::result;
use mononoke::protocol::message::{fixed_text, ids, WireMessage};
use mononoke::protocol::packets::client::{
    ACCOUNT_LEGACY_SIZE, SCREENSHOT_URL_SIZE, SERVER_IP_SIZE, SERVER_NAME_SIZE,
};
use mononoke::protocol::packets::{
    AccountLogin, AuthResult, ClientVersion, GameLogin, GameLoginResult,
};
use mononoke::protocol::registry::{GameRegistry, PlayerRegistry};
use mononoke::service::accounts::MemoryAccountStore;
use mononoke::service::engine::{Engine, ShutdownHandle, ShutdownReason};
use mononoke::utils::metrics::Metrics;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

/// "hunter2" under the DES key folded from the default key text.
pub const HUNTER2_DES: &str = "fc3629e09a9e9df1935c3805c7e6d1fc935c3805c7e6d1fc935c3805c7e6d1fc";

pub const OLDEST_BUILD: &str = "200609280";

const WAIT: Duration = Duration::from_secs(5);

pub fn unhex(text: &str) -> Vec<u8> {
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).unwrap())
        .collect()
}

fn seed(id: u32, name: &str, age: u8) -> SeedAccount {
    SeedAccount {
        id,
        name: name.to_string(),
        password: "hunter2".to_string(),
        age,
        blocked: false,
        last_server_index: 0,
        permission: 0,
    }
}

/// Loopback configuration with ephemeral ports and a few seeded accounts.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.client.address = "127.0.0.1:0".to_string();
    config.game.address = "127.0.0.1:0".to_string();
    config.accounts.salt = "2011".to_string();
    config.accounts.seed = (1..=32)
        .map(|id| seed(id, &format!("user{id}"), 21))
        .chain([seed(100, "kid", 12)])
        .collect();
    config
}

/// A running engine and the handles tests inspect it through.
pub struct Harness {
    pub client_addr: SocketAddr,
    pub game_addr: SocketAddr,
    pub players: Arc<PlayerRegistry>,
    pub games: Arc<GameRegistry>,
    pub metrics: Arc<Metrics>,
    pub store: Arc<MemoryAccountStore>,
    shutdown: ShutdownHandle,
    task: JoinHandle<mononoke::Result<ShutdownReason>>,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with(test_config()).await
    }

    pub async fn start_with(config: Config) -> Self {
        let store = Arc::new(MemoryAccountStore::from_config(&config.accounts));
        let engine = Engine::bind(&config, store.clone()).await.expect("bind");
        let harness_parts = (
            engine.client_addr().unwrap(),
            engine.game_addr().unwrap(),
            Arc::clone(engine.players()),
            Arc::clone(engine.games()),
            Arc::clone(engine.metrics()),
            engine.shutdown_handle(),
        );
        let task = tokio::spawn(engine.run());
        let (client_addr, game_addr, players, games, metrics, shutdown) = harness_parts;
        Self {
            client_addr,
            game_addr,
            players,
            games,
            metrics,
            store,
            shutdown,
            task,
        }
    }

    pub async fn client(&self) -> Wire {
        Wire::connect(self.client_addr, Some(DEFAULT_CLIENT_KEY)).await
    }

    pub async fn game_server(&self) -> Wire {
        Wire::connect(self.game_addr, None).await
    }

    /// A client that announced the oldest build and logged in with DES.
    pub async fn logged_in(&self, name: &str) -> Wire {
        let mut client = self.client().await;
        client.announce(OLDEST_BUILD).await;
        let reply = client.des_login(name, HUNTER2_DES).await;
        assert_eq!(reply.result, result::SUCCESS, "login of {name}");
        client
    }

    /// A game server registered under `index`.
    pub async fn registered(&self, index: u16, adult: bool) -> Wire {
        let mut game = self.game_server().await;
        game.send(ids::GAME_LOGIN, &announced_game(index, adult)).await;
        let reply: GameLoginResult = game.recv(ids::GAME_LOGIN_RESULT).await;
        assert_eq!(reply.result, result::SUCCESS);
        game
    }

    /// Polls until `check` holds.
    pub async fn eventually(&self, what: &str, check: impl Fn(&Self) -> bool) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while !check(self) {
            if tokio::time::Instant::now() > deadline {
                panic!("timed out waiting for {what}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn stop(self) -> ShutdownReason {
        assert!(self.shutdown.notify(ShutdownReason::Requested));
        tokio::time::timeout(Duration::from_secs(15), self.task)
            .await
            .expect("engine stops in time")
            .expect("engine task")
            .expect("engine result")
    }
}

pub fn announced_game(index: u16, adult: bool) -> GameLogin {
    GameLogin {
        server_index: index,
        name: fixed_text(&format!("Server {index}"), SERVER_NAME_SIZE),
        screenshot_url: fixed_text("http://shots.example/1.png", SCREENSHOT_URL_SIZE),
        is_adult: adult,
        ip: fixed_text("10.0.0.5", SERVER_IP_SIZE),
        port: 4514,
        ..Default::default()
    }
}

/// The peer side of one connection, framed with the same codec the server
/// uses.
pub struct Wire {
    reader: FramedRead<OwnedReadHalf, FrameCodec>,
    writer: FramedWrite<OwnedWriteHalf, FrameCodec>,
    /// Layout used to encode and decode, as the peer believes it.
    pub epoch: Epoch,
}

impl Wire {
    pub async fn connect(addr: SocketAddr, key: Option<&str>) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        stream.set_nodelay(true).unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            reader: FramedRead::new(reader, FrameCodec::for_key(key).unwrap()),
            writer: FramedWrite::new(writer, FrameCodec::for_key(key).unwrap()),
            epoch: Epoch::UNVERSIONED,
        }
    }

    pub async fn send<M: WireMessage>(&mut self, message_id: u16, message: &M) {
        let frame = Frame::seal(message_id, message.encode(self.epoch).unwrap()).unwrap();
        self.send_frame(frame).await;
    }

    pub async fn send_frame(&mut self, frame: Frame) {
        self.writer.send(frame).await.expect("send");
    }

    /// Writes bytes as they are, bypassing the codec. Only meaningful on a
    /// plain listener.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        let stream = self.writer.get_mut();
        stream.write_all(bytes).await.expect("write");
        stream.flush().await.expect("flush");
    }

    pub async fn next_frame(&mut self) -> Frame {
        match tokio::time::timeout(WAIT, self.reader.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => panic!("bad frame from server: {e}"),
            Ok(None) => panic!("server closed the connection"),
            Err(_) => panic!("no frame within {WAIT:?}"),
        }
    }

    pub async fn recv<M: WireMessage>(&mut self, message_id: u16) -> M {
        let frame = self.next_frame().await;
        assert_eq!(frame.message_id(), message_id, "unexpected message");
        M::decode(frame.as_bytes(), self.epoch).unwrap()
    }

    /// Waits for the server to close the socket.
    pub async fn expect_closed(&mut self) {
        loop {
            match tokio::time::timeout(WAIT, self.reader.next()).await {
                Ok(None) | Ok(Some(Err(_))) => return,
                Ok(Some(Ok(frame))) => {
                    panic!("expected close, got message {}", frame.message_id())
                }
                Err(_) => panic!("connection still open after {WAIT:?}"),
            }
        }
    }

    /// Asserts nothing arrives for a short while.
    pub async fn expect_silence(&mut self) {
        let outcome = tokio::time::timeout(Duration::from_millis(200), self.reader.next()).await;
        assert!(outcome.is_err(), "expected silence, got {outcome:?}");
    }

    pub async fn announce(&mut self, build: &str) {
        self.send(ids::VERSION, &ClientVersion::new(build)).await;
        self.epoch = mononoke::protocol::version::epoch_for_build(build).unwrap();
    }

    pub async fn des_login(&mut self, name: &str, password_hex: &str) -> AuthResult {
        let login = AccountLogin {
            account: fixed_text(name, ACCOUNT_LEGACY_SIZE),
            password: unhex(password_hex),
            ..Default::default()
        };
        self.send(ids::ACCOUNT, &login).await;
        self.recv(ids::RESULT).await
    }

    pub async fn close(mut self) {
        let _ = self.writer.close().await;
    }
}
