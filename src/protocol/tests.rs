// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::config::SecurityConfig;
use crate::core::epoch::Epoch;
use crate::core::packet::{Frame, HEADER_LEN};
use crate::error::{ProtocolError, Result};
use crate::protocol::auth::{AuthHandler, ClientPhase, ClientSession};
use crate::protocol::codes::{login_flag, result};
use crate::protocol::dispatcher::{dispatch, ConnectionHandler};
use crate::protocol::game::{GameHandler, GamePhase, GameSession};
use crate::protocol::message::{c_string, fixed_text, ids, WireMessage};
use crate::protocol::packets::client::{
    ACCOUNT_LEGACY_SIZE, ACCOUNT_SIZE, SCREENSHOT_URL_SIZE, SERVER_IP_SIZE, SERVER_NAME_SIZE,
};
use crate::protocol::packets::{
    AccountLogin, AccountNotice, AuthResult, ClientLogin, ClientLoginResult, ClientLogout,
    ClientVersion, GameLogin, GameLoginResult, PublicKeyOffer, SealedAesKey, SelectServer,
    SelectServerResult, ServerList,
};
use crate::protocol::registry::{GameRegistry, PlayerRegistry};
use crate::service::accounts::{Account, MemoryAccountStore};
use crate::transport::connection::{CloseReason, Connection, Outbound};
use crate::utils::metrics::Metrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

/// "hunter2" NUL padded to 32 bytes, DES-ECB under the key folded from "MERONG".
const HUNTER2_DES: &str = "fc3629e09a9e9df1935c3805c7e6d1fc935c3805c7e6d1fc935c3805c7e6d1fc";

const OLDEST_BUILD: &str = "200609280";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unhex(text: &str) -> Vec<u8> {
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).unwrap())
        .collect()
}

struct World {
    players: Arc<PlayerRegistry>,
    games: Arc<GameRegistry>,
    store: Arc<MemoryAccountStore>,
    metrics: Arc<Metrics>,
    auth: Arc<AuthHandler>,
    game: Arc<GameHandler>,
}

fn world() -> World {
    let store = Arc::new(MemoryAccountStore::new("2011"));
    store.insert(
        Account {
            id: 1,
            name: "alice".into(),
            age: 21,
            last_server_index: 3,
            permission: 100,
            ..Default::default()
        },
        "hunter2",
    );
    store.insert(
        Account {
            id: 2,
            name: "kid".into(),
            age: 12,
            ..Default::default()
        },
        "hunter2",
    );
    store.insert(
        Account {
            id: 3,
            name: "mallory".into(),
            age: 30,
            blocked: true,
            ..Default::default()
        },
        "hunter2",
    );

    let players = Arc::new(PlayerRegistry::new());
    let games = Arc::new(GameRegistry::new());
    let metrics = Arc::new(Metrics::new());
    let auth = Arc::new(AuthHandler::new(
        Arc::clone(&players),
        Arc::clone(&games),
        store.clone(),
        &SecurityConfig::default(),
        Arc::clone(&metrics),
    ));
    let game = Arc::new(GameHandler::new(
        Arc::clone(&players),
        Arc::clone(&games),
        store.clone(),
        Arc::clone(&metrics),
    ));
    World {
        players,
        games,
        store,
        metrics,
        auth,
        game,
    }
}

/// One side of a connection under test: the handler's view plus the queue
/// the writer task would drain.
struct Peer<S> {
    conn: Arc<Connection<S>>,
    rx: UnboundedReceiver<Outbound>,
}

impl<S: Default> Peer<S> {
    fn open() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let peer = format!("127.0.0.1:{}", 40000 + id).parse().unwrap();
        let (conn, rx) = Connection::open(id, peer, CancellationToken::new(), S::default());
        Self { conn, rx }
    }
}

impl<S> Peer<S> {
    fn next_frame(&mut self) -> Frame {
        match self.rx.try_recv() {
            Ok(Outbound::Frame(frame)) => frame,
            Ok(Outbound::Close) => panic!("expected a frame, got a close"),
            Err(e) => panic!("expected a frame, queue is {e:?}"),
        }
    }

    fn expect<M: WireMessage>(&mut self, message_id: u16) -> M {
        let frame = self.next_frame();
        assert_eq!(frame.message_id(), message_id);
        M::decode(frame.as_bytes(), self.conn.epoch()).unwrap()
    }

    fn expect_close(&mut self) {
        assert!(matches!(self.rx.try_recv(), Ok(Outbound::Close)));
        assert!(self.conn.is_closed());
    }

    fn assert_quiet(&mut self) {
        assert!(self.rx.try_recv().is_err());
        assert!(!self.conn.is_closed());
    }
}

async fn send<H: ConnectionHandler>(
    handler: &Arc<H>,
    peer: &Peer<H::State>,
    message_id: u16,
    message: &impl WireMessage,
    epoch: Epoch,
) -> Result<()> {
    let frame = Frame::seal(message_id, message.encode(epoch).unwrap()).unwrap();
    dispatch(handler, &peer.conn, frame)?.await.unwrap();
    Ok(())
}

fn des_login(name: &str, password_hex: &str) -> AccountLogin {
    AccountLogin {
        account: fixed_text(name, ACCOUNT_LEGACY_SIZE),
        password: unhex(password_hex),
        ..Default::default()
    }
}

fn announced_game(index: u16, adult: bool) -> GameLogin {
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

async fn announce(world: &World, client: &Peer<ClientSession>, build: &str) {
    let version = ClientVersion::new(build);
    send(&world.auth, client, ids::VERSION, &version, Epoch::UNVERSIONED)
        .await
        .unwrap();
}

/// Version plus DES login on the oldest layout.
async fn logged_in(world: &World, name: &str) -> Peer<ClientSession> {
    let mut client = Peer::open();
    announce(world, &client, OLDEST_BUILD).await;
    send(&world.auth, &client, ids::ACCOUNT, &des_login(name, HUNTER2_DES), Epoch::V2_0)
        .await
        .unwrap();
    let reply: AuthResult = client.expect(ids::RESULT);
    assert_eq!(reply.result, result::SUCCESS, "login of {name}");
    client
}

async fn registered(world: &World, index: u16, adult: bool) -> Peer<GameSession> {
    let mut game = Peer::open();
    send(&world.game, &game, ids::GAME_LOGIN, &announced_game(index, adult), Epoch::UNVERSIONED)
        .await
        .unwrap();
    let reply: GameLoginResult = game.expect(ids::GAME_LOGIN_RESULT);
    assert_eq!(reply.result, result::SUCCESS);
    game
}

async fn select(world: &World, client: &mut Peer<ClientSession>, index: u32) -> SelectServerResult {
    let request = SelectServer {
        server_index: index,
        ..Default::default()
    };
    let epoch = client.conn.epoch();
    send(&world.auth, client, ids::SELECT_SERVER, &request, epoch).await.unwrap();
    client.expect(ids::SELECT_SERVER_RESULT)
}

async fn redeem(
    world: &World,
    game: &mut Peer<GameSession>,
    name: &str,
    key: u64,
) -> ClientLoginResult {
    let login = ClientLogin {
        account: fixed_text(name, ACCOUNT_SIZE),
        one_time_key: key,
        ..Default::default()
    };
    send(&world.game, game, ids::CLIENT_LOGIN, &login, Epoch::UNVERSIONED).await.unwrap();
    game.expect(ids::CLIENT_LOGIN_RESULT)
}

#[tokio::test]
async fn des_login_on_oldest_layout_creates_player() {
    let world = world();
    let client = logged_in(&world, "alice").await;

    assert_eq!(client.conn.epoch(), Epoch::V2_0);
    let player = world.players.get("alice").unwrap();
    assert_eq!(player.account_id, 1);
    assert_eq!(player.age, 21);
    assert_eq!(player.permission, 100);
    assert!(!player.in_game);
    assert_eq!(player.connection, client.conn.id());
    assert_eq!(
        client.conn.with_state(|s| (s.phase, s.account.clone())),
        (ClientPhase::Authenticated, Some("alice".to_string()))
    );
    assert_eq!(world.metrics.snapshot().logins_success, 1);
}

#[tokio::test]
async fn login_failures_answer_and_keep_the_connection() {
    let world = world();
    let mut client = Peer::open();
    announce(&world, &client, OLDEST_BUILD).await;

    let wrong = "00".repeat(32);
    send(&world.auth, &client, ids::ACCOUNT, &des_login("alice", &wrong), Epoch::V2_0)
        .await
        .unwrap();
    let reply: AuthResult = client.expect(ids::RESULT);
    assert_eq!(reply.request_message_id, ids::ACCOUNT);
    assert_eq!(reply.result, result::NOT_EXIST);
    assert_eq!(reply.login_flag, login_flag::EULA_ACCEPTED);

    send(&world.auth, &client, ids::ACCOUNT, &des_login("mallory", HUNTER2_DES), Epoch::V2_0)
        .await
        .unwrap();
    let reply: AuthResult = client.expect(ids::RESULT);
    assert_eq!(reply.result, result::ACCESS_DENIED);
    assert_eq!(reply.login_flag, login_flag::ACCOUNT_BLOCK_WARNING);

    client.assert_quiet();
    assert!(world.players.is_empty());
    assert_eq!(client.conn.with_state(|s| s.phase), ClientPhase::Versioned);
    assert_eq!(world.metrics.snapshot().logins_failed, 2);
}

#[tokio::test]
async fn second_login_on_same_connection_closes_it() {
    let world = world();
    let mut client = logged_in(&world, "alice").await;
    send(&world.auth, &client, ids::ACCOUNT, &des_login("kid", HUNTER2_DES), Epoch::V2_0)
        .await
        .unwrap();
    client.expect_close();
    assert!(!world.players.contains("kid"));
}

#[tokio::test]
async fn unparsable_version_is_rejected_inline() {
    let world = world();
    let client: Peer<ClientSession> = Peer::open();
    let outcome = send(
        &world.auth,
        &client,
        ids::VERSION,
        &ClientVersion::new("20x6"),
        Epoch::UNVERSIONED,
    )
    .await;
    assert!(matches!(outcome, Err(ProtocolError::InvalidVersion(_))));
}

#[tokio::test]
async fn build_date_selects_epoch() {
    let world = world();
    let mut client: Peer<ClientSession> = Peer::open();
    announce(&world, &client, "201507080").await;
    assert_eq!(client.conn.epoch(), Epoch::V9_2);
    assert_eq!(client.conn.with_state(|s| s.phase), ClientPhase::Versioned);
    client.assert_quiet();
}

#[tokio::test]
async fn unauthenticated_requests_close_the_connection() {
    let world = world();
    let mut client: Peer<ClientSession> = Peer::open();
    send(&world.auth, &client, ids::SERVER_LIST_REQUEST, &ClientVersion::default(), Epoch::V2_0)
        .await
        .unwrap();
    client.expect_close();
    assert!(matches!(
        client.conn.link().close_reason(),
        Some(CloseReason::Failed(_))
    ));
    assert_eq!(world.metrics.snapshot().protocol_errors, 1);
}

#[tokio::test]
async fn unknown_and_keepalive_messages_are_ignored() {
    let world = world();
    let mut client: Peer<ClientSession> = Peer::open();
    send(&world.auth, &client, ids::PING, &ClientVersion::default(), Epoch::UNVERSIONED)
        .await
        .unwrap();
    send(&world.auth, &client, 4242, &ClientVersion::default(), Epoch::UNVERSIONED)
        .await
        .unwrap();
    client.assert_quiet();
}

#[tokio::test]
async fn server_list_snapshots_registered_games() {
    let world = world();
    let _first = registered(&world, 2, false).await;
    let _second = registered(&world, 1, true).await;
    let mut client = logged_in(&world, "alice").await;

    send(&world.auth, &client, ids::SERVER_LIST_REQUEST, &ClientVersion::default(), Epoch::V2_0)
        .await
        .unwrap();
    let list: ServerList = client.expect(ids::SERVER_LIST);
    assert_eq!(list.last_login_server_index, 3);
    assert_eq!(list.servers.len(), 2);
    assert_eq!(list.servers[0].index, 1);
    assert_eq!(c_string(&list.servers[0].name), "Server 1");
    assert_eq!(c_string(&list.servers[1].ip), "10.0.0.5");
    assert_eq!(list.servers[1].port, 4514);
}

#[tokio::test]
async fn selecting_unknown_server_is_denied_without_mutation() {
    let world = world();
    let mut client = logged_in(&world, "alice").await;
    let before = world.players.get("alice").unwrap();

    let reply = select(&world, &mut client, 9).await;
    assert_eq!(reply.result, result::ACCESS_DENIED);
    assert_eq!(reply.one_time_key, 0);
    assert_eq!(world.players.get("alice").unwrap(), before);
    client.assert_quiet();
}

#[tokio::test]
async fn underage_player_cannot_select_adult_server() {
    let world = world();
    let _game = registered(&world, 4, true).await;
    let mut client = logged_in(&world, "kid").await;

    let reply = select(&world, &mut client, 4).await;
    assert_eq!(reply.result, result::TOO_YOUNG);
    let player = world.players.get("kid").unwrap();
    assert!(!player.in_game);
    assert_eq!(player.one_time_key, 0);
}

#[tokio::test]
async fn duplicate_server_index_is_rejected_and_closed() {
    let world = world();
    let first = registered(&world, 5, false).await;

    let mut second: Peer<GameSession> = Peer::open();
    send(&world.game, &second, ids::GAME_LOGIN, &announced_game(5, true), Epoch::UNVERSIONED)
        .await
        .unwrap();
    let reply: GameLoginResult = second.expect(ids::GAME_LOGIN_RESULT);
    assert_eq!(reply.result, result::ACCESS_DENIED);
    second.expect_close();

    let game = world.games.get(5).unwrap();
    assert_eq!(game.link.id(), first.conn.id());
    assert!(!game.is_adult);
    assert_eq!(world.games.len(), 1);

    // the loser's disconnect must not unregister the winner
    world.game.on_disconnect(&second.conn, &CloseReason::Requested);
    assert!(world.games.contains(5));
}

#[tokio::test]
async fn one_time_key_hands_the_player_off() {
    let world = world();
    let mut game = registered(&world, 5, false).await;
    let mut client = logged_in(&world, "alice").await;

    let selection = select(&world, &mut client, 5).await;
    assert_eq!(selection.result, result::SUCCESS);
    let key = selection.one_time_key;
    assert_ne!(key, 0);
    assert_eq!(client.conn.with_state(|s| s.phase), ClientPhase::ServerSelected);

    let rejected = redeem(&world, &mut game, "alice", key ^ 1).await;
    assert_eq!(rejected.result, result::ACCESS_DENIED);
    assert_eq!(c_string(&rejected.account), "alice");
    assert_eq!(world.players.get("alice").unwrap().one_time_key, key);

    let admitted = redeem(&world, &mut game, "alice", key).await;
    assert_eq!(admitted.result, result::SUCCESS);
    assert_eq!(admitted.account_id, 1);
    assert_eq!(admitted.permission, 100);
    assert_eq!(admitted.age, 21);

    let player = world.players.get("alice").unwrap();
    assert!(player.in_game);
    assert_eq!(player.game_index, 5);
    assert_eq!(player.one_time_key, 0);
    assert_eq!(world.store.account("alice").unwrap().last_server_index, 5);
    assert_eq!(world.metrics.snapshot().handoffs, 1);

    // a key is good for one handoff only
    let replayed = redeem(&world, &mut game, "alice", key).await;
    assert_eq!(replayed.result, result::ACCESS_DENIED);
}

#[tokio::test]
async fn selecting_again_while_in_game_is_denied_but_open() {
    let world = world();
    let _game = registered(&world, 5, false).await;
    let mut client = logged_in(&world, "alice").await;
    assert_eq!(select(&world, &mut client, 5).await.result, result::SUCCESS);

    let again = select(&world, &mut client, 5).await;
    assert_eq!(again.result, result::ACCESS_DENIED);
    client.assert_quiet();
}

#[tokio::test]
async fn client_disconnect_keeps_in_game_players() {
    let world = world();
    let _game = registered(&world, 5, false).await;
    let idle = logged_in(&world, "kid").await;
    let mut playing = logged_in(&world, "alice").await;
    assert_eq!(select(&world, &mut playing, 5).await.result, result::SUCCESS);

    world.auth.on_disconnect(&idle.conn, &CloseReason::PeerClosed);
    world.auth.on_disconnect(&playing.conn, &CloseReason::PeerClosed);

    assert!(!world.players.contains("kid"));
    assert!(world.players.contains("alice"));
}

#[tokio::test]
async fn relogin_while_in_game_kicks_from_the_hosting_server() {
    let world = world();
    let mut game = registered(&world, 5, false).await;
    let mut first = logged_in(&world, "alice").await;
    let key = select(&world, &mut first, 5).await.one_time_key;
    assert_eq!(redeem(&world, &mut game, "alice", key).await.result, result::SUCCESS);
    world.auth.on_disconnect(&first.conn, &CloseReason::PeerClosed);

    let mut second: Peer<ClientSession> = Peer::open();
    announce(&world, &second, OLDEST_BUILD).await;
    send(&world.auth, &second, ids::ACCOUNT, &des_login("alice", HUNTER2_DES), Epoch::V2_0)
        .await
        .unwrap();
    let reply: AuthResult = second.expect(ids::RESULT);
    assert_eq!(reply.result, result::ALREADY_EXIST);

    let kick: AccountNotice = game.expect(ids::KICK_CLIENT);
    assert_eq!(kick.account_name(), "alice");

    // the game server could not find the client and says so
    send(&world.game, &game, ids::CLIENT_KICK_FAILED, &kick, Epoch::UNVERSIONED)
        .await
        .unwrap();
    assert!(!world.players.contains("alice"));
    game.assert_quiet();
}

#[tokio::test]
async fn logout_releases_the_player() {
    let world = world();
    let mut game = registered(&world, 5, false).await;
    let mut client = logged_in(&world, "alice").await;
    let key = select(&world, &mut client, 5).await.one_time_key;
    redeem(&world, &mut game, "alice", key).await;

    let logout = ClientLogout {
        account: fixed_text("alice", ACCOUNT_SIZE),
        continuous_play_time: 60,
        ..Default::default()
    };
    send(&world.game, &game, ids::CLIENT_LOGOUT, &logout, Epoch::UNVERSIONED)
        .await
        .unwrap();
    assert!(!world.players.contains("alice"));

    // unknown players are only logged
    send(&world.game, &game, ids::CLIENT_LOGOUT, &logout, Epoch::UNVERSIONED)
        .await
        .unwrap();
    game.assert_quiet();
}

#[tokio::test]
async fn game_messages_require_registration() {
    let world = world();
    let mut game: Peer<GameSession> = Peer::open();
    let login = ClientLogin {
        account: fixed_text("alice", ACCOUNT_SIZE),
        one_time_key: 7,
        ..Default::default()
    };
    send(&world.game, &game, ids::CLIENT_LOGIN, &login, Epoch::UNVERSIONED)
        .await
        .unwrap();
    game.expect_close();
}

#[tokio::test]
async fn game_server_disconnect_drops_its_players() {
    let world = world();
    let mut game = registered(&world, 5, false).await;
    let _other = registered(&world, 6, false).await;
    let mut client = logged_in(&world, "alice").await;
    let key = select(&world, &mut client, 5).await.one_time_key;
    redeem(&world, &mut game, "alice", key).await;
    let _bystander = logged_in(&world, "kid").await;

    assert_eq!(game.conn.with_state(|s| s.phase), GamePhase::Registered(5));
    world.game.on_disconnect(&game.conn, &CloseReason::PeerClosed);

    assert!(!world.games.contains(5));
    assert!(world.games.contains(6));
    assert!(!world.players.contains("alice"));
    assert!(world.players.contains("kid"));
}

#[tokio::test]
async fn rsa_exchange_then_aes_login_and_sealed_key() {
    use aes::Aes128;
    use cbc::cipher::block_padding::Pkcs7;
    use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};

    let world = world();
    let mut game = registered(&world, 5, false).await;

    let private = RsaPrivateKey::new(&mut rsa::rand_core::OsRng, 1024).unwrap();
    let pem = private
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap();
    let mut client: Peer<ClientSession> = Peer::open();
    let offer = PublicKeyOffer {
        key: pem.into_bytes(),
        ..Default::default()
    };
    send(&world.auth, &client, ids::RSA_PUBLIC_KEY, &offer, Epoch::UNVERSIONED)
        .await
        .unwrap();
    assert_eq!(client.conn.epoch(), Epoch::V9_6_3);

    let sealed: SealedAesKey = client.expect(ids::AES_KEY);
    let session = private.decrypt(Pkcs1v15Encrypt, &sealed.key).unwrap();
    assert_eq!(session.len(), 32);
    let (key, iv) = session.split_at(16);

    let encrypted = cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
        .unwrap()
        .encrypt_padded_vec_mut::<Pkcs7>(b"hunter2");
    let mut password = encrypted.clone();
    password.resize(77, 0);
    let login = AccountLogin {
        account: fixed_text("alice", ACCOUNT_SIZE),
        password_size: encrypted.len() as u32,
        password,
        ..Default::default()
    };
    send(&world.auth, &client, ids::ACCOUNT, &login, Epoch::V9_6_3)
        .await
        .unwrap();
    let reply: AuthResult = client.expect(ids::RESULT);
    assert_eq!(reply.result, result::SUCCESS);

    let selection = select(&world, &mut client, 5).await;
    assert_eq!(selection.result, result::SUCCESS);
    assert_eq!(selection.one_time_key, 0);
    assert_eq!(selection.encrypted_size, 16);

    let mut sealed_key = selection.encrypted_data[..16].to_vec();
    let plain = cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
        .unwrap()
        .decrypt_padded_mut::<Pkcs7>(&mut sealed_key)
        .unwrap();
    let one_time_key = u64::from_le_bytes(plain.try_into().unwrap());

    let admitted = redeem(&world, &mut game, "alice", one_time_key).await;
    assert_eq!(admitted.result, result::SUCCESS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_logins_on_one_connection_leave_no_session_behind() {
    for _ in 0..50 {
        let world = world();
        let mut client: Peer<ClientSession> = Peer::open();
        announce(&world, &client, OLDEST_BUILD).await;

        let frames = ["alice", "kid"].map(|name| {
            let login = des_login(name, HUNTER2_DES);
            Frame::seal(ids::ACCOUNT, login.encode(Epoch::V2_0).unwrap()).unwrap()
        });
        let handles: Vec<_> = frames
            .into_iter()
            .map(|frame| dispatch(&world.auth, &client.conn, frame).unwrap())
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // the second account packet always violates the login state
        assert!(client.conn.is_closed());
        let mut successes = 0;
        while let Ok(item) = client.rx.try_recv() {
            if let Outbound::Frame(frame) = item {
                let reply = AuthResult::decode(frame.as_bytes(), Epoch::V2_0).unwrap();
                if reply.result == result::SUCCESS {
                    successes += 1;
                }
            }
        }
        assert!(successes <= 1);

        world.auth.on_disconnect(&client.conn, &CloseReason::PeerClosed);
        assert!(world.players.is_empty(), "a login outlived its connection");
    }
}

#[tokio::test]
async fn account_packet_during_login_is_a_state_violation() {
    let world = world();
    let mut client: Peer<ClientSession> = Peer::open();
    announce(&world, &client, OLDEST_BUILD).await;
    client.conn.with_state(|s| s.phase = ClientPhase::LoggingIn);

    send(&world.auth, &client, ids::ACCOUNT, &des_login("alice", HUNTER2_DES), Epoch::V2_0)
        .await
        .unwrap();
    client.expect_close();
    assert!(world.players.is_empty());
}

#[tokio::test]
async fn reply_to_a_dead_writer_closes_the_connection() {
    let world = world();
    let Peer { conn, rx } = logged_in(&world, "alice").await;
    drop(rx);

    let request = Frame::seal(ids::SERVER_LIST_REQUEST, vec![0; HEADER_LEN]).unwrap();
    dispatch(&world.auth, &conn, request).unwrap().await.unwrap();

    assert!(conn.is_closed());
    world.auth.on_disconnect(&conn, &conn.link().close_reason().unwrap());
    assert!(!world.players.contains("alice"));
}

#[tokio::test]
async fn sealed_layout_without_session_key_denies_selection() {
    let world = world();
    let _game = registered(&world, 5, false).await;
    let mut client: Peer<ClientSession> = Peer::open();
    announce(&world, &client, "201507080").await;
    assert_eq!(client.conn.epoch(), Epoch::V9_2);

    // no key exchange: the password still goes through DES
    send(&world.auth, &client, ids::ACCOUNT, &des_login("alice", HUNTER2_DES), Epoch::V9_2)
        .await
        .unwrap();
    let reply: AuthResult = client.expect(ids::RESULT);
    assert_eq!(reply.result, result::SUCCESS);

    let selection = select(&world, &mut client, 5).await;
    assert_eq!(selection.result, result::ACCESS_DENIED);
    assert_eq!(selection.encrypted_size, 0);

    let player = world.players.get("alice").unwrap();
    assert!(!player.in_game);
    assert_eq!(player.one_time_key, 0);
    assert_eq!(client.conn.with_state(|s| s.phase), ClientPhase::Authenticated);
    client.assert_quiet();

    client.conn.close(CloseReason::PeerClosed);
    world.auth.on_disconnect(&client.conn, &CloseReason::PeerClosed);
    assert!(world.players.is_empty());
}
