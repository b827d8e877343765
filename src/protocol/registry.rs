//! # Session Registries
//!
//! Live players keyed by account name and live game servers keyed by server
//! index. Each registry owns its records behind one lock; callers get
//! clones or run short closures under the lock, never a reference that
//! outlives it. No lock is held across I/O.

use crate::transport::connection::{ConnectionId, Link};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

/// A logged-in account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Player {
    pub account_id: u32,
    pub account_name: String,
    pub age: u8,
    pub blocked: bool,
    pub last_server_index: u32,
    pub permission: u32,
    pub in_game: bool,
    /// Zero when no handoff is pending.
    pub one_time_key: u64,
    pub game_index: u32,
    /// The login connection that created the session.
    pub connection: ConnectionId,
}

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Mutex<HashMap<String, Player>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts unless the account already has a session, in which case the
    /// existing session is returned.
    pub fn insert_if_absent(&self, player: Player) -> Result<(), Player> {
        let mut players = self.players.lock();
        if let Some(existing) = players.get(&player.account_name) {
            return Err(existing.clone());
        }
        players.insert(player.account_name.clone(), player);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Player> {
        self.players.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.players.lock().contains_key(name)
    }

    /// Runs `f` on the named player under the lock.
    pub fn update<R>(&self, name: &str, f: impl FnOnce(&mut Player) -> R) -> Option<R> {
        self.players.lock().get_mut(name).map(f)
    }

    pub fn remove(&self, name: &str) -> Option<Player> {
        self.players.lock().remove(name)
    }

    /// Removes the named player only if `keep` says no.
    pub fn remove_unless(&self, name: &str, keep: impl FnOnce(&Player) -> bool) -> Option<Player> {
        let mut players = self.players.lock();
        match players.get(name) {
            Some(player) if !keep(player) => players.remove(name),
            _ => None,
        }
    }

    /// Drops every in-game player hosted by `server_index`.
    pub fn remove_on_server(&self, server_index: u32) -> Vec<String> {
        let mut removed = Vec::new();
        self.players.lock().retain(|name, player| {
            let hosted = player.in_game && player.game_index == server_index;
            if hosted {
                removed.push(name.clone());
            }
            !hosted
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.players.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.lock().is_empty()
    }
}

/// A registered game server and the link it registered on.
#[derive(Debug, Clone)]
pub struct Game {
    pub index: u32,
    pub name: String,
    pub screenshot_url: String,
    pub is_adult: bool,
    pub ip: String,
    pub port: i32,
    pub link: Link,
}

#[derive(Debug, Default)]
pub struct GameRegistry {
    games: Mutex<BTreeMap<u32, Game>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers unless the index is taken; the rejected game is handed back.
    pub fn register(&self, game: Game) -> Result<(), Game> {
        let mut games = self.games.lock();
        if games.contains_key(&game.index) {
            return Err(game);
        }
        games.insert(game.index, game);
        Ok(())
    }

    pub fn get(&self, index: u32) -> Option<Game> {
        self.games.lock().get(&index).cloned()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.games.lock().contains_key(&index)
    }

    /// Removes the game only if it was registered by `connection`.
    pub fn remove_owned(&self, index: u32, connection: ConnectionId) -> Option<Game> {
        let mut games = self.games.lock();
        match games.get(&index) {
            Some(game) if game.link.id() == connection => games.remove(&index),
            _ => None,
        }
    }

    /// Maps every game in index order while holding the lock.
    pub fn map_all<T>(&self, f: impl FnMut(&Game) -> T) -> Vec<T> {
        self.games.lock().values().map(f).collect()
    }

    pub fn indices(&self) -> Vec<u32> {
        self.games.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.games.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn player(name: &str) -> Player {
        Player {
            account_name: name.to_string(),
            ..Default::default()
        }
    }

    fn game(index: u32, connection: ConnectionId) -> Game {
        let (link, _rx) = Link::new(
            connection,
            "127.0.0.1:4502".parse().unwrap(),
            CancellationToken::new(),
        );
        Game {
            index,
            name: format!("server-{index}"),
            screenshot_url: String::new(),
            is_adult: false,
            ip: "127.0.0.1".into(),
            port: 4514,
            link,
        }
    }

    #[test]
    fn duplicate_login_is_refused() {
        let registry = PlayerRegistry::new();
        registry.insert_if_absent(player("alice")).unwrap();
        let existing = registry.insert_if_absent(player("alice")).unwrap_err();
        assert_eq!(existing.account_name, "alice");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_unless_in_game() {
        let registry = PlayerRegistry::new();
        registry.insert_if_absent(player("alice")).unwrap();
        registry.update("alice", |p| p.in_game = true);
        assert!(registry.remove_unless("alice", |p| p.in_game).is_none());
        registry.update("alice", |p| p.in_game = false);
        assert!(registry.remove_unless("alice", |p| p.in_game).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn server_loss_drops_hosted_players() {
        let registry = PlayerRegistry::new();
        for (name, index, in_game) in [("a", 1, true), ("b", 2, true), ("c", 1, false)] {
            registry.insert_if_absent(player(name)).unwrap();
            registry.update(name, |p| {
                p.game_index = index;
                p.in_game = in_game;
            });
        }
        assert_eq!(registry.remove_on_server(1), vec!["a".to_string()]);
        assert!(registry.contains("b") && registry.contains("c"));
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let registry = GameRegistry::new();
        registry.register(game(5, 1)).unwrap();
        let rejected = registry.register(game(5, 2)).unwrap_err();
        assert_eq!(rejected.link.id(), 2);
        assert_eq!(registry.get(5).unwrap().link.id(), 1);
    }

    #[test]
    fn only_the_owner_unregisters() {
        let registry = GameRegistry::new();
        registry.register(game(5, 1)).unwrap();
        assert!(registry.remove_owned(5, 2).is_none());
        assert!(registry.remove_owned(5, 1).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_index_ordered() {
        let registry = GameRegistry::new();
        for index in [9, 2, 5] {
            registry.register(game(index, u64::from(index))).unwrap();
        }
        assert_eq!(registry.map_all(|g| g.index), vec![2, 5, 9]);
        assert_eq!(registry.indices(), vec![2, 5, 9]);
    }

    #[test]
    fn concurrent_inserts_admit_exactly_one() {
        let registry = Arc::new(PlayerRegistry::new());
        let winners: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = Arc::clone(&registry);
                    scope.spawn(move || registry.insert_if_absent(player("race")).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| usize::from(h.join().unwrap()))
                .sum()
        });
        assert_eq!(winners, 1);
    }
}
