//! # Account Store
//!
//! The login handlers only need two things from persistent storage: check a
//! name and password, and remember which server an account last played on.
//! [`AccountStore`] is that seam. Implementations are synchronous and are
//! always called from a blocking task.
//!
//! [`MemoryAccountStore`] keeps salted SHA-256 digests in memory and is
//! seeded from configuration.

use crate::config::{AccountsConfig, SeedAccount};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use thiserror::Error;
use tracing::debug;

/// Account row as the handlers see it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Account {
    pub id: u32,
    pub name: String,
    pub age: u8,
    pub blocked: bool,
    pub last_server_index: u32,
    pub permission: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("account {0} does not exist")]
    NotFound(u32),

    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

pub trait AccountStore: Send + Sync + 'static {
    /// `Ok(None)` when the name is unknown or the password does not match.
    fn verify_credentials(&self, name: &str, password: &str) -> Result<Option<Account>, StoreError>;

    fn update_last_login_server(
        &self,
        account_id: u32,
        server_index: u32,
    ) -> Result<(), StoreError>;
}

/// Hex SHA-256 of `salt` followed by `password`.
pub fn hash_password(salt: &str, password: &str) -> String {
    let digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    digest.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

#[derive(Debug, Clone)]
struct StoredAccount {
    account: Account,
    digest: String,
}

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    salt: String,
    accounts: RwLock<HashMap<String, StoredAccount>>,
}

impl MemoryAccountStore {
    pub fn new(salt: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AccountsConfig) -> Self {
        let store = Self::new(config.salt.clone());
        for seed in &config.seed {
            store.insert(seed.to_account(), &seed.password);
        }
        debug!(accounts = config.seed.len(), "Seeded account store");
        store
    }

    /// Adds or replaces an account.
    pub fn insert(&self, account: Account, password: &str) {
        let digest = hash_password(&self.salt, password);
        self.accounts
            .write()
            .insert(account.name.clone(), StoredAccount { account, digest });
    }

    pub fn account(&self, name: &str) -> Option<Account> {
        self.accounts
            .read()
            .get(name)
            .map(|stored| stored.account.clone())
    }
}

impl AccountStore for MemoryAccountStore {
    fn verify_credentials(
        &self,
        name: &str,
        password: &str,
    ) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read();
        let Some(stored) = accounts.get(name) else {
            return Ok(None);
        };
        if stored.digest != hash_password(&self.salt, password) {
            return Ok(None);
        }
        Ok(Some(stored.account.clone()))
    }

    fn update_last_login_server(
        &self,
        account_id: u32,
        server_index: u32,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write();
        let stored = accounts
            .values_mut()
            .find(|stored| stored.account.id == account_id)
            .ok_or(StoreError::NotFound(account_id))?;
        stored.account.last_server_index = server_index;
        Ok(())
    }
}

impl SeedAccount {
    fn to_account(&self) -> Account {
        Account {
            id: self.id,
            name: self.name.clone(),
            age: self.age,
            blocked: self.blocked,
            last_server_index: self.last_server_index,
            permission: self.permission,
        }
    }
}
