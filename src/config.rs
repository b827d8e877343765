//! # Configuration Management
//!
//! Centralized configuration for both listeners, the credential handshake,
//! the bundled account store and logging.
//!
//! ## Configuration Sources
//! - TOML files via [`Config::from_file`]
//! - Direct instantiation with defaults
//! - `MONONOKE_*` environment overrides via [`Config::apply_env`]
//!
//! ## Example
//! ```toml
//! [client]
//! address = "0.0.0.0:4500"
//! use_encryption = true
//! encryption_key = "}h79q~B%al;k'y $E"
//!
//! [game]
//! address = "127.0.0.1:4502"
//!
//! [security]
//! des_key = "MERONG"
//! age_restriction = 18
//!
//! [[accounts.seed]]
//! id = 1
//! name = "test"
//! password = "test"
//! age = 21
//! ```

use crate::core::codec::DEFAULT_MAX_FRAME_SIZE;
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::net::SocketAddr;
use std::path::Path;
use tracing::Level;

/// Key the stock client uses for its stream cipher
pub const DEFAULT_CLIENT_KEY: &str = "}h79q~B%al;k'y $E";

/// Key folded into the legacy DES password key
pub const DEFAULT_DES_KEY: &str = "MERONG";

/// Minimum age for adult servers
pub const DEFAULT_AGE_RESTRICTION: u8 = 18;

/// Smallest frame limit that still fits the largest login frame
pub const MIN_FRAME_SIZE: usize = 1024;

/// Frame limit above which a typo is more likely than intent
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Listener for game clients
    #[serde(default = "ListenerConfig::client_default")]
    pub client: ListenerConfig,

    /// Listener for game servers
    #[serde(default = "ListenerConfig::game_default")]
    pub game: ListenerConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub accounts: AccountsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: ListenerConfig::client_default(),
            game: ListenerConfig::game_default(),
            security: SecurityConfig::default(),
            accounts: AccountsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Layers `MONONOKE_*` variables over this configuration.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Layers overrides read through `lookup` over this configuration.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("MONONOKE_CLIENT_ADDRESS") {
            self.client.address = addr;
        }
        if let Some(flag) = lookup("MONONOKE_CLIENT_USE_ENCRYPTION") {
            self.client.use_encryption = parse_var("MONONOKE_CLIENT_USE_ENCRYPTION", &flag)?;
        }
        if let Some(key) = lookup("MONONOKE_CLIENT_ENCRYPTION_KEY") {
            self.client.encryption_key = key;
        }
        if let Some(addr) = lookup("MONONOKE_GAME_ADDRESS") {
            self.game.address = addr;
        }
        if let Some(flag) = lookup("MONONOKE_GAME_USE_ENCRYPTION") {
            self.game.use_encryption = parse_var("MONONOKE_GAME_USE_ENCRYPTION", &flag)?;
        }
        if let Some(key) = lookup("MONONOKE_GAME_ENCRYPTION_KEY") {
            self.game.encryption_key = key;
        }
        if let Some(key) = lookup("MONONOKE_DES_KEY") {
            self.security.des_key = key;
        }
        if let Some(age) = lookup("MONONOKE_AGE_RESTRICTION") {
            self.security.age_restriction = parse_var("MONONOKE_AGE_RESTRICTION", &age)?;
        }
        if let Some(size) = lookup("MONONOKE_MAX_FRAME_SIZE") {
            self.security.max_frame_size = parse_var("MONONOKE_MAX_FRAME_SIZE", &size)?;
        }
        if let Some(salt) = lookup("MONONOKE_ACCOUNT_SALT") {
            self.accounts.salt = salt;
        }
        if let Some(level) = lookup("MONONOKE_LOG_LEVEL") {
            self.logging.level = level
                .parse()
                .map_err(|_| ProtocolError::ConfigError(format!("Invalid log level: {level}")))?;
        }
        if let Some(flag) = lookup("MONONOKE_LOG_JSON") {
            self.logging.json_format = parse_var("MONONOKE_LOG_JSON", &flag)?;
        }
        Ok(())
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.client.validate("client"));
        errors.extend(self.game.validate("game"));

        if let (Ok(client), Ok(game)) = (
            self.client.address.parse::<SocketAddr>(),
            self.game.address.parse::<SocketAddr>(),
        ) {
            if client == game && client.port() != 0 {
                errors.push(format!(
                    "Client and game listeners share the address {client}"
                ));
            }
        }

        errors.extend(self.security.validate());
        errors.extend(self.accounts.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ProtocolError::ConfigError(format!("Invalid value for {name}: '{value}'")))
}

/// One TCP listener
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Listen address (e.g., "127.0.0.1:4500")
    pub address: String,

    /// Whether frames pass through the stream cipher
    #[serde(default)]
    pub use_encryption: bool,

    /// Stream cipher key, required when encryption is on
    #[serde(default)]
    pub encryption_key: String,
}

impl ListenerConfig {
    pub fn client_default() -> Self {
        Self {
            address: String::from("127.0.0.1:4500"),
            use_encryption: true,
            encryption_key: String::from(DEFAULT_CLIENT_KEY),
        }
    }

    pub fn game_default() -> Self {
        Self {
            address: String::from("127.0.0.1:4502"),
            use_encryption: false,
            encryption_key: String::new(),
        }
    }

    /// The cipher key, if this listener encrypts.
    pub fn cipher_key(&self) -> Option<&str> {
        self.use_encryption.then_some(self.encryption_key.as_str())
    }

    pub fn validate(&self, name: &str) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push(format!("{name} listener address cannot be empty"));
        } else if self.address.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid {name} listener address format: '{}' (expected format: '0.0.0.0:4500')",
                self.address
            ));
        }

        if self.use_encryption && self.encryption_key.is_empty() {
            errors.push(format!(
                "{name} listener has encryption enabled but no encryption_key"
            ));
        }

        errors
    }
}

/// Credential handshake and frame limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Text folded into the DES password key
    pub des_key: String,

    /// Minimum age to select an adult server
    pub age_restriction: u8,

    /// Largest frame either listener accepts
    pub max_frame_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            des_key: String::from(DEFAULT_DES_KEY),
            age_restriction: DEFAULT_AGE_RESTRICTION,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl SecurityConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.des_key.is_empty() {
            errors.push("DES key cannot be empty".to_string());
        }

        if self.max_frame_size < MIN_FRAME_SIZE {
            errors.push(format!(
                "Max frame size too small: {} bytes (minimum: {MIN_FRAME_SIZE})",
                self.max_frame_size
            ));
        } else if self.max_frame_size > MAX_FRAME_SIZE {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum: {MAX_FRAME_SIZE})",
                self.max_frame_size
            ));
        }

        errors
    }
}

/// Bundled in-memory account store
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AccountsConfig {
    /// Prefixed to every password before hashing
    #[serde(default)]
    pub salt: String,

    #[serde(default)]
    pub seed: Vec<SeedAccount>,
}

impl AccountsConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut names = HashSet::new();
        let mut ids = HashSet::new();

        for account in &self.seed {
            if account.name.is_empty() {
                errors.push(format!("Seed account {} has an empty name", account.id));
            } else if account.name.len() > 60 {
                errors.push(format!(
                    "Seed account name too long: '{}' (maximum: 60 bytes)",
                    account.name
                ));
            }
            if !names.insert(account.name.as_str()) {
                errors.push(format!("Duplicate seed account name: '{}'", account.name));
            }
            if !ids.insert(account.id) {
                errors.push(format!("Duplicate seed account id: {}", account.id));
            }
        }

        errors
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedAccount {
    pub id: u32,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub age: u8,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub last_server_index: u32,
    #[serde(default)]
    pub permission: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(with = "log_level_serde")]
    pub level: Level,

    /// Whether to use JSON formatting for logs
    #[serde(default)]
    pub json_format: bool,

    /// Whether to colour text output
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

fn default_ansi() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            ansi: default_ansi(),
        }
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
