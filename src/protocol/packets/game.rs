//! Messages exchanged with game servers. These never changed layout, so
//! they are always decoded at [`Epoch::UNVERSIONED`](crate::core::epoch::Epoch::UNVERSIONED).

use crate::core::packet::{FrameHeader, HEADER};
use crate::core::schema::{Field, Length, Record, Scalar, Schema};
use crate::error::CodecError;
use crate::protocol::message::{c_string, WireMessage};

pub const ACCOUNT_SIZE: usize = 61;

pub static GAME_LOGIN: Schema = Schema::new(
    "GameLogin",
    &[
        Field::record("header", &HEADER),
        Field::scalar("server_index", Scalar::U16),
        Field::bytes("name", Length::Fixed(21)),
        Field::bytes("screenshot_url", Length::Fixed(256)),
        Field::scalar("is_adult", Scalar::U8),
        Field::bytes("ip", Length::Fixed(16)),
        Field::scalar("port", Scalar::I32),
    ],
);

pub static GAME_LOGIN_RESULT: Schema = Schema::new(
    "GameLoginResult",
    &[Field::record("header", &HEADER), Field::scalar("result", Scalar::U16)],
);

pub static CLIENT_LOGIN: Schema = Schema::new(
    "ClientLogin",
    &[
        Field::record("header", &HEADER),
        Field::bytes("account", Length::Fixed(ACCOUNT_SIZE)),
        Field::scalar("one_time_key", Scalar::U64),
    ],
);

pub static CLIENT_LOGIN_RESULT: Schema = Schema::new(
    "ClientLoginResult",
    &[
        Field::record("header", &HEADER),
        Field::bytes("account", Length::Fixed(ACCOUNT_SIZE)),
        Field::scalar("account_id", Scalar::U32),
        Field::scalar("result", Scalar::U16),
        Field::scalar("permission", Scalar::U32),
        Field::scalar("pc_bang_user", Scalar::U8),
        Field::scalar("event_code", Scalar::U32),
        Field::scalar("age", Scalar::U32),
        Field::scalar("continuous_play_time", Scalar::U32),
        Field::scalar("continuous_logout_time", Scalar::U32),
    ],
);

pub static CLIENT_LOGOUT: Schema = Schema::new(
    "ClientLogout",
    &[
        Field::record("header", &HEADER),
        Field::bytes("account", Length::Fixed(ACCOUNT_SIZE)),
        Field::scalar("continuous_play_time", Scalar::U32),
    ],
);

/// Shared by kick-client and client-kick-failed.
pub static ACCOUNT_ONLY: Schema = Schema::new(
    "AccountOnly",
    &[
        Field::record("header", &HEADER),
        Field::bytes("account", Length::Fixed(ACCOUNT_SIZE)),
    ],
);

pub static SECURITY_NO_CHECK: Schema = Schema::new(
    "SecurityNoCheck",
    &[
        Field::record("header", &HEADER),
        Field::bytes("account", Length::Fixed(ACCOUNT_SIZE)),
        Field::bytes("security", Length::Fixed(19)),
    ],
);

fn header(record: &Record) -> Result<FrameHeader, CodecError> {
    FrameHeader::from_record(record.record("header")?)
}

/// A game server announcing itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameLogin {
    pub header: FrameHeader,
    pub server_index: u16,
    pub name: Vec<u8>,
    pub screenshot_url: Vec<u8>,
    pub is_adult: bool,
    pub ip: Vec<u8>,
    pub port: i32,
}

impl WireMessage for GameLogin {
    fn schema() -> &'static Schema {
        &GAME_LOGIN
    }

    fn to_record(&self) -> Record {
        Record::new(&GAME_LOGIN)
            .with("header", self.header.to_record())
            .with("server_index", self.server_index)
            .with("name", self.name.clone())
            .with("screenshot_url", self.screenshot_url.clone())
            .with("is_adult", u8::from(self.is_adult))
            .with("ip", self.ip.clone())
            .with("port", self.port)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            server_index: record.u16("server_index")?,
            name: record.bytes("name")?.to_vec(),
            screenshot_url: record.bytes("screenshot_url")?.to_vec(),
            is_adult: record.u8("is_adult")? != 0,
            ip: record.bytes("ip")?.to_vec(),
            port: record.i32("port")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameLoginResult {
    pub header: FrameHeader,
    pub result: u16,
}

impl GameLoginResult {
    pub fn new(result: u16) -> Self {
        Self {
            result,
            ..Default::default()
        }
    }
}

impl WireMessage for GameLoginResult {
    fn schema() -> &'static Schema {
        &GAME_LOGIN_RESULT
    }

    fn to_record(&self) -> Record {
        Record::new(&GAME_LOGIN_RESULT)
            .with("header", self.header.to_record())
            .with("result", self.result)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            result: record.u16("result")?,
        })
    }
}

/// A client presenting its one-time key to a game server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientLogin {
    pub header: FrameHeader,
    pub account: Vec<u8>,
    pub one_time_key: u64,
}

impl ClientLogin {
    pub fn account_name(&self) -> String {
        c_string(&self.account)
    }
}

impl WireMessage for ClientLogin {
    fn schema() -> &'static Schema {
        &CLIENT_LOGIN
    }

    fn to_record(&self) -> Record {
        Record::new(&CLIENT_LOGIN)
            .with("header", self.header.to_record())
            .with("account", self.account.clone())
            .with("one_time_key", self.one_time_key)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            account: record.bytes("account")?.to_vec(),
            one_time_key: record.uint("one_time_key")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientLoginResult {
    pub header: FrameHeader,
    pub account: Vec<u8>,
    pub account_id: u32,
    pub result: u16,
    pub permission: u32,
    pub pc_bang_user: u8,
    pub event_code: u32,
    pub age: u32,
    pub continuous_play_time: u32,
    pub continuous_logout_time: u32,
}

impl ClientLoginResult {
    /// A failure that only echoes the account back.
    pub fn rejected(account: Vec<u8>, result: u16) -> Self {
        Self {
            account,
            result,
            ..Default::default()
        }
    }
}

impl WireMessage for ClientLoginResult {
    fn schema() -> &'static Schema {
        &CLIENT_LOGIN_RESULT
    }

    fn to_record(&self) -> Record {
        Record::new(&CLIENT_LOGIN_RESULT)
            .with("header", self.header.to_record())
            .with("account", self.account.clone())
            .with("account_id", self.account_id)
            .with("result", self.result)
            .with("permission", self.permission)
            .with("pc_bang_user", self.pc_bang_user)
            .with("event_code", self.event_code)
            .with("age", self.age)
            .with("continuous_play_time", self.continuous_play_time)
            .with("continuous_logout_time", self.continuous_logout_time)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            account: record.bytes("account")?.to_vec(),
            account_id: record.u32("account_id")?,
            result: record.u16("result")?,
            permission: record.u32("permission")?,
            pc_bang_user: record.u8("pc_bang_user")?,
            event_code: record.u32("event_code")?,
            age: record.u32("age")?,
            continuous_play_time: record.u32("continuous_play_time")?,
            continuous_logout_time: record.u32("continuous_logout_time")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientLogout {
    pub header: FrameHeader,
    pub account: Vec<u8>,
    pub continuous_play_time: u32,
}

impl ClientLogout {
    pub fn account_name(&self) -> String {
        c_string(&self.account)
    }
}

impl WireMessage for ClientLogout {
    fn schema() -> &'static Schema {
        &CLIENT_LOGOUT
    }

    fn to_record(&self) -> Record {
        Record::new(&CLIENT_LOGOUT)
            .with("header", self.header.to_record())
            .with("account", self.account.clone())
            .with("continuous_play_time", self.continuous_play_time)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            account: record.bytes("account")?.to_vec(),
            continuous_play_time: record.u32("continuous_play_time")?,
        })
    }
}

/// Sent to a game server to drop a player (kick-client), and sent back
/// when the server could not (client-kick-failed).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountNotice {
    pub header: FrameHeader,
    pub account: Vec<u8>,
}

impl AccountNotice {
    pub fn new(account: Vec<u8>) -> Self {
        Self {
            account,
            ..Default::default()
        }
    }

    pub fn account_name(&self) -> String {
        c_string(&self.account)
    }
}

impl WireMessage for AccountNotice {
    fn schema() -> &'static Schema {
        &ACCOUNT_ONLY
    }

    fn to_record(&self) -> Record {
        Record::new(&ACCOUNT_ONLY)
            .with("header", self.header.to_record())
            .with("account", self.account.clone())
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            account: record.bytes("account")?.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecurityNoCheck {
    pub header: FrameHeader,
    pub account: Vec<u8>,
    pub security: Vec<u8>,
}

impl SecurityNoCheck {
    pub fn account_name(&self) -> String {
        c_string(&self.account)
    }
}

impl WireMessage for SecurityNoCheck {
    fn schema() -> &'static Schema {
        &SECURITY_NO_CHECK
    }

    fn to_record(&self) -> Record {
        Record::new(&SECURITY_NO_CHECK)
            .with("header", self.header.to_record())
            .with("account", self.account.clone())
            .with("security", self.security.clone())
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            account: record.bytes("account")?.to_vec(),
            security: record.bytes("security")?.to_vec(),
        })
    }
}
