//! Messages exchanged with game clients.
//!
//! Layouts changed many times across client releases; the windows below
//! follow the epochs in [`Epoch`](crate::core::epoch::Epoch).

use crate::core::epoch::VersionWindow;
use crate::core::packet::{FrameHeader, HEADER};
use crate::core::schema::{Field, Length, Record, Scalar, Schema, Variant};
use crate::error::CodecError;
use crate::protocol::message::{c_string, fixed_text, WireMessage};

/// Epochs before this one send indices and counts as `u16`.
const NARROW_INDICES: VersionWindow = VersionWindow::until(0x09_06_04);

pub const ACCOUNT_LEGACY_SIZE: usize = 19;
pub const ACCOUNT_SIZE: usize = 61;
pub const ACCOUNT_SIZE_V9_6_6: usize = 56;
pub const SERVER_NAME_SIZE: usize = 21;
pub const SCREENSHOT_URL_SIZE: usize = 256;
pub const SERVER_IP_SIZE: usize = 16;
pub const ENCRYPTED_OTK_SIZE: usize = 24;

pub static VERSION: Schema = Schema::new(
    "ClientVersion",
    &[
        Field::record("header", &HEADER),
        Field::bytes("version", Length::Fixed(20)),
    ],
);

static ACCOUNT_NAME: &[Variant] = &[
    Variant::new(Length::Fixed(ACCOUNT_LEGACY_SIZE), VersionWindow::until(0x05_01_FF)),
    Variant::new(Length::Fixed(ACCOUNT_SIZE), VersionWindow::between(0x05_02_00, 0x09_06_05)),
    Variant::new(Length::Fixed(ACCOUNT_SIZE_V9_6_6), VersionWindow::since(0x09_06_06)),
];

static PASSWORD: &[Variant] = &[
    Variant::new(Length::Fixed(32), VersionWindow::until(0x05_01_FF)),
    Variant::new(Length::Fixed(61), VersionWindow::between(0x05_02_00, 0x08_01_00)),
    Variant::new(Length::Fixed(77), VersionWindow::between(0x08_01_01, 0x09_06_05)),
    Variant::new(Length::Fixed(516), VersionWindow::exactly(0x09_06_06)),
    Variant::new(Length::Field("password_size"), VersionWindow::since(0x09_06_07)),
];

pub static ACCOUNT: Schema = Schema::new(
    "AccountLogin",
    &[
        Field::record("header", &HEADER),
        Field::bytes("account", Length::Fixed(ACCOUNT_SIZE)).variants(ACCOUNT_NAME),
        Field::bytes("mac_stamp", Length::Fixed(8)).present(VersionWindow::since(0x09_06_06)),
        Field::scalar("password_size", Scalar::U32).present(VersionWindow::since(0x08_01_01)),
        Field::bytes("password", Length::Fixed(32)).variants(PASSWORD),
    ],
);

/// Public key from the client and the sealed AES key sent back.
pub static KEY_BLOB: Schema = Schema::new(
    "KeyBlob",
    &[
        Field::record("header", &HEADER),
        Field::scalar("size", Scalar::U32),
        Field::bytes("key", Length::Field("size")),
    ],
);

pub static RESULT: Schema = Schema::new(
    "AuthResult",
    &[
        Field::record("header", &HEADER),
        Field::scalar("request_message_id", Scalar::U16),
        Field::scalar("result", Scalar::U16),
        Field::scalar("login_flag", Scalar::I32),
    ],
);

static RESULT_BODY: Schema = Schema::new(
    "AuthResultBody",
    &[
        Field::scalar("request_message_id", Scalar::U16),
        Field::scalar("result", Scalar::U16),
        Field::scalar("login_flag", Scalar::I32),
    ],
);

pub static RESULT_WITH_STRING: Schema = Schema::new(
    "AuthResultWithString",
    &[
        Field::record("header", &HEADER),
        Field::record("body", &RESULT_BODY),
        Field::scalar("message_size", Scalar::U32),
        Field::bytes("message", Length::Field("message_size")),
    ],
);

pub static SERVER_INFO: Schema = Schema::new(
    "ServerInfo",
    &[
        Field::scalar("index", Scalar::U32).represented_as(Scalar::U16, NARROW_INDICES),
        Field::bytes("name", Length::Fixed(SERVER_NAME_SIZE)),
        Field::scalar("is_adult", Scalar::U8).present(VersionWindow::since(0x04_01_00)),
        Field::bytes("screenshot_url", Length::Fixed(SCREENSHOT_URL_SIZE))
            .present(VersionWindow::since(0x04_01_00)),
        Field::bytes("ip", Length::Fixed(SERVER_IP_SIZE)),
        Field::scalar("port", Scalar::I32),
        Field::scalar("user_ratio", Scalar::U16),
    ],
);

pub static SERVER_LIST: Schema = Schema::new(
    "ServerList",
    &[
        Field::record("header", &HEADER),
        Field::scalar("last_login_server_index", Scalar::U32)
            .represented_as(Scalar::U16, NARROW_INDICES),
        Field::scalar("server_count", Scalar::U32).represented_as(Scalar::U16, NARROW_INDICES),
        Field::records("servers", &SERVER_INFO, Length::Remaining),
    ],
);

pub static SELECT_SERVER: Schema = Schema::new(
    "SelectServer",
    &[
        Field::record("header", &HEADER),
        Field::scalar("server_index", Scalar::U32).represented_as(Scalar::U16, NARROW_INDICES),
    ],
);

pub static SELECT_SERVER_RESULT: Schema = Schema::new(
    "SelectServerResult",
    &[
        Field::record("header", &HEADER),
        Field::scalar("result", Scalar::U16),
        Field::scalar("one_time_key", Scalar::U64).present(VersionWindow::until(0x08_01_00)),
        Field::scalar("encrypted_size", Scalar::I32).present(VersionWindow::since(0x08_01_01)),
        Field::bytes("encrypted_data", Length::Fixed(ENCRYPTED_OTK_SIZE))
            .present(VersionWindow::since(0x08_01_01)),
        Field::scalar("pending_time", Scalar::U32),
    ],
);

fn header(record: &Record) -> Result<FrameHeader, CodecError> {
    FrameHeader::from_record(record.record("header")?)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientVersion {
    pub header: FrameHeader,
    pub version: Vec<u8>,
}

impl ClientVersion {
    pub fn new(build: &str) -> Self {
        Self {
            version: fixed_text(build, 20),
            ..Default::default()
        }
    }

    /// The build string, e.g. `"200609280"`.
    pub fn build(&self) -> String {
        c_string(&self.version)
    }
}

impl WireMessage for ClientVersion {
    fn schema() -> &'static Schema {
        &VERSION
    }

    fn to_record(&self) -> Record {
        Record::new(&VERSION)
            .with("header", self.header.to_record())
            .with("version", self.version.clone())
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            version: record.bytes("version")?.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountLogin {
    pub header: FrameHeader,
    pub account: Vec<u8>,
    pub mac_stamp: Vec<u8>,
    pub password_size: u32,
    pub password: Vec<u8>,
}

impl AccountLogin {
    pub fn account_name(&self) -> String {
        c_string(&self.account)
    }
}

impl WireMessage for AccountLogin {
    fn schema() -> &'static Schema {
        &ACCOUNT
    }

    fn to_record(&self) -> Record {
        Record::new(&ACCOUNT)
            .with("header", self.header.to_record())
            .with("account", self.account.clone())
            .with("mac_stamp", self.mac_stamp.clone())
            .with("password_size", self.password_size)
            .with("password", self.password.clone())
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            account: record.bytes("account")?.to_vec(),
            mac_stamp: record.bytes("mac_stamp")?.to_vec(),
            password_size: record.u32("password_size")?,
            password: record.bytes("password")?.to_vec(),
        })
    }
}

fn key_blob(header: &FrameHeader, key: &[u8]) -> Record {
    Record::new(&KEY_BLOB)
        .with("header", header.to_record())
        .with("size", key.len() as u32)
        .with("key", key.to_vec())
}

/// PEM encoded RSA public key offered by the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublicKeyOffer {
    pub header: FrameHeader,
    pub key: Vec<u8>,
}

impl WireMessage for PublicKeyOffer {
    fn schema() -> &'static Schema {
        &KEY_BLOB
    }

    fn to_record(&self) -> Record {
        key_blob(&self.header, &self.key)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            key: record.bytes("key")?.to_vec(),
        })
    }
}

/// The session AES key, sealed with the client's public key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SealedAesKey {
    pub header: FrameHeader,
    pub key: Vec<u8>,
}

impl WireMessage for SealedAesKey {
    fn schema() -> &'static Schema {
        &KEY_BLOB
    }

    fn to_record(&self) -> Record {
        key_blob(&self.header, &self.key)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            key: record.bytes("key")?.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthResult {
    pub header: FrameHeader,
    pub request_message_id: u16,
    pub result: u16,
    pub login_flag: i32,
}

impl AuthResult {
    pub fn new(request_message_id: u16, result: u16, login_flag: i32) -> Self {
        Self {
            request_message_id,
            result,
            login_flag,
            ..Default::default()
        }
    }
}

impl WireMessage for AuthResult {
    fn schema() -> &'static Schema {
        &RESULT
    }

    fn to_record(&self) -> Record {
        Record::new(&RESULT)
            .with("header", self.header.to_record())
            .with("request_message_id", self.request_message_id)
            .with("result", self.result)
            .with("login_flag", self.login_flag)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            request_message_id: record.u16("request_message_id")?,
            result: record.u16("result")?,
            login_flag: record.i32("login_flag")?,
        })
    }
}

/// A result with a free-form message attached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthResultWithString {
    pub header: FrameHeader,
    pub request_message_id: u16,
    pub result: u16,
    pub login_flag: i32,
    pub message: Vec<u8>,
}

impl WireMessage for AuthResultWithString {
    fn schema() -> &'static Schema {
        &RESULT_WITH_STRING
    }

    fn to_record(&self) -> Record {
        let body = Record::new(&RESULT_BODY)
            .with("request_message_id", self.request_message_id)
            .with("result", self.result)
            .with("login_flag", self.login_flag);
        Record::new(&RESULT_WITH_STRING)
            .with("header", self.header.to_record())
            .with("body", body)
            .with("message_size", self.message.len() as u32)
            .with("message", self.message.clone())
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        let body = record.record("body")?;
        Ok(Self {
            header: header(record)?,
            request_message_id: body.u16("request_message_id")?,
            result: body.u16("result")?,
            login_flag: body.i32("login_flag")?,
            message: record.bytes("message")?.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerInfo {
    pub index: u32,
    pub name: Vec<u8>,
    pub is_adult: bool,
    pub screenshot_url: Vec<u8>,
    pub ip: Vec<u8>,
    pub port: i32,
    pub user_ratio: u16,
}

impl ServerInfo {
    fn to_record(&self) -> Record {
        Record::new(&SERVER_INFO)
            .with("index", self.index)
            .with("name", self.name.clone())
            .with("is_adult", u8::from(self.is_adult))
            .with("screenshot_url", self.screenshot_url.clone())
            .with("ip", self.ip.clone())
            .with("port", self.port)
            .with("user_ratio", self.user_ratio)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            index: record.u32("index")?,
            name: record.bytes("name")?.to_vec(),
            is_adult: record.u8("is_adult")? != 0,
            screenshot_url: record.bytes("screenshot_url")?.to_vec(),
            ip: record.bytes("ip")?.to_vec(),
            port: record.i32("port")?,
            user_ratio: record.u16("user_ratio")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerList {
    pub header: FrameHeader,
    pub last_login_server_index: u32,
    pub servers: Vec<ServerInfo>,
}

impl WireMessage for ServerList {
    fn schema() -> &'static Schema {
        &SERVER_LIST
    }

    fn to_record(&self) -> Record {
        Record::new(&SERVER_LIST)
            .with("header", self.header.to_record())
            .with("last_login_server_index", self.last_login_server_index)
            .with("server_count", self.servers.len() as u32)
            .with(
                "servers",
                self.servers.iter().map(ServerInfo::to_record).collect::<Vec<_>>(),
            )
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            last_login_server_index: record.u32("last_login_server_index")?,
            servers: record
                .records("servers")?
                .iter()
                .map(ServerInfo::from_record)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectServer {
    pub header: FrameHeader,
    pub server_index: u32,
}

impl WireMessage for SelectServer {
    fn schema() -> &'static Schema {
        &SELECT_SERVER
    }

    fn to_record(&self) -> Record {
        Record::new(&SELECT_SERVER)
            .with("header", self.header.to_record())
            .with("server_index", self.server_index)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            server_index: record.u32("server_index")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectServerResult {
    pub header: FrameHeader,
    pub result: u16,
    pub one_time_key: u64,
    pub encrypted_size: i32,
    pub encrypted_data: Vec<u8>,
    pub pending_time: u32,
}

impl SelectServerResult {
    pub fn failure(result: u16) -> Self {
        Self {
            result,
            ..Default::default()
        }
    }
}

impl WireMessage for SelectServerResult {
    fn schema() -> &'static Schema {
        &SELECT_SERVER_RESULT
    }

    fn to_record(&self) -> Record {
        Record::new(&SELECT_SERVER_RESULT)
            .with("header", self.header.to_record())
            .with("result", self.result)
            .with("one_time_key", self.one_time_key)
            .with("encrypted_size", self.encrypted_size)
            .with("encrypted_data", self.encrypted_data.clone())
            .with("pending_time", self.pending_time)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            header: header(record)?,
            result: record.u16("result")?,
            one_time_key: record.uint("one_time_key")?,
            encrypted_size: record.i32("encrypted_size")?,
            encrypted_data: record.bytes("encrypted_data")?.to_vec(),
            pending_time: record.u32("pending_time")?,
        })
    }
}
