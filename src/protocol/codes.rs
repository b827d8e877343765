//! Numeric result codes and login flags shared with clients and game servers.
//!
//! Values are fixed by the deployed clients; only a handful are produced by
//! the login tier itself, the rest are exported for completeness.

/// Result codes carried in result messages.
pub mod result {
    pub const SUCCESS: u16 = 0;
    pub const NOT_EXIST: u16 = 1;
    pub const TOO_FAR: u16 = 2;
    pub const NOT_OWN: u16 = 3;
    pub const MISC: u16 = 4;
    pub const NOT_ACTABLE: u16 = 5;
    pub const ACCESS_DENIED: u16 = 6;
    pub const UNKNOWN: u16 = 7;
    pub const DB_ERROR: u16 = 8;
    pub const ALREADY_EXIST: u16 = 9;
    pub const NOT_ENOUGH_MONEY: u16 = 10;
    pub const TOO_HEAVY: u16 = 11;
    pub const NOT_ENOUGH_JP: u16 = 12;
    pub const NOT_ENOUGH_LEVEL: u16 = 13;
    pub const NOT_ENOUGH_JOB_LEVEL: u16 = 14;
    pub const NOT_ENOUGH_SKILL: u16 = 15;
    pub const LIMIT_MAX: u16 = 16;
    pub const LIMIT_MIN: u16 = 17;
    pub const INVALID_PASSWORD: u16 = 18;
    pub const INVALID_TEXT: u16 = 19;
    pub const NOT_ENOUGH_HP: u16 = 20;
    pub const NOT_ENOUGH_MP: u16 = 21;
    pub const COOL_TIME: u16 = 22;
    pub const LIMIT_WEAPON: u16 = 23;
    pub const LIMIT_RACE: u16 = 24;
    pub const LIMIT_JOB: u16 = 25;
    pub const LIMIT_TARGET: u16 = 26;
    pub const NO_SKILL: u16 = 27;
    pub const INVALID_ARGUMENT: u16 = 28;
    pub const PK_LIMIT: u16 = 29;
    pub const NOT_ENOUGH_ENERGY: u16 = 31;
    pub const NOT_ENOUGH_BULLET: u16 = 32;
    pub const NOT_ENOUGH_EXP: u16 = 33;
    pub const NOT_ENOUGH_ITEM: u16 = 34;
    pub const LIMIT_RIDING: u16 = 35;
    pub const NOT_ENOUGH_SP: u16 = 36;
    pub const ALREADY_STAMINA_SAVED: u16 = 37;
    pub const TOO_YOUNG: u16 = 38;
    pub const WITHDRAW_WAITING: u16 = 39;
    pub const REALNAME_REQUIRED: u16 = 40;
    pub const GAMETIME_TIRED_STAMINA_SAVER: u16 = 41;
    pub const GAMETIME_HARMFUL_STAMINA_SAVER: u16 = 42;
    pub const NOT_ACTABLE_IN_SIEGE_OR_RAID: u16 = 44;
    pub const NOT_ACTABLE_IN_SECROUTE: u16 = 45;
    pub const NOT_ACTABLE_IN_EVENTMAP: u16 = 46;
    pub const TARGET_IN_SIEGE_OR_RAID: u16 = 47;
    pub const TARGET_IN_SECROUTE: u16 = 48;
    pub const TARGET_IN_EVENTMAP: u16 = 49;
    pub const TOO_CHEAP: u16 = 50;
    pub const NOT_ACTABLE_WHILE_USING_STORAGE: u16 = 51;
    pub const NOT_ACTABLE_WHILE_TRADING: u16 = 52;
    pub const TOO_MUCH_MONEY: u16 = 53;
    pub const PASSWORD_MISMATCH: u16 = 54;
    pub const NOT_ACTABLE_WHILE_USING_BOOTH: u16 = 55;
    pub const NOT_ACTABLE_IN_HUNTAHOLIC: u16 = 56;
    pub const TARGET_IN_HUNTAHOLIC: u16 = 57;
    pub const NOT_ENOUGH_HUNTAHOLIC_POINT: u16 = 58;
    pub const ACTABLE_IN_ONLY_HUNTAHOLIC: u16 = 59;
    pub const IP_BLOCKED: u16 = 60;
    pub const ALREADY_IN_COMPETE: u16 = 61;
    pub const NOT_IN_COMPETE: u16 = 62;
    pub const WAITING_COMPETE_REQUEST_ANSWER: u16 = 63;
    pub const NOT_IN_COMPETIBLE_PLACE: u16 = 64;
    pub const TARGET_ALREADY_IN_COMPETE: u16 = 65;
    pub const TARGET_NOT_IN_COMPETE: u16 = 66;
    pub const TARGET_WAITING_COMPETE_REQUEST_ANSWER: u16 = 67;
    pub const TARGET_NOT_IN_COMPETIBLE_PLACE: u16 = 68;
    pub const NOT_ACTABLE_HERE: u16 = 69;
    pub const GAMETIME_LIMITED: u16 = 71;
    pub const NOT_ACTABLE_IN_DEATHMATCH: u16 = 72;
    pub const ACTABLE_IN_ONLY_DEATHMATCH: u16 = 73;
    pub const BLOCK_CHAT: u16 = 74;
    pub const ENHANCE_LIMIT: u16 = 76;
    pub const PENDING: u16 = 77;
    pub const NOT_ACTABLE_IN_SECRET_DUNGEON: u16 = 78;
    pub const TARGET_IN_SECRET_DUNGEON: u16 = 79;
    pub const ALREADY_SUPER_SAVER: u16 = 80;
    pub const GAMETIME_TIRED_SUPER_SAVER: u16 = 81;
    pub const GAMETIME_HARMFUL_SUPER_SAVER: u16 = 82;
    pub const NOT_ENOUGH_TP: u16 = 83;
    pub const NOT_ACTABLE_IN_INSTANCE_DUNGEON: u16 = 84;
    pub const ACTABLE_IN_ONLY_INSTANCE_DUNGEON: u16 = 85;
    pub const TARGET_IN_INSTANCE_DUNGEON: u16 = 86;
    pub const TARGET_IN_DEATHMATCH: u16 = 87;
    pub const TARGET_IS_USING_STORAGE: u16 = 88;
    pub const NOT_ENOUGH_AGE_PERIOD: u16 = 89;
    pub const ALREADY_TAMING: u16 = 70;
    pub const NOT_TAMABLE: u16 = 90;
    pub const TARGET_ALREADY_BEING_TAMED: u16 = 91;
    pub const NOT_ENOUGH_TARGET_HP: u16 = 92;
    pub const NOT_ENOUGH_SUMMON_CARD: u16 = 93;
    pub const NOT_ENOUGH_SOUL_TAMING_CARD: u16 = 94;
    pub const NOT_ACTABLE_IN_BATTLE_ARENA: u16 = 95;
    pub const NOT_READY: u16 = 96;
    pub const TARGET_IN_BATTLE_ARENA: u16 = 97;
    pub const NOT_ACTABLE_ON_STAND_UP: u16 = 98;
    pub const NOT_ENOUGH_ARENA_POINT: u16 = 99;
    pub const SUCCESS_WITHOUT_NOTICE: u16 = 101;
    pub const WEBZEN_DUPLICATE_ACCOUNT: u16 = 102;
    pub const WEBZEN_NEED_ACCEPT_EULA: u16 = 103;
}

/// Flags carried next to an account login result.
pub mod login_flag {
    pub const EULA_ACCEPTED: i32 = 1;
    pub const ACCOUNT_BLOCK_WARNING: i32 = 2;
}
