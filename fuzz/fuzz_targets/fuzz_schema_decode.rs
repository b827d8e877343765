#![no_main]

use libfuzzer_sys::fuzz_target;
use mononoke::core::epoch::Epoch;
use mononoke::protocol::message::WireMessage;
use mononoke::protocol::packets::{
    AccountLogin, AuthResultWithString, ClientLogin, ClientVersion, GameLogin, PublicKeyOffer,
    SelectServerResult, ServerList,
};

fuzz_target!(|data: &[u8]| {
    // First four bytes pick the layout, the rest is the frame
    if data.len() < 4 {
        return;
    }
    let epoch = Epoch(u32::from_le_bytes([data[0], data[1], data[2], data[3]]));
    let frame = &data[4..];

    let _ = ClientVersion::decode(frame, epoch);
    let _ = AccountLogin::decode(frame, epoch);
    let _ = PublicKeyOffer::decode(frame, epoch);
    let _ = AuthResultWithString::decode(frame, epoch);
    let _ = SelectServerResult::decode(frame, epoch);
    let _ = GameLogin::decode(frame, epoch);
    let _ = ClientLogin::decode(frame, epoch);

    // A list that decodes must encode again at the same layout
    if let Ok(list) = ServerList::decode(frame, epoch) {
        let _ = list.encode(epoch);
    }
});
