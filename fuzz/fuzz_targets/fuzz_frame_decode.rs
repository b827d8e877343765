#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use mononoke::core::codec::FrameCodec;
use tokio_util::codec::Decoder;

const KEY: &str = "}h79q~B%al;k'y $E";

fuzz_target!(|data: &[u8]| {
    // Plain and encrypted framing over the same bytes: no panics, and every
    // frame that comes out has a valid header
    for mut codec in [FrameCodec::plain(), FrameCodec::encrypted(KEY).unwrap()] {
        let mut buf = BytesMut::from(data);
        while let Ok(Some(frame)) = codec.decode(&mut buf) {
            assert!(frame.header().is_valid());
            assert_eq!(frame.len(), frame.header().size as usize);
        }
    }
});
