//! # Stream Cipher
//!
//! RC4-family keystream used to obscure frames on encrypted listeners.
//!
//! The key schedule is the legacy client's, which indexes the permutation
//! and the repeated key by the running `j` rather than `i`; the first 1013
//! keystream bytes are discarded. Each direction of a connection owns its
//! own [`StreamCipher`].
//!
//! [`StreamCipher::apply`] consumes keystream. [`StreamCipher::preview`]
//! produces the same output but restores the state afterwards, so a header
//! can be inspected before the full frame is consumed for real.

use crate::error::{constants, ProtocolError, Result};

const TABLE_LEN: usize = 256;
const DISCARD: usize = 1013;

#[derive(Clone)]
struct State {
    x: u8,
    y: u8,
    table: [u8; TABLE_LEN],
}

impl State {
    fn schedule(key: &[u8]) -> Self {
        let mut table = [0u8; TABLE_LEN];
        for (slot, value) in table.iter_mut().zip(0u8..=255) {
            *slot = value;
        }
        let mut j = 0usize;
        for i in 0..TABLE_LEN {
            j = (j + usize::from(table[j]) + usize::from(key[j % key.len()])) & 0xFF;
            table.swap(i, j);
        }
        let mut state = Self { x: 0, y: 0, table };
        state.skip(DISCARD);
        state
    }

    #[inline]
    fn next(&mut self) -> u8 {
        self.x = self.x.wrapping_add(1);
        let sx = self.table[usize::from(self.x)];
        self.y = self.y.wrapping_add(sx);
        let sy = self.table[usize::from(self.y)];
        self.table[usize::from(self.x)] = sy;
        self.table[usize::from(self.y)] = sx;
        self.table[usize::from(sx.wrapping_add(sy))]
    }

    fn skip(&mut self, rounds: usize) {
        for _ in 0..rounds {
            self.next();
        }
    }
}

/// Keyed keystream, initialised on first use.
pub struct StreamCipher {
    key: Vec<u8>,
    state: Option<Box<State>>,
}

impl StreamCipher {
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(ProtocolError::ConfigError(
                constants::ERR_EMPTY_CIPHER_KEY.to_string(),
            ));
        }
        Ok(Self {
            key: key.to_vec(),
            state: None,
        })
    }

    /// Runs the key schedule once; later calls are no-ops.
    pub fn init(&mut self) {
        self.state();
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn state(&mut self) -> &mut State {
        let key = &self.key;
        self.state
            .get_or_insert_with(|| Box::new(State::schedule(key)))
    }

    /// XORs `buf` with the keystream, advancing the cipher.
    pub fn apply(&mut self, buf: &mut [u8]) {
        let state = self.state();
        for byte in buf.iter_mut() {
            *byte ^= state.next();
        }
    }

    /// XORs `buf` with the keystream the next [`apply`](Self::apply) would
    /// use, leaving the cipher where it was.
    pub fn preview(&mut self, buf: &mut [u8]) {
        let snapshot = self.state().clone();
        self.apply(buf);
        *self.state() = snapshot;
    }
}

impl std::fmt::Debug for StreamCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCipher")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
