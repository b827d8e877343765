//! # Credential Handshake
//!
//! Password decryption and the RSA/AES key exchange used by the login
//! listener.
//!
//! Older clients encrypt the password with single DES in ECB mode under a
//! key shared out of band. Newer clients first offer an RSA public key; the
//! server answers with a random 32-byte [`SessionKey`] sealed with RSA
//! PKCS#1 v1.5, and from then on the password arrives AES-128-CBC encrypted
//! under that key. The same key seals the one-time key returned on server
//! selection.
//!
//! ## Key layout
//! ```text
//! [ AES-128 key (16) ][ CBC IV (16) ]
//! ```

use crate::error::{constants, ProtocolError, Result};
use crate::protocol::message::c_string;
use aes::Aes128;
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockDecrypt, KeyInit};
use des::Des;
use rand::Rng;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use tracing::{debug, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop};

const DES_BLOCK: usize = 8;
const DES_BLOCKS: usize = 4;
const AES_BLOCK: usize = 16;
const FOLD_ROUNDS: usize = 40;

/// Folds a configured key text into an 8-byte DES key.
pub fn derive_des_key(text: &str) -> [u8; 8] {
    let mut key = [0u8; 8];
    for (i, byte) in text.bytes().take(FOLD_ROUNDS).enumerate() {
        key[i % 8] ^= byte;
    }
    key
}

/// Decrypts the first four blocks of a DES password field.
pub fn decrypt_des_password(key: &[u8; 8], encrypted: &[u8]) -> Result<String> {
    if encrypted.len() < DES_BLOCK * DES_BLOCKS {
        return Err(ProtocolError::Crypto(constants::ERR_SHORT_PASSWORD));
    }
    let cipher = Des::new_from_slice(key)
        .map_err(|_| ProtocolError::Crypto(constants::ERR_DECRYPTION_FAILED))?;
    let mut plain = encrypted[..DES_BLOCK * DES_BLOCKS].to_vec();
    for block in plain.chunks_exact_mut(DES_BLOCK) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(c_string(&plain))
}

/// Decrypts every whole block within `size` bytes of an AES password field.
pub fn decrypt_aes_password(key: &SessionKey, encrypted: &[u8], size: u32) -> Result<String> {
    let usable = (size as usize).min(encrypted.len());
    let usable = usable - usable % AES_BLOCK;
    let mut plain = encrypted[..usable].to_vec();
    let cipher = cbc::Decryptor::<Aes128>::new_from_slices(key.aes_key(), key.iv())
        .map_err(|_| ProtocolError::Crypto(constants::ERR_DECRYPTION_FAILED))?;
    cipher
        .decrypt_padded_mut::<NoPadding>(&mut plain)
        .map_err(|_| ProtocolError::Crypto(constants::ERR_DECRYPTION_FAILED))?;
    Ok(c_string(pkcs5_trim(&plain)))
}

/// Drops trailing padding as announced by the last byte. A pad longer than
/// the data leaves it untouched.
pub fn pkcs5_trim(data: &[u8]) -> &[u8] {
    match data.last() {
        Some(&pad) if usize::from(pad) <= data.len() => &data[..data.len() - usize::from(pad)],
        _ => data,
    }
}

/// Parses a PEM public key as sent by the client. Both SubjectPublicKeyInfo
/// and PKCS#1 encodings are accepted; trailing NULs are ignored.
pub fn parse_public_key(raw: &[u8]) -> Result<RsaPublicKey> {
    let pem = c_string(raw);
    let pem = pem.trim();
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|_| ProtocolError::Crypto(constants::ERR_INVALID_PUBLIC_KEY))
}

/// Per-connection AES material negotiated over RSA.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn aes_key(&self) -> &[u8] {
        &self.0[..16]
    }

    pub fn iv(&self) -> &[u8] {
        &self.0[16..]
    }

    /// Encrypts the key for the client with RSA PKCS#1 v1.5.
    #[instrument(skip_all)]
    pub fn seal(&self, public_key: &RsaPublicKey) -> Result<Vec<u8>> {
        let mut rng = rsa::rand_core::OsRng;
        let sealed = public_key
            .encrypt(&mut rng, Pkcs1v15Encrypt, &self.0)
            .map_err(|_| ProtocolError::Crypto(constants::ERR_ENCRYPTION_FAILED))?;
        debug!(len = sealed.len(), "Sealed session key");
        Ok(sealed)
    }

    /// AES-128-CBC/PKCS#7 encryption of a one-time key's little-endian bytes.
    pub fn seal_one_time_key(&self, one_time_key: u64) -> Result<Vec<u8>> {
        let cipher = cbc::Encryptor::<Aes128>::new_from_slices(self.aes_key(), self.iv())
            .map_err(|_| ProtocolError::Crypto(constants::ERR_ENCRYPTION_FAILED))?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(&one_time_key.to_le_bytes()))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// A fresh non-zero one-time key in the positive `i64` range.
pub fn generate_one_time_key() -> u64 {
    rand::rng().random_range(1..=i64::MAX as u64)
}
