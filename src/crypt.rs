//! Decryption of values stored by the shop's encryptor
//!
//! Values look like `<keyVersion>:<cipherVersion>:<base64 payload>`. Only
//! cipher version 3 is supported: the payload is a 12-byte nonce followed by
//! the ChaCha20-Poly1305 (IETF) ciphertext, with the nonce doubling as the
//! associated data.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use thiserror::Error;

/// Cipher version of ChaCha20-Poly1305 values
pub const CIPHER_CHACHA20POLY1305: &str = "3";

/// Keys with this prefix carry their bytes base64 encoded
const ENCODED_KEY_PREFIX: &str = "base64";

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("Malformed encrypted value")]
    Format,

    #[error("Unsupported cipher version: {0}")]
    UnsupportedCipher(String),

    #[error("No key configured for key version {0}")]
    UnknownKeyVersion(usize),

    #[error("Key must be 32 bytes")]
    InvalidKey,

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Decryption failed: wrong key or corrupted value")]
    Authentication,

    #[error("Decrypted value is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub trait Decryptor {
    fn decrypt(&self, value: &str) -> Result<String, DecryptError>;
}

/// Decryptor for ChaCha20-Poly1305 values
pub struct SodiumDecryptor {
    /// Indexed by key version
    keys: Vec<String>,
}

impl SodiumDecryptor {
    /// `keys` holds one key per key version, separated by whitespace
    pub fn new(keys: &str) -> Self {
        Self {
            keys: keys.split_whitespace().map(str::to_string).collect(),
        }
    }

    fn key_bytes(&self, key_version: usize) -> Result<Vec<u8>, DecryptError> {
        let key = self
            .keys
            .get(key_version)
            .ok_or(DecryptError::UnknownKeyVersion(key_version))?;

        let bytes = match key.strip_prefix(ENCODED_KEY_PREFIX) {
            Some(encoded) => STANDARD.decode(encoded)?,
            None => key.as_bytes().to_vec(),
        };

        if bytes.len() != KEY_LEN {
            return Err(DecryptError::InvalidKey);
        }
        Ok(bytes)
    }
}

impl Decryptor for SodiumDecryptor {
    fn decrypt(&self, value: &str) -> Result<String, DecryptError> {
        let mut parts = value.trim().splitn(3, ':');
        let (Some(key_version), Some(cipher), Some(payload)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(DecryptError::Format);
        };

        if cipher != CIPHER_CHACHA20POLY1305 {
            return Err(DecryptError::UnsupportedCipher(cipher.to_string()));
        }
        let key_version: usize = key_version.parse().map_err(|_| DecryptError::Format)?;

        let key = self.key_bytes(key_version)?;
        let cipher =
            ChaCha20Poly1305::new_from_slice(&key).map_err(|_| DecryptError::InvalidKey)?;

        let data = STANDARD.decode(payload)?;
        if data.len() < NONCE_LEN {
            return Err(DecryptError::Format);
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: nonce,
                },
            )
            .map_err(|_| DecryptError::Authentication)?;

        Ok(String::from_utf8(plaintext)?)
    }
}
