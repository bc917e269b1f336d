//! Payload framing and sealing.
//!
//! Wire format: `MAGIC (4) || nonce (12) || AES-256-GCM(message)`.
//! The magic header is a fast discriminator applied before any AEAD work;
//! authenticity rests entirely on the GCM tag.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Error, Result};

/// Magic header prefixed to every sealed payload.
pub const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

/// Required key length in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// GCM nonce length in bytes.
pub const NONCE_SIZE: usize = 12;

/// Validate a caller-supplied key.
pub fn check_key(key: &[u8]) -> Result<()> {
    if key.len() != KEY_SIZE {
        return Err(Error::InvalidInput(format!(
            "encryption key must be {} bytes long, got {}",
            KEY_SIZE,
            key.len()
        )));
    }
    Ok(())
}

/// Seal a message into a framed payload with a fresh random nonce.
pub fn encrypt(message: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    check_key(key)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, message)
        .map_err(|_| Error::BadKeyOrTamper)?;

    let mut payload = Vec::with_capacity(MAGIC.len() + NONCE_SIZE + ciphertext.len());
    payload.extend_from_slice(&MAGIC);
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&ciphertext);
    Ok(payload)
}

/// Open a framed payload, returning the original message bytes.
pub fn decrypt(payload: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    check_key(key)?;

    if payload.len() < MAGIC.len() + NONCE_SIZE {
        return Err(Error::ShortPayload(payload.len()));
    }
    if payload[..MAGIC.len()] != MAGIC {
        return Err(Error::MagicMismatch);
    }

    let nonce = Nonce::from_slice(&payload[MAGIC.len()..MAGIC.len() + NONCE_SIZE]);
    let ciphertext = &payload[MAGIC.len() + NONCE_SIZE..];

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| Error::BadKeyOrTamper)
}
