//! symmetric primitives used by the software runtime
//!
//! - chacha20poly1305 for sealing ciphertext payloads at rest
//! - hmac-sha256 for input proofs
//! - blake3 for handle derivation

use chacha20poly1305::{
    aead::{Aead, KeyInit as AeadKeyInit},
    ChaCha20Poly1305, Nonce,
};
use hmac::{digest::KeyInit, Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// generate random bytes
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// encrypt data using chacha20poly1305
pub fn seal(key: &[u8; 32], plaintext: &[u8], nonce: &[u8; 12]) -> Result<Vec<u8>> {
    let cipher: ChaCha20Poly1305 = AeadKeyInit::new_from_slice(key)
        .map_err(|e| Error::EncryptionFailed(e.to_string()))?;
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| Error::EncryptionFailed(e.to_string()))
}

/// decrypt data using chacha20poly1305
pub fn open(key: &[u8; 32], ciphertext: &[u8], nonce: &[u8; 12]) -> Result<Vec<u8>> {
    let cipher: ChaCha20Poly1305 = AeadKeyInit::new_from_slice(key)
        .map_err(|e| Error::DecryptionFailed(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| Error::DecryptionFailed(e.to_string()))
}

fn hmac(key: &[u8], data: &[&[u8]]) -> HmacSha256 {
    let mut h: HmacSha256 = KeyInit::new_from_slice(key).expect("hmac accepts any key length");
    for d in data {
        Mac::update(&mut h, d);
    }
    h
}

/// compute hmac-sha256 tag
pub fn mac(key: &[u8], data: &[&[u8]]) -> [u8; 32] {
    hmac(key, data).finalize().into_bytes().into()
}

/// constant-time check of an hmac-sha256 tag
pub fn verify_mac(key: &[u8], data: &[&[u8]], tag: &[u8]) -> bool {
    hmac(key, data).verify_slice(tag).is_ok()
}

/// domain-separated digest identifying a ciphertext
pub fn handle_digest(runtime_id: &[u8], counter: u64, op: &[u8], inputs: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"fairroll:handle:v1");
    hasher.update(runtime_id);
    hasher.update(&counter.to_le_bytes());
    hasher.update(op);
    for input in inputs {
        hasher.update(input);
    }
    *hasher.finalize().as_bytes()
}
