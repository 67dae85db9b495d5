//! values sealed by the relay to a client's ephemeral key
//!
//! x25519 between a relay-side ephemeral secret and the client key, hkdf-sha256
//! bound to the handle, chacha20poly1305 over the little-endian value.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use fairroll_fhe::Handle;
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::eip712::hex_bytes;
use crate::{Error, Result};

const INFO_PREFIX: &[u8] = b"fairroll:user-decrypt:v1";

/// one decrypted value, readable only by the grant's keypair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    pub handle: Handle,
    /// relay ephemeral x25519 public key
    #[serde(with = "hex_array")]
    pub ephemeral_public: [u8; 32],
    #[serde(with = "hex_array")]
    pub nonce: [u8; 12],
    #[serde(with = "hex_bytes")]
    pub ciphertext: Vec<u8>,
}

impl SealedValue {
    /// seal `value` for the holder of `recipient`
    pub fn seal(recipient: &[u8; 32], handle: Handle, value: u64) -> Result<Self> {
        let mut rng = rand::thread_rng();
        let ephemeral = EphemeralSecret::random_from_rng(&mut rng);
        let ephemeral_public = PublicKey::from(&ephemeral);

        let recipient = PublicKey::from(*recipient);
        let shared = ephemeral.diffie_hellman(&recipient);
        let key = derive_key(
            shared.as_bytes(),
            ephemeral_public.as_bytes(),
            recipient.as_bytes(),
            &handle,
        )?;

        let mut nonce = [0u8; 12];
        rng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
            .map_err(|e| Error::Crypto(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), value.to_le_bytes().as_slice())
            .map_err(|e| Error::Crypto(e.to_string()))?;

        Ok(Self {
            handle,
            ephemeral_public: *ephemeral_public.as_bytes(),
            nonce,
            ciphertext,
        })
    }

    pub(crate) fn open(&self, secret: &StaticSecret) -> Result<u64> {
        let ephemeral_public = PublicKey::from(self.ephemeral_public);
        let recipient = PublicKey::from(secret);
        let shared = secret.diffie_hellman(&ephemeral_public);
        let key = derive_key(
            shared.as_bytes(),
            &self.ephemeral_public,
            recipient.as_bytes(),
            &self.handle,
        )?;

        let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
            .map_err(|e| Error::Crypto(e.to_string()))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map_err(|_| Error::Crypto(format!("cannot open value for {}", self.handle)))?;

        let bytes: [u8; 8] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| Error::MalformedResponse("sealed value is not a u64".into()))?;
        Ok(u64::from_le_bytes(bytes))
    }
}

fn derive_key(
    shared: &[u8],
    ephemeral_public: &[u8; 32],
    recipient: &[u8; 32],
    handle: &Handle,
) -> Result<Zeroizing<[u8; 32]>> {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral_public);
    salt[32..].copy_from_slice(recipient);

    let mut info = Vec::with_capacity(INFO_PREFIX.len() + 32);
    info.extend_from_slice(INFO_PREFIX);
    info.extend_from_slice(handle.as_bytes());

    let mut key = Zeroizing::new([0u8; 32]);
    Hkdf::<Sha256>::new(Some(&salt), shared)
        .expand(&info, &mut key[..])
        .map_err(|e| Error::Crypto(e.to_string()))?;
    Ok(key)
}

mod hex_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected {N} bytes")))
    }
}
