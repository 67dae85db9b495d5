//! secp256k1 wallet signing grants
//!
//! addresses are evm-style: the last 20 bytes of keccak256 over the
//! uncompressed public key (without the 0x04 prefix). signatures are
//! 65 bytes `r || s || v` with `v = 27 + recovery id`.

use std::fmt;

use async_trait::async_trait;
use fairroll_fhe::Address;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::eip712::keccak256;
use crate::{Error, Result};

/// something that holds an account key and signs typed-data digests
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Address;

    /// sign an eip-712 digest
    async fn sign_digest(&self, digest: &[u8; 32]) -> Result<EvmSignature>;
}

/// evm address of a secp256k1 public key
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::new(bytes)
}

/// recoverable ecdsa signature, `r || s || v`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EvmSignature([u8; 65]);

impl EvmSignature {
    pub fn from_bytes(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// address whose key produced this signature over `digest`
    pub fn recover(&self, digest: &[u8; 32]) -> Result<Address> {
        let signature = Signature::from_slice(&self.0[..64])
            .map_err(|e| Error::MalformedGrant(format!("bad signature: {e}")))?;
        // accept both 27/28 and raw 0/1
        let v = match self.0[64] {
            v @ 27..=28 => v - 27,
            v => v,
        };
        let recovery_id = RecoveryId::from_byte(v)
            .ok_or_else(|| Error::MalformedGrant(format!("bad recovery id {}", self.0[64])))?;

        let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|e| Error::MalformedGrant(format!("unrecoverable signature: {e}")))?;
        Ok(address_of(&key))
    }
}

impl fmt::Debug for EvmSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EvmSignature(0x{}..)", hex::encode(&self.0[..6]))
    }
}

impl Serialize for EvmSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EvmSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)?;
        let arr: [u8; 65] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 65 bytes"))?;
        Ok(Self(arr))
    }
}

/// in-process wallet holding a raw secp256k1 key
pub struct LocalWallet {
    key: SigningKey,
    address: Address,
}

impl LocalWallet {
    pub fn random() -> Self {
        Self::from_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        let key = SigningKey::from_slice(secret).map_err(|e| Error::Signing(e.to_string()))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    pub fn sign_digest_sync(&self, digest: &[u8; 32]) -> Result<EvmSignature> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| Error::Signing(e.to_string()))?;

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = 27 + recovery_id.to_byte();
        Ok(EvmSignature(bytes))
    }
}

#[async_trait]
impl WalletSigner for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_digest(&self, digest: &[u8; 32]) -> Result<EvmSignature> {
        self.sign_digest_sync(digest)
    }
}
