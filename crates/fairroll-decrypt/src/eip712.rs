//! eip-712 typed data for user decryption grants
//!
//! ```text
//! EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)
//! UserDecryptRequestVerification(bytes publicKey,address[] contractAddresses,
//!     uint256 startTimestamp,uint256 durationDays,bytes extraData)
//!
//! digest = keccak256(0x19 0x01 || domainSeparator || hashStruct(request))
//! ```

use fairroll_fhe::Address;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

const DOMAIN_TYPE: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

const REQUEST_TYPE: &[u8] = b"UserDecryptRequestVerification(bytes publicKey,address[] contractAddresses,uint256 startTimestamp,uint256 durationDays,bytes extraData)";

/// domain name the decryption verifier expects
pub const DOMAIN_NAME: &str = "Decryption";

pub const DOMAIN_VERSION: &str = "1";

/// keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// big-endian uint256 word
fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    /// decryption domain for `chain_id`
    pub fn decryption(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: DOMAIN_NAME.into(),
            version: DOMAIN_VERSION.into(),
            chain_id,
            verifying_contract,
        }
    }

    pub fn separator(&self) -> [u8; 32] {
        let mut enc = Vec::with_capacity(5 * 32);
        enc.extend_from_slice(&keccak256(DOMAIN_TYPE));
        enc.extend_from_slice(&keccak256(self.name.as_bytes()));
        enc.extend_from_slice(&keccak256(self.version.as_bytes()));
        enc.extend_from_slice(&uint_word(self.chain_id));
        enc.extend_from_slice(&self.verifying_contract.to_word());
        keccak256(&enc)
    }
}

/// message a wallet signs to let one ephemeral key decrypt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDecryptRequest {
    /// ephemeral x25519 public key
    #[serde(with = "hex_bytes")]
    pub public_key: Vec<u8>,
    /// contracts whose handles the grant covers
    pub contract_addresses: Vec<Address>,
    /// unix seconds
    pub start_timestamp: u64,
    pub duration_days: u64,
    #[serde(with = "hex_bytes", default)]
    pub extra_data: Vec<u8>,
}

impl UserDecryptRequest {
    pub fn type_hash() -> [u8; 32] {
        keccak256(REQUEST_TYPE)
    }

    pub fn struct_hash(&self) -> [u8; 32] {
        let addresses: Vec<u8> = self
            .contract_addresses
            .iter()
            .flat_map(|a| a.to_word())
            .collect();

        let mut enc = Vec::with_capacity(6 * 32);
        enc.extend_from_slice(&Self::type_hash());
        enc.extend_from_slice(&keccak256(&self.public_key));
        enc.extend_from_slice(&keccak256(&addresses));
        enc.extend_from_slice(&uint_word(self.start_timestamp));
        enc.extend_from_slice(&uint_word(self.duration_days));
        enc.extend_from_slice(&keccak256(&self.extra_data));
        keccak256(&enc)
    }

    /// the 32 bytes a wallet signs
    pub fn signing_digest(&self, domain: &Eip712Domain) -> [u8; 32] {
        let mut enc = Vec::with_capacity(2 + 64);
        enc.extend_from_slice(&[0x19, 0x01]);
        enc.extend_from_slice(&domain.separator());
        enc.extend_from_slice(&self.struct_hash());
        keccak256(&enc)
    }
}

/// `0x`-hex encoding for byte strings
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}
