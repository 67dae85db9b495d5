//! decryption client configuration

use fairroll_fhe::Address;
use serde::{Deserialize, Serialize};

/// default grant lifetime
pub const DEFAULT_DURATION_DAYS: u64 = 5;

/// longest grant a relay accepts
pub const MAX_DURATION_DAYS: u64 = 365;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptConfig {
    /// chain id bound into the eip-712 domain
    pub chain_id: u64,
    /// decryption verifier contract, the eip-712 verifying contract
    pub verifying_contract: Address,
    /// grant lifetime in days
    pub duration_days: u64,
    /// relay base url
    pub relay_url: String,
    /// relay request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DecryptConfig {
    fn default() -> Self {
        Self::local()
    }
}

impl DecryptConfig {
    /// ethereum sepolia testnet, `verifying_contract` comes from the deployment
    pub fn sepolia(verifying_contract: Address) -> Self {
        Self {
            chain_id: 11_155_111,
            verifying_contract,
            duration_days: DEFAULT_DURATION_DAYS,
            relay_url: "https://relayer.testnet.zama.cloud".into(),
            timeout_secs: 30,
        }
    }

    /// in-process devnet
    pub fn local() -> Self {
        Self {
            chain_id: 31_337,
            verifying_contract: Address::derive(b"decryption-verifier"),
            duration_days: DEFAULT_DURATION_DAYS,
            relay_url: "http://localhost:3000".into(),
            timeout_secs: 5,
        }
    }
}
