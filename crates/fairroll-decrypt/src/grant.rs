//! signed authorization grants
//!
//! a grant lets one ephemeral public key obtain plaintext for handles of
//! the listed contracts, for `duration_days` from `start_timestamp`. it is
//! bound to the signing account through signature recovery.

use std::time::{SystemTime, UNIX_EPOCH};

use fairroll_fhe::Address;
use serde::{Deserialize, Serialize};

use crate::config::MAX_DURATION_DAYS;
use crate::eip712::{Eip712Domain, UserDecryptRequest};
use crate::wallet::{EvmSignature, WalletSigner};
use crate::{Error, Result};

pub const SECONDS_PER_DAY: u64 = 86_400;

/// current unix time in seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationGrant {
    #[serde(flatten)]
    pub request: UserDecryptRequest,
    pub user_address: Address,
    pub signature: EvmSignature,
}

impl AuthorizationGrant {
    /// build the typed request for `public_key` and have `wallet` sign it
    pub async fn sign<W: WalletSigner + ?Sized>(
        wallet: &W,
        domain: &Eip712Domain,
        public_key: [u8; 32],
        contract_addresses: Vec<Address>,
        start_timestamp: u64,
        duration_days: u64,
    ) -> Result<Self> {
        let request = UserDecryptRequest {
            public_key: public_key.to_vec(),
            contract_addresses,
            start_timestamp,
            duration_days,
            extra_data: Vec::new(),
        };
        check_shape(&request)?;

        let signature = wallet.sign_digest(&request.signing_digest(domain)).await?;
        Ok(Self {
            request,
            user_address: wallet.address(),
            signature,
        })
    }

    /// `[start, end)` in unix seconds
    pub fn window(&self) -> (u64, u64) {
        let start = self.request.start_timestamp;
        let span = self.request.duration_days.saturating_mul(SECONDS_PER_DAY);
        (start, start.saturating_add(span))
    }

    pub fn is_active(&self, now: u64) -> bool {
        let (start, end) = self.window();
        (start..end).contains(&now)
    }

    pub fn covers(&self, contract: Address) -> bool {
        self.request.contract_addresses.contains(&contract)
    }

    /// full relay-side check: shape, signer and time window
    pub fn verify(&self, domain: &Eip712Domain, now: u64) -> Result<()> {
        check_shape(&self.request)?;

        let signer = self.signature.recover(&self.request.signing_digest(domain))?;
        if signer != self.user_address {
            return Err(Error::SignatureMismatch {
                expected: self.user_address,
            });
        }

        if !self.is_active(now) {
            let (start, end) = self.window();
            return Err(Error::GrantExpired { start, end, now });
        }
        Ok(())
    }
}

fn check_shape(request: &UserDecryptRequest) -> Result<()> {
    if request.public_key.len() != 32 {
        return Err(Error::MalformedGrant(format!(
            "public key must be 32 bytes, got {}",
            request.public_key.len()
        )));
    }
    if request.contract_addresses.is_empty() {
        return Err(Error::MalformedGrant("no contract addresses".into()));
    }
    if !(1..=MAX_DURATION_DAYS).contains(&request.duration_days) {
        return Err(Error::MalformedGrant(format!(
            "duration must be 1..={MAX_DURATION_DAYS} days, got {}",
            request.duration_days
        )));
    }
    Ok(())
}
