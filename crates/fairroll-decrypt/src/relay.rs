//! relay interface and the in-process relay
//!
//! a relay checks the grant, checks the access list of every handle, then
//! answers with values sealed to the grant's public key. handles it does
//! not know are left out of the answer.

use std::sync::Arc;

use async_trait::async_trait;
use fairroll_fhe::{Address, DecryptionOracle, Handle};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DecryptConfig;
use crate::eip712::Eip712Domain;
use crate::envelope::SealedValue;
use crate::grant::{unix_now, AuthorizationGrant};
use crate::{Error, Result};

/// a handle plus the contract it belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleRequest {
    pub handle: Handle,
    pub contract: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptRequest {
    pub handles: Vec<HandleRequest>,
    #[serde(flatten)]
    pub grant: AuthorizationGrant,
}

/// sealed values, possibly fewer than requested
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub values: Vec<SealedValue>,
}

#[async_trait]
pub trait Relay: Send + Sync {
    async fn user_decrypt(&self, request: &DecryptRequest) -> Result<DecryptResponse>;
}

type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// relay running next to the runtime that holds the keys
pub struct LocalRelay<O: DecryptionOracle> {
    oracle: O,
    domain: Eip712Domain,
    clock: Clock,
}

impl<O: DecryptionOracle> LocalRelay<O> {
    pub fn new(oracle: O, config: &DecryptConfig) -> Self {
        Self {
            oracle,
            domain: Eip712Domain::decryption(config.chain_id, config.verifying_contract),
            clock: Arc::new(unix_now),
        }
    }

    /// replace the wall clock, for expiry tests
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    fn authorize(&self, request: &DecryptRequest) -> Result<()> {
        let grant = &request.grant;
        grant.verify(&self.domain, (self.clock)())?;

        for item in &request.handles {
            if !grant.covers(item.contract) {
                return Err(Error::ContractNotAuthorized(item.contract));
            }
        }
        Ok(())
    }

    fn decrypt(&self, request: &DecryptRequest) -> Result<DecryptResponse> {
        self.authorize(request)?;

        let user = request.grant.user_address;
        let mut recipient = [0u8; 32];
        recipient.copy_from_slice(&request.grant.request.public_key);

        let mut values = Vec::with_capacity(request.handles.len());
        for item in &request.handles {
            let Some(value) = self.oracle.reveal(item.handle)? else {
                debug!(handle = %item.handle, "unknown handle, omitted");
                continue;
            };
            for account in [user, item.contract] {
                if !self.oracle.may_decrypt(item.handle, account) {
                    warn!(handle = %item.handle, %account, "decryption refused by acl");
                    return Err(Error::NotAllowed {
                        handle: item.handle,
                        account,
                    });
                }
            }
            values.push(SealedValue::seal(&recipient, item.handle, value)?);
        }

        debug!(%user, requested = request.handles.len(), returned = values.len(), "user decrypt served");
        Ok(DecryptResponse { values })
    }
}

#[async_trait]
impl<O: DecryptionOracle> Relay for LocalRelay<O> {
    async fn user_decrypt(&self, request: &DecryptRequest) -> Result<DecryptResponse> {
        self.decrypt(request)
    }
}

#[async_trait]
impl<R: Relay + ?Sized> Relay for Arc<R> {
    async fn user_decrypt(&self, request: &DecryptRequest) -> Result<DecryptResponse> {
        (**self).user_decrypt(request).await
    }
}
