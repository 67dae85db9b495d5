//! one decryption attempt as an explicit staged object
//!
//! ```text
//! KeypairReady ──sign──▶ Signed ──submit──▶ Submitted ──▶ Resolved
//!       │                  │                    │
//!       └──────────────────┴────────────────────┴──▶ Failed
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fairroll::Snapshot;
use fairroll_fhe::{Address, Handle};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::DecryptConfig;
use crate::eip712::Eip712Domain;
use crate::grant::{unix_now, AuthorizationGrant};
use crate::keypair::EphemeralKeypair;
use crate::relay::{DecryptRequest, HandleRequest, Relay};
use crate::view::{DecryptedValues, DecryptedView};
use crate::wallet::WalletSigner;
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    KeypairReady,
    Signed,
    Submitted,
    Resolved,
    Failed,
}

pub struct DecryptionRequest {
    attempt: u64,
    contract: Address,
    snapshot: Snapshot,
    keypair: EphemeralKeypair,
    grant: Option<AuthorizationGrant>,
    stage: Stage,
}

impl DecryptionRequest {
    /// fresh attempt over `snapshot`, generating the ephemeral keypair
    pub fn new(attempt: u64, contract: Address, snapshot: Snapshot) -> Self {
        Self {
            attempt,
            contract,
            snapshot,
            keypair: EphemeralKeypair::generate(),
            grant: None,
            stage: Stage::KeypairReady,
        }
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public_key()
    }

    pub fn grant(&self) -> Option<&AuthorizationGrant> {
        self.grant.as_ref()
    }

    /// non-empty handles of the snapshot, tagged with the ledger contract
    pub fn handles(&self) -> Vec<HandleRequest> {
        self.snapshot
            .handles()
            .into_iter()
            .map(|handle| HandleRequest {
                handle,
                contract: self.contract,
            })
            .collect()
    }

    /// have `wallet` sign a grant for this keypair
    pub async fn sign<W: WalletSigner + ?Sized>(
        &mut self,
        wallet: &W,
        config: &DecryptConfig,
        now: u64,
    ) -> Result<()> {
        self.expect_stage(Stage::KeypairReady)?;

        if wallet.address() != self.snapshot.account {
            return Err(self.fail(Error::WrongAccount {
                wallet: wallet.address(),
                account: self.snapshot.account,
            }));
        }

        let domain = Eip712Domain::decryption(config.chain_id, config.verifying_contract);
        let signed = AuthorizationGrant::sign(
            wallet,
            &domain,
            self.keypair.public_key(),
            vec![self.contract],
            now,
            config.duration_days,
        )
        .await;

        match signed {
            Ok(grant) => {
                self.grant = Some(grant);
                self.stage = Stage::Signed;
                debug!(attempt = self.attempt, "grant signed");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// send the signed grant to `relay` and reconcile what comes back
    pub async fn submit<R: Relay + ?Sized>(&mut self, relay: &R) -> Result<DecryptedValues> {
        self.expect_stage(Stage::Signed)?;
        let Some(grant) = self.grant.clone() else {
            return Err(self.fail(Error::MalformedGrant("signed request lost its grant".into())));
        };

        let request = DecryptRequest {
            handles: self.handles(),
            grant,
        };
        self.stage = Stage::Submitted;

        let response = match relay.user_decrypt(&request).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(e)),
        };

        match self.open_all(&request, response.values.as_slice()) {
            Ok(values) => {
                self.stage = Stage::Resolved;
                Ok(DecryptedValues::reconcile(self.attempt, &self.snapshot, &values))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn open_all(
        &self,
        request: &DecryptRequest,
        sealed: &[crate::envelope::SealedValue],
    ) -> Result<HashMap<Handle, u64>> {
        let asked: HashSet<Handle> = request.handles.iter().map(|h| h.handle).collect();
        let mut values = HashMap::with_capacity(sealed.len());
        for item in sealed {
            if !asked.contains(&item.handle) {
                return Err(Error::MalformedResponse(format!(
                    "relay answered for unrequested handle {}",
                    item.handle
                )));
            }
            values.insert(item.handle, self.keypair.open(item)?);
        }
        Ok(values)
    }

    fn expect_stage(&self, expected: Stage) -> Result<()> {
        if self.stage != expected {
            return Err(Error::InvalidStage {
                expected,
                actual: self.stage,
            });
        }
        Ok(())
    }

    fn fail(&mut self, error: Error) -> Error {
        warn!(attempt = self.attempt, %error, "decryption attempt failed");
        self.stage = Stage::Failed;
        error
    }
}

type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// runs whole attempts for one account
pub struct Decryptor<W: WalletSigner, R: Relay> {
    config: DecryptConfig,
    contract: Address,
    wallet: W,
    relay: R,
    attempts: AtomicU64,
    clock: Clock,
}

impl<W: WalletSigner, R: Relay> Decryptor<W, R> {
    /// `contract` is the ledger whose handles get decrypted
    pub fn new(config: DecryptConfig, contract: Address, wallet: W, relay: R) -> Self {
        Self {
            config,
            contract,
            wallet,
            relay,
            attempts: AtomicU64::new(0),
            clock: Arc::new(unix_now),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn config(&self) -> &DecryptConfig {
        &self.config
    }

    /// decrypt every non-empty handle of `snapshot`
    ///
    /// `Ok(None)` when there is nothing to decrypt; no grant is signed and
    /// the relay is not contacted.
    pub async fn decrypt(&self, snapshot: &Snapshot) -> Result<Option<DecryptedValues>> {
        if snapshot.handles().is_empty() {
            debug!(account = %snapshot.account, "nothing to decrypt");
            return Ok(None);
        }

        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let mut request = DecryptionRequest::new(attempt, self.contract, *snapshot);
        request.sign(&self.wallet, &self.config, (self.clock)()).await?;
        let values = request.submit(&self.relay).await?;

        info!(
            attempt,
            account = %snapshot.account,
            complete = values.is_complete(),
            "decryption resolved"
        );
        Ok(Some(values))
    }

    /// decrypt and apply the outcome to `view`
    pub async fn refresh(&self, snapshot: &Snapshot, view: &Mutex<DecryptedView>) -> Result<()> {
        match self.decrypt(snapshot).await {
            Ok(Some(values)) => {
                view.lock().await.apply_success(values);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                view.lock().await.apply_failure(&e);
                Err(e)
            }
        }
    }
}
