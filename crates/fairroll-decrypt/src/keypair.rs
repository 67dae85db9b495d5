//! ephemeral x25519 keypair for one decryption attempt

use std::fmt;

use x25519_dalek::{PublicKey, StaticSecret};

use crate::envelope::SealedValue;
use crate::Result;

/// keypair whose public half goes into the grant
///
/// the secret is wiped when the keypair drops.
pub struct EphemeralKeypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl EphemeralKeypair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(rand::thread_rng());
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_key(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    /// recover a value the relay sealed to this keypair
    pub fn open(&self, sealed: &SealedValue) -> Result<u64> {
        sealed.open(&self.secret)
    }
}

impl fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EphemeralKeypair(0x{}..)",
            hex::encode(&self.public.as_bytes()[..6])
        )
    }
}
