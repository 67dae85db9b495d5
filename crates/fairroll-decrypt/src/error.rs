//! decryption protocol errors

use fairroll_fhe::{Address, Handle};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed grant: {0}")]
    MalformedGrant(String),

    #[error("signature does not recover to {expected}")]
    SignatureMismatch { expected: Address },

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("grant window [{start}, {end}) does not cover {now}")]
    GrantExpired { start: u64, end: u64, now: u64 },

    #[error("contract {0} is not covered by the grant")]
    ContractNotAuthorized(Address),

    #[error("{account} may not decrypt {handle}")]
    NotAllowed { handle: Handle, account: Address },

    #[error("wallet {wallet} does not control account {account}")]
    WrongAccount { wallet: Address, account: Address },

    #[error("relay unavailable: {0}")]
    RelayUnavailable(String),

    #[error("relay rejected request: {0}")]
    RelayRejected(String),

    #[error("malformed relay response: {0}")]
    MalformedResponse(String),

    #[error("request is {actual:?}, expected {expected:?}")]
    InvalidStage {
        expected: crate::request::Stage,
        actual: crate::request::Stage,
    },

    #[error("cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("fhe: {0}")]
    Fhe(#[from] fairroll_fhe::Error),
}

/// coarse classification callers branch on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// missing, forged, expired or out-of-scope grant
    Authorization,
    /// relay down, timed out or answered garbage
    RelayUnavailable,
    /// key agreement, sealing or signing machinery failed
    Cryptographic,
    /// protocol steps called out of order
    InvalidInput,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedGrant(_)
            | Error::SignatureMismatch { .. }
            | Error::GrantExpired { .. }
            | Error::ContractNotAuthorized(_)
            | Error::NotAllowed { .. }
            | Error::WrongAccount { .. }
            | Error::RelayRejected(_) => ErrorKind::Authorization,
            Error::RelayUnavailable(_) | Error::MalformedResponse(_) => ErrorKind::RelayUnavailable,
            Error::Signing(_) | Error::Crypto(_) | Error::Fhe(_) => ErrorKind::Cryptographic,
            Error::InvalidStage { .. } => ErrorKind::InvalidInput,
        }
    }

    /// a fresh attempt may succeed without changing the grant
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RelayUnavailable | ErrorKind::Cryptographic
        )
    }
}
