//! settlement errors

use fairroll_fhe::Address;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("input proof rejected for {caller}")]
    ProofRejected { caller: Address },

    #[error("encrypted operation failed: {0}")]
    Fhe(#[from] fairroll_fhe::Error),
}

/// coarse classification callers branch on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// bad amount or malformed guess, fix the input and resubmit
    InvalidInput,
    /// forged or mismatched input proof, never retried
    ProofVerification,
    /// encryption, homomorphic op or random draw failed
    Cryptographic,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAmount(_) | Error::MalformedInput(_) => ErrorKind::InvalidInput,
            Error::ProofRejected { .. } => ErrorKind::ProofVerification,
            Error::Fhe(_) => ErrorKind::Cryptographic,
        }
    }

    /// whether resubmitting the same call can succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Cryptographic
    }
}
