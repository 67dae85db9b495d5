//! error types for the fhe boundary

use thiserror::Error;

use crate::types::{FheType, Handle};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown ciphertext handle {0}")]
    UnknownHandle(Handle),

    #[error("empty handle used as an operand")]
    EmptyHandle,

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: FheType, actual: FheType },

    #[error("scalar {value} does not fit {ty}")]
    ScalarOutOfRange { value: u64, ty: FheType },

    #[error("random bound {bound} out of range for {ty}")]
    InvalidBound { bound: u64, ty: FheType },

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("storage error: {0}")]
    Storage(String),
}
