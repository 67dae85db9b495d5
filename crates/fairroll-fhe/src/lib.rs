//! # fairroll-fhe
//!
//! capability boundary between the fairroll ledger and a homomorphic
//! encryption runtime.
//!
//! the ledger never sees plaintext. it holds opaque [`Handle`]s and asks a
//! [`FheRuntime`] to combine them:
//!
//! ```text
//!   client                        ledger                      runtime
//!   ──────                        ──────                      ───────
//!   encrypt_input(guess) ──────▶  play_round(handle, proof)
//!                                   verify_input ───────────▶ hmac check
//!                                   random(u8, 6) ──────────▶ fresh draw
//!                                   eq / ge / le / and / or ▶ ebool
//!                                   select(ebool, r, 0) ────▶ euint64
//!                                   add(balance, reward) ───▶ euint64
//!                                   allow(handle, player) ──▶ acl
//! ```
//!
//! decryption is not part of [`FheRuntime`]. it lives behind
//! [`DecryptionOracle`], which only a relay holding the key material uses.
//!
//! ## runtimes
//!
//! - [`SoftwareRuntime`]: in-memory, ciphertexts sealed with chacha20poly1305
//!   under a process key. useful for development and tests, NOT homomorphic.

pub mod crypto;
pub mod error;
pub mod runtime;
pub mod types;

#[cfg(feature = "software")]
pub mod software;

pub use error::{Error, Result};
pub use runtime::{
    DecryptionOracle, EncryptedInput, FheRuntime, InputBuilder, InputEncryptor, InputProof,
    Operand,
};
pub use types::{Address, FheType, Handle};

#[cfg(feature = "software")]
pub use software::SoftwareRuntime;
