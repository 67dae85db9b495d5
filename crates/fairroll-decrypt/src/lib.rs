//! # fairroll-decrypt
//!
//! client side of user decryption. the ledger only ever hands out handles;
//! turning them back into numbers for display takes an explicit, signed
//! grant that a relay checks before it answers.
//!
//! ```text
//!  1. keypair     ephemeral x25519, private half stays here
//!  2. grant       eip-712 UserDecryptRequestVerification signed by wallet
//!  3. collect     non-empty handles from one ledger snapshot
//!  4. relay       { handles, grant } ──▶ relay ──▶ values sealed to keypair
//!  5. reconcile   value ↦ field strictly by handle identity
//! ```
//!
//! the protocol never writes to the ledger.
//!
//! ## relays
//!
//! - [`LocalRelay`]: in-process, over any [`fairroll_fhe::DecryptionOracle`]
//! - `HttpRelay`: json over http, behind the `network` feature

pub mod config;
pub mod eip712;
pub mod envelope;
pub mod error;
pub mod grant;
pub mod keypair;
pub mod relay;
pub mod request;
pub mod view;
pub mod wallet;

#[cfg(feature = "network")]
pub mod http;

pub use config::DecryptConfig;
pub use eip712::{Eip712Domain, UserDecryptRequest};
pub use envelope::SealedValue;
pub use error::{Error, ErrorKind, Result};
pub use grant::AuthorizationGrant;
pub use keypair::EphemeralKeypair;
pub use relay::{DecryptRequest, DecryptResponse, HandleRequest, LocalRelay, Relay};
pub use request::{DecryptionRequest, Decryptor, Stage};
pub use view::{DecryptedValues, DecryptedView};
pub use wallet::{EvmSignature, LocalWallet, WalletSigner};

#[cfg(feature = "network")]
pub use http::HttpRelay;
