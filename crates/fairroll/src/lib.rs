//! # fairroll
//!
//! encrypted dice wagering ledger.
//!
//! a player converts a deposit into an encrypted point balance, then stakes
//! an encrypted guess ("big" 4-6 or "small" 1-3) against an encrypted die
//! roll. every value the ledger holds is a [`Handle`]; settlement runs
//! entirely over ciphertexts through a [`FheRuntime`].
//!
//! ```text
//! deposit_to_points(amount)
//!   balance = balance + enc(amount * points_per_eth)
//!
//! play_round(guess, proof)
//!   dice    = random(u8, 6) + 1
//!   won     = (guess == 1 & dice >= 4) | (guess == 2 & dice <= 3)
//!   reward  = select(won, enc(reward_points), enc(0))
//!   balance = balance + reward
//!   round   = (dice, guess, reward)
//! ```
//!
//! nothing here decrypts. players read their values back through the
//! authorized decryption flow in `fairroll-decrypt`.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod guess;
pub mod ledger;

pub use config::ExchangeParams;
pub use engine::{FairRoll, DICE_FACES};
pub use error::{Error, ErrorKind, Result};
pub use events::LedgerEvent;
pub use guess::{encrypt_guess, Guess};
pub use ledger::{Ledger, Round, Snapshot};

pub use fairroll_fhe::{Address, FheRuntime, Handle, InputProof};
