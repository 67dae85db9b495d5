//! client-side guess encoding

use std::fmt;
use std::str::FromStr;

use fairroll_fhe::{Address, EncryptedInput, InputBuilder, InputEncryptor};

use crate::{Error, Result};

/// a player's prediction for one roll
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Guess {
    /// dice 4, 5 or 6
    Big = 1,
    /// dice 1, 2 or 3
    Small = 2,
}

impl Guess {
    /// plaintext the ledger compares against
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Guess::Big),
            2 => Some(Guess::Small),
            _ => None,
        }
    }

    pub fn wins(self, dice: u64) -> bool {
        match self {
            Guess::Big => (4..=6).contains(&dice),
            Guess::Small => (1..=3).contains(&dice),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Guess::Big => "Big (4-6)",
            Guess::Small => "Small (1-3)",
        }
    }
}

impl fmt::Display for Guess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Guess {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "big" | "1" => Ok(Guess::Big),
            "small" | "2" => Ok(Guess::Small),
            other => Err(Error::MalformedInput(format!(
                "guess must be big or small, got {other:?}"
            ))),
        }
    }
}

/// encrypt a guess for `player` calling `contract`
pub fn encrypt_guess<E: InputEncryptor + ?Sized>(
    encryptor: &E,
    contract: Address,
    player: Address,
    guess: Guess,
) -> Result<EncryptedInput> {
    Ok(InputBuilder::new(encryptor, contract, player)
        .add8(guess.code())
        .encrypt()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Guess::Big.code(), 1);
        assert_eq!(Guess::Small.code(), 2);
        assert_eq!(Guess::from_code(1), Some(Guess::Big));
        assert_eq!(Guess::from_code(7), None);
    }

    #[test]
    fn test_wins() {
        for dice in 1..=6u64 {
            assert_eq!(Guess::Big.wins(dice), dice >= 4);
            assert_eq!(Guess::Small.wins(dice), dice <= 3);
        }
        assert!(!Guess::Big.wins(0));
        assert!(!Guess::Small.wins(0));
    }

    #[test]
    fn test_parse() {
        assert_eq!("big".parse::<Guess>().unwrap(), Guess::Big);
        assert_eq!("Small".parse::<Guess>().unwrap(), Guess::Small);
        assert!("medium".parse::<Guess>().is_err());
    }
}
