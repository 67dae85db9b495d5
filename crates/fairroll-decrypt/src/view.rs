//! decrypted values and the display state built from them

use std::collections::HashMap;

use fairroll::{Guess, Snapshot};
use fairroll_fhe::{Address, Handle};
use serde::{Deserialize, Serialize};

use crate::Error;

/// cleartext of one snapshot, `None` where the relay had no value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedValues {
    /// attempt that produced these values
    pub attempt: u64,
    pub account: Address,
    pub balance: Option<u64>,
    pub dice: Option<u64>,
    pub guess: Option<u64>,
    pub reward: Option<u64>,
}

impl DecryptedValues {
    /// attribute `values` to snapshot fields by handle identity
    ///
    /// an empty handle, or one missing from `values`, stays `None`.
    pub fn reconcile(attempt: u64, snapshot: &Snapshot, values: &HashMap<Handle, u64>) -> Self {
        let lookup = |handle: Handle| {
            if handle.is_empty() {
                return None;
            }
            values.get(&handle).copied()
        };
        Self {
            attempt,
            account: snapshot.account,
            balance: lookup(snapshot.balance),
            dice: lookup(snapshot.round.dice),
            guess: lookup(snapshot.round.guess),
            reward: lookup(snapshot.round.reward),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.balance.is_some() && self.dice.is_some() && self.guess.is_some() && self.reward.is_some()
    }

    pub fn guess_choice(&self) -> Option<Guess> {
        self.guess.and_then(Guess::from_code)
    }

    /// one-line summary of the last round
    pub fn outcome_text(&self) -> String {
        let (Some(dice), Some(guess), Some(reward)) = (self.dice, self.guess, self.reward) else {
            return "Play a round to reveal the outcome.".into();
        };

        let chose = if guess == Guess::Big.code() as u64 {
            Guess::Big
        } else {
            Guess::Small
        };
        let reward = if reward > 0 {
            format!("+{} pts", group_thousands(reward))
        } else {
            "No reward this time".into()
        };
        format!("Rolled {dice} · You chose {} · {reward}", chose.label())
    }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// what the player currently sees
///
/// successes replace all four values at once, in completion order.
/// failures record the error and keep whatever was shown.
#[derive(Clone, Debug, Default)]
pub struct DecryptedView {
    values: Option<DecryptedValues>,
    last_error: Option<String>,
}

impl DecryptedView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> Option<&DecryptedValues> {
        self.values.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// attempt whose values are on screen
    pub fn attempt(&self) -> Option<u64> {
        self.values.as_ref().map(|v| v.attempt)
    }

    pub fn apply_success(&mut self, values: DecryptedValues) {
        self.values = Some(values);
        self.last_error = None;
    }

    pub fn apply_failure(&mut self, error: &Error) {
        self.last_error = Some(error.to_string());
    }

    pub fn balance_text(&self) -> String {
        match self.values.as_ref().and_then(|v| v.balance) {
            Some(balance) => format!("{} pts", group_thousands(balance)),
            None => "Encrypted".into(),
        }
    }

    pub fn outcome_text(&self) -> String {
        match &self.values {
            Some(values) => values.outcome_text(),
            None => "Play a round to reveal the outcome.".into(),
        }
    }
}
