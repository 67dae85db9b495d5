//! ledger and round store
//!
//! per account: one encrypted balance and the most recent round. reads
//! never fail, anything never written reads as [`Handle::EMPTY`].
//! writes go through [`PendingWrites`] so a call either lands whole or not
//! at all.

use std::collections::BTreeMap;

use fairroll_fhe::{Address, Handle};
use serde::{Deserialize, Serialize};

use crate::events::LedgerEvent;

/// encrypted (dice, guess, reward) of one round
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub dice: Handle,
    pub guess: Handle,
    pub reward: Handle,
}

impl Round {
    /// no round played yet
    pub const EMPTY: Round = Round {
        dice: Handle::EMPTY,
        guess: Handle::EMPTY,
        reward: Handle::EMPTY,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn handles(&self) -> [Handle; 3] {
        [self.dice, self.guess, self.reward]
    }
}

/// balance and round of one account, captured by a single read
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub account: Address,
    pub balance: Handle,
    pub round: Round,
}

impl Snapshot {
    /// non-empty handles in (balance, dice, guess, reward) order
    pub fn handles(&self) -> Vec<Handle> {
        std::iter::once(self.balance)
            .chain(self.round.handles())
            .filter(|h| !h.is_empty())
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct AccountState {
    balance: Handle,
    round: Round,
}

/// writes staged by one settlement call
#[derive(Debug)]
pub(crate) struct PendingWrites {
    account: Address,
    balance: Option<Handle>,
    round: Option<Round>,
    event: Option<LedgerEvent>,
}

impl PendingWrites {
    pub(crate) fn new(account: Address) -> Self {
        Self {
            account,
            balance: None,
            round: None,
            event: None,
        }
    }

    pub(crate) fn balance(mut self, balance: Handle) -> Self {
        self.balance = Some(balance);
        self
    }

    pub(crate) fn round(mut self, round: Round) -> Self {
        self.round = Some(round);
        self
    }

    pub(crate) fn event(mut self, event: LedgerEvent) -> Self {
        self.event = Some(event);
        self
    }
}

/// per-account encrypted state plus the event log
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: BTreeMap<Address, AccountState>,
    events: Vec<LedgerEvent>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: Address) -> Handle {
        self.accounts
            .get(&account)
            .map_or(Handle::EMPTY, |state| state.balance)
    }

    pub fn last_round(&self, account: Address) -> Round {
        self.accounts
            .get(&account)
            .map_or(Round::EMPTY, |state| state.round)
    }

    pub fn snapshot(&self, account: Address) -> Snapshot {
        let state = self.accounts.get(&account).copied().unwrap_or_default();
        Snapshot {
            account,
            balance: state.balance,
            round: state.round,
        }
    }

    /// events in the order they were committed
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// accounts that have interacted at least once
    pub fn accounts(&self) -> impl Iterator<Item = &Address> {
        self.accounts.keys()
    }

    pub(crate) fn set_balance(&mut self, account: Address, balance: Handle) {
        self.accounts.entry(account).or_default().balance = balance;
    }

    pub(crate) fn set_round(&mut self, account: Address, round: Round) {
        self.accounts.entry(account).or_default().round = round;
    }

    /// apply staged writes, infallible by construction
    pub(crate) fn commit(&mut self, writes: PendingWrites) {
        let PendingWrites {
            account,
            balance,
            round,
            event,
        } = writes;

        if let Some(balance) = balance {
            self.set_balance(account, balance);
        }
        if let Some(round) = round {
            self.set_round(account, round);
        }
        if let Some(event) = event {
            self.events.push(event);
        }
    }
}
