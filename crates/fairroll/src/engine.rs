//! settlement engine
//!
//! state transitions for `deposit_to_points` and `play_round`. every
//! fallible step runs before anything is written: handles are computed,
//! access is granted, then one [`PendingWrites`] is committed.

use fairroll_fhe::{Address, FheRuntime, FheType, Handle, InputProof, Operand};
use tracing::{debug, info};

use crate::config::ExchangeParams;
use crate::events::LedgerEvent;
use crate::guess::Guess;
use crate::ledger::{Ledger, PendingWrites, Round, Snapshot};
use crate::{Error, Result};

/// faces on the die, rolls land in `1..=DICE_FACES`
pub const DICE_FACES: u64 = 6;

/// lowest roll that counts as big
const BIG_FROM: u64 = 4;

/// highest roll that counts as small
const SMALL_UP_TO: u64 = 3;

/// a deployed fairroll ledger over runtime `F`
pub struct FairRoll<F: FheRuntime> {
    runtime: F,
    contract: Address,
    params: ExchangeParams,
    ledger: Ledger,
}

impl<F: FheRuntime> FairRoll<F> {
    /// deploy at `contract`; params are fixed from here on
    pub fn deploy(runtime: F, contract: Address, params: ExchangeParams) -> Self {
        info!(
            %contract,
            points_per_eth = params.points_per_eth,
            reward_points = params.reward_points,
            "fairroll deployed"
        );
        Self {
            runtime,
            contract,
            params,
            ledger: Ledger::new(),
        }
    }

    pub fn runtime(&self) -> &F {
        &self.runtime
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    /// points minted per whole native unit
    pub fn exchange_rate(&self) -> u64 {
        self.params.points_per_eth
    }

    /// points credited for a correct guess
    pub fn reward_size(&self) -> u64 {
        self.params.reward_points
    }

    pub fn params(&self) -> ExchangeParams {
        self.params
    }

    pub fn balance_of(&self, account: Address) -> Handle {
        self.ledger.balance_of(account)
    }

    pub fn last_round(&self, account: Address) -> Round {
        self.ledger.last_round(account)
    }

    pub fn snapshot(&self, account: Address) -> Snapshot {
        self.ledger.snapshot(account)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        self.ledger.events()
    }

    /// buy points with `amount` whole native units
    ///
    /// sub-unit deposits (e.g. 0.1 eth) are not representable.
    /// returns the new balance handle.
    pub fn deposit_to_points(&mut self, caller: Address, amount: u64) -> Result<Handle> {
        if amount == 0 {
            return Err(Error::InvalidAmount("deposit must be positive".into()));
        }
        let minted = self.params.points_for(amount).ok_or_else(|| {
            Error::InvalidAmount(format!("{amount} units overflow the 64-bit point balance"))
        })?;

        let minted = self.runtime.encrypt(minted, FheType::Uint64)?;
        let current = self.balance_or_zero(caller)?;
        let balance = self.runtime.add(current, minted.into())?;
        self.grant(balance, caller)?;

        self.ledger.commit(
            PendingWrites::new(caller)
                .balance(balance)
                .event(LedgerEvent::PointsPurchased {
                    player: caller,
                    amount,
                    balance,
                }),
        );

        info!(player = %caller, amount, %balance, "points purchased");
        Ok(balance)
    }

    /// settle one round against the encrypted `guess`
    ///
    /// the previous round, if any, is replaced. returns the new round.
    pub fn play_round(&mut self, caller: Address, guess: Handle, proof: &InputProof) -> Result<Round> {
        if !self.runtime.verify_input(guess, proof, self.contract, caller)? {
            return Err(Error::ProofRejected { caller });
        }
        let ty = self.runtime.type_of(guess)?;
        if ty != FheType::Uint8 {
            return Err(Error::MalformedInput(format!("guess must be euint8, got {ty}")));
        }

        let roll = self.runtime.random(FheType::Uint8, DICE_FACES)?;
        let dice = self.runtime.add(roll, Operand::Plain(1))?;

        let won = self.guess_matches(guess, dice)?;
        let prize = self.runtime.encrypt(self.params.reward_points, FheType::Uint64)?;
        let nothing = self.runtime.encrypt(0, FheType::Uint64)?;
        let reward = self.runtime.select(won, prize, nothing)?;

        let current = self.balance_or_zero(caller)?;
        let balance = self.runtime.add(current, reward.into())?;

        let round = Round { dice, guess, reward };
        for handle in [balance, dice, guess, reward] {
            self.grant(handle, caller)?;
        }

        self.ledger.commit(
            PendingWrites::new(caller)
                .balance(balance)
                .round(round)
                .event(LedgerEvent::RoundPlayed {
                    player: caller,
                    dice,
                    guess,
                    reward,
                    balance,
                }),
        );

        info!(player = %caller, %dice, %reward, %balance, "round played");
        Ok(round)
    }

    /// `(guess == big & dice >= 4) | (guess == small & dice <= 3)`
    fn guess_matches(&self, guess: Handle, dice: Handle) -> Result<Handle> {
        let rt = &self.runtime;

        let picked_big = rt.eq(guess, Operand::Plain(Guess::Big.code() as u64))?;
        let rolled_big = rt.ge(dice, Operand::Plain(BIG_FROM))?;
        let big_wins = rt.and(picked_big, rolled_big)?;

        let picked_small = rt.eq(guess, Operand::Plain(Guess::Small.code() as u64))?;
        let rolled_small = rt.le(dice, Operand::Plain(SMALL_UP_TO))?;
        let small_wins = rt.and(picked_small, rolled_small)?;

        Ok(rt.or(big_wins, small_wins)?)
    }

    /// current balance, or a fresh encrypted zero for a new account
    fn balance_or_zero(&self, account: Address) -> Result<Handle> {
        let balance = self.ledger.balance_of(account);
        if balance.is_empty() {
            debug!(%account, "initializing balance");
            return Ok(self.runtime.encrypt(0, FheType::Uint64)?);
        }
        Ok(balance)
    }

    /// contract keeps using the handle, player may decrypt it
    fn grant(&self, handle: Handle, player: Address) -> Result<()> {
        self.runtime.allow(handle, self.contract)?;
        self.runtime.allow(handle, player)?;
        Ok(())
    }
}
