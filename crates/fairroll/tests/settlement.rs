//! settlement properties over the software runtime

use fairroll::{encrypt_guess, ErrorKind, ExchangeParams, FairRoll, Guess, LedgerEvent, DICE_FACES};
use fairroll_fhe::{
    Address, DecryptionOracle, FheRuntime, FheType, Handle, InputProof, Operand, SoftwareRuntime,
};
use proptest::prelude::*;
use rand::rngs::mock::StepRng;

fn contract() -> Address {
    Address::derive(b"fairroll")
}

fn player(n: u8) -> Address {
    Address::derive(&[b'p', n])
}

fn deploy(rt: SoftwareRuntime, params: ExchangeParams) -> FairRoll<SoftwareRuntime> {
    FairRoll::deploy(rt, contract(), params)
}

fn reveal(engine: &FairRoll<SoftwareRuntime>, handle: Handle) -> u64 {
    engine
        .runtime()
        .reveal(handle)
        .expect("reveal")
        .expect("handle known")
}

fn play(engine: &mut FairRoll<SoftwareRuntime>, who: Address, guess: Guess) -> fairroll::Round {
    let input = encrypt_guess(engine.runtime(), contract(), who, guess).unwrap();
    engine.play_round(who, input.handles[0], &input.proof).unwrap()
}

#[test]
fn test_reward_table_is_exhaustive() {
    for dice in 1..=DICE_FACES {
        for guess in [Guess::Big, Guess::Small] {
            let rt = SoftwareRuntime::with_rng(StepRng::new(dice - 1, 0));
            let mut engine = deploy(rt, ExchangeParams::default());
            let round = play(&mut engine, player(0), guess);

            let rolled = reveal(&engine, round.dice);
            let reward = reveal(&engine, round.reward);
            assert_eq!(rolled, dice);
            assert_eq!(reveal(&engine, round.guess), guess.code() as u64);

            let expected = if guess.wins(dice) { 1_000 } else { 0 };
            assert_eq!(reward, expected, "dice {dice} guess {guess:?}");
        }
    }
}

#[test]
fn test_dice_stays_in_range_with_real_rng() {
    let mut engine = deploy(SoftwareRuntime::with_seed(42), ExchangeParams::default());
    let mut seen = [false; 6];
    for _ in 0..300 {
        let round = play(&mut engine, player(1), Guess::Big);
        let dice = reveal(&engine, round.dice);
        assert!((1..=6).contains(&dice));
        seen[(dice - 1) as usize] = true;

        let reward = reveal(&engine, round.reward);
        assert!(reward == 0 || reward == 1_000);
    }
    assert!(seen.iter().all(|s| *s), "every face should come up in 300 rolls");
}

#[test]
fn test_confidential_reads_and_events() {
    let rt = SoftwareRuntime::with_rng(StepRng::new(4, 0));
    let mut engine = deploy(rt, ExchangeParams::default());
    engine.deposit_to_points(player(2), 1).unwrap();
    let round = play(&mut engine, player(2), Guess::Big);

    assert_eq!(round.dice.fhe_type(), Some(FheType::Uint8));
    assert_eq!(round.guess.fhe_type(), Some(FheType::Uint8));
    assert_eq!(round.reward.fhe_type(), Some(FheType::Uint64));
    assert_eq!(engine.balance_of(player(2)).fhe_type(), Some(FheType::Uint64));

    let events = engine.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], LedgerEvent::PointsPurchased { amount: 1, .. }));
    for event in events {
        assert_eq!(event.player(), player(2));
        assert!(event.handles().iter().all(|h| h.fhe_type().is_some()));
    }

    // the event payload is addresses, the public amount and handles only
    let json = serde_json::to_value(&events[1]).unwrap();
    let fields: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
    assert_eq!(fields, ["balance", "dice", "event", "guess", "player", "reward"]);
    for field in ["balance", "dice", "guess", "reward"] {
        let hex = json[field].as_str().unwrap();
        assert_eq!(hex.len(), 66);
    }
}

#[test]
fn test_reads_are_idempotent() {
    let mut engine = deploy(SoftwareRuntime::with_seed(1), ExchangeParams::default());
    engine.deposit_to_points(player(3), 2).unwrap();
    play(&mut engine, player(3), Guess::Small);

    let first = engine.snapshot(player(3));
    let handles_before = engine.runtime().ciphertext_count();
    for _ in 0..5 {
        assert_eq!(engine.snapshot(player(3)), first);
        assert_eq!(engine.balance_of(player(3)), first.balance);
        assert_eq!(engine.last_round(player(3)), first.round);
    }
    assert_eq!(engine.runtime().ciphertext_count(), handles_before);
}

#[test]
fn test_second_round_overwrites_first() {
    let mut engine = deploy(SoftwareRuntime::with_seed(9), ExchangeParams::default());
    let first = play(&mut engine, player(4), Guess::Big);
    let second = play(&mut engine, player(4), Guess::Small);

    assert_ne!(first, second);
    assert_eq!(engine.last_round(player(4)), second);
    for handle in first.handles() {
        assert!(!engine.last_round(player(4)).handles().contains(&handle));
    }
}

#[test]
fn test_accounts_are_isolated() {
    let rt = SoftwareRuntime::with_rng(StepRng::new(5, 0));
    let mut engine = deploy(rt, ExchangeParams::default());
    engine.deposit_to_points(player(5), 1).unwrap();
    play(&mut engine, player(6), Guess::Big);

    assert!(engine.last_round(player(5)).is_empty());
    assert_eq!(reveal(&engine, engine.balance_of(player(5))), 100_000);
    assert_eq!(reveal(&engine, engine.balance_of(player(6))), 1_000);
}


/// software runtime whose `select` always fails
struct FailingSelect(SoftwareRuntime);

impl FheRuntime for FailingSelect {
    fn encrypt(&self, value: u64, ty: FheType) -> fairroll_fhe::Result<Handle> {
        self.0.encrypt(value, ty)
    }

    fn verify_input(
        &self,
        input: Handle,
        proof: &InputProof,
        contract: Address,
        caller: Address,
    ) -> fairroll_fhe::Result<bool> {
        self.0.verify_input(input, proof, contract, caller)
    }

    fn add(&self, lhs: Handle, rhs: Operand) -> fairroll_fhe::Result<Handle> {
        self.0.add(lhs, rhs)
    }

    fn eq(&self, lhs: Handle, rhs: Operand) -> fairroll_fhe::Result<Handle> {
        self.0.eq(lhs, rhs)
    }

    fn ge(&self, lhs: Handle, rhs: Operand) -> fairroll_fhe::Result<Handle> {
        self.0.ge(lhs, rhs)
    }

    fn le(&self, lhs: Handle, rhs: Operand) -> fairroll_fhe::Result<Handle> {
        self.0.le(lhs, rhs)
    }

    fn and(&self, lhs: Handle, rhs: Handle) -> fairroll_fhe::Result<Handle> {
        self.0.and(lhs, rhs)
    }

    fn or(&self, lhs: Handle, rhs: Handle) -> fairroll_fhe::Result<Handle> {
        self.0.or(lhs, rhs)
    }

    fn select(&self, _: Handle, _: Handle, _: Handle) -> fairroll_fhe::Result<Handle> {
        Err(fairroll_fhe::Error::EncryptionFailed("select unavailable".into()))
    }

    fn random(&self, ty: FheType, bound: u64) -> fairroll_fhe::Result<Handle> {
        self.0.random(ty, bound)
    }

    fn allow(&self, handle: Handle, account: Address) -> fairroll_fhe::Result<()> {
        self.0.allow(handle, account)
    }

    fn is_allowed(&self, handle: Handle, account: Address) -> bool {
        self.0.is_allowed(handle, account)
    }

    fn type_of(&self, handle: Handle) -> fairroll_fhe::Result<FheType> {
        self.0.type_of(handle)
    }
}

#[test]
fn test_failed_homomorphic_op_reverts_round() {
    let rt = FailingSelect(SoftwareRuntime::with_seed(1));
    let mut engine = FairRoll::deploy(rt, contract(), ExchangeParams::default());
    engine.deposit_to_points(player(9), 1).unwrap();
    let before = engine.snapshot(player(9));

    let input = encrypt_guess(&engine.runtime().0, contract(), player(9), Guess::Big).unwrap();
    let err = engine
        .play_round(player(9), input.handles[0], &input.proof)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cryptographic);
    assert!(err.is_retryable());
    assert_eq!(engine.snapshot(player(9)), before);
    assert!(engine.last_round(player(9)).is_empty());
    assert_eq!(engine.events().len(), 1);
    assert!(matches!(engine.events()[0], LedgerEvent::PointsPurchased { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_exchange_mints_amount_times_rate(
        amounts in prop::collection::vec(1u64..1_000_000, 1..6),
        rate in 1u64..1_000_000,
    ) {
        let params = ExchangeParams::new(rate, 1_000);
        let mut engine = deploy(SoftwareRuntime::with_seed(0), params);
        let mut expected = 0u64;
        for amount in amounts {
            let before = engine.balance_of(player(7));
            engine.deposit_to_points(player(7), amount).unwrap();
            let after = engine.balance_of(player(7));
            prop_assert_ne!(before, after);
            expected += amount * rate;
            prop_assert_eq!(reveal(&engine, after), expected);
        }
    }

    #[test]
    fn prop_balance_moves_by_reward_only(
        seed in any::<u64>(),
        deposit in 1u64..100,
        guesses in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let mut engine = deploy(SoftwareRuntime::with_seed(seed), ExchangeParams::default());
        engine.deposit_to_points(player(8), deposit).unwrap();

        for big in guesses {
            let guess = if big { Guess::Big } else { Guess::Small };
            let before = reveal(&engine, engine.balance_of(player(8)));
            let round = play(&mut engine, player(8), guess);
            let after = reveal(&engine, engine.balance_of(player(8)));
            let reward = reveal(&engine, round.reward);

            prop_assert!(reward == 0 || reward == 1_000);
            prop_assert_eq!(after, before + reward);
            prop_assert_eq!(reward == 1_000, guess.wins(reveal(&engine, round.dice)));
        }
    }
}
