//! software runtime - in-memory implementation for development and testing
//!
//! ciphertext payloads are sealed with a process key, handles are derived
//! from a counter so every operation yields a fresh handle. there is no
//! homomorphic security here: whoever holds the runtime holds the key.
//! intermediate ciphertexts are never dropped, so the table grows by about
//! a dozen entries per round. NOT for production.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use crate::crypto::{handle_digest, mac, open, random_bytes, seal, verify_mac};
use crate::runtime::{
    DecryptionOracle, EncryptedInput, FheRuntime, InputEncryptor, InputProof, Operand,
};
use crate::types::{Address, FheType, Handle};
use crate::{Error, Result};

/// max handles covered by one input proof
const MAX_INPUTS: usize = u8::MAX as usize;

struct Ciphertext {
    ty: FheType,
    sealed: Vec<u8>,
}

#[derive(Default)]
struct Table {
    ciphertexts: HashMap<Handle, Ciphertext>,
    acl: HashMap<Handle, HashSet<Address>>,
    counter: u64,
}

/// in-memory fhe runtime
///
/// cloning shares the ciphertext table, so a ledger and a local relay can
/// run over the same state.
#[derive(Clone)]
pub struct SoftwareRuntime {
    id: [u8; 16],
    seal_key: [u8; 32],
    proof_key: [u8; 32],
    table: Arc<RwLock<Table>>,
    rng: Arc<Mutex<Box<dyn RngCore + Send>>>,
}

impl SoftwareRuntime {
    /// runtime with fresh keys and an entropy-seeded rng
    pub fn new() -> Self {
        Self::with_rng(ChaCha20Rng::from_entropy())
    }

    /// deterministic random draws (keys stay random)
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha20Rng::seed_from_u64(seed))
    }

    /// runtime drawing encrypted randomness from `rng`
    pub fn with_rng<R: RngCore + Send + 'static>(rng: R) -> Self {
        Self {
            id: random_bytes(),
            seal_key: random_bytes(),
            proof_key: random_bytes(),
            table: Arc::new(RwLock::new(Table::default())),
            rng: Arc::new(Mutex::new(Box::new(rng))),
        }
    }

    /// number of ciphertexts held
    pub fn ciphertext_count(&self) -> usize {
        self.table
            .read()
            .map(|table| table.ciphertexts.len())
            .unwrap_or(0)
    }

    fn mint(&self, ty: FheType, value: u64, op: &[u8], inputs: &[&[u8]]) -> Result<Handle> {
        let mut table = self.table.write().map_err(|e| Error::Storage(e.to_string()))?;
        table.counter += 1;

        let digest = handle_digest(&self.id, table.counter, op, inputs);
        let handle = Handle::mint(&digest, ty);
        let sealed = seal(&self.seal_key, &ty.wrap(value).to_le_bytes(), &nonce_for(&handle))?;

        table.ciphertexts.insert(handle, Ciphertext { ty, sealed });
        trace!(%handle, %ty, op = %String::from_utf8_lossy(op), "minted ciphertext");
        Ok(handle)
    }

    fn load(&self, handle: Handle) -> Result<(FheType, u64)> {
        if handle.is_empty() {
            return Err(Error::EmptyHandle);
        }
        let table = self.table.read().map_err(|e| Error::Storage(e.to_string()))?;
        let ct = table
            .ciphertexts
            .get(&handle)
            .ok_or(Error::UnknownHandle(handle))?;

        let bytes = open(&self.seal_key, &ct.sealed, &nonce_for(&handle))?;
        let arr: [u8; 8] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::DecryptionFailed("payload is not a u64".into()))?;
        Ok((ct.ty, u64::from_le_bytes(arr)))
    }

    fn load_as(&self, handle: Handle, expected: FheType) -> Result<u64> {
        let (ty, value) = self.load(handle)?;
        if ty != expected {
            return Err(Error::TypeMismatch {
                expected,
                actual: ty,
            });
        }
        Ok(value)
    }

    /// right-hand value plus the bytes that identify it in the handle digest
    fn resolve(&self, ty: FheType, rhs: Operand) -> Result<(u64, Vec<u8>)> {
        match rhs {
            Operand::Cipher(handle) => {
                let value = self.load_as(handle, ty)?;
                Ok((value, handle.as_bytes().to_vec()))
            }
            Operand::Plain(value) => {
                if !ty.fits(value) {
                    return Err(Error::ScalarOutOfRange { value, ty });
                }
                Ok((value, value.to_le_bytes().to_vec()))
            }
        }
    }

    fn compare(
        &self,
        op: &[u8],
        lhs: Handle,
        rhs: Operand,
        cmp: impl Fn(u64, u64) -> bool,
    ) -> Result<Handle> {
        let (ty, a) = self.load(lhs)?;
        let (b, rhs_bytes) = self.resolve(ty, rhs)?;
        self.mint(FheType::Bool, cmp(a, b) as u64, op, &[lhs.as_bytes(), &rhs_bytes])
    }

    fn logic(&self, op: &[u8], lhs: Handle, rhs: Handle, f: impl Fn(u64, u64) -> u64) -> Result<Handle> {
        let a = self.load_as(lhs, FheType::Bool)?;
        let b = self.load_as(rhs, FheType::Bool)?;
        self.mint(FheType::Bool, f(a, b), op, &[lhs.as_bytes(), rhs.as_bytes()])
    }

    /// uniform sample in `[0, bound)` by rejection
    fn sample(&self, bound: u64) -> Result<u64> {
        let mut rng = self.rng.lock().map_err(|e| Error::Storage(e.to_string()))?;
        let zone = u64::MAX - (u64::MAX % bound);
        loop {
            let v = rng.next_u64();
            if v < zone {
                return Ok(v % bound);
            }
        }
    }

    fn proof_tag(&self, contract: Address, caller: Address, handles: &[Handle]) -> [u8; 32] {
        let joined: Vec<u8> = handles.iter().flat_map(|h| *h.as_bytes()).collect();
        mac(
            &self.proof_key,
            &[
                b"fairroll:input-proof:v1",
                contract.as_bytes(),
                caller.as_bytes(),
                &joined,
            ],
        )
    }
}

impl Default for SoftwareRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// handles are unique per runtime, so their prefix is a unique nonce
fn nonce_for(handle: &Handle) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce.copy_from_slice(&handle.as_bytes()[..12]);
    nonce
}

impl FheRuntime for SoftwareRuntime {
    fn encrypt(&self, value: u64, ty: FheType) -> Result<Handle> {
        if !ty.fits(value) {
            return Err(Error::ScalarOutOfRange { value, ty });
        }
        self.mint(ty, value, b"trivial", &[])
    }

    fn verify_input(
        &self,
        input: Handle,
        proof: &InputProof,
        contract: Address,
        caller: Address,
    ) -> Result<bool> {
        let Some((handles, tag)) = proof.decode() else {
            return Ok(false);
        };
        if !handles.contains(&input) {
            return Ok(false);
        }

        let joined: Vec<u8> = handles.iter().flat_map(|h| *h.as_bytes()).collect();
        let valid = verify_mac(
            &self.proof_key,
            &[
                b"fairroll:input-proof:v1",
                contract.as_bytes(),
                caller.as_bytes(),
                &joined,
            ],
            tag,
        );
        if !valid {
            return Ok(false);
        }

        // covered handles must still resolve here
        self.type_of(input)?;
        Ok(true)
    }

    fn add(&self, lhs: Handle, rhs: Operand) -> Result<Handle> {
        let (ty, a) = self.load(lhs)?;
        let (b, rhs_bytes) = self.resolve(ty, rhs)?;
        self.mint(ty, a.wrapping_add(b), b"add", &[lhs.as_bytes(), &rhs_bytes])
    }

    fn eq(&self, lhs: Handle, rhs: Operand) -> Result<Handle> {
        self.compare(b"eq", lhs, rhs, |a, b| a == b)
    }

    fn ge(&self, lhs: Handle, rhs: Operand) -> Result<Handle> {
        self.compare(b"ge", lhs, rhs, |a, b| a >= b)
    }

    fn le(&self, lhs: Handle, rhs: Operand) -> Result<Handle> {
        self.compare(b"le", lhs, rhs, |a, b| a <= b)
    }

    fn and(&self, lhs: Handle, rhs: Handle) -> Result<Handle> {
        self.logic(b"and", lhs, rhs, |a, b| a & b)
    }

    fn or(&self, lhs: Handle, rhs: Handle) -> Result<Handle> {
        self.logic(b"or", lhs, rhs, |a, b| a | b)
    }

    fn select(&self, cond: Handle, if_true: Handle, if_false: Handle) -> Result<Handle> {
        let c = self.load_as(cond, FheType::Bool)?;
        let (ty, t) = self.load(if_true)?;
        let f = self.load_as(if_false, ty)?;
        let chosen = if c == 1 { t } else { f };
        self.mint(
            ty,
            chosen,
            b"select",
            &[cond.as_bytes(), if_true.as_bytes(), if_false.as_bytes()],
        )
    }

    fn random(&self, ty: FheType, bound: u64) -> Result<Handle> {
        let in_range = match ty {
            FheType::Uint64 => bound > 0,
            _ => bound > 0 && bound <= ty.max_value() + 1,
        };
        if !in_range {
            return Err(Error::InvalidBound { bound, ty });
        }
        let value = self.sample(bound)?;
        self.mint(ty, value, b"rand", &[&bound.to_le_bytes()])
    }

    fn allow(&self, handle: Handle, account: Address) -> Result<()> {
        let mut table = self.table.write().map_err(|e| Error::Storage(e.to_string()))?;
        if !table.ciphertexts.contains_key(&handle) {
            return Err(Error::UnknownHandle(handle));
        }
        table.acl.entry(handle).or_default().insert(account);
        Ok(())
    }

    fn is_allowed(&self, handle: Handle, account: Address) -> bool {
        self.table
            .read()
            .map(|table| {
                table
                    .acl
                    .get(&handle)
                    .map_or(false, |allowed| allowed.contains(&account))
            })
            .unwrap_or(false)
    }

    fn type_of(&self, handle: Handle) -> Result<FheType> {
        if handle.is_empty() {
            return Err(Error::EmptyHandle);
        }
        let table = self.table.read().map_err(|e| Error::Storage(e.to_string()))?;
        table
            .ciphertexts
            .get(&handle)
            .map(|ct| ct.ty)
            .ok_or(Error::UnknownHandle(handle))
    }
}

impl InputEncryptor for SoftwareRuntime {
    fn encrypt_input(
        &self,
        contract: Address,
        caller: Address,
        values: &[(u64, FheType)],
    ) -> Result<EncryptedInput> {
        if values.is_empty() || values.len() > MAX_INPUTS {
            return Err(Error::InvalidInput(format!(
                "expected 1..={MAX_INPUTS} values, got {}",
                values.len()
            )));
        }

        let mut handles = Vec::with_capacity(values.len());
        for &(value, ty) in values {
            if !ty.fits(value) {
                return Err(Error::ScalarOutOfRange { value, ty });
            }
            handles.push(self.mint(ty, value, b"input", &[contract.as_bytes(), caller.as_bytes()])?);
        }

        let tag = self.proof_tag(contract, caller, &handles);
        let proof = InputProof::encode(&handles, &tag);
        Ok(EncryptedInput { handles, proof })
    }
}

impl DecryptionOracle for SoftwareRuntime {
    fn reveal(&self, handle: Handle) -> Result<Option<u64>> {
        match self.load(handle) {
            Ok((_, value)) => Ok(Some(value)),
            Err(Error::EmptyHandle) | Err(Error::UnknownHandle(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn may_decrypt(&self, handle: Handle, account: Address) -> bool {
        self.is_allowed(handle, account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::InputBuilder;
    use rand::rngs::mock::StepRng;

    fn reveal(rt: &SoftwareRuntime, handle: Handle) -> u64 {
        rt.reveal(handle).unwrap().unwrap()
    }

    #[test]
    fn test_encrypt_and_add() {
        let rt = SoftwareRuntime::new();
        let a = rt.encrypt(100_000, FheType::Uint64).unwrap();
        let b = rt.encrypt(1_000, FheType::Uint64).unwrap();

        let sum = rt.add(a, b.into()).unwrap();
        assert_eq!(reveal(&rt, sum), 101_000);
        assert_eq!(rt.type_of(sum).unwrap(), FheType::Uint64);

        let plus_one = rt.add(a, Operand::Plain(1)).unwrap();
        assert_eq!(reveal(&rt, plus_one), 100_001);
    }

    #[test]
    fn test_every_operation_mints_fresh_handle() {
        let rt = SoftwareRuntime::new();
        let a = rt.encrypt(5, FheType::Uint8).unwrap();
        let b = rt.encrypt(5, FheType::Uint8).unwrap();
        assert_ne!(a, b);

        let x = rt.add(a, Operand::Plain(0)).unwrap();
        let y = rt.add(a, Operand::Plain(0)).unwrap();
        assert_ne!(x, y);
        assert_eq!(reveal(&rt, x), reveal(&rt, y));
    }

    #[test]
    fn test_add_wraps_at_type_width() {
        let rt = SoftwareRuntime::new();
        let a = rt.encrypt(250, FheType::Uint8).unwrap();
        let sum = rt.add(a, Operand::Plain(10)).unwrap();
        assert_eq!(reveal(&rt, sum), 4);

        let max = rt.encrypt(u64::MAX, FheType::Uint64).unwrap();
        let wrapped = rt.add(max, Operand::Plain(2)).unwrap();
        assert_eq!(reveal(&rt, wrapped), 1);
    }

    #[test]
    fn test_comparisons_and_logic() {
        let rt = SoftwareRuntime::new();
        let four = rt.encrypt(4, FheType::Uint8).unwrap();

        let ge = rt.ge(four, Operand::Plain(4)).unwrap();
        let le = rt.le(four, Operand::Plain(3)).unwrap();
        let eq = rt.eq(four, Operand::Plain(4)).unwrap();
        assert_eq!(rt.type_of(ge).unwrap(), FheType::Bool);
        assert_eq!(reveal(&rt, ge), 1);
        assert_eq!(reveal(&rt, le), 0);
        assert_eq!(reveal(&rt, eq), 1);

        assert_eq!(reveal(&rt, rt.and(ge, le).unwrap()), 0);
        assert_eq!(reveal(&rt, rt.and(ge, eq).unwrap()), 1);
        assert_eq!(reveal(&rt, rt.or(ge, le).unwrap()), 1);
        assert_eq!(reveal(&rt, rt.or(le, le).unwrap()), 0);
    }

    #[test]
    fn test_select() {
        let rt = SoftwareRuntime::new();
        let yes = rt.encrypt(1, FheType::Bool).unwrap();
        let no = rt.encrypt(0, FheType::Bool).unwrap();
        let reward = rt.encrypt(1_000, FheType::Uint64).unwrap();
        let zero = rt.encrypt(0, FheType::Uint64).unwrap();

        assert_eq!(reveal(&rt, rt.select(yes, reward, zero).unwrap()), 1_000);
        assert_eq!(reveal(&rt, rt.select(no, reward, zero).unwrap()), 0);
    }

    #[test]
    fn test_type_errors() {
        let rt = SoftwareRuntime::new();
        let small = rt.encrypt(3, FheType::Uint8).unwrap();
        let big = rt.encrypt(3, FheType::Uint64).unwrap();
        let flag = rt.encrypt(1, FheType::Bool).unwrap();

        assert!(matches!(
            rt.add(small, big.into()),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            rt.add(small, Operand::Plain(256)),
            Err(Error::ScalarOutOfRange { .. })
        ));
        assert!(matches!(
            rt.select(small, big, big),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            rt.select(flag, small, big),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            rt.and(small, flag),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            rt.encrypt(2, FheType::Bool),
            Err(Error::ScalarOutOfRange { .. })
        ));
    }

    #[test]
    fn test_empty_and_unknown_handles() {
        let rt = SoftwareRuntime::new();
        let other = SoftwareRuntime::new();
        let foreign = other.encrypt(1, FheType::Uint8).unwrap();

        assert!(matches!(rt.add(Handle::EMPTY, Operand::Plain(1)), Err(Error::EmptyHandle)));
        assert!(matches!(rt.type_of(foreign), Err(Error::UnknownHandle(_))));
        assert!(matches!(rt.allow(foreign, Address::ZERO), Err(Error::UnknownHandle(_))));
        assert_eq!(rt.reveal(foreign).unwrap(), None);
        assert_eq!(rt.reveal(Handle::EMPTY).unwrap(), None);
    }

    #[test]
    fn test_random_in_bounds() {
        let rt = SoftwareRuntime::with_seed(7);
        for _ in 0..200 {
            let h = rt.random(FheType::Uint8, 6).unwrap();
            assert!(reveal(&rt, h) < 6);
        }
        assert!(matches!(rt.random(FheType::Uint8, 0), Err(Error::InvalidBound { .. })));
        assert!(matches!(rt.random(FheType::Uint8, 257), Err(Error::InvalidBound { .. })));
        assert!(rt.random(FheType::Uint8, 256).is_ok());
    }

    #[test]
    fn test_random_with_fixed_rng() {
        let rt = SoftwareRuntime::with_rng(StepRng::new(4, 0));
        let a = rt.random(FheType::Uint8, 6).unwrap();
        let b = rt.random(FheType::Uint8, 6).unwrap();
        assert_ne!(a, b);
        assert_eq!(reveal(&rt, a), 4);
        assert_eq!(reveal(&rt, b), 4);
    }

    #[test]
    fn test_input_proof_roundtrip() {
        let rt = SoftwareRuntime::new();
        let contract = Address::derive(b"fairroll");
        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");

        let input = InputBuilder::new(&rt, contract, alice).add8(1).encrypt().unwrap();
        let guess = input.handles[0];
        assert_eq!(rt.type_of(guess).unwrap(), FheType::Uint8);
        assert_eq!(reveal(&rt, guess), 1);

        assert!(rt.verify_input(guess, &input.proof, contract, alice).unwrap());
        // bound to caller and contract
        assert!(!rt.verify_input(guess, &input.proof, contract, bob).unwrap());
        assert!(!rt.verify_input(guess, &input.proof, Address::derive(b"other"), alice).unwrap());
    }

    #[test]
    fn test_forged_proof_rejected() {
        let rt = SoftwareRuntime::new();
        let contract = Address::derive(b"fairroll");
        let alice = Address::derive(b"alice");

        let input = InputBuilder::new(&rt, contract, alice).add8(2).encrypt().unwrap();
        let other = InputBuilder::new(&rt, contract, alice).add8(1).encrypt().unwrap();

        // proof for a different input
        assert!(!rt.verify_input(input.handles[0], &other.proof, contract, alice).unwrap());

        // tampered tag
        let mut bytes = input.proof.as_bytes().to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 1;
        let tampered = InputProof::from_bytes(bytes);
        assert!(!rt.verify_input(input.handles[0], &tampered, contract, alice).unwrap());

        // garbage
        let garbage = InputProof::from_bytes(vec![0xde, 0xad]);
        assert!(!rt.verify_input(input.handles[0], &garbage, contract, alice).unwrap());

        // proofs from another runtime do not verify here
        let other_rt = SoftwareRuntime::new();
        let foreign = InputBuilder::new(&other_rt, contract, alice).add8(1).encrypt().unwrap();
        assert!(!rt.verify_input(foreign.handles[0], &foreign.proof, contract, alice).unwrap());
    }

    #[test]
    fn test_encrypt_input_limits() {
        let rt = SoftwareRuntime::new();
        let contract = Address::derive(b"fairroll");
        let alice = Address::derive(b"alice");
        assert!(matches!(
            rt.encrypt_input(contract, alice, &[]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            rt.encrypt_input(contract, alice, &[(300, FheType::Uint8)]),
            Err(Error::ScalarOutOfRange { .. })
        ));

        let multi = InputBuilder::new(&rt, contract, alice)
            .add_bool(true)
            .add8(7)
            .add64(9_000)
            .encrypt()
            .unwrap();
        assert_eq!(multi.handles.len(), 3);
        for handle in &multi.handles {
            assert!(rt.verify_input(*handle, &multi.proof, contract, alice).unwrap());
        }
    }

    #[test]
    fn test_acl() {
        let rt = SoftwareRuntime::new();
        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");
        let h = rt.encrypt(42, FheType::Uint64).unwrap();

        assert!(!rt.is_allowed(h, alice));
        rt.allow(h, alice).unwrap();
        assert!(rt.is_allowed(h, alice));
        assert!(rt.may_decrypt(h, alice));
        assert!(!rt.may_decrypt(h, bob));
    }

    #[test]
    fn test_clone_shares_table() {
        let rt = SoftwareRuntime::new();
        let relay_view = rt.clone();
        let h = rt.encrypt(77, FheType::Uint64).unwrap();
        assert_eq!(relay_view.reveal(h).unwrap(), Some(77));
        assert_eq!(relay_view.ciphertext_count(), rt.ciphertext_count());
    }
}
