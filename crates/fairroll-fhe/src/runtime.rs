//! runtime traits
//!
//! [`FheRuntime`] is what the ledger calls. every operation takes and
//! returns handles; none of them reveal plaintext.
//!
//! [`InputEncryptor`] is the client side: it turns plaintext inputs into
//! handles plus a proof bound to (contract, caller).
//!
//! [`DecryptionOracle`] is the relay side and is never handed to the ledger.

use serde::{Deserialize, Serialize};

use crate::types::{Address, FheType, Handle};
use crate::Result;

/// right-hand operand of a binary operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Cipher(Handle),
    /// plaintext scalar, must fit the left-hand type
    Plain(u64),
}

impl From<Handle> for Operand {
    fn from(handle: Handle) -> Self {
        Operand::Cipher(handle)
    }
}

impl From<u64> for Operand {
    fn from(value: u64) -> Self {
        Operand::Plain(value)
    }
}

/// operations the ledger may perform over ciphertexts
pub trait FheRuntime: Send + Sync {
    /// trivially encrypt a public value
    fn encrypt(&self, value: u64, ty: FheType) -> Result<Handle>;

    /// check that `input` was honestly encrypted for this contract and caller
    fn verify_input(
        &self,
        input: Handle,
        proof: &InputProof,
        contract: Address,
        caller: Address,
    ) -> Result<bool>;

    /// wrapping addition within the left-hand type width
    fn add(&self, lhs: Handle, rhs: Operand) -> Result<Handle>;

    fn eq(&self, lhs: Handle, rhs: Operand) -> Result<Handle>;

    fn ge(&self, lhs: Handle, rhs: Operand) -> Result<Handle>;

    fn le(&self, lhs: Handle, rhs: Operand) -> Result<Handle>;

    fn and(&self, lhs: Handle, rhs: Handle) -> Result<Handle>;

    fn or(&self, lhs: Handle, rhs: Handle) -> Result<Handle>;

    /// data-dependent select, `cond ? if_true : if_false`
    fn select(&self, cond: Handle, if_true: Handle, if_false: Handle) -> Result<Handle>;

    /// fresh uniform value in `[0, bound)`
    fn random(&self, ty: FheType, bound: u64) -> Result<Handle>;

    /// grant `account` use of `handle`
    fn allow(&self, handle: Handle, account: Address) -> Result<()>;

    fn is_allowed(&self, handle: Handle, account: Address) -> bool;

    fn type_of(&self, handle: Handle) -> Result<FheType>;
}

/// relay-side access to plaintexts
pub trait DecryptionOracle: Send + Sync {
    /// plaintext behind `handle`, `None` if the runtime does not know it
    fn reveal(&self, handle: Handle) -> Result<Option<u64>>;

    /// whether `account` is on the handle's access list
    fn may_decrypt(&self, handle: Handle, account: Address) -> bool;
}

/// client-side encryption of call inputs
pub trait InputEncryptor {
    fn encrypt_input(
        &self,
        contract: Address,
        caller: Address,
        values: &[(u64, FheType)],
    ) -> Result<EncryptedInput>;
}

/// opaque proof accompanying encrypted inputs
///
/// layout: `count:u8 || handles (32 * count) || tag (32)`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProof(Vec<u8>);

impl InputProof {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn encode(handles: &[Handle], tag: &[u8; 32]) -> Self {
        let mut bytes = Vec::with_capacity(1 + handles.len() * 32 + 32);
        bytes.push(handles.len() as u8);
        for handle in handles {
            bytes.extend_from_slice(handle.as_bytes());
        }
        bytes.extend_from_slice(tag);
        Self(bytes)
    }

    /// split into covered handles and tag, `None` if malformed
    pub(crate) fn decode(&self) -> Option<(Vec<Handle>, &[u8])> {
        let (&count, rest) = self.0.split_first()?;
        let count = count as usize;
        if rest.len() != count * 32 + 32 {
            return None;
        }
        let handles = rest[..count * 32]
            .chunks_exact(32)
            .map(|chunk| {
                let mut raw = [0u8; 32];
                raw.copy_from_slice(chunk);
                Handle::from_raw(raw)
            })
            .collect();
        Some((handles, &rest[count * 32..]))
    }
}

/// handles plus the proof binding them to (contract, caller)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub handles: Vec<Handle>,
    pub proof: InputProof,
}

/// accumulates plaintext inputs before encryption
///
/// ```rust,ignore
/// let input = InputBuilder::new(&runtime, contract, player).add8(1).encrypt()?;
/// engine.play_round(player, input.handles[0], &input.proof)?;
/// ```
pub struct InputBuilder<'a, E: InputEncryptor + ?Sized> {
    encryptor: &'a E,
    contract: Address,
    caller: Address,
    values: Vec<(u64, FheType)>,
}

impl<'a, E: InputEncryptor + ?Sized> InputBuilder<'a, E> {
    pub fn new(encryptor: &'a E, contract: Address, caller: Address) -> Self {
        Self {
            encryptor,
            contract,
            caller,
            values: Vec::new(),
        }
    }

    pub fn add_bool(mut self, value: bool) -> Self {
        self.values.push((value as u64, FheType::Bool));
        self
    }

    pub fn add8(mut self, value: u8) -> Self {
        self.values.push((value as u64, FheType::Uint8));
        self
    }

    pub fn add64(mut self, value: u64) -> Self {
        self.values.push((value, FheType::Uint64));
        self
    }

    pub fn encrypt(self) -> Result<EncryptedInput> {
        self.encryptor
            .encrypt_input(self.contract, self.caller, &self.values)
    }
}
