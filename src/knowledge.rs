//! Per-bit knowledge leaked by several signatures made with the same key.
//!
//! Each signature reveals exactly one preimage per bit position. Once two signed messages
//! disagree at a position, both of its preimages are known and the position is free: any
//! message bit can be signed there. Positions where every observed message agrees stay
//! forced to the common bit.
use crate::common::{HashBlock, Message, BLOCK_SIZE, MESSAGE_BITS};
use crate::errors::Error;
use crate::lamport::{verify, PublicKey, Signature};
use zeroize::ZeroizeOnDrop;

/// What is known about the secret key at one bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Knowledge {
    /// Only the zero-preimage was observed; the position is forced to 0.
    ZeroKnown,
    /// Only the one-preimage was observed; the position is forced to 1.
    OneKnown,
    /// Both preimages were observed; the position is free.
    BothKnown,
}

/// Bit constraint a candidate message must satisfy to be signable from the leaked
/// preimages. `mask` has a 1 at every forced position, and `value` holds the forced bit
/// there (0 elsewhere).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitConstraint {
    mask: [u8; BLOCK_SIZE],
    value: [u8; BLOCK_SIZE],
}

impl BitConstraint {
    /// Returns true when `m` carries the forced bit at every forced position.
    pub fn admits(&self, m: &Message) -> bool {
        m.as_bytes()
            .iter()
            .zip(self.mask.iter().zip(self.value.iter()))
            .all(|(b, (mask, value))| (b ^ value) & mask == 0)
    }

    /// Number of forced positions `f`. A uniformly random digest is admitted with
    /// probability `2^-f`.
    pub fn forced_count(&self) -> u32 {
        self.mask.iter().map(|b| b.count_ones()).sum()
    }

    /// Bitmask of the forced positions, in message bit order.
    pub fn mask(&self) -> &[u8; BLOCK_SIZE] {
        &self.mask
    }

    /// Forced bit values, in message bit order.
    pub fn value(&self) -> &[u8; BLOCK_SIZE] {
        &self.value
    }
}

/// Knowledge state derived from a batch of (message, signature) pairs under one key. It
/// holds one witness preimage per observed (position, bit), and the observed messages.
/// The witnesses are wiped when the state is dropped.
#[derive(ZeroizeOnDrop)]
pub struct KnowledgeState {
    zero: [Option<HashBlock>; MESSAGE_BITS],
    one: [Option<HashBlock>; MESSAGE_BITS],
    #[zeroize(skip)]
    observed: Vec<Message>,
}

impl KnowledgeState {
    /// State of bit position `i`.
    pub fn knowledge(&self, i: usize) -> Knowledge {
        match (self.zero[i].is_some(), self.one[i].is_some()) {
            (true, true) => Knowledge::BothKnown,
            (true, false) => Knowledge::ZeroKnown,
            (false, true) => Knowledge::OneKnown,
            // Every observed signature reveals one preimage per position, and a state is
            // only built from at least one signature.
            (false, false) => unreachable!("position {} has no observed preimage", i),
        }
    }

    /// Observed zero-preimage at position `i`, if any.
    pub fn zero_witness(&self, i: usize) -> Option<&HashBlock> {
        self.zero[i].as_ref()
    }

    /// Observed one-preimage at position `i`, if any.
    pub fn one_witness(&self, i: usize) -> Option<&HashBlock> {
        self.one[i].as_ref()
    }

    /// Observed preimage of row `bit` at position `i`, if any.
    pub fn witness(&self, i: usize, bit: u8) -> Option<&HashBlock> {
        if bit == 0 {
            self.zero_witness(i)
        } else {
            self.one_witness(i)
        }
    }

    /// Number of `BothKnown` positions.
    pub fn free_positions(&self) -> usize {
        (0..MESSAGE_BITS)
            .filter(|&i| self.knowledge(i) == Knowledge::BothKnown)
            .count()
    }

    /// Number of forced positions.
    pub fn forced_positions(&self) -> usize {
        MESSAGE_BITS - self.free_positions()
    }

    /// Builds the constraint a forgeable message must satisfy.
    pub fn constraint(&self) -> BitConstraint {
        let mut mask = [0u8; BLOCK_SIZE];
        let mut value = [0u8; BLOCK_SIZE];
        for i in 0..MESSAGE_BITS {
            let bit_mask = 1u8 << (7 - (i % 8));
            match self.knowledge(i) {
                Knowledge::ZeroKnown => mask[i / 8] |= bit_mask,
                Knowledge::OneKnown => {
                    mask[i / 8] |= bit_mask;
                    value[i / 8] |= bit_mask;
                }
                Knowledge::BothKnown => {}
            }
        }
        BitConstraint { mask, value }
    }

    /// The distinct messages whose signatures were observed.
    pub fn observed(&self) -> &[Message] {
        &self.observed
    }

    /// Returns true when `m` is one of the observed messages.
    pub fn is_observed(&self, m: &Message) -> bool {
        self.observed.contains(m)
    }
}

/// Derive the knowledge state from `pairs`, all of which were signed by the same key.
/// The signatures are taken as given; see [`derive_knowledge_checked`] to validate them
/// against the public key first.
///
/// # Errors
/// Returns `Error::NoObservations` when `pairs` is empty.
pub fn derive_knowledge(pairs: &[(Message, Signature)]) -> Result<KnowledgeState, Error> {
    if pairs.is_empty() {
        return Err(Error::NoObservations);
    }

    let mut state = KnowledgeState {
        zero: [None; MESSAGE_BITS],
        one: [None; MESSAGE_BITS],
        observed: Vec::with_capacity(pairs.len()),
    };

    for (m, sig) in pairs.iter() {
        for i in 0..MESSAGE_BITS {
            let slot = if m.bit(i) == 0 {
                &mut state.zero[i]
            } else {
                &mut state.one[i]
            };
            if slot.is_none() {
                *slot = Some(*sig.preimage(i));
            }
        }
        if !state.observed.contains(m) {
            state.observed.push(*m);
        }
    }

    tracing::debug!(
        observations = pairs.len(),
        distinct = state.observed.len(),
        free = state.free_positions(),
        forced = state.forced_positions(),
        "derived knowledge state"
    );
    Ok(state)
}

/// Same as [`derive_knowledge`], after checking that every pair verifies under `pk`.
///
/// # Errors
/// Returns `Error::InvalidObservation(index)` for the first pair that fails verification,
/// and `Error::NoObservations` when `pairs` is empty.
pub fn derive_knowledge_checked(
    pairs: &[(Message, Signature)],
    pk: &PublicKey,
) -> Result<KnowledgeState, Error> {
    if let Some(index) = pairs.iter().position(|(m, sig)| !verify(m, pk, sig)) {
        return Err(Error::InvalidObservation(index));
    }
    derive_knowledge(pairs)
}
