//! Structures common to keys, signatures and the forgery engine
use crate::errors::Error;
use blake2::digest::{Update, VariableOutput};
use blake2::VarBlake2b;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

/// Size in bytes of a hash block (the output of SHA-256).
pub const BLOCK_SIZE: usize = 32;
/// Number of bits in a message digest, and therefore the number of preimage pairs in a key.
pub const MESSAGE_BITS: usize = BLOCK_SIZE * 8;

/// Fixed 32-byte digest value. Preimages, public values and message digests are all
/// `HashBlock`s.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Zeroize)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct HashBlock(pub(crate) [u8; BLOCK_SIZE]);

impl HashBlock {
    /// The all-zero block.
    pub const fn zero() -> Self {
        HashBlock([0u8; BLOCK_SIZE])
    }

    /// Tries to convert a slice of `bytes` as `Self`.
    ///
    /// # Errors
    /// This function returns an error if the length of `bytes` is not equal to
    /// `BLOCK_SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != BLOCK_SIZE {
            return Err(Error::InvalidBlockSize(bytes.len()));
        }
        let mut out = [0u8; BLOCK_SIZE];
        out.copy_from_slice(bytes);
        Ok(HashBlock(out))
    }

    /// SHA-256 of the 32 bytes of `self`. This maps a secret preimage to its public value.
    pub fn hash(&self) -> HashBlock {
        digest(&self.0)
    }

    /// Return `Self` as its byte representation.
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    /// Returns bit `i`, where bit 0 is the most significant bit of byte 0.
    pub fn bit(&self, i: usize) -> u8 {
        (self.0[i / 8] >> (7 - (i % 8))) & 0x01
    }
}

impl AsRef<[u8]> for HashBlock {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for HashBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashBlock(")?;
        for b in self.0.iter() {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

fn digest(bytes: &[u8]) -> HashBlock {
    let mut out = [0u8; BLOCK_SIZE];
    out.copy_from_slice(&Sha256::digest(bytes));
    HashBlock(out)
}

/// A message digest, read as 256 ordered bits. Bit `i` lives in byte `i / 8`, masked by
/// `1 << (7 - i % 8)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct Message(pub(crate) HashBlock);

/// Hash arbitrary content into the `Message` that gets signed.
pub fn hash_message(bytes: &[u8]) -> Message {
    Message(digest(bytes))
}

impl Message {
    /// Wraps a digest read from trusted input. No hashing takes place, so this must only
    /// be fed values that already are message digests.
    pub const fn from_digest(digest: [u8; BLOCK_SIZE]) -> Self {
        Message(HashBlock(digest))
    }

    /// Returns bit `i` of the digest, as 0 or 1.
    pub fn bit(&self, i: usize) -> u8 {
        self.0.bit(i)
    }

    /// The digest as a `HashBlock`.
    pub fn as_block(&self) -> &HashBlock {
        &self.0
    }

    /// Return `Self` as its byte representation.
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        self.0.as_bytes()
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message(")?;
        for b in self.0.as_bytes().iter() {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

/// Seed of a random stream, used for deterministic key generation and to seed the
/// search workers.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Seed(pub(crate) [u8; Seed::SIZE]);

impl AsRef<[u8]> for Seed {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Seed {
    /// Byte representation size of a `Seed`.
    pub const SIZE: usize = 32;

    /// Creates a `Seed` from a byte array of length `Self::SIZE`.
    pub fn from_bytes(b: [u8; Self::SIZE]) -> Seed {
        Seed(b)
    }

    /// Takes a mutable slice, copies it into a `Seed` and overwrites the slice with zeroes.
    ///
    /// # Errors
    /// Fails when `bytes.len() != Self::SIZE`; the slice is left untouched in that case.
    pub fn take_slice(bytes: &mut [u8]) -> Result<Seed, Error> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidSeedSize(bytes.len()));
        }
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(bytes);
        bytes.zeroize();
        Ok(Seed(out))
    }

    /// Derives an independent child seed for stream `index`, by hashing
    /// (index || self.0) with Blake2b.
    pub fn derive(&self, index: u64) -> Seed {
        let mut h = VarBlake2b::new(Self::SIZE)
            .expect("Seed is defined with 32 bytes, so it won't fail.");
        h.update(&index.to_be_bytes());
        h.update(&self.0);

        let mut out = [0u8; Self::SIZE];
        h.finalize_variable(|res| out.copy_from_slice(res));
        Seed(out)
    }

    /// The raw seed bytes.
    pub(crate) fn to_array(&self) -> [u8; Self::SIZE] {
        self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}
