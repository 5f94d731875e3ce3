//! Implementation of Lamport's one-time signature over SHA-256.
//!
//! A `SecretKey` holds two rows of 256 random preimages. The `PublicKey` holds their hashes.
//! Signing message bit `i` reveals the preimage of row `bit(i)` at position `i`. Each key
//! may sign a single message: a second signature with a different digest reveals both
//! preimages at every position where the two digests differ (see
//! [`knowledge`](crate::knowledge)).
//!
//! Byte layouts, fixed for interoperability:
//!
//! * secret key: 256 zero-preimages (bit 0 first) followed by 256 one-preimages, 16384 bytes
//! * public key: 256 zero-hashes followed by 256 one-hashes, 16384 bytes
//! * signature: 256 revealed preimages in bit order, 8192 bytes
use crate::common::{HashBlock, Message, Seed, BLOCK_SIZE, MESSAGE_BITS};
use crate::errors::Error;
use crate::traits::{OtsSig, OtsSk};
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, RngCore, SeedableRng};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(feature = "serde_enabled")]
use {
    serde::{Deserialize, Deserializer, Serialize, Serializer},
    serde_with::{As, Bytes},
};

/// Size in bytes of one row of 256 blocks.
const ROW_SIZE: usize = MESSAGE_BITS * BLOCK_SIZE;

/// Lamport secret key: `zero[i]` is revealed when bit `i` of the signed message is 0,
/// `one[i]` when it is 1.
#[derive(Zeroize, ZeroizeOnDrop)]
#[cfg_attr(feature = "sk_clone_enabled", derive(Clone))]
pub struct SecretKey {
    zero: [HashBlock; MESSAGE_BITS],
    one: [HashBlock; MESSAGE_BITS],
}

/// Lamport public key: `zero[i] = hash(sk.zero[i])` and `one[i] = hash(sk.one[i])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    zero: [HashBlock; MESSAGE_BITS],
    one: [HashBlock; MESSAGE_BITS],
}

/// Lamport signature: the 256 preimages revealed for a message, in bit order. There is no
/// indication of which row each preimage comes from; the signed message tells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    preimages: [HashBlock; MESSAGE_BITS],
}

fn read_row(bytes: &[u8], row: &mut [HashBlock; MESSAGE_BITS]) {
    for (block, chunk) in row.iter_mut().zip(bytes.chunks_exact(BLOCK_SIZE)) {
        block.0.copy_from_slice(chunk);
    }
}

fn write_row(row: &[HashBlock; MESSAGE_BITS], out: &mut Vec<u8>) {
    for block in row.iter() {
        out.extend_from_slice(block.as_bytes());
    }
}

impl SecretKey {
    /// Byte size of the secret key
    pub const SIZE: usize = 2 * ROW_SIZE;

    /// Returns the preimage of row `bit` at position `i`.
    pub fn preimage(&self, i: usize, bit: u8) -> &HashBlock {
        if bit == 0 {
            &self.zero[i]
        } else {
            &self.one[i]
        }
    }

    /// Compute the public key by hashing each of the 512 preimages.
    pub fn to_public(&self) -> PublicKey {
        let mut zero = [HashBlock::zero(); MESSAGE_BITS];
        let mut one = [HashBlock::zero(); MESSAGE_BITS];
        for i in 0..MESSAGE_BITS {
            zero[i] = self.zero[i].hash();
            one[i] = self.one[i].hash();
        }
        PublicKey { zero, one }
    }

    /// Convert the slice of bytes into `Self`.
    ///
    /// # Errors
    /// The function fails if `bytes.len()` is not `Self::SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidSecretKeySize(bytes.len()));
        }

        let mut key = SecretKey {
            zero: [HashBlock::zero(); MESSAGE_BITS],
            one: [HashBlock::zero(); MESSAGE_BITS],
        };
        read_row(&bytes[..ROW_SIZE], &mut key.zero);
        read_row(&bytes[ROW_SIZE..], &mut key.one);
        Ok(key)
    }

    /// Convert `Self` into its byte representation:
    /// ( zero[0] || .. || zero[255] || one[0] || .. || one[255] )
    ///
    /// The output holds the whole secret, and must never be handed to an untrusted party.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        write_row(&self.zero, &mut out);
        write_row(&self.one, &mut out);
        out
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

impl PublicKey {
    /// Byte size of the public key
    pub const SIZE: usize = 2 * ROW_SIZE;

    /// Returns the public value of row `bit` at position `i`.
    pub fn hash_at(&self, i: usize, bit: u8) -> &HashBlock {
        if bit == 0 {
            &self.zero[i]
        } else {
            &self.one[i]
        }
    }

    /// Convert the slice of bytes into `Self`.
    ///
    /// # Errors
    /// The function fails if `bytes.len()` is not `Self::SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidPublicKeySize(bytes.len()));
        }

        let mut zero = [HashBlock::zero(); MESSAGE_BITS];
        let mut one = [HashBlock::zero(); MESSAGE_BITS];
        read_row(&bytes[..ROW_SIZE], &mut zero);
        read_row(&bytes[ROW_SIZE..], &mut one);
        Ok(PublicKey { zero, one })
    }

    /// Convert `Self` into its byte representation:
    /// ( zero[0] || .. || zero[255] || one[0] || .. || one[255] )
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        write_row(&self.zero, &mut out);
        write_row(&self.one, &mut out);
        out
    }
}

impl Signature {
    /// Byte size of the signature
    pub const SIZE: usize = ROW_SIZE;

    pub(crate) fn from_preimages(preimages: [HashBlock; MESSAGE_BITS]) -> Self {
        Signature { preimages }
    }

    /// Returns the revealed preimage at position `i`.
    pub fn preimage(&self, i: usize) -> &HashBlock {
        &self.preimages[i]
    }

    /// All revealed preimages, in bit order.
    pub fn preimages(&self) -> &[HashBlock] {
        &self.preimages
    }

    /// Convert the slice of bytes into `Self`.
    ///
    /// # Errors
    /// The function fails if `bytes.len()` is not `Self::SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidSignatureSize(bytes.len()));
        }

        let mut preimages = [HashBlock::zero(); MESSAGE_BITS];
        read_row(bytes, &mut preimages);
        Ok(Signature { preimages })
    }

    /// Convert `Self` into its byte representation:
    /// ( preimage[0] || .. || preimage[255] )
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        write_row(&self.preimages, &mut out);
        out
    }
}

/// Generate a keypair with the given random number generator. All 512 preimages are
/// drawn independently from `rng`.
///
/// # Errors
/// Returns `Error::RandomSource` when `rng` fails to produce bytes.
pub fn generate<T: RngCore + CryptoRng>(rng: &mut T) -> Result<(SecretKey, PublicKey), Error> {
    let mut sk = SecretKey {
        zero: [HashBlock::zero(); MESSAGE_BITS],
        one: [HashBlock::zero(); MESSAGE_BITS],
    };
    for block in sk.zero.iter_mut().chain(sk.one.iter_mut()) {
        rng.try_fill_bytes(&mut block.0)
            .map_err(|e| Error::RandomSource(e.to_string()))?;
    }

    let pk = sk.to_public();
    Ok((sk, pk))
}

/// Generate a keypair deterministically from a 32-byte seed, which drives a ChaCha20
/// stream. The seed is overwritten with zeroes.
///
/// # Errors
/// The function fails if `seed.len()` is not `Seed::SIZE`.
pub fn keygen(seed: &mut [u8]) -> Result<(SecretKey, PublicKey), Error> {
    let seed = Seed::take_slice(seed)?;
    let mut rng = ChaCha20Rng::from_seed(seed.to_array());
    generate(&mut rng)
}

/// Returns the Lamport signature of `msg`: for each bit position `i`, the preimage of row
/// `msg.bit(i)`.
pub fn sign(msg: &Message, sk: &SecretKey) -> Signature {
    let mut preimages = [HashBlock::zero(); MESSAGE_BITS];
    for (i, p) in preimages.iter_mut().enumerate() {
        *p = *sk.preimage(i, msg.bit(i));
    }
    Signature { preimages }
}

/// Verify the Lamport signature `sig` of `msg` under `pk`. All 256 positions are checked,
/// the result is true only if every revealed preimage hashes to the public value selected
/// by the message bit.
pub fn verify(msg: &Message, pk: &PublicKey, sig: &Signature) -> bool {
    let mut valid = true;
    for i in 0..MESSAGE_BITS {
        valid &= &sig.preimages[i].hash() == pk.hash_at(i, msg.bit(i));
    }
    valid
}

impl OtsSk for SecretKey {
    type Sig = Signature;

    fn keygen(seed: &mut [u8]) -> Result<(Self, PublicKey), Error> {
        keygen(seed)
    }

    fn sign(&self, m: &Message) -> Signature {
        sign(m, self)
    }
}

impl OtsSig for Signature {
    fn verify(&self, pk: &PublicKey, m: &Message) -> Result<(), Error> {
        match (0..MESSAGE_BITS).find(|&i| &self.preimages[i].hash() != pk.hash_at(i, m.bit(i))) {
            Some(i) => Err(Error::InvalidHashComparison(i)),
            None => Ok(()),
        }
    }
}

#[cfg(feature = "serde_enabled")]
impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        As::<Bytes>::serialize(&self.to_bytes(), serializer)
    }
}

#[cfg(feature = "serde_enabled")]
impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = As::<Bytes>::deserialize(deserializer)?;
        PublicKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "serde_enabled")]
impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        As::<Bytes>::serialize(&self.to_bytes(), serializer)
    }
}

#[cfg(feature = "serde_enabled")]
impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = As::<Bytes>::deserialize(deserializer)?;
        Signature::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}


#[cfg(feature = "serde_enabled")]
#[cfg(test)]
mod test_serde {
    use super::*;
    use crate::common::hash_message;

    #[test]
    fn test_serde_keys_and_signatures() {
        let (skey, pkey) = keygen(&mut [0u8; 32]).unwrap();

        let pkey_bytes = serde_json::to_string(&pkey).unwrap();
        let deser_pkey: PublicKey = serde_json::from_str(&pkey_bytes).unwrap();

        assert_eq!(pkey, deser_pkey);

        let dummy_message = hash_message(b"tolon");
        let sigma = sign(&dummy_message, &skey);

        let sigma_bytes = serde_json::to_string(&sigma).unwrap();
        let deser_sigma: Signature = serde_json::from_str(&sigma_bytes).unwrap();

        assert_eq!(sigma, deser_sigma);
        assert!(verify(&dummy_message, &pkey, &deser_sigma));

        let message_bytes = serde_json::to_string(&dummy_message).unwrap();
        let deser_message: Message = serde_json::from_str(&message_bytes).unwrap();
        assert_eq!(dummy_message, deser_message);
    }

    #[test]
    fn test_serde_rejects_truncated_signature() {
        let truncated = serde_json::to_string(&vec![0u8; 100]).unwrap();
        assert!(serde_json::from_str::<Signature>(&truncated).is_err());
    }
}
