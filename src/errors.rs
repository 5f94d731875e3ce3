//! Errors specific to Lamport one-time signatures and the forgery engine
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Enum of errors associated with one-time signatures and their forgery
pub enum Error {
    /// The random source failed while drawing secret key material.
    #[error("random source failure: {0}")]
    RandomSource(String),
    /// Error occurs when the size of the key generation seed is not the expected.
    #[error("invalid seed size: {0}")]
    InvalidSeedSize(usize),
    /// Error occurs when the size of a hash block is not the expected.
    #[error("invalid block size: {0}")]
    InvalidBlockSize(usize),
    /// Error occurs when the size of the secret key is not the expected.
    #[error("invalid secret key size: {0}")]
    InvalidSecretKeySize(usize),
    /// Error occurs when the size of the public key is not the expected.
    #[error("invalid public key size: {0}")]
    InvalidPublicKeySize(usize),
    /// Error occurs when the size of the signature is not the expected.
    #[error("invalid signature size: {0}")]
    InvalidSignatureSize(usize),
    /// The hash of a revealed preimage does not match the public key at the given
    /// bit position.
    #[error("hash comparison failed at bit position {0}")]
    InvalidHashComparison(usize),
    /// Knowledge derivation was called without any signed message.
    #[error("no signed messages were observed")]
    NoObservations,
    /// The observed pair at the given index does not verify under the public key.
    #[error("observed pair {0} does not verify under the public key")]
    InvalidObservation(usize),
    /// Every bit position is forced, so the only compatible message is one that
    /// was already signed.
    #[error("no free bit positions, a new message cannot be forged")]
    NoFreePositions,
    /// The forge configuration asks for an empty random suffix, so every candidate would
    /// be the bare prefix.
    #[error("the random suffix of forged candidates must not be empty")]
    EmptySuffix,
    /// The search was cancelled, or every worker exhausted its attempt bound.
    #[error("no compatible message found")]
    ForgeryNotFound,
    /// A compatible message needs a preimage that was never observed.
    #[error("missing witness preimage at bit position {0}")]
    MissingWitness(usize),
    /// The assembled signature does not verify under the target public key.
    #[error("forged signature rejected by the verifier")]
    ForgedSignatureRejected,
    /// A search worker panicked before terminating.
    #[error("a search worker panicked")]
    WorkerPanicked,
}
