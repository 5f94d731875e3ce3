//! Traits that define a one-time signature instance
use crate::common::Message;
use crate::errors::Error;
use crate::lamport::PublicKey;

/// Trait that defines a one-time secret key
pub trait OtsSk: Sized {
    /// Type of the associated signature
    type Sig;
    /// Key generation. The seed is overwritten with zeroes.
    fn keygen(seed: &mut [u8]) -> Result<(Self, PublicKey), Error>;
    /// One-time signature, using `self`. A key must sign at most one message.
    fn sign(&self, m: &Message) -> Self::Sig;
}

/// Trait that defines a one-time signature
///
/// # Example
/// ```
/// use lamport_ots::hash_message;
/// use lamport_ots::lamport::SecretKey;
/// use lamport_ots::traits::{OtsSig, OtsSk};
///
/// let (skey, pkey) = SecretKey::keygen(&mut [0u8; 32]).unwrap();
/// let message = hash_message(b"tilin");
/// let sigma = skey.sign(&message);
///
/// assert!(sigma.verify(&pkey, &message).is_ok());
/// assert!(sigma.verify(&pkey, &hash_message(b"tolon")).is_err());
/// ```
pub trait OtsSig: Sized {
    /// Verify the signature
    fn verify(&self, pk: &PublicKey, m: &Message) -> Result<(), Error>;
}
