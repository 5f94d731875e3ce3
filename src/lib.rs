//! Lamport one-time signatures, and what happens when a one-time key is used twice.
//!
//! "Constructing Digital Signatures from a One Way Function"
//! By Leslie Lamport, SRI International, CSL-98, 1979
//!
//! The [`lamport`] module implements the scheme over SHA-256. The [`knowledge`] module
//! collects the preimages leaked by several signatures under the same key, and the
//! [`forge`] module searches for a new message that those leaked preimages can sign.
//!
//! # Example
//! ```
//! use lamport_ots::forge::{forge, ForgeConfig};
//! use lamport_ots::knowledge::derive_knowledge;
//! use lamport_ots::lamport::{keygen, sign, verify};
//! use lamport_ots::hash_message;
//!
//! let (sk, pk) = keygen(&mut [0u8; 32]).unwrap();
//! let pairs: Vec<_> = (0..8)
//!     .map(|n| {
//!         let m = hash_message(format!("message {}", n).as_bytes());
//!         (m, sign(&m, &sk))
//!     })
//!     .collect();
//!
//! let knowledge = derive_knowledge(&pairs).unwrap();
//! let forgery = forge(&knowledge, &pk, &ForgeConfig::default().with_seed([0u8; 32])).unwrap();
//! assert!(verify(forgery.message(), &pk, forgery.signature()));
//! ```
#![warn(missing_docs, rust_2018_idioms)]

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

mod common;
mod errors;
pub mod forge;
pub mod knowledge;
pub mod lamport;
pub mod traits;

pub use common::{hash_message, HashBlock, Message, Seed, BLOCK_SIZE, MESSAGE_BITS};
pub use errors::Error;
