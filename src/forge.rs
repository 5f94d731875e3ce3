//! Forgery engine: finds a new message that can be signed using only the preimages leaked
//! by a reused key, and assembles its signature.
//!
//! Hashing is one-way, so a message cannot be steered onto a chosen digest. Workers instead
//! sample plaintexts (a fixed prefix followed by a random alphanumeric suffix), hash them and
//! keep the first digest that carries the forced bit at every forced position. With `f`
//! forced positions the search needs about `2^f` hashes, which is why it is spread over a
//! pool of threads, one independently seeded ChaCha20 stream per worker.
//!
//! The first compatible candidate goes through a single-slot channel. Its arrival raises
//! the stop flag, every worker polls that flag (and the caller's [`CancelToken`]) between
//! candidates, and the pool is joined before returning.
use crate::common::{hash_message, HashBlock, Message, Seed, MESSAGE_BITS};
use crate::errors::Error;
use crate::knowledge::{BitConstraint, KnowledgeState};
use crate::lamport::{verify, PublicKey, Signature};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use rand_core::{OsRng, RngCore, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::thread;

/// Default plaintext prefix, carrying the identifying token of forged messages.
pub const DEFAULT_PREFIX: &str = "forge ";
/// Default length of the random suffix appended to the prefix.
pub const DEFAULT_SUFFIX_LEN: usize = 10;

/// Cancellation signal shared with a running search. Cloning yields a handle to the same
/// signal.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every worker observing this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once `cancel` was called on any handle.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Search configuration.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// Number of worker threads. Zero is treated as one.
    pub workers: usize,

    /// Prefix of every candidate plaintext.
    pub prefix: String,

    /// Length of the random alphanumeric suffix. Must be at least one.
    pub suffix_len: usize,

    /// Upper bound on candidates per worker. `None` searches until success or cancellation.
    pub max_attempts: Option<u64>,

    /// Master seed of the worker streams. `None` draws one from the operating system.
    pub seed: Option<Seed>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            prefix: DEFAULT_PREFIX.to_string(),
            suffix_len: DEFAULT_SUFFIX_LEN,
            max_attempts: None,
            seed: None,
        }
    }
}

impl ForgeConfig {
    /// Set the number of workers. Zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the plaintext prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the random suffix length. Zero is rejected by [`forge`] with
    /// `Error::EmptySuffix`.
    pub fn with_suffix_len(mut self, suffix_len: usize) -> Self {
        self.suffix_len = suffix_len;
        self
    }

    /// Bound the number of candidates each worker tries.
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Make the search reproducible for a fixed worker count.
    pub fn with_seed(mut self, seed: [u8; Seed::SIZE]) -> Self {
        self.seed = Some(Seed::from_bytes(seed));
        self
    }
}

/// A successful forgery.
#[derive(Debug, Clone)]
pub struct Forgery {
    plaintext: Vec<u8>,
    message: Message,
    signature: Signature,
    attempts: u64,
}

impl Forgery {
    /// The plaintext whose hash is the forged message.
    pub fn plaintext(&self) -> &[u8] {
        &self.plaintext
    }

    /// The forged message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The forged signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Candidates hashed by all workers together.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Splits `self` into the forged message and signature.
    pub fn into_parts(self) -> (Message, Signature) {
        (self.message, self.signature)
    }
}

struct Candidate {
    plaintext: Vec<u8>,
    message: Message,
}

/// Read-only view shared by all workers.
struct Search<'a> {
    constraint: BitConstraint,
    knowledge: &'a KnowledgeState,
    prefix: &'a [u8],
    suffix_len: usize,
    max_attempts: Option<u64>,
}

impl Search<'_> {
    fn run(
        &self,
        mut rng: ChaCha20Rng,
        stop: &AtomicBool,
        cancel: &CancelToken,
        slot: SyncSender<Candidate>,
    ) -> u64 {
        let mut attempts = 0u64;
        let mut plaintext = Vec::with_capacity(self.prefix.len() + self.suffix_len);

        while !stop.load(Ordering::Relaxed) && !cancel.is_cancelled() {
            if self.max_attempts.map_or(false, |max| attempts >= max) {
                break;
            }
            attempts += 1;

            plaintext.clear();
            plaintext.extend_from_slice(self.prefix);
            plaintext.extend((0..self.suffix_len).map(|_| rng.sample(Alphanumeric)));

            let message = hash_message(&plaintext);
            if self.constraint.admits(&message) && !self.knowledge.is_observed(&message) {
                let candidate = Candidate {
                    plaintext: plaintext.clone(),
                    message,
                };
                if slot.try_send(candidate).is_err() {
                    tracing::trace!("result slot already taken, dropping candidate");
                }
                stop.store(true, Ordering::Relaxed);
                break;
            }
        }
        attempts
    }
}

/// Assemble the signature of `message` from the preimages in `knowledge`: at each position
/// the witness of row `message.bit(i)`.
///
/// # Errors
/// Returns `Error::MissingWitness(i)` when no preimage of the needed row was observed at
/// position `i`, i.e. when `message` violates the knowledge constraint.
pub fn assemble_signature(
    knowledge: &KnowledgeState,
    message: &Message,
) -> Result<Signature, Error> {
    let mut preimages = [HashBlock::zero(); MESSAGE_BITS];
    for (i, p) in preimages.iter_mut().enumerate() {
        *p = *knowledge
            .witness(i, message.bit(i))
            .ok_or(Error::MissingWitness(i))?;
    }
    Ok(Signature::from_preimages(preimages))
}

/// Search for a new message compatible with `knowledge` and forge its signature under `pk`.
/// Equivalent to [`forge_with_cancel`] with a token nobody cancels.
pub fn forge(
    knowledge: &KnowledgeState,
    pk: &PublicKey,
    config: &ForgeConfig,
) -> Result<Forgery, Error> {
    forge_with_cancel(knowledge, pk, config, &CancelToken::new())
}

/// Search for a new message compatible with `knowledge` and forge its signature under `pk`.
/// The returned signature is checked with [`verify`] before it is handed out.
///
/// # Errors
/// * `Error::NoFreePositions` when every position is forced; only an observed message
///   could be signed.
/// * `Error::EmptySuffix` when `config.suffix_len` is zero.
/// * `Error::ForgeryNotFound` when `cancel` fired or every worker exhausted
///   `config.max_attempts`.
/// * `Error::ForgedSignatureRejected` when the assembled signature does not verify, i.e.
///   `knowledge` was not derived from signatures under `pk`.
/// * `Error::RandomSource` when no master seed was configured and the OS source failed.
/// * `Error::WorkerPanicked` when a worker thread panicked.
pub fn forge_with_cancel(
    knowledge: &KnowledgeState,
    pk: &PublicKey,
    config: &ForgeConfig,
    cancel: &CancelToken,
) -> Result<Forgery, Error> {
    if knowledge.free_positions() == 0 {
        tracing::warn!(
            observed = knowledge.observed().len(),
            "no free bit positions, only observed messages are signable"
        );
        return Err(Error::NoFreePositions);
    }

    if config.suffix_len == 0 {
        return Err(Error::EmptySuffix);
    }

    let master = match &config.seed {
        Some(seed) => seed.clone(),
        None => {
            let mut bytes = [0u8; Seed::SIZE];
            OsRng
                .try_fill_bytes(&mut bytes)
                .map_err(|e| Error::RandomSource(e.to_string()))?;
            Seed::from_bytes(bytes)
        }
    };

    let search = Search {
        constraint: knowledge.constraint(),
        knowledge,
        prefix: config.prefix.as_bytes(),
        suffix_len: config.suffix_len,
        max_attempts: config.max_attempts,
    };
    let workers = config.workers.max(1);
    let forced = search.constraint.forced_count();
    tracing::info!(
        workers,
        forced,
        expected_attempts = 2f64.powi(forced as i32),
        "starting forgery search"
    );

    let stop = AtomicBool::new(false);
    let (slot, result) = sync_channel::<Candidate>(1);

    let (winner, attempts, panicked) = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|index| {
                let rng = ChaCha20Rng::from_seed(master.derive(index as u64).to_array());
                let slot = slot.clone();
                let (search, stop) = (&search, &stop);
                scope.spawn(move || {
                    let attempts = search.run(rng, stop, cancel, slot);
                    tracing::debug!(worker = index, attempts, "search worker finished");
                    attempts
                })
            })
            .collect();
        // Workers hold the only senders now, so `recv` fails once they all gave up.
        drop(slot);

        let winner = result.recv().ok();
        stop.store(true, Ordering::Relaxed);

        let mut attempts = 0u64;
        let mut panicked = false;
        for handle in handles {
            match handle.join() {
                Ok(n) => attempts += n,
                Err(_) => panicked = true,
            }
        }
        (winner, attempts, panicked)
    });

    if panicked {
        return Err(Error::WorkerPanicked);
    }

    let candidate = match winner {
        Some(candidate) => candidate,
        None => {
            tracing::info!(
                attempts,
                cancelled = cancel.is_cancelled(),
                "forgery search ended without a compatible message"
            );
            return Err(Error::ForgeryNotFound);
        }
    };

    let signature = assemble_signature(knowledge, &candidate.message)?;
    if !verify(&candidate.message, pk, &signature) {
        return Err(Error::ForgedSignatureRejected);
    }

    tracing::info!(
        attempts,
        plaintext = %String::from_utf8_lossy(&candidate.plaintext),
        "forged signature on a new message"
    );
    Ok(Forgery {
        plaintext: candidate.plaintext,
        message: candidate.message,
        signature,
        attempts,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::knowledge::derive_knowledge;
    use crate::lamport::{keygen, sign};
    use std::time::Duration;

    fn leaked(seed: u8, count: usize) -> (KnowledgeState, PublicKey) {
        let (sk, pk) = keygen(&mut [seed; 32]).unwrap();
        let pairs: Vec<_> = (1..=count)
            .map(|n| {
                let m = hash_message(n.to_string().as_bytes());
                (m, sign(&m, &sk))
            })
            .collect();
        (derive_knowledge(&pairs).unwrap(), pk)
    }

    #[test]
    fn forges_with_many_leaks() {
        let (knowledge, pk) = leaked(0, 8);
        let config = ForgeConfig::default().with_workers(2).with_seed([1u8; 32]);
        let forgery = forge(&knowledge, &pk, &config).unwrap();

        assert!(forgery.plaintext().starts_with(b"forge "));
        assert_eq!(forgery.plaintext().len(), 6 + DEFAULT_SUFFIX_LEN);
        assert_eq!(&hash_message(forgery.plaintext()), forgery.message());
        assert!(!knowledge.is_observed(forgery.message()));
        assert!(forgery.attempts() >= 1);

        let (m, sig) = forgery.into_parts();
        assert!(verify(&m, &pk, &sig));
    }

    #[test]
    fn zero_workers_runs_a_single_worker() {
        let (knowledge, pk) = leaked(8, 8);
        let seeded = ForgeConfig::default().with_seed([3u8; 32]);

        let none = forge(&knowledge, &pk, &seeded.clone().with_workers(0)).unwrap();
        let one = forge(&knowledge, &pk, &seeded.with_workers(1)).unwrap();
        assert_eq!(none.plaintext(), one.plaintext());
        assert_eq!(none.attempts(), one.attempts());
        assert!(verify(none.message(), &pk, none.signature()));
    }

    #[test]
    fn empty_suffix_is_rejected() {
        let (knowledge, pk) = leaked(9, 8);
        let config = ForgeConfig::default()
            .with_suffix_len(0)
            .with_seed([4u8; 32]);
        assert_eq!(
            forge(&knowledge, &pk, &config).err(),
            Some(Error::EmptySuffix)
        );
    }

    #[test]
    fn seeded_single_worker_is_reproducible() {
        let (knowledge, pk) = leaked(1, 8);
        let config = ForgeConfig::default()
            .with_workers(1)
            .with_prefix("forge tester ")
            .with_seed([9u8; 32]);

        let a = forge(&knowledge, &pk, &config).unwrap();
        let b = forge(&knowledge, &pk, &config).unwrap();
        assert_eq!(a.plaintext(), b.plaintext());
        assert_eq!(a.attempts(), b.attempts());
        assert!(a.plaintext().starts_with(b"forge tester "));
    }

    #[test]
    fn single_observation_cannot_be_forged() {
        let (knowledge, pk) = leaked(2, 1);
        let config = ForgeConfig::default().with_max_attempts(10);
        assert_eq!(
            forge(&knowledge, &pk, &config).err(),
            Some(Error::NoFreePositions)
        );
    }

    #[test]
    fn bounded_search_reports_not_found() {
        // Two messages leave about 128 forced positions.
        let (knowledge, pk) = leaked(3, 2);
        let config = ForgeConfig::default()
            .with_workers(2)
            .with_max_attempts(500)
            .with_seed([0u8; 32]);
        assert_eq!(
            forge(&knowledge, &pk, &config).err(),
            Some(Error::ForgeryNotFound)
        );
    }

    #[test]
    fn cancelled_search_reports_not_found() {
        let (knowledge, pk) = leaked(4, 2);
        let config = ForgeConfig::default().with_workers(2);

        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            forge_with_cancel(&knowledge, &pk, &config, &cancel).err(),
            Some(Error::ForgeryNotFound)
        );

        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });
        let outcome = forge_with_cancel(&knowledge, &pk, &config, &cancel);
        canceller.join().unwrap();
        assert_eq!(outcome.err(), Some(Error::ForgeryNotFound));
    }

    #[test]
    fn foreign_public_key_is_rejected() {
        let (knowledge, _) = leaked(5, 8);
        let (_, other_pk) = keygen(&mut [6u8; 32]).unwrap();
        let config = ForgeConfig::default().with_workers(1).with_seed([2u8; 32]);
        assert_eq!(
            forge(&knowledge, &other_pk, &config).err(),
            Some(Error::ForgedSignatureRejected)
        );
    }

    #[test]
    fn assemble_matches_observed_signature() {
        let (sk, pk) = keygen(&mut [7u8; 32]).unwrap();
        let m1 = hash_message(b"1");
        let m2 = hash_message(b"2");
        let s1 = sign(&m1, &sk);
        let knowledge = derive_knowledge(&[(m1, s1.clone()), (m2, sign(&m2, &sk))]).unwrap();

        assert_eq!(assemble_signature(&knowledge, &m1).unwrap(), s1);

        let incompatible = (1u32..)
            .map(|n| hash_message(format!("other {}", n).as_bytes()))
            .find(|m| !knowledge.constraint().admits(m))
            .unwrap();
        assert!(matches!(
            assemble_signature(&knowledge, &incompatible),
            Err(Error::MissingWitness(_))
        ));
        assert!(verify(&m1, &pk, &s1));
    }
}
