//! Stable Hashing
//!
//! Order-sensitive combination of hashable values into one integer key.
//! Values are fed through SHA-256 rather than `DefaultHasher` so that keys
//! do not depend on hasher seeding.

use sha2::{Digest, Sha256};
use std::hash::{Hash, Hasher};

/// Golden-ratio increment used when folding one hash into a running seed.
const GOLDEN_RATIO: u64 = 0x9e37_79b9;

/// `Hasher` that accumulates the written bytes into a SHA-256 digest.
#[derive(Clone, Default)]
pub struct DigestHasher {
    digest: Sha256,
}

impl Hasher for DigestHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    fn finish(&self) -> u64 {
        let out = self.digest.clone().finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&out[..8]);
        u64::from_le_bytes(head)
    }
}

/// Hash a single value.
pub fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DigestHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Fold `value` into `seed`. Not commutative: `combine(combine(s, a), b)`
/// differs from `combine(combine(s, b), a)` in general.
pub fn combine(seed: u64, value: u64) -> u64 {
    seed ^ value
        .wrapping_add(GOLDEN_RATIO)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

/// Combine every item of a sequence, in order, starting from `seed`.
pub fn hash_seq<I>(seed: u64, items: I) -> u64
where
    I: IntoIterator,
    I::Item: Hash,
{
    items
        .into_iter()
        .fold(seed, |acc, item| combine(acc, stable_hash(&item)))
}

/// Hash a heterogeneous argument list, e.g. `hash_args!(0, knob, "CV", true)`.
#[macro_export]
macro_rules! hash_args {
    ($seed:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut seed: u64 = $seed;
        $( seed = $crate::utils::hash::combine(seed, $crate::utils::hash::stable_hash(&$arg)); )*
        seed
    }};
}
