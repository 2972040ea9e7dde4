//! Deterministic RNG hierarchy.
//!
//! A configuration seed is expanded into one RNG stream per
//! `(strategy tag, draw index, ticket index)` unit. Sub-seeds are derived by
//! BLAKE3 hashing, independently of thread scheduling order, so a sweep
//! produces identical tickets regardless of thread count.
//!
//! The derivation is part of the public contract:
//!
//! ```text
//! digest = BLAKE3("ticketlab/unit/v1" || seed:u64le || tag:utf8 || 0x00
//!                 || draw_index:u64le || ticket_index:u64le)
//! rng    = ChaCha8Rng::from_seed(digest)
//! u      = (rng.next_u64() >> 11) * 2^-53
//! ```

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DOMAIN_TAG: &[u8] = b"ticketlab/unit/v1";

/// 2^-53: maps the top 53 bits of a `u64` onto [0, 1).
const F64_UNIT: f64 = 1.0 / (1u64 << 53) as f64;

/// Deterministic seed hierarchy rooted at one configuration seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedHierarchy {
    seed: u64,
}

impl SeedHierarchy {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Derive the 32-byte sub-seed for one generation unit.
    ///
    /// Independent of derivation order: each unit's seed depends only on its
    /// own coordinates.
    pub fn sub_seed(&self, tag: &str, draw_index: u64, ticket_index: u64) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DOMAIN_TAG);
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(tag.as_bytes());
        hasher.update(&[0u8]);
        hasher.update(&draw_index.to_le_bytes());
        hasher.update(&ticket_index.to_le_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Seeded stream for one generation unit.
    pub fn rng_for(&self, tag: &str, draw_index: u64, ticket_index: u64) -> ChaCha8Rng {
        ChaCha8Rng::from_seed(self.sub_seed(tag, draw_index, ticket_index))
    }
}

/// Uniform variate in [0, 1) from the top 53 bits of one `next_u64`.
///
/// Spelled out rather than delegated to `rand::Rng::gen` so the mapping is
/// fixed independently of `rand`'s distribution internals.
#[inline]
pub fn unit_f64<R: RngCore + ?Sized>(rng: &mut R) -> f64 {
    (rng.next_u64() >> 11) as f64 * F64_UNIT
}
