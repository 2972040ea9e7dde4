//! Score vectors: externally supplied per-item weights, one per pool.
//!
//! A `ScoreSnapshot` is built once per sweep and passed by reference into every
//! generation unit. Nothing in the engine re-fetches or mutates it, so every
//! configuration in a sweep sees the same weights.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::pool::Pool;
use super::ticket::Ticket;
use crate::error::EngineError;

/// Non-negative weights for every id of one pool.
///
/// `weights[id - 1]` is the weight of `id`. The weight-descending order
/// (ties by ascending id) is computed once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScoreVector", into = "RawScoreVector")]
pub struct ScoreVector {
    pool: Pool,
    weights: Vec<f64>,
    ranked: Vec<u8>,
}

impl ScoreVector {
    /// Build from a dense weight list indexed by `id - 1`.
    ///
    /// Fails with `DataUnavailable` on a wrong length, a negative or
    /// non-finite weight, or an all-zero vector.
    pub fn new(pool: Pool, weights: Vec<f64>) -> Result<Self, EngineError> {
        if weights.len() != pool.size() {
            return Err(EngineError::DataUnavailable(format!(
                "{pool} scores: expected {} weights, got {}",
                pool.size(),
                weights.len()
            )));
        }
        if let Some((i, w)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(EngineError::DataUnavailable(format!(
                "{pool} scores: id {} has invalid weight {w}",
                i + 1
            )));
        }
        if weights.iter().all(|w| *w == 0.0) {
            return Err(EngineError::DataUnavailable(format!(
                "{pool} scores: all weights are zero"
            )));
        }

        let mut ranked: Vec<u8> = (1..=pool.size() as u8).collect();
        ranked.sort_by(|a, b| {
            let wa = weights[usize::from(*a) - 1];
            let wb = weights[usize::from(*b) - 1];
            wb.total_cmp(&wa).then(a.cmp(b))
        });

        Ok(Self {
            pool,
            weights,
            ranked,
        })
    }

    /// Build from a sparse id → weight map. Every id of the pool must be present.
    pub fn from_map(pool: Pool, map: &BTreeMap<u8, f64>) -> Result<Self, EngineError> {
        let mut weights = Vec::with_capacity(pool.size());
        for id in 1..=pool.size() as u8 {
            match map.get(&id) {
                Some(w) => weights.push(*w),
                None => {
                    return Err(EngineError::DataUnavailable(format!(
                        "{pool} scores: missing weight for id {id}"
                    )))
                }
            }
        }
        if let Some(extra) = map.keys().find(|id| !pool.contains(**id)) {
            return Err(EngineError::DataUnavailable(format!(
                "{pool} scores: id {extra} outside the pool"
            )));
        }
        Self::new(pool, weights)
    }

    /// Equal weight for every id.
    pub fn uniform(pool: Pool) -> Self {
        let weights = vec![1.0; pool.size()];
        let ranked = (1..=pool.size() as u8).collect();
        Self {
            pool,
            weights,
            ranked,
        }
    }

    pub fn pool(&self) -> Pool {
        self.pool
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weight of `id`; zero for ids outside the pool.
    pub fn weight(&self, id: u8) -> f64 {
        if self.pool.contains(id) {
            self.weights[usize::from(id) - 1]
        } else {
            0.0
        }
    }

    /// All ids, weight descending, ties by ascending id.
    pub fn ranked(&self) -> &[u8] {
        &self.ranked
    }

    /// The `n` highest-weighted ids (same order as `ranked`).
    pub fn top(&self, n: usize) -> &[u8] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    /// Number of ids with a strictly positive weight.
    pub fn positive_count(&self) -> usize {
        self.weights.iter().filter(|w| **w > 0.0).count()
    }

    /// Mean weight of `ids` relative to the pool's largest weight, in [0, 1].
    fn relative_mean(&self, ids: &[u8]) -> f64 {
        // Construction rejects all-zero vectors, so the maximum is positive.
        let max = self.weights.iter().copied().fold(0.0, f64::max);
        if ids.is_empty() || max <= 0.0 {
            return 0.0;
        }
        ids.iter().map(|&id| self.weight(id) / max).sum::<f64>() / ids.len() as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawScoreVector {
    pool: Pool,
    weights: Vec<f64>,
}

impl TryFrom<RawScoreVector> for ScoreVector {
    type Error = EngineError;

    fn try_from(raw: RawScoreVector) -> Result<Self, Self::Error> {
        ScoreVector::new(raw.pool, raw.weights)
    }
}

impl From<ScoreVector> for RawScoreVector {
    fn from(v: ScoreVector) -> Self {
        Self {
            pool: v.pool,
            weights: v.weights,
        }
    }
}

/// One immutable snapshot of both pools' weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    main: ScoreVector,
    stars: ScoreVector,
}

impl ScoreSnapshot {
    pub fn new(main: ScoreVector, stars: ScoreVector) -> Result<Self, EngineError> {
        if main.pool() != Pool::Main || stars.pool() != Pool::Star {
            return Err(EngineError::DataUnavailable(
                "score snapshot pools are swapped".into(),
            ));
        }
        Ok(Self { main, stars })
    }

    /// Build from two dense weight lists (50 main, 12 star).
    pub fn from_weights(main: Vec<f64>, stars: Vec<f64>) -> Result<Self, EngineError> {
        Self::new(
            ScoreVector::new(Pool::Main, main)?,
            ScoreVector::new(Pool::Star, stars)?,
        )
    }

    pub fn uniform() -> Self {
        Self {
            main: ScoreVector::uniform(Pool::Main),
            stars: ScoreVector::uniform(Pool::Star),
        }
    }

    pub fn main(&self) -> &ScoreVector {
        &self.main
    }

    pub fn stars(&self) -> &ScoreVector {
        &self.stars
    }

    pub fn pool(&self, pool: Pool) -> &ScoreVector {
        match pool {
            Pool::Main => &self.main,
            Pool::Star => &self.stars,
        }
    }

    /// Confidence of a ticket under these weights, in [0, 100].
    ///
    /// `100 * (0.7 * main + 0.3 * stars)`, where each term is the mean weight
    /// of the ticket's ids divided by the pool's largest weight. Rounded to
    /// two decimals.
    pub fn confidence(&self, ticket: &Ticket) -> f64 {
        let raw = 0.7 * self.main.relative_mean(ticket.main())
            + 0.3 * self.stars.relative_mean(ticket.stars());
        (raw * 10_000.0).round() / 100.0
    }

    /// BLAKE3 digest of the weights (bit patterns, little-endian), hex-encoded.
    ///
    /// Two snapshots with the same digest produce identical sweeps.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for vector in [&self.main, &self.stars] {
            hasher.update(vector.pool().label().as_bytes());
            for w in vector.weights() {
                hasher.update(&w.to_bits().to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn ranked_is_weight_desc_then_id_asc() {
        let mut w = vec![1.0; 12];
        w[4] = 3.0; // id 5
        w[8] = 3.0; // id 9
        w[0] = 2.0; // id 1
        let v = ScoreVector::new(Pool::Star, w).unwrap();
        assert_eq!(&v.ranked()[..4], &[5, 9, 1, 2]);
        assert_eq!(v.top(3), &[5, 9, 1]);
    }

    #[test]
    fn wrong_length_is_data_unavailable() {
        let err = ScoreVector::new(Pool::Main, ramp(49)).unwrap_err();
        assert!(matches!(err, EngineError::DataUnavailable(_)));
    }

    #[test]
    fn negative_and_nan_weights_rejected() {
        let mut w = ramp(12);
        w[3] = -0.5;
        assert!(ScoreVector::new(Pool::Star, w).is_err());
        let mut w = ramp(12);
        w[3] = f64::NAN;
        assert!(ScoreVector::new(Pool::Star, w).is_err());
    }

    #[test]
    fn all_zero_rejected() {
        assert!(ScoreVector::new(Pool::Star, vec![0.0; 12]).is_err());
    }

    #[test]
    fn from_map_requires_every_id() {
        let mut map: BTreeMap<u8, f64> = (1..=12).map(|id| (id, 1.0)).collect();
        assert!(ScoreVector::from_map(Pool::Star, &map).is_ok());
        map.remove(&7);
        assert!(ScoreVector::from_map(Pool::Star, &map).is_err());
        map.insert(7, 1.0);
        map.insert(13, 1.0);
        assert!(ScoreVector::from_map(Pool::Star, &map).is_err());
    }

    #[test]
    fn snapshot_rejects_swapped_pools() {
        let main = ScoreVector::uniform(Pool::Main);
        let stars = ScoreVector::uniform(Pool::Star);
        assert!(ScoreSnapshot::new(stars.clone(), main.clone()).is_err());
        assert!(ScoreSnapshot::new(main, stars).is_ok());
    }

    #[test]
    fn digest_tracks_weights() {
        let a = ScoreSnapshot::from_weights(ramp(50), ramp(12)).unwrap();
        let b = ScoreSnapshot::from_weights(ramp(50), ramp(12)).unwrap();
        let mut w = ramp(50);
        w[0] = 1.5;
        let c = ScoreSnapshot::from_weights(w, ramp(12)).unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn confidence_scales_by_pool_maximum() {
        let snap = ScoreSnapshot::from_weights(ramp(50), ramp(12)).unwrap();
        let best = Ticket::new(&[46, 47, 48, 49, 50], &[11, 12]).unwrap();
        // main: mean 48 / 50, stars: mean 11.5 / 12
        assert_eq!(snap.confidence(&best), 95.95);

        let uniform = ScoreSnapshot::uniform();
        let any = Ticket::new(&[1, 2, 3, 4, 5], &[1, 2]).unwrap();
        assert_eq!(uniform.confidence(&any), 100.0);
    }

    #[test]
    fn confidence_ignores_zero_weight_share() {
        let mut main = vec![0.0; 50];
        main[0] = 4.0;
        let snap = ScoreSnapshot::from_weights(main, vec![1.0; 12]).unwrap();
        let t = Ticket::new(&[1, 2, 3, 4, 5], &[1, 2]).unwrap();
        // main: (1 + 0 + 0 + 0 + 0) / 5 = 0.2, stars: 1.0
        assert_eq!(snap.confidence(&t), 44.0);
    }

    #[test]
    fn positive_count_ignores_zeros() {
        let mut w = vec![0.0; 12];
        w[0] = 1.0;
        w[11] = 0.5;
        let v = ScoreVector::new(Pool::Star, w).unwrap();
        assert_eq!(v.positive_count(), 2);
    }
}
