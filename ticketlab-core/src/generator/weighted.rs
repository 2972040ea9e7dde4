//! Weighted sampling without replacement by iterative renormalisation.
//!
//! For each pick:
//! 1. `total` = sum of the remaining weights, accumulated in ascending id order.
//! 2. `target = u * total` with `u` from [`unit_f64`].
//! 3. Scan the remaining items in ascending id order, accumulating weight;
//!    select the first item whose running sum exceeds `target`.
//!    If rounding exhausts the scan, select the last remaining item.
//! 4. Remove the selected item and repeat.
//!
//! Zero-weight items can never be selected and are dropped up front.

use rand::RngCore;

use crate::domain::{Pool, ScoreVector};
use crate::error::EngineError;
use crate::rng::unit_f64;

/// Eligible `(id, weight)` pairs for sampling, ascending by id, zero weights dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPool {
    pool: Pool,
    items: Vec<(u8, f64)>,
}

impl WeightedPool {
    /// Restrict `scores` to `candidates` (any order).
    pub fn from_candidates(scores: &ScoreVector, candidates: &[u8]) -> Self {
        let mut items: Vec<(u8, f64)> = candidates
            .iter()
            .map(|&id| (id, scores.weight(id)))
            .filter(|(_, w)| *w > 0.0)
            .collect();
        items.sort_by_key(|(id, _)| *id);
        items.dedup_by_key(|(id, _)| *id);
        Self {
            pool: scores.pool(),
            items,
        }
    }

    /// The whole pool.
    pub fn full(scores: &ScoreVector) -> Self {
        Self::from_candidates(scores, scores.ranked())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.items.iter().map(|(id, _)| *id)
    }

    /// Fail unless at least `k` ids carry positive weight.
    pub fn ensure_capacity(&self, k: usize) -> Result<(), EngineError> {
        if self.items.len() < k {
            return Err(EngineError::InsufficientCandidates {
                pool: self.pool,
                positive: self.items.len(),
                required: k,
            });
        }
        Ok(())
    }

    /// Draw `k` distinct ids. Returned in selection order.
    pub fn sample<R: RngCore + ?Sized>(
        &self,
        k: usize,
        rng: &mut R,
    ) -> Result<Vec<u8>, EngineError> {
        self.ensure_capacity(k)?;

        let mut remaining = self.items.clone();
        let mut picked = Vec::with_capacity(k);

        for _ in 0..k {
            let total: f64 = remaining.iter().map(|(_, w)| *w).sum();
            let target = unit_f64(rng) * total;

            let mut cumulative = 0.0;
            let mut chosen = remaining.len() - 1;
            for (i, (_, w)) in remaining.iter().enumerate() {
                cumulative += *w;
                if cumulative > target {
                    chosen = i;
                    break;
                }
            }

            let (id, _) = remaining.remove(chosen);
            picked.push(id);
        }

        Ok(picked)
    }
}
