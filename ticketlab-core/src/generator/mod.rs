//! Candidate generation.
//!
//! A [`Generator`] binds one score snapshot to one strategy. Candidate sets
//! (the hybrid subset, the diversified rank bands, the positive-weight
//! filter) are resolved once at construction; each call to
//! [`Generator::generate`] then only draws from its own seeded stream. The
//! same `(snapshot, strategy, seed, draw index, ticket index)` always yields
//! the same ticket.

pub mod strategy;
pub mod weighted;

pub use strategy::{diversified_bands, HybridParams, RankBand, Strategy, StrategyKind};
pub use weighted::WeightedPool;

use crate::domain::{Pool, ScoreSnapshot, ScoreVector, Ticket, MAIN_PICKS, STAR_PICKS};
use crate::error::EngineError;
use crate::rng::SeedHierarchy;

/// Per-pool generation plan, resolved once per (snapshot, strategy).
#[derive(Debug, Clone, PartialEq)]
enum PoolPlan {
    Fixed(Vec<u8>),
    Weighted(WeightedPool),
    /// Disjoint pools sampled in order, with a pick count each.
    Banded(Vec<(WeightedPool, usize)>),
}

impl PoolPlan {
    fn resolve(scores: &ScoreVector, strategy: &Strategy) -> Result<Self, EngineError> {
        let k = scores.pool().picks();
        match strategy {
            Strategy::TopK => Ok(Self::Fixed(scores.top(k).to_vec())),
            Strategy::WeightedRandom => {
                let pool = WeightedPool::full(scores);
                pool.ensure_capacity(k)?;
                Ok(Self::Weighted(pool))
            }
            Strategy::Hybrid(params) => {
                let subset =
                    WeightedPool::from_candidates(scores, scores.top(params.top_n(scores.pool())));
                if subset.len() >= k {
                    return Ok(Self::Weighted(subset));
                }
                if !params.widen_on_shortfall {
                    return Err(EngineError::InsufficientCandidates {
                        pool: scores.pool(),
                        positive: subset.len(),
                        required: k,
                    });
                }
                let full = WeightedPool::full(scores);
                full.ensure_capacity(k)?;
                Ok(Self::Weighted(full))
            }
            Strategy::Diversified => {
                let ranked = scores.ranked();
                let mut bands = Vec::new();
                for band in diversified_bands(scores.pool()) {
                    let pool = WeightedPool::from_candidates(scores, &ranked[band.start..band.end]);
                    pool.ensure_capacity(band.picks)?;
                    bands.push((pool, band.picks));
                }
                Ok(Self::Banded(bands))
            }
        }
    }

    fn draw(&self, k: usize, rng: &mut rand_chacha::ChaCha8Rng) -> Result<Vec<u8>, EngineError> {
        match self {
            Self::Fixed(ids) => Ok(ids.clone()),
            Self::Weighted(pool) => pool.sample(k, rng),
            Self::Banded(bands) => {
                let mut ids = Vec::with_capacity(k);
                for (pool, picks) in bands {
                    ids.extend(pool.sample(*picks, rng)?);
                }
                Ok(ids)
            }
        }
    }
}

/// Ticket generator for one (snapshot, strategy) pair.
#[derive(Debug, Clone)]
pub struct Generator<'a> {
    snapshot: &'a ScoreSnapshot,
    strategy: Strategy,
    main: PoolPlan,
    stars: PoolPlan,
}

impl<'a> Generator<'a> {
    /// Validate the strategy against the snapshot and resolve candidate sets.
    ///
    /// Fails with `Configuration` for invalid hybrid sizes and with
    /// `InsufficientCandidates` when a weighted strategy cannot draw k
    /// distinct positive-weight ids.
    pub fn new(snapshot: &'a ScoreSnapshot, strategy: Strategy) -> Result<Self, EngineError> {
        strategy.validate()?;
        let main = PoolPlan::resolve(snapshot.main(), &strategy)?;
        let stars = PoolPlan::resolve(snapshot.stars(), &strategy)?;
        Ok(Self {
            snapshot,
            strategy,
            main,
            stars,
        })
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn snapshot(&self) -> &ScoreSnapshot {
        self.snapshot
    }

    /// Generate one validated ticket.
    ///
    /// Main ids are drawn before star ids from a single stream.
    pub fn generate(
        &self,
        seed: u64,
        draw_index: usize,
        ticket_index: usize,
    ) -> Result<Ticket, EngineError> {
        let mut rng = SeedHierarchy::new(seed).rng_for(
            self.strategy.tag(),
            draw_index as u64,
            ticket_index as u64,
        );
        let main = self.main.draw(MAIN_PICKS, &mut rng)?;
        let stars = self.stars.draw(STAR_PICKS, &mut rng)?;
        Ok(Ticket::new(&main, &stars)?)
    }

    /// Ids that can appear on a generated ticket for `pool`.
    pub fn eligible(&self, pool: Pool) -> Vec<u8> {
        let plan = match pool {
            Pool::Main => &self.main,
            Pool::Star => &self.stars,
        };
        match plan {
            PoolPlan::Fixed(ids) => {
                let mut ids = ids.clone();
                ids.sort_unstable();
                ids
            }
            PoolPlan::Weighted(p) => p.ids().collect(),
            PoolPlan::Banded(bands) => {
                let mut ids: Vec<u8> = bands.iter().flat_map(|(p, _)| p.ids()).collect();
                ids.sort_unstable();
                ids
            }
        }
    }
}

/// One-shot generation from the five reproducibility inputs.
pub fn generate_ticket(
    snapshot: &ScoreSnapshot,
    strategy: Strategy,
    seed: u64,
    draw_index: usize,
    ticket_index: usize,
) -> Result<Ticket, EngineError> {
    Generator::new(snapshot, strategy)?.generate(seed, draw_index, ticket_index)
}
