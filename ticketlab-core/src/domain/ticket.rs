//! Ticket: one generated selection of 5 main ids and 2 star ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::pool::{Pool, MAIN_PICKS, STAR_PICKS};

/// Structural violation of the 5 + 2 shape.
///
/// Shared by tickets and draws: both carry the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    #[error("{pool} pool: expected {expected} ids, got {got}")]
    WrongCount {
        pool: Pool,
        expected: usize,
        got: usize,
    },
    #[error("{pool} pool: id {id} out of range 1..={max}")]
    OutOfRange { pool: Pool, id: u8, max: usize },
    #[error("{pool} pool: duplicate id {id}")]
    Duplicate { pool: Pool, id: u8 },
}

/// Check that `ids` is a valid selection for `pool`: exact count, in range, distinct.
pub fn validate_selection(pool: Pool, ids: &[u8]) -> Result<(), TicketError> {
    if ids.len() != pool.picks() {
        return Err(TicketError::WrongCount {
            pool,
            expected: pool.picks(),
            got: ids.len(),
        });
    }
    // Pools are at most 50 wide: a u64 bitmask covers both.
    let mut seen: u64 = 0;
    for &id in ids {
        if !pool.contains(id) {
            return Err(TicketError::OutOfRange {
                pool,
                id,
                max: pool.size(),
            });
        }
        let bit = 1u64 << id;
        if seen & bit != 0 {
            return Err(TicketError::Duplicate { pool, id });
        }
        seen |= bit;
    }
    Ok(())
}

/// A validated ticket. Ids are stored in ascending order.
///
/// The only constructor validates both axes, so a `Ticket` value always
/// satisfies the 5-distinct-in-1..=50 / 2-distinct-in-1..=12 invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTicket", into = "RawTicket")]
pub struct Ticket {
    main: [u8; MAIN_PICKS],
    stars: [u8; STAR_PICKS],
}

impl Ticket {
    /// Build a ticket from ids in any order.
    pub fn new(main: &[u8], stars: &[u8]) -> Result<Self, TicketError> {
        validate_selection(Pool::Main, main)?;
        validate_selection(Pool::Star, stars)?;

        let mut m = [0u8; MAIN_PICKS];
        m.copy_from_slice(main);
        m.sort_unstable();
        let mut s = [0u8; STAR_PICKS];
        s.copy_from_slice(stars);
        s.sort_unstable();

        Ok(Self { main: m, stars: s })
    }

    pub fn main(&self) -> &[u8; MAIN_PICKS] {
        &self.main
    }

    pub fn stars(&self) -> &[u8; STAR_PICKS] {
        &self.stars
    }

    /// Ids for one pool, ascending.
    pub fn ids(&self, pool: Pool) -> &[u8] {
        match pool {
            Pool::Main => &self.main,
            Pool::Star => &self.stars,
        }
    }

    /// Bitmask of the ids on one axis (bit `id` set).
    pub fn mask(&self, pool: Pool) -> u64 {
        self.ids(pool).iter().fold(0u64, |acc, &id| acc | (1u64 << id))
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02} {:02} {:02} {:02} {:02} | {:02} {:02}",
            self.main[0],
            self.main[1],
            self.main[2],
            self.main[3],
            self.main[4],
            self.stars[0],
            self.stars[1]
        )
    }
}

/// Unvalidated wire form used for serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTicket {
    main: Vec<u8>,
    stars: Vec<u8>,
}

impl TryFrom<RawTicket> for Ticket {
    type Error = TicketError;

    fn try_from(raw: RawTicket) -> Result<Self, Self::Error> {
        Ticket::new(&raw.main, &raw.stars)
    }
}

impl From<Ticket> for RawTicket {
    fn from(t: Ticket) -> Self {
        Self {
            main: t.main.to_vec(),
            stars: t.stars.to_vec(),
        }
    }
}
