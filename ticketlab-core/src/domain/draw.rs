//! Draw: one historical ground-truth selection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::pool::Pool;
use super::ticket::{validate_selection, TicketError};

/// A historical draw.
///
/// Draws are stored as loaded: the shape is not enforced at construction so
/// a bad history row surfaces as a per-unit `MalformedDraw` during evaluation
/// instead of aborting the whole load. `index` is the chronological position
/// in the history (0 = oldest) and drives windowing and sub-seeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub index: usize,
    pub date: Option<NaiveDate>,
    pub main: Vec<u8>,
    pub stars: Vec<u8>,
}

impl Draw {
    pub fn new(index: usize, date: Option<NaiveDate>, main: Vec<u8>, stars: Vec<u8>) -> Self {
        Self {
            index,
            date,
            main,
            stars,
        }
    }

    /// Check the 5 + 2 shape.
    pub fn validate(&self) -> Result<(), TicketError> {
        validate_selection(Pool::Main, &self.main)?;
        validate_selection(Pool::Star, &self.stars)
    }

    pub fn is_well_formed(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn ids(&self, pool: Pool) -> &[u8] {
        match pool {
            Pool::Main => &self.main,
            Pool::Star => &self.stars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_draw_validates() {
        let d = Draw::new(0, None, vec![5, 4, 3, 2, 1], vec![2, 1]);
        assert!(d.is_well_formed());
    }

    #[test]
    fn six_main_ids_is_malformed() {
        let d = Draw::new(3, None, vec![1, 2, 3, 4, 5, 6], vec![1, 2]);
        assert!(matches!(
            d.validate(),
            Err(TicketError::WrongCount { got: 6, .. })
        ));
    }

    #[test]
    fn star_out_of_range_is_malformed() {
        let d = Draw::new(3, None, vec![1, 2, 3, 4, 5], vec![1, 13]);
        assert!(!d.is_well_formed());
    }
}
