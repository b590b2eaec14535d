//! Overall comfort
//!
//! Hands and feet vote once each, with their less comfortable member. The two
//! worst of those 14 votes are averaged, together with the single best of all
//! 16 when the environment is transient or the occupant has control over it.

use crate::ranking::{rank_reduced, rank_segments, PairPick, REDUCED_COUNT};
use crate::types::SegmentValues;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverallComfortModel {
    /// Conditions are changing over time
    pub transient: bool,
    /// The occupant can adjust their environment
    pub control: bool,
}

impl OverallComfortModel {
    pub fn new(transient: bool, control: bool) -> Self {
        Self { transient, control }
    }

    pub fn evaluate(&self, local_comfort: &SegmentValues) -> f64 {
        let reduced = rank_reduced(local_comfort, PairPick::Min);
        let worst = reduced[REDUCED_COUNT - 1].value;
        let second_worst = reduced[REDUCED_COUNT - 2].value;

        if self.transient || self.control {
            let best = rank_segments(local_comfort)[0].value;
            (worst + second_worst + best) / 3.0
        } else {
            (worst + second_worst) / 2.0
        }
    }
}
