//! Ranked views over per-segment scores
//!
//! Rankings are descending by value with ties resolved by ascending segment
//! index. They are rebuilt from scratch every time they are needed.

use crate::types::{BodySegment, SegmentValues};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Length of the vector with one hand and one foot dropped
pub const REDUCED_COUNT: usize = 14;

/// A score tagged with the segment it came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ranked {
    pub value: f64,
    pub segment: BodySegment,
}

/// Which member of a left/right extremity pair is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairPick {
    Max,
    Min,
}

impl PairPick {
    fn choose(self, left: Ranked, right: Ranked) -> Ranked {
        let right_wins = match self {
            PairPick::Max => right.value > left.value,
            PairPick::Min => right.value < left.value,
        };
        if right_wins {
            right
        } else {
            left
        }
    }
}

fn descending(a: &Ranked, b: &Ranked) -> Ordering {
    // NaN sorts last so the order stays total
    b.value
        .partial_cmp(&a.value)
        .unwrap_or_else(|| a.value.is_nan().cmp(&b.value.is_nan()))
}

/// Stable descending sort; input order must already be ascending by segment
pub fn rank_descending(entries: &[Ranked]) -> Vec<Ranked> {
    let mut ranked = entries.to_vec();
    ranked.sort_by(descending);
    ranked
}

/// Tag all 16 values with their segment, in segment order
pub fn tagged(values: &SegmentValues) -> Vec<Ranked> {
    BodySegment::ALL
        .iter()
        .map(|segment| Ranked {
            value: values[segment.index()],
            segment: *segment,
        })
        .collect()
}

/// Full 16-element ranking
pub fn rank_segments(values: &SegmentValues) -> Vec<Ranked> {
    rank_descending(&tagged(values))
}

/// The 14-element vector with each hand and foot pair collapsed to one entry
///
/// Order: head, chest, back, pelvis, shoulders, arms, hand pick, thighs, legs,
/// foot pick. On a tie the left member is kept.
pub fn reduce_extremities(values: &SegmentValues, pick: PairPick) -> Vec<Ranked> {
    let all = tagged(values);
    let hands = pick.choose(
        all[BodySegment::LeftHand.index()],
        all[BodySegment::RightHand.index()],
    );
    let feet = pick.choose(
        all[BodySegment::LeftFoot.index()],
        all[BodySegment::RightFoot.index()],
    );

    let mut reduced = Vec::with_capacity(REDUCED_COUNT);
    reduced.extend_from_slice(&all[..BodySegment::LeftHand.index()]);
    reduced.push(hands);
    reduced.extend_from_slice(&all[BodySegment::LeftThigh.index()..BodySegment::LeftFoot.index()]);
    reduced.push(feet);
    reduced
}

/// Reduced vector, ranked
pub fn rank_reduced(values: &SegmentValues, pick: PairPick) -> Vec<Ranked> {
    rank_descending(&reduce_extremities(values, pick))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segments(ranked: &[Ranked]) -> Vec<usize> {
        ranked.iter().map(|r| r.segment.index()).collect()
    }

    #[test]
    fn test_distinct_values_sort_descending() {
        let mut values = [0.0; 16];
        for (i, v) in values.iter_mut().enumerate() {
            *v = ((i * 7) % 16) as f64 - 8.0;
        }
        let ranked = rank_segments(&values);
        assert!(ranked.windows(2).all(|w| w[0].value > w[1].value));

        let mut seen = segments(&ranked);
        seen.sort_unstable();
        assert_eq!(seen, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_ties_resolve_by_index() {
        let mut values = [0.0; 16];
        values[5] = 1.0;
        values[2] = 1.0;
        values[11] = 1.0;
        values[0] = -1.0;

        let ranked = rank_segments(&values);
        assert_eq!(segments(&ranked[..3]), vec![2, 5, 11]);
        assert_eq!(segments(&ranked[3..6]), vec![1, 3, 4]);
        assert_eq!(ranked[15].segment, BodySegment::Head);
    }

    #[test]
    fn test_reduce_keeps_extreme_member() {
        let mut values = [0.0; 16];
        values[BodySegment::LeftHand.index()] = -1.0;
        values[BodySegment::RightHand.index()] = 2.0;
        values[BodySegment::LeftFoot.index()] = 0.5;
        values[BodySegment::RightFoot.index()] = -3.0;

        let max = reduce_extremities(&values, PairPick::Max);
        assert_eq!(max.len(), REDUCED_COUNT);
        assert_eq!(max[8].segment, BodySegment::RightHand);
        assert_eq!(max[13].segment, BodySegment::LeftFoot);
        assert_eq!(max[9].segment, BodySegment::LeftThigh);

        let min = reduce_extremities(&values, PairPick::Min);
        assert_eq!(min[8].segment, BodySegment::LeftHand);
        assert_eq!(min[13].segment, BodySegment::RightFoot);
        assert_eq!(min[13].value, -3.0);
    }

    #[test]
    fn test_reduce_tie_keeps_left() {
        let values = [1.0; 16];
        let reduced = reduce_extremities(&values, PairPick::Min);
        assert_eq!(reduced[8].segment, BodySegment::LeftHand);
        assert_eq!(reduced[13].segment, BodySegment::LeftFoot);
    }

    #[test]
    fn test_reduced_ranking_is_permutation() {
        let mut values = [0.0; 16];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i as f64 * 0.37).sin();
        }
        let ranked = rank_reduced(&values, PairPick::Max);
        assert_eq!(ranked.len(), REDUCED_COUNT);
        let mut seen = segments(&ranked);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), REDUCED_COUNT);
    }
}
