//! Overall sensation
//!
//! The 16 local sensations are split into a warm group (> 0) and a cool group
//! (< 0); the larger one is dominant. A sub-model is selected first and then
//! evaluated:
//!
//! * `NoOpposite`: one group is empty, or the opposing votes are mild. The
//!   overall value is the dominant estimate over the reduced 14-vector.
//! * `DominantCooling`: warm dominant while the chest, back or pelvis reads
//!   −1 or colder. The overall value is the coldest of those three.
//! * `Opposite`: the dominant estimate over the dominant group only, plus the
//!   two strongest individual forces of the minority.
//!
//! The dominant estimate uses the high-sensation average when the third vote
//! is at least 2 (warm) or at most −2 (cool), otherwise the low-sensation
//! banded average.

use super::memory::SensationMemory;
use crate::event::{EventFlags, LoadTransition};
use crate::ranking::{rank_reduced, rank_segments, PairPick};
use crate::types::{BodySegment, SegmentValues, SEGMENT_COUNT};
use serde::{Deserialize, Serialize};

/// Votes always counted by the low-sensation average
const ALWAYS_COUNTED: usize = 3;

/// Third vote at or beyond this magnitude selects the high-sensation average
const HIGH_SENSATION: f64 = 2.0;

/// Opposing tail votes within this magnitude are treated as mild
const MILD_OPPOSITE: f64 = 1.0;

/// Trunk reading that triggers the dominant-cooling override
const TRUNK_COOLING: f64 = -1.0;

/// Weights of the two minority forces
const FORCE_WEIGHTS: [f64; 2] = [1.0, 0.1];

/// Which direction holds the majority of segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dominance {
    Warm,
    Cool,
}

impl Dominance {
    fn pick(self) -> PairPick {
        match self {
            Dominance::Warm => PairPick::Max,
            Dominance::Cool => PairPick::Min,
        }
    }

    fn member(self, value: f64) -> bool {
        match self {
            Dominance::Warm => value > 0.0,
            Dominance::Cool => value < 0.0,
        }
    }

    fn opposes(self, value: f64) -> bool {
        match self {
            Dominance::Warm => value < 0.0,
            Dominance::Cool => value > 0.0,
        }
    }
}

/// Sub-model selected for one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum SensationModel {
    NoOpposite { high: bool },
    Opposite { high: bool },
    DominantCooling,
}

impl SensationModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensationModel::NoOpposite { high: false } => "no_opposite_low",
            SensationModel::NoOpposite { high: true } => "no_opposite_high",
            SensationModel::Opposite { high: false } => "opposite_low",
            SensationModel::Opposite { high: true } => "opposite_high",
            SensationModel::DominantCooling => "dominant_cooling",
        }
    }
}

/// Result of one overall-sensation evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallSensation {
    /// Overall sensation, not clamped
    pub value: f64,
    pub model: SensationModel,
    pub dominant: Dominance,
    /// Dominant estimate before the opposite correction
    pub big: f64,
    /// Individual force per segment, zero outside the opposite branch
    pub forces: SegmentValues,
    /// Weighted minority forces added to `big`
    pub modifier: f64,
}

/// Force of one segment for a change `delta` from its remembered sensation
pub fn force_for_delta(delta: f64) -> f64 {
    if delta < -2.0 {
        0.6 * (delta + 2.0) - 0.5
    } else if delta > 2.0 {
        0.6 * (delta - 2.0) + 0.5
    } else {
        0.25 * delta
    }
}

/// Dominant estimate over votes ranked descending
///
/// Returns the estimate and whether the high-sensation average was used.
pub fn dominant_estimate(votes: &[f64], dominance: Dominance) -> (f64, bool) {
    let n = votes.len();
    if n >= ALWAYS_COUNTED {
        match dominance {
            Dominance::Warm if votes[2] >= HIGH_SENSATION => {
                return (0.5 * votes[0] + 0.5 * votes[2], true);
            }
            Dominance::Cool if votes[n - 3] <= -HIGH_SENSATION => {
                return (0.38 * votes[n - 1] + 0.62 * votes[n - 3], true);
            }
            _ => {}
        }
    }
    (low_sensation(votes, dominance), false)
}

/// Banded average of the extreme votes
///
/// The three most extreme votes always count. The p-th vote from the
/// dominant end (p ≥ 4) counts while its magnitude is at least
/// `2 − interval·(p − 3)` with `interval = 2/(n − 2)`. Fewer than three votes
/// are simply averaged; no votes give 0.
pub fn low_sensation(votes: &[f64], dominance: Dominance) -> f64 {
    let n = votes.len();
    if n == 0 {
        return 0.0;
    }
    if n < ALWAYS_COUNTED {
        return votes.iter().sum::<f64>() / n as f64;
    }

    let from_end: Vec<f64> = match dominance {
        Dominance::Warm => votes.to_vec(),
        Dominance::Cool => votes.iter().rev().map(|v| -v).collect(),
    };
    let interval = 2.0 / (n as f64 - 2.0);
    let mut sum = 0.0;
    let mut count = 0usize;
    for (k, value) in from_end.iter().enumerate() {
        let position = k + 1;
        let counted = position <= ALWAYS_COUNTED
            || *value >= HIGH_SENSATION - interval * (position - ALWAYS_COUNTED) as f64;
        if counted {
            sum += value;
            count += 1;
        }
    }
    let mean = sum / count as f64;
    match dominance {
        Dominance::Warm => mean,
        Dominance::Cool => -mean,
    }
}

/// Overall sensation evaluator, owning the event memory
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverallSensationModel {
    memory: SensationMemory,
}

impl OverallSensationModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory(memory: SensationMemory) -> Self {
        Self { memory }
    }

    pub fn memory(&self) -> &SensationMemory {
        &self.memory
    }

    /// Pre-event capture, called with the local sensation just before a transition
    pub fn on_transition(&mut self, transition: LoadTransition, local_sensation: &SegmentValues) {
        self.memory.snapshot(transition, local_sensation);
    }

    /// Individual forces of every segment against the active baseline
    pub fn individual_forces(
        &self,
        local_sensation: &SegmentValues,
        flags: EventFlags,
        dominance: Dominance,
    ) -> SegmentValues {
        let baseline = self.memory.baseline(flags);
        let mut forces = [0.0; SEGMENT_COUNT];
        for (i, force) in forces.iter_mut().enumerate() {
            // sign test: only segments opposing the dominant group push back
            if dominance.opposes(local_sensation[i]) {
                *force = force_for_delta(local_sensation[i] - baseline[i]);
            }
        }
        forces
    }

    /// Pick the sub-model for a local-sensation vector
    pub fn select(&self, local_sensation: &SegmentValues) -> (SensationModel, Dominance) {
        let n_plus = local_sensation.iter().filter(|v| **v > 0.0).count();
        let n_minus = local_sensation.iter().filter(|v| **v < 0.0).count();
        let dominance = if n_plus > n_minus {
            Dominance::Warm
        } else {
            Dominance::Cool
        };

        let ranked: Vec<f64> = rank_reduced(local_sensation, dominance.pick())
            .iter()
            .map(|r| r.value)
            .collect();
        let (_, high) = dominant_estimate(&ranked, dominance);
        let tail_is_mild = match dominance {
            Dominance::Warm => ranked[ranked.len() - 1] >= -MILD_OPPOSITE,
            Dominance::Cool => ranked[0] <= MILD_OPPOSITE,
        };

        if n_plus == 0 || n_minus == 0 || (!high && tail_is_mild) {
            return (SensationModel::NoOpposite { high }, dominance);
        }
        let trunk_cooling = [BodySegment::Chest, BodySegment::Back, BodySegment::Pelvis]
            .iter()
            .any(|s| local_sensation[s.index()] <= TRUNK_COOLING);
        if dominance == Dominance::Warm && trunk_cooling {
            return (SensationModel::DominantCooling, dominance);
        }

        let group: Vec<f64> = ranked
            .iter()
            .copied()
            .filter(|v| dominance.member(*v))
            .collect();
        let (_, group_high) = dominant_estimate(&group, dominance);
        (SensationModel::Opposite { high: group_high }, dominance)
    }

    pub fn evaluate(&self, local_sensation: &SegmentValues, flags: EventFlags) -> OverallSensation {
        let (model, dominant) = self.select(local_sensation);
        let ranked: Vec<f64> = rank_reduced(local_sensation, dominant.pick())
            .iter()
            .map(|r| r.value)
            .collect();

        match model {
            SensationModel::NoOpposite { .. } => {
                let (big, _) = dominant_estimate(&ranked, dominant);
                OverallSensation {
                    value: big,
                    model,
                    dominant,
                    big,
                    forces: [0.0; SEGMENT_COUNT],
                    modifier: 0.0,
                }
            }
            SensationModel::DominantCooling => {
                let value = [BodySegment::Chest, BodySegment::Back, BodySegment::Pelvis]
                    .iter()
                    .map(|s| local_sensation[s.index()])
                    .fold(f64::INFINITY, f64::min);
                OverallSensation {
                    value,
                    model,
                    dominant,
                    big: value,
                    forces: [0.0; SEGMENT_COUNT],
                    modifier: 0.0,
                }
            }
            SensationModel::Opposite { .. } => {
                let group: Vec<f64> = ranked
                    .iter()
                    .copied()
                    .filter(|v| dominant.member(*v))
                    .collect();
                let (big, _) = dominant_estimate(&group, dominant);

                let forces = self.individual_forces(local_sensation, flags, dominant);
                let sorted = rank_segments(&forces);
                // the minority is the opposite sign of the dominant group
                let strongest = match dominant {
                    Dominance::Cool => [sorted[0].value, sorted[1].value],
                    Dominance::Warm => [
                        sorted[SEGMENT_COUNT - 1].value,
                        sorted[SEGMENT_COUNT - 2].value,
                    ],
                };
                let modifier = FORCE_WEIGHTS[0] * strongest[0] + FORCE_WEIGHTS[1] * strongest[1];
                OverallSensation {
                    value: big + modifier,
                    model,
                    dominant,
                    big,
                    forces,
                    modifier,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NO_EVENT: EventFlags = EventFlags {
        load_applied: false,
        load_removed: false,
    };

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_all_ones_is_no_opposite_low() {
        let model = OverallSensationModel::new();
        let os = model.evaluate(&[1.0; SEGMENT_COUNT], NO_EVENT);
        assert_eq!(os.model, SensationModel::NoOpposite { high: false });
        assert_eq!(os.dominant, Dominance::Warm);
        assert!(close(os.value, 1.0));
        assert_eq!(os.modifier, 0.0);
        assert_eq!(os.forces, [0.0; SEGMENT_COUNT]);
    }

    #[test]
    fn test_high_sensation_override() {
        let model = OverallSensationModel::new();
        let warm = model.evaluate(&[3.0; SEGMENT_COUNT], NO_EVENT);
        assert_eq!(warm.model, SensationModel::NoOpposite { high: true });
        assert!(close(warm.value, 3.0));

        let mut values = [-1.0; SEGMENT_COUNT];
        values[BodySegment::Head.index()] = -3.0;
        values[BodySegment::Chest.index()] = -2.5;
        values[BodySegment::Back.index()] = -2.0;
        let cool = model.evaluate(&values, NO_EVENT);
        assert_eq!(cool.model, SensationModel::NoOpposite { high: true });
        assert!(close(cool.value, 0.38 * -3.0 + 0.62 * -2.0));
    }

    #[test]
    fn test_neutral_is_zero() {
        let os = OverallSensationModel::new().evaluate(&[0.0; SEGMENT_COUNT], NO_EVENT);
        assert_eq!(os.dominant, Dominance::Cool);
        assert_eq!(os.value, 0.0);
    }

    #[test]
    fn test_low_sensation_band() {
        // 14 votes, interval 1/6: rank 4 needs 1.833, rank 9 needs 1.0
        let votes = [3.0, 2.5, 2.0, 1.9, 1.5, 1.2, 1.1, 1.05, 1.01, 0.5, 0.2, 0.1, 0.0, -0.2];
        let expected = (3.0 + 2.5 + 2.0 + 1.9 + 1.01) / 5.0;
        assert!(close(low_sensation(&votes, Dominance::Warm), expected));

        // mirrored for the cool side
        let cool: Vec<f64> = votes.iter().rev().map(|v| -v).collect();
        assert!(close(low_sensation(&cool, Dominance::Cool), -expected));
    }

    #[test]
    fn test_low_sensation_few_votes() {
        assert_eq!(low_sensation(&[], Dominance::Warm), 0.0);
        assert!(close(low_sensation(&[1.0, 0.5], Dominance::Warm), 0.75));
        assert!(close(low_sensation(&[-0.5], Dominance::Cool), -0.5));
    }

    #[test]
    fn test_mild_opposite_stays_no_opposite() {
        let mut values = [1.0; SEGMENT_COUNT];
        values[BodySegment::LeftArm.index()] = -0.8;
        let os = OverallSensationModel::new().evaluate(&values, NO_EVENT);
        assert_eq!(os.model, SensationModel::NoOpposite { high: false });
    }

    #[test]
    fn test_dominant_cooling_override() {
        let mut values = [1.0; SEGMENT_COUNT];
        values[BodySegment::Chest.index()] = -1.5;
        let os = OverallSensationModel::new().evaluate(&values, NO_EVENT);
        assert_eq!(os.model, SensationModel::DominantCooling);
        assert_eq!(os.value, -1.5);
        assert_eq!(os.modifier, 0.0);
    }

    #[test]
    fn test_opposite_high_warm_dominant() {
        let mut values = [3.0; SEGMENT_COUNT];
        values[BodySegment::LeftHand.index()] = -2.0;
        values[BodySegment::RightHand.index()] = -2.0;
        let os = OverallSensationModel::new().evaluate(&values, NO_EVENT);

        assert_eq!(os.model, SensationModel::Opposite { high: true });
        assert_eq!(os.dominant, Dominance::Warm);
        assert!(close(os.big, 3.0));
        // both hands at −2 sit on the linear part of the force curve
        assert!(close(os.forces[BodySegment::LeftHand.index()], -0.5));
        assert!(close(os.forces[BodySegment::RightHand.index()], -0.5));
        assert!(close(os.modifier, -0.55));
        assert!(close(os.value, 2.45));
    }

    #[test]
    fn test_opposite_high_cool_dominant() {
        let mut values = [-3.0; SEGMENT_COUNT];
        values[BodySegment::Head.index()] = 1.0;
        let os = OverallSensationModel::new().evaluate(&values, NO_EVENT);

        assert_eq!(os.model, SensationModel::Opposite { high: true });
        assert_eq!(os.dominant, Dominance::Cool);
        assert!(close(os.big, -3.0));
        assert!(close(os.forces[BodySegment::Head.index()], 0.25));
        assert!(close(os.modifier, 0.25));
        assert!(close(os.value, -2.75));
    }

    #[test]
    fn test_cool_minority_forces() {
        let mut values = [1.0; SEGMENT_COUNT];
        values[BodySegment::LeftHand.index()] = -2.0;
        values[BodySegment::RightHand.index()] = -1.5;
        let os = OverallSensationModel::new().evaluate(&values, NO_EVENT);

        assert_eq!(os.model, SensationModel::Opposite { high: false });
        assert!(close(os.big, 1.0));
        assert!(close(os.forces[BodySegment::LeftHand.index()], -0.5));
        assert!(close(os.forces[BodySegment::RightHand.index()], -0.375));
        assert_eq!(os.forces[BodySegment::Head.index()], 0.0);
        assert!(close(os.modifier, -0.5 - 0.0375));
        assert!(close(os.value, 1.0 - 0.5375));
    }

    #[test]
    fn test_warm_minority_forces() {
        let mut values = [-1.0; SEGMENT_COUNT];
        values[BodySegment::Head.index()] = 1.5;
        values[BodySegment::Chest.index()] = 1.2;
        let os = OverallSensationModel::new().evaluate(&values, NO_EVENT);

        assert_eq!(os.dominant, Dominance::Cool);
        assert_eq!(os.model, SensationModel::Opposite { high: false });
        assert!(close(os.big, -1.0));
        assert!(close(os.modifier, 0.375 + 0.1 * 0.3));
        assert!(close(os.value, -1.0 + 0.405));
    }

    #[test]
    fn test_forces_measured_from_memory() {
        let mut model = OverallSensationModel::new();
        model.on_transition(LoadTransition::LoadApplied, &[-3.0; SEGMENT_COUNT]);

        let mut values = [1.0; SEGMENT_COUNT];
        values[BodySegment::LeftFoot.index()] = -2.0;
        let applied = EventFlags::from_signal(1.0);
        let forces = model.individual_forces(&values, applied, Dominance::Warm);
        // delta = −2 − (−3) = 1
        assert!(close(forces[BodySegment::LeftFoot.index()], 0.25));
        assert_eq!(forces[BodySegment::Head.index()], 0.0);

        // no flag set: baseline zero
        let forces = model.individual_forces(&values, NO_EVENT, Dominance::Warm);
        assert!(close(forces[BodySegment::LeftFoot.index()], -0.5));
    }

    #[test]
    fn test_force_buckets_are_continuous() {
        assert!(close(force_for_delta(-3.0), -1.1));
        assert!(close(force_for_delta(3.0), 1.1));
        assert!(close(force_for_delta(1.0), 0.25));
        assert!(close(force_for_delta(2.0 + 1e-12), 0.5));
        assert!(close(force_for_delta(-2.0 - 1e-12), -0.5));
    }

    #[test]
    fn test_model_tags() {
        assert_eq!(SensationModel::DominantCooling.as_str(), "dominant_cooling");
        assert_eq!(
            serde_json::to_string(&SensationModel::Opposite { high: true }).unwrap(),
            r#"{"model":"opposite","high":true}"#
        );
    }
}
