//! Thermoregulatory control loop
//!
//! Computed once per derivative evaluation. Whole-body skin aggregates are
//! built first from every segment, then threaded by reference into the
//! effector equations so no per-segment output reads a half-built aggregate.

use crate::params::{BodyParameters, ControlGainSet, VASOMOTION_BAND_K};
use crate::state::TemperatureState;
use crate::types::{TissueLayer, LAYER_COUNT, SEGMENT_COUNT};
use serde::{Deserialize, Serialize};

/// Node errors against setpoint, split into warm and cold magnitudes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorSignals {
    pub error: [[f64; LAYER_COUNT]; SEGMENT_COUNT],
}

impl ErrorSignals {
    pub fn compute(params: &BodyParameters, state: &TemperatureState) -> Self {
        let mut error = [[0.0; LAYER_COUNT]; SEGMENT_COUNT];
        for (i, row) in error.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = state.nodes[i][j] - params.setpoint_c[i][j];
            }
        }
        Self { error }
    }

    pub fn skin(&self, segment: usize) -> f64 {
        self.error[segment][TissueLayer::Skin.index()]
    }
}

/// Positive part of an error
pub fn warm(error: f64) -> f64 {
    error.max(0.0)
}

/// Magnitude of the negative part of an error
pub fn cold(error: f64) -> f64 {
    (-error).max(0.0)
}

/// Signals shared by every segment within one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateSignals {
    /// Head-core error (K)
    pub core_error: f64,
    pub core_warm: f64,
    pub core_cold: f64,
    /// Receptor-weighted warm skin signal (WRMS)
    pub skin_warm: f64,
    /// Receptor-weighted cold skin signal (CLDS)
    pub skin_cold: f64,
}

impl AggregateSignals {
    pub fn compute(params: &BodyParameters, errors: &ErrorSignals) -> Self {
        let core_error = errors.error[0][TissueLayer::Viscera.index()];
        let mut skin_warm = 0.0;
        let mut skin_cold = 0.0;
        for i in 0..SEGMENT_COUNT {
            let skin = errors.skin(i);
            skin_warm += params.skin_receptor[i] * warm(skin);
            skin_cold += params.skin_receptor[i] * cold(skin);
        }
        Self {
            core_error,
            core_warm: warm(core_error),
            core_cold: cold(core_error),
            skin_warm,
            skin_cold,
        }
    }

    /// WRMS − CLDS
    pub fn skin_signal(&self) -> f64 {
        self.skin_warm - self.skin_cold
    }
}

/// Effector outputs of one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlSignals {
    pub aggregate: AggregateSignals,
    /// Whole-body sweat command (W)
    pub sweat: f64,
    /// Whole-body shivering command (W)
    pub shiver: f64,
    /// Vasodilation command (L/h)
    pub vasodilation: f64,
    /// Vasoconstriction command (dimensionless)
    pub vasoconstriction: f64,
    /// Local multiplier `2^(skin error / band)` per segment
    pub vasomotion: [f64; SEGMENT_COUNT],
}

impl ControlSignals {
    /// Sweat rate actually delivered to one segment's skin (W)
    pub fn local_sweat(&self, params: &BodyParameters, segment: usize) -> f64 {
        self.sweat * params.skin_sweat[segment] * self.vasomotion[segment]
    }

    /// Shivering heat in one segment's muscle (W)
    pub fn local_shiver(&self, params: &BodyParameters, segment: usize) -> f64 {
        self.shiver * params.shiver_distribution[segment]
    }
}

/// Controller evaluating the four effectors from node errors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Thermoregulation {
    pub gains: ControlGainSet,
}

impl Thermoregulation {
    pub fn new(gains: ControlGainSet) -> Self {
        Self { gains }
    }

    pub fn evaluate(&self, params: &BodyParameters, state: &TemperatureState) -> ControlSignals {
        let errors = ErrorSignals::compute(params, state);
        let aggregate = AggregateSignals::compute(params, &errors);
        let g = &self.gains;
        let skin = aggregate.skin_signal();

        let sweat = g.core.sweat * aggregate.core_error
            + g.skin.sweat * skin
            + g.peripheral.sweat * aggregate.core_warm * aggregate.skin_warm;
        let shiver = -g.core.shiver * aggregate.core_error - g.skin.shiver * skin
            + g.peripheral.shiver * aggregate.core_cold * aggregate.skin_cold;
        let vasodilation = g.core.vasodilation * aggregate.core_error
            + g.skin.vasodilation * skin
            + g.peripheral.vasodilation * aggregate.core_warm * aggregate.skin_warm;
        let vasoconstriction = -g.core.vasoconstriction * aggregate.core_error
            - g.skin.vasoconstriction * skin
            + g.peripheral.vasoconstriction * aggregate.core_cold * aggregate.skin_cold;

        let mut vasomotion = [1.0; SEGMENT_COUNT];
        for (i, value) in vasomotion.iter_mut().enumerate() {
            *value = 2f64.powf(errors.skin(i) / VASOMOTION_BAND_K);
        }

        ControlSignals {
            aggregate,
            sweat: sweat.max(0.0),
            shiver: shiver.max(0.0),
            vasodilation: vasodilation.max(0.0),
            vasoconstriction: vasoconstriction.max(0.0),
            vasomotion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BodySegment;

    fn shifted(offset: f64) -> (BodyParameters, TemperatureState) {
        let params = BodyParameters::default();
        let mut state = TemperatureState::at_setpoints(&params);
        for row in state.nodes.iter_mut() {
            for value in row.iter_mut() {
                *value += offset;
            }
        }
        (params, state)
    }

    #[test]
    fn test_warm_cold_split() {
        assert_eq!(warm(0.4), 0.4);
        assert_eq!(cold(0.4), 0.0);
        assert_eq!(warm(-0.4), 0.0);
        assert_eq!(cold(-0.4), 0.4);
        assert_eq!(warm(0.0) + cold(0.0), 0.0);
    }

    #[test]
    fn test_no_action_at_setpoints() {
        let (params, state) = shifted(0.0);
        let control = Thermoregulation::default().evaluate(&params, &state);

        assert_eq!(control.sweat, 0.0);
        assert_eq!(control.shiver, 0.0);
        assert_eq!(control.vasodilation, 0.0);
        assert_eq!(control.vasoconstriction, 0.0);
        assert!(control.vasomotion.iter().all(|m| *m == 1.0));
    }

    #[test]
    fn test_warm_body_sweats_and_dilates() {
        let (params, state) = shifted(0.5);
        let control = Thermoregulation::default().evaluate(&params, &state);

        // receptor weights sum to one, so WRMS equals the uniform offset
        assert!((control.aggregate.skin_warm - 0.5).abs() < 1e-9);
        assert_eq!(control.aggregate.skin_cold, 0.0);
        let expected_sweat = 371.2 * 0.5 + 33.6 * 0.5;
        assert!((control.sweat - expected_sweat).abs() < 1e-6);
        assert!((control.vasodilation - (117.0 * 0.5 + 7.5 * 0.5)).abs() < 1e-6);
        assert_eq!(control.shiver, 0.0);
        assert_eq!(control.vasoconstriction, 0.0);
        assert!((control.vasomotion[0] - 2f64.powf(0.05)).abs() < 1e-12);
    }

    #[test]
    fn test_cold_body_shivers_and_constricts() {
        let (params, state) = shifted(-1.0);
        let control = Thermoregulation::default().evaluate(&params, &state);

        assert!((control.aggregate.skin_cold - 1.0).abs() < 1e-9);
        assert!((control.shiver - 24.4).abs() < 1e-6);
        assert!((control.vasoconstriction - 23.0).abs() < 1e-6);
        assert_eq!(control.sweat, 0.0);
        assert_eq!(control.vasodilation, 0.0);
        assert!(control.local_shiver(&params, BodySegment::Pelvis.index()) > 0.0);
        assert_eq!(control.local_shiver(&params, BodySegment::LeftHand.index()), 0.0);
    }

    #[test]
    fn test_local_sweat_scales_with_vasomotion() {
        let (params, mut state) = shifted(0.5);
        let chest = BodySegment::Chest;
        state.set(chest, TissueLayer::Skin, params.setpoint_c[1][3] + 2.0);
        let control = Thermoregulation::default().evaluate(&params, &state);
        let expected = control.sweat * params.skin_sweat[1] * 2f64.powf(0.2);
        assert!((control.local_sweat(&params, chest.index()) - expected).abs() < 1e-9);
    }
}
