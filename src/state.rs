//! Continuous temperature state of the body
//!
//! 16 × 4 tissue nodes plus the core-blood pool, in °C. The same shape is used
//! for the time derivative (K/s) returned by the engine.

use crate::error::ThermalError;
use crate::params::BodyParameters;
use crate::types::{
    BodySegment, BodyTemperatures, TissueLayer, KELVIN_OFFSET, LAYER_COUNT, NODE_COUNT,
    SEGMENT_COUNT,
};
use serde::{Deserialize, Serialize};

/// Node temperatures (°C), or node rates (K/s) when used as a derivative
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureState {
    pub nodes: [[f64; LAYER_COUNT]; SEGMENT_COUNT],
    pub blood: f64,
}

impl TemperatureState {
    /// Every node at its setpoint
    pub fn at_setpoints(params: &BodyParameters) -> Self {
        Self {
            nodes: params.setpoint_c,
            blood: params.blood_setpoint_c,
        }
    }

    pub fn zeros() -> Self {
        Self {
            nodes: [[0.0; LAYER_COUNT]; SEGMENT_COUNT],
            blood: 0.0,
        }
    }

    pub fn get(&self, segment: BodySegment, layer: TissueLayer) -> f64 {
        self.nodes[segment.index()][layer.index()]
    }

    pub fn set(&mut self, segment: BodySegment, layer: TissueLayer, value: f64) {
        self.nodes[segment.index()][layer.index()] = value;
    }

    pub fn skin(&self, segment: BodySegment) -> f64 {
        self.get(segment, TissueLayer::Skin)
    }

    /// Hypothalamic (head viscera) temperature
    pub fn head_core(&self) -> f64 {
        self.get(BodySegment::Head, TissueLayer::Viscera)
    }

    /// Flatten segment-major, core blood last
    pub fn to_vec(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(NODE_COUNT);
        for row in &self.nodes {
            out.extend_from_slice(row);
        }
        out.push(self.blood);
        out
    }

    pub fn from_slice(values: &[f64]) -> Result<Self, ThermalError> {
        if values.len() != NODE_COUNT {
            return Err(ThermalError::LengthMismatch {
                field: "temperature_state".to_string(),
                expected: NODE_COUNT,
                actual: values.len(),
            });
        }
        let mut nodes = [[0.0; LAYER_COUNT]; SEGMENT_COUNT];
        for (row, chunk) in nodes.iter_mut().zip(values.chunks_exact(LAYER_COUNT)) {
            row.copy_from_slice(chunk);
        }
        Ok(Self {
            nodes,
            blood: values[NODE_COUNT - 1],
        })
    }

    /// Skin and core-blood temperatures in Kelvin
    pub fn body_temperatures(&self) -> BodyTemperatures {
        let mut skin_k = [0.0; SEGMENT_COUNT];
        for (value, row) in skin_k.iter_mut().zip(self.nodes.iter()) {
            *value = row[TissueLayer::Skin.index()] + KELVIN_OFFSET;
        }
        BodyTemperatures {
            skin_k,
            core_blood_k: self.blood + KELVIN_OFFSET,
        }
    }

    /// Largest absolute value over all 65 entries
    pub fn max_abs(&self) -> f64 {
        self.nodes
            .iter()
            .flatten()
            .chain(std::iter::once(&self.blood))
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_round_trip_keeps_layout() {
        let params = BodyParameters::default();
        let state = TemperatureState::at_setpoints(&params);
        let flat = state.to_vec();

        assert_eq!(flat.len(), NODE_COUNT);
        // Segment-major: chest skin is the 8th entry
        assert_eq!(flat[7], state.skin(BodySegment::Chest));
        assert_eq!(flat[NODE_COUNT - 1], state.blood);
        assert_eq!(TemperatureState::from_slice(&flat).unwrap(), state);
    }

    #[test]
    fn test_from_slice_rejects_short_input() {
        assert!(TemperatureState::from_slice(&[36.0; 64]).is_err());
    }

    #[test]
    fn test_body_temperatures_in_kelvin() {
        let mut state = TemperatureState::zeros();
        state.set(BodySegment::LeftFoot, TissueLayer::Skin, 30.0);
        state.blood = 37.0;
        let temps = state.body_temperatures();
        assert!((temps.skin_k[BodySegment::LeftFoot.index()] - 303.15).abs() < 1e-12);
        assert!((temps.core_blood_k - 310.15).abs() < 1e-12);
    }

    #[test]
    fn test_max_abs_includes_blood() {
        let mut state = TemperatureState::zeros();
        state.blood = -0.5;
        state.set(BodySegment::Head, TissueLayer::Fat, 0.25);
        assert_eq!(state.max_abs(), 0.5);
    }
}
