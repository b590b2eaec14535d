//! Model and run configuration
//!
//! Everything here has a sensible default and loads from JSON. Physical
//! plausibility is not checked; only values that would make a run meaningless
//! (wrong lengths, non-positive step sizes) are rejected.

use crate::error::ThermalError;
use crate::types::{BodySegment, SEGMENT_COUNT};
use log::warn;
use serde::{Deserialize, Serialize};

/// Default metabolic level (met)
pub const DEFAULT_METABOLIC_LEVEL: f64 = 1.0;

/// Default ambient water-vapour pressure (kPa)
pub const DEFAULT_VAPOR_PRESSURE_KPA: f64 = 1.5;

/// Convective coefficient substituted for non-positive inputs (W/m²K)
pub const FALLBACK_CONVECTIVE_COEFFICIENT: f64 = 3.0;

/// Pelvis insulation of the default (briefs only) ensemble (clo)
pub const DEFAULT_PELVIS_CLO: f64 = 0.34;

/// How the radiation channel of the environment is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RadiationMode {
    /// Absorbed radiative flux on the skin surface (W/m²)
    #[default]
    Flux,
    /// Linear radiative coefficient (W/m²K) against the mean radiant temperature
    Coefficient,
}

/// Parameters of the physiological engine that stay fixed for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysiologyConfig {
    /// Activity level (met)
    pub metabolic_level: f64,
    /// Clothing insulation per segment (clo)
    pub clothing_insulation: [f64; SEGMENT_COUNT],
    /// Ambient water-vapour pressure (kPa)
    pub vapor_pressure_kpa: f64,
    pub radiation_mode: RadiationMode,
    /// Used whenever a supplied convective coefficient is not positive (W/m²K)
    pub fallback_convective_coefficient: f64,
}

impl Default for PhysiologyConfig {
    fn default() -> Self {
        let mut clothing_insulation = [0.0; SEGMENT_COUNT];
        clothing_insulation[BodySegment::Pelvis.index()] = DEFAULT_PELVIS_CLO;
        Self {
            metabolic_level: DEFAULT_METABOLIC_LEVEL,
            clothing_insulation,
            vapor_pressure_kpa: DEFAULT_VAPOR_PRESSURE_KPA,
            radiation_mode: RadiationMode::Flux,
            fallback_convective_coefficient: FALLBACK_CONVECTIVE_COEFFICIENT,
        }
    }
}

impl PhysiologyConfig {
    pub fn from_json(json: &str) -> Result<Self, ThermalError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ThermalError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), ThermalError> {
        if self.fallback_convective_coefficient <= 0.0 {
            return Err(ThermalError::ConfigError(format!(
                "fallback_convective_coefficient must be positive, got {}",
                self.fallback_convective_coefficient
            )));
        }
        if self.metabolic_level < 0.0 {
            warn!(
                "negative metabolic level {} treated as zero work",
                self.metabolic_level
            );
        }
        Ok(())
    }

    /// Clothing area factor for a segment
    pub fn clothing_area_factor(&self, segment: BodySegment) -> f64 {
        1.0 + 0.15 * self.clothing_insulation[segment.index()]
    }
}

/// Integration and output options of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Simulated duration (s)
    pub duration_s: f64,
    /// Fixed integration step (s)
    pub time_step_s: f64,
    /// Interval between output records (s)
    pub record_interval_s: f64,
    /// Width of the bracket a state event is narrowed to (s)
    pub event_tolerance_s: f64,
    pub integrator: IntegratorKind,
}

/// Which fixed-step scheme advances the state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    ForwardEuler,
    #[default]
    RungeKutta4,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            duration_s: 3600.0,
            time_step_s: 5.0,
            record_interval_s: 60.0,
            event_tolerance_s: 1e-6,
            integrator: IntegratorKind::RungeKutta4,
        }
    }
}

impl SimulationOptions {
    pub fn validate(&self) -> Result<(), ThermalError> {
        let positive = [
            ("duration_s", self.duration_s),
            ("time_step_s", self.time_step_s),
            ("record_interval_s", self.record_interval_s),
            ("event_tolerance_s", self.event_tolerance_s),
        ];
        for (name, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(ThermalError::ConfigError(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.event_tolerance_s >= self.time_step_s {
            return Err(ThermalError::ConfigError(
                "event_tolerance_s must be smaller than time_step_s".to_string(),
            ));
        }
        Ok(())
    }
}
