//! Simulation scenarios
//!
//! A scenario is the JSON input of a simulation run: engine configuration,
//! run options, a piecewise-constant environment schedule, the driving signal
//! watched by the event detector, and the comfort context flags.
//!
//! Per-segment channels accept either a single number (applied to every
//! segment) or a 16-element array.

use crate::config::{PhysiologyConfig, SimulationOptions};
use crate::error::ThermalError;
use crate::types::{segment_values, Environment, SegmentValues, SEGMENT_COUNT};
use log::warn;
use serde::{Deserialize, Serialize};

/// A per-segment channel, uniform or explicit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentInput {
    Uniform(f64),
    PerSegment(Vec<f64>),
}

impl Default for SegmentInput {
    fn default() -> Self {
        SegmentInput::Uniform(0.0)
    }
}

impl SegmentInput {
    pub fn resolve(&self, field: &str) -> Result<SegmentValues, ThermalError> {
        match self {
            SegmentInput::Uniform(value) => Ok([*value; SEGMENT_COUNT]),
            SegmentInput::PerSegment(values) => segment_values(field, values),
        }
    }
}

/// Boundary conditions holding from `start_s` until the next phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentPhase {
    #[serde(default)]
    pub start_s: f64,
    pub air_temperature_k: SegmentInput,
    pub heat_transfer_coefficient: SegmentInput,
    #[serde(default)]
    pub radiation: SegmentInput,
    /// Defaults to the area-unweighted mean air temperature
    #[serde(default)]
    pub mean_radiant_temperature_k: Option<f64>,
    /// Defaults to the mean air temperature
    #[serde(default)]
    pub ambient_temperature_k: Option<f64>,
}

impl EnvironmentPhase {
    pub fn to_environment(&self) -> Result<Environment, ThermalError> {
        let air = self.air_temperature_k.resolve("air_temperature_k")?;
        let mean_air = air.iter().sum::<f64>() / SEGMENT_COUNT as f64;
        Ok(Environment {
            air_temperature_k: air,
            heat_transfer_coefficient: self
                .heat_transfer_coefficient
                .resolve("heat_transfer_coefficient")?,
            radiation: self.radiation.resolve("radiation")?,
            mean_radiant_temperature_k: self.mean_radiant_temperature_k.unwrap_or(mean_air),
            ambient_temperature_k: self.ambient_temperature_k.unwrap_or(mean_air),
        })
    }
}

/// Driving-signal level holding from `start_s`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalStep {
    pub start_s: f64,
    pub value: f64,
}

/// JSON description of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub physiology: PhysiologyConfig,
    #[serde(default)]
    pub options: SimulationOptions,
    pub environment: Vec<EnvironmentPhase>,
    /// Empty means a signal of 0 throughout
    #[serde(default)]
    pub signal: Vec<SignalStep>,
    #[serde(default)]
    pub transient: bool,
    #[serde(default)]
    pub control: bool,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ThermalError> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn to_json(&self) -> Result<String, ThermalError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ThermalError> {
        self.physiology.validate()?;
        self.options.validate()?;
        if self.environment.is_empty() {
            return Err(ThermalError::InvalidInput(
                "scenario needs at least one environment phase".to_string(),
            ));
        }
        strictly_increasing("environment", self.environment.iter().map(|p| p.start_s))?;
        strictly_increasing("signal", self.signal.iter().map(|s| s.start_s))?;
        for phase in &self.environment {
            phase.to_environment()?;
        }
        if self.environment[0].start_s > 0.0 {
            warn!(
                "first environment phase starts at {} s; it also covers the time before",
                self.environment[0].start_s
            );
        }
        Ok(())
    }

    /// Resolve the phases into a time-indexed schedule
    pub fn schedule(&self) -> Result<Schedule, ThermalError> {
        let phases = self
            .environment
            .iter()
            .map(|p| Ok((p.start_s, p.to_environment()?)))
            .collect::<Result<Vec<_>, ThermalError>>()?;
        Ok(Schedule {
            phases,
            signal: self.signal.clone(),
        })
    }
}

fn strictly_increasing(
    field: &str,
    starts: impl Iterator<Item = f64>,
) -> Result<(), ThermalError> {
    let mut previous = f64::NEG_INFINITY;
    for start in starts {
        if start.is_nan() || start <= previous {
            return Err(ThermalError::InvalidInput(format!(
                "{field} start times must be strictly increasing, got {start} after {previous}"
            )));
        }
        previous = start;
    }
    Ok(())
}

/// Piecewise-constant environment and driving signal over time
///
/// Both are right-continuous: a phase applies from its start time onward.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    phases: Vec<(f64, Environment)>,
    signal: Vec<SignalStep>,
}

impl Schedule {
    /// A single environment forever and a zero signal
    pub fn constant(environment: Environment) -> Self {
        Self {
            phases: vec![(0.0, environment)],
            signal: Vec::new(),
        }
    }

    pub fn with_signal(mut self, signal: Vec<SignalStep>) -> Self {
        self.signal = signal;
        self
    }

    /// Add a phase, replacing one that starts at the same time
    pub fn with_phase(mut self, start_s: f64, environment: Environment) -> Self {
        self.phases.retain(|(start, _)| *start != start_s);
        self.phases.push((start_s, environment));
        self.phases.sort_by(|a, b| a.0.total_cmp(&b.0));
        self
    }

    fn phase_index(&self, t: f64) -> usize {
        self.phases
            .iter()
            .rposition(|(start, _)| *start <= t)
            .unwrap_or(0)
    }

    /// Environment in force at `t`
    pub fn environment_at(&self, t: f64) -> &Environment {
        &self.phases[self.phase_index(t)].1
    }

    /// Driving signal at `t`
    pub fn signal_at(&self, t: f64) -> f64 {
        self.signal
            .iter()
            .rev()
            .find(|step| step.start_s <= t)
            .map_or(0.0, |step| step.value)
    }

    /// Phase start times inside `(0, end)`
    pub fn breakpoints(&self, end: f64) -> Vec<f64> {
        self.phases
            .iter()
            .map(|(start, _)| *start)
            .filter(|start| *start > 0.0 && *start < end)
            .collect()
    }
}
