//! Report encoding
//!
//! This module turns simulation outcomes into JSON reports. A report carries
//! producer and provenance metadata next to the recorded time series, so a
//! stored report can be traced back to the engine build and run options that
//! produced it.

use crate::config::{IntegratorKind, RadiationMode};
use crate::error::ThermalError;
use crate::pipeline::{EventRecord, Perception, SimulationOutcome};
use crate::scenario::Scenario;
use crate::sensation::SensationMemory;
use crate::thermoregulation::ControlSignals;
use crate::types::{SegmentValues, ThermalSample};
use crate::{PRODUCER_NAME, THERMAL_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// One recorded instant of a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub time_s: f64,
    pub skin_temperature_k: SegmentValues,
    pub core_blood_temperature_k: f64,
    pub local_sensation: SegmentValues,
    pub overall_sensation: f64,
    /// Which overall-sensation model produced the value
    pub sensation_model: String,
    pub local_comfort: SegmentValues,
    pub overall_comfort: f64,
    pub load_applied: bool,
    pub load_removed: bool,
    /// Whole-body sweat command (W)
    pub sweat: f64,
    /// Whole-body shivering command (W)
    pub shiver: f64,
    pub vasodilation: f64,
    pub vasoconstriction: f64,
}

impl StepRecord {
    pub fn new(
        time_s: f64,
        sample: &ThermalSample,
        perception: &Perception,
        control: &ControlSignals,
    ) -> Self {
        Self {
            time_s,
            skin_temperature_k: sample.temperatures.skin_k,
            core_blood_temperature_k: sample.temperatures.core_blood_k,
            local_sensation: perception.local_sensation,
            overall_sensation: perception.overall_sensation.value,
            sensation_model: perception.overall_sensation.model.as_str().to_string(),
            local_comfort: perception.local_comfort,
            overall_comfort: perception.overall_comfort,
            load_applied: perception.flags.load_applied,
            load_removed: perception.flags.load_removed,
            sweat: control.sweat,
            shiver: control.shiver,
            vasodilation: control.vasodilation,
            vasoconstriction: control.vasoconstriction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Run settings a report was computed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub integrator: IntegratorKind,
    pub time_step_s: f64,
    pub duration_s: f64,
    pub record_interval_s: f64,
    pub radiation_mode: RadiationMode,
    pub metabolic_level: f64,
    pub transient: bool,
    pub control: bool,
    pub computed_at_utc: String,
}

/// Complete result of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub report_version: String,
    /// Scenario name
    pub scenario: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub records: Vec<StepRecord>,
    pub events: Vec<EventRecord>,
    /// Sensation memory at the end of the run
    pub memory: SensationMemory,
}

/// Report encoder for simulation outcomes
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(&self, scenario: &Scenario, outcome: &SimulationOutcome) -> SimulationReport {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: THERMAL_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = ReportProvenance {
            integrator: scenario.options.integrator,
            time_step_s: scenario.options.time_step_s,
            duration_s: scenario.options.duration_s,
            record_interval_s: scenario.options.record_interval_s,
            radiation_mode: scenario.physiology.radiation_mode,
            metabolic_level: scenario.physiology.metabolic_level,
            transient: scenario.transient,
            control: scenario.control,
            computed_at_utc: Utc::now().to_rfc3339(),
        };

        SimulationReport {
            report_version: REPORT_VERSION.to_string(),
            scenario: scenario.name.clone(),
            producer,
            provenance,
            records: outcome.records.clone(),
            events: outcome.events.clone(),
            memory: outcome.memory,
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        scenario: &Scenario,
        outcome: &SimulationOutcome,
    ) -> Result<String, ThermalError> {
        let report = self.encode(scenario, outcome);
        serde_json::to_string_pretty(&report).map_err(ThermalError::JsonError)
    }

    /// Encode the records only, one JSON object per line
    pub fn encode_records_ndjson(&self, outcome: &SimulationOutcome) -> Result<String, ThermalError> {
        let lines = outcome
            .records
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines.join("\n"))
    }
}
