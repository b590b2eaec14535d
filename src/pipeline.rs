//! Pipeline orchestration
//!
//! Entry points for running the engine end to end. It wires the
//! physiological engine to the perception chain:
//! body temperatures → local sensation → overall sensation → local comfort →
//! overall comfort, and drives whole simulations with state events.

use crate::comfort::{LocalComfortModel, OverallComfortModel};
use crate::config::SimulationOptions;
use crate::encoder::{ReportEncoder, StepRecord};
use crate::error::ThermalError;
use crate::event::{indicator, EventDetector, EventFlags, LoadTransition};
use crate::integrator::{advance, locate_crossing, Integrator, OdeSystem};
use crate::params::BodyParameters;
use crate::physiology::PhysiologicalEngine;
use crate::scenario::{Scenario, Schedule};
use crate::sensation::{
    LocalSensationModel, OverallSensation, OverallSensationModel, SensationMemory,
};
use crate::state::TemperatureState;
use crate::thermoregulation::ControlSignals;
use crate::types::{Environment, SegmentValues, ThermalSample, NODE_COUNT};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Run a JSON scenario and return the JSON report.
///
/// # Arguments
/// * `scenario_json` - Scenario document (see `Scenario`)
///
/// # Returns
/// Pretty-printed `SimulationReport`
///
/// # Example
/// ```ignore
/// let report = simulate_to_json(&std::fs::read_to_string("cold_step.json")?)?;
/// ```
pub fn simulate_to_json(scenario_json: &str) -> Result<String, ThermalError> {
    let scenario = Scenario::from_json(scenario_json)?;
    let mut simulation = Simulation::new(&scenario)?;
    let outcome = simulation.run()?;
    ReportEncoder::new().encode_to_json(&scenario, &outcome)
}

/// Everything the perception chain produces for one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perception {
    pub local_sensation: SegmentValues,
    pub overall_sensation: OverallSensation,
    pub local_comfort: SegmentValues,
    pub overall_comfort: f64,
    pub flags: EventFlags,
}

/// Stateful perception chain with persistent sensation memory.
///
/// Owns the event detector and the memory it feeds; everything else is a
/// pure function of the thermal sample.
#[derive(Debug, Clone)]
pub struct ComfortProcessor {
    local_sensation: LocalSensationModel,
    overall_sensation: OverallSensationModel,
    local_comfort: LocalComfortModel,
    overall_comfort: OverallComfortModel,
    detector: EventDetector,
}

impl Default for ComfortProcessor {
    fn default() -> Self {
        Self::new(&BodyParameters::default(), OverallComfortModel::default(), 0.0)
    }
}

impl ComfortProcessor {
    pub fn new(
        params: &BodyParameters,
        overall_comfort: OverallComfortModel,
        initial_signal: f64,
    ) -> Self {
        Self {
            local_sensation: LocalSensationModel::new(params),
            overall_sensation: OverallSensationModel::new(),
            local_comfort: LocalComfortModel::default(),
            overall_comfort,
            detector: EventDetector::new(initial_signal),
        }
    }

    /// Load sensation memory from JSON
    pub fn load_memory(&mut self, json: &str) -> Result<(), ThermalError> {
        let memory = SensationMemory::from_json(json)?;
        self.overall_sensation = OverallSensationModel::with_memory(memory);
        Ok(())
    }

    /// Save sensation memory to JSON
    pub fn save_memory(&self) -> Result<String, ThermalError> {
        self.memory()
            .to_json()
            .map_err(|e| ThermalError::EncodingError(e.to_string()))
    }

    pub fn memory(&self) -> &SensationMemory {
        self.overall_sensation.memory()
    }

    pub fn flags(&self) -> EventFlags {
        self.detector.flags()
    }

    pub fn local_sensation(&self, sample: &ThermalSample) -> SegmentValues {
        self.local_sensation.evaluate(sample)
    }

    /// Feed a new signal value; on a rising edge, remember the sensation of
    /// `pre_event`, the sample just before the crossing
    pub fn observe_signal(
        &mut self,
        signal: f64,
        pre_event: &ThermalSample,
    ) -> Option<(LoadTransition, SegmentValues)> {
        let before = self.local_sensation.evaluate(pre_event);
        let transition = self.detector.observe(signal)?;
        self.overall_sensation.on_transition(transition, &before);
        Some((transition, before))
    }

    /// Run the chain for one instant
    pub fn evaluate(&self, sample: &ThermalSample) -> Perception {
        let flags = self.detector.flags();
        let local_sensation = self.local_sensation.evaluate(sample);
        let overall_sensation = self.overall_sensation.evaluate(&local_sensation, flags);
        let local_comfort = self
            .local_comfort
            .evaluate(&local_sensation, overall_sensation.value);
        let overall_comfort = self.overall_comfort.evaluate(&local_comfort);
        Perception {
            local_sensation,
            overall_sensation,
            local_comfort,
            overall_comfort,
            flags,
        }
    }
}

/// A discrete event located during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// First instant after the crossing (s)
    pub time_s: f64,
    pub transition: LoadTransition,
    /// Local sensation captured just before the crossing
    pub pre_event_sensation: SegmentValues,
}

/// Result of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub records: Vec<StepRecord>,
    pub events: Vec<EventRecord>,
    pub final_state: TemperatureState,
    pub memory: SensationMemory,
}

/// The body model seen by the integrator over one interval of constant environment
struct BodySystem<'a> {
    engine: &'a PhysiologicalEngine,
    environment: &'a Environment,
}

impl OdeSystem for BodySystem<'_> {
    fn dimension(&self) -> usize {
        NODE_COUNT
    }

    fn derivatives(&self, _t: f64, y: &[f64]) -> Result<Vec<f64>, ThermalError> {
        let state = TemperatureState::from_slice(y)?;
        Ok(self.engine.derivatives(&state, self.environment).to_vec())
    }
}

/// Step boundary the integrator must land on exactly
#[derive(Debug, Clone, Copy, PartialEq)]
struct Breakpoint {
    time_s: f64,
    record: bool,
}

/// Fixed-step simulation driver with state events
pub struct Simulation {
    engine: PhysiologicalEngine,
    schedule: Schedule,
    options: SimulationOptions,
    integrator: Box<dyn Integrator>,
    processor: ComfortProcessor,
    state: TemperatureState,
    time_s: f64,
}

impl Simulation {
    pub fn new(scenario: &Scenario) -> Result<Self, ThermalError> {
        scenario.validate()?;
        let engine = PhysiologicalEngine::new(scenario.physiology.clone());
        let comfort = OverallComfortModel::new(scenario.transient, scenario.control);
        Self::from_parts(engine, scenario.schedule()?, scenario.options.clone(), comfort)
    }

    pub fn from_parts(
        engine: PhysiologicalEngine,
        schedule: Schedule,
        options: SimulationOptions,
        comfort: OverallComfortModel,
    ) -> Result<Self, ThermalError> {
        options.validate()?;
        let processor = ComfortProcessor::new(engine.params(), comfort, schedule.signal_at(0.0));
        Ok(Self {
            state: engine.initial_state(),
            integrator: options.integrator.build(),
            engine,
            schedule,
            options,
            processor,
            time_s: 0.0,
        })
    }

    pub fn state(&self) -> &TemperatureState {
        &self.state
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn processor(&self) -> &ComfortProcessor {
        &self.processor
    }

    pub fn engine(&self) -> &PhysiologicalEngine {
        &self.engine
    }

    /// Start from a sensation memory saved by an earlier run
    pub fn load_memory(&mut self, json: &str) -> Result<(), ThermalError> {
        self.processor.load_memory(json)
    }

    /// Perception and control at the current instant
    pub fn observe(&self) -> (Perception, ControlSignals, ThermalSample) {
        let environment = self.schedule.environment_at(self.time_s);
        let balance = self.engine.heat_balance(&self.state, environment);
        let sample = self.engine.thermal_sample(&self.state, environment);
        (self.processor.evaluate(&sample), balance.control, sample)
    }

    fn record(&self) -> StepRecord {
        let (perception, control, sample) = self.observe();
        StepRecord::new(self.time_s, &sample, &perception, &control)
    }

    fn breakpoints(&self) -> Vec<Breakpoint> {
        let end = self.options.duration_s;
        let mut points: Vec<Breakpoint> = self
            .schedule
            .breakpoints(end)
            .into_iter()
            .map(|time_s| Breakpoint { time_s, record: false })
            .collect();
        let mut k = 1.0;
        while k * self.options.record_interval_s < end {
            points.push(Breakpoint {
                time_s: k * self.options.record_interval_s,
                record: true,
            });
            k += 1.0;
        }
        points.push(Breakpoint {
            time_s: end,
            record: true,
        });
        points.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));

        // merge coincident points, keeping the record flag
        let mut merged: Vec<Breakpoint> = Vec::with_capacity(points.len());
        for point in points {
            match merged.last_mut() {
                Some(last) if (point.time_s - last.time_s).abs() < 1e-9 => {
                    last.record |= point.record;
                }
                _ => merged.push(point),
            }
        }
        merged
    }

    /// Integrate to the configured duration, recording at every interval
    pub fn run(&mut self) -> Result<SimulationOutcome, ThermalError> {
        info!(
            "simulating {} s with {} (dt = {} s)",
            self.options.duration_s,
            self.integrator.name(),
            self.options.time_step_s
        );
        let mut records = vec![self.record()];
        let mut events = Vec::new();

        for point in self.breakpoints() {
            while self.time_s < point.time_s {
                if let Some(event) = self.step_towards(point.time_s)? {
                    events.push(event);
                }
            }
            if point.record {
                records.push(self.record());
            }
        }

        Ok(SimulationOutcome {
            records,
            events,
            final_state: self.state,
            memory: *self.processor.memory(),
        })
    }

    /// Take one step, stopping short at a signal crossing
    fn step_towards(&mut self, target_s: f64) -> Result<Option<EventRecord>, ThermalError> {
        let dt = self.options.time_step_s;
        let t = self.time_s;
        let mut t_next = t + dt;
        if t_next >= target_s - 1e-9 * dt {
            t_next = target_s;
        }

        let environment = self.schedule.environment_at(t).clone();
        let system = BodySystem {
            engine: &self.engine,
            environment: &environment,
        };
        let y = self.state.to_vec();

        let signal_next = self.schedule.signal_at(t_next);
        if EventFlags::from_signal(signal_next) == self.processor.flags() {
            let y_next = self.integrator.step(&system, t, &y, t_next - t)?;
            self.state = TemperatureState::from_slice(&y_next)?;
            self.time_s = t_next;
            return Ok(None);
        }

        let schedule = &self.schedule;
        let (t_lo, t_hi) = match locate_crossing(
            |s| Ok(indicator(schedule.signal_at(s))),
            t,
            t_next,
            self.options.event_tolerance_s,
        ) {
            Ok(bracket) => bracket,
            Err(e) => {
                debug!("signal level change without a threshold crossing: {e}");
                (t, t_next)
            }
        };

        // integrate up to the left edge and capture the pre-event sample there
        let y_lo = advance(self.integrator.as_ref(), &system, t, &y, t_lo, dt)?;
        let state_lo = TemperatureState::from_slice(&y_lo)?;
        let pre_event = self.engine.thermal_sample(&state_lo, &environment);
        self.state = state_lo;
        self.time_s = t_lo;

        let observed = self
            .processor
            .observe_signal(self.schedule.signal_at(t_hi), &pre_event);
        Ok(observed.map(|(transition, pre_event_sensation)| {
            debug!("{} at t = {:.6} s", transition.as_str(), t_hi);
            EventRecord {
                time_s: t_hi,
                transition,
                pre_event_sensation,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IntegratorKind, PhysiologyConfig};
    use crate::scenario::SignalStep;
    use crate::sensation::overall::force_for_delta;
    use crate::types::{BodySegment, KELVIN_OFFSET, SEGMENT_COUNT};
    use pretty_assertions::assert_eq;

    fn neutral_environment(engine: &PhysiologicalEngine) -> Environment {
        let htc = [4.5; SEGMENT_COUNT];
        let air = engine.neutral_air_temperatures(&htc);
        Environment {
            air_temperature_k: air,
            heat_transfer_coefficient: htc,
            radiation: [0.0; SEGMENT_COUNT],
            mean_radiant_temperature_k: air[0],
            ambient_temperature_k: air[0],
        }
    }

    fn cold_step_simulation(integrator: IntegratorKind) -> Simulation {
        let engine = PhysiologicalEngine::new(PhysiologyConfig::default());
        let neutral = neutral_environment(&engine);
        let cold = Environment::uniform(15.0 + KELVIN_OFFSET, 4.5);
        let mut schedule = Schedule::constant(neutral).with_signal(vec![
            SignalStep {
                start_s: 0.0,
                value: 0.0,
            },
            SignalStep {
                start_s: 60.0,
                value: 1.0,
            },
        ]);
        schedule = schedule.with_phase(60.0, cold);
        let options = SimulationOptions {
            duration_s: 120.0,
            time_step_s: 5.0,
            record_interval_s: 30.0,
            event_tolerance_s: 1e-6,
            integrator,
        };
        Simulation::from_parts(engine, schedule, options, OverallComfortModel::default()).unwrap()
    }

    #[test]
    fn test_steady_run_stays_neutral() {
        let engine = PhysiologicalEngine::default();
        let schedule = Schedule::constant(neutral_environment(&engine));
        let options = SimulationOptions {
            duration_s: 300.0,
            ..Default::default()
        };
        let mut simulation =
            Simulation::from_parts(engine, schedule, options, OverallComfortModel::default())
                .unwrap();
        let outcome = simulation.run().unwrap();

        assert_eq!(outcome.records.len(), 6);
        assert!(outcome.events.is_empty());
        let setpoints = simulation.engine().params().skin_setpoints_c();
        for record in &outcome.records {
            for (i, skin_k) in record.skin_temperature_k.iter().enumerate() {
                assert!((skin_k - KELVIN_OFFSET - setpoints[i]).abs() < 0.02);
            }
            assert!(record.local_sensation.iter().all(|v| v.abs() < 0.1));
        }
        assert!((simulation.time_s() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_event_snapshots_pre_event_sensation() {
        let mut simulation = cold_step_simulation(IntegratorKind::RungeKutta4);
        let outcome = simulation.run().unwrap();

        assert_eq!(outcome.events.len(), 1);
        let event = &outcome.events[0];
        assert_eq!(event.transition, LoadTransition::LoadApplied);
        assert!((event.time_s - 60.0).abs() <= 1e-6, "event at {}", event.time_s);

        // memory holds the sensation from before the cold step
        assert_eq!(outcome.memory.on(), &event.pre_event_sensation);
        assert!(event.pre_event_sensation.iter().all(|v| v.abs() < 0.1));

        // right after the step the head already reads cold
        let at_step = outcome
            .records
            .iter()
            .find(|r| (r.time_s - 60.0).abs() < 1e-9)
            .unwrap();
        let head = BodySegment::Head.index();
        assert!(at_step.local_sensation[head] < -1.0);
        assert!(at_step.load_applied);
        assert!(at_step.local_sensation[head] < event.pre_event_sensation[head]);
    }

    #[test]
    fn test_load_removed_event_uses_off_baseline() {
        let engine = PhysiologicalEngine::default();
        let neutral = neutral_environment(&engine);
        let warm = Environment::uniform(30.0 + KELVIN_OFFSET, 4.5);
        let schedule = Schedule::constant(warm)
            .with_phase(60.0, neutral)
            .with_signal(vec![
                SignalStep {
                    start_s: 0.0,
                    value: 1.0,
                },
                SignalStep {
                    start_s: 60.0,
                    value: 0.0,
                },
            ]);
        let options = SimulationOptions {
            duration_s: 120.0,
            time_step_s: 5.0,
            record_interval_s: 30.0,
            event_tolerance_s: 1e-6,
            integrator: IntegratorKind::RungeKutta4,
        };
        let mut simulation =
            Simulation::from_parts(engine, schedule, options, OverallComfortModel::default())
                .unwrap();
        let outcome = simulation.run().unwrap();

        assert_eq!(outcome.events.len(), 1);
        let event = &outcome.events[0];
        assert_eq!(event.transition, LoadTransition::LoadRemoved);
        assert!((event.time_s - 60.0).abs() <= 1e-6, "event at {}", event.time_s);

        // only the off snapshot was taken
        let memory = outcome.memory;
        assert_eq!(memory.off(), &event.pre_event_sensation);
        assert_eq!(memory.on(), &[0.0; SEGMENT_COUNT]);
        assert_eq!(memory.event_count(), 1);
        assert!(event.pre_event_sensation.iter().any(|v| *v != 0.0));

        let model = OverallSensationModel::with_memory(memory);
        for record in outcome.records.iter().filter(|r| r.time_s >= 60.0) {
            let flags = EventFlags {
                load_applied: record.load_applied,
                load_removed: record.load_removed,
            };
            assert_eq!(flags, EventFlags::from_signal(0.0));
            assert_eq!(memory.baseline(flags), *memory.off());

            let (_, dominance) = model.select(&record.local_sensation);
            let forces = model.individual_forces(&record.local_sensation, flags, dominance);
            for i in 0..SEGMENT_COUNT {
                let expected = if forces[i] == 0.0 {
                    0.0
                } else {
                    force_for_delta(record.local_sensation[i] - memory.off()[i])
                };
                assert_eq!(forces[i], expected, "segment {i} at {} s", record.time_s);
            }
            assert_eq!(
                model.evaluate(&record.local_sensation, flags).value,
                record.overall_sensation
            );
        }

        // records before the step still read the applied load
        assert!(outcome.records[0].load_applied);
        assert!(outcome.records[1].load_applied);
    }

    #[test]
    fn test_cold_exposure_cools_skin_and_triggers_response() {
        let mut simulation = cold_step_simulation(IntegratorKind::ForwardEuler);
        let outcome = simulation.run().unwrap();
        let first = &outcome.records[0];
        let last = outcome.records.last().unwrap();

        assert_eq!(last.time_s, 120.0);
        for i in 0..SEGMENT_COUNT {
            assert!(last.skin_temperature_k[i] < first.skin_temperature_k[i]);
        }
        assert!(last.vasoconstriction > 0.0);
        assert!(last.overall_sensation < 0.0);
    }

    #[test]
    fn test_processor_memory_round_trip() {
        let mut processor = ComfortProcessor::default();
        let params = BodyParameters::default();
        let state = TemperatureState::at_setpoints(&params);
        let sample = ThermalSample::steady(state.body_temperatures());

        assert!(processor.observe_signal(0.0, &sample).is_none());
        let (transition, before) = processor.observe_signal(1.0, &sample).unwrap();
        assert_eq!(transition, LoadTransition::LoadApplied);
        assert_eq!(processor.memory().on(), &before);

        let json = processor.save_memory().unwrap();
        let mut restored = ComfortProcessor::default();
        restored.load_memory(&json).unwrap();
        assert_eq!(restored.memory(), processor.memory());
    }

    #[test]
    fn test_perception_at_setpoints_is_comfortable() {
        let processor = ComfortProcessor::default();
        let state = TemperatureState::at_setpoints(&BodyParameters::default());
        let perception = processor.evaluate(&ThermalSample::steady(state.body_temperatures()));

        assert!(perception.local_sensation.iter().all(|v| v.abs() < 1e-9));
        assert!(perception.overall_sensation.value.abs() < 1e-9);
        assert!(perception.overall_comfort > 1.0);
        assert!(perception.flags.load_removed);
    }

    #[test]
    fn test_simulate_to_json() {
        let json = r#"{
            "name": "warm room",
            "options": {"duration_s": 120, "time_step_s": 10, "record_interval_s": 60},
            "environment": [{"air_temperature_k": 303.15, "heat_transfer_coefficient": 4.5}]
        }"#;
        let report = simulate_to_json(json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["scenario"], "warm room");
        assert_eq!(value["records"].as_array().unwrap().len(), 3);
        assert!(value["records"][2]["overall_sensation"].as_f64().unwrap() > 0.0);
    }
}
