//! Synheart Thermal - Human thermoregulation and thermal comfort engine
//!
//! Thermal simulates a 16-segment, 65-node human body (four tissue layers per
//! segment plus a central blood pool) under a piecewise-constant environment,
//! and turns the resulting temperatures into perception through a deterministic
//! pipeline: body temperatures → local sensation → overall sensation → local
//! comfort → overall comfort.
//!
//! ## Modules
//!
//! - **Physiology**: Passive heat exchange and active thermoregulation (sweat, shiver, vasomotion)
//! - **Simulation**: Fixed-step integration with load events and recorded time series
//! - **Perception**: Sensation and comfort models, with sensation memory across load events

pub mod comfort;
pub mod config;
pub mod encoder;
pub mod error;
pub mod event;
pub mod integrator;
pub mod params;
pub mod physiology;
pub mod pipeline;
pub mod ranking;
pub mod scenario;
pub mod sensation;
pub mod state;
pub mod thermoregulation;
pub mod types;

pub use config::{IntegratorKind, PhysiologyConfig, RadiationMode, SimulationOptions};
pub use encoder::{ReportEncoder, SimulationReport, StepRecord};
pub use error::ThermalError;
pub use event::{EventDetector, EventFlags, LoadTransition};
pub use params::BodyParameters;
pub use physiology::PhysiologicalEngine;
pub use pipeline::{simulate_to_json, ComfortProcessor, Perception, Simulation, SimulationOutcome};
pub use scenario::{Scenario, Schedule};
pub use state::TemperatureState;
pub use types::{BodySegment, BodyTemperatures, Environment, ThermalSample, TissueLayer};

/// Thermal version embedded in all reports
pub const THERMAL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "synheart-thermal";
