//! Thermal sensation models
//!
//! Local sensation maps skin and core temperatures to a per-segment score in
//! [−4, 4]. Overall sensation combines the 16 local scores, correcting for
//! opposite sensations against the values remembered at the last load events.
//!
//! Pipeline: ThermalSample → LocalSensationModel → OverallSensationModel (+ SensationMemory)

pub mod local;
pub mod memory;
pub mod overall;

pub use local::{LocalSensationModel, SensationCoefficients};
pub use memory::SensationMemory;
pub use overall::{Dominance, OverallSensation, OverallSensationModel, SensationModel};

/// Saturation limit of every sensation and comfort score
pub const SCALE_LIMIT: f64 = 4.0;
