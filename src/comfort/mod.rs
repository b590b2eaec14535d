//! Thermal comfort models
//!
//! Local comfort bends each segment's sensation through a curve whose peak
//! moves with the overall sensation. Overall comfort averages the least
//! comfortable votes.

pub mod local;
pub mod overall;

pub use local::{ComfortCoefficients, ComfortCurve, LocalComfortModel};
pub use overall::OverallComfortModel;
