//! Local comfort per segment
//!
//! ```text
//! ceiling = C6 + C71·|OS|
//! shift   = C31·|OS| + C32·OS
//! offset  = LS + shift
//! left    = (−4 − ceiling)/|−4 + shift|^n
//! right   = (−4 − ceiling)/| 4 + shift|^n
//! blend   = 1/(1 + exp(25·offset))
//! LC      = clamp((left·blend + right·(1 − blend))·|offset|^n + ceiling, −4, 4)
//! ```
//!
//! The curve runs through (−4, −4), (−shift, ceiling) and (4, −4). The
//! coefficient column is chosen by the sign of the overall sensation.
//!
//! The coefficient tables below are calibration placeholders fitted to those
//! anchor points, not published regression values.

use crate::sensation::SCALE_LIMIT;
use crate::types::{SegmentValues, SEGMENT_COUNT};
use serde::{Deserialize, Serialize};

/// Steepness of the switch between the left and right branches
const BLEND_STEEPNESS: f64 = 25.0;

/// Floor on the branch denominators
const MIN_DENOMINATOR: f64 = 1e-9;

/// One coefficient column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComfortCurve {
    /// C6
    pub ceiling: f64,
    /// C71
    pub ceiling_gain: f64,
    /// C31
    pub shift_magnitude: f64,
    /// C32
    pub shift_signed: f64,
    pub exponent: f64,
}

impl ComfortCurve {
    const fn new(ceiling: f64, ceiling_gain: f64, shift: (f64, f64), exponent: f64) -> Self {
        Self {
            ceiling,
            ceiling_gain,
            shift_magnitude: shift.0,
            shift_signed: shift.1,
            exponent,
        }
    }

    /// Comfort for one local sensation under an overall sensation
    pub fn comfort(&self, local_sensation: f64, overall_sensation: f64) -> f64 {
        let magnitude = overall_sensation.abs();
        let ceiling = self.ceiling + self.ceiling_gain * magnitude;
        let shift = self.shift_magnitude * magnitude + self.shift_signed * overall_sensation;
        let offset = local_sensation + shift;
        let n = self.exponent;

        let floor = -SCALE_LIMIT - ceiling;
        let left = floor / (-SCALE_LIMIT + shift).abs().powf(n).max(MIN_DENOMINATOR);
        let right = floor / (SCALE_LIMIT + shift).abs().powf(n).max(MIN_DENOMINATOR);
        let blend = 1.0 / (1.0 + (BLEND_STEEPNESS * offset).exp());

        let value = (left * blend + right * (1.0 - blend)) * offset.abs().powf(n) + ceiling;
        value.clamp(-SCALE_LIMIT, SCALE_LIMIT)
    }
}

/// Cool column (overall sensation below zero) and warm column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComfortCoefficients {
    pub cool: ComfortCurve,
    pub warm: ComfortCurve,
}

impl ComfortCoefficients {
    pub fn column(&self, overall_sensation: f64) -> &ComfortCurve {
        if overall_sensation < 0.0 {
            &self.cool
        } else {
            &self.warm
        }
    }
}

const fn pair(cool: ComfortCurve, warm: ComfortCurve) -> ComfortCoefficients {
    ComfortCoefficients { cool, warm }
}

const HEAD: ComfortCoefficients = pair(
    ComfortCurve::new(2.0, 0.10, (0.15, 0.25), 1.9),
    ComfortCurve::new(2.2, 0.10, (0.12, 0.20), 1.8),
);
const CHEST: ComfortCoefficients = pair(
    ComfortCurve::new(2.1, 0.15, (0.10, 0.20), 1.7),
    ComfortCurve::new(2.3, 0.20, (0.08, 0.15), 2.0),
);
const BACK: ComfortCoefficients = pair(
    ComfortCurve::new(2.0, 0.12, (0.10, 0.18), 1.8),
    ComfortCurve::new(2.2, 0.18, (0.08, 0.12), 1.9),
);
const PELVIS: ComfortCoefficients = pair(
    ComfortCurve::new(1.9, 0.10, (0.12, 0.15), 1.8),
    ComfortCurve::new(2.1, 0.15, (0.10, 0.12), 1.9),
);
const SHOULDER: ComfortCoefficients = pair(
    ComfortCurve::new(1.8, 0.08, (0.14, 0.22), 1.7),
    ComfortCurve::new(2.0, 0.10, (0.10, 0.18), 1.8),
);
const ARM: ComfortCoefficients = pair(
    ComfortCurve::new(1.7, 0.06, (0.10, 0.20), 1.6),
    ComfortCurve::new(1.9, 0.08, (0.08, 0.15), 1.7),
);
const HAND: ComfortCoefficients = pair(
    ComfortCurve::new(1.6, 0.05, (0.18, 0.28), 1.5),
    ComfortCurve::new(1.8, 0.06, (0.12, 0.20), 1.6),
);
const THIGH: ComfortCoefficients = pair(
    ComfortCurve::new(1.8, 0.06, (0.10, 0.15), 1.7),
    ComfortCurve::new(2.0, 0.08, (0.08, 0.12), 1.8),
);
const LEG: ComfortCoefficients = pair(
    ComfortCurve::new(1.7, 0.05, (0.12, 0.18), 1.6),
    ComfortCurve::new(1.9, 0.06, (0.10, 0.15), 1.7),
);
const FOOT: ComfortCoefficients = pair(
    ComfortCurve::new(1.5, 0.04, (0.20, 0.30), 1.5),
    ComfortCurve::new(1.7, 0.05, (0.15, 0.22), 1.6),
);

/// Default coefficients in segment order
pub const COMFORT_COEFFICIENTS: [ComfortCoefficients; SEGMENT_COUNT] = [
    HEAD, CHEST, BACK, PELVIS, SHOULDER, SHOULDER, ARM, ARM, HAND, HAND, THIGH, THIGH, LEG, LEG,
    FOOT, FOOT,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalComfortModel {
    pub coefficients: [ComfortCoefficients; SEGMENT_COUNT],
}

impl Default for LocalComfortModel {
    fn default() -> Self {
        Self {
            coefficients: COMFORT_COEFFICIENTS,
        }
    }
}

impl LocalComfortModel {
    pub fn evaluate(&self, local_sensation: &SegmentValues, overall_sensation: f64) -> SegmentValues {
        let mut out = [0.0; SEGMENT_COUNT];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.coefficients[i]
                .column(overall_sensation)
                .comfort(local_sensation[i], overall_sensation);
        }
        out
    }
}
