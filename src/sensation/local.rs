//! Local sensation per segment
//!
//! ```text
//! static  = 4·(2/(1 + exp(−C1·dev − K1·(dev − dev_mean))) − 1)
//! dynamic = C2·dT_skin/dt + C3·dT_core/dt
//! LS      = clamp(static + dynamic, −4, 4)
//! ```
//!
//! `dev` is the skin temperature deviation from its setpoint and `dev_mean`
//! the area-weighted mean deviation of the whole skin. Rates are in K/s.

use super::SCALE_LIMIT;
use crate::params::BodyParameters;
use crate::types::{SegmentValues, ThermalSample, KELVIN_OFFSET, SEGMENT_COUNT};
use serde::{Deserialize, Serialize};

/// Regression coefficients of one segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensationCoefficients {
    /// Static slope below / above setpoint
    pub c1_cool: f64,
    pub c1_warm: f64,
    /// Weight of the local deviation relative to the whole-body mean
    pub k1_cool: f64,
    pub k1_warm: f64,
    /// Skin rate gain while cooling / warming (s/K)
    pub c2_cooling: f64,
    pub c2_warming: f64,
    /// Core rate gain (s/K)
    pub c3: f64,
}

const fn coefficients(
    c1: (f64, f64),
    k1: (f64, f64),
    c2: (f64, f64),
    c3: f64,
) -> SensationCoefficients {
    SensationCoefficients {
        c1_cool: c1.0,
        c1_warm: c1.1,
        k1_cool: k1.0,
        k1_warm: k1.1,
        c2_cooling: c2.0,
        c2_warming: c2.1,
        c3,
    }
}

const HEAD: SensationCoefficients = coefficients((0.38, 1.32), (0.18, 0.18), (543.5, 90.6), 26.0);
const CHEST: SensationCoefficients = coefficients((0.44, 0.35), (0.34, 0.10), (39.9, 0.0), 28.0);
const BACK: SensationCoefficients = coefficients((0.37, 0.25), (0.39, 0.14), (0.0, 0.0), 23.0);
const PELVIS: SensationCoefficients = coefficients((0.37, 0.32), (0.28, 0.11), (0.0, 0.0), 22.0);
const SHOULDER: SensationCoefficients = coefficients((0.36, 0.19), (0.43, 0.11), (73.0, 0.0), 0.0);
const ARM: SensationCoefficients = coefficients((0.35, 0.14), (0.42, 0.04), (22.4, 0.0), 0.0);
const HAND: SensationCoefficients = coefficients((0.35, 0.15), (0.33, 0.08), (24.5, 12.9), 0.0);
const THIGH: SensationCoefficients = coefficients((0.30, 0.20), (0.30, 0.05), (15.0, 0.0), 0.0);
const LEG: SensationCoefficients = coefficients((0.29, 0.15), (0.28, 0.04), (15.0, 0.0), 0.0);
const FOOT: SensationCoefficients = coefficients((0.25, 0.15), (0.29, 0.05), (26.6, 11.0), 0.0);

/// Default coefficients in segment order
pub const SENSATION_COEFFICIENTS: [SensationCoefficients; SEGMENT_COUNT] = [
    HEAD, CHEST, BACK, PELVIS, SHOULDER, SHOULDER, ARM, ARM, HAND, HAND, THIGH, THIGH, LEG, LEG,
    FOOT, FOOT,
];

impl SensationCoefficients {
    /// Static part for a deviation and the whole-body mean deviation
    pub fn static_sensation(&self, deviation: f64, mean_deviation: f64) -> f64 {
        let (c1, k1) = if deviation < 0.0 {
            (self.c1_cool, self.k1_cool)
        } else {
            (self.c1_warm, self.k1_warm)
        };
        let exponent = -c1 * deviation - k1 * (deviation - mean_deviation);
        SCALE_LIMIT * (2.0 / (1.0 + exponent.exp()) - 1.0)
    }

    /// Rate-driven part
    pub fn dynamic_sensation(&self, skin_rate: f64, core_rate: f64) -> f64 {
        let c2 = if skin_rate < 0.0 {
            self.c2_cooling
        } else {
            self.c2_warming
        };
        c2 * skin_rate + self.c3 * core_rate
    }
}

/// Stateless local sensation evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSensationModel {
    pub coefficients: [SensationCoefficients; SEGMENT_COUNT],
    /// Neutral skin temperature per segment (°C)
    pub setpoints_c: SegmentValues,
    /// Weights for the mean deviation (m²)
    pub area_m2: SegmentValues,
}

impl Default for LocalSensationModel {
    fn default() -> Self {
        Self::new(&BodyParameters::default())
    }
}

impl LocalSensationModel {
    pub fn new(params: &BodyParameters) -> Self {
        Self {
            coefficients: SENSATION_COEFFICIENTS,
            setpoints_c: params.skin_setpoints_c(),
            area_m2: params.area_m2,
        }
    }

    /// Skin deviations from setpoint (K)
    pub fn deviations(&self, sample: &ThermalSample) -> SegmentValues {
        let mut out = [0.0; SEGMENT_COUNT];
        for (i, value) in out.iter_mut().enumerate() {
            *value = sample.temperatures.skin_k[i] - KELVIN_OFFSET - self.setpoints_c[i];
        }
        out
    }

    /// Area-weighted mean of the deviations
    pub fn mean_deviation(&self, deviations: &SegmentValues) -> f64 {
        let area: f64 = self.area_m2.iter().sum();
        let weighted: f64 = deviations
            .iter()
            .zip(self.area_m2.iter())
            .map(|(d, a)| d * a)
            .sum();
        weighted / area
    }

    pub fn evaluate(&self, sample: &ThermalSample) -> SegmentValues {
        let deviations = self.deviations(sample);
        let mean = self.mean_deviation(&deviations);

        let mut out = [0.0; SEGMENT_COUNT];
        for (i, value) in out.iter_mut().enumerate() {
            let c = &self.coefficients[i];
            let raw = c.static_sensation(deviations[i], mean)
                + c.dynamic_sensation(sample.skin_rate[i], sample.core_rate);
            *value = raw.clamp(-SCALE_LIMIT, SCALE_LIMIT);
        }
        out
    }
}
