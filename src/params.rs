//! Physiological constant bundles
//!
//! Segment tables for the standard body (1.869 m², resting) and the
//! thermoregulatory control gains. Rows follow `BodySegment` order; columns
//! follow `TissueLayer` order (viscera, muscle, fat, skin).
//!
//! The node setpoints are the unregulated steady state of this body at 1 met,
//! 24.8 °C operative temperature, 4.5 W/m²K convective coefficient and
//! 1.5 kPa ambient vapour pressure, so that all control errors vanish there.

use crate::types::{LAYER_COUNT, SEGMENT_COUNT};
use serde::{Deserialize, Serialize};

/// Basal metabolic rate per unit body area at 1 met (W/m²)
pub const MET_W_PER_M2: f64 = 58.2;

/// Volumetric heat capacity of blood (Wh/(L·K)), giving W/K per L/h of flow
pub const BLOOD_HEAT_CAPACITY: f64 = 1.067;

/// Extra muscle blood flow per watt of shivering or work (W per L/h)
pub const MUSCLE_FLOW_CONVERSION: f64 = 1.16;

/// Heat capacity of the core-blood pool (Wh/K)
pub const BLOOD_POOL_CAPACITY_WH: f64 = 2.610;

/// Setpoint of the core-blood pool (°C)
pub const BLOOD_SETPOINT_C: f64 = 36.780;

/// Clo to m²K/W
pub const CLO_TO_M2K_PER_W: f64 = 0.155;

/// Lewis relation (K/kPa)
pub const LEWIS_RATIO: f64 = 16.5;

/// Clothing vapour permeation efficiency
pub const CLOTHING_PERMEABILITY: f64 = 0.45;

/// Basal (diffusion) evaporation as a share of unused capacity
pub const BASAL_EVAPORATION_FRACTION: f64 = 0.06;

/// Skin error band for the local vasomotion multiplier (K)
pub const VASOMOTION_BAND_K: f64 = 10.0;

/// Surface area per segment (m²)
pub const AREA_M2: [f64; SEGMENT_COUNT] = [
    0.140, 0.175, 0.161, 0.221, 0.096, 0.096, 0.063, 0.063, 0.050, 0.050, 0.209, 0.209, 0.112,
    0.112, 0.056, 0.056,
];

/// Node heat capacity (Wh/K)
pub const CAPACITY_WH: [[f64; LAYER_COUNT]; SEGMENT_COUNT] = [
    [2.576, 0.386, 0.258, 0.282],  // head
    [2.915, 5.669, 1.496, 0.418],  // chest
    [2.471, 4.739, 1.397, 0.414],  // back
    [6.017, 11.606, 3.208, 0.782], // pelvis
    [0.503, 0.421, 0.164, 0.175],  // left shoulder
    [0.503, 0.421, 0.164, 0.175],  // right shoulder
    [0.321, 0.228, 0.124, 0.114],  // left arm
    [0.321, 0.228, 0.124, 0.114],  // right arm
    [0.082, 0.060, 0.088, 0.122],  // left hand
    [0.082, 0.060, 0.088, 0.122],  // right hand
    [1.665, 3.011, 0.884, 0.353],  // left thigh
    [1.665, 3.011, 0.884, 0.353],  // right thigh
    [0.672, 1.108, 0.268, 0.153],  // left leg
    [0.672, 1.108, 0.268, 0.153],  // right leg
    [0.154, 0.061, 0.126, 0.129],  // left foot
    [0.154, 0.061, 0.126, 0.129],  // right foot
];

/// Basal metabolic heat (W)
pub const BASAL_METABOLISM_W: [[f64; LAYER_COUNT]; SEGMENT_COUNT] = [
    [16.843, 0.217, 0.109, 0.131],
    [21.182, 2.466, 0.397, 0.201],
    [18.699, 2.064, 0.368, 0.199],
    [6.520, 2.200, 0.300, 0.280],
    [0.300, 0.500, 0.050, 0.070],
    [0.300, 0.500, 0.050, 0.070],
    [0.160, 0.240, 0.030, 0.040],
    [0.160, 0.240, 0.030, 0.040],
    [0.060, 0.030, 0.040, 0.060],
    [0.060, 0.030, 0.040, 0.060],
    [0.900, 2.500, 0.150, 0.150],
    [0.900, 2.500, 0.150, 0.150],
    [0.300, 0.900, 0.050, 0.080],
    [0.300, 0.900, 0.050, 0.080],
    [0.080, 0.030, 0.040, 0.060],
    [0.080, 0.030, 0.040, 0.060],
];

/// Basal blood flow (L/h)
pub const BASAL_BLOOD_FLOW_L_PER_H: [[f64; LAYER_COUNT]; SEGMENT_COUNT] = [
    [45.00, 0.12, 0.13, 1.44],
    [77.85, 7.66, 1.34, 1.49],
    [98.69, 6.34, 1.11, 1.49],
    [50.00, 5.50, 0.90, 1.50],
    [1.30, 1.00, 0.12, 0.80],
    [1.30, 1.00, 0.12, 0.80],
    [0.80, 0.50, 0.06, 0.50],
    [0.80, 0.50, 0.06, 0.50],
    [0.20, 0.10, 0.10, 1.20],
    [0.20, 0.10, 0.10, 1.20],
    [2.50, 4.00, 0.20, 1.20],
    [2.50, 4.00, 0.20, 1.20],
    [1.00, 1.30, 0.10, 0.60],
    [1.00, 1.30, 0.10, 0.60],
    [0.20, 0.10, 0.10, 0.80],
    [0.20, 0.10, 0.10, 0.80],
];

/// Conductance between adjacent layers (W/K): viscera-muscle, muscle-fat, fat-skin
pub const CONDUCTANCE_W_PER_K: [[f64; LAYER_COUNT - 1]; SEGMENT_COUNT] = [
    [1.609, 13.327, 16.302],
    [1.612, 0.397, 7.896],
    [1.480, 0.365, 7.254],
    [2.416, 0.596, 11.846],
    [1.578, 0.821, 5.146],
    [1.578, 0.821, 5.146],
    [1.152, 0.600, 3.758],
    [1.152, 0.600, 3.758],
    [0.951, 5.560, 13.490],
    [0.951, 5.560, 13.490],
    [10.180, 1.126, 8.003],
    [10.180, 1.126, 8.003],
    [4.225, 0.468, 3.326],
    [4.225, 0.468, 3.326],
    [2.036, 9.910, 23.710],
    [2.036, 9.910, 23.710],
];

/// Node setpoints (°C)
pub const SETPOINT_C: [[f64; LAYER_COUNT]; SEGMENT_COUNT] = [
    [37.057, 34.851, 34.550, 34.278],
    [36.922, 37.096, 34.367, 33.742],
    [36.959, 37.099, 34.363, 33.780],
    [36.911, 37.117, 34.151, 33.763],
    [36.687, 36.418, 33.891, 33.410],
    [36.687, 36.418, 33.891, 33.410],
    [36.465, 36.117, 33.687, 33.244],
    [36.465, 36.117, 33.687, 33.244],
    [35.375, 35.043, 34.904, 34.831],
    [35.375, 35.043, 34.904, 34.831],
    [37.125, 37.122, 33.238, 32.583],
    [37.125, 37.122, 33.238, 32.583],
    [37.126, 37.133, 32.784, 32.042],
    [37.126, 37.133, 32.784, 32.042],
    [34.550, 34.312, 34.203, 34.147],
    [34.550, 34.312, 34.203, 34.147],
];

/// Counter-current heat exchange factor on blood returning from each segment
pub const COUNTER_CURRENT: [f64; SEGMENT_COUNT] = [
    1.00, 1.00, 1.00, 1.00, 0.95, 0.95, 0.90, 0.90, 0.85, 0.85, 0.95, 0.95, 0.90, 0.90, 0.85, 0.85,
];

/// Skin thermoreceptor weighting for the whole-body warm/cold signals
pub const SKIN_RECEPTOR: [f64; SEGMENT_COUNT] = [
    0.070, 0.149, 0.132, 0.212, 0.023, 0.023, 0.012, 0.012, 0.092, 0.092, 0.050, 0.050, 0.025,
    0.025, 0.0165, 0.0165,
];

/// Sweat distribution
pub const SKIN_SWEAT: [f64; SEGMENT_COUNT] = [
    0.081, 0.146, 0.129, 0.206, 0.051, 0.051, 0.026, 0.026, 0.0155, 0.0155, 0.073, 0.073, 0.036,
    0.036, 0.0175, 0.0175,
];

/// Vasodilation distribution
pub const SKIN_DILATION: [f64; SEGMENT_COUNT] = [
    0.132, 0.322, 0.095, 0.121, 0.0165, 0.0165, 0.0165, 0.0165, 0.061, 0.061, 0.023, 0.023, 0.012,
    0.012, 0.036, 0.036,
];

/// Vasoconstriction distribution
pub const SKIN_CONSTRICTION: [f64; SEGMENT_COUNT] = [
    0.050, 0.050, 0.050, 0.050, 0.0125, 0.0125, 0.0125, 0.0125, 0.175, 0.175, 0.0125, 0.0125,
    0.0125, 0.0125, 0.175, 0.175,
];

/// Shivering distribution over the muscle layer
pub const SHIVER_DISTRIBUTION: [f64; SEGMENT_COUNT] = [
    0.020, 0.258, 0.227, 0.365, 0.0125, 0.0125, 0.0125, 0.0125, 0.0, 0.0, 0.020, 0.020, 0.020,
    0.020, 0.0, 0.0,
];

/// Work heat distribution over the muscle layer
pub const WORK_DISTRIBUTION: [f64; SEGMENT_COUNT] = [
    0.0, 0.091, 0.080, 0.129, 0.026, 0.026, 0.014, 0.014, 0.005, 0.005, 0.201, 0.201, 0.099,
    0.099, 0.005, 0.005,
];

/// Gains of one controller stage, one per effector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlGains {
    pub sweat: f64,
    pub shiver: f64,
    pub vasodilation: f64,
    pub vasoconstriction: f64,
}

/// The three controller stages used by every effector equation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlGainSet {
    /// Multiplies the head-core error (W/K or L/(h·K))
    pub core: ControlGains,
    /// Multiplies the whole-body skin signal WRMS − CLDS
    pub skin: ControlGains,
    /// Multiplies the core × skin cross term
    pub peripheral: ControlGains,
}

impl Default for ControlGainSet {
    fn default() -> Self {
        Self {
            core: ControlGains {
                sweat: 371.2,
                shiver: 0.0,
                vasodilation: 117.0,
                vasoconstriction: 11.5,
            },
            skin: ControlGains {
                sweat: 33.6,
                shiver: 0.0,
                vasodilation: 7.5,
                vasoconstriction: 11.5,
            },
            peripheral: ControlGains {
                sweat: 0.0,
                shiver: 24.4,
                vasodilation: 0.0,
                vasoconstriction: 0.0,
            },
        }
    }
}

/// Per-segment constant tables of one body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyParameters {
    pub area_m2: [f64; SEGMENT_COUNT],
    pub capacity_wh: [[f64; LAYER_COUNT]; SEGMENT_COUNT],
    pub basal_metabolism_w: [[f64; LAYER_COUNT]; SEGMENT_COUNT],
    pub basal_blood_flow: [[f64; LAYER_COUNT]; SEGMENT_COUNT],
    pub conductance: [[f64; LAYER_COUNT - 1]; SEGMENT_COUNT],
    pub setpoint_c: [[f64; LAYER_COUNT]; SEGMENT_COUNT],
    pub blood_setpoint_c: f64,
    pub blood_capacity_wh: f64,
    pub counter_current: [f64; SEGMENT_COUNT],
    pub skin_receptor: [f64; SEGMENT_COUNT],
    pub skin_sweat: [f64; SEGMENT_COUNT],
    pub skin_dilation: [f64; SEGMENT_COUNT],
    pub skin_constriction: [f64; SEGMENT_COUNT],
    pub shiver_distribution: [f64; SEGMENT_COUNT],
    pub work_distribution: [f64; SEGMENT_COUNT],
}

impl Default for BodyParameters {
    fn default() -> Self {
        Self {
            area_m2: AREA_M2,
            capacity_wh: CAPACITY_WH,
            basal_metabolism_w: BASAL_METABOLISM_W,
            basal_blood_flow: BASAL_BLOOD_FLOW_L_PER_H,
            conductance: CONDUCTANCE_W_PER_K,
            setpoint_c: SETPOINT_C,
            blood_setpoint_c: BLOOD_SETPOINT_C,
            blood_capacity_wh: BLOOD_POOL_CAPACITY_WH,
            counter_current: COUNTER_CURRENT,
            skin_receptor: SKIN_RECEPTOR,
            skin_sweat: SKIN_SWEAT,
            skin_dilation: SKIN_DILATION,
            skin_constriction: SKIN_CONSTRICTION,
            shiver_distribution: SHIVER_DISTRIBUTION,
            work_distribution: WORK_DISTRIBUTION,
        }
    }
}

impl BodyParameters {
    pub fn total_area_m2(&self) -> f64 {
        self.area_m2.iter().sum()
    }

    pub fn total_basal_metabolism_w(&self) -> f64 {
        self.basal_metabolism_w.iter().flatten().sum()
    }

    /// Skin setpoints per segment (°C)
    pub fn skin_setpoints_c(&self) -> [f64; SEGMENT_COUNT] {
        let mut out = [0.0; SEGMENT_COUNT];
        for (value, row) in out.iter_mut().zip(self.setpoint_c.iter()) {
            *value = row[LAYER_COUNT - 1];
        }
        out
    }

    /// Distribution tables that must each sum to one
    pub fn distributions(&self) -> [(&'static str, &[f64; SEGMENT_COUNT]); 6] {
        [
            ("skin_receptor", &self.skin_receptor),
            ("skin_sweat", &self.skin_sweat),
            ("skin_dilation", &self.skin_dilation),
            ("skin_constriction", &self.skin_constriction),
            ("shiver_distribution", &self.shiver_distribution),
            ("work_distribution", &self.work_distribution),
        ]
    }
}
