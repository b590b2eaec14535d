//! Core types for the Synheart Thermal pipeline
//!
//! This module defines the body partition (segments and tissue layers) and the
//! records that flow between stages: environment boundary conditions in,
//! body temperatures out, and the thermal sample consumed by the sensation
//! models.

use crate::error::ThermalError;
use serde::{Deserialize, Serialize};

/// Number of body segments
pub const SEGMENT_COUNT: usize = 16;

/// Number of tissue layers per segment
pub const LAYER_COUNT: usize = 4;

/// Tissue nodes plus the core-blood pool
pub const NODE_COUNT: usize = SEGMENT_COUNT * LAYER_COUNT + 1;

/// Celsius to Kelvin offset
pub const KELVIN_OFFSET: f64 = 273.15;

/// One value per body segment, in `BodySegment` order
pub type SegmentValues = [f64; SEGMENT_COUNT];

/// Anatomical body segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySegment {
    Head,
    Chest,
    Back,
    Pelvis,
    LeftShoulder,
    RightShoulder,
    LeftArm,
    RightArm,
    LeftHand,
    RightHand,
    LeftThigh,
    RightThigh,
    LeftLeg,
    RightLeg,
    LeftFoot,
    RightFoot,
}

impl BodySegment {
    /// All segments in index order
    pub const ALL: [BodySegment; SEGMENT_COUNT] = [
        BodySegment::Head,
        BodySegment::Chest,
        BodySegment::Back,
        BodySegment::Pelvis,
        BodySegment::LeftShoulder,
        BodySegment::RightShoulder,
        BodySegment::LeftArm,
        BodySegment::RightArm,
        BodySegment::LeftHand,
        BodySegment::RightHand,
        BodySegment::LeftThigh,
        BodySegment::RightThigh,
        BodySegment::LeftLeg,
        BodySegment::RightLeg,
        BodySegment::LeftFoot,
        BodySegment::RightFoot,
    ];

    /// Zero-based position in every per-segment table
    pub fn index(self) -> usize {
        self as usize
    }

    /// One-based segment number (1..=16)
    pub fn number(self) -> usize {
        self.index() + 1
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BodySegment::Head => "head",
            BodySegment::Chest => "chest",
            BodySegment::Back => "back",
            BodySegment::Pelvis => "pelvis",
            BodySegment::LeftShoulder => "left_shoulder",
            BodySegment::RightShoulder => "right_shoulder",
            BodySegment::LeftArm => "left_arm",
            BodySegment::RightArm => "right_arm",
            BodySegment::LeftHand => "left_hand",
            BodySegment::RightHand => "right_hand",
            BodySegment::LeftThigh => "left_thigh",
            BodySegment::RightThigh => "right_thigh",
            BodySegment::LeftLeg => "left_leg",
            BodySegment::RightLeg => "right_leg",
            BodySegment::LeftFoot => "left_foot",
            BodySegment::RightFoot => "right_foot",
        }
    }
}

/// Radial tissue layer, innermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TissueLayer {
    Viscera,
    Muscle,
    Fat,
    Skin,
}

impl TissueLayer {
    pub const ALL: [TissueLayer; LAYER_COUNT] = [
        TissueLayer::Viscera,
        TissueLayer::Muscle,
        TissueLayer::Fat,
        TissueLayer::Skin,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Next layer outward, `None` for skin
    pub fn outer(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TissueLayer::Viscera => "viscera",
            TissueLayer::Muscle => "muscle",
            TissueLayer::Fat => "fat",
            TissueLayer::Skin => "skin",
        }
    }
}

/// Local boundary conditions supplied by the coupling harness for one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Local air temperature per segment (K)
    pub air_temperature_k: SegmentValues,
    /// Local convective heat-transfer coefficient per segment (W/m²K)
    pub heat_transfer_coefficient: SegmentValues,
    /// Radiative flux (W/m²) or radiative coefficient (W/m²K), per `RadiationMode`
    pub radiation: SegmentValues,
    /// Mean radiant temperature (K)
    pub mean_radiant_temperature_k: f64,
    /// Ambient temperature (K), carried through for the harness
    pub ambient_temperature_k: f64,
}

impl Environment {
    /// Same air temperature and convective coefficient on every segment, no radiation
    pub fn uniform(air_temperature_k: f64, heat_transfer_coefficient: f64) -> Self {
        Self {
            air_temperature_k: [air_temperature_k; SEGMENT_COUNT],
            heat_transfer_coefficient: [heat_transfer_coefficient; SEGMENT_COUNT],
            radiation: [0.0; SEGMENT_COUNT],
            mean_radiant_temperature_k: air_temperature_k,
            ambient_temperature_k: air_temperature_k,
        }
    }

    /// Build from the harness's flat channels, checking every length
    pub fn from_channels(
        air_temperature_k: &[f64],
        heat_transfer_coefficient: &[f64],
        radiation: &[f64],
        mean_radiant_temperature_k: f64,
        ambient_temperature_k: f64,
    ) -> Result<Self, ThermalError> {
        Ok(Self {
            air_temperature_k: segment_values("air_temperature_k", air_temperature_k)?,
            heat_transfer_coefficient: segment_values(
                "heat_transfer_coefficient",
                heat_transfer_coefficient,
            )?,
            radiation: segment_values("radiation", radiation)?,
            mean_radiant_temperature_k,
            ambient_temperature_k,
        })
    }
}

/// Engine output: 16 skin temperatures plus the core-blood temperature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyTemperatures {
    /// Skin-layer temperature per segment (K)
    pub skin_k: SegmentValues,
    /// Core-blood pool temperature (K)
    pub core_blood_k: f64,
}

impl BodyTemperatures {
    /// Flat 17-element layout: segments 1..=16 then core blood
    pub fn to_vector(&self) -> [f64; SEGMENT_COUNT + 1] {
        let mut out = [0.0; SEGMENT_COUNT + 1];
        out[..SEGMENT_COUNT].copy_from_slice(&self.skin_k);
        out[SEGMENT_COUNT] = self.core_blood_k;
        out
    }

    pub fn from_vector(values: &[f64]) -> Result<Self, ThermalError> {
        if values.len() != SEGMENT_COUNT + 1 {
            return Err(ThermalError::LengthMismatch {
                field: "body_temperatures".to_string(),
                expected: SEGMENT_COUNT + 1,
                actual: values.len(),
            });
        }
        let mut skin_k = [0.0; SEGMENT_COUNT];
        skin_k.copy_from_slice(&values[..SEGMENT_COUNT]);
        Ok(Self {
            skin_k,
            core_blood_k: values[SEGMENT_COUNT],
        })
    }
}

/// Temperatures and their rates, as read by the local sensation model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalSample {
    pub temperatures: BodyTemperatures,
    /// Skin temperature rate per segment (K/s)
    pub skin_rate: SegmentValues,
    /// Core temperature rate (K/s)
    pub core_rate: f64,
}

impl ThermalSample {
    /// A sample with no temperature change
    pub fn steady(temperatures: BodyTemperatures) -> Self {
        Self {
            temperatures,
            skin_rate: [0.0; SEGMENT_COUNT],
            core_rate: 0.0,
        }
    }
}

/// Copy a slice into a per-segment array, rejecting the wrong length
pub fn segment_values(field: &str, values: &[f64]) -> Result<SegmentValues, ThermalError> {
    if values.len() != SEGMENT_COUNT {
        return Err(ThermalError::LengthMismatch {
            field: field.to_string(),
            expected: SEGMENT_COUNT,
            actual: values.len(),
        });
    }
    let mut out = [0.0; SEGMENT_COUNT];
    out.copy_from_slice(values);
    Ok(out)
}
