//! Physiological heat-balance engine
//!
//! Evaluates the right-hand side of the 65-node heat balance. Every node sees
//!
//! ```text
//! C·dT/dt = Q − B + D_in − D_out − [skin: sensible + evaporation] − [chest viscera: respiration]
//! ```
//!
//! with metabolic heat `Q`, counter-current blood exchange `B` with the
//! core-blood pool, and conduction `D` between adjacent layers. The engine
//! holds no mutable state; the integrator owns the `TemperatureState`.
//!
//! Inputs are never rejected. Non-positive convective coefficients fall back
//! to `PhysiologyConfig::fallback_convective_coefficient`; all other values
//! are used as given and the outputs extrapolate.

use crate::config::{PhysiologyConfig, RadiationMode};
use crate::params::{
    BodyParameters, ControlGainSet, BASAL_EVAPORATION_FRACTION, BLOOD_HEAT_CAPACITY,
    CLOTHING_PERMEABILITY, CLO_TO_M2K_PER_W, LEWIS_RATIO, MET_W_PER_M2, MUSCLE_FLOW_CONVERSION,
};
use crate::state::TemperatureState;
use crate::thermoregulation::{ControlSignals, Thermoregulation};
use crate::types::{
    BodySegment, BodyTemperatures, Environment, SegmentValues, ThermalSample, TissueLayer,
    KELVIN_OFFSET, LAYER_COUNT, SEGMENT_COUNT,
};
use log::debug;
use serde::{Deserialize, Serialize};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Saturation vapour pressure over water (kPa), Tetens form
pub fn saturation_vapor_pressure_kpa(t_celsius: f64) -> f64 {
    0.61078 * (17.27 * t_celsius / (t_celsius + 237.3)).exp()
}

/// Heat exchange conditions at one segment's skin surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceExchange {
    /// Convective coefficient after fallback substitution (W/m²K)
    pub convective: f64,
    /// Radiative coefficient, zero in flux mode (W/m²K)
    pub radiative: f64,
    /// Series clothing + surface coefficient (W/m²K)
    pub total: f64,
    /// Temperature the skin loses sensible heat to (°C)
    pub operative_c: f64,
    /// Absorbed radiative flux added to the skin, flux mode only (W)
    pub radiant_gain_w: f64,
    /// Evaporative conductance through clothing and boundary layer (W/m²kPa)
    pub evaporative: f64,
}

/// Heat flows of one node (W)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeFlows {
    pub metabolism: f64,
    /// Blood flow through the node (L/h)
    pub blood_flow: f64,
    /// Heat carried to the core-blood pool
    pub blood_exchange: f64,
    /// Conduction to the next layer outward
    pub conduction_out: f64,
    pub sensible: f64,
    pub evaporation: f64,
    pub respiration: f64,
}

/// Full right-hand-side evaluation, kept for diagnostics and reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatBalance {
    pub control: ControlSignals,
    pub flows: [[NodeFlows; LAYER_COUNT]; SEGMENT_COUNT],
    /// Total metabolic heat including shivering and work (W)
    pub total_metabolism_w: f64,
    pub respiration_w: f64,
    /// Node rates (K/s)
    pub rates: TemperatureState,
}

impl HeatBalance {
    /// Net heat leaving the body through skin and respiration (W)
    pub fn total_loss_w(&self) -> f64 {
        let skin = TissueLayer::Skin.index();
        self.flows
            .iter()
            .map(|row| row[skin].sensible + row[skin].evaporation)
            .sum::<f64>()
            + self.respiration_w
    }
}

/// The 65-node thermoregulation model
#[derive(Debug, Clone, PartialEq)]
pub struct PhysiologicalEngine {
    params: BodyParameters,
    config: PhysiologyConfig,
    control: Thermoregulation,
}

impl Default for PhysiologicalEngine {
    fn default() -> Self {
        Self::new(PhysiologyConfig::default())
    }
}

impl PhysiologicalEngine {
    /// Standard body and default gains
    pub fn new(config: PhysiologyConfig) -> Self {
        Self::with_parameters(BodyParameters::default(), ControlGainSet::default(), config)
    }

    pub fn with_parameters(
        params: BodyParameters,
        gains: ControlGainSet,
        config: PhysiologyConfig,
    ) -> Self {
        Self {
            params,
            config,
            control: Thermoregulation::new(gains),
        }
    }

    pub fn params(&self) -> &BodyParameters {
        &self.params
    }

    pub fn config(&self) -> &PhysiologyConfig {
        &self.config
    }

    /// State the simulation starts from
    pub fn initial_state(&self) -> TemperatureState {
        TemperatureState::at_setpoints(&self.params)
    }

    /// External work heat above basal metabolism, whole body (W)
    pub fn work_heat_w(&self) -> f64 {
        let total = MET_W_PER_M2 * self.config.metabolic_level * self.params.total_area_m2();
        (total - self.params.total_basal_metabolism_w()).max(0.0)
    }

    /// Invert the series resistance `1/h = 0.155·clo + 1/(h_c + h_r·fcl)`
    pub fn total_heat_transfer_coefficient(
        &self,
        segment: BodySegment,
        convective: f64,
        radiative: f64,
    ) -> f64 {
        let clo = self.config.clothing_insulation[segment.index()];
        let fcl = self.config.clothing_area_factor(segment);
        1.0 / (CLO_TO_M2K_PER_W * clo + 1.0 / (convective + radiative * fcl))
    }

    fn evaporative_coefficient(&self, segment: BodySegment, convective: f64) -> f64 {
        let clo = self.config.clothing_insulation[segment.index()];
        let fcl = self.config.clothing_area_factor(segment);
        1.0 / (CLO_TO_M2K_PER_W * clo / (CLOTHING_PERMEABILITY * LEWIS_RATIO)
            + 1.0 / (LEWIS_RATIO * convective * fcl))
    }

    fn convective_coefficient(&self, segment: BodySegment, supplied: f64) -> f64 {
        if supplied > 0.0 {
            supplied
        } else {
            debug!(
                "non-positive convective coefficient {} on {}, using fallback {}",
                supplied,
                segment.as_str(),
                self.config.fallback_convective_coefficient
            );
            self.config.fallback_convective_coefficient
        }
    }

    /// Surface exchange terms of one segment under the given environment
    pub fn surface_exchange(&self, segment: BodySegment, env: &Environment) -> SurfaceExchange {
        let i = segment.index();
        let convective = self.convective_coefficient(segment, env.heat_transfer_coefficient[i]);
        let air_c = env.air_temperature_k[i] - KELVIN_OFFSET;
        let (radiative, operative_c, radiant_gain_w) = match self.config.radiation_mode {
            RadiationMode::Flux => (0.0, air_c, env.radiation[i] * self.params.area_m2[i]),
            RadiationMode::Coefficient => {
                let radiative = env.radiation[i];
                let mrt_c = env.mean_radiant_temperature_k - KELVIN_OFFSET;
                let operative =
                    (convective * air_c + radiative * mrt_c) / (convective + radiative);
                (radiative, operative, 0.0)
            }
        };
        SurfaceExchange {
            convective,
            radiative,
            total: self.total_heat_transfer_coefficient(segment, convective, radiative),
            operative_c,
            radiant_gain_w,
            evaporative: self.evaporative_coefficient(segment, convective),
        }
    }

    /// Evaporative loss from one skin node (W): min(basal + sweat, capacity)
    fn evaporation(
        &self,
        segment: BodySegment,
        skin_c: f64,
        surface: &SurfaceExchange,
        sweat_w: f64,
    ) -> f64 {
        let gradient = saturation_vapor_pressure_kpa(skin_c) - self.config.vapor_pressure_kpa;
        let capacity = (surface.evaporative * gradient * self.params.area_m2[segment.index()])
            .max(0.0);
        let basal = if capacity > sweat_w {
            BASAL_EVAPORATION_FRACTION * (capacity - sweat_w)
        } else {
            0.0
        };
        (basal + sweat_w).min(capacity)
    }

    /// Respiratory loss (W), charged to the chest viscera
    fn respiration(&self, total_metabolism_w: f64, env: &Environment) -> f64 {
        let breathing_air_c =
            env.air_temperature_k[BodySegment::Head.index()] - KELVIN_OFFSET;
        (0.0014 * (34.0 - breathing_air_c) + 0.0173 * (5.87 - self.config.vapor_pressure_kpa))
            * total_metabolism_w
    }

    fn blood_coefficient(&self, segment: usize) -> f64 {
        BLOOD_HEAT_CAPACITY * self.params.counter_current[segment]
    }

    /// Evaluate every flow and the resulting node rates
    pub fn heat_balance(&self, state: &TemperatureState, env: &Environment) -> HeatBalance {
        let p = &self.params;
        let control = self.control.evaluate(p, state);
        let work = self.work_heat_w();
        let muscle = TissueLayer::Muscle.index();
        let skin = TissueLayer::Skin.index();

        let mut flows = [[NodeFlows::default(); LAYER_COUNT]; SEGMENT_COUNT];

        // metabolism and blood flow first; respiration needs the whole-body sum
        for (i, row) in flows.iter_mut().enumerate() {
            for (j, node) in row.iter_mut().enumerate() {
                let mut active = 0.0;
                if j == muscle {
                    active = control.local_shiver(p, i) + work * p.work_distribution[i];
                }
                node.metabolism = p.basal_metabolism_w[i][j] + active;
                node.blood_flow = if j == skin {
                    (p.basal_blood_flow[i][j] + p.skin_dilation[i] * control.vasodilation)
                        / (1.0 + p.skin_constriction[i] * control.vasoconstriction)
                        * control.vasomotion[i]
                } else {
                    p.basal_blood_flow[i][j] + active / MUSCLE_FLOW_CONVERSION
                };
            }
        }

        let total_metabolism_w: f64 = flows.iter().flatten().map(|n| n.metabolism).sum();
        let respiration_w = self.respiration(total_metabolism_w, env);

        let mut rates = TemperatureState::zeros();
        let mut blood_gain = 0.0;

        for segment in BodySegment::ALL {
            let i = segment.index();
            let temps = &state.nodes[i];
            let blood_coefficient = self.blood_coefficient(i);

            for j in 0..LAYER_COUNT {
                let node = &mut flows[i][j];
                node.blood_exchange = blood_coefficient * node.blood_flow * (temps[j] - state.blood);
                node.conduction_out = if j + 1 < LAYER_COUNT {
                    p.conductance[i][j] * (temps[j] - temps[j + 1])
                } else {
                    0.0
                };
            }

            let surface = self.surface_exchange(segment, env);
            let skin_node = &mut flows[i][skin];
            skin_node.sensible = surface.total * (temps[skin] - surface.operative_c)
                * p.area_m2[i]
                - surface.radiant_gain_w;
            skin_node.evaporation =
                self.evaporation(segment, temps[skin], &surface, control.local_sweat(p, i));

            if segment == BodySegment::Chest {
                flows[i][TissueLayer::Viscera.index()].respiration = respiration_w;
            }

            for j in 0..LAYER_COUNT {
                let node = &flows[i][j];
                let conduction_in = if j > 0 { flows[i][j - 1].conduction_out } else { 0.0 };
                let net = node.metabolism - node.blood_exchange + conduction_in
                    - node.conduction_out
                    - node.sensible
                    - node.evaporation
                    - node.respiration;
                rates.nodes[i][j] = net / (p.capacity_wh[i][j] * SECONDS_PER_HOUR);
                blood_gain += node.blood_exchange;
            }
        }
        rates.blood = blood_gain / (p.blood_capacity_wh * SECONDS_PER_HOUR);

        HeatBalance {
            control,
            flows,
            total_metabolism_w,
            respiration_w,
            rates,
        }
    }

    /// Node rates (K/s)
    pub fn derivatives(&self, state: &TemperatureState, env: &Environment) -> TemperatureState {
        self.heat_balance(state, env).rates
    }

    /// The 17 Kelvin outputs
    pub fn body_temperatures(&self, state: &TemperatureState) -> BodyTemperatures {
        state.body_temperatures()
    }

    /// Outputs plus the skin and core-blood rates the sensation model reads
    pub fn thermal_sample(&self, state: &TemperatureState, env: &Environment) -> ThermalSample {
        let rates = self.derivatives(state, env);
        let mut skin_rate = [0.0; SEGMENT_COUNT];
        for (value, row) in skin_rate.iter_mut().zip(rates.nodes.iter()) {
            *value = row[TissueLayer::Skin.index()];
        }
        ThermalSample {
            temperatures: state.body_temperatures(),
            skin_rate,
            core_rate: rates.blood,
        }
    }

    /// Air temperatures (K) that hold every skin node in balance at its setpoint
    ///
    /// Assumes no radiative input, so the operative temperature equals the
    /// air temperature, and solves the skin balance for it in closed form.
    pub fn neutral_air_temperatures(&self, heat_transfer_coefficient: &SegmentValues) -> SegmentValues {
        let state = self.initial_state();
        let reference = Environment {
            air_temperature_k: [state.blood + KELVIN_OFFSET; SEGMENT_COUNT],
            heat_transfer_coefficient: *heat_transfer_coefficient,
            radiation: [0.0; SEGMENT_COUNT],
            mean_radiant_temperature_k: state.blood + KELVIN_OFFSET,
            ambient_temperature_k: state.blood + KELVIN_OFFSET,
        };
        let balance = self.heat_balance(&state, &reference);
        let skin = TissueLayer::Skin.index();

        let mut out = [0.0; SEGMENT_COUNT];
        for segment in BodySegment::ALL {
            let i = segment.index();
            let node = &balance.flows[i][skin];
            let conduction_in = balance.flows[i][skin - 1].conduction_out;
            let gain = node.metabolism - node.blood_exchange + conduction_in - node.evaporation;
            let surface = self.surface_exchange(segment, &reference);
            let conductance = surface.total * self.params.area_m2[i];
            out[i] = state.nodes[i][skin] - gain / conductance + KELVIN_OFFSET;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOMINAL_HTC: f64 = 4.5;

    fn neutral_environment(engine: &PhysiologicalEngine) -> Environment {
        let htc = [NOMINAL_HTC; SEGMENT_COUNT];
        let air = engine.neutral_air_temperatures(&htc);
        Environment {
            air_temperature_k: air,
            heat_transfer_coefficient: htc,
            radiation: [0.0; SEGMENT_COUNT],
            mean_radiant_temperature_k: air[0],
            ambient_temperature_k: air[0],
        }
    }

    #[test]
    fn test_total_coefficient_inverts_series_resistance() {
        let engine = PhysiologicalEngine::default();
        // nude segment: plain parallel sum
        let head = engine.total_heat_transfer_coefficient(BodySegment::Head, 3.0, 4.7);
        assert!((head - 7.7).abs() < 1e-12);

        // pelvis at 0.34 clo
        let pelvis = engine.total_heat_transfer_coefficient(BodySegment::Pelvis, 3.0, 4.7);
        let expected = 1.0 / (0.155 * 0.34 + 1.0 / (3.0 + 4.7 * 1.051));
        assert!((pelvis - expected).abs() < 1e-12);
        assert!(pelvis < 3.0 + 4.7 * 1.051);
    }

    #[test]
    fn test_non_positive_coefficient_uses_fallback() {
        let engine = PhysiologicalEngine::default();
        let mut env = Environment::uniform(300.0, 0.0);
        env.heat_transfer_coefficient[3] = -2.0;

        let head = engine.surface_exchange(BodySegment::Head, &env);
        let pelvis = engine.surface_exchange(BodySegment::Pelvis, &env);
        assert_eq!(head.convective, 3.0);
        assert_eq!(pelvis.convective, 3.0);

        let rates = engine.derivatives(&engine.initial_state(), &env);
        assert!(rates.nodes.iter().flatten().all(|r| r.is_finite()));
    }

    #[test]
    fn test_coefficient_mode_operative_temperature() {
        let config = PhysiologyConfig {
            radiation_mode: RadiationMode::Coefficient,
            ..Default::default()
        };
        let engine = PhysiologicalEngine::new(config);
        let mut env = Environment::uniform(20.0 + KELVIN_OFFSET, 3.0);
        env.radiation = [6.0; SEGMENT_COUNT];
        env.mean_radiant_temperature_k = 29.0 + KELVIN_OFFSET;

        let surface = engine.surface_exchange(BodySegment::Chest, &env);
        assert!((surface.operative_c - 26.0).abs() < 1e-9);
        assert_eq!(surface.radiant_gain_w, 0.0);
        assert!((surface.total - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_flux_mode_adds_radiant_gain() {
        let engine = PhysiologicalEngine::default();
        let state = engine.initial_state();
        let dark = Environment::uniform(25.0 + KELVIN_OFFSET, 4.5);
        let mut sunny = dark.clone();
        sunny.radiation = [100.0; SEGMENT_COUNT];

        let cool = engine.derivatives(&state, &dark);
        let warm = engine.derivatives(&state, &sunny);
        for segment in BodySegment::ALL {
            let j = TissueLayer::Skin.index();
            let i = segment.index();
            let expected = 100.0 * engine.params().area_m2[i]
                / (engine.params().capacity_wh[i][j] * SECONDS_PER_HOUR);
            assert!((warm.nodes[i][j] - cool.nodes[i][j] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_neutral_environment_is_steady() {
        let engine = PhysiologicalEngine::default();
        let env = neutral_environment(&engine);
        let balance = engine.heat_balance(&engine.initial_state(), &env);

        // control is idle at the setpoints
        assert_eq!(balance.control.sweat, 0.0);
        assert_eq!(balance.control.shiver, 0.0);

        let skin = TissueLayer::Skin.index();
        for row in balance.rates.nodes.iter() {
            assert!(row[skin].abs() < 1e-12, "skin rate {}", row[skin]);
        }
        assert!(balance.rates.max_abs() < 2e-4, "max rate {}", balance.rates.max_abs());

        // neutral air sits close to the calibration point
        for air in env.air_temperature_k {
            let air_c = air - KELVIN_OFFSET;
            assert!((air_c - 24.8).abs() < 0.5, "neutral air {air_c}");
        }
    }

    #[test]
    fn test_off_neutral_environment_is_not_steady() {
        let engine = PhysiologicalEngine::default();
        let mut env = neutral_environment(&engine);
        for air in env.air_temperature_k.iter_mut() {
            *air += 5.0;
        }
        let rates = engine.derivatives(&engine.initial_state(), &env);
        assert!(rates.max_abs() > 1e-3);
        assert!(rates
            .nodes
            .iter()
            .all(|row| row[TissueLayer::Skin.index()] > 0.0));
    }

    #[test]
    fn test_energy_bookkeeping() {
        let engine = PhysiologicalEngine::default();
        let state = engine.initial_state();
        let env = Environment::uniform(18.0 + KELVIN_OFFSET, 4.5);
        let balance = engine.heat_balance(&state, &env);

        // storage rate equals metabolism minus losses: conduction and blood cancel
        let p = engine.params();
        let mut storage = balance.rates.blood * p.blood_capacity_wh * SECONDS_PER_HOUR;
        for i in 0..SEGMENT_COUNT {
            for j in 0..LAYER_COUNT {
                storage += balance.rates.nodes[i][j] * p.capacity_wh[i][j] * SECONDS_PER_HOUR;
            }
        }
        let expected = balance.total_metabolism_w - balance.total_loss_w();
        assert!((storage - expected).abs() < 1e-9, "{storage} vs {expected}");
        assert!(storage < 0.0);
    }

    #[test]
    fn test_work_heat_follows_activity() {
        let engine = PhysiologicalEngine::default();
        let expected = 58.2 * 1.869 - engine.params().total_basal_metabolism_w();
        assert!((engine.work_heat_w() - expected).abs() < 1e-9);

        let resting = PhysiologicalEngine::new(PhysiologyConfig {
            metabolic_level: 0.5,
            ..Default::default()
        });
        assert_eq!(resting.work_heat_w(), 0.0);
    }

    #[test]
    fn test_evaporation_limited_by_capacity() {
        let engine = PhysiologicalEngine::default();
        let env = Environment::uniform(30.0 + KELVIN_OFFSET, 4.5);
        let surface = engine.surface_exchange(BodySegment::Chest, &env);
        let capacity = surface.evaporative
            * (saturation_vapor_pressure_kpa(34.0) - 1.5)
            * engine.params().area_m2[1];

        let basal = engine.evaporation(BodySegment::Chest, 34.0, &surface, 0.0);
        assert!((basal - 0.06 * capacity).abs() < 1e-9);

        let drenched = engine.evaporation(BodySegment::Chest, 34.0, &surface, 1e4);
        assert!((drenched - capacity).abs() < 1e-9);

        // saturated surroundings: no capacity, no evaporation
        let humid = PhysiologicalEngine::new(PhysiologyConfig {
            vapor_pressure_kpa: 10.0,
            ..Default::default()
        });
        assert_eq!(humid.evaporation(BodySegment::Chest, 34.0, &surface, 5.0), 0.0);
    }

    #[test]
    fn test_respiration_only_on_chest_viscera() {
        let engine = PhysiologicalEngine::default();
        let balance = engine.heat_balance(
            &engine.initial_state(),
            &Environment::uniform(22.0 + KELVIN_OFFSET, 4.5),
        );
        assert!(balance.respiration_w > 0.0);
        for segment in BodySegment::ALL {
            for layer in TissueLayer::ALL {
                let flow = balance.flows[segment.index()][layer.index()].respiration;
                if segment == BodySegment::Chest && layer == TissueLayer::Viscera {
                    assert_eq!(flow, balance.respiration_w);
                } else {
                    assert_eq!(flow, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_cold_exposure_constricts_skin_flow() {
        let engine = PhysiologicalEngine::default();
        let mut state = engine.initial_state();
        for row in state.nodes.iter_mut() {
            row[TissueLayer::Skin.index()] -= 2.0;
        }
        let env = Environment::uniform(15.0 + KELVIN_OFFSET, 4.5);
        let balance = engine.heat_balance(&state, &env);
        assert!(balance.control.vasoconstriction > 0.0);

        let hand = BodySegment::LeftHand.index();
        let skin = TissueLayer::Skin.index();
        assert!(balance.flows[hand][skin].blood_flow < engine.params().basal_blood_flow[hand][skin]);
    }
}
