//! Fixed-step time integration
//!
//! The body model is exposed to the integrators as a flat first-order system
//! `dy/dt = f(t, y)`. Schemes are interchangeable through the `Integrator`
//! trait; state events are located separately by bisection on an indicator.

use crate::config::IntegratorKind;
use crate::error::ThermalError;

/// Maximum bisection iterations when locating a crossing
const MAX_BISECTIONS: usize = 200;

/// A first-order ODE system over a flat state vector
pub trait OdeSystem {
    /// Length of the state vector
    fn dimension(&self) -> usize;

    /// Evaluate `dy/dt` at `(t, y)`
    fn derivatives(&self, t: f64, y: &[f64]) -> Result<Vec<f64>, ThermalError>;
}

/// A one-step scheme advancing `y` from `t` to `t + dt`
pub trait Integrator {
    fn name(&self) -> &'static str;

    fn step(
        &self,
        system: &dyn OdeSystem,
        t: f64,
        y: &[f64],
        dt: f64,
    ) -> Result<Vec<f64>, ThermalError>;
}

/// Explicit Euler
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn name(&self) -> &'static str {
        "forward_euler"
    }

    fn step(
        &self,
        system: &dyn OdeSystem,
        t: f64,
        y: &[f64],
        dt: f64,
    ) -> Result<Vec<f64>, ThermalError> {
        let k = checked_derivatives(system, t, y)?;
        Ok(axpy(y, dt, &k))
    }
}

/// Classic fourth-order Runge–Kutta
#[derive(Debug, Clone, Copy, Default)]
pub struct RungeKutta4;

impl Integrator for RungeKutta4 {
    fn name(&self) -> &'static str {
        "runge_kutta4"
    }

    fn step(
        &self,
        system: &dyn OdeSystem,
        t: f64,
        y: &[f64],
        dt: f64,
    ) -> Result<Vec<f64>, ThermalError> {
        let half = 0.5 * dt;
        let k1 = checked_derivatives(system, t, y)?;
        let k2 = checked_derivatives(system, t + half, &axpy(y, half, &k1))?;
        let k3 = checked_derivatives(system, t + half, &axpy(y, half, &k2))?;
        let k4 = checked_derivatives(system, t + dt, &axpy(y, dt, &k3))?;

        Ok(y
            .iter()
            .enumerate()
            .map(|(i, v)| v + dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]))
            .collect())
    }
}

impl IntegratorKind {
    pub fn build(self) -> Box<dyn Integrator> {
        match self {
            IntegratorKind::ForwardEuler => Box::new(ForwardEuler),
            IntegratorKind::RungeKutta4 => Box::new(RungeKutta4),
        }
    }
}

/// Advance from `t0` to `t1` in steps no longer than `max_step`
pub fn advance(
    integrator: &dyn Integrator,
    system: &dyn OdeSystem,
    t0: f64,
    y: &[f64],
    t1: f64,
    max_step: f64,
) -> Result<Vec<f64>, ThermalError> {
    let span = t1 - t0;
    if span <= 0.0 {
        return Ok(y.to_vec());
    }
    let steps = (span / max_step).ceil().max(1.0) as usize;
    let dt = span / steps as f64;
    let mut state = y.to_vec();
    for n in 0..steps {
        state = integrator.step(system, t0 + n as f64 * dt, &state, dt)?;
    }
    Ok(state)
}

/// Narrow a sign change of `indicator` in `[t_lo, t_hi]` to a bracket no
/// wider than `tolerance`
///
/// The sign is read as `indicator > 0`; the two ends must disagree.
pub fn locate_crossing<F>(
    mut indicator: F,
    mut t_lo: f64,
    mut t_hi: f64,
    tolerance: f64,
) -> Result<(f64, f64), ThermalError>
where
    F: FnMut(f64) -> Result<f64, ThermalError>,
{
    let side_lo = indicator(t_lo)? > 0.0;
    if side_lo == (indicator(t_hi)? > 0.0) {
        return Err(ThermalError::IntegrationError(format!(
            "no crossing in [{t_lo}, {t_hi}]"
        )));
    }
    for _ in 0..MAX_BISECTIONS {
        if t_hi - t_lo <= tolerance {
            break;
        }
        let mid = 0.5 * (t_lo + t_hi);
        if (indicator(mid)? > 0.0) == side_lo {
            t_lo = mid;
        } else {
            t_hi = mid;
        }
    }
    Ok((t_lo, t_hi))
}

fn checked_derivatives(
    system: &dyn OdeSystem,
    t: f64,
    y: &[f64],
) -> Result<Vec<f64>, ThermalError> {
    let dydt = system.derivatives(t, y)?;
    if dydt.len() != y.len() {
        return Err(ThermalError::IntegrationError(format!(
            "derivative length {} does not match state length {}",
            dydt.len(),
            y.len()
        )));
    }
    if let Some(bad) = dydt.iter().position(|v| !v.is_finite()) {
        return Err(ThermalError::IntegrationError(format!(
            "non-finite derivative at index {bad}, t = {t}"
        )));
    }
    Ok(dydt)
}

fn axpy(y: &[f64], a: f64, x: &[f64]) -> Vec<f64> {
    y.iter().zip(x).map(|(yi, xi)| yi + a * xi).collect()
}
