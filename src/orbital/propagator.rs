use std::f64::consts::TAU;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{engine_error, Result};
use crate::orbital::elements::{mean_to_true, KeplerianElements};
use crate::orbital::state::OrbitalState;
use crate::physics::gravity::{gravity_j2_eci, gravity_pointmass_eci, J2_EARTH, R_EARTH};
use crate::time::JulianDate;

/// Trait for orbit propagation engines.
///
/// Implementations advance a state to an arbitrary `date`, forward or backward
/// depending on the sign of `date - state.date`. The input is never modified.
pub trait Propagator: Send + Sync {
    fn propagate(&self, state: &OrbitalState, date: JulianDate) -> Result<OrbitalState>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

// ---------------------------------------------------------------------------
// Analytical propagation (two-body, optionally with secular J2 drift)
// ---------------------------------------------------------------------------

/// Keplerian motion with optional secular J2 rates for RAAN, argument of
/// perigee and mean anomaly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnalyticalPropagator {
    pub j2: bool,
}

impl AnalyticalPropagator {
    pub fn j2() -> Self {
        AnalyticalPropagator { j2: true }
    }

    pub fn two_body() -> Self {
        AnalyticalPropagator { j2: false }
    }
}

impl Propagator for AnalyticalPropagator {
    fn propagate(&self, state: &OrbitalState, date: JulianDate) -> Result<OrbitalState> {
        let dt = date.seconds_since(state.date);
        let kep = state.keplerian();

        if !(kep.ecc < 1.0) || kep.sma <= 0.0 {
            return Err(engine_error!(
                "cannot propagate non-elliptical orbit (ecc={}, sma={} km)",
                kep.ecc,
                kep.sma
            ));
        }

        let n = kep.mean_motion();
        let (raan_dot, argp_dot, m_dot) = if self.j2 {
            let p = kep.sma * (1.0 - kep.ecc * kep.ecc);
            let k = 1.5 * J2_EARTH * (R_EARTH / p).powi(2) * n;
            let sin2_inc = kep.inc.sin().powi(2);
            (
                -k * kep.inc.cos(),
                k * (2.0 - 2.5 * sin2_inc),
                n + k * (1.0 - kep.ecc * kep.ecc).sqrt() * (1.0 - 1.5 * sin2_inc),
            )
        } else {
            (0.0, 0.0, n)
        };

        let mean_anom = kep.mean_anomaly() + m_dot * dt;
        let advanced = KeplerianElements {
            raan: (kep.raan + raan_dot * dt).rem_euclid(TAU),
            argp: (kep.argp + argp_dot * dt).rem_euclid(TAU),
            true_anom: mean_to_true(mean_anom, kep.ecc),
            ..kep
        };

        Ok(OrbitalState::from_keplerian(date, &advanced))
    }

    fn name(&self) -> &str {
        if self.j2 { "J2 analytical" } else { "two-body" }
    }
}

// ---------------------------------------------------------------------------
// Numerical propagation (RK4 on point-mass or J2 gravity)
// ---------------------------------------------------------------------------

/// Fixed-step RK4 integration. The interval to the target date is split into
/// equal sub-steps no longer than `max_step` seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NumericalPropagator {
    pub max_step: f64, // s
    pub j2: bool,
}

impl Default for NumericalPropagator {
    fn default() -> Self {
        NumericalPropagator { max_step: 10.0, j2: true }
    }
}

/// RK4 step for orbital propagation. `dt` may be negative.
fn rk4_orbital_step(
    state: &OrbitalState,
    dt: f64,
    accel_fn: &dyn Fn(&Vector3<f64>) -> Vector3<f64>,
) -> OrbitalState {
    let deriv = |pos: &Vector3<f64>, vel: &Vector3<f64>| -> (Vector3<f64>, Vector3<f64>) {
        (*vel, accel_fn(pos))
    };

    let (k1_dr, k1_dv) = deriv(&state.pos, &state.vel);
    let (k2_dr, k2_dv) = deriv(
        &(state.pos + k1_dr * dt * 0.5),
        &(state.vel + k1_dv * dt * 0.5),
    );
    let (k3_dr, k3_dv) = deriv(
        &(state.pos + k2_dr * dt * 0.5),
        &(state.vel + k2_dv * dt * 0.5),
    );
    let (k4_dr, k4_dv) = deriv(
        &(state.pos + k3_dr * dt),
        &(state.vel + k3_dv * dt),
    );

    OrbitalState {
        date: state.date.add_seconds(dt),
        pos: state.pos + (k1_dr + 2.0 * k2_dr + 2.0 * k3_dr + k4_dr) * (dt / 6.0),
        vel: state.vel + (k1_dv + 2.0 * k2_dv + 2.0 * k3_dv + k4_dv) * (dt / 6.0),
    }
}

impl Propagator for NumericalPropagator {
    fn propagate(&self, state: &OrbitalState, date: JulianDate) -> Result<OrbitalState> {
        if !(self.max_step > 0.0) {
            return Err(engine_error!(
                "numerical propagator needs a positive max step, got {}",
                self.max_step
            ));
        }

        let accel_fn: Box<dyn Fn(&Vector3<f64>) -> Vector3<f64>> = if self.j2 {
            Box::new(|pos: &Vector3<f64>| gravity_j2_eci(pos))
        } else {
            Box::new(|pos: &Vector3<f64>| gravity_pointmass_eci(pos))
        };

        let total = date.seconds_since(state.date);
        let n_steps = (total.abs() / self.max_step).ceil() as usize;
        let mut current = *state;

        if n_steps > 0 {
            let h = total / n_steps as f64;
            for _ in 0..n_steps {
                current = rk4_orbital_step(&current, h, &*accel_fn);
                if current.pos.norm() < R_EARTH {
                    return Err(engine_error!(
                        "trajectory dropped below the Earth surface at JD {}",
                        current.date
                    ));
                }
            }
        }

        // pin the date exactly, sub-step sums accumulate rounding
        current.date = date;
        Ok(current)
    }

    fn name(&self) -> &str {
        "numerical RK4"
    }
}
