use std::f64::consts::FRAC_PI_2;

use nalgebra::Vector3;

use crate::error::{engine_error, Result};
use crate::instrument::{InstrumentModel, MetricRecord, TargetCoords};
use crate::orbital::OrbitalState;
use crate::physics::gravity::R_EARTH;
use crate::time::{JulianDate, JD_J2000};

pub const RANGE: &str = "observation range [km]";
pub const LOOK_ANGLE: &str = "look angle [deg]";
pub const INCIDENCE_ANGLE: &str = "incidence angle [deg]";
pub const SOLAR_ZENITH: &str = "solar zenith [deg]";
pub const DAYLIGHT: &str = "daylight";

/// Viewing-geometry metrics for a generic sensor on a spherical Earth.
///
/// Every mode produces the same five fields. With an empty mode list any mode
/// id (or none) is accepted.
#[derive(Debug, Clone)]
pub struct BasicSensorModel {
    pub id: String,
    pub modes: Vec<String>,
}

impl BasicSensorModel {
    pub fn new(id: impl Into<String>) -> Self {
        BasicSensorModel { id: id.into(), modes: vec![] }
    }

    pub fn with_modes<I, S>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modes.extend(modes.into_iter().map(Into::into));
        self
    }
}

impl InstrumentModel for BasicSensorModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn calc_data_metrics(
        &self,
        mode_id: Option<&str>,
        state: &OrbitalState,
        target: &TargetCoords,
    ) -> Result<MetricRecord> {
        if let Some(mode) = mode_id {
            if !self.modes.is_empty() && !self.modes.iter().any(|m| m == mode) {
                return Err(engine_error!("instrument '{}' has no mode '{}'", self.id, mode));
            }
        }
        if state.pos.norm() <= R_EARTH {
            return Err(engine_error!(
                "spacecraft position {:.1} km is inside the Earth",
                state.pos.norm()
            ));
        }

        let target_eci = target_position_eci(target, state.date);
        let rho = target_eci - state.pos; // sat -> target
        let range = rho.norm();
        let target_up = target_eci.normalize();

        let look = angle_between(&-state.pos, &rho);
        let incidence = angle_between(&target_up, &-rho);
        let solar_zenith = angle_between(&target_up, &sun_direction_eci(state.date));

        let mut record = MetricRecord::default();
        record.push(RANGE, range);
        record.push(LOOK_ANGLE, look.to_degrees());
        record.push(INCIDENCE_ANGLE, incidence.to_degrees());
        record.push(SOLAR_ZENITH, solar_zenith.to_degrees());
        record.push(DAYLIGHT, solar_zenith < FRAC_PI_2);
        Ok(record)
    }

    fn name(&self) -> &str {
        "basic sensor"
    }
}

// ---------------------------------------------------------------------------
// Geometry helpers
// ---------------------------------------------------------------------------

/// Surface point in ECI, rotating the Earth-fixed position by GMST.
pub fn target_position_eci(target: &TargetCoords, date: JulianDate) -> Vector3<f64> {
    let (lat, lon) = (target.lat_deg.to_radians(), target.lon_deg.to_radians());
    let ecef = Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()) * R_EARTH;

    let (s, c) = date.gmst().sin_cos();
    Vector3::new(c * ecef.x - s * ecef.y, s * ecef.x + c * ecef.y, ecef.z)
}

/// Low-precision solar unit vector (ECI, mean equator), ~0.01 deg.
pub fn sun_direction_eci(date: JulianDate) -> Vector3<f64> {
    let n = date.jd() - JD_J2000;
    let mean_lon = (280.460 + 0.985_647_4 * n).to_radians();
    let mean_anom = (357.528 + 0.985_600_3 * n).to_radians();
    let ecl_lon = mean_lon
        + (1.915_f64.to_radians()) * mean_anom.sin()
        + (0.020_f64.to_radians()) * (2.0 * mean_anom).sin();
    let obliquity = (23.439 - 0.000_000_4 * n).to_radians();

    Vector3::new(
        ecl_lon.cos(),
        obliquity.cos() * ecl_lon.sin(),
        obliquity.sin() * ecl_lon.sin(),
    )
}

fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a.dot(b) / (a.norm() * b.norm())).clamp(-1.0, 1.0).acos()
}
