use nalgebra::Vector3;

use crate::orbital::elements::KeplerianElements;
use crate::physics::gravity::R_EARTH;
use crate::time::JulianDate;

/// Time-stamped orbital condition (3DOF, no attitude).
///
/// A plain `Copy` value: handing a state to a propagator or another worker
/// always hands over an independent copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalState {
    pub date: JulianDate,
    pub pos: Vector3<f64>,  // km, ECI (equatorial plane)
    pub vel: Vector3<f64>,  // km/s, ECI
}

impl OrbitalState {
    pub fn new(date: JulianDate, pos: Vector3<f64>, vel: Vector3<f64>) -> Self {
        OrbitalState { date, pos, vel }
    }

    pub fn from_keplerian(date: JulianDate, elements: &KeplerianElements) -> Self {
        let (pos, vel) = elements.to_state_vector();
        OrbitalState { date, pos, vel }
    }

    pub fn keplerian(&self) -> KeplerianElements {
        KeplerianElements::from_state_vector(&self.pos, &self.vel)
    }

    /// `[x, y, z, vx, vy, vz]`
    pub fn cartesian(&self) -> [f64; 6] {
        [self.pos.x, self.pos.y, self.pos.z, self.vel.x, self.vel.y, self.vel.z]
    }

    pub fn from_cartesian(date: JulianDate, c: &[f64; 6]) -> Self {
        OrbitalState {
            date,
            pos: Vector3::new(c[0], c[1], c[2]),
            vel: Vector3::new(c[3], c[4], c[5]),
        }
    }

    pub fn altitude(&self) -> f64 {
        self.pos.norm() - R_EARTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keplerian_and_cartesian_agree() {
        let kep = KeplerianElements::from_degrees(7078.137, 0.001, 98.0, 10.0, 10.0, 33.0);
        let state = OrbitalState::from_keplerian(JulianDate::J2000, &kep);
        let back = OrbitalState::from_keplerian(state.date, &state.keplerian());
        assert!((back.pos - state.pos).norm() < 1e-6);
        assert!((back.vel - state.vel).norm() < 1e-9);
        assert!((state.altitude() - 700.0).abs() < 10.0, "altitude {:.1} km", state.altitude());
    }

    #[test]
    fn copies_are_independent() {
        let kep = KeplerianElements::circular(500.0, 0.5);
        let original = OrbitalState::from_keplerian(JulianDate::J2000, &kep);
        let mut working = original;
        working.pos.x += 100.0;
        working.date = working.date.add_seconds(60.0);
        assert_ne!(working, original);
        assert_eq!(original.date, JulianDate::J2000);
    }
}
