use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Earth constants (km based)
// ---------------------------------------------------------------------------

pub const MU_EARTH: f64 = 398_600.441_8;  // km^3/s^2
pub const R_EARTH: f64 = 6_378.137;       // equatorial radius, km
pub const J2_EARTH: f64 = 1.082_63e-3;

// ---------------------------------------------------------------------------
// Gravity models (ECI frame, used by the numerical propagator)
// ---------------------------------------------------------------------------

/// J2 gravitational acceleration in ECI frame (km/s^2).
/// `pos` is the position vector in ECI coordinates (km).
pub fn gravity_j2_eci(pos: &Vector3<f64>) -> Vector3<f64> {
    let r = pos.norm();
    if r < 1e-3 {
        return Vector3::zeros();
    }
    let r2 = r * r;
    let z2 = pos.z * pos.z;

    let mu_over_r3 = MU_EARTH / (r2 * r);
    let j2_coeff = 1.5 * J2_EARTH * R_EARTH * R_EARTH / r2;

    let xy_factor = mu_over_r3 * (1.0 + j2_coeff * (1.0 - 5.0 * z2 / r2));
    let z_factor = mu_over_r3 * (1.0 + j2_coeff * (3.0 - 5.0 * z2 / r2));

    Vector3::new(-xy_factor * pos.x, -xy_factor * pos.y, -z_factor * pos.z)
}

/// Point-mass gravity in ECI (no J2), km/s^2.
pub fn gravity_pointmass_eci(pos: &Vector3<f64>) -> Vector3<f64> {
    let r = pos.norm();
    if r < 1e-3 {
        return Vector3::zeros();
    }
    -MU_EARTH / (r * r * r) * pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_gravity_magnitude() {
        let g = gravity_pointmass_eci(&Vector3::new(R_EARTH, 0.0, 0.0)).norm();
        // ~9.8 m/s^2
        assert!((g - 0.009_8).abs() < 1e-4, "surface gravity {:.6} km/s^2", g);
    }

    #[test]
    fn j2_close_to_pointmass_at_leo() {
        let pos = Vector3::new(R_EARTH + 400.0, 0.0, 0.0);
        let a_j2 = gravity_j2_eci(&pos);
        let a_pm = gravity_pointmass_eci(&pos);
        // J2 correction is small (~0.1% at LEO)
        let diff = (a_j2 - a_pm).norm() / a_pm.norm();
        assert!(diff < 0.01, "J2 correction should be <1% at LEO, got {:.4}%", diff * 100.0);
    }

    #[test]
    fn j2_pulls_toward_equator() {
        let pos = Vector3::new(R_EARTH + 400.0, 0.0, R_EARTH);
        let a_j2 = gravity_j2_eci(&pos);
        let a_pm = gravity_pointmass_eci(&pos);
        // extra acceleration at high latitude has a -z component (oblate bulge)
        assert!(a_j2.z < a_pm.z);
    }
}
