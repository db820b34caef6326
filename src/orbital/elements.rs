use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;

use crate::physics::gravity::{MU_EARTH, R_EARTH};

/// eccentricity / node-vector ratio below which an orbit counts as circular / equatorial
const SINGULARITY_EPS: f64 = 1e-11;

/// Classical Keplerian orbital elements.
///
/// For circular orbits `argp` is 0 and `true_anom` holds the argument of latitude;
/// for equatorial orbits `raan` is 0 and `argp` holds the longitude of periapsis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerianElements {
    pub sma: f64,       // semi-major axis, km
    pub ecc: f64,       // eccentricity (0 = circular)
    pub inc: f64,       // inclination, rad
    pub raan: f64,      // right ascension of ascending node, rad
    pub argp: f64,      // argument of periapsis, rad
    pub true_anom: f64, // true anomaly, rad
}

impl KeplerianElements {
    /// Build from degree-valued angles (the file and configuration convention).
    pub fn from_degrees(
        sma: f64,
        ecc: f64,
        inc: f64,
        raan: f64,
        argp: f64,
        true_anom: f64,
    ) -> Self {
        KeplerianElements {
            sma,
            ecc,
            inc: inc.to_radians(),
            raan: raan.to_radians(),
            argp: argp.to_radians(),
            true_anom: true_anom.to_radians(),
        }
    }

    /// `[sma, ecc, inc, raan, argp, true_anom]` with angles in degrees.
    pub fn to_degrees(&self) -> [f64; 6] {
        [
            self.sma,
            self.ecc,
            self.inc.to_degrees(),
            self.raan.to_degrees(),
            self.argp.to_degrees(),
            self.true_anom.to_degrees(),
        ]
    }

    /// Convert Keplerian elements to ECI state vector (position km, velocity km/s).
    pub fn to_state_vector(&self) -> (Vector3<f64>, Vector3<f64>) {
        self.to_state_vector_mu(MU_EARTH)
    }

    /// Convert with explicit gravitational parameter.
    pub fn to_state_vector_mu(&self, mu: f64) -> (Vector3<f64>, Vector3<f64>) {
        let p = self.sma * (1.0 - self.ecc * self.ecc); // semi-latus rectum
        let r_pqw = p / (1.0 + self.ecc * self.true_anom.cos());

        // Position in perifocal frame (PQW)
        let r_pqw_vec = Vector3::new(
            r_pqw * self.true_anom.cos(),
            r_pqw * self.true_anom.sin(),
            0.0,
        );

        // Velocity in perifocal frame
        let sqrt_mu_p = (mu / p).sqrt();
        let v_pqw_vec = Vector3::new(
            -sqrt_mu_p * self.true_anom.sin(),
            sqrt_mu_p * (self.ecc + self.true_anom.cos()),
            0.0,
        );

        // Rotation matrix from PQW to ECI
        let cos_raan = self.raan.cos();
        let sin_raan = self.raan.sin();
        let cos_argp = self.argp.cos();
        let sin_argp = self.argp.sin();
        let cos_inc = self.inc.cos();
        let sin_inc = self.inc.sin();

        let rot = |v: &Vector3<f64>| -> Vector3<f64> {
            Vector3::new(
                (cos_raan * cos_argp - sin_raan * sin_argp * cos_inc) * v.x
                    + (-cos_raan * sin_argp - sin_raan * cos_argp * cos_inc) * v.y,
                (sin_raan * cos_argp + cos_raan * sin_argp * cos_inc) * v.x
                    + (-sin_raan * sin_argp + cos_raan * cos_argp * cos_inc) * v.y,
                (sin_argp * sin_inc) * v.x + (cos_argp * sin_inc) * v.y,
            )
        };

        (rot(&r_pqw_vec), rot(&v_pqw_vec))
    }

    /// Convert ECI state vector to Keplerian elements.
    pub fn from_state_vector(pos: &Vector3<f64>, vel: &Vector3<f64>) -> Self {
        Self::from_state_vector_mu(pos, vel, MU_EARTH)
    }

    /// Convert with explicit gravitational parameter.
    pub fn from_state_vector_mu(pos: &Vector3<f64>, vel: &Vector3<f64>, mu: f64) -> Self {
        let r = pos.norm();
        let v = vel.norm();

        // Angular momentum
        let h = pos.cross(vel);
        let h_mag = h.norm();
        let prograde = h.z >= 0.0;

        // Node vector
        let n = Vector3::new(-h.y, h.x, 0.0);
        let n_mag = n.norm();

        // Eccentricity vector
        let e_vec = ((v * v - mu / r) * pos - pos.dot(vel) * vel) / mu;
        let ecc = e_vec.norm();

        // Semi-major axis
        let energy = 0.5 * v * v - mu / r;
        let sma = if ecc < 1.0 - 1e-10 {
            -mu / (2.0 * energy)
        } else {
            h_mag * h_mag / (mu * (1.0 - ecc * ecc).abs())
        };

        // Inclination
        let inc = (h.z / h_mag).clamp(-1.0, 1.0).acos();

        let circular = ecc < SINGULARITY_EPS;
        let equatorial = n_mag < SINGULARITY_EPS * h_mag;

        // RAAN
        let raan = if equatorial { 0.0 } else { n.y.atan2(n.x).rem_euclid(TAU) };

        // in-plane longitude measured from the x axis, folded for retrograde planes
        let plane_longitude = |v: &Vector3<f64>| -> f64 {
            let l = v.y.atan2(v.x);
            if prograde { l.rem_euclid(TAU) } else { (-l).rem_euclid(TAU) }
        };

        // Argument of periapsis and true anomaly
        let (argp, true_anom) = match (circular, equatorial) {
            (false, false) => {
                let w = angle_between(&n, &e_vec);
                let argp = if e_vec.z < 0.0 { TAU - w } else { w };
                (argp, true_anomaly(&e_vec, pos, vel))
            }
            (false, true) => (plane_longitude(&e_vec), true_anomaly(&e_vec, pos, vel)),
            (true, false) => {
                // argument of latitude
                let u = angle_between(&n, pos);
                (0.0, if pos.z < 0.0 { TAU - u } else { u })
            }
            (true, true) => (0.0, plane_longitude(pos)),
        };

        KeplerianElements {
            sma,
            ecc,
            inc,
            raan,
            argp,
            true_anom,
        }
    }

    /// Mean motion (rad/s).
    pub fn mean_motion(&self) -> f64 {
        (MU_EARTH / self.sma.powi(3)).sqrt()
    }

    /// Orbital period for elliptical orbit (s).
    pub fn period(&self) -> f64 {
        self.period_mu(MU_EARTH)
    }

    pub fn period_mu(&self, mu: f64) -> f64 {
        TAU * (self.sma.powi(3) / mu).sqrt()
    }

    pub fn mean_anomaly(&self) -> f64 {
        true_to_mean(self.true_anom, self.ecc)
    }

    /// Create a circular orbit at given altitude (km) and inclination (rad).
    pub fn circular(altitude: f64, inc: f64) -> Self {
        KeplerianElements {
            sma: R_EARTH + altitude,
            ecc: 0.0,
            inc,
            raan: 0.0,
            argp: 0.0,
            true_anom: 0.0,
        }
    }
}

fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.cross(b).norm().atan2(a.dot(b))
}

fn true_anomaly(e_vec: &Vector3<f64>, pos: &Vector3<f64>, vel: &Vector3<f64>) -> f64 {
    let nu = angle_between(e_vec, pos);
    if pos.dot(vel) < 0.0 { TAU - nu } else { nu }
}

// ---------------------------------------------------------------------------
// Anomaly conversions (elliptical orbits)
// ---------------------------------------------------------------------------

/// True anomaly -> mean anomaly, rad in [0, 2pi).
pub fn true_to_mean(true_anom: f64, ecc: f64) -> f64 {
    let ea = ((1.0 - ecc * ecc).sqrt() * true_anom.sin()).atan2(ecc + true_anom.cos());
    (ea - ecc * ea.sin()).rem_euclid(TAU)
}

/// Mean anomaly -> true anomaly, rad in [0, 2pi). Newton iteration on Kepler's equation.
pub fn mean_to_true(mean_anom: f64, ecc: f64) -> f64 {
    let m = mean_anom.rem_euclid(TAU);
    let mut ea = if ecc > 0.8 { PI } else { m };
    for _ in 0..50 {
        let delta = (ea - ecc * ea.sin() - m) / (1.0 - ecc * ea.cos());
        ea -= delta;
        if delta.abs() < 1e-14 {
            break;
        }
    }
    ((1.0 - ecc * ecc).sqrt() * ea.sin())
        .atan2(ea.cos() - ecc)
        .rem_euclid(TAU)
}
