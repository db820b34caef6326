use serde::{Deserialize, Serialize};

use crate::error::{config_error, Result};
use crate::orbital::elements::{mean_to_true, KeplerianElements};
use crate::orbital::state::OrbitalState;
use crate::physics::gravity::R_EARTH;
use crate::time::JulianDate;

// ---------------------------------------------------------------------------
// Constellation members
// ---------------------------------------------------------------------------

/// One generated satellite. `plane` and `slot` are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstellationMember {
    pub id: String,
    pub plane: usize,
    pub slot: usize,
    pub epoch: JulianDate,
    pub elements: KeplerianElements,
}

impl ConstellationMember {
    pub fn orbit_state(&self) -> OrbitalState {
        OrbitalState::from_keplerian(self.epoch, &self.elements)
    }
}

/// Trait for constellation generators. Generation is deterministic: identical
/// parameters always produce the same ordered member list.
pub trait Constellation: Send + Sync {
    fn id(&self) -> &str;

    fn generate(&self) -> Result<Vec<ConstellationMember>>;
}

fn default_planes() -> usize {
    1
}

fn default_spacing() -> f64 {
    1.0
}

fn default_walker_id() -> String {
    "walker".into()
}

fn default_train_id() -> String {
    "train".into()
}

fn default_epoch() -> JulianDate {
    JulianDate::J2000
}

// ---------------------------------------------------------------------------
// Walker-Delta
// ---------------------------------------------------------------------------

/// Walker-Delta pattern T/P/F. Angles in degrees, altitude in km.
///
/// Planes are spread over 180 deg of RAAN (`p * 180 / P`), which is what the
/// mission fixtures are built on, not the textbook 360 deg.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkerDeltaConstellation {
    #[serde(rename = "@id", default = "default_walker_id")]
    pub id: String,
    pub number_satellites: usize,
    #[serde(default = "default_planes")]
    pub number_planes: usize,
    #[serde(default = "default_spacing")]
    pub relative_spacing: f64,
    pub alt: f64,
    #[serde(default)]
    pub ecc: f64,
    pub inc: f64,
    #[serde(default)]
    pub aop: f64,
    #[serde(rename = "date", default = "default_epoch")]
    pub epoch: JulianDate,
}

impl WalkerDeltaConstellation {
    pub fn sats_per_plane(&self) -> usize {
        if self.number_planes == 0 {
            return 0;
        }
        self.number_satellites / self.number_planes
    }

    fn validate(&self) -> Result<()> {
        if self.number_satellites == 0 {
            return Err(config_error!(
                "constellation '{}': numberSatellites must be positive",
                self.id
            ));
        }
        if self.number_planes == 0 || self.number_satellites % self.number_planes != 0 {
            return Err(config_error!(
                "constellation '{}': numberSatellites ({}) is not divisible by numberPlanes ({})",
                self.id,
                self.number_satellites,
                self.number_planes
            ));
        }
        if !(self.alt > 0.0) {
            return Err(config_error!(
                "constellation '{}': altitude must be positive, got {}",
                self.id,
                self.alt
            ));
        }
        if !(0.0..1.0).contains(&self.ecc) {
            return Err(config_error!(
                "constellation '{}': eccentricity {} outside [0,1)",
                self.id,
                self.ecc
            ));
        }
        Ok(())
    }
}

impl Constellation for WalkerDeltaConstellation {
    fn id(&self) -> &str {
        &self.id
    }

    fn generate(&self) -> Result<Vec<ConstellationMember>> {
        self.validate()?;

        let n_planes = self.number_planes;
        let n_sats = self.number_satellites;
        let sats_per_plane = self.sats_per_plane();
        let sma = R_EARTH + self.alt;

        let mut members = Vec::with_capacity(n_sats);
        for p in 0..n_planes {
            let raan = p as f64 * 180.0 / n_planes as f64;
            let ref_true_anom = p as f64 * self.relative_spacing * 360.0 / n_sats as f64;

            for s in 0..sats_per_plane {
                let true_anom = (ref_true_anom + s as f64 * 360.0 / sats_per_plane as f64)
                    .rem_euclid(360.0);
                let elements = KeplerianElements::from_degrees(
                    sma,
                    self.ecc,
                    self.inc,
                    raan,
                    self.aop,
                    true_anom,
                );
                members.push(ConstellationMember {
                    id: format!("{}_{}_{}", self.id, p + 1, s + 1),
                    plane: p + 1,
                    slot: s + 1,
                    epoch: self.epoch,
                    elements,
                });
            }
        }

        tracing::debug!(
            "constellation '{}': {} satellites in {} planes",
            self.id,
            members.len(),
            n_planes
        );
        Ok(members)
    }
}

// ---------------------------------------------------------------------------
// Train (leader/follower string on one orbit)
// ---------------------------------------------------------------------------

/// Reference orbit of a train, angles in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReferenceOrbit {
    pub sma: f64,
    #[serde(default)]
    pub ecc: f64,
    pub inc: f64,
    #[serde(default)]
    pub raan: f64,
    #[serde(default)]
    pub aop: f64,
    #[serde(default)]
    pub ta: f64,
}

/// `number_satellites` spacecraft on the same orbit, each passing a given point
/// `interval` seconds after its predecessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainConstellation {
    #[serde(rename = "@id", default = "default_train_id")]
    pub id: String,
    pub number_satellites: usize,
    pub interval: f64, // s
    pub orbit: ReferenceOrbit,
    #[serde(rename = "date", default = "default_epoch")]
    pub epoch: JulianDate,
}

impl Constellation for TrainConstellation {
    fn id(&self) -> &str {
        &self.id
    }

    fn generate(&self) -> Result<Vec<ConstellationMember>> {
        if self.number_satellites == 0 {
            return Err(config_error!("train '{}': numberSatellites must be positive", self.id));
        }
        if !(self.orbit.sma > R_EARTH) || !(0.0..1.0).contains(&self.orbit.ecc) {
            return Err(config_error!(
                "train '{}': invalid reference orbit {:?}",
                self.id,
                self.orbit
            ));
        }

        let o = &self.orbit;
        let leader = KeplerianElements::from_degrees(o.sma, o.ecc, o.inc, o.raan, o.aop, o.ta);
        let n = leader.mean_motion();
        let m0 = leader.mean_anomaly();

        let members = (0..self.number_satellites)
            .map(|k| {
                let mean_anom = m0 - n * k as f64 * self.interval;
                ConstellationMember {
                    id: format!("{}_1_{}", self.id, k + 1),
                    plane: 1,
                    slot: k + 1,
                    epoch: self.epoch,
                    elements: KeplerianElements {
                        true_anom: mean_to_true(mean_anom, o.ecc),
                        ..leader
                    },
                }
            })
            .collect();

        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walker(t: usize, p: usize, f: f64) -> WalkerDeltaConstellation {
        WalkerDeltaConstellation {
            id: "wd".into(),
            number_satellites: t,
            number_planes: p,
            relative_spacing: f,
            alt: 700.0,
            ecc: 0.001,
            inc: 98.0,
            aop: 10.0,
            epoch: JulianDate::new(2_458_265.0),
        }
    }

    fn deg(members: &[ConstellationMember], f: impl Fn(&KeplerianElements) -> f64) -> Vec<f64> {
        members.iter().map(|m| f(&m.elements).to_degrees()).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// true anomaly of `to` ahead of `from`, degrees in [0, 360)
    fn ta_ahead(from: &ConstellationMember, to: &ConstellationMember) -> f64 {
        (to.elements.true_anom - from.elements.true_anom)
            .to_degrees()
            .rem_euclid(360.0)
    }

    #[test]
    fn six_three_two_example() {
        let members = walker(6, 3, 2.0).generate().unwrap();
        assert_eq!(members.len(), 6);

        let raan = deg(&members, |e| e.raan);
        let ta = deg(&members, |e| e.true_anom);
        let expected_raan = [0.0, 0.0, 60.0, 60.0, 120.0, 120.0];
        let expected_ta = [0.0, 180.0, 120.0, 300.0, 240.0, 60.0];
        for i in 0..6 {
            assert!(close(raan[i], expected_raan[i]), "RAAN[{}] = {}", i, raan[i]);
            assert!(close(ta[i], expected_ta[i]), "TA[{}] = {}", i, ta[i]);
        }

        assert_eq!(members[0].id, "wd_1_1");
        assert_eq!(members[5].id, "wd_3_2");
        assert_eq!((members[3].plane, members[3].slot), (2, 2));
    }

    #[test]
    fn walker_invariants_hold() {
        let (t, p, f) = (24, 4, 1.0);
        let members = walker(t, p, f).generate().unwrap();
        let s = t / p;
        assert_eq!(members.len(), t);

        for m in &members {
            assert!(close(m.elements.sma, R_EARTH + 700.0));
            assert!(close(m.elements.ecc, 0.001));
            assert!(close(m.elements.inc.to_degrees(), 98.0));
        }

        for plane in members.chunks(s) {
            let raan0 = plane[0].elements.raan;
            assert!(plane.iter().all(|m| m.elements.raan == raan0), "RAAN varies within plane");
            for pair in plane.windows(2) {
                let step = ta_ahead(&pair[0], &pair[1]);
                assert!(close(step, 360.0 / s as f64), "in-plane TA step {}", step);
            }
        }

        for (a, b) in members.chunks(s).zip(members.chunks(s).skip(1)) {
            let d_raan = (b[0].elements.raan - a[0].elements.raan).to_degrees();
            assert!(close(d_raan, 180.0 / p as f64), "RAAN step {}", d_raan);
            let phase = ta_ahead(&a[0], &b[0]);
            assert!(close(phase, f * 360.0 / t as f64), "phase offset {}", phase);
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let c = walker(12, 3, 1.0);
        assert_eq!(c.generate().unwrap(), c.generate().unwrap());
    }

    #[test]
    fn indivisible_plane_count_is_rejected() {
        let err = walker(7, 3, 1.0).generate().unwrap_err();
        assert!(err.to_string().contains("not divisible"), "{}", err);
        assert!(walker(6, 0, 1.0).generate().is_err());
        assert!(walker(0, 1, 1.0).generate().is_err());
    }

    #[test]
    fn walker_defaults_from_json() {
        let json = r#"{ "numberSatellites": 4, "alt": 500, "inc": 45 }"#;
        let c: WalkerDeltaConstellation = serde_json::from_str(json).unwrap();
        assert_eq!(c.number_planes, 1);
        assert_eq!(c.relative_spacing, 1.0);
        assert_eq!(c.ecc, 0.0);
        assert_eq!(c.id, "walker");
        assert_eq!(c.epoch, JulianDate::J2000);
        assert_eq!(c.generate().unwrap().len(), 4);
    }

    #[test]
    fn train_members_trail_by_interval() {
        let train = TrainConstellation {
            id: "tr".into(),
            number_satellites: 3,
            interval: 60.0,
            orbit: ReferenceOrbit {
                sma: 7078.137,
                ecc: 0.0,
                inc: 98.0,
                raan: 0.0,
                aop: 0.0,
                ta: 90.0,
            },
            epoch: JulianDate::J2000,
        };
        let members = train.generate().unwrap();
        assert_eq!(members.len(), 3);
        let n_deg = members[0].elements.mean_motion().to_degrees();
        for pair in members.windows(2) {
            let lag = ta_ahead(&pair[1], &pair[0]);
            assert!((lag - n_deg * 60.0).abs() < 1e-9, "lag {} deg", lag);
        }
        assert_eq!(members[2].id, "tr_1_3");
    }
}
