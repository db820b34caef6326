use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{config_error, Result};
use crate::mission::spacecraft::{Instrument, Spacecraft};
use crate::orbital::{KeplerianElements, OrbitalState, Propagator};
use crate::time::JulianDate;

pub mod factory;

pub use factory::{Factories, Factory};

// ---------------------------------------------------------------------------
// Mission configuration (JSON)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionConfig {
    /// Propagation start, index 0 of every state series.
    pub epoch: EpochConfig,

    #[serde(default = "default_duration")]
    pub duration: f64, // days

    #[serde(default)]
    pub spacecraft: Vec<SpacecraftConfig>,

    /// Tagged constellation specification, its members join `spacecraft`.
    #[serde(default)]
    pub constellation: Option<Value>,

    /// Instruments carried by every constellation member.
    #[serde(default, rename = "instrument")]
    pub constellation_instruments: Vec<Instrument>,

    #[serde(default = "default_propagator")]
    pub propagator: Value,

    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_resolution_factor")]
    pub resolution_factor: f64,

    /// Fixed propagation step in seconds, overrides the resolution selector.
    #[serde(default)]
    pub step_size: Option<f64>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_true")]
    pub keplerian_output: bool,

    /// Propagation worker threads, defaults to the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
}

fn default_duration() -> f64 {
    1.0
}

fn default_propagator() -> Value {
    serde_json::json!({ "@type": factory::J2_ANALYTICAL })
}

fn default_resolution_factor() -> f64 {
    0.25
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resolution_factor: default_resolution_factor(),
            step_size: None,
            output_dir: default_output_dir(),
            keplerian_output: true,
            workers: None,
        }
    }
}

/// Either a Julian Date (UT1) or an RFC 3339 UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpochConfig {
    Julian(f64),
    Calendar(DateTime<Utc>),
}

impl EpochConfig {
    pub fn julian_date(&self) -> JulianDate {
        match self {
            EpochConfig::Julian(jd) => JulianDate::new(*jd),
            EpochConfig::Calendar(dt) => JulianDate::from_datetime(dt),
        }
    }
}

// ---------------------------------------------------------------------------
// Spacecraft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacecraftConfig {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub orbit_state: OrbitStateConfig,
    #[serde(default, rename = "instrument")]
    pub instruments: Vec<Instrument>,
}

/// Orbit state with its own epoch (`date`, defaults to the mission epoch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitStateConfig {
    #[serde(default)]
    pub date: Option<EpochConfig>,
    #[serde(flatten)]
    pub state: OrbitStateKind,
}

/// Angles in degrees, lengths in km.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum OrbitStateKind {
    #[serde(rename = "KEPLERIAN_EARTH_CENTERED_INERTIAL")]
    Keplerian { sma: f64, ecc: f64, inc: f64, raan: f64, aop: f64, ta: f64 },
    #[serde(rename = "CARTESIAN_EARTH_CENTERED_INERTIAL")]
    Cartesian { x: f64, y: f64, z: f64, vx: f64, vy: f64, vz: f64 },
}

impl SpacecraftConfig {
    pub fn to_spacecraft(&self, mission_epoch: JulianDate) -> Result<Spacecraft> {
        let date = self.orbit_state.date.map_or(mission_epoch, |d| d.julian_date());
        let orbit = match self.orbit_state.state {
            OrbitStateKind::Keplerian { sma, ecc, inc, raan, aop, ta } => {
                if !(0.0..1.0).contains(&ecc) {
                    return Err(config_error!(
                        "spacecraft '{}': eccentricity {} outside [0,1)",
                        self.id,
                        ecc
                    ));
                }
                let elements = KeplerianElements::from_degrees(sma, ecc, inc, raan, aop, ta);
                OrbitalState::from_keplerian(date, &elements)
            }
            OrbitStateKind::Cartesian { x, y, z, vx, vy, vz } => {
                OrbitalState::from_cartesian(date, &[x, y, z, vx, vy, vz])
            }
        };

        let mut sc = Spacecraft::new(self.id.clone(), orbit);
        if let Some(name) = &self.name {
            sc.name = name.clone();
        }
        sc.instruments = self.instruments.clone();
        Ok(sc)
    }
}

// ---------------------------------------------------------------------------
// Loading and resolution
// ---------------------------------------------------------------------------

impl MissionConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        tracing::info!("loaded mission configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: MissionConfig = serde_json::from_str(content)
            .map_err(|e| config_error!("mission configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(self.duration >= 0.0) {
            return Err(config_error!(
                "mission duration must not be negative, got {} days",
                self.duration
            ));
        }
        let f = self.settings.resolution_factor;
        if !(f > 0.0 && f <= 1.0) {
            return Err(config_error!("resolution factor must be in (0,1], got {}", f));
        }
        if let Some(step) = self.settings.step_size {
            if !(step > 0.0) {
                return Err(config_error!("step size must be positive, got {}", step));
            }
        }
        if self.settings.workers == Some(0) {
            return Err(config_error!("worker count must be at least 1"));
        }
        Ok(())
    }

    pub fn mission_epoch(&self) -> JulianDate {
        self.epoch.julian_date()
    }

    pub fn build_propagator(&self, factories: &Factories) -> Result<Box<dyn Propagator>> {
        factories.propagators.build(&self.propagator)
    }

    /// Explicit spacecraft followed by constellation members. Ids must be unique.
    pub fn resolve_spacecraft(&self, factories: &Factories) -> Result<Vec<Spacecraft>> {
        let epoch = self.mission_epoch();
        let mut fleet = self
            .spacecraft
            .iter()
            .map(|sc| sc.to_spacecraft(epoch))
            .collect::<Result<Vec<_>>>()?;

        if let Some(spec) = &self.constellation {
            let constellation = factories.constellations.build(spec)?;
            for member in constellation.generate()? {
                let mut sc = Spacecraft::from_member(&member);
                sc.instruments = self.constellation_instruments.clone();
                fleet.push(sc);
            }
        }

        if fleet.is_empty() {
            return Err(config_error!("mission has no spacecraft"));
        }
        let mut seen = HashSet::new();
        for sc in &fleet {
            if !seen.insert(sc.id.as_str()) {
                return Err(config_error!("duplicate spacecraft id '{}'", sc.id));
            }
        }
        Ok(fleet)
    }
}
