use serde::{Deserialize, Serialize};

use crate::mission::resolution::FootprintGeometry;
use crate::orbital::{ConstellationMember, OrbitalState};

// ---------------------------------------------------------------------------
// Instruments
// ---------------------------------------------------------------------------

/// Angular extent an instrument can point into, full angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOfRegard {
    pub along_track: f64,
    #[serde(default)]
    pub cross_track: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentMode {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default)]
    pub field_of_regard: Option<FieldOfRegard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default, rename = "mode")]
    pub modes: Vec<InstrumentMode>,
}

impl Instrument {
    pub fn new(id: impl Into<String>) -> Self {
        Instrument { id: id.into(), modes: vec![] }
    }

    pub fn mode(mut self, id: impl Into<String>, field_of_regard: Option<FieldOfRegard>) -> Self {
        self.modes.push(InstrumentMode { id: id.into(), field_of_regard });
        self
    }
}

// ---------------------------------------------------------------------------
// Spacecraft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Spacecraft {
    pub id: String,
    pub name: String,
    pub orbit: OrbitalState, // defining state, its date is the orbit epoch
    pub instruments: Vec<Instrument>,
}

impl Spacecraft {
    pub fn new(id: impl Into<String>, orbit: OrbitalState) -> Self {
        let id = id.into();
        Spacecraft { name: id.clone(), id, orbit, instruments: vec![] }
    }

    pub fn from_member(member: &ConstellationMember) -> Self {
        Spacecraft::new(member.id.clone(), member.orbit_state())
    }

    pub fn instrument(mut self, instrument: Instrument) -> Self {
        self.instruments.push(instrument);
        self
    }

    /// Footprint geometry entries for step-size selection: one per instrument
    /// mode, a full-horizon entry for instruments without modes or spacecraft
    /// without instruments.
    pub fn footprint_geometry(&self) -> Vec<FootprintGeometry> {
        let sma = self.orbit.keplerian().sma;
        let mut entries: Vec<FootprintGeometry> = self
            .instruments
            .iter()
            .flat_map(|instru| {
                let mut fors: Vec<Option<f64>> = instru
                    .modes
                    .iter()
                    .map(|m| m.field_of_regard.map(|f| f.along_track))
                    .collect();
                if fors.is_empty() {
                    fors.push(None);
                }
                fors
            })
            .map(|along_track| FootprintGeometry { sma, along_track })
            .collect();

        if entries.is_empty() {
            entries.push(FootprintGeometry { sma, along_track: None });
        }
        entries
    }
}
