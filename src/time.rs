use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Time constants
// ---------------------------------------------------------------------------

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const JD_J2000: f64 = 2_451_545.0;
const JD_UNIX_EPOCH: f64 = 2_440_587.5;

// ---------------------------------------------------------------------------
// Julian date (UT1)
// ---------------------------------------------------------------------------

/// Julian Date in the UT1 timescale. UTC is used as a stand-in for UT1 when
/// converting from calendar dates (|UT1 - UTC| < 0.9 s).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JulianDate(f64);

impl JulianDate {
    pub const J2000: JulianDate = JulianDate(JD_J2000);

    pub fn new(jd: f64) -> Self {
        JulianDate(jd)
    }

    pub fn jd(&self) -> f64 {
        self.0
    }

    pub fn from_datetime<Z: TimeZone>(dt: &DateTime<Z>) -> Self {
        let unix_secs = dt.timestamp() as f64 + dt.timestamp_subsec_nanos() as f64 * 1e-9;
        JulianDate(JD_UNIX_EPOCH + unix_secs / SECONDS_PER_DAY)
    }

    /// Nearest millisecond calendar date, `None` if out of chrono's range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let millis = ((self.0 - JD_UNIX_EPOCH) * SECONDS_PER_DAY * 1000.0).round();
        Utc.timestamp_millis_opt(millis as i64).single()
    }

    pub fn add_seconds(&self, secs: f64) -> Self {
        JulianDate(self.0 + secs / SECONDS_PER_DAY)
    }

    /// Signed offset `self - other` in seconds.
    pub fn seconds_since(&self, other: JulianDate) -> f64 {
        (self.0 - other.0) * SECONDS_PER_DAY
    }

    /// Greenwich mean sidereal time (IAU-82), rad in [0, 2pi).
    pub fn gmst(&self) -> f64 {
        let d = self.0 - JD_J2000;
        let t = d / 36_525.0;
        let deg = 280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t
            - t * t * t / 38_710_000.0;
        deg.rem_euclid(360.0).to_radians()
    }
}

impl fmt::Display for JulianDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn j2000_from_calendar() {
        let dt = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let jd = JulianDate::from_datetime(&dt);
        assert!((jd.jd() - JD_J2000).abs() < 1e-9, "J2000 mismatch: {}", jd);
        assert_eq!(jd.to_datetime(), Some(dt));
    }

    #[test]
    fn seconds_offset_is_signed() {
        let a = JulianDate::new(2_458_265.0);
        let b = a.add_seconds(-3600.0);
        assert!((b.seconds_since(a) + 3600.0).abs() < 1e-4);
        assert!((a.seconds_since(b) - 3600.0).abs() < 1e-4);
    }

    #[test]
    fn gmst_at_j2000() {
        // 280.46061837 deg at J2000 noon
        let gmst = JulianDate::J2000.gmst().to_degrees();
        assert!((gmst - 280.460_618_37).abs() < 1e-6, "GMST at J2000 was {}", gmst);
    }
}
