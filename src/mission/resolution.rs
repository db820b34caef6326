use std::f64::consts::FRAC_PI_2;

use crate::error::{config_error, Result};
use crate::mission::spacecraft::Spacecraft;
use crate::physics::gravity::{MU_EARTH, R_EARTH};

/// Orbit/instrument pairing the step size is derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootprintGeometry {
    pub sma: f64,                 // km
    pub along_track: Option<f64>, // full field-of-regard angle, deg (None = horizon to horizon)
}

/// Full horizon-to-horizon angle seen from the orbit radius, deg.
pub fn horizon_angle(sma: f64) -> f64 {
    2.0 * (R_EARTH / sma).asin().to_degrees()
}

/// Time (s) the sub-satellite point needs to cross the along-track footprint.
///
/// Spherical-Earth geometry: elevation from the half field angle and the
/// horizon ratio sin(rho) = Re/a, earth-central angle lambda = 90 - eta - elev,
/// footprint length Re * 2 lambda, ground speed Re * sqrt(mu/a^3).
pub fn footprint_transit_time(geometry: &FootprintGeometry) -> Result<f64> {
    let sma = geometry.sma;
    if !(sma > R_EARTH) {
        return Err(config_error!("semi-major axis {} km is not above the Earth radius", sma));
    }

    let horizon = horizon_angle(sma);
    let along_track = match geometry.along_track {
        None => horizon,
        Some(a) if !(a > 0.0) => {
            return Err(config_error!("field of regard must be positive, got {} deg", a));
        }
        Some(a) => a.min(horizon),
    };

    let sin_rho = R_EARTH / sma;
    let eta = (0.5 * along_track).to_radians();
    let elev = (eta.sin() / sin_rho).clamp(-1.0, 1.0).acos();
    let lambda = FRAC_PI_2 - eta - elev;

    let footprint_len = R_EARTH * 2.0 * lambda;
    let ground_speed = (MU_EARTH / sma.powi(3)).sqrt() * R_EARTH;

    Ok(footprint_len / ground_speed)
}

/// Most conservative propagation step (s) over all entries:
/// min(footprint transit time) * `resolution_factor`, 0 < factor <= 1.
pub fn select_step_size(entries: &[FootprintGeometry], resolution_factor: f64) -> Result<f64> {
    if !(resolution_factor > 0.0 && resolution_factor <= 1.0) {
        return Err(config_error!("resolution factor must be in (0,1], got {}", resolution_factor));
    }
    if entries.is_empty() {
        return Err(config_error!("no orbit geometry to derive a step size from"));
    }

    let mut min_step = f64::INFINITY;
    for g in entries {
        let step = footprint_transit_time(g)? * resolution_factor;
        min_step = min_step.min(step);
    }
    Ok(min_step)
}

/// Step size for a set of spacecraft, see [`select_step_size`].
pub fn step_size_for(spacecraft: &[Spacecraft], resolution_factor: f64) -> Result<f64> {
    let entries: Vec<FootprintGeometry> = spacecraft
        .iter()
        .flat_map(|sc| sc.footprint_geometry())
        .collect();
    let step = select_step_size(&entries, resolution_factor)?;
    tracing::info!(
        "propagation step size {:.3} s from {} footprint entries (factor {})",
        step,
        entries.len(),
        resolution_factor
    );
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMA_700: f64 = R_EARTH + 700.0;

    fn at_700(along_track: Option<f64>) -> FootprintGeometry {
        FootprintGeometry { sma: SMA_700, along_track }
    }

    #[test]
    fn horizon_step_at_700km() {
        // ~5724 km footprint at ~6.76 km/s ground speed
        let t = footprint_transit_time(&at_700(None)).unwrap();
        assert!(t > 830.0 && t < 860.0, "horizon transit time {:.1} s", t);
    }

    #[test]
    fn narrow_field_of_regard_gives_short_step() {
        let wide = footprint_transit_time(&at_700(None)).unwrap();
        let narrow = footprint_transit_time(&at_700(Some(30.0))).unwrap();
        assert!(narrow < wide);
        assert!(narrow > 50.0 && narrow < 60.0, "30 deg transit time {:.2} s", narrow);
    }

    #[test]
    fn step_scales_with_resolution_factor() {
        let entries = [at_700(Some(45.0))];
        let full = select_step_size(&entries, 1.0).unwrap();
        let quarter = select_step_size(&entries, 0.25).unwrap();
        let tenth = select_step_size(&entries, 0.1).unwrap();
        assert!((quarter - full * 0.25).abs() < 1e-9);
        assert!((tenth - full * 0.1).abs() < 1e-9);
    }

    #[test]
    fn missing_instrument_equals_horizon_instrument() {
        let none = select_step_size(&[at_700(None)], 0.5).unwrap();
        let horizon = select_step_size(&[at_700(Some(horizon_angle(SMA_700)))], 0.5).unwrap();
        assert_eq!(none, horizon);
    }

    #[test]
    fn oversized_field_of_regard_is_clamped() {
        let none = footprint_transit_time(&at_700(None)).unwrap();
        let huge = footprint_transit_time(&at_700(Some(170.0))).unwrap();
        assert_eq!(none, huge);
    }

    #[test]
    fn minimum_over_entries() {
        let entries = [
            at_700(None),
            at_700(Some(10.0)),
            FootprintGeometry { sma: R_EARTH + 20_000.0, along_track: None },
        ];
        let step = select_step_size(&entries, 1.0).unwrap();
        let narrow = footprint_transit_time(&entries[1]).unwrap();
        assert_eq!(step, narrow);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let ok = [at_700(None)];
        assert!(select_step_size(&ok, 0.0).is_err());
        assert!(select_step_size(&ok, -0.5).is_err());
        assert!(select_step_size(&ok, 1.5).is_err());
        assert!(select_step_size(&[], 0.5).is_err());
        let surface = FootprintGeometry { sma: R_EARTH, along_track: None };
        assert!(select_step_size(&[surface], 0.5).is_err());
        assert!(select_step_size(&[at_700(Some(0.0))], 0.5).is_err());
    }
}
