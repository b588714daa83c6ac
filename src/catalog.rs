// Body Catalog - element records and the built-in solar system
// Values are J2000-style mean elements in AU and degrees

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OrbitResult;
use crate::orbital_mechanics::OrbitalElementSet;

/// Name of the primary body every planet and NEO orbits
pub const PRIMARY: &str = "Sun";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BodyKind {
    Star,
    Planet,
    Moon,
    NearEarthObject,
}

/// Rendering-adjacent metadata; not used by the propagation math
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PhysicalProperties {
    pub radius_km: f64,
    pub mass_kg: f64,
}

/// One body as supplied by the host: elements plus physical metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementRecord {
    pub name: String,
    pub kind: BodyKind,
    /// Reference body; `None` marks the primary
    #[serde(default)]
    pub parent: Option<String>,
    /// Semi-major axis (AU)
    pub a: f64,
    pub e: f64,
    /// Inclination (deg)
    pub inclination: f64,
    /// Ω (deg)
    pub longitude_ascending_node: f64,
    /// ϖ (deg)
    pub longitude_perihelion: f64,
    /// L0 (deg)
    pub mean_longitude: f64,
    pub epoch: DateTime<Utc>,
    #[serde(default)]
    pub physical: PhysicalProperties,
    /// Multiplier applied to the frame's sim speed for this body
    #[serde(default = "default_rate_scale")]
    pub rate_scale: f64,
}

fn default_rate_scale() -> f64 {
    1.0
}

impl ElementRecord {
    pub fn elements(&self) -> OrbitResult<OrbitalElementSet> {
        OrbitalElementSet::new(
            self.a,
            self.e,
            self.inclination,
            self.longitude_ascending_node,
            self.longitude_perihelion,
            self.mean_longitude,
            self.epoch,
        )
    }

    pub fn is_primary(&self) -> bool {
        self.parent.is_none()
    }
}

fn utc_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn planet(
    name: &str,
    kind: BodyKind,
    parent: &str,
    a: f64,
    e: f64,
    longitude_perihelion: f64,
    longitude_ascending_node: f64,
    mean_longitude: f64,
    inclination: f64,
    epoch: DateTime<Utc>,
    radius_km: f64,
    mass_kg: f64,
) -> ElementRecord {
    ElementRecord {
        name: name.to_string(),
        kind,
        parent: Some(parent.to_string()),
        a,
        e,
        inclination,
        longitude_ascending_node,
        longitude_perihelion,
        mean_longitude,
        epoch,
        physical: PhysicalProperties { radius_km, mass_kg },
        rate_scale: 1.0,
    }
}

/// Sun, the eight planets and the Moon
pub fn solar_system() -> Vec<ElementRecord> {
    use BodyKind::*;

    let sun = ElementRecord {
        name: PRIMARY.to_string(),
        kind: Star,
        parent: None,
        a: 0.0,
        e: 0.0,
        inclination: 0.0,
        longitude_ascending_node: 0.0,
        longitude_perihelion: 0.0,
        mean_longitude: 0.0,
        epoch: utc_date(2000, 1, 1),
        physical: PhysicalProperties {
            radius_km: 696340.0,
            mass_kg: 1.989e30,
        },
        rate_scale: 1.0,
    };

    // name, kind, parent, a, e, ϖ, Ω, L0, i, epoch, radius (km), mass (kg)
    #[rustfmt::skip]
    let mut bodies = vec![
        sun,
        planet("Mercury", Planet, PRIMARY, 0.38709927, 0.20563593, 77.45779628, 48.33076593, 252.25032350, 7.00497902, utc_date(2021, 4, 27), 2440.0, 3.285e23),
        planet("Venus", Planet, PRIMARY, 0.72332102, 0.00676399, 131.76755713, 76.67261496, 181.97970850, 3.39777545, utc_date(2014, 9, 5), 6051.8, 4.867e24),
        planet("Earth", Planet, PRIMARY, 1.00000018, 0.01673163, 102.93005885, -5.11260389, 100.46691572, -0.00054346, utc_date(2024, 2, 4), 6378.0, 5.972e24),
        planet("Mars", Planet, PRIMARY, 1.52371034, 0.09339410, -23.94362959, 49.55953891, -4.55343205, 1.84969142, utc_date(2000, 1, 1), 3389.5, 6.39e23),
        planet("Jupiter", Planet, PRIMARY, 5.20288700, 0.04838624, 14.72847983, 100.47390909, 34.39644051, 1.30439695, utc_date(1999, 5, 20), 69911.0, 1.898e27),
        planet("Saturn", Planet, PRIMARY, 9.53667594, 0.05386179, 92.59887831, 113.66242448, 49.95424423, 2.48599187, utc_date(1944, 9, 7), 58232.0, 5.683e26),
        planet("Uranus", Planet, PRIMARY, 19.18916464, 0.04725744, 170.95427630, 74.01692503, 313.23810451, 0.77263783, utc_date(1966, 6, 2), 25362.0, 8.681e25),
        planet("Neptune", Planet, PRIMARY, 30.06992276, 0.00859048, 44.96476227, 131.78422574, -55.12002969, 1.77004347, utc_date(2042, 9, 15), 24622.0, 1.024e26),
        planet("Moon", Moon, "Earth", 0.00257, 0.0549, 0.0024, 125.08, 100.46691572, 5.145, utc_date(2020, 11, 6), 1737.4, 7.34767309e22),
    ];

    // The solar-mass period formula makes the Moon's AU-scale orbit ~570x too
    // fast; slow its clock down instead of special-casing the formula.
    if let Some(moon) = bodies.iter_mut().find(|b| b.kind == Moon) {
        moon.rate_scale = 0.01;
    }

    bodies
}

/// Parse a JSON array of element records
pub fn from_json(json: &str) -> serde_json::Result<Vec<ElementRecord>> {
    serde_json::from_str(json)
}
