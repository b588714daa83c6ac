// Orbital Mechanics - Keplerian element propagation
// Kepler solver, anomaly conversions, perifocal-to-inertial transform and the
// per-frame true-anomaly recurrence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::error::{OrbitError, OrbitResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Gravitational constant (m³/(kg·s²))
pub const G: f64 = 6.67430e-11;

/// Days per Julian year
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Scene units per AU; shared by live trails and static traces
pub const SIZE_SCALER: f64 = 10000.0;

/// Default absolute tolerance on the Newton step for Kepler's equation
pub const KEPLER_TOLERANCE: f64 = 1e-4;

/// Iteration cap for the Kepler solver
pub const KEPLER_MAX_ITERATIONS: usize = 100;

// =============================================================================
// 3D VECTOR MATHEMATICS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn add(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    pub fn sub(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn distance_to(&self, other: &Vector3) -> f64 {
        self.sub(other).magnitude()
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

// =============================================================================
// KEPLERIAN ORBITAL ELEMENTS
// =============================================================================

/// Immutable orbital parameters of one body.
///
/// Angles are kept in degrees as supplied; the argument of perihelion and the
/// period are derived once at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitalElementSet {
    /// Semi-major axis (AU)
    semi_major_axis: f64,
    /// Eccentricity, 0 <= e < 1
    eccentricity: f64,
    /// Inclination (deg)
    inclination: f64,
    /// Longitude of ascending node Ω (deg)
    longitude_ascending_node: f64,
    /// Longitude of perihelion ϖ (deg)
    longitude_perihelion: f64,
    /// Mean longitude at epoch (deg)
    mean_longitude: f64,
    epoch: DateTime<Utc>,
    /// ω = ϖ - Ω (deg)
    argument_perihelion: f64,
    /// P = a^1.5 (years)
    period: f64,
}

impl OrbitalElementSet {
    pub fn new(
        semi_major_axis: f64,
        eccentricity: f64,
        inclination: f64,
        longitude_ascending_node: f64,
        longitude_perihelion: f64,
        mean_longitude: f64,
        epoch: DateTime<Utc>,
    ) -> OrbitResult<Self> {
        let fields = [
            ("semi-major axis", semi_major_axis),
            ("eccentricity", eccentricity),
            ("inclination", inclination),
            ("longitude of ascending node", longitude_ascending_node),
            ("longitude of perihelion", longitude_perihelion),
            ("mean longitude", mean_longitude),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(OrbitError::InvalidElements(format!(
                "{} is not finite ({})",
                name, value
            )));
        }
        if semi_major_axis < 0.0 {
            return Err(OrbitError::InvalidElements(format!(
                "semi-major axis must be non-negative, got {}",
                semi_major_axis
            )));
        }
        check_eccentricity(eccentricity)?;

        Ok(Self {
            semi_major_axis,
            eccentricity,
            inclination,
            longitude_ascending_node,
            longitude_perihelion,
            mean_longitude,
            epoch,
            argument_perihelion: longitude_perihelion - longitude_ascending_node,
            // Solar-mass Kepler's third law, applied to every body alike
            period: semi_major_axis.powf(1.5),
        })
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn inclination(&self) -> f64 {
        self.inclination
    }

    pub fn longitude_ascending_node(&self) -> f64 {
        self.longitude_ascending_node
    }

    pub fn longitude_perihelion(&self) -> f64 {
        self.longitude_perihelion
    }

    pub fn mean_longitude(&self) -> f64 {
        self.mean_longitude
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn argument_perihelion(&self) -> f64 {
        self.argument_perihelion
    }

    /// Orbital period in years
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Semi-latus rectum p = a(1 - e²) (AU)
    pub fn semi_latus_rectum(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity * self.eccentricity)
    }

    pub fn perihelion_distance(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity)
    }

    pub fn aphelion_distance(&self) -> f64 {
        self.semi_major_axis * (1.0 + self.eccentricity)
    }

    /// Mean motion n = 2π / (P · 365.25) in radians per day.
    /// Only defined for a positive semi-major axis.
    pub fn mean_motion(&self) -> OrbitResult<f64> {
        if self.semi_major_axis <= 0.0 {
            return Err(OrbitError::InvalidElements(
                "semi-major axis must be positive for a propagated orbit".to_string(),
            ));
        }
        Ok(TAU / (self.period * DAYS_PER_YEAR))
    }

    /// Mean anomaly at epoch, M = L0 - ϖ (radians)
    pub fn mean_anomaly_at_epoch(&self) -> f64 {
        (self.mean_longitude - self.longitude_perihelion).to_radians()
    }
}

fn check_eccentricity(eccentricity: f64) -> OrbitResult<()> {
    if !(0.0..1.0).contains(&eccentricity) {
        return Err(OrbitError::InvalidElements(format!(
            "eccentricity must lie in [0, 1), got {}",
            eccentricity
        )));
    }
    Ok(())
}

// =============================================================================
// KEPLER EQUATION SOLVER
// =============================================================================

/// Newton-Raphson solver for M = E - e*sin(E) with a hard iteration cap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolver {
    /// Absolute tolerance on the Newton step
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for KeplerSolver {
    fn default() -> Self {
        Self {
            tolerance: KEPLER_TOLERANCE,
            max_iterations: KEPLER_MAX_ITERATIONS,
        }
    }
}

impl KeplerSolver {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Returns the eccentric anomaly E for mean anomaly M (radians, any real).
    ///
    /// Starts from E₀ = M. The last Newton correction is always applied before
    /// the step is tested, so the residual of the returned E is well inside
    /// the tolerance.
    pub fn solve(&self, eccentricity: f64, mean_anomaly: f64) -> OrbitResult<f64> {
        check_eccentricity(eccentricity)?;

        let mut e_anom = mean_anomaly;
        for _ in 0..self.max_iterations {
            let f = e_anom - eccentricity * e_anom.sin() - mean_anomaly;
            let f_prime = 1.0 - eccentricity * e_anom.cos();
            let ratio = f / f_prime;
            e_anom -= ratio;

            if ratio.abs() <= self.tolerance {
                return Ok(e_anom);
            }
        }

        Err(OrbitError::ConvergenceFailure {
            eccentricity,
            mean_anomaly,
            iterations: self.max_iterations,
        })
    }
}

/// Solve Kepler's equation with the default tolerance and cap
pub fn solve_kepler_equation(mean_anomaly: f64, eccentricity: f64) -> OrbitResult<f64> {
    KeplerSolver::default().solve(eccentricity, mean_anomaly)
}

// =============================================================================
// ANOMALY CONVERSIONS
// =============================================================================

/// E = 2·atan( sqrt((1-e)/(1+e)) · tan(θ/2) ), kept in the same revolution as θ
pub fn true_to_eccentric(eccentricity: f64, true_anomaly: f64) -> OrbitResult<f64> {
    check_eccentricity(eccentricity)?;
    let factor = ((1.0 - eccentricity) / (1.0 + eccentricity)).sqrt();
    let principal = 2.0 * (factor * (true_anomaly / 2.0).tan()).atan();
    same_revolution(principal, true_anomaly, eccentricity)
}

/// θ = 2·atan( sqrt((1+e)/(1-e)) · tan(E/2) ), kept in the same revolution as E
pub fn eccentric_to_true(eccentricity: f64, eccentric_anomaly: f64) -> OrbitResult<f64> {
    check_eccentricity(eccentricity)?;
    let factor = ((1.0 + eccentricity) / (1.0 - eccentricity)).sqrt();
    let principal = 2.0 * (factor * (eccentric_anomaly / 2.0).tan()).atan();
    same_revolution(principal, eccentric_anomaly, eccentricity)
}

// The atan branch lies in (-π, π]; both anomalies sit in the same half of
// the orbit, so the right branch is the one within π of the input.
fn same_revolution(principal: f64, reference: f64, eccentricity: f64) -> OrbitResult<f64> {
    let shifted = principal + TAU * ((reference - principal) / TAU).round();
    if shifted.is_finite() {
        Ok(shifted)
    } else {
        Err(OrbitError::NonFiniteAnomaly {
            eccentricity,
            input: reference,
        })
    }
}

// =============================================================================
// ORBIT PROPAGATOR
// =============================================================================

/// Position at true anomaly θ in the parent-centred inertial frame (AU).
///
/// r = p / (1 + e·cos θ), then the perifocal frame is rotated by ω, i and Ω.
pub fn propagate(elements: &OrbitalElementSet, true_anomaly: f64) -> Vector3 {
    let e = elements.eccentricity();
    let r = elements.semi_latus_rectum() / (1.0 + e * true_anomaly.cos());

    let node = elements.longitude_ascending_node().to_radians();
    let inclination = elements.inclination().to_radians();
    let u = elements.argument_perihelion().to_radians() + true_anomaly;

    let (sin_u, cos_u) = u.sin_cos();
    let (sin_node, cos_node) = node.sin_cos();
    let (sin_i, cos_i) = inclination.sin_cos();

    Vector3::new(
        r * (cos_u * cos_node - cos_i * sin_u * sin_node),
        r * (cos_u * sin_node + cos_i * sin_u * cos_node),
        r * (sin_u * sin_i),
    )
}

/// Inertial AU -> scene units: axes permuted to (y, z, x) and scaled
pub fn to_scene(inertial: &Vector3) -> Vector3 {
    Vector3::new(
        inertial.y * SIZE_SCALER,
        inertial.z * SIZE_SCALER,
        inertial.x * SIZE_SCALER,
    )
}

/// Parent-relative position in scene units
pub fn propagate_scene(elements: &OrbitalElementSet, true_anomaly: f64) -> Vector3 {
    to_scene(&propagate(elements, true_anomaly))
}

// =============================================================================
// SIMULATION STATE (true-anomaly recurrence)
// =============================================================================

/// Angle wrapped into [0, 2π). `rem_euclid` rounds tiny negatives up to
/// exactly 2π, which is folded back to 0.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Per-body recurrence state. Advanced once per frame; never recomputed
/// from wall time, so a frame must be neither skipped nor applied twice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct SimulationState {
    /// Current true anomaly θ (radians, [0, 2π))
    pub true_anomaly: f64,
    /// Total simulated days applied so far
    pub elapsed_days: f64,
}

impl SimulationState {
    pub fn at_perihelion() -> Self {
        Self::default()
    }

    pub fn from_true_anomaly(true_anomaly: f64) -> Self {
        Self {
            true_anomaly: normalize_angle(true_anomaly),
            elapsed_days: 0.0,
        }
    }

    /// State whose true anomaly matches the element set's epoch mean anomaly
    pub fn from_mean_longitude(
        elements: &OrbitalElementSet,
        solver: &KeplerSolver,
    ) -> OrbitResult<Self> {
        let e = elements.eccentricity();
        let mean_anomaly = elements.mean_anomaly_at_epoch().rem_euclid(TAU);
        let ecc = solver.solve(e, mean_anomaly)?;
        Ok(Self::from_true_anomaly(eccentric_to_true(e, ecc)?))
    }
}

/// Advance one frame by `sim_speed_days` (negative runs time backwards).
pub fn advance(
    state: &SimulationState,
    elements: &OrbitalElementSet,
    sim_speed_days: f64,
) -> OrbitResult<SimulationState> {
    advance_with_solver(state, elements, sim_speed_days, &KeplerSolver::default())
}

pub fn advance_with_solver(
    state: &SimulationState,
    elements: &OrbitalElementSet,
    sim_speed_days: f64,
    solver: &KeplerSolver,
) -> OrbitResult<SimulationState> {
    if sim_speed_days == 0.0 {
        return Ok(*state);
    }

    let e = elements.eccentricity();
    let mean_motion = elements.mean_motion()?; // rad/day

    let ecc = true_to_eccentric(e, state.true_anomaly)?;
    let current_mean = ecc - e * ecc.sin();
    let next_mean = current_mean + sim_speed_days * mean_motion;

    let next_ecc = solver.solve(e, next_mean)?;
    let next_true = eccentric_to_true(e, next_ecc)?;

    Ok(SimulationState {
        true_anomaly: normalize_angle(next_true),
        elapsed_days: state.elapsed_days + sim_speed_days,
    })
}

// =============================================================================
// TESTS
// =============================================================================
