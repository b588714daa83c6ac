// Orbit Trace - live trail buffer and static full-ellipse sampler

use serde::Serialize;
use std::collections::VecDeque;
use std::f64::consts::TAU;

use crate::error::{OrbitError, OrbitResult};
use crate::orbital_mechanics::{propagate_scene, OrbitalElementSet, Vector3};

/// Default number of points kept in a live trail
pub const DEFAULT_TRAIL_CAPACITY: usize = 500;

/// Default angular step of the static trace (radians)
pub const DEFAULT_TRACE_STEP: f64 = 0.001;

/// Finer steps would allocate millions of points per trace
const MIN_TRACE_STEP: f64 = 1e-6;

// =============================================================================
// LIVE TRAIL BUFFER
// =============================================================================

/// Bounded FIFO of recent absolute positions (scene units)
#[derive(Debug, Clone, Serialize)]
pub struct OrbitTraceBuffer {
    points: VecDeque<Vector3>,
    capacity: usize,
}

impl OrbitTraceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.min(DEFAULT_TRAIL_CAPACITY)),
            capacity,
        }
    }

    /// Append `point`, evicting the oldest point first when full.
    /// Returns the evicted point so its owner can release whatever it drew.
    pub fn enqueue(&mut self, point: Vector3) -> Option<Vector3> {
        if self.capacity == 0 {
            return Some(point);
        }
        let evicted = if self.points.len() >= self.capacity {
            self.points.pop_front()
        } else {
            None
        };
        self.points.push_back(point);
        evicted
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Points oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Vector3> {
        self.points.iter()
    }

    /// Polyline for the renderer, oldest first
    pub fn to_polyline(&self) -> Vec<Vector3> {
        self.points.iter().copied().collect()
    }
}

impl Default for OrbitTraceBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_TRAIL_CAPACITY)
    }
}

// =============================================================================
// STATIC FULL-ELLIPSE SAMPLER
// =============================================================================

/// Closed polyline of the whole orbit, parent-relative, in scene units.
///
/// θ runs from 0 in increments of `step`; the final point is placed at
/// exactly 2π so the curve closes. Emits ceil(2π / step) + 1 points.
pub fn sample_full_ellipse(elements: &OrbitalElementSet, step: f64) -> OrbitResult<Vec<Vector3>> {
    if !step.is_finite() || step < MIN_TRACE_STEP {
        return Err(OrbitError::InvalidSampleStep(step));
    }

    let steps = (TAU / step).ceil() as usize;
    let points = (0..=steps)
        .map(|k| {
            let theta = (k as f64 * step).min(TAU);
            propagate_scene(elements, theta)
        })
        .collect();

    Ok(points)
}

// =============================================================================
// TESTS
// =============================================================================
