// Body Registry - arena of bodies with parent links resolved at build time
// Drives the per-frame update pass in parent-before-child order and composes
// parent-relative positions into absolute scene positions

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::catalog::{BodyKind, ElementRecord, PhysicalProperties};
use crate::error::{OrbitError, RegistryError};
use crate::orbit_trace::{sample_full_ellipse, OrbitTraceBuffer, DEFAULT_TRAIL_CAPACITY};
use crate::orbital_mechanics::{
    advance_with_solver, propagate_scene, KeplerSolver, OrbitalElementSet, SimulationState,
    Vector3,
};

// =============================================================================
// IDENTIFIERS & POSITIONS
// =============================================================================

/// Index of a body in the registry arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BodyId(usize);

impl BodyId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Position relative to the body's parent (scene units)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RelativePosition(pub Vector3);

/// Position in the fixed scene frame (scene units)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AbsolutePosition(pub Vector3);

impl RelativePosition {
    pub fn resolve(self, parent: AbsolutePosition) -> AbsolutePosition {
        AbsolutePosition(parent.0.add(&self.0))
    }
}

// =============================================================================
// ROOT MOTION
// =============================================================================

/// How the primary moves this frame; chosen by the caller every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RootMode {
    /// Fixed at the registry origin
    #[default]
    Anchored,
    /// Constant-velocity drift along the scene y axis, timed by wall clock
    LinearDrift,
}

/// Accumulated drift of the primary along the scene y axis
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LinearDriftState {
    pub offset: f64,
}

impl LinearDriftState {
    /// `speed` is scene units per wall-clock second per unit of sim speed
    pub fn advance(&self, speed: f64, sim_speed_days: f64, elapsed_seconds: f64) -> Self {
        Self {
            offset: self.offset + speed * sim_speed_days * elapsed_seconds,
        }
    }
}

/// Per-body motion model
#[derive(Debug, Clone, Serialize)]
pub enum Motion {
    Primary(LinearDriftState),
    Orbit {
        elements: OrbitalElementSet,
        state: SimulationState,
    },
}

// =============================================================================
// OPTIONS & FRAME I/O
// =============================================================================

/// Where dependents start on their orbit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitialAnomaly {
    /// θ = 0 for every body
    #[default]
    Perihelion,
    /// θ from the epoch mean anomaly L0 - ϖ
    MeanLongitude,
}

impl FromStr for InitialAnomaly {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "perihelion" => Ok(Self::Perihelion),
            "mean-longitude" | "mean_longitude" => Ok(Self::MeanLongitude),
            other => Err(format!(
                "unknown initial anomaly '{}', expected 'perihelion' or 'mean-longitude'",
                other
            )),
        }
    }
}

impl fmt::Display for InitialAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Perihelion => write!(f, "perihelion"),
            Self::MeanLongitude => write!(f, "mean-longitude"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegistryOptions {
    /// Absolute position of the anchored primary
    pub origin: Vector3,
    /// Linear-drift speed of the primary
    pub drift_speed: f64,
    pub trail_capacity: usize,
    pub solver: KeplerSolver,
    pub initial_anomaly: InitialAnomaly,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            origin: Vector3::zero(),
            drift_speed: -0.000001,
            trail_capacity: DEFAULT_TRAIL_CAPACITY,
            solver: KeplerSolver::default(),
            initial_anomaly: InitialAnomaly::Perihelion,
        }
    }
}

/// Everything the scheduler hands the engine for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    /// Simulated days per frame (negative runs backwards)
    pub sim_speed_days: f64,
    /// Wall-clock seconds since the previous frame
    pub elapsed_seconds: f64,
    pub root_mode: RootMode,
    pub record_trails: bool,
}

impl FrameInput {
    pub fn new(sim_speed_days: f64) -> Self {
        Self {
            sim_speed_days,
            elapsed_seconds: 0.0,
            root_mode: RootMode::Anchored,
            record_trails: false,
        }
    }
}

/// Outcome of one update pass
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub frame: u64,
    /// Bodies whose state was left unchanged this frame
    pub failures: Vec<(BodyId, OrbitError)>,
}

impl FrameReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// BODY
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Body {
    name: String,
    kind: BodyKind,
    physical: PhysicalProperties,
    parent: Option<BodyId>,
    rate_scale: f64,
    motion: Motion,
    relative: RelativePosition,
    position: AbsolutePosition,
    /// Created on first recorded frame
    trail: Option<OrbitTraceBuffer>,
}

impl Body {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn physical(&self) -> &PhysicalProperties {
        &self.physical
    }

    pub fn parent(&self) -> Option<BodyId> {
        self.parent
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn elements(&self) -> Option<&OrbitalElementSet> {
        match &self.motion {
            Motion::Orbit { elements, .. } => Some(elements),
            Motion::Primary(_) => None,
        }
    }

    pub fn state(&self) -> Option<&SimulationState> {
        match &self.motion {
            Motion::Orbit { state, .. } => Some(state),
            Motion::Primary(_) => None,
        }
    }

    pub fn relative_position(&self) -> RelativePosition {
        self.relative
    }

    pub fn position(&self) -> AbsolutePosition {
        self.position
    }

    pub fn trail(&self) -> Option<&OrbitTraceBuffer> {
        self.trail.as_ref()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

struct PendingBody {
    record: ElementRecord,
    elements: OrbitalElementSet,
}

/// Collects element records, then resolves names into an indexed arena
pub struct RegistryBuilder {
    pending: Vec<PendingBody>,
    options: RegistryOptions,
}

impl RegistryBuilder {
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            pending: Vec::new(),
            options,
        }
    }

    /// Validates the record's elements immediately
    pub fn add_record(&mut self, record: ElementRecord) -> Result<&mut Self, RegistryError> {
        let elements = record.elements()?;
        self.pending.push(PendingBody { record, elements });
        Ok(self)
    }

    pub fn add_records<I>(&mut self, records: I) -> Result<&mut Self, RegistryError>
    where
        I: IntoIterator<Item = ElementRecord>,
    {
        for record in records {
            self.add_record(record)?;
        }
        Ok(self)
    }

    pub fn build(self) -> Result<BodyRegistry, RegistryError> {
        let RegistryBuilder { pending, options } = self;

        let mut index = HashMap::with_capacity(pending.len());
        for (i, body) in pending.iter().enumerate() {
            if index.insert(body.record.name.clone(), BodyId(i)).is_some() {
                return Err(RegistryError::DuplicateBody(body.record.name.clone()));
            }
        }

        let mut primary: Option<BodyId> = None;
        let mut parents = Vec::with_capacity(pending.len());
        for (i, body) in pending.iter().enumerate() {
            match &body.record.parent {
                None => {
                    if let Some(existing) = primary {
                        return Err(RegistryError::MultiplePrimaries(
                            pending[existing.0].record.name.clone(),
                            body.record.name.clone(),
                        ));
                    }
                    primary = Some(BodyId(i));
                    parents.push(None);
                }
                Some(parent) => {
                    let id = index.get(parent).copied().ok_or_else(|| {
                        RegistryError::UnresolvedParent {
                            body: body.record.name.clone(),
                            parent: parent.clone(),
                        }
                    })?;
                    parents.push(Some(id));
                }
            }
        }
        let primary = primary.ok_or(RegistryError::MissingPrimary)?;

        let update_order = topological_order(primary, &parents);
        if update_order.len() != pending.len() {
            let mut visited = vec![false; pending.len()];
            for id in &update_order {
                visited[id.0] = true;
            }
            let stray = visited.iter().position(|v| !v).unwrap_or_default();
            return Err(RegistryError::UnreachableBody(
                pending[stray].record.name.clone(),
            ));
        }

        let mut bodies = Vec::with_capacity(pending.len());
        for (PendingBody { record, elements }, parent) in pending.into_iter().zip(parents) {
            let motion = match parent {
                None => Motion::Primary(LinearDriftState::default()),
                Some(_) => {
                    // Dependents need a real orbit; fail here, not every frame
                    elements.mean_motion()?;
                    let state = match options.initial_anomaly {
                        InitialAnomaly::Perihelion => SimulationState::at_perihelion(),
                        InitialAnomaly::MeanLongitude => {
                            SimulationState::from_mean_longitude(&elements, &options.solver)?
                        }
                    };
                    Motion::Orbit { elements, state }
                }
            };

            bodies.push(Body {
                name: record.name,
                kind: record.kind,
                physical: record.physical,
                parent,
                rate_scale: record.rate_scale,
                motion,
                relative: RelativePosition::default(),
                position: AbsolutePosition(options.origin),
                trail: None,
            });
        }

        let mut registry = BodyRegistry {
            bodies,
            index,
            update_order,
            primary,
            options,
            frame: 0,
        };
        registry.place_all(RootMode::Anchored);

        info!(
            bodies = registry.len(),
            primary = %registry.bodies[primary.0].name,
            "body registry built"
        );
        debug!(order = ?registry.order_names(), "update order");

        Ok(registry)
    }
}

/// Breadth-first from the primary: every parent precedes its dependents
fn topological_order(primary: BodyId, parents: &[Option<BodyId>]) -> Vec<BodyId> {
    let mut children: Vec<Vec<BodyId>> = vec![Vec::new(); parents.len()];
    for (i, parent) in parents.iter().enumerate() {
        if let Some(p) = parent {
            children[p.0].push(BodyId(i));
        }
    }

    let mut order = Vec::with_capacity(parents.len());
    let mut queue = VecDeque::from([primary]);
    while let Some(id) = queue.pop_front() {
        order.push(id);
        queue.extend(children[id.0].iter().copied());
    }
    order
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Debug, Clone)]
pub struct BodyRegistry {
    bodies: Vec<Body>,
    index: HashMap<String, BodyId>,
    update_order: Vec<BodyId>,
    primary: BodyId,
    options: RegistryOptions,
    frame: u64,
}

impl BodyRegistry {
    pub fn builder(options: RegistryOptions) -> RegistryBuilder {
        RegistryBuilder::new(options)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn primary(&self) -> BodyId {
        self.primary
    }

    pub fn update_order(&self) -> &[BodyId] {
        &self.update_order
    }

    pub fn id(&self, name: &str) -> Result<BodyId, RegistryError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownBody(name.to_string()))
    }

    pub fn body(&self, id: BodyId) -> &Body {
        &self.bodies[id.0]
    }

    pub fn get(&self, name: &str) -> Option<&Body> {
        self.index.get(name).map(|id| &self.bodies[id.0])
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies.iter().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    pub fn absolute_position(&self, name: &str) -> Result<AbsolutePosition, RegistryError> {
        Ok(self.body(self.id(name)?).position)
    }

    /// Live trail of a body, oldest point first; empty until recorded
    pub fn trail(&self, id: BodyId) -> Vec<Vector3> {
        self.bodies[id.0]
            .trail
            .as_ref()
            .map(OrbitTraceBuffer::to_polyline)
            .unwrap_or_default()
    }

    /// Full ellipse around the parent's current absolute position.
    /// The primary has none.
    pub fn static_trace(&self, id: BodyId, step: f64) -> Result<Option<Vec<Vector3>>, OrbitError> {
        let body = &self.bodies[id.0];
        let (Some(parent), Some(elements)) = (body.parent, body.elements()) else {
            return Ok(None);
        };
        let center = self.bodies[parent.0].position.0;
        let points = sample_full_ellipse(elements, step)?
            .into_iter()
            .map(|p| p.add(&center))
            .collect();
        Ok(Some(points))
    }

    pub fn clear_trails(&mut self) {
        for body in &mut self.bodies {
            if let Some(trail) = body.trail.as_mut() {
                trail.clear();
            }
        }
    }

    /// One update pass. Bodies are visited parent-first; a body whose step
    /// fails keeps its previous state and does not stop the others.
    pub fn step(&mut self, input: &FrameInput) -> FrameReport {
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            failures: Vec::new(),
        };

        let origin = self.options.origin;
        let drift_speed = self.options.drift_speed;
        let solver = self.options.solver;
        let trail_capacity = self.options.trail_capacity;

        for &id in &self.update_order {
            let parent_position = self.bodies[id.0]
                .parent
                .map(|p| self.bodies[p.0].position)
                .unwrap_or(AbsolutePosition(origin));

            let body = &mut self.bodies[id.0];
            match &mut body.motion {
                Motion::Primary(drift) => {
                    body.position = match input.root_mode {
                        RootMode::Anchored => AbsolutePosition(origin),
                        RootMode::LinearDrift => {
                            *drift = drift.advance(
                                drift_speed,
                                input.sim_speed_days,
                                input.elapsed_seconds,
                            );
                            AbsolutePosition(origin.add(&Vector3::new(0.0, drift.offset, 0.0)))
                        }
                    };
                }
                Motion::Orbit { elements, state } => {
                    let days = input.sim_speed_days * body.rate_scale;
                    match advance_with_solver(state, elements, days, &solver) {
                        Ok(next) => *state = next,
                        Err(err) => {
                            warn!(body = %body.name, error = %err, "body skipped this frame");
                            report.failures.push((id, err));
                        }
                    }
                    body.relative = RelativePosition(propagate_scene(elements, state.true_anomaly));
                    body.position = body.relative.resolve(parent_position);
                }
            }

            if input.record_trails {
                body.trail
                    .get_or_insert_with(|| OrbitTraceBuffer::new(trail_capacity))
                    .enqueue(body.position.0);
            }
        }

        report
    }

    // Positions from the current states without advancing them
    fn place_all(&mut self, root_mode: RootMode) {
        let origin = self.options.origin;
        for &id in &self.update_order {
            let parent_position = self.bodies[id.0]
                .parent
                .map(|p| self.bodies[p.0].position)
                .unwrap_or(AbsolutePosition(origin));

            let body = &mut self.bodies[id.0];
            match &body.motion {
                Motion::Primary(drift) => {
                    body.position = match root_mode {
                        RootMode::Anchored => AbsolutePosition(origin),
                        RootMode::LinearDrift => {
                            AbsolutePosition(origin.add(&Vector3::new(0.0, drift.offset, 0.0)))
                        }
                    };
                }
                Motion::Orbit { elements, state } => {
                    body.relative = RelativePosition(propagate_scene(elements, state.true_anomaly));
                    body.position = body.relative.resolve(parent_position);
                }
            }
        }
    }

    fn order_names(&self) -> Vec<&str> {
        self.update_order
            .iter()
            .map(|id| self.bodies[id.0].name.as_str())
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{solar_system, PRIMARY};
    use crate::orbital_mechanics::{propagate, SIZE_SCALER};
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Utc};

    fn solar_registry() -> BodyRegistry {
        let mut builder = BodyRegistry::builder(RegistryOptions::default());
        builder.add_records(solar_system()).unwrap();
        builder.build().unwrap()
    }

    fn record(name: &str, parent: Option<&str>, a: f64, e: f64) -> ElementRecord {
        ElementRecord {
            name: name.to_string(),
            kind: if parent.is_none() {
                BodyKind::Star
            } else {
                BodyKind::Planet
            },
            parent: parent.map(str::to_string),
            a,
            e,
            inclination: 0.0,
            longitude_ascending_node: 0.0,
            longitude_perihelion: 0.0,
            mean_longitude: 0.0,
            epoch: Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
            physical: PhysicalProperties::default(),
            rate_scale: 1.0,
        }
    }

    fn build(records: Vec<ElementRecord>) -> Result<BodyRegistry, RegistryError> {
        let mut builder = BodyRegistry::builder(RegistryOptions::default());
        builder.add_records(records)?;
        builder.build()
    }

    #[test]
    fn test_update_order_is_topological() {
        let registry = solar_registry();
        let order = registry.update_order();
        assert_eq!(order[0], registry.primary());
        let earth = order.iter().position(|&id| id == registry.id("Earth").unwrap());
        let moon = order.iter().position(|&id| id == registry.id("Moon").unwrap());
        assert!(earth < moon);
        assert_eq!(order.len(), registry.len());
    }

    #[test]
    fn test_moon_listed_before_earth_still_resolves() {
        let mut records = vec![record("Moon", Some("Earth"), 0.00257, 0.05)];
        records.push(record(PRIMARY, None, 0.0, 0.0));
        records.push(record("Earth", Some(PRIMARY), 1.0, 0.0167));
        let registry = build(records).unwrap();
        let names: Vec<&str> = registry.order_names();
        assert_eq!(names, vec![PRIMARY, "Earth", "Moon"]);
    }

    #[test]
    fn test_unresolved_parent_fails_at_build() {
        let records = vec![
            record(PRIMARY, None, 0.0, 0.0),
            record("Moon", Some("Earth"), 0.00257, 0.05),
        ];
        assert_eq!(
            build(records).unwrap_err(),
            RegistryError::UnresolvedParent {
                body: "Moon".to_string(),
                parent: "Earth".to_string()
            }
        );
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            build(vec![record("Earth", Some("Earth"), 1.0, 0.0)]).unwrap_err(),
            RegistryError::MissingPrimary
        );
        assert!(matches!(
            build(vec![record("A", None, 0.0, 0.0), record("B", None, 0.0, 0.0)]),
            Err(RegistryError::MultiplePrimaries(_, _))
        ));
        assert_eq!(
            build(vec![record("A", None, 0.0, 0.0), record("A", None, 0.0, 0.0)]).unwrap_err(),
            RegistryError::DuplicateBody("A".to_string())
        );
        assert_eq!(
            build(vec![
                record(PRIMARY, None, 0.0, 0.0),
                record("X", Some("Y"), 1.0, 0.0),
                record("Y", Some("X"), 1.0, 0.0),
            ])
            .unwrap_err(),
            RegistryError::UnreachableBody("X".to_string())
        );
    }

    #[test]
    fn test_invalid_elements_rejected() {
        let mut builder = BodyRegistry::builder(RegistryOptions::default());
        let err = builder
            .add_record(record("Comet", Some(PRIMARY), 3.0, 1.2))
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::Orbit(OrbitError::InvalidElements(_))));

        // Dependents need a positive semi-major axis
        let err = build(vec![
            record(PRIMARY, None, 0.0, 0.0),
            record("Dust", Some(PRIMARY), 0.0, 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::Orbit(OrbitError::InvalidElements(_))));
    }

    #[test]
    fn test_initial_positions_at_perihelion() {
        let registry = solar_registry();
        let earth = registry.get("Earth").unwrap();
        let elements = earth.elements().unwrap();
        let expected = propagate(elements, 0.0).magnitude() * SIZE_SCALER;
        assert_abs_diff_eq!(earth.position().0.magnitude(), expected, epsilon = 1e-9);
        assert_eq!(registry.absolute_position(PRIMARY).unwrap().0, Vector3::zero());
    }

    #[test]
    fn test_moon_composes_with_earth() {
        let mut registry = solar_registry();
        for _ in 0..25 {
            assert!(registry.step(&FrameInput::new(0.5)).is_clean());
        }
        let earth = registry.get("Earth").unwrap().position().0;
        let moon = registry.get("Moon").unwrap();
        let expected = earth.add(&moon.relative_position().0);
        assert_eq!(moon.position().0, expected);
        assert!(moon.position().0.distance_to(&earth) < 0.003 * SIZE_SCALER);
    }

    #[test]
    fn test_zero_speed_frame_keeps_states() {
        let mut registry = solar_registry();
        registry.step(&FrameInput::new(3.0));
        let before: Vec<_> = registry.bodies().map(|(_, b)| b.state().copied()).collect();
        let report = registry.step(&FrameInput::new(0.0));
        let after: Vec<_> = registry.bodies().map(|(_, b)| b.state().copied()).collect();
        assert_eq!(before, after);
        assert_eq!(report.frame, 2);
    }

    #[test]
    fn test_rate_scale_slows_moon() {
        let mut registry = solar_registry();
        registry.step(&FrameInput::new(1.0));
        let moon = registry.get("Moon").unwrap().state().unwrap();
        let earth = registry.get("Earth").unwrap().state().unwrap();
        assert_eq!(moon.elapsed_days, 0.01);
        assert_eq!(earth.elapsed_days, 1.0);
    }

    #[test]
    fn test_linear_drift_moves_primary_and_dependents() {
        let mut registry = solar_registry();
        let input = FrameInput {
            sim_speed_days: 2.0,
            elapsed_seconds: 0.5,
            root_mode: RootMode::LinearDrift,
            record_trails: false,
        };
        registry.step(&input);
        registry.step(&input);

        let sun = registry.absolute_position(PRIMARY).unwrap().0;
        assert_abs_diff_eq!(sun.y, -0.000001 * 2.0 * 0.5 * 2.0, epsilon = 1e-18);
        assert_eq!(sun.x, 0.0);
        assert_eq!(sun.z, 0.0);

        let mars = registry.get("Mars").unwrap();
        assert_eq!(mars.position().0, sun.add(&mars.relative_position().0));

        // Switching back anchors the primary at the origin again
        registry.step(&FrameInput::new(2.0));
        assert_eq!(registry.absolute_position(PRIMARY).unwrap().0, Vector3::zero());
    }

    #[test]
    fn test_failures_are_isolated() {
        let options = RegistryOptions {
            solver: KeplerSolver::new(1e-4, 1),
            ..RegistryOptions::default()
        };
        let mut builder = BodyRegistry::builder(options);
        builder
            .add_records(vec![
                record(PRIMARY, None, 0.0, 0.0),
                record("Round", Some(PRIMARY), 1.0, 0.0),
                record("Stretched", Some(PRIMARY), 1.0, 0.9),
            ])
            .unwrap();
        let mut registry = builder.build().unwrap();

        let report = registry.step(&FrameInput::new(30.0));
        let stretched = registry.id("Stretched").unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, stretched);
        assert!(matches!(
            report.failures[0].1,
            OrbitError::ConvergenceFailure { .. }
        ));

        assert_eq!(registry.body(stretched).state().unwrap().true_anomaly, 0.0);
        assert!(registry.get("Round").unwrap().state().unwrap().true_anomaly > 0.0);
    }

    #[test]
    fn test_trails_recorded_on_request() {
        let options = RegistryOptions {
            trail_capacity: 10,
            ..RegistryOptions::default()
        };
        let mut builder = BodyRegistry::builder(options);
        builder.add_records(solar_system()).unwrap();
        let mut registry = builder.build().unwrap();
        let earth = registry.id("Earth").unwrap();

        registry.step(&FrameInput::new(1.0));
        assert!(registry.trail(earth).is_empty());

        let input = FrameInput {
            record_trails: true,
            ..FrameInput::new(1.0)
        };
        for _ in 0..25 {
            registry.step(&input);
        }
        let trail = registry.trail(earth);
        assert_eq!(trail.len(), 10);
        assert_eq!(*trail.last().unwrap(), registry.body(earth).position().0);

        registry.clear_trails();
        assert!(registry.trail(earth).is_empty());
    }

    #[test]
    fn test_static_trace_centered_on_parent() {
        let mut registry = solar_registry();
        registry.step(&FrameInput::new(5.0));
        let moon = registry.id("Moon").unwrap();
        let earth = registry.get("Earth").unwrap().position().0;
        let trace = registry.static_trace(moon, 0.01).unwrap().unwrap();
        let elements = registry.body(moon).elements().unwrap();
        assert_eq!(trace[0], propagate_scene(elements, 0.0).add(&earth));
        assert!(registry.static_trace(registry.primary(), 0.01).unwrap().is_none());
    }

    #[test]
    fn test_unknown_body_lookup() {
        let registry = solar_registry();
        assert_eq!(
            registry.absolute_position("Pluto").unwrap_err(),
            RegistryError::UnknownBody("Pluto".to_string())
        );
    }

    #[test]
    fn test_initial_anomaly_parse() {
        assert_eq!("perihelion".parse(), Ok(InitialAnomaly::Perihelion));
        assert_eq!("Mean-Longitude".parse(), Ok(InitialAnomaly::MeanLongitude));
        assert!("apoapsis".parse::<InitialAnomaly>().is_err());
    }
}
