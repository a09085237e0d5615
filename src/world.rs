//! Simulation World
//!
//! Owns the bodies, the island tracker, the contact cache and the broad phase,
//! and drives one frame per [`World::update`] call:
//!
//! 1. Awake dynamic bodies become their own island root; gravity is applied
//!    as a force (`m * g`) through the force path.
//! 2. Contact cache generations are swapped.
//! 3. Broad-phase candidates with at least one active side go through the
//!    collision filter and the narrow phase. A found manifold wakes both
//!    islands and merges them when both bodies are dynamic. New contacts
//!    deeper than the slop are created (enter events); cached ones are
//!    reused. Each is evaluated and warm started.
//! 4. Contacts not observed this frame are released (exit events when either
//!    side is awake).
//! 5. Sequential-impulse solve.
//! 6. Semi-implicit Euler integration, damping, geometry and broad-phase
//!    refresh; bodies whose box leaves the bound are removed.
//! 7. Island energy is aggregated and idle islands are put to sleep.
//!
//! All arithmetic is [`Fix128`] and every container iterates in a fixed
//! order, so two worlds fed the same calls evolve bit-identically.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use alloc::collections::BTreeSet;
use alloc::rc::Weak;
use core::cell::RefCell;

use log::{debug, trace};

use crate::body::{Body, BodyDesc, BodyHandle, BodyRegistry};
use crate::broadphase::{BroadPhase, SweepAndPrune};
use crate::contact::{Contact, ContactCache, ContactKey};
use crate::error::PhysicsError;
use crate::event::{deliver, Event, EventKind, EventLog, Listener};
use crate::filter::CollisionFilter;
use crate::island::{IslandTracker, SleepVerdict};
use crate::math::{Fix128, Vec2Fix};
use crate::profiling::{StepProfiler, StepStats};
use crate::shape::{Aabb, ConvexPolygon, Geometry};
use crate::solver::{self, SolverParams};

// ============================================================================
// WorldConfig
// ============================================================================

/// World configuration, validated once when the world is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldConfig {
    /// Gravitational acceleration
    pub gravity: Vec2Fix,
    /// Penetration allowed before position correction kicks in
    pub slop: Fix128,
    /// Velocity multiplier applied to dynamic bodies every step (0..=1)
    pub damping: Fix128,
    /// Maximum Gauss-Seidel sweeps per step
    pub iterations: u32,
    /// Consecutive idle frames before an island sleeps (0 disables sleep)
    pub sleep_frames: u32,
    /// Mean squared velocity below which an island counts as idle
    pub sleep_threshold: Fix128,
    /// Baumgarte position-correction factor (0..=1)
    pub baumgarte: Fix128,
    /// Half-extent of the square simulation bound
    pub bound: Fix128,
    /// Approach speed above which restitution applies (0 = always)
    pub restitution_threshold: Fix128,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2Fix::new(Fix128::ZERO, Fix128::from_ratio(-98, 10)),
            slop: Fix128::from_ratio(1, 100),
            damping: Fix128::from_ratio(999, 1000),
            iterations: 10,
            sleep_frames: 60,
            sleep_threshold: Fix128::from_ratio(1, 100),
            baumgarte: Fix128::from_ratio(2, 10),
            bound: Fix128::from_int(1000),
            restitution_threshold: Fix128::ZERO,
        }
    }
}

impl WorldConfig {
    /// Set gravity
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec2Fix) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the slop tolerance
    #[must_use]
    pub fn with_slop(mut self, slop: Fix128) -> Self {
        self.slop = slop;
        self
    }

    /// Set the damping factor
    #[must_use]
    pub fn with_damping(mut self, damping: Fix128) -> Self {
        self.damping = damping;
        self
    }

    /// Set the solver sweep budget
    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the idle frame count needed to sleep
    #[must_use]
    pub fn with_sleep_frames(mut self, sleep_frames: u32) -> Self {
        self.sleep_frames = sleep_frames;
        self
    }

    /// Set the sleep energy threshold
    #[must_use]
    pub fn with_sleep_threshold(mut self, sleep_threshold: Fix128) -> Self {
        self.sleep_threshold = sleep_threshold;
        self
    }

    /// Set the Baumgarte factor
    #[must_use]
    pub fn with_baumgarte(mut self, baumgarte: Fix128) -> Self {
        self.baumgarte = baumgarte;
        self
    }

    /// Set the simulation bound half-extent
    #[must_use]
    pub fn with_bound(mut self, bound: Fix128) -> Self {
        self.bound = bound;
        self
    }

    /// Set the restitution velocity threshold
    #[must_use]
    pub fn with_restitution_threshold(mut self, threshold: Fix128) -> Self {
        self.restitution_threshold = threshold;
        self
    }

    /// Reject configurations the solver cannot run with.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let fail = |reason| Err(PhysicsError::InvalidConfiguration { reason });
        if self.iterations == 0 {
            return fail("iterations must be > 0");
        }
        if self.slop.is_negative() {
            return fail("slop must be >= 0");
        }
        if self.damping.is_negative() || self.damping > Fix128::ONE {
            return fail("damping must be within [0, 1]");
        }
        if self.baumgarte.is_negative() || self.baumgarte > Fix128::ONE {
            return fail("baumgarte must be within [0, 1]");
        }
        if !self.bound.is_positive() {
            return fail("bound must be > 0");
        }
        if self.sleep_threshold.is_negative() {
            return fail("sleep_threshold must be >= 0");
        }
        if self.restitution_threshold.is_negative() {
            return fail("restitution_threshold must be >= 0");
        }
        Ok(())
    }
}

// ============================================================================
// World
// ============================================================================

/// 2D sequential-impulse world.
pub struct World<G: Geometry = ConvexPolygon, B: BroadPhase = SweepAndPrune> {
    config: WorldConfig,
    bodies: BodyRegistry<G>,
    islands: IslandTracker,
    contacts: ContactCache,
    broad_phase: B,
    events: EventLog,
    profiler: StepProfiler,
    step: StepStats,
    queue: Vec<usize>,
}

impl World<ConvexPolygon, SweepAndPrune> {
    /// World with the reference geometry and broad phase.
    pub fn new(config: WorldConfig) -> Result<Self, PhysicsError> {
        Self::with_broad_phase(config, SweepAndPrune::new())
    }
}

impl<G: Geometry, B: BroadPhase> World<G, B> {
    /// World with a caller-supplied broad phase.
    pub fn with_broad_phase(config: WorldConfig, broad_phase: B) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self {
            config,
            bodies: BodyRegistry::new(),
            islands: IslandTracker::new(),
            contacts: ContactCache::new(),
            broad_phase,
            events: EventLog::new(),
            profiler: StepProfiler::new(),
            step: StepStats::default(),
            queue: Vec::new(),
        })
    }

    /// Configuration the world was built with
    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Body lifecycle
    // ------------------------------------------------------------------------

    /// Create a body. Fails if the geometry rejects the vertices.
    pub fn add_body(&mut self, desc: BodyDesc) -> Result<BodyHandle, PhysicsError> {
        let mut geometry = G::from_vertices(&desc.vertices)?;
        geometry.transform(desc.position, desc.angle);
        let aabb = geometry.bounding_box();

        let handle = self.bodies.insert(Body::new(&desc, geometry))?;
        self.islands.clear(handle.index());
        self.broad_phase.add_body(handle, aabb);
        trace!("add body {:?}", handle);
        Ok(handle)
    }

    /// Remove a body: `Removed` event, wake its island, purge its contacts,
    /// drop it from the broad phase and retire the handle.
    ///
    /// Sleeping islands the body was touching wake up as well, whatever the
    /// body's kind, so nothing stays parked on a floor that no longer exists.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        let bounds = self.bodies.get(handle)?.geometry.bounding_box();
        self.emit(handle, EventKind::Removed);
        self.detach_from_island(handle);

        let purged = self.contacts.purge_body(handle);
        self.step.contacts_released += purged.len() as u32;
        let mut touching: BTreeSet<BodyHandle> = purged
            .iter()
            .map(|c| if c.key.body_a == handle { c.key.body_b } else { c.key.body_a })
            .collect();
        touching.extend(
            self.bodies
                .iter()
                .filter(|(h, b)| {
                    *h != handle
                        && b.dynamic
                        && !b.awake
                        && b.geometry.bounding_box().intersects(&bounds)
                })
                .map(|(h, _)| h),
        );

        self.broad_phase.remove_body(handle);
        self.bodies.remove(handle)?;
        self.islands.clear(handle.index());
        for body in touching {
            self.wake_island(body);
        }
        trace!("remove body {:?} ({} contacts purged)", handle, purged.len());
        Ok(())
    }

    /// Wake the rest of a departing body's island and keep it grouped
    /// without links through the freed slot.
    fn detach_from_island(&mut self, handle: BodyHandle) {
        let Ok(body) = self.bodies.get(handle) else {
            return;
        };
        if !body.dynamic {
            return;
        }
        let root = self.islands.find(handle.index());
        let islands = &self.islands;
        let members: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(h, b)| *h != handle && b.dynamic && islands.root(h.index()) == root)
            .map(|(h, _)| h)
            .collect();

        for &member in &members {
            self.wake_body(member);
        }
        let indices: Vec<u32> = members.iter().map(|h| h.index()).collect();
        self.islands.regroup(&indices);
    }

    /// Borrow a body
    pub fn body(&self, handle: BodyHandle) -> Result<&Body<G>, PhysicsError> {
        self.bodies.get(handle)
    }

    /// True iff the handle refers to a live body
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    /// Live body count
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Live handles in ascending slot order
    pub fn bodies(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.bodies.handles()
    }

    /// Body position
    pub fn position(&self, handle: BodyHandle) -> Result<Vec2Fix, PhysicsError> {
        Ok(self.bodies.get(handle)?.position)
    }

    /// Body orientation
    pub fn angle(&self, handle: BodyHandle) -> Result<Fix128, PhysicsError> {
        Ok(self.bodies.get(handle)?.angle)
    }

    /// Linear velocity
    pub fn velocity(&self, handle: BodyHandle) -> Result<Vec2Fix, PhysicsError> {
        Ok(self.bodies.get(handle)?.velocity)
    }

    /// Angular velocity
    pub fn angular_velocity(&self, handle: BodyHandle) -> Result<Fix128, PhysicsError> {
        Ok(self.bodies.get(handle)?.angular_velocity)
    }

    /// Inverse mass (zero for static and kinematic bodies)
    pub fn inverse_mass(&self, handle: BodyHandle) -> Result<Fix128, PhysicsError> {
        Ok(self.bodies.get(handle)?.inv_mass)
    }

    /// Inverse moment of inertia
    pub fn inverse_inertia(&self, handle: BodyHandle) -> Result<Fix128, PhysicsError> {
        Ok(self.bodies.get(handle)?.inv_inertia)
    }

    /// True iff the body has finite mass or finite inertia
    pub fn is_dynamic(&self, handle: BodyHandle) -> Result<bool, PhysicsError> {
        Ok(self.bodies.get(handle)?.dynamic)
    }

    /// True for awake dynamic bodies
    pub fn is_awake(&self, handle: BodyHandle) -> Result<bool, PhysicsError> {
        Ok(self.bodies.get(handle)?.is_awake())
    }

    /// World-space bounding box
    pub fn bounding_box(&self, handle: BodyHandle) -> Result<Aabb, PhysicsError> {
        Ok(self.bodies.get(handle)?.geometry.bounding_box())
    }

    /// Current island root of a body (its own slot for non-dynamic bodies)
    pub fn island_id(&self, handle: BodyHandle) -> Result<u32, PhysicsError> {
        let body = self.bodies.get(handle)?;
        if !body.dynamic {
            return Ok(handle.index());
        }
        Ok(self.islands.root(handle.index()))
    }

    // ------------------------------------------------------------------------
    // External stimuli
    // ------------------------------------------------------------------------

    /// Apply a force for `dt`, optionally at a world-space point (adds
    /// torque). Wakes the body's island.
    pub fn apply_force(
        &mut self,
        handle: BodyHandle,
        dt: Fix128,
        force: Vec2Fix,
        point: Option<Vec2Fix>,
    ) -> Result<(), PhysicsError> {
        if !self.bodies.get(handle)?.dynamic {
            return Ok(());
        }
        self.wake_island(handle);
        let body = self.bodies.get_mut(handle)?;
        body.velocity += force * body.inv_mass * dt;
        if let Some(point) = point {
            body.angular_velocity += (point - body.position).cross(force) * body.inv_inertia * dt;
        }
        Ok(())
    }

    /// Apply a linear and an angular impulse at the center. Wakes the body's
    /// island.
    pub fn apply_impulse(
        &mut self,
        handle: BodyHandle,
        impulse: Vec2Fix,
        angular: Fix128,
    ) -> Result<(), PhysicsError> {
        if !self.bodies.get(handle)?.dynamic {
            return Ok(());
        }
        self.wake_island(handle);
        let body = self.bodies.get_mut(handle)?;
        body.velocity += impulse * body.inv_mass;
        body.angular_velocity += angular * body.inv_inertia;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Listeners, events, inspection
    // ------------------------------------------------------------------------

    /// Attach a listener to a body. The world keeps only the weak reference.
    pub fn set_listener(
        &mut self,
        handle: BodyHandle,
        listener: Weak<RefCell<dyn Listener>>,
    ) -> Result<(), PhysicsError> {
        self.bodies.get_mut(handle)?.listener = Some(listener);
        Ok(())
    }

    /// Detach a body's listener
    pub fn clear_listener(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        self.bodies.get_mut(handle)?.listener = None;
        Ok(())
    }

    /// Events raised since the last `update` started (or the last drain)
    pub fn events(&self) -> &[Event] {
        self.events.as_slice()
    }

    /// Take the event log
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    /// Live contacts in key order
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> + '_ {
        self.contacts.iter()
    }

    /// Look up a contact
    pub fn contact(&self, key: &ContactKey) -> Option<&Contact> {
        self.contacts.find(key)
    }

    /// Counters of the last completed step
    pub fn stats(&self) -> &StepStats {
        &self.profiler.last
    }

    /// Last-step counters plus running totals
    pub fn profiler(&self) -> &StepProfiler {
        &self.profiler
    }

    fn emit(&mut self, body: BodyHandle, kind: EventKind) {
        let event = Event { body, kind };
        let listener = self
            .bodies
            .get(body)
            .ok()
            .and_then(|b| b.listener.clone());
        deliver(listener.as_ref(), &event);
        self.events.push(event);
    }

    // ------------------------------------------------------------------------
    // Sleep / wake
    // ------------------------------------------------------------------------

    fn wake_body(&mut self, handle: BodyHandle) {
        let Ok(body) = self.bodies.get_mut(handle) else {
            return;
        };
        if !body.dynamic || body.awake {
            return;
        }
        body.awake = true;
        self.islands.begin_frame(handle.index());
        self.islands.reset_idle(handle.index());
        self.step.wakes += 1;
        self.emit(handle, EventKind::Wake);
    }

    /// Wake every sleeping member of the body's island. Idempotent.
    fn wake_island(&mut self, handle: BodyHandle) {
        match self.bodies.get(handle) {
            Ok(body) if body.dynamic && !body.awake => {}
            _ => return,
        }
        let root = self.islands.find(handle.index());
        let islands = &self.islands;
        let members: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(h, b)| b.dynamic && !b.awake && islands.root(h.index()) == root)
            .map(|(h, _)| h)
            .collect();

        trace!("wake island {} ({} bodies)", root, members.len());
        self.islands.reset_idle(root);
        for member in members {
            self.wake_body(member);
        }
    }

    fn sleep_island(&mut self, root: u32) {
        let islands = &self.islands;
        let members: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(h, b)| b.is_awake() && islands.root(h.index()) == root)
            .map(|(h, _)| h)
            .collect();

        trace!("sleep island {} ({} bodies)", root, members.len());
        for member in members {
            if let Ok(body) = self.bodies.get_mut(member) {
                body.put_to_sleep();
                self.step.sleeps += 1;
                self.emit(member, EventKind::Sleep);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Step
    // ------------------------------------------------------------------------

    /// Advance the simulation by `dt`. Non-positive `dt` does nothing.
    pub fn update(&mut self, dt: Fix128) {
        if !dt.is_positive() {
            return;
        }
        self.events.clear();
        self.step.reset();
        self.islands.resize(self.bodies.slot_count());

        self.begin_islands_and_gravity(dt);
        self.contacts.begin_frame();
        self.generate_contacts(dt);
        self.release_stale_contacts();

        self.step.solver_sweeps = solver::solve(
            &mut self.contacts,
            &mut self.bodies,
            &self.queue,
            self.config.iterations,
        );

        self.integrate(dt);
        self.evaluate_sleep();

        debug!("step: {}", self.step);
        self.profiler.record(self.step);
    }

    /// Phase 1
    fn begin_islands_and_gravity(&mut self, dt: Fix128) {
        let gravity = self.config.gravity;
        for (handle, body) in self.bodies.iter_mut() {
            if !body.is_awake() {
                continue;
            }
            self.islands.begin_frame(handle.index());
            if !body.inv_mass.is_zero() {
                let force = gravity / body.inv_mass;
                body.velocity += force * body.inv_mass * dt;
            }
        }
    }

    /// Phase 3
    fn generate_contacts(&mut self, dt: Fix128) {
        self.queue.clear();
        self.broad_phase.begin_frame();
        while self.broad_phase.has_more() {
            let Some((x, y)) = self.broad_phase.next_pair() else {
                break;
            };
            self.step.candidate_pairs += 1;
            let (a, b) = if x < y { (x, y) } else { (y, x) };
            self.process_pair(a, b, dt);
        }
    }

    fn process_pair(&mut self, a: BodyHandle, b: BodyHandle, dt: Fix128) {
        if a == b {
            return;
        }
        let (Ok(body_a), Ok(body_b)) = (self.bodies.get(a), self.bodies.get(b)) else {
            return;
        };
        if !body_a.dynamic && !body_b.dynamic {
            return;
        }
        let active = |body: &Body<G>| body.is_awake() || body.is_kinematic();
        if !active(body_a) && !active(body_b) {
            return;
        }
        if !CollisionFilter::can_collide(&body_a.filter, &body_b.filter) {
            return;
        }

        self.step.narrowphase_tests += 1;
        let Some(manifold) = body_a.geometry.collides(&body_b.geometry) else {
            return;
        };
        let materials = (
            body_a.restitution,
            body_b.restitution,
            body_a.friction,
            body_b.friction,
        );
        let both_dynamic = body_a.dynamic && body_b.dynamic;
        self.step.manifolds += 1;

        self.wake_island(a);
        self.wake_island(b);
        if both_dynamic {
            self.islands.union(a.index(), b.index());
        }

        let key = ContactKey::new(a, b, manifold.feature);
        if self.contacts.seen(&key) {
            return;
        }
        let slot = match self.contacts.touch(&key) {
            Some(slot) => slot,
            None if manifold.depth > self.config.slop => {
                let (ra, rb, fa, fb) = materials;
                let slot = self.contacts.insert(Contact::new(key, ra, rb, fa, fb));
                self.step.contacts_created += 1;
                trace!("contact created {:?}", key);
                self.emit(
                    a,
                    EventKind::CollisionEnter {
                        other: b,
                        feature: manifold.feature,
                        point: manifold.point_a,
                        normal: manifold.normal,
                    },
                );
                self.emit(
                    b,
                    EventKind::CollisionEnter {
                        other: a,
                        feature: manifold.feature,
                        point: manifold.point_b,
                        normal: -manifold.normal,
                    },
                );
                slot
            }
            None => return,
        };

        let params = SolverParams {
            dt,
            baumgarte: self.config.baumgarte,
            slop: self.config.slop,
            restitution_threshold: self.config.restitution_threshold,
        };
        let Some(contact) = self.contacts.get_mut(slot) else {
            return;
        };
        let Some((body_a, body_b)) = self.bodies.pair_mut(a.index(), b.index()) else {
            return;
        };
        if solver::prepare(contact, body_a, body_b, &manifold, &params) {
            self.queue.push(slot);
            self.step.active_constraints += 1;
        }
    }

    /// Phase 4
    fn release_stale_contacts(&mut self) {
        for contact in self.contacts.release_unseen() {
            let (a, b) = (contact.key.body_a, contact.key.body_b);
            self.step.contacts_released += 1;
            trace!("contact released {:?}", contact.key);

            let awake = |h| self.bodies.get(h).map_or(false, |body| body.is_awake());
            if awake(a) || awake(b) {
                self.emit(a, EventKind::CollisionExit { other: b });
                self.emit(b, EventKind::CollisionExit { other: a });
            }
        }
    }

    /// Phase 6
    fn integrate(&mut self, dt: Fix128) {
        let damping = self.config.damping;
        let bound = Aabb::new(
            Vec2Fix::new(-self.config.bound, -self.config.bound),
            Vec2Fix::new(self.config.bound, self.config.bound),
        );
        let mut escaped = Vec::new();

        for (handle, body) in self.bodies.iter_mut() {
            if !body.is_awake() && !body.is_kinematic() {
                continue;
            }
            body.position += body.velocity * dt;
            body.angle += body.angular_velocity * dt;
            if body.dynamic {
                body.velocity = body.velocity * damping;
                body.angular_velocity = body.angular_velocity * damping;
            }

            body.geometry.transform(body.position, body.angle);
            let aabb = body.geometry.bounding_box();
            self.broad_phase.update_body(handle, aabb);
            if !aabb.intersects(&bound) {
                escaped.push(handle);
            }
        }

        for handle in escaped {
            if self.remove_body(handle).is_ok() {
                self.step.bodies_removed += 1;
            }
        }
    }

    /// Phase 7
    fn evaluate_sleep(&mut self) {
        let frames = self.config.sleep_frames;
        if frames == 0 {
            return;
        }
        let mut roots = BTreeSet::new();
        for (handle, body) in self.bodies.iter() {
            if !body.is_awake() {
                continue;
            }
            let energy = body.velocity.length_squared() + body.angular_velocity.square();
            roots.insert(self.islands.accumulate(handle.index(), energy));
        }

        for root in roots {
            let verdict = self
                .islands
                .evaluate(root, self.config.sleep_threshold, frames);
            if verdict == SleepVerdict::Sleep {
                self.sleep_island(root);
            }
        }
    }
}

impl<G: Geometry, B: BroadPhase> core::fmt::Debug for World<G, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("World")
            .field("bodies", &self.bodies.len())
            .field("contacts", &self.contacts.len())
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use approx::assert_abs_diff_eq;

    fn dt() -> Fix128 {
        Fix128::from_ratio(1, 60)
    }

    fn unit_box(x: i64, y: i64) -> BodyDesc {
        BodyDesc::rectangle(Fix128::HALF, Fix128::HALF)
            .with_mass(Fix128::ONE)
            .with_position(Vec2Fix::from_int(x, y))
    }

    fn floor() -> BodyDesc {
        BodyDesc::rectangle(Fix128::from_int(20), Fix128::HALF)
    }

    #[test]
    fn test_config_validation() {
        assert!(WorldConfig::default().validate().is_ok());
        let bad = [
            WorldConfig::default().with_iterations(0),
            WorldConfig::default().with_damping(Fix128::from_int(2)),
            WorldConfig::default().with_bound(Fix128::ZERO),
            WorldConfig::default().with_slop(Fix128::NEG_ONE),
            WorldConfig::default().with_baumgarte(Fix128::NEG_ONE),
        ];
        for config in bad {
            assert!(matches!(
                World::new(config),
                Err(PhysicsError::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn test_add_body_rejects_bad_shape() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        let desc = BodyDesc::new(vec![Vec2Fix::ZERO, Vec2Fix::UNIT_X]);
        assert!(matches!(
            world.add_body(desc),
            Err(PhysicsError::InvalidShape { .. })
        ));
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_queries_and_stale_handles() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        let a = world.add_body(unit_box(1, 2)).unwrap();
        let s = world.add_body(floor()).unwrap();

        assert_eq!(world.position(a).unwrap(), Vec2Fix::from_int(1, 2));
        assert!(world.is_dynamic(a).unwrap());
        assert!(!world.is_dynamic(s).unwrap());
        assert!(world.is_awake(a).unwrap());
        assert!(!world.is_awake(s).unwrap());
        assert_eq!(world.inverse_mass(a).unwrap(), Fix128::ONE);

        world.remove_body(a).unwrap();
        assert!(!world.contains(a));
        assert!(matches!(world.position(a), Err(PhysicsError::InvalidHandle { .. })));
        assert!(world.remove_body(a).is_err());
        assert!(world.apply_impulse(a, Vec2Fix::UNIT_X, Fix128::ZERO).is_err());

        let c = world.add_body(unit_box(0, 0)).unwrap();
        assert_eq!(c.index(), a.index());
        assert_ne!(c, a);
        assert_eq!(world.bodies().collect::<Vec<_>>(), vec![c, s]);
    }

    #[test]
    fn test_gravity_goes_through_force_path() {
        let config = WorldConfig::default().with_damping(Fix128::ONE);
        let mut world = World::new(config).unwrap();
        let heavy = world
            .add_body(unit_box(0, 10).with_mass(Fix128::from_int(4)))
            .unwrap();
        world.update(dt());
        assert_abs_diff_eq!(world.velocity(heavy).unwrap().y.to_f64(), -9.8 / 60.0, epsilon = 1e-12);
    }

    #[test]
    fn test_non_positive_dt_is_noop() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        let a = world.add_body(unit_box(0, 10)).unwrap();
        world.update(Fix128::ZERO);
        world.update(-dt());
        assert_eq!(world.velocity(a).unwrap(), Vec2Fix::ZERO);
        assert_eq!(world.profiler().frame_count, 0);
    }

    #[test]
    fn test_kinematic_body_moves_without_damping() {
        let config = WorldConfig::default().with_gravity(Vec2Fix::ZERO);
        let mut world = World::new(config).unwrap();
        let platform = world
            .add_body(BodyDesc::rectangle(Fix128::ONE, Fix128::HALF).with_velocity(Vec2Fix::from_int(3, 0)))
            .unwrap();
        for _ in 0..60 {
            world.update(dt());
        }
        assert_eq!(world.velocity(platform).unwrap(), Vec2Fix::from_int(3, 0));
        assert_abs_diff_eq!(world.position(platform).unwrap().x.to_f64(), 3.0, epsilon = 1e-9);
        assert!(!world.is_awake(platform).unwrap());
    }

    #[test]
    fn test_body_leaving_bound_is_removed() {
        let config = WorldConfig::default()
            .with_gravity(Vec2Fix::ZERO)
            .with_bound(Fix128::from_int(5));
        let mut world = World::new(config).unwrap();
        let runner = world
            .add_body(unit_box(4, 0).with_velocity(Vec2Fix::from_int(60, 0)))
            .unwrap();

        world.update(dt());
        world.update(dt());
        assert!(!world.contains(runner));
        assert_eq!(world.stats().bodies_removed, 1);
        assert!(world
            .events()
            .iter()
            .any(|e| e.body == runner && e.kind == EventKind::Removed));
    }

    #[test]
    fn test_apply_force_at_point_adds_torque() {
        let config = WorldConfig::default().with_gravity(Vec2Fix::ZERO);
        let mut world = World::new(config).unwrap();
        let a = world.add_body(unit_box(0, 0)).unwrap();
        world
            .apply_force(a, Fix128::ONE, Vec2Fix::from_int(0, 2), Some(Vec2Fix::from_int(1, 0)))
            .unwrap();
        assert_eq!(world.velocity(a).unwrap(), Vec2Fix::from_int(0, 2));
        // Approximate moment of a unit box with mass 1 is 0.5
        assert_abs_diff_eq!(world.angular_velocity(a).unwrap().to_f64(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_static_body_ignores_stimuli() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        let s = world.add_body(floor()).unwrap();
        world.apply_impulse(s, Vec2Fix::from_int(5, 5), Fix128::ONE).unwrap();
        assert_eq!(world.velocity(s).unwrap(), Vec2Fix::ZERO);
        assert!(world.events().is_empty());
    }

    #[test]
    fn test_filtered_pair_never_touches() {
        let config = WorldConfig::default().with_gravity(Vec2Fix::ZERO);
        let mut world = World::new(config).unwrap();
        let a = world
            .add_body(unit_box(0, 0).with_filter(CollisionFilter::new(1, 1)))
            .unwrap();
        let b = world
            .add_body(unit_box(0, 0).with_filter(CollisionFilter::new(2, 2)))
            .unwrap();
        world.update(dt());
        assert_eq!(world.contacts().count(), 0);
        assert_eq!(world.stats().narrowphase_tests, 0);
        assert_eq!(world.stats().candidate_pairs, 1);
        assert_ne!(world.island_id(a).unwrap(), world.island_id(b).unwrap());
    }

    #[test]
    fn test_listener_receives_enter_with_sided_normals() {
        let config = WorldConfig::default().with_gravity(Vec2Fix::ZERO);
        let mut world = World::new(config).unwrap();
        let a = world.add_body(unit_box(0, 0)).unwrap();
        let b = world
            .add_body(
                unit_box(0, 0)
                    .with_position(Vec2Fix::new(Fix128::from_ratio(9, 10), Fix128::ZERO)),
            )
            .unwrap();

        let seen: Rc<RefCell<Vec<Event>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let listener: Rc<RefCell<dyn Listener>> =
            Rc::new(RefCell::new(move |e: &Event| sink.borrow_mut().push(*e)));
        world.set_listener(a, Rc::downgrade(&listener)).unwrap();
        world.set_listener(b, Rc::downgrade(&listener)).unwrap();

        world.update(dt());
        let seen = seen.borrow();
        let normal_of = |body| {
            seen.iter().find_map(|e| match e.kind {
                EventKind::CollisionEnter { normal, .. } if e.body == body => Some(normal),
                _ => None,
            })
        };
        let na = normal_of(a).expect("enter for a");
        let nb = normal_of(b).expect("enter for b");
        assert!(na.x.is_positive());
        assert_eq!(nb, -na);
        assert_eq!(world.events().len(), seen.len());
    }

    #[test]
    fn test_wake_clears_stale_island_aggregates() {
        let config = WorldConfig::default().with_sleep_frames(10);
        let mut world = World::new(config).unwrap();
        world.add_body(floor()).unwrap();
        let low = world.add_body(unit_box(0, 1)).unwrap();
        let high = world.add_body(unit_box(0, 2)).unwrap();
        for _ in 0..600 {
            world.update(dt());
            if !world.is_awake(high).unwrap() {
                break;
            }
        }
        assert!(!world.is_awake(low).unwrap());
        let root = world.islands.find(high.index());
        assert_eq!(root, world.islands.find(low.index()));

        // Leftovers from the frame the island went to sleep
        world.islands.accumulate(high.index(), Fix128::from_int(100));
        world.apply_impulse(high, Vec2Fix::ZERO, Fix128::ZERO).unwrap();

        assert!(world.is_awake(low).unwrap());
        assert_eq!(world.islands.mean_energy(root), Fix128::ZERO);
        assert_eq!(world.islands.root(low.index()), low.index());
        assert_eq!(world.islands.root(high.index()), high.index());
    }

    #[test]
    fn test_clear_listener_stops_delivery() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        let a = world.add_body(unit_box(0, 0)).unwrap();
        let count = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&count);
        let listener: Rc<RefCell<dyn Listener>> =
            Rc::new(RefCell::new(move |_: &Event| *sink.borrow_mut() += 1));
        world.set_listener(a, Rc::downgrade(&listener)).unwrap();
        world.clear_listener(a).unwrap();
        world.remove_body(a).unwrap();
        assert_eq!(*count.borrow(), 0);
        assert_eq!(world.drain_events().len(), 1);
        assert!(world.events().is_empty());
    }
}
