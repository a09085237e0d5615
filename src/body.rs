//! Body Registry
//!
//! Rigid bodies live in an arena of slots addressed by [`BodyHandle`]. A
//! handle carries the slot index and the slot generation at insertion time;
//! removal bumps the generation, so a handle kept past removal is detected
//! instead of silently reaching whatever body reuses the slot.
//!
//! Freed slots are reused last-in first-out.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use alloc::rc::Weak;
use core::cell::RefCell;

use crate::error::PhysicsError;
use crate::event::Listener;
use crate::filter::CollisionFilter;
use crate::math::{Fix128, Vec2Fix};
use crate::shape::rectangle_vertices;

// ============================================================================
// BodyHandle
// ============================================================================

/// Generation-checked reference to a body.
///
/// Handles order by slot index first, which is the canonical order used for
/// contact pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index (reused after removal)
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation at the time the handle was issued
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    fn invalid(self) -> PhysicsError {
        PhysicsError::InvalidHandle {
            index: self.index,
            generation: self.generation,
        }
    }
}

// ============================================================================
// BodyDesc
// ============================================================================

/// Everything needed to create a body.
///
/// A description with `mass <= 0` and no positive moment describes a static
/// body. Give it a velocity to make it kinematic.
#[derive(Clone, Debug)]
pub struct BodyDesc {
    /// Shape vertices in body-local space
    pub vertices: Vec<Vec2Fix>,
    /// Initial position of the body origin
    pub position: Vec2Fix,
    /// Initial orientation (radians, counter-clockwise)
    pub angle: Fix128,
    /// Initial linear velocity
    pub velocity: Vec2Fix,
    /// Initial angular velocity
    pub angular_velocity: Fix128,
    /// Mass (`<= 0` means infinite)
    pub mass: Fix128,
    /// Moment of inertia; `None` derives it from the vertices
    pub moment: Option<Fix128>,
    /// Coefficient of restitution
    pub restitution: Fix128,
    /// Friction coefficient
    pub friction: Fix128,
    /// Layer/mask filter
    pub filter: CollisionFilter,
}

impl BodyDesc {
    /// Static body with the given local vertices at the origin.
    pub fn new(vertices: Vec<Vec2Fix>) -> Self {
        Self {
            vertices,
            position: Vec2Fix::ZERO,
            angle: Fix128::ZERO,
            velocity: Vec2Fix::ZERO,
            angular_velocity: Fix128::ZERO,
            mass: Fix128::ZERO,
            moment: None,
            restitution: Fix128::ZERO,
            friction: Fix128::from_ratio(1, 2),
            filter: CollisionFilter::DEFAULT,
        }
    }

    /// Static axis-aligned rectangle centered on its origin.
    pub fn rectangle(half_width: Fix128, half_height: Fix128) -> Self {
        Self::new(rectangle_vertices(half_width, half_height))
    }

    /// Set the initial position
    #[must_use]
    pub fn with_position(mut self, position: Vec2Fix) -> Self {
        self.position = position;
        self
    }

    /// Set the initial orientation
    #[must_use]
    pub fn with_angle(mut self, angle: Fix128) -> Self {
        self.angle = angle;
        self
    }

    /// Set the initial linear velocity
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2Fix) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the initial angular velocity
    #[must_use]
    pub fn with_angular_velocity(mut self, angular_velocity: Fix128) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Set the mass
    #[must_use]
    pub fn with_mass(mut self, mass: Fix128) -> Self {
        self.mass = mass;
        self
    }

    /// Set the moment of inertia explicitly
    #[must_use]
    pub fn with_moment(mut self, moment: Fix128) -> Self {
        self.moment = Some(moment);
        self
    }

    /// Set the restitution
    #[must_use]
    pub fn with_restitution(mut self, restitution: Fix128) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set the friction coefficient
    #[must_use]
    pub fn with_friction(mut self, friction: Fix128) -> Self {
        self.friction = friction;
        self
    }

    /// Set the collision filter
    #[must_use]
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Inverse mass and inverse moment of inertia for a description.
///
/// Without an explicit moment, the moment is `mass / n * Σ |v_i - c|²` with
/// `c` the vertex mean. This is an approximation, not the exact polygon
/// inertia.
pub fn inverse_mass_properties(
    mass: Fix128,
    moment: Option<Fix128>,
    vertices: &[Vec2Fix],
) -> (Fix128, Fix128) {
    let moment = moment.unwrap_or_else(|| approximate_moment(mass, vertices));
    (invert(mass), invert(moment))
}

fn approximate_moment(mass: Fix128, vertices: &[Vec2Fix]) -> Fix128 {
    if vertices.is_empty() || !mass.is_positive() {
        return Fix128::ZERO;
    }
    let n = Fix128::from_int(vertices.len() as i64);
    let mut centroid = Vec2Fix::ZERO;
    for v in vertices {
        centroid += *v;
    }
    let centroid = centroid / n;

    let mut spread = Fix128::ZERO;
    for v in vertices {
        spread += (*v - centroid).length_squared();
    }
    mass / n * spread
}

#[inline]
fn invert(x: Fix128) -> Fix128 {
    if x.is_positive() {
        Fix128::ONE / x
    } else {
        Fix128::ZERO
    }
}

// ============================================================================
// Body
// ============================================================================

/// A rigid body and its owned geometry.
pub struct Body<G> {
    pub(crate) position: Vec2Fix,
    pub(crate) angle: Fix128,
    pub(crate) velocity: Vec2Fix,
    pub(crate) angular_velocity: Fix128,
    pub(crate) inv_mass: Fix128,
    pub(crate) inv_inertia: Fix128,
    pub(crate) restitution: Fix128,
    pub(crate) friction: Fix128,
    pub(crate) filter: CollisionFilter,
    pub(crate) dynamic: bool,
    pub(crate) awake: bool,
    pub(crate) geometry: G,
    pub(crate) listener: Option<Weak<RefCell<dyn Listener>>>,
}

impl<G> Body<G> {
    /// Build a body from its description and already-transformed geometry.
    pub(crate) fn new(desc: &BodyDesc, geometry: G) -> Self {
        let (inv_mass, inv_inertia) =
            inverse_mass_properties(desc.mass, desc.moment, &desc.vertices);
        let dynamic = !inv_mass.is_zero() || !inv_inertia.is_zero();
        Self {
            position: desc.position,
            angle: desc.angle,
            velocity: desc.velocity,
            angular_velocity: desc.angular_velocity,
            inv_mass,
            inv_inertia,
            restitution: desc.restitution,
            friction: desc.friction,
            filter: desc.filter,
            dynamic,
            awake: dynamic,
            geometry,
            listener: None,
        }
    }

    /// World-space position
    #[inline]
    pub fn position(&self) -> Vec2Fix {
        self.position
    }

    /// Orientation in radians
    #[inline]
    pub fn angle(&self) -> Fix128 {
        self.angle
    }

    /// Linear velocity
    #[inline]
    pub fn velocity(&self) -> Vec2Fix {
        self.velocity
    }

    /// Angular velocity
    #[inline]
    pub fn angular_velocity(&self) -> Fix128 {
        self.angular_velocity
    }

    /// Inverse mass (zero for static and kinematic bodies)
    #[inline]
    pub fn inverse_mass(&self) -> Fix128 {
        self.inv_mass
    }

    /// Inverse moment of inertia
    #[inline]
    pub fn inverse_inertia(&self) -> Fix128 {
        self.inv_inertia
    }

    /// Restitution coefficient
    #[inline]
    pub fn restitution(&self) -> Fix128 {
        self.restitution
    }

    /// Friction coefficient
    #[inline]
    pub fn friction(&self) -> Fix128 {
        self.friction
    }

    /// Layer/mask filter
    #[inline]
    pub fn filter(&self) -> CollisionFilter {
        self.filter
    }

    /// True iff the body has finite mass or finite inertia
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Awake dynamic body. Static and kinematic bodies are never awake.
    #[inline]
    pub fn is_awake(&self) -> bool {
        self.dynamic && self.awake
    }

    /// Non-dynamic body that moves on its own velocity
    #[inline]
    pub fn is_kinematic(&self) -> bool {
        !self.dynamic && (self.velocity != Vec2Fix::ZERO || !self.angular_velocity.is_zero())
    }

    /// Owned geometry at the current transform
    #[inline]
    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// Velocity of the body point at offset `r` from its center.
    #[inline]
    pub(crate) fn velocity_at(&self, r: Vec2Fix) -> Vec2Fix {
        self.velocity + r.perpendicular() * self.angular_velocity
    }

    /// Apply an impulse at offset `r` from the center.
    #[inline]
    pub(crate) fn apply_impulse_at(&mut self, impulse: Vec2Fix, r: Vec2Fix) {
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += r.cross(impulse) * self.inv_inertia;
    }

    pub(crate) fn put_to_sleep(&mut self) {
        self.awake = false;
        self.velocity = Vec2Fix::ZERO;
        self.angular_velocity = Fix128::ZERO;
    }
}

impl<G> core::fmt::Debug for Body<G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Body")
            .field("position", &self.position)
            .field("angle", &self.angle)
            .field("velocity", &self.velocity)
            .field("angular_velocity", &self.angular_velocity)
            .field("dynamic", &self.dynamic)
            .field("awake", &self.awake)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BodyRegistry
// ============================================================================

struct Slot<G> {
    generation: u32,
    body: Option<Body<G>>,
}

/// Arena of body slots with a LIFO free-list.
pub struct BodyRegistry<G> {
    slots: Vec<Slot<G>>,
    free: Vec<u32>,
    len: usize,
}

impl<G> Default for BodyRegistry<G> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<G> BodyRegistry<G> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Live body count
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no body is alive
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated (live + free)
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Store a body, reusing the most recently freed slot if any.
    pub fn insert(&mut self, body: Body<G>) -> Result<BodyHandle, PhysicsError> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| {
                    PhysicsError::CapacityExceeded {
                        resource: "body slots",
                        limit: u32::MAX as usize,
                    }
                })?;
                self.slots.push(Slot {
                    generation: 0,
                    body: None,
                });
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.body = Some(body);
        self.len += 1;
        Ok(BodyHandle::new(index, slot.generation))
    }

    /// Take a body out and retire its slot.
    pub fn remove(&mut self, handle: BodyHandle) -> Result<Body<G>, PhysicsError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .ok_or_else(|| handle.invalid())?;
        let body = slot.body.take().ok_or_else(|| handle.invalid())?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Ok(body)
    }

    /// True iff the handle refers to a live body
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_ok()
    }

    /// Borrow a live body
    pub fn get(&self, handle: BodyHandle) -> Result<&Body<G>, PhysicsError> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_ref())
            .ok_or_else(|| handle.invalid())
    }

    /// Mutably borrow a live body
    pub fn get_mut(&mut self, handle: BodyHandle) -> Result<&mut Body<G>, PhysicsError> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_mut())
            .ok_or_else(|| handle.invalid())
    }

    /// Two distinct live bodies at once, by slot index.
    pub(crate) fn pair_mut(&mut self, a: u32, b: u32) -> Option<(&mut Body<G>, &mut Body<G>)> {
        let (a, b) = (a as usize, b as usize);
        if a == b || a.max(b) >= self.slots.len() {
            return None;
        }
        let (body_a, body_b) = if a < b {
            let (lo, hi) = self.slots.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.slots.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        };
        Some((body_a.body.as_mut()?, body_b.body.as_mut()?))
    }

    /// Live handles in ascending slot order
    pub fn handles(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.iter().map(|(h, _)| h)
    }

    /// Live bodies in ascending slot order
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &Body<G>)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.body
                .as_ref()
                .map(|b| (BodyHandle::new(i as u32, s.generation), b))
        })
    }

    /// Live bodies in ascending slot order, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut Body<G>)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| {
            let generation = s.generation;
            s.body
                .as_mut()
                .map(|b| (BodyHandle::new(i as u32, generation), b))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn body(mass: i64) -> Body<()> {
        let desc = BodyDesc::rectangle(Fix128::ONE, Fix128::ONE).with_mass(Fix128::from_int(mass));
        Body::new(&desc, ())
    }

    #[test]
    fn test_static_when_mass_and_moment_not_positive() {
        let b = body(0);
        assert!(!b.is_dynamic());
        assert!(!b.is_awake());
        assert!(b.inverse_mass().is_zero());
        assert!(b.inverse_inertia().is_zero());
    }

    #[test]
    fn test_approximate_moment() {
        // 2x2 square, mass 4: every corner sits at distance² 2 from the center
        let b = body(4);
        assert!(b.is_dynamic());
        assert!(b.is_awake());
        assert_abs_diff_eq!(b.inverse_mass().to_f64(), 0.25, epsilon = 1e-15);
        assert_abs_diff_eq!(b.inverse_inertia().to_f64(), 1.0 / 8.0, epsilon = 1e-15);
    }

    #[test]
    fn test_explicit_moment_wins() {
        let (inv_m, inv_i) =
            inverse_mass_properties(Fix128::from_int(2), Some(Fix128::ZERO), &[]);
        assert_abs_diff_eq!(inv_m.to_f64(), 0.5, epsilon = 1e-15);
        assert!(inv_i.is_zero());

        // Infinite mass but finite inertia is still dynamic
        let desc = BodyDesc::rectangle(Fix128::ONE, Fix128::ONE).with_moment(Fix128::from_int(3));
        let b: Body<()> = Body::new(&desc, ());
        assert!(b.is_dynamic());
        assert!(b.inverse_mass().is_zero());
    }

    #[test]
    fn test_kinematic_detection() {
        let desc = BodyDesc::rectangle(Fix128::ONE, Fix128::ONE)
            .with_velocity(Vec2Fix::from_int(1, 0));
        let b: Body<()> = Body::new(&desc, ());
        assert!(!b.is_dynamic());
        assert!(b.is_kinematic());
    }

    #[test]
    fn test_registry_reuses_slots_with_new_generation() {
        let mut reg = BodyRegistry::new();
        let a = reg.insert(body(1)).unwrap();
        let b = reg.insert(body(1)).unwrap();
        assert_eq!(reg.len(), 2);

        reg.remove(a).unwrap();
        assert!(!reg.contains(a));
        assert!(matches!(
            reg.get(a),
            Err(PhysicsError::InvalidHandle { index: 0, generation: 0 })
        ));

        let c = reg.insert(body(1)).unwrap();
        assert_eq!(c.index(), a.index());
        assert_eq!(c.generation(), a.generation() + 1);
        assert!(reg.contains(b));
        assert!(reg.contains(c));
        assert!(!reg.contains(a));
        assert_eq!(reg.slot_count(), 2);
    }

    #[test]
    fn test_double_remove_is_rejected() {
        let mut reg = BodyRegistry::new();
        let a = reg.insert(body(1)).unwrap();
        assert!(reg.remove(a).is_ok());
        assert!(reg.remove(a).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut reg = BodyRegistry::new();
        let handles: Vec<_> = (0..4).map(|_| reg.insert(body(1)).unwrap()).collect();
        reg.remove(handles[1]).unwrap();
        reg.remove(handles[3]).unwrap();

        assert_eq!(reg.insert(body(1)).unwrap().index(), 3);
        assert_eq!(reg.insert(body(1)).unwrap().index(), 1);
        assert_eq!(reg.insert(body(1)).unwrap().index(), 4);
    }

    #[test]
    fn test_pair_mut() {
        let mut reg = BodyRegistry::new();
        let a = reg.insert(body(1)).unwrap();
        let b = reg.insert(body(2)).unwrap();

        let (ba, bb) = reg.pair_mut(b.index(), a.index()).unwrap();
        ba.velocity = Vec2Fix::from_int(5, 0);
        bb.velocity = Vec2Fix::from_int(-5, 0);

        assert_eq!(reg.get(b).unwrap().velocity(), Vec2Fix::from_int(5, 0));
        assert_eq!(reg.get(a).unwrap().velocity(), Vec2Fix::from_int(-5, 0));
        assert!(reg.pair_mut(a.index(), a.index()).is_none());
    }

    #[test]
    fn test_handles_ascending() {
        let mut reg = BodyRegistry::new();
        let hs: Vec<_> = (0..3).map(|_| reg.insert(body(1)).unwrap()).collect();
        reg.remove(hs[1]).unwrap();
        assert_eq!(reg.handles().collect::<Vec<_>>(), vec![hs[0], hs[2]]);
    }

    #[test]
    fn test_impulse_at_offset_spins_body() {
        let mut b = body(4);
        b.apply_impulse_at(Vec2Fix::from_int(0, 1), Vec2Fix::from_int(1, 0));
        assert_abs_diff_eq!(b.velocity().y.to_f64(), 0.25, epsilon = 1e-15);
        assert_abs_diff_eq!(b.angular_velocity().to_f64(), 0.125, epsilon = 1e-15);
        assert_abs_diff_eq!(
            b.velocity_at(Vec2Fix::from_int(1, 0)).y.to_f64(),
            0.375,
            epsilon = 1e-15
        );
    }
}
