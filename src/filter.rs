//! Collision Filtering (Layer/Mask System)
//!
//! Bitmask-based filtering applied to broad-phase pairs before the narrow
//! phase runs.
//!
//! ```
//! use alice_impulse2d::filter::CollisionFilter;
//!
//! let floor = CollisionFilter::new(1 << 1, u32::MAX);
//! let crate_box = CollisionFilter::new(1 << 0, 1 << 1); // only sees the floor
//! let ghost = CollisionFilter::new(1 << 3, 0);          // sees nothing
//!
//! assert!(CollisionFilter::can_collide(&floor, &crate_box));
//! assert!(!CollisionFilter::can_collide(&ghost, &floor));
//! ```

/// Collision filter using layer/mask bitmasks.
///
/// Two bodies can collide iff:
///   `(a.layer & b.mask) != 0 && (b.layer & a.mask) != 0`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CollisionFilter {
    /// Which layer(s) this body belongs to (bitmask)
    pub layer: u32,
    /// Which layers this body can collide with (bitmask)
    pub mask: u32,
}

impl CollisionFilter {
    /// Default filter: layer 1, collides with everything
    pub const DEFAULT: Self = Self {
        layer: 1,
        mask: u32::MAX,
    };

    /// Filter that collides with nothing
    pub const NONE: Self = Self { layer: 0, mask: 0 };

    /// Create a new collision filter
    #[inline]
    pub const fn new(layer: u32, mask: u32) -> Self {
        Self { layer, mask }
    }

    /// Check if two filters allow collision
    #[inline]
    pub fn can_collide(a: &Self, b: &Self) -> bool {
        (a.layer & b.mask) != 0 && (b.layer & a.mask) != 0
    }
}

impl Default for CollisionFilter {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}
