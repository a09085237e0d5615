//! # ALICE-Impulse2D
//!
//! **Deterministic 2D Rigid-Body World**
//!
//! A sequential-impulse physics world for convex polygons. All simulation
//! arithmetic runs on 128-bit fixed point and every container iterates in a
//! fixed order, so identical inputs replay bit-for-bit on any platform.
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **Fix128 / Vec2Fix** | I64F64 fixed-point scalar and vector |
//! | **Body Registry** | Generation-checked handles, LIFO slot reuse |
//! | **Contact Cache** | Pooled contacts matched across frames for warm starting |
//! | **PGS Solver** | Warm start, Baumgarte correction, restitution threshold, box friction |
//! | **Islands** | Union-find grouping with sleep and wake |
//! | **Events** | Enter/exit/sleep/wake/removed, via listeners or the event log |
//! | **Collision Filter** | Layer/mask bitmasks |
//!
//! ## Quick Start
//!
//! ```rust
//! use alice_impulse2d::prelude::*;
//!
//! let mut world = World::new(WorldConfig::default()).unwrap();
//!
//! let floor = world
//!     .add_body(BodyDesc::rectangle(Fix128::from_int(10), Fix128::HALF))
//!     .unwrap();
//! let crate_box = world
//!     .add_body(
//!         BodyDesc::rectangle(Fix128::HALF, Fix128::HALF)
//!             .with_mass(Fix128::ONE)
//!             .with_position(Vec2Fix::from_int(0, 3)),
//!     )
//!     .unwrap();
//!
//! let dt = Fix128::from_ratio(1, 60);
//! for _ in 0..120 {
//!     world.update(dt);
//! }
//!
//! // Resting on top of the floor (floor top at y = 0.5)
//! let y = world.position(crate_box).unwrap().y.to_f64();
//! assert!((y - 1.0).abs() < 0.05);
//! assert!(!world.is_dynamic(floor).unwrap());
//! ```
//!
//! ## Events
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use alice_impulse2d::prelude::*;
//!
//! let mut world = World::new(WorldConfig::default()).unwrap();
//! let body = world
//!     .add_body(BodyDesc::rectangle(Fix128::HALF, Fix128::HALF).with_mass(Fix128::ONE))
//!     .unwrap();
//!
//! let removed = Rc::new(RefCell::new(false));
//! let flag = Rc::clone(&removed);
//! let listener: Rc<RefCell<dyn Listener>> = Rc::new(RefCell::new(move |e: &Event| {
//!     if e.kind == EventKind::Removed {
//!         *flag.borrow_mut() = true;
//!     }
//! }));
//! world.set_listener(body, Rc::downgrade(&listener)).unwrap();
//!
//! world.remove_body(body).unwrap();
//! assert!(*removed.borrow());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod body;
pub mod broadphase;
pub mod contact;
pub mod error;
pub mod event;
pub mod filter;
pub mod island;
pub mod math;
pub mod profiling;
pub mod shape;
pub mod solver;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::body::{Body, BodyDesc, BodyHandle};
    pub use crate::broadphase::{BroadPhase, SweepAndPrune};
    pub use crate::contact::{Contact, ContactKey};
    pub use crate::error::PhysicsError;
    pub use crate::event::{Event, EventKind, EventLog, Listener};
    pub use crate::filter::CollisionFilter;
    pub use crate::math::{Fix128, Vec2Fix};
    pub use crate::profiling::{StepProfiler, StepStats};
    pub use crate::shape::{Aabb, ConvexPolygon, Geometry, Manifold};
    pub use crate::world::{World, WorldConfig};
}

// Re-export main types at crate root
pub use prelude::*;
