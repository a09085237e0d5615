//! Narrow-Phase Geometry
//!
//! The world talks to body geometry only through the [`Geometry`] trait:
//! build from local vertices, move to a transform, report a bounding box, and
//! test against another instance for a contact [`Manifold`].
//!
//! [`ConvexPolygon`] is the reference implementation: separating axis test
//! over both polygons' edge normals, then the incident edge is clipped
//! against the reference edge to place a single contact at the center of
//! the overlapping region.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::PhysicsError;
use crate::math::{Fix128, Vec2Fix};

// ============================================================================
// Aabb
// ============================================================================

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec2Fix,
    /// Maximum corner
    pub max: Vec2Fix,
}

impl Aabb {
    /// Create a new AABB from min and max corners
    #[inline]
    pub const fn new(min: Vec2Fix, max: Vec2Fix) -> Self {
        Self { min, max }
    }

    /// Create AABB from center and half-extents
    pub fn from_center_half(center: Vec2Fix, half: Vec2Fix) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box containing every point. Empty input gives a zero box.
    pub fn from_points(points: &[Vec2Fix]) -> Self {
        let Some((first, rest)) = points.split_first() else {
            return Self::default();
        };
        rest.iter().fold(Self::new(*first, *first), |aabb, p| Self {
            min: aabb.min.min(*p),
            max: aabb.max.max(*p),
        })
    }

    /// Check if two AABBs overlap (touching counts)
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

// ============================================================================
// Manifold & Geometry trait
// ============================================================================

/// Result of a narrow-phase query between shape A (`self`) and shape B.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Manifold {
    /// Collision feature, stable while the same faces stay in contact
    pub feature: u32,
    /// Penetration depth (non-negative)
    pub depth: Fix128,
    /// Unit contact normal, pointing from A toward B
    pub normal: Vec2Fix,
    /// Contact point on the surface of A (world space)
    pub point_a: Vec2Fix,
    /// Contact point on the surface of B (world space)
    pub point_b: Vec2Fix,
}

/// Body geometry as seen by the world.
pub trait Geometry {
    /// Build geometry from vertices in body-local space.
    fn from_vertices(vertices: &[Vec2Fix]) -> Result<Self, PhysicsError>
    where
        Self: Sized;

    /// Move the cached world-space shape to the given transform.
    fn transform(&mut self, position: Vec2Fix, angle: Fix128);

    /// World-space bounding box of the last transform.
    fn bounding_box(&self) -> Aabb;

    /// Overlap test. `None` means the shapes do not touch.
    fn collides(&self, other: &Self) -> Option<Manifold>;
}

/// Vertices of an axis-aligned rectangle centered on the origin, CCW.
pub fn rectangle_vertices(half_width: Fix128, half_height: Fix128) -> Vec<Vec2Fix> {
    vec![
        Vec2Fix::new(-half_width, -half_height),
        Vec2Fix::new(half_width, -half_height),
        Vec2Fix::new(half_width, half_height),
        Vec2Fix::new(-half_width, half_height),
    ]
}

// ============================================================================
// ConvexPolygon
// ============================================================================

/// Convex polygon with cached world-space vertices and edge normals.
#[derive(Clone, Debug)]
pub struct ConvexPolygon {
    local: Vec<Vec2Fix>,
    local_normals: Vec<Vec2Fix>,
    world: Vec<Vec2Fix>,
    normals: Vec<Vec2Fix>,
    bbox: Aabb,
}

impl ConvexPolygon {
    /// World-space vertices, counter-clockwise.
    pub fn vertices(&self) -> &[Vec2Fix] {
        &self.world
    }

    /// World-space outward edge normals; normal `i` belongs to the edge from
    /// vertex `i` to vertex `i + 1`.
    pub fn normals(&self) -> &[Vec2Fix] {
        &self.normals
    }

    fn vertex(&self, i: usize) -> Vec2Fix {
        self.world[i % self.world.len()]
    }
}

impl Geometry for ConvexPolygon {
    fn from_vertices(vertices: &[Vec2Fix]) -> Result<Self, PhysicsError> {
        if vertices.len() < 3 {
            return Err(PhysicsError::InvalidShape {
                reason: "polygon needs at least three vertices",
            });
        }

        let n = vertices.len();
        let mut twice_area = Fix128::ZERO;
        for i in 0..n {
            twice_area += vertices[i].cross(vertices[(i + 1) % n]);
        }
        if twice_area.is_zero() {
            return Err(PhysicsError::InvalidShape {
                reason: "polygon has zero area",
            });
        }

        let mut local = vertices.to_vec();
        if twice_area.is_negative() {
            local.reverse();
        }

        let local_normals: Vec<Vec2Fix> = (0..n)
            .map(|i| {
                let edge = local[(i + 1) % n] - local[i];
                Vec2Fix::new(edge.y, -edge.x).normalize()
            })
            .collect();

        let bbox = Aabb::from_points(&local);
        Ok(Self {
            world: local.clone(),
            normals: local_normals.clone(),
            local,
            local_normals,
            bbox,
        })
    }

    fn transform(&mut self, position: Vec2Fix, angle: Fix128) {
        let (sin, cos) = angle.sin_cos();
        for (world, local) in self.world.iter_mut().zip(&self.local) {
            *world = position + local.rotate_by(sin, cos);
        }
        for (normal, local) in self.normals.iter_mut().zip(&self.local_normals) {
            *normal = local.rotate_by(sin, cos);
        }
        self.bbox = Aabb::from_points(&self.world);
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn collides(&self, other: &Self) -> Option<Manifold> {
        let (edge_a, separation_a) = max_separation(self, other)?;
        let (edge_b, separation_b) = max_separation(other, self)?;

        // Keep A as the reference face unless B is clearly better, so the
        // feature does not flip between frames on near-equal separations.
        let flip = separation_b
            > separation_a * Fix128::from_ratio(98, 100) + Fix128::from_ratio(1, 1000);
        let (reference, incident, edge) = if flip {
            (other, self, edge_b)
        } else {
            (self, other, edge_a)
        };

        let ref_normal = reference.normals[edge];
        let r1 = reference.vertex(edge);
        let r2 = reference.vertex(edge + 1);
        let tangent = (r2 - r1).normalize();

        // Incident edge: the one facing most directly against the reference normal.
        let mut incident_edge = 0;
        let mut min_dot = ref_normal.dot(incident.normals[0]);
        for (i, n) in incident.normals.iter().enumerate().skip(1) {
            let d = ref_normal.dot(*n);
            if d < min_dot {
                min_dot = d;
                incident_edge = i;
            }
        }
        let segment = [
            incident.vertex(incident_edge),
            incident.vertex(incident_edge + 1),
        ];

        // Clip to the side planes of the reference edge.
        let segment = clip_segment(segment, -tangent, -tangent.dot(r1))?;
        let segment = clip_segment(segment, tangent, tangent.dot(r2))?;

        let mut count = 0i64;
        let mut sum_point = Vec2Fix::ZERO;
        let mut sum_separation = Fix128::ZERO;
        let mut deepest = Fix128::ZERO;
        for p in segment {
            let separation = ref_normal.dot(p - r1);
            if separation <= Fix128::ZERO {
                count += 1;
                sum_point += p;
                sum_separation += separation;
                deepest = deepest.max(-separation);
            }
        }
        if count == 0 {
            return None;
        }

        let count = Fix128::from_int(count);
        let on_incident = sum_point / count;
        let on_reference = on_incident - ref_normal * (sum_separation / count);

        let feature = ((flip as u32) << 16) | edge as u32;
        let manifold = if flip {
            Manifold {
                feature,
                depth: deepest,
                normal: -ref_normal,
                point_a: on_incident,
                point_b: on_reference,
            }
        } else {
            Manifold {
                feature,
                depth: deepest,
                normal: ref_normal,
                point_a: on_reference,
                point_b: on_incident,
            }
        };
        Some(manifold)
    }
}

/// Largest separation of `other` along the edge normals of `poly`.
/// Returns `None` as soon as a separating axis is found.
fn max_separation(poly: &ConvexPolygon, other: &ConvexPolygon) -> Option<(usize, Fix128)> {
    let mut best_edge = 0;
    let mut best = None;

    for (i, (normal, origin)) in poly.normals.iter().zip(&poly.world).enumerate() {
        let mut separation = normal.dot(other.world[0] - *origin);
        for v in other.world.iter().skip(1) {
            separation = separation.min(normal.dot(*v - *origin));
        }

        if separation.is_positive() {
            return None;
        }
        if best.map_or(true, |b| separation > b) {
            best = Some(separation);
            best_edge = i;
        }
    }

    best.map(|b| (best_edge, b))
}

/// Keep the part of a segment with `normal · p <= offset`.
fn clip_segment(
    segment: [Vec2Fix; 2],
    normal: Vec2Fix,
    offset: Fix128,
) -> Option<[Vec2Fix; 2]> {
    let d0 = normal.dot(segment[0]) - offset;
    let d1 = normal.dot(segment[1]) - offset;

    match (d0 <= Fix128::ZERO, d1 <= Fix128::ZERO) {
        (true, true) => Some(segment),
        (false, false) => None,
        (inside_first, _) => {
            let t = d0 / (d0 - d1);
            let crossing = segment[0] + (segment[1] - segment[0]) * t;
            if inside_first {
                Some([segment[0], crossing])
            } else {
                Some([crossing, segment[1]])
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
