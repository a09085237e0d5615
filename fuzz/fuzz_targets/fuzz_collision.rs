#![no_main]
use libfuzzer_sys::fuzz_target;
use arbitrary::Arbitrary;
use alice_impulse2d::{ConvexPolygon, Fix128, Geometry, Vec2Fix};

#[derive(Debug, Arbitrary)]
struct CollisionInput {
    /// Local vertices of both polygons (i8 grid, sixteenths)
    vertices_a: Vec<(i8, i8)>,
    vertices_b: Vec<(i8, i8)>,
    /// Transforms (positions in sixteenths, angles in hundredths of a radian)
    x: i8,
    y: i8,
    angle_a: i16,
    angle_b: i16,
}

fn polygon(points: &[(i8, i8)]) -> Option<ConvexPolygon> {
    let vertices: Vec<Vec2Fix> = points
        .iter()
        .take(8)
        .map(|&(x, y)| Vec2Fix::new(Fix128::from_ratio(x as i64, 16), Fix128::from_ratio(y as i64, 16)))
        .collect();
    ConvexPolygon::from_vertices(&vertices).ok()
}

// Fuzz narrow-phase collision between arbitrary polygons.
// Must never panic; a reported manifold must be well-formed.
fuzz_target!(|input: CollisionInput| {
    let (Some(mut a), Some(mut b)) = (polygon(&input.vertices_a), polygon(&input.vertices_b)) else {
        return;
    };
    a.transform(Vec2Fix::ZERO, Fix128::from_ratio(input.angle_a as i64, 100));
    b.transform(
        Vec2Fix::new(Fix128::from_ratio(input.x as i64, 16), Fix128::from_ratio(input.y as i64, 16)),
        Fix128::from_ratio(input.angle_b as i64, 100),
    );

    for m in [a.collides(&b), b.collides(&a)].into_iter().flatten() {
        assert!(!m.depth.is_negative());
        assert!(a.bounding_box().intersects(&b.bounding_box()));
    }
});
