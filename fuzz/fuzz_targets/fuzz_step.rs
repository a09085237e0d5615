#![no_main]
use libfuzzer_sys::fuzz_target;
use arbitrary::Arbitrary;
use alice_impulse2d::{BodyDesc, Fix128, Vec2Fix, World, WorldConfig};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    /// Number of bodies to add (capped)
    body_count: u8,
    /// Position components (i16 to keep values reasonable)
    positions: Vec<(i16, i16)>,
    /// Mass numerator (0 gives a static body)
    masses: Vec<u16>,
    /// Initial velocities
    velocities: Vec<(i8, i8)>,
    /// Bodies to remove mid-run, by insertion order
    removals: Vec<u8>,
    /// Number of simulation steps (capped)
    step_count: u8,
}

// Fuzz the world: add random bodies, step, remove some, step again.
// Must never panic regardless of input.
fuzz_target!(|input: FuzzInput| {
    let config = WorldConfig::default().with_bound(Fix128::from_int(500));
    let Ok(mut world) = World::new(config) else {
        return;
    };

    let body_count = (input.body_count as usize).min(16);
    let dt = Fix128::from_ratio(1, 60);
    let mut handles = Vec::new();

    for i in 0..body_count {
        let (px, py) = input.positions.get(i).copied().unwrap_or((0, 0));
        let mass = input.masses.get(i).copied().unwrap_or(1);
        let (vx, vy) = input.velocities.get(i).copied().unwrap_or((0, 0));

        let desc = BodyDesc::rectangle(Fix128::HALF, Fix128::HALF)
            .with_position(Vec2Fix::from_int(px as i64 / 64, py as i64 / 64))
            .with_velocity(Vec2Fix::from_int(vx as i64, vy as i64))
            .with_mass(Fix128::from_ratio(mass as i64, 16));
        if let Ok(handle) = world.add_body(desc) {
            handles.push(handle);
        }
    }

    let steps = (input.step_count as usize).min(32);
    for _ in 0..steps {
        world.update(dt);
    }
    for &r in &input.removals {
        if let Some(handle) = handles.get(r as usize) {
            let _ = world.remove_body(*handle);
        }
    }
    for _ in 0..steps {
        world.update(dt);
    }

    for contact in world.contacts() {
        assert!(world.contains(contact.key.body_a));
        assert!(world.contains(contact.key.body_b));
        assert!(contact.lambda_t.abs() <= contact.friction * contact.lambda_n);
    }
});
