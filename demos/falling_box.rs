//! Falling Box Example
//!
//! Drops a bouncy box and a two-box stack onto a static floor, prints their
//! heights while they settle, and reports when each goes to sleep.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example falling_box
//! ```

use alice_impulse2d::{BodyDesc, EventKind, Fix128, PhysicsError, Vec2Fix, World, WorldConfig};

fn main() -> Result<(), PhysicsError> {
    env_logger::init();

    // Keep resting contacts from re-bouncing under gravity
    let config = WorldConfig::default()
        .with_restitution_threshold(Fix128::ONE)
        .with_sleep_threshold(Fix128::from_ratio(1, 100));
    let mut world = World::new(config)?;

    // Static floor, top surface at y = 0.5
    world.add_body(BodyDesc::rectangle(Fix128::from_int(20), Fix128::HALF))?;

    let unit_box = |x: i64, y: i64| {
        BodyDesc::rectangle(Fix128::HALF, Fix128::HALF)
            .with_mass(Fix128::ONE)
            .with_position(Vec2Fix::from_int(x, y))
    };
    let bouncy = world.add_body(unit_box(-3, 4).with_restitution(Fix128::from_ratio(4, 10)))?;
    let low = world.add_body(unit_box(3, 1))?;
    let high = world.add_body(unit_box(3, 2).with_friction(Fix128::from_ratio(6, 10)))?;

    println!("ALICE-Impulse2D Falling Box Example");
    println!("===================================");
    println!("Bodies: {}", world.body_count());
    println!();

    // Simulate 5 seconds at 60 FPS
    let dt = Fix128::from_ratio(1, 60);
    for frame in 0..300 {
        world.update(dt);

        for event in world.events() {
            if event.kind == EventKind::Sleep {
                println!("Frame {:3}: body {:?} fell asleep", frame, event.body);
            }
        }
        if frame % 30 == 0 {
            println!(
                "Frame {:3}: bouncy y={:.4}  stack y={:.4}/{:.4}  contacts={}",
                frame,
                world.position(bouncy)?.y.to_f64(),
                world.position(low)?.y.to_f64(),
                world.position(high)?.y.to_f64(),
                world.stats().active_constraints,
            );
        }
    }

    println!();
    println!("Simulation complete (300 frames, 5 seconds).");
    println!("Totals: {:?}", world.profiler());
    Ok(())
}
