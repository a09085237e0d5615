//! Contact Constraint Solver (Sequential Impulses)
//!
//! Projected Gauss-Seidel over contact velocity constraints with warm
//! starting. Each contact has one normal row and one tangent (friction) row.
//!
//! Per frame, [`prepare`] evaluates a contact against its fresh manifold:
//! offsets from the body centers, the relative normal velocity (a separating
//! contact is skipped and drops its accumulated impulse), the warm-start
//! impulse, effective masses and the velocity bias
//!
//! ```text
//! bias = -beta/dt * max(depth - slop, 0) + e * min(0, vn)
//! ```
//!
//! where the restitution term only applies once the approach speed exceeds
//! the restitution threshold. [`solve`] then runs up to `iterations` sweeps
//! of [`solve_contact`], stopping after the first sweep in which no contact
//! changed its impulses by more than [`IMPULSE_EPSILON_SQ`].
//!
//! Friction is clamped per contact to `[-f * lambda_n, f * lambda_n]` using
//! the normal impulse of the same sweep (box friction).

use crate::body::{Body, BodyRegistry};
use crate::contact::{Contact, ContactCache};
use crate::math::{Fix128, Vec2Fix};
use crate::shape::Manifold;

/// Squared impulse change below which a contact counts as converged.
pub const IMPULSE_EPSILON_SQ: Fix128 = Fix128::from_ratio(1, 1_000_000_000_000);

/// Per-frame solver inputs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolverParams {
    /// Step length
    pub dt: Fix128,
    /// Baumgarte factor
    pub baumgarte: Fix128,
    /// Allowed penetration
    pub slop: Fix128,
    /// Approach speed above which restitution applies
    pub restitution_threshold: Fix128,
}

/// Evaluate a contact for this frame and warm start it.
///
/// Returns `false` when the bodies already separate along the normal; the
/// contact then holds zero impulse and must not be solved this frame.
pub fn prepare<G>(
    contact: &mut Contact,
    a: &mut Body<G>,
    b: &mut Body<G>,
    manifold: &Manifold,
    params: &SolverParams,
) -> bool {
    let normal = manifold.normal;
    let tangent = normal.perpendicular();
    let r_a = manifold.point_a - a.position;
    let r_b = manifold.point_b - b.position;

    contact.normal = normal;
    contact.tangent = tangent;
    contact.point_a = manifold.point_a;
    contact.point_b = manifold.point_b;
    contact.r_a = r_a;
    contact.r_b = r_b;
    contact.depth = manifold.depth;
    contact.carried_n = contact.lambda_n;
    contact.carried_t = contact.lambda_t;

    let vn = (b.velocity_at(r_b) - a.velocity_at(r_a)).dot(normal);
    if !vn.is_negative() {
        contact.lambda_n = Fix128::ZERO;
        contact.lambda_t = Fix128::ZERO;
        return false;
    }

    let k_n = effective_inverse_mass(a, b, contact, normal);
    if k_n.is_zero() {
        contact.lambda_n = Fix128::ZERO;
        contact.lambda_t = Fix128::ZERO;
        return false;
    }
    let k_t = effective_inverse_mass(a, b, contact, tangent);
    contact.mass_n = Fix128::ONE / k_n;
    contact.mass_t = if k_t.is_zero() {
        Fix128::ZERO
    } else {
        Fix128::ONE / k_t
    };

    // Warm start
    if !contact.lambda_n.is_zero() || !contact.lambda_t.is_zero() {
        let impulse = normal * contact.lambda_n + tangent * contact.lambda_t;
        a.apply_impulse_at(-impulse, r_a);
        b.apply_impulse_at(impulse, r_b);
    }

    let penetration = (manifold.depth - params.slop).max(Fix128::ZERO);
    let mut bias = -(params.baumgarte / params.dt) * penetration;
    if -vn > params.restitution_threshold {
        bias += contact.restitution * vn;
    }
    contact.bias = bias;
    true
}

fn effective_inverse_mass<G>(
    a: &Body<G>,
    b: &Body<G>,
    contact: &Contact,
    axis: Vec2Fix,
) -> Fix128 {
    let ra = contact.r_a.cross(axis);
    let rb = contact.r_b.cross(axis);
    a.inv_mass + b.inv_mass + a.inv_inertia * ra * ra + b.inv_inertia * rb * rb
}

/// One Gauss-Seidel update of a prepared contact. Returns whether the
/// contact is still active.
pub fn solve_contact<G>(contact: &mut Contact, a: &mut Body<G>, b: &mut Body<G>) -> bool {
    let (r_a, r_b) = (contact.r_a, contact.r_b);

    // Normal row, accumulated impulse clamped to be non-negative
    let vn = (b.velocity_at(r_b) - a.velocity_at(r_a)).dot(contact.normal);
    let delta = -contact.mass_n * (vn + contact.bias);
    let old_n = contact.lambda_n;
    contact.lambda_n = (old_n + delta).max(Fix128::ZERO);
    let delta_n = contact.lambda_n - old_n;
    let impulse = contact.normal * delta_n;
    a.apply_impulse_at(-impulse, r_a);
    b.apply_impulse_at(impulse, r_b);

    // Tangent row, clamped by the updated normal impulse
    let vt = (b.velocity_at(r_b) - a.velocity_at(r_a)).dot(contact.tangent);
    let delta = -contact.mass_t * vt;
    let limit = contact.friction * contact.lambda_n;
    let old_t = contact.lambda_t;
    contact.lambda_t = (old_t + delta).max(-limit).min(limit);
    let delta_t = contact.lambda_t - old_t;
    let impulse = contact.tangent * delta_t;
    a.apply_impulse_at(-impulse, r_a);
    b.apply_impulse_at(impulse, r_b);

    delta_n.square() + delta_t.square() > IMPULSE_EPSILON_SQ
}

/// Run up to `iterations` sweeps over the queued contact slots.
///
/// Returns the number of sweeps performed.
pub fn solve<G>(
    contacts: &mut ContactCache,
    bodies: &mut BodyRegistry<G>,
    queue: &[usize],
    iterations: u32,
) -> u32 {
    let mut sweeps = 0;
    while sweeps < iterations && !queue.is_empty() {
        sweeps += 1;
        let mut active = 0usize;
        for &slot in queue {
            let Some(contact) = contacts.get_mut(slot) else {
                continue;
            };
            let Some((a, b)) = bodies.pair_mut(contact.key.body_a.index(), contact.key.body_b.index())
            else {
                continue;
            };
            if solve_contact(contact, a, b) {
                active += 1;
            }
        }
        if active == 0 {
            break;
        }
    }
    sweeps
}
