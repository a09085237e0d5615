//! Contact Cache with Warm Starting
//!
//! Persistent contact records that survive across frames so the solver can
//! start from last frame's accumulated impulses.
//!
//! Records live in a pooled `Vec` addressed by slot, with a free-list of
//! released slots. Two ordered maps from [`ContactKey`] to slot form the
//! frame generations: at the start of a frame `current` becomes `previous`.
//! A contact observed again moves back into `current`; whatever is still in
//! `previous` at the end of contact generation was not seen and is released.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use alloc::collections::BTreeMap;

use crate::body::BodyHandle;
use crate::math::{Fix128, Vec2Fix};

/// Identity of a contact: canonical body pair plus geometry feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContactKey {
    /// Smaller handle of the pair
    pub body_a: BodyHandle,
    /// Larger handle of the pair
    pub body_b: BodyHandle,
    /// Collision feature id
    pub feature: u32,
}

impl ContactKey {
    /// Create a canonical key (ensures `body_a < body_b`)
    #[inline]
    pub fn new(a: BodyHandle, b: BodyHandle, feature: u32) -> Self {
        if a < b {
            Self {
                body_a: a,
                body_b: b,
                feature,
            }
        } else {
            Self {
                body_a: b,
                body_b: a,
                feature,
            }
        }
    }

    /// Whether `body` participates in this contact
    #[inline]
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }
}

/// A persistent contact between two bodies.
///
/// `lambda_n`/`lambda_t` are the only fields that carry meaning from one
/// frame to the next; everything else is rebuilt each frame the contact is
/// evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contact {
    /// Contact identity
    pub key: ContactKey,
    /// Combined restitution (max of both bodies)
    pub restitution: Fix128,
    /// Combined friction (geometric mean of both bodies)
    pub friction: Fix128,
    /// Accumulated normal impulse, never negative
    pub lambda_n: Fix128,
    /// Accumulated tangent impulse, within `±friction * lambda_n`
    pub lambda_t: Fix128,
    /// Normal impulse carried in from the previous frame
    pub carried_n: Fix128,
    /// Tangent impulse carried in from the previous frame
    pub carried_t: Fix128,
    /// Unit normal, from body A toward body B
    pub normal: Vec2Fix,
    /// Friction direction, `normal` rotated a quarter turn
    pub tangent: Vec2Fix,
    /// Contact point on A
    pub point_a: Vec2Fix,
    /// Contact point on B
    pub point_b: Vec2Fix,
    /// Offset of `point_a` from A's center
    pub r_a: Vec2Fix,
    /// Offset of `point_b` from B's center
    pub r_b: Vec2Fix,
    /// Penetration depth
    pub depth: Fix128,
    /// Effective mass along the normal
    pub mass_n: Fix128,
    /// Effective mass along the tangent
    pub mass_t: Fix128,
    /// Velocity bias (position correction plus restitution)
    pub bias: Fix128,
}

impl Contact {
    /// Fresh contact with zero accumulated impulse.
    pub fn new(
        key: ContactKey,
        restitution_a: Fix128,
        restitution_b: Fix128,
        friction_a: Fix128,
        friction_b: Fix128,
    ) -> Self {
        Self {
            key,
            restitution: restitution_a.max(restitution_b),
            friction: (friction_a * friction_b).abs().sqrt(),
            lambda_n: Fix128::ZERO,
            lambda_t: Fix128::ZERO,
            carried_n: Fix128::ZERO,
            carried_t: Fix128::ZERO,
            normal: Vec2Fix::ZERO,
            tangent: Vec2Fix::ZERO,
            point_a: Vec2Fix::ZERO,
            point_b: Vec2Fix::ZERO,
            r_a: Vec2Fix::ZERO,
            r_b: Vec2Fix::ZERO,
            depth: Fix128::ZERO,
            mass_n: Fix128::ZERO,
            mass_t: Fix128::ZERO,
            bias: Fix128::ZERO,
        }
    }
}

/// Pooled contact storage with ping-pong frame generations.
#[derive(Clone, Debug, Default)]
pub struct ContactCache {
    pool: Vec<Option<Contact>>,
    free: Vec<usize>,
    current: BTreeMap<ContactKey, usize>,
    previous: BTreeMap<ContactKey, usize>,
    high_water: usize,
}

impl ContactCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap generations: everything known becomes "not yet seen this frame".
    pub fn begin_frame(&mut self) {
        core::mem::swap(&mut self.current, &mut self.previous);
        // Leftovers were released at the end of the last generation pass.
        for (_, slot) in core::mem::take(&mut self.current) {
            self.free_slot(slot);
        }
    }

    /// Whether a contact with this key was already observed this frame
    #[inline]
    pub fn seen(&self, key: &ContactKey) -> bool {
        self.current.contains_key(key)
    }

    /// Mark a contact as observed this frame. Returns its slot if cached.
    pub fn touch(&mut self, key: &ContactKey) -> Option<usize> {
        if let Some(slot) = self.current.get(key) {
            return Some(*slot);
        }
        let slot = self.previous.remove(key)?;
        self.current.insert(*key, slot);
        Some(slot)
    }

    /// Store a new contact in the current generation and return its slot.
    pub fn insert(&mut self, contact: Contact) -> usize {
        let key = contact.key;
        let slot = match self.free.pop() {
            Some(slot) => {
                self.pool[slot] = Some(contact);
                slot
            }
            None => {
                self.pool.push(Some(contact));
                self.pool.len() - 1
            }
        };
        if let Some(stale) = self.current.insert(key, slot) {
            self.free_slot(stale);
        }
        self.high_water = self.high_water.max(self.current.len());
        slot
    }

    /// Release every contact not observed since `begin_frame`.
    pub fn release_unseen(&mut self) -> Vec<Contact> {
        let unseen = core::mem::take(&mut self.previous);
        unseen
            .into_values()
            .filter_map(|slot| self.free_slot(slot))
            .collect()
    }

    /// Release every contact that references `body`, in both generations.
    pub fn purge_body(&mut self, body: BodyHandle) -> Vec<Contact> {
        let mut purged = Vec::new();
        for map in [&mut self.current, &mut self.previous] {
            let keys: Vec<ContactKey> = map.keys().filter(|k| k.involves(body)).copied().collect();
            for key in keys {
                if let Some(slot) = map.remove(&key) {
                    if let Some(contact) = self.pool.get_mut(slot).and_then(Option::take) {
                        self.free.push(slot);
                        purged.push(contact);
                    }
                }
            }
        }
        purged
    }

    fn free_slot(&mut self, slot: usize) -> Option<Contact> {
        let contact = self.pool.get_mut(slot)?.take()?;
        self.free.push(slot);
        Some(contact)
    }

    /// Contact in a pool slot
    #[inline]
    pub fn get(&self, slot: usize) -> Option<&Contact> {
        self.pool.get(slot)?.as_ref()
    }

    /// Mutable contact in a pool slot
    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Contact> {
        self.pool.get_mut(slot)?.as_mut()
    }

    /// Look up a live contact by key
    pub fn find(&self, key: &ContactKey) -> Option<&Contact> {
        let slot = self.current.get(key).or_else(|| self.previous.get(key))?;
        self.get(*slot)
    }

    /// Contacts of the current generation in key order
    pub fn iter(&self) -> impl Iterator<Item = &Contact> + '_ {
        self.current.values().filter_map(|slot| self.get(*slot))
    }

    /// Live contacts in the current generation
    #[inline]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// True when no contact is live
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.previous.is_empty()
    }

    /// Pool size (live + free slots)
    #[inline]
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Most contacts ever live at once
    #[inline]
    pub fn high_water(&self) -> usize {
        self.high_water
    }
}
