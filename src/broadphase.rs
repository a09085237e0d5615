//! Broad Phase
//!
//! Candidate pair generation from bounding boxes. The world only needs the
//! [`BroadPhase`] contract: keep a box per body, and once per frame hand out a
//! finite, restartable enumeration of possibly-touching pairs.
//!
//! [`SweepAndPrune`] is the reference implementation. Boxes are sorted along
//! X, and for each box the sweep walks forward until the next box starts past
//! its right edge. Ties in `min.x` are broken by handle so the pair order is
//! identical on every run.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use alloc::collections::BTreeMap;

use crate::body::BodyHandle;
use crate::shape::Aabb;

/// Broad-phase collaborator consumed by the world.
pub trait BroadPhase {
    /// Start tracking a body.
    fn add_body(&mut self, handle: BodyHandle, aabb: Aabb);

    /// Stop tracking a body. Unknown handles are ignored.
    fn remove_body(&mut self, handle: BodyHandle);

    /// Replace the bounding box of a tracked body.
    fn update_body(&mut self, handle: BodyHandle, aabb: Aabb);

    /// Restart the candidate enumeration for a new frame.
    fn begin_frame(&mut self);

    /// Whether the current enumeration has pairs left.
    fn has_more(&self) -> bool;

    /// Next candidate pair, or `None` once the enumeration is exhausted.
    fn next_pair(&mut self) -> Option<(BodyHandle, BodyHandle)>;
}

/// Sweep-and-prune along the X axis.
#[derive(Clone, Debug, Default)]
pub struct SweepAndPrune {
    boxes: BTreeMap<BodyHandle, Aabb>,
    sorted: Vec<(BodyHandle, Aabb)>,
    pairs: Vec<(BodyHandle, BodyHandle)>,
    cursor: usize,
}

impl SweepAndPrune {
    /// Create an empty broad phase
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked bodies
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// True when nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    fn sweep(&mut self) {
        self.sorted.clear();
        self.sorted.extend(self.boxes.iter().map(|(h, b)| (*h, *b)));
        self.sorted
            .sort_by(|(ha, a), (hb, b)| a.min.x.cmp(&b.min.x).then(ha.cmp(hb)));

        self.pairs.clear();
        for (i, (handle_i, box_i)) in self.sorted.iter().enumerate() {
            for (handle_j, box_j) in &self.sorted[i + 1..] {
                if box_j.min.x > box_i.max.x {
                    break;
                }
                if box_i.intersects(box_j) {
                    let pair = if handle_i < handle_j {
                        (*handle_i, *handle_j)
                    } else {
                        (*handle_j, *handle_i)
                    };
                    self.pairs.push(pair);
                }
            }
        }
    }
}

impl BroadPhase for SweepAndPrune {
    fn add_body(&mut self, handle: BodyHandle, aabb: Aabb) {
        self.boxes.insert(handle, aabb);
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        self.boxes.remove(&handle);
        // Drop pending pairs that mention the removed body.
        let tail = self.pairs.split_off(self.cursor.min(self.pairs.len()));
        self.pairs
            .extend(tail.into_iter().filter(|(a, b)| *a != handle && *b != handle));
    }

    fn update_body(&mut self, handle: BodyHandle, aabb: Aabb) {
        if let Some(stored) = self.boxes.get_mut(&handle) {
            *stored = aabb;
        }
    }

    fn begin_frame(&mut self) {
        self.sweep();
        self.cursor = 0;
    }

    fn has_more(&self) -> bool {
        self.cursor < self.pairs.len()
    }

    fn next_pair(&mut self) -> Option<(BodyHandle, BodyHandle)> {
        let pair = self.pairs.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(pair)
    }
}
