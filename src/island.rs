//! Island Tracking and Sleep Scheduling
//!
//! Dynamic bodies connected by contacts form islands, tracked with a
//! union-find over body slot indices. Every step, each awake body starts as
//! its own root and contacts merge roots; the smaller root always survives so
//! the result does not depend on merge order.
//!
//! Each root also carries the island's sleep bookkeeping: the summed squared
//! velocity of its members this frame, how many members contributed, and how
//! many consecutive frames the island has been idle. The counter lives on the
//! root slot and survives the per-frame reset.
//!
//! Static and kinematic bodies never join a union.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::math::Fix128;

/// Union-find node for one body slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct IslandNode {
    parent: u32,
    energy: Fix128,
    members: u32,
    idle_frames: u32,
}

impl IslandNode {
    const fn root(index: u32) -> Self {
        Self {
            parent: index,
            energy: Fix128::ZERO,
            members: 0,
            idle_frames: 0,
        }
    }
}

/// Outcome of the per-frame sleep check for one island
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepVerdict {
    /// Island stays awake
    Awake,
    /// Island has been idle long enough and must go to sleep now
    Sleep,
}

/// Union-find island tracker indexed by body slot.
#[derive(Clone, Debug, Default)]
pub struct IslandTracker {
    nodes: Vec<IslandNode>,
}

impl IslandTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked slots
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no slot is tracked
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Make sure `slots` slots are tracked; new slots are their own island.
    pub fn resize(&mut self, slots: usize) {
        while self.nodes.len() < slots {
            let index = self.nodes.len() as u32;
            self.nodes.push(IslandNode::root(index));
        }
    }

    /// Forget everything about a slot, including its idle counter.
    pub fn clear(&mut self, index: u32) {
        self.resize(index as usize + 1);
        self.nodes[index as usize] = IslandNode::root(index);
    }

    /// Start-of-frame reset: own root, zero aggregates, keep the idle counter.
    pub fn begin_frame(&mut self, index: u32) {
        self.resize(index as usize + 1);
        let node = &mut self.nodes[index as usize];
        node.parent = index;
        node.energy = Fix128::ZERO;
        node.members = 0;
    }

    /// Find root with path halving
    pub fn find(&mut self, mut x: u32) -> u32 {
        if x as usize >= self.nodes.len() {
            return x;
        }
        while self.nodes[x as usize].parent != x {
            let grandparent = self.nodes[self.nodes[x as usize].parent as usize].parent;
            self.nodes[x as usize].parent = grandparent;
            x = grandparent;
        }
        x
    }

    /// Find root without touching the links
    pub fn root(&self, mut x: u32) -> u32 {
        while let Some(node) = self.nodes.get(x as usize) {
            if node.parent == x {
                break;
            }
            x = node.parent;
        }
        x
    }

    /// Merge two islands; the numerically smaller root survives.
    pub fn union(&mut self, a: u32, b: u32) -> u32 {
        let ra = self.find(a);
        let rb = self.find(b);
        let (keep, absorb) = if ra <= rb { (ra, rb) } else { (rb, ra) };
        if keep != absorb {
            self.nodes[absorb as usize].parent = keep;
        }
        keep
    }

    /// Add one member's squared velocity to its island. Returns the root.
    pub fn accumulate(&mut self, index: u32, energy: Fix128) -> u32 {
        let root = self.find(index);
        if let Some(node) = self.nodes.get_mut(root as usize) {
            node.energy += energy;
            node.members += 1;
        }
        root
    }

    /// Mean squared velocity of the island rooted at `root`
    pub fn mean_energy(&self, root: u32) -> Fix128 {
        match self.nodes.get(root as usize) {
            Some(node) if node.members > 0 => node.energy / Fix128::from_int(node.members as i64),
            _ => Fix128::ZERO,
        }
    }

    /// Update the idle counter of an island from this frame's aggregate.
    ///
    /// `frames == 0` disables sleeping. The counter restarts once the island
    /// is told to sleep, so a woken island needs a full run of idle frames
    /// again.
    pub fn evaluate(&mut self, root: u32, threshold: Fix128, frames: u32) -> SleepVerdict {
        if frames == 0 {
            return SleepVerdict::Awake;
        }
        let mean = self.mean_energy(root);
        let Some(node) = self.nodes.get_mut(root as usize) else {
            return SleepVerdict::Awake;
        };
        if mean < threshold {
            node.idle_frames += 1;
        } else {
            node.idle_frames = 0;
        }
        if node.idle_frames >= frames {
            node.idle_frames = 0;
            SleepVerdict::Sleep
        } else {
            SleepVerdict::Awake
        }
    }

    /// Make `members` a single island rooted at the smallest of them.
    pub fn regroup(&mut self, members: &[u32]) -> Option<u32> {
        let root = *members.iter().min()?;
        self.resize(root as usize + 1);
        for &m in members {
            self.resize(m as usize + 1);
            self.nodes[m as usize].parent = root;
        }
        Some(root)
    }

    /// Idle frames counted so far on a root
    pub fn idle_frames(&self, root: u32) -> u32 {
        self.nodes.get(root as usize).map_or(0, |n| n.idle_frames)
    }

    /// Zero the idle counter of a slot (wake)
    pub fn reset_idle(&mut self, index: u32) {
        if let Some(node) = self.nodes.get_mut(index as usize) {
            node.idle_frames = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(n: usize) -> IslandTracker {
        let mut t = IslandTracker::new();
        t.resize(n);
        t
    }

    #[test]
    fn test_union_find() {
        let mut t = tracker(5);
        t.union(0, 1);
        t.union(2, 3);

        assert_eq!(t.find(0), t.find(1));
        assert_ne!(t.find(0), t.find(2));
        assert_eq!(t.find(2), t.find(3));
        assert_eq!(t.find(4), 4);
    }

    #[test]
    fn test_smaller_root_survives() {
        let mut t = tracker(6);
        t.union(5, 3);
        assert_eq!(t.find(5), 3);
        t.union(4, 5);
        assert_eq!(t.root(4), 3);
        // Merge order does not matter
        let mut u = tracker(6);
        u.union(4, 5);
        u.union(5, 3);
        assert_eq!(u.root(4), 3);
    }

    #[test]
    fn test_find_and_root_agree() {
        let mut t = tracker(8);
        for i in (1..8).rev() {
            t.union(i, i - 1);
        }
        for i in 0..8 {
            assert_eq!(t.root(i), 0);
            assert_eq!(t.find(i), 0);
        }
    }

    #[test]
    fn test_begin_frame_keeps_idle_counter() {
        let mut t = tracker(2);
        t.accumulate(0, Fix128::ZERO);
        assert_eq!(t.evaluate(0, Fix128::ONE, 10), SleepVerdict::Awake);
        assert_eq!(t.idle_frames(0), 1);

        t.union(0, 1);
        t.accumulate(1, Fix128::from_int(7));
        t.begin_frame(0);
        t.begin_frame(1);
        assert_eq!(t.find(1), 1);
        assert_eq!(t.idle_frames(0), 1);
        assert_eq!(t.mean_energy(0), Fix128::ZERO);

        t.clear(0);
        assert_eq!(t.idle_frames(0), 0);
    }

    #[test]
    fn test_sleep_after_idle_frames() {
        let mut t = tracker(2);
        let threshold = Fix128::from_ratio(1, 100);
        for frame in 0..3 {
            t.begin_frame(0);
            t.begin_frame(1);
            t.union(0, 1);
            t.accumulate(0, Fix128::ZERO);
            t.accumulate(1, Fix128::from_ratio(1, 1000));
            let verdict = t.evaluate(0, threshold, 3);
            if frame < 2 {
                assert_eq!(verdict, SleepVerdict::Awake);
            } else {
                assert_eq!(verdict, SleepVerdict::Sleep);
            }
        }
        assert_eq!(t.idle_frames(0), 0);
    }

    #[test]
    fn test_motion_resets_idle_counter() {
        let mut t = tracker(1);
        let threshold = Fix128::from_ratio(1, 100);

        t.accumulate(0, Fix128::ZERO);
        t.evaluate(0, threshold, 3);
        t.begin_frame(0);
        t.accumulate(0, Fix128::from_int(4));
        assert_eq!(t.evaluate(0, threshold, 3), SleepVerdict::Awake);
        assert_eq!(t.idle_frames(0), 0);
    }

    #[test]
    fn test_regroup() {
        let mut t = tracker(6);
        t.union(1, 2);
        t.union(2, 4);
        t.union(4, 5);
        // Slot 1 goes away; the rest stay together under the next smallest
        t.clear(1);
        assert_eq!(t.regroup(&[2, 4, 5]), Some(2));
        assert_eq!(t.root(5), 2);
        assert_eq!(t.root(1), 1);
        assert_eq!(t.regroup(&[]), None);
    }

    #[test]
    fn test_mean_energy() {
        let mut t = tracker(2);
        t.union(0, 1);
        t.accumulate(0, Fix128::from_int(1));
        t.accumulate(1, Fix128::from_int(3));
        assert_eq!(t.mean_energy(0), Fix128::from_int(2));
    }

    #[test]
    fn test_zero_frames_disables_sleep() {
        let mut t = tracker(1);
        for _ in 0..100 {
            t.accumulate(0, Fix128::ZERO);
            assert_eq!(t.evaluate(0, Fix128::ONE, 0), SleepVerdict::Awake);
            t.begin_frame(0);
        }
    }
}
