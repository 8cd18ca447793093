// IsisSim: IS-IS Link-State Routing Simulator written in Rust
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Segment Routing Global Block (SRGB): the per-node label range reserved for
//! prefix-SIDs, with used-index bookkeeping.
//!
//! An index is marked used iff exactly one active prefix-SID on the node
//! carries that index; conflict resolution maintains this (see
//! [`crate::sr`]).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An MPLS label value.
pub type Label = u32;

/// Default SRGB lower bound.
pub const SRGB_DEF_LOWER_BOUND: Label = 16000;
/// Default SRGB upper bound (inclusive).
pub const SRGB_DEF_UPPER_BOUND: Label = 23999;
/// Largest allowed SRGB range size.
pub const SRGB_MAX_SIZE: u32 = 65536;
/// Default SRGB range size.
pub const SRGB_DEFAULT_RANGE: u32 = SRGB_DEF_UPPER_BOUND - SRGB_DEF_LOWER_BOUND + 1;

/// A node's Segment Routing Global Block.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Srgb {
    lower_bound: Label,
    range: u32,
    /// Flags advertised with the block in the router-capability TLV.
    pub flags: u8,
    used: BTreeSet<u32>,
}

impl Default for Srgb {
    fn default() -> Self {
        Self::new(SRGB_DEF_LOWER_BOUND, SRGB_DEFAULT_RANGE)
    }
}

impl Srgb {
    /// Create an SRGB with the given lower bound and range size. The range is
    /// capped at [`SRGB_MAX_SIZE`].
    pub fn new(lower_bound: Label, range: u32) -> Self {
        Self {
            lower_bound,
            range: range.min(SRGB_MAX_SIZE),
            flags: 0,
            used: BTreeSet::new(),
        }
    }

    /// The first label of the block.
    pub fn lower_bound(&self) -> Label {
        self.lower_bound
    }

    /// The number of labels in the block.
    pub fn range(&self) -> u32 {
        self.range
    }

    /// The label corresponding to `index`.
    pub fn label_from_index(&self, index: u32) -> Label {
        self.lower_bound + index
    }

    /// Scan for the first free index and return its label, or `None` if the
    /// block is exhausted.
    pub fn get_available_label(&self) -> Option<Label> {
        (0..self.range)
            .find(|idx| !self.used.contains(idx))
            .map(|idx| self.label_from_index(idx))
    }

    /// Checks whether `index` is marked in use.
    pub fn is_used(&self, index: u32) -> bool {
        self.used.contains(&index)
    }

    /// Mark `index` as in use.
    pub fn mark_used(&mut self, index: u32) {
        if index < self.range {
            self.used.insert(index);
        }
    }

    /// Clear the in-use mark of `index`.
    pub fn mark_unused(&mut self, index: u32) {
        self.used.remove(&index);
    }

    /// Number of indices currently in use.
    pub fn used_count(&self) -> usize {
        self.used.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let srgb = Srgb::default();
        assert_eq!(srgb.lower_bound(), 16000);
        assert_eq!(srgb.range(), 8000);
        assert_eq!(srgb.label_from_index(100), 16100);
        assert_eq!(srgb.get_available_label(), Some(16000));
    }

    #[test]
    fn allocation_scans_past_used_indices() {
        let mut srgb = Srgb::default();
        srgb.mark_used(0);
        srgb.mark_used(1);
        srgb.mark_used(3);
        assert_eq!(srgb.get_available_label(), Some(16002));
        assert!(srgb.is_used(1));
        srgb.mark_unused(1);
        assert_eq!(srgb.get_available_label(), Some(16001));
    }

    #[test]
    fn exhaustion_yields_no_label() {
        let mut srgb = Srgb::new(1000, 4);
        for idx in 0..4 {
            srgb.mark_used(idx);
        }
        assert_eq!(srgb.get_available_label(), None);
        srgb.mark_unused(2);
        assert_eq!(srgb.get_available_label(), Some(1002));
    }

    #[test]
    fn out_of_range_marks_are_ignored() {
        let mut srgb = Srgb::new(1000, 4);
        srgb.mark_used(10);
        assert!(!srgb.is_used(10));
        assert_eq!(srgb.used_count(), 0);
    }
}
