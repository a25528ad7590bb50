// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Signature-to-archetype lookup with a most-recently-used linear scan.
//!
//! Mirrors Alloy's `HeatVector`-backed `ArchetypeMap`: a flat list of
//! `(signature, id)` pairs, scanned front to back, with the matched entry
//! bubbled one slot toward the front on every hit. Repeated lookups for the
//! same signature converge toward the front of the list.

use crate::bitset::BitSet;
use crate::entity::ArchetypeId;

#[derive(Default)]
pub struct ArchetypeIndex {
    entries: Vec<(BitSet, ArchetypeId)>,
}

impl ArchetypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the archetype registered for `signature`, if any, comparing
    /// real bitset equality (never the cached hash alone). On a match past
    /// the first slot, swaps the entry one position toward the front.
    pub fn find(&mut self, signature: &BitSet) -> Option<ArchetypeId> {
        let pos = self.entries.iter().position(|(sig, _)| sig == signature)?;
        if pos > 0 {
            self.entries.swap(pos, pos - 1);
            Some(self.entries[pos - 1].1)
        } else {
            Some(self.entries[pos].1)
        }
    }

    pub fn register(&mut self, signature: BitSet, id: ArchetypeId) {
        self.entries.push((signature, id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(bits: &[usize]) -> BitSet {
        let mut s = BitSet::with_capacity(8);
        for &b in bits {
            s.set(b, true);
        }
        s
    }

    #[test]
    fn find_returns_none_for_unregistered_signature() {
        let mut idx = ArchetypeIndex::new();
        assert_eq!(idx.find(&sig(&[1])), None);
    }

    #[test]
    fn repeated_lookup_bubbles_entry_toward_front() {
        let mut idx = ArchetypeIndex::new();
        idx.register(sig(&[0]), 0);
        idx.register(sig(&[1]), 1);
        idx.register(sig(&[2]), 2);

        assert_eq!(idx.find(&sig(&[2])), Some(2));
        // after one hit, [2] moved up one slot (now at index 1)
        assert_eq!(idx.find(&sig(&[2])), Some(2));
        assert_eq!(idx.entries[0].1, 2);
    }

    #[test]
    fn equality_used_for_lookup_is_bitwise() {
        let mut idx = ArchetypeIndex::new();
        idx.register(sig(&[5]), 9);
        assert_eq!(idx.find(&sig(&[5])), Some(9));
        assert_eq!(idx.find(&sig(&[6])), None);
    }
}
