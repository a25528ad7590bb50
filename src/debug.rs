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

//! Read-only inspection points for a debug printer/visualizer.
//!
//! Mirrors the accessors Alloy gates behind `ALLOY_EXPOSE_INTERNALS` in
//! `AlloyDebug.h` (`GetSpaceInfo`, `GetEntityInfo`, `PrintDotInfo`): archetype
//! count, per-archetype signature and row count, and which archetypes a
//! query currently matches. This module is the inspection surface only, not
//! a full printer/visualizer — spec.md §1 treats those as external
//! collaborators not specified here.

use crate::bitset::BitSet;
use crate::entity::Entity;
use crate::world::Space;

/// One archetype's signature and current row count.
#[derive(Debug, Clone)]
pub struct ArchetypeInfo {
    pub id: usize,
    pub signature: BitSet,
    pub entity_count: usize,
}

/// Snapshot of every archetype currently registered in a `Space`.
pub fn archetype_summary(space: &Space) -> Vec<ArchetypeInfo> {
    (0..space.archetype_count())
        .map(|id| ArchetypeInfo {
            id,
            signature: space.archetype_signature(id).clone(),
            entity_count: space.archetype_len(id),
        })
        .collect()
}

/// Human-readable report for one space, matching the shape (if not the
/// exact text) of Alloy's `GetSpaceInfo`.
pub fn space_report(space: &Space) -> String {
    let mut out = String::new();
    out.push_str(&format!("space {}\n", space.id()));
    for info in archetype_summary(space) {
        out.push_str(&format!(
            "  archetype {}: {} entities, signature bits {:?}\n",
            info.id,
            info.entity_count,
            info.signature.ones().collect::<Vec<_>>()
        ));
    }
    out
}

/// Whether `e` is valid in `space`, or, failing that, in any of `others` —
/// matching `GetEntityInfo`'s "ENTITY IS VALID FOR A DIFFERENT SPACE" note.
pub fn entity_validity_report(space: &Space, e: Entity, others: &[&Space]) -> String {
    if space.is_valid(e) {
        return format!("entity {e:?} is valid in space {}", space.id());
    }
    for other in others {
        if other.is_valid(e) {
            return format!(
                "entity {e:?} is invalid in space {} but valid in space {}",
                space.id(),
                other.id()
            );
        }
    }
    format!("entity {e:?} is not valid in any known space")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetype_summary_reflects_live_archetypes() {
        let mut space = Space::new();
        let e = space.create_entity();
        space.emplace(e, 5u32).unwrap();

        let summary = archetype_summary(&space);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[1].entity_count, 1);
    }

    #[test]
    fn entity_validity_report_detects_foreign_validity() {
        let mut a = Space::new();
        let mut b = Space::new();
        let ea = a.create_entity();
        let _eb = b.create_entity();

        a.destroy_entity(ea).unwrap();
        // ea's (id, generation) slot in `b` may or may not be occupied;
        // the report must not panic either way.
        let report = entity_validity_report(&a, ea, &[&b]);
        assert!(report.contains("invalid") || report.contains("not valid"));
    }
}
