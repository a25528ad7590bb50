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

//! Entity identifiers, generation tracking and id recycling.
//!
//! Mirrors Alloy's `Entity`/`EntityManager`/`RecycledCounter` rather than
//! the donor crate's `slotmap`-backed `EntityId`: ids are plain `u32`s
//! recycled off a free stack, with a separate generation counter per slot
//! used to detect stale handles.

/// Index of an archetype within a `Space`'s archetype list.
pub type ArchetypeId = usize;

/// A handle to an entity: a slot index plus the generation the slot was on
/// when this handle was issued. A handle whose generation no longer matches
/// the slot's current generation refers to a destroyed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    id: u32,
    generation: u32,
}

impl Entity {
    pub(crate) fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Allocates and recycles entity ids for a single `Space`, and tracks which
/// archetype currently owns each live entity.
#[derive(Default)]
pub struct EntityManager {
    free_ids: Vec<u32>,
    next_id: u32,
    generations: Vec<u32>,
    locations: Vec<ArchetypeId>,
}

const INVALID_LOCATION: ArchetypeId = ArchetypeId::MAX;

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new entity id, recycling a freed one if available.
    pub fn allocate(&mut self) -> Entity {
        let id = self.free_ids.pop().unwrap_or_else(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        });
        let idx = id as usize;
        if idx >= self.generations.len() {
            self.generations.resize(idx + 1, 0);
            self.locations.resize(idx + 1, INVALID_LOCATION);
        }
        Entity::new(id, self.generations[idx])
    }

    /// Bumps the slot's generation and returns the id to the free stack.
    /// Does not touch archetype storage; the caller is responsible for
    /// removing the entity's row before calling this.
    pub fn recycle(&mut self, e: Entity) {
        let idx = e.id() as usize;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.locations[idx] = INVALID_LOCATION;
        self.free_ids.push(e.id());
    }

    pub fn is_valid(&self, e: Entity) -> bool {
        let idx = e.id() as usize;
        idx < self.generations.len()
            && self.generations[idx] == e.generation()
            && self.locations[idx] != INVALID_LOCATION
    }

    pub fn location(&self, e: Entity) -> Option<ArchetypeId> {
        if self.is_valid(e) {
            Some(self.locations[e.id() as usize])
        } else {
            None
        }
    }

    pub fn set_location(&mut self, e: Entity, archetype: ArchetypeId) {
        self.locations[e.id() as usize] = archetype;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_assigns_generation_zero() {
        let mut mgr = EntityManager::new();
        let e = mgr.allocate();
        assert_eq!(e.generation(), 0);
    }

    #[test]
    fn recycled_id_bumps_generation() {
        let mut mgr = EntityManager::new();
        let e = mgr.allocate();
        mgr.set_location(e, 0);
        mgr.recycle(e);
        let reused = mgr.allocate();
        assert_eq!(reused.id(), e.id());
        assert_eq!(reused.generation(), e.generation() + 1);
        assert!(!mgr.is_valid(e));
    }

    #[test]
    fn stale_handle_is_invalid_after_recycle() {
        let mut mgr = EntityManager::new();
        let e = mgr.allocate();
        mgr.set_location(e, 0);
        assert!(mgr.is_valid(e));
        mgr.recycle(e);
        assert!(!mgr.is_valid(e));
    }
}
