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

//! A single archetype: a bitset signature, its column pool, a sparse
//! entity-to-row map, and the cached add/remove edges to neighboring
//! archetypes (the archetype graph).

use std::ptr;

use crate::bitset::BitSet;
use crate::component::{id_of, Component, ComponentId, ComponentRegistry};
use crate::entity::{ArchetypeId, Entity};
use crate::pool::Pool;

const NO_ROW: usize = usize::MAX;

pub struct Archetype {
    signature: BitSet,
    pool: Pool,
    entity_map: Vec<usize>,
    add_edges: Vec<Option<ArchetypeId>>,
    remove_edges: Vec<Option<ArchetypeId>>,
}

impl Archetype {
    pub fn new(signature: BitSet, component_ids: &[ComponentId]) -> Self {
        Self {
            signature,
            pool: Pool::new(component_ids),
            entity_map: Vec::new(),
            add_edges: Vec::new(),
            remove_edges: Vec::new(),
        }
    }

    pub fn signature(&self) -> &BitSet {
        &self.signature
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn has_component(&self, cid: ComponentId) -> bool {
        self.signature.contains(cid)
    }

    pub fn entities(&self) -> &[Entity] {
        self.pool.entities()
    }

    fn ensure_entity_map_capacity(&mut self, id: u32) {
        let idx = id as usize;
        if idx >= self.entity_map.len() {
            let new_len = (idx + 1).next_power_of_two();
            self.entity_map.resize(new_len, NO_ROW);
        }
    }

    fn set_entity_row(&mut self, id: u32, row: usize) {
        self.ensure_entity_map_capacity(id);
        self.entity_map[id as usize] = row;
    }

    fn clear_entity_row(&mut self, id: u32) {
        if let Some(slot) = self.entity_map.get_mut(id as usize) {
            *slot = NO_ROW;
        }
    }

    pub fn entity_row(&self, id: u32) -> Option<usize> {
        self.entity_map
            .get(id as usize)
            .copied()
            .filter(|&r| r != NO_ROW)
    }

    fn ensure_edge_capacity(edges: &mut Vec<Option<ArchetypeId>>, cid: ComponentId) {
        if cid >= edges.len() {
            edges.resize(cid + 1, None);
        }
    }

    pub fn add_edge(&self, cid: ComponentId) -> Option<ArchetypeId> {
        self.add_edges.get(cid).copied().flatten()
    }

    pub fn set_add_edge(&mut self, cid: ComponentId, target: ArchetypeId) {
        Self::ensure_edge_capacity(&mut self.add_edges, cid);
        self.add_edges[cid] = Some(target);
    }

    pub fn remove_edge(&self, cid: ComponentId) -> Option<ArchetypeId> {
        self.remove_edges.get(cid).copied().flatten()
    }

    pub fn set_remove_edge(&mut self, cid: ComponentId, target: ArchetypeId) {
        Self::ensure_edge_capacity(&mut self.remove_edges, cid);
        self.remove_edges[cid] = Some(target);
    }

    /// Registers a freshly created entity with no components.
    pub fn register_empty(&mut self, e: Entity) -> usize {
        let row = self.pool.reserve_row(e);
        self.set_entity_row(e.id(), row);
        row
    }

    /// Reads the component at `row` for `T`, assuming it was already written.
    ///
    /// # Safety
    /// `row` must be a live row in this archetype that holds an initialized
    /// `T` in the column for `T`.
    pub unsafe fn read<T: Component>(&self, row: usize) -> &T {
        let cid = id_of::<T>();
        &*(self.pool.row_ptr(cid, row).expect("column must exist") as *const T)
    }

    /// # Safety
    /// Same preconditions as [`Archetype::read`].
    pub unsafe fn read_mut<T: Component>(&mut self, row: usize) -> &mut T {
        let cid = id_of::<T>();
        &mut *(self.pool.row_ptr(cid, row).expect("column must exist") as *mut T)
    }

    /// Moves `e` from `old` into `self` (whose signature is `old`'s plus
    /// `T`), placement-constructing `value` into the new column. Returns a
    /// reference to the relocated entity's new `T` slot.
    pub fn transfer_in_with_new<T: Component>(
        &mut self,
        old: &mut Archetype,
        e: Entity,
        value: T,
    ) -> &mut T {
        let old_row = old.entity_row(e.id());
        debug_assert!(old_row.is_some(), "entity must be present in source archetype");
        let old_row = unsafe { old_row.unwrap_unchecked() };
        let new_row = self.pool.reserve_row(e);
        for cid in old.pool.component_ids() {
            unsafe {
                let src = old.pool.row_ptr(cid, old_row);
                debug_assert!(src.is_some(), "column must exist in source");
                self.pool.relocate_in(cid, new_row, src.unwrap_unchecked());
            }
        }
        let new_cid = id_of::<T>();
        let dst = unsafe {
            let ptr = self.pool.row_ptr(new_cid, new_row);
            debug_assert!(ptr.is_some(), "destination column must exist");
            ptr.unwrap_unchecked() as *mut T
        };
        unsafe {
            ptr::write(dst, value);
        }
        self.set_entity_row(e.id(), new_row);
        // Values already relocated out; the source row must not be re-destroyed.
        old.remove_entity(e, false);
        unsafe { &mut *dst }
    }

    /// Moves `e` from `old` into `self` (whose signature is `old`'s minus
    /// `T`). Every column present in `self` is relocated from `old`; the
    /// `T` column, which has no destination, is destroyed explicitly here
    /// since `old`'s removal pass must not re-destroy already-relocated
    /// columns.
    pub fn transfer_in_without<T: Component>(&mut self, old: &mut Archetype, e: Entity) {
        let old_row = old.entity_row(e.id());
        debug_assert!(old_row.is_some(), "entity must be present in source archetype");
        let old_row = unsafe { old_row.unwrap_unchecked() };
        let new_row = self.pool.reserve_row(e);
        for cid in self.pool.component_ids() {
            unsafe {
                let src = old.pool.row_ptr(cid, old_row);
                debug_assert!(src.is_some(), "column must exist in source");
                self.pool.relocate_in(cid, new_row, src.unwrap_unchecked());
            }
        }
        self.set_entity_row(e.id(), new_row);

        let removed_cid = id_of::<T>();
        let info = ComponentRegistry::global().info(removed_cid);
        if let Some(drop_fn) = info.drop {
            unsafe {
                let ptr = old.pool.row_ptr(removed_cid, old_row);
                debug_assert!(ptr.is_some(), "removed column must exist in source");
                drop_fn(ptr.unwrap_unchecked());
            }
        }
        old.remove_entity(e, false);
    }

    /// Removes `e`'s row, optionally destroying every column first.
    ///
    /// Re-reads `e`'s row after each column's destructor call: a
    /// destructor may itself destroy another entity in this archetype
    /// (via a swap-remove), which would otherwise leave `row` stale.
    pub fn remove_entity(&mut self, e: Entity, destroy: bool) {
        let self_ptr: *mut Archetype = self;
        let row = self.entity_row(e.id());
        debug_assert!(row.is_some(), "entity not present in this archetype");
        let mut row = unsafe { row.unwrap_unchecked() };
        if destroy {
            let registry = ComponentRegistry::global();
            let component_ids = self.pool.component_ids();
            for cid in component_ids {
                let info = registry.info(cid);
                if let Some(drop_fn) = info.drop {
                    unsafe {
                        let arch = &mut *self_ptr;
                        if let Some(ptr) = arch.pool.row_ptr(cid, row) {
                            drop_fn(ptr);
                        }
                    }
                }
                let next_row = unsafe { (*self_ptr).entity_row(e.id()) };
                debug_assert!(next_row.is_some(), "entity vanished during destruction");
                row = unsafe { next_row.unwrap_unchecked() };
            }
        }

        let last = self.pool.len() - 1;
        if row != last {
            let moved_owner = self.pool.swap_remove(row);
            self.set_entity_row(moved_owner.id(), row);
        } else {
            self.pool.pop_back(false);
        }
        self.clear_entity_row(e.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: u32) -> Entity {
        Entity::new(id, 0)
    }

    #[test]
    fn register_empty_tracks_row() {
        let mut arch = Archetype::new(BitSet::with_capacity(8), &[]);
        let e = entity(0);
        let row = arch.register_empty(e);
        assert_eq!(arch.entity_row(0), Some(row));
        assert_eq!(arch.len(), 1);
    }

    #[test]
    fn remove_entity_swaps_last_row_in() {
        let mut arch = Archetype::new(BitSet::with_capacity(8), &[]);
        let a = entity(0);
        let b = entity(1);
        arch.register_empty(a);
        arch.register_empty(b);
        arch.remove_entity(a, false);
        assert_eq!(arch.len(), 1);
        assert_eq!(arch.entity_row(1), Some(0));
        assert_eq!(arch.entity_row(0), None);
    }

    #[test]
    fn transfer_in_with_new_moves_value_and_removes_source() {
        let cid = id_of::<u32>();
        let mut empty = Archetype::new(BitSet::with_capacity(8), &[]);
        let mut with_u32 = {
            let mut sig = BitSet::with_capacity(8);
            sig.set(cid, true);
            Archetype::new(sig, &[cid])
        };
        let e = entity(0);
        empty.register_empty(e);
        let value_ref = with_u32.transfer_in_with_new::<u32>(&mut empty, e, 7);
        assert_eq!(*value_ref, 7);
        assert_eq!(empty.len(), 0);
        assert_eq!(with_u32.len(), 1);
    }
}
