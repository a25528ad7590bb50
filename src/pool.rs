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

//! Columnar row storage for a single archetype.
//!
//! Each component in the archetype's signature gets its own raw byte
//! column; the owning entity for each row is tracked separately rather
//! than through the generic component machinery (Alloy stores the entity
//! as just another registered "component" column; this crate keeps it as
//! a dedicated `Vec<Entity>` instead, which sidesteps bootstrapping the
//! component registry with a concrete, non-erased type — see DESIGN.md).

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::component::{ComponentId, ComponentRegistry};
use crate::entity::Entity;

const START_CAPACITY: usize = 8;

struct Column {
    component_id: ComponentId,
    data: Vec<u8>,
    item_size: usize,
}

pub struct Pool {
    entities: Vec<Entity>,
    columns: Vec<Column>,
    index: FxHashMap<ComponentId, usize>,
    capacity: usize,
    size: usize,
}

impl Pool {
    pub fn new(component_ids: &[ComponentId]) -> Self {
        let registry = ComponentRegistry::global();
        let mut columns = Vec::with_capacity(component_ids.len());
        let mut index = FxHashMap::default();
        for (i, &cid) in component_ids.iter().enumerate() {
            let info = registry.info(cid);
            columns.push(Column {
                component_id: cid,
                data: vec![0u8; START_CAPACITY * info.size],
                item_size: info.size,
            });
            index.insert(cid, i);
        }
        Self {
            entities: Vec::with_capacity(START_CAPACITY),
            columns,
            index,
            capacity: START_CAPACITY,
            size: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn component_ids(&self) -> SmallVec<[ComponentId; 8]> {
        self.columns.iter().map(|c| c.component_id).collect()
    }

    pub fn has_column(&self, component_id: ComponentId) -> bool {
        self.index.contains_key(&component_id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn owner_at(&self, row: usize) -> Entity {
        self.entities[row]
    }

    /// Allocates a new row for `owner`, doubling column capacity first if
    /// the pool is full. Returns the row index.
    pub fn reserve_row(&mut self, owner: Entity) -> usize {
        if self.size == self.capacity {
            self.grow();
        }
        let row = self.size;
        self.entities.push(owner);
        self.size += 1;
        row
    }

    fn grow(&mut self) {
        let new_capacity = self.capacity * 2;
        let registry = ComponentRegistry::global();
        for col in &mut self.columns {
            let info = registry.info(col.component_id);
            let mut new_data = vec![0u8; new_capacity * col.item_size];
            for row in 0..self.size {
                unsafe {
                    let src = col.data.as_mut_ptr().add(row * col.item_size);
                    let dst = new_data.as_mut_ptr().add(row * col.item_size);
                    (info.relocate)(src, dst);
                }
            }
            col.data = new_data;
        }
        self.capacity = new_capacity;
    }

    fn column_index(&self, component_id: ComponentId) -> Option<usize> {
        self.index.get(&component_id).copied()
    }

    /// Raw pointer to `row` in the column for `component_id`, if present.
    ///
    /// # Safety
    /// The caller must not read the slot before it has been written, and
    /// must use a pointer type matching the registered size for
    /// `component_id`.
    pub unsafe fn row_ptr(&self, component_id: ComponentId, row: usize) -> Option<*mut u8> {
        let idx = self.column_index(component_id)?;
        let col = &self.columns[idx];
        Some(col.data.as_ptr().add(row * col.item_size) as *mut u8)
    }

    /// Relocates the bytes at `src` into `row` of the column for
    /// `component_id`, without running any destructor on `src`.
    ///
    /// # Safety
    /// `src` must point to a live, validly initialized value of the type
    /// registered for `component_id`, and must not be used again afterward.
    pub unsafe fn relocate_in(&mut self, component_id: ComponentId, row: usize, src: *mut u8) {
        let registry = ComponentRegistry::global();
        let info = registry.info(component_id);
        let dst = self.row_ptr(component_id, row);
        debug_assert!(dst.is_some(), "column must exist");
        (info.relocate)(src, dst.unwrap_unchecked());
    }

    /// Destroys the row at `size - 1` for every column (if `destroy`) and
    /// shrinks the pool by one. Used when the removed row is already the
    /// last row.
    pub fn pop_back(&mut self, destroy: bool) {
        debug_assert!(self.size > 0);
        let last = self.size - 1;
        if destroy {
            let registry = ComponentRegistry::global();
            for col in &self.columns {
                let info = registry.info(col.component_id);
                if let Some(drop_fn) = info.drop {
                    unsafe {
                        let ptr = col.data.as_ptr().add(last * col.item_size) as *mut u8;
                        drop_fn(ptr);
                    }
                }
            }
        }
        self.entities.pop();
        self.size -= 1;
    }

    /// Relocates the last row into `row` for every column (swap-remove) and
    /// shrinks the pool by one. Returns the entity that used to own the
    /// last row (now at `row`). Must not be called with `row == size - 1`;
    /// use `pop_back` for that case.
    pub fn swap_remove(&mut self, row: usize) -> Entity {
        debug_assert!(self.size > 0);
        let last = self.size - 1;
        debug_assert!(row != last);
        let registry = ComponentRegistry::global();
        for col in &self.columns {
            let info = registry.info(col.component_id);
            unsafe {
                let src = col.data.as_ptr().add(last * col.item_size) as *mut u8;
                let dst = col.data.as_ptr().add(row * col.item_size) as *mut u8;
                (info.relocate)(src, dst);
            }
        }
        let moved_owner = self.entities[last];
        self.entities[row] = moved_owner;
        self.entities.pop();
        self.size -= 1;
        moved_owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::id_of;
    use crate::entity::Entity;

    fn entity(id: u32) -> Entity {
        Entity::new(id, 0)
    }

    #[test]
    fn reserve_row_grows_capacity_on_overflow() {
        let cid = id_of::<u64>();
        let mut pool = Pool::new(&[cid]);
        for i in 0..9 {
            pool.reserve_row(entity(i));
        }
        assert_eq!(pool.len(), 9);
    }

    #[test]
    fn write_and_read_roundtrip() {
        let cid = id_of::<u64>();
        let mut pool = Pool::new(&[cid]);
        let row = pool.reserve_row(entity(0));
        let mut value: u64 = 42;
        unsafe {
            pool.relocate_in(cid, row, &mut value as *mut u64 as *mut u8);
        }
        std::mem::forget(value);
        let read = unsafe { *(pool.row_ptr(cid, row).unwrap() as *const u64) };
        assert_eq!(read, 42);
    }

    #[test]
    fn swap_remove_relocates_last_row() {
        let cid = id_of::<u64>();
        let mut pool = Pool::new(&[cid]);
        let rows: Vec<usize> = (0..3).map(|i| pool.reserve_row(entity(i))).collect();
        for &row in &rows {
            let mut value = row as u64 * 10;
            unsafe {
                pool.relocate_in(cid, row, &mut value as *mut u64 as *mut u8);
            }
            std::mem::forget(value);
        }
        let moved = pool.swap_remove(0);
        assert_eq!(moved, entity(2));
        assert_eq!(pool.len(), 2);
        let read = unsafe { *(pool.row_ptr(cid, 0).unwrap() as *const u64) };
        assert_eq!(read, 20);
    }
}
