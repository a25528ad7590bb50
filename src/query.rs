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

//! Query index and typed component fetch.
//!
//! A query is identified purely by its required-component signature: a
//! `BitSet` over component ids. The process-wide [`QueryRegistry`] keeps one
//! [`QueryIndex`] per distinct signature (shared across every `Space`, each
//! of which gets its own per-space archetype list within that index) and
//! fans a newly created archetype out to every registered query, mirroring
//! Alloy's `QueryInterface::RegisterArchetype` broadcast in `ArchetypeMap.h`.

use std::sync::OnceLock;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::archetype::Archetype;
use crate::bitset::BitSet;
use crate::component::{id_of, Component};
use crate::entity::ArchetypeId;

/// Per-signature archetype membership, one list per space id.
pub struct QueryIndex {
    signature: BitSet,
    per_space: Vec<Vec<ArchetypeId>>,
}

impl QueryIndex {
    fn new(signature: BitSet) -> Self {
        Self {
            signature,
            per_space: Vec::new(),
        }
    }

    fn ensure_space(&mut self, space_id: usize) {
        if self.per_space.len() <= space_id {
            self.per_space.resize_with(space_id + 1, Vec::new);
        }
    }

    fn unregister_space(&mut self, space_id: usize) {
        if let Some(list) = self.per_space.get_mut(space_id) {
            list.clear();
        }
    }

    fn register_archetype(
        &mut self,
        space_id: usize,
        archetype_id: ArchetypeId,
        archetype_signature: &BitSet,
    ) {
        if self.signature.is_subset_of(archetype_signature) {
            self.ensure_space(space_id);
            self.per_space[space_id].push(archetype_id);
        }
    }

    fn archetypes_for(&self, space_id: usize) -> &[ArchetypeId] {
        self.per_space
            .get(space_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Default)]
struct QueryRegistryInner {
    indices: Vec<QueryIndex>,
    by_signature: AHashMap<BitSet, usize>,
}

/// Process-wide table of every distinct query signature ever requested.
pub struct QueryRegistry {
    inner: RwLock<QueryRegistryInner>,
}

static REGISTRY: OnceLock<QueryRegistry> = OnceLock::new();

impl QueryRegistry {
    pub fn global() -> &'static QueryRegistry {
        REGISTRY.get_or_init(|| QueryRegistry {
            inner: RwLock::new(QueryRegistryInner::default()),
        })
    }

    /// Returns the registry slot for `signature`, creating a fresh
    /// `QueryIndex` the first time it's requested and immediately backfilling
    /// it with every already-existing archetype (across every live space)
    /// that matches, not just archetypes created from this point on — see
    /// [`crate::world::visit_live_archetypes`].
    pub fn ensure_query(&self, signature: &BitSet) -> usize {
        if let Some(&slot) = self.inner.read().by_signature.get(signature) {
            return slot;
        }
        let mut inner = self.inner.write();
        if let Some(&slot) = inner.by_signature.get(signature) {
            return slot;
        }
        let slot = inner.indices.len();
        let mut index = QueryIndex::new(signature.clone());
        crate::world::visit_live_archetypes(|space_id, archetype_id, archetype_signature| {
            index.register_archetype(space_id, archetype_id, archetype_signature);
        });
        inner.indices.push(index);
        inner.by_signature.insert(signature.clone(), slot);
        slot
    }

    /// Offers a newly created archetype to every registered query.
    pub fn notify_archetype_created(
        &self,
        space_id: usize,
        archetype_id: ArchetypeId,
        archetype_signature: &BitSet,
    ) {
        let mut inner = self.inner.write();
        for index in &mut inner.indices {
            index.register_archetype(space_id, archetype_id, archetype_signature);
        }
    }

    pub fn archetypes_for(&self, query_slot: usize, space_id: usize) -> Vec<ArchetypeId> {
        self.inner.read().indices[query_slot]
            .archetypes_for(space_id)
            .to_vec()
    }

    pub fn unregister_space(&self, space_id: usize) {
        let mut inner = self.inner.write();
        for index in &mut inner.indices {
            index.unregister_space(space_id);
        }
    }
}

/// A tuple of component types that can be fetched, mutably, out of a
/// matching archetype row. Implemented for tuples of 1 to 8 component
/// types; every listed type must be distinct.
pub trait Fetch<'a> {
    type Item;

    fn signature() -> BitSet;

    /// # Safety
    /// `row` must be a live row of `archetype`, and `archetype` must
    /// contain a column for every type in this fetch.
    unsafe fn fetch_row(archetype: &'a mut Archetype, row: usize) -> Self::Item;
}

macro_rules! impl_fetch {
    ($($T:ident),+) => {
        impl<'a, $($T: Component),+> Fetch<'a> for ($($T,)+) {
            type Item = ($(&'a mut $T,)+);

            fn signature() -> BitSet {
                let mut sig = BitSet::with_capacity(8);
                $(sig.set(id_of::<$T>(), true);)+
                sig
            }

            unsafe fn fetch_row(archetype: &'a mut Archetype, row: usize) -> Self::Item {
                let archetype_ptr: *const Archetype = archetype;
                ($({
                    let ptr = (*archetype_ptr).pool().row_ptr(id_of::<$T>(), row);
                    debug_assert!(ptr.is_some(), "column must exist for every type in this fetch");
                    &mut *(ptr.unwrap_unchecked() as *mut $T)
                },)+)
            }
        }
    };
}

impl_fetch!(A);
impl_fetch!(A, B);
impl_fetch!(A, B, C);
impl_fetch!(A, B, C, D);
impl_fetch!(A, B, C, D, E);
impl_fetch!(A, B, C, D, E, F);
impl_fetch!(A, B, C, D, E, F, G);
impl_fetch!(A, B, C, D, E, F, G, H);
