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

//! Process-wide component type registry, plus the [`Bundle`] trait for
//! inserting several components onto one entity in a single call.
//!
//! Every component type is assigned a stable [`ComponentId`] the first time
//! it is seen, together with the two operations a `Pool` needs to manage it
//! without generics: drop it in place, and relocate it (copy the bytes and
//! forget the source, never re-running a destructor on the old slot). Rust
//! values are always safely bit-copy-relocatable, so unlike Alloy's
//! `ComponentTypeTraits` (which branches between move-construct,
//! default-construct-then-move-assign, and raw copy depending on what the
//! C++ type supports) there is a single relocation strategy here; see
//! DESIGN.md for the full rationale.

use std::any::TypeId;
use std::ptr;
use std::sync::OnceLock;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::entity::Entity;
use crate::error::Result;
use crate::world::Space;

pub type ComponentId = usize;

/// Marker trait for component types. Components are not required to be
/// `Send`/`Sync`: a `Space` is single-threaded (see spec's concurrency
/// model), so component storage never crosses a thread boundary.
pub trait Component: 'static {}

impl<T: 'static> Component for T {}

#[derive(Clone, Copy)]
pub struct ComponentInfo {
    pub size: usize,
    pub drop: Option<unsafe fn(*mut u8)>,
    pub relocate: unsafe fn(*mut u8, *mut u8),
}

unsafe fn drop_impl<T>(ptr: *mut u8) {
    ptr::drop_in_place(ptr as *mut T);
}

unsafe fn relocate_impl<T>(src: *mut u8, dst: *mut u8) {
    ptr::copy_nonoverlapping(src as *const T, dst as *mut T, 1);
}

#[derive(Default)]
struct RegistryInner {
    infos: Vec<ComponentInfo>,
    ids: FxHashMap<TypeId, ComponentId>,
}

pub struct ComponentRegistry {
    inner: RwLock<RegistryInner>,
}

static REGISTRY: OnceLock<ComponentRegistry> = OnceLock::new();

impl ComponentRegistry {
    pub fn global() -> &'static ComponentRegistry {
        REGISTRY.get_or_init(|| ComponentRegistry {
            inner: RwLock::new(RegistryInner::default()),
        })
    }

    /// Returns the id for `T`, registering it on first use.
    pub fn id_of<T: Component>(&self) -> ComponentId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.inner.read().ids.get(&type_id) {
            return id;
        }
        let mut inner = self.inner.write();
        // Another writer may have registered it while we waited for the lock.
        if let Some(&id) = inner.ids.get(&type_id) {
            return id;
        }
        let id = inner.infos.len();
        inner.infos.push(ComponentInfo {
            size: std::mem::size_of::<T>(),
            drop: std::mem::needs_drop::<T>().then_some(drop_impl::<T> as unsafe fn(*mut u8)),
            relocate: relocate_impl::<T>,
        });
        inner.ids.insert(type_id, id);
        id
    }

    pub fn info(&self, id: ComponentId) -> ComponentInfo {
        self.inner.read().infos[id]
    }

    pub fn count(&self) -> usize {
        self.inner.read().infos.len()
    }
}

/// Shorthand for `ComponentRegistry::global().id_of::<T>()`.
pub fn id_of<T: Component>() -> ComponentId {
    ComponentRegistry::global().id_of::<T>()
}

/// A tuple of component values insertable onto one entity in a single call.
///
/// Mirrors Alloy's `Space::InsertComponents<Components...>`, which folds a
/// sequential `InsertComponent<Component>` over each type in the pack; here
/// each tuple field carries its own value rather than being default
/// constructed, since Rust component types are not required to implement
/// `Default`. Implemented for tuples of 1 to 8 distinct component types.
pub trait Bundle: Sized {
    fn insert_into(self, space: &mut Space, e: Entity) -> Result<()>;
}

macro_rules! impl_bundle {
    ($($T:ident),+) => {
        impl<$($T: Component),+> Bundle for ($($T,)+) {
            #[allow(non_snake_case)]
            fn insert_into(self, space: &mut Space, e: Entity) -> Result<()> {
                let ($($T,)+) = self;
                $( space.insert::<$T>(e, $T)?; )+
                Ok(())
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_type_gets_same_id() {
        struct Position {
            #[allow(dead_code)]
            x: f32,
        }
        let a = id_of::<Position>();
        let b = id_of::<Position>();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_types_get_distinct_ids() {
        struct A;
        struct B;
        assert_ne!(id_of::<A>(), id_of::<B>());
    }

    #[test]
    fn drop_fn_present_only_when_needed() {
        struct Plain(u32);
        struct WithDrop(#[allow(dead_code)] String);

        let plain = ComponentRegistry::global().info(id_of::<Plain>());
        let with_drop = ComponentRegistry::global().info(id_of::<WithDrop>());
        assert!(plain.drop.is_none());
        assert!(with_drop.drop.is_some());
    }
}
