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

//! A thin `(&mut Space, Entity)` pair, mirroring Alloy's
//! `ComponentWrapperGeneric`/`ComponentWrapper<T>`. Just a lookup
//! convenience over [`Space`]; carries none of the core's invariants.

use crate::component::Component;
use crate::entity::Entity;
use crate::error::Result;
use crate::world::Space;

/// Pairs a borrowed `Space` with one `Entity`, so callers that pass a single
/// handle around don't have to thread both separately.
pub struct ComponentWrapperGeneric<'s> {
    space: &'s mut Space,
    entity: Entity,
}

impl<'s> ComponentWrapperGeneric<'s> {
    pub fn new(space: &'s mut Space, entity: Entity) -> Self {
        Self { space, entity }
    }

    pub fn space(&self) -> &Space {
        self.space
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn is_valid(&self) -> bool {
        self.space.is_valid(self.entity)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.space.has::<T>(self.entity)
    }

    pub fn get<T: Component, F: FnOnce(&T) -> R, R>(&self, f: F) -> Result<R> {
        self.space.get::<T, F, R>(self.entity, f)
    }

    pub fn destroy_entity(self) -> Result<()> {
        self.space.destroy_entity(self.entity)
    }
}

/// Same as [`ComponentWrapperGeneric`], specialized to a single component
/// type `T` — matches Alloy's `ComponentWrapper<Component>`.
pub struct ComponentWrapper<'s, T: Component> {
    inner: ComponentWrapperGeneric<'s>,
    _marker: std::marker::PhantomData<T>,
}

impl<'s, T: Component> ComponentWrapper<'s, T> {
    pub fn new(space: &'s mut Space, entity: Entity) -> Self {
        Self {
            inner: ComponentWrapperGeneric::new(space, entity),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn entity(&self) -> Entity {
        self.inner.entity()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    pub fn has_component(&self) -> bool {
        self.inner.has::<T>()
    }

    pub fn get_component<F: FnOnce(&T) -> R, R>(&self, f: F) -> Result<R> {
        self.inner.get::<T, F, R>(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_wrapper_reads_through_to_space() {
        let mut space = Space::new();
        let e = space.create_entity();
        space.emplace(e, 42u32).unwrap();

        let wrapper = ComponentWrapperGeneric::new(&mut space, e);
        assert!(wrapper.is_valid());
        assert!(wrapper.has::<u32>());
        assert_eq!(wrapper.get::<u32, _, _>(|v| *v).unwrap(), 42);
    }

    #[test]
    fn typed_wrapper_narrows_to_one_component() {
        let mut space = Space::new();
        let e = space.create_entity();
        space.emplace(e, 7u64).unwrap();

        let wrapper = ComponentWrapper::<u64>::new(&mut space, e);
        assert!(wrapper.has_component());
        assert_eq!(wrapper.get_component(|v| *v).unwrap(), 7);
    }
}
