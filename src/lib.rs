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

//! Archetype ECS — cache-friendly archetype storage and query core.
//!
//! Entities are grouped into archetypes by their exact component signature;
//! each archetype stores its components column-by-column so that iterating
//! a query streams tightly packed, type-homogeneous memory. See `Space` for
//! the entry point.

pub mod archetype;
pub mod archetype_index;
pub mod bitset;
pub mod command;
pub mod component;
#[cfg(feature = "expose-internals")]
pub mod debug;
pub mod entity;
pub mod error;
pub mod pool;
pub mod query;
pub mod utils;
pub mod wrapper;
pub mod world;

pub use bitset::BitSet;
pub use component::{id_of, Bundle, Component, ComponentId};
pub use entity::Entity;
pub use error::{EcsError, Result};
pub use query::Fetch;
pub use world::{update_all, update_spaces, Space};
pub use wrapper::{ComponentWrapper, ComponentWrapperGeneric};
