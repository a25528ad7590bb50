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

//! Error types

use std::fmt;

/// ECS error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    /// A handle's generation does not match the slot's current generation,
    /// or its id was never allocated.
    InvalidEntity,

    /// Archetype lookup failed for an entity that should be registered.
    EntityNotFound,

    /// The requested component column does not exist on this entity's
    /// archetype.
    MissingComponent,

    /// `emplace`/`insert` was called for a component the entity already has.
    DuplicateComponent,

    /// The entity handle belongs to a different `Space` than the one it
    /// was passed to.
    ForeignEntity,

    /// A structural mutation (destroy, add/remove component) was attempted
    /// from within an active `Space::update` dispatch.
    DestructionDuringUpdate,
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::InvalidEntity => write!(f, "invalid entity handle"),
            EcsError::EntityNotFound => write!(f, "entity not found in any archetype"),
            EcsError::MissingComponent => write!(f, "entity does not have the requested component"),
            EcsError::DuplicateComponent => write!(f, "entity already has this component"),
            EcsError::ForeignEntity => write!(f, "entity handle belongs to a different space"),
            EcsError::DestructionDuringUpdate => {
                write!(f, "structural mutation attempted during an active update")
            }
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
