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

//! Deferred destruction queue.
//!
//! Mirrors Alloy's `ALLOY_DEFER_DESTRUCTION` path in `Space.h`: rather than
//! destroying an entity immediately, a caller can queue it and drain the
//! queue at a point of their choosing (typically once per frame, after all
//! `update` calls have finished).

use crate::entity::Entity;

#[derive(Default)]
pub(crate) struct DestructionQueue {
    pending: Vec<Entity>,
}

impl DestructionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, e: Entity) {
        self.pending.push(e);
    }

    /// Removes and returns every queued entity, in FIFO order.
    pub fn drain(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_queue_in_order() {
        let mut q = DestructionQueue::new();
        q.push(Entity::new(1, 0));
        q.push(Entity::new(2, 0));
        assert_eq!(q.len(), 2);
        let drained = q.drain();
        assert_eq!(drained, vec![Entity::new(1, 0), Entity::new(2, 0)]);
        assert!(q.is_empty());
    }
}
