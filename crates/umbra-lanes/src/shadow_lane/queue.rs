// Copyright 2025 eraflo
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

//! The FIFO of shadow sources waiting to be re-rendered.

use ahash::AHashSet;
use std::collections::VecDeque;
use umbra_core::renderer::ShadowSourceId;

/// A deduplicated FIFO queue of pending shadow updates.
///
/// A source already waiting in the queue is not inserted a second time, so
/// its position (and fairness relative to later sources) is preserved.
#[derive(Debug, Default, Clone)]
pub struct ShadowUpdateQueue {
    order: VecDeque<ShadowSourceId>,
    members: AHashSet<ShadowSourceId>,
}

impl ShadowUpdateQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `uid` unless it is already pending. Returns whether it was added.
    pub fn push(&mut self, uid: ShadowSourceId) -> bool {
        if !self.members.insert(uid) {
            return false;
        }
        self.order.push_back(uid);
        true
    }

    /// The oldest pending source.
    pub fn front(&self) -> Option<ShadowSourceId> {
        self.order.front().copied()
    }

    /// Removes and returns the oldest pending source.
    pub fn pop_front(&mut self) -> Option<ShadowSourceId> {
        let uid = self.order.pop_front()?;
        self.members.remove(&uid);
        Some(uid)
    }

    /// Whether `uid` is pending.
    pub fn contains(&self, uid: ShadowSourceId) -> bool {
        self.members.contains(&uid)
    }

    /// Number of pending sources.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Pending sources, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = ShadowSourceId> + '_ {
        self.order.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> ShadowSourceId {
        ShadowSourceId::from_raw(raw)
    }

    #[test]
    fn test_fifo_and_dedup() {
        let mut queue = ShadowUpdateQueue::new();
        assert!(queue.push(id(1)));
        assert!(queue.push(id(2)));
        assert!(!queue.push(id(1)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![id(1), id(2)]);

        assert_eq!(queue.pop_front(), Some(id(1)));
        assert!(!queue.contains(id(1)));
        // Once processed, a source may be queued again, behind the others.
        assert!(queue.push(id(1)));
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![id(2), id(1)]);
    }
}
