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

//! A fixed-capacity array mirrored into a shader-visible buffer.

use bytemuck::Pod;

/// An array whose backing storage is allocated once, at construction.
///
/// The logical length can be reset and grown up to the capacity without ever
/// reallocating. Entries past the length keep whatever was written there last;
/// consumers read only `len` entries, so the stale tail is never cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedArray<T> {
    items: Vec<T>,
    len: usize,
}

impl<T: Copy + Default> FixedArray<T> {
    /// Creates an empty array with room for `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: vec![T::default(); capacity],
            len: 0,
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the next push would be rejected.
    pub fn is_full(&self) -> bool {
        self.len >= self.items.len()
    }

    /// Resets the length to zero. The storage is kept as is.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends `value`, returning its index, or hands it back when full.
    pub fn try_push(&mut self, value: T) -> Result<usize, T> {
        if self.is_full() {
            return Err(value);
        }
        let index = self.len;
        self.items[index] = value;
        self.len += 1;
        Ok(index)
    }

    /// Writes `value` at `index`, extending the length to cover it.
    ///
    /// Returns `false` if `index` is outside the capacity.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = value;
                self.len = self.len.max(index + 1);
                true
            }
            None => false,
        }
    }

    /// Overwrites the live entries with those of `other`, without touching
    /// the storage allocation.
    ///
    /// Returns how many entries were copied; entries past this array's
    /// capacity are left out.
    pub fn copy_from(&mut self, other: &Self) -> usize {
        let count = other.len.min(self.items.len());
        self.items[..count].copy_from_slice(&other.items[..count]);
        self.len = count;
        count
    }

    /// Returns the entry at `index` if it is live.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// The live entries.
    pub fn as_slice(&self) -> &[T] {
        &self.items[..self.len]
    }

    /// The whole backing storage, stale tail included.
    pub fn storage(&self) -> &[T] {
        &self.items
    }
}

impl<T: Pod + Default> FixedArray<T> {
    /// The whole backing storage as bytes, ready to upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.items)
    }
}
