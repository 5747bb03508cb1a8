// Copyright 2024 ScyllaDB
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

use std::sync::Arc;

use arc_swap::ArcSwap;

/// A monotonic boolean latch: once flipped to `true` it never reverts.
/// Reads never block a concurrent write and vice versa, and the outcome is
/// idempotent, so racing a read against the flip that's about to make it
/// `true` is harmless — the reader either observes the old or the new
/// value, both of which are valid answers to "as of roughly now".
///
/// Built for the streams-description version negotiation a
/// [`crate::clock::Clock`]-adjacent `MasterCqlSession` implementation needs
/// (spec.md §4.3, §5): whether the v2 `cdc_streams_descriptions_v2` layout
/// has been observed as rewritten. This crate has no CQL driver to hold
/// that state itself, so it only provides the primitive.
#[derive(Debug, Default)]
pub struct VersionLatch(ArcSwap<bool>);

impl VersionLatch {
    pub fn new() -> Self {
        Self(ArcSwap::new(Arc::new(false)))
    }

    pub fn is_latched(&self) -> bool {
        **self.0.load()
    }

    /// Flips the latch to `true`. A no-op if already latched.
    pub fn latch(&self) {
        if !self.is_latched() {
            self.0.store(Arc::new(true));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unlatched_and_latches_monotonically() {
        let latch = VersionLatch::new();
        assert!(!latch.is_latched());
        latch.latch();
        assert!(latch.is_latched());
        latch.latch();
        assert!(latch.is_latched());
    }
}
