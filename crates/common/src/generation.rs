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

use std::collections::BTreeSet;

use crate::task::{GenerationId, StreamId};
use crate::time::Timestamp;

/// A contiguous interval during which the set of CDC streams is fixed,
/// bounded by topology changes ("generations" in the ring sense).
///
/// Invariants: `end`, once set, is monotonically non-decreasing across
/// refetches of the same generation; `end > id` whenever `end` is set;
/// `streams` is non-empty once the generation is observable to the master
/// (a generation with zero assigned streams has not finished propagating).
#[derive(Debug, Clone)]
pub struct GenerationMetadata {
    pub id: GenerationId,
    pub end: Option<Timestamp>,
    pub next: Option<GenerationId>,
    pub streams: BTreeSet<StreamId>,
}

impl GenerationMetadata {
    pub fn is_closed(&self) -> bool {
        self.end.is_some()
    }

    /// Merges a freshly observed `end`/`next` into this metadata, refusing
    /// to let `end` regress. Generation ends are only ever reported once
    /// discovered and never retracted by the cluster.
    pub fn with_refreshed_end(self, end: Option<Timestamp>, next: Option<GenerationId>) -> Self {
        let end = match (self.end, end) {
            (Some(old), Some(new)) => Some(old.max(new)),
            (old, new) => old.or(new),
        };
        let next = self.next.or(next);
        Self { end, next, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refreshed_end_never_regresses() {
        let g = GenerationMetadata {
            id: Timestamp::from_millis(0),
            end: Some(Timestamp::from_millis(100)),
            next: None,
            streams: BTreeSet::new(),
        };
        let g = g.with_refreshed_end(Some(Timestamp::from_millis(50)), None);
        assert_eq!(g.end, Some(Timestamp::from_millis(100)));
    }

    #[test]
    fn absent_refresh_keeps_prior_end() {
        let g = GenerationMetadata {
            id: Timestamp::from_millis(0),
            end: Some(Timestamp::from_millis(100)),
            next: Some(Timestamp::from_millis(200)),
            streams: BTreeSet::new(),
        };
        let g = g.with_refreshed_end(None, None);
        assert_eq!(g.end, Some(Timestamp::from_millis(100)));
        assert_eq!(g.next, Some(Timestamp::from_millis(200)));
    }
}
