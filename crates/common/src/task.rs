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
use std::fmt;

use uuid::Uuid;

use crate::time::{window_end_uuid, window_start_uuid, Timestamp};

/// A single `Timestamp` denoting when a ring-topology generation became
/// active. Doubles as the generation's identity.
pub type GenerationId = Timestamp;

/// Opaque 16-byte CDC stream identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId([u8; 16]);

impl StreamId {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// The coarse partition key streams are grouped by to form a [`Task`]. Many
/// streams can share one vnode; see [`crate::vnode::vnode_id_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VnodeId(pub(crate) u64);

impl fmt::Display for VnodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableName {
    pub keyspace: String,
    pub name: String,
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.keyspace, self.name)
    }
}

/// Identifies a change's total order within and across streams:
/// `(time, streamId)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeId {
    pub stream_id: StreamId,
    pub time: Uuid,
}

impl PartialOrd for ChangeId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChangeId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.time, self.stream_id).cmp(&(other.time, other.stream_id))
    }
}

/// Identity of a task: the tuple `(generationId, vnodeId, table)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId {
    pub generation_id: GenerationId,
    pub vnode_id: VnodeId,
    pub table: TableName,
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.generation_id, self.vnode_id, self.table)
    }
}

/// The value-typed cursor of a [`Task`]: a half-open window
/// `[windowStart, windowEnd)` plus the last change consumed inside it.
///
/// Every mutation produces a new `TaskState`; the previous value remains
/// valid to reference (and to retry against) since it is never mutated in
/// place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskState {
    window_start: Timestamp,
    window_end: Timestamp,
    last_consumed: Option<ChangeId>,
}

impl TaskState {
    /// The initial state of a task newly created for generation `gen`:
    /// the first window, with nothing consumed yet.
    pub fn create_initial(gen_start: Timestamp, window_size_ms: i64) -> Self {
        Self {
            window_start: gen_start,
            window_end: gen_start.add_millis(window_size_ms),
            last_consumed: None,
        }
    }

    pub fn window_start(&self) -> Timestamp {
        self.window_start
    }

    pub fn window_end(&self) -> Timestamp {
        self.window_end
    }

    pub fn last_consumed(&self) -> Option<ChangeId> {
        self.last_consumed
    }

    pub fn window_start_uuid(&self) -> Uuid {
        window_start_uuid(self.window_start)
    }

    pub fn window_end_uuid(&self) -> Uuid {
        window_end_uuid(self.window_end)
    }

    /// Slides to the next window of size `next_window_size_ms`, starting
    /// exactly where this one ended. Clears `lastConsumed`: the next window
    /// is fresh and has consumed nothing yet.
    pub fn move_to_next_window(&self, next_window_size_ms: i64) -> Self {
        let next_end = self.window_end.add_millis(next_window_size_ms);
        Self {
            window_start: self.window_end,
            window_end: next_end,
            last_consumed: None,
        }
    }

    /// Records that `change_id` has been consumed. Does not move the
    /// window.
    pub fn update(&self, change_id: ChangeId) -> Self {
        Self {
            last_consumed: Some(change_id),
            ..*self
        }
    }

    /// Whether this task's window has moved strictly past `t` — used by the
    /// master to test whether a task has progressed beyond a generation's
    /// end.
    pub fn has_passed(&self, t: Timestamp) -> bool {
        self.window_start > t
    }
}

/// The unit of work the worker polls: all streams of one vnode, for one
/// table, within one generation.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub streams: BTreeSet<StreamId>,
    pub state: TaskState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen_id(millis: i64) -> GenerationId {
        Timestamp::from_millis(millis)
    }

    #[test]
    fn move_to_next_window_resets_last_consumed_and_chains_bounds() {
        let s0 = TaskState::create_initial(gen_id(1_700_000_000_000), 1000);
        assert_eq!(s0.window_start().millis(), 1_700_000_000_000);
        assert_eq!(s0.window_end().millis(), 1_700_000_001_000);
        assert!(s0.last_consumed().is_none());

        let change = ChangeId {
            stream_id: StreamId::from_bytes([7; 16]),
            time: window_start_uuid(Timestamp::from_millis(1_700_000_000_500)),
        };
        let s1 = s0.update(change);
        assert_eq!(s1.window_start(), s0.window_start());
        assert_eq!(s1.window_end(), s0.window_end());
        assert_eq!(s1.last_consumed(), Some(change));

        let s2 = s1.move_to_next_window(1000);
        assert_eq!(s2.window_start(), s1.window_end());
        assert_eq!(s2.window_end().millis(), 1_700_000_002_000);
        assert!(s2.last_consumed().is_none());
    }

    #[test]
    fn has_passed_compares_window_start() {
        let s = TaskState::create_initial(gen_id(1000), 1000);
        assert!(!s.has_passed(Timestamp::from_millis(1000)));
        assert!(!s.has_passed(Timestamp::from_millis(1500)));
        assert!(s.has_passed(Timestamp::from_millis(999)));
    }
}
