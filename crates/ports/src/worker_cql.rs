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

use async_trait::async_trait;
use scylla_cdc_common::{ChangeId, Task, TableName};

use crate::PortResult;

/// A decoded CDC log row. Column decoding and change-schema construction
/// are out of scope for this crate; implementations carry whatever
/// representation their row-decoding layer produces, and only need to
/// expose the row's position in the total order.
pub trait RawChange: Send + 'static {
    fn change_id(&self) -> ChangeId;
}

/// A lazy, forward-only, non-restartable sequence of changes within one
/// window, ordered by `(time, streamId)` as the engine returns them.
///
/// `next_change` returning `None` is a permanent end-of-window signal;
/// calling it again afterward is undefined behavior, so the worker loop
/// never does.
#[async_trait]
pub trait ChangeReader: Send {
    type Change: RawChange;

    async fn next_change(&mut self) -> PortResult<Option<Self::Change>>;
}

/// Per-table prepared-query cache and reader factory for the CDC log.
///
/// `prepare` is idempotent: calling it again with an overlapping table set
/// only fills in the tables not already cached. After it returns
/// successfully, every table in `tables` has a prepared query of shape
/// `SELECT * FROM <keyspace>.<table>_scylla_cdc_log WHERE stream_id IN ?
/// AND time > ? AND time <= ?`. Readers never observe a partially-prepared
/// table: the cache is write-once per table, and `prepare` only returns
/// after all writes for this call are visible.
#[async_trait]
pub trait WorkerCqlSession: Send + Sync {
    type Reader: ChangeReader;

    async fn prepare(&self, tables: &BTreeSet<TableName>) -> PortResult<()>;

    /// Binds `task`'s stream set and `task.state`'s window bounds into a
    /// reader, at `QUORUM` consistency if the cluster has more than one
    /// host, `ONE` otherwise (recomputed fresh for each call — cluster
    /// membership can change between windows).
    async fn create_reader(&self, task: &Task) -> PortResult<Self::Reader>;
}
