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

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use scylla_cdc_common::{GenerationId, StreamId, TaskId, TaskState, Timestamp};

use crate::PortResult;

/// The caller-supplied distribution and durability layer: it hands tasks to
/// workers, and persists the `TaskState` those workers report back so the
/// master can later ask whether a generation is fully consumed.
///
/// The transport owns all `TaskState` that must survive a process restart;
/// the master and workers only hold transient copies while they work.
#[async_trait]
pub trait Transport: Send + Sync {
    /// A restart hint: the generation the transport last configured workers
    /// for, if any. When present, the master skips initial discovery
    /// (`MasterCqlSession::fetch_first_generation_id`) and resumes directly
    /// from this generation.
    async fn get_current_generation_id(&self) -> PortResult<Option<GenerationId>>;

    /// Delivers the authoritative task set for the current generation.
    /// Supersedes any prior configuration: workers still reading against a
    /// retired generation may finish in flight, but their progress reports
    /// are discarded by the transport once their task id is no longer in
    /// the current set.
    async fn configure_workers(&self, tasks: BTreeMap<TaskId, BTreeSet<StreamId>>) -> PortResult<()>;

    /// A worker reports its task's new state after consuming a change or
    /// sliding to the next window. At-least-once: implementations must
    /// tolerate (and may coalesce) duplicate or out-of-order reports for
    /// the same task, but must never let `windowEnd` regress once
    /// persisted.
    async fn report_progress(&self, task_id: &TaskId, state: TaskState) -> PortResult<()>;

    /// True iff every task in `tasks` has durably crossed `t`, i.e. every
    /// worker's persisted `TaskState::window_start` is `> t`. This is the
    /// master's sole completion oracle for "has this generation been fully
    /// consumed" — it must reflect persisted worker progress, not merely
    /// in-memory state that could be lost on a worker restart.
    async fn are_tasks_fully_consumed_until(
        &self,
        tasks: &BTreeSet<TaskId>,
        t: Timestamp,
    ) -> PortResult<bool>;
}
