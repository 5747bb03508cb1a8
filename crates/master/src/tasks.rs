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

use scylla_cdc_common::{GenerationMetadata, Task, TaskId, TaskState, VnodeId, TableName};
use scylla_cdc_common::vnode::vnode_id_of;

/// Groups a generation's streams into one task per `(vnode, table)`. A
/// vnode produces exactly one task per configured table; streams that
/// share a vnode are grouped into the same task's stream set.
pub fn build_tasks(
    generation: &GenerationMetadata,
    tables: &BTreeSet<TableName>,
    window_size_ms: i64,
) -> BTreeMap<TaskId, Task> {
    let mut by_vnode: BTreeMap<VnodeId, BTreeSet<_>> = BTreeMap::new();
    for stream in &generation.streams {
        by_vnode.entry(vnode_id_of(stream)).or_default().insert(*stream);
    }

    let mut tasks = BTreeMap::new();
    for table in tables {
        for (vnode_id, streams) in &by_vnode {
            let id = TaskId {
                generation_id: generation.id,
                vnode_id: *vnode_id,
                table: table.clone(),
            };
            let state = TaskState::create_initial(generation.id, window_size_ms);
            tasks.insert(
                id.clone(),
                Task {
                    id,
                    streams: streams.clone(),
                    state,
                },
            );
        }
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use scylla_cdc_common::{StreamId, Timestamp};

    fn table(name: &str) -> TableName {
        TableName {
            keyspace: "ks".into(),
            name: name.into(),
        }
    }

    #[test]
    fn one_task_per_vnode_per_table() {
        let mut bytes_a = [0u8; 16];
        bytes_a[0] = 1;
        let mut bytes_b = [0u8; 16];
        bytes_b[0] = 2;
        let s0 = StreamId::from_bytes(bytes_a);
        let s1 = StreamId::from_bytes(bytes_b);

        let generation = GenerationMetadata {
            id: Timestamp::from_millis(1_700_000_000_000),
            end: None,
            next: None,
            streams: [s0, s1].into_iter().collect(),
        };
        let tables: BTreeSet<_> = [table("t")].into_iter().collect();

        let tasks = build_tasks(&generation, &tables, 1000);
        assert_eq!(tasks.len(), 2, "one task per distinct vnode for the single table");
        for task in tasks.values() {
            assert_eq!(task.streams.len(), 1);
            assert_eq!(task.id.generation_id, generation.id);
        }
    }

    #[test]
    fn streams_sharing_a_vnode_share_a_task() {
        let bytes = [9u8; 16];
        let s0 = StreamId::from_bytes(bytes);
        let mut bytes2 = bytes;
        bytes2[15] = 0xff; // differs only in the low bytes -> same vnode
        let s1 = StreamId::from_bytes(bytes2);

        let generation = GenerationMetadata {
            id: Timestamp::from_millis(0),
            end: None,
            next: None,
            streams: [s0, s1].into_iter().collect(),
        };
        let tables: BTreeSet<_> = [table("t")].into_iter().collect();

        let tasks = build_tasks(&generation, &tables, 1000);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks.values().next().unwrap().streams.len(), 2);
    }
}
