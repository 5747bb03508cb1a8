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

//! Shared domain types for the scylla-cdc master/worker coordination engine:
//! timestamps and window-UUID conversions, the per-task cursor, and
//! generation metadata. See `scylla-cdc-ports` for the abstract contracts
//! that operate on these types, and `scylla-cdc-master` / `scylla-cdc-worker`
//! for the loops that drive them.

pub mod clock;
pub mod config;
pub mod error;
pub mod generation;
pub mod task;
pub mod time;
pub mod version_latch;
pub mod vnode;

pub use clock::{Clock, SharedClock, SystemClock};
pub use config::Config;
pub use error::{CdcError, Result};
pub use generation::GenerationMetadata;
pub use task::{ChangeId, GenerationId, StreamId, Task, TaskId, TaskState, TableName, VnodeId};
pub use time::Timestamp;
pub use version_latch::VersionLatch;
