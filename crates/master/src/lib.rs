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

//! The master loop: discovers CDC generations, builds the task
//! set for the current one, advances through generations that have become
//! fully consumed or TTL-expired, and republishes the task set to the
//! [`scylla_cdc_ports::Transport`] whenever the current generation changes.

pub mod generation_done;
pub mod master_loop;
pub mod metrics;
pub mod tasks;

pub use generation_done::{generation_done, generation_ttl_expired, GenerationCompletion};
pub use master_loop::MasterLoop;
pub use metrics::MasterMetrics;
pub use tasks::build_tasks;
