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

//! Worker loop: consumes the CDC log for a single assigned task, window by
//! window, until shutdown or an unrecoverable error. See `scylla-cdc-master`
//! for the counterpart that discovers generations and assigns tasks.

pub mod metrics;
pub mod window_size;
pub mod worker_loop;

pub use metrics::WorkerMetrics;
pub use window_size::{ConstantWindowSize, WindowSizePolicy};
pub use worker_loop::WorkerLoop;
