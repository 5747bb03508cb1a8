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

use scylla_cdc_common::TaskState;

/// Pluggable policy for sizing the next window a task moves into. The
/// default is a constant size; an embedder could grow or shrink the window
/// based on how much a task fell behind, but the core only needs the
/// contract.
pub trait WindowSizePolicy: Send + Sync {
    fn next_window_size_ms(&self, state: &TaskState) -> i64;
}

/// Always slides to a window of the same fixed size.
pub struct ConstantWindowSize(pub i64);

impl WindowSizePolicy for ConstantWindowSize {
    fn next_window_size_ms(&self, _state: &TaskState) -> i64 {
        self.0
    }
}
