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

use async_trait::async_trait;

use crate::worker_cql::RawChange;
use crate::PortResult;

/// The user-supplied sink for row-level changes. Returning `Ok(())` is the
/// commit signal: the worker loop persists `TaskState::update` only after
/// `consume` has returned successfully, so a change is never marked
/// consumed before the consumer has actually observed it.
#[async_trait]
pub trait Consumer<C: RawChange>: Send + Sync {
    async fn consume(&self, change: C) -> PortResult<()>;
}
