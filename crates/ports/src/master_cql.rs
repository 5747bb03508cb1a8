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
use scylla_cdc_common::{GenerationId, GenerationMetadata, TableName, Timestamp};

use crate::PortResult;

/// The master's view of the cluster: generation discovery, generation
/// metadata, and per-table TTL. Implementations talk CQL to
/// `system_distributed.cdc_generation_timestamps` and the streams-
/// description tables; that transport and row decoding is out of scope for
/// this crate, which only consumes the contract below.
///
/// Implementations MUST negotiate between the two on-disk layouts of the
/// streams-description table (v1 `cdc_streams_descriptions` with
/// `ALLOW FILTERING`, v2 `cdc_streams_descriptions_v2`) and switch to v2
/// only after observing a `rewritten` marker row in
/// `system.cdc_local`. Once observed, the decision latches for the lifetime
/// of the session — it must never flip back, even if a later read races
/// with the rewrite and appears to not see the marker.
#[async_trait]
pub trait MasterCqlSession: Send + Sync {
    /// The earliest known generation, or `None` when CDC has not yet
    /// produced any generation (the log is empty or the feature was just
    /// enabled). Distinct from a transient failure: callers poll this on a
    /// fixed interval rather than treating `None` as an error.
    async fn fetch_first_generation_id(&self) -> PortResult<Option<GenerationId>>;

    /// The complete record for generation `id`, including its stream set.
    /// Fails with [`crate::PortError::UnknownGeneration`] if `id` is not a
    /// generation the cluster knows about.
    async fn fetch_generation_metadata(&self, id: GenerationId) -> PortResult<GenerationMetadata>;

    /// The generation's end timestamp, if the cluster has recorded the next
    /// generation's start yet. `None` means the generation is still the
    /// newest one and has not closed.
    async fn fetch_generation_end(&self, id: GenerationId) -> PortResult<Option<Timestamp>>;

    /// The table's CDC TTL in seconds. `Some(0)` (TTL disabled) is
    /// collapsed to `None` by the implementation before it reaches the
    /// caller — the master never needs to distinguish "disabled" from
    /// "absent". Fails with a configuration error if the table is not
    /// CDC-enabled or its metadata could not be read.
    async fn fetch_table_ttl(&self, table: &TableName) -> PortResult<Option<u64>>;
}
