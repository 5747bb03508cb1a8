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

use scylla_cdc_common::{Clock, GenerationMetadata, TableName, TaskId, Timestamp};
use scylla_cdc_ports::{MasterCqlSession, Transport};

/// Computes `lastVisible = min_over_tables(now - ttl)`, treating a table
/// with no TTL (or whose TTL fetch failed) as never expiring — it
/// contributes the Unix epoch, which can never exceed a real generation's
/// `end`. A single bad table therefore never stalls generation advance;
/// the failure is logged and localized to that table's contribution.
pub async fn generation_ttl_expired(
    cql: &impl MasterCqlSession,
    clock: &dyn Clock,
    tables: &BTreeSet<TableName>,
    end: Timestamp,
) -> bool {
    let now = clock.now();
    let mut last_visible = now;

    for table in tables {
        let ttl = match cql.fetch_table_ttl(table).await {
            Ok(ttl) => ttl,
            Err(err) => {
                tracing::warn!(%table, error = %err, "failed to fetch TTL, treating as absent");
                None
            }
        };
        let table_last_visible = match ttl {
            Some(ttl_secs) => now.saturating_sub_ms((ttl_secs as i64).saturating_mul(1000)),
            None => Timestamp::from_millis(0),
        };
        last_visible = last_visible.min(table_last_visible);
    }

    last_visible > end
}

/// Which path (if any) a call to [`generation_done`] completed the
/// generation through. The master loop reports this distinction via
/// `MasterMetrics::generation_ttl_skips`, so it cannot be collapsed back
/// into a plain `bool` the way the spec's pseudocode does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationCompletion {
    /// `end` is unset, or `end` is set but neither path below has fired yet.
    NotDone,
    /// `generationTTLExpired`: no table can still hold a row inside the
    /// generation's range, regardless of transport progress.
    TtlExpired,
    /// `transport.areTasksFullyConsumedUntil` reported every task has
    /// durably crossed `end`.
    TransportConsumed,
}

impl GenerationCompletion {
    pub fn is_done(self) -> bool {
        !matches!(self, GenerationCompletion::NotDone)
    }
}

/// Determines whether the generation has closed (`end` is known) and is
/// either TTL-expired or every configured task has durably crossed its end,
/// and if so, which of those two completed it.
pub async fn generation_done(
    cql: &impl MasterCqlSession,
    transport: &impl Transport,
    clock: &dyn Clock,
    generation: &GenerationMetadata,
    tables: &BTreeSet<TableName>,
    task_ids: &BTreeSet<TaskId>,
) -> scylla_cdc_common::Result<GenerationCompletion> {
    let Some(end) = generation.end else {
        return Ok(GenerationCompletion::NotDone);
    };

    if generation_ttl_expired(cql, clock, tables, end).await {
        return Ok(GenerationCompletion::TtlExpired);
    }

    if transport.are_tasks_fully_consumed_until(task_ids, end).await? {
        Ok(GenerationCompletion::TransportConsumed)
    } else {
        Ok(GenerationCompletion::NotDone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scylla_cdc_common::clock::test_support::FakeClock;
    use scylla_cdc_common::{GenerationId, TaskId, TaskState};
    use scylla_cdc_ports::PortResult;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct FakeMasterCql {
        ttls: BTreeMap<TableName, Option<u64>>,
    }

    #[async_trait]
    impl MasterCqlSession for FakeMasterCql {
        async fn fetch_first_generation_id(&self) -> PortResult<Option<GenerationId>> {
            unimplemented!()
        }
        async fn fetch_generation_metadata(
            &self,
            _id: GenerationId,
        ) -> PortResult<GenerationMetadata> {
            unimplemented!()
        }
        async fn fetch_generation_end(&self, _id: GenerationId) -> PortResult<Option<Timestamp>> {
            unimplemented!()
        }
        async fn fetch_table_ttl(&self, table: &TableName) -> PortResult<Option<u64>> {
            Ok(*self.ttls.get(table).unwrap_or(&None))
        }
    }

    struct FakeTransport {
        fully_consumed: Mutex<bool>,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get_current_generation_id(&self) -> PortResult<Option<GenerationId>> {
            unimplemented!()
        }
        async fn configure_workers(
            &self,
            _tasks: BTreeMap<TaskId, std::collections::BTreeSet<scylla_cdc_common::StreamId>>,
        ) -> PortResult<()> {
            unimplemented!()
        }
        async fn report_progress(&self, _task_id: &TaskId, _state: TaskState) -> PortResult<()> {
            unimplemented!()
        }
        async fn are_tasks_fully_consumed_until(
            &self,
            _tasks: &std::collections::BTreeSet<TaskId>,
            _t: Timestamp,
        ) -> PortResult<bool> {
            Ok(*self.fully_consumed.lock().unwrap())
        }
    }

    fn table(name: &str) -> TableName {
        TableName {
            keyspace: "ks".into(),
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn ttl_expiry_wins_even_without_transport_progress() {
        let cql = FakeMasterCql {
            ttls: [(table("t"), Some(60))].into_iter().collect(),
        };
        let transport = FakeTransport {
            fully_consumed: Mutex::new(false),
        };
        let clock = FakeClock::new(1_000 + 61_000);
        let generation = GenerationMetadata {
            id: Timestamp::from_millis(0),
            end: Some(Timestamp::from_millis(1_000)),
            next: None,
            streams: Default::default(),
        };
        let tables: BTreeSet<_> = [table("t")].into_iter().collect();
        let done = generation_done(
            &cql,
            &transport,
            &clock,
            &generation,
            &tables,
            &Default::default(),
        )
        .await
        .unwrap();
        assert_eq!(done, GenerationCompletion::TtlExpired);
    }

    #[tokio::test]
    async fn a_table_missing_ttl_never_expires_the_generation_on_its_own() {
        let cql = FakeMasterCql {
            ttls: [(table("t"), None)].into_iter().collect(),
        };
        let clock = FakeClock::new(1_000_000_000_000);
        let tables: BTreeSet<_> = [table("t")].into_iter().collect();
        assert!(
            !generation_ttl_expired(&cql, &clock, &tables, Timestamp::from_millis(1)).await
        );
    }

    #[tokio::test]
    async fn open_generation_is_never_done() {
        let cql = FakeMasterCql {
            ttls: Default::default(),
        };
        let transport = FakeTransport {
            fully_consumed: Mutex::new(true),
        };
        let clock = FakeClock::new(0);
        let generation = GenerationMetadata {
            id: Timestamp::from_millis(0),
            end: None,
            next: None,
            streams: Default::default(),
        };
        let tables = Default::default();
        let done = generation_done(
            &cql,
            &transport,
            &clock,
            &generation,
            &tables,
            &Default::default(),
        )
        .await
        .unwrap();
        assert_eq!(done, GenerationCompletion::NotDone);
    }

    #[tokio::test]
    async fn transport_confirmed_consumption_is_reported_distinctly_from_ttl() {
        let cql = FakeMasterCql {
            ttls: [(table("t"), None)].into_iter().collect(),
        };
        let transport = FakeTransport {
            fully_consumed: Mutex::new(true),
        };
        let clock = FakeClock::new(0);
        let generation = GenerationMetadata {
            id: Timestamp::from_millis(0),
            end: Some(Timestamp::from_millis(1_000)),
            next: None,
            streams: Default::default(),
        };
        let tables: BTreeSet<_> = [table("t")].into_iter().collect();
        let done = generation_done(
            &cql,
            &transport,
            &clock,
            &generation,
            &tables,
            &Default::default(),
        )
        .await
        .unwrap();
        assert_eq!(done, GenerationCompletion::TransportConsumed);
    }
}
