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

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use scylla_cdc_common::{Result, SharedClock, Task};
use scylla_cdc_ports::{ChangeReader, Consumer, Transport, WorkerCqlSession};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_util::sync::CancellationToken;

use crate::metrics::WorkerMetrics;
use crate::window_size::{ConstantWindowSize, WindowSizePolicy};

type Flow<T> = ControlFlow<(), T>;

fn backoff() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(50)
        .max_delay(Duration::from_secs(10))
        .map(jitter)
}

/// Drives one [`Task`] through its windowed read/consume/advance state
/// machine. One `WorkerLoop` is shared across however many tasks the
/// embedder assigns to this process; `run_task` owns a single task's
/// lifetime.
pub struct WorkerLoop<W, T, P = crate::window_size::ConstantWindowSize> {
    cql: Arc<W>,
    transport: Arc<T>,
    clock: SharedClock,
    window_size: P,
    shutdown: CancellationToken,
    metrics: Option<WorkerMetrics>,
}

impl<W, T, P> WorkerLoop<W, T, P>
where
    W: WorkerCqlSession,
    T: Transport,
    P: WindowSizePolicy,
{
    pub fn new(
        cql: Arc<W>,
        transport: Arc<T>,
        clock: SharedClock,
        window_size: P,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            cql,
            transport,
            clock,
            window_size,
            shutdown,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: WorkerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs `task` forever, until shutdown or an unrecoverable (non-CQL,
    /// non-consumer) error. CQL read failures are retried against the same
    /// window from its persisted `lastConsumed` cursor, with backoff. A
    /// consumer error aborts the task immediately: retrying a failed
    /// consumer is left to the embedder's own supervision, starting the
    /// task fresh from its last reported `TaskState`.
    pub async fn run_task<C>(&self, mut task: Task, consumer: Arc<C>) -> Result<()>
    where
        C: Consumer<<W::Reader as ChangeReader>::Change>,
    {
        let mut retry_delays = backoff();

        loop {
            if self.wait_until_window_closed(&task).await.is_break() {
                return Ok(());
            }

            match self.run_window(&mut task, &*consumer).await {
                Ok(ControlFlow::Break(())) => return Ok(()),
                Ok(ControlFlow::Continue(())) => {
                    retry_delays = backoff();
                    let next_size = self.window_size.next_window_size_ms(&task.state);
                    task.state = task.state.move_to_next_window(next_size);
                    self.transport.report_progress(&task.id, task.state).await?;
                    if let Some(metrics) = &self.metrics {
                        metrics.windows_advanced.inc();
                    }
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(task = %task.id, error = %err, "retrying window read after transient error");
                    if let Some(metrics) = &self.metrics {
                        metrics.window_retries.inc();
                    }
                    let delay = retry_delays.next().unwrap_or(Duration::from_secs(10));
                    if self.sleep_or_shutdown(delay).await.is_break() {
                        return Ok(());
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Reads the task's current window to exhaustion, delivering every
    /// not-yet-consumed change to `consumer` in order and reporting
    /// progress after each one (at least once: progress is only persisted
    /// after `consume` returns successfully).
    ///
    /// Restarting this function after a failure — whether from a crash or
    /// from the retry loop in [`Self::run_task`] — re-issues the same
    /// window query and relies on the `lastConsumed` resume-skip below to
    /// avoid re-delivering anything the consumer already saw.
    async fn run_window<C>(&self, task: &mut Task, consumer: &C) -> Result<Flow<()>>
    where
        C: Consumer<<W::Reader as ChangeReader>::Change>,
    {
        let mut reader = self.cql.create_reader(task).await?;

        loop {
            if self.shutdown.is_cancelled() {
                return Ok(ControlFlow::Break(()));
            }

            let Some(change) = reader.next_change().await? else {
                return Ok(ControlFlow::Continue(()));
            };
            let change_id = change.change_id();

            if let Some(last) = task.state.last_consumed() {
                if change_id <= last {
                    continue;
                }
            }

            consumer.consume(change).await?;
            task.state = task.state.update(change_id);
            self.transport.report_progress(&task.id, task.state).await?;
            if let Some(metrics) = &self.metrics {
                metrics.changes_consumed.inc();
            }
        }
    }

    /// Windows must not extend to wall-clock "now": a worker waits for its
    /// window to close so it never reads a window whose contents are still
    /// being written.
    async fn wait_until_window_closed(&self, task: &Task) -> Flow<()> {
        loop {
            let now = self.clock.now();
            if now >= task.state.window_end() {
                return ControlFlow::Continue(());
            }
            let remaining = task.state.window_end().millis() - now.millis();
            let wait = Duration::from_millis(remaining.max(0) as u64);
            if self.sleep_or_shutdown(wait).await.is_break() {
                return ControlFlow::Break(());
            }
        }
    }

    async fn sleep_or_shutdown(&self, duration: Duration) -> Flow<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => ControlFlow::Continue(()),
            _ = self.shutdown.cancelled() => ControlFlow::Break(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use scylla_cdc_common::clock::test_support::FakeClock;
    use scylla_cdc_common::{
        ChangeId, GenerationId, StreamId, TableName, TaskId, TaskState, Timestamp, VnodeId,
    };
    use scylla_cdc_ports::{PortResult, RawChange};
    use uuid::Uuid;

    use super::*;

    #[derive(Clone, Debug)]
    struct FakeChange {
        id: ChangeId,
        value: u64,
    }

    impl RawChange for FakeChange {
        fn change_id(&self) -> ChangeId {
            self.id
        }
    }

    struct FakeReader {
        remaining: std::vec::IntoIter<FakeChange>,
    }

    #[async_trait]
    impl ChangeReader for FakeReader {
        type Change = FakeChange;

        async fn next_change(&mut self) -> PortResult<Option<FakeChange>> {
            Ok(self.remaining.next())
        }
    }

    struct FakeWorkerCql {
        changes: Vec<FakeChange>,
        readers_created: Mutex<u32>,
    }

    #[async_trait]
    impl WorkerCqlSession for FakeWorkerCql {
        type Reader = FakeReader;

        async fn prepare(&self, _tables: &BTreeSet<TableName>) -> PortResult<()> {
            Ok(())
        }

        async fn create_reader(&self, _task: &Task) -> PortResult<Self::Reader> {
            *self.readers_created.lock().unwrap() += 1;
            Ok(FakeReader {
                remaining: self.changes.clone().into_iter(),
            })
        }
    }

    struct FakeTransport {
        reported: Mutex<Vec<(TaskId, TaskState)>>,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get_current_generation_id(&self) -> PortResult<Option<GenerationId>> {
            unimplemented!()
        }

        async fn configure_workers(
            &self,
            _tasks: BTreeMap<TaskId, BTreeSet<StreamId>>,
        ) -> PortResult<()> {
            unimplemented!()
        }

        async fn report_progress(&self, task_id: &TaskId, state: TaskState) -> PortResult<()> {
            self.reported.lock().unwrap().push((task_id.clone(), state));
            Ok(())
        }

        async fn are_tasks_fully_consumed_until(
            &self,
            _tasks: &BTreeSet<TaskId>,
            _t: Timestamp,
        ) -> PortResult<bool> {
            unimplemented!()
        }
    }

    struct RecordingConsumer {
        seen: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl Consumer<FakeChange> for RecordingConsumer {
        async fn consume(&self, change: FakeChange) -> PortResult<()> {
            self.seen.lock().unwrap().push(change.value);
            Ok(())
        }
    }

    struct FailingConsumer;

    #[async_trait]
    impl Consumer<FakeChange> for FailingConsumer {
        async fn consume(&self, _change: FakeChange) -> PortResult<()> {
            Err(scylla_cdc_common::CdcError::Consumer(anyhow::anyhow!(
                "consumer blew up"
            )))
        }
    }

    fn stream(byte: u8) -> StreamId {
        StreamId::from_bytes([byte; 16])
    }

    fn change_at(stream: StreamId, millis: i64, value: u64) -> FakeChange {
        let uuid = Uuid::from_u128(millis as u128);
        FakeChange {
            id: ChangeId {
                stream_id: stream,
                time: uuid,
            },
            value,
        }
    }

    fn task_with_state(state: TaskState) -> Task {
        Task {
            id: TaskId {
                generation_id: Timestamp::from_millis(0),
                vnode_id: VnodeId(1),
                table: TableName {
                    keyspace: "ks".into(),
                    name: "t".into(),
                },
            },
            streams: BTreeSet::from([stream(1)]),
            state,
        }
    }

    #[tokio::test]
    async fn consumes_a_full_window_and_advances_state() {
        // The clock must land inside the first window, not past the second
        // one too: a clock already past window 2's end would let the
        // current-thread runtime race through both windows synchronously
        // before the cancellation below ever gets a chance to run.
        let clock: SharedClock = Arc::new(FakeClock::new(5_000));
        let cql = Arc::new(FakeWorkerCql {
            changes: vec![
                change_at(stream(1), 1, 1),
                change_at(stream(1), 2, 2),
                change_at(stream(1), 3, 3),
            ],
            readers_created: Mutex::new(0),
        });
        let transport = Arc::new(FakeTransport {
            reported: Mutex::new(Vec::new()),
        });
        let consumer = Arc::new(RecordingConsumer {
            seen: Mutex::new(Vec::new()),
        });

        let state = TaskState::create_initial(Timestamp::from_millis(0), 5_000);
        let task = task_with_state(state);
        let shutdown = CancellationToken::new();
        let worker = WorkerLoop::new(
            cql.clone(),
            transport.clone(),
            clock.clone(),
            ConstantWindowSize(5_000),
            shutdown.clone(),
        );

        let shutdown_clone = shutdown.clone();
        let handle = tokio::spawn(async move {
            worker.run_task(task, consumer.clone()).await.unwrap();
            consumer
        });

        tokio::time::sleep(Duration::from_millis(1)).await;
        shutdown_clone.cancel();
        let consumer = handle.await.unwrap();

        assert_eq!(*consumer.seen.lock().unwrap(), vec![1, 2, 3]);
        assert!(*cql.readers_created.lock().unwrap() >= 1);
    }

    #[tokio::test]
    async fn resume_skips_changes_already_marked_consumed() {
        // See the comment in `consumes_a_full_window_and_advances_state`:
        // the clock must close window 1 only, not window 2 as well.
        let clock: SharedClock = Arc::new(FakeClock::new(5_000));
        let cql = Arc::new(FakeWorkerCql {
            changes: vec![
                change_at(stream(1), 1, 1),
                change_at(stream(1), 2, 2),
                change_at(stream(1), 3, 3),
            ],
            readers_created: Mutex::new(0),
        });
        let transport = Arc::new(FakeTransport {
            reported: Mutex::new(Vec::new()),
        });
        let consumer = Arc::new(RecordingConsumer {
            seen: Mutex::new(Vec::new()),
        });

        let mut state = TaskState::create_initial(Timestamp::from_millis(0), 5_000);
        let already_consumed = change_at(stream(1), 2, 2).id;
        state = state.update(already_consumed);
        let task = task_with_state(state);

        let shutdown = CancellationToken::new();
        let worker = WorkerLoop::new(
            cql,
            transport,
            clock,
            ConstantWindowSize(5_000),
            shutdown.clone(),
        );

        let shutdown_clone = shutdown.clone();
        let consumer_clone = consumer.clone();
        let handle = tokio::spawn(async move {
            worker.run_task(task, consumer_clone).await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(1)).await;
        shutdown_clone.cancel();
        handle.await.unwrap();

        assert_eq!(*consumer.seen.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn a_failing_consumer_aborts_the_task_without_retrying() {
        let clock: SharedClock = Arc::new(FakeClock::new(10_000));
        let cql = Arc::new(FakeWorkerCql {
            changes: vec![change_at(stream(1), 1, 1)],
            readers_created: Mutex::new(0),
        });
        let transport = Arc::new(FakeTransport {
            reported: Mutex::new(Vec::new()),
        });
        let consumer = Arc::new(FailingConsumer);

        let state = TaskState::create_initial(Timestamp::from_millis(0), 5_000);
        let task = task_with_state(state);
        let shutdown = CancellationToken::new();
        let worker = WorkerLoop::new(
            cql,
            transport,
            clock,
            ConstantWindowSize(5_000),
            shutdown,
        );

        let result = worker.run_task(task, consumer).await;
        assert!(result.is_err());
        assert!(!result.unwrap_err().is_retryable());
    }
}
