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
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use scylla_cdc_common::{Config, GenerationId, SharedClock, StreamId, Task, TaskId, TaskState, Timestamp};
use scylla_cdc_ports::{ChangeReader, Consumer, PortResult, Transport, WorkerCqlSession};
use scylla_cdc_worker::{ConstantWindowSize, WorkerLoop, WorkerMetrics};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long `configure_workers` waits for a retired task to stop
/// cooperatively (spec.md §5: "Workers terminate at the next suspension
/// point; an in-progress consumer call is not preempted") before falling
/// back to a hard abort. A consumer call is expected to return in well
/// under this, so in practice the cancellation always wins the race.
const WORKER_STOP_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Wraps a caller-supplied [`Transport`] so that every `configureWorkers`
/// call also reconciles the set of locally spawned worker tasks: newly
/// assigned `TaskId`s get a fresh [`WorkerLoop`] task, retired ones are
/// cancelled. Everything else is a pass-through to the inner transport.
///
/// Neither `scylla-cdc-master` nor `scylla-cdc-worker` spawn anything on
/// their own; this is the glue only the facade needs.
pub(crate) struct DispatchingTransport<W, T, C> {
    inner: Arc<T>,
    cql: Arc<W>,
    consumer: Arc<C>,
    clock: SharedClock,
    window_size_ms: i64,
    shutdown: CancellationToken,
    metrics: Option<WorkerMetrics>,
    running: Mutex<BTreeMap<TaskId, (CancellationToken, JoinHandle<()>)>>,
}

impl<W, T, C> DispatchingTransport<W, T, C>
where
    W: WorkerCqlSession + 'static,
    T: Transport + 'static,
    C: Consumer<<W::Reader as ChangeReader>::Change> + 'static,
{
    pub(crate) fn new(
        inner: Arc<T>,
        cql: Arc<W>,
        consumer: Arc<C>,
        clock: SharedClock,
        config: &Config,
        shutdown: CancellationToken,
        metrics: Option<WorkerMetrics>,
    ) -> Self {
        Self {
            inner,
            cql,
            consumer,
            clock,
            window_size_ms: config.window_size_ms(),
            shutdown,
            metrics,
            running: Mutex::new(BTreeMap::new()),
        }
    }

    /// A task is created fresh the first time its `TaskId` is configured:
    /// the window starts at the generation's start. If the same `TaskId`
    /// is configured again while this `DispatchingTransport` is still
    /// alive (e.g. the master rebuilt an identical task set without this
    /// process restarting) the worker already running for it is left
    /// untouched rather than restarted from scratch — `self.running` is an
    /// in-memory map, so this only covers that case.
    ///
    /// A true process restart constructs a fresh `DispatchingTransport`
    /// with an empty `running` map, so this always seeds `state` via
    /// `TaskState::create_initial` regardless of what was durably reported
    /// to `self.inner` before the crash. Resuming from the last persisted
    /// `TaskState` across a process restart (spec.md §3/§8 scenario S3) is
    /// the concrete `Transport` implementation's responsibility — this
    /// facade has no way to read back a task's last-reported state, only
    /// to push new ones via `report_progress`.
    fn spawn_task(&self, id: TaskId, streams: BTreeSet<StreamId>) -> (CancellationToken, JoinHandle<()>) {
        let state = TaskState::create_initial(id.generation_id, self.window_size_ms);
        let task = Task {
            id: id.clone(),
            streams,
            state,
        };
        let token = self.shutdown.child_token();
        let mut worker = WorkerLoop::new(
            self.cql.clone(),
            self.inner.clone(),
            self.clock.clone(),
            ConstantWindowSize(self.window_size_ms),
            token.clone(),
        );
        if let Some(metrics) = &self.metrics {
            worker = worker.with_metrics(metrics.clone());
        }
        let consumer = self.consumer.clone();
        let log_id = id.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = worker.run_task(task, consumer).await {
                tracing::error!(task = %log_id, error = %err, "worker task aborted");
            }
        });
        (token, handle)
    }

    /// Waits for a retired task's worker to stop on its own after its
    /// token has been cancelled. The worker only checks cancellation at a
    /// suspension point, so an in-progress `consumer.consume` call is
    /// allowed to finish rather than being preempted mid-`.await`. Only if
    /// the task is still running after [`WORKER_STOP_GRACE_PERIOD`] — which
    /// would indicate a hung consumer or CQL call, not ordinary shutdown —
    /// does this fall back to `abort()`.
    async fn join_or_abort(&self, mut handle: JoinHandle<()>) {
        tokio::select! {
            _ = &mut handle => {}
            _ = tokio::time::sleep(WORKER_STOP_GRACE_PERIOD) => {
                tracing::warn!(
                    "worker task did not stop cooperatively within the grace period, aborting"
                );
                handle.abort();
                let _ = handle.await;
            }
        }
    }
}

#[async_trait]
impl<W, T, C> Transport for DispatchingTransport<W, T, C>
where
    W: WorkerCqlSession + 'static,
    T: Transport + 'static,
    C: Consumer<<W::Reader as ChangeReader>::Change> + 'static,
{
    async fn get_current_generation_id(&self) -> PortResult<Option<GenerationId>> {
        self.inner.get_current_generation_id().await
    }

    async fn configure_workers(&self, tasks: BTreeMap<TaskId, BTreeSet<StreamId>>) -> PortResult<()> {
        self.inner.configure_workers(tasks.clone()).await?;

        let stale: Vec<TaskId> = {
            let running = self.running.lock();
            running
                .keys()
                .filter(|id| !tasks.contains_key(id))
                .cloned()
                .collect()
        };
        for id in stale {
            let retired = self.running.lock().remove(&id);
            if let Some((token, handle)) = retired {
                token.cancel();
                self.join_or_abort(handle).await;
            }
        }

        let fresh: Vec<(TaskId, BTreeSet<StreamId>)> = {
            let running = self.running.lock();
            tasks
                .into_iter()
                .filter(|(id, _)| !running.contains_key(id))
                .collect()
        };
        for (id, streams) in fresh {
            let spawned = self.spawn_task(id.clone(), streams);
            self.running.lock().insert(id, spawned);
        }

        Ok(())
    }

    async fn report_progress(&self, task_id: &TaskId, state: TaskState) -> PortResult<()> {
        self.inner.report_progress(task_id, state).await
    }

    async fn are_tasks_fully_consumed_until(
        &self,
        tasks: &BTreeSet<TaskId>,
        t: Timestamp,
    ) -> PortResult<bool> {
        self.inner.are_tasks_fully_consumed_until(tasks, t).await
    }
}

impl<W, T, C> Drop for DispatchingTransport<W, T, C> {
    /// `drop` cannot `.await` a grace period the way `configure_workers`
    /// does, so it only requests cooperative shutdown and lets the
    /// `JoinHandle`s go: dropping a handle detaches the task rather than
    /// aborting it, so each worker still runs to its next suspension
    /// point — an in-progress `consumer.consume` call is never preempted —
    /// it just does so without this transport around to hear about it.
    fn drop(&mut self) {
        for (_, (token, _handle)) in self.running.get_mut().iter() {
            token.cancel();
        }
    }
}
