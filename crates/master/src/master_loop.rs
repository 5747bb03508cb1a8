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
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use scylla_cdc_common::{
    CdcError, Config, GenerationId, GenerationMetadata, Result, SharedClock, StreamId, Task, TaskId,
};
use scylla_cdc_ports::{MasterCqlSession, Transport};
use tokio_util::sync::CancellationToken;

use crate::generation_done::{generation_done, GenerationCompletion};
use crate::metrics::MasterMetrics;
use crate::tasks::build_tasks;

/// Whether a suspension point observed a shutdown request. `Break(())`
/// means the caller should unwind without treating the interruption as an
/// error: a cooperative shutdown request terminates the loop, it never
/// surfaces as a failure.
type Flow<T> = ControlFlow<(), T>;

/// Drives the generation lifecycle: discovery, task-set (re)configuration,
/// and advance across completed generations.
pub struct MasterLoop<M, T> {
    cql: Arc<M>,
    transport: Arc<T>,
    clock: SharedClock,
    config: Config,
    metrics: Option<MasterMetrics>,
    shutdown: CancellationToken,
}

impl<M, T> MasterLoop<M, T>
where
    M: MasterCqlSession,
    T: Transport,
{
    pub fn new(
        cql: Arc<M>,
        transport: Arc<T>,
        clock: SharedClock,
        config: Config,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            cql,
            transport,
            clock,
            config,
            metrics: None,
            shutdown,
        }
    }

    pub fn with_metrics(mut self, metrics: MasterMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs until shutdown is requested. Any error from an individual
    /// iteration is logged and the loop restarts from generation discovery
    /// after `sleep_after_exception`.
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.drive().await {
                Ok(ControlFlow::Break(())) => return Ok(()),
                Ok(ControlFlow::Continue(never)) => match never {},
                Err(err) => {
                    tracing::error!(error = %err, "master loop iteration failed");
                    if let Some(metrics) = &self.metrics {
                        metrics.master_loop_restarts.inc();
                    }
                    if self.sleep_or_shutdown(self.config.sleep_after_exception).await.is_break() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// One full pass: resolve the starting generation, build and publish
    /// its task set, advance through any already-completed generations,
    /// then drive the current one until it too completes. Never returns
    /// `Ok(Continue)` (the inner loop runs until shutdown or an error);
    /// the uninhabited continue arm lets callers match exhaustively
    /// without a panic path.
    async fn drive(&self) -> Result<Flow<std::convert::Infallible>> {
        let mut cur = match self.resolve_start().await? {
            ControlFlow::Continue(id) => id,
            ControlFlow::Break(()) => return Ok(ControlFlow::Break(())),
        };

        loop {
            let mut generation = self.cql.fetch_generation_metadata(cur).await?;
            let mut tasks = build_tasks(&generation, &self.config.tables, self.config.window_size_ms());

            loop {
                let task_ids = task_id_set(&tasks);
                let completion = generation_done(
                    &*self.cql,
                    &*self.transport,
                    &*self.clock,
                    &generation,
                    &self.config.tables,
                    &task_ids,
                )
                .await?;
                if !completion.is_done() {
                    break;
                }
                self.record_completion(completion);
                let next = generation.next.ok_or_else(|| {
                    CdcError::Other(anyhow!(
                        "generation {} is done but has no successor",
                        generation.id
                    ))
                })?;
                generation = self.cql.fetch_generation_metadata(next).await?;
                tasks = build_tasks(&generation, &self.config.tables, self.config.window_size_ms());
            }

            self.transport.configure_workers(streams_by_task(&tasks)).await?;
            if let Some(metrics) = &self.metrics {
                metrics.generations_advanced.inc();
                metrics.tasks_configured.set(tasks.len() as i64);
            }
            tracing::info!(generation = %generation.id, tasks = tasks.len(), "configured workers");

            if self.drive_until_generation_done(&mut generation, &tasks).await?.is_break() {
                return Ok(ControlFlow::Break(()));
            }

            cur = generation.next.ok_or_else(|| {
                CdcError::Other(anyhow!(
                    "generation {} is done but has no successor",
                    generation.id
                ))
            })?;
        }
    }

    /// Polls until the generation is done, refreshing its `end` in the
    /// meantime if it hasn't closed yet.
    async fn drive_until_generation_done(
        &self,
        generation: &mut GenerationMetadata,
        tasks: &std::collections::BTreeMap<TaskId, Task>,
    ) -> Result<Flow<()>> {
        let task_ids = task_id_set(tasks);
        loop {
            let completion = generation_done(
                &*self.cql,
                &*self.transport,
                &*self.clock,
                generation,
                &self.config.tables,
                &task_ids,
            )
            .await?;
            if completion.is_done() {
                self.record_completion(completion);
                return Ok(ControlFlow::Continue(()));
            }
            if self
                .sleep_or_shutdown(self.config.sleep_before_generation_done)
                .await
                .is_break()
            {
                return Ok(ControlFlow::Break(()));
            }
            if generation.end.is_none() {
                let end = self.cql.fetch_generation_end(generation.id).await?;
                *generation = generation.clone().with_refreshed_end(end, generation.next);
            }
        }
    }

    /// Prefers the transport's restart hint; otherwise polls discovery
    /// with a fixed sleep between tries.
    async fn resolve_start(&self) -> Result<Flow<GenerationId>> {
        if let Some(id) = self.transport.get_current_generation_id().await? {
            return Ok(ControlFlow::Continue(id));
        }
        loop {
            if let Some(id) = self.cql.fetch_first_generation_id().await? {
                return Ok(ControlFlow::Continue(id));
            }
            if self
                .sleep_or_shutdown(self.config.sleep_before_first_generation)
                .await
                .is_break()
            {
                return Ok(ControlFlow::Break(()));
            }
        }
    }

    /// Attributes a `generation_done` result to the right metric:
    /// TTL-driven skips are counted separately from ordinary
    /// transport-confirmed completion, per SPEC_FULL.md §11.
    fn record_completion(&self, completion: GenerationCompletion) {
        if completion == GenerationCompletion::TtlExpired {
            if let Some(metrics) = &self.metrics {
                metrics.generation_ttl_skips.inc();
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

fn task_id_set(tasks: &std::collections::BTreeMap<TaskId, Task>) -> BTreeSet<TaskId> {
    tasks.keys().cloned().collect()
}

fn streams_by_task(
    tasks: &std::collections::BTreeMap<TaskId, Task>,
) -> std::collections::BTreeMap<TaskId, BTreeSet<StreamId>> {
    tasks
        .iter()
        .map(|(id, task)| (id.clone(), task.streams.clone()))
        .collect()
}
