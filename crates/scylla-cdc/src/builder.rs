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

use std::sync::Arc;

use prometheus::Registry;
use scylla_cdc_common::{CdcError, Config, Result, SharedClock, SystemClock};
use scylla_cdc_master::{MasterLoop, MasterMetrics};
use scylla_cdc_ports::{ChangeReader, Consumer, MasterCqlSession, Transport, WorkerCqlSession};
use scylla_cdc_worker::WorkerMetrics;
use tokio_util::sync::CancellationToken;

use crate::dispatch::DispatchingTransport;

/// Assembles the master loop and a dynamically managed pool of worker loops
/// into one cooperative runtime, wiring together the four ports an embedder
/// supplies: the master CQL session, the worker CQL session, a transport,
/// and a consumer.
///
/// `scylla-cdc-master` and `scylla-cdc-worker` know nothing of each other —
/// neither spawns anything. This builder is what turns a `Config` plus the
/// four port implementations into a running reader.
pub struct CdcLogReaderBuilder<M, W, T, C> {
    master_cql: Arc<M>,
    worker_cql: Arc<W>,
    transport: Arc<T>,
    consumer: Arc<C>,
    config: Config,
    clock: SharedClock,
    shutdown: CancellationToken,
    metrics_registry: Option<Registry>,
}

impl<M, W, T, C> CdcLogReaderBuilder<M, W, T, C>
where
    M: MasterCqlSession + 'static,
    W: WorkerCqlSession + 'static,
    T: Transport + 'static,
    C: Consumer<<W::Reader as ChangeReader>::Change> + 'static,
{
    pub fn new(
        master_cql: Arc<M>,
        worker_cql: Arc<W>,
        transport: Arc<T>,
        consumer: Arc<C>,
        config: Config,
    ) -> Self {
        Self {
            master_cql,
            worker_cql,
            transport,
            consumer,
            config,
            clock: Arc::new(SystemClock),
            shutdown: CancellationToken::new(),
            metrics_registry: None,
        }
    }

    /// Overrides the default [`SystemClock`]. Mainly useful for tests that
    /// need to drive generation-completion and TTL-expiry logic without
    /// sleeping real time.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Supplies the token the reader's own shutdown is derived from; the
    /// caller retains a clone to cancel it. Defaults to a fresh token with
    /// nothing else holding it, i.e. the reader never stops on its own.
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Registers master- and worker-loop metrics into `registry`. Without
    /// this call the reader runs unmetered.
    pub fn metrics_registry(mut self, registry: Registry) -> Self {
        self.metrics_registry = Some(registry);
        self
    }

    /// Builds and immediately runs the reader until the shutdown token is
    /// cancelled. Equivalent to `self.build()?.run().await`.
    pub async fn run(self) -> Result<()> {
        self.build()?.run().await
    }

    /// Wires everything without starting it, for callers that want to hold
    /// the reader and control its lifecycle explicitly.
    pub fn build(self) -> Result<CdcLogReader<M, W, T, C>> {
        let worker_metrics = self
            .metrics_registry
            .as_ref()
            .map(WorkerMetrics::new)
            .transpose()
            .map_err(CdcError::Other)?;
        let master_metrics = self
            .metrics_registry
            .as_ref()
            .map(MasterMetrics::new)
            .transpose()
            .map_err(CdcError::Other)?;

        let dispatch = Arc::new(DispatchingTransport::new(
            self.transport,
            self.worker_cql,
            self.consumer,
            self.clock.clone(),
            &self.config,
            self.shutdown.clone(),
            worker_metrics,
        ));

        let mut master = MasterLoop::new(
            self.master_cql,
            dispatch,
            self.clock,
            self.config,
            self.shutdown,
        );
        if let Some(metrics) = master_metrics {
            master = master.with_metrics(metrics);
        }

        Ok(CdcLogReader { master })
    }
}

/// A fully wired reader: a master loop driving a [`DispatchingTransport`]
/// that spawns and retires per-task worker loops as the master
/// (re)configures tasks. Construct one via [`CdcLogReaderBuilder`].
pub struct CdcLogReader<M, W, T, C> {
    master: MasterLoop<M, DispatchingTransport<W, T, C>>,
}

impl<M, W, T, C> CdcLogReader<M, W, T, C>
where
    M: MasterCqlSession,
    W: WorkerCqlSession + 'static,
    T: Transport + 'static,
    C: Consumer<<W::Reader as ChangeReader>::Change> + 'static,
{
    /// Runs until the builder's shutdown token is cancelled, or until an
    /// error that isn't recovered by the master loop's own restart policy
    /// propagates out (in practice, none do — see `scylla_cdc_master`).
    /// Worker tasks are spawned and cancelled as the master reconfigures
    /// tasks, and all of them share the same shutdown token lineage, so
    /// cancelling it stops the whole reader, not just the master.
    pub async fn run(&self) -> Result<()> {
        self.master.run().await
    }
}
