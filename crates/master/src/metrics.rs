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

use prometheus::{IntCounter, IntGauge, Registry};

/// Master-loop counters, registered into a caller-supplied [`Registry`]
/// rather than a global default — the embedding binary owns the exporter.
#[derive(Clone)]
pub struct MasterMetrics {
    pub generations_advanced: IntCounter,
    pub generation_ttl_skips: IntCounter,
    pub tasks_configured: IntGauge,
    pub master_loop_restarts: IntCounter,
}

impl MasterMetrics {
    pub fn new(registry: &Registry) -> anyhow::Result<Self> {
        let generations_advanced = IntCounter::new(
            "scylla_cdc_generations_advanced_total",
            "Number of CDC generations the master has advanced past",
        )?;
        let generation_ttl_skips = IntCounter::new(
            "scylla_cdc_generation_ttl_skips_total",
            "Number of generations skipped via TTL expiry rather than transport progress",
        )?;
        let tasks_configured = IntGauge::new(
            "scylla_cdc_tasks_configured",
            "Number of tasks configured for the current generation",
        )?;
        let master_loop_restarts = IntCounter::new(
            "scylla_cdc_master_loop_restarts_total",
            "Number of times the master loop restarted after an unhandled error",
        )?;

        registry.register(Box::new(generations_advanced.clone()))?;
        registry.register(Box::new(generation_ttl_skips.clone()))?;
        registry.register(Box::new(tasks_configured.clone()))?;
        registry.register(Box::new(master_loop_restarts.clone()))?;

        Ok(Self {
            generations_advanced,
            generation_ttl_skips,
            tasks_configured,
            master_loop_restarts,
        })
    }
}
