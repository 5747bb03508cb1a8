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

use prometheus::{IntCounter, Registry};

/// Per-process worker counters, registered into a caller-supplied
/// [`Registry`] rather than a global default — see
/// `scylla_cdc_master::metrics` for the analogous master-side set.
#[derive(Clone)]
pub struct WorkerMetrics {
    pub changes_consumed: IntCounter,
    pub windows_advanced: IntCounter,
    pub window_retries: IntCounter,
}

impl WorkerMetrics {
    pub fn new(registry: &Registry) -> anyhow::Result<Self> {
        let changes_consumed = IntCounter::new(
            "scylla_cdc_changes_consumed_total",
            "Number of CDC log rows delivered to the consumer",
        )?;
        let windows_advanced = IntCounter::new(
            "scylla_cdc_windows_advanced_total",
            "Number of task windows fully consumed and advanced",
        )?;
        let window_retries = IntCounter::new(
            "scylla_cdc_window_retries_total",
            "Number of times a window read was retried after a transient CQL error",
        )?;

        registry.register(Box::new(changes_consumed.clone()))?;
        registry.register(Box::new(windows_advanced.clone()))?;
        registry.register(Box::new(window_retries.clone()))?;

        Ok(Self {
            changes_consumed,
            windows_advanced,
            window_retries,
        })
    }
}
