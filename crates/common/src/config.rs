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
use std::time::Duration;

use crate::task::TableName;

/// Construction-time configuration for the coordination engine, per
/// spec §6. Durations, not raw millisecond integers: the distilled
/// specification's `*Ms` fields are typed here so a caller cannot pass a
/// count of seconds where milliseconds were meant.
#[derive(Debug, Clone)]
pub struct Config {
    pub tables: BTreeSet<TableName>,
    pub window_size: Duration,
    pub sleep_before_first_generation: Duration,
    pub sleep_after_exception: Duration,
    pub sleep_before_generation_done: Duration,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn window_size_ms(&self) -> i64 {
        self.window_size.as_millis() as i64
    }
}

/// Builds a [`Config`] field at a time: typed setters rather than a
/// stringly-typed map.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    tables: BTreeSet<TableName>,
    window_size: Option<Duration>,
    sleep_before_first_generation: Option<Duration>,
    sleep_after_exception: Option<Duration>,
    sleep_before_generation_done: Option<Duration>,
}

impl ConfigBuilder {
    pub fn table(mut self, table: TableName) -> Self {
        self.tables.insert(table);
        self
    }

    pub fn tables(mut self, tables: impl IntoIterator<Item = TableName>) -> Self {
        self.tables.extend(tables);
        self
    }

    pub fn window_size(mut self, window_size: Duration) -> Self {
        self.window_size = Some(window_size);
        self
    }

    pub fn sleep_before_first_generation(mut self, d: Duration) -> Self {
        self.sleep_before_first_generation = Some(d);
        self
    }

    pub fn sleep_after_exception(mut self, d: Duration) -> Self {
        self.sleep_after_exception = Some(d);
        self
    }

    pub fn sleep_before_generation_done(mut self, d: Duration) -> Self {
        self.sleep_before_generation_done = Some(d);
        self
    }

    /// Builds the config, applying the same defaults the source library
    /// ships: a one-minute window, five-second discovery/advance polling,
    /// and a ten-second pause after an unhandled error in the master loop.
    pub fn build(self) -> Config {
        Config {
            tables: self.tables,
            window_size: self.window_size.unwrap_or(Duration::from_secs(60)),
            sleep_before_first_generation: self
                .sleep_before_first_generation
                .unwrap_or(Duration::from_secs(5)),
            sleep_after_exception: self.sleep_after_exception.unwrap_or(Duration::from_secs(10)),
            sleep_before_generation_done: self
                .sleep_before_generation_done
                .unwrap_or(Duration::from_secs(5)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let cfg = Config::builder()
            .table(TableName {
                keyspace: "ks".into(),
                name: "t".into(),
            })
            .build();
        assert_eq!(cfg.tables.len(), 1);
        assert_eq!(cfg.window_size, Duration::from_secs(60));
    }
}
