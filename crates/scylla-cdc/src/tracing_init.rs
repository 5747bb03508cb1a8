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

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber, driven by `RUST_LOG`/`SCYLLA_CDC_LOG`
/// (whichever is set; `RUST_LOG` wins), defaulting to `info` when neither is
/// set. Emits JSON when `SCYLLA_CDC_LOG_FORMAT=json`, pretty-printed text
/// otherwise.
///
/// This is opt-in: nothing in `scylla-cdc-common`, `scylla-cdc-master`, or
/// `scylla-cdc-worker` installs a subscriber itself, so embedding a reader
/// inside a binary that already configures its own logging never conflicts.
/// Call this only from a binary that wants this crate's default setup.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("SCYLLA_CDC_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("SCYLLA_CDC_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
