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

//! A client-side library that reads a Change Data Capture log from a
//! Scylla/Cassandra-family cluster and delivers every row-level change to a
//! user-supplied [`Consumer`], exactly once per successful run, tolerating
//! cluster topology changes and transient failures.
//!
//! This crate is the public entry point over `scylla-cdc-common`,
//! `scylla-cdc-ports`, `scylla-cdc-master`, and `scylla-cdc-worker`: it
//! wires a [`MasterCqlSession`], a [`WorkerCqlSession`], a [`Transport`],
//! and a [`Consumer`] into one cooperative runtime via
//! [`CdcLogReaderBuilder`]. The CQL transport, row decoding, and
//! change-schema construction are out of scope — supplied by whatever
//! driver integration implements the two CQL session ports.

mod dispatch;

mod builder;
mod tracing_init;

pub use builder::{CdcLogReader, CdcLogReaderBuilder};
pub use tracing_init::init_tracing;

pub use scylla_cdc_common::{
    CdcError, ChangeId, Clock, Config, GenerationId, GenerationMetadata, Result, SharedClock,
    StreamId, SystemClock, Task, TaskId, TaskState, TableName, Timestamp, VersionLatch, VnodeId,
};
pub use scylla_cdc_ports::{
    ChangeReader, Consumer, MasterCqlSession, PortError, PortResult, RawChange, Transport,
    WorkerCqlSession,
};
