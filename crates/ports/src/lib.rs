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

//! Abstract async-trait contracts consumed by the master and worker loops:
//! [`MasterCqlSession`], [`WorkerCqlSession`] + [`ChangeReader`] +
//! [`RawChange`], [`Transport`], and [`Consumer`]. None of these talk CQL —
//! the transport and row decoding are external collaborators the embedding
//! application provides.

pub mod consumer;
pub mod error;
pub mod master_cql;
pub mod transport;
pub mod worker_cql;

pub use consumer::Consumer;
pub use error::{PortError, PortResult};
pub use master_cql::MasterCqlSession;
pub use transport::Transport;
pub use worker_cql::{ChangeReader, RawChange, WorkerCqlSession};
