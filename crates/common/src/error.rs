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

use thiserror::Error;

use crate::task::TableName;

/// A specialized `Result` type for the coordination engine.
pub type Result<T> = std::result::Result<T, CdcError>;

/// The error type shared by the master loop, the worker loop, and the port
/// contracts they drive.
///
/// Configuration errors are a distinct, non-retryable variant from transient
/// CQL errors: the former indicate the cluster will never satisfy the
/// request as configured, the latter are expected to clear on retry. The two
/// are never conflated with "not yet available" (`Option::None` from the
/// relevant port method), per the master/worker CQL port contracts.
#[derive(Error, Debug)]
pub enum CdcError {
    #[error("table {0:?} is not CDC-enabled or its metadata is missing")]
    TableNotCdcEnabled(TableName),

    #[error("malformed TTL option on table {table:?}: {reason}")]
    MalformedTtl { table: TableName, reason: String },

    #[error("neither the v1 nor the v2 streams-description table layout is present")]
    NoStreamsDescriptionLayout,

    #[error("generation {0} is unknown to the cluster")]
    UnknownGeneration(i64),

    #[error("transient CQL error: {0}")]
    Transient(#[source] anyhow::Error),

    #[error("consumer failed while processing a change: {0}")]
    Consumer(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CdcError {
    /// Whether the worker/master loop should retry the same operation after
    /// a backoff, rather than aborting the task and surfacing the error to
    /// supervision. Configuration errors never clear on their own. Consumer
    /// errors are deliberately excluded too: a failing consumer aborts its
    /// task instead of being retried in place — only supervision (outside
    /// this crate) decides whether and how to restart it, from the task's
    /// last persisted `TaskState`.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            CdcError::TableNotCdcEnabled(_)
                | CdcError::MalformedTtl { .. }
                | CdcError::NoStreamsDescriptionLayout
                | CdcError::UnknownGeneration(_)
                | CdcError::Consumer(_)
        )
    }
}
