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

use scylla_cdc_common::CdcError;

/// The result type every port method returns. Port implementations surface
/// [`CdcError`] directly so the master and worker loops can tell
/// configuration errors (never retryable) from transient ones without a
/// second error hierarchy.
pub type PortResult<T> = Result<T, CdcError>;

pub use CdcError as PortError;
