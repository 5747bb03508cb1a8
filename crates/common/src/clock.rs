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
use std::time::{SystemTime, UNIX_EPOCH};

use crate::time::Timestamp;

/// An injectable source of wall-clock "now". All "now" reads in the master
/// and worker loops go through a `Clock`; there is no direct OS time access
/// in the core, so tests can drive generation-completion and TTL-expiry
/// logic deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The production clock: wraps `SystemTime::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_millis() as i64;
        Timestamp::from_millis(millis)
    }
}

pub type SharedClock = Arc<dyn Clock>;

#[cfg(any(test, feature = "test-util"))]
pub mod test_support {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;

    /// A clock a test can advance by hand, for exercising retry/backoff and
    /// TTL-expiry logic without sleeping real time.
    #[derive(Debug, Default)]
    pub struct FakeClock(AtomicI64);

    impl FakeClock {
        pub fn new(start_millis: i64) -> Self {
            Self(AtomicI64::new(start_millis))
        }

        pub fn advance_millis(&self, delta: i64) {
            self.0.fetch_add(delta, Ordering::SeqCst);
        }

        pub fn set_millis(&self, millis: i64) {
            self.0.store(millis, Ordering::SeqCst);
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Timestamp {
            Timestamp::from_millis(self.0.load(Ordering::SeqCst))
        }
    }
}
