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

//! Millisecond-precision wall-clock timestamps and their conversion to the
//! time-UUID bounds used by CDC log queries.

use std::fmt;
use std::ops::Add;
use std::time::Duration;

use uuid::Uuid;

/// A wall-clock instant at millisecond precision, totally ordered.
///
/// CQL `timestamp` columns and the embedded clocks of time-UUIDs both carry
/// millisecond precision; finer-grained instants are never meaningful here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    pub fn saturating_sub_ms(self, millis: i64) -> Self {
        Self(self.0.saturating_sub(millis))
    }

    pub fn add_millis(self, millis: i64) -> Self {
        Self(self.0 + millis)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.as_millis() as i64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::from_timestamp_millis(self.0) {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// Milliseconds between the Gregorian epoch (1582-10-15, the UUIDv1/CQL
/// `timeuuid` epoch) and the Unix epoch. Matches the constant used by the
/// CQL drivers' `minTimeuuid`/`maxTimeuuid` implementations.
const GREGORIAN_EPOCH_OFFSET_MILLIS: i64 = 12_219_292_800_000;

const TICKS_PER_MILLI: i64 = 10_000;

/// Clock-seq-and-node bytes used by `minTimeuuid`: the smallest value a
/// time-UUID can carry for a given millisecond, so that `startOf(t) <= u`
/// for every real time-UUID `u` embedding millisecond `t`.
const MIN_CLOCK_SEQ_AND_NODE: u64 = 0x8080_8080_8080_8080;

/// Clock-seq-and-node bytes used by `maxTimeuuid`: the largest value a
/// time-UUID can carry for a given millisecond.
const MAX_CLOCK_SEQ_AND_NODE: u64 = 0x7f7f_7f7f_7f7f_7f7f;

fn ticks_since_gregorian_epoch(millis: i64) -> i64 {
    (millis + GREGORIAN_EPOCH_OFFSET_MILLIS) * TICKS_PER_MILLI
}

/// Packs a 60-bit UUIDv1 timestamp (in 100ns ticks since the Gregorian
/// epoch) into the version-tagged most-significant 64 bits of a UUID, per
/// RFC 4122 §4.1.2.
fn make_msb(ticks: i64) -> u64 {
    let ticks = ticks as u64;
    let mut msb = 0u64;
    msb |= (0x0000_0000_ffff_ffff & ticks) << 32;
    msb |= (0x0000_ffff_0000_0000 & ticks) >> 16;
    msb |= (0x0fff_0000_0000_0000 & ticks) >> 48;
    msb |= 0x0000_0000_0000_1000; // version 1
    msb
}

/// Inverse of [`make_msb`]: recovers the embedded millisecond from a
/// time-UUID's most-significant 64 bits.
fn embedded_millis_from_msb(msb: u64) -> i64 {
    let time_low = (msb & 0xffff_ffff_0000_0000) >> 32;
    let time_mid = (msb & 0x0000_0000_ffff_0000) << 16;
    let time_hi = (msb & 0x0000_0000_0000_0fff) << 48;
    let ticks = (time_hi | time_mid | time_low) as i64;
    ticks / TICKS_PER_MILLI - GREGORIAN_EPOCH_OFFSET_MILLIS
}

fn earliest_time_uuid(millis: i64) -> Uuid {
    Uuid::from_u64_pair(make_msb(ticks_since_gregorian_epoch(millis)), MIN_CLOCK_SEQ_AND_NODE)
}

fn latest_time_uuid(millis: i64) -> Uuid {
    let next_ms_first_tick = ticks_since_gregorian_epoch(millis + 1);
    Uuid::from_u64_pair(make_msb(next_ms_first_tick - 1), MAX_CLOCK_SEQ_AND_NODE)
}

/// The smallest time-UUID whose embedded millisecond equals `t`. Used as the
/// exclusive lower bound (`cdc$time > windowStartUuid`) of a window query.
pub fn window_start_uuid(t: Timestamp) -> Uuid {
    earliest_time_uuid(t.millis())
}

/// The largest time-UUID strictly preceding `t`, i.e. the latest time-UUID
/// of millisecond `t - 1`. Used as the inclusive upper bound
/// (`cdc$time <= windowEndUuid`) of a window query.
///
/// The `-1ms` bias is mandatory: without it, consecutive windows
/// `[a, b)` and `[b, c)` would both admit time-UUIDs embedding millisecond
/// `b`, double-delivering any change written in that millisecond.
pub fn window_end_uuid(t: Timestamp) -> Uuid {
    latest_time_uuid(t.millis() - 1)
}

/// Recovers the millisecond embedded in a CQL time-UUID.
pub fn embedded_millis(u: Uuid) -> i64 {
    let (msb, _lsb) = u.as_u64_pair();
    embedded_millis_from_msb(msb)
}
