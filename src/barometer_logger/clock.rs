// barometer_logger - Barometric pressure logger for router admin pages
//
// Copyright 2026 barometer_logger contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use chrono::{DateTime, FixedOffset, Local};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Source of timestamps for new readings.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock time in the local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock that never goes backwards.
///
/// If the wrapped clock steps back, after an NTP correction for example, the last
/// returned time is repeated until the wrapped clock catches up. Comparisons are on
/// absolute time so a change of UTC offset is not a step back.
#[derive(Debug)]
pub struct MonotonicClock<C> {
    inner: C,
    last: Mutex<Option<DateTime<FixedOffset>>>,
}

impl<C: Clock> MonotonicClock<C> {
    pub fn new(inner: C) -> Self {
        MonotonicClock {
            inner,
            last: Mutex::new(None),
        }
    }
}

impl<C: Clock> Clock for MonotonicClock<C> {
    fn now(&self) -> DateTime<FixedOffset> {
        let now = self.inner.now();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let next = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };

        *last = Some(next);
        next
    }
}

/// Clock anchored at `base` that advances with tokio's timer.
///
/// When tokio time is paused, readings stamped with this clock move forward exactly as
/// far as the runtime's virtual time does.
#[derive(Debug, Clone)]
pub struct TokioClock {
    base: DateTime<FixedOffset>,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(base: DateTime<FixedOffset>) -> Self {
        TokioClock {
            base,
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let elapsed = chrono::Duration::from_std(self.start.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        self.base + elapsed
    }
}
