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

use crate::client::RouterClient;
use crate::metrics::{CollectorMetrics, Outcome};
use crate::reading::Status;
use crate::store::ReadingStore;
use chrono::{DateTime, FixedOffset};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Level};

/// States of the collection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Fetching,
    Sleeping,
    Stopped,
}

/// How often the scheduler collects readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Collect a single reading, successful or not, then stop.
    Once,
    /// Collect a reading every period until cancelled.
    Every(Duration),
}

/// Counts of what happened while the scheduler was running.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub cycles: u64,
    pub stored: u64,
    pub fetch_errors: u64,
    pub parse_errors: u64,
    pub storage_errors: u64,
}

impl CollectionReport {
    pub fn failures(&self) -> u64 {
        self.fetch_errors + self.parse_errors + self.storage_errors
    }
}

/// Drives a `RouterClient` on a schedule and appends each successful reading to a
/// `ReadingStore`.
///
/// One fetch happens at a time. Failures of any kind during a cycle are logged and
/// counted, never stored, and the next attempt happens at the next scheduled time
/// rather than immediately. Stored timestamps never go backwards: a reading stamped
/// earlier than the last one in the store is stored with the last timestamp instead.
/// Cancellation is checked before every transition and
/// while sleeping, but a fetch that has already started is allowed to finish or time
/// out on its own.
#[derive(Debug)]
pub struct Scheduler<C> {
    client: C,
    store: ReadingStore,
    metrics: CollectorMetrics,
    schedule: Schedule,
}

impl<C: RouterClient> Scheduler<C> {
    pub fn new(client: C, store: ReadingStore, metrics: CollectorMetrics, schedule: Schedule) -> Self {
        Scheduler {
            client,
            store,
            metrics,
            schedule,
        }
    }

    /// Run until cancelled, or until one cycle completes for `Schedule::Once`.
    pub async fn run(&self, cancel: CancellationToken) -> CollectionReport {
        let mut report = CollectionReport::default();
        let mut ticker = self.ticker();
        let mut state = State::Idle;
        let mut last = self.last_stored();

        loop {
            if state != State::Stopped && cancel.is_cancelled() {
                tracing::info!(message = "collection cancelled", state = ?state);
                state = State::Stopped;
            }

            let next = match state {
                State::Idle => match ticker.as_mut() {
                    Some(t) => {
                        // First tick of an interval completes immediately
                        t.tick().await;
                        State::Fetching
                    }
                    None => State::Fetching,
                },
                State::Fetching => {
                    self.cycle(&mut report, &mut last).await;
                    if ticker.is_some() {
                        State::Sleeping
                    } else {
                        State::Stopped
                    }
                }
                State::Sleeping => match ticker.as_mut() {
                    Some(t) => {
                        tokio::select! {
                            _ = t.tick() => State::Fetching,
                            _ = cancel.cancelled() => State::Stopped,
                        }
                    }
                    None => State::Stopped,
                },
                State::Stopped => break,
            };

            tracing::trace!(message = "scheduler transition", from = ?state, to = ?next);
            state = next;
        }

        tracing::info!(
            message = "collection stopped",
            cycles = report.cycles,
            stored = report.stored,
            failures = report.failures(),
        );

        report
    }

    fn ticker(&self) -> Option<Interval> {
        match self.schedule {
            Schedule::Once => None,
            Schedule::Every(period) => {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(interval)
            }
        }
    }

    /// Timestamp of the newest reading already in the store, if any.
    fn last_stored(&self) -> Option<DateTime<FixedOffset>> {
        match self.store.read_all() {
            Ok(readings) => readings.filter_map(Result::ok).map(|r| r.timestamp).max(),
            Err(e) => {
                tracing::warn!(message = "unable to read existing readings", path = %self.store.path().display(), error = %e);
                None
            }
        }
    }

    async fn cycle(&self, report: &mut CollectionReport, last: &mut Option<DateTime<FixedOffset>>) {
        report.cycles += 1;

        let res = self
            .client
            .fetch_reading()
            .instrument(tracing::span!(Level::DEBUG, "router_fetch", cycle = report.cycles))
            .await;

        let mut reading = match res {
            Ok(r) => r,
            Err(e) => {
                let status = e.status();
                match status {
                    Status::ParseError => report.parse_errors += 1,
                    _ => report.fetch_errors += 1,
                }

                self.metrics.failed(Outcome::from(status));
                tracing::error!(message = "failed to fetch reading", kind = %status, cycle = report.cycles, error = %e);
                return;
            }
        };

        if let Some(prev) = *last {
            if reading.timestamp < prev {
                tracing::warn!(message = "clock went backwards, reusing last timestamp", timestamp = %reading.timestamp, last = %prev);
                reading.timestamp = prev;
            }
        }

        match self.store.append(&reading) {
            Ok(()) => {
                *last = Some(reading.timestamp);
                report.stored += 1;
                self.metrics.stored(&reading);
                tracing::info!(
                    message = "stored reading",
                    pressure_pa = reading.pressure_pa,
                    pressure_hpa = reading.hpa(),
                    timestamp = %reading.timestamp,
                );
            }
            Err(e) => {
                report.storage_errors += 1;
                self.metrics.failed(Outcome::StorageError);
                tracing::error!(
                    message = "failed to store reading",
                    kind = %Outcome::StorageError,
                    cycle = report.cycles,
                    path = %self.store.path().display(),
                    error = %e,
                );
            }
        }
    }
}
